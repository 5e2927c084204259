use super::InterpreterResult;
use crate::prelude::*;

// Grow the native stack by this much whenever less than the red zone is left,
// so deep recursion in a script hits `max_call_depth` instead of the guard page.
const RED_ZONE: usize = 128 * 1024;
const STACK_PER_GROWTH: usize = 1024 * 1024;

impl Interpreter {
    pub fn evaluate_expr(&mut self, expr: &Expr) -> InterpreterResult {
        match expr {
            Expr::Literal { value } => Ok(value.clone()),
            Expr::Grouping { expr: inner } => self.evaluate_expr(inner),
            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),
            Expr::Binary { left, operator, right } => self.evaluate_binary(left, operator, right),
            Expr::Variable { id, name } => self.lookup_variable(*id, name),
            Expr::Assignment { id, name, value } => {
                let value = self.evaluate_expr(value)?;

                if let Some(distance) = self.distance_of(*id) {
                    self.environment.borrow_mut().assign_at(distance, name, value.clone())?;
                } else {
                    self.globals.borrow_mut().assign(name, value.clone())?;
                }

                Ok(value)
            }
            Expr::Logical { left, operator, right } => {
                let left_val = self.evaluate_expr(left)?;

                // The deciding operand itself is the result, not a boolean.
                if operator.token_type == TokenType::Or {
                    if left_val.is_truthy() {
                        return Ok(left_val);
                    }
                } else if !left_val.is_truthy() {
                    return Ok(left_val);
                }

                self.evaluate_expr(right)
            }
            Expr::Ternary { condition, then_branch, else_branch } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    self.evaluate_expr(then_branch)
                } else {
                    self.evaluate_expr(else_branch)
                }
            }
            Expr::Comma { left, right } => {
                self.evaluate_expr(left)?;
                self.evaluate_expr(right)
            }
            Expr::Call { callee, paren, arguments } => {
                self.evaluate_call(callee, paren.line, arguments)
            }
        }
    }

    fn evaluate_call(&mut self, callee: &Expr, line: i32, arguments: &[Expr]) -> InterpreterResult {
        let callee = self.evaluate_expr(callee)?;

        let mut args = Vec::with_capacity(arguments.len());
        for arg in arguments {
            args.push(self.evaluate_expr(arg)?);
        }

        match callee {
            Object::Callable(callable) => {
                if callable.arity() != args.len() {
                    return Err(RuntimeError::ArityMismatch {
                        expected: callable.arity(),
                        got: args.len(),
                        line,
                    });
                }

                if self.call_depth >= self.max_call_depth {
                    return Err(RuntimeError::StackOverflow { line });
                }

                self.call_depth += 1;
                let result =
                    stacker::maybe_grow(RED_ZONE, STACK_PER_GROWTH, || callable.call(self, args));
                self.call_depth -= 1;
                result
            }
            _ => Err(RuntimeError::NotCallable { line }),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> InterpreterResult {
        let value = self.evaluate_expr(right)?;
        match operator.token_type {
            TokenType::Minus => match value {
                Object::Number(n) => Ok(Object::Number(-n)),
                _ => Err(RuntimeError::OperandMustBeNumber {
                    operator: operator.lexeme.clone(),
                    line: operator.line,
                }),
            },
            TokenType::Bang => Ok(Object::Boolean(!value.is_truthy())),

            // Unreachable code. We don't have any unary expression except the ones above.
            _ => Ok(Object::Null),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> InterpreterResult {
        let lhs = self.evaluate_expr(left)?;
        let rhs = self.evaluate_expr(right)?;

        let value = match operator.token_type {
            TokenType::Plus => add(&lhs, &rhs, operator.line)?,
            TokenType::Minus => Object::Number(numbers(operator, &lhs, &rhs, |l, r| l - r)?),
            TokenType::Star => Object::Number(numbers(operator, &lhs, &rhs, |l, r| l * r)?),
            TokenType::Slash => {
                if rhs.number() == Some(0.0) && lhs.number().is_some() {
                    return Err(RuntimeError::DivisionByZero { line: operator.line });
                }
                Object::Number(numbers(operator, &lhs, &rhs, |l, r| l / r)?)
            }
            TokenType::Greater => Object::Boolean(numbers(operator, &lhs, &rhs, |l, r| l > r)?),
            TokenType::GreaterEqual => {
                Object::Boolean(numbers(operator, &lhs, &rhs, |l, r| l >= r)?)
            }
            TokenType::Less => Object::Boolean(numbers(operator, &lhs, &rhs, |l, r| l < r)?),
            TokenType::LessEqual => Object::Boolean(numbers(operator, &lhs, &rhs, |l, r| l <= r)?),
            TokenType::EqualEqual => Object::Boolean(lhs == rhs),
            TokenType::BangEqual => Object::Boolean(lhs != rhs),
            // The parser builds binary nodes for the operators above only.
            _ => Object::Null,
        };

        Ok(value)
    }

    fn lookup_variable(&self, id: ExprId, name: &Token) -> InterpreterResult {
        if let Some(distance) = self.distance_of(id) {
            self.environment.borrow().get_at(distance, name)
        } else {
            self.globals.borrow().get(name)
        }
    }
}

/// `+` adds two numbers, or concatenates when either side is a string.
fn add(lhs: &Object, rhs: &Object, line: i32) -> InterpreterResult {
    match (lhs, rhs) {
        (Object::Number(l), Object::Number(r)) => Ok(Object::Number(l + r)),
        (Object::String(_), _) | (_, Object::String(_)) => Ok(Object::String(format!("{lhs}{rhs}"))),
        _ => Err(RuntimeError::InvalidAddition { line }),
    }
}

/// Applies `op` when both operands are numbers.
fn numbers<T>(
    operator: &Token,
    lhs: &Object,
    rhs: &Object,
    op: impl FnOnce(f64, f64) -> T,
) -> Result<T, RuntimeError> {
    match (lhs.number(), rhs.number()) {
        (Some(l), Some(r)) => Ok(op(l, r)),
        _ => Err(RuntimeError::OperandsMustBeNumbers {
            operator: operator.lexeme.clone(),
            line: operator.line,
        }),
    }
}
