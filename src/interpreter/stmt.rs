use std::io::Write;
use std::rc::Rc;

use super::Flow;
use crate::prelude::*;

type ExecResult = Result<Flow, RuntimeError>;

impl Interpreter {
    pub fn execute(&mut self, stmt: &Stmt) -> ExecResult {
        match stmt {
            Stmt::Expression { expr } => {
                self.evaluate_expr(expr)?;
            }
            Stmt::Function { decl } => {
                // self.environment is the active environment where the function is
                // declared, NOT where it's called. Each execution of the declaration
                // captures the frame of that pass, so closures made in a loop are
                // distinct.
                let function = LoxFunction::new(decl.clone(), self.environment.clone());
                self.environment
                    .borrow_mut()
                    .define(&decl.name, Object::Callable(Rc::new(function)))?;
            }
            Stmt::Return { value, .. } => {
                let value =
                    if let Some(expr) = value { self.evaluate_expr(expr)? } else { Object::Null };

                return Ok(Flow::Returned(value));
            }
            Stmt::Print { keyword, expr } => {
                let value = self.evaluate_expr(expr)?;
                writeln!(self.output, "{value}")
                    .map_err(|source| RuntimeError::Output { line: keyword.line, source })?;
            }
            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => {
                    let value = self.evaluate_expr(expr)?;
                    self.environment.borrow_mut().define(name, value)?;
                }
                None => self.environment.borrow_mut().declare(name)?,
            },
            Stmt::Block { statements } => {
                // Create a new environment for executing the block
                let new_env = Environment::new().with_enclosing(self.environment.clone()).as_rc();

                return self.execute_block(statements, new_env);
            }
            Stmt::If { condition, then_branch, else_branch } => {
                if self.evaluate_expr(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(stmt) = else_branch {
                    return self.execute(stmt);
                }
            }
            Stmt::While { condition, body } => return self.handle_while_stmt(condition, body),
        };
        Ok(Flow::Completed)
    }

    /// Runs `statements` with `environment` as the current frame, restoring the
    /// previous frame on every exit path.
    pub fn execute_block<I, R>(
        &mut self,
        statements: I,
        environment: Shared<Environment>,
    ) -> ExecResult
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        let prev_env = std::mem::replace(&mut self.environment, environment);
        let result = self.execute_all(statements);
        self.environment = prev_env;
        result
    }

    fn execute_all<I, R>(&mut self, statements: I) -> ExecResult
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        for s in statements {
            if let Flow::Returned(value) = self.execute(s.as_ref())? {
                return Ok(Flow::Returned(value));
            }
        }

        Ok(Flow::Completed)
    }

    fn handle_while_stmt(&mut self, condition: &Expr, body: &Stmt) -> ExecResult {
        while self.evaluate_expr(condition)?.is_truthy() {
            if let Flow::Returned(value) = self.execute(body)? {
                return Ok(Flow::Returned(value));
            }
        }

        Ok(Flow::Completed)
    }
}
