use crate::prelude::*;

/// Renders syntax trees as Lisp-like text, e.g. `(* (- 123) (group 45.67))`.
pub struct AstPrinter;

impl AstPrinter {
    pub fn to_string(expr: &Expr) -> String {
        match expr {
            Expr::Binary { left, operator, right } | Expr::Logical { left, operator, right } => {
                Self::parenthesize(&operator.lexeme, &[left, right])
            }
            Expr::Grouping { expr } => Self::parenthesize("group", &[expr]),
            Expr::Literal { value: Object::String(s) } => format!("{s:?}"),
            Expr::Literal { value } => format!("{value}"),
            Expr::Unary { operator, right } => Self::parenthesize(&operator.lexeme, &[right]),
            Expr::Ternary { condition, then_branch, else_branch } => {
                Self::parenthesize("?:", &[condition, then_branch, else_branch])
            }
            Expr::Comma { left, right } => Self::parenthesize(",", &[left, right]),
            Expr::Variable { name, .. } => name.lexeme.clone(),
            Expr::Assignment { name, value, .. } => {
                format!("(= {} {})", name.lexeme, Self::to_string(value))
            }
            Expr::Call { callee, arguments, .. } => {
                let mut parts: Vec<&Expr> = vec![&**callee];
                parts.extend(arguments.iter());
                Self::parenthesize("call", &parts)
            }
        }
    }

    pub fn stmt_to_string(stmt: &Stmt) -> String {
        match stmt {
            Stmt::Return { value: Some(value), .. } => {
                format!("(return {})", Self::to_string(value))
            }
            Stmt::Return { value: None, .. } => "(return)".to_owned(),
            Stmt::Print { expr, .. } => format!("(print {})", Self::to_string(expr)),
            Stmt::Expression { expr } => format!("(; {})", Self::to_string(expr)),
            Stmt::Var { name, initializer: Some(init) } => {
                format!("(var {} {})", name.lexeme, Self::to_string(init))
            }
            Stmt::Var { name, initializer: None } => format!("(var {})", name.lexeme),
            Stmt::Block { statements } => Self::block("block", statements),
            Stmt::Function { decl } => {
                let params = decl.params.iter().map(|p| p.lexeme.as_str()).collect::<Vec<_>>();
                let head = format!("fun {}({})", decl.name.lexeme, params.join(" "));
                Self::block(&head, &decl.body)
            }
            Stmt::If { condition, then_branch, else_branch } => {
                let mut s = format!(
                    "(if {} {}",
                    Self::to_string(condition),
                    Self::stmt_to_string(then_branch)
                );
                if let Some(else_branch) = else_branch {
                    s.push(' ');
                    s.push_str(&Self::stmt_to_string(else_branch));
                }
                s.push(')');
                s
            }
            Stmt::While { condition, body } => {
                format!("(while {} {})", Self::to_string(condition), Self::stmt_to_string(body))
            }
        }
    }

    fn parenthesize<E: AsRef<Expr>>(name: &str, exprs: &[E]) -> String {
        let mut s = format!("({name}");
        for expr in exprs {
            s.push(' ');
            s.push_str(&Self::to_string(expr.as_ref()));
        }
        s.push(')');
        s
    }

    fn block(head: &str, statements: &[Stmt]) -> String {
        let mut s = format!("({head}");
        for stmt in statements {
            s.push(' ');
            s.push_str(&Self::stmt_to_string(stmt));
        }
        s.push(')');
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;

    fn number(n: f64) -> Box<Expr> {
        Box::new(Expr::Literal { value: Object::Number(n) })
    }

    #[test]
    fn print_an_ast() {
        // This is '-123 * (45.67)'
        let expr = Expr::Binary {
            left: Box::new(Expr::Unary {
                operator: Token::new(TokenType::Minus, "-", None, 1),
                right: number(123.0),
            }),
            operator: Token::new(TokenType::Star, "*", None, 1),
            right: Box::new(Expr::Grouping { expr: number(45.67) }),
        };

        let res = AstPrinter::to_string(&expr);
        assert_eq!(res, "(* (- 123) (group 45.67))".to_owned());
    }

    #[test]
    fn print_statements() {
        let tokens = Scanner::new("fun f(a) { if (a) return \"x\"; else print a; }").scan_tokens();
        let statements = Parser::new(tokens).parse();
        assert_eq!(
            AstPrinter::stmt_to_string(&statements[0]),
            "(fun f(a) (if a (return \"x\") (print a)))"
        );
    }
}
