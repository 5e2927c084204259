use std::collections::HashMap;

use tracing::trace;

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Copy)]
enum FunctionType {
    None,
    Function,
}

/// Resolver uses static analysis to bind local variables to the correct
/// environment. It records, for every local variable reference, how many
/// scopes separate it from its declaration. Globals get no entry.
pub struct Resolver<'i> {
    interpreter: &'i mut Interpreter,
    // name -> "initializer finished"
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionType,
    errors: Vec<ResolverError>,
}

impl<'i> Resolver<'i> {
    pub fn new(interpreter: &'i mut Interpreter) -> Self {
        Self { interpreter, scopes: vec![], current_function: FunctionType::None, errors: vec![] }
    }

    /// Resolves a whole program. Every error is collected; resolution keeps
    /// going past the offending node.
    pub fn resolve<I, R>(mut self, statements: I) -> Result<(), Vec<ResolverError>>
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        self.resolve_stmts(statements);

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }

    fn resolve_stmts<I, R>(&mut self, statements: I)
    where
        I: IntoIterator<Item = R>,
        R: AsRef<Stmt>,
    {
        for stmt in statements {
            self.resolve_stmt(stmt.as_ref());
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block { statements } => {
                self.begin_scope();
                self.resolve_stmts(statements);
                self.end_scope();
            }
            Stmt::Var { name, initializer } => {
                // We use a 3 step process, so users can't use the same variable in
                // variable definition: declare -> initialize -> define
                self.declare(name);
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.define(name);
            }
            Stmt::Function { decl } => {
                // Unlike variables, we declare and define functions before processing
                // their body. This way, functions can recursively call themselves.
                self.declare(&decl.name);
                self.define(&decl.name);

                self.resolve_function(decl, FunctionType::Function);
            }
            Stmt::Expression { expr } | Stmt::Print { expr, .. } => self.resolve_expr(expr),
            Stmt::If { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(stmt) = else_branch {
                    self.resolve_stmt(stmt);
                }
            }
            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    self.resolve_expr(expr);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
        }
    }

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Variable { id, name } => {
                if let Some(false) = self.scopes.last().and_then(|s| s.get(&name.lexeme)) {
                    self.error(name, "Can't read local variable in its own initializer.");
                }

                self.resolve_local(*id, name);
            }
            Expr::Assignment { id, name, value } => {
                self.resolve_expr(value);
                self.resolve_local(*id, name);
            }
            Expr::Binary { left, right, .. }
            | Expr::Logical { left, right, .. }
            | Expr::Comma { left, right } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Ternary { condition, then_branch, else_branch } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            Expr::Call { callee, arguments, .. } => {
                self.resolve_expr(callee);
                for arg in arguments {
                    self.resolve_expr(arg);
                }
            }
            Expr::Grouping { expr } => self.resolve_expr(expr),
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Literal { .. } => {}
        }
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, func_type: FunctionType) {
        let enclosing_func = self.current_function;
        self.current_function = func_type;

        // Parameters and the top level of the body share one scope, matching
        // the single frame a call creates.
        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.current_function = enclosing_func;
    }

    fn resolve_local(&mut self, id: ExprId, name: &Token) {
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(&name.lexeme) {
                let distance = self.scopes.len() - i - 1;
                trace!(name = %name.lexeme, line = name.line, distance, "resolved local");
                self.interpreter.resolve(id, distance);
                return;
            }
        }
        // Not found in any local scope: a global, looked up by name at run time.
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };

        if scope.contains_key(&name.lexeme) {
            self.error(name, "Already a variable with this name in this scope.");
            return;
        }

        scope.insert(name.lexeme.clone(), false);
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.lexeme.clone(), true);
        }
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(ResolverError::new(token, message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(source: &str) -> (Interpreter, Vec<Stmt>, Result<(), Vec<ResolverError>>) {
        let tokens = Scanner::new(source).scan_tokens();
        let statements = Parser::new(tokens).parse();
        let mut interpreter = Interpreter::new();
        let result = Resolver::new(&mut interpreter).resolve(&statements);
        (interpreter, statements, result)
    }

    fn messages(result: Result<(), Vec<ResolverError>>) -> Vec<String> {
        result.unwrap_err().into_iter().map(|e| e.message).collect()
    }

    fn print_expr_id(stmt: &Stmt) -> ExprId {
        match stmt {
            Stmt::Print { expr: Expr::Variable { id, .. }, .. } => *id,
            other => panic!("expected `print <variable>`, got {other:?}"),
        }
    }

    #[test]
    fn globals_get_no_distance() {
        let (interpreter, statements, result) = resolve("var a = 1; print a;");
        assert!(result.is_ok());
        assert_eq!(interpreter.distance_of(print_expr_id(&statements[1])), None);
    }

    #[test]
    fn distance_counts_enclosing_blocks() {
        let (interpreter, statements, result) = resolve("{ var a = 1; { { print a; } } }");
        assert!(result.is_ok());

        let Stmt::Block { statements: outer } = &statements[0] else { panic!() };
        let Stmt::Block { statements: middle } = &outer[1] else { panic!() };
        let Stmt::Block { statements: inner } = &middle[0] else { panic!() };
        assert_eq!(interpreter.distance_of(print_expr_id(&inner[0])), Some(2));
    }

    #[test]
    fn parameters_live_in_the_function_scope() {
        let (interpreter, statements, result) = resolve("fun f(x) { print x; }");
        assert!(result.is_ok());

        let Stmt::Function { decl } = &statements[0] else { panic!() };
        assert_eq!(interpreter.distance_of(print_expr_id(&decl.body[0])), Some(0));
    }

    #[test]
    fn own_initializer_is_an_error() {
        let (_, _, result) = resolve("{ var a = a; }");
        assert_eq!(messages(result), vec!["Can't read local variable in its own initializer."]);
    }

    #[test]
    fn keeps_going_after_errors() {
        let (_, _, result) = resolve("{ var a = a; var b; var b; } return 1;");
        assert_eq!(
            messages(result),
            vec![
                "Can't read local variable in its own initializer.",
                "Already a variable with this name in this scope.",
                "Can't return from top-level code.",
            ]
        );
    }

    #[test]
    fn global_self_reference_is_left_to_run_time() {
        let (_, _, result) = resolve("var a = a;");
        assert!(result.is_ok());
    }
}
