use std::rc::Rc;

use crate::prelude::*;

/// Operators that are only valid between two operands. Seeing one where an
/// expression should start is reported and its right operand skipped.
const BINARY_OPERATORS: &[TokenType] = &[
    TokenType::BangEqual,
    TokenType::EqualEqual,
    TokenType::Greater,
    TokenType::GreaterEqual,
    TokenType::Less,
    TokenType::LessEqual,
    TokenType::Plus,
    TokenType::Slash,
    TokenType::Star,
];

const MAX_ARGUMENTS: usize = 255;

type ParseResult<T> = Result<T, ParserError>;

pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<ParserError>,
    // Cleared while parsing call arguments, where ',' separates arguments.
    comma_allowed: bool,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map_or(true, |t| t.token_type != TokenType::EOF) {
            let line = tokens.last().map_or(1, |t| t.line);
            tokens.push(Token::new(TokenType::EOF, "", None, line));
        }

        Self { tokens, current: 0, errors: vec![], comma_allowed: true }
    }

    /// Parses the whole token stream. Malformed declarations are reported in
    /// `errors()` and left out of the returned program.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = vec![];
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        statements
    }

    /// Parses the tokens as a single expression.
    pub fn parse_expression(&mut self) -> Option<Expr> {
        let expr = self.expression().ok()?;

        if !self.is_at_end() {
            let token = self.peek().clone();
            self.error(token, "Expect end of expression.");
            return None;
        }

        if self.had_error() {
            return None;
        }

        Some(expr)
    }

    pub fn errors(&self) -> &[ParserError] {
        &self.errors
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_tt(&[TokenType::Var]) {
            self.var_declaration()
        } else if self.match_tt(&[TokenType::Fun]) {
            self.function("function")
        } else {
            self.statement()
        };

        match result {
            Ok(stmt) => Some(stmt),
            Err(_) => {
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;

        let initializer =
            if self.match_tt(&[TokenType::Equal]) { Some(self.expression()?) } else { None };

        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.")?;

        Ok(Stmt::Var { name, initializer })
    }

    fn function(&mut self, kind: &str) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, &format!("Expect {kind} name."))?;
        self.consume(TokenType::LeftParen, &format!("Expect '(' after {kind} name."))?;

        let mut params = vec![];
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARGUMENTS {
                    let token = self.peek().clone();
                    self.error(token, "Can't have more than 255 parameters.");
                }

                params.push(self.consume(TokenType::Identifier, "Expect parameter name.")?);
                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;
        self.consume(TokenType::LeftBrace, &format!("Expect '{{' before {kind} body."))?;

        let body = self.block()?;

        Ok(Stmt::Function { decl: Rc::new(FunctionDecl { name, params, body }) })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_tt(&[TokenType::For]) {
            self.for_statement()
        } else if self.match_tt(&[TokenType::If]) {
            self.if_statement()
        } else if self.match_tt(&[TokenType::Print]) {
            self.print_statement()
        } else if self.match_tt(&[TokenType::Return]) {
            self.return_statement()
        } else if self.match_tt(&[TokenType::While]) {
            self.while_statement()
        } else if self.match_tt(&[TokenType::LeftBrace]) {
            Ok(Stmt::Block { statements: self.block()? })
        } else {
            self.expression_statement()
        }
    }

    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_tt(&[TokenType::Semicolon]) {
            None
        } else if self.match_tt(&[TokenType::Var]) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenType::Semicolon) {
            self.expression()?
        } else {
            Expr::Literal { value: Object::Boolean(true) }
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment =
            if !self.check(TokenType::RightParen) { Some(self.expression()?) } else { None };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        // There is no loop node for `for`: it becomes a while loop whose body
        // runs the increment after the loop body.
        if let Some(increment) = increment {
            body = Stmt::Block { statements: vec![body, Stmt::Expression { expr: increment }] };
        }

        body = Stmt::While { condition, body: Box::new(body) };

        if let Some(initializer) = initializer {
            body = Stmt::Block { statements: vec![initializer, body] };
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_tt(&[TokenType::Else]) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If { condition, then_branch, else_branch })
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous();
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print { keyword, expr })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous();
        let value =
            if !self.check(TokenType::Semicolon) { Some(self.expression()?) } else { None };

        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = vec![];

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression { expr })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.match_tt(&[TokenType::Equal]) {
            let equals = self.previous();
            let value = self.assignment()?;
            if let Expr::Variable { name, .. } = expr {
                return Ok(Expr::assignment(name, value));
            }

            // Not fatal: report it and keep the right-hand side.
            self.error(equals, "Invalid assignment target.");
            return Ok(value);
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;

        while self.match_tt(&[TokenType::Or]) {
            let operator = self.previous();
            let right = self.and()?;
            expr = Expr::Logical { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.binary_error()?;

        while self.match_tt(&[TokenType::And]) {
            let operator = self.previous();
            let right = self.binary_error()?;
            expr = Expr::Logical { left: Box::new(expr), operator, right: Box::new(right) };
        }

        Ok(expr)
    }

    fn binary_error(&mut self) -> ParseResult<Expr> {
        if self.match_tt(BINARY_OPERATORS) {
            let operator = self.previous();
            self.error(operator, "Binary operator without left-hand operand.");
            // Parse the would-be right operand and drop it. The statement is
            // already in error, so a nil placeholder stands in for the operand.
            self.comma()?;
            return Ok(Expr::Literal { value: Object::Null });
        }

        self.comma()
    }

    fn comma(&mut self) -> ParseResult<Expr> {
        let mut expr = self.ternary()?;

        while self.comma_allowed && self.match_tt(&[TokenType::Comma]) {
            let right = self.ternary()?;
            expr = Expr::Comma { left: Box::new(expr), right: Box::new(right) };
        }

        Ok(expr)
    }

    fn ternary(&mut self) -> ParseResult<Expr> {
        let expr = self.equality()?;

        if self.match_tt(&[TokenType::Question]) {
            let then_branch = self.expression()?;
            self.consume(
                TokenType::Colon,
                "Expect ':' after then branch of conditional expression.",
            )?;
            let else_branch = self.expression()?;
            return Ok(Expr::Ternary {
                condition: Box::new(expr),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            });
        }

        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;

        while self.match_tt(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator = self.previous();
            let right = self.comparison()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;

        while self.match_tt(&[
            TokenType::GreaterEqual,
            TokenType::Greater,
            TokenType::LessEqual,
            TokenType::Less,
        ]) {
            let operator = self.previous();
            let right = self.term()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;

        while self.match_tt(&[TokenType::Minus, TokenType::Plus]) {
            let operator = self.previous();
            let right = self.factor()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        while self.match_tt(&[TokenType::Slash, TokenType::Star]) {
            let operator = self.previous();
            let right = self.unary()?;
            expr = Expr::Binary { left: Box::new(expr), operator, right: Box::new(right) };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_tt(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous();
            let right = self.unary()?;
            return Ok(Expr::Unary { operator, right: Box::new(right) });
        }

        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        while self.match_tt(&[TokenType::LeftParen]) {
            expr = self.finish_call(expr)?;
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = vec![];

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARGUMENTS {
                    // Just report the error, the call itself is still well formed
                    let token = self.peek().clone();
                    self.error(token, "Can't have more than 255 arguments.");
                }

                arguments.push(self.with_comma(false, Self::expression)?);

                if !self.match_tt(&[TokenType::Comma]) {
                    break;
                }
            }
        }

        let paren = self.consume(TokenType::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call { callee: Box::new(callee), paren, arguments })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.match_tt(&[TokenType::False]) {
            return Ok(Expr::Literal { value: Object::Boolean(false) });
        }
        if self.match_tt(&[TokenType::True]) {
            return Ok(Expr::Literal { value: Object::Boolean(true) });
        }
        if self.match_tt(&[TokenType::Nil]) {
            return Ok(Expr::Literal { value: Object::Null });
        }
        if self.match_tt(&[TokenType::Number, TokenType::StringLiteral]) {
            let token = self.previous();
            if let Some(literal) = token.literal.clone() {
                return Ok(Expr::Literal { value: literal.into() });
            }
            return Err(self.error(token, "Expect literal value."));
        }
        if self.match_tt(&[TokenType::Identifier]) {
            return Ok(Expr::variable(self.previous()));
        }
        if self.match_tt(&[TokenType::LeftParen]) {
            let expr = self.with_comma(true, Self::expression)?;
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping { expr: Box::new(expr) });
        }

        let token = self.peek().clone();
        Err(self.error(token, "Expect expression."))
    }

    fn with_comma<T>(
        &mut self,
        allowed: bool,
        parse: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = std::mem::replace(&mut self.comma_allowed, allowed);
        let result = parse(self);
        self.comma_allowed = saved;
        result
    }

    /// Return the next token if its `token_type` matches the given type as input.
    /// Otherwise, record the error and return it.
    fn consume(&mut self, token_type: TokenType, message: &str) -> ParseResult<Token> {
        if self.check(token_type) {
            return Ok(self.advance());
        }

        let token = self.peek().clone();
        Err(self.error(token, message))
    }

    /// Records an error. The caller decides whether it unwinds the current
    /// declaration by returning it.
    fn error(&mut self, token: Token, message: &str) -> ParserError {
        let error = ParserError::new(token, message);
        self.errors.push(error.clone());
        error
    }

    fn match_tt(&mut self, types: &[TokenType]) -> bool {
        for tt in types {
            if self.check(*tt) {
                self.advance();
                return true;
            }
        }

        false
    }

    /// Check to see if the next token's type matches the given `token_type`.
    fn check(&self, token_type: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().token_type == token_type
    }

    fn advance(&mut self) -> Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::EOF
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> Token {
        self.tokens[self.current.saturating_sub(1)].clone()
    }

    fn synchronize(&mut self) {
        self.advance();

        // Move and discard tokens until we find a statement boundary
        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::printer::AstPrinter;

    fn parser(source: &str) -> Parser {
        let tokens = Scanner::new(source).scan_tokens();
        Parser::new(tokens)
    }

    fn print_expr(source: &str) -> String {
        let expr = parser(source).parse_expression().expect("expression should parse");
        AstPrinter::to_string(&expr)
    }

    #[test]
    fn precedence_climbs_from_assignment_to_primary() {
        assert_eq!(print_expr("1 + 2 * 3"), "(+ 1 (* 2 3))");
        assert_eq!(print_expr("-1 < 2 == true"), "(== (< (- 1) 2) true)");
        assert_eq!(print_expr("a = b or c and d"), "(= a (or b (and c d)))");
    }

    #[test]
    fn comma_binds_looser_than_ternary() {
        assert_eq!(print_expr("1, 2, 3"), "(, (, 1 2) 3)");
        assert_eq!(print_expr("a ? b : c"), "(?: a b c)");
        assert_eq!(print_expr("x == 1 ? 2 : 3, 4"), "(?: (== x 1) 2 (, 3 4))");
        assert_eq!(print_expr("(x ? 2 : 3), 4"), "(, (group (?: x 2 3)) 4)");
    }

    #[test]
    fn commas_in_calls_separate_arguments() {
        assert_eq!(print_expr("f(1, 2)(3)"), "(call (call f 1 2) 3)");
        assert_eq!(print_expr("f((1, 2))"), "(call f (group (, 1 2)))");
        assert_eq!(print_expr("f(c ? 1 : 2, 3)"), "(call f (?: c 1 2) 3)");
    }

    #[test]
    fn leading_binary_operator_is_reported_and_skipped() {
        let mut p = parser("* 3 + 4;");
        let statements = p.parse();
        assert_eq!(p.errors().len(), 1);
        assert_eq!(p.errors()[0].message, "Binary operator without left-hand operand.");
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn invalid_assignment_target_keeps_parsing() {
        let mut p = parser("(a) = 1; print 2;");
        let statements = p.parse();
        assert_eq!(p.errors().len(), 1);
        assert_eq!(p.errors()[0].message, "Invalid assignment target.");
        assert_eq!(p.errors()[0].token.lexeme, "=");
        assert_eq!(statements.len(), 2);
        match &statements[0] {
            Stmt::Expression { expr } => assert_eq!(AstPrinter::to_string(expr), "1"),
            other => panic!("unexpected statement {other:?}"),
        }
    }

    #[test]
    fn synchronizes_and_reports_every_bad_statement() {
        let mut p = parser("var = 1; print 1; var x 2; print 2;");
        let statements = p.parse();
        assert_eq!(p.errors().len(), 2);
        assert_eq!(p.errors()[0].to_string(), "[line 1] Error at '=': Expect variable name.");
        assert_eq!(
            p.errors()[1].to_string(),
            "[line 1] Error at '2': Expect ';' after variable declaration."
        );
        assert_eq!(statements.len(), 2);
    }

    #[test]
    fn error_at_end_of_input() {
        let mut p = parser("print 1");
        p.parse();
        assert_eq!(p.errors()[0].to_string(), "[line 1] Error at end: Expect ';' after value.");
    }

    #[test]
    fn for_desugars_into_a_while_loop() {
        let statements = parser("for (var i = 0; i < 3; i = i + 1) print i;").parse();
        assert_eq!(statements.len(), 1);

        let Stmt::Block { statements: outer } = &statements[0] else {
            panic!("for should desugar into a block");
        };
        assert!(matches!(outer[0], Stmt::Var { .. }));
        let Stmt::While { body, .. } = &outer[1] else {
            panic!("second statement should be the loop");
        };
        let Stmt::Block { statements: inner } = body.as_ref() else {
            panic!("loop body should be wrapped with the increment");
        };
        assert!(matches!(inner[0], Stmt::Print { .. }));
        assert!(matches!(inner[1], Stmt::Expression { .. }));
    }

    #[test]
    fn for_without_condition_loops_on_true() {
        let statements = parser("for (;;) print 1;").parse();
        let Stmt::While { condition, .. } = &statements[0] else {
            panic!("bare for should be a while loop");
        };
        assert_eq!(AstPrinter::to_string(condition), "true");
    }

    #[test]
    fn function_declarations_and_returns() {
        let mut p = parser("fun add(a, b) { return a + b; }");
        let statements = p.parse();
        assert!(!p.had_error());
        let Stmt::Function { decl } = &statements[0] else {
            panic!("expected a function");
        };
        assert_eq!(decl.name.lexeme, "add");
        assert_eq!(decl.params.len(), 2);
        assert!(matches!(decl.body[0], Stmt::Return { value: Some(_), .. }));
    }

    #[test]
    fn parse_expression_rejects_statements() {
        assert!(parser("var a = 1;").parse_expression().is_none());
        assert!(parser("1 + 2").parse_expression().is_some());
    }

    #[test]
    fn more_than_255_arguments_is_reported_but_parsed() {
        let args = (0..256).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
        let mut p = parser(&format!("f({args});"));
        let statements = p.parse();

        assert_eq!(statements.len(), 1);
        assert_eq!(p.errors().len(), 1);
        assert_eq!(
            p.errors()[0].to_string(),
            "[line 1] Error at '255': Can't have more than 255 arguments."
        );
        let Stmt::Expression { expr: Expr::Call { arguments, .. } } = &statements[0] else {
            panic!("expected a call statement");
        };
        assert_eq!(arguments.len(), 256);
    }

    #[test]
    fn more_than_255_parameters_is_reported_but_parsed() {
        let params = (0..256).map(|i| format!("p{i}")).collect::<Vec<_>>().join(", ");
        let mut p = parser(&format!("fun f({params}) {{}}"));
        let statements = p.parse();

        assert_eq!(statements.len(), 1);
        assert_eq!(p.errors().len(), 1);
        assert_eq!(
            p.errors()[0].to_string(),
            "[line 1] Error at 'p255': Can't have more than 255 parameters."
        );
        let Stmt::Function { decl } = &statements[0] else {
            panic!("expected a function");
        };
        assert_eq!(decl.params.len(), 256);
    }

    #[test]
    fn exactly_255_arguments_is_fine() {
        let args = (0..255).map(|i| i.to_string()).collect::<Vec<_>>().join(", ");
        let mut p = parser(&format!("f({args});"));
        p.parse();
        assert!(!p.had_error());
    }

    #[test]
    fn print_keeps_its_keyword() {
        let statements = parser("\n\nprint 1;").parse();
        let Stmt::Print { keyword, .. } = &statements[0] else {
            panic!("expected a print statement");
        };
        assert_eq!(keyword.line, 3);
    }

    #[test]
    fn missing_colon_in_ternary() {
        let mut p = parser("print a ? b;");
        p.parse();
        assert_eq!(
            p.errors()[0].message,
            "Expect ':' after then branch of conditional expression."
        );
    }
}
