use crate::prelude::*;

/// Turns source text into tokens. Lexical errors are collected instead of
/// stopping the scan.
#[derive(Debug)]
pub struct Scanner {
    chars: Vec<char>,
    tokens: Vec<Token>,
    errors: Vec<ScannerError>,
    lexeme_start: usize,
    pos: usize,
    line: i32,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            tokens: vec![],
            errors: vec![],
            lexeme_start: 0,
            pos: 0,
            line: 1,
        }
    }

    /// Scans the whole source. Bad characters are recorded in `errors()` and
    /// skipped, so the returned stream is always terminated by `EOF`.
    pub fn scan_tokens(&mut self) -> Vec<Token> {
        while let Some(c) = self.bump() {
            self.lexeme_start = self.pos - 1;
            self.lex(c);
        }

        self.tokens.push(Token::new(TokenType::EOF, "", None, self.line));
        std::mem::take(&mut self.tokens)
    }

    pub fn errors(&self) -> &[ScannerError] {
        &self.errors
    }

    pub fn had_error(&self) -> bool {
        !self.errors.is_empty()
    }

    fn lex(&mut self, c: char) {
        use TokenType::*;

        let token_type = match c {
            '(' => LeftParen,
            ')' => RightParen,
            '{' => LeftBrace,
            '}' => RightBrace,
            ',' => Comma,
            '-' => Minus,
            '+' => Plus,
            ';' => Semicolon,
            '*' => Star,
            '?' => Question,
            ':' => Colon,
            '!' => self.followed_by_equal(BangEqual, Bang),
            '=' => self.followed_by_equal(EqualEqual, Equal),
            '<' => self.followed_by_equal(LessEqual, Less),
            '>' => self.followed_by_equal(GreaterEqual, Greater),
            '/' if self.eat('/') => {
                self.skip_while(|c| c != '\n');
                return;
            }
            '/' => Slash,
            '\n' => {
                self.line += 1;
                return;
            }
            c if c.is_whitespace() => return,
            '"' => return self.string(),
            c if c.is_ascii_digit() => return self.number(),
            c if is_ident_start(c) => {
                self.skip_while(is_ident_continue);
                TokenType::keyword(&self.lexeme()).unwrap_or(Identifier)
            }
            _ => return self.error("Unexpected character."),
        };

        self.push(token_type, None);
    }

    fn string(&mut self) {
        let start_line = self.line;
        loop {
            match self.bump() {
                Some('"') => break,
                Some('\n') => self.line += 1,
                Some(_) => {}
                None => {
                    self.error("Unterminated string.");
                    return;
                }
            }
        }

        // Strip the quotes.
        let text: String = self.chars[self.lexeme_start + 1..self.pos - 1].iter().collect();
        let token = Token::new(
            TokenType::StringLiteral,
            &self.lexeme(),
            Some(Literal::String(text)),
            start_line,
        );
        self.tokens.push(token);
    }

    fn number(&mut self) {
        self.skip_while(|c| c.is_ascii_digit());
        if self.peek_at(0) == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.skip_while(|c| c.is_ascii_digit());
        }

        match self.lexeme().parse::<f64>() {
            Ok(n) => self.push(TokenType::Number, Some(Literal::Number(n))),
            Err(_) => self.error("Invalid number literal."),
        }
    }

    fn followed_by_equal(&mut self, with: TokenType, without: TokenType) -> TokenType {
        if self.eat('=') {
            with
        } else {
            without
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_at(0)?;
        self.pos += 1;
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        let matched = self.peek_at(0) == Some(expected);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_while(&mut self, pred: impl Fn(char) -> bool) {
        while self.peek_at(0).is_some_and(&pred) {
            self.pos += 1;
        }
    }

    fn lexeme(&self) -> String {
        self.chars[self.lexeme_start..self.pos].iter().collect()
    }

    fn push(&mut self, token_type: TokenType, literal: Option<Literal>) {
        let token = Token::new(token_type, &self.lexeme(), literal, self.line);
        self.tokens.push(token);
    }

    fn error(&mut self, message: &str) {
        self.errors.push(ScannerError { line: self.line, message: message.to_owned() });
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}
