use thiserror::Error;

use crate::token::{Token, TokenType};

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ScannerError {
    pub line: i32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {}] Error {}: {message}", .token.line, location(.token))]
pub struct ParserError {
    pub token: Token,
    pub message: String,
}

impl ParserError {
    pub fn new(token: Token, message: impl AsRef<str>) -> Self {
        Self { token, message: message.as_ref().to_owned() }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {}] Error {}: {message}", .token.line, location(.token))]
pub struct ResolverError {
    pub token: Token,
    pub message: String,
}

impl ResolverError {
    pub fn new(token: &Token, message: impl AsRef<str>) -> Self {
        Self { token: token.clone(), message: message.as_ref().to_owned() }
    }
}

fn location(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        "at end".to_owned()
    } else {
        format!("at '{}'", token.lexeme)
    }
}

/// Failures that abort the current `interpret` call.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: i32 },

    #[error("Use of unassigned variable '{name}'.")]
    UnassignedVariable { name: String, line: i32 },

    #[error("Variable '{name}' is already defined in this scope.")]
    AlreadyDefined { name: String, line: i32 },

    #[error("Operand of '{operator}' must be a number.")]
    OperandMustBeNumber { operator: String, line: i32 },

    #[error("Operands of '{operator}' must be numbers.")]
    OperandsMustBeNumbers { operator: String, line: i32 },

    #[error("Operands of '+' must be numbers or one of them must be a string.")]
    InvalidAddition { line: i32 },

    #[error("Division by zero.")]
    DivisionByZero { line: i32 },

    #[error("Expected {expected} arguments but got {got}.")]
    ArityMismatch { expected: usize, got: usize, line: i32 },

    #[error("Can only call functions.")]
    NotCallable { line: i32 },

    #[error("Stack overflow.")]
    StackOverflow { line: i32 },

    #[error("Failed to write program output: {source}")]
    Output {
        line: i32,
        #[source]
        source: std::io::Error,
    },
}

impl RuntimeError {
    pub fn line(&self) -> i32 {
        match self {
            RuntimeError::UndefinedVariable { line, .. }
            | RuntimeError::UnassignedVariable { line, .. }
            | RuntimeError::AlreadyDefined { line, .. }
            | RuntimeError::OperandMustBeNumber { line, .. }
            | RuntimeError::OperandsMustBeNumbers { line, .. }
            | RuntimeError::InvalidAddition { line }
            | RuntimeError::DivisionByZero { line }
            | RuntimeError::ArityMismatch { line, .. }
            | RuntimeError::NotCallable { line }
            | RuntimeError::StackOverflow { line }
            | RuntimeError::Output { line, .. } => *line,
        }
    }

    pub fn undefined(name: &Token) -> Self {
        RuntimeError::UndefinedVariable { name: name.lexeme.clone(), line: name.line }
    }

    pub fn unassigned(name: &Token) -> Self {
        RuntimeError::UnassignedVariable { name: name.lexeme.clone(), line: name.line }
    }
}
