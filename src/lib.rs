#![allow(clippy::new_without_default)]
#![allow(clippy::vtable_address_comparisons)]

mod ast;
mod environment;
mod error;
mod func;
mod interpreter;
mod native;
mod object;
mod parser;
mod printer;
mod resolver;
mod scanner;
mod token;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::environment::Environment;
    pub use crate::error::*;
    pub use crate::func::*;
    pub use crate::interpreter::*;
    pub use crate::object::*;
    pub use crate::parser::*;
    pub use crate::printer::AstPrinter;
    pub use crate::resolver::Resolver;
    pub use crate::scanner::*;
    pub use crate::token::*;
    pub use crate::{OutputBuffer, Shared};
}

use std::cell::RefCell;
use std::io::{BufRead, Write};
use std::rc::Rc;

use tracing::debug;

use prelude::*;

pub type Shared<T> = Rc<RefCell<T>>;
pub type SharedErrorReporter = Shared<ErrorReporter>;

pub struct Lox {
    interpreter: Interpreter,
    error_reporter: SharedErrorReporter,
    output: Box<dyn Write>,
}

impl Lox {
    pub fn new() -> Self {
        let error_reporter = Rc::new(RefCell::new(ErrorReporter::default()));

        Self {
            interpreter: Interpreter::new().with_error_reporting(error_reporter.clone()),
            error_reporter,
            output: Box::new(std::io::stdout()),
        }
    }

    /// A session whose program output and REPL echoes go to `output`.
    pub fn with_output(output: impl Write + Clone + 'static) -> Self {
        let error_reporter = Rc::new(RefCell::new(ErrorReporter::default()));

        Self {
            interpreter: Interpreter::new()
                .with_error_reporting(error_reporter.clone())
                .with_output(output.clone()),
            error_reporter,
            output: Box::new(output),
        }
    }

    pub fn error_reporter(&self) -> SharedErrorReporter {
        self.error_reporter.clone()
    }

    pub fn had_error(&self) -> bool {
        self.error_reporter.borrow().had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.error_reporter.borrow().had_runtime_error
    }
}

impl Lox {
    /// Runs a whole program. Error flags describe this run only.
    pub fn run(&mut self, input: &str) -> Result<(), anyhow::Error> {
        self.error_reporter.borrow_mut().reset();

        let Some(tokens) = self.scan(input) else {
            return Ok(());
        };

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        debug!(statements = statements.len(), errors = parser.errors().len(), "parsed");
        if parser.had_error() {
            self.print_parser_errors(parser.errors());
            return Ok(());
        }

        self.resolve_and_interpret(&statements);
        Ok(())
    }

    /// Prints the syntax tree of every parsed top-level statement instead of
    /// running the program.
    pub fn print_ast(&mut self, input: &str) -> Result<(), anyhow::Error> {
        self.error_reporter.borrow_mut().reset();

        let Some(tokens) = self.scan(input) else {
            return Ok(());
        };

        let mut parser = Parser::new(tokens);
        let statements = parser.parse();
        self.print_parser_errors(parser.errors());

        for stmt in &statements {
            writeln!(self.output, "{}", AstPrinter::stmt_to_string(stmt))?;
        }
        Ok(())
    }

    /// Runs one line of interactive input. When the line does not parse as
    /// statements it is retried as a bare expression whose value is echoed.
    pub fn run_line(&mut self, line: &str) -> Result<(), anyhow::Error> {
        self.error_reporter.borrow_mut().reset();

        let Some(tokens) = self.scan(line) else {
            return Ok(());
        };

        let mut parser = Parser::new(tokens.clone());
        let statements = parser.parse();
        if !parser.had_error() {
            self.resolve_and_interpret(&statements);
            return Ok(());
        }

        let mut expr_parser = Parser::new(tokens);
        if let Some(expr) = expr_parser.parse_expression() {
            match self.interpreter.evaluate_expr(&expr) {
                Ok(value) => writeln!(self.output, "{value}")?,
                Err(e) => self.error_reporter.borrow_mut().runtime_error(&e),
            }
            return Ok(());
        }

        // Both attempts failed; the statement errors are the useful ones.
        self.print_parser_errors(parser.errors());
        Ok(())
    }

    pub fn run_prompt(&mut self) -> Result<(), anyhow::Error> {
        let stdin = std::io::stdin();
        let mut lines = stdin.lock().lines();

        loop {
            write!(self.output, "> ")?;
            self.output.flush()?;

            match lines.next() {
                Some(line) => self.run_line(&line?)?,
                None => break,
            }
        }

        Ok(())
    }

    fn scan(&mut self, input: &str) -> Option<Vec<Token>> {
        let mut scanner = Scanner::new(input);
        let tokens = scanner.scan_tokens();
        debug!(tokens = tokens.len(), errors = scanner.errors().len(), "scanned");

        if scanner.had_error() {
            self.print_scanner_errors(scanner.errors());
            return None;
        }

        Some(tokens)
    }

    fn resolve_and_interpret(&mut self, statements: &[Stmt]) {
        let resolver = Resolver::new(&mut self.interpreter);
        if let Err(errors) = resolver.resolve(statements) {
            let mut reporter = self.error_reporter.borrow_mut();
            errors.iter().for_each(|e| reporter.resolver_error(e));
            return;
        }
        debug!("resolved");

        // Runtime errors are already reported by the interpreter.
        let _ = self.interpreter.interpret(statements);
    }

    fn print_scanner_errors(&mut self, errors: &[ScannerError]) {
        let mut reporter = self.error_reporter.borrow_mut();
        errors.iter().for_each(|e| reporter.error(e.line, &e.message));
    }

    fn print_parser_errors(&mut self, errors: &[ParserError]) {
        let mut reporter = self.error_reporter.borrow_mut();
        errors.iter().for_each(|e| reporter.parser_error(e));
    }
}

/// Prints diagnostics on stderr and remembers what kind of failure happened.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    pub had_error: bool,
    pub had_runtime_error: bool,
    pub messages: Vec<String>,
}

impl ErrorReporter {
    pub fn error(&mut self, line: i32, message: &str) {
        self.report(format!("[line {line}] Error: {message}"));
        self.had_error = true;
    }

    pub fn parser_error(&mut self, e: &ParserError) {
        self.report(e.to_string());
        self.had_error = true;
    }

    pub fn resolver_error(&mut self, e: &ResolverError) {
        self.report(e.to_string());
        self.had_error = true;
    }

    pub fn runtime_error(&mut self, e: &RuntimeError) {
        self.report(format!("{e}\n[line {}]", e.line()));
        self.had_runtime_error = true;
    }

    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    fn report(&mut self, message: String) {
        eprintln!("{message}");
        self.messages.push(message);
    }
}

/// An in-memory output sink. Clones share one buffer, so a clone handed to
/// the interpreter can be read back by the embedder.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer(Shared<Vec<u8>>);

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }

    /// Output split into lines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_owned).collect()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repl_keeps_bindings_between_lines() {
        let out = OutputBuffer::new();
        let mut lox = Lox::with_output(out.clone());

        lox.run_line("var a = 1;").unwrap();
        lox.run_line("a = a + 1;").unwrap();
        lox.run_line("print a;").unwrap();
        assert_eq!(out.lines(), vec!["2"]);
    }

    #[test]
    fn repl_falls_back_to_expression_evaluation() {
        let out = OutputBuffer::new();
        let mut lox = Lox::with_output(out.clone());

        lox.run_line("1 + 2").unwrap();
        assert_eq!(out.lines(), vec!["3"]);
        assert!(!lox.had_error());
    }

    #[test]
    fn repl_reports_statement_errors_when_both_parses_fail() {
        let mut lox = Lox::with_output(OutputBuffer::new());

        lox.run_line("var = ;").unwrap();
        assert!(lox.had_error());
        let reporter = lox.error_reporter();
        assert_eq!(reporter.borrow().messages, vec!["[line 1] Error at '=': Expect variable name."]);
    }

    #[test]
    fn runtime_error_keeps_earlier_output() {
        let out = OutputBuffer::new();
        let mut lox = Lox::with_output(out.clone());

        lox.run("print 1; print -\"x\"; print 2;").unwrap();
        assert_eq!(out.lines(), vec!["1"]);
        assert!(lox.had_runtime_error());
        let reporter = lox.error_reporter();
        assert_eq!(reporter.borrow().messages, vec!["Operand of '-' must be a number.\n[line 1]"]);
    }

    #[test]
    fn error_flags_describe_the_latest_run() {
        let mut lox = Lox::with_output(OutputBuffer::new());

        lox.run("print ;").unwrap();
        assert!(lox.had_error());
        lox.run("print 1 / 0;").unwrap();
        assert!(!lox.had_error());
        assert!(lox.had_runtime_error());
        lox.run("print 1;").unwrap();
        assert!(!lox.had_error());
        assert!(!lox.had_runtime_error());
    }

    #[derive(Clone)]
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn output_failure_reports_the_print_line() {
        let mut lox = Lox::with_output(BrokenPipe);

        lox.run("var a = 1;\n\nprint \"x\";").unwrap();
        assert!(lox.had_runtime_error());
        let reporter = lox.error_reporter();
        let reporter = reporter.borrow();
        assert_eq!(reporter.messages.len(), 1);
        assert!(reporter.messages[0].ends_with("\n[line 3]"), "{:?}", reporter.messages);
    }

    #[test]
    fn parse_errors_prevent_execution() {
        let out = OutputBuffer::new();
        let mut lox = Lox::with_output(out.clone());

        lox.run("print 1; print ;").unwrap();
        assert!(out.lines().is_empty());
        assert!(lox.had_error());
    }
}
