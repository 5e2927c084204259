mod expr;
mod stmt;

use std::collections::HashMap;
use std::io::Write;

use tracing::debug;

use crate::prelude::*;
use crate::SharedErrorReporter;

type InterpreterResult = Result<Object, RuntimeError>;

/// Nested calls allowed before a call fails with `StackOverflow`.
pub const MAX_CALL_DEPTH: usize = 10_000;

/// How a statement finished. `Returned` carries a `return` value up to the
/// nearest function call; errors travel separately as `RuntimeError`.
#[derive(Debug)]
pub enum Flow {
    Completed,
    Returned(Object),
}

pub struct Interpreter {
    pub globals: Shared<Environment>,
    environment: Shared<Environment>,
    locals: HashMap<ExprId, usize>, // expression id -> scope distance
    output: Box<dyn Write>,
    error_reporter: Option<SharedErrorReporter>,
    call_depth: usize,
    max_call_depth: usize,
}

impl Interpreter {
    pub fn new() -> Self {
        let globals = Environment::new().as_rc();
        let environment = globals.clone();

        globals.borrow_mut().define_native("clock", Object::Callable(crate::native::clock()));

        Self {
            globals,
            environment,
            locals: HashMap::new(),
            output: Box::new(std::io::stdout()),
            error_reporter: None,
            call_depth: 0,
            max_call_depth: MAX_CALL_DEPTH,
        }
    }

    pub fn with_error_reporting(self, error_reporter: SharedErrorReporter) -> Self {
        Self { error_reporter: Some(error_reporter), ..self }
    }

    /// Sends `print` output to `output` instead of stdout.
    pub fn with_output(self, output: impl Write + 'static) -> Self {
        Self { output: Box::new(output), ..self }
    }

    pub fn with_max_call_depth(self, max_call_depth: usize) -> Self {
        Self { max_call_depth, ..self }
    }
}

impl Interpreter {
    /// Runs `statements` in order. The first runtime error stops the run and is
    /// reported; output and bindings produced before it are kept.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in statements {
            if let Err(e) = self.execute(stmt) {
                debug!(line = e.line(), error = %e, "runtime error aborted interpret");
                self.runtime_error(&e);
                return Err(e);
            }
        }

        Ok(())
    }

    /// Records the scope distance of a variable reference.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        self.locals.insert(id, depth);
    }

    pub fn distance_of(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    fn runtime_error(&self, e: &RuntimeError) {
        if let Some(reporter) = &self.error_reporter {
            reporter.borrow_mut().runtime_error(e);
        }
    }
}
