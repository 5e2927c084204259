use std::fmt::Display;
use std::rc::Rc;

use tracing::trace;

use crate::prelude::*;

/// A user-defined function: its declaration plus the frame that was active
/// when the declaration executed.
#[derive(Debug, Clone)]
pub struct LoxFunction {
    decl: Rc<FunctionDecl>,
    closure: Shared<Environment>,
}

impl LoxFunction {
    pub fn new(decl: Rc<FunctionDecl>, closure: Shared<Environment>) -> Self {
        Self { decl, closure }
    }

    pub fn name(&self) -> &str {
        &self.decl.name.lexeme
    }
}

impl Callable for LoxFunction {
    fn arity(&self) -> usize {
        self.decl.params.len()
    }

    fn call(
        &self,
        interpret: &mut Interpreter,
        arguments: Vec<Object>,
    ) -> Result<Object, RuntimeError> {
        trace!(function = self.name(), args = arguments.len(), "call");

        // The new frame hangs off the closure, not the caller's frame.
        let environment = Environment::new().with_enclosing(self.closure.clone()).as_rc();

        {
            let mut env_borrow = environment.borrow_mut();
            for (param, arg) in self.decl.params.iter().zip(arguments) {
                env_borrow.define(param, arg)?;
            }
        }

        match interpret.execute_block(&self.decl.body, environment)? {
            Flow::Returned(value) => Ok(value),
            Flow::Completed => Ok(Object::Null),
        }
    }
}

impl Display for LoxFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<fn {}>", self.decl.name.lexeme)
    }
}
