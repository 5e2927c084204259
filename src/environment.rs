use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::prelude::*;

/// Slot contents. `Unassigned` is what `var x;` binds and cannot be produced
/// by any expression.
#[derive(Debug, Clone)]
enum Binding {
    Unassigned,
    Assigned(Object),
}

#[derive(Debug, Default)]
pub struct Environment {
    pub enclosing: Option<Shared<Environment>>,
    values: HashMap<String, Binding>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enclosing(self, enclosing: Shared<Environment>) -> Self {
        Self { enclosing: Some(enclosing), ..self }
    }

    pub fn as_rc(self) -> Shared<Self> {
        Rc::new(RefCell::new(self))
    }

    /// Binds `name` in this frame only. A name can be defined once per frame.
    pub fn define(&mut self, name: &Token, value: Object) -> Result<(), RuntimeError> {
        self.bind(name, Binding::Assigned(value))
    }

    /// Binds `name` in this frame without a value.
    pub fn declare(&mut self, name: &Token) -> Result<(), RuntimeError> {
        self.bind(name, Binding::Unassigned)
    }

    /// Installs a host-provided value, replacing any previous binding.
    pub fn define_native(&mut self, name: &str, value: Object) {
        self.values.insert(name.to_owned(), Binding::Assigned(value));
    }

    fn bind(&mut self, name: &Token, binding: Binding) -> Result<(), RuntimeError> {
        if self.values.contains_key(&name.lexeme) {
            return Err(RuntimeError::AlreadyDefined {
                name: name.lexeme.clone(),
                line: name.line,
            });
        }

        self.values.insert(name.lexeme.clone(), binding);
        Ok(())
    }

    pub fn assign(&mut self, name: &Token, value: Object) -> Result<(), RuntimeError> {
        if let Some(slot) = self.values.get_mut(&name.lexeme) {
            *slot = Binding::Assigned(value);
            return Ok(());
        }

        // Ask one level above if possible
        match self.enclosing {
            Some(ref e) => e.borrow_mut().assign(name, value),
            None => Err(RuntimeError::undefined(name)),
        }
    }

    pub fn get(&self, name: &Token) -> Result<Object, RuntimeError> {
        match self.values.get(&name.lexeme) {
            Some(binding) => read(binding, name),
            None => match self.enclosing {
                Some(ref e) => e.borrow().get(name),
                None => Err(RuntimeError::undefined(name)),
            },
        }
    }

    /// Reads `name` from the frame exactly `distance` hops up the chain, without
    /// searching any other frame.
    pub fn get_at(&self, distance: usize, name: &Token) -> Result<Object, RuntimeError> {
        if distance == 0 {
            return self.get_here(name);
        }

        match self.ancestor(distance) {
            Some(ancestor) => ancestor.borrow().get_here(name),
            None => Err(RuntimeError::undefined(name)),
        }
    }

    pub fn assign_at(
        &mut self,
        distance: usize,
        name: &Token,
        value: Object,
    ) -> Result<(), RuntimeError> {
        if distance == 0 {
            return self.assign_here(name, value);
        }

        match self.ancestor(distance) {
            Some(ancestor) => ancestor.borrow_mut().assign_here(name, value),
            None => Err(RuntimeError::undefined(name)),
        }
    }

    fn get_here(&self, name: &Token) -> Result<Object, RuntimeError> {
        match self.values.get(&name.lexeme) {
            Some(binding) => read(binding, name),
            None => Err(RuntimeError::undefined(name)),
        }
    }

    fn assign_here(&mut self, name: &Token, value: Object) -> Result<(), RuntimeError> {
        match self.values.get_mut(&name.lexeme) {
            Some(slot) => {
                *slot = Binding::Assigned(value);
                Ok(())
            }
            None => Err(RuntimeError::undefined(name)),
        }
    }

    fn ancestor(&self, distance: usize) -> Option<Shared<Environment>> {
        let mut env = self.enclosing.clone()?;

        for _ in 1..distance {
            let parent = env.borrow().enclosing.clone()?;
            env = parent;
        }
        Some(env)
    }
}

fn read(binding: &Binding, name: &Token) -> Result<Object, RuntimeError> {
    match binding {
        Binding::Assigned(value) => Ok(value.clone()),
        Binding::Unassigned => Err(RuntimeError::unassigned(name)),
    }
}
