use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::prelude::*;

/// Identity of a variable-referencing expression. The resolver keys its scope
/// distances by this id, so two structurally equal nodes never share an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(usize);

impl ExprId {
    /// Ids are unique for the whole process, so nodes parsed on different REPL
    /// lines can live in one interpreter without colliding.
    pub fn fresh() -> Self {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
pub enum Expr {
    Binary {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        paren: Token,
        arguments: Vec<Expr>,
    },
    Comma {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Grouping {
        expr: Box<Expr>,
    },
    Literal {
        value: Object,
    },
    Unary {
        operator: Token,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },
    Variable {
        id: ExprId,
        name: Token,
    },
    Assignment {
        id: ExprId,
        name: Token,
        value: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        operator: Token,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn variable(name: Token) -> Expr {
        Expr::Variable { id: ExprId::fresh(), name }
    }

    pub fn assignment(name: Token, value: Expr) -> Expr {
        Expr::Assignment { id: ExprId::fresh(), name, value: Box::new(value) }
    }
}

impl AsRef<Expr> for Expr {
    fn as_ref(&self) -> &Expr {
        self
    }
}

/// A function declaration. Shared between the statement that declares it and
/// every function value created from it.
#[derive(Debug)]
pub struct FunctionDecl {
    pub name: Token,
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Stmt {
    Return {
        keyword: Token,
        value: Option<Expr>,
    },
    Print {
        keyword: Token,
        expr: Expr,
    },
    Expression {
        expr: Expr,
    },
    Var {
        name: Token,
        initializer: Option<Expr>,
    },
    Block {
        statements: Vec<Stmt>,
    },
    Function {
        decl: Rc<FunctionDecl>,
    },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
}

impl AsRef<Stmt> for Stmt {
    fn as_ref(&self) -> &Stmt {
        self
    }
}
