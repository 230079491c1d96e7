//! Syntax tree consumed by the evaluator.
//!
//! The tree is produced by a front end (not part of this workspace) and is
//! immutable once built. Function and macro definitions are stored behind
//! [`Arc`] so registries can hold them without copying bodies, and so the
//! whole tree can be shared with parallel-loop workers.

mod operators;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use crate::Span;

pub use operators::{BinaryOp, CompareOp, UnaryOp};

/// Identifier text. Arabic and Latin identifiers are both plain Unicode.
pub type Name = Arc<str>;

/// A sequence of statements executed in order.
pub type Block = Vec<Stmt>;

/// A whole script.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Program {
    pub statements: Block,
}

impl Program {
    pub fn new(statements: Block) -> Self {
        Program { statements }
    }
}

/// A statement plus the position it was parsed from.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Option<Span>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// Expression evaluated for its value.
    Expr(Expr),
    Assign {
        name: Name,
        value: Expr,
    },
    If(IfStmt),
    While {
        condition: Expr,
        body: Block,
    },
    For(ForStmt),
    /// `parallel for`; same shape as [`StmtKind::For`].
    ParallelFor(ForStmt),
    Break,
    Continue,
    Return(Option<Expr>),
    FunctionDef(Arc<Definition>),
    MacroDef(Arc<Definition>),
    /// Non-interactive breakpoint; records a snapshot of visible bindings.
    Debug {
        message: Option<String>,
    },
    /// Runs `body` and records its wall-clock duration.
    Profile {
        label: Option<String>,
        body: Block,
    },
    // Simulation commands
    Init {
        size: Option<Expr>,
    },
    Evolve {
        steps: Option<Expr>,
    },
    Show {
        target: String,
    },
    SetParameter {
        name: Name,
        value: Expr,
    },
    Save {
        path: Expr,
    },
    Load {
        path: Expr,
    },
    Exit,
    Import(ImportStmt),
}

/// `import "path"` in one of its three forms.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportStmt {
    /// Module path as written, without quotes.
    pub path: String,
    pub kind: ImportKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImportKind {
    /// `import "path"`: every function and macro of the module.
    All,
    /// `import "path" as alias`: names are registered as `alias.name`.
    Namespace(Name),
    /// `from "path" import a, b`.
    Selected(Vec<Name>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_block: Block,
    pub elif_blocks: Vec<(Expr, Block)>,
    pub else_block: Option<Block>,
}

/// Counted loop over `range(start, end, step)`; `end` is exclusive.
#[derive(Clone, Debug, PartialEq)]
pub struct ForStmt {
    pub var: Name,
    pub start: Expr,
    pub end: Expr,
    pub step: Option<Expr>,
    pub body: Block,
}

/// A named, parameterized body. Used for both functions and macros.
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub name: Name,
    pub params: Vec<Name>,
    pub body: Block,
}

impl Definition {
    pub fn new(name: &str, params: &[&str], body: Block) -> Self {
        Definition {
            name: Name::from(name),
            params: params.iter().map(|p| Name::from(*p)).collect(),
            body,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// The body as a single expression, when it is exactly one expression
    /// statement (for example a macro body `x + x`).
    pub fn body_expr(&self) -> Option<&Expr> {
        match self.body.as_slice() {
            [Stmt {
                kind: StmtKind::Expr(expr),
                ..
            }] => Some(expr),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    Ident(Name),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Coercing comparison; see [`CompareOp`].
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Call {
        name: Name,
        args: Vec<Expr>,
    },
}

// Constructors

impl Expr {
    pub fn int(value: i64) -> Self {
        Expr::Int(value)
    }

    pub fn float(value: f64) -> Self {
        Expr::Float(value)
    }

    pub fn string(value: &str) -> Self {
        Expr::Str(Arc::from(value))
    }

    pub fn ident(name: &str) -> Self {
        Expr::Ident(Name::from(name))
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn call(name: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            name: Name::from(name),
            args,
        }
    }
}

impl From<StmtKind> for Stmt {
    fn from(kind: StmtKind) -> Self {
        Stmt { kind, span: None }
    }
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Stmt::from(kind)
    }

    #[must_use]
    pub fn at(mut self, line: u32, column: u32) -> Self {
        self.span = Some(Span::new(line, column));
        self
    }

    pub fn expr(expr: Expr) -> Self {
        Stmt::new(StmtKind::Expr(expr))
    }

    pub fn assign(name: &str, value: Expr) -> Self {
        Stmt::new(StmtKind::Assign {
            name: Name::from(name),
            value,
        })
    }

    pub fn if_else(condition: Expr, then_block: Block, else_block: Option<Block>) -> Self {
        Stmt::new(StmtKind::If(IfStmt {
            condition,
            then_block,
            elif_blocks: Vec::new(),
            else_block,
        }))
    }

    pub fn while_loop(condition: Expr, body: Block) -> Self {
        Stmt::new(StmtKind::While { condition, body })
    }

    pub fn for_range(var: &str, start: Expr, end: Expr, step: Option<Expr>, body: Block) -> Self {
        Stmt::new(StmtKind::For(ForStmt {
            var: Name::from(var),
            start,
            end,
            step,
            body,
        }))
    }

    pub fn parallel_for(
        var: &str,
        start: Expr,
        end: Expr,
        step: Option<Expr>,
        body: Block,
    ) -> Self {
        Stmt::new(StmtKind::ParallelFor(ForStmt {
            var: Name::from(var),
            start,
            end,
            step,
            body,
        }))
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::new(StmtKind::Return(value))
    }

    pub fn brk() -> Self {
        Stmt::new(StmtKind::Break)
    }

    pub fn cont() -> Self {
        Stmt::new(StmtKind::Continue)
    }

    pub fn function(name: &str, params: &[&str], body: Block) -> Self {
        Stmt::new(StmtKind::FunctionDef(Arc::new(Definition::new(
            name, params, body,
        ))))
    }

    pub fn import(path: &str) -> Self {
        Stmt::new(StmtKind::Import(ImportStmt {
            path: path.to_string(),
            kind: ImportKind::All,
        }))
    }

    pub fn import_as(path: &str, alias: &str) -> Self {
        Stmt::new(StmtKind::Import(ImportStmt {
            path: path.to_string(),
            kind: ImportKind::Namespace(Name::from(alias)),
        }))
    }

    pub fn import_names(path: &str, names: &[&str]) -> Self {
        Stmt::new(StmtKind::Import(ImportStmt {
            path: path.to_string(),
            kind: ImportKind::Selected(names.iter().map(|n| Name::from(*n)).collect()),
        }))
    }

    pub fn macro_def(name: &str, params: &[&str], body: Block) -> Self {
        Stmt::new(StmtKind::MacroDef(Arc::new(Definition::new(
            name, params, body,
        ))))
    }
}
