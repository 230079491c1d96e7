//! ND-Script IR - syntax tree types
//!
//! This crate holds the data structures shared between a front end and the
//! evaluator in `nds_eval`:
//! - [`Span`] for line/column positions
//! - the statement and expression tree ([`Program`], [`Stmt`], [`Expr`])
//! - function and macro [`Definition`]s
//! - a `Display` renderer that turns trees back into source text

pub mod ast;
mod render;
mod span;

pub use ast::{
    BinaryOp, Block, CompareOp, Definition, Expr, ForStmt, IfStmt, ImportKind, ImportStmt, Name,
    Program, Stmt, StmtKind, UnaryOp,
};
pub use render::render_block;
pub use span::Span;
