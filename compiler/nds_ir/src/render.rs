//! Surface-syntax rendering of the tree.
//!
//! `Display` on [`Expr`], [`Stmt`] and [`Program`] produces source text that
//! a front end would parse back to the same tree. Expressions only get
//! parentheses where precedence requires them.

use std::fmt::{self, Write};

use crate::ast::{
    Block, Definition, Expr, ForStmt, ImportKind, Program, Stmt, StmtKind, UnaryOp,
};

const INDENT: &str = "    ";

/// Precedence of an expression node; atoms bind tightest.
fn expr_precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Binary { op, .. } => op.precedence(),
        Expr::Compare { .. } => 3,
        Expr::Unary {
            op: UnaryOp::Not, ..
        } => 2,
        Expr::Unary {
            op: UnaryOp::Neg, ..
        } => 6,
        _ => 7,
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_precedence: u8) -> fmt::Result {
    if expr_precedence(expr) < min_precedence {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

fn write_infix(
    f: &mut fmt::Formatter<'_>,
    symbol: &str,
    precedence: u8,
    left: &Expr,
    right: &Expr,
) -> fmt::Result {
    // Left-associative: the right operand needs parentheses at equal precedence.
    write_operand(f, left, precedence)?;
    write!(f, " {symbol} ")?;
    write_operand(f, right, precedence + 1)
}

pub(crate) fn write_string_literal(out: &mut impl Write, text: &str) -> fmt::Result {
    out.write_char('"')?;
    for c in text.chars() {
        match c {
            '"' => out.write_str("\\\"")?,
            '\\' => out.write_str("\\\\")?,
            '\n' => out.write_str("\\n")?,
            '\t' => out.write_str("\\t")?,
            c => out.write_char(c)?,
        }
    }
    out.write_char('"')
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::None => f.write_str("none"),
            Expr::Bool(true) => f.write_str("true"),
            Expr::Bool(false) => f.write_str("false"),
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Float(x) => write!(f, "{x:?}"),
            Expr::Str(s) => write_string_literal(f, s),
            Expr::Ident(name) => f.write_str(name),
            Expr::Unary { op, operand } => {
                f.write_str(op.as_symbol())?;
                write_operand(f, operand, expr_precedence(self) + 1)
            }
            Expr::Binary { op, left, right } => {
                write_infix(f, op.as_symbol(), op.precedence(), left, right)
            }
            Expr::Compare { op, left, right } => write_infix(f, op.as_symbol(), 3, left, right),
            Expr::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_char(')')
            }
        }
    }
}

/// Statement writer that tracks indentation.
struct BlockWriter<'a, W: Write> {
    out: &'a mut W,
    depth: usize,
}

impl<W: Write> BlockWriter<'_, W> {
    fn indent(&mut self) -> fmt::Result {
        for _ in 0..self.depth {
            self.out.write_str(INDENT)?;
        }
        Ok(())
    }

    fn block(&mut self, block: &Block) -> fmt::Result {
        self.out.write_str("{\n")?;
        self.depth += 1;
        for stmt in block {
            self.stmt(stmt)?;
        }
        self.depth -= 1;
        self.indent()?;
        self.out.write_char('}')
    }

    fn range(&mut self, keyword: &str, node: &ForStmt) -> fmt::Result {
        write!(
            self.out,
            "{keyword} {} in range({}, {}",
            node.var, node.start, node.end
        )?;
        if let Some(step) = &node.step {
            write!(self.out, ", {step}")?;
        }
        self.out.write_str("): ")?;
        self.block(&node.body)
    }

    fn definition(&mut self, keyword: &str, def: &Definition) -> fmt::Result {
        write!(self.out, "{keyword} {}(", def.name)?;
        for (i, param) in def.params.iter().enumerate() {
            if i > 0 {
                self.out.write_str(", ")?;
            }
            self.out.write_str(param)?;
        }
        self.out.write_str("): ")?;
        self.block(&def.body)
    }

    fn stmt(&mut self, stmt: &Stmt) -> fmt::Result {
        self.indent()?;
        self.stmt_inline(stmt)?;
        self.out.write_char('\n')
    }

    fn stmt_inline(&mut self, stmt: &Stmt) -> fmt::Result {
        match &stmt.kind {
            StmtKind::Expr(expr) => write!(self.out, "{expr}"),
            StmtKind::Assign { name, value } => write!(self.out, "{name} = {value}"),
            StmtKind::If(node) => {
                write!(self.out, "if {}: ", node.condition)?;
                self.block(&node.then_block)?;
                for (condition, block) in &node.elif_blocks {
                    write!(self.out, " elif {condition}: ")?;
                    self.block(block)?;
                }
                if let Some(block) = &node.else_block {
                    self.out.write_str(" else: ")?;
                    self.block(block)?;
                }
                Ok(())
            }
            StmtKind::While { condition, body } => {
                write!(self.out, "while {condition}: ")?;
                self.block(body)
            }
            StmtKind::For(node) => self.range("for", node),
            StmtKind::ParallelFor(node) => self.range("parallel for", node),
            StmtKind::Break => self.out.write_str("break"),
            StmtKind::Continue => self.out.write_str("continue"),
            StmtKind::Return(None) => self.out.write_str("return"),
            StmtKind::Return(Some(value)) => write!(self.out, "return {value}"),
            StmtKind::FunctionDef(def) => self.definition("function", def),
            StmtKind::MacroDef(def) => self.definition("macro", def),
            StmtKind::Debug { message } => {
                self.out.write_str("debug")?;
                if let Some(message) = message {
                    self.out.write_char(' ')?;
                    write_string_literal(self.out, message)?;
                }
                Ok(())
            }
            StmtKind::Profile { label, body } => {
                self.out.write_str("profile")?;
                if let Some(label) = label {
                    self.out.write_char(' ')?;
                    write_string_literal(self.out, label)?;
                }
                self.out.write_str(": ")?;
                self.block(body)
            }
            StmtKind::Init { size: None } => self.out.write_str("init"),
            StmtKind::Init { size: Some(size) } => write!(self.out, "init size = {size}"),
            StmtKind::Evolve { steps: None } => self.out.write_str("evolve"),
            StmtKind::Evolve { steps: Some(steps) } => write!(self.out, "evolve {steps}"),
            StmtKind::Show { target } => write!(self.out, "show {target}"),
            StmtKind::SetParameter { name, value } => write!(self.out, "set {name} = {value}"),
            StmtKind::Save { path } => write!(self.out, "save {path}"),
            StmtKind::Load { path } => write!(self.out, "load {path}"),
            StmtKind::Exit => self.out.write_str("exit"),
            StmtKind::Import(import) => {
                let keyword = if matches!(import.kind, ImportKind::Selected(_)) {
                    "from "
                } else {
                    "import "
                };
                self.out.write_str(keyword)?;
                write_string_literal(self.out, &import.path)?;
                match &import.kind {
                    ImportKind::All => Ok(()),
                    ImportKind::Namespace(alias) => write!(self.out, " as {alias}"),
                    ImportKind::Selected(names) => {
                        self.out.write_str(" import ")?;
                        for (i, name) in names.iter().enumerate() {
                            if i > 0 {
                                self.out.write_str(", ")?;
                            }
                            self.out.write_str(name)?;
                        }
                        Ok(())
                    }
                }
            }
        }
    }
}

impl fmt::Display for Stmt {
    /// Renders a single statement without a trailing newline.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        BlockWriter { out: f, depth: 0 }.stmt_inline(self)
    }
}

/// Renders a block as newline-separated statements at the given depth.
pub fn render_block(block: &Block, depth: usize) -> String {
    let mut out = String::new();
    let mut writer = BlockWriter {
        out: &mut out,
        depth,
    };
    for stmt in block {
        // Writing into a String cannot fail.
        let _ = writer.stmt(stmt);
    }
    out
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render_block(&self.statements, 0))
    }
}

impl Definition {
    /// Body source text used for textual macro expansion.
    ///
    /// A single-expression body renders as the bare expression; anything
    /// else renders as newline-separated statements.
    pub fn body_source(&self) -> String {
        match self.body_expr() {
            Some(expr) => expr.to_string(),
            None => render_block(&self.body, 0).trim_end().to_owned(),
        }
    }
}
