//! Expression evaluation.

use nds_ir::{BinaryOp, Expr};

use super::Interpreter;
use crate::errors::EvalResult;
use crate::operators;
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

impl Interpreter {
    pub fn eval_expr(&mut self, expr: &Expr) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_inner(expr))
    }

    fn eval_inner(&mut self, expr: &Expr) -> EvalResult {
        match expr {
            Expr::None => Ok(Value::None),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Int(n) => Ok(Value::Int(*n)),
            Expr::Float(x) => Ok(Value::Float(*x)),
            Expr::Str(s) => Ok(Value::Str(s.clone())),
            Expr::Ident(name) => self.env.get(name),
            Expr::Unary { op, operand } => {
                let operand = self.eval_expr(operand)?;
                operators::unary(*op, &operand)
            }
            // Short-circuit: the right operand is only evaluated when needed.
            Expr::Binary {
                op: BinaryOp::And,
                left,
                right,
            } => {
                let left = self.eval_expr(left)?;
                if left.is_truthy() {
                    self.eval_expr(right)
                } else {
                    Ok(left)
                }
            }
            Expr::Binary {
                op: BinaryOp::Or,
                left,
                right,
            } => {
                let left = self.eval_expr(left)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval_expr(right)
                }
            }
            Expr::Binary { op, left, right } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                operators::binary(*op, &left, &right)
            }
            Expr::Compare { op, left, right } => {
                let left = self.eval_expr(left)?;
                let right = self.eval_expr(right)?;
                operators::compare(*op, &left, &right)
            }
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval_expr(arg))
                    .collect::<EvalResult<Vec<_>>>()?;
                self.call_function(name, args)
            }
        }
    }
}
