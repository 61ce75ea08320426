//! Evaluator

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::config::{EngineConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_TOKENS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_core::{FormulaError, FormulaValue};
use tracing::trace;

/// Identifier bindings for one evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(BTreeMap<String, FormulaValue>);

impl Scope {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<FormulaValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: FormulaValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&FormulaValue> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<BTreeMap<String, FormulaValue>> for Scope {
    fn from(map: BTreeMap<String, FormulaValue>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>> FromIterator<(K, FormulaValue)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, FormulaValue)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Tree-walking evaluator
pub struct Evaluator {
    max_depth: usize,
}

/// A flat chain like `1 + 1 + ... + 1` parses shallow but builds a tall
/// tree, so evaluation depth is bounded by the token budget plus the nesting
/// limit. Lowering adds at most one level per call.
fn depth_bound(max_tokens: usize, max_depth: usize) -> usize {
    max_tokens.saturating_add(max_depth)
}

impl Evaluator {
    pub fn new() -> Self {
        Self {
            max_depth: depth_bound(DEFAULT_MAX_TOKENS, DEFAULT_MAX_DEPTH),
        }
    }

    /// Depth bound matching what `parse` accepts under `config`
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            max_depth: depth_bound(config.max_tokens, config.max_depth),
        }
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Evaluate a tree against a scope. `Call` nodes are lowered on the way.
    pub fn evaluate(&self, expr: &Expr, scope: &Scope) -> Result<FormulaValue, FormulaError> {
        let value = self.eval_expr(expr, scope, 0)?;
        trace!(result = %value, "evaluated");
        Ok(value)
    }

    fn eval_expr(&self, expr: &Expr, scope: &Scope, depth: usize) -> Result<FormulaValue, FormulaError> {
        if depth > self.max_depth {
            return Err(FormulaError::limit(format!(
                "evaluation deeper than {} levels",
                self.max_depth
            )));
        }
        let depth = depth + 1;

        match expr {
            Expr::Number(n) => Ok(FormulaValue::Number(*n)),
            Expr::Text(s) => Ok(FormulaValue::Text(s.clone())),
            Expr::Bool(b) => Ok(FormulaValue::Bool(*b)),
            Expr::Identifier(name) | Expr::FieldRef(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| FormulaError::UnknownIdentifier(name.clone())),

            Expr::Unary { op, operand } => {
                let value = self.eval_expr(operand, scope, depth)?;
                match op {
                    UnaryOp::Neg => Ok(FormulaValue::Number(-value.to_number()?)),
                    UnaryOp::Not => Ok(FormulaValue::Bool(!value.is_truthy())),
                }
            }

            Expr::Binary { op: BinaryOp::And, left, right } => {
                let l = self.eval_expr(left, scope, depth)?;
                if !l.is_truthy() {
                    return Ok(FormulaValue::Bool(false));
                }
                Ok(FormulaValue::Bool(self.eval_expr(right, scope, depth)?.is_truthy()))
            }

            Expr::Binary { op: BinaryOp::Or, left, right } => {
                let l = self.eval_expr(left, scope, depth)?;
                if l.is_truthy() {
                    return Ok(FormulaValue::Bool(true));
                }
                Ok(FormulaValue::Bool(self.eval_expr(right, scope, depth)?.is_truthy()))
            }

            Expr::Binary { op, left, right } => {
                let l = self.eval_expr(left, scope, depth)?;
                let r = self.eval_expr(right, scope, depth)?;
                eval_binary(*op, &l, &r)
            }

            Expr::Conditional { condition, then, otherwise } => {
                if self.eval_expr(condition, scope, depth)?.is_truthy() {
                    self.eval_expr(then, scope, depth)
                } else {
                    self.eval_expr(otherwise, scope, depth)
                }
            }

            Expr::Call { function, args } => {
                let lowered = function.lower_call(args.clone())?;
                self.eval_expr(&lowered, scope, depth)
            }
        }
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

fn eval_binary(op: BinaryOp, l: &FormulaValue, r: &FormulaValue) -> Result<FormulaValue, FormulaError> {
    use FormulaValue::{Bool, Number, Text};

    match op {
        BinaryOp::StrictEq => return Ok(Bool(l.strict_eq(r))),
        BinaryOp::StrictNe => return Ok(Bool(!l.strict_eq(r))),
        BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge => {
            if let (Text(a), Text(b)) = (l, r) {
                return Ok(Bool(compare(op, a.as_str().cmp(b.as_str()))));
            }
            let (a, b) = (l.to_number()?, r.to_number()?);
            return Ok(Bool(match a.partial_cmp(&b) {
                Some(ordering) => compare(op, ordering),
                // NaN compares false both ways
                None => false,
            }));
        }
        _ => {}
    }

    let (a, b) = (l.to_number()?, r.to_number()?);
    let n = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div if b == 0.0 => return Err(FormulaError::DivisionByZero),
        BinaryOp::Div => a / b,
        BinaryOp::Mod if b == 0.0 => return Err(FormulaError::DivisionByZero),
        BinaryOp::Mod => a % b,
        _ => return Err(FormulaError::type_error("arithmetic operator", "logical operator")),
    };
    Ok(Number(n))
}

fn compare(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::{Equal, Greater, Less};
    matches!(
        (op, ordering),
        (BinaryOp::Lt, Less)
            | (BinaryOp::Le, Less | Equal)
            | (BinaryOp::Gt, Greater)
            | (BinaryOp::Ge, Greater | Equal)
    )
}
