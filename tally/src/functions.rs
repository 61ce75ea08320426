//! Whitelisted formula functions
//!
//! `SUM`, `AVERAGE` and `IF` are the only callable names. Calls are kept as
//! `Expr::Call` through parsing and validation, then `lower` rewrites them
//! into plain arithmetic and `Conditional` nodes before evaluation.

use crate::ast::{BinaryOp, Expr};
use serde::{Deserialize, Serialize};
use tally_core::FormulaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Function {
    Sum,
    Average,
    If,
}

/// Metadata for a formula function
#[derive(Debug, Clone, Serialize)]
pub struct FunctionMeta {
    pub name: &'static str,
    pub description: &'static str,
    pub usage: &'static str,
    pub returns: &'static str,
    pub examples: &'static [&'static str],
}

static SUM_EXAMPLES: [&str; 2] = ["SUM({a}, {b}, {c})", "SUM()"];
static AVERAGE_EXAMPLES: [&str; 1] = ["AVERAGE({q1}, {q2}, {q3}, {q4})"];
static IF_EXAMPLES: [&str; 1] = ["IF({stock} > 0, \"in stock\", \"sold out\")"];

impl Function {
    pub const ALL: [Function; 3] = [Function::Sum, Function::Average, Function::If];

    /// Case-insensitive lookup; anything not listed is not callable
    pub fn from_name(name: &str) -> Option<Function> {
        Function::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(name))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Function::Sum => "SUM",
            Function::Average => "AVERAGE",
            Function::If => "IF",
        }
    }

    pub fn meta(&self) -> FunctionMeta {
        match self {
            Function::Sum => FunctionMeta {
                name: "SUM",
                description: "Sum of the arguments; no arguments sums to 0",
                usage: "SUM(a, b, ...)",
                returns: "Number",
                examples: &SUM_EXAMPLES,
            },
            Function::Average => FunctionMeta {
                name: "AVERAGE",
                description: "Arithmetic mean of one or more arguments",
                usage: "AVERAGE(a, b, ...)",
                returns: "Number",
                examples: &AVERAGE_EXAMPLES,
            },
            Function::If => FunctionMeta {
                name: "IF",
                description: "Second argument when the first is truthy, third otherwise",
                usage: "IF(condition, then, otherwise)",
                returns: "Any",
                examples: &IF_EXAMPLES,
            },
        }
    }

    pub fn check_arity(&self, got: usize) -> Result<(), FormulaError> {
        let expected = match self {
            Function::Sum => return Ok(()),
            Function::Average if got >= 1 => return Ok(()),
            Function::Average => "at least 1",
            Function::If if got == 3 => return Ok(()),
            Function::If => "3",
        };
        Err(FormulaError::ArgumentCount {
            function: self.name().to_string(),
            expected: expected.to_string(),
            got,
        })
    }

    /// Rewrite one call into primitive nodes. Arguments must already be lowered.
    ///
    /// `SUM(a, b)` → `0 + a + b`, `AVERAGE(a, b)` → `(0 + a + b) / 2`,
    /// `IF(c, t, f)` → `Conditional`.
    pub fn lower_call(&self, args: Vec<Expr>) -> Result<Expr, FormulaError> {
        self.check_arity(args.len())?;
        match self {
            Function::Sum => Ok(sum_of(args)),
            Function::Average => {
                let n = args.len() as f64;
                Ok(Expr::binary(BinaryOp::Div, sum_of(args), Expr::Number(n)))
            }
            Function::If => {
                let mut it = args.into_iter();
                match (it.next(), it.next(), it.next()) {
                    (Some(condition), Some(then), Some(otherwise)) => Ok(Expr::Conditional {
                        condition: Box::new(condition),
                        then: Box::new(then),
                        otherwise: Box::new(otherwise),
                    }),
                    _ => Err(FormulaError::ArgumentCount {
                        function: self.name().to_string(),
                        expected: "3".to_string(),
                        got: 0,
                    }),
                }
            }
        }
    }
}

/// Starts from `0` so every argument goes through numeric coercion
fn sum_of(args: Vec<Expr>) -> Expr {
    args.into_iter()
        .fold(Expr::Number(0.0), |acc, arg| Expr::binary(BinaryOp::Add, acc, arg))
}

/// Replace every `Call` in the tree with its primitive expansion
pub fn lower(expr: Expr) -> Result<Expr, FormulaError> {
    Ok(match expr {
        Expr::Call { function, args } => {
            let args = args.into_iter().map(lower).collect::<Result<Vec<_>, _>>()?;
            function.lower_call(args)?
        }
        Expr::Unary { op, operand } => Expr::unary(op, lower(*operand)?),
        Expr::Binary { op, left, right } => Expr::binary(op, lower(*left)?, lower(*right)?),
        Expr::Conditional { condition, then, otherwise } => Expr::Conditional {
            condition: Box::new(lower(*condition)?),
            then: Box::new(lower(*then)?),
            otherwise: Box::new(lower(*otherwise)?),
        },
        leaf => leaf,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str) -> Expr {
        Expr::FieldRef(name.to_string())
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        assert_eq!(Function::from_name("sum"), Some(Function::Sum));
        assert_eq!(Function::from_name("Average"), Some(Function::Average));
        assert_eq!(Function::from_name("IF"), Some(Function::If));
        assert_eq!(Function::from_name("max"), None);
        assert_eq!(Function::from_name("eval"), None);
    }

    #[test]
    fn test_arity() {
        assert!(Function::Sum.check_arity(0).is_ok());
        assert!(Function::Average.check_arity(1).is_ok());
        let err = Function::Average.check_arity(0).unwrap_err();
        assert_eq!(err.to_string(), "AVERAGE() expects at least 1 arguments, got 0");
        assert!(Function::If.check_arity(2).is_err());
        assert!(Function::If.check_arity(4).is_err());
    }

    #[test]
    fn test_lower_sum_and_average() {
        let sum = Function::Sum.lower_call(vec![field("a"), field("b")]).unwrap();
        assert_eq!(
            sum,
            Expr::binary(
                BinaryOp::Add,
                Expr::binary(BinaryOp::Add, Expr::Number(0.0), field("a")),
                field("b"),
            )
        );
        assert_eq!(Function::Sum.lower_call(vec![]).unwrap(), Expr::Number(0.0));

        let avg = Function::Average.lower_call(vec![field("a"), field("b")]).unwrap();
        match avg {
            Expr::Binary { op: BinaryOp::Div, right, .. } => assert_eq!(*right, Expr::Number(2.0)),
            other => panic!("unexpected lowering: {:?}", other),
        }
    }

    #[test]
    fn test_lower_nested_calls() {
        let call = Expr::Call {
            function: Function::If,
            args: vec![
                Expr::Bool(true),
                Expr::Call { function: Function::Sum, args: vec![Expr::Number(1.0)] },
                Expr::Number(0.0),
            ],
        };
        let lowered = lower(call).unwrap();
        let mut calls = 0;
        lowered.walk(&mut |e| {
            if matches!(e, Expr::Call { .. }) {
                calls += 1;
            }
        });
        assert_eq!(calls, 0);
        assert!(matches!(lowered, Expr::Conditional { .. }));
    }
}
