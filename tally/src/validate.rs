//! AST validation
//!
//! A parsed tree is already free of member access and arbitrary calls; what
//! remains to check is every name it reads. Names must be bound, and a
//! fixed set of host-sensitive names is refused even when bound.

use crate::ast::Expr;
use crate::config::EngineConfig;
use crate::lexer::check_characters;
use crate::parser::parse;
use std::collections::HashSet;
use tally_core::{FormulaError, ValidationResult};

/// Names that never resolve, whatever the scope holds
pub static RESERVED_IDENTIFIERS: [&str; 14] = [
    "constructor",
    "__proto__",
    "prototype",
    "process",
    "require",
    "Function",
    "eval",
    "globalThis",
    "window",
    "this",
    "import",
    "module",
    "exports",
    "global",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_IDENTIFIERS.contains(&name)
}

pub fn reserved_error(name: &str) -> FormulaError {
    FormulaError::security(format!("Access to '{}' is not allowed", name))
}

/// Structural walk, errors in source order
pub fn check(ast: &Expr, allowed: &HashSet<String>) -> Vec<FormulaError> {
    let mut errors = Vec::new();
    ast.walk(&mut |node| {
        let name = match node {
            Expr::Identifier(name) | Expr::FieldRef(name) => name,
            _ => return,
        };
        let error = if is_reserved(name) {
            reserved_error(name)
        } else if !allowed.contains(name) {
            FormulaError::UnknownIdentifier(name.clone())
        } else {
            return;
        };
        if !errors.contains(&error) {
            errors.push(error);
        }
    });
    errors
}

pub fn validate(ast: &Expr, allowed: &HashSet<String>) -> ValidationResult {
    ValidationResult::from_errors(check(ast, allowed).iter().map(|e| e.to_string()).collect())
}

/// Validate raw source: every disallowed character, then the parse, then
/// the structural walk
pub fn validate_source(source: &str, allowed: &HashSet<String>, config: &EngineConfig) -> ValidationResult {
    let mut errors: Vec<String> = check_characters(source).iter().map(|e| e.to_string()).collect();
    match parse(source, config) {
        Ok(ast) => errors.extend(check(&ast, allowed).iter().map(|e| e.to_string())),
        Err(e) => errors.push(e.to_string()),
    }
    ValidationResult::from_errors(errors)
}

/// The walk's verdict as a single error. A security violation is reported
/// ahead of any other problem.
pub fn ensure_valid(ast: &Expr, allowed: &HashSet<String>) -> Result<(), FormulaError> {
    let errors = check(ast, allowed);
    match errors.iter().find(|e| e.is_security_violation()).or(errors.first()) {
        Some(e) => Err(e.clone()),
        None => Ok(()),
    }
}

/// Parse and check, ready for evaluation
pub fn checked_parse(source: &str, allowed: &HashSet<String>, config: &EngineConfig) -> Result<Expr, FormulaError> {
    let ast = parse(source, config)?;
    ensure_valid(&ast, allowed)?;
    Ok(ast)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn source(s: &str, names: &[&str]) -> ValidationResult {
        validate_source(s, &allowed(names), &EngineConfig::default())
    }

    #[test]
    fn test_unknown_identifier() {
        let result = source("a + unknownVar", &["a"]);
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["Unknown identifier: unknownVar".to_string()]);
    }

    #[test]
    fn test_reserved_even_when_allowed() {
        let result = source("constructor + 1", &["constructor"]);
        assert!(!result.is_valid);
        assert!(result.errors[0].starts_with("Security violation"));
        assert!(!source("{__proto__}", &["__proto__"]).is_valid);
    }

    #[test]
    fn test_all_character_errors_reported() {
        let result = source("a; b; c", &["a", "b", "c"]);
        assert_eq!(
            result.errors,
            vec![
                "Security violation: Disallowed character ';' at index 1".to_string(),
                "Security violation: Disallowed character ';' at index 4".to_string(),
            ]
        );
    }

    #[test]
    fn test_errors_deduplicated_in_order() {
        let result = source("x + y + x", &[]);
        assert_eq!(
            result.errors,
            vec!["Unknown identifier: x".to_string(), "Unknown identifier: y".to_string()]
        );
    }

    #[test]
    fn test_repeatable() {
        let first = source("{price * {quantity}", &["price", "quantity"]);
        let second = source("{price * {quantity}", &["price", "quantity"]);
        assert!(!first.is_valid);
        assert_eq!(first, second);
    }

    #[test]
    fn test_checked_parse_prefers_security() {
        let err = checked_parse("zzz + eval", &allowed(&[]), &EngineConfig::default()).unwrap_err();
        assert!(err.is_security_violation());
        let err = checked_parse("zzz", &allowed(&[]), &EngineConfig::default()).unwrap_err();
        assert_eq!(err, FormulaError::UnknownIdentifier("zzz".to_string()));
    }
}
