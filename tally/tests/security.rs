//! Sandbox escape attempts
//!
//! Every expression here reaches for something outside the record: host
//! objects, member access, indexing, or invocation. Each must fail
//! validation and raise a security violation when evaluated.

use tally::{safe_evaluate, validate_expression, validate_formula, evaluate_formula, Scope};
use tally_core::{FormulaError, FormulaValue, RecordData, RecordValue};
use tally_fields::{FieldRef, FieldType};

const ESCAPES: &[&str] = &[
    "Math.max(1,2)",
    "alert(\"x\")",
    "constructor.constructor(\"return process\")()",
    "process.exit()",
    "obj.prop",
    "obj[\"prop\"]",
    "require(\"fs\")",
    "Function(\"return 1\")",
    "__proto__",
    "constructor",
    "this",
    "globalThis",
    "eval(\"1\")",
    "(1)(2)",
    "a ? b : c",
    "`whoami`",
    "x = 1",
    "a; b",
    "'single'",
    "1 .toString()",
    "{price}.valueOf()",
    "SUM(1)(2)",
    "new Date()",
    "import(\"x\")",
    "$",
    "a\\u0028",
];

fn all_identifiers() -> Vec<String> {
    ["Math", "obj", "a", "b", "c", "x", "price", "new", "Date", "whoami", "single"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[test]
fn test_escapes_fail_validation() {
    for source in ESCAPES {
        let result = validate_expression(source, &all_identifiers());
        assert!(!result.is_valid, "{} passed validation", source);
    }
}

#[test]
fn test_escapes_raise_security_violation() {
    let scope: Scope = all_identifiers()
        .into_iter()
        .map(|name| (name, FormulaValue::Number(1.0)))
        .collect();
    let attempts = [
        "Math.max(1,2)",
        "alert(\"x\")",
        "constructor.constructor(\"return process\")()",
        "process.exit()",
        "obj.prop",
        "obj[\"prop\"]",
        "require(\"fs\")",
        "__proto__",
        "constructor",
        "(1)(2)",
        "a ? b : c",
        "`whoami`",
        "a; b",
    ];
    for source in attempts {
        match safe_evaluate(source, Some(&scope)) {
            Err(FormulaError::SecurityViolation(_)) => {}
            other => panic!("{} gave {:?}", source, other),
        }
    }
}

#[test]
fn test_reserved_names_fail_even_in_scope() {
    let scope = Scope::new()
        .with("constructor", 1.0)
        .with("process", 1.0)
        .with("prototype", 1.0);
    for name in ["constructor", "process", "prototype"] {
        let err = safe_evaluate(name, Some(&scope)).unwrap_err();
        assert!(err.is_security_violation(), "{} gave {:?}", name, err);
    }
    let allowed = vec!["constructor".to_string()];
    assert!(!validate_expression("constructor", &allowed).is_valid);
}

#[test]
fn test_formula_escapes_store_null() {
    let record: RecordData = [("price".to_string(), RecordValue::Number(3.0))].into_iter().collect();
    for source in ["{price}.constructor", "{price}[0]", "alert({price})", "{price}(1)"] {
        assert_eq!(evaluate_formula(source, &record, "sec"), FormulaValue::Null, "{}", source);
    }
}

#[test]
fn test_field_names_cannot_smuggle_code() {
    let fields = vec![FieldRef::new("price", FieldType::Number)];
    for source in ["{price;alert(1)}", "{price}.x", "{pri`ce}", "{price\"}"] {
        assert!(!validate_formula(source, &fields).is_valid, "{} passed", source);
    }
}

#[test]
fn test_string_contents_are_inert() {
    let result = safe_evaluate("\"process.exit(); obj[0]\" === \"x\"", None);
    assert_eq!(result, Ok(FormulaValue::Bool(false)));
}
