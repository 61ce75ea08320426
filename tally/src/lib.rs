//! Tally - sandboxed formulas for computed collection fields
//!
//! A formula such as `IF({stock} > 0, {price} * {qty}, 0)` is tokenized,
//! parsed into a closed AST, checked, and evaluated against one record.
//! Nothing in the grammar reaches outside the record: there is no member
//! access, no indexing, and the only callable names are `SUM`, `AVERAGE`
//! and `IF`.

mod ast;
mod compute;
mod config;
mod eval;
mod functions;
mod lexer;
mod parser;
mod resolve;
mod validate;

pub use ast::{BinaryOp, Expr, UnaryOp};
pub use compute::{dependency_order, to_record_value};
pub use config::{ConfigError, EngineConfig};
pub use eval::{Evaluator, Scope};
pub use functions::{lower, Function, FunctionMeta};
pub use lexer::{check_characters, tokenize, Lexer, Operator, Token, TokenKind};
pub use parser::{parse, Parser};
pub use resolve::{build_scope, field_references, placeholder, resolve_value, substitute};
pub use validate::{check, validate, validate_source, RESERVED_IDENTIFIERS};

use std::collections::HashSet;
use std::sync::Arc;
use tally_core::{FormulaError, FormulaValue, RecordData, ValidationResult};
use tally_fields::{FieldDefinition, FieldRef, FieldTypeRegistry, ProcessContext, WriteMode};
use tracing::{debug, warn};

/// Main Tally engine
pub struct FormulaEngine {
    registry: Arc<FieldTypeRegistry>,
    config: EngineConfig,
}

impl FormulaEngine {
    pub fn new(registry: FieldTypeRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            config: EngineConfig::default(),
        }
    }

    pub fn with_standard_hooks() -> Self {
        Self::new(tally_std::standard_registry())
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &FieldTypeRegistry {
        &self.registry
    }

    fn evaluator(&self) -> Evaluator {
        Evaluator::from_config(&self.config)
    }

    // ========== Formula fields ==========

    /// Evaluate a formula field against a record. Never fails: any error is
    /// logged and the result is `Null`.
    pub fn evaluate_formula(&self, formula: &str, data: &RecordData, collection_id: &str) -> FormulaValue {
        match self.try_evaluate_formula(formula, data) {
            Ok(value) => {
                debug!(collection_id, %value, "formula evaluated");
                value
            }
            Err(e) => {
                warn!(
                    formula,
                    collection_id,
                    code = e.code(),
                    error = %e,
                    "formula evaluation failed; storing null"
                );
                FormulaValue::Null
            }
        }
    }

    /// Strict form of `evaluate_formula`. Only `{field}` references are
    /// bound; a bare identifier is unknown.
    pub fn try_evaluate_formula(&self, formula: &str, data: &RecordData) -> Result<FormulaValue, FormulaError> {
        let ast = parse(formula, &self.config)?;
        let names = ast.field_refs();
        let allowed: HashSet<String> = names.iter().cloned().collect();
        validate::ensure_valid(&ast, &allowed)?;
        let scope = build_scope(&names, data);
        self.evaluator().evaluate(&lower(ast)?, &scope)
    }

    /// Check a formula against the fields it may reference, without running it
    pub fn validate_formula(&self, formula: &str, available_fields: &[FieldRef]) -> ValidationResult {
        let mut result = ValidationResult::valid();
        for name in field_references(formula) {
            if !available_fields.iter().any(|f| f.name == name) {
                result.push(format!("Field '{}' does not exist", name));
            }
            // Placeholders hide the name from the structural walk below
            if validate::is_reserved(&name) {
                result.push(validate::reserved_error(&name).to_string());
            }
        }

        // Character problems are reported against the original text
        let characters = check_characters(formula);
        if !characters.is_empty() {
            for e in characters {
                result.push(e.to_string());
            }
            return result;
        }

        let substituted = substitute(formula, &resolve::placeholder_record(available_fields));
        result.merge(validate_source(&substituted, &HashSet::new(), &self.config))
    }

    // ========== Expressions ==========

    /// Evaluate a bare expression. Identifiers resolve only through `scope`.
    pub fn safe_evaluate(&self, expression: &str, scope: Option<&Scope>) -> Result<FormulaValue, FormulaError> {
        let empty = Scope::new();
        let scope = scope.unwrap_or(&empty);
        let allowed: HashSet<String> = scope.names().cloned().collect();
        let ast = validate::checked_parse(expression, &allowed, &self.config)?;
        self.evaluator().evaluate(&lower(ast)?, scope)
    }

    pub fn validate_expression(&self, expression: &str, identifiers: &[String]) -> ValidationResult {
        let allowed: HashSet<String> = identifiers.iter().cloned().collect();
        validate_source(expression, &allowed, &self.config)
    }

    // ========== Records ==========

    /// Auto-field hooks for a batch, then formula fields record by record
    pub fn process_records(
        &self,
        records: &mut [RecordData],
        fields: &[FieldDefinition],
        mode: WriteMode,
        ctx: &mut ProcessContext,
        collection_id: &str,
    ) {
        self.registry.process_records(records, fields, mode, ctx);
        for record in records.iter_mut() {
            self.compute_formula_fields(record, fields, collection_id);
        }
    }
}

impl Default for FormulaEngine {
    fn default() -> Self {
        Self::with_standard_hooks()
    }
}

// ============================================================================
// Free functions over a default engine
// ============================================================================

pub fn evaluate_formula(formula: &str, data: &RecordData, collection_id: &str) -> FormulaValue {
    FormulaEngine::default().evaluate_formula(formula, data, collection_id)
}

pub fn validate_formula(formula: &str, available_fields: &[FieldRef]) -> ValidationResult {
    FormulaEngine::default().validate_formula(formula, available_fields)
}

pub fn safe_evaluate(expression: &str, scope: Option<&Scope>) -> Result<FormulaValue, FormulaError> {
    FormulaEngine::default().safe_evaluate(expression, scope)
}

pub fn validate_expression(expression: &str, identifiers: &[String]) -> ValidationResult {
    FormulaEngine::default().validate_expression(expression, identifiers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::RecordValue;
    use tally_fields::FieldType;

    fn data(pairs: &[(&str, RecordValue)]) -> RecordData {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn refs(pairs: &[(&str, FieldType)]) -> Vec<FieldRef> {
        pairs.iter().map(|(n, t)| FieldRef::new(*n, *t)).collect()
    }

    mod evaluate_tests {
        use super::*;

        #[test]
        fn test_sum_and_average_over_record() {
            let record = data(&[
                ("a", RecordValue::Number(10.0)),
                ("b", RecordValue::Number(20.0)),
                ("c", RecordValue::Number(30.0)),
            ]);
            assert_eq!(evaluate_formula("SUM({a},{b},{c})", &record, "c1"), FormulaValue::Number(60.0));
            assert_eq!(evaluate_formula("AVERAGE({a},{b},{c})", &record, "c1"), FormulaValue::Number(20.0));
        }

        #[test]
        fn test_missing_field_reads_zero() {
            assert_eq!(evaluate_formula("{missing} * 2", &RecordData::new(), "c1"), FormulaValue::Number(0.0));
        }

        #[test]
        fn test_errors_degrade_to_null() {
            let record = data(&[("name", RecordValue::from("Ada"))]);
            assert_eq!(evaluate_formula("{name} * 2", &record, "c1"), FormulaValue::Null);
            assert_eq!(evaluate_formula("1 / 0", &record, "c1"), FormulaValue::Null);
            assert_eq!(evaluate_formula("alert(1)", &record, "c1"), FormulaValue::Null);
            assert_eq!(evaluate_formula("bare + 1", &record, "c1"), FormulaValue::Null);
            assert_eq!(evaluate_formula("", &record, "c1"), FormulaValue::Null);
        }

        #[test]
        fn test_text_and_conditionals() {
            let record = data(&[
                ("stock", RecordValue::Number(0.0)),
                ("tier", RecordValue::from("gold")),
            ]);
            assert_eq!(
                evaluate_formula("IF({stock} > 0, \"in stock\", \"sold out\")", &record, "c1"),
                FormulaValue::from("sold out")
            );
            assert_eq!(
                evaluate_formula("{tier} === \"gold\" && {stock} === 0", &record, "c1"),
                FormulaValue::Bool(true)
            );
        }

        #[test]
        fn test_strict_variant_reports_error() {
            let engine = FormulaEngine::default();
            assert_eq!(
                engine.try_evaluate_formula("1 % 0", &RecordData::new()),
                Err(FormulaError::DivisionByZero)
            );
        }

        #[test]
        fn test_long_flat_chain() {
            let source = vec!["{a}"; 200].join(" + ");
            let record = data(&[("a", RecordValue::Number(1.0))]);
            assert_eq!(evaluate_formula(&source, &record, "c1"), FormulaValue::Number(200.0));
        }

        #[test]
        fn test_config_applies() {
            let engine = FormulaEngine::default().with_config(EngineConfig::default().with_max_length(8));
            let err = engine.try_evaluate_formula("1 + 2 + 3 + 4", &RecordData::new()).unwrap_err();
            assert_eq!(err.code(), tally_core::codes::LIMIT_EXCEEDED);
        }
    }

    mod validate_formula_tests {
        use super::*;

        #[test]
        fn test_valid_formula() {
            let fields = refs(&[("price", FieldType::Currency), ("quantity", FieldType::Number)]);
            let result = validate_formula("{price} * {quantity}", &fields);
            assert!(result.is_valid, "{:?}", result.errors);
        }

        #[test]
        fn test_unknown_field() {
            let fields = refs(&[("price", FieldType::Currency)]);
            let result = validate_formula("{price} * {qty}", &fields);
            assert_eq!(result.errors, vec!["Field 'qty' does not exist".to_string()]);
        }

        #[test]
        fn test_mismatched_braces_and_semicolons() {
            let fields = refs(&[("price", FieldType::Currency), ("quantity", FieldType::Number)]);
            assert!(!validate_formula("{price * {quantity}", &fields).is_valid);
            let semi = validate_formula("{price}; {quantity}", &fields);
            assert_eq!(
                semi.errors,
                vec!["Security violation: Disallowed character ';' at index 7".to_string()]
            );
        }

        #[test]
        fn test_reserved_field_name_fails_like_evaluation() {
            let fields = refs(&[("process", FieldType::Number)]);
            let result = validate_formula("{process} * 2", &fields);
            assert_eq!(
                result.errors,
                vec!["Security violation: Access to 'process' is not allowed".to_string()]
            );

            let record = data(&[("process", RecordValue::Number(2.0))]);
            let err = FormulaEngine::default().try_evaluate_formula("{process} * 2", &record).unwrap_err();
            assert!(err.is_security_violation());
        }

        #[test]
        fn test_text_fields_validate() {
            let fields = refs(&[("first", FieldType::Text), ("last", FieldType::Text)]);
            assert!(validate_formula("{first} === {last}", &fields).is_valid);
        }

        #[test]
        fn test_validation_is_repeatable() {
            let fields = refs(&[("a", FieldType::Number)]);
            let first = validate_formula("{a} + {b} * (", &fields);
            let second = validate_formula("{a} + {b} * (", &fields);
            assert!(!first.is_valid);
            assert_eq!(first, second);
        }
    }

    mod expression_tests {
        use super::*;

        #[test]
        fn test_safe_evaluate_literals() {
            assert_eq!(safe_evaluate("2 + 3 * 4", None), Ok(FormulaValue::Number(14.0)));
        }

        #[test]
        fn test_safe_evaluate_scope() {
            let scope = Scope::new().with("rate", 0.5).with("base", 10.0);
            assert_eq!(safe_evaluate("base * rate", Some(&scope)), Ok(FormulaValue::Number(5.0)));
            assert_eq!(
                safe_evaluate("base * other", Some(&scope)),
                Err(FormulaError::UnknownIdentifier("other".to_string()))
            );
        }

        #[test]
        fn test_validate_expression() {
            let result = validate_expression("a + unknownVar", &["a".to_string()]);
            assert!(!result.is_valid);
            assert!(result.errors.contains(&"Unknown identifier: unknownVar".to_string()));
            assert!(validate_expression("a * 2", &["a".to_string()]).is_valid);
        }
    }

    #[test]
    fn test_process_records_computes_formulas() {
        let engine = FormulaEngine::default();
        let fields = vec![
            FieldDefinition::new("n", FieldType::AutoIncrement),
            FieldDefinition::new("qty", FieldType::Number),
            FieldDefinition::formula("label", "{n} * 100 + {qty}"),
        ];
        let mut records = vec![
            data(&[("qty", RecordValue::Number(5.0))]),
            data(&[("qty", RecordValue::Number(7.0))]),
        ];
        let mut ctx = ProcessContext::now().with_sequence_start(1);
        engine.process_records(&mut records, &fields, WriteMode::Create, &mut ctx, "items");
        assert_eq!(records[0]["label"], RecordValue::Number(105.0));
        assert_eq!(records[1]["label"], RecordValue::Number(207.0));
    }
}
