//! JSON-RPC request handling
//!
//! Every method takes named params and answers with plain JSON. Engine
//! errors from the strict entry points come back as `-32000` with the
//! structured `ErrorReport` in `data`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use tally::{FormulaEngine, Function, Scope};
use tally_core::{FormulaError, FormulaValue, RecordData, RecordValue};
use tally_fields::{FieldDefinition, FieldOptions, FieldRef, FieldType, ProcessContext, WriteMode};
use tracing::debug;

pub const SERVER_NAME: &str = "tally";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const ENGINE_ERROR: i32 = -32000;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: String,
    pub id: Option<JsonValue>,
    pub method: String,
    #[serde(default)]
    pub params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            result: None,
            error: Some(RpcError::new(PARSE_ERROR, format!("Parse error: {}", detail))),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
}

impl RpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }
}

impl From<FormulaError> for RpcError {
    fn from(err: FormulaError) -> Self {
        Self {
            code: ENGINE_ERROR,
            message: err.to_string(),
            data: serde_json::to_value(err.report()).ok(),
        }
    }
}

pub fn handle_request(engine: &FormulaEngine, request: &RpcRequest) -> RpcResponse {
    debug!(method = %request.method, "dispatching request");
    let params = &request.params;
    let result = match request.method.as_str() {
        "ping" => Ok(json!({})),

        // Formulas
        "evaluate" => handle_evaluate(engine, params),
        "validate" => handle_validate(engine, params),
        "safe_evaluate" => handle_safe_evaluate(engine, params),
        "validate_expression" => handle_validate_expression(engine, params),

        // Records
        "compute_record" => handle_compute_record(engine, params),
        "process_records" => handle_process_records(engine, params),

        // Field hooks
        "format_value" => handle_format_value(engine, params),
        "validate_value" => handle_validate_value(engine, params),

        "capabilities" => handle_capabilities(engine),

        _ => Err(RpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", request.method),
        )),
    };

    match result {
        Ok(r) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: Some(r),
            error: None,
        },
        Err(e) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: None,
            error: Some(e),
        },
    }
}

// ============================================================================
// Params
// ============================================================================

fn params_as<T: for<'de> Deserialize<'de>>(params: &Option<JsonValue>) -> Result<T, RpcError> {
    let value = params.clone().unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|e| RpcError::invalid_params(format!("Invalid params: {}", e)))
}

fn record_from_json(json: &serde_json::Map<String, JsonValue>) -> RecordData {
    json.iter()
        .map(|(k, v)| (k.clone(), RecordValue::from_json(v)))
        .collect()
}

fn record_to_json(record: &RecordData) -> JsonValue {
    let map: serde_json::Map<String, JsonValue> = record.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
    JsonValue::Object(map)
}

/// Scope values must be scalars; anything else has no formula meaning
fn scope_from_json(json: &serde_json::Map<String, JsonValue>) -> Result<Scope, RpcError> {
    let mut scope = Scope::new();
    for (name, value) in json {
        let value = match value {
            JsonValue::Null => FormulaValue::Null,
            JsonValue::Bool(b) => FormulaValue::Bool(*b),
            JsonValue::Number(n) => FormulaValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(s) => FormulaValue::Text(s.clone()),
            _ => {
                return Err(RpcError::invalid_params(format!(
                    "Scope value for '{}' must be a number, string, boolean or null",
                    name
                )))
            }
        };
        scope.insert(name.clone(), value);
    }
    Ok(scope)
}

fn default_collection() -> String {
    "default".to_string()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateParams {
    formula: String,
    #[serde(default)]
    record: serde_json::Map<String, JsonValue>,
    #[serde(default = "default_collection")]
    collection_id: String,
}

#[derive(Deserialize)]
struct ValidateParams {
    formula: String,
    #[serde(default)]
    fields: Vec<FieldRef>,
}

#[derive(Deserialize)]
struct SafeEvaluateParams {
    expression: String,
    #[serde(default)]
    scope: Option<serde_json::Map<String, JsonValue>>,
}

#[derive(Deserialize)]
struct ValidateExpressionParams {
    expression: String,
    #[serde(default)]
    identifiers: Vec<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComputeRecordParams {
    record: serde_json::Map<String, JsonValue>,
    fields: Vec<FieldDefinition>,
    #[serde(default = "default_collection")]
    collection_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessRecordsParams {
    records: Vec<serde_json::Map<String, JsonValue>>,
    fields: Vec<FieldDefinition>,
    mode: WriteMode,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    sequence_start: Option<i64>,
    /// RFC 3339; the batch timestamp, defaults to the current time
    #[serde(default)]
    now: Option<DateTime<Utc>>,
    #[serde(default = "default_collection")]
    collection_id: String,
}

#[derive(Deserialize)]
struct FieldValueParams {
    value: JsonValue,
    #[serde(rename = "type")]
    field_type: FieldType,
    #[serde(default)]
    options: FieldOptions,
}

// ============================================================================
// Handlers
// ============================================================================

fn handle_evaluate(engine: &FormulaEngine, params: &Option<JsonValue>) -> Result<JsonValue, RpcError> {
    let p: EvaluateParams = params_as(params)?;
    let record = record_from_json(&p.record);
    let value = engine.evaluate_formula(&p.formula, &record, &p.collection_id);
    Ok(json!({ "value": value.to_json() }))
}

fn handle_validate(engine: &FormulaEngine, params: &Option<JsonValue>) -> Result<JsonValue, RpcError> {
    let p: ValidateParams = params_as(params)?;
    let result = engine.validate_formula(&p.formula, &p.fields);
    serde_json::to_value(result).map_err(|e| RpcError::new(ENGINE_ERROR, e.to_string()))
}

fn handle_safe_evaluate(engine: &FormulaEngine, params: &Option<JsonValue>) -> Result<JsonValue, RpcError> {
    let p: SafeEvaluateParams = params_as(params)?;
    let scope = p.scope.as_ref().map(scope_from_json).transpose()?;
    let value = engine.safe_evaluate(&p.expression, scope.as_ref())?;
    Ok(json!({ "value": value.to_json() }))
}

fn handle_validate_expression(engine: &FormulaEngine, params: &Option<JsonValue>) -> Result<JsonValue, RpcError> {
    let p: ValidateExpressionParams = params_as(params)?;
    let result = engine.validate_expression(&p.expression, &p.identifiers);
    serde_json::to_value(result).map_err(|e| RpcError::new(ENGINE_ERROR, e.to_string()))
}

fn handle_compute_record(engine: &FormulaEngine, params: &Option<JsonValue>) -> Result<JsonValue, RpcError> {
    let p: ComputeRecordParams = params_as(params)?;
    let mut record = record_from_json(&p.record);
    engine.compute_formula_fields(&mut record, &p.fields, &p.collection_id);
    Ok(json!({ "record": record_to_json(&record) }))
}

fn handle_process_records(engine: &FormulaEngine, params: &Option<JsonValue>) -> Result<JsonValue, RpcError> {
    let p: ProcessRecordsParams = params_as(params)?;
    let mut records: Vec<RecordData> = p.records.iter().map(record_from_json).collect();

    let mut ctx = ProcessContext::new(p.now.unwrap_or_else(Utc::now));
    if let Some(user) = p.user_id {
        ctx = ctx.with_user(user);
    }
    if let Some(start) = p.sequence_start {
        ctx = ctx.with_sequence_start(start);
    }

    engine.process_records(&mut records, &p.fields, p.mode, &mut ctx, &p.collection_id);

    let validation: Vec<JsonValue> = records
        .iter()
        .map(|r| serde_json::to_value(engine.registry().validate_record(r, &p.fields)).unwrap_or(JsonValue::Null))
        .collect();

    Ok(json!({
        "records": records.iter().map(record_to_json).collect::<Vec<_>>(),
        "validation": validation,
        "nextSequence": ctx.peek_sequence(),
    }))
}

fn handle_format_value(engine: &FormulaEngine, params: &Option<JsonValue>) -> Result<JsonValue, RpcError> {
    let p: FieldValueParams = params_as(params)?;
    let value = RecordValue::from_json(&p.value);
    let text = engine.registry().format_value(p.field_type, &value, &p.options);
    Ok(json!({ "text": text }))
}

fn handle_validate_value(engine: &FormulaEngine, params: &Option<JsonValue>) -> Result<JsonValue, RpcError> {
    let p: FieldValueParams = params_as(params)?;
    let value = RecordValue::from_json(&p.value);
    let result = engine.registry().validate_value(p.field_type, &value, &p.options);
    serde_json::to_value(result).map_err(|e| RpcError::new(ENGINE_ERROR, e.to_string()))
}

fn handle_capabilities(engine: &FormulaEngine) -> Result<JsonValue, RpcError> {
    let registry = engine.registry();
    let field_types: Vec<JsonValue> = registry
        .capabilities()
        .iter()
        .map(|cap| {
            json!({
                "capability": cap,
                "hooks": registry.hooks_for(cap.field_type),
            })
        })
        .collect();
    let functions: Vec<_> = Function::ALL.iter().map(|f| f.meta()).collect();

    Ok(json!({
        "server": { "name": SERVER_NAME, "version": SERVER_VERSION },
        "fieldTypes": field_types,
        "functions": functions,
        "limits": engine.config(),
    }))
}
