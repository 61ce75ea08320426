//! Tally JSON-RPC Server
//!
//! Line-delimited JSON-RPC 2.0 over stdio: one request per line on stdin,
//! one response per line on stdout. Logs go to stderr.
//!
//! Methods:
//! - ping
//! - evaluate, validate: formula fields against a record / schema
//! - safe_evaluate, validate_expression: bare expressions with a scope
//! - compute_record, process_records: formula fields and auto fields
//! - format_value, validate_value: field type hooks
//! - capabilities: field types, hooks, functions and limits

mod rpc;

use rpc::{handle_request, RpcRequest, RpcResponse, SERVER_VERSION};
use std::io::{self, BufRead, Write};
use tally::{EngineConfig, FormulaEngine};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "TALLY_LOG";

const DEFAULT_LOG: &str = "info";

/// Directives as in `TALLY_LOG` (e.g. `debug`, `tally=trace`); unset or
/// unparseable falls back to `info`
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG))
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(LOG_ENV).ok()))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn create_engine() -> FormulaEngine {
    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "invalid engine limits; using defaults");
            EngineConfig::default()
        }
    };
    info!(
        max_depth = config.max_depth,
        max_tokens = config.max_tokens,
        max_length = config.max_length,
        "engine limits"
    );
    FormulaEngine::with_standard_hooks().with_config(config)
}

fn write_response(response: &RpcResponse) -> io::Result<()> {
    let response_json = serde_json::to_string(response)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", response_json)?;
    stdout.flush()
}

fn main() {
    init_logging();
    let engine = create_engine();

    info!(version = SERVER_VERSION, "Tally server started");

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                info!("client disconnected (EOF)");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let request: RpcRequest = match serde_json::from_str(line) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!(error = %e, "error parsing request");
                        if let Err(e) = write_response(&RpcResponse::parse_error(e)) {
                            error!(error = %e, "error writing response");
                            break;
                        }
                        continue;
                    }
                };

                let response = handle_request(&engine, &request);

                // Notifications (no id) get no response
                if request.id.is_none() {
                    debug!(method = %request.method, "notification processed");
                    continue;
                }

                if let Err(e) = write_response(&response) {
                    error!(error = %e, "error writing response");
                    break;
                }
                debug!(method = %request.method, "sent response");
            }
            Err(e) => {
                error!(error = %e, "error reading input");
                break;
            }
        }
    }

    info!("server shutting down");
}
