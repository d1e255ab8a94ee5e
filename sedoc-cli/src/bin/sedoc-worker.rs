//! JSON-RPC worker for Solid Edge automation calls.
//!
//! Reads line-delimited JSON requests from stdin, runs each one as a
//! sedoc_core action on this thread, writes JSON responses to stdout.
//! Requests are handled strictly one at a time.

#![cfg_attr(not(windows), allow(dead_code))]

use std::io::{self, BufRead, Write};

use clap::Parser;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use sedoc_core::config::DEFAULT_PROG_ID;
use sedoc_core::session::Runtime;
use sedoc_core::worker::{run_action, Action};
use sedoc_core::Engine;

#[derive(Parser)]
#[command(name = "sedoc-worker", about = "Solid Edge document worker process")]
struct Args {
    /// ProgID of the running application
    #[arg(long, default_value = DEFAULT_PROG_ID)]
    prog_id: String,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
struct Request {
    id: u64,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct Response {
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Map a request method onto an action name; aliases included.
fn action_name(method: &str) -> Option<&'static str> {
    Some(match method {
        "connect" | "enumerate" => "connect",
        "refresh" => "refresh",
        "disconnect" => "disconnect",
        "activate" => "activate",
        "draft_custom_properties" | "read_custom_properties" => "draft_custom_properties",
        "save_draft_custom_properties" | "write_custom_properties" => {
            "save_draft_custom_properties"
        }
        "probe" => "probe",
        _ => return None,
    })
}

fn parse_action(method: &str, params: &Value) -> Result<Action, String> {
    let name = action_name(method).ok_or_else(|| format!("unknown method: {method}"))?;
    let mut object = match params {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        _ => return Err(format!("params for {method} must be an object")),
    };
    object.insert("action".to_owned(), Value::from(name));
    serde_json::from_value(Value::Object(object))
        .map_err(|e| format!("invalid params for {method}: {e}"))
}

fn dispatch<R: Runtime>(
    engine: &Engine<R>,
    method: &str,
    params: &Value,
) -> Result<Value, String> {
    match method {
        "ping" => Ok(Value::String("pong".to_owned())),
        "active_document_name" => engine
            .active_document_name()
            .map(Value::String)
            .map_err(|e| e.to_string()),
        _ => {
            let action = parse_action(method, params)?;
            let payload = run_action(engine, action);
            serde_json::to_value(payload).map_err(|e| e.to_string())
        }
    }
}

fn serve<R: Runtime>(engine: &Engine<R>) {
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    tracing::info!("sedoc-worker: ready");

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!("sedoc-worker: stdin read error: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let req: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                // Parse error -- use id=0 since we can't extract it.
                let resp = Response {
                    id: 0,
                    result: None,
                    error: Some(format!("invalid JSON: {e}")),
                };
                if let Ok(json) = serde_json::to_string(&resp) {
                    let _ = writeln!(stdout, "{json}");
                    let _ = stdout.flush();
                }
                continue;
            }
        };

        let resp = match dispatch(engine, &req.method, &req.params) {
            Ok(result) => Response {
                id: req.id,
                result: Some(result),
                error: None,
            },
            Err(error) => Response {
                id: req.id,
                result: None,
                error: Some(error),
            },
        };

        if let Ok(json) = serde_json::to_string(&resp) {
            let _ = writeln!(stdout, "{json}");
        } else {
            // Serialization failed -- send minimal error response.
            let _ = writeln!(
                stdout,
                r#"{{"id":{},"error":"response serialization failed"}}"#,
                req.id
            );
        }
        let _ = stdout.flush();
    }
}

fn init_logging(verbose: bool) {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();
}

#[cfg(windows)]
fn main() {
    use sedoc_core::com::ComRuntime;
    use sedoc_core::config::EngineConfig;

    let args = Args::parse();
    init_logging(args.verbose);

    let config = EngineConfig {
        prog_id: args.prog_id,
        ..EngineConfig::default()
    };
    let engine = Engine::with_config(ComRuntime::from_config(&config), config);
    serve(&engine);
}

#[cfg(not(windows))]
fn main() {
    let args = Args::parse();
    init_logging(args.verbose);
    log::error!("sedoc-worker: {} automation requires Windows", args.prog_id);
    std::process::exit(1);
}
