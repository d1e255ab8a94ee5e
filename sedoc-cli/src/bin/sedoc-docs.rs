//! Standalone CLI tool for dumping the open Solid Edge documents as JSON.

#![cfg_attr(not(windows), allow(dead_code))]

use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

use sedoc_core::config::{EngineConfig, DEFAULT_PROG_ID};

#[derive(Parser)]
#[command(name = "sedoc-docs", about = "Dump open Solid Edge documents as JSON")]
struct Args {
    /// ProgID of the running application
    #[arg(long, default_value = DEFAULT_PROG_ID)]
    prog_id: String,

    /// Print a diagnostics probe instead of the document list
    #[arg(long)]
    probe: bool,

    /// Compact JSON output (no pretty-printing)
    #[arg(long)]
    compact: bool,

    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> ExitCode {
    let json = if compact {
        serde_json::to_string(value)
    } else {
        serde_json::to_string_pretty(value)
    };
    match json {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialise output: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(windows)]
fn run(args: &Args, config: EngineConfig) -> ExitCode {
    use sedoc_core::com::ComRuntime;
    use sedoc_core::Engine;

    let engine = Engine::with_config(ComRuntime::from_config(&config), config);
    let result = if args.probe {
        engine.probe().map(|d| print_json(&d, args.compact))
    } else {
        engine.enumerate().map(|e| print_json(&e, args.compact))
    };
    result.unwrap_or_else(|e| {
        eprintln!("{e}");
        ExitCode::FAILURE
    })
}

#[cfg(not(windows))]
fn run(_args: &Args, config: EngineConfig) -> ExitCode {
    eprintln!("{} automation requires Windows", config.prog_id);
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .init();

    let config = EngineConfig {
        prog_id: args.prog_id.clone(),
        ..EngineConfig::default()
    };
    run(&args, config)
}
