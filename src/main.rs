//! Climate Service - HTTP entry point
//!
//! Opens the climate dataset once, then serves the read-only JSON API until
//! the process is stopped.
//!
//! Usage:
//!   cargo run --release                          # climate.toml / defaults
//!   cargo run --release -- --port 8080           # override listen port
//!   cargo run --release -- --config other.toml   # alternate config file
//!
//! Environment:
//!   CLIMATE_DATABASE, CLIMATE_HOST, CLIMATE_PORT, CLIMATE_WORKERS
//!   RUST_LOG (default: info)

use climate_service::config::{self, ServiceConfig};
use climate_service::db::{self, Store};
use climate_service::endpoint;
use log::{error, info};
use std::env;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

/// Command-line overrides, applied after the config file and environment.
#[derive(Default)]
struct Args {
    config_path: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
}

fn usage(program: &str) -> ! {
    eprintln!("Usage: {} [--config PATH] [--host HOST] [--port PORT]", program);
    process::exit(1);
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("climate_service");
    let mut parsed = Args::default();

    let mut i = 1;
    while i < args.len() {
        let value = args.get(i + 1);
        match (args[i].as_str(), value) {
            ("--config", Some(v)) => parsed.config_path = Some(PathBuf::from(v)),
            ("--host", Some(v)) => parsed.host = Some(v.clone()),
            ("--port", Some(v)) => match v.parse() {
                Ok(port) => parsed.port = Some(port),
                Err(_) => {
                    eprintln!("Error: --port requires a port number, got {:?}", v);
                    usage(program);
                }
            },
            ("--config" | "--host" | "--port", None) => {
                eprintln!("Error: {} requires a value", args[i]);
                usage(program);
            }
            (other, _) => {
                eprintln!("Unknown argument: {}", other);
                usage(program);
            }
        }
        i += 2;
    }

    parsed
}

fn load_settings(args: &Args) -> Result<ServiceConfig, config::ConfigError> {
    let path = args
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(config::DEFAULT_CONFIG_PATH));

    let mut settings = config::load_config(&path)?;
    if let Some(host) = &args.host {
        settings.host = host.clone();
    }
    if let Some(port) = args.port {
        settings.port = port;
    }
    Ok(settings)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();

    let settings = match load_settings(&args) {
        Ok(s) => s,
        Err(e) => {
            error!("Configuration error: {}", e);
            process::exit(1);
        }
    };

    // Fail fast: never listen without a usable dataset.
    info!("Opening climate database {}", settings.database_path.display());
    let store = match Store::open(&settings.database_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    };

    {
        let conn = store.lock();
        for table in db::REQUIRED_TABLES {
            match db::count_rows(&conn, table) {
                Ok(count) => info!("   {}: {} rows", table, count),
                Err(e) => error!("   {}: {}", table, e),
            }
        }
    }

    if let Err(e) = endpoint::start_endpoint_server(&settings, store) {
        error!("{}", e);
        process::exit(1);
    }
}
