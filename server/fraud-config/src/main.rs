//! Binary entrypoint: load a configuration, then answer JSON-line queries.
//!
//! The config path comes from the first argument, else `FRAUD_CONFIG_PATH`, else
//! `fraud_detection_config.json`. Each stdin line is a `Query`; each output line is
//! an `Answer` or an `ErrorOutput`. Logs go to stderr.

use std::io::{self, Write};
use std::sync::Arc;

use fraud_config::query::{serve, QueryEngine};
use fraud_config::ConfigStore;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "fraud_detection_config.json";

fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  if let Err(e) = run_binary() {
    let _ = writeln!(io::stderr(), "fraud-config error: {}", e);
    std::process::exit(1);
  }
}

fn run_binary() -> Result<(), Box<dyn std::error::Error>> {
  let path = std::env::args()
    .nth(1)
    .or_else(|| std::env::var("FRAUD_CONFIG_PATH").ok())
    .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());

  let config: Arc<ConfigStore> = ConfigStore::shared(&path)?;
  let engine = QueryEngine::new(config);

  let stdin = io::stdin();
  let stdout = io::stdout();
  serve(&engine, stdin.lock(), io::BufWriter::new(stdout.lock()))?;
  Ok(())
}
