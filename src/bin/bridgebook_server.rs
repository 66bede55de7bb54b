//!
//! bridgebook server binary
//! -------------------------
//! Command-line entry point for the bridgebook HTTP server. Configuration comes
//! from an optional JSON file, `BRIDGEBOOK_*` environment variables and CLI flags.

use anyhow::{Context, Result};
use std::env;

use bridgebook::config::ServiceConfig;

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let args: Vec<String> = env::args().collect();

    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("bridgebook Server\n\nUSAGE:\n  bridgebook_server [--config FILE] [--root-folder ID] [--variant a|b] [--http-port N] [--data-root PATH]\n\nOPTIONS:\n  --config FILE              JSON config file (env: BRIDGEBOOK_CONFIG)\n  --root-folder ID           Listing root folder id (env: BRIDGEBOOK_ROOT_FOLDER_ID)\n  --variant a|b              Sheet schema variant (env: BRIDGEBOOK_SCHEMA_VARIANT, default b)\n  --default-sheet NAME       Sheet used when a request names none (env: BRIDGEBOOK_DEFAULT_SHEET)\n  --provision-sheet NAME     Sheet created in provisioned documents (env: BRIDGEBOOK_PROVISION_SHEET)\n  --utc-offset-minutes N     Display timezone (env: BRIDGEBOOK_UTC_OFFSET_MINUTES, default 540)\n  --data-root PATH           Document store root (env: BRIDGEBOOK_DATA_ROOT, default data)\n  --http-port N              HTTP port (env: BRIDGEBOOK_HTTP_PORT, default 8787)\n  --public-url URL           Base for document urls in listings (env: BRIDGEBOOK_PUBLIC_URL)\n");
        return Ok(());
    }

    let cfg = ServiceConfig::from_sources(&args).context("While loading configuration")?;
    let validated = cfg.validate().context("Invalid configuration")?;
    println!("bridgebook starting: http={}, data_root={}", validated.http_port, validated.data_root.display());

    bridgebook::server::run_with_config(validated).await
}
