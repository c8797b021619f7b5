//! toolbridge CLI entry point.
//!
//! Resolves configuration, then serves MCP over stdin/stdout until stdin
//! closes. Exit code 0 on a clean shutdown, 1 on a configuration error.

use clap::Parser;
use tracing::{info, warn};

use toolbridge::cli::Cli;
use toolbridge::error::StdioError;
use toolbridge::stdio::run_stdio_server;
use toolbridge_core::config::API_KEY_PREFIX;

/// Filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "toolbridge=info,toolbridge_core=info";

/// Filter used with `--verbose`.
const VERBOSE_LOG_FILTER: &str = "toolbridge=debug,toolbridge_core=debug";

// ─────────────────────────────────────────────────────────────────────────────
// Entry Point
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!(error = %e, "toolbridge failed");
            eprintln!("toolbridge: {e}");
            1
        }
    };

    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<(), StdioError> {
    let config = cli.into_config()?;

    if !config.api_key_has_expected_prefix() {
        warn!(
            expected_prefix = API_KEY_PREFIX,
            "API key does not look like an issued key; continuing anyway"
        );
    }

    info!(server_url = %config.server_url, "Starting toolbridge");
    run_stdio_server(config, tokio::io::stdin(), tokio::io::stdout()).await?;
    info!("stdin closed, shutting down");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tracing Init
// ─────────────────────────────────────────────────────────────────────────────

/// Initialise tracing subscriber with stderr output.
///
/// stdout is the protocol channel, so nothing may log there. When `verbose`
/// is true, sets filter to debug for both crates. Otherwise, respects
/// `RUST_LOG` (defaulting to info).
fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(VERBOSE_LOG_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}
