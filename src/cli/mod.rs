//! Command-line surface: argument parsing, logging setup, config loading
//! and wiring the reload triggers to the server.

pub mod config_file;
pub mod watcher;

use std::future::Future;
use std::path::{Path, PathBuf};

use clap::Parser;
use clap::error::ErrorKind;
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, fmt};

use crate::errors::Result;
use crate::server::{self, Config};

// -----------------------------------------------------------------------------
// ----- Args ------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "gevulot", version, about = "Masking PostgreSQL proxy")]
struct Args {
    /// Set the configuration file path.
    #[arg(
        long = "config",
        short = 'c',
        value_name = "PATH",
        default_value = "gevulot.toml"
    )]
    config: PathBuf,
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

/// Handle the CLI and return the process exit code. This is the only
/// public entry point; `main` does nothing but call it and exit.
pub async fn run(args: Vec<String>) -> i32 {
    run_with(args, server::run).await
}

/// Same as [`run`] but with an injectable server entry point, so tests can
/// substitute a stub instead of a real listening server.
pub(crate) async fn run_with<F, Fut>(args: Vec<String>, run_server: F) -> i32
where
    F: FnOnce(mpsc::Receiver<Config>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let args = match parse_args(args) {
        Ok(Some(args)) => args,
        Ok(None) => return 0, // --help / --version
        Err(code) => return code,
    };

    init_tracing();

    let config_rx = match prepare_config_channel(&args.config) {
        Ok(rx) => rx,
        Err(err) => {
            eprintln!("failed to load config: {err}");
            return 1;
        }
    };

    // Run the server; this call blocks for the lifetime of the process.
    match run_server(config_rx).await {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("server error: {err}");
            1
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Private ---------------------------------------------------------------

/// Parse CLI arguments. `Ok(None)` means a help or version request that
/// was already printed and deserves a clean exit.
fn parse_args(args: Vec<String>) -> std::result::Result<Option<Args>, i32> {
    let argv = std::iter::once("gevulot".to_owned()).chain(args);

    match Args::try_parse_from(argv) {
        Ok(args) => Ok(Some(args)),

        Err(err)
            if err.kind() == ErrorKind::DisplayHelp
                || err.kind() == ErrorKind::DisplayVersion =>
        {
            let _ = err.print();
            Ok(None)
        }

        Err(err) => {
            eprintln!("{err}");
            Err(1)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Load the initial config and start the reload triggers; the returned
/// channel yields the initial snapshot followed by every reload.
fn prepare_config_channel(path: &Path) -> Result<mpsc::Receiver<Config>> {
    let initial = config_file::read_server_config(path)?;

    let (config_tx, config_rx) = mpsc::channel(1);

    // Capacity one and the channel is empty: cannot fail.
    let _ = config_tx.try_send(initial);

    watcher::spawn(path.to_owned(), config_tx);

    Ok(config_rx)
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
