mod app;

use crate::app::{App, Command};
use anyhow::{Context, Result};
use clap::Parser;
use com_moniker::{Apartment, BindOptions, ComResolver, MonikerClient};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Inspect COM monikers and the Running Object Table.
#[derive(Debug, Parser)]
#[command(name = "mkinfo", version)]
struct Cli {
    /// Directory for the daily rolling log file.
    #[arg(long, env = "MKINFO_LOG_DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Run the COM worker in a single-threaded apartment.
    #[arg(long)]
    sta: bool,

    /// Bind with `BIND_JUSTTESTEXISTENCE` set.
    #[arg(long)]
    existence_only: bool,

    #[command(subcommand)]
    command: Command,
}

/// Daily rolling log writer. Buffered records reach the file when the
/// guard is dropped.
fn log_writer(dir: &Path) -> (NonBlocking, WorkerGuard) {
    let file_appender = tracing_appender::rolling::daily(dir, "mkinfo.log");
    tracing_appender::non_blocking(file_appender)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging; `_guard` must outlive every record.
    let (non_blocking, _guard) = log_writer(&cli.log_dir);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(non_blocking).with_filter(filter))
        .init();

    tracing::info!(command = ?cli.command, "Starting mkinfo");

    let options = if cli.existence_only {
        BindOptions::existence_check()
    } else {
        BindOptions::default()
    };
    let apartment = if cli.sta {
        Apartment::SingleThreaded
    } else {
        Apartment::MultiThreaded
    };

    // Worker start-up blocks until COM is initialized on its thread.
    let client = tokio::task::spawn_blocking(move || {
        MonikerClient::with_apartment(ComResolver::new(options), apartment)
    })
    .await
    .context("COM worker start-up task failed")?
    .context("Failed to start the COM worker")?;

    let app = App::new(Arc::new(client));
    match app.run(&cli.command).await {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!(error = %e, error_chain = ?e, "Command failed");
            eprintln!("{}", app::error_message(&e));
            Ok(ExitCode::FAILURE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_describe() {
        let cli = Cli::try_parse_from(["mkinfo", "describe", "C:\\a.txt!x"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Describe {
                name: "C:\\a.txt!x".into()
            }
        );
        assert_eq!(cli.log_level, "info");
        assert!(!cli.sta);
    }

    #[test]
    fn test_parse_global_flags() {
        let cli = Cli::try_parse_from([
            "mkinfo",
            "--log-dir",
            "out",
            "--sta",
            "--existence-only",
            "compare",
            "!a",
            "!b",
        ])
        .unwrap();
        assert_eq!(cli.log_dir, PathBuf::from("out"));
        assert!(cli.sta);
        assert!(cli.existence_only);
        assert!(matches!(cli.command, Command::Compare { .. }));
    }

    #[test]
    fn test_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["mkinfo"]).is_err());
    }

    #[test]
    fn test_failure_record_flushed_when_guard_drops() {
        let dir = std::env::temp_dir().join(format!("mkinfo-log-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let (writer, guard) = log_writer(&dir);
        let subscriber = tracing_subscriber::registry()
            .with(fmt::layer().with_writer(writer).with_ansi(false));
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!(error = "MK_E_SYNTAX", "Command failed");
        });
        drop(guard);

        let mut contents = String::new();
        for entry in std::fs::read_dir(&dir).unwrap() {
            contents.push_str(&std::fs::read_to_string(entry.unwrap().path()).unwrap());
        }
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(contents.contains("Command failed"));
    }
}
