//! # Tally Terminal Library
//!
//! The scan station: reads codes from stdin, one per line, and keeps the
//! stock room ledger in SQLite.
//!
//! ## Module Organization
//! ```text
//! tally_terminal/
//! ├── lib.rs          ◄─── You are here (startup & scan loop)
//! ├── config.rs       ◄─── tally.toml + TALLY_* overrides
//! ├── controller.rs   ◄─── ScanController: session + store
//! ├── input.rs        ◄─── Line parsing (scans and /commands)
//! ├── view.rs         ◄─── Text table or JSON lines
//! └── error.rs        ◄─── ApiError for controller operations
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Station Startup                                   │
//! │                                                                         │
//! │  1. Initialize Logging ───────────────────────────────────────────────► │
//! │     • tracing-subscriber with env filter, written to stderr             │
//! │     • Default: info,tally=debug,sqlx=warn (RUST_LOG overrides)          │
//! │                                                                         │
//! │  2. Load Configuration ───────────────────────────────────────────────► │
//! │     • defaults → tally.toml → TALLY_* environment                       │
//! │                                                                         │
//! │  3. Open the Store ───────────────────────────────────────────────────► │
//! │     • Linux: ~/.local/share/tally/tally.db unless configured            │
//! │     • Created with empty tables when missing                            │
//! │                                                                         │
//! │  4. Scan Loop ────────────────────────────────────────────────────────► │
//! │     • One line at a time, each fully persisted before the next          │
//! │     • EOF or /quit ends the loop; an unsaved batch is discarded         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod controller;
pub mod error;
pub mod input;
pub mod view;

use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use config::AppConfig;
use controller::ScanController;
use error::{ApiError, ApiResult};
use input::{parse_line, Input, HELP};
use tally_db::{Database, DbConfig};
use view::View;

/// Command-line options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    /// `--config <path>`
    pub config_path: Option<PathBuf>,

    /// `--db <path>`, overrides the configured store path.
    pub db_path: Option<PathBuf>,

    /// `--help`
    pub show_help: bool,
}

impl CliOptions {
    /// Parses arguments, skipping the program name.
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut options = CliOptions::default();
        let mut args = args.into_iter().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args.next().ok_or("--config needs a path")?;
                    options.config_path = Some(PathBuf::from(path));
                }
                "--db" | "-d" => {
                    let path = args.next().ok_or("--db needs a path")?;
                    options.db_path = Some(PathBuf::from(path));
                }
                "--help" | "-h" => options.show_help = true,
                other => return Err(format!("unknown argument: {}", other)),
            }
        }

        Ok(options)
    }
}

/// Usage text for `--help`.
pub const USAGE: &str = "\
Tally scan station

Usage: tally [OPTIONS]

Options:
  -c, --config <PATH>  Config file (default: platform config dir/tally.toml)
  -d, --db <PATH>      Database file (overrides [store] path)
  -h, --help           Show this help message
";

/// Runs the station until EOF or `/quit`.
pub async fn run(options: CliOptions) -> ApiResult<()> {
    init_tracing();

    info!("Starting Tally scan station");

    let mut config = AppConfig::load(options.config_path)?;
    if let Some(path) = options.db_path {
        config.store.path = Some(path);
    }

    let db_path = config.database_path()?;
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(&db_path)).await?;
    if db.was_created() {
        warn!(
            ?db_path,
            "Created an empty store; add users and products before scanning"
        );
    }

    let mut controller = ScanController::new(db.clone(), config.markers.clone());
    let view = View::new(config.display.format);

    run_loop(
        &mut controller,
        view,
        config.display.history_limit,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await
    .map_err(|e| ApiError::internal(format!("terminal I/O failed: {}", e)))?;

    db.close().await;
    info!("Scan station stopped");
    Ok(())
}

/// Reads lines from `reader` and writes one rendering per line to `writer`.
///
/// Each line is handled to completion, including persistence, before the
/// next one is read.
pub async fn run_loop<R, W>(
    controller: &mut ScanController,
    view: View,
    history_limit: u32,
    reader: R,
    mut writer: W,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    writer
        .write_all(view.report(&controller.report()).as_bytes())
        .await?;
    writer.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let output = match parse_line(&line) {
            Ok(None) => continue,
            Ok(Some(Input::Quit)) => break,
            Ok(Some(Input::Help)) => view.message(HELP),
            Ok(Some(Input::Scan(code))) => match controller.scan(&code).await {
                Ok(report) => view.report(&report),
                Err(err) => view.error(&err),
            },
            Ok(Some(Input::Save)) => match controller.save().await {
                Ok(report) => view.report(&report),
                Err(err) => view.error(&err),
            },
            Ok(Some(Input::Cancel)) => match controller.cancel().await {
                Ok(report) => view.report(&report),
                Err(err) => view.error(&err),
            },
            Ok(Some(Input::History(limit))) => {
                match controller.history(limit.unwrap_or(history_limit)).await {
                    Ok(entries) => view.history(&entries),
                    Err(err) => view.error(&err),
                }
            }
            Ok(Some(Input::Stock(limit))) => {
                match controller.stock(limit.unwrap_or(history_limit)).await {
                    Ok(products) => view.stock(&products),
                    Err(err) => view.error(&err),
                }
            }
            Ok(Some(Input::Product(code))) => match controller.product_history(&code).await {
                Ok((product, entries)) => view.product(&product, &entries),
                Err(err) => view.error(&err),
            },
            Err(err) => view.error(&err),
        };

        writer.write_all(output.as_bytes()).await?;
        writer.flush().await?;
    }

    let pending = controller.session().batch().len();
    if pending > 0 {
        warn!(pending, "Leaving with an unsaved batch, discarding it");
    }

    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=tally=trace` - Show trace for tally crates only
/// - Default: info, debug for tally crates
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputFormat;
    use tally_core::{Product, ScanMarkers, User};

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("tally")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_cli_options() {
        let options = CliOptions::parse(args(&["--config", "a.toml", "-d", "b.db"])).unwrap();
        assert_eq!(options.config_path, Some(PathBuf::from("a.toml")));
        assert_eq!(options.db_path, Some(PathBuf::from("b.db")));
        assert!(!options.show_help);

        assert!(CliOptions::parse(args(&["-h"])).unwrap().show_help);
        assert!(CliOptions::parse(args(&["--db"])).is_err());
        assert!(CliOptions::parse(args(&["--verbose"])).is_err());
    }

    async fn station() -> ScanController {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.users().insert(&User::new("U1", "Anna")).await.unwrap();
        db.products()
            .insert(&Product::new("P1", "Drill", 5))
            .await
            .unwrap();
        ScanController::new(db, ScanMarkers::default())
    }

    async fn drive(controller: &mut ScanController, format: OutputFormat, input: &str) -> String {
        let mut out = Vec::new();
        run_loop(controller, View::new(format), 20, input.as_bytes(), &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_loop_commits_on_logout() {
        let mut controller = station().await;

        let out = drive(
            &mut controller,
            OutputFormat::Text,
            "U1\n\nP1\n  P1  \nU1\n/history\n",
        )
        .await;

        assert!(out.starts_with("Current user: none\n"));
        assert!(out.contains("Current user: Anna (U1)\n"));
        assert!(out.contains("Saved 1 row(s), 1 product(s) updated\n"));
        assert!(out.contains("| U1        | P1           | -2       | Take Product |"));
        assert_eq!(
            controller.session().active_user(),
            None,
            "second U1 scan logs out"
        );
    }

    #[tokio::test]
    async fn test_loop_stops_at_quit_without_saving() {
        let mut controller = station().await;

        let out = drive(&mut controller, OutputFormat::Text, "U1\nP1\n/quit\nU1\n").await;

        assert!(!out.contains("Saved"));
        assert_eq!(controller.session().batch().len(), 1);
        assert_eq!(controller.history(10).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_loop_reports_errors_and_continues() {
        let mut controller = station().await;

        let out = drive(&mut controller, OutputFormat::Text, "/bogus\nP1\n/help\n").await;

        assert!(out.contains("Error: unknown command: /bogus"));
        assert!(out.contains("Status: scan a user code before a product code\n"));
        assert!(out.contains("Commands:"));
    }

    #[tokio::test]
    async fn test_loop_stock_and_product_commands() {
        let mut controller = station().await;

        let out = drive(
            &mut controller,
            OutputFormat::Text,
            "U1\nP1\nU1\n/stock\n/product P1\n/product P9\n",
        )
        .await;

        assert!(out.contains("P1           | Drill | 4\n"));
        assert!(out.contains("Drill (P1): 4 in stock\n"));
        assert!(out.contains("Error: Product not found: P9\n"));
    }

    #[tokio::test]
    async fn test_loop_json_lines() {
        let mut controller = station().await;

        let out = drive(&mut controller, OutputFormat::Json, "U1\nP1\n").await;

        let lines: Vec<serde_json::Value> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0]["active_user"].is_null());
        assert_eq!(lines[2]["rows"][0]["quantity"], -1);
    }
}
