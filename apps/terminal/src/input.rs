//! Line parsing for the scan loop.
//!
//! Every non-empty line is a scan, except lines starting with `/`, which are
//! operator commands typed on the keyboard.

use crate::error::{ApiError, ApiResult};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// A scanned code, trimmed.
    Scan(String),
    /// Commit the batch and keep the user active.
    Save,
    /// Discard the batch.
    Cancel,
    /// Show recent ledger rows (`None` uses the configured limit).
    History(Option<u32>),
    /// List stored products (`None` uses the configured limit).
    Stock(Option<u32>),
    /// Show one product and its ledger rows.
    Product(String),
    Help,
    Quit,
}

/// Parses a raw line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> ApiResult<Option<Input>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let Some(command) = line.strip_prefix('/') else {
        return Ok(Some(Input::Scan(line.to_string())));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();

    let input = match (name, arg) {
        ("save", None) => Input::Save,
        ("cancel", None) => Input::Cancel,
        ("history", None) => Input::History(None),
        ("history", Some(n)) => Input::History(Some(parse_limit(n)?)),
        ("stock", None) => Input::Stock(None),
        ("stock", Some(n)) => Input::Stock(Some(parse_limit(n)?)),
        ("product", Some(code)) => Input::Product(code.to_string()),
        ("product", None) => return Err(ApiError::validation("/product needs a product code")),
        ("help", None) => Input::Help,
        ("quit" | "exit", None) => Input::Quit,
        _ => {
            return Err(ApiError::validation(format!(
                "unknown command: /{} (try /help)",
                command
            )))
        }
    };

    if parts.next().is_some() {
        return Err(ApiError::validation(format!("too many arguments: /{}", command)));
    }

    Ok(Some(input))
}

fn parse_limit(n: &str) -> ApiResult<u32> {
    n.parse::<u32>()
        .map_err(|_| ApiError::validation(format!("invalid limit: {}", n)))
}

/// Help text for `/help`.
pub const HELP: &str = "\
Scan a user badge to start, then scan products.
Marker codes switch between Take and Return, or cancel the batch.
Scanning the same user again saves the batch and logs out.

Commands:
  /save           save the batch, keep the user
  /cancel         discard the batch
  /history [n]    show the last n ledger rows
  /stock [n]      list n products with their quantities
  /product <code> show one product and its ledger rows
  /help           show this text
  /quit           exit (an unsaved batch is discarded)
";
