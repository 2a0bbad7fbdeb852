//! # Rendering
//!
//! Turns reports into stdout text.
//!
//! ## Text Layout
//! ```text
//! Current user: Anna (U1)
//! Mode: Take Product
//! Status: insufficient quantity of product "P2"
//! ID | User code | Product code | Quantity | Activity     | Date
//! ---+-----------+--------------+----------+--------------+--------------------
//! 1  | U1        | P1           | -2       | Take Product | 2024-03-01 09:30:15
//! ```
//!
//! In JSON mode every report, history listing and error is one line.

use serde::Serialize;

use tally_core::{format_timestamp, LedgerEntry, PendingEntry, Product};

use crate::config::OutputFormat;
use crate::controller::ScanReport;
use crate::error::ApiError;

const BATCH_HEADER: [&str; 6] = ["ID", "User code", "Product code", "Quantity", "Activity", "Date"];
const HISTORY_HEADER: [&str; 6] = ["Entry", "User code", "Product code", "Quantity", "Activity", "Date"];
const STOCK_HEADER: [&str; 3] = ["Product code", "Name", "Quantity"];

/// Renders in the configured [`OutputFormat`].
#[derive(Debug, Clone, Copy)]
pub struct View {
    format: OutputFormat,
}

impl View {
    pub fn new(format: OutputFormat) -> Self {
        View { format }
    }

    pub fn report(&self, report: &ScanReport) -> String {
        match self.format {
            OutputFormat::Text => render_report(report),
            OutputFormat::Json => to_json_line(report),
        }
    }

    pub fn history(&self, entries: &[LedgerEntry]) -> String {
        match self.format {
            OutputFormat::Text => render_history(entries),
            OutputFormat::Json => to_json_line(&entries),
        }
    }

    pub fn stock(&self, products: &[Product]) -> String {
        match self.format {
            OutputFormat::Text => render_stock(products),
            OutputFormat::Json => to_json_line(&products),
        }
    }

    /// A product with its ledger rows. JSON mode emits
    /// `{"product": ..., "ledger": [...]}`.
    pub fn product(&self, product: &Product, entries: &[LedgerEntry]) -> String {
        #[derive(Serialize)]
        struct ProductHistory<'a> {
            product: &'a Product,
            ledger: &'a [LedgerEntry],
        }

        match self.format {
            OutputFormat::Text => format!(
                "{} ({}): {} in stock\n{}",
                product.name,
                product.code,
                product.quantity,
                render_history(entries)
            ),
            OutputFormat::Json => to_json_line(&ProductHistory {
                product,
                ledger: entries,
            }),
        }
    }

    pub fn error(&self, err: &ApiError) -> String {
        match self.format {
            OutputFormat::Text => format!("Error: {}\n", err.message),
            OutputFormat::Json => to_json_line(err),
        }
    }

    /// Free text such as `/help`. JSON mode wraps it as `{"message": ...}`.
    pub fn message(&self, text: &str) -> String {
        #[derive(Serialize)]
        struct Message<'a> {
            message: &'a str,
        }

        match self.format {
            OutputFormat::Text => text.to_string(),
            OutputFormat::Json => to_json_line(&Message { message: text }),
        }
    }
}

/// Full text rendering of a report.
pub fn render_report(report: &ScanReport) -> String {
    let mut out = String::new();

    match &report.active_user {
        Some(user) => out.push_str(&format!("Current user: {}\n", user.display_label())),
        None => out.push_str("Current user: none\n"),
    }
    out.push_str(&format!("Mode: {}\n", report.mode));

    if let Some(status) = &report.status {
        out.push_str(&format!("Status: {}\n", status.message));
    }

    if let Some(summary) = &report.commit {
        out.push_str(&format!(
            "Saved {} row(s), {} product(s) updated\n",
            summary.ledger_entries.len(),
            summary.products_updated
        ));
        for code in &summary.skipped_products {
            out.push_str(&format!("Warning: product \"{}\" no longer exists\n", code));
        }
    }

    out.push_str(&render_batch(&report.rows));
    out
}

/// The pending-batch table.
pub fn render_batch(rows: &[PendingEntry]) -> String {
    if rows.is_empty() {
        return "(no pending rows)\n".to_string();
    }

    let cells: Vec<[String; 6]> = rows
        .iter()
        .map(|row| {
            [
                row.row_id.to_string(),
                row.user_code.clone(),
                row.product_code.clone(),
                row.quantity.to_string(),
                row.activity.to_string(),
                format_timestamp(&row.updated_at),
            ]
        })
        .collect();

    render_table(&BATCH_HEADER, &cells)
}

/// Recent ledger rows, newest first.
pub fn render_history(entries: &[LedgerEntry]) -> String {
    if entries.is_empty() {
        return "(ledger is empty)\n".to_string();
    }

    let cells: Vec<[String; 6]> = entries
        .iter()
        .map(|entry| {
            [
                short_id(&entry.id).to_string(),
                entry.user_code.clone(),
                entry.product_code.clone(),
                entry.quantity.to_string(),
                entry.activity.to_string(),
                format_timestamp(&entry.recorded_at),
            ]
        })
        .collect();

    render_table(&HISTORY_HEADER, &cells)
}

/// Stored products with their quantities.
pub fn render_stock(products: &[Product]) -> String {
    if products.is_empty() {
        return "(no products)\n".to_string();
    }

    let cells: Vec<[String; 3]> = products
        .iter()
        .map(|p| [p.code.clone(), p.name.clone(), p.quantity.to_string()])
        .collect();

    render_table(&STOCK_HEADER, &cells)
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn render_table<const N: usize>(header: &[&str; N], rows: &[[String; N]]) -> String {
    let mut widths = header.map(|h| h.chars().count());
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, header.iter().copied(), &widths);

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');

    for row in rows {
        push_row(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_row<'a, const N: usize>(
    out: &mut String,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize; N],
) {
    let padded: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

fn to_json_line<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json + "\n",
        Err(e) => format!(
            "{{\"code\":\"INTERNAL\",\"message\":\"failed to encode output: {}\"}}\n",
            e.to_string().replace('"', "'")
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{Activity, ScanError, User};

    fn row(row_id: u64, product_code: &str, quantity: i64) -> PendingEntry {
        PendingEntry {
            row_id,
            user_code: "U1".into(),
            product_code: product_code.into(),
            quantity,
            activity: Activity::from_delta(quantity),
            updated_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(9, 30, 15)
                .unwrap(),
        }
    }

    fn report(rows: Vec<PendingEntry>) -> ScanReport {
        ScanReport {
            status: None,
            active_user: Some(User::new("U1", "Anna")),
            mode: Activity::Take,
            rows,
            commit: None,
        }
    }

    #[test]
    fn test_render_report_text() {
        let text = render_report(&report(vec![row(1, "P1", -2), row(3, "P22", 1)]));
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Current user: Anna (U1)");
        assert_eq!(lines[1], "Mode: Take Product");
        assert_eq!(
            lines[2],
            "ID | User code | Product code | Quantity | Activity       | Date"
        );
        assert_eq!(
            lines[4],
            "1  | U1        | P1           | -2       | Take Product   | 2024-03-01 09:30:15"
        );
        assert!(lines[5].starts_with("3  | U1        | P22          | 1        | Return Product"));
    }

    #[test]
    fn test_render_no_user_and_status() {
        let mut r = report(Vec::new());
        r.active_user = None;
        r.status = Some(ApiError::from(ScanError::NoActiveUser));

        let text = render_report(&r);

        assert!(text.starts_with("Current user: none\n"));
        assert!(text.contains("Status: scan a user code before a product code\n"));
        assert!(text.ends_with("(no pending rows)\n"));
    }

    #[test]
    fn test_json_report_is_one_line() {
        let view = View::new(OutputFormat::Json);
        let out = view.report(&report(vec![row(1, "P1", -1)]));

        assert_eq!(out.lines().count(), 1);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["mode"], "Take Product");
        assert_eq!(value["rows"][0]["product_code"], "P1");
        assert_eq!(value["active_user"]["name"], "Anna");
    }

    #[test]
    fn test_error_rendering() {
        let err = ApiError::validation("empty scan");

        assert_eq!(View::new(OutputFormat::Text).error(&err), "Error: empty scan\n");
        assert!(View::new(OutputFormat::Json)
            .error(&err)
            .contains("\"VALIDATION_ERROR\""));
    }

    #[test]
    fn test_render_stock() {
        let text = render_stock(&[Product::new("P1", "Drill", 5), Product::new("P22", "Saw", 12)]);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "Product code | Name  | Quantity");
        assert_eq!(lines[1], "-------------+-------+---------");
        assert_eq!(lines[2], "P1           | Drill | 5");
        assert_eq!(lines[3], "P22          | Saw   | 12");
        assert_eq!(render_stock(&[]), "(no products)\n");
    }

    #[test]
    fn test_json_status_carries_code() {
        let mut r = report(Vec::new());
        r.status = Some(ApiError::from(ScanError::UnknownProduct { code: "X".into() }));

        let out = View::new(OutputFormat::Json).report(&r);

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["status"]["code"], "SCAN_REJECTED");
    }
}
