//! Receipts printed after a successful checkout.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use common::{BatchId, InvoiceId, Money};
use domain::CartLine;
use serde::Serialize;

const WIDTH: usize = 32;
const NAME_WIDTH: usize = 15;

/// Store details printed at the top of every receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptHeader {
    pub store_name: String,
    pub branch: Option<String>,
    pub vat_number: Option<String>,
}

impl Default for ReceiptHeader {
    fn default() -> Self {
        Self {
            store_name: "CAREPLUS PHARMACY".to_string(),
            branch: None,
            vat_number: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiptLine {
    pub product_name: String,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl From<&CartLine> for ReceiptLine {
    fn from(line: &CartLine) -> Self {
        Self {
            product_name: line.product_name.clone(),
            batch_id: line.batch_id,
            batch_number: line.batch_number.clone(),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total(),
        }
    }
}

/// Snapshot of a committed sale, taken before the session is reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub invoice_id: InvoiceId,
    pub created_at: DateTime<Utc>,
    pub customer_label: String,
    pub lines: Vec<ReceiptLine>,
    pub total: Money,
}

impl Receipt {
    /// The invoice number as printed: the first eight hex digits.
    pub fn short_id(&self) -> String {
        self.invoice_id.short()
    }

    /// Renders a fixed-width text slip.
    pub fn render(&self, header: &ReceiptHeader) -> String {
        let mut out = String::new();
        let divider = "-".repeat(WIDTH);

        let _ = writeln!(out, "{:^WIDTH$}", header.store_name);
        if let Some(branch) = &header.branch {
            let _ = writeln!(out, "{branch:^WIDTH$}");
        }
        if let Some(vat) = &header.vat_number {
            let _ = writeln!(out, "{:^WIDTH$}", format!("VAT No: {vat}"));
        }
        let _ = writeln!(out, "Date: {}", self.created_at.format("%Y-%m-%d %H:%M"));
        let _ = writeln!(out, "Inv #: {}", self.short_id());
        let _ = writeln!(out, "Cust: {}", self.customer_label);
        let _ = writeln!(out, "{divider}");

        for line in &self.lines {
            let name: String = line.product_name.chars().take(NAME_WIDTH).collect();
            write_row(&mut out, &format!("{}x {name}", line.quantity), &line.line_total.to_string());
        }

        let _ = writeln!(out, "{divider}");
        write_row(&mut out, "TOTAL", &self.total.to_string());
        let _ = writeln!(out, "{:^WIDTH$}", "Thank you for your visit!");
        out
    }
}

fn write_row(out: &mut String, left: &str, right: &str) {
    let pad = WIDTH.saturating_sub(left.chars().count() + right.chars().count()).max(1);
    let _ = writeln!(out, "{left}{}{right}", " ".repeat(pad));
}
