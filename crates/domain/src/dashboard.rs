//! Manager dashboard: today's takings and stock warnings.

use chrono::NaiveDate;
use common::Money;
use serde::Serialize;
use store::{Invoice, PharmacyStore, StoreError};

pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;
pub const DEFAULT_RECENT_INVOICE_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct DashboardSettings {
    /// Stock records holding fewer units than this count as low.
    pub low_stock_threshold: u32,
    /// How many of the newest invoices are read.
    pub recent_invoice_limit: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            recent_invoice_limit: DEFAULT_RECENT_INVOICE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub date: NaiveDate,
    /// Amount paid across today's invoices; refunds count negative.
    pub revenue: Money,
    pub transactions: usize,
    pub low_stock: usize,
    /// Newest first.
    pub recent_invoices: Vec<Invoice>,
}

pub struct DashboardService<S: PharmacyStore> {
    store: S,
    settings: DashboardSettings,
}

impl<S: PharmacyStore> DashboardService<S> {
    pub fn new(store: S, settings: DashboardSettings) -> Self {
        Self { store, settings }
    }

    /// Summarises `today` from the most recent invoices.
    ///
    /// Only the newest `recent_invoice_limit` invoices are considered, so a
    /// very busy day undercounts.
    #[tracing::instrument(skip(self))]
    pub async fn summary(&self, today: NaiveDate) -> Result<DashboardSummary, StoreError> {
        let recent_invoices = self
            .store
            .recent_invoices(self.settings.recent_invoice_limit)
            .await?;

        let todays: Vec<&Invoice> = recent_invoices
            .iter()
            .filter(|i| i.created_at.date_naive() == today)
            .collect();
        let revenue = todays.iter().map(|i| i.amount_paid).sum();
        let transactions = todays.len();

        let low_stock = self
            .store
            .count_low_stock(self.settings.low_stock_threshold)
            .await?;

        Ok(DashboardSummary {
            date: today,
            revenue,
            transactions,
            low_stock,
            recent_invoices,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use common::{BatchId, Money, ProductId, StockRecordId};
    use store::{Batch, BatchStock, InMemoryStore, NewInvoice, Product, StockRecord};

    fn product(quantities: &[u32]) -> Product {
        let id = ProductId::new();
        Product {
            id,
            name: "Omeprazole".into(),
            generic_name: None,
            strength: None,
            list_price: Money::from_cents(900),
            interactions: vec![],
            batches: quantities
                .iter()
                .map(|&quantity| {
                    let batch_id = BatchId::new();
                    BatchStock {
                        batch: Batch {
                            id: batch_id,
                            product_id: id,
                            batch_number: "O-1".into(),
                            expiry: NaiveDate::from_ymd_opt(2027, 2, 1).unwrap(),
                            sale_price: Money::from_cents(900),
                            cost_price: Money::from_cents(500),
                        },
                        stock: StockRecord {
                            id: StockRecordId::new(),
                            batch_id,
                            quantity,
                        },
                    }
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn summarises_todays_invoices() {
        let store = InMemoryStore::seeded(vec![product(&[0, 4, 5, 40])], vec![]);
        let first = store
            .create_invoice(NewInvoice::completed(Money::from_cents(1900), None))
            .await
            .unwrap();
        store
            .create_invoice(NewInvoice::completed(Money::from_cents(600), None))
            .await
            .unwrap();
        store
            .create_invoice(NewInvoice::refund(&first, Money::from_cents(500)))
            .await
            .unwrap();

        let dashboard = DashboardService::new(store, DashboardSettings::default());
        let today = Utc::now().date_naive();
        let summary = dashboard.summary(today).await.unwrap();

        assert_eq!(summary.transactions, 3);
        assert_eq!(summary.revenue, Money::from_cents(2000));
        assert_eq!(summary.low_stock, 2);
        assert_eq!(summary.recent_invoices.len(), 3);
    }

    #[tokio::test]
    async fn other_days_are_excluded() {
        let store = InMemoryStore::seeded(vec![], vec![]);
        store
            .create_invoice(NewInvoice::completed(Money::from_cents(1000), None))
            .await
            .unwrap();

        let dashboard = DashboardService::new(store, DashboardSettings::default());
        let yesterday = Utc::now().date_naive().pred_opt().unwrap();
        let summary = dashboard.summary(yesterday).await.unwrap();

        assert_eq!(summary.transactions, 0);
        assert!(summary.revenue.is_zero());
        assert_eq!(summary.recent_invoices.len(), 1);
    }

    #[tokio::test]
    async fn reads_only_recent_window() {
        let store = InMemoryStore::seeded(vec![], vec![]);
        for _ in 0..3 {
            store
                .create_invoice(NewInvoice::completed(Money::from_cents(100), None))
                .await
                .unwrap();
        }

        let settings = DashboardSettings {
            recent_invoice_limit: 2,
            ..DashboardSettings::default()
        };
        let summary = DashboardService::new(store, settings)
            .summary(Utc::now().date_naive())
            .await
            .unwrap();
        assert_eq!(summary.transactions, 2);
    }
}
