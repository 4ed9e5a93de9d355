//! Cart aggregate implementation.

use chrono::NaiveDate;
use common::{BatchId, Money, ProductId};
use serde::{Deserialize, Serialize};
use store::{BatchStock, Product};

use crate::aggregate::Aggregate;

use super::{Advisory, CartError, CartEvent, CartLine, events::LineQuantityIncreasedData};

/// The decision reached for an add-line command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddLine {
    /// Apply these events; any advisories were confirmed by the operator.
    Apply {
        events: Vec<CartEvent>,
        advisories: Vec<Advisory>,
    },

    /// The add raised advisories that the operator has not confirmed yet.
    NeedsConfirmation(Vec<Advisory>),
}

/// Cart aggregate root.
///
/// Holds at most one line per batch, in the order lines were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Aggregate for Cart {
    type Event = CartEvent;
    type Error = CartError;

    fn aggregate_type() -> &'static str {
        "Cart"
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            CartEvent::LineAdded(line) => self.lines.push(line),
            CartEvent::LineQuantityIncreased(data) => self.apply_quantity_increased(data),
            CartEvent::LineRemoved(data) => self.lines.retain(|l| l.batch_id != data.batch_id),
            CartEvent::CartCleared => self.lines.clear(),
        }
    }
}

// Query methods
impl Cart {
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, batch_id: BatchId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.batch_id == batch_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Returns the total quantity across all lines.
    pub fn total_quantity(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of unit price times quantity over every line.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}

// Command methods (return events)
impl Cart {
    /// Decides whether `quantity` units of `batch_id` may be added.
    ///
    /// Checks run in this order: quantity, batch membership, expiry, stock,
    /// stock limit. Advisories are only evaluated when a new line would be
    /// appended; increments of an existing line never raise them.
    pub fn add_line(
        &self,
        product: &Product,
        batch_id: BatchId,
        quantity: u32,
        today: NaiveDate,
        confirmed: bool,
    ) -> Result<AddLine, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }

        let batch = product.batch(batch_id).ok_or(CartError::UnknownBatch {
            product_id: product.id,
            batch_id,
        })?;

        if batch.batch.is_expired(today) {
            return Err(CartError::Expired {
                product: product.name.clone(),
                expiry: batch.batch.expiry,
            });
        }

        let available = batch.quantity();
        if available == 0 {
            return Err(CartError::OutOfStock {
                product: product.name.clone(),
            });
        }

        if let Some(existing) = self.line(batch_id) {
            let new_quantity = existing.quantity.saturating_add(quantity);
            if new_quantity > available {
                return Err(CartError::StockLimitExceeded {
                    product: product.name.clone(),
                    requested: new_quantity,
                    available,
                });
            }
            return Ok(AddLine::Apply {
                events: vec![CartEvent::line_quantity_increased(
                    batch_id,
                    existing.quantity,
                    new_quantity,
                )],
                advisories: vec![],
            });
        }

        if quantity > available {
            return Err(CartError::StockLimitExceeded {
                product: product.name.clone(),
                requested: quantity,
                available,
            });
        }

        let mut advisories = self.interaction_advisories(product);
        advisories.extend(fifo_advisory(product, batch, today));

        if !advisories.is_empty() && !confirmed {
            return Ok(AddLine::NeedsConfirmation(advisories));
        }

        Ok(AddLine::Apply {
            events: vec![CartEvent::line_added(CartLine::new(product, batch, quantity))],
            advisories,
        })
    }

    /// Removes the line for `batch_id`. Returns no events when there is none.
    pub fn remove_line(&self, batch_id: BatchId) -> Vec<CartEvent> {
        match self.line(batch_id) {
            Some(_) => vec![CartEvent::line_removed(batch_id)],
            None => vec![],
        }
    }

    /// Drops every line.
    pub fn clear(&self) -> Vec<CartEvent> {
        if self.is_empty() {
            vec![]
        } else {
            vec![CartEvent::CartCleared]
        }
    }

    /// Checks `product` against every other product already in the cart, both ways.
    fn interaction_advisories(&self, product: &Product) -> Vec<Advisory> {
        let mut seen: Vec<ProductId> = Vec::new();
        let mut advisories = Vec::new();

        for line in &self.lines {
            if line.product_id == product.id || seen.contains(&line.product_id) {
                continue;
            }

            let conflicts = product.interactions.iter().any(|name| line.is_named(name))
                || line.interactions.iter().any(|name| product.is_named(name));

            if conflicts {
                seen.push(line.product_id);
                advisories.push(Advisory::Interaction {
                    added: product.name.clone(),
                    existing: line.product_name.clone(),
                });
            }
        }

        advisories
    }
}

/// Finds the earliest sellable batch of the product that expires before the selected one.
fn fifo_advisory(product: &Product, selected: &BatchStock, today: NaiveDate) -> Option<Advisory> {
    product
        .batches
        .iter()
        .filter(|b| {
            b.batch.id != selected.batch.id
                && b.batch.expiry < selected.batch.expiry
                && b.batch.expiry > today
                && b.quantity() > 0
        })
        .min_by_key(|b| b.batch.expiry)
        .map(|b| Advisory::Fifo {
            product: product.name.clone(),
            batch_number: b.batch.batch_number.clone(),
            expiry: b.batch.expiry,
        })
}

// Apply event helpers
impl Cart {
    fn apply_quantity_increased(&mut self, data: LineQuantityIncreasedData) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.batch_id == data.batch_id) {
            line.quantity = data.new_quantity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::StockRecordId;
    use store::{Batch, StockRecord};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn batch_stock(product_id: ProductId, number: &str, expiry: NaiveDate, qty: u32, cents: i64) -> BatchStock {
        let id = BatchId::new();
        BatchStock {
            batch: Batch {
                id,
                product_id,
                batch_number: number.to_string(),
                expiry,
                sale_price: Money::from_cents(cents),
                cost_price: Money::from_cents(cents / 2),
            },
            stock: StockRecord {
                id: StockRecordId::new(),
                batch_id: id,
                quantity: qty,
            },
        }
    }

    fn product(name: &str, interactions: &[&str], qty: u32, cents: i64) -> Product {
        let id = ProductId::new();
        Product {
            id,
            name: name.to_string(),
            generic_name: None,
            strength: None,
            list_price: Money::from_cents(cents),
            interactions: interactions.iter().map(|s| s.to_string()).collect(),
            batches: vec![batch_stock(
                id,
                "B-1",
                NaiveDate::from_ymd_opt(2027, 6, 30).unwrap(),
                qty,
                cents,
            )],
        }
    }

    fn add(cart: &mut Cart, product: &Product, qty: u32, confirmed: bool) -> Result<AddLine, CartError> {
        let decision = cart.add_line(product, product.batches[0].batch.id, qty, today(), confirmed)?;
        if let AddLine::Apply { events, .. } = &decision {
            cart.apply_events(events.clone());
        }
        Ok(decision)
    }

    #[test]
    fn add_new_line_freezes_price() {
        let mut cart = Cart::default();
        let mut paracetamol = product("Paracetamol", &[], 10, 500);

        add(&mut cart, &paracetamol, 2, false).unwrap();

        paracetamol.batches[0].batch.sale_price = Money::from_cents(900);
        let line = &cart.lines()[0];
        assert_eq!(line.unit_price, Money::from_cents(500));
        assert_eq!(cart.total(), Money::from_cents(1000));
    }

    #[test]
    fn adding_same_batch_increments() {
        let mut cart = Cart::default();
        let p = product("Paracetamol", &[], 10, 500);

        add(&mut cart, &p, 1, false).unwrap();
        add(&mut cart, &p, 2, false).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines()[0].quantity, 3);
    }

    #[test]
    fn zero_quantity_rejected() {
        let cart = Cart::default();
        let p = product("Paracetamol", &[], 10, 500);
        let err = cart
            .add_line(&p, p.batches[0].batch.id, 0, today(), false)
            .unwrap_err();
        assert_eq!(err, CartError::InvalidQuantity);
    }

    #[test]
    fn out_of_stock_rejected() {
        let mut cart = Cart::default();
        let p = product("Ibuprofen", &[], 0, 300);
        let err = add(&mut cart, &p, 1, false).unwrap_err();
        assert!(matches!(err, CartError::OutOfStock { .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn expired_rejected_even_without_stock() {
        let mut p = product("Ibuprofen", &[], 0, 300);
        p.batches[0].batch.expiry = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();

        let err = Cart::default()
            .add_line(&p, p.batches[0].batch.id, 1, today(), false)
            .unwrap_err();
        assert_eq!(err.to_string(), "EXPIRED ITEM! (Exp: 2026-10-16)");
    }

    #[test]
    fn expiring_today_is_still_sellable() {
        let mut p = product("Ibuprofen", &[], 4, 300);
        p.batches[0].batch.expiry = today();
        assert!(Cart::default().add_line(&p, p.batches[0].batch.id, 1, today(), false).is_ok());
    }

    #[test]
    fn stock_limit_on_increment_leaves_cart_untouched() {
        let mut cart = Cart::default();
        let p = product("Insulin", &[], 2, 2500);

        add(&mut cart, &p, 2, false).unwrap();
        let before = cart.clone();

        let err = add(&mut cart, &p, 1, false).unwrap_err();
        assert!(matches!(
            err,
            CartError::StockLimitExceeded {
                requested: 3,
                available: 2,
                ..
            }
        ));
        assert_eq!(cart, before);
    }

    #[test]
    fn stock_limit_on_new_line() {
        let mut cart = Cart::default();
        let p = product("Insulin", &[], 2, 2500);
        assert!(add(&mut cart, &p, 3, false).is_err());
        assert!(cart.is_empty());
    }

    #[test]
    fn unknown_batch_rejected() {
        let p = product("Insulin", &[], 2, 2500);
        let err = Cart::default()
            .add_line(&p, BatchId::new(), 1, today(), false)
            .unwrap_err();
        assert!(matches!(err, CartError::UnknownBatch { .. }));
    }

    #[test]
    fn remove_restores_previous_cart() {
        let mut cart = Cart::default();
        let a = product("A", &[], 5, 100);
        let b = product("B", &[], 5, 200);
        add(&mut cart, &a, 1, false).unwrap();
        let before = cart.clone();

        add(&mut cart, &b, 1, false).unwrap();
        let events = cart.remove_line(b.batches[0].batch.id);
        cart.apply_events(events);

        assert_eq!(cart, before);
    }

    #[test]
    fn remove_missing_line_is_noop() {
        let cart = Cart::default();
        assert!(cart.remove_line(BatchId::new()).is_empty());
    }

    #[test]
    fn interaction_needs_confirmation() {
        let mut cart = Cart::default();
        let warfarin = product("Warfarin", &["Aspirin"], 5, 1200);
        let aspirin = product("Aspirin", &[], 5, 300);

        add(&mut cart, &warfarin, 1, false).unwrap();
        let decision = add(&mut cart, &aspirin, 1, false).unwrap();

        let AddLine::NeedsConfirmation(advisories) = decision else {
            panic!("expected confirmation, got {decision:?}");
        };
        assert_eq!(
            advisories,
            vec![Advisory::Interaction {
                added: "Aspirin".into(),
                existing: "Warfarin".into(),
            }]
        );
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn interaction_is_checked_both_ways() {
        let mut cart = Cart::default();
        let aspirin = product("Aspirin", &[], 5, 300);
        let warfarin = product("Warfarin", &["aspirin"], 5, 1200);

        add(&mut cart, &aspirin, 1, false).unwrap();
        let decision = add(&mut cart, &warfarin, 1, true).unwrap();

        let AddLine::Apply { advisories, .. } = decision else {
            panic!("confirmed add must apply");
        };
        assert_eq!(advisories.len(), 1);
        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn interaction_matches_generic_name() {
        let mut cart = Cart::default();
        let mut brufen = product("Brufen", &[], 5, 300);
        brufen.generic_name = Some("Ibuprofen".into());
        let lithium = product("Lithium", &["IBUPROFEN"], 5, 800);

        add(&mut cart, &brufen, 1, false).unwrap();
        assert!(matches!(
            add(&mut cart, &lithium, 1, false).unwrap(),
            AddLine::NeedsConfirmation(_)
        ));
    }

    #[test]
    fn fifo_advisory_names_earliest_sellable_batch() {
        let mut p = product("Amoxicillin", &[], 5, 700);
        let late = p.batches[0].batch.id;
        let pid = p.id;
        p.batches.push(batch_stock(pid, "EARLY", NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(), 3, 700));
        p.batches.push(batch_stock(pid, "EARLIER", NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(), 3, 700));
        // Not sellable: no stock, or already expired.
        p.batches.push(batch_stock(pid, "EMPTY", NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(), 0, 700));
        p.batches.push(batch_stock(pid, "STALE", NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(), 9, 700));

        let decision = Cart::default().add_line(&p, late, 1, today(), false).unwrap();
        assert_eq!(
            decision,
            AddLine::NeedsConfirmation(vec![Advisory::Fifo {
                product: "Amoxicillin".into(),
                batch_number: "EARLIER".into(),
                expiry: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            }])
        );
    }

    #[test]
    fn confirmed_fifo_still_adds_selected_batch() {
        let mut cart = Cart::default();
        let mut p = product("Amoxicillin", &[], 5, 700);
        let late = p.batches[0].batch.id;
        let pid = p.id;
        p.batches.push(batch_stock(pid, "EARLY", NaiveDate::from_ymd_opt(2026, 12, 1).unwrap(), 3, 700));

        let decision = cart.add_line(&p, late, 1, today(), true).unwrap();
        if let AddLine::Apply { events, .. } = decision {
            cart.apply_events(events);
        }
        assert_eq!(cart.lines()[0].batch_id, late);
    }

    #[test]
    fn increment_does_not_raise_advisories() {
        let mut cart = Cart::default();
        let warfarin = product("Warfarin", &["Aspirin"], 5, 1200);
        let aspirin = product("Aspirin", &[], 5, 300);
        add(&mut cart, &warfarin, 1, false).unwrap();
        add(&mut cart, &aspirin, 1, true).unwrap();

        let decision = add(&mut cart, &aspirin, 1, false).unwrap();
        assert!(matches!(decision, AddLine::Apply { ref advisories, .. } if advisories.is_empty()));
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn total_matches_worked_example() {
        let mut cart = Cart::default();
        let x = product("X", &[], 10, 500);
        let y = product("Y", &[], 2, 200);
        add(&mut cart, &x, 3, false).unwrap();
        add(&mut cart, &y, 2, false).unwrap();
        assert_eq!(cart.total(), Money::from_cents(1900));
    }
}
