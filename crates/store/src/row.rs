//! Backend row shapes and their mapping onto typed records.
//!
//! Rows mirror the nested JSON the hosted backend returns for
//! `products(*, product_batches(*, inventory(*)))`. Every field is optional
//! at this layer; the `TryFrom` impls decide what is required and reject
//! anything missing or out of range with [`StoreError::MalformedRecord`].

use chrono::NaiveDate;
use common::{BatchId, CustomerId, Money, ProductId, StockRecordId};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::record::{Batch, BatchStock, Customer, Product, StockRecord};
use crate::{Result, StoreError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductRow {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub generic_name: Option<String>,
    pub strength: Option<String>,
    pub price: Option<Value>,
    pub interaction_data: Option<Vec<String>>,
    #[serde(default)]
    pub product_batches: Vec<BatchRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchRow {
    pub id: Option<Uuid>,
    pub batch_number: Option<String>,
    pub expiry_date: Option<String>,
    pub sale_price: Option<Value>,
    pub cost_price: Option<Value>,
    #[serde(default)]
    pub inventory: Vec<InventoryRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InventoryRow {
    pub id: Option<Uuid>,
    pub quantity_boxes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CustomerRow {
    pub id: Option<Uuid>,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// A catalog dump: products with nested batches, plus customers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogFixture {
    #[serde(default)]
    pub products: Vec<ProductRow>,
    #[serde(default)]
    pub customers: Vec<CustomerRow>,
}

impl CatalogFixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Maps every row, failing on the first malformed one.
    pub fn into_records(self) -> Result<(Vec<Product>, Vec<Customer>)> {
        let products = self
            .products
            .into_iter()
            .map(Product::try_from)
            .collect::<Result<Vec<_>>>()?;
        let customers = self
            .customers
            .into_iter()
            .map(Customer::try_from)
            .collect::<Result<Vec<_>>>()?;
        Ok((products, customers))
    }
}

fn required<T>(entity: &'static str, field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| StoreError::malformed(entity, format!("missing {field}")))
}

fn required_text(entity: &'static str, field: &str, value: Option<String>) -> Result<String> {
    let text = required(entity, field, value)?;
    if text.trim().is_empty() {
        return Err(StoreError::malformed(entity, format!("empty {field}")));
    }
    Ok(text)
}

/// Reads a price that the backend may send as a JSON number or string.
pub(crate) fn money_field(entity: &'static str, field: &str, value: Option<Value>) -> Result<Money> {
    let raw = match required(entity, field, value)? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s,
        other => {
            return Err(StoreError::malformed(
                entity,
                format!("{field} is not a number: {other}"),
            ));
        }
    };
    Money::parse(&raw).map_err(|e| StoreError::malformed(entity, format!("{field}: {e}")))
}

/// Reads a calendar date, ignoring any time component after the first ten characters.
pub(crate) fn date_field(entity: &'static str, field: &str, value: Option<String>) -> Result<NaiveDate> {
    let raw = required(entity, field, value)?;
    let day = raw.get(..10).unwrap_or(&raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| StoreError::malformed(entity, format!("{field} is not a date: {raw}")))
}

pub(crate) fn quantity_field(entity: &'static str, value: i64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::malformed(entity, format!("quantity out of range: {value}")))
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self> {
        let id = ProductId::from_uuid(required("product", "id", row.id)?);
        let name = required_text("product", "name", row.name)?;
        let list_price = money_field("product", "price", row.price)?;

        let batches = row
            .product_batches
            .into_iter()
            .map(|b| batch_from_row(id, b))
            .collect::<Result<Vec<_>>>()?;

        Ok(Product {
            id,
            name,
            generic_name: row.generic_name.filter(|g| !g.trim().is_empty()),
            strength: row.strength,
            list_price,
            interactions: row.interaction_data.unwrap_or_default(),
            batches,
        })
    }
}

fn batch_from_row(product_id: ProductId, row: BatchRow) -> Result<BatchStock> {
    let id = BatchId::from_uuid(required("batch", "id", row.id)?);
    let batch = Batch {
        id,
        product_id,
        batch_number: required_text("batch", "batch_number", row.batch_number)?,
        expiry: date_field("batch", "expiry_date", row.expiry_date)?,
        sale_price: money_field("batch", "sale_price", row.sale_price)?,
        cost_price: money_field("batch", "cost_price", row.cost_price)?,
    };

    let mut inventory = row.inventory.into_iter();
    let (Some(stock_row), None) = (inventory.next(), inventory.next()) else {
        return Err(StoreError::malformed(
            "inventory",
            format!("batch {id} must have exactly one stock record"),
        ));
    };
    let stock = StockRecord {
        id: StockRecordId::from_uuid(required("inventory", "id", stock_row.id)?),
        batch_id: id,
        quantity: quantity_field(
            "inventory",
            required("inventory", "quantity_boxes", stock_row.quantity_boxes)?,
        )?,
    };

    Ok(BatchStock { batch, stock })
}

impl TryFrom<CustomerRow> for Customer {
    type Error = StoreError;

    fn try_from(row: CustomerRow) -> Result<Self> {
        Ok(Customer {
            id: CustomerId::from_uuid(required("customer", "id", row.id)?),
            full_name: required_text("customer", "full_name", row.full_name)?,
            phone: row.phone,
            email: row.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_json() -> Value {
        json!({
            "id": "6f1c1a4e-0000-4000-8000-000000000001",
            "name": "Warfarin",
            "generic_name": "Warfarin sodium",
            "strength": "5mg",
            "price": 12.5,
            "interaction_data": ["Aspirin"],
            "product_batches": [{
                "id": "6f1c1a4e-0000-4000-8000-000000000002",
                "batch_number": "W-001",
                "expiry_date": "2027-03-31",
                "sale_price": "12.50",
                "cost_price": 8,
                "inventory": [{ "id": "6f1c1a4e-0000-4000-8000-000000000003", "quantity_boxes": 14 }]
            }]
        })
    }

    fn map(value: Value) -> Result<Product> {
        let row: ProductRow = serde_json::from_value(value).unwrap();
        Product::try_from(row)
    }

    #[test]
    fn maps_nested_product_row() {
        let product = map(product_json()).unwrap();
        assert_eq!(product.name, "Warfarin");
        assert_eq!(product.list_price, Money::from_cents(1250));
        assert_eq!(product.interactions, vec!["Aspirin".to_string()]);

        let batch = &product.batches[0];
        assert_eq!(batch.batch.product_id, product.id);
        assert_eq!(batch.batch.expiry, NaiveDate::from_ymd_opt(2027, 3, 31).unwrap());
        assert_eq!(batch.batch.sale_price, Money::from_cents(1250));
        assert_eq!(batch.batch.cost_price, Money::from_cents(800));
        assert_eq!(batch.quantity(), 14);
        assert_eq!(batch.stock.batch_id, batch.batch.id);
    }

    #[test]
    fn rejects_missing_name() {
        let mut value = product_json();
        value["name"] = Value::Null;
        let err = map(value).unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord { entity: "product", .. }));
    }

    #[test]
    fn rejects_blank_name() {
        let mut value = product_json();
        value["name"] = json!("   ");
        assert!(map(value).is_err());
    }

    #[test]
    fn rejects_negative_stock() {
        let mut value = product_json();
        value["product_batches"][0]["inventory"][0]["quantity_boxes"] = json!(-2);
        let err = map(value).unwrap_err();
        assert!(matches!(err, StoreError::MalformedRecord { entity: "inventory", .. }));
    }

    #[test]
    fn rejects_batch_without_stock_record() {
        let mut value = product_json();
        value["product_batches"][0]["inventory"] = json!([]);
        assert!(map(value).is_err());
    }

    #[test]
    fn rejects_unparsable_expiry() {
        let mut value = product_json();
        value["product_batches"][0]["expiry_date"] = json!("next spring");
        let err = map(value).unwrap_err();
        assert!(err.to_string().contains("expiry_date"));
    }

    #[test]
    fn accepts_timestamp_shaped_expiry() {
        let mut value = product_json();
        value["product_batches"][0]["expiry_date"] = json!("2027-03-31T00:00:00+00:00");
        assert!(map(value).is_ok());
    }

    #[test]
    fn missing_interactions_mean_none() {
        let mut value = product_json();
        value.as_object_mut().unwrap().remove("interaction_data");
        assert!(map(value).unwrap().interactions.is_empty());
    }

    #[test]
    fn fixture_maps_customers() {
        let fixture = CatalogFixture::from_json(
            r#"{"customers":[{"id":"6f1c1a4e-0000-4000-8000-0000000000aa","full_name":"Sara Ali","phone":"0550000000"}]}"#,
        )
        .unwrap();
        let (products, customers) = fixture.into_records().unwrap();
        assert!(products.is_empty());
        assert_eq!(customers[0].full_name, "Sara Ali");
        assert_eq!(customers[0].email, None);
    }
}
