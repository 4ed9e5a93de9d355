//! Product and customer lookup endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{NaiveDate, Utc};
use common::{BatchId, Money, ProductId};
use serde::{Deserialize, Serialize};
use store::{Customer, PharmacyStore, Product};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CustomerQuery {
    pub search: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct ProductResponse {
    pub id: ProductId,
    pub name: String,
    pub generic_name: Option<String>,
    pub strength: Option<String>,
    pub list_price: Money,
    pub interactions: Vec<String>,
    pub total_stock: u64,
    pub batches: Vec<BatchResponse>,
}

#[derive(Serialize)]
pub struct BatchResponse {
    pub id: BatchId,
    pub batch_number: String,
    pub expiry: NaiveDate,
    pub expired: bool,
    pub sale_price: Money,
    pub quantity: u32,
}

impl ProductResponse {
    fn new(product: Product, today: NaiveDate) -> Self {
        let total_stock = product.total_stock();
        let batches = product
            .batches
            .into_iter()
            .map(|b| BatchResponse {
                expired: b.batch.is_expired(today),
                id: b.batch.id,
                batch_number: b.batch.batch_number,
                expiry: b.batch.expiry,
                sale_price: b.batch.sale_price,
                quantity: b.stock.quantity,
            })
            .collect();

        Self {
            id: product.id,
            name: product.name,
            generic_name: product.generic_name,
            strength: product.strength,
            list_price: product.list_price,
            interactions: product.interactions,
            total_stock,
            batches,
        }
    }
}

/// GET /products?search= : catalog search on display or generic name.
#[tracing::instrument(skip(state))]
pub async fn products<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<ProductResponse>>, ApiError> {
    let products = state
        .catalog
        .search(query.search.as_deref().unwrap_or_default())
        .await?;
    let today = Utc::now().date_naive();

    Ok(Json(
        products
            .into_iter()
            .map(|p| ProductResponse::new(p, today))
            .collect(),
    ))
}

/// GET /customers?search=&limit= : the customer picker list.
#[tracing::instrument(skip(state))]
pub async fn customers<S: PharmacyStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<CustomerQuery>,
) -> Result<Json<Vec<Customer>>, ApiError> {
    let limit = query.limit.unwrap_or(state.customer_list_limit);
    let customers = match query.search.as_deref() {
        Some(term) => state.catalog.search_customers(term, limit).await?,
        None => state.catalog.customers(limit).await?,
    };
    Ok(Json(customers))
}
