//! Read-only catalog queries over the store.

use common::{BatchId, CustomerId, ProductId};
use store::{Customer, PharmacyStore, Product, StoreError};
use thiserror::Error;

/// Default number of customers listed at the terminal.
pub const DEFAULT_CUSTOMER_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    #[error("Batch {batch_id} not found for product {product_id}")]
    BatchNotFound {
        product_id: ProductId,
        batch_id: BatchId,
    },

    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Catalog query façade used by the terminal.
pub struct CatalogService<S: PharmacyStore> {
    store: S,
}

impl<S: PharmacyStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns every product with batches and stock, ordered by name.
    pub async fn products(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.store.fetch_products().await?)
    }

    /// Case-insensitive substring search on display or generic name.
    ///
    /// A blank term returns the full catalog.
    #[tracing::instrument(skip(self))]
    pub async fn search(&self, term: &str) -> Result<Vec<Product>, CatalogError> {
        let products = self.store.fetch_products().await?;
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(products);
        }

        Ok(products
            .into_iter()
            .filter(|p| {
                p.name.to_lowercase().contains(&needle)
                    || p
                        .generic_name
                        .as_deref()
                        .is_some_and(|g| g.to_lowercase().contains(&needle))
            })
            .collect())
    }

    /// Loads a product and checks that `batch_id` is one of its batches.
    ///
    /// Always reads through to the store so stock and expiry are current.
    pub async fn locate(
        &self,
        product_id: ProductId,
        batch_id: BatchId,
    ) -> Result<Product, CatalogError> {
        let product = self
            .store
            .fetch_product(product_id)
            .await?
            .ok_or(CatalogError::ProductNotFound(product_id))?;

        if product.batch(batch_id).is_none() {
            return Err(CatalogError::BatchNotFound {
                product_id,
                batch_id,
            });
        }

        Ok(product)
    }

    pub async fn customers(&self, limit: usize) -> Result<Vec<Customer>, CatalogError> {
        Ok(self.store.fetch_customers(limit).await?)
    }

    /// Filters the first `limit` customers by a case-insensitive name substring.
    pub async fn search_customers(
        &self,
        term: &str,
        limit: usize,
    ) -> Result<Vec<Customer>, CatalogError> {
        let needle = term.trim().to_lowercase();
        let customers = self.store.fetch_customers(limit).await?;
        Ok(customers
            .into_iter()
            .filter(|c| c.full_name.to_lowercase().contains(&needle))
            .collect())
    }

    pub async fn customer(&self, customer_id: CustomerId) -> Result<Customer, CatalogError> {
        self.store
            .fetch_customer(customer_id)
            .await?
            .ok_or(CatalogError::CustomerNotFound(customer_id))
    }
}
