//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, RefundError};
use domain::{CartError, CatalogError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// The cart rejected a change.
    Cart(CartError),
    Catalog(CatalogError),
    Checkout(CheckoutError),
    Refund(RefundError),
    Store(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Cart(err) => (cart_status(&err), err.to_string()),
            ApiError::Catalog(err) => (catalog_status(&err), err.to_string()),
            ApiError::Checkout(err) => (checkout_status(&err), err.to_string()),
            ApiError::Refund(err) => (refund_status(&err), err.to_string()),
            ApiError::Store(err) => (store_status(&err), err.to_string()),
        };

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn cart_status(err: &CartError) -> StatusCode {
    match err {
        CartError::InvalidQuantity => StatusCode::BAD_REQUEST,
        CartError::UnknownBatch { .. } => StatusCode::NOT_FOUND,
        CartError::OutOfStock { .. }
        | CartError::Expired { .. }
        | CartError::StockLimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
    }
}

fn catalog_status(err: &CatalogError) -> StatusCode {
    match err {
        CatalogError::ProductNotFound(_)
        | CatalogError::BatchNotFound { .. }
        | CatalogError::CustomerNotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Store(e) => store_status(e),
    }
}

fn checkout_status(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::EmptyCart => StatusCode::UNPROCESSABLE_ENTITY,
        CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
        CheckoutError::CheckoutFailed { .. } if err.is_unavailable() => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        CheckoutError::CheckoutFailed { .. } | CheckoutError::CompensationFailed { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn refund_status(err: &RefundError) -> StatusCode {
    match err {
        RefundError::InvalidQuantity => StatusCode::BAD_REQUEST,
        RefundError::LineNotFound(_) | RefundError::InvoiceNotFound(_) => StatusCode::NOT_FOUND,
        RefundError::NotRefundable { .. } => StatusCode::CONFLICT,
        RefundError::ExceedsRefundable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RefundError::RefundFailed { source, .. } | RefundError::Store(source) => {
            store_status(source)
        }
        RefundError::CompensationFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        StoreError::InsufficientStock { .. } => StatusCode::CONFLICT,
        StoreError::RefundLimitExceeded { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        StoreError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<CartError> for ApiError {
    fn from(err: CartError) -> Self {
        ApiError::Cart(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<RefundError> for ApiError {
    fn from(err: RefundError) -> Self {
        ApiError::Refund(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}
