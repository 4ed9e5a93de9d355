//! HTTP route handlers.

pub mod catalog;
pub mod dashboard;
pub mod health;
pub mod invoices;
pub mod metrics;
pub mod sessions;

use std::str::FromStr;

use crate::error::ApiError;

/// Parses an identifier taken from the request path.
pub(crate) fn parse_id<T: FromStr>(kind: &str, raw: &str) -> Result<T, ApiError>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {kind} id: {e}")))
}
