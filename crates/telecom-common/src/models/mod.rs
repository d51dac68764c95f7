pub mod auth;
pub mod contract;
pub mod service;

use thiserror::Error;

/// Returned when a stored or submitted string is not a known enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{value}' is not a valid {kind}, expected one of: {expected}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
    pub expected: &'static str,
}
