//! Recognising store-level constraint failures inside repository errors.
//!
//! Uniqueness and ownership are enforced by Postgres, not by application
//! locks; callers use this to turn a lost race into a client error.

use anyhow::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// `23505`, carrying the constraint name when Postgres reports one
    Unique(Option<String>),
    /// `23503`
    ForeignKey(Option<String>),
}

/// Find a unique or foreign-key violation anywhere in the error chain.
pub fn constraint_violation(err: &Error) -> Option<ConstraintViolation> {
    err.chain().find_map(|cause| {
        let db_err = cause.downcast_ref::<sqlx::Error>()?.as_database_error()?;
        let constraint = db_err.constraint().map(str::to_string);
        if db_err.is_unique_violation() {
            Some(ConstraintViolation::Unique(constraint))
        } else if db_err.is_foreign_key_violation() {
            Some(ConstraintViolation::ForeignKey(constraint))
        } else {
            None
        }
    })
}
