//! Field-level validation shared by the API request types.
//!
//! Request structs derive [`validator::Validate`] for format rules. Failures
//! are gathered into [`ValidationErrors`], the field -> messages map the API
//! returns, so a client gets every problem with a request in one response.

use crate::models::auth::Role;
use crate::models::contract::ContractStatus;
use crate::models::service::ServiceType;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;
use validator::ValidationError;

/// Shortest password accepted anywhere an account is created.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Field name -> list of messages
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for a single failing field.
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Errors from a derived `validate()` call; empty when it passed.
    pub fn from_result(result: Result<(), validator::ValidationErrors>) -> Self {
        result.err().map(Self::from).unwrap_or_default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Flag `field` as missing unless `present`. Used where a field is
    /// mandatory for one operation but optional for another (PUT vs PATCH).
    pub fn require(&mut self, field: &str, present: bool) {
        if !present {
            self.add(field, format!("The {} field is required.", label(field)));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when nothing failed.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut out = Self::new();
        for (field, failures) in errors.field_errors() {
            let field = field.to_string();
            for failure in failures.iter() {
                out.add(&field, message_for(&field, failure));
            }
        }
        out
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for messages in self.fields.values() {
            for message in messages {
                if !first {
                    f.write_str(" ")?;
                }
                f.write_str(message)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// `contract_number` reads as "contract number" in messages.
fn label(field: &str) -> String {
    field.replace('_', " ")
}

fn message_for(field: &str, failure: &ValidationError) -> String {
    let label = label(field);
    let number = |name: &str| failure.params.get(name).and_then(|v| v.as_u64());
    match failure.code.as_ref() {
        "required" => format!("The {label} field is required."),
        "email" => format!("The {label} must be a valid email address."),
        "length" => {
            let len = failure
                .params
                .get("value")
                .and_then(|v| v.as_str())
                .map(|s| s.chars().count() as u64);
            match (len, number("min"), number("max")) {
                (Some(len), Some(min), _) if len < min => {
                    format!("The {label} must be at least {min} characters.")
                }
                (_, _, Some(max)) => {
                    format!("The {label} may not be greater than {max} characters.")
                }
                (_, Some(min), None) => format!("The {label} must be at least {min} characters."),
                _ => format!("The {label} has an invalid length."),
            }
        }
        "range" => match number("min") {
            Some(min) => format!("The {label} must be at least {min}."),
            None => format!("The {label} is out of range."),
        },
        "date" => format!("The {label} is not a valid date."),
        "in" => format!("The selected {label} is invalid."),
        _ => failure
            .message
            .as_ref()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("The {label} is invalid.")),
    }
}

// Custom rules for `#[validate(custom(function = "..."))]`.

/// A `YYYY-MM-DD` calendar date.
pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<NaiveDate>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("date"))
}

pub fn validate_role(value: &str) -> Result<(), ValidationError> {
    one_of::<Role>(value)
}

pub fn validate_contract_status(value: &str) -> Result<(), ValidationError> {
    one_of::<ContractStatus>(value)
}

pub fn validate_service_type(value: &str) -> Result<(), ValidationError> {
    one_of::<ServiceType>(value)
}

fn one_of<T: FromStr>(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<T>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("in"))
}

/// Parse a field that already passed its `custom` rule into its typed form.
pub fn parse_field<T: FromStr>(field: &str, value: Option<&str>) -> Result<Option<T>, ValidationErrors> {
    value
        .map(|v| {
            v.parse::<T>().map_err(|_| {
                ValidationErrors::single(field, format!("The selected {} is invalid.", label(field)))
            })
        })
        .transpose()
}

// Deserializers for request fields, used with `#[serde(deserialize_with = "...")]`.
// Blank input counts as absent so `required` rejects it.

/// Trim surrounding whitespace.
pub fn trimmed<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Trim and lowercase, for email addresses.
pub fn lowercase<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(trimmed(deserializer)?.map(|s| s.to_lowercase()))
}

/// Passwords are kept verbatim; only an empty string is treated as absent.
pub fn verbatim<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}
