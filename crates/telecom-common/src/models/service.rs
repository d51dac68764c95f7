use super::ParseEnumError;
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of service attached to a contract
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServiceType {
    Internet,
    Tv,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::Internet => "internet",
            ServiceType::Tv => "tv",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = ParseEnumError;

    /// Case-insensitive: clients send both `Internet` and `internet`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "internet" => Ok(ServiceType::Internet),
            "tv" => Ok(ServiceType::Tv),
            _ => Err(ParseEnumError {
                kind: "type",
                value: s.to_string(),
                expected: "internet, tv",
            }),
        }
    }
}

/// Service billed under a contract
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: i64,
    pub contract_id: i64,
    #[serde(rename = "type")]
    pub service_type: ServiceType,
    pub plan_name: String,
    pub price: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
