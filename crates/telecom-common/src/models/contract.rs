use super::service::Service;
use super::ParseEnumError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Contract lifecycle status
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    #[default]
    Active,
    Suspended,
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Suspended => "suspended",
            ContractStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContractStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(ContractStatus::Active),
            "suspended" => Ok(ContractStatus::Suspended),
            "cancelled" => Ok(ContractStatus::Cancelled),
            other => Err(ParseEnumError {
                kind: "status",
                value: other.to_string(),
                expected: "active, suspended, cancelled",
            }),
        }
    }
}

/// Contract owned by a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    pub user_id: i64,
    pub contract_number: String,
    pub start_date: NaiveDate,
    pub status: ContractStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Contract with its services nested, the shape used by list/show and `/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractWithServices {
    #[serde(flatten)]
    pub contract: Contract,
    pub services: Vec<Service>,
}

impl ContractWithServices {
    /// Attach to each contract the services whose `contract_id` points at it.
    pub fn group(contracts: Vec<Contract>, services: Vec<Service>) -> Vec<Self> {
        let mut services = services;
        contracts
            .into_iter()
            .map(|contract| {
                let (own, rest): (Vec<Service>, Vec<Service>) = services
                    .drain(..)
                    .partition(|s| s.contract_id == contract.id);
                services = rest;
                ContractWithServices { contract, services: own }
            })
            .collect()
    }
}
