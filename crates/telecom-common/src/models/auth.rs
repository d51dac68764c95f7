use super::contract::ContractWithServices;
use super::ParseEnumError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role. New registrations are always `Customer`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Customer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "customer" => Ok(Role::Customer),
            "admin" => Ok(Role::Admin),
            other => Err(ParseEnumError {
                kind: "role",
                value: other.to_string(),
                expected: "customer, admin",
            }),
        }
    }
}

/// User model (safe for client responses -- no password_hash)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user together with everything they own, as returned by `/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(flatten)]
    pub user: User,
    pub contracts: Vec<ContractWithServices>,
}

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id, stringified
    pub sub: String,
    pub email: String,
    pub role: Role,
    /// Unique token id, the key used for revocation
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Parse the subject back into a user id.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}
