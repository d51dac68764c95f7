use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

/// Admin account to seed on startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialAdminConfig {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Auth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Access token lifetime in seconds (default: 3600)
    #[serde(default = "default_token_ttl")]
    pub token_ttl_secs: u64,
    /// How long after expiry a token may still be exchanged on /refresh (default: 14 days)
    #[serde(default = "default_refresh_grace")]
    pub refresh_grace_secs: u64,
    pub initial_admin: Option<InitialAdminConfig>,
}

fn default_token_ttl() -> u64 {
    3600
}

fn default_refresh_grace() -> u64 {
    14 * 24 * 3600
}

/// Server configuration - loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen: String, // "0.0.0.0:8000"
    pub db: DbConfig,
    pub auth: AuthConfig,
}

impl ServerConfig {
    /// Reject configurations that would start a server nobody can log into.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            bail!("auth.jwt_secret must not be empty");
        }
        if self.auth.token_ttl_secs == 0 {
            bail!("auth.token_ttl_secs must be greater than zero");
        }
        if self.db.max_connections == 0 {
            bail!("db.max_connections must be greater than zero");
        }
        if let Some(admin) = &self.auth.initial_admin {
            if admin.password.chars().count() < telecom_common::validation::MIN_PASSWORD_LEN {
                bail!(
                    "auth.initial_admin.password must be at least {} characters",
                    telecom_common::validation::MIN_PASSWORD_LEN
                );
            }
        }
        Ok(())
    }
}

/// Load server config from a YAML file with TELECOM__ env var overrides.
pub fn load_config(path: &str) -> anyhow::Result<ServerConfig> {
    let config: ServerConfig = config::Config::builder()
        .add_source(config::File::new(path, config::FileFormat::Yaml))
        .add_source(
            config::Environment::with_prefix("TELECOM")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()
        .with_context(|| format!("Failed to build config from: {}", path))?
        .try_deserialize()
        .with_context(|| format!("Failed to deserialize config from: {}", path))?;
    config.validate()?;
    Ok(config)
}
