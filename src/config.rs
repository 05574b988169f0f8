use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// Environment variable overriding `store.postgres_url`.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
/// Environment variable overriding `auth.jwt_secret`.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    /// Extra `EnvFilter` directives, e.g. `bank_ledger::ledger=debug`
    #[serde(default)]
    pub log_directives: Vec<String>,
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub store: StoreConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub accounts: AccountsConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    #[serde(default)]
    pub postgres_url: Option<String>,
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
    /// Upper bound on a single row-lock wait inside a unit of work.
    pub lock_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Postgres,
            postgres_url: None,
            max_connections: 20,
            acquire_timeout_ms: 5_000,
            lock_timeout_ms: 2_000,
        }
    }
}

impl StoreConfig {
    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    #[serde(default)]
    pub jwt_secret: String,
    pub issuer: String,
    pub token_ttl_minutes: i64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccountsConfig {
    pub country_code: String,
    pub bank_code: String,
    /// Decimal string, e.g. "0.00"
    pub opening_balance: String,
    pub iban_attempts: u32,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            country_code: "NL".to_string(),
            bank_code: "LEDG".to_string(),
            opening_balance: "0.00".to_string(),
            iban_attempts: 5,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    pub timeout_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self { timeout_ms: 5_000 }
    }
}

impl TransferConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl AppConfig {
    /// Load `config/<env>.yaml` and apply environment overrides.
    ///
    /// This is the only place process environment is consulted; the result
    /// is immutable for the lifetime of the server.
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path))?;

        if let Ok(url) = std::env::var(DATABASE_URL_ENV) {
            config.store.postgres_url = Some(url);
        }
        if let Ok(secret) = std::env::var(JWT_SECRET_ENV) {
            config.auth.jwt_secret = secret;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store.backend == StoreBackend::Postgres {
            if self.store.postgres_url.is_none() {
                bail!("store.postgres_url (or {}) is required", DATABASE_URL_ENV);
            }
            if self.auth.jwt_secret.is_empty() {
                bail!("auth.jwt_secret (or {}) is required", JWT_SECRET_ENV);
            }
        }
        if self.auth.token_ttl_minutes <= 0 {
            bail!("auth.token_ttl_minutes must be positive");
        }
        if self.accounts.iban_attempts == 0 {
            bail!("accounts.iban_attempts must be at least 1");
        }
        Ok(())
    }
}
