use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Shared admin password. The login cookie carries this value verbatim.
    pub admin_password: String,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_cookie_max_age_days")]
    pub cookie_max_age_days: i64,
}

fn default_cookie_name() -> String {
    "admin_auth".into()
}
fn default_cookie_max_age_days() -> i64 {
    7
}

/// Lifetimes and limits for the in-memory verification store.
#[derive(Debug, Deserialize, Clone)]
pub struct VerificationConfig {
    /// How long a sent code stays valid. Default: 300.
    #[serde(default = "default_code_ttl_secs")]
    pub code_ttl_secs: u64,
    /// How long an issued admin token stays valid. Default: 43200 (12h).
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Failed attempts allowed before a code is locked. Default: 5.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Minimum gap between two sends for the same key. Default: 60.
    #[serde(default = "default_send_interval_secs")]
    pub send_interval_secs: u64,
    /// How often the sweeper removes expired entries. Default: 300.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_code_ttl_secs() -> u64 {
    300
}
fn default_token_ttl_secs() -> u64 {
    12 * 60 * 60
}
fn default_max_attempts() -> u32 {
    5
}
fn default_send_interval_secs() -> u64 {
    60
}
fn default_sweep_interval_secs() -> u64 {
    300
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            code_ttl_secs: default_code_ttl_secs(),
            token_ttl_secs: default_token_ttl_secs(),
            max_attempts: default_max_attempts(),
            send_interval_secs: default_send_interval_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// SMS gateway settings. Without `gateway_url` messages are logged, not sent.
#[derive(Debug, Deserialize, Clone)]
pub struct SmsConfig {
    pub gateway_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default)]
    pub sign_name: String,
    /// Recipient of admin verification codes.
    pub admin_phone: Option<String>,
    #[serde(default = "default_sms_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_sms_timeout_secs() -> u64 {
    10
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            gateway_url: None,
            api_key: None,
            sign_name: String::new(),
            admin_phone: None,
            timeout_secs: default_sms_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PhoneLookupConfig {
    /// Remote carrier lookup endpoint. The built-in prefix table is used when absent or failing.
    pub provider_url: Option<String>,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default = "default_cache_ttl_days")]
    pub cache_ttl_days: i64,
    #[serde(default = "default_lookup_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_cache_capacity() -> usize {
    1024
}
fn default_cache_ttl_days() -> i64 {
    30
}
fn default_lookup_timeout_secs() -> u64 {
    5
}

impl Default for PhoneLookupConfig {
    fn default() -> Self {
        Self {
            provider_url: None,
            cache_capacity: default_cache_capacity(),
            cache_ttl_days: default_cache_ttl_days(),
            timeout_secs: default_lookup_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub verification: VerificationConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub phone_lookup: PhoneLookupConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://portal.db?mode=rwc")?
            // Load from config/config.toml
            .add_source(File::with_name("config/config").required(false))
            // Override from environment (e.g., PORTAL__AUTH__ADMIN_PASSWORD)
            .add_source(Environment::with_prefix("PORTAL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
