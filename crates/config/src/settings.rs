use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub app: AppSettings,
    pub database: DatabaseSettings,
    pub auth: AuthSettings,
    pub vapid: VapidSettings,
    pub delivery: DeliverySettings,
    pub gateway: GatewaySettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub name: String,
    pub max_pool_size: Option<u32>,
    pub min_pool_size: Option<u32>,
    pub subscriptions_collection: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub token_ttl_secs: u64,
    pub issuer: String,
}

/// Application-server identification for the Web Push protocol.
/// Keys are URL-safe base64; `subject` is a `mailto:` or URL claim.
#[derive(Debug, Deserialize, Clone)]
pub struct VapidSettings {
    pub public_key: String,
    pub private_key: String,
    pub subject: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeliverySettings {
    pub max_attempts: u32,
    pub retry_base_ms: u64,
    pub retry_cap_ms: u64,
    pub concurrency: usize,
    pub request_timeout_secs: u64,
    pub default_ttl_secs: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    /// Subject types the default resolver accepts on subscribe.
    pub subject_types: Vec<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::default()
                    .separator("__")
                    .prefix("PUSHGATE"),
            )
            .set_default("app.host", "0.0.0.0")?
            .set_default("app.port", 8080)?
            .set_default("database.url", "mongodb://localhost:27017")?
            .set_default("database.name", "pushgate")?
            .set_default("database.subscriptions_collection", "push_subscriptions")?
            .set_default("auth.secret", "change-me-in-production")?
            .set_default("auth.token_ttl_secs", 3600)?
            .set_default("auth.issuer", "pushgate")?
            .set_default("vapid.public_key", "")?
            .set_default("vapid.private_key", "")?
            .set_default("vapid.subject", "")?
            .set_default("delivery.max_attempts", 3)?
            .set_default("delivery.retry_base_ms", 1000)?
            .set_default("delivery.retry_cap_ms", 30000)?
            .set_default("delivery.concurrency", 25)?
            .set_default("delivery.request_timeout_secs", 10)?
            .set_default("delivery.default_ttl_secs", 3600)?
            .set_default("gateway.subject_types", vec!["user".to_string()])?
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::load().expect("Failed to load default settings")
    }
}
