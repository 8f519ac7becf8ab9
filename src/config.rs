use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub idempotency: IdempotencySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Which cache backend holds idempotency records and reservations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    pub key_prefix: String,
    pub sweep_interval_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            redis_url: None,
            key_prefix: "subscription_api".to_string(),
            sweep_interval_secs: 60,
        }
    }
}

/// One idempotency-enabled route.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteSettings {
    #[serde(default = "default_route_method")]
    pub method: String,
    pub path: String,
    pub ttl_secs: u64,
    #[serde(default = "default_success_status")]
    pub success_status: u16,
}

fn default_route_method() -> String {
    "POST".to_string()
}

fn default_success_status() -> u16 {
    200
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdempotencySettings {
    pub key_prefix: String,
    pub max_key_length: usize,
    pub max_body_bytes: usize,
    pub lease_ms: u64,
    pub wait_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub routes: Vec<RouteSettings>,
}

impl Default for IdempotencySettings {
    fn default() -> Self {
        Self {
            key_prefix: "idem".to_string(),
            max_key_length: 255,
            max_body_bytes: 1024 * 1024,
            lease_ms: 30_000,
            wait_timeout_ms: 5_000,
            poll_interval_ms: 25,
            routes: vec![
                RouteSettings {
                    method: default_route_method(),
                    path: "/subscription/subscribe".to_string(),
                    ttl_secs: 30,
                    success_status: default_success_status(),
                },
                RouteSettings {
                    method: default_route_method(),
                    path: "/subscription/unsubscribe".to_string(),
                    ttl_secs: 30,
                    success_status: default_success_status(),
                },
            ],
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}
