//! Service configuration.
//!
//! All configuration comes from environment variables with sensible
//! defaults for local development. Optional integrations (database,
//! gateways, admin key) are logged as warnings when absent rather than
//! failing startup.

/// Service configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (`LISTEN_ADDR`).
    pub listen_addr: String,

    /// `PostgreSQL` connection URL (`DATABASE_URL`). When absent the
    /// service runs on the in-memory store (development mode).
    pub database_url: Option<String>,

    /// Base URL of the marketplace identity provider (`AUTH_BASE_URL`).
    /// JWKS is fetched from `{base}/.well-known/jwks.json`.
    pub auth_base_url: String,

    /// Expected JWT audience (`AUTH_AUDIENCE`).
    pub auth_audience: String,

    /// Admin API key for review endpoints (`ADMIN_API_KEY`).
    pub admin_api_key: Option<String>,

    /// Shared HMAC secret for gateway A notifications
    /// (`GATEWAY_A_SECRET`).
    pub gateway_a_secret: Option<String>,

    /// HMAC secret for gateway B signature headers
    /// (`GATEWAY_B_WEBHOOK_SECRET`).
    pub gateway_b_webhook_secret: Option<String>,

    /// Pre-shared gateway B API key, base64-encoded 32 bytes, used to
    /// decrypt notification payloads (`GATEWAY_B_API_KEY`).
    pub gateway_b_api_key: Option<String>,

    /// Allowed CORS origins (`CORS_ORIGINS`, comma-separated, `*` for
    /// any).
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes (`MAX_BODY_BYTES`).
    pub max_body_bytes: usize,

    /// Request timeout in seconds (`REQUEST_TIMEOUT_SECONDS`).
    pub request_timeout_seconds: u64,

    /// Recharge submissions allowed per user per window
    /// (`RECHARGE_LIMIT_PER_WINDOW`).
    pub recharge_limit_per_window: u32,

    /// Purchases allowed per user per window
    /// (`PURCHASE_LIMIT_PER_WINDOW`).
    pub purchase_limit_per_window: u32,

    /// Rate limit window in seconds (`RATE_LIMIT_WINDOW_SECONDS`).
    pub rate_limit_window_seconds: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8086".to_string(),
            database_url: None,
            auth_base_url: "https://id.vidmart.example".to_string(),
            auth_audience: "vidpay".to_string(),
            admin_api_key: None,
            gateway_a_secret: None,
            gateway_b_webhook_secret: None,
            gateway_b_api_key: None,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            recharge_limit_per_window: 5,
            purchase_limit_per_window: 10,
            rate_limit_window_seconds: 60,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            listen_addr: env_or("LISTEN_ADDR", &defaults.listen_addr),
            database_url: std::env::var("DATABASE_URL").ok(),
            auth_base_url: env_or("AUTH_BASE_URL", &defaults.auth_base_url),
            auth_audience: env_or("AUTH_AUDIENCE", &defaults.auth_audience),
            admin_api_key: std::env::var("ADMIN_API_KEY").ok(),
            gateway_a_secret: std::env::var("GATEWAY_A_SECRET").ok(),
            gateway_b_webhook_secret: std::env::var("GATEWAY_B_WEBHOOK_SECRET").ok(),
            gateway_b_api_key: std::env::var("GATEWAY_B_API_KEY").ok(),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(defaults.cors_origins),
            max_body_bytes: env_parse_or("MAX_BODY_BYTES", defaults.max_body_bytes),
            request_timeout_seconds: env_parse_or(
                "REQUEST_TIMEOUT_SECONDS",
                defaults.request_timeout_seconds,
            ),
            recharge_limit_per_window: env_parse_or(
                "RECHARGE_LIMIT_PER_WINDOW",
                defaults.recharge_limit_per_window,
            ),
            purchase_limit_per_window: env_parse_or(
                "PURCHASE_LIMIT_PER_WINDOW",
                defaults.purchase_limit_per_window,
            ),
            rate_limit_window_seconds: env_parse_or(
                "RATE_LIMIT_WINDOW_SECONDS",
                defaults.rate_limit_window_seconds,
            ),
        }
    }

    /// The rate-limit window as a [`std::time::Duration`].
    #[must_use]
    pub fn rate_limit_window(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.rate_limit_window_seconds)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr + Copy>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
