use serde::Deserialize;
use std::net::{AddrParseError, SocketAddr};

/// Minimum length of the HS256 signing secret.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    /// Access token signing and session cookies
    #[serde(default)]
    pub auth: AuthConfig,
    /// Fixed-window policies for sensitive endpoints
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub two_factor: TwoFactorConfig,
    /// Email service configuration
    #[serde(default)]
    pub email: EmailConfig,
    /// Shared secrets for inbound webhooks
    #[serde(default)]
    pub webhooks: WebhookConfig,
    /// CEP / CNPJ lookup upstreams
    #[serde(default)]
    pub lookups: LookupConfig,
    #[serde(default)]
    pub frontend: FrontendConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl From<&DatabaseConfig> for persistence::db::DatabaseConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            url: config.url.clone(),
            max_connections: config.max_connections,
            min_connections: config.min_connections,
            connect_timeout_secs: config.connect_timeout_secs,
            idle_timeout_secs: config.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Per-account request budget for authenticated API routes (0 disables).
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_minute: u32,

    #[serde(default)]
    pub hsts_enabled: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: Vec::new(),
            rate_limit_per_minute: default_rate_limit(),
            hsts_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret shared with the hosted auth provider
    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: i64,

    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,

    /// Adds the `Secure` attribute to session cookies
    #[serde(default = "default_cookie_secure")]
    pub cookie_secure: bool,

    /// Hosted auth project reference, used to clear `sb-<ref>-auth-token` cookies on logout
    #[serde(default)]
    pub project_ref: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            access_token_expiry_secs: default_access_token_expiry(),
            leeway_secs: default_leeway(),
            cookie_secure: default_cookie_secure(),
            project_ref: String::new(),
        }
    }
}

/// A fixed-window budget: `max_requests` per `window_secs`.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RateLimitPolicy {
    pub const fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Counter backend: memory or redis
    #[serde(default = "default_rate_limit_backend")]
    pub backend: String,

    #[serde(default)]
    pub redis_url: String,

    #[serde(default = "default_login_policy")]
    pub login: RateLimitPolicy,

    #[serde(default = "default_lookup_policy")]
    pub lookup: RateLimitPolicy,

    #[serde(default = "default_password_reset_policy")]
    pub password_reset: RateLimitPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            backend: default_rate_limit_backend(),
            redis_url: String::new(),
            login: default_login_policy(),
            lookup: default_lookup_policy(),
            password_reset: default_password_reset_policy(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorConfig {
    /// Issuer shown in authenticator apps
    #[serde(default = "default_two_factor_issuer")]
    pub issuer: String,
}

impl Default for TwoFactorConfig {
    fn default() -> Self {
        Self {
            issuer: default_two_factor_issuer(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Email provider: sendgrid, or console (for development)
    #[serde(default = "default_email_provider")]
    pub provider: String,

    #[serde(default)]
    pub sendgrid_api_key: String,

    #[serde(default = "default_sendgrid_url")]
    pub sendgrid_url: String,

    /// Sender email address (From header)
    #[serde(default = "default_sender_email")]
    pub sender_email: String,

    /// Sender name (From header)
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Base URL for links in emails (e.g., https://app.comprareconstruir.com.br)
    #[serde(default)]
    pub base_url: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: default_email_provider(),
            sendgrid_api_key: String::new(),
            sendgrid_url: default_sendgrid_url(),
            sender_email: default_sender_email(),
            sender_name: default_sender_name(),
            base_url: String::new(),
        }
    }
}

/// Empty secrets disable verification for that provider; events are then stored
/// with `signature_valid = false` and never processed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub mercadopago_secret: String,

    /// Shared token expected in the SendGrid event webhook query string
    #[serde(default)]
    pub sendgrid_token: String,

    #[serde(default)]
    pub generic_secret: String,

    #[serde(default)]
    pub whatsapp_verify_token: String,

    #[serde(default)]
    pub whatsapp_app_secret: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    #[serde(default = "default_viacep_url")]
    pub viacep_url: String,

    #[serde(default = "default_brasilapi_url")]
    pub brasilapi_url: String,

    #[serde(default = "default_lookup_timeout")]
    pub timeout_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            viacep_url: default_viacep_url(),
            brasilapi_url: default_brasilapi_url(),
            timeout_ms: default_lookup_timeout(),
        }
    }
}

/// Static export of the web client, served behind the route guard.
#[derive(Debug, Clone, Deserialize)]
pub struct FrontendConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_frontend_dir")]
    pub base_dir: String,

    /// Cache max-age for hashed assets under `_next/static/`
    #[serde(default = "default_immutable_cache_max_age")]
    pub immutable_cache_max_age: u64,

    #[serde(default = "default_mutable_cache_max_age")]
    pub mutable_cache_max_age: u64,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_dir: default_frontend_dir(),
            immutable_cache_max_age: default_immutable_cache_max_age(),
            mutable_cache_max_age: default_mutable_cache_max_age(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_expire_quotes_minutes")]
    pub expire_quotes_interval_minutes: u64,

    #[serde(default = "default_rate_limit_sweep_secs")]
    pub rate_limit_sweep_interval_secs: u64,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expire_quotes_interval_minutes: default_expire_quotes_minutes(),
            rate_limit_sweep_interval_secs: default_rate_limit_sweep_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    2
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_idle_timeout() -> u64 {
    600
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_rate_limit() -> u32 {
    120
}

fn default_access_token_expiry() -> i64 {
    3600
}

fn default_leeway() -> u64 {
    30
}

fn default_cookie_secure() -> bool {
    true
}

fn default_rate_limit_backend() -> String {
    "memory".to_string()
}

fn default_login_policy() -> RateLimitPolicy {
    RateLimitPolicy::new(5, 900)
}

fn default_lookup_policy() -> RateLimitPolicy {
    RateLimitPolicy::new(30, 60)
}

fn default_password_reset_policy() -> RateLimitPolicy {
    RateLimitPolicy::new(5, 3600)
}

fn default_two_factor_issuer() -> String {
    "Comprar & Construir".to_string()
}

fn default_email_provider() -> String {
    "console".to_string()
}

fn default_sendgrid_url() -> String {
    "https://api.sendgrid.com/v3/mail/send".to_string()
}

fn default_sender_email() -> String {
    "nao-responda@comprareconstruir.com.br".to_string()
}

fn default_sender_name() -> String {
    "Comprar & Construir".to_string()
}

fn default_viacep_url() -> String {
    "https://viacep.com.br/ws".to_string()
}

fn default_brasilapi_url() -> String {
    "https://brasilapi.com.br/api/cnpj/v1".to_string()
}

fn default_lookup_timeout() -> u64 {
    5000
}

fn default_frontend_dir() -> String {
    "frontend/out".to_string()
}

fn default_immutable_cache_max_age() -> u64 {
    31_536_000
}

fn default_mutable_cache_max_age() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_expire_quotes_minutes() -> u64 {
    15
}

fn default_rate_limit_sweep_secs() -> u64 {
    60
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with CC__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("CC")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("security.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Load configuration for testing with custom overrides.
    ///
    /// Builds the config from embedded defaults so tests do not depend on
    /// the working directory.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 20
            min_connections = 2

            [logging]
            level = "info"
            format = "json"

            [security]
            cors_origins = []
            rate_limit_per_minute = 120

            [auth]
            jwt_secret = "test-secret-with-at-least-thirty-two-bytes"
            access_token_expiry_secs = 3600
            leeway_secs = 30
            cookie_secure = false

            [rate_limit]
            backend = "memory"
            login = { max_requests = 5, window_secs = 900 }

            [email]
            enabled = false
            provider = "console"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        let cfg: Self = builder.build()?.try_deserialize()?;
        // Skip validation in tests to allow partial configs
        Ok(cfg)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "CC__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.auth.jwt_secret.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "CC__AUTH__JWT_SECRET environment variable must be set".to_string(),
            ));
        }

        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ConfigValidationError::InvalidValue(format!(
                "jwt_secret must be at least {} bytes",
                MIN_JWT_SECRET_LENGTH
            )));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.socket_addr().is_err() {
            return Err(ConfigValidationError::InvalidValue(format!(
                "Invalid server address {}:{}",
                self.server.host, self.server.port
            )));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        match self.rate_limit.backend.as_str() {
            "memory" => {}
            "redis" if self.rate_limit.redis_url.is_empty() => {
                return Err(ConfigValidationError::MissingRequired(
                    "rate_limit.redis_url is required when rate_limit.backend = \"redis\""
                        .to_string(),
                ));
            }
            "redis" => {}
            other => {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "Unknown rate_limit.backend: {}",
                    other
                )));
            }
        }

        for (name, policy) in [
            ("login", self.rate_limit.login),
            ("lookup", self.rate_limit.lookup),
            ("password_reset", self.rate_limit.password_reset),
        ] {
            if policy.max_requests == 0 || policy.window_secs == 0 {
                return Err(ConfigValidationError::InvalidValue(format!(
                    "rate_limit.{} needs a non-zero max_requests and window_secs",
                    name
                )));
            }
        }

        if self.email.enabled
            && self.email.provider == "sendgrid"
            && self.email.sendgrid_api_key.is_empty()
        {
            return Err(ConfigValidationError::MissingRequired(
                "email.sendgrid_api_key is required for the sendgrid provider".to_string(),
            ));
        }

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
