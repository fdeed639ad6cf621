/**
 * Server Configuration
 *
 * This module enumerates every option the server recognizes and validates
 * them once at startup. Nothing downstream reads the environment directly:
 * the middleware pipeline, the storage supervisor and the real-time adapter
 * all receive their slice of `Config`.
 *
 * # Configuration Sources
 *
 * Configuration is loaded from environment variables (optionally seeded from
 * a `.env` file by the binary). `Config::from_lookup` takes the lookup as a
 * function so tests can feed a map instead of mutating the process
 * environment.
 *
 * # Variables
 *
 * | Variable | Required | Default |
 * |----------|----------|---------|
 * | `DATABASE_URL` | yes | |
 * | `REDIS_HOST` | yes | |
 * | `SECRET_KEY_ONE`, `SECRET_KEY_TWO` | yes | |
 * | `CLIENT_URL` | yes | |
 * | `NODE_ENV` | no | `development` |
 * | `SERVER_PORT` | no | `5000` |
 * | `CORS_ORIGINS` | no | `*` |
 * | `BODY_LIMIT_BYTES` | no | 50 MB |
 * | `SESSION_MAX_AGE_SECS` | no | 7 days |
 * | `STORAGE_PROBE_INTERVAL_SECS` | no | `5` |
 * | `CLOUD_NAME`, `CLOUD_API_KEY`, `CLOUD_API_SECRET` | no | uploads disabled |
 *
 * # Error Handling
 *
 * Any invalid value is a fatal startup error: the binary logs the
 * `ConfigError` and exits.
 */

use axum::http::{HeaderValue, Method};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_SERVER_PORT: u16 = 5000;
pub const DEFAULT_BODY_LIMIT: usize = 50 * 1024 * 1024;
pub const DEFAULT_SESSION_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_SESSION_NAME: &str = "session";

/// Signing secrets shorter than this are rejected (key derivation needs 256 bits)
pub const MIN_SECRET_LEN: usize = 32;

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key,
            message: message.into(),
        }
    }
}

/// Deployment mode, read from `NODE_ENV`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Development,
    Production,
    Test,
}

impl FromStr for DeploymentMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::invalid(
                "NODE_ENV",
                format!("unknown deployment mode '{}'", other),
            )),
        }
    }
}

/// How duplicate query/body keys collapse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollutionRule {
    #[default]
    LastWins,
    FirstWins,
}

/// Signed session cookie options
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub name: String,
    /// `[primary, secondary]`; new cookies are always signed with the primary key
    pub keys: [String; 2],
    pub max_age: Duration,
    pub secure: bool,
}

/// Cross-origin policy
#[derive(Debug, Clone)]
pub struct CorsConfig {
    /// Allowed origins; `*` reflects the request origin
    pub origins: Vec<String>,
    pub credentials: bool,
    pub methods: Vec<Method>,
}

/// Every recognized middleware option
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    pub compression: bool,
    /// Ceiling for JSON and URL-encoded bodies, in bytes
    pub body_limit: usize,
    pub session: SessionConfig,
    pub parameter_pollution: PollutionRule,
    pub security_headers: bool,
    pub cors: CorsConfig,
}

/// Credentials for the Cloudinary upload provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Real-time transport options
#[derive(Debug, Clone)]
pub struct RealtimeConfig {
    /// Broker URL (`redis://...` or `memory://`)
    pub broker_url: String,
    /// The single origin allowed to open sockets
    pub client_origin: String,
    pub methods: Vec<Method>,
    /// Broker channel shared by every instance
    pub channel: String,
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    /// `None` when `NODE_ENV` is unset
    pub deployment: Option<DeploymentMode>,
    pub storage_probe_interval: Duration,
    pub middleware: MiddlewareConfig,
    pub realtime: RealtimeConfig,
    pub cloudinary: Option<CloudinaryConfig>,
}

/// Methods accepted by both the CORS policy and the socket endpoint
pub fn allowed_methods() -> Vec<Method> {
    vec![
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ]
}

impl Config {
    /// Create a new ConfigBuilder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut builder = Config::builder();

        if let Some(url) = get("DATABASE_URL") {
            builder = builder.database_url(url);
        }
        if let Some(host) = get("REDIS_HOST") {
            builder = builder.broker_url(host);
        }
        if let (Some(one), Some(two)) = (get("SECRET_KEY_ONE"), get("SECRET_KEY_TWO")) {
            builder = builder.session_keys(one, two);
        } else if get("SECRET_KEY_ONE").is_none() {
            return Err(ConfigError::MissingValue("SECRET_KEY_ONE"));
        } else {
            return Err(ConfigError::MissingValue("SECRET_KEY_TWO"));
        }
        if let Some(url) = get("CLIENT_URL") {
            builder = builder.client_url(url);
        }
        if let Some(mode) = get("NODE_ENV") {
            builder = builder.deployment(mode.parse()?);
        }
        if let Some(port) = get("SERVER_PORT") {
            builder = builder.server_port(parse_number("SERVER_PORT", &port)?);
        }
        if let Some(origins) = get("CORS_ORIGINS") {
            builder = builder.cors_origins(
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
            );
        }
        if let Some(limit) = get("BODY_LIMIT_BYTES") {
            builder = builder.body_limit(parse_number("BODY_LIMIT_BYTES", &limit)?);
        }
        if let Some(secs) = get("SESSION_MAX_AGE_SECS") {
            builder = builder.session_max_age(Duration::from_secs(parse_number(
                "SESSION_MAX_AGE_SECS",
                &secs,
            )?));
        }
        if let Some(secs) = get("STORAGE_PROBE_INTERVAL_SECS") {
            builder = builder.storage_probe_interval(Duration::from_secs(parse_number(
                "STORAGE_PROBE_INTERVAL_SECS",
                &secs,
            )?));
        }
        match (get("CLOUD_NAME"), get("CLOUD_API_KEY"), get("CLOUD_API_SECRET")) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => {
                builder = builder.cloudinary(CloudinaryConfig {
                    cloud_name,
                    api_key,
                    api_secret,
                });
            }
            (None, None, None) => {}
            _ => {
                return Err(ConfigError::invalid(
                    "CLOUD_NAME",
                    "CLOUD_NAME, CLOUD_API_KEY and CLOUD_API_SECRET must be set together",
                ))
            }
        }

        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [one, two] = &self.middleware.session.keys;
        if one.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid(
                "SECRET_KEY_ONE",
                format!("must be at least {} bytes", MIN_SECRET_LEN),
            ));
        }
        if two.len() < MIN_SECRET_LEN {
            return Err(ConfigError::invalid(
                "SECRET_KEY_TWO",
                format!("must be at least {} bytes", MIN_SECRET_LEN),
            ));
        }
        if one == two {
            return Err(ConfigError::invalid(
                "SECRET_KEY_TWO",
                "must differ from SECRET_KEY_ONE",
            ));
        }
        if self.middleware.body_limit == 0 {
            return Err(ConfigError::invalid("BODY_LIMIT_BYTES", "must be positive"));
        }
        if self.middleware.session.max_age.is_zero() {
            return Err(ConfigError::invalid("SESSION_MAX_AGE_SECS", "must be positive"));
        }
        if self.storage_probe_interval.is_zero() {
            return Err(ConfigError::invalid(
                "STORAGE_PROBE_INTERVAL_SECS",
                "must be positive",
            ));
        }
        if self.middleware.cors.origins.is_empty() {
            return Err(ConfigError::invalid("CORS_ORIGINS", "at least one origin is required"));
        }
        for origin in &self.middleware.cors.origins {
            if HeaderValue::from_str(origin).is_err() {
                return Err(ConfigError::invalid(
                    "CORS_ORIGINS",
                    format!("'{}' is not a valid origin", origin),
                ));
            }
        }
        if HeaderValue::from_str(&self.realtime.client_origin).is_err() {
            return Err(ConfigError::invalid(
                "CLIENT_URL",
                format!("'{}' is not a valid origin", self.realtime.client_origin),
            ));
        }
        Ok(())
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("'{}' is not a number", raw)))
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    server_port: Option<u16>,
    database_url: Option<String>,
    broker_url: Option<String>,
    client_url: Option<String>,
    session_keys: Option<[String; 2]>,
    session_max_age: Option<Duration>,
    deployment: Option<DeploymentMode>,
    cors_origins: Option<Vec<String>>,
    body_limit: Option<usize>,
    parameter_pollution: PollutionRule,
    storage_probe_interval: Option<Duration>,
    cloudinary: Option<CloudinaryConfig>,
}

impl ConfigBuilder {
    pub fn server_port(mut self, port: u16) -> Self {
        self.server_port = Some(port);
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn broker_url(mut self, url: impl Into<String>) -> Self {
        self.broker_url = Some(url.into());
        self
    }

    pub fn client_url(mut self, url: impl Into<String>) -> Self {
        self.client_url = Some(url.into());
        self
    }

    pub fn session_keys(mut self, primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        self.session_keys = Some([primary.into(), secondary.into()]);
        self
    }

    pub fn session_max_age(mut self, max_age: Duration) -> Self {
        self.session_max_age = Some(max_age);
        self
    }

    pub fn deployment(mut self, mode: DeploymentMode) -> Self {
        self.deployment = Some(mode);
        self
    }

    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    pub fn body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = Some(bytes);
        self
    }

    pub fn parameter_pollution(mut self, rule: PollutionRule) -> Self {
        self.parameter_pollution = rule;
        self
    }

    pub fn storage_probe_interval(mut self, interval: Duration) -> Self {
        self.storage_probe_interval = Some(interval);
        self
    }

    pub fn cloudinary(mut self, cloudinary: CloudinaryConfig) -> Self {
        self.cloudinary = Some(cloudinary);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config, ConfigError> {
        let database_url = self
            .database_url
            .ok_or(ConfigError::MissingValue("DATABASE_URL"))?;
        let broker_url = self.broker_url.ok_or(ConfigError::MissingValue("REDIS_HOST"))?;
        let client_url = self.client_url.ok_or(ConfigError::MissingValue("CLIENT_URL"))?;
        let keys = self
            .session_keys
            .ok_or(ConfigError::MissingValue("SECRET_KEY_ONE"))?;

        let config = Config {
            server_port: self.server_port.unwrap_or(DEFAULT_SERVER_PORT),
            database_url,
            deployment: self.deployment,
            storage_probe_interval: self
                .storage_probe_interval
                .unwrap_or(DEFAULT_PROBE_INTERVAL),
            middleware: MiddlewareConfig {
                compression: true,
                body_limit: self.body_limit.unwrap_or(DEFAULT_BODY_LIMIT),
                session: SessionConfig {
                    name: DEFAULT_SESSION_NAME.to_string(),
                    keys,
                    max_age: self.session_max_age.unwrap_or(DEFAULT_SESSION_MAX_AGE),
                    // Only an explicit development mode drops `Secure`
                    secure: self.deployment != Some(DeploymentMode::Development),
                },
                parameter_pollution: self.parameter_pollution,
                security_headers: true,
                cors: CorsConfig {
                    origins: self.cors_origins.unwrap_or_else(|| vec!["*".to_string()]),
                    credentials: true,
                    methods: allowed_methods(),
                },
            },
            realtime: RealtimeConfig {
                broker_url,
                client_origin: client_url,
                methods: allowed_methods(),
                channel: "chatty#/".to_string(),
            },
            cloudinary: self.cloudinary,
        };
        config.validate()?;
        Ok(config)
    }
}
