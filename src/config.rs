//! # Configuration Management
//!
//! Per-route protocol parameters and the service-level configuration that
//! registers them.
//!
//! A [`ProtocolConfig`] is immutable once built and describes how one game's
//! requests are decoded and validated. [`ServiceConfig`] is the startup-time
//! description of every route plus session and logging settings.
//!
//! ## Configuration Sources
//! - TOML files via `ServiceConfig::from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `ServiceConfig::from_env()`
//!
//! ## Example
//! ```toml
//! [sessions]
//! prune_interval = 60000
//!
//! [[routes]]
//! path = "pokedungeonds/web"
//! salt = "TXqjDDOLhPySKSztgBHY"
//! rng_mul = 114069
//! rng_add = 32153
//! rng_mod = 512
//! hash_mask = 1631340900
//! game_id = "pokedungeonds"
//! request_version = "v2"
//! response_version = "raw"
//! ```

use crate::error::{GamestatsError, Result};
use crate::service::ConfigRegistry;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Required salt length in ASCII characters
pub const SALT_LENGTH: usize = 20;

/// Minimum length of a packed legacy init string (salt + four hex words)
pub const INIT_STRING_MIN_LENGTH: usize = SALT_LENGTH + 4 * 8;

/// Default interval between background session prunes
pub const DEFAULT_PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// Layout of the decoded request payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestVersion {
    /// No checksum header, payload is cleartext.
    V1,
    /// Checksum and pid header, optional stream cipher.
    V2,
    /// Checksum, pid and explicit payload length, optional stream cipher.
    V3,
}

impl RequestVersion {
    /// Bytes of pid/length header left at the front of a decoded payload.
    pub fn header_len(self) -> usize {
        match self {
            RequestVersion::V1 | RequestVersion::V2 => 4,
            RequestVersion::V3 => 8,
        }
    }

    /// Minimum length of the raw `data` parameter before any decoding is attempted.
    ///
    /// Deliberately approximate; the exact check happens after decoding.
    pub fn min_data_param_len(self) -> usize {
        match self {
            RequestVersion::V1 | RequestVersion::V2 => 12,
            RequestVersion::V3 => 16,
        }
    }
}

/// Whether responses carry a salted SHA-1 trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseVersion {
    /// Plain response bytes.
    Raw,
    /// Response bytes followed by 40 lowercase hex characters.
    Checksummed,
}

/// Immutable per-route protocol parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolConfig {
    salt: String,
    rng_mul: u32,
    rng_add: u32,
    rng_mod: u32,
    hash_mask: u32,
    game_id: String,
    request_version: RequestVersion,
    response_version: ResponseVersion,
    encrypted_request: bool,
    require_session: bool,
}

impl ProtocolConfig {
    /// Start building a config for `game_id` keyed with `salt`.
    pub fn builder(salt: impl Into<String>, game_id: impl Into<String>) -> ProtocolConfigBuilder {
        ProtocolConfigBuilder {
            salt: salt.into(),
            game_id: game_id.into(),
            rng_mul: 0,
            rng_add: 0,
            rng_mod: 0,
            hash_mask: 0,
            request_version: RequestVersion::V2,
            response_version: ResponseVersion::Raw,
            encrypted_request: true,
            require_session: true,
        }
    }

    /// Parse the packed legacy form: 20 salt characters, then rngMul, rngAdd,
    /// rngMod and hashMask as 8 hex digits each, then the game id.
    pub fn from_init_string(
        init: &str,
        request_version: RequestVersion,
        response_version: ResponseVersion,
        encrypted_request: bool,
        require_session: bool,
    ) -> Result<Self> {
        if !init.is_ascii() || init.len() < INIT_STRING_MIN_LENGTH {
            return Err(GamestatsError::Config(format!(
                "Init string must be at least {INIT_STRING_MIN_LENGTH} ASCII characters"
            )));
        }

        let word = |range: std::ops::Range<usize>| {
            u32::from_str_radix(&init[range.clone()], 16).map_err(|e| {
                GamestatsError::Config(format!("Invalid hex word at {range:?} in init string: {e}"))
            })
        };

        Self::builder(&init[..SALT_LENGTH], &init[INIT_STRING_MIN_LENGTH..])
            .rng(word(20..28)?, word(28..36)?, word(36..44)?)
            .hash_mask(word(44..52)?)
            .request_version(request_version)
            .response_version(response_version)
            .encrypted_request(encrypted_request)
            .require_session(require_session)
            .build()
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    pub fn rng_mul(&self) -> u32 {
        self.rng_mul
    }

    pub fn rng_add(&self) -> u32 {
        self.rng_add
    }

    pub fn rng_mod(&self) -> u32 {
        self.rng_mod
    }

    pub fn hash_mask(&self) -> u32 {
        self.hash_mask
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    pub fn request_version(&self) -> RequestVersion {
        self.request_version
    }

    pub fn response_version(&self) -> ResponseVersion {
        self.response_version
    }

    pub fn encrypted_request(&self) -> bool {
        self.encrypted_request
    }

    pub fn require_session(&self) -> bool {
        self.require_session
    }
}

/// Builder for [`ProtocolConfig`]; validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct ProtocolConfigBuilder {
    salt: String,
    game_id: String,
    rng_mul: u32,
    rng_add: u32,
    rng_mod: u32,
    hash_mask: u32,
    request_version: RequestVersion,
    response_version: ResponseVersion,
    encrypted_request: bool,
    require_session: bool,
}

impl ProtocolConfigBuilder {
    /// Linear congruential generator parameters.
    pub fn rng(mut self, mul: u32, add: u32, modulus: u32) -> Self {
        self.rng_mul = mul;
        self.rng_add = add;
        self.rng_mod = modulus;
        self
    }

    pub fn hash_mask(mut self, mask: u32) -> Self {
        self.hash_mask = mask;
        self
    }

    pub fn request_version(mut self, version: RequestVersion) -> Self {
        self.request_version = version;
        self
    }

    pub fn response_version(mut self, version: ResponseVersion) -> Self {
        self.response_version = version;
        self
    }

    pub fn encrypted_request(mut self, encrypted: bool) -> Self {
        self.encrypted_request = encrypted;
        self
    }

    pub fn require_session(mut self, required: bool) -> Self {
        self.require_session = required;
        self
    }

    pub fn build(self) -> Result<ProtocolConfig> {
        if !self.salt.is_ascii() || self.salt.len() != SALT_LENGTH {
            return Err(GamestatsError::Config(format!(
                "Salt must be exactly {SALT_LENGTH} ASCII characters"
            )));
        }
        // V1 never runs the cipher, so its modulus is irrelevant.
        if self.encrypted_request
            && self.request_version != RequestVersion::V1
            && self.rng_mod == 0
        {
            return Err(GamestatsError::Config(
                "rng_mod must be non-zero for encrypted requests".to_string(),
            ));
        }

        Ok(ProtocolConfig {
            salt: self.salt,
            rng_mul: self.rng_mul,
            rng_add: self.rng_add,
            rng_mod: self.rng_mod,
            hash_mask: self.hash_mask,
            game_id: self.game_id,
            request_version: self.request_version,
            response_version: self.response_version,
            encrypted_request: self.encrypted_request,
            require_session: self.require_session,
        })
    }
}

/// Main service configuration: routes, sessions and logging
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ServiceConfig {
    /// Session store configuration
    #[serde(default)]
    pub sessions: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Protocol parameters per route
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl ServiceConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| GamestatsError::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| GamestatsError::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| GamestatsError::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by environment variables. Routes always come from a file.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(interval) = std::env::var("GAMESTATS_PRUNE_INTERVAL_MS") {
            if let Ok(val) = interval.parse::<u64>() {
                config.sessions.prune_interval = Duration::from_millis(val);
            }
        }

        if let Ok(level) = std::env::var("GAMESTATS_LOG_LEVEL") {
            if let Ok(val) = level.parse::<Level>() {
                config.logging.log_level = val;
            }
        }

        Ok(config)
    }

    /// Serialize the configuration back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| GamestatsError::Config(format!("Failed to serialize config: {e}")))
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.sessions.validate());
        errors.extend(self.logging.validate());

        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert(route.normalized_path()) {
                errors.push(format!("Duplicate route path: '{}'", route.path));
            }
            errors.extend(route.validate());
        }

        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GamestatsError::Config(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }

    /// Build the route registry consumed by the service.
    pub fn build_registry(&self) -> Result<ConfigRegistry> {
        let mut registry = ConfigRegistry::new();
        for route in &self.routes {
            registry.register(&route.path, route.to_protocol_config()?)?;
        }
        Ok(registry)
    }
}

/// Session store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Interval between background prunes of expired sessions
    #[serde(with = "duration_serde")]
    pub prune_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prune_interval: DEFAULT_PRUNE_INTERVAL,
        }
    }
}

impl SessionConfig {
    /// Validate session configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.prune_interval.as_secs() < 1 {
            errors.push("Prune interval too short (minimum: 1s)".to_string());
        } else if self.prune_interval.as_secs() > 3600 {
            errors.push("Prune interval too long (maximum: 1 hour)".to_string());
        }

        errors
    }
}

/// One route's protocol parameters as written in the config file.
///
/// Either `init_string` or the explicit fields (`salt`, `game_id`, rng words)
/// must be given. Explicit fields win when both are present.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route path prefix, e.g. `pokedungeonds/web`
    pub path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_string: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,

    #[serde(default)]
    pub rng_mul: u32,

    #[serde(default)]
    pub rng_add: u32,

    #[serde(default)]
    pub rng_mod: u32,

    #[serde(default)]
    pub hash_mask: u32,

    pub request_version: RequestVersion,

    pub response_version: ResponseVersion,

    #[serde(default = "default_true")]
    pub encrypted_request: bool,

    #[serde(default = "default_true")]
    pub require_session: bool,
}

fn default_true() -> bool {
    true
}

impl RouteConfig {
    fn normalized_path(&self) -> String {
        crate::service::normalize_path(&self.path)
    }

    /// Validate route configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.normalized_path().is_empty() {
            errors.push("Route path cannot be empty".to_string());
        }

        if self.init_string.is_none() && (self.salt.is_none() || self.game_id.is_none()) {
            errors.push(format!(
                "Route '{}' needs either init_string or both salt and game_id",
                self.path
            ));
        } else if let Err(e) = self.to_protocol_config() {
            errors.push(format!("Route '{}': {e}", self.path));
        }

        errors
    }

    /// Resolve the file representation into an immutable [`ProtocolConfig`].
    pub fn to_protocol_config(&self) -> Result<ProtocolConfig> {
        match (&self.salt, &self.game_id, &self.init_string) {
            (Some(salt), Some(game_id), _) => ProtocolConfig::builder(salt, game_id)
                .rng(self.rng_mul, self.rng_add, self.rng_mod)
                .hash_mask(self.hash_mask)
                .request_version(self.request_version)
                .response_version(self.response_version)
                .encrypted_request(self.encrypted_request)
                .require_session(self.require_session)
                .build(),
            (_, _, Some(init)) => ProtocolConfig::from_init_string(
                init,
                self.request_version,
                self.response_version,
                self.encrypted_request,
                self.require_session,
            ),
            _ => Err(GamestatsError::Config(format!(
                "Route '{}' has no protocol parameters",
                self.path
            ))),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level, overridden by `RUST_LOG` when set
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("gamestats"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
