//! # Sessions
//!
//! Short-lived sessions binding a client's two round trips together.
//!
//! The first request (no `data`, no `hash`) receives a random 32-character token.
//! The client derives `hash = sha1(salt + token)` itself and sends it with the
//! main request, where it is used to look the session up.
//!
//! Sessions live for ten minutes and are never persisted.

pub mod store;

pub use store::{spawn_pruner, SessionStore, SessionStoreStats};

use crate::config::ProtocolConfig;
use crate::core::hex::hex_lower;
use crate::error::{constants, GamestatsError, Result};
use sha1::{Digest, Sha1};
use std::time::{Duration, SystemTime};

/// How long a session stays valid after creation
pub const SESSION_LIFETIME: Duration = Duration::from_secs(10 * 60);

/// Number of characters in a session token
pub const TOKEN_LENGTH: usize = 32;

const TOKEN_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Largest multiple of 62 representable in a u32; draws at or above it are rejected.
const ACCEPT_BELOW: u32 = (u32::MAX / 62) * 62;

/// Random 32-character token over `[0-9A-Za-z]` from the OS random source.
///
/// Uses rejection sampling, so every character is uniform over the alphabet.
pub fn create_token() -> Result<String> {
    let mut token = String::with_capacity(TOKEN_LENGTH);
    let mut buf = [0u8; TOKEN_LENGTH * 4];

    while token.len() < TOKEN_LENGTH {
        getrandom::fill(&mut buf)
            .map_err(|_| GamestatsError::Unexpected(constants::ERR_RANDOM_SOURCE.to_string()))?;

        for chunk in buf.chunks_exact(4) {
            let draw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if draw >= ACCEPT_BELOW {
                continue;
            }
            token.push(TOKEN_ALPHABET[(draw % 62) as usize] as char);
            if token.len() == TOKEN_LENGTH {
                break;
            }
        }
    }

    Ok(token)
}

/// Lowercase hex SHA-1 of `salt + token`; the session lookup key.
pub fn create_hash(token: &str, salt: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(salt.as_bytes());
    hasher.update(token.as_bytes());
    hex_lower(&hasher.finalize())
}

/// A client session. Immutable once created; the store hands out shared snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pid: i32,
    url: String,
    token: String,
    hash: String,
    expiry: SystemTime,
    game_id: String,
}

impl Session {
    /// New session for `pid` on `url`, expiring ten minutes from now.
    pub fn new(config: &ProtocolConfig, pid: i32, url: impl Into<String>) -> Result<Self> {
        Ok(Self::with_token(
            config,
            pid,
            url,
            create_token()?,
            SystemTime::now(),
        ))
    }

    /// Session with a caller-chosen token, created at `created_at`.
    pub fn with_token(
        config: &ProtocolConfig,
        pid: i32,
        url: impl Into<String>,
        token: impl Into<String>,
        created_at: SystemTime,
    ) -> Self {
        let token = token.into();
        let hash = create_hash(&token, config.salt());
        Self {
            pid,
            url: url.into(),
            token,
            hash,
            expiry: created_at + SESSION_LIFETIME,
            game_id: config.game_id().to_string(),
        }
    }

    /// Player id the session was created for.
    pub fn pid(&self) -> i32 {
        self.pid
    }

    /// Route path the session began on.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Token revealed to the client.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn hash(&self) -> &str {
        &self.hash
    }

    pub fn expiry(&self) -> SystemTime {
        self.expiry
    }

    pub fn game_id(&self) -> &str {
        &self.game_id
    }

    /// Whether the session is no longer usable at `now`.
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        now >= self.expiry
    }
}
