//! # Error Types
//!
//! Error taxonomy for the gamestats request pipeline.
//!
//! Every failure is terminal for the request that produced it. The pipeline turns
//! an error into an HTTP-style status code and a short body; nothing is retried.
//!
//! ## Error Categories
//! - **Format**: malformed base64, undersized payloads, checksum mismatches
//! - **Bad request**: pipeline validation failures (pid, data, hash, length field, session)
//! - **Protocol**: raised by application handlers with an explicit status code
//! - **Unexpected**: any other handler failure, surfaced as a server error
//! - **Config**: invalid protocol or service configuration
//!
//! Session store operations never produce errors; absence is `None`.
//!
//! ## Example Usage
//! ```rust
//! use gamestats_protocol::error::{GamestatsError, Result};
//!
//! fn require_pid(raw: Option<&str>) -> Result<i32> {
//!     raw.and_then(|s| s.parse().ok())
//!         .ok_or(GamestatsError::BadRequest("missing or invalid pid"))
//! }
//!
//! assert_eq!(require_pid(Some("12")).unwrap(), 12);
//! assert_eq!(require_pid(None).unwrap_err().status_code(), 400);
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Codec errors
    pub const ERR_BASE64: &str = "Data is not valid base64";
    pub const ERR_TOO_SHORT: &str = "Data must contain at least 4 bytes";
    pub const ERR_CHECKSUM: &str = "Data checksum is incorrect";

    /// Pipeline validation errors
    pub const ERR_INVALID_PID: &str = "Missing or invalid pid";
    pub const ERR_MISSING_DATA: &str = "Missing data parameter";
    pub const ERR_MISSING_HASH: &str = "Missing hash parameter";
    pub const ERR_DATA_LENGTH: &str = "Data parameter too short";
    pub const ERR_SESSION_NOT_FOUND: &str = "Session not found";
    pub const ERR_PAYLOAD_TOO_SHORT: &str = "Payload too short for header";
    pub const ERR_PID_MISMATCH: &str = "Embedded pid does not match query";
    pub const ERR_LENGTH_MISMATCH: &str = "Embedded length does not match payload";

    /// Session errors
    pub const ERR_TOKEN_COLLISION: &str = "Could not allocate a unique session token";
    pub const ERR_RANDOM_SOURCE: &str = "Secure random source unavailable";

    /// Dispatcher errors
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Handler errors
    pub const ERR_HANDLER_PANIC: &str = "Handler panicked";

    /// Legacy response bodies
    pub const MSG_BAD_REQUEST: &str = "Bad request";
    pub const MSG_NOT_SUPPORTED: &str = "This handler is not supported. (404)";
    pub const MSG_SERVER_ERROR: &str = "Server error";
}

/// Primary error type for all gamestats operations
#[derive(Error, Debug)]
pub enum GamestatsError {
    #[error("Format error: {0}")]
    Format(&'static str),

    #[error("Bad request: {0}")]
    BadRequest(&'static str),

    /// Raised by application handlers; code and message are returned verbatim.
    #[error("{message} ({code})")]
    Protocol { code: u16, message: String },

    #[error("{0}")]
    Unexpected(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl GamestatsError {
    /// Status code the pipeline answers with for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            GamestatsError::Format(_) | GamestatsError::BadRequest(_) => 400,
            GamestatsError::Protocol { code, .. } => *code,
            GamestatsError::Unexpected(_) | GamestatsError::Config(_) | GamestatsError::Io(_) => {
                500
            }
        }
    }

    /// Response body for this error.
    ///
    /// Codec and validation failures never leak detail past the generic message.
    pub fn response_message(&self) -> String {
        match self {
            GamestatsError::Format(_) | GamestatsError::BadRequest(_) => {
                constants::MSG_BAD_REQUEST.to_string()
            }
            GamestatsError::Protocol { message, .. } => message.clone(),
            GamestatsError::Unexpected(message) => message.clone(),
            GamestatsError::Config(_) | GamestatsError::Io(_) => {
                default_message(500).to_string()
            }
        }
    }

    /// Protocol error carrying the legacy default message for `code`.
    pub fn protocol(code: u16) -> Self {
        GamestatsError::Protocol {
            code,
            message: default_message(code).to_string(),
        }
    }
}

/// Legacy default message for a status code.
pub fn default_message(code: u16) -> &'static str {
    match code {
        400 => constants::MSG_BAD_REQUEST,
        404 => constants::MSG_NOT_SUPPORTED,
        _ => constants::MSG_SERVER_ERROR,
    }
}

/// Type alias for Results using GamestatsError
pub type Result<T> = std::result::Result<T, GamestatsError>;
