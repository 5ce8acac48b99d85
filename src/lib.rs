//! # Gamestats Protocol
//!
//! Request authentication and payload decoding for legacy handheld clients
//! that report gameplay statistics over HTTP query strings.
//!
//! A client first asks for a session and receives a random token. It then
//! sends its payload as URL-safe base64 in `data`, together with
//! `hash = sha1(salt + token)`. The payload is checksummed and optionally
//! obfuscated with an LCG keystream seeded from that checksum. This crate
//! recovers the payload, checks it against the session and the query `pid`,
//! hands the cleartext to application code and optionally appends a salted
//! SHA-1 trailer to the response.
//!
//! The obfuscation is a faithful reproduction of a legacy scheme, not a
//! security boundary.
//!
//! ## Modules
//! - [`config`]: per-route `ProtocolConfig` and file-based `ServiceConfig`
//! - [`core`]: hex, base64url, keystream cipher, request/response codec
//! - [`session`]: tokens, hashes and the shared `SessionStore`
//! - [`pipeline`]: the per-request validation state machine
//! - [`service`]: route registry and handler dispatch
//! - [`utils`]: logging and metrics

pub mod config;
pub mod core;
pub mod error;
pub mod pipeline;
pub mod service;
pub mod session;
pub mod utils;

pub use config::{ProtocolConfig, RequestVersion, ResponseVersion, ServiceConfig};
pub use error::{GamestatsError, Result};
pub use pipeline::{
    DecodedRequest, GamestatsRequest, GamestatsResponse, RequestHandler, RequestPipeline,
};
pub use service::{ConfigRegistry, GamestatsService};
pub use session::{Session, SessionStore};
