//! # Request Pipeline
//!
//! Validation state machine run once per inbound request whose route has a
//! [`ProtocolConfig`].
//!
//! ```text
//! Start ─► pid ─┬─ no data, no hash ─► SessionCreate ─► 200 + token
//!               ├─ missing/short args ─► 400
//!               └─ MainRequest: session ─► decrypt ─► header checks ─► handler ─► body [+ trailer]
//! ```
//!
//! Every failure is terminal for the request. Codec and validation failures
//! answer 400 with a generic body; handler failures carry their own status.
//! The session is read from the store once and that snapshot is used for the
//! rest of the request, even if a concurrent prune removes it.

mod request;

pub use request::{DecodedRequest, GamestatsRequest, GamestatsResponse};

use crate::config::{ProtocolConfig, RequestVersion, ResponseVersion};
use crate::core::codec::{decrypt_request, response_checksum};
use crate::error::{constants, GamestatsError, Result};
use crate::session::{Session, SessionStore};
use crate::utils::metrics::Metrics;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Attempts at drawing a token whose hash is not already stored
const MAX_TOKEN_ATTEMPTS: usize = 3;

/// Application logic invoked with the decoded payload.
///
/// Return [`GamestatsError::Protocol`] to answer with a specific status and
/// message. Any other error answers 500 with the error's message. A panic in
/// the handler is caught and answered the same way.
pub trait RequestHandler: Send + Sync {
    fn handle(&self, request: &DecodedRequest) -> Result<Vec<u8>>;
}

impl<F> RequestHandler for F
where
    F: Fn(&DecodedRequest) -> Result<Vec<u8>> + Send + Sync,
{
    fn handle(&self, request: &DecodedRequest) -> Result<Vec<u8>> {
        self(request)
    }
}

/// Which branch of the state machine a request takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind<'a> {
    SessionCreate,
    Main { data: &'a str, hash: Option<&'a str> },
}

/// Runs the validation state machine against a shared session store.
#[derive(Debug, Clone)]
pub struct RequestPipeline {
    store: Arc<SessionStore>,
    metrics: Arc<Metrics>,
}

impl RequestPipeline {
    pub fn new(store: Arc<SessionStore>, metrics: Arc<Metrics>) -> Self {
        Self { store, metrics }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Process one request under `config`, calling `handler` for main requests.
    #[instrument(
        skip(self, config, request, handler),
        fields(path = %request.path(), game_id = %config.game_id())
    )]
    pub fn process(
        &self,
        config: &ProtocolConfig,
        request: &GamestatsRequest,
        handler: &dyn RequestHandler,
    ) -> GamestatsResponse {
        self.metrics.request_received();

        let result = extract_pid(request).and_then(|pid| match classify(config, request)? {
            RequestKind::SessionCreate => self.create_session(config, pid, request.path()),
            RequestKind::Main { data, hash } => {
                let decoded = self.decode_main(config, pid, data, hash, request.path())?;
                self.invoke(config, handler, &decoded)
            }
        });

        match result {
            Ok(response) => response,
            Err(e) => {
                let status = e.status_code();
                if status < 500 {
                    self.metrics.request_rejected();
                    debug!(status, reason = %e, "Request rejected");
                }
                GamestatsResponse::new(status, e.response_message().into_bytes())
            }
        }
    }

    fn create_session(
        &self,
        config: &ProtocolConfig,
        pid: i32,
        url: &str,
    ) -> Result<GamestatsResponse> {
        for _ in 0..MAX_TOKEN_ATTEMPTS {
            let session = Session::new(config, pid, url)?;
            let token = session.token().to_string();
            if self.store.add(session) {
                self.metrics.session_created();
                info!(pid, "Session created");
                return Ok(GamestatsResponse::ok(token.into_bytes()));
            }
        }

        warn!(pid, "Session token collided repeatedly");
        Err(GamestatsError::Unexpected(
            constants::ERR_TOKEN_COLLISION.to_string(),
        ))
    }

    fn resolve_session(&self, config: &ProtocolConfig, hash: Option<&str>) -> Option<Arc<Session>> {
        hash.and_then(|h| self.store.get(h))
            .filter(|session| session.game_id() == config.game_id())
    }

    fn decode_main(
        &self,
        config: &ProtocolConfig,
        pid: i32,
        data: &str,
        hash: Option<&str>,
        url: &str,
    ) -> Result<DecodedRequest> {
        let session = self.resolve_session(config, hash);
        if config.require_session() && session.is_none() {
            return Err(GamestatsError::BadRequest(constants::ERR_SESSION_NOT_FOUND));
        }

        let payload = decrypt_request(config, data).inspect_err(|e| {
            if matches!(e, GamestatsError::Format(constants::ERR_CHECKSUM)) {
                self.metrics.checksum_failure();
            }
        })?;

        let cleartext = check_header(config.request_version(), pid, payload)?;

        Ok(DecodedRequest {
            cleartext,
            pid,
            url: url.to_string(),
            session,
        })
    }

    fn invoke(
        &self,
        config: &ProtocolConfig,
        handler: &dyn RequestHandler,
        decoded: &DecodedRequest,
    ) -> Result<GamestatsResponse> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(decoded)))
            .unwrap_or_else(|payload| Err(GamestatsError::Unexpected(panic_message(payload))));

        let mut body = match outcome {
            Ok(body) => body,
            Err(GamestatsError::Protocol { code, message }) => {
                self.metrics.handler_error();
                warn!(code, %message, "Handler raised protocol error");
                return Err(GamestatsError::Protocol { code, message });
            }
            Err(e) => {
                self.metrics.handler_error();
                warn!(error = %e, "Handler failed");
                return Err(GamestatsError::Unexpected(e.to_string()));
            }
        };

        if config.response_version() != ResponseVersion::Raw {
            let trailer = response_checksum(config, &body);
            body.extend_from_slice(trailer.as_bytes());
        }

        self.metrics.request_accepted();
        Ok(GamestatsResponse::ok(body))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|message| (*message).to_string())
            .unwrap_or_else(|| constants::ERR_HANDLER_PANIC.to_string()),
    }
}

fn extract_pid(request: &GamestatsRequest) -> Result<i32> {
    request
        .pid()
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .ok_or(GamestatsError::BadRequest(constants::ERR_INVALID_PID))
}

fn classify<'a>(config: &ProtocolConfig, request: &'a GamestatsRequest) -> Result<RequestKind<'a>> {
    let (data, hash) = match (request.data(), request.hash()) {
        (None, None) => return Ok(RequestKind::SessionCreate),
        (None, Some(_)) => return Err(GamestatsError::BadRequest(constants::ERR_MISSING_DATA)),
        (Some(data), hash) => (data, hash),
    };

    if hash.is_none() && config.require_session() {
        return Err(GamestatsError::BadRequest(constants::ERR_MISSING_HASH));
    }
    if data.len() < config.request_version().min_data_param_len() {
        return Err(GamestatsError::BadRequest(constants::ERR_DATA_LENGTH));
    }

    Ok(RequestKind::Main { data, hash })
}

/// Verify the pid (and V3 length) header and strip it.
fn check_header(version: RequestVersion, pid: i32, mut payload: Vec<u8>) -> Result<Vec<u8>> {
    let header_len = version.header_len();
    if payload.len() < header_len {
        return Err(GamestatsError::BadRequest(constants::ERR_PAYLOAD_TOO_SHORT));
    }

    let embedded_pid = i32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    if embedded_pid != pid {
        return Err(GamestatsError::BadRequest(constants::ERR_PID_MISMATCH));
    }

    if version == RequestVersion::V3 {
        let length = i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]);
        if i64::from(length) + 8 != payload.len() as i64 {
            return Err(GamestatsError::BadRequest(constants::ERR_LENGTH_MISMATCH));
        }
    }

    payload.drain(..header_len);
    Ok(payload)
}
