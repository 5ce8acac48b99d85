use crate::session::Session;
use percent_encoding::percent_decode_str;
use std::sync::Arc;

/// The parts of an inbound request the pipeline reads.
///
/// Values are stored decoded; `from_query` takes care of percent-escapes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GamestatsRequest {
    path: String,
    pid: Option<String>,
    data: Option<String>,
    hash: Option<String>,
}

impl GamestatsRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Build from a path and a raw query string such as `pid=1&data=...`.
    ///
    /// A leading `?` is ignored. Keys and values are percent-decoded, so padding
    /// sent as `%3D` reads as `=`. `+` is kept literally since it is a base64
    /// character. When a key repeats, the first value wins.
    pub fn from_query(path: impl Into<String>, query: &str) -> Self {
        query
            .trim_start_matches('?')
            .split('&')
            .filter(|pair| !pair.is_empty())
            .fold(Self::new(path), |req, pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                req.with_param(
                    &percent_decode_str(key).decode_utf8_lossy(),
                    &percent_decode_str(value).decode_utf8_lossy(),
                )
            })
    }

    /// Build from already-split, already-decoded query pairs. Unknown keys are ignored.
    pub fn from_pairs<'a, I>(path: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        pairs
            .into_iter()
            .fold(Self::new(path), |req, (key, value)| req.with_param(key, value))
    }

    /// Set a query parameter unless it is already present.
    pub fn with_param(mut self, key: &str, value: &str) -> Self {
        let slot = match key {
            "pid" => &mut self.pid,
            "data" => &mut self.data,
            "hash" => &mut self.hash,
            _ => return self,
        };
        if slot.is_none() {
            *slot = Some(value.to_string());
        }
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pid(&self) -> Option<&str> {
        self.pid.as_deref()
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn hash(&self) -> Option<&str> {
        self.hash.as_deref()
    }
}

/// Status and body produced for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GamestatsResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl GamestatsResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Vec<u8>) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// What a handler receives once a main request has been validated.
#[derive(Debug, Clone)]
pub struct DecodedRequest {
    /// Payload with the pid/length header removed
    pub cleartext: Vec<u8>,
    pub pid: i32,
    /// Path the request arrived on
    pub url: String,
    /// Session resolved from `hash`, if any
    pub session: Option<Arc<Session>>,
}
