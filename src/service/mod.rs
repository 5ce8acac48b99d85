//! # Gamestats Service
//!
//! Ties route configuration, application handlers and the request pipeline
//! together behind a single entry point.
//!
//! Routes without a registered [`ProtocolConfig`] are not touched:
//! [`GamestatsService::handle`] returns `None` and the caller serves them
//! however it likes. Routes with a config but no handler still run the full
//! validation and answer the legacy "not supported" 404.
//!
//! ## Usage
//! ```ignore
//! let config = ServiceConfig::from_file("gamestats.toml")?;
//! let service = GamestatsService::from_config(&config)?;
//! service.route("tetrisds/store.asp", |req: &DecodedRequest| -> Result<Vec<u8>> {
//!     Ok(Vec::new())
//! })?;
//! let _pruner = service.start_pruner(config.sessions.prune_interval);
//!
//! let request = GamestatsRequest::from_query("/tetrisds/store.asp", "pid=1&hash=...&data=...");
//! if let Some(response) = service.handle(&request) {
//!     // write response.status / response.body
//! }
//! ```

mod dispatcher;
mod registry;

pub use dispatcher::Dispatcher;
pub use registry::{normalize_path, ConfigRegistry};

use crate::config::ServiceConfig;
use crate::error::{GamestatsError, Result};
use crate::pipeline::{
    DecodedRequest, GamestatsRequest, GamestatsResponse, RequestHandler, RequestPipeline,
};
use crate::session::{spawn_pruner, SessionStore};
use crate::utils::metrics::Metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, trace};

/// Answers routes that have a config but no handler.
fn not_supported(_: &DecodedRequest) -> Result<Vec<u8>> {
    Err(GamestatsError::protocol(404))
}

/// Entry point for every inbound request.
#[derive(Debug)]
pub struct GamestatsService {
    registry: ConfigRegistry,
    dispatcher: Dispatcher,
    pipeline: RequestPipeline,
    metrics: Arc<Metrics>,
}

impl GamestatsService {
    /// Service over `registry` with a fresh session store.
    pub fn new(registry: ConfigRegistry) -> Self {
        Self::with_store(registry, Arc::new(SessionStore::new()))
    }

    /// Service sharing an existing session store.
    pub fn with_store(registry: ConfigRegistry, store: Arc<SessionStore>) -> Self {
        let metrics = Arc::new(Metrics::new());
        Self {
            registry,
            dispatcher: Dispatcher::new(),
            pipeline: RequestPipeline::new(store, Arc::clone(&metrics)),
            metrics,
        }
    }

    /// Validate `config` and build a service from its routes.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        config.validate_strict()?;
        Ok(Self::new(config.build_registry()?))
    }

    /// Register application logic for `route` and everything beneath it.
    pub fn route<H>(&self, route: &str, handler: H) -> Result<()>
    where
        H: RequestHandler + 'static,
    {
        self.dispatcher.register(route, handler)
    }

    /// Run `request` through the pipeline, or `None` if its route has no config.
    pub fn handle(&self, request: &GamestatsRequest) -> Option<GamestatsResponse> {
        let Some(config) = self.registry.resolve(request.path()) else {
            trace!(path = %request.path(), "No gamestats config, passing through");
            return None;
        };

        let response = match self.dispatcher.resolve(request.path()) {
            Ok(Some(handler)) => self.pipeline.process(&config, request, handler.as_ref()),
            Ok(None) => self.pipeline.process(&config, request, &not_supported),
            Err(e) => {
                error!(error = %e, "Handler lookup failed");
                GamestatsResponse::new(e.status_code(), e.response_message().into_bytes())
            }
        };

        Some(response)
    }

    /// Start pruning expired sessions every `interval`. Must be called inside a tokio runtime.
    pub fn start_pruner(&self, interval: Duration) -> JoinHandle<()> {
        spawn_pruner(Arc::clone(self.pipeline.store()), interval)
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        self.pipeline.store()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn registry(&self) -> &ConfigRegistry {
        &self.registry
    }
}
