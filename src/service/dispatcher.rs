use crate::error::{constants, GamestatsError, Result};
use crate::pipeline::RequestHandler;
use crate::service::registry::{longest_prefix, normalize_path};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Route → application handler, resolved by longest path prefix.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<String, Arc<dyn RequestHandler>>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `route`, replacing any previous handler.
    pub fn register<H>(&self, route: &str, handler: H) -> Result<()>
    where
        H: RequestHandler + 'static,
    {
        let mut handlers = self.handlers.write().map_err(|_| {
            GamestatsError::Unexpected(constants::ERR_DISPATCHER_WRITE_LOCK.to_string())
        })?;

        handlers.insert(normalize_path(route), Arc::new(handler));
        Ok(())
    }

    /// Handler for `path`, if one is registered on it or a parent route.
    pub fn resolve(&self, path: &str) -> Result<Option<Arc<dyn RequestHandler>>> {
        let handlers = self.handlers.read().map_err(|_| {
            GamestatsError::Unexpected(constants::ERR_DISPATCHER_READ_LOCK.to_string())
        })?;

        Ok(longest_prefix(path, |candidate| handlers.get(candidate).cloned()))
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let routes: Vec<String> = self
            .handlers
            .read()
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("Dispatcher").field("routes", &routes).finish()
    }
}
