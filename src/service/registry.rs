use crate::config::ProtocolConfig;
use crate::error::{GamestatsError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Canonical form of a route path: no surrounding slashes, ASCII lowercase.
pub fn normalize_path(path: &str) -> String {
    path.trim_matches('/').to_ascii_lowercase()
}

/// Walk `path` from the full path down to its first segment, returning the
/// first prefix for which `lookup` yields a value.
pub(crate) fn longest_prefix<T>(path: &str, mut lookup: impl FnMut(&str) -> Option<T>) -> Option<T> {
    let mut candidate = normalize_path(path);
    loop {
        if candidate.is_empty() {
            return None;
        }
        if let Some(found) = lookup(&candidate) {
            return Some(found);
        }
        match candidate.rfind('/') {
            Some(idx) => candidate.truncate(idx),
            None => return None,
        }
    }
}

/// Route prefix → protocol parameters, built once at startup.
///
/// A request path uses the config of its longest registered prefix, aligned
/// on `/` boundaries.
#[derive(Debug, Clone, Default)]
pub struct ConfigRegistry {
    routes: HashMap<String, Arc<ProtocolConfig>>,
}

impl ConfigRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `config` for `route` and everything beneath it.
    pub fn register(&mut self, route: &str, config: ProtocolConfig) -> Result<()> {
        let key = normalize_path(route);
        if key.is_empty() {
            return Err(GamestatsError::Config("Route path cannot be empty".to_string()));
        }
        if self.routes.contains_key(&key) {
            return Err(GamestatsError::Config(format!(
                "Route '{key}' is already registered"
            )));
        }
        self.routes.insert(key, Arc::new(config));
        Ok(())
    }

    /// Config governing `path`, or `None` if the request should pass through untouched.
    pub fn resolve(&self, path: &str) -> Option<Arc<ProtocolConfig>> {
        longest_prefix(path, |candidate| self.routes.get(candidate).cloned())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(game: &str) -> ProtocolConfig {
        ProtocolConfig::builder("00000000000000000000", game)
            .encrypted_request(false)
            .build()
            .unwrap()
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_path("/TetrisDS/store.asp/"), "tetrisds/store.asp");
        assert_eq!(normalize_path("///"), "");
    }

    #[test]
    fn test_longest_prefix_wins() {
        let mut registry = ConfigRegistry::new();
        registry.register("pokedungeonds/web", config("outer")).unwrap();
        registry.register("pokedungeonds/web/rescue", config("inner")).unwrap();

        let inner = registry.resolve("/pokedungeonds/web/rescue/rescueList.asp").unwrap();
        assert_eq!(inner.game_id(), "inner");

        let outer = registry.resolve("/pokedungeonds/web/common/setProfile.asp").unwrap();
        assert_eq!(outer.game_id(), "outer");
    }

    #[test]
    fn test_prefix_is_segment_aligned() {
        let mut registry = ConfigRegistry::new();
        registry.register("tetrisds", config("tetris")).unwrap();

        assert!(registry.resolve("/tetrisdsx/store.asp").is_none());
        assert!(registry.resolve("/TETRISDS/store.asp").is_some());
        assert!(registry.resolve("/").is_none());
    }

    #[test]
    fn test_duplicate_and_empty_routes() {
        let mut registry = ConfigRegistry::new();
        registry.register("dummy.asp", config("a")).unwrap();
        assert!(registry.register("/dummy.asp", config("b")).is_err());
        assert!(registry.register("/", config("c")).is_err());
        assert_eq!(registry.len(), 1);
    }
}
