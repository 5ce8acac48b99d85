//! Integration tests for configuration validation

#![allow(clippy::expect_used, clippy::unwrap_used)]

use gamestats_protocol::config::{
    LoggingConfig, ProtocolConfig, RequestVersion, ResponseVersion, RouteConfig, ServiceConfig,
    DEFAULT_PRUNE_INTERVAL,
};
use gamestats_protocol::service::GamestatsService;
use std::io::Write;
use std::time::Duration;
use tracing::Level;

const SAMPLE: &str = r#"
[sessions]
prune_interval = 30000

[logging]
app_name = "gamestats-test"
log_level = "debug"
json_format = true

[[routes]]
path = "pokedungeonds/web"
init_string = "TXqjDDOLhPySKSztgBHY0001bd9500007d9900000200613c4964pokedungeonds"
request_version = "v2"
response_version = "raw"

[[routes]]
path = "/tetrisds/"
salt = "Wo3vqrDoL56sAdveYeC1"
game_id = "tetrisds"
request_version = "v1"
response_version = "checksummed"
encrypted_request = false
require_session = false
"#;

fn route(path: &str) -> RouteConfig {
    RouteConfig {
        path: path.to_string(),
        init_string: None,
        salt: Some("00000000000000000000".to_string()),
        game_id: Some("dummy".to_string()),
        rng_mul: 0,
        rng_add: 0,
        rng_mod: 0,
        hash_mask: 0,
        request_version: RequestVersion::V1,
        response_version: ResponseVersion::Raw,
        encrypted_request: false,
        require_session: false,
    }
}

#[test]
fn test_default_config_validates() {
    let config = ServiceConfig::default();
    let errors = config.validate();
    assert!(
        errors.is_empty(),
        "Default config should be valid, but got errors: {:?}",
        errors
    );
    assert_eq!(config.sessions.prune_interval, DEFAULT_PRUNE_INTERVAL);
    assert!(config.routes.is_empty());
}

#[test]
fn test_parse_sample() {
    let config = ServiceConfig::from_toml(SAMPLE).expect("sample parses");
    assert!(config.validate().is_empty(), "{:?}", config.validate());

    assert_eq!(config.sessions.prune_interval, Duration::from_secs(30));
    assert_eq!(config.logging.log_level, Level::DEBUG);
    assert!(config.logging.json_format);
    assert_eq!(config.routes.len(), 2);
    assert!(config.routes[0].encrypted_request);
    assert!(config.routes[0].require_session);

    let pokedungeon = config.routes[0].to_protocol_config().unwrap();
    assert_eq!(pokedungeon.game_id(), "pokedungeonds");
    assert_eq!(pokedungeon.rng_mod(), 512);

    let tetris = config.routes[1].to_protocol_config().unwrap();
    assert_eq!(tetris.request_version(), RequestVersion::V1);
    assert_eq!(tetris.response_version(), ResponseVersion::Checksummed);
}

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(SAMPLE.as_bytes()).expect("write sample");

    let config = ServiceConfig::from_file(file.path()).expect("load from file");
    assert_eq!(config.routes.len(), 2);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = ServiceConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to open config file"));
}

#[test]
fn test_toml_roundtrip() {
    let config = ServiceConfig::from_toml(SAMPLE).unwrap();
    let rendered = config.to_toml().unwrap();
    let reparsed = ServiceConfig::from_toml(&rendered).unwrap();
    assert_eq!(reparsed.routes.len(), 2);
    assert_eq!(reparsed.sessions.prune_interval, config.sessions.prune_interval);
    assert_eq!(
        reparsed.routes[1].to_protocol_config().unwrap(),
        config.routes[1].to_protocol_config().unwrap()
    );
}

#[test]
fn test_invalid_toml() {
    let err = ServiceConfig::from_toml("[[routes]]\npath = 5").unwrap_err();
    assert!(err.to_string().contains("Failed to parse TOML"));
}

#[test]
fn test_unknown_request_version() {
    let toml = r#"
[[routes]]
path = "x"
salt = "00000000000000000000"
game_id = "x"
request_version = "v9"
response_version = "raw"
"#;
    assert!(ServiceConfig::from_toml(toml).is_err());
}

#[test]
fn test_prune_interval_bounds() {
    let mut config = ServiceConfig::default();
    config.sessions.prune_interval = Duration::from_millis(10);
    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Prune interval too short")));

    config.sessions.prune_interval = Duration::from_secs(7200);
    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Prune interval too long")));
}

#[test]
fn test_empty_app_name() {
    let config = ServiceConfig {
        logging: LoggingConfig {
            app_name: String::new(),
            ..LoggingConfig::default()
        },
        ..ServiceConfig::default()
    };
    assert!(config
        .validate()
        .iter()
        .any(|e| e.contains("Application name cannot be empty")));
}

#[test]
fn test_duplicate_routes_after_normalization() {
    let config = ServiceConfig {
        routes: vec![route("tetrisds/store.asp"), route("/TetrisDS/store.asp/")],
        ..ServiceConfig::default()
    };
    let errors = config.validate();
    assert!(errors.iter().any(|e| e.contains("Duplicate route path")));
    assert!(config.validate_strict().is_err());
}

#[test]
fn test_route_without_parameters() {
    let mut bare = route("bare");
    bare.salt = None;
    let errors = ServiceConfig {
        routes: vec![bare],
        ..ServiceConfig::default()
    }
    .validate();
    assert!(errors.iter().any(|e| e.contains("needs either init_string")));
}

#[test]
fn test_route_with_bad_salt() {
    let mut short = route("short");
    short.salt = Some("tooshort".to_string());
    let errors = ServiceConfig {
        routes: vec![short],
        ..ServiceConfig::default()
    }
    .validate();
    assert!(errors.iter().any(|e| e.contains("Salt must be exactly 20")));
}

#[test]
fn test_encrypted_route_needs_modulus() {
    let mut encrypted = route("enc");
    encrypted.request_version = RequestVersion::V2;
    encrypted.encrypted_request = true;
    let errors = ServiceConfig {
        routes: vec![encrypted],
        ..ServiceConfig::default()
    }
    .validate();
    assert!(errors.iter().any(|e| e.contains("rng_mod must be non-zero")));
}

#[test]
fn test_explicit_fields_win_over_init_string() {
    let mut both = route("both");
    both.init_string =
        Some("TXqjDDOLhPySKSztgBHY0001bd9500007d9900000200613c4964pokedungeonds".to_string());
    let config = both.to_protocol_config().unwrap();
    assert_eq!(config.game_id(), "dummy");
}

#[test]
fn test_init_string_validation() {
    for init in ["", "TXqjDDOLhPySKSztgBHY", "TXqjDDOLhPySKSztgBHY0001bd95"] {
        assert!(ProtocolConfig::from_init_string(
            init,
            RequestVersion::V2,
            ResponseVersion::Raw,
            true,
            true
        )
        .is_err());
    }

    // Exactly the minimum length leaves an empty game id.
    let minimal = ProtocolConfig::from_init_string(
        "TXqjDDOLhPySKSztgBHY0001bd9500007d9900000200613c4964",
        RequestVersion::V2,
        ResponseVersion::Raw,
        true,
        true,
    )
    .unwrap();
    assert_eq!(minimal.game_id(), "");
}

#[test]
fn test_service_from_config() {
    let config = ServiceConfig::from_toml(SAMPLE).unwrap();
    let service = GamestatsService::from_config(&config).expect("service builds");
    assert_eq!(service.registry().len(), 2);
    assert!(service.registry().resolve("/tetrisds/store.asp").is_some());
    assert!(service.registry().resolve("/pokedungeonds/web/x.asp").is_some());
    assert!(service.registry().resolve("/pokedungeonds/other").is_none());
}

#[test]
fn test_service_from_invalid_config() {
    let config = ServiceConfig {
        routes: vec![route("dup"), route("dup")],
        ..ServiceConfig::default()
    };
    assert!(GamestatsService::from_config(&config).is_err());
}

#[test]
fn test_from_env_overrides() {
    std::env::set_var("GAMESTATS_PRUNE_INTERVAL_MS", "5000");
    std::env::set_var("GAMESTATS_LOG_LEVEL", "warn");
    let config = ServiceConfig::from_env().unwrap();
    std::env::remove_var("GAMESTATS_PRUNE_INTERVAL_MS");
    std::env::remove_var("GAMESTATS_LOG_LEVEL");

    assert_eq!(config.sessions.prune_interval, Duration::from_secs(5));
    assert_eq!(config.logging.log_level, Level::WARN);
    assert!(config.routes.is_empty());
}
