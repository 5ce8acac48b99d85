//! Logging setup. Kept in its own test binary because the subscriber is process-global.

#![allow(clippy::unwrap_used)]

use gamestats_protocol::config::{LoggingConfig, ProtocolConfig, RequestVersion};
use gamestats_protocol::pipeline::GamestatsRequest;
use gamestats_protocol::service::{ConfigRegistry, GamestatsService};
use gamestats_protocol::utils::init_logging;
use tracing::Level;

#[test]
fn test_init_logging_installs_once() {
    let config = LoggingConfig {
        app_name: "gamestats-logging-test".to_string(),
        log_level: Level::TRACE,
        json_format: true,
    };
    init_logging(&config).unwrap();

    // A second global subscriber is refused.
    assert!(init_logging(&config).is_err());

    // Exercise the instrumented pipeline and the metrics log line under the subscriber.
    let mut registry = ConfigRegistry::new();
    registry
        .register(
            "logged",
            ProtocolConfig::builder("LoggingSaltLoggingSa", "logged")
                .request_version(RequestVersion::V1)
                .build()
                .unwrap(),
        )
        .unwrap();
    let service = GamestatsService::new(registry);
    let created = service
        .handle(&GamestatsRequest::from_query("/logged", "pid=1"))
        .unwrap();
    assert_eq!(created.status, 200);
    let rejected = service
        .handle(&GamestatsRequest::from_query("/logged", "pid=oops"))
        .unwrap();
    assert_eq!(rejected.status, 400);

    service.metrics().log_metrics();
    assert_eq!(service.metrics().snapshot().requests_rejected, 1);
}
