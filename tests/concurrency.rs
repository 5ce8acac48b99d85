#![allow(clippy::expect_used, clippy::unwrap_used)]

use gamestats_protocol::config::{ProtocolConfig, RequestVersion};
use gamestats_protocol::core::encode_request;
use gamestats_protocol::error::Result;
use gamestats_protocol::pipeline::{DecodedRequest, GamestatsRequest};
use gamestats_protocol::service::{ConfigRegistry, GamestatsService};
use gamestats_protocol::session::{create_hash, Session, SessionStore, SESSION_LIFETIME};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::task::JoinSet;

fn config() -> ProtocolConfig {
    ProtocolConfig::builder("ConcurrencySaltValue", "concurrent")
        .rng(1_103_515_245, 12_345, 0x7FFF_FFFF)
        .hash_mask(0x0BAD_F00D)
        .request_version(RequestVersion::V3)
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_add_and_get() {
    let store = Arc::new(SessionStore::new());
    let config = Arc::new(config());
    let tasks_count = 16usize;
    let per_task = 500usize;

    let mut tasks = JoinSet::new();
    for t in 0..tasks_count {
        let store = store.clone();
        let config = config.clone();
        tasks.spawn(async move {
            for i in 0..per_task {
                let token = format!("token-{t}-{i}");
                let session =
                    Session::with_token(&config, i as i32, "/c", token.as_str(), SystemTime::now());
                let hash = session.hash().to_string();
                assert!(store.add(session));
                assert_eq!(store.get(&hash).unwrap().token(), token);
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    assert_eq!(store.len(), tasks_count * per_task);
    assert_eq!(store.stats().total_inserts, (tasks_count * per_task) as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn prune_races_with_lookups() {
    let store = Arc::new(SessionStore::new());
    let config = config();
    let stale_at = SystemTime::now() - SESSION_LIFETIME - Duration::from_secs(1);

    let mut live = Vec::new();
    for i in 0..1000 {
        let created = if i % 2 == 0 { stale_at } else { SystemTime::now() };
        let session = Session::with_token(&config, i, "/c", format!("t{i}"), created);
        if i % 2 == 1 {
            live.push(session.hash().to_string());
        }
        store.add(session);
    }
    let live = Arc::new(live);

    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let store = store.clone();
        tasks.spawn(async move {
            for _ in 0..50 {
                store.prune(SystemTime::now());
                tokio::task::yield_now().await;
            }
        });
    }
    for _ in 0..8 {
        let store = store.clone();
        let live = live.clone();
        tasks.spawn(async move {
            for hash in live.iter() {
                assert!(store.get(hash).is_some(), "live session vanished");
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    assert_eq!(store.len(), 500);
    assert_eq!(store.stats().total_pruned, 500);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_clients_through_service() {
    let config = config();
    let mut registry = ConfigRegistry::new();
    registry.register("concurrent", config.clone()).unwrap();
    let service = Arc::new(GamestatsService::new(registry));
    service
        .route("concurrent", |req: &DecodedRequest| -> Result<Vec<u8>> {
            Ok(req.cleartext.iter().rev().copied().collect())
        })
        .unwrap();

    let clients = 64;
    let mut tasks = JoinSet::new();
    for pid in 0..clients {
        let service = service.clone();
        let config = config.clone();
        tasks.spawn(async move {
            let path = "/concurrent/upload.asp";
            let created = service
                .handle(&GamestatsRequest::from_query(path, &format!("pid={pid}")))
                .unwrap();
            assert_eq!(created.status, 200);
            let token = String::from_utf8(created.body).unwrap();
            let hash = create_hash(&token, config.salt());

            for round in 0..20u8 {
                let body = vec![round, pid as u8, 0xAA];
                let data = encode_request(&config, pid, &body);
                let response = service
                    .handle(&GamestatsRequest::from_query(
                        path,
                        &format!("pid={pid}&hash={hash}&data={data}"),
                    ))
                    .unwrap();
                assert_eq!(response.status, 200);
                assert_eq!(response.body, vec![0xAA, pid as u8, round]);
            }
        });
    }

    while let Some(res) = tasks.join_next().await {
        res.unwrap();
    }

    let snapshot = service.metrics().snapshot();
    assert_eq!(snapshot.sessions_created, clients as u64);
    assert_eq!(snapshot.requests_accepted, clients as u64 * 20);
    assert_eq!(snapshot.requests_rejected, 0);
    assert_eq!(service.sessions().len(), clients as usize);
}
