//! End-to-end routing tests through a running balancer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use axum::http::StatusCode;
use serde_json::Value;

mod common;

#[tokio::test]
async fn requests_rotate_across_backends_in_order() {
    let a = common::start_mock_backend("a").await;
    let b = common::start_mock_backend("b").await;
    let c = common::start_mock_backend("c").await;
    let (lb, addr, handle) = common::start_balancer(common::config_for(&[a, b, c])).await;

    let client = common::client();
    let mut bodies = Vec::new();
    for _ in 0..6 {
        let res = client.get(format!("http://{addr}/")).send().await.expect("balancer unreachable");
        assert_eq!(res.status(), StatusCode::OK);
        bodies.push(res.text().await.unwrap());
    }
    assert_eq!(bodies, ["a", "b", "c", "a", "b", "c"]);

    lb.shutdown_handle().trigger();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn request_is_forwarded_unchanged() {
    let echo = common::start_echo_backend().await;
    let (lb, addr, handle) = common::start_balancer(common::config_for(&[echo])).await;

    let res = common::client()
        .put(format!("http://{addr}/api/items/42?verbose=true"))
        .header("x-test", "kept")
        .header("x-request-id", "req-123")
        .header("connection", "x-hop-hint")
        .header("x-hop-hint", "dropped")
        .body("payload")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["x-request-id"], "req-123");

    let seen: Value = res.json().await.unwrap();
    assert_eq!(seen["method"], "PUT");
    assert_eq!(seen["path"], "/api/items/42");
    assert_eq!(seen["query"], "verbose=true");
    assert_eq!(seen["body"], "payload");
    assert_eq!(seen["x_test"], "kept");
    assert_eq!(seen["x_request_id"], "req-123");
    assert_eq!(seen["x_forwarded_for"], "127.0.0.1");
    assert!(seen["connection_hint"].is_null(), "hop-by-hop header leaked: {seen}");

    lb.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn backend_status_is_relayed_verbatim() {
    let backend = common::start_programmable_backend(|| async { (404, "nope".to_string()) }).await;
    let (lb, addr, handle) = common::start_balancer(common::config_for(&[backend])).await;

    let res = common::client().get(format!("http://{addr}/missing")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.text().await.unwrap(), "nope");

    lb.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn all_dead_backends_yield_503() {
    let a = common::start_mock_backend("a").await;
    let b = common::start_mock_backend("b").await;
    let (lb, addr, handle) = common::start_balancer(common::config_for(&[a, b])).await;

    for backend in lb.pool().backends() {
        backend.set_alive(false);
    }

    let client = common::client();
    for _ in 0..3 {
        let res = client.get(format!("http://{addr}/")).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.text().await.unwrap(), "Service not available");
    }

    lb.pool().backends()[0].set_alive(true);
    for _ in 0..3 {
        let res = client.get(format!("http://{addr}/")).send().await.unwrap();
        assert_eq!(res.text().await.unwrap(), "a");
    }

    lb.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn unreachable_backend_yields_502_and_stays_in_rotation() {
    let dead = common::refused_address().await;
    let live = common::start_mock_backend("live").await;
    let (lb, addr, handle) = common::start_balancer(common::config_for(&[dead, live])).await;

    let client = common::client();
    let first = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::BAD_GATEWAY);

    let second = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(second.text().await.unwrap(), "live");

    // No retry and no self-eviction: the next cycle hits the dead backend again.
    let third = client.get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(third.status(), StatusCode::BAD_GATEWAY);

    lb.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn health_probe_evicts_and_restores_backend() {
    let b1 = common::start_mock_backend("b1").await;

    let b2_healthy = Arc::new(AtomicBool::new(true));
    let flag = b2_healthy.clone();
    let b2 = common::start_programmable_backend(move || {
        let flag = flag.clone();
        async move {
            if flag.load(Ordering::SeqCst) {
                (200, "b2".into())
            } else {
                (500, "dead".into())
            }
        }
    })
    .await;

    let mut config = common::config_for(&[b1, b2]);
    config.health_check.interval_secs = 1;
    let (lb, addr, handle) = common::start_balancer(config).await;
    let client = common::client();

    b2_healthy.store(false, Ordering::SeqCst);
    let b2_state = lb.pool().backends()[1].clone();
    common::wait_until("b2 eviction", || !b2_state.is_alive()).await;

    for _ in 0..6 {
        let body = client.get(format!("http://{addr}/")).send().await.unwrap().text().await.unwrap();
        assert_eq!(body, "b1", "only b1 should be hit after b2 eviction");
    }

    b2_healthy.store(true, Ordering::SeqCst);
    common::wait_until("b2 recovery", || b2_state.is_alive()).await;

    let mut b2_hits = 0;
    for _ in 0..4 {
        if client.get(format!("http://{addr}/")).send().await.unwrap().text().await.unwrap() == "b2" {
            b2_hits += 1;
        }
    }
    assert_eq!(b2_hits, 2);

    lb.shutdown();
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn start_serves_on_the_published_address() {
    let backend = common::start_mock_backend("bound").await;
    let mut config = common::config_for(&[backend]);
    config.listener.bind_address = "127.0.0.1:0".into();

    let lb = Arc::new(rr_balancer::LoadBalancer::new(config).unwrap());
    let runner = Arc::clone(&lb);
    let handle = tokio::spawn(async move { runner.start().await });

    common::wait_until("the listener to bind", || lb.local_addr().is_some()).await;
    let addr = lb.local_addr().unwrap();
    assert_ne!(addr.port(), 0);

    let res = common::client().get(format!("http://{addr}/")).send().await.unwrap();
    assert_eq!(res.text().await.unwrap(), "bound");

    lb.shutdown();
    handle.await.unwrap().unwrap();
}
