use axum::Router;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tower::ServiceExt;

use portfolio_gateway::{
    AppState, ManualClock, RateLimitRule, RateLimiter, WindowStore, handlers::router,
};

const START: i64 = 1_700_000_000_000;

const BACKEND: &str = "10.0.0.5:41000";

fn app_with_trusted(client_limit: u32, trusted_clients: Vec<IpAddr>) -> (Router, ManualClock) {
    let clock = ManualClock::new(START);
    let state = Arc::new(AppState {
        client_limiter: RateLimiter::new(WindowStore::new(), Arc::new(clock.clone())),
        check_limiter: RateLimiter::new(WindowStore::new(), Arc::new(clock.clone())),
        client_rule: RateLimitRule::new(60_000, client_limit).unwrap(),
        trust_forwarded_for: true,
        trusted_clients,
    });
    (router(state), clock)
}

fn app(client_limit: u32) -> (Router, ManualClock) {
    app_with_trusted(client_limit, Vec::new())
}

// Request as it arrives over a real socket from `peer`
fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let addr: SocketAddr = peer.parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(addr));
    request
}

fn check_request(client: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/rate-limit/check")
        .header("content-type", "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app(10);
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["trackedIdentifiers"], 0);
    assert_eq!(body["trackedClients"], 0);
}

#[tokio::test]
async fn test_check_endpoint_window_scenario() {
    let (app, clock) = app(100);
    let payload = json!({"identifier": "a", "windowMs": 1000, "maxRequests": 3});

    for expected in [2, 1, 0] {
        let response = app
            .clone()
            .oneshot(check_request("198.51.100.1", payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["allowed"], true);
        assert_eq!(body["remaining"], expected);
        assert_eq!(body["resetTime"], START + 1000);
    }

    let response = app
        .clone()
        .oneshot(check_request("198.51.100.1", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["remaining"], 0);

    clock.advance(1000);
    let response = app
        .oneshot(check_request("198.51.100.1", payload))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["remaining"], 2);
    assert_eq!(body["resetTime"], START + 2000);
}

#[tokio::test]
async fn test_invalid_rule_is_bad_request() {
    let (app, _) = app(100);

    for payload in [
        json!({"identifier": "a", "windowMs": 0, "maxRequests": 3}),
        json!({"identifier": "a", "windowMs": 1000, "maxRequests": 0}),
        json!({"identifier": "", "windowMs": 1000, "maxRequests": 3}),
    ] {
        let response = app
            .clone()
            .oneshot(check_request("198.51.100.2", payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_client_limit_returns_429() {
    let (app, clock) = app(2);
    let payload = json!({"identifier": "contact-form", "windowMs": 1000, "maxRequests": 100});

    for remaining in ["1", "0"] {
        let response = app
            .clone()
            .oneshot(check_request("203.0.113.9", payload.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        assert_eq!(response.headers()["x-ratelimit-remaining"], remaining);
    }

    let response = app
        .clone()
        .oneshot(check_request("203.0.113.9", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(response.headers()["retry-after"], "60");
    assert_eq!(response.headers()["x-ratelimit-remaining"], "0");

    // a different client has its own window
    let response = app
        .clone()
        .oneshot(check_request("203.0.113.10", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    clock.advance(60_000);
    let response = app
        .oneshot(check_request("203.0.113.9", payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_health_is_not_client_limited() {
    let (app, _) = app(1);

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(
                Request::get("/health")
                    .header("x-forwarded-for", "192.0.2.1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
    }
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = app(10);
    let payload = json!({"identifier": "m", "windowMs": 1000, "maxRequests": 3});
    app.clone()
        .oneshot(check_request("192.0.2.50", payload))
        .await
        .unwrap();

    let response = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("portfolio_gateway_requests_total"));
    assert!(text.contains("portfolio_gateway_admissions_total"));
    assert!(text.contains(r#"limiter="check""#));
    assert!(text.contains(r#"limiter="client""#));
}

#[tokio::test]
async fn test_checked_identifier_equal_to_caller_ip_has_own_window() {
    let (app, _) = app(60);
    let payload = json!({"identifier": "198.51.100.1", "windowMs": 1000, "maxRequests": 3});

    let response = app
        .clone()
        .oneshot(check_request("198.51.100.1", payload.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-ratelimit-remaining"], "59");
    let body = json_body(response).await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["remaining"], 2);
    assert_eq!(body["resetTime"], START + 1000);

    let response = app
        .oneshot(check_request("198.51.100.1", payload))
        .await
        .unwrap();
    assert_eq!(response.headers()["x-ratelimit-remaining"], "58");
    let body = json_body(response).await;
    assert_eq!(body["remaining"], 1);
}

#[tokio::test]
async fn test_undecodable_body_is_bad_request() {
    let (app, _) = app(100);

    let bodies = [
        r#"{"identifier":"a","windowMs":-5,"maxRequests":3}"#,
        r#"{"identifier":"a","maxRequests":3}"#,
        r#"{"identifier":"a","windowMs":1000,"maxRequests":5000000000}"#,
        r#"{"identifier":"a","#,
    ];
    for raw in bodies {
        let request = Request::builder()
            .method("POST")
            .uri("/api/rate-limit/check")
            .header("content-type", "application/json")
            .header("x-forwarded-for", "198.51.100.3")
            .body(Body::from(raw))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {raw}");
        let body = json_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid input"));
    }
}

#[tokio::test]
async fn test_trusted_backend_is_not_client_limited() {
    let trusted = vec!["10.0.0.5".parse().unwrap()];
    let (app, _) = app_with_trusted(2, trusted);

    // one backend checking many visitors
    for i in 0..10 {
        let payload = json!({"identifier": format!("visitor-{i}@example.com"), "windowMs": 1000, "maxRequests": 3});
        let request = from_peer(check_request("203.0.113.77", payload), BACKEND);
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("x-ratelimit-limit").is_none());
        let body = json_body(response).await;
        assert_eq!(body["allowed"], true);
    }
}

#[tokio::test]
async fn test_untrusted_peer_stays_limited_even_when_forwarding_trusted_ip() {
    let trusted = vec!["10.0.0.5".parse().unwrap()];
    let (app, _) = app_with_trusted(1, trusted);
    let payload = json!({"identifier": "x", "windowMs": 1000, "maxRequests": 3});

    let statuses: Vec<StatusCode> = {
        let mut statuses = Vec::new();
        for _ in 0..2 {
            let request = from_peer(check_request("10.0.0.5", payload.clone()), "192.0.2.8:5000");
            statuses.push(app.clone().oneshot(request).await.unwrap().status());
        }
        statuses
    };
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);
}
