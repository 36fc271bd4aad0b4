// Integration tests for `Gateway` using wiremock.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use merchkit_api::{
    ApiError, Gateway, InterceptFuture, Interceptor, Request, Response, TransportConfig,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Gateway) {
    let server = MockServer::start().await;
    let gateway = Gateway::new(&TransportConfig::default()).expect("default config builds");
    (server, gateway)
}

fn resource_url(server: &MockServer, tail: &str) -> url::Url {
    url::Url::parse(&format!("{}{tail}", server.uri())).expect("mock server URI is valid")
}

/// Claims every request whose URL path starts with `prefix`, answering
/// with a canned body and counting claims.
struct PrefixResponder {
    prefix: &'static str,
    body: Value,
    claims: AtomicUsize,
}

impl Interceptor for PrefixResponder {
    fn intercept(&self, request: &Request) -> Option<InterceptFuture> {
        if !request.url.path().starts_with(self.prefix) {
            return None;
        }
        self.claims.fetch_add(1, Ordering::SeqCst);
        let body = self.body.clone();
        Some(Box::pin(async move { Ok(Response::ok(body)) }))
    }
}

// ── Network path ────────────────────────────────────────────────────

#[tokio::test]
async fn get_returns_parsed_body() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/customers/42"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "id": 42, "name": "Ada" })),
        )
        .mount(&server)
        .await;

    let resp = gateway
        .send(Request::get(resource_url(&server, "/customers/42")))
        .await
        .expect("mocked GET succeeds");

    assert_eq!(resp.status, 200);
    assert_eq!(resp.body["name"], "Ada");
}

#[tokio::test]
async fn post_sends_json_payload() {
    let (server, gateway) = setup().await;

    let payload = json!({ "name": "Spring Sale", "code": "SPRING" });

    Mock::given(method("POST"))
        .and(path("/coupons"))
        .and(body_json(&payload))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({ "id": "7", "code": "SPRING" })),
        )
        .mount(&server)
        .await;

    let resp = gateway
        .send(Request::post(resource_url(&server, "/coupons"), payload))
        .await
        .expect("mocked POST succeeds");

    assert_eq!(resp.status, 201);
    assert_eq!(resp.body["id"], "7");
}

#[tokio::test]
async fn delete_tolerates_empty_body() {
    let (server, gateway) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/coupons/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let resp = gateway
        .send(Request::delete(resource_url(&server, "/coupons/7")))
        .await
        .expect("mocked DELETE succeeds");

    assert_eq!(resp.status, 204);
    assert!(resp.body.is_null());
}

#[tokio::test]
async fn non_success_becomes_http_error_with_message() {
    let (server, gateway) = setup().await;

    Mock::given(method("GET"))
        .and(path("/customers/404"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "message": "no such customer" })),
        )
        .mount(&server)
        .await;

    let err = gateway
        .send(Request::get(resource_url(&server, "/customers/404")))
        .await
        .expect_err("404 must map to ApiError::Http");

    match err {
        ApiError::Http {
            status, message, ..
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "no such customer");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
    assert!(
        gateway
            .send(Request::get(resource_url(&server, "/customers/404")))
            .await
            .expect_err("still 404")
            .is_not_found()
    );
}

// ── Interceptor chain ───────────────────────────────────────────────

#[tokio::test]
async fn interceptor_claim_short_circuits_network() {
    let server = MockServer::start().await;

    let responder = Arc::new(PrefixResponder {
        prefix: "/customers",
        body: json!({ "id": 1, "name": "offline" }),
        claims: AtomicUsize::new(0),
    });
    let gateway =
        Gateway::with_interceptors(&TransportConfig::default(), vec![responder.clone()])
            .expect("default config builds");

    let resp = gateway
        .send(Request::get(resource_url(&server, "/customers/1")))
        .await
        .expect("interceptor answers");

    assert_eq!(resp.body["name"], "offline");
    assert_eq!(responder.claims.load(Ordering::SeqCst), 1);
    // Nothing reached the wire.
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn unclaimed_request_falls_through_to_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/stores/9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 9 })))
        .mount(&server)
        .await;

    let responder = Arc::new(PrefixResponder {
        prefix: "/customers",
        body: json!({}),
        claims: AtomicUsize::new(0),
    });
    let gateway =
        Gateway::with_interceptors(&TransportConfig::default(), vec![responder.clone()])
            .expect("default config builds");

    let resp = gateway
        .send(Request::get(resource_url(&server, "/stores/9")))
        .await
        .expect("network answers");

    assert_eq!(resp.body["id"], 9);
    assert_eq!(responder.claims.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn interceptors_are_tried_in_order() {
    let server = MockServer::start().await;

    let first = Arc::new(PrefixResponder {
        prefix: "/customers",
        body: json!({ "winner": "first" }),
        claims: AtomicUsize::new(0),
    });
    let second = Arc::new(PrefixResponder {
        prefix: "/customers",
        body: json!({ "winner": "second" }),
        claims: AtomicUsize::new(0),
    });
    let gateway = Gateway::with_interceptors(
        &TransportConfig::default(),
        vec![first.clone(), second.clone()],
    )
    .expect("default config builds");

    let resp = gateway
        .send(Request::get(resource_url(&server, "/customers/1")))
        .await
        .expect("first interceptor answers");

    assert_eq!(resp.body["winner"], "first");
    assert_eq!(first.claims.load(Ordering::SeqCst), 1);
    assert_eq!(second.claims.load(Ordering::SeqCst), 0);
}
