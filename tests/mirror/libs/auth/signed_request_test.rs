// [tests/mirror/libs/auth/signed_request_test.rs]
//! Certifica el guardia de Axum de extremo a extremo: una peticion firmada
//! valida llega al handler, una con el cuerpo alterado no.

use axum::body::Body;
use axum::extract::FromRef;
use axum::http::{Request, StatusCode};
use axum::middleware;
use axum::routing::post;
use axum::Router;
use chutes_auth::{AuthGuardState, AuthorizeOptions, SignedRequestAuthenticator};
use schnorrkel::{signing_context, Keypair};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tower::ServiceExt;

#[derive(Clone)]
struct TestAppState {
    guard: AuthGuardState,
}

impl FromRef<TestAppState> for AuthGuardState {
    fn from_ref(state: &TestAppState) -> Self {
        state.guard.clone()
    }
}

fn build_test_router(state: TestAppState) -> Router {
    Router::new()
        .route("/cache/download", post(|| async { "ok" }))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            chutes_auth::signed_request_guard,
        ))
        .with_state(state)
}

fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() as i64
}

fn sign(keypair: &Keypair, hotkey: &str, nonce: &str, payload_hash: &str) -> String {
    let signing_string = format!("{}:{}:{}", hotkey, nonce, payload_hash);
    let signature = keypair.sign(signing_context(b"substrate").bytes(signing_string.as_bytes()));
    hex::encode(signature.to_bytes())
}

fn ss58_address(keypair: &Keypair) -> String {
    let mut raw = vec![42u8];
    raw.extend_from_slice(&keypair.public.to_bytes());
    bs58::encode(raw).with_check().into_string()
}

#[tokio::test]
async fn valid_signature_and_fresh_nonce_reach_the_handler() {
    let keypair = Keypair::generate();
    let hotkey = ss58_address(&keypair);

    let mut miners = HashSet::new();
    miners.insert(hotkey.clone());
    let authenticator = Arc::new(SignedRequestAuthenticator::new(hotkey.clone(), HashSet::new()));

    let state = TestAppState {
        guard: AuthGuardState {
            authenticator,
            options: AuthorizeOptions {
                allow_miner: true,
                allow_validator: false,
                purpose: "cache",
            },
        },
    };

    let body = br#"{"chute_id":"00000000-0000-0000-0000-000000000001"}"#;
    let body_hash = chutes_auth::sha256_hex(body);
    let nonce = now().to_string();
    let signature = sign(&keypair, &hotkey, &nonce, &body_hash);

    let request = Request::builder()
        .method("POST")
        .uri("/cache/download")
        .header("x-hotkey", &hotkey)
        .header("x-nonce", &nonce)
        .header("x-signature", &signature)
        .body(Body::from(body.to_vec()))
        .unwrap();

    let response = build_test_router(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn tampered_body_is_rejected_as_unauthorized() {
    let keypair = Keypair::generate();
    let hotkey = ss58_address(&keypair);
    let authenticator = Arc::new(SignedRequestAuthenticator::new(hotkey.clone(), HashSet::new()));

    let state = TestAppState {
        guard: AuthGuardState {
            authenticator,
            options: AuthorizeOptions {
                allow_miner: true,
                allow_validator: false,
                purpose: "cache",
            },
        },
    };

    let original_body = br#"{"chute_id":"00000000-0000-0000-0000-000000000001"}"#;
    let nonce = now().to_string();
    let signature = sign(&keypair, &hotkey, &nonce, &chutes_auth::sha256_hex(original_body));

    let tampered_request = Request::builder()
        .method("POST")
        .uri("/cache/download")
        .header("x-hotkey", &hotkey)
        .header("x-nonce", &nonce)
        .header("x-signature", &signature)
        .body(Body::from(br#"{"chute_id":"attacker-controlled"}"#.to_vec()))
        .unwrap();

    let response = build_test_router(state).oneshot(tampered_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
