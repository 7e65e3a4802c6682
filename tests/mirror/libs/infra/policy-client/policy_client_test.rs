// [tests/mirror/libs/infra/policy-client/policy_client_test.rs]
//! Ejercita `PolicyEngineClient` contra un servidor axum desechable que
//! imita el motor de politicas externo.

use axum::routing::post;
use axum::{Json, Router};
use chutes_policy_client::{PolicyEngineClient, PolicyQueryInput, PolicyQueryPayload};
use serde_json::json;
use tokio::net::TcpListener;

async fn spawn_fake_policy_engine(body: serde_json::Value) -> String {
    let app = Router::new().route(
        "/v1/data/kubernetes/admission/deny",
        post(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    );
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn empty_payload() -> PolicyQueryPayload {
    PolicyQueryPayload {
        input: PolicyQueryInput {
            request: json!({"uid": "u1"}),
            allowed_registries: vec!["docker.io".to_string()],
            namespace_policy: json!({"mode": "enforce", "exempt": false}),
        },
    }
}

#[tokio::test]
async fn empty_result_list_means_no_violations() {
    let base_url = spawn_fake_policy_engine(json!({"result": []})).await;
    let client = PolicyEngineClient::new(base_url);

    let violations = client.evaluate(&empty_payload()).await.unwrap();
    assert!(violations.is_empty());
}

#[tokio::test]
async fn structured_and_bare_result_items_both_become_messages() {
    let base_url = spawn_fake_policy_engine(json!({
        "result": [
            {"msg": "Container 'app' has privileged security context"},
            "bare violation string"
        ]
    }))
    .await;
    let client = PolicyEngineClient::new(base_url);

    let violations = client.evaluate(&empty_payload()).await.unwrap();
    assert_eq!(
        violations,
        vec![
            "Container 'app' has privileged security context".to_string(),
            "bare violation string".to_string(),
        ]
    );
}
