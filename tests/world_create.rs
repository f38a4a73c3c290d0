mod support;

use serde_json::Value;

async fn post_world(payload: Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(support::http_url("/worlds"))
        .json(&payload)
        .send()
        .await
        .expect("request should succeed")
}

#[tokio::test]
async fn test_world_creation() {
    let res = post_world(serde_json::json!({ "template": "lobby" })).await;
    assert_eq!(res.status(), reqwest::StatusCode::CREATED);

    let body: Value = res.json().await.expect("json body");
    assert!(!body["world_id"].as_str().unwrap_or_default().is_empty());
    assert_eq!(body["world_type"], "lobby");
    assert_eq!(body["rooms"], serde_json::json!(["main"]));
}

#[tokio::test]
async fn test_world_creation_twice_gives_distinct_worlds() {
    let a: Value = post_world(serde_json::json!({ "template": "lobby" }))
        .await
        .json()
        .await
        .expect("json body");
    let b: Value = post_world(serde_json::json!({ "template": "lobby" }))
        .await
        .json()
        .await
        .expect("json body");
    assert_ne!(a["world_id"], b["world_id"]);
}

#[tokio::test]
async fn test_unknown_template_is_not_found() {
    let res = post_world(serde_json::json!({ "template": "missing" })).await;
    assert_eq!(res.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = res.json().await.expect("json body");
    assert_eq!(body["error"], "template not found");
}

#[tokio::test]
async fn test_blank_template_is_rejected() {
    let res = post_world(serde_json::json!({ "template": "  " })).await;
    assert_eq!(res.status(), reqwest::StatusCode::BAD_REQUEST);
}
