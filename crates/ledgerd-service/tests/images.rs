//! Image edit charge and refund integration tests.

mod common;

use std::sync::Arc;

use common::{StubGenerator, TestHarness};
use serde_json::json;

#[tokio::test]
async fn image_edit_charges_default_model_cost() {
    let harness = TestHarness::with_generator(Arc::new(StubGenerator { fail: false }));

    let response = harness
        .server
        .post("/v1/images/edit")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "prompt": "make it teal" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["model"], "gemini-2.5-flash-image");
    assert_eq!(body["cost"], 4);
    assert_eq!(body["url"], "https://images.example/out.png");

    // Daily allowance 30 minus the default model's cost.
    let balance = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = balance.json();
    assert_eq!(body["balance"], 26);

    let spends = harness
        .server
        .get("/v1/credits/spends")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = spends.json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["spends"][0]["reason"], "image_edit");
    assert_eq!(body["spends"][0]["amount"], 4);
}

#[tokio::test]
async fn unknown_model_falls_back_to_default() {
    let harness = TestHarness::with_generator(Arc::new(StubGenerator { fail: false }));

    let response = harness
        .server
        .post("/v1/images/edit")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "prompt": "sharpen", "model": "no-such-model" }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["model"], "gemini-2.5-flash-image");
    assert_eq!(body["cost"], 4);
}

#[tokio::test]
async fn inactive_model_is_rejected_without_charge() {
    let harness = TestHarness::with_generator(Arc::new(StubGenerator { fail: false }));

    let response = harness
        .server
        .post("/v1/images/edit")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "prompt": "sharpen", "model": "flux-context" }))
        .await;

    response.assert_status_bad_request();

    let balance = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = balance.json();
    assert_eq!(body["balance"], 30);
}

#[tokio::test]
async fn empty_prompt_is_rejected() {
    let harness = TestHarness::with_generator(Arc::new(StubGenerator { fail: false }));

    let response = harness
        .server
        .post("/v1/images/edit")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "prompt": "   " }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn backend_failure_refunds_the_charge() {
    let harness = TestHarness::with_generator(Arc::new(StubGenerator { fail: true }));

    let response = harness
        .server
        .post("/v1/images/edit")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "prompt": "make it teal" }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);

    // The refund restores the balance...
    let balance = harness
        .server
        .get("/v1/credits/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = balance.json();
    assert_eq!(body["balance"], 30);

    // ...via a new grant; the spend rows stay for audit.
    let grants = harness
        .server
        .get("/v1/credits/grants")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = grants.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["grants"][0]["reason"], "image_edit_refund");
    assert_eq!(body["grants"][0]["amount"], 4);

    let spends = harness
        .server
        .get("/v1/credits/spends")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = spends.json();
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn insufficient_credits_returns_payment_required() {
    let harness = TestHarness::with_generator(Arc::new(StubGenerator { fail: false }));

    // Burn the daily allowance down to 2 credits (30 - 7 * 4).
    for _ in 0..7 {
        harness
            .server
            .post("/v1/images/edit")
            .add_header("authorization", harness.user_auth_header())
            .json(&json!({ "prompt": "again" }))
            .await
            .assert_status_ok();
    }

    let response = harness
        .server
        .post("/v1/images/edit")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "prompt": "one more" }))
        .await;

    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["code"], "insufficient_credits");
    assert_eq!(body["error"]["details"]["available"], 2);
    assert_eq!(body["error"]["details"]["required"], 4);
}

#[tokio::test]
async fn image_edit_without_generator_is_rejected() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/images/edit")
        .add_header("authorization", harness.user_auth_header())
        .json(&json!({ "prompt": "make it teal" }))
        .await;

    response.assert_status(axum::http::StatusCode::BAD_GATEWAY);
}
