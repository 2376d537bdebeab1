use actix_web::{test, web, App};

use x402_facilitator::routes;
use x402_facilitator::state::AppState;
use x402_solana::{FacilitatorIdentity, NetworkRegistry, SolanaFacilitator};

/// Build an AppState backed by the default registry, an ephemeral identity,
/// and configurable HMAC. Nothing here opens a network connection; every
/// request below is rejected before the first RPC call.
fn make_state(hmac_secret: Option<Vec<u8>>) -> web::Data<AppState> {
    let facilitator =
        SolanaFacilitator::new(NetworkRegistry::default(), FacilitatorIdentity::ephemeral());
    web::Data::new(AppState {
        facilitator,
        hmac_secret,
    })
}

#[actix_rt::test]
async fn test_supported_returns_exact_scheme_for_each_network() {
    let state = make_state(None);
    let app = test::init_service(App::new().app_data(state).service(routes::supported)).await;

    let req = test::TestRequest::get().uri("/supported").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    let kinds = body["kinds"].as_array().unwrap();
    assert_eq!(kinds.len(), 3);
    assert_eq!(kinds[0]["scheme"], "exact");
    assert_eq!(kinds[0]["network"], "solana");
    assert_eq!(kinds[1]["network"], "solana-devnet");
    assert_eq!(kinds[0]["facilitatorPaysGas"], true);
    assert!(!kinds[0]["facilitatorPublicKey"]
        .as_str()
        .unwrap()
        .is_empty());
}

#[actix_rt::test]
async fn test_health_reports_identity_and_networks() {
    let state = make_state(None);
    let app = test::init_service(App::new().app_data(state).service(routes::health)).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["networks"].as_array().unwrap().len(), 3);
    assert!(!body["facilitatorPublicKey"].as_str().unwrap().is_empty());
}

#[actix_rt::test]
async fn test_verify_requires_hmac_when_configured() {
    let state = make_state(Some(b"test-secret".to_vec()));
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::verify),
    )
    .await;

    // Send without X-Facilitator-Auth header
    let req = test::TestRequest::post()
        .uri("/verify")
        .set_payload("{}")
        .insert_header(("Content-Type", "application/json"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "authentication required");
}

#[actix_rt::test]
async fn test_verify_rejects_bad_hmac() {
    let state = make_state(Some(b"test-secret".to_vec()));
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::verify),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/verify")
        .set_payload("{}")
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("X-Facilitator-Auth", "ZGVhZGJlZWY="))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 401);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["error"], "authentication failed");
}

#[actix_rt::test]
async fn test_verify_accepts_valid_hmac() {
    let state = make_state(Some(b"test-secret".to_vec()));
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::verify),
    )
    .await;

    // Compute a valid HMAC over the body
    let body_bytes = b"{}";
    let sig = x402_types::hmac::compute_hmac(b"test-secret", body_bytes);

    let req = test::TestRequest::post()
        .uri("/verify")
        .set_payload(&body_bytes[..])
        .insert_header(("Content-Type", "application/json"))
        .insert_header(("X-Facilitator-Auth", sig))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // Passes HMAC but fails on body parse -> 400, not 401
    assert_eq!(resp.status(), 400);
}

#[actix_rt::test]
async fn test_verify_skips_hmac_when_no_secret() {
    let state = make_state(None);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::verify),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/verify")
        .set_payload("{}")
        .insert_header(("Content-Type", "application/json"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    // HMAC skipped, body parse fails -> 400, not 401
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["isValid"], false);
    assert_eq!(body["invalidReason"], "Invalid request body");
}

#[actix_rt::test]
async fn test_verify_unrecognized_payload_lists_fields() {
    let state = make_state(None);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::verify),
    )
    .await;

    let body = serde_json::json!({
        "paymentPayload": {
            "network": "solana-devnet",
            "payload": { "foo": "bar" },
        },
        "paymentRequirements": {
            "network": "solana-devnet",
            "asset": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        },
    });
    let req = test::TestRequest::post()
        .uri("/verify")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["isValid"], false);
    let reason = body["invalidReason"].as_str().unwrap();
    assert!(reason.contains("Invalid payload format"));
    assert!(reason.contains("Available fields: foo"));
}

#[actix_rt::test]
async fn test_verify_unsupported_network_rejected() {
    let state = make_state(None);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::verify),
    )
    .await;

    let body = serde_json::json!({
        "paymentPayload": {
            "network": "eclipse",
            "payload": { "signature": "S1", "transaction": "AAAA" },
        },
        "paymentRequirements": {
            "network": "eclipse",
            "asset": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        },
    });
    let req = test::TestRequest::post()
        .uri("/verify")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["invalidReason"], "Unsupported network: eclipse");
}

#[actix_rt::test]
async fn test_settle_rejects_malformed_body() {
    let state = make_state(None);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::settle),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/settle")
        .set_payload("not valid json at all")
        .insert_header(("Content-Type", "application/json"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["transaction"].is_null());
    assert!(body["errorReason"].as_str().unwrap().contains("Invalid"));
}

#[actix_rt::test]
async fn test_settle_unsupported_network_rejected() {
    let state = make_state(None);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::settle),
    )
    .await;

    let body = serde_json::json!({
        "paymentPayload": {
            "network": "eclipse",
            "payload": { "signature": "S1", "transaction": "AAAA" },
        },
        "paymentRequirements": {
            "network": "eclipse",
            "asset": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        },
    });
    let req = test::TestRequest::post()
        .uri("/settle")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["errorReason"], "Unsupported network: eclipse");
    assert!(body["transaction"].is_null());
    assert!(body["payer"].is_null());
    assert_eq!(body["network"], "eclipse");
}

#[actix_rt::test]
async fn test_sponsor_rejects_malformed_user_key() {
    let state = make_state(None);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::create_sponsored_transaction),
    )
    .await;

    let body = serde_json::json!({
        "userPublicKey": "not-a-public-key",
        "paymentRequirements": {
            "network": "solana-devnet",
            "asset": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
            "payTo": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
            "maxAmountRequired": "1000",
        },
    });
    let req = test::TestRequest::post()
        .uri("/create-sponsored-transaction")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("malformed user public key"));
}

#[actix_rt::test]
async fn test_sponsor_rejects_unknown_network() {
    let state = make_state(None);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::create_sponsored_transaction),
    )
    .await;

    let body = serde_json::json!({
        "userPublicKey": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        "paymentRequirements": {
            "network": "eclipse",
            "asset": "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU",
        },
    });
    let req = test::TestRequest::post()
        .uri("/create-sponsored-transaction")
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Unsupported network: eclipse");
}
