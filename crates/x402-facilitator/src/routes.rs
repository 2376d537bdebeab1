use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use x402_types::{
    PaymentPayload, PaymentRequirements, SponsoredTransactionResponse, VerifyResponse,
};

use crate::metrics;
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub payment_payload: PaymentPayload,
    pub payment_requirements: PaymentRequirements,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsorRequest {
    pub user_public_key: String,
    pub payment_requirements: PaymentRequirements,
}

/// Validate the HMAC header on an incoming request.
/// Returns an error response if HMAC is required but missing/invalid.
fn validate_hmac(req: &HttpRequest, body: &[u8], state: &AppState) -> Result<(), HttpResponse> {
    let secret = match &state.hmac_secret {
        Some(secret) => secret,
        None => return Ok(()), // No secret configured — skip HMAC (dev mode)
    };

    match req
        .headers()
        .get("X-Facilitator-Auth")
        .and_then(|v| v.to_str().ok())
    {
        Some(signature) => {
            if x402_types::hmac::verify_hmac(secret, body, signature) {
                Ok(())
            } else {
                tracing::warn!("HMAC verification failed — signature mismatch");
                metrics::HMAC_FAILURES.with_label_values(&["invalid"]).inc();
                Err(HttpResponse::Unauthorized().json(serde_json::json!({
                    "error": "authentication failed"
                })))
            }
        }
        None => {
            tracing::warn!("HMAC header missing on authenticated endpoint");
            metrics::HMAC_FAILURES.with_label_values(&["missing"]).inc();
            Err(HttpResponse::Unauthorized().json(serde_json::json!({
                "error": "authentication required"
            })))
        }
    }
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "service": "x402-solana-facilitator",
        "networks": state.facilitator.networks(),
        "facilitatorPublicKey": state.facilitator.public_key().to_string(),
    }))
}

#[get("/supported")]
pub async fn supported(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.facilitator.supported())
}

#[get("/metrics")]
pub async fn metrics_endpoint() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(metrics::metrics_output())
}

#[post("/create-sponsored-transaction")]
pub async fn create_sponsored_transaction(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    if let Err(resp) = validate_hmac(&req, &body, &state) {
        return resp;
    }

    let parsed: SponsorRequest = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(_) => {
            metrics::SPONSOR_REQUESTS
                .with_label_values(&["rejected"])
                .inc();
            return HttpResponse::BadRequest().json(sponsor_failure("Invalid request body"));
        }
    };

    match state
        .facilitator
        .create_sponsored_transaction(&parsed.user_public_key, &parsed.payment_requirements)
        .await
    {
        Ok(sponsored) => {
            metrics::SPONSOR_REQUESTS
                .with_label_values(&["success"])
                .inc();
            tracing::info!(
                user = %parsed.user_public_key,
                blockhash = %sponsored.blockhash,
                "sponsored transaction created"
            );
            HttpResponse::Ok().json(SponsoredTransactionResponse {
                success: true,
                error: None,
                transaction: Some(sponsored.transaction),
                facilitator_public_key: Some(sponsored.fee_payer.to_string()),
                blockhash: Some(sponsored.blockhash),
                fee_paid_by: Some("facilitator".to_string()),
            })
        }
        Err(e) => {
            metrics::SPONSOR_REQUESTS
                .with_label_values(&["rejected"])
                .inc();
            tracing::warn!(
                user = %parsed.user_public_key,
                error = %e,
                "sponsored transaction construction failed"
            );
            HttpResponse::BadRequest().json(sponsor_failure(e.to_string()))
        }
    }
}

fn sponsor_failure(reason: impl Into<String>) -> SponsoredTransactionResponse {
    SponsoredTransactionResponse {
        success: false,
        error: Some(reason.into()),
        transaction: None,
        facilitator_public_key: None,
        blockhash: None,
        fee_paid_by: None,
    }
}

#[post("/verify")]
pub async fn verify(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    if let Err(resp) = validate_hmac(&req, &body, &state) {
        return resp;
    }

    let parsed: PaymentRequest = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(_) => {
            metrics::VERIFY_REQUESTS.with_label_values(&["invalid"]).inc();
            return HttpResponse::BadRequest().json(VerifyResponse::invalid("Invalid request body"));
        }
    };

    let verdict = state
        .facilitator
        .verify(&parsed.payment_payload, &parsed.payment_requirements)
        .await;

    if verdict.is_valid {
        metrics::VERIFY_REQUESTS.with_label_values(&["valid"]).inc();
        HttpResponse::Ok().json(verdict)
    } else {
        metrics::VERIFY_REQUESTS.with_label_values(&["invalid"]).inc();
        tracing::info!(
            reason = verdict.invalid_reason.as_deref().unwrap_or("unknown"),
            "verification rejected"
        );
        HttpResponse::BadRequest().json(verdict)
    }
}

#[post("/settle")]
pub async fn settle(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Bytes,
) -> HttpResponse {
    if let Err(resp) = validate_hmac(&req, &body, &state) {
        return resp;
    }

    let parsed: PaymentRequest = match serde_json::from_slice(&body) {
        Ok(parsed) => parsed,
        Err(_) => {
            metrics::SETTLE_REQUESTS
                .with_label_values(&["rejected"])
                .inc();
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "errorReason": "Invalid request body",
                "transaction": null,
                "network": null,
                "payer": null,
            }));
        }
    };

    let start = std::time::Instant::now();
    let result = state
        .facilitator
        .settle(&parsed.payment_payload, &parsed.payment_requirements)
        .await;
    let elapsed = start.elapsed().as_secs_f64();

    if result.success {
        metrics::SETTLE_REQUESTS
            .with_label_values(&["success"])
            .inc();
        metrics::SETTLE_LATENCY
            .with_label_values(&["success"])
            .observe(elapsed);
        tracing::info!(
            payer = result.payer.as_deref().unwrap_or("unknown"),
            tx = result.transaction.as_deref().unwrap_or(""),
            "settlement completed"
        );
        HttpResponse::Ok().json(result)
    } else {
        metrics::SETTLE_REQUESTS
            .with_label_values(&["rejected"])
            .inc();
        metrics::SETTLE_LATENCY
            .with_label_values(&["rejected"])
            .observe(elapsed);
        tracing::warn!(
            reason = result.error_reason.as_deref().unwrap_or("unknown"),
            "settlement rejected"
        );
        HttpResponse::BadRequest().json(result)
    }
}
