use std::time::Duration;

use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use x402_facilitator::routes;
use x402_facilitator::state::AppState;
use x402_solana::{
    FacilitatorIdentity, NetworkEndpoints, NetworkRegistry, SettlementConfig, SolanaFacilitator,
};
use x402_types::constants::{DEVNET_RPC_URL, MAINNET_RPC_URL, TESTNET_RPC_URL};

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

fn parse_cors_origins() -> Vec<String> {
    match std::env::var("ALLOWED_ORIGINS") {
        Ok(origins) => origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => vec![],
    }
}

fn build_cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        // Default: allow localhost on any port
        Cors::default()
            .allowed_origin_fn(|origin, _| {
                origin
                    .to_str()
                    .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                    .unwrap_or(false)
            })
            .allow_any_method()
            .allowed_headers(vec!["content-type", "authorization", "x-facilitator-auth"])
            .max_age(3600)
    } else {
        let mut cors = Cors::default();
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors.allow_any_method()
            .allowed_headers(vec!["content-type", "authorization", "x-facilitator-auth"])
            .max_age(3600)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let identity = match std::env::var("FACILITATOR_SECRET_KEY")
        .ok()
        .filter(|s| !s.is_empty())
    {
        Some(secret) => match FacilitatorIdentity::from_base58(&secret) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::error!("invalid FACILITATOR_SECRET_KEY: {e}");
                std::process::exit(1);
            }
        },
        None => {
            tracing::warn!(
                "FACILITATOR_SECRET_KEY not set — using an ephemeral keypair; \
                 sponsored transactions will not survive a restart"
            );
            FacilitatorIdentity::ephemeral()
        }
    };
    let facilitator_public_key = identity.pubkey();

    let endpoints = NetworkEndpoints {
        mainnet: env_or("MAINNET_RPC_URL", MAINNET_RPC_URL),
        devnet: env_or("DEVNET_RPC_URL", DEVNET_RPC_URL),
        testnet: env_or("TESTNET_RPC_URL", TESTNET_RPC_URL),
    };

    let settlement = SettlementConfig {
        poll_interval: Duration::from_millis(env_u64("SETTLE_POLL_INTERVAL_MS", 1_000)),
        confirmation_timeout: Duration::from_secs(env_u64("SETTLE_TIMEOUT_SECS", 30)),
        ..SettlementConfig::default()
    };

    let facilitator = SolanaFacilitator::with_settlement_config(
        NetworkRegistry::new(endpoints),
        identity,
        settlement,
    );

    let hmac_secret = std::env::var("FACILITATOR_SHARED_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
        .map(String::into_bytes);
    if hmac_secret.is_none() {
        tracing::warn!("FACILITATOR_SHARED_SECRET not set — HMAC auth disabled (dev mode)");
    }

    let state = web::Data::new(AppState {
        facilitator,
        hmac_secret,
    });

    let port: u16 = std::env::var("FACILITATOR_PORT")
        .or_else(|_| std::env::var("PORT"))
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(4022);

    let rate_limit_rpm = env_u64("RATE_LIMIT_RPM", 120);
    let cors_origins = parse_cors_origins();

    tracing::info!("Solana x402 Facilitator listening on port {port}");
    tracing::info!("Facilitator public key: {facilitator_public_key}");
    tracing::info!("Rate limit: {rate_limit_rpm} req/min per IP");
    tracing::info!("  GET  http://localhost:{port}/supported");
    tracing::info!("  POST http://localhost:{port}/create-sponsored-transaction");
    tracing::info!("  POST http://localhost:{port}/verify");
    tracing::info!("  POST http://localhost:{port}/settle");

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm)
        .finish()
        .expect("failed to build rate limiter config");

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_origins))
            .wrap(Governor::new(&governor_conf))
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(65_536))
            .service(routes::health)
            .service(routes::metrics_endpoint)
            .service(routes::supported)
            .service(routes::create_sponsored_transaction)
            .service(routes::verify)
            .service(routes::settle)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
