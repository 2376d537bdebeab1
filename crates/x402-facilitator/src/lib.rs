//! Solana x402 facilitator — verifies payment payloads and settles them
//! on-chain.
//!
//! The facilitator receives requests from resource servers, classifies and
//! verifies client payment payloads, broadcasts or confirms the underlying
//! transactions, and constructs fee-sponsored transfers for payers who
//! cannot pay network fees. Chain logic lives in the [`x402_solana`] crate;
//! this crate provides the HTTP server, state management, and metrics.
//!
//! # Modules
//!
//! - [`routes`] — HTTP endpoints (health, supported, verify, settle,
//!   create-sponsored-transaction, metrics)
//! - [`state`] — Shared [`AppState`](state::AppState)
//! - [`metrics`] — Prometheus metrics for facilitator operations

pub mod metrics;
pub mod routes;
pub mod state;
