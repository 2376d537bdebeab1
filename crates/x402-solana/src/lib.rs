//! Solana chain core for the x402 facilitator.
//!
//! Settles off-chain payment claims against the Solana ledger: classifies
//! client payment payloads into a canonical form, validates them through
//! simulation and signature-history lookups, broadcasts and confirms
//! transactions, and constructs fee-payer-sponsored transfers for payers who
//! cannot pay network fees themselves.
//!
//! # Components
//!
//! - [`network::NetworkRegistry`] — fixed map of network identifiers to RPC
//!   connection handles
//! - [`payload`] — classification of raw payloads into [`NormalizedPayment`]
//! - [`sponsor`] — fee-payer-sponsored transaction construction
//! - [`verifier::TransactionVerifier`] — validity decisions, never broadcasts
//! - [`settlement::SettlementEngine`] — broadcast plus bounded confirmation
//!   polling; the only component that mutates ledger state
//! - [`SolanaFacilitator`] — composition root consumed by the HTTP server

pub mod encoding;
pub mod facilitator;
pub mod identity;
pub mod network;
pub mod payload;
pub mod settlement;
pub mod sponsor;
pub mod verifier;

pub use facilitator::SolanaFacilitator;
pub use identity::FacilitatorIdentity;
pub use network::{NetworkEndpoints, NetworkRegistry};
pub use payload::{normalize, NormalizedPayment};
pub use settlement::{SettlementConfig, SettlementEngine, SettlementReceipt};
pub use sponsor::{build_sponsored_transfer, SponsoredTransaction, SponsoredTransactionBuilder};
pub use verifier::TransactionVerifier;
