//! Shared wire types for the Solana x402 facilitator.
//!
//! Everything that crosses the HTTP boundary lives here: payment
//! requirements and payloads, verify/settle/supported response bodies, the
//! error taxonomy, protocol constants, and the optional request-auth HMAC
//! helpers. The chain logic itself lives in the `x402-solana` crate.

pub mod constants;
pub mod error;
pub mod hmac;
pub mod payment;
pub mod response;

pub use constants::*;
pub use error::X402Error;
pub use payment::*;
pub use response::*;
