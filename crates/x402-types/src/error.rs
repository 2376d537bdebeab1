use thiserror::Error;

/// Errors returned by x402 facilitator operations.
///
/// Verdicts the protocol treats as data (an invalid payment, a failed
/// settlement) are carried in [`crate::VerifyResponse`] and
/// [`crate::SettleResponse`] instead; these variants are the underlying
/// causes and are rendered into the `invalidReason`/`errorReason` fields at
/// the HTTP boundary.
#[derive(Debug, Error)]
pub enum X402Error {
    /// The client payload matched none of the recognized shapes. The message
    /// lists the fields that were actually present; callers rely on it for
    /// debugging, so the wording is part of the contract.
    #[error("Invalid payload format: {0}")]
    InvalidFormat(String),

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("broadcast error: {0}")]
    Broadcast(String),

    #[error("confirmation timeout: {0}")]
    Timeout(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
