use x402_solana::SolanaFacilitator;

/// Shared application state for the facilitator server.
///
/// Read-only after startup: the facilitator's identity and network registry
/// never change for the process lifetime, so the handle is shared across
/// workers without synchronization.
pub struct AppState {
    pub facilitator: SolanaFacilitator,
    /// Shared secret for request authentication; `None` disables the check.
    pub hmac_secret: Option<Vec<u8>>,
}
