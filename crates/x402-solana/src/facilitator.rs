use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;

use x402_types::constants::{SCHEME_NAME, X402_VERSION};
use x402_types::{
    ConfirmationLevel, PaymentPayload, PaymentRequirements, SettleResponse, SupportedKind,
    SupportedResponse, VerifyResponse, X402Error,
};

use crate::identity::FacilitatorIdentity;
use crate::network::NetworkRegistry;
use crate::payload::normalize;
use crate::settlement::{SettlementConfig, SettlementEngine};
use crate::sponsor::{build_sponsored_transfer, SponsoredTransaction};
use crate::verifier::TransactionVerifier;

/// Facilitator-side engine: classifies payment payloads, verifies them, and
/// settles them on-chain.
///
/// Constructed once at startup from an explicit registry and identity; the
/// verifier and settlement engine share both by reference. Everything here
/// is read-only after construction, so one instance serves concurrent
/// requests without locking.
pub struct SolanaFacilitator {
    registry: Arc<NetworkRegistry>,
    identity: Arc<FacilitatorIdentity>,
    verifier: TransactionVerifier,
    engine: SettlementEngine,
}

impl SolanaFacilitator {
    pub fn new(registry: NetworkRegistry, identity: FacilitatorIdentity) -> Self {
        Self::with_settlement_config(registry, identity, SettlementConfig::default())
    }

    pub fn with_settlement_config(
        registry: NetworkRegistry,
        identity: FacilitatorIdentity,
        config: SettlementConfig,
    ) -> Self {
        let registry = Arc::new(registry);
        let identity = Arc::new(identity);
        let verifier = TransactionVerifier::new(Arc::clone(&registry), Arc::clone(&identity));
        let engine = SettlementEngine::new(Arc::clone(&registry), Arc::clone(&identity), config);
        Self {
            registry,
            identity,
            verifier,
            engine,
        }
    }

    pub fn public_key(&self) -> Pubkey {
        self.identity.pubkey()
    }

    pub fn networks(&self) -> Vec<&'static str> {
        self.registry.networks()
    }

    /// The (scheme, network) pairs this facilitator settles, one per
    /// registry entry.
    pub fn supported(&self) -> SupportedResponse {
        let facilitator_public_key = self.identity.pubkey().to_string();
        let kinds = self
            .registry
            .networks()
            .into_iter()
            .map(|network| SupportedKind {
                x402_version: X402_VERSION,
                scheme: SCHEME_NAME.to_string(),
                network: network.to_string(),
                facilitator_pays_gas: true,
                facilitator_public_key: facilitator_public_key.clone(),
            })
            .collect();
        SupportedResponse { kinds }
    }

    /// Build a transfer with this facilitator as fee payer, partially
    /// signed, for the client to countersign and resubmit through
    /// verify/settle.
    pub async fn create_sponsored_transaction(
        &self,
        user_public_key: &str,
        requirements: &PaymentRequirements,
    ) -> Result<SponsoredTransaction, X402Error> {
        let client = self.registry.resolve(&requirements.network)?;
        build_sponsored_transfer(client, &self.identity, user_public_key, requirements).await
    }

    /// Decide validity without touching ledger state. Every failure is a
    /// structured verdict; nothing here returns a fault.
    pub async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> VerifyResponse {
        self.verifier.verify(payload, requirements).await
    }

    /// Settle one payment and map the engine's receipt onto the wire
    /// response. Failures keep the best-known signature so callers can
    /// re-query a broadcast whose confirmation timed out.
    pub async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> SettleResponse {
        let network = requirements.network.clone();
        let (payer, sponsored) = match normalize(&payload.payload) {
            Ok(normalized) => (
                normalized.resolved_payer(&self.identity.pubkey().to_string()),
                normalized.is_sponsored(),
            ),
            Err(e) => return Self::failure(e.to_string(), None, None, network),
        };

        match self.engine.settle(payload, requirements).await {
            Ok(receipt) if receipt.confirmed => {
                tracing::info!(
                    payer = %payer,
                    tx = receipt.signature.as_deref().unwrap_or(""),
                    "settlement completed"
                );
                SettleResponse {
                    success: true,
                    error_reason: None,
                    transaction: receipt.signature,
                    network,
                    payer: Some(payer),
                    confirmation_status: receipt.confirmation_status,
                    slot: receipt.slot,
                    block_time: receipt.block_time,
                    fees: receipt.fees_paid,
                    gas_sponsored_by_facilitator: sponsored,
                    user_paid_gas: !sponsored,
                }
            }
            Ok(receipt) => {
                let reason = receipt
                    .error
                    .unwrap_or_else(|| "settlement did not reach a confirmed state".to_string());
                tracing::warn!(payer = %payer, reason = %reason, "settlement not confirmed");
                Self::failure(
                    reason,
                    receipt.signature,
                    receipt.confirmation_status,
                    network,
                )
            }
            Err(e) => {
                tracing::warn!(payer = %payer, error = %e, "settlement rejected");
                Self::failure(e.to_string(), None, None, network)
            }
        }
    }

    fn failure(
        reason: String,
        signature: Option<String>,
        confirmation_status: Option<ConfirmationLevel>,
        network: String,
    ) -> SettleResponse {
        SettleResponse {
            success: false,
            error_reason: Some(reason),
            transaction: signature,
            network,
            payer: None,
            confirmation_status,
            slot: None,
            block_time: None,
            fees: None,
            gas_sponsored_by_facilitator: false,
            user_paid_gas: false,
        }
    }
}
