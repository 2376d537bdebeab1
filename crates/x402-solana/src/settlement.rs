use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::{RpcSendTransactionConfig, RpcTransactionConfig};
use solana_sdk::commitment_config::{CommitmentConfig, CommitmentLevel};
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use solana_transaction_status::{TransactionConfirmationStatus, UiTransactionEncoding};
use tokio::time::Instant;

use x402_types::{ConfirmationLevel, PaymentPayload, PaymentRequirements, X402Error};

use crate::encoding::decode_transaction;
use crate::identity::FacilitatorIdentity;
use crate::network::NetworkRegistry;
use crate::payload::{normalize, NormalizedPayment};

/// Timing knobs for a settlement attempt. Injectable so tests can run the
/// polling loop against fakes instead of wall-clock defaults.
#[derive(Debug, Clone)]
pub struct SettlementConfig {
    /// Delay between confirmation status queries.
    pub poll_interval: Duration,
    /// Overall wall-clock bound on the polling loop.
    pub confirmation_timeout: Duration,
    /// RPC-level rebroadcast budget handed to the node on submission.
    pub max_broadcast_retries: usize,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1_000),
            confirmation_timeout: Duration::from_secs(30),
            max_broadcast_retries: 3,
        }
    }
}

/// Outcome of a single settlement attempt. Created once per attempt and
/// never mutated afterwards.
///
/// `confirmed` is only true alongside a signature and a status of
/// confirmed or finalized. A non-confirmed receipt still carries the
/// best-known signature so the caller can re-query the attempt later.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub signature: Option<String>,
    pub confirmed: bool,
    pub confirmation_status: Option<ConfirmationLevel>,
    pub slot: Option<u64>,
    pub block_time: Option<i64>,
    pub fees_paid: Option<u64>,
    /// Why the attempt ended non-confirmed; `None` on success.
    pub error: Option<String>,
}

/// Broadcasts or confirms payments and polls the ledger to a terminal
/// state. The only component permitted to mutate ledger state.
pub struct SettlementEngine {
    registry: Arc<NetworkRegistry>,
    identity: Arc<FacilitatorIdentity>,
    config: SettlementConfig,
    /// Signatures with a settlement attempt between broadcast and terminal
    /// state. Two concurrent attempts on the same payload would otherwise
    /// race the on-chain replay check.
    in_flight: DashMap<String, ()>,
}

/// Releases the in-flight claim when the attempt reaches any exit path.
struct InFlightGuard<'a> {
    map: &'a DashMap<String, ()>,
    key: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.key);
    }
}

impl SettlementEngine {
    pub fn new(
        registry: Arc<NetworkRegistry>,
        identity: Arc<FacilitatorIdentity>,
        config: SettlementConfig,
    ) -> Self {
        Self {
            registry,
            identity,
            config,
            in_flight: DashMap::new(),
        }
    }

    /// Settle one payment: broadcast an embedded transaction, or confirm an
    /// already-submitted one, then poll until confirmed/finalized, on-chain
    /// rejection, or timeout. Network and format problems fail before any
    /// broadcast is attempted.
    pub async fn settle(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> Result<SettlementReceipt, X402Error> {
        if payload.network != requirements.network {
            return Err(X402Error::Validation(format!(
                "Network mismatch: payload says '{}', requirements say '{}'",
                payload.network, requirements.network
            )));
        }
        let client = self.registry.resolve(&requirements.network)?;
        let normalized = normalize(&payload.payload)?;

        match &normalized {
            NormalizedPayment::AuthorizationOnly { signature, .. } => {
                self.confirm_existing(client, signature).await
            }
            NormalizedPayment::FacilitatorSponsored {
                user_signature,
                facilitator_transaction,
                ..
            } => {
                let transaction = decode_transaction(facilitator_transaction)?;
                // Same invariant the verifier enforces: a sponsored
                // transaction naming another fee payer is never settled.
                let fee_payer = transaction.message.account_keys.first().copied();
                if fee_payer != Some(self.identity.pubkey()) {
                    return Err(X402Error::Validation(
                        "Fee payer mismatch: sponsored transaction does not name the facilitator as fee payer"
                            .into(),
                    ));
                }
                self.broadcast_and_confirm(client, &transaction, user_signature)
                    .await
            }
            NormalizedPayment::Minimal {
                signature,
                transaction,
            }
            | NormalizedPayment::Full {
                signature,
                transaction,
                ..
            } => {
                let transaction = decode_transaction(transaction)?;
                self.broadcast_and_confirm(client, &transaction, signature)
                    .await
            }
        }
    }

    fn claim_in_flight(&self, signature: &str) -> Option<InFlightGuard<'_>> {
        use dashmap::mapref::entry::Entry;
        match self.in_flight.entry(signature.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(());
                Some(InFlightGuard {
                    map: &self.in_flight,
                    key: signature.to_string(),
                })
            }
        }
    }

    async fn broadcast_and_confirm(
        &self,
        client: &RpcClient,
        transaction: &Transaction,
        claimed_signature: &str,
    ) -> Result<SettlementReceipt, X402Error> {
        let _guard = self.claim_in_flight(claimed_signature).ok_or_else(|| {
            X402Error::Validation(format!(
                "Settlement already in progress for signature {claimed_signature}"
            ))
        })?;

        let send_config = RpcSendTransactionConfig {
            skip_preflight: false,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            max_retries: Some(self.config.max_broadcast_retries),
            ..RpcSendTransactionConfig::default()
        };
        let signature = client
            .send_transaction_with_config(transaction, send_config)
            .await
            .map_err(|e| X402Error::Broadcast(format!("transaction broadcast rejected: {e}")))?;

        tracing::info!(sig = %signature, "transaction broadcast, polling for confirmation");
        self.poll_confirmation(client, &signature).await
    }

    /// Query confirmation status at the configured interval until the
    /// transaction reaches confirmed/finalized, fails on-chain, or the
    /// deadline passes. Timeout is a defined terminal state, not a hang.
    async fn poll_confirmation(
        &self,
        client: &RpcClient,
        signature: &Signature,
    ) -> Result<SettlementReceipt, X402Error> {
        let deadline = Instant::now() + self.config.confirmation_timeout;
        let mut last_status: Option<ConfirmationLevel> = None;

        loop {
            let statuses = client
                .get_signature_statuses(&[*signature])
                .await
                .map_err(|e| X402Error::Rpc(format!("confirmation status query failed: {e}")))?;

            if let Some(status) = statuses.value.into_iter().next().flatten() {
                if let Some(err) = status.err {
                    tracing::warn!(sig = %signature, error = %err, "transaction failed on-chain");
                    return Ok(SettlementReceipt {
                        signature: Some(signature.to_string()),
                        confirmed: false,
                        confirmation_status: confirmation_level(status.confirmation_status.as_ref()),
                        slot: Some(status.slot),
                        block_time: None,
                        fees_paid: None,
                        error: Some(format!("Transaction failed on-chain: {err}")),
                    });
                }

                let level = confirmation_level(status.confirmation_status.as_ref());
                last_status = level;
                if matches!(
                    level,
                    Some(ConfirmationLevel::Confirmed | ConfirmationLevel::Finalized)
                ) {
                    let (slot, block_time, fees_paid) =
                        self.transaction_details(client, signature).await;
                    tracing::info!(
                        sig = %signature,
                        status = %level.unwrap_or(ConfirmationLevel::Confirmed),
                        "settlement confirmed"
                    );
                    return Ok(SettlementReceipt {
                        signature: Some(signature.to_string()),
                        confirmed: true,
                        confirmation_status: level,
                        slot: slot.or(Some(status.slot)),
                        block_time,
                        fees_paid,
                        error: None,
                    });
                }
            }

            if Instant::now() >= deadline {
                let last = last_status
                    .map(|level| level.to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                tracing::warn!(sig = %signature, last_status = %last, "confirmation polling timed out");
                return Ok(SettlementReceipt {
                    signature: Some(signature.to_string()),
                    confirmed: false,
                    confirmation_status: last_status,
                    slot: None,
                    block_time: None,
                    fees_paid: None,
                    error: Some(format!(
                        "Confirmation timed out after {}s; last observed status: {last}. \
                         The transaction may still land — re-query the signature",
                        self.config.confirmation_timeout.as_secs()
                    )),
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Confirm a payment the payer already broadcast on their own. No
    /// broadcast happens here; the ledger's signature history is the source
    /// of truth.
    async fn confirm_existing(
        &self,
        client: &RpcClient,
        claimed_signature: &str,
    ) -> Result<SettlementReceipt, X402Error> {
        let signature: Signature = claimed_signature.parse().map_err(|e| {
            X402Error::Validation(format!(
                "Malformed transaction signature '{claimed_signature}': {e}"
            ))
        })?;

        let statuses = client
            .get_signature_statuses_with_history(&[signature])
            .await
            .map_err(|e| X402Error::Rpc(format!("ledger signature lookup failed: {e}")))?;

        let Some(status) = statuses.value.into_iter().next().flatten() else {
            return Err(X402Error::NotFound(format!(
                "transaction {claimed_signature} not found on-chain"
            )));
        };
        if let Some(err) = status.err {
            return Err(X402Error::Validation(format!(
                "Transaction failed on-chain: {err}"
            )));
        }

        // History lookups only surface rooted transactions; a missing level
        // therefore reads as finalized.
        let level = confirmation_level(status.confirmation_status.as_ref())
            .unwrap_or(ConfirmationLevel::Finalized);
        if level == ConfirmationLevel::Processed {
            return Ok(SettlementReceipt {
                signature: Some(claimed_signature.to_string()),
                confirmed: false,
                confirmation_status: Some(level),
                slot: Some(status.slot),
                block_time: None,
                fees_paid: None,
                error: Some("Transaction found but not yet confirmed (status: processed)".into()),
            });
        }

        let (slot, block_time, fees_paid) = self.transaction_details(client, &signature).await;
        Ok(SettlementReceipt {
            signature: Some(claimed_signature.to_string()),
            confirmed: true,
            confirmation_status: Some(level),
            slot: slot.or(Some(status.slot)),
            block_time,
            fees_paid,
            error: None,
        })
    }

    /// Best-effort receipt enrichment. Absence of slot/blockTime/fee never
    /// invalidates an otherwise-confirmed receipt.
    async fn transaction_details(
        &self,
        client: &RpcClient,
        signature: &Signature,
    ) -> (Option<u64>, Option<i64>, Option<u64>) {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Json),
            commitment: Some(CommitmentConfig::confirmed()),
            max_supported_transaction_version: Some(0),
        };
        match client.get_transaction_with_config(signature, config).await {
            Ok(details) => {
                let fee = details.transaction.meta.as_ref().map(|meta| meta.fee);
                (Some(details.slot), details.block_time, fee)
            }
            Err(e) => {
                tracing::debug!(sig = %signature, error = %e, "receipt enrichment unavailable");
                (None, None, None)
            }
        }
    }
}

fn confirmation_level(
    status: Option<&TransactionConfirmationStatus>,
) -> Option<ConfirmationLevel> {
    status.map(|status| match status {
        TransactionConfirmationStatus::Processed => ConfirmationLevel::Processed,
        TransactionConfirmationStatus::Confirmed => ConfirmationLevel::Confirmed,
        TransactionConfirmationStatus::Finalized => ConfirmationLevel::Finalized,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> SettlementEngine {
        SettlementEngine::new(
            Arc::new(NetworkRegistry::default()),
            Arc::new(FacilitatorIdentity::ephemeral()),
            SettlementConfig::default(),
        )
    }

    fn payload(network: &str, inner: serde_json::Value) -> PaymentPayload {
        PaymentPayload {
            x402_version: 1,
            scheme: "exact".into(),
            network: network.into(),
            payload: inner,
        }
    }

    fn requirements(network: &str) -> PaymentRequirements {
        PaymentRequirements {
            scheme: "exact".into(),
            network: network.into(),
            asset: "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU".into(),
            pay_to: String::new(),
            max_amount_required: "1000".into(),
            description: None,
            mime_type: None,
            resource: None,
            max_timeout_seconds: 60,
        }
    }

    #[test]
    fn test_default_config_bounds() {
        let config = SettlementConfig::default();
        assert_eq!(config.poll_interval, Duration::from_millis(1_000));
        assert_eq!(config.confirmation_timeout, Duration::from_secs(30));
        assert_eq!(config.max_broadcast_retries, 3);
    }

    #[test]
    fn test_in_flight_claim_is_exclusive_until_released() {
        let engine = engine();
        let first = engine.claim_in_flight("S1");
        assert!(first.is_some());
        assert!(engine.claim_in_flight("S1").is_none());
        assert!(engine.claim_in_flight("S2").is_some());

        drop(first);
        assert!(engine.claim_in_flight("S1").is_some());
    }

    #[tokio::test]
    async fn test_unsupported_network_fails_before_broadcast() {
        let err = engine()
            .settle(
                &payload("eclipse", json!({"signature": "S1", "transaction": "AAAA"})),
                &requirements("eclipse"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Unsupported network: eclipse");
    }

    #[tokio::test]
    async fn test_network_mismatch_fails_before_broadcast() {
        let err = engine()
            .settle(
                &payload("solana", json!({"signature": "S1", "transaction": "AAAA"})),
                &requirements("solana-devnet"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Network mismatch"));
    }

    #[tokio::test]
    async fn test_malformed_payload_fails_before_broadcast() {
        let err = engine()
            .settle(
                &payload("solana-devnet", json!({"foo": "bar"})),
                &requirements("solana-devnet"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, X402Error::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn test_sponsored_foreign_fee_payer_never_broadcast() {
        use crate::encoding::encode_transaction;
        use crate::sponsor::SponsoredTransactionBuilder;
        use solana_sdk::hash::Hash;
        use solana_sdk::pubkey::Pubkey;
        use solana_sdk::system_instruction;

        let stranger = Pubkey::new_unique();
        let ix = system_instruction::transfer(&stranger, &Pubkey::new_unique(), 1);
        let builder = SponsoredTransactionBuilder::new(&[ix], &stranger, Hash::new_unique());
        let encoded = encode_transaction(&builder.build()).unwrap();

        let err = engine()
            .settle(
                &payload(
                    "solana-devnet",
                    json!({
                        "userSignature": "x",
                        "facilitatorTransaction": encoded,
                        "userPublicKey": "U1",
                    }),
                ),
                &requirements("solana-devnet"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Fee payer mismatch"));
    }

    #[tokio::test]
    async fn test_authorization_only_malformed_signature_rejected() {
        let err = engine()
            .settle(
                &payload(
                    "solana-devnet",
                    json!({
                        "signature": "definitely-not-a-signature",
                        "payer": "P1",
                        "recipient": "R1",
                        "amount": 100,
                    }),
                ),
                &requirements("solana-devnet"),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Malformed transaction signature"));
    }

    #[test]
    fn test_receipt_serializes_camel_case() {
        let receipt = SettlementReceipt {
            signature: Some("S1".into()),
            confirmed: true,
            confirmation_status: Some(ConfirmationLevel::Finalized),
            slot: Some(42),
            block_time: Some(1_700_000_000),
            fees_paid: Some(5_000),
            error: None,
        };
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["confirmationStatus"], "finalized");
        assert_eq!(json["feesPaid"], 5000);
        assert_eq!(json["blockTime"], 1_700_000_000i64);
    }
}
