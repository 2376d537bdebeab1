use std::sync::Arc;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSimulateTransactionConfig;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;

use x402_types::constants::SCHEME_NAME;
use x402_types::{PaymentPayload, PaymentRequirements, VerifyResponse};

use crate::encoding::decode_transaction;
use crate::identity::FacilitatorIdentity;
use crate::network::NetworkRegistry;
use crate::payload::{normalize, NormalizedPayment};

/// Decides payment validity without mutating ledger state.
///
/// Verification is idempotent and never broadcasts: embedded transactions
/// are dry-run through simulation, and already-submitted payments are
/// checked against the ledger's signature history.
pub struct TransactionVerifier {
    registry: Arc<NetworkRegistry>,
    identity: Arc<FacilitatorIdentity>,
}

impl TransactionVerifier {
    pub fn new(registry: Arc<NetworkRegistry>, identity: Arc<FacilitatorIdentity>) -> Self {
        Self { registry, identity }
    }

    pub async fn verify(
        &self,
        payload: &PaymentPayload,
        requirements: &PaymentRequirements,
    ) -> VerifyResponse {
        // 1. Scheme and network agreement. Cheap, and required before any
        //    connection lookup.
        if requirements.scheme != SCHEME_NAME {
            return VerifyResponse::invalid(format!(
                "Scheme mismatch: expected '{SCHEME_NAME}', got '{}'",
                requirements.scheme
            ));
        }
        if payload.network != requirements.network {
            return VerifyResponse::invalid(format!(
                "Network mismatch: payload says '{}', requirements say '{}'",
                payload.network, requirements.network
            ));
        }

        // 2. Classify the payload. Format errors carry the observed fields.
        let normalized = match normalize(&payload.payload) {
            Ok(normalized) => normalized,
            Err(e) => return VerifyResponse::invalid(e.to_string()),
        };

        // 3. Only now touch the registry.
        let client = match self.registry.resolve(&requirements.network) {
            Ok(client) => client,
            Err(e) => return VerifyResponse::invalid(e.to_string()),
        };

        let verdict = match &normalized {
            NormalizedPayment::FacilitatorSponsored {
                facilitator_transaction,
                ..
            } => self.verify_sponsored(client, facilitator_transaction).await,
            NormalizedPayment::Minimal {
                signature,
                transaction,
            }
            | NormalizedPayment::Full {
                signature,
                transaction,
                ..
            } => {
                self.verify_embedded(client, &normalized, signature, transaction)
                    .await
            }
            NormalizedPayment::AuthorizationOnly {
                signature, payer, ..
            } => self.verify_authorization(client, signature, payer).await,
        };

        if verdict.is_valid {
            tracing::info!(
                tag = normalized.tag(),
                payer = verdict.payer.as_deref().unwrap_or("unknown"),
                "payment verification succeeded"
            );
        } else {
            tracing::info!(
                tag = normalized.tag(),
                reason = verdict.invalid_reason.as_deref().unwrap_or("unknown"),
                "payment verification rejected"
            );
        }
        verdict
    }

    async fn verify_sponsored(&self, client: &RpcClient, encoded: &str) -> VerifyResponse {
        let transaction = match decode_transaction(encoded) {
            Ok(transaction) => transaction,
            Err(e) => return VerifyResponse::invalid(e.to_string()),
        };

        // The fee-payer slot is the first account key. A sponsored payload
        // naming anyone but this facilitator is rejected before simulation.
        let facilitator = self.identity.pubkey();
        match transaction.message.account_keys.first() {
            Some(fee_payer) if *fee_payer == facilitator => {}
            _ => {
                return VerifyResponse::invalid(
                    "Fee payer mismatch: sponsored transaction does not name the facilitator as fee payer",
                );
            }
        }

        if let Some(reason) = self.simulation_failure(client, &transaction).await {
            return VerifyResponse::invalid(reason);
        }
        VerifyResponse::valid(facilitator.to_string(), true)
    }

    async fn verify_embedded(
        &self,
        client: &RpcClient,
        normalized: &NormalizedPayment,
        claimed_signature: &str,
        encoded: &str,
    ) -> VerifyResponse {
        let transaction = match decode_transaction(encoded) {
            Ok(transaction) => transaction,
            Err(e) => return VerifyResponse::invalid(e.to_string()),
        };

        if let Some(reason) = self.simulation_failure(client, &transaction).await {
            return VerifyResponse::invalid(reason);
        }

        // Replay protection: absence of the claimed signature on-chain is
        // the accepting condition. A claimed value that is not even a
        // signature cannot identify an executed transaction, so it passes
        // through to the same accepting condition.
        if let Ok(signature) = claimed_signature.parse::<Signature>() {
            match client.get_signature_statuses_with_history(&[signature]).await {
                Ok(statuses) => {
                    if statuses.value.first().is_some_and(Option::is_some) {
                        return VerifyResponse::invalid(
                            "Transaction already executed on-chain: replay rejected",
                        );
                    }
                }
                Err(e) => {
                    return VerifyResponse::invalid(format!("Ledger signature lookup failed: {e}"));
                }
            }
        }

        let payer = normalized.resolved_payer(&self.identity.pubkey().to_string());
        VerifyResponse::valid(payer, false)
    }

    async fn verify_authorization(
        &self,
        client: &RpcClient,
        claimed_signature: &str,
        payer: &str,
    ) -> VerifyResponse {
        let signature = match claimed_signature.parse::<Signature>() {
            Ok(signature) => signature,
            Err(e) => {
                return VerifyResponse::invalid(format!(
                    "Malformed transaction signature '{claimed_signature}': {e}"
                ));
            }
        };

        match client.get_signature_statuses_with_history(&[signature]).await {
            Err(e) => VerifyResponse::invalid(format!("Ledger signature lookup failed: {e}")),
            Ok(statuses) => match statuses.value.into_iter().next().flatten() {
                None => VerifyResponse::invalid("Payment transaction not found on-chain"),
                Some(status) => match status.err {
                    Some(err) => VerifyResponse::invalid(format!(
                        "Payment transaction failed on-chain: {err}"
                    )),
                    None => VerifyResponse::valid(payer, false),
                },
            },
        }
    }

    /// Dry-run the transaction against current ledger state. `Some(reason)`
    /// when the ledger predicts failure. Signature checks are skipped and
    /// the blockhash is replaced: verification predicts execution, it does
    /// not gate on recency; broadcast preflight enforces the real blockhash.
    async fn simulation_failure(&self, client: &RpcClient, tx: &Transaction) -> Option<String> {
        let config = RpcSimulateTransactionConfig {
            sig_verify: false,
            replace_recent_blockhash: true,
            ..RpcSimulateTransactionConfig::default()
        };
        match client.simulate_transaction_with_config(tx, config).await {
            Ok(response) => response
                .value
                .err
                .map(|err| format!("Transaction simulation failed: {err}")),
            Err(e) => Some(format!("Transaction simulation unavailable: {e}")),
        }
    }
}
