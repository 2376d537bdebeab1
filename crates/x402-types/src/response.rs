use serde::{Deserialize, Serialize};

/// Ledger assurance tier for a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationLevel {
    Processed,
    Confirmed,
    Finalized,
}

impl std::fmt::Display for ConfirmationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConfirmationLevel::Processed => "processed",
            ConfirmationLevel::Confirmed => "confirmed",
            ConfirmationLevel::Finalized => "finalized",
        };
        f.write_str(s)
    }
}

/// Response from the facilitator's `/verify` endpoint.
///
/// `invalid_reason` is serialized even when `None`; callers key off an
/// explicit `"invalidReason": null` on acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub is_valid: bool,
    pub invalid_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payer: Option<String>,
    pub gas_sponsored_by_facilitator: bool,
}

impl VerifyResponse {
    pub fn valid(payer: impl Into<String>, sponsored: bool) -> Self {
        Self {
            is_valid: true,
            invalid_reason: None,
            payer: Some(payer.into()),
            gas_sponsored_by_facilitator: sponsored,
        }
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            invalid_reason: Some(reason.into()),
            payer: None,
            gas_sponsored_by_facilitator: false,
        }
    }
}

/// Response from the facilitator's `/settle` endpoint.
///
/// `transaction` stays present (as `null` or the best-known signature) on
/// failure so a caller can re-query a broadcast whose confirmation timed out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    pub transaction: Option<String>,
    pub network: String,
    pub payer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirmation_status: Option<ConfirmationLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fees: Option<u64>,
    pub gas_sponsored_by_facilitator: bool,
    pub user_paid_gas: bool,
}

/// One supported (scheme, network) pair in the `/supported` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportedKind {
    pub x402_version: u32,
    pub scheme: String,
    pub network: String,
    pub facilitator_pays_gas: bool,
    pub facilitator_public_key: String,
}

/// Response from the facilitator's `/supported` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedResponse {
    pub kinds: Vec<SupportedKind>,
}

/// Response from the facilitator's `/create-sponsored-transaction` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SponsoredTransactionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Base64-encoded, partially signed transaction awaiting the payer's
    /// authorization signature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facilitator_public_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blockhash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee_paid_by: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verify_valid_serializes_null_reason() {
        let json = serde_json::to_value(VerifyResponse::valid("unknown", false)).unwrap();
        assert_eq!(json["isValid"], true);
        assert!(json["invalidReason"].is_null());
        assert_eq!(json["gasSponsoredByFacilitator"], false);
    }

    #[test]
    fn test_settle_failure_keeps_null_transaction_and_payer() {
        let resp = SettleResponse {
            success: false,
            error_reason: Some("Unsupported network: base".into()),
            transaction: None,
            network: "base".into(),
            payer: None,
            confirmation_status: None,
            slot: None,
            block_time: None,
            fees: None,
            gas_sponsored_by_facilitator: false,
            user_paid_gas: false,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["transaction"].is_null());
        assert!(json["payer"].is_null());
        assert!(json.get("slot").is_none());
    }

    #[test]
    fn test_confirmation_level_wire_names() {
        assert_eq!(
            serde_json::to_string(&ConfirmationLevel::Finalized).unwrap(),
            "\"finalized\""
        );
        assert!(ConfirmationLevel::Processed < ConfirmationLevel::Confirmed);
    }
}
