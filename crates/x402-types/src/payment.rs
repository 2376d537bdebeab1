use serde::{Deserialize, Serialize};

use crate::constants::{SCHEME_NAME, X402_VERSION};

fn default_scheme() -> String {
    SCHEME_NAME.to_string()
}

fn default_version() -> u32 {
    X402_VERSION
}

fn default_timeout() -> u64 {
    60
}

/// A single entry in the `accepts` array of a 402 response.
///
/// Supplied by the protected-resource side, never by the payer. Addresses
/// and the mint are base58 strings on the wire; the chain core parses them
/// into `Pubkey`s at its boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub network: String,
    /// SPL token mint the payment must move.
    pub asset: String,
    /// Recipient wallet address.
    #[serde(default)]
    pub pay_to: String,
    /// Maximum token amount required, in base units (decimal string).
    #[serde(default)]
    pub max_amount_required: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    #[serde(default = "default_timeout")]
    pub max_timeout_seconds: u64,
}

/// Wire-format payment payload: the outer envelope plus the caller-controlled
/// inner document.
///
/// The inner `payload` is deliberately untyped: clients built against
/// different SDK generations send incompatible shapes, and classifying them
/// is the normalizer's job (`x402-solana`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    #[serde(default = "default_version")]
    pub x402_version: u32,
    #[serde(default = "default_scheme")]
    pub scheme: String,
    pub network: String,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirements_defaults() {
        let req: PaymentRequirements = serde_json::from_str(
            r#"{"network":"solana-devnet","asset":"4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU"}"#,
        )
        .unwrap();
        assert_eq!(req.scheme, "exact");
        assert_eq!(req.max_timeout_seconds, 60);
        assert!(req.pay_to.is_empty());
    }

    #[test]
    fn test_payload_envelope_keeps_inner_document_opaque() {
        let payload: PaymentPayload = serde_json::from_str(
            r#"{"network":"solana-devnet","payload":{"signature":"S1","transaction":"AAAA"}}"#,
        )
        .unwrap();
        assert_eq!(payload.x402_version, 1);
        assert_eq!(payload.scheme, "exact");
        assert_eq!(payload.payload["signature"], "S1");
    }

    #[test]
    fn test_requirements_camel_case_round_trip() {
        let req = PaymentRequirements {
            scheme: "exact".into(),
            network: "solana-devnet".into(),
            asset: "Mint111".into(),
            pay_to: "Recipient111".into(),
            max_amount_required: "1000".into(),
            description: Some("one article".into()),
            mime_type: None,
            resource: None,
            max_timeout_seconds: 60,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["payTo"], "Recipient111");
        assert_eq!(json["maxAmountRequired"], "1000");
        assert!(json.get("mimeType").is_none());
    }
}
