use serde_json::{Map, Value};

use x402_types::X402Error;

/// Canonical record extracted from a client payment payload.
///
/// Clients built against different SDK generations send incompatible
/// document shapes; exactly one tag applies to any recognized payload.
/// Classification happens once, here, and every downstream component
/// matches on the tag instead of re-inspecting raw fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedPayment {
    /// Transaction constructed by the facilitator, which also pays its fees.
    FacilitatorSponsored {
        user_signature: String,
        facilitator_transaction: String,
        user_public_key: String,
    },
    /// A signature and an encoded transaction, nothing else.
    Minimal {
        signature: String,
        transaction: String,
    },
    /// Fully described transfer. The descriptive fields are advisory; only
    /// the embedded transaction is trusted during verification.
    Full {
        signature: String,
        transaction: String,
        payer: String,
        amount: Option<u64>,
        mint: Option<String>,
        recipient: Option<String>,
        blockhash: Option<String>,
        memo: Option<String>,
    },
    /// A payment the payer already broadcast on their own; verified by
    /// looking the signature up on the ledger.
    AuthorizationOnly {
        signature: String,
        payer: String,
        recipient: String,
        amount: u64,
        memo: Option<String>,
    },
}

impl NormalizedPayment {
    /// Wire name of the tag, for logs and receipts.
    pub fn tag(&self) -> &'static str {
        match self {
            NormalizedPayment::FacilitatorSponsored { .. } => "facilitatorSponsored",
            NormalizedPayment::Minimal { .. } => "minimal",
            NormalizedPayment::Full { .. } => "full",
            NormalizedPayment::AuthorizationOnly { .. } => "authorizationOnly",
        }
    }

    /// The signature the client claims identifies this payment.
    pub fn claimed_signature(&self) -> &str {
        match self {
            NormalizedPayment::FacilitatorSponsored { user_signature, .. } => user_signature,
            NormalizedPayment::Minimal { signature, .. }
            | NormalizedPayment::Full { signature, .. }
            | NormalizedPayment::AuthorizationOnly { signature, .. } => signature,
        }
    }

    /// Whether the facilitator covers network fees for this payment.
    pub fn is_sponsored(&self) -> bool {
        matches!(self, NormalizedPayment::FacilitatorSponsored { .. })
    }

    /// The encoded transaction still awaiting broadcast, when the payload
    /// carries one.
    pub fn embedded_transaction(&self) -> Option<&str> {
        match self {
            NormalizedPayment::FacilitatorSponsored {
                facilitator_transaction,
                ..
            } => Some(facilitator_transaction),
            NormalizedPayment::Minimal { transaction, .. }
            | NormalizedPayment::Full { transaction, .. } => Some(transaction),
            NormalizedPayment::AuthorizationOnly { .. } => None,
        }
    }

    /// Payer address reported in responses: the facilitator's own address
    /// for sponsored payments, the extracted payer field otherwise.
    pub fn resolved_payer(&self, facilitator_address: &str) -> String {
        match self {
            NormalizedPayment::FacilitatorSponsored { .. } => facilitator_address.to_string(),
            NormalizedPayment::Minimal { .. } => "unknown".to_string(),
            NormalizedPayment::Full { payer, .. }
            | NormalizedPayment::AuthorizationOnly { payer, .. } => payer.clone(),
        }
    }
}

fn str_field(doc: &Map<String, Value>, key: &str) -> Option<String> {
    doc.get(key).and_then(Value::as_str).map(str::to_string)
}

fn amount_field(doc: &Map<String, Value>, key: &str) -> Option<u64> {
    match doc.get(key)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Classify a raw payment payload document into its canonical form.
///
/// Pure and deterministic: field presence is inspected in a fixed priority
/// order (facilitatorSponsored, minimal, full, authorizationOnly) and the
/// first shape whose fields are all present wins. `minimal` additionally
/// requires the absence of `payer` so a fully-described payload is not
/// swallowed by the smaller shape. A payload matching nothing fails with a
/// message listing the fields that were present; callers debug against
/// that message, so its wording is load-bearing.
pub fn normalize(raw: &Value) -> Result<NormalizedPayment, X402Error> {
    let doc = raw.as_object().ok_or_else(|| {
        X402Error::InvalidFormat("Unrecognized payload format. Payload is not a JSON object".into())
    })?;

    if let (Some(user_signature), Some(facilitator_transaction), Some(user_public_key)) = (
        str_field(doc, "userSignature"),
        str_field(doc, "facilitatorTransaction"),
        str_field(doc, "userPublicKey"),
    ) {
        return Ok(NormalizedPayment::FacilitatorSponsored {
            user_signature,
            facilitator_transaction,
            user_public_key,
        });
    }

    if let (Some(signature), Some(transaction)) = (
        str_field(doc, "signature"),
        str_field(doc, "transaction"),
    ) {
        if !doc.contains_key("payer") {
            return Ok(NormalizedPayment::Minimal {
                signature,
                transaction,
            });
        }
        if let Some(payer) = str_field(doc, "payer") {
            return Ok(NormalizedPayment::Full {
                signature,
                transaction,
                payer,
                amount: amount_field(doc, "amount"),
                mint: str_field(doc, "mint"),
                recipient: str_field(doc, "recipient"),
                blockhash: str_field(doc, "blockhash"),
                memo: str_field(doc, "memo"),
            });
        }
    }

    if !doc.contains_key("transaction") {
        if let (Some(signature), Some(payer), Some(recipient), Some(amount)) = (
            str_field(doc, "signature"),
            str_field(doc, "payer"),
            str_field(doc, "recipient"),
            amount_field(doc, "amount"),
        ) {
            return Ok(NormalizedPayment::AuthorizationOnly {
                signature,
                payer,
                recipient,
                amount,
                memo: str_field(doc, "memo"),
            });
        }
    }

    let fields: Vec<&str> = doc.keys().map(String::as_str).collect();
    let listing = if fields.is_empty() {
        "(none)".to_string()
    } else {
        fields.join(", ")
    };
    Err(X402Error::InvalidFormat(format!(
        "Unrecognized payload format. Available fields: {listing}"
    )))
}
