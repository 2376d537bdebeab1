use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;

use x402_types::X402Error;

/// Process-lifetime signing identity.
///
/// Used as the fee payer for sponsored transactions and reported in the
/// `/supported` and `/health` responses. Created once at startup (from a
/// configured secret when available, ephemeral otherwise) and never rotated
/// while the process runs.
pub struct FacilitatorIdentity {
    keypair: Keypair,
}

impl FacilitatorIdentity {
    /// Load the identity from a base58-encoded 64-byte secret key.
    pub fn from_base58(secret: &str) -> Result<Self, X402Error> {
        let bytes = bs58::decode(secret.trim())
            .into_vec()
            .map_err(|e| X402Error::Config(format!("facilitator secret key is not base58: {e}")))?;
        let keypair = Keypair::from_bytes(&bytes)
            .map_err(|e| X402Error::Config(format!("facilitator secret key is invalid: {e}")))?;
        Ok(Self { keypair })
    }

    /// Generate a fresh identity. Sponsored transactions signed by an
    /// ephemeral identity become unverifiable after a restart.
    pub fn ephemeral() -> Self {
        Self {
            keypair: Keypair::new(),
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for FacilitatorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacilitatorIdentity")
            .field("pubkey", &self.pubkey())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_base58_round_trip() {
        let original = Keypair::new();
        let encoded = bs58::encode(original.to_bytes()).into_string();
        let identity = FacilitatorIdentity::from_base58(&encoded).unwrap();
        assert_eq!(identity.pubkey(), original.pubkey());
    }

    #[test]
    fn test_from_base58_rejects_garbage() {
        let err = FacilitatorIdentity::from_base58("not-a-key").unwrap_err();
        assert!(matches!(err, X402Error::Config(_)));
    }

    #[test]
    fn test_ephemeral_identities_are_distinct() {
        assert_ne!(
            FacilitatorIdentity::ephemeral().pubkey(),
            FacilitatorIdentity::ephemeral().pubkey()
        );
    }
}
