use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use solana_sdk::transaction::Transaction;

use x402_types::X402Error;

/// Encode a transaction for transport. Works on partially signed
/// transactions; missing signatures stay as zeroed placeholders.
pub fn encode_transaction(transaction: &Transaction) -> Result<String, X402Error> {
    let bytes = bincode::serialize(transaction)
        .map_err(|e| X402Error::Validation(format!("transaction encoding failed: {e}")))?;
    Ok(BASE64.encode(bytes))
}

/// Decode a base64-encoded transaction received from a client.
pub fn decode_transaction(encoded: &str) -> Result<Transaction, X402Error> {
    let bytes = BASE64
        .decode(encoded.trim())
        .map_err(|e| X402Error::Validation(format!("transaction is not valid base64: {e}")))?;
    bincode::deserialize(&bytes)
        .map_err(|e| X402Error::Validation(format!("transaction bytes are malformed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;
    use solana_sdk::system_instruction;

    #[test]
    fn test_round_trip_preserves_message() {
        let payer = Pubkey::new_unique();
        let recipient = Pubkey::new_unique();
        let ix = system_instruction::transfer(&payer, &recipient, 1);
        let tx = Transaction::new_with_payer(&[ix], Some(&payer));

        let encoded = encode_transaction(&tx).unwrap();
        let decoded = decode_transaction(&encoded).unwrap();
        assert_eq!(decoded.message, tx.message);
        assert_eq!(decoded.signatures, tx.signatures);
    }

    #[test]
    fn test_decode_rejects_non_base64() {
        let err = decode_transaction("%%definitely not base64%%").unwrap_err();
        assert!(matches!(err, X402Error::Validation(_)));
    }

    #[test]
    fn test_decode_rejects_arbitrary_bytes() {
        let encoded = BASE64.encode(b"not a transaction");
        assert!(decode_transaction(&encoded).is_err());
    }
}
