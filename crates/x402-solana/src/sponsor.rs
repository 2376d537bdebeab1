use std::str::FromStr;

use solana_client::nonblocking::rpc_client::RpcClient;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;

use x402_types::{PaymentRequirements, X402Error};

use crate::encoding::encode_transaction;
use crate::identity::FacilitatorIdentity;

/// Assembles a transaction whose fees are paid by someone other than the
/// transfer authority.
///
/// Required signers (derived from the compiled message header) are tracked
/// separately from collected signatures; [`sign`](Self::sign) is the only
/// way to add one, and [`build`](Self::build) places each collected
/// signature in its message slot, leaving zeroed placeholders for signers
/// who have not signed yet. This keeps the signature list and the message
/// header consistent by construction instead of by ad hoc array edits.
#[derive(Debug, Clone)]
pub struct SponsoredTransactionBuilder {
    message: Message,
    required_signers: Vec<Pubkey>,
    collected: Vec<(Pubkey, Signature)>,
}

impl SponsoredTransactionBuilder {
    /// Compile the instructions into a message with `fee_payer` in the
    /// fee-paying slot and derive the required-signer set from its header.
    pub fn new(instructions: &[Instruction], fee_payer: &Pubkey, recent_blockhash: Hash) -> Self {
        let message = Message::new_with_blockhash(instructions, Some(fee_payer), &recent_blockhash);
        let signer_count = message.header.num_required_signatures as usize;
        let required_signers = message.account_keys[..signer_count].to_vec();
        Self {
            message,
            required_signers,
            collected: Vec::new(),
        }
    }

    pub fn required_signers(&self) -> &[Pubkey] {
        &self.required_signers
    }

    /// Required signers that have not produced a signature yet.
    pub fn missing_signers(&self) -> Vec<Pubkey> {
        self.required_signers
            .iter()
            .filter(|key| !self.collected.iter().any(|(signed, _)| signed == *key))
            .copied()
            .collect()
    }

    /// Collect a signature over the compiled message. Rejects keypairs that
    /// are not required signers; signing twice replaces the earlier
    /// signature.
    pub fn sign(&mut self, keypair: &Keypair) -> Result<(), X402Error> {
        let pubkey = keypair.pubkey();
        if !self.required_signers.contains(&pubkey) {
            return Err(X402Error::Validation(format!(
                "{pubkey} is not a required signer of this transaction"
            )));
        }
        let signature = keypair.sign_message(&self.message.serialize());
        self.collected.retain(|(signed, _)| *signed != pubkey);
        self.collected.push((pubkey, signature));
        Ok(())
    }

    /// Assemble the transaction. Collected signatures land in their message
    /// slots; slots for missing signers keep the default placeholder, so
    /// the result encodes without requiring all signatures.
    pub fn build(&self) -> Transaction {
        let mut transaction = Transaction::new_unsigned(self.message.clone());
        for (pubkey, signature) in &self.collected {
            if let Some(slot) = self.required_signers.iter().position(|key| key == pubkey) {
                transaction.signatures[slot] = *signature;
            }
        }
        transaction
    }
}

/// A constructed, partially signed sponsored transfer awaiting the payer's
/// authorization signature.
#[derive(Debug, Clone)]
pub struct SponsoredTransaction {
    /// Base64-encoded transaction; not yet broadcastable.
    pub transaction: String,
    pub blockhash: String,
    pub fee_payer: Pubkey,
    /// Signers still owed a signature (the payer, for a standard transfer).
    pub pending_signers: Vec<Pubkey>,
}

/// Construct a token transfer moving `maxAmountRequired` units from the
/// payer's associated token account to the recipient's, with the payer as
/// transfer authority and the facilitator as fee payer. The facilitator's
/// fee-paying signature is attached; the payer's slot stays open for the
/// client-side signing round trip.
pub async fn build_sponsored_transfer(
    client: &RpcClient,
    identity: &FacilitatorIdentity,
    user_public_key: &str,
    requirements: &PaymentRequirements,
) -> Result<SponsoredTransaction, X402Error> {
    let user = Pubkey::from_str(user_public_key)
        .map_err(|e| X402Error::Validation(format!("malformed user public key: {e}")))?;
    let mint = Pubkey::from_str(&requirements.asset)
        .map_err(|e| X402Error::Validation(format!("malformed asset mint: {e}")))?;
    let recipient = Pubkey::from_str(&requirements.pay_to)
        .map_err(|e| X402Error::Validation(format!("malformed payTo address: {e}")))?;
    let amount: u64 = requirements
        .max_amount_required
        .parse()
        .map_err(|e| X402Error::Validation(format!("invalid maxAmountRequired: {e}")))?;

    let blockhash = client
        .get_latest_blockhash()
        .await
        .map_err(|e| X402Error::Rpc(format!("failed to fetch recent blockhash: {e}")))?;

    let source = get_associated_token_address(&user, &mint);
    let destination = get_associated_token_address(&recipient, &mint);

    // transfer_checked would need the mint's decimals, which requirements
    // don't carry.
    #[allow(deprecated)]
    let transfer_ix = spl_token::instruction::transfer(
        &spl_token::id(),
        &source,
        &destination,
        &user,
        &[],
        amount,
    )
    .map_err(|e| X402Error::Validation(format!("transfer instruction rejected: {e}")))?;

    let fee_payer = identity.pubkey();
    let mut builder = SponsoredTransactionBuilder::new(&[transfer_ix], &fee_payer, blockhash);
    builder.sign(identity.keypair())?;
    let transaction = builder.build();

    tracing::debug!(
        user = %user,
        mint = %mint,
        amount,
        "sponsored transfer constructed"
    );

    Ok(SponsoredTransaction {
        transaction: encode_transaction(&transaction)?,
        blockhash: blockhash.to_string(),
        fee_payer,
        pending_signers: builder.missing_signers(),
    })
}
