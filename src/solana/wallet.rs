use anyhow::Context;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signer::keypair::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{PoolError, Result};

/// Signing key of the user driving the workflows
pub struct Wallet {
    keypair: Keypair,
}

impl Wallet {
    pub fn from_keypair(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Load a wallet from a keypair file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let mut file = File::open(&path)
            .with_context(|| format!("Failed to open keypair file at {:?}", path.as_ref()))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .with_context(|| format!("Failed to read keypair file at {:?}", path.as_ref()))?;

        // JSON byte array, as written by solana-keygen
        if let Ok(keypair_bytes) = serde_json::from_slice::<Vec<u8>>(&bytes) {
            if keypair_bytes.len() == 64 {
                return Ok(Self { keypair: Keypair::from_bytes(&keypair_bytes)? });
            }
        }

        // Base58 string
        let bytes_str = String::from_utf8_lossy(&bytes).trim().to_string();
        if let Ok(keypair_bytes) = bs58::decode(&bytes_str).into_vec() {
            if keypair_bytes.len() == 64 {
                return Ok(Self { keypair: Keypair::from_bytes(&keypair_bytes)? });
            }
        }

        Err(anyhow::anyhow!("Failed to parse keypair file"))
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Create and sign a transaction in one step
    pub fn create_and_sign_transaction(
        &self,
        instructions: &[Instruction],
        recent_blockhash: Hash,
        fee_payer: Option<Pubkey>,
    ) -> Result<Transaction> {
        let fee_payer = fee_payer.unwrap_or_else(|| self.pubkey());
        let message = Message::new_with_blockhash(instructions, Some(&fee_payer), &recent_blockhash);

        let mut transaction = Transaction::new_unsigned(message);
        transaction
            .try_sign(&[&self.keypair], recent_blockhash)
            .map_err(|e| PoolError::Signing(e.to_string()))?;
        Ok(transaction)
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl AsRef<Keypair> for Wallet {
    fn as_ref(&self) -> &Keypair {
        &self.keypair
    }
}
