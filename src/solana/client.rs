use async_trait::async_trait;
use log::{debug, warn};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_program::program_pack::Pack;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_transaction_status::UiTransactionEncoding;
use std::str::FromStr;

use crate::error::{DecodingError, PoolError, Result};
use crate::solana::connection::{
    AccountFilter, ChainConnection, InstructionRecord, SignatureInfo, TokenAccount, TransactionRecord,
};
use crate::solana::rpc_helpers::program_accounts_config;
use crate::solana::wallet::Wallet;

/// `ChainConnection` backed by a Solana JSON-RPC node
pub struct SolanaClient {
    rpc_client: RpcClient,
    commitment: CommitmentConfig,
}

impl SolanaClient {
    /// Create a new Solana client with the given RPC URL
    pub fn new(rpc_url: &str) -> Self {
        Self::new_with_commitment(rpc_url, CommitmentConfig::confirmed())
    }

    pub fn new_with_commitment(rpc_url: &str, commitment: CommitmentConfig) -> Self {
        let rpc_client = RpcClient::new_with_commitment(rpc_url.to_string(), commitment);
        Self { rpc_client, commitment }
    }

    /// Get the current Solana slot
    pub async fn get_slot(&self) -> Result<u64> {
        debug!("Getting current slot");
        Ok(self.rpc_client.get_slot().await?)
    }

    pub fn rpc_client(&self) -> &RpcClient {
        &self.rpc_client
    }
}

#[async_trait]
impl ChainConnection for SolanaClient {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        debug!("Fetching account {}", address);
        let response = self
            .rpc_client
            .get_account_with_commitment(address, self.commitment)
            .await?;
        Ok(response.value.map(|account| account.data))
    }

    async fn get_token_account(&self, address: &Pubkey) -> Result<Option<TokenAccount>> {
        let Some(data) = self.get_account_data(address).await? else {
            return Ok(None);
        };
        let account = spl_token::state::Account::unpack(&data).map_err(|_| DecodingError::InvalidAccount {
            what: "token account",
            address: *address,
        })?;
        Ok(Some(TokenAccount {
            address: *address,
            mint: account.mint,
            owner: account.owner,
            amount: account.amount,
        }))
    }

    async fn get_token_supply(&self, mint: &Pubkey) -> Result<u64> {
        let data = self
            .get_account_data(mint)
            .await?
            .ok_or(PoolError::AccountUnavailable(*mint))?;
        let mint_state = spl_token::state::Mint::unpack(&data).map_err(|_| DecodingError::InvalidAccount {
            what: "mint",
            address: *mint,
        })?;
        Ok(mint_state.supply)
    }

    async fn get_signatures_for_address(&self, address: &Pubkey, limit: usize) -> Result<Vec<SignatureInfo>> {
        let config = GetConfirmedSignaturesForAddress2Config {
            before: None,
            until: None,
            limit: Some(limit),
            commitment: Some(self.commitment),
        };
        let statuses = self
            .rpc_client
            .get_signatures_for_address_with_config(address, config)
            .await?;
        debug!("Found {} signatures for {}", statuses.len(), address);

        Ok(statuses
            .into_iter()
            .filter_map(|status| match Signature::from_str(&status.signature) {
                Ok(signature) => Some(SignatureInfo {
                    signature,
                    slot: status.slot,
                    failed: status.err.is_some(),
                }),
                Err(e) => {
                    warn!("Skipping malformed signature {}: {}", status.signature, e);
                    None
                }
            })
            .collect())
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<TransactionRecord> {
        let config = RpcTransactionConfig {
            encoding: Some(UiTransactionEncoding::Base64),
            commitment: Some(self.commitment),
            max_supported_transaction_version: Some(0),
        };
        let confirmed = self
            .rpc_client
            .get_transaction_with_config(signature, config)
            .await?;

        let failed = confirmed
            .transaction
            .meta
            .as_ref()
            .map(|meta| meta.err.is_some())
            .unwrap_or(false);

        // Program ids are always static keys, lookup tables only hold instruction accounts
        let instructions = match confirmed.transaction.transaction.decode() {
            Some(transaction) => {
                let keys = transaction.message.static_account_keys();
                transaction
                    .message
                    .instructions()
                    .iter()
                    .filter_map(|ix| {
                        keys.get(ix.program_id_index as usize).map(|program_id| InstructionRecord {
                            program_id: *program_id,
                            data: ix.data.clone(),
                        })
                    })
                    .collect()
            }
            None => {
                warn!("Could not decode transaction {}", signature);
                Vec::new()
            }
        };

        Ok(TransactionRecord {
            signature: *signature,
            slot: confirmed.slot,
            block_time: confirmed.block_time,
            failed,
            instructions,
        })
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        let config = program_accounts_config(filters, self.commitment);
        let accounts = self
            .rpc_client
            .get_program_accounts_with_config(program_id, config)
            .await?;
        debug!("Found {} accounts for program {}", accounts.len(), program_id);

        Ok(accounts
            .into_iter()
            .map(|(address, account)| (address, account.data))
            .collect())
    }

    async fn send_instructions(&self, wallet: &Wallet, instructions: &[Instruction]) -> Result<Signature> {
        let blockhash = self.rpc_client.get_latest_blockhash().await?;
        let transaction = wallet.create_and_sign_transaction(instructions, blockhash, None)?;
        let signature = self
            .rpc_client
            .send_and_confirm_transaction(&transaction)
            .await?;
        debug!("Confirmed transaction {} ({} instructions)", signature, instructions.len());
        Ok(signature)
    }
}
