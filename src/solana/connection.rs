use async_trait::async_trait;
use futures::future::try_join_all;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::error::Result;
use crate::solana::wallet::Wallet;

/// An SPL token account as seen on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenAccount {
    pub address: Pubkey,
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

/// One entry of an address's confirmed signature list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureInfo {
    pub signature: Signature,
    pub slot: u64,
    pub failed: bool,
}

/// A top-level instruction of a confirmed transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionRecord {
    pub program_id: Pubkey,
    pub data: Vec<u8>,
}

/// A confirmed transaction reduced to what history scans need
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub signature: Signature,
    pub slot: u64,
    pub block_time: Option<i64>,
    pub failed: bool,
    pub instructions: Vec<InstructionRecord>,
}

/// Server-side filter for program account scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    Memcmp { offset: usize, bytes: Vec<u8> },
    DataSize(u64),
}

/// Everything the pool workflows need from a Solana node
#[async_trait]
pub trait ChainConnection: Send + Sync {
    /// Raw data of an account, `None` if it does not exist
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>>;

    async fn get_token_account(&self, address: &Pubkey) -> Result<Option<TokenAccount>>;

    /// Total supply of a mint
    async fn get_token_supply(&self, mint: &Pubkey) -> Result<u64>;

    /// Most recent signatures first, at most `limit`
    async fn get_signatures_for_address(&self, address: &Pubkey, limit: usize) -> Result<Vec<SignatureInfo>>;

    async fn get_transaction(&self, signature: &Signature) -> Result<TransactionRecord>;

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>>;

    /// Sign with `wallet` as fee payer, send and wait for confirmation
    async fn send_instructions(&self, wallet: &Wallet, instructions: &[Instruction]) -> Result<Signature>;

    /// Existence of each address, in input order
    async fn accounts_exist(&self, addresses: &[Pubkey]) -> Result<Vec<bool>> {
        let accounts = try_join_all(addresses.iter().map(|a| self.get_account_data(a))).await?;
        Ok(accounts.iter().map(Option::is_some).collect())
    }
}
