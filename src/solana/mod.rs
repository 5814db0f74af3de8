pub mod client;
pub mod connection;
pub mod rpc_helpers;
pub mod wallet;

pub use client::SolanaClient;
pub use connection::{
    AccountFilter, ChainConnection, InstructionRecord, SignatureInfo, TokenAccount, TransactionRecord,
};
pub use rpc_helpers::{associated_token_address, parse_pubkey, parse_seed};
pub use wallet::Wallet;

use crate::config::Config;
use anyhow::{Context, Result};

/// Create a Solana client from the application configuration
pub fn create_client_from_config(config: &Config) -> SolanaClient {
    SolanaClient::new(&config.rpc_url)
}

/// Load the signing wallet named by the application configuration
pub fn load_wallet_from_config(config: &Config) -> Result<Wallet> {
    Wallet::from_file(&config.keypair_path)
        .with_context(|| format!("Failed to load wallet from {}", config.keypair_path))
}
