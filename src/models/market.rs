use serde::{Deserialize, Serialize};
use serum_dex::state::gen_vault_signer_key;
use solana_sdk::pubkey::Pubkey;

use crate::error::{DecodingError, Result};

/// The subset of a Serum v3 market account needed to settle and trade
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketState {
    pub address: Pubkey,
    pub program_id: Pubkey,
    pub account_flags: u64,
    pub vault_signer_nonce: u64,
    pub coin_mint: Pubkey,
    pub pc_mint: Pubkey,
    pub coin_vault: Pubkey,
    pub pc_vault: Pubkey,
    pub request_queue: Pubkey,
    pub event_queue: Pubkey,
    pub bids: Pubkey,
    pub asks: Pubkey,
    pub coin_lot_size: u64,
    pub pc_lot_size: u64,
    pub fee_rate_bps: u64,
}

impl MarketState {
    /// Authority over the market vaults
    pub fn vault_signer(&self) -> Result<Pubkey> {
        gen_vault_signer_key(self.vault_signer_nonce, &self.address, &self.program_id).map_err(|_| {
            DecodingError::InvalidValue {
                field: "vault signer nonce",
                value: self.vault_signer_nonce,
            }
            .into()
        })
    }
}

/// A Serum open-orders account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenOrders {
    pub address: Pubkey,
    pub market: Pubkey,
    pub owner: Pubkey,
    pub native_coin_free: u64,
    pub native_coin_total: u64,
    pub native_pc_free: u64,
    pub native_pc_total: u64,
}

impl OpenOrders {
    /// Matched proceeds or locked funds still sitting in the market
    pub fn has_unsettled_funds(&self) -> bool {
        self.native_coin_total > 0 || self.native_pc_total > 0
    }
}
