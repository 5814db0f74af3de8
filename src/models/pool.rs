use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::num::NonZeroU8;

/// Lock state of a pool as stored in its header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoolStatus {
    Uninitialized,
    Unlocked,
    Locked,
    /// Unlocked, with this many orders waiting to be settled
    PendingOrder(NonZeroU8),
    LockedPendingOrder(NonZeroU8),
}

/// Fixed-size prefix of a pool account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolHeader {
    pub serum_program_id: Pubkey,
    pub seed: [u8; 32],
    pub signal_provider: Pubkey,
    pub status: PoolStatus,
    pub number_of_markets: u16,
    pub fee_ratio: u16,
    pub last_fee_collection_timestamp: u64,
    pub fee_collection_period: u64,
}

/// One token held by the pool, in account byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAsset {
    pub mint: Pubkey,
    pub amount: u64,
}

/// Everything known about a pool from a single account read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub address: Pubkey,
    pub mint_key: Pubkey,
    pub header: PoolHeader,
    pub authorized_markets: Vec<Pubkey>,
    pub assets: Vec<PoolAsset>,
}

impl PoolInfo {
    pub fn seed(&self) -> [u8; 32] {
        self.header.seed
    }

    pub fn asset_mints(&self) -> Vec<Pubkey> {
        self.assets.iter().map(|a| a.mint).collect()
    }

    /// Position of `mint` in the asset list, as referenced by on-chain indices
    pub fn asset_index(&self, mint: &Pubkey) -> Option<usize> {
        self.assets.iter().position(|a| &a.mint == mint)
    }

    pub fn market_at(&self, index: u16) -> Option<Pubkey> {
        self.authorized_markets.get(index as usize).copied()
    }
}

/// Live token amount held by the pool for one asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolAssetBalance {
    pub mint: Pubkey,
    pub amount: u64,
}
