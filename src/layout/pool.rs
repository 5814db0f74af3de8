use solana_sdk::pubkey::Pubkey;
use std::num::NonZeroU8;

use super::{ensure_len, read_array, read_pubkey, read_u16, read_u64, Layout, PUBKEY_LEN};
use crate::error::DecodingError;
use crate::models::{PoolAsset, PoolHeader, PoolStatus};

const SERUM_PROGRAM_ID_OFFSET: usize = 0;
const SEED_OFFSET: usize = 32;
pub const SIGNAL_PROVIDER_OFFSET: usize = 64;
const STATUS_OFFSET: usize = 96;
const NUMBER_OF_MARKETS_OFFSET: usize = 98;
const FEE_RATIO_OFFSET: usize = 100;
const LAST_FEE_COLLECTION_OFFSET: usize = 102;
const FEE_COLLECTION_PERIOD_OFFSET: usize = 110;

pub const POOL_HEADER_LEN: usize = 118;
pub const POOL_ASSET_LEN: usize = PUBKEY_LEN + 8;

impl Layout for PoolStatus {
    const LEN: usize = 2;

    fn decode(data: &[u8]) -> Result<Self, DecodingError> {
        let [tag, pending] = read_array::<2>("pool status", data, 0)?;
        let pending_orders = || {
            NonZeroU8::new(pending).ok_or(DecodingError::InvalidValue {
                field: "pending order count",
                value: 0,
            })
        };
        Ok(match tag {
            0 => PoolStatus::Uninitialized,
            1 => PoolStatus::Unlocked,
            2 => PoolStatus::Locked,
            3 => PoolStatus::PendingOrder(pending_orders()?),
            4 => PoolStatus::LockedPendingOrder(pending_orders()?),
            _ => {
                return Err(DecodingError::InvalidValue {
                    field: "pool status",
                    value: tag as u64,
                })
            }
        })
    }
}

impl Layout for PoolHeader {
    const LEN: usize = POOL_HEADER_LEN;

    fn decode(data: &[u8]) -> Result<Self, DecodingError> {
        ensure_len("pool header", data, Self::LEN)?;
        Ok(PoolHeader {
            serum_program_id: read_pubkey("pool header", data, SERUM_PROGRAM_ID_OFFSET)?,
            seed: read_array("pool header", data, SEED_OFFSET)?,
            signal_provider: read_pubkey("pool header", data, SIGNAL_PROVIDER_OFFSET)?,
            status: PoolStatus::decode(&data[STATUS_OFFSET..])?,
            number_of_markets: read_u16("pool header", data, NUMBER_OF_MARKETS_OFFSET)?,
            fee_ratio: read_u16("pool header", data, FEE_RATIO_OFFSET)?,
            last_fee_collection_timestamp: read_u64("pool header", data, LAST_FEE_COLLECTION_OFFSET)?,
            fee_collection_period: read_u64("pool header", data, FEE_COLLECTION_PERIOD_OFFSET)?,
        })
    }
}

impl Layout for PoolAsset {
    const LEN: usize = POOL_ASSET_LEN;

    fn decode(data: &[u8]) -> Result<Self, DecodingError> {
        ensure_len("pool asset", data, Self::LEN)?;
        Ok(PoolAsset {
            mint: read_pubkey("pool asset", data, 0)?,
            amount: read_u64("pool asset", data, PUBKEY_LEN)?,
        })
    }
}

/// Read `count` market addresses packed back to back
pub fn decode_markets(data: &[u8], count: usize) -> Result<Vec<Pubkey>, DecodingError> {
    ensure_len("market list", data, count * PUBKEY_LEN)?;
    (0..count)
        .map(|i| read_pubkey("market list", data, i * PUBKEY_LEN))
        .collect()
}

/// Read `count` asset records packed back to back
pub fn decode_assets(data: &[u8], count: usize) -> Result<Vec<PoolAsset>, DecodingError> {
    ensure_len("asset list", data, count * POOL_ASSET_LEN)?;
    data.chunks_exact(POOL_ASSET_LEN)
        .take(count)
        .map(PoolAsset::decode)
        .collect()
}

/// Split a whole pool account into header, markets and assets.
///
/// The market count in the header decides where the asset records start. Asset
/// slots are allocated up front, so the list stops at the first empty mint.
pub fn decode_pool(data: &[u8]) -> Result<(PoolHeader, Vec<Pubkey>, Vec<PoolAsset>), DecodingError> {
    let header = PoolHeader::decode(data)?;
    let markets_len = header.number_of_markets as usize * PUBKEY_LEN;
    let markets = decode_markets(&data[POOL_HEADER_LEN..], header.number_of_markets as usize)?;

    let asset_bytes = &data[POOL_HEADER_LEN + markets_len..];
    let slots = asset_bytes.len() / POOL_ASSET_LEN;
    let assets = decode_assets(asset_bytes, slots)?
        .into_iter()
        .take_while(|asset| asset.mint != Pubkey::default())
        .collect();

    Ok((header, markets, assets))
}
