use chrono::{DateTime, Utc};
use solana_sdk::pubkey::Pubkey;
use std::num::{NonZeroU16, NonZeroU64};

use crate::error::DecodingError;

pub use serum_dex::instruction::SelfTradeBehavior;
pub use serum_dex::matching::{OrderType, Side};

/// One-byte wire form of the Serum order enums inside pool instructions
pub trait WireByte: Sized {
    fn from_byte(value: u8) -> Result<Self, DecodingError>;

    fn to_byte(self) -> u8;
}

impl WireByte for Side {
    fn from_byte(value: u8) -> Result<Self, DecodingError> {
        match value {
            0 => Ok(Side::Bid),
            1 => Ok(Side::Ask),
            _ => Err(DecodingError::InvalidValue {
                field: "side",
                value: value as u64,
            }),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            Side::Bid => 0,
            Side::Ask => 1,
        }
    }
}

impl WireByte for OrderType {
    fn from_byte(value: u8) -> Result<Self, DecodingError> {
        match value {
            0 => Ok(OrderType::Limit),
            1 => Ok(OrderType::ImmediateOrCancel),
            2 => Ok(OrderType::PostOnly),
            _ => Err(DecodingError::InvalidValue {
                field: "order type",
                value: value as u64,
            }),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            OrderType::Limit => 0,
            OrderType::ImmediateOrCancel => 1,
            OrderType::PostOnly => 2,
        }
    }
}

/// The pool program only forwards the first two behaviors.
impl WireByte for SelfTradeBehavior {
    fn from_byte(value: u8) -> Result<Self, DecodingError> {
        match value {
            0 => Ok(SelfTradeBehavior::DecrementTake),
            1 => Ok(SelfTradeBehavior::CancelProvide),
            _ => Err(DecodingError::InvalidValue {
                field: "self trade behavior",
                value: value as u64,
            }),
        }
    }

    fn to_byte(self) -> u8 {
        match self {
            SelfTradeBehavior::DecrementTake => 0,
            SelfTradeBehavior::CancelProvide => 1,
            SelfTradeBehavior::AbortTransaction => 2,
        }
    }
}

/// A create-order instruction recovered from a pool's transaction history
#[derive(Debug, Clone, PartialEq)]
pub struct PoolOrderInfo {
    pub pool_seed: [u8; 32],
    pub side: Side,
    pub limit_price: NonZeroU64,
    /// Share of the source asset to trade, out of `u16::MAX`
    pub ratio_of_pool_assets_to_trade: NonZeroU16,
    pub order_type: OrderType,
    pub client_id: u64,
    pub self_trade_behavior: SelfTradeBehavior,
    pub source_index: u64,
    pub target_index: u64,
    pub market_index: u16,
    pub coin_lot_size: u64,
    pub pc_lot_size: u64,
    pub target_mint: Pubkey,
    pub market: Pubkey,
    pub transaction_signature: String,
    pub slot: u64,
    pub block_time: Option<DateTime<Utc>>,
}
