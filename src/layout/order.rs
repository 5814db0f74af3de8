use solana_sdk::pubkey::Pubkey;
use std::num::{NonZeroU16, NonZeroU64};

use super::{ensure_len, read_array, read_pubkey, read_u16, read_u64, read_u8, Layout};
use crate::error::DecodingError;
use crate::models::{OrderType, SelfTradeBehavior, Side, WireByte};

pub const CREATE_ORDER_OPCODE: u8 = 3;
pub const CREATE_ORDER_LEN: usize = 120;

const SEED_OFFSET: usize = 1;
const SIDE_OFFSET: usize = 33;
const LIMIT_PRICE_OFFSET: usize = 34;
const RATIO_OFFSET: usize = 42;
const ORDER_TYPE_OFFSET: usize = 44;
const CLIENT_ID_OFFSET: usize = 45;
const SELF_TRADE_OFFSET: usize = 53;
const SOURCE_INDEX_OFFSET: usize = 54;
const TARGET_INDEX_OFFSET: usize = 62;
const MARKET_INDEX_OFFSET: usize = 70;
const COIN_LOT_SIZE_OFFSET: usize = 72;
const PC_LOT_SIZE_OFFSET: usize = 80;
const TARGET_MINT_OFFSET: usize = 88;

/// Payload of the pool program's create-order instruction, opcode included
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOrderPayload {
    pub pool_seed: [u8; 32],
    pub side: Side,
    pub limit_price: NonZeroU64,
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
}

impl Layout for CreateOrderPayload {
    const LEN: usize = CREATE_ORDER_LEN;

    fn decode(data: &[u8]) -> Result<Self, DecodingError> {
        const WHAT: &str = "create order instruction";
        ensure_len(WHAT, data, Self::LEN)?;

        let opcode = read_u8(WHAT, data, 0)?;
        if opcode != CREATE_ORDER_OPCODE {
            return Err(DecodingError::UnknownOpcode(opcode));
        }

        let limit_price = read_u64(WHAT, data, LIMIT_PRICE_OFFSET)?;
        let ratio = read_u16(WHAT, data, RATIO_OFFSET)?;

        Ok(CreateOrderPayload {
            pool_seed: read_array(WHAT, data, SEED_OFFSET)?,
            side: Side::from_byte(read_u8(WHAT, data, SIDE_OFFSET)?)?,
            limit_price: NonZeroU64::new(limit_price).ok_or(DecodingError::InvalidValue {
                field: "limit price",
                value: 0,
            })?,
            ratio_of_pool_assets_to_trade: NonZeroU16::new(ratio).ok_or(DecodingError::InvalidValue {
                field: "ratio of pool assets to trade",
                value: 0,
            })?,
            order_type: OrderType::from_byte(read_u8(WHAT, data, ORDER_TYPE_OFFSET)?)?,
            client_id: read_u64(WHAT, data, CLIENT_ID_OFFSET)?,
            self_trade_behavior: SelfTradeBehavior::from_byte(read_u8(WHAT, data, SELF_TRADE_OFFSET)?)?,
            source_index: read_u64(WHAT, data, SOURCE_INDEX_OFFSET)?,
            target_index: read_u64(WHAT, data, TARGET_INDEX_OFFSET)?,
            market_index: read_u16(WHAT, data, MARKET_INDEX_OFFSET)?,
            coin_lot_size: read_u64(WHAT, data, COIN_LOT_SIZE_OFFSET)?,
            pc_lot_size: read_u64(WHAT, data, PC_LOT_SIZE_OFFSET)?,
            target_mint: read_pubkey(WHAT, data, TARGET_MINT_OFFSET)?,
        })
    }
}

impl CreateOrderPayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(CREATE_ORDER_LEN);
        buf.push(CREATE_ORDER_OPCODE);
        buf.extend_from_slice(&self.pool_seed);
        buf.push(self.side.to_byte());
        buf.extend_from_slice(&self.limit_price.get().to_le_bytes());
        buf.extend_from_slice(&self.ratio_of_pool_assets_to_trade.get().to_le_bytes());
        buf.push(self.order_type.to_byte());
        buf.extend_from_slice(&self.client_id.to_le_bytes());
        buf.push(self.self_trade_behavior.to_byte());
        buf.extend_from_slice(&self.source_index.to_le_bytes());
        buf.extend_from_slice(&self.target_index.to_le_bytes());
        buf.extend_from_slice(&self.market_index.to_le_bytes());
        buf.extend_from_slice(&self.coin_lot_size.to_le_bytes());
        buf.extend_from_slice(&self.pc_lot_size.to_le_bytes());
        buf.extend_from_slice(self.target_mint.as_ref());
        buf
    }
}

/// Decode a create-order instruction's data, rejecting any other opcode
pub fn parse_create_order_instruction(data: &[u8]) -> Result<CreateOrderPayload, DecodingError> {
    CreateOrderPayload::decode(data)
}
