//! Serum DEX v3 market and open-orders accounts, read through `serum_dex::state`.
//!
//! Both accounts wrap the program's state struct in a 5-byte `serum` head and a
//! 7-byte `padding` tail.

use bytemuck::Pod;
use serum_dex::state::{AccountFlag, MarketState as DexMarketState, OpenOrders as DexOpenOrders};
use solana_sdk::pubkey::Pubkey;
use std::mem::size_of;

use super::{ensure_len, PUBKEY_LEN};
use crate::error::DecodingError;
use crate::models::{MarketState, OpenOrders};

const HEAD_PADDING: usize = 5;
const TAIL_PADDING: usize = 7;

pub const MARKET_STATE_LEN: usize = HEAD_PADDING + size_of::<DexMarketState>() + TAIL_PADDING;
pub const OPEN_ORDERS_LEN: usize = HEAD_PADDING + size_of::<DexOpenOrders>() + TAIL_PADDING;
/// Past the head padding and the account flags
pub const OPEN_ORDERS_MARKET_OFFSET: usize = HEAD_PADDING + 8;
pub const OPEN_ORDERS_OWNER_OFFSET: usize = OPEN_ORDERS_MARKET_OFFSET + PUBKEY_LEN;

const MARKET_FLAGS: u64 = AccountFlag::Initialized as u64 | AccountFlag::Market as u64;
const OPEN_ORDERS_FLAGS: u64 = AccountFlag::Initialized as u64 | AccountFlag::OpenOrders as u64;

fn read_state<T: Pod>(what: &'static str, data: &[u8], len: usize) -> Result<T, DecodingError> {
    ensure_len(what, data, len)?;
    bytemuck::try_pod_read_unaligned(&data[HEAD_PADDING..len - TAIL_PADDING]).map_err(|_| DecodingError::TooShort {
        what,
        needed: len,
        actual: data.len(),
    })
}

fn pubkey(words: [u64; 4]) -> Pubkey {
    Pubkey::new_from_array(bytemuck::cast(words))
}

pub fn decode_market(address: Pubkey, program_id: Pubkey, data: &[u8]) -> Result<MarketState, DecodingError> {
    let state: DexMarketState = read_state("serum market", data, MARKET_STATE_LEN)?;
    let account_flags = state.account_flags;
    if account_flags & MARKET_FLAGS != MARKET_FLAGS {
        return Err(DecodingError::InvalidAccount {
            what: "serum market",
            address,
        });
    }
    Ok(MarketState {
        address,
        program_id,
        account_flags,
        vault_signer_nonce: state.vault_signer_nonce,
        coin_mint: pubkey(state.coin_mint),
        pc_mint: pubkey(state.pc_mint),
        coin_vault: pubkey(state.coin_vault),
        pc_vault: pubkey(state.pc_vault),
        request_queue: pubkey(state.req_q),
        event_queue: pubkey(state.event_q),
        bids: pubkey(state.bids),
        asks: pubkey(state.asks),
        coin_lot_size: state.coin_lot_size,
        pc_lot_size: state.pc_lot_size,
        fee_rate_bps: state.fee_rate_bps,
    })
}

pub fn decode_open_orders(address: Pubkey, data: &[u8]) -> Result<OpenOrders, DecodingError> {
    let state: DexOpenOrders = read_state("open orders", data, OPEN_ORDERS_LEN)?;
    let account_flags = state.account_flags;
    if account_flags & OPEN_ORDERS_FLAGS != OPEN_ORDERS_FLAGS {
        return Err(DecodingError::InvalidAccount {
            what: "open orders",
            address,
        });
    }
    Ok(OpenOrders {
        address,
        market: pubkey(state.market),
        owner: pubkey(state.owner),
        native_coin_free: state.native_coin_free,
        native_coin_total: state.native_coin_total,
        native_pc_free: state.native_pc_free,
        native_pc_total: state.native_pc_total,
    })
}
