//! Decoders for pool accounts, pool instructions and Serum accounts.
//!
//! Pool layouts are read at named fixed offsets and nothing is inferred from
//! the data itself. Serum accounts go through the DEX crate's own state types.

pub mod order;
pub mod pool;
pub mod serum;

pub use order::{parse_create_order_instruction, CreateOrderPayload, CREATE_ORDER_LEN, CREATE_ORDER_OPCODE};
pub use pool::{decode_assets, decode_markets, decode_pool, POOL_ASSET_LEN, POOL_HEADER_LEN};
pub use serum::{MARKET_STATE_LEN, OPEN_ORDERS_LEN};

use solana_sdk::pubkey::Pubkey;

use crate::error::DecodingError;

pub const PUBKEY_LEN: usize = 32;

/// A record with a fixed byte length
pub trait Layout: Sized {
    const LEN: usize;

    fn decode(data: &[u8]) -> Result<Self, DecodingError>;
}

pub(crate) fn ensure_len(what: &'static str, data: &[u8], needed: usize) -> Result<(), DecodingError> {
    if data.len() < needed {
        return Err(DecodingError::TooShort {
            what,
            needed,
            actual: data.len(),
        });
    }
    Ok(())
}

pub(crate) fn read_array<const N: usize>(
    what: &'static str,
    data: &[u8],
    offset: usize,
) -> Result<[u8; N], DecodingError> {
    data.get(offset..offset + N)
        .and_then(|slice| slice.try_into().ok())
        .ok_or(DecodingError::TooShort {
            what,
            needed: offset + N,
            actual: data.len(),
        })
}

pub(crate) fn read_u8(what: &'static str, data: &[u8], offset: usize) -> Result<u8, DecodingError> {
    read_array::<1>(what, data, offset).map(|[b]| b)
}

pub(crate) fn read_u16(what: &'static str, data: &[u8], offset: usize) -> Result<u16, DecodingError> {
    read_array(what, data, offset).map(u16::from_le_bytes)
}

pub(crate) fn read_u64(what: &'static str, data: &[u8], offset: usize) -> Result<u64, DecodingError> {
    read_array(what, data, offset).map(u64::from_le_bytes)
}

pub(crate) fn read_pubkey(what: &'static str, data: &[u8], offset: usize) -> Result<Pubkey, DecodingError> {
    read_array::<PUBKEY_LEN>(what, data, offset).map(Pubkey::new_from_array)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_bounded() {
        let data = [1u8, 0, 2, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(read_u16("x", &data, 0).unwrap(), 1);
        assert_eq!(read_u64("x", &data, 2).unwrap(), 2);
        assert_eq!(
            read_u64("x", &data, 3),
            Err(DecodingError::TooShort {
                what: "x",
                needed: 11,
                actual: 10
            })
        );
        assert!(read_pubkey("x", &data, 0).is_err());
    }
}
