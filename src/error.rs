use solana_client::client_error::ClientError;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// Failure to read a fixed-offset layout out of raw account or instruction bytes
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodingError {
    #[error("{what} needs {needed} bytes, got {actual}")]
    TooShort {
        what: &'static str,
        needed: usize,
        actual: usize,
    },

    #[error("invalid {field} value: {value}")]
    InvalidValue { field: &'static str, value: u64 },

    #[error("unknown instruction opcode: {0}")]
    UnknownOpcode(u8),

    #[error("market index {index} out of range ({count} authorized markets)")]
    MarketIndexOutOfRange { index: u16, count: usize },

    #[error("{address} is not a valid {what}")]
    InvalidAccount { what: &'static str, address: Pubkey },
}

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Account not found: {0}")]
    AccountUnavailable(Pubkey),

    #[error("No pool account at {0}")]
    PoolUnavailable(Pubkey),

    #[error("Conversion order not matched: balance dropped by {spent}, expected at least {expected}")]
    ConversionNotMatched { spent: u64, expected: u64 },

    #[error("Market {0} is deprecated")]
    MarketDeprecated(Pubkey),

    #[error("Market {market} has no usable mid price: {price}")]
    InvalidPrice { market: Pubkey, price: f64 },

    #[error("Pool {0} holds no assets to buy into")]
    EmptyPool(Pubkey),

    #[error("No market listed for {base}/{quote}")]
    NoMarket { base: Pubkey, quote: Pubkey },

    #[error("Open orders on market {market} did not report funds after {attempts} polls")]
    SettlementTimeout { market: Pubkey, attempts: u32 },

    #[error("Seed does not derive a valid program address")]
    InvalidSeed,

    #[error("Decoding error: {0}")]
    Decoding(#[from] DecodingError),

    #[error("RPC error: {0}")]
    Rpc(#[from] ClientError),

    #[error("Signing error: {0}")]
    Signing(String),
}

pub type Result<T> = std::result::Result<T, PoolError>;
