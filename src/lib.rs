pub mod config;
pub mod error;
pub mod instruction;
pub mod layout;
pub mod models;
pub mod pool;
pub mod serum;
pub mod solana;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{DecodingError, PoolError, Result};
