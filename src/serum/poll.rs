use log::debug;
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

use crate::error::{PoolError, Result};
use crate::models::{MarketState, OpenOrders};
use crate::serum::venue::MarketReader;

/// How long to wait for the matching engine before settling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_attempts: 12,
        }
    }
}

/// Poll `owner`'s open orders on `market` until one of them holds funds.
///
/// Settling only makes sense once the matching engine has produced fills, so
/// this is the gate every settlement in the deposit workflow goes through.
pub async fn wait_for_unsettled_funds<R: MarketReader + ?Sized>(
    reader: &R,
    market: &MarketState,
    owner: &Pubkey,
    config: PollConfig,
) -> Result<Vec<OpenOrders>> {
    for attempt in 1..=config.max_attempts {
        let open_orders = reader.find_open_orders(market, owner).await?;
        if open_orders.iter().any(OpenOrders::has_unsettled_funds) {
            debug!("Funds available on market {} after {} polls", market.address, attempt);
            return Ok(open_orders);
        }
        if attempt < config.max_attempts {
            tokio::time::sleep(config.interval).await;
        }
    }
    Err(PoolError::SettlementTimeout {
        market: market.address,
        attempts: config.max_attempts,
    })
}
