use async_trait::async_trait;
use log::debug;
use solana_sdk::pubkey::Pubkey;

use crate::error::{PoolError, Result};
use crate::layout::serum::{
    decode_market, decode_open_orders, OPEN_ORDERS_LEN, OPEN_ORDERS_MARKET_OFFSET, OPEN_ORDERS_OWNER_OFFSET,
};
use crate::models::{MarketState, OpenOrders};
use crate::serum::venue::MarketReader;
use crate::solana::{AccountFilter, ChainConnection};

/// `MarketReader` that decodes Serum accounts fetched through a chain connection
pub struct SerumMarkets<'a, C: ChainConnection + ?Sized> {
    connection: &'a C,
    program_id: Pubkey,
}

impl<'a, C: ChainConnection + ?Sized> SerumMarkets<'a, C> {
    pub fn new(connection: &'a C, program_id: Pubkey) -> Self {
        Self { connection, program_id }
    }
}

#[async_trait]
impl<'a, C: ChainConnection + ?Sized> MarketReader for SerumMarkets<'a, C> {
    async fn load_market(&self, address: &Pubkey) -> Result<MarketState> {
        let data = self
            .connection
            .get_account_data(address)
            .await?
            .ok_or(PoolError::AccountUnavailable(*address))?;
        Ok(decode_market(*address, self.program_id, &data)?)
    }

    async fn find_open_orders(&self, market: &MarketState, owner: &Pubkey) -> Result<Vec<OpenOrders>> {
        let filters = [
            AccountFilter::Memcmp {
                offset: OPEN_ORDERS_MARKET_OFFSET,
                bytes: market.address.to_bytes().to_vec(),
            },
            AccountFilter::Memcmp {
                offset: OPEN_ORDERS_OWNER_OFFSET,
                bytes: owner.to_bytes().to_vec(),
            },
            AccountFilter::DataSize(OPEN_ORDERS_LEN as u64),
        ];
        let accounts = self
            .connection
            .get_program_accounts(&market.program_id, &filters)
            .await?;
        debug!(
            "{} open orders accounts for {} on market {}",
            accounts.len(),
            owner,
            market.address
        );

        accounts
            .iter()
            .map(|(address, data)| decode_open_orders(*address, data).map_err(PoolError::from))
            .collect()
    }
}
