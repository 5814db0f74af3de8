use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::error::Result;
use crate::models::{MarketState, OpenOrders, OrderType, Side};
use crate::solana::Wallet;

/// Read access to Serum markets and open-orders accounts
#[async_trait]
pub trait MarketReader: Send + Sync {
    async fn load_market(&self, address: &Pubkey) -> Result<MarketState>;

    /// Every open-orders account `owner` holds on `market`
    async fn find_open_orders(&self, market: &MarketState, owner: &Pubkey) -> Result<Vec<OpenOrders>>;
}

/// A market listed for a mint pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketListing {
    pub address: Pubkey,
    pub deprecated: bool,
}

/// An order placed by the wallet itself, not by a pool
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewOrder {
    pub side: Side,
    /// Quote native units per base native unit
    pub limit_price: f64,
    /// Base native units
    pub base_quantity: u64,
    pub order_type: OrderType,
    /// Token account paying for the order: base for asks, quote for bids
    pub payer: Pubkey,
}

/// Trading access to the order-matching venue
#[async_trait]
pub trait OrderVenue: MarketReader {
    async fn find_market(&self, base_mint: &Pubkey, quote_mint: &Pubkey) -> Result<Option<MarketListing>>;

    /// Mean of best bid and best ask, quote native units per base native unit
    async fn mid_price(&self, market: &MarketState) -> Result<f64>;

    async fn place_order(&self, wallet: &Wallet, market: &MarketState, order: &NewOrder) -> Result<Signature>;

    /// Move the wallet's matched funds out of `open_orders` into its token accounts
    async fn settle_funds(
        &self,
        wallet: &Wallet,
        market: &MarketState,
        open_orders: &OpenOrders,
        base_wallet: &Pubkey,
        quote_wallet: &Pubkey,
    ) -> Result<Signature>;
}
