pub mod market;
pub mod order;
pub mod pool;

pub use market::{MarketState, OpenOrders};
pub use order::{OrderType, PoolOrderInfo, SelfTradeBehavior, Side, WireByte};
pub use pool::{PoolAsset, PoolAssetBalance, PoolHeader, PoolInfo, PoolStatus};
