use solana_sdk::pubkey::Pubkey;

use crate::models::{PoolOrderInfo, PoolStatus};

/// Format a pubkey for display (shortened)
pub fn format_pubkey(pubkey: &Pubkey) -> String {
    let pubkey_str = pubkey.to_string();
    let len = pubkey_str.len();
    format!("{}...{}", &pubkey_str[0..4], &pubkey_str[len - 4..len])
}

/// Base58 form of a pool seed, as accepted on the command line
pub fn format_seed(seed: &[u8; 32]) -> String {
    bs58::encode(seed).into_string()
}

pub fn format_status(status: PoolStatus) -> String {
    match status {
        PoolStatus::Uninitialized => "uninitialized".to_string(),
        PoolStatus::Unlocked => "unlocked".to_string(),
        PoolStatus::Locked => "locked".to_string(),
        PoolStatus::PendingOrder(n) => format!("unlocked, {} pending orders", n),
        PoolStatus::LockedPendingOrder(n) => format!("locked, {} pending orders", n),
    }
}

/// One line per order for history listings
pub fn format_order(order: &PoolOrderInfo) -> String {
    let time = order
        .block_time
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("slot {}", order.slot));
    format!(
        "{} {:?} {:?} price={} ratio={}/{} market={} tx={}",
        time,
        order.side,
        order.order_type,
        order.limit_price,
        order.ratio_of_pool_assets_to_trade,
        u16::MAX,
        format_pubkey(&order.market),
        order.transaction_signature
    )
}
