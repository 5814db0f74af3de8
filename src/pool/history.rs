use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use log::{debug, warn};
use solana_sdk::pubkey::Pubkey;

use crate::error::{DecodingError, Result};
use crate::layout::{parse_create_order_instruction, CreateOrderPayload, CREATE_ORDER_OPCODE};
use crate::models::{PoolInfo, PoolOrderInfo};
use crate::pool::reader::PoolReader;
use crate::solana::{ChainConnection, TransactionRecord};

/// Most signatures a single RPC history query returns
pub const SIGNATURE_WINDOW: usize = 1000;

fn to_order_info(
    pool: &PoolInfo,
    transaction: &TransactionRecord,
    payload: CreateOrderPayload,
) -> std::result::Result<PoolOrderInfo, DecodingError> {
    let market = pool
        .market_at(payload.market_index)
        .ok_or(DecodingError::MarketIndexOutOfRange {
            index: payload.market_index,
            count: pool.authorized_markets.len(),
        })?;
    Ok(PoolOrderInfo {
        pool_seed: payload.pool_seed,
        side: payload.side,
        limit_price: payload.limit_price,
        ratio_of_pool_assets_to_trade: payload.ratio_of_pool_assets_to_trade,
        order_type: payload.order_type,
        client_id: payload.client_id,
        self_trade_behavior: payload.self_trade_behavior,
        source_index: payload.source_index,
        target_index: payload.target_index,
        market_index: payload.market_index,
        coin_lot_size: payload.coin_lot_size,
        pc_lot_size: payload.pc_lot_size,
        target_mint: payload.target_mint,
        market,
        transaction_signature: transaction.signature.to_string(),
        slot: transaction.slot,
        block_time: transaction
            .block_time
            .and_then(|t| DateTime::<Utc>::from_timestamp(t, 0)),
    })
}

/// Create-order instructions of the pool program found in `transaction`.
/// Instructions that do not decode, or name a market the pool does not
/// authorize, are skipped.
fn orders_in_transaction(pool: &PoolInfo, program_id: &Pubkey, transaction: &TransactionRecord) -> Vec<PoolOrderInfo> {
    transaction
        .instructions
        .iter()
        .filter(|ix| &ix.program_id == program_id && ix.data.first() == Some(&CREATE_ORDER_OPCODE))
        .filter_map(|ix| {
            let decoded =
                parse_create_order_instruction(&ix.data).and_then(|payload| to_order_info(pool, transaction, payload));
            match decoded {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!("Skipping create order in {}: {}", transaction.signature, e);
                    None
                }
            }
        })
        .collect()
}

/// The `n` most recent orders placed by the pool derived from `seed`.
///
/// Only the latest signature window of the pool account is scanned and
/// undecodable orders are skipped, so fewer than `n` orders may come back.
pub async fn get_pool_order_infos<C: ChainConnection + ?Sized>(
    reader: &PoolReader<'_, C>,
    seed: &[u8; 32],
    n: usize,
) -> Result<Vec<PoolOrderInfo>> {
    let pool = reader.fetch_pool_info(seed).await?;
    let connection = reader.connection();
    let signatures = connection
        .get_signatures_for_address(&pool.address, SIGNATURE_WINDOW)
        .await?;
    debug!("{} signatures for pool {}", signatures.len(), pool.address);

    let confirmed: Vec<_> = signatures.iter().filter(|s| !s.failed).collect();
    if confirmed.len() < signatures.len() {
        warn!(
            "Skipping {} failed transactions of pool {}",
            signatures.len() - confirmed.len(),
            pool.address
        );
    }

    let transactions = try_join_all(confirmed.iter().map(|s| connection.get_transaction(&s.signature))).await?;

    let program_id = reader.ids().pool_program_id;
    let mut orders = Vec::new();
    for transaction in transactions.iter().filter(|t| !t.failed) {
        orders.extend(orders_in_transaction(&pool, &program_id, transaction));
        if orders.len() >= n {
            break;
        }
    }
    orders.truncate(n);
    Ok(orders)
}
