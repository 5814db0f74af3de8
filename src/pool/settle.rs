use log::{debug, info};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use crate::error::{PoolError, Result};
use crate::instruction::{settle_funds, SettleAccounts};
use crate::models::PoolInfo;
use crate::pool::reader::PoolReader;
use crate::serum::MarketReader;
use crate::solana::{associated_token_address, ChainConnection};

/// Settlement instructions for every open-orders account of `pool`, market by
/// market in the pool's order. Nothing is sent.
pub async fn settle_instructions<M: MarketReader + ?Sized>(
    program_id: &Pubkey,
    markets: &M,
    pool: &PoolInfo,
) -> Result<Vec<Instruction>> {
    let mut instructions = Vec::new();
    for market_key in &pool.authorized_markets {
        let market = markets.load_market(market_key).await?;
        let open_orders = markets.find_open_orders(&market, &pool.address).await?;
        if open_orders.is_empty() {
            debug!("No open orders for pool {} on market {}", pool.address, market_key);
            continue;
        }

        let coin_index = pool
            .asset_index(&market.coin_mint)
            .ok_or(PoolError::AccountUnavailable(market.coin_mint))?;
        let pc_index = pool
            .asset_index(&market.pc_mint)
            .ok_or(PoolError::AccountUnavailable(market.pc_mint))?;
        let vault_signer = market.vault_signer()?;

        for account in open_orders {
            let accounts = SettleAccounts {
                market: market.address,
                open_orders: account.address,
                pool_key: pool.address,
                pool_mint: pool.mint_key,
                coin_vault: market.coin_vault,
                pc_vault: market.pc_vault,
                pool_coin_wallet: associated_token_address(&pool.address, &market.coin_mint),
                pool_pc_wallet: associated_token_address(&pool.address, &market.pc_mint),
                vault_signer,
                dex_program: market.program_id,
            };
            instructions.push(settle_funds(
                program_id,
                &accounts,
                None,
                pool.seed(),
                pc_index as u64,
                coin_index as u64,
            ));
        }
    }
    Ok(instructions)
}

/// Settle every open order of the pool derived from `seed`
pub async fn settle_pool<C, M>(reader: &PoolReader<'_, C>, markets: &M, seed: &[u8; 32]) -> Result<Vec<Instruction>>
where
    C: ChainConnection + ?Sized,
    M: MarketReader + ?Sized,
{
    let pool = reader.fetch_pool_info(seed).await?;
    let instructions = settle_instructions(&reader.ids().pool_program_id, markets, &pool).await?;
    info!(
        "{} settle instructions for pool {} across {} markets",
        instructions.len(),
        pool.address,
        pool.authorized_markets.len()
    );
    Ok(instructions)
}
