use log::info;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use crate::error::Result;
use crate::instruction::redeem as redeem_instruction;
use crate::pool::accounts::missing_associated_accounts;
use crate::pool::reader::PoolReader;
use crate::pool::settle::settle_instructions;
use crate::serum::MarketReader;
use crate::solana::{associated_token_address, ChainConnection};

/// Instructions burning `pool_token_amount` of `owner`'s pool tokens for their
/// share of every asset.
///
/// The program refuses to redeem while orders are unsettled, so every open
/// order is settled first. Missing asset accounts of `owner` are created up front.
pub async fn redeem<C, M>(
    reader: &PoolReader<'_, C>,
    markets: &M,
    owner: &Pubkey,
    seed: &[u8; 32],
    pool_token_amount: u64,
) -> Result<Vec<Instruction>>
where
    C: ChainConnection + ?Sized,
    M: MarketReader + ?Sized,
{
    let program_id = reader.ids().pool_program_id;
    let pool = reader.fetch_pool_info(seed).await?;

    let pairs: Vec<(Pubkey, Pubkey)> = pool.assets.iter().map(|asset| (*owner, asset.mint)).collect();
    let mut instructions = missing_associated_accounts(reader.connection(), owner, &pairs).await?;
    instructions.extend(settle_instructions(&program_id, markets, &pool).await?);

    let pool_asset_keys: Vec<Pubkey> = pool
        .assets
        .iter()
        .map(|asset| associated_token_address(&pool.address, &asset.mint))
        .collect();
    let target_asset_keys: Vec<Pubkey> = pairs
        .iter()
        .map(|(owner, mint)| associated_token_address(owner, mint))
        .collect();
    instructions.push(redeem_instruction(
        &program_id,
        &pool.mint_key,
        &pool.address,
        &pool_asset_keys,
        owner,
        &associated_token_address(owner, &pool.mint_key),
        &target_asset_keys,
        pool.seed(),
        pool_token_amount,
    ));

    info!(
        "Redeeming {} pool tokens of {} in {} instructions",
        pool_token_amount,
        pool.address,
        instructions.len()
    );
    Ok(instructions)
}
