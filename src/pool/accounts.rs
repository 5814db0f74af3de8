use log::debug;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use spl_associated_token_account::instruction::create_associated_token_account;

use crate::error::Result;
use crate::solana::{associated_token_address, ChainConnection};

/// Creation instructions for every `(owner, mint)` associated account that does
/// not exist yet, paid by `payer`. Duplicate pairs are created once.
pub async fn missing_associated_accounts<C: ChainConnection + ?Sized>(
    connection: &C,
    payer: &Pubkey,
    pairs: &[(Pubkey, Pubkey)],
) -> Result<Vec<Instruction>> {
    let mut unique: Vec<(Pubkey, Pubkey)> = Vec::with_capacity(pairs.len());
    for pair in pairs {
        if !unique.contains(pair) {
            unique.push(*pair);
        }
    }

    let addresses: Vec<Pubkey> = unique
        .iter()
        .map(|(owner, mint)| associated_token_address(owner, mint))
        .collect();
    let exists = connection.accounts_exist(&addresses).await?;

    let instructions: Vec<Instruction> = unique
        .iter()
        .zip(exists)
        .filter(|(_, exists)| !exists)
        .map(|((owner, mint), _)| create_associated_token_account(payer, owner, mint, &spl_token::id()))
        .collect();
    debug!("{} of {} associated accounts missing", instructions.len(), unique.len());
    Ok(instructions)
}
