//! Instructions of the pool program: wire codec and account-meta builders.

use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program, sysvar,
};

use crate::error::DecodingError;
use crate::layout::{
    read_array, read_pubkey, read_u16, read_u64, read_u8, CreateOrderPayload, Layout, PUBKEY_LEN,
};
use crate::models::{Side, WireByte};

#[derive(Clone, Debug, PartialEq)]
pub enum PoolInstruction {
    /// Allocates an empty pool account and its pool-token mint.
    ///
    /// Accounts: system program, rent sysvar, spl-token program, `[writable]` pool,
    /// `[writable]` pool-token mint, `[writable, signer]` payer.
    Init {
        pool_seed: [u8; 32],
        max_number_of_assets: u32,
        number_of_markets: u16,
    },
    /// First deposit into an initialized pool; fixes the signal provider and the
    /// authorized markets.
    Create {
        pool_seed: [u8; 32],
        serum_program_id: Pubkey,
        signal_provider_key: Pubkey,
        deposit_amounts: Vec<u64>,
        markets: Vec<Pubkey>,
    },
    /// Buy `pool_token_amount` pool tokens with assets in the pool's current ratio.
    Deposit {
        pool_seed: [u8; 32],
        pool_token_amount: u64,
    },
    /// Signal provider places a Serum order on behalf of the pool.
    CreateOrder(CreateOrderPayload),
    /// Signal provider cancels a Serum order of the pool.
    CancelOrder {
        pool_seed: [u8; 32],
        side: Side,
        order_id: u128,
    },
    /// Permissionless crank moving matched funds out of a pool open-orders account.
    SettleFunds {
        pool_seed: [u8; 32],
        pc_index: u64,
        coin_index: u64,
    },
    /// Burn pool tokens for the matching share of every pool asset.
    Redeem {
        pool_seed: [u8; 32],
        pool_token_amount: u64,
    },
}

const WHAT: &str = "pool instruction";

impl PoolInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, DecodingError> {
        let (&tag, rest) = input.split_first().ok_or(DecodingError::TooShort {
            what: WHAT,
            needed: 1,
            actual: 0,
        })?;
        Ok(match tag {
            0 => Self::Init {
                pool_seed: read_array(WHAT, rest, 0)?,
                max_number_of_assets: read_array(WHAT, rest, 32).map(u32::from_le_bytes)?,
                number_of_markets: read_u16(WHAT, rest, 36)?,
            },
            1 => {
                let number_of_markets = read_u16(WHAT, rest, 96)? as usize;
                let markets = (0..number_of_markets)
                    .map(|i| read_pubkey(WHAT, rest, 98 + i * PUBKEY_LEN))
                    .collect::<Result<Vec<_>, _>>()?;
                let amounts_offset = 98 + number_of_markets * PUBKEY_LEN;
                let deposit_amounts = rest[amounts_offset..]
                    .chunks_exact(8)
                    .map(|chunk| read_u64(WHAT, chunk, 0))
                    .collect::<Result<Vec<_>, _>>()?;
                Self::Create {
                    pool_seed: read_array(WHAT, rest, 0)?,
                    serum_program_id: read_pubkey(WHAT, rest, 32)?,
                    signal_provider_key: read_pubkey(WHAT, rest, 64)?,
                    deposit_amounts,
                    markets,
                }
            }
            2 => Self::Deposit {
                pool_seed: read_array(WHAT, rest, 0)?,
                pool_token_amount: read_u64(WHAT, rest, 32)?,
            },
            3 => Self::CreateOrder(CreateOrderPayload::decode(input)?),
            4 => Self::CancelOrder {
                pool_seed: read_array(WHAT, rest, 0)?,
                side: Side::from_byte(read_u8(WHAT, rest, 32)?)?,
                order_id: read_array(WHAT, rest, 33).map(u128::from_le_bytes)?,
            },
            5 => Self::SettleFunds {
                pool_seed: read_array(WHAT, rest, 0)?,
                pc_index: read_u64(WHAT, rest, 32)?,
                coin_index: read_u64(WHAT, rest, 40)?,
            },
            6 => Self::Redeem {
                pool_seed: read_array(WHAT, rest, 0)?,
                pool_token_amount: read_u64(WHAT, rest, 32)?,
            },
            _ => return Err(DecodingError::UnknownOpcode(tag)),
        })
    }

    pub fn pack(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            Self::Init {
                pool_seed,
                max_number_of_assets,
                number_of_markets,
            } => {
                buf.push(0);
                buf.extend_from_slice(pool_seed);
                buf.extend_from_slice(&max_number_of_assets.to_le_bytes());
                buf.extend_from_slice(&number_of_markets.to_le_bytes());
            }
            Self::Create {
                pool_seed,
                serum_program_id,
                signal_provider_key,
                deposit_amounts,
                markets,
            } => {
                buf.push(1);
                buf.extend_from_slice(pool_seed);
                buf.extend_from_slice(serum_program_id.as_ref());
                buf.extend_from_slice(signal_provider_key.as_ref());
                buf.extend_from_slice(&(markets.len() as u16).to_le_bytes());
                for market in markets {
                    buf.extend_from_slice(market.as_ref());
                }
                for amount in deposit_amounts {
                    buf.extend_from_slice(&amount.to_le_bytes());
                }
            }
            Self::Deposit {
                pool_seed,
                pool_token_amount,
            } => {
                buf.push(2);
                buf.extend_from_slice(pool_seed);
                buf.extend_from_slice(&pool_token_amount.to_le_bytes());
            }
            Self::CreateOrder(payload) => buf = payload.encode(),
            Self::CancelOrder {
                pool_seed,
                side,
                order_id,
            } => {
                buf.push(4);
                buf.extend_from_slice(pool_seed);
                buf.push(side.to_byte());
                buf.extend_from_slice(&order_id.to_le_bytes());
            }
            Self::SettleFunds {
                pool_seed,
                pc_index,
                coin_index,
            } => {
                buf.push(5);
                buf.extend_from_slice(pool_seed);
                buf.extend_from_slice(&pc_index.to_le_bytes());
                buf.extend_from_slice(&coin_index.to_le_bytes());
            }
            Self::Redeem {
                pool_seed,
                pool_token_amount,
            } => {
                buf.push(6);
                buf.extend_from_slice(pool_seed);
                buf.extend_from_slice(&pool_token_amount.to_le_bytes());
            }
        }
        buf
    }
}

/// Pool-token accounts credited with deposit fees
#[derive(Debug, Clone, Copy)]
pub struct FeeTargets {
    pub signal_provider: Pubkey,
    pub fee_collection: Pubkey,
    pub buy_and_burn: Pubkey,
}

pub fn init(
    program_id: &Pubkey,
    mint_key: &Pubkey,
    payer_key: &Pubkey,
    pool_key: &Pubkey,
    pool_seed: [u8; 32],
    max_number_of_assets: u32,
    number_of_markets: u16,
) -> Instruction {
    let data = PoolInstruction::Init {
        pool_seed,
        max_number_of_assets,
        number_of_markets,
    }
    .pack();
    let accounts = vec![
        AccountMeta::new_readonly(system_program::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(*pool_key, false),
        AccountMeta::new(*mint_key, false),
        AccountMeta::new(*payer_key, true),
    ];
    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn create(
    program_id: &Pubkey,
    mint_key: &Pubkey,
    pool_key: &Pubkey,
    pool_seed: [u8; 32],
    pool_asset_keys: &[Pubkey],
    target_pool_token_key: &Pubkey,
    source_owner_key: &Pubkey,
    source_asset_keys: &[Pubkey],
    serum_program_id: &Pubkey,
    signal_provider_key: &Pubkey,
    deposit_amounts: Vec<u64>,
    markets: Vec<Pubkey>,
) -> Instruction {
    let data = PoolInstruction::Create {
        pool_seed,
        serum_program_id: *serum_program_id,
        signal_provider_key: *signal_provider_key,
        deposit_amounts,
        markets,
    }
    .pack();
    let mut accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(*mint_key, false),
        AccountMeta::new(*target_pool_token_key, false),
        AccountMeta::new(*pool_key, false),
    ];
    accounts.extend(pool_asset_keys.iter().map(|key| AccountMeta::new(*key, false)));
    accounts.push(AccountMeta::new_readonly(*source_owner_key, true));
    accounts.extend(source_asset_keys.iter().map(|key| AccountMeta::new(*key, false)));
    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// `pool_asset_keys` and `source_asset_keys` follow the pool's asset order
#[allow(clippy::too_many_arguments)]
pub fn deposit(
    program_id: &Pubkey,
    mint_key: &Pubkey,
    pool_key: &Pubkey,
    pool_asset_keys: &[Pubkey],
    target_pool_token_key: &Pubkey,
    fee_targets: &FeeTargets,
    source_owner: &Pubkey,
    source_asset_keys: &[Pubkey],
    pool_seed: [u8; 32],
    pool_token_amount: u64,
) -> Instruction {
    let data = PoolInstruction::Deposit {
        pool_seed,
        pool_token_amount,
    }
    .pack();
    let mut accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(*mint_key, false),
        AccountMeta::new(*target_pool_token_key, false),
        AccountMeta::new(fee_targets.signal_provider, false),
        AccountMeta::new(fee_targets.fee_collection, false),
        AccountMeta::new(fee_targets.buy_and_burn, false),
        AccountMeta::new_readonly(*pool_key, false),
    ];
    accounts.extend(pool_asset_keys.iter().map(|key| AccountMeta::new(*key, false)));
    accounts.push(AccountMeta::new_readonly(*source_owner, true));
    accounts.extend(source_asset_keys.iter().map(|key| AccountMeta::new(*key, false)));
    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn redeem(
    program_id: &Pubkey,
    mint_key: &Pubkey,
    pool_key: &Pubkey,
    pool_asset_keys: &[Pubkey],
    source_pool_token_owner_key: &Pubkey,
    source_pool_token_key: &Pubkey,
    target_asset_keys: &[Pubkey],
    pool_seed: [u8; 32],
    pool_token_amount: u64,
) -> Instruction {
    let data = PoolInstruction::Redeem {
        pool_seed,
        pool_token_amount,
    }
    .pack();
    let mut accounts = vec![
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new(*mint_key, false),
        AccountMeta::new_readonly(*source_pool_token_owner_key, true),
        AccountMeta::new(*source_pool_token_key, false),
        AccountMeta::new(*pool_key, false),
    ];
    accounts.extend(pool_asset_keys.iter().map(|key| AccountMeta::new(*key, false)));
    accounts.extend(target_asset_keys.iter().map(|key| AccountMeta::new(*key, false)));
    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Serum-side accounts touched by a pool order
#[derive(Debug, Clone, Copy)]
pub struct OrderAccounts {
    pub market: Pubkey,
    pub open_orders: Pubkey,
    pub request_queue: Pubkey,
    pub coin_vault: Pubkey,
    pub pc_vault: Pubkey,
    pub dex_program: Pubkey,
}

pub fn create_order(
    program_id: &Pubkey,
    signal_provider: &Pubkey,
    pool_key: &Pubkey,
    payer_pool_asset_account: &Pubkey,
    serum: &OrderAccounts,
    srm_referrer_account: Option<&Pubkey>,
    payload: CreateOrderPayload,
) -> Instruction {
    let data = PoolInstruction::CreateOrder(payload).pack();
    let mut accounts = vec![
        AccountMeta::new_readonly(*signal_provider, true),
        AccountMeta::new(serum.market, false),
        AccountMeta::new(*payer_pool_asset_account, false),
        AccountMeta::new(serum.open_orders, false),
        AccountMeta::new(serum.request_queue, false),
        AccountMeta::new(*pool_key, false),
        AccountMeta::new(serum.coin_vault, false),
        AccountMeta::new(serum.pc_vault, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(sysvar::rent::id(), false),
        AccountMeta::new_readonly(serum.dex_program, false),
    ];
    if let Some(key) = srm_referrer_account {
        accounts.push(AccountMeta::new(*key, false));
    }
    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

pub fn cancel_order(
    program_id: &Pubkey,
    signal_provider: &Pubkey,
    pool_key: &Pubkey,
    serum: &OrderAccounts,
    pool_seed: [u8; 32],
    side: Side,
    order_id: u128,
) -> Instruction {
    let data = PoolInstruction::CancelOrder {
        pool_seed,
        side,
        order_id,
    }
    .pack();
    let accounts = vec![
        AccountMeta::new_readonly(*signal_provider, true),
        AccountMeta::new_readonly(serum.market, false),
        AccountMeta::new(serum.open_orders, false),
        AccountMeta::new(serum.request_queue, false),
        AccountMeta::new_readonly(*pool_key, false),
        AccountMeta::new_readonly(serum.dex_program, false),
    ];
    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Accounts for settling one pool open-orders account
#[derive(Debug, Clone, Copy)]
pub struct SettleAccounts {
    pub market: Pubkey,
    pub open_orders: Pubkey,
    pub pool_key: Pubkey,
    pub pool_mint: Pubkey,
    pub coin_vault: Pubkey,
    pub pc_vault: Pubkey,
    pub pool_coin_wallet: Pubkey,
    pub pool_pc_wallet: Pubkey,
    pub vault_signer: Pubkey,
    pub dex_program: Pubkey,
}

pub fn settle_funds(
    program_id: &Pubkey,
    settle: &SettleAccounts,
    referrer_pc_account: Option<&Pubkey>,
    pool_seed: [u8; 32],
    pc_index: u64,
    coin_index: u64,
) -> Instruction {
    let data = PoolInstruction::SettleFunds {
        pool_seed,
        pc_index,
        coin_index,
    }
    .pack();
    let mut accounts = vec![
        AccountMeta::new(settle.market, false),
        AccountMeta::new(settle.open_orders, false),
        AccountMeta::new(settle.pool_key, false),
        AccountMeta::new_readonly(settle.pool_mint, false),
        AccountMeta::new(settle.coin_vault, false),
        AccountMeta::new(settle.pc_vault, false),
        AccountMeta::new(settle.pool_coin_wallet, false),
        AccountMeta::new(settle.pool_pc_wallet, false),
        AccountMeta::new_readonly(settle.vault_signer, false),
        AccountMeta::new_readonly(spl_token::id(), false),
        AccountMeta::new_readonly(settle.dex_program, false),
    ];
    if let Some(key) = referrer_pc_account {
        accounts.push(AccountMeta::new(*key, false));
    }
    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::order::tests::sample_order;

    fn assert_round_trip(instruction: PoolInstruction) {
        assert_eq!(PoolInstruction::unpack(&instruction.pack()).unwrap(), instruction);
    }

    #[test]
    fn test_instruction_packing() {
        assert_round_trip(PoolInstruction::Init {
            pool_seed: [50u8; 32],
            max_number_of_assets: 43,
            number_of_markets: 50,
        });
        assert_round_trip(PoolInstruction::Create {
            pool_seed: [50u8; 32],
            serum_program_id: Pubkey::new_unique(),
            signal_provider_key: Pubkey::new_unique(),
            deposit_amounts: vec![23, 43],
            markets: vec![Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique()],
        });
        assert_round_trip(PoolInstruction::CreateOrder(sample_order([50u8; 32], 41)));
        assert_round_trip(PoolInstruction::CancelOrder {
            pool_seed: [50u8; 32],
            side: Side::Ask,
            order_id: 855464984,
        });
    }

    #[test]
    fn test_deposit_wire_format() {
        let data = PoolInstruction::Deposit {
            pool_seed: [4u8; 32],
            pool_token_amount: 0x0102,
        }
        .pack();
        assert_eq!(data.len(), 41);
        assert_eq!(data[0], 2);
        assert_eq!(&data[1..33], &[4u8; 32]);
        assert_eq!(&data[33..35], &[0x02, 0x01]);
    }

    #[test]
    fn test_unknown_opcode() {
        assert_eq!(
            PoolInstruction::unpack(&[9, 0, 0]),
            Err(DecodingError::UnknownOpcode(9))
        );
        assert!(PoolInstruction::unpack(&[]).is_err());
        assert!(PoolInstruction::unpack(&[5, 1, 2]).is_err());
    }

    #[test]
    fn test_deposit_account_order() {
        let program_id = Pubkey::new_unique();
        let pool_assets = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let sources = vec![Pubkey::new_unique(), Pubkey::new_unique()];
        let owner = Pubkey::new_unique();
        let fee_targets = FeeTargets {
            signal_provider: Pubkey::new_unique(),
            fee_collection: Pubkey::new_unique(),
            buy_and_burn: Pubkey::new_unique(),
        };
        let ix = deposit(
            &program_id,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &pool_assets,
            &Pubkey::new_unique(),
            &fee_targets,
            &owner,
            &sources,
            [1u8; 32],
            10,
        );
        assert_eq!(ix.program_id, program_id);
        assert_eq!(ix.accounts.len(), 7 + 2 + 1 + 2);
        assert_eq!(ix.accounts[3].pubkey, fee_targets.signal_provider);
        assert_eq!(ix.accounts[7].pubkey, pool_assets[0]);
        assert_eq!(ix.accounts[9].pubkey, owner);
        assert!(ix.accounts[9].is_signer);
        assert_eq!(ix.accounts[11].pubkey, sources[1]);
    }

    #[test]
    fn test_pool_setup_accounts() {
        let program_id = Pubkey::new_unique();
        let (mint, payer, pool) = (Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        let ix = init(&program_id, &mint, &payer, &pool, [3u8; 32], 10, 2);
        assert_eq!(ix.accounts[3].pubkey, pool);
        assert_eq!(ix.accounts[4].pubkey, mint);
        assert!(ix.accounts[5].is_signer);

        let markets = vec![Pubkey::new_unique()];
        let owner = Pubkey::new_unique();
        let ix = create(
            &program_id,
            &mint,
            &pool,
            [3u8; 32],
            &[Pubkey::new_unique()],
            &Pubkey::new_unique(),
            &owner,
            &[Pubkey::new_unique()],
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            vec![100],
            markets.clone(),
        );
        assert_eq!(ix.accounts.len(), 4 + 1 + 1 + 1);
        assert_eq!(ix.accounts[5].pubkey, owner);
        assert!(matches!(
            PoolInstruction::unpack(&ix.data).unwrap(),
            PoolInstruction::Create { markets: m, deposit_amounts, .. } if m == markets && deposit_amounts == vec![100]
        ));
    }

    #[test]
    fn test_order_accounts() {
        let program_id = Pubkey::new_unique();
        let signal_provider = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let serum = OrderAccounts {
            market: Pubkey::new_unique(),
            open_orders: Pubkey::new_unique(),
            request_queue: Pubkey::new_unique(),
            coin_vault: Pubkey::new_unique(),
            pc_vault: Pubkey::new_unique(),
            dex_program: Pubkey::new_unique(),
        };
        let referrer = Pubkey::new_unique();
        let order = sample_order([8u8; 32], 0);

        let ix = create_order(
            &program_id,
            &signal_provider,
            &pool,
            &Pubkey::new_unique(),
            &serum,
            Some(&referrer),
            order.clone(),
        );
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.accounts[1].pubkey, serum.market);
        assert_eq!(ix.accounts.last().unwrap().pubkey, referrer);
        assert_eq!(ix.data, order.encode());

        let ix = cancel_order(&program_id, &signal_provider, &pool, &serum, [8u8; 32], Side::Bid, 77);
        assert_eq!(ix.accounts.len(), 6);
        assert_eq!(
            PoolInstruction::unpack(&ix.data).unwrap(),
            PoolInstruction::CancelOrder {
                pool_seed: [8u8; 32],
                side: Side::Bid,
                order_id: 77,
            }
        );
    }
}
