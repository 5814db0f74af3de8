use futures::future::try_join_all;
use log::{debug, warn};
use solana_sdk::pubkey::Pubkey;

use crate::config::ProgramIds;
use crate::error::{PoolError, Result};
use crate::layout::pool::SIGNAL_PROVIDER_OFFSET;
use crate::layout::{decode_pool, Layout};
use crate::models::{PoolAssetBalance, PoolHeader, PoolInfo};
use crate::solana::{associated_token_address, AccountFilter, ChainConnection};

/// Address of the pool account for `seed`
pub fn derive_pool_address(program_id: &Pubkey, seed: &[u8; 32]) -> Result<Pubkey> {
    Pubkey::create_program_address(&[seed], program_id).map_err(|_| PoolError::InvalidSeed)
}

/// Address of the pool-token mint for `seed`
pub fn derive_mint_address(program_id: &Pubkey, seed: &[u8; 32]) -> Result<Pubkey> {
    Pubkey::create_program_address(&[seed, &[1]], program_id).map_err(|_| PoolError::InvalidSeed)
}

/// Reads pool accounts through a chain connection. Holds no state between calls.
pub struct PoolReader<'a, C: ChainConnection + ?Sized> {
    connection: &'a C,
    ids: ProgramIds,
}

impl<'a, C: ChainConnection + ?Sized> PoolReader<'a, C> {
    pub fn new(connection: &'a C, ids: ProgramIds) -> Self {
        Self { connection, ids }
    }

    pub fn connection(&self) -> &'a C {
        self.connection
    }

    pub fn ids(&self) -> &ProgramIds {
        &self.ids
    }

    pub fn derive_pool_address(&self, seed: &[u8; 32]) -> Result<Pubkey> {
        derive_pool_address(&self.ids.pool_program_id, seed)
    }

    pub fn derive_mint_address(&self, seed: &[u8; 32]) -> Result<Pubkey> {
        derive_mint_address(&self.ids.pool_program_id, seed)
    }

    pub fn get_pool_token_mint_from_seed(&self, seed: &[u8; 32]) -> Result<Pubkey> {
        self.derive_mint_address(seed)
    }

    pub async fn fetch_pool_info(&self, seed: &[u8; 32]) -> Result<PoolInfo> {
        let address = self.derive_pool_address(seed)?;
        let mint_key = self.derive_mint_address(seed)?;
        let data = self
            .connection
            .get_account_data(&address)
            .await?
            .ok_or(PoolError::PoolUnavailable(address))?;

        let (header, authorized_markets, assets) = decode_pool(&data)?;
        debug!(
            "Pool {}: {} markets, {} assets, {} bytes",
            address,
            authorized_markets.len(),
            assets.len(),
            data.len()
        );

        Ok(PoolInfo {
            address,
            mint_key,
            header,
            authorized_markets,
            assets,
        })
    }

    /// Pool-token supply and the live amount held for each asset, in asset order
    pub async fn fetch_pool_balances(&self, seed: &[u8; 32]) -> Result<(u64, Vec<PoolAssetBalance>)> {
        let pool = self.fetch_pool_info(seed).await?;
        let pool_address = pool.address;
        let balances = try_join_all(pool.assets.iter().map(|asset| async move {
            let holding = associated_token_address(&pool_address, &asset.mint);
            let account = self
                .connection
                .get_token_account(&holding)
                .await?
                .ok_or(PoolError::AccountUnavailable(holding))?;
            Ok::<_, PoolError>(PoolAssetBalance {
                mint: asset.mint,
                amount: account.amount,
            })
        }))
        .await?;
        let total_supply = self.connection.get_token_supply(&pool.mint_key).await?;
        Ok((total_supply, balances))
    }

    /// Seeds of every pool, or only of those run by `signal_provider`
    pub async fn get_pools_seeds_by_sig_provider(&self, signal_provider: Option<&Pubkey>) -> Result<Vec<[u8; 32]>> {
        let filters: Vec<AccountFilter> = signal_provider
            .map(|key| AccountFilter::Memcmp {
                offset: SIGNAL_PROVIDER_OFFSET,
                bytes: key.to_bytes().to_vec(),
            })
            .into_iter()
            .collect();
        let accounts = self
            .connection
            .get_program_accounts(&self.ids.pool_program_id, &filters)
            .await?;

        let mut seeds = Vec::with_capacity(accounts.len());
        for (address, data) in accounts {
            match PoolHeader::decode(&data) {
                Ok(header) => seeds.push(header.seed),
                Err(e) => warn!("Skipping program account {}: {}", address, e),
            }
        }
        Ok(seeds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::pool::tests::{encode_pool, sample_header};
    use crate::models::PoolAsset;
    use crate::testing::{sample_ids, seed_for, MockConnection};

    #[test]
    fn test_addresses_are_deterministic() {
        let ids = sample_ids();
        let seed = seed_for(&ids.pool_program_id, 7);
        let connection = MockConnection::new();
        let reader = PoolReader::new(&connection, ids);

        let pool = reader.derive_pool_address(&seed).unwrap();
        assert_eq!(pool, reader.derive_pool_address(&seed).unwrap());
        assert_eq!(pool, derive_pool_address(&ids.pool_program_id, &seed).unwrap());
        assert_eq!(
            reader.get_pool_token_mint_from_seed(&seed).unwrap(),
            reader.derive_mint_address(&seed).unwrap()
        );
        assert_ne!(pool, reader.derive_mint_address(&seed).unwrap());
    }

    #[tokio::test]
    async fn test_fetch_pool_info() {
        let ids = sample_ids();
        let seed = seed_for(&ids.pool_program_id, 1);
        let connection = MockConnection::new();
        let reader = PoolReader::new(&connection, ids);

        let signal_provider = Pubkey::new_unique();
        let header = sample_header(seed, signal_provider, 2);
        let markets = [Pubkey::new_unique(), Pubkey::new_unique()];
        let mint = Pubkey::new_unique();
        let assets = [PoolAsset { mint, amount: 1000 }];
        let address = reader.derive_pool_address(&seed).unwrap();
        connection.set_account(address, encode_pool(&header, &markets, &assets, 2));

        let info = reader.fetch_pool_info(&seed).await.unwrap();
        assert_eq!(info.address, address);
        assert_eq!(info.authorized_markets, markets.to_vec());
        assert_eq!(info.asset_mints(), vec![mint]);
        assert_eq!(info.header.fee_ratio, 50);
        assert_eq!(info.header.signal_provider, signal_provider);
    }

    #[tokio::test]
    async fn test_missing_or_truncated_pool() {
        let ids = sample_ids();
        let seed = seed_for(&ids.pool_program_id, 2);
        let connection = MockConnection::new();
        let reader = PoolReader::new(&connection, ids);
        let address = reader.derive_pool_address(&seed).unwrap();

        assert!(matches!(
            reader.fetch_pool_info(&seed).await,
            Err(PoolError::PoolUnavailable(a)) if a == address
        ));

        connection.set_account(address, vec![0u8; 40]);
        assert!(matches!(
            reader.fetch_pool_info(&seed).await,
            Err(PoolError::Decoding(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_pool_balances() {
        let ids = sample_ids();
        let seed = seed_for(&ids.pool_program_id, 3);
        let connection = MockConnection::new();
        let reader = PoolReader::new(&connection, ids);

        let mints = [Pubkey::new_unique(), Pubkey::new_unique()];
        let header = sample_header(seed, Pubkey::new_unique(), 0);
        let assets: Vec<PoolAsset> = mints.iter().map(|&mint| PoolAsset { mint, amount: 0 }).collect();
        let pool = reader.derive_pool_address(&seed).unwrap();
        connection.set_account(pool, encode_pool(&header, &[], &assets, 0));
        connection.set_token_balance(&pool, &mints[0], 1000);
        connection.set_mint_supply(reader.derive_mint_address(&seed).unwrap(), 42);

        // second holding missing
        let err = reader.fetch_pool_balances(&seed).await.unwrap_err();
        assert!(matches!(err, PoolError::AccountUnavailable(a) if a == associated_token_address(&pool, &mints[1])));

        connection.set_token_balance(&pool, &mints[1], 250);
        let (supply, balances) = reader.fetch_pool_balances(&seed).await.unwrap();
        assert_eq!(supply, 42);
        assert_eq!(
            balances,
            vec![
                PoolAssetBalance { mint: mints[0], amount: 1000 },
                PoolAssetBalance { mint: mints[1], amount: 250 },
            ]
        );
    }

    #[tokio::test]
    async fn test_seeds_by_signal_provider() {
        let ids = sample_ids();
        let connection = MockConnection::new();
        let reader = PoolReader::new(&connection, ids);

        let provider = Pubkey::new_unique();
        let mine = [seed_for(&ids.pool_program_id, 10), seed_for(&ids.pool_program_id, 11)];
        let other = seed_for(&ids.pool_program_id, 12);
        for seed in mine {
            let header = sample_header(seed, provider, 0);
            connection.add_program_account(ids.pool_program_id, Pubkey::new_unique(), encode_pool(&header, &[], &[], 1));
        }
        let header = sample_header(other, Pubkey::new_unique(), 0);
        connection.add_program_account(ids.pool_program_id, Pubkey::new_unique(), encode_pool(&header, &[], &[], 1));

        let seeds = reader.get_pools_seeds_by_sig_provider(Some(&provider)).await.unwrap();
        assert_eq!(seeds, mine.to_vec());

        let all = reader.get_pools_seeds_by_sig_provider(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.contains(&other));
    }
}
