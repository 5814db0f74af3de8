use anyhow::{anyhow, Context};
use solana_account_decoder::UiAccountEncoding;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

use crate::solana::connection::AccountFilter;

pub(crate) fn to_rpc_filter(filter: &AccountFilter) -> RpcFilterType {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => RpcFilterType::Memcmp(Memcmp::new(
            *offset,
            MemcmpEncodedBytes::Base58(bs58::encode(bytes).into_string()),
        )),
        AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size),
    }
}

/// Program-account query returning base64 data. Nodes refuse base58 for
/// accounts over 128 bytes.
pub(crate) fn program_accounts_config(filters: &[AccountFilter], commitment: CommitmentConfig) -> RpcProgramAccountsConfig {
    RpcProgramAccountsConfig {
        filters: Some(filters.iter().map(to_rpc_filter).collect()),
        account_config: RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            data_slice: None,
            commitment: Some(commitment),
            min_context_slot: None,
        },
        with_context: None,
    }
}

/// Associated token account of `owner` for `mint`
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    spl_associated_token_account::get_associated_token_address(owner, mint)
}

/// Parse pubkey from string with helpful error message
pub fn parse_pubkey(pubkey_str: &str) -> anyhow::Result<Pubkey> {
    Pubkey::from_str(pubkey_str).with_context(|| format!("Failed to parse pubkey: {}", pubkey_str))
}

/// Parse a base58 pool seed
pub fn parse_seed(seed_str: &str) -> anyhow::Result<[u8; 32]> {
    let bytes = bs58::decode(seed_str)
        .into_vec()
        .with_context(|| format!("Failed to decode seed: {}", seed_str))?;
    bytes
        .try_into()
        .map_err(|bytes: Vec<u8>| anyhow!("Pool seed must be 32 bytes, got {}", bytes.len()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seed() {
        let seed = [42u8; 32];
        let encoded = bs58::encode(seed).into_string();
        assert_eq!(parse_seed(&encoded).unwrap(), seed);
        assert!(parse_seed(&bs58::encode([1u8; 31]).into_string()).is_err());
        assert!(parse_seed("0OIl").is_err());
    }

    #[test]
    fn test_memcmp_filter_is_base58() {
        let key = Pubkey::new_unique();
        let filter = to_rpc_filter(&AccountFilter::Memcmp {
            offset: 64,
            bytes: key.to_bytes().to_vec(),
        });
        assert_eq!(
            filter,
            RpcFilterType::Memcmp(Memcmp::new(64, MemcmpEncodedBytes::Base58(key.to_string())))
        );
        assert_eq!(to_rpc_filter(&AccountFilter::DataSize(3228)), RpcFilterType::DataSize(3228));
    }

    #[test]
    fn test_program_accounts_are_fetched_as_base64() {
        let config = program_accounts_config(&[AccountFilter::DataSize(3228)], CommitmentConfig::confirmed());
        assert_eq!(config.account_config.encoding, Some(UiAccountEncoding::Base64));
        assert_eq!(config.account_config.commitment, Some(CommitmentConfig::confirmed()));
        assert_eq!(config.filters, Some(vec![RpcFilterType::DataSize(3228)]));
    }
}
