use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::serum::poll::PollConfig;

/// Serum DEX v3 on mainnet
pub const DEFAULT_SERUM_PROGRAM_ID: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";
/// USDC, the asset every single-token deposit is routed through
pub const DEFAULT_SETTLEMENT_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

/// Configuration for the pool client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Solana RPC URL
    pub rpc_url: String,
    /// Wallet keypair path
    pub keypair_path: String,
    /// Pool program, owner of every pool account
    pub pool_program_id: String,
    pub serum_program_id: String,
    pub settlement_mint: String,
    /// Owner of the protocol fee pool-token account
    pub fee_recipient: String,
    /// Owner of the buy-and-burn pool-token account
    pub buy_and_burn_recipient: String,
    pub poll_interval_ms: u64,
    pub poll_max_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            keypair_path: "wallet-keypair.json".to_string(),
            pool_program_id: String::new(),
            serum_program_id: DEFAULT_SERUM_PROGRAM_ID.to_string(),
            settlement_mint: DEFAULT_SETTLEMENT_MINT.to_string(),
            fee_recipient: String::new(),
            buy_and_burn_recipient: String::new(),
            poll_interval_ms: 500,
            poll_max_attempts: 12,
        }
    }
}

/// On-chain identities the pool workflows are parameterized with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramIds {
    pub pool_program_id: Pubkey,
    pub serum_program_id: Pubkey,
    pub settlement_mint: Pubkey,
    pub fee_recipient: Pubkey,
    pub buy_and_burn_recipient: Pubkey,
}

fn parse_pubkey(name: &str, value: &str) -> Result<Pubkey> {
    Pubkey::from_str(value).with_context(|| format!("{} is not a valid pubkey: {:?}", name, value))
}

impl Config {
    /// Every identity, fee recipients included. Needed to deposit.
    pub fn program_ids(&self) -> Result<ProgramIds> {
        Ok(ProgramIds {
            fee_recipient: parse_pubkey("FEE_RECIPIENT", &self.fee_recipient)?,
            buy_and_burn_recipient: parse_pubkey("BUY_AND_BURN_RECIPIENT", &self.buy_and_burn_recipient)?,
            ..self.read_program_ids()?
        })
    }

    /// Identities for reading, settling and redeeming, which pay no fees.
    /// Fee recipients that are not configured are left as the default pubkey.
    pub fn read_program_ids(&self) -> Result<ProgramIds> {
        let optional = |name: &str, value: &str| {
            if value.is_empty() {
                Ok(Pubkey::default())
            } else {
                parse_pubkey(name, value)
            }
        };
        Ok(ProgramIds {
            pool_program_id: parse_pubkey("POOL_PROGRAM_ID", &self.pool_program_id)?,
            serum_program_id: parse_pubkey("SERUM_PROGRAM_ID", &self.serum_program_id)?,
            settlement_mint: parse_pubkey("SETTLEMENT_MINT", &self.settlement_mint)?,
            fee_recipient: optional("FEE_RECIPIENT", &self.fee_recipient)?,
            buy_and_burn_recipient: optional("BUY_AND_BURN_RECIPIENT", &self.buy_and_burn_recipient)?,
        })
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.poll_max_attempts,
        }
    }
}

/// Loads configuration from environment variables, falling back to default values
pub fn load_config() -> Result<Config> {
    let mut config = Config::default();

    let string_vars: [(&str, &mut String); 7] = [
        ("RPC_URL", &mut config.rpc_url),
        ("KEYPAIR_PATH", &mut config.keypair_path),
        ("POOL_PROGRAM_ID", &mut config.pool_program_id),
        ("SERUM_PROGRAM_ID", &mut config.serum_program_id),
        ("SETTLEMENT_MINT", &mut config.settlement_mint),
        ("FEE_RECIPIENT", &mut config.fee_recipient),
        ("BUY_AND_BURN_RECIPIENT", &mut config.buy_and_burn_recipient),
    ];
    for (name, slot) in string_vars {
        if let Ok(value) = env::var(name) {
            *slot = value;
        }
    }

    if let Ok(interval) = env::var("POLL_INTERVAL_MS") {
        config.poll_interval_ms = interval
            .parse()
            .with_context(|| format!("Invalid POLL_INTERVAL_MS: {}", interval))?;
    }

    if let Ok(attempts) = env::var("POLL_MAX_ATTEMPTS") {
        config.poll_max_attempts = attempts
            .parse()
            .with_context(|| format!("Invalid POLL_MAX_ATTEMPTS: {}", attempts))?;
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_ids_require_pool_program() {
        let config = Config::default();
        assert!(config.program_ids().is_err());

        let config = Config {
            pool_program_id: Pubkey::new_unique().to_string(),
            fee_recipient: Pubkey::new_unique().to_string(),
            buy_and_burn_recipient: Pubkey::new_unique().to_string(),
            ..Config::default()
        };
        let ids = config.program_ids().unwrap();
        assert_eq!(ids.serum_program_id.to_string(), DEFAULT_SERUM_PROGRAM_ID);
        assert_eq!(ids.settlement_mint.to_string(), DEFAULT_SETTLEMENT_MINT);
        assert_eq!(config.poll_config().max_attempts, 12);
    }

    #[test]
    fn test_fee_recipients_only_needed_for_deposits() {
        let config = Config {
            pool_program_id: Pubkey::new_unique().to_string(),
            ..Config::default()
        };
        assert!(config.program_ids().is_err());

        let ids = config.read_program_ids().unwrap();
        assert_eq!(ids.pool_program_id.to_string(), config.pool_program_id);
        assert_eq!(ids.fee_recipient, Pubkey::default());

        let config = Config {
            fee_recipient: "not a key".to_string(),
            ..config
        };
        assert!(config.read_program_ids().is_err());
    }
}
