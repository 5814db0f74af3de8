//! In-memory chain and venue used by the unit tests.

use async_trait::async_trait;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::ProgramIds;
use crate::error::{PoolError, Result};
use crate::models::{MarketState, OpenOrders, Side};
use crate::pool::{derive_mint_address, derive_pool_address};
use crate::serum::{MarketListing, MarketReader, NewOrder, OrderVenue};
use crate::solana::{
    associated_token_address, AccountFilter, ChainConnection, SignatureInfo, TokenAccount, TransactionRecord,
};
use crate::solana::Wallet;

pub fn sample_ids() -> ProgramIds {
    ProgramIds {
        pool_program_id: Pubkey::new_unique(),
        serum_program_id: Pubkey::new_unique(),
        settlement_mint: Pubkey::new_unique(),
        fee_recipient: Pubkey::new_unique(),
        buy_and_burn_recipient: Pubkey::new_unique(),
    }
}

/// A seed whose pool and mint addresses both derive under `program_id`
pub fn seed_for(program_id: &Pubkey, tag: u8) -> [u8; 32] {
    let mut seed = [tag; 32];
    for counter in 0u16.. {
        seed[30..].copy_from_slice(&counter.to_le_bytes());
        if derive_pool_address(program_id, &seed).is_ok() && derive_mint_address(program_id, &seed).is_ok() {
            break;
        }
    }
    seed
}

fn missing(what: &str) -> PoolError {
    ClientError::from(ClientErrorKind::Custom(format!("mock: {}", what))).into()
}

#[derive(Default)]
struct ChainState {
    accounts: HashMap<Pubkey, Vec<u8>>,
    token_accounts: HashMap<Pubkey, TokenAccount>,
    supplies: HashMap<Pubkey, u64>,
    program_accounts: Vec<(Pubkey, Pubkey, Vec<u8>)>,
    signatures: HashMap<Pubkey, Vec<SignatureInfo>>,
    transactions: HashMap<Signature, TransactionRecord>,
    sent: Vec<Vec<Instruction>>,
}

#[derive(Default)]
pub struct MockConnection {
    state: Mutex<ChainState>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_account(&self, address: Pubkey, data: Vec<u8>) {
        self.state.lock().unwrap().accounts.insert(address, data);
    }

    pub fn add_program_account(&self, program_id: Pubkey, address: Pubkey, data: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .program_accounts
            .push((program_id, address, data));
    }

    pub fn set_token_account(&self, account: TokenAccount) {
        self.state
            .lock()
            .unwrap()
            .token_accounts
            .insert(account.address, account);
    }

    /// Put `amount` in the associated account of `owner` for `mint`
    pub fn set_token_balance(&self, owner: &Pubkey, mint: &Pubkey, amount: u64) -> Pubkey {
        let address = associated_token_address(owner, mint);
        self.set_token_account(TokenAccount {
            address,
            mint: *mint,
            owner: *owner,
            amount,
        });
        address
    }

    pub fn token_amount(&self, address: &Pubkey) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .token_accounts
            .get(address)
            .map(|account| account.amount)
    }

    pub fn adjust_token_amount(&self, address: &Pubkey, delta: i128) {
        let mut state = self.state.lock().unwrap();
        let account = state.token_accounts.get_mut(address).unwrap();
        account.amount = (account.amount as i128 + delta) as u64;
    }

    pub fn set_mint_supply(&self, mint: Pubkey, supply: u64) {
        self.state.lock().unwrap().supplies.insert(mint, supply);
    }

    /// Record `transaction` as the most recent one touching `address`
    pub fn add_transaction(&self, address: Pubkey, transaction: TransactionRecord) {
        let mut state = self.state.lock().unwrap();
        state.signatures.entry(address).or_default().insert(
            0,
            SignatureInfo {
                signature: transaction.signature,
                slot: transaction.slot,
                failed: transaction.failed,
            },
        );
        state.transactions.insert(transaction.signature, transaction);
    }

    pub fn sent(&self) -> Vec<Vec<Instruction>> {
        self.state.lock().unwrap().sent.clone()
    }
}

fn matches_filter(data: &[u8], filter: &AccountFilter) -> bool {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => data.get(*offset..offset + bytes.len()) == Some(bytes.as_slice()),
        AccountFilter::DataSize(size) => data.len() as u64 == *size,
    }
}

#[async_trait]
impl ChainConnection for MockConnection {
    async fn get_account_data(&self, address: &Pubkey) -> Result<Option<Vec<u8>>> {
        let state = self.state.lock().unwrap();
        if let Some(data) = state.accounts.get(address) {
            return Ok(Some(data.clone()));
        }
        Ok(state
            .token_accounts
            .get(address)
            .map(|_| vec![0u8; 165]))
    }

    async fn get_token_account(&self, address: &Pubkey) -> Result<Option<TokenAccount>> {
        Ok(self.state.lock().unwrap().token_accounts.get(address).copied())
    }

    async fn get_token_supply(&self, mint: &Pubkey) -> Result<u64> {
        self.state
            .lock()
            .unwrap()
            .supplies
            .get(mint)
            .copied()
            .ok_or_else(|| missing("mint"))
    }

    async fn get_signatures_for_address(&self, address: &Pubkey, limit: usize) -> Result<Vec<SignatureInfo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .signatures
            .get(address)
            .map(|signatures| signatures.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_transaction(&self, signature: &Signature) -> Result<TransactionRecord> {
        self.state
            .lock()
            .unwrap()
            .transactions
            .get(signature)
            .cloned()
            .ok_or_else(|| missing("transaction"))
    }

    async fn get_program_accounts(
        &self,
        program_id: &Pubkey,
        filters: &[AccountFilter],
    ) -> Result<Vec<(Pubkey, Vec<u8>)>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .program_accounts
            .iter()
            .filter(|(owner, _, data)| owner == program_id && filters.iter().all(|f| matches_filter(data, f)))
            .map(|(_, address, data)| (*address, data.clone()))
            .collect())
    }

    async fn send_instructions(&self, _wallet: &Wallet, instructions: &[Instruction]) -> Result<Signature> {
        let mut state = self.state.lock().unwrap();
        for ix in instructions {
            // associated account creation: [funding, account, owner, mint, ..]
            if ix.program_id == spl_associated_token_account::id() {
                let address = ix.accounts[1].pubkey;
                state.token_accounts.entry(address).or_insert(TokenAccount {
                    address,
                    mint: ix.accounts[3].pubkey,
                    owner: ix.accounts[2].pubkey,
                    amount: 0,
                });
            }
        }
        state.sent.push(instructions.to_vec());
        Ok(Signature::new_unique())
    }
}

#[derive(Default)]
struct VenueState {
    markets: HashMap<Pubkey, (MarketState, bool, f64)>,
    open_orders: HashMap<(Pubkey, Pubkey), OpenOrders>,
    scheduled: HashMap<(Pubkey, Pubkey), (u32, u64, u64)>,
    silent: Vec<Pubkey>,
    placed: Vec<(Pubkey, NewOrder)>,
    settled: Vec<Pubkey>,
}

/// Venue filling every order in full at the mid price. Fills land in the
/// wallet's open orders and move into its token accounts on settlement.
#[derive(Default)]
pub struct MockVenue {
    chain: Option<Arc<MockConnection>>,
    state: Mutex<VenueState>,
}

impl MockVenue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chain(chain: Arc<MockConnection>) -> Self {
        Self {
            chain: Some(chain),
            state: Mutex::default(),
        }
    }

    pub fn add_market(&self, market: MarketState, deprecated: bool, mid_price: f64) {
        self.state
            .lock()
            .unwrap()
            .markets
            .insert(market.address, (market, deprecated, mid_price));
    }

    /// Orders on `market` never fill
    pub fn silence(&self, market: &Pubkey) {
        self.state.lock().unwrap().silent.push(*market);
    }

    /// Funds appear in `owner`'s open orders on the `polls`-th lookup
    pub fn credit_after_polls(&self, market: &Pubkey, owner: &Pubkey, polls: u32, coin: u64, pc: u64) {
        self.state
            .lock()
            .unwrap()
            .scheduled
            .insert((*market, *owner), (polls, coin, pc));
    }

    pub fn placed(&self) -> Vec<(Pubkey, NewOrder)> {
        self.state.lock().unwrap().placed.clone()
    }

    pub fn settled(&self) -> Vec<Pubkey> {
        self.state.lock().unwrap().settled.clone()
    }

    fn credit(state: &mut VenueState, market: Pubkey, owner: Pubkey, coin: u64, pc: u64) {
        let open_orders = state.open_orders.entry((market, owner)).or_insert(OpenOrders {
            address: Pubkey::new_unique(),
            market,
            owner,
            native_coin_free: 0,
            native_coin_total: 0,
            native_pc_free: 0,
            native_pc_total: 0,
        });
        open_orders.native_coin_free += coin;
        open_orders.native_coin_total += coin;
        open_orders.native_pc_free += pc;
        open_orders.native_pc_total += pc;
    }
}

#[async_trait]
impl MarketReader for MockVenue {
    async fn load_market(&self, address: &Pubkey) -> Result<MarketState> {
        self.state
            .lock()
            .unwrap()
            .markets
            .get(address)
            .map(|(market, _, _)| market.clone())
            .ok_or(PoolError::AccountUnavailable(*address))
    }

    async fn find_open_orders(&self, market: &MarketState, owner: &Pubkey) -> Result<Vec<OpenOrders>> {
        let mut state = self.state.lock().unwrap();
        let key = (market.address, *owner);
        if let Some((polls, coin, pc)) = state.scheduled.get(&key).copied() {
            if polls <= 1 {
                state.scheduled.remove(&key);
                Self::credit(&mut state, market.address, *owner, coin, pc);
            } else {
                state.scheduled.insert(key, (polls - 1, coin, pc));
            }
        }
        Ok(state.open_orders.get(&key).cloned().into_iter().collect())
    }
}

#[async_trait]
impl OrderVenue for MockVenue {
    async fn find_market(&self, base_mint: &Pubkey, quote_mint: &Pubkey) -> Result<Option<MarketListing>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .markets
            .values()
            .find(|(market, _, _)| &market.coin_mint == base_mint && &market.pc_mint == quote_mint)
            .map(|(market, deprecated, _)| MarketListing {
                address: market.address,
                deprecated: *deprecated,
            }))
    }

    async fn mid_price(&self, market: &MarketState) -> Result<f64> {
        self.state
            .lock()
            .unwrap()
            .markets
            .get(&market.address)
            .map(|(_, _, price)| *price)
            .ok_or(PoolError::AccountUnavailable(market.address))
    }

    async fn place_order(&self, wallet: &Wallet, market: &MarketState, order: &NewOrder) -> Result<Signature> {
        let mut state = self.state.lock().unwrap();
        state.placed.push((market.address, *order));
        if state.silent.contains(&market.address) {
            return Ok(Signature::new_unique());
        }

        let mid = state.markets.get(&market.address).map(|(_, _, p)| *p).unwrap_or(1.0);
        let quote = (order.base_quantity as f64 * mid) as u64;
        let (paid, coin, pc) = match order.side {
            Side::Ask => (order.base_quantity, 0, quote),
            Side::Bid => (quote, order.base_quantity, 0),
        };
        if let Some(chain) = &self.chain {
            chain.adjust_token_amount(&order.payer, -(paid as i128));
        }
        Self::credit(&mut state, market.address, wallet.pubkey(), coin, pc);
        Ok(Signature::new_unique())
    }

    async fn settle_funds(
        &self,
        wallet: &Wallet,
        market: &MarketState,
        open_orders: &OpenOrders,
        base_wallet: &Pubkey,
        quote_wallet: &Pubkey,
    ) -> Result<Signature> {
        let mut state = self.state.lock().unwrap();
        state.settled.push(open_orders.address);
        if let Some(held) = state.open_orders.remove(&(market.address, wallet.pubkey())) {
            if let Some(chain) = &self.chain {
                chain.adjust_token_amount(base_wallet, held.native_coin_total as i128);
                chain.adjust_token_amount(quote_wallet, held.native_pc_total as i128);
            }
        }
        Ok(Signature::new_unique())
    }
}
