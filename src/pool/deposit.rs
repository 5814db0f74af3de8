//! Deposit into a pool with a single token.
//!
//! The source token is sold for the settlement asset, which is then spent on
//! every pool asset in proportion to the pool's current holdings before the
//! pool's deposit instruction is sent. Each step is a state of
//! [`SingleTokenDeposit`]; a failed step leaves the state where it was, so the
//! caller can inspect how far the deposit got and retry from there. Nothing is
//! rolled back.
//!
//! Placing an order and settling it are separate steps. Once an order is
//! placed the state records it, and a retry only waits for and settles fills.

use log::{info, warn};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;

use crate::error::{PoolError, Result};
use crate::instruction::{deposit, FeeTargets};
use crate::models::{MarketState, OrderType, PoolInfo, Side};
use crate::pool::accounts::missing_associated_accounts;
use crate::pool::reader::PoolReader;
use crate::serum::{wait_for_unsettled_funds, NewOrder, OrderVenue, PollConfig};
use crate::solana::{associated_token_address, ChainConnection, TokenAccount, Wallet};

/// Below mid price when selling the source token
pub const SELL_DISCOUNT: f64 = 0.05;
/// Above mid price when buying pool assets
pub const BUY_PREMIUM: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositRequest {
    pub pool_seed: [u8; 32],
    /// Token account of the depositor holding the source token
    pub source: Pubkey,
    pub amount: u64,
}

/// A buy order for one pool asset
#[derive(Debug, Clone, PartialEq)]
pub struct Purchase {
    pub mint: Pubkey,
    pub market: MarketState,
    pub order: NewOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DepositState {
    ResolvingPool,
    Converting {
        pool: PoolInfo,
        source: TokenAccount,
        settlement_before: u64,
    },
    /// The sell order is placed on `market`
    AwaitingConversionFill {
        pool: PoolInfo,
        source: TokenAccount,
        settlement_before: u64,
        market: MarketState,
    },
    VerifyingConversion {
        pool: PoolInfo,
        source: TokenAccount,
        settlement_before: u64,
    },
    /// `budget` is the settlement-asset amount available for rebalancing
    ProvisioningAccounts { pool: PoolInfo, budget: u64 },
    Rebalancing { pool: PoolInfo, budget: u64 },
    /// One order of `pending` is placed per step
    PlacingBuys {
        pool: PoolInfo,
        pending: Vec<Purchase>,
        placed: Vec<Purchase>,
        pool_token_amount: u64,
    },
    /// One market of `unsettled` is settled per step
    AwaitingRebalanceFills {
        pool: PoolInfo,
        unsettled: Vec<Purchase>,
        pool_token_amount: u64,
    },
    Depositing { pool: PoolInfo, pool_token_amount: u64 },
    Done { signature: Signature, pool_token_amount: u64 },
}

impl DepositState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ResolvingPool => "resolving pool",
            Self::Converting { .. } => "converting",
            Self::AwaitingConversionFill { .. } => "awaiting conversion fill",
            Self::VerifyingConversion { .. } => "verifying conversion",
            Self::ProvisioningAccounts { .. } => "provisioning accounts",
            Self::Rebalancing { .. } => "rebalancing",
            Self::PlacingBuys { .. } => "placing buys",
            Self::AwaitingRebalanceFills { .. } => "awaiting rebalance fills",
            Self::Depositing { .. } => "depositing",
            Self::Done { .. } => "done",
        }
    }
}

/// Amount the source balance dropped by, failing when it is less than `amount`
pub fn verify_conversion(balance_before: u64, balance_after: u64, amount: u64) -> Result<u64> {
    let spent = balance_before.saturating_sub(balance_after);
    if spent < amount {
        return Err(PoolError::ConversionNotMatched {
            spent,
            expected: amount,
        });
    }
    Ok(spent)
}

/// Pool tokens a deposit of `acquired` units may claim, given `(pool_balance,
/// acquired)` for every bought asset: `total_supply / max(pool_balance / acquired)`.
pub fn pool_token_claim(total_supply: u64, legs: &[(u64, u64)]) -> u64 {
    if legs.is_empty() {
        return 0;
    }
    legs.iter()
        .map(|&(pool_balance, acquired)| {
            if pool_balance == 0 {
                return u64::MAX;
            }
            let claim = total_supply as u128 * acquired as u128 / pool_balance as u128;
            claim.min(u64::MAX as u128) as u64
        })
        .min()
        .unwrap_or(0)
}

struct Leg {
    mint: Pubkey,
    pool_balance: u64,
    market: Option<MarketState>,
    price: f64,
}

pub struct SingleTokenDeposit<'a, C, V>
where
    C: ChainConnection + ?Sized,
    V: OrderVenue + ?Sized,
{
    reader: PoolReader<'a, C>,
    venue: &'a V,
    wallet: &'a Wallet,
    poll: PollConfig,
    request: DepositRequest,
    state: DepositState,
}

impl<'a, C, V> SingleTokenDeposit<'a, C, V>
where
    C: ChainConnection + ?Sized,
    V: OrderVenue + ?Sized,
{
    pub fn new(
        reader: PoolReader<'a, C>,
        venue: &'a V,
        wallet: &'a Wallet,
        poll: PollConfig,
        request: DepositRequest,
    ) -> Self {
        Self {
            reader,
            venue,
            wallet,
            poll,
            request,
            state: DepositState::ResolvingPool,
        }
    }

    pub fn state(&self) -> &DepositState {
        &self.state
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, DepositState::Done { .. })
    }

    /// Run the current step. On error the state is left unchanged.
    pub async fn advance(&mut self) -> Result<&DepositState> {
        let next = self.step().await?;
        if next.name() != self.state.name() {
            info!("Deposit: {} -> {}", self.state.name(), next.name());
        }
        self.state = next;
        Ok(&self.state)
    }

    /// Advance until done, returning the deposit signature and the pool tokens claimed
    pub async fn run(mut self) -> Result<(Signature, u64)> {
        loop {
            if let DepositState::Done {
                signature,
                pool_token_amount,
            } = self.advance().await?
            {
                return Ok((*signature, *pool_token_amount));
            }
        }
    }

    fn settlement_mint(&self) -> Pubkey {
        self.reader.ids().settlement_mint
    }

    fn settlement_account(&self) -> Pubkey {
        associated_token_address(&self.wallet.pubkey(), &self.settlement_mint())
    }

    async fn step(&self) -> Result<DepositState> {
        match &self.state {
            DepositState::ResolvingPool => self.resolve().await,
            DepositState::Converting {
                pool,
                source,
                settlement_before,
            } => {
                let market = self.sell(source).await?;
                Ok(DepositState::AwaitingConversionFill {
                    pool: pool.clone(),
                    source: *source,
                    settlement_before: *settlement_before,
                    market,
                })
            }
            DepositState::AwaitingConversionFill {
                pool,
                source,
                settlement_before,
                market,
            } => {
                self.settle_fills(market, &source.address, &self.settlement_account())
                    .await?;
                Ok(DepositState::VerifyingConversion {
                    pool: pool.clone(),
                    source: *source,
                    settlement_before: *settlement_before,
                })
            }
            DepositState::VerifyingConversion {
                pool,
                source,
                settlement_before,
            } => self.verify(pool, source, *settlement_before).await,
            DepositState::ProvisioningAccounts { pool, budget } => {
                self.provision(pool).await?;
                Ok(DepositState::Rebalancing {
                    pool: pool.clone(),
                    budget: *budget,
                })
            }
            DepositState::Rebalancing { pool, budget } => {
                let (purchases, pool_token_amount) = self.plan(pool, *budget).await?;
                if purchases.is_empty() {
                    return Ok(DepositState::Depositing {
                        pool: pool.clone(),
                        pool_token_amount,
                    });
                }
                Ok(DepositState::PlacingBuys {
                    pool: pool.clone(),
                    pending: purchases,
                    placed: Vec::new(),
                    pool_token_amount,
                })
            }
            DepositState::PlacingBuys {
                pool,
                pending,
                placed,
                pool_token_amount,
            } => {
                let mut placed = placed.clone();
                if let Some((next, rest)) = pending.split_first() {
                    self.buy(next).await?;
                    placed.push(next.clone());
                    if !rest.is_empty() {
                        return Ok(DepositState::PlacingBuys {
                            pool: pool.clone(),
                            pending: rest.to_vec(),
                            placed,
                            pool_token_amount: *pool_token_amount,
                        });
                    }
                }
                Ok(DepositState::AwaitingRebalanceFills {
                    pool: pool.clone(),
                    unsettled: placed,
                    pool_token_amount: *pool_token_amount,
                })
            }
            DepositState::AwaitingRebalanceFills {
                pool,
                unsettled,
                pool_token_amount,
            } => {
                if let Some((next, rest)) = unsettled.split_first() {
                    let owner = self.wallet.pubkey();
                    self.settle_fills(
                        &next.market,
                        &associated_token_address(&owner, &next.mint),
                        &self.settlement_account(),
                    )
                    .await?;
                    if !rest.is_empty() {
                        return Ok(DepositState::AwaitingRebalanceFills {
                            pool: pool.clone(),
                            unsettled: rest.to_vec(),
                            pool_token_amount: *pool_token_amount,
                        });
                    }
                }
                Ok(DepositState::Depositing {
                    pool: pool.clone(),
                    pool_token_amount: *pool_token_amount,
                })
            }
            DepositState::Depositing {
                pool,
                pool_token_amount,
            } => {
                let signature = self.deposit(pool, *pool_token_amount).await?;
                Ok(DepositState::Done {
                    signature,
                    pool_token_amount: *pool_token_amount,
                })
            }
            DepositState::Done { .. } => Ok(self.state.clone()),
        }
    }

    async fn resolve(&self) -> Result<DepositState> {
        let connection = self.reader.connection();
        let pool = self
            .reader
            .fetch_pool_info(&self.request.pool_seed)
            .await
            .map_err(|e| match e {
                PoolError::PoolUnavailable(address) => PoolError::AccountUnavailable(address),
                e => e,
            })?;
        let source = connection
            .get_token_account(&self.request.source)
            .await?
            .ok_or(PoolError::AccountUnavailable(self.request.source))?;

        if source.mint == self.settlement_mint() {
            return Ok(DepositState::ProvisioningAccounts {
                pool,
                budget: self.request.amount,
            });
        }

        let settlement_before = connection
            .get_token_account(&self.settlement_account())
            .await?
            .map_or(0, |account| account.amount);
        Ok(DepositState::Converting {
            pool,
            source,
            settlement_before,
        })
    }

    async fn market_for(&self, base_mint: &Pubkey) -> Result<MarketState> {
        let quote_mint = self.settlement_mint();
        let listing = self
            .venue
            .find_market(base_mint, &quote_mint)
            .await?
            .ok_or(PoolError::NoMarket {
                base: *base_mint,
                quote: quote_mint,
            })?;
        if listing.deprecated {
            return Err(PoolError::MarketDeprecated(listing.address));
        }
        self.venue.load_market(&listing.address).await
    }

    /// Mid price of `market`, rejecting an empty or broken book
    async fn mid_price(&self, market: &MarketState) -> Result<f64> {
        let price = self.venue.mid_price(market).await?;
        if !price.is_finite() || price <= 0.0 {
            return Err(PoolError::InvalidPrice {
                market: market.address,
                price,
            });
        }
        Ok(price)
    }

    async fn settle_fills(&self, market: &MarketState, base_wallet: &Pubkey, quote_wallet: &Pubkey) -> Result<()> {
        let owner = self.wallet.pubkey();
        let open_orders = wait_for_unsettled_funds(self.venue, market, &owner, self.poll).await?;
        for account in open_orders.iter().filter(|o| o.has_unsettled_funds()) {
            let signature = self
                .venue
                .settle_funds(self.wallet, market, account, base_wallet, quote_wallet)
                .await?;
            info!("Settled {} on market {}: {}", account.address, market.address, signature);
        }
        Ok(())
    }

    /// Place the sell order for the source token and return its market
    async fn sell(&self, source: &TokenAccount) -> Result<MarketState> {
        let market = self.market_for(&source.mint).await?;
        let mid = self.mid_price(&market).await?;

        let create = missing_associated_accounts(
            self.reader.connection(),
            &self.wallet.pubkey(),
            &[(self.wallet.pubkey(), self.settlement_mint())],
        )
        .await?;
        if !create.is_empty() {
            self.reader.connection().send_instructions(self.wallet, &create).await?;
        }

        let order = NewOrder {
            side: Side::Ask,
            limit_price: mid * (1.0 - SELL_DISCOUNT),
            base_quantity: self.request.amount,
            order_type: OrderType::ImmediateOrCancel,
            payer: source.address,
        };
        let signature = self.venue.place_order(self.wallet, &market, &order).await?;
        info!(
            "Selling {} of {} on market {} at {}: {}",
            order.base_quantity, source.mint, market.address, order.limit_price, signature
        );
        Ok(market)
    }

    async fn verify(&self, pool: &PoolInfo, source: &TokenAccount, settlement_before: u64) -> Result<DepositState> {
        let connection = self.reader.connection();
        let after = connection
            .get_token_account(&source.address)
            .await?
            .ok_or(PoolError::AccountUnavailable(source.address))?;
        let spent = verify_conversion(source.amount, after.amount, self.request.amount)?;

        let settlement_account = self.settlement_account();
        let settlement_after = connection
            .get_token_account(&settlement_account)
            .await?
            .ok_or(PoolError::AccountUnavailable(settlement_account))?;
        let budget = settlement_after.amount.saturating_sub(settlement_before);
        info!("Converted {} of {} into {} settlement units", spent, source.mint, budget);

        Ok(DepositState::ProvisioningAccounts {
            pool: pool.clone(),
            budget,
        })
    }

    async fn provision(&self, pool: &PoolInfo) -> Result<()> {
        let owner = self.wallet.pubkey();
        let pairs: Vec<(Pubkey, Pubkey)> = pool.assets.iter().map(|asset| (owner, asset.mint)).collect();
        let create = missing_associated_accounts(self.reader.connection(), &owner, &pairs).await?;
        if !create.is_empty() {
            let signature = self.reader.connection().send_instructions(self.wallet, &create).await?;
            info!("Created {} asset accounts: {}", create.len(), signature);
        }
        Ok(())
    }

    /// Split `budget` over the pool's held assets by value. Returns the buy
    /// orders to place and the pool tokens the result supports.
    async fn plan(&self, pool: &PoolInfo, budget: u64) -> Result<(Vec<Purchase>, u64)> {
        let (total_supply, balances) = self.reader.fetch_pool_balances(&self.request.pool_seed).await?;
        let settlement_mint = self.settlement_mint();

        let mut legs = Vec::with_capacity(balances.len());
        for balance in balances.iter().filter(|b| b.amount > 0) {
            if balance.mint == settlement_mint {
                legs.push(Leg {
                    mint: balance.mint,
                    pool_balance: balance.amount,
                    market: None,
                    price: 1.0,
                });
                continue;
            }
            let market = self.market_for(&balance.mint).await?;
            let price = self.mid_price(&market).await?;
            legs.push(Leg {
                mint: balance.mint,
                pool_balance: balance.amount,
                market: Some(market),
                price,
            });
        }

        let total_weight: f64 = legs.iter().map(|leg| leg.pool_balance as f64 * leg.price).sum();
        if legs.is_empty() || total_weight <= 0.0 {
            return Err(PoolError::EmptyPool(pool.address));
        }

        let quote_wallet = self.settlement_account();
        let mut acquired = Vec::with_capacity(legs.len());
        let mut purchases = Vec::new();
        for leg in legs {
            let share = budget as f64 * (leg.pool_balance as f64 * leg.price) / total_weight;
            let Some(market) = leg.market else {
                acquired.push((leg.pool_balance, share.floor() as u64));
                continue;
            };

            let limit_price = leg.price * (1.0 + BUY_PREMIUM);
            let quantity = (share / limit_price).floor() as u64;
            acquired.push((leg.pool_balance, quantity));
            if quantity == 0 {
                warn!("Share of {} too small to buy any", leg.mint);
                continue;
            }
            purchases.push(Purchase {
                mint: leg.mint,
                market,
                order: NewOrder {
                    side: Side::Bid,
                    limit_price,
                    base_quantity: quantity,
                    order_type: OrderType::ImmediateOrCancel,
                    payer: quote_wallet,
                },
            });
        }

        Ok((purchases, pool_token_claim(total_supply, &acquired)))
    }

    async fn buy(&self, purchase: &Purchase) -> Result<()> {
        let signature = self
            .venue
            .place_order(self.wallet, &purchase.market, &purchase.order)
            .await?;
        info!(
            "Buying {} of {} at {}: {}",
            purchase.order.base_quantity, purchase.mint, purchase.order.limit_price, signature
        );
        Ok(())
    }

    async fn deposit(&self, pool: &PoolInfo, pool_token_amount: u64) -> Result<Signature> {
        let connection = self.reader.connection();
        let ids = self.reader.ids();
        let owner = self.wallet.pubkey();
        let mint = pool.mint_key;

        let recipients = [
            (owner, mint),
            (pool.header.signal_provider, mint),
            (ids.fee_recipient, mint),
            (ids.buy_and_burn_recipient, mint),
        ];
        let create = missing_associated_accounts(connection, &owner, &recipients).await?;
        if !create.is_empty() {
            let signature = connection.send_instructions(self.wallet, &create).await?;
            info!("Created {} pool token accounts: {}", create.len(), signature);
        }

        let fee_targets = FeeTargets {
            signal_provider: associated_token_address(&pool.header.signal_provider, &mint),
            fee_collection: associated_token_address(&ids.fee_recipient, &mint),
            buy_and_burn: associated_token_address(&ids.buy_and_burn_recipient, &mint),
        };
        let pool_asset_keys: Vec<Pubkey> = pool
            .assets
            .iter()
            .map(|asset| associated_token_address(&pool.address, &asset.mint))
            .collect();
        let source_asset_keys: Vec<Pubkey> = pool
            .assets
            .iter()
            .map(|asset| associated_token_address(&owner, &asset.mint))
            .collect();

        let instruction = deposit(
            &ids.pool_program_id,
            &mint,
            &pool.address,
            &pool_asset_keys,
            &associated_token_address(&owner, &mint),
            &fee_targets,
            &owner,
            &source_asset_keys,
            pool.seed(),
            pool_token_amount,
        );
        let signature = connection.send_instructions(self.wallet, &[instruction]).await?;
        info!("Deposited for {} pool tokens of {}: {}", pool_token_amount, pool.address, signature);
        Ok(signature)
    }
}

/// Deposit `request.amount` of the source token into a pool in one call
pub async fn single_token_deposit<C, V>(
    reader: PoolReader<'_, C>,
    venue: &V,
    wallet: &Wallet,
    poll: PollConfig,
    request: DepositRequest,
) -> Result<(Signature, u64)>
where
    C: ChainConnection + ?Sized,
    V: OrderVenue + ?Sized,
{
    SingleTokenDeposit::new(reader, venue, wallet, poll, request).run().await
}
