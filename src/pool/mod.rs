//! Pool workflows: reading pool state, settling, depositing, redeeming and
//! reconstructing order history.

pub mod accounts;
pub mod deposit;
pub mod history;
pub mod reader;
pub mod redeem;
pub mod settle;

pub use accounts::missing_associated_accounts;
pub use deposit::{single_token_deposit, DepositRequest, DepositState, SingleTokenDeposit};
pub use history::get_pool_order_infos;
pub use reader::{derive_mint_address, derive_pool_address, PoolReader};
pub use redeem::redeem;
pub use settle::{settle_instructions, settle_pool};
