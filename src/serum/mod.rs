pub mod markets;
pub mod poll;
pub mod venue;

pub use markets::SerumMarkets;
pub use poll::{wait_for_unsettled_funds, PollConfig};
pub use venue::{MarketListing, MarketReader, NewOrder, OrderVenue};
