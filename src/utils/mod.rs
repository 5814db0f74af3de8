mod format;

pub use format::{format_order, format_pubkey, format_seed, format_status};
