mod types;

pub use types::{load_config, Config, ProgramIds, DEFAULT_SERUM_PROGRAM_ID, DEFAULT_SETTLEMENT_MINT};
