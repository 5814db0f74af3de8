use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use log::{info, warn};
use solana_sdk::instruction::Instruction;

use pool_client::config::{load_config, Config, ProgramIds};
use pool_client::pool::{get_pool_order_infos, redeem, settle_pool, PoolReader};
use pool_client::serum::SerumMarkets;
use pool_client::solana::{
    create_client_from_config, load_wallet_from_config, parse_pubkey, parse_seed, ChainConnection, SolanaClient,
};
use pool_client::utils::{format_order, format_pubkey, format_seed, format_status};

/// Instructions sent per transaction when submitting settlements
const INSTRUCTIONS_PER_TRANSACTION: usize = 5;

#[derive(Parser)]
#[command(name = "pool-client", version, about = "Read, settle and redeem Bonfida bot pools")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a pool's header, markets and assets
    Info { seed: String },
    /// Show the pool-token supply and the pool's live asset balances
    Balances { seed: String },
    /// List the most recent orders placed by a pool
    Orders {
        seed: String,
        #[arg(short = 'n', long, default_value_t = 20)]
        count: usize,
    },
    /// List pool seeds, optionally only those of one signal provider
    Seeds {
        #[arg(long)]
        signal_provider: Option<String>,
    },
    /// Print the pool-token mint of a seed
    Mint { seed: String },
    /// Build settlement instructions for every open order of a pool
    Settle {
        seed: String,
        #[arg(long)]
        send: bool,
    },
    /// Redeem pool tokens held by the configured wallet
    Redeem {
        seed: String,
        amount: u64,
        #[arg(long)]
        send: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logger();

    let cli = Cli::parse();
    let config = load_config()?;
    let ids = config.read_program_ids().context("Incomplete configuration")?;
    let client = create_client_from_config(&config);

    run(cli.command, &config, ids, &client).await
}

async fn run(command: Command, config: &Config, ids: ProgramIds, client: &SolanaClient) -> Result<()> {
    let reader = PoolReader::new(client, ids);
    let markets = SerumMarkets::new(client, ids.serum_program_id);

    match command {
        Command::Info { seed } => {
            let info = reader.fetch_pool_info(&parse_seed(&seed)?).await?;
            println!("Pool:            {}", info.address);
            println!("Pool token mint: {}", info.mint_key);
            println!("Signal provider: {}", info.header.signal_provider);
            println!("Status:          {}", format_status(info.header.status));
            println!("Fee ratio:       {}", info.header.fee_ratio);
            println!("Fee period:      {}s", info.header.fee_collection_period);
            for (i, market) in info.authorized_markets.iter().enumerate() {
                println!("Market {:>3}:      {}", i, market);
            }
            for (i, asset) in info.assets.iter().enumerate() {
                println!("Asset {:>3}:       {}", i, asset.mint);
            }
        }
        Command::Balances { seed } => {
            let (supply, balances) = reader.fetch_pool_balances(&parse_seed(&seed)?).await?;
            println!("Pool token supply: {}", supply);
            for balance in balances {
                println!("{} {}", balance.mint, balance.amount);
            }
        }
        Command::Orders { seed, count } => {
            let orders = get_pool_order_infos(&reader, &parse_seed(&seed)?, count).await?;
            if orders.len() < count {
                info!("Only {} orders found in the queryable history", orders.len());
            }
            for order in &orders {
                println!("{}", format_order(order));
            }
        }
        Command::Seeds { signal_provider } => {
            let provider = signal_provider.as_deref().map(parse_pubkey).transpose()?;
            for seed in reader.get_pools_seeds_by_sig_provider(provider.as_ref()).await? {
                println!("{}", format_seed(&seed));
            }
        }
        Command::Mint { seed } => {
            println!("{}", reader.get_pool_token_mint_from_seed(&parse_seed(&seed)?)?);
        }
        Command::Settle { seed, send } => {
            let instructions = settle_pool(&reader, &markets, &parse_seed(&seed)?).await?;
            if instructions.is_empty() {
                info!("Nothing to settle");
            } else if send {
                submit(config, client, &instructions).await?;
            } else {
                info!("{} settle instructions built, pass --send to submit", instructions.len());
            }
        }
        Command::Redeem { seed, amount, send } => {
            let wallet = load_wallet_from_config(config)?;
            let instructions = redeem(&reader, &markets, &wallet.pubkey(), &parse_seed(&seed)?, amount).await?;
            if send {
                submit(config, client, &instructions).await?;
            } else {
                info!(
                    "{} instructions built for {}, pass --send to submit",
                    instructions.len(),
                    format_pubkey(&wallet.pubkey())
                );
            }
        }
    }

    Ok(())
}

/// Send `instructions` in order, a few per transaction. Stops at the first failure.
async fn submit(config: &Config, client: &SolanaClient, instructions: &[Instruction]) -> Result<()> {
    let wallet = load_wallet_from_config(config)?;
    let batches = instructions.chunks(INSTRUCTIONS_PER_TRANSACTION);
    let total = batches.len();
    for (i, batch) in batches.enumerate() {
        match client.send_instructions(&wallet, batch).await {
            Ok(signature) => info!("Transaction {}/{} confirmed: {}", i + 1, total, signature),
            Err(e) => {
                warn!("Transaction {}/{} failed, later batches not sent", i + 1, total);
                return Err(e).context("Failed to submit instructions");
            }
        }
    }
    Ok(())
}

fn init_logger() {
    env_logger::init_from_env(env_logger::Env::default().filter_or("RUST_LOG", "info"));
}
