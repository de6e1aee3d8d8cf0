//! KiloEx Trader - submit market position requests from the command line

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use tracing::{debug, info};

use kiloex_trader::{
    metrics, ClosePositionRequest, OpenPositionRequest, PositionRouter, PositionRouterAbi,
    ReferralCode, Settings,
};

#[derive(Parser, Debug)]
#[command(name = "kiloex-trader", version, about = "Open and close KiloEx positions at market")]
struct Args {
    /// Market name from the configuration file
    #[arg(long, global = true, default_value = "bsc")]
    market: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open or increase a position
    Open {
        #[arg(long)]
        product_id: u64,
        #[arg(long)]
        margin: Decimal,
        #[arg(long)]
        leverage: Decimal,
        #[arg(long, value_enum)]
        side: Side,
        #[arg(long)]
        acceptable_price: Decimal,
        #[arg(long, default_value = "")]
        referral_code: String,
    },
    /// Close or decrease a position
    Close {
        #[arg(long)]
        product_id: u64,
        #[arg(long)]
        margin: Decimal,
        #[arg(long, value_enum)]
        side: Side,
        #[arg(long)]
        acceptable_price: Decimal,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Side {
    Long,
    Short,
}

impl Side {
    fn is_long(self) -> bool {
        matches!(self, Side::Long)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging();

    let args = Args::parse();

    // Load configuration
    let settings = Settings::load()?;
    let market = settings.market(&args.market)?;
    info!("Loaded configuration for market {}", args.market);

    let abi = PositionRouterAbi::load(settings.abi_path.as_deref())?;
    let router = PositionRouter::connect(market, abi)?;
    info!(
        "Trading from {:?} against router {:?}",
        router.wallet_address(),
        router.market_address()
    );

    let result = match args.command {
        Command::Open {
            product_id,
            margin,
            leverage,
            side,
            acceptable_price,
            referral_code,
        } => {
            let request = OpenPositionRequest {
                product_id,
                margin,
                leverage,
                is_long: side.is_long(),
                acceptable_price,
                referral_code: referral_code.parse::<ReferralCode>()?,
            };
            router.open_market_increase_position(&request).await
        }
        Command::Close {
            product_id,
            margin,
            side,
            acceptable_price,
        } => {
            let request = ClosePositionRequest {
                product_id,
                margin,
                is_long: side.is_long(),
                acceptable_price,
            };
            router.open_market_decrease_position(&request).await
        }
    };

    // Counters cover failures too, so dump them before propagating
    debug!("Session metrics:\n{}", metrics::render()?);

    let receipt = result?;
    println!("{:?} status={}", receipt.tx_hash, receipt.status);
    receipt.ensure_success()?;
    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,kiloex_trader=debug,hyper=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .init();
}
