//! Galleria CLI - Deploy an in-memory marketplace and run a sale
//!
//! # Quick Start
//!
//! ```bash
//! # Full mint -> list -> purchase -> withdraw walkthrough
//! galleria demo
//!
//! # Same, with a 2.5% protocol fee and a 500-token price
//! galleria demo --fee-bps 250 --price 500
//! ```

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::*;

use galleria_market::Market;
use galleria_registry::{ItemCollection, ItemRegistry};
use galleria_token::{TokenLedger, ValueToken};
use galleria_types::{AccountId, Amount, CollectionId, FeeRate};

/// Galleria - fixed-price NFT marketplace with a value-token fee sink
#[derive(Parser)]
#[command(name = "galleria")]
#[command(author = "Galleria Contributors")]
#[command(version)]
#[command(about = "Fixed-price item marketplace with custody escrow and protocol fees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy token, collection, and market, then run one full sale
    Demo {
        /// Protocol fee in basis points (100 = 1%)
        #[arg(long, default_value_t = 1_000)]
        fee_bps: u16,

        /// Listing price in token units
        #[arg(long, default_value_t = 100)]
        price: u128,

        /// Tokens minted to the deployer and distributed to participants
        #[arg(long, default_value_t = 1_000_000)]
        supply: u128,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo {
            fee_bps,
            price,
            supply,
        } => demo(fee_bps, price, supply).await,
    }
}

async fn demo(fee_bps: u16, price: u128, supply: u128) -> anyhow::Result<()> {
    let fee_rate = FeeRate::new(fee_bps).context("invalid fee rate")?;
    let price = Amount::new(price);

    println!("{}", "Deploying value token...".bold());
    let token = Arc::new(TokenLedger::new());
    let deployer = AccountId::new();
    token.mint(&deployer, Amount::new(supply)).await?;
    println!("  token deployed, {} minted to {}", supply, deployer);

    println!("{}", "Deploying market...".bold());
    let market = Market::new(token.clone(), deployer, fee_rate);
    println!(
        "  market account {} (owner {}, fee {})",
        market.market_account(),
        market.owner(),
        market.fee_rate()
    );

    println!("{}", "Deploying item collection...".bold());
    let collection = Arc::new(ItemCollection::new());
    let collection_id = CollectionId::new();
    market
        .register_collection(collection_id, collection.clone())
        .await;
    println!("  collection {}", collection_id);

    // Fund a seller and a buyer, and set up approvals
    let seller = AccountId::new();
    let buyer = AccountId::new();
    for account in [&seller, &buyer] {
        token.transfer(&deployer, account, Amount::new(1_000)).await?;
        token
            .approve(account, &market.market_account(), Amount::new(1_000))
            .await;
    }
    collection
        .set_approval_for_all(&seller, &market.market_account(), true)
        .await;

    let item = collection.mint(&seller, "https://some-token.uri/").await;
    println!("\nSeller {} minted item {}", seller, item);

    let id = market
        .list_item(collection_id, item, price, &seller)
        .await?;
    println!("Listed as {} at {} tokens", id, price);

    market.purchase_item(id, &buyer).await?;
    println!("{}", format!("Buyer {} purchased {}", buyer, id).green());

    println!("\n{}", "Balances after sale".bold());
    println!("  seller : {}", token.balance_of(&seller).await);
    println!("  buyer  : {}", token.balance_of(&buyer).await);
    println!("  market : {}", market.fees_accrued().await);
    println!(
        "  item {} now owned by {}",
        item,
        collection.owner_of(item).await?
    );

    let swept = market.withdraw_fees(&deployer).await?;
    println!(
        "\n{}",
        format!("Owner withdrew {} in fees; market balance {}", swept, market.fees_accrued().await)
            .green()
    );

    Ok(())
}
