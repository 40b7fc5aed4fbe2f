//! Bitfinex USD margin-lending bot entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use lendbot::api::{create_router, AppState};
use lendbot::config::Config;
use lendbot::gateway::{BitfinexClient, ExchangeGateway};
use lendbot::lendbook::analyze;
use lendbot::metrics;
use lendbot::strategy::StrategyEngine;
use lendbot::utils::shutdown_signal;

/// Bitfinex USD margin-lending bot.
#[derive(Parser, Debug)]
#[command(name = "lendbot")]
#[command(about = "Automated lending bot for the Bitfinex USD funding market")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// Run in dry-run mode (no real orders).
    #[arg(long)]
    dry_run: Option<bool>,

    /// HTTP server port for health/metrics.
    #[arg(short, long, default_value = "8080")]
    port: u16,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the main lending loop (default).
    Run {
        /// Run in dry-run mode (no real orders).
        #[arg(long)]
        dry_run: Option<bool>,

        /// HTTP server port for health/metrics.
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Check account balances and connection.
    CheckBalance,

    /// Fetch and print the current lend book.
    ShowBook,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("lendbot=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Handle subcommands
    match args.command {
        Some(Command::CheckConfig) => cmd_check_config().await,
        Some(Command::CheckBalance) => cmd_check_balance().await,
        Some(Command::ShowBook) => cmd_show_book().await,
        Some(Command::Run { dry_run, port }) => cmd_run(dry_run, port).await,
        None => cmd_run(args.dry_run, args.port).await,
    }
}

/// Check configuration validity.
async fn cmd_check_config() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("LENDBOT - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  API URL: {}", config.bitfinex_api_url);
    println!(
        "  API Key: {}",
        if config.bitfinex_api_key.is_empty() {
            "absent"
        } else {
            "present"
        }
    );
    println!("  Currency: {}", config.currency_upper());
    println!("  Minimum Inactive Funds: {}", config.min_inactive_funds);
    println!("  Poll Interval: {}s", config.poll_interval_secs);
    println!("  Book Depth: {}", config.book_depth);
    println!("  Dry Run: {}", config.dry_run);
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Check account balances and connection.
async fn cmd_check_balance() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("LENDBOT - BALANCE CHECK");
    println!("======================================================================");

    // Load configuration
    let config = Config::load()?;
    if config.bitfinex_api_key.is_empty() || config.bitfinex_api_secret.is_empty() {
        return Err(anyhow::anyhow!(
            "BITFINEX_API_KEY and BITFINEX_API_SECRET are required for a balance check"
        ));
    }

    println!("Host: {}", config.bitfinex_api_url);
    println!("Currency: {}", config.currency_upper());
    println!("======================================================================");

    // Create client
    print!("\n1. Creating client... ");
    let client = BitfinexClient::new(&config);
    println!("OK");

    // Get balances
    print!("\n2. Getting balances... ");
    match client.fetch_balances().await {
        Ok(balances) => {
            println!("OK");
            for balance in &balances {
                println!("   - {} {} ({})", balance.amount, balance.currency, balance.wallet);
            }
            if balances.is_empty() {
                println!("   (no balances)");
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    // Get resting offers
    print!("\n3. Getting active offers... ");
    match client.fetch_active_offers().await {
        Ok(offers) => {
            println!("OK");
            println!("   Total offers: {}", offers.len());
            for offer in &offers {
                let rate = if offer.is_frr() {
                    "FRR".to_string()
                } else {
                    offer.rate.to_string()
                };
                println!(
                    "   - #{} {} remaining at {}",
                    offer.id, offer.remaining_amount, rate
                );
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    // Get active credits
    print!("\n4. Getting active credits... ");
    match client.fetch_active_credits().await {
        Ok(credits) => {
            println!("OK");
            println!("   Total credits: {}", credits.len());
            for credit in credits.iter().take(5) {
                println!("   - {} lent at {}", credit.amount, credit.rate);
            }
            if credits.len() > 5 {
                println!("   ... and {} more", credits.len() - 5);
            }
        }
        Err(e) => {
            println!("FAILED");
            println!("   Error: {}", e);
        }
    }

    println!("\n======================================================================");
    println!("BALANCE CHECK COMPLETED");
    println!("======================================================================");

    Ok(())
}

/// Fetch and print the current lend book.
async fn cmd_show_book() -> anyhow::Result<()> {
    println!("======================================================================");
    println!("LENDBOT - LEND BOOK");
    println!("======================================================================");

    let config = Config::load()?;
    let client = BitfinexClient::new(&config);
    let currency = config.currency_upper();

    println!("\nFetching {} lend book...\n", currency);

    let book = client
        .fetch_lend_book(&currency, config.book_depth, config.book_depth)
        .await?;

    println!("Bids (borrow demand): {}", book.bids.len());
    for bid in book.bids.iter().take(5) {
        let rate = if bid.frr { "FRR".to_string() } else { bid.rate.to_string() };
        println!("  {} at {}", bid.amount, rate);
    }

    println!("Asks (lend offers): {}", book.asks.len());
    for ask in book.asks.iter().take(5) {
        let rate = if ask.frr { "FRR".to_string() } else { ask.rate.to_string() };
        println!("  {} at {}", ask.amount, rate);
    }

    let analysis = analyze(&book);
    println!("----------------------------------------------------------------------");
    println!("Analysis:");
    println!("  Best bid rate: {}", analysis.best_bid_rate);
    println!("  Demand at FRR: {}", analysis.bid_frr);
    println!("  Best ask outside best bid: {}", analysis.best_ask_outside_best_bid);
    println!(
        "  Second-best ask outside best bid: {}",
        analysis.second_best_ask_outside_best_bid
    );
    println!(
        "  Amount at best competitive ask: {}",
        analysis.best_ask_outside_best_bid_amount
    );
    println!("  Best competitive ask is FRR: {}", analysis.best_ask_frr);
    println!("======================================================================");

    Ok(())
}

/// Run the main lending loop.
async fn cmd_run(dry_run_override: Option<bool>, port: u16) -> anyhow::Result<()> {
    // Load configuration
    info!("Loading configuration...");
    let mut config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    // Override with CLI args if provided
    if let Some(dry_run) = dry_run_override {
        config.dry_run = dry_run;
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    info!("Configuration loaded successfully");
    info!(
        "Mode: {}",
        if config.dry_run { "SIMULATION" } else { "LIVE LENDING" }
    );
    info!("Currency: {}", config.currency_upper());
    info!("Minimum inactive funds: {}", config.min_inactive_funds);
    info!("Poll interval: {}s", config.poll_interval_secs);

    // Install the Prometheus recorder and register metric descriptions
    let prometheus = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    metrics::init_metrics();

    // Create app state
    let app_state = AppState::new().with_metrics_handle(prometheus);
    *app_state.currency.write().await = Some(config.currency_upper());

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state.clone());

    // Spawn HTTP server
    let _server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    });

    // Create exchange client and strategy engine
    let client = BitfinexClient::new(&config);
    let engine = StrategyEngine::new(client, config.clone());

    info!("========================================");
    info!("LENDING BOT STARTED");
    info!("========================================");
    info!("Currency: {}", config.currency_upper());
    info!(
        "Mode: {}",
        if config.dry_run { "SIMULATION" } else { "LIVE LENDING" }
    );
    info!("========================================");

    engine.run(app_state).await;

    Ok(())
}
