//! This example finds a cycling power trainer, subscribes to its power
//! measurements and prints them until Ctrl-C is pressed.
//!
//! Name patterns to accept may be given as command line arguments, e.g.
//! `cargo run --example stream_power -- Suito-T`. Elite trainers are
//! accepted by default.

use cycling_power::{
    AdapterConfig, BtleplugAdapter, DeviceFilter, Error, Orchestrator, ScanConfig, SessionConfig,
};

#[tokio::main]
async fn main() {
    pretty_env_logger::init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
    }
}

async fn run() -> Result<(), Error> {
    let patterns: Vec<String> = std::env::args().skip(1).collect();
    let filter = if patterns.is_empty() {
        DeviceFilter::default()
    } else {
        DeviceFilter::new(patterns)
    };

    log::info!("Searching for a trainer matching {:?}", filter.patterns());

    let adapter = BtleplugAdapter::new(AdapterConfig::default()).await?;
    let config = SessionConfig::default().scan(ScanConfig::default().filter(filter));
    let mut orchestrator = Orchestrator::new(adapter, config);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    println!("Press Ctrl-C to exit...");

    orchestrator
        .stream_until(shutdown, |reading| println!("Current power: {}", reading))
        .await
}
