use std::sync::Arc;

use tokio::sync::mpsc;

use delta_mm::config;
use delta_mm::engine::strategy::Strategy;
use delta_mm::feeds::snapshots::SnapshotClient;
use delta_mm::gateway::client::ExchangeClient;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let token = config::team_token();

    eprintln!("╔══════════════════════════════════════════════════╗");
    eprintln!("║  Delta ETF Basket Market Maker");
    eprintln!("║  Universe: {:?}", config::ALL_SYMBOLS);
    eprintln!(
        "║  Gateway: {}:{} | Books: {}",
        config::EXCHANGE_HOST,
        config::GATEWAY_PORT,
        config::scorekeeper_base_url()
    );
    eprintln!(
        "║  Budget: {} actions/s | Cadence: {:.0} Hz",
        config::MAX_ACTIONS_PER_SECOND,
        1.0 / config::LOOP_DELAY_SECONDS
    );
    eprintln!("╚══════════════════════════════════════════════════╝");

    let gateway_addr = format!("{}:{}", config::EXCHANGE_HOST, config::GATEWAY_PORT);
    let client = match ExchangeClient::connect(&gateway_addr, &token).await {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("[MAIN] Fatal: {}", e);
            std::process::exit(1);
        }
    };

    // The strategy folds fills between ticks; the gateway reader must never
    // block, so the handoff is an unbounded channel.
    let (fill_tx, fill_rx) = mpsc::unbounded_channel();
    client.subscribe_fills(Box::new(move |fill| {
        if fill_tx.send(fill).is_err() {
            eprintln!("[GW] Fill handler gone, dropping fill");
        }
    }));

    let snapshots = SnapshotClient::new(config::scorekeeper_base_url());
    let mut strategy = Strategy::new(client.clone(), snapshots, fill_rx);

    tokio::select! {
        _ = strategy.run() => {}
        _ = tokio::signal::ctrl_c() => {
            eprintln!("[MAIN] Interrupt received");
        }
    }

    strategy.shutdown().await;
}
