//! Stream best bid/ask quotes to the console.
//!
//! Usage:
//!   cargo run --example stream_quotes                        # live BTCUSDT
//!   cargo run --example stream_quotes -- --replay capture.gz # offline capture
//!
//! Optional:
//!   BOOKFEED_SYMBOL=ETHUSDT  # live symbol override

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use bookfeed::{Config, Feed, OrderBook, ReconnectConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bookfeed=info".parse().unwrap()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut config = match args.iter().position(|a| a == "--replay") {
        Some(i) => Config::replay(args.get(i + 1).expect("--replay needs a path").clone()),
        None => Config::live(),
    };
    if let Ok(symbol) = std::env::var("BOOKFEED_SYMBOL") {
        config = config.with_symbol(symbol);
    }

    let book = Arc::new(Mutex::new(OrderBook::new()));
    let writer = Arc::clone(&book);
    let feed = Feed::new(
        config,
        Arc::new(move |bp, bq, ap, aq| {
            // Both sides under one lock so the poll loop below never
            // sees a half-applied update.
            let mut book = writer.lock();
            book.apply_bid_delta(bp, bq);
            book.apply_ask_delta(ap, aq);
        }),
    );

    let mut session =
        tokio::spawn(async move { feed.run_with_reconnect(ReconnectConfig::default()).await });

    // Consumer polls on its own cadence, independent of feed rate.
    let mut ticker = tokio::time::interval(Duration::from_millis(100));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let (bid, ask) = {
                    let book = book.lock();
                    (book.best_bid_level(), book.best_ask_level())
                };
                if let (Some((bid_px, _)), Some((ask_px, _))) = (bid, ask) {
                    println!(
                        "BID {:.4} / ASK {:.4}",
                        bid_px as f64 / 1e4,
                        ask_px as f64 / 1e4
                    );
                }
            }
            result = &mut session => {
                let applied = result??;
                println!("feed ended after {applied} updates");
                return Ok(());
            }
        }
    }
}
