use std::sync::Arc;
use tokio::sync::mpsc;
use log::{error, info};

use crate::broadcast::hub::{BroadcastHub, FeedMessage};
use crate::companies::CompanyLadder;

/// Pairs a market cap with the two companies around it on the ladder.
pub fn build_feed_message(ladder: &CompanyLadder, market_cap: f64) -> FeedMessage {
    let (current_company, next_up_company) = ladder.resolve_neighbors(market_cap);

    FeedMessage {
        crypto_market_cap: Some(market_cap),
        current_company,
        next_up_company,
    }
}

/// Consumes market cap updates until the channel closes, resolving each one
/// against the ladder and publishing the result. Runs for the lifetime of the
/// pipeline; the channel only closes when every sender is gone.
pub async fn run_rank_resolver(
    mut updates: mpsc::UnboundedReceiver<f64>,
    ladder: Arc<CompanyLadder>,
    hub: Arc<BroadcastHub>,
) {
    info!("Rank resolver started");

    while let Some(market_cap) = updates.recv().await {
        let message = build_feed_message(&ladder, market_cap);
        if let Err(e) = hub.publish(message) {
            error!("Failed to broadcast feed update: {}", e);
        }
    }

    info!("Rank resolver stopped: update channel closed");
}
