use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use log::{debug, info, warn};

use crate::config::{MARKET_CAP_TICK_INTERVAL_SECS, SOL_PRICE_REFRESH_INTERVAL_SECS};
use crate::marketcap::feed::PriceFeed;

/// Latest values observed by the two polling tasks. Single writer per field:
/// the slow task owns `sol_usd`, the fast task owns the other two.
#[derive(Debug, Default, Clone)]
pub struct PipelineState {
    pub sol_usd: Option<f64>,
    pub pool_ratio: Option<f64>,
    pub market_cap: Option<f64>,
}

/// Pool pricing: the quote/base balance ratio is the token price in SOL;
/// multiplied by SOL/USD and the total supply it yields a market cap in USD.
/// Returns `(pool_ratio, market_cap)`, or None whenever a valid value cannot
/// be derived this tick - a zero or missing balance, a non-positive ratio, or
/// the absence of a cached rate are all "wait for the next tick", not errors.
pub fn compute_market_cap(
    quote_balance: f64,
    token_balance: f64,
    sol_usd: Option<f64>,
    total_supply: f64,
) -> Option<(f64, f64)> {
    if quote_balance <= 0.0 || token_balance <= 0.0 {
        return None;
    }

    let ratio = quote_balance / token_balance;
    if !ratio.is_finite() || ratio <= 0.0 {
        return None;
    }

    let token_usd = ratio * sol_usd?;
    let market_cap = token_usd * total_supply;
    if !market_cap.is_finite() {
        return None;
    }

    Some((ratio, market_cap))
}

fn apply_tick(
    state: &Mutex<PipelineState>,
    update_tx: &mpsc::UnboundedSender<f64>,
    quote_balance: f64,
    token_balance: f64,
    total_supply: f64,
) -> Option<f64> {
    let mut state = match state.lock() {
        Ok(state) => state,
        Err(_) => return None,
    };

    match compute_market_cap(quote_balance, token_balance, state.sol_usd, total_supply) {
        Some((ratio, market_cap)) => {
            state.pool_ratio = Some(ratio);
            state.market_cap = Some(market_cap);

            info!("Market cap: ${:.2} USD", market_cap);

            if let Err(e) = update_tx.send(market_cap) {
                warn!("Failed to emit market cap update: {}", e);
            }

            Some(market_cap)
        }
        None => {
            debug!(
                "Skipping valuation tick: quote_balance={}, token_balance={}, sol_usd={:?}",
                quote_balance, token_balance, state.sol_usd
            );
            None
        }
    }
}

/// Drives the valuation: a slow loop caching the SOL/USD rate and a fast loop
/// recomputing the market cap from the two vault balances. Every successful
/// recompute emits the new value into the update channel.
pub struct MarketCapPipeline {
    feed: Arc<PriceFeed>,
    state: Arc<Mutex<PipelineState>>,
    quote_vault_address: String,
    token_vault_address: String,
    total_supply: f64,
    update_tx: mpsc::UnboundedSender<f64>,
}

impl MarketCapPipeline {
    pub fn new(
        feed: Arc<PriceFeed>,
        quote_vault_address: String,
        token_vault_address: String,
        total_supply: f64,
        update_tx: mpsc::UnboundedSender<f64>,
    ) -> Self {
        Self {
            feed,
            state: Arc::new(Mutex::new(PipelineState::default())),
            quote_vault_address,
            token_vault_address,
            total_supply,
            update_tx,
        }
    }

    /// Starts both polling loops. They are independent tasks - a stalled
    /// fetch on one never delays the other.
    pub fn spawn(&self) {
        self.spawn_price_task();
        self.spawn_valuation_task();

        info!(
            "Valuation pipeline started (price refresh every {}s, ticks every {}s)",
            SOL_PRICE_REFRESH_INTERVAL_SECS, MARKET_CAP_TICK_INTERVAL_SECS
        );
    }

    fn spawn_price_task(&self) {
        let feed = self.feed.clone();
        let state = self.state.clone();

        tokio::spawn(async move {
            let mut interval_timer = interval(Duration::from_secs(SOL_PRICE_REFRESH_INTERVAL_SECS));

            loop {
                interval_timer.tick().await;

                // A failed refresh keeps the previously cached rate.
                if let Some(price) = feed.fetch_sol_price().await {
                    if let Ok(mut state) = state.lock() {
                        state.sol_usd = Some(price);
                    }
                    info!("Updated SOL/USD price: ${}", price);
                }
            }
        });
    }

    fn spawn_valuation_task(&self) {
        let feed = self.feed.clone();
        let state = self.state.clone();
        let update_tx = self.update_tx.clone();
        let quote_vault = self.quote_vault_address.clone();
        let token_vault = self.token_vault_address.clone();
        let total_supply = self.total_supply;

        tokio::spawn(async move {
            let mut interval_timer = interval(Duration::from_secs(MARKET_CAP_TICK_INTERVAL_SECS));

            loop {
                interval_timer.tick().await;

                let quote_balance = feed.fetch_vault_balance(&quote_vault).await;
                let token_balance = feed.fetch_vault_balance(&token_vault).await;

                apply_tick(&state, &update_tx, quote_balance, token_balance, total_supply);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_starts_empty() {
        let state = PipelineState::default();
        assert!(state.sol_usd.is_none());
        assert!(state.pool_ratio.is_none());
        assert!(state.market_cap.is_none());
    }

    #[test]
    fn test_compute_market_cap_happy_path() {
        let (ratio, market_cap) = compute_market_cap(30.0, 2.0, Some(10.0), 1000.0).unwrap();
        assert_eq!(ratio, 15.0);
        assert_eq!(market_cap, 150_000.0);
    }

    #[test]
    fn test_compute_skips_zero_balances() {
        assert!(compute_market_cap(0.0, 2.0, Some(10.0), 1000.0).is_none());
        assert!(compute_market_cap(30.0, 0.0, Some(10.0), 1000.0).is_none());
        assert!(compute_market_cap(-1.0, 2.0, Some(10.0), 1000.0).is_none());
    }

    #[test]
    fn test_compute_skips_without_cached_rate() {
        assert!(compute_market_cap(30.0, 2.0, None, 1000.0).is_none());
    }

    #[test]
    fn test_compute_rejects_non_finite_results() {
        assert!(compute_market_cap(f64::MAX, f64::MIN_POSITIVE, Some(10.0), 1000.0).is_none());
    }

    #[test]
    fn test_tick_with_zero_balance_emits_nothing() {
        let state = Mutex::new(PipelineState {
            sol_usd: Some(10.0),
            pool_ratio: None,
            market_cap: None,
        });
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();

        let result = apply_tick(&state, &update_tx, 30.0, 0.0, 1000.0);

        assert!(result.is_none());
        assert!(update_rx.try_recv().is_err());
        assert!(state.lock().unwrap().market_cap.is_none());
    }

    #[test]
    fn test_tick_without_rate_emits_nothing() {
        let state = Mutex::new(PipelineState::default());
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();

        let result = apply_tick(&state, &update_tx, 30.0, 2.0, 1000.0);

        assert!(result.is_none());
        assert!(update_rx.try_recv().is_err());
    }

    #[test]
    fn test_tick_emits_and_records_market_cap() {
        let state = Mutex::new(PipelineState {
            sol_usd: Some(10.0),
            pool_ratio: None,
            market_cap: None,
        });
        let (update_tx, mut update_rx) = mpsc::unbounded_channel();

        let result = apply_tick(&state, &update_tx, 30.0, 2.0, 1000.0);

        assert_eq!(result, Some(150_000.0));
        assert_eq!(update_rx.try_recv().unwrap(), 150_000.0);

        let state = state.lock().unwrap();
        assert_eq!(state.pool_ratio, Some(15.0));
        assert_eq!(state.market_cap, Some(150_000.0));
    }
}
