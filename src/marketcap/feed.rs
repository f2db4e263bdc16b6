use std::time::Duration;
use serde::{Deserialize, Serialize};
use log::{debug, warn};

use crate::config::{HTTP_TIMEOUT_SECS, SOL_PRICE_API_URL};

#[derive(Debug, Deserialize)]
struct PriceQuote {
    price: f64,
}

#[derive(Debug, Serialize)]
struct BalanceQuery<'a> {
    address: &'a str,
}

#[derive(Debug, Deserialize)]
struct VaultBalance {
    balance: f64,
    #[serde(rename = "decimalsAdjusted")]
    decimals_adjusted: bool,
}

/// The two external reads feeding the valuation pipeline. Every failure is
/// absorbed here with a warning - callers only ever see a value or an
/// "unavailable" signal, never an error.
pub struct PriceFeed {
    client: reqwest::Client,
    rpc_url: String,
}

impl PriceFeed {
    pub fn new(rpc_url: &str, rpc_api_key: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;

        let rpc_url = if rpc_api_key.is_empty() {
            rpc_url.to_string()
        } else {
            format!("{}?api-key={}", rpc_url, rpc_api_key)
        };

        Ok(Self { client, rpc_url })
    }

    /// Current SOL/USD spot price, or None when the quote endpoint cannot
    /// produce a usable one. Callers keep their previously cached rate on None.
    pub async fn fetch_sol_price(&self) -> Option<f64> {
        let response = match self.client.get(SOL_PRICE_API_URL).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch SOL/USD price: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("SOL/USD price request failed: HTTP {}", response.status());
            return None;
        }

        match response.json::<PriceQuote>().await {
            Ok(quote) if quote.price.is_finite() && quote.price > 0.0 => Some(quote.price),
            Ok(quote) => {
                warn!("Ignoring non-positive SOL/USD price: {}", quote.price);
                None
            }
            Err(e) => {
                warn!("Malformed SOL/USD price response: {}", e);
                None
            }
        }
    }

    /// Decimals-adjusted token balance held by a vault account. Returns 0.0
    /// when the balance is unavailable for any reason - the pipeline treats a
    /// zero balance as "skip this tick", never as an error.
    pub async fn fetch_vault_balance(&self, vault_address: &str) -> f64 {
        let query = BalanceQuery {
            address: vault_address,
        };

        let response = match self.client.post(&self.rpc_url).json(&query).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("Failed to fetch balance for {}: {}", vault_address, e);
                return 0.0;
            }
        };

        if !response.status().is_success() {
            warn!(
                "Balance request for {} failed: HTTP {}",
                vault_address,
                response.status()
            );
            return 0.0;
        }

        match response.json::<VaultBalance>().await {
            Ok(body) if body.balance.is_finite() && body.balance >= 0.0 => {
                debug!(
                    "Vault {} balance: {} (decimals_adjusted={})",
                    vault_address, body.balance, body.decimals_adjusted
                );
                body.balance
            }
            Ok(body) => {
                warn!(
                    "Ignoring invalid balance for {}: {}",
                    vault_address, body.balance
                );
                0.0
            }
            Err(e) => {
                warn!("Malformed balance response for {}: {}", vault_address, e);
                0.0
            }
        }
    }
}
