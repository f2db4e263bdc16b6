use std::env;
use log::warn;

// Server Configuration
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:4000";
pub const DEFAULT_API_BIND_ADDRESS: &str = "127.0.0.1:4001";
pub const STATS_INTERVAL_SECS: u64 = 60;

// Valuation Configuration
pub const SOL_PRICE_REFRESH_INTERVAL_SECS: u64 = 300;
pub const MARKET_CAP_TICK_INTERVAL_SECS: u64 = 2;
pub const HTTP_TIMEOUT_SECS: u64 = 10;

// Fixed SOL/USD spot-price endpoint. Responds with {"price": <f64>}.
pub const SOL_PRICE_API_URL: &str = "https://price.flipcap.io/v1/sol-usd";

// RPC Configuration
pub const DEFAULT_RPC_URL: &str = "https://mainnet.helius-rpc.com/";

// Data Configuration
pub const DEFAULT_COMPANIES_FILE: &str = "./data/companies.csv";

#[derive(Clone)]
pub struct Config {
    pub bind_address: String,
    pub api_bind_address: String,
    pub companies_file: String,
    pub rpc_url: String,
    pub rpc_api_key: String,
    pub quote_vault_address: String,
    pub token_vault_address: String,
    pub token_total_supply: Option<f64>,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            bind_address: env::var("BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDRESS.to_string()),
            api_bind_address: env::var("API_BIND_ADDRESS")
                .unwrap_or_else(|_| DEFAULT_API_BIND_ADDRESS.to_string()),
            companies_file: env::var("COMPANIES_FILE")
                .unwrap_or_else(|_| DEFAULT_COMPANIES_FILE.to_string()),
            rpc_url: env::var("RPC_URL")
                .unwrap_or_else(|_| DEFAULT_RPC_URL.to_string()),
            rpc_api_key: env::var("RPC_API_KEY").unwrap_or_default(),
            quote_vault_address: env::var("QUOTE_VAULT_ADDRESS").unwrap_or_default(),
            token_vault_address: env::var("TOKEN_VAULT_ADDRESS").unwrap_or_default(),
            token_total_supply: env::var("TOKEN_TOTAL_SUPPLY")
                .ok()
                .and_then(|raw| raw.trim().parse::<f64>().ok()),
            log_level: env::var("RUST_LOG")
                .unwrap_or_else(|_| "info".to_string()),
        }
    }

    // The validated total supply. Missing or non-positive is the one fatal
    // pipeline misconfiguration - without it no market cap can be derived.
    pub fn total_supply(&self) -> Result<f64, String> {
        match self.token_total_supply {
            Some(supply) if supply.is_finite() && supply > 0.0 => Ok(supply),
            Some(supply) => Err(format!(
                "TOKEN_TOTAL_SUPPLY must be a positive finite number, got {}",
                supply
            )),
            None => Err("TOKEN_TOTAL_SUPPLY must be set to a positive number".to_string()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.total_supply()?;

        if !std::path::Path::new(&self.companies_file).exists() {
            return Err(format!("Companies file not found: {}", self.companies_file));
        }

        if self.rpc_api_key.is_empty() {
            warn!("RPC_API_KEY not set - balance queries will likely be rejected");
        }

        if self.quote_vault_address.is_empty() || self.token_vault_address.is_empty() {
            warn!("Vault address(es) not set - every valuation tick will be skipped");
        }

        Ok(())
    }

    pub fn log_config(&self) {
        println!("Server Configuration:");
        println!("  WebSocket Bind Address: {}", self.bind_address);
        println!("  API Bind Address: {}", self.api_bind_address);
        println!("  Companies File: {}", self.companies_file);
        println!("  RPC URL: {}", self.rpc_url);
        println!("  RPC API Key: {}***", &self.rpc_api_key[..4.min(self.rpc_api_key.len())]);
        println!("  Quote Vault: {}", self.quote_vault_address);
        println!("  Token Vault: {}", self.token_vault_address);
        println!("  Token Total Supply: {:?}", self.token_total_supply);
        println!("  Log Level: {}", self.log_level);
    }
}
