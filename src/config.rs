//! Process configuration: command-line flags with `ZION_*` environment
//! fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};
use thiserror::Error;
use zion_sdk::{EngineConfig, Market, Network, Price};

/// Default base asset (regtest USDt).
pub const DEFAULT_BASE_ASSET: &str =
    "5ac9f65c0efcc4775e0baec4ec03abdde22473cd3cf33c0419ca290e0751b225";
/// Default quote asset.
pub const DEFAULT_QUOTE_ASSET: &str =
    "296f828e28d381c20a087a70cd4383b4df7879f95f4214416f6b5595d6665406";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid market: {0}")]
    Market(#[source] zion_sdk::Error),

    #[error("invalid price: {0}")]
    Price(#[source] zion_sdk::Error),

    #[error("fee rate must be a positive number, got {0}")]
    FeeRate(f64),

    #[error("trade expiry must be at least one second")]
    TradeExpiry,
}

#[derive(Clone, Parser)]
#[command(name = "zion", version, about = "Liquid market-maker daemon")]
pub struct Config {
    /// Liquid network to trade on.
    #[arg(long, env = "ZION_NETWORK", default_value = "regtest")]
    pub network: Network,

    /// Electrum server. Defaults to the public server of the network.
    #[arg(long, env = "ZION_ELECTRUM_URL")]
    pub electrum_url: Option<String>,

    /// Directory holding the wallet database.
    #[arg(long, env = "ZION_DATADIR", default_value = "zion-data")]
    pub datadir: PathBuf,

    /// BIP39 mnemonic of the maker wallet.
    #[arg(long, env = "ZION_MNEMONIC", hide_env_values = true)]
    pub mnemonic: String,

    #[command(flatten)]
    pub market: MarketArgs,

    /// Network fee rate in sat/vbyte.
    #[arg(long, env = "ZION_FEE_RATE", default_value_t = zion_sdk::DEFAULT_FEE_RATE)]
    pub fee_rate: f64,

    /// Seconds an accepted swap holds the maker's inputs.
    #[arg(long, env = "ZION_TRADE_EXPIRY", default_value_t = 120)]
    pub trade_expiry: u64,

    /// Address the JSON API listens on.
    #[arg(long, env = "ZION_LISTEN", default_value = "0.0.0.0:9945")]
    pub listen: SocketAddr,

    #[command(flatten)]
    pub log: LogArgs,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("network", &self.network)
            .field("electrum_url", &self.electrum_url)
            .field("datadir", &self.datadir)
            .field("mnemonic", &"<redacted>")
            .field("market", &self.market)
            .field("fee_rate", &self.fee_rate)
            .field("trade_expiry", &self.trade_expiry)
            .field("listen", &self.listen)
            .field("log", &self.log)
            .finish()
    }
}

/// The market the maker quotes.
#[derive(Debug, Clone, PartialEq, Args)]
#[command(next_help_heading = "Market")]
pub struct MarketArgs {
    #[arg(long = "base-asset", env = "ZION_BASE_ASSET", default_value = DEFAULT_BASE_ASSET)]
    pub base_asset: String,

    #[arg(long = "quote-asset", env = "ZION_QUOTE_ASSET", default_value = DEFAULT_QUOTE_ASSET)]
    pub quote_asset: String,

    /// Quote units paid for one base unit.
    #[arg(long = "base-price", env = "ZION_BASE_PRICE", default_value_t = 100.0)]
    pub base_price: f64,

    /// Base units paid for one quote unit.
    #[arg(long = "quote-price", env = "ZION_QUOTE_PRICE", default_value_t = 0.01)]
    pub quote_price: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
#[command(next_help_heading = "Logging")]
pub struct LogArgs {
    /// Extra filter directives applied on top of `RUST_LOG`.
    #[arg(long = "log.filter", env = "ZION_LOG_FILTER")]
    pub filter: Option<String>,

    /// Emit one JSON object per log line.
    #[arg(long = "log.json", env = "ZION_LOG_JSON")]
    pub json: bool,
}

impl Config {
    pub fn electrum_url(&self) -> String {
        self.electrum_url
            .clone()
            .unwrap_or_else(|| self.network.default_electrum_url().to_string())
    }

    /// Validated engine settings. Network fees are paid in the network's
    /// policy asset.
    pub fn engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let market = Market::from_hex(&self.market.base_asset, &self.market.quote_asset)
            .map_err(ConfigError::Market)?;
        let price = Price::new(self.market.base_price, self.market.quote_price)
            .map_err(ConfigError::Price)?;
        if !self.fee_rate.is_finite() || self.fee_rate <= 0.0 {
            return Err(ConfigError::FeeRate(self.fee_rate));
        }
        if self.trade_expiry == 0 {
            return Err(ConfigError::TradeExpiry);
        }

        let mut config = EngineConfig::new(market, price, self.network.policy_asset());
        config.fee_rate = self.fee_rate;
        config.trade_expiry = Duration::from_secs(self.trade_expiry);
        Ok(config)
    }
}
