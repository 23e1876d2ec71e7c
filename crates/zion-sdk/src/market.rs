use lwk_wollet::elements::AssetId;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

// ── Market ──────────────────────────────────────────────────────────────

/// The single asset pair this maker quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Market {
    pub base_asset: AssetId,
    pub quote_asset: AssetId,
}

impl Market {
    pub fn new(base_asset: AssetId, quote_asset: AssetId) -> Result<Self> {
        if base_asset == quote_asset {
            return Err(Error::InvalidMarket(format!(
                "base and quote asset must differ (both {base_asset})"
            )));
        }
        Ok(Self {
            base_asset,
            quote_asset,
        })
    }

    /// Parse a market from two hex asset ids.
    pub fn from_hex(base_asset: &str, quote_asset: &str) -> Result<Self> {
        let base = parse_asset(base_asset).map_err(Error::InvalidMarket)?;
        let quote = parse_asset(quote_asset).map_err(Error::InvalidMarket)?;
        Self::new(base, quote)
    }

    pub fn contains(&self, asset: &AssetId) -> bool {
        *asset == self.base_asset || *asset == self.quote_asset
    }

    pub fn is_base(&self, asset: &AssetId) -> bool {
        *asset == self.base_asset
    }

    /// The other asset of the pair. Callers must check membership first.
    pub fn counter_asset(&self, asset: &AssetId) -> AssetId {
        if self.is_base(asset) {
            self.quote_asset
        } else {
            self.base_asset
        }
    }
}

/// Parse a 64-char hex asset id, reporting the offending text on failure.
pub fn parse_asset(hex_id: &str) -> std::result::Result<AssetId, String> {
    if hex_id.is_empty() {
        return Err("asset id is empty".to_string());
    }
    hex_id
        .parse::<AssetId>()
        .map_err(|e| format!("bad asset id '{hex_id}': {e}"))
}

// ── Price ───────────────────────────────────────────────────────────────

/// Quoted price of the market.
///
/// `base_price` is how many quote units buy one base unit, `quote_price`
/// how many base units buy one quote unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Price {
    base_price: f64,
    quote_price: f64,
}

impl Price {
    pub fn new(base_price: f64, quote_price: f64) -> Result<Self> {
        for (name, value) in [("base", base_price), ("quote", quote_price)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidPrice(format!(
                    "{name} price must be a positive number, got {value}"
                )));
            }
        }
        Ok(Self {
            base_price,
            quote_price,
        })
    }

    pub fn base_price(&self) -> f64 {
        self.base_price
    }

    pub fn quote_price(&self) -> f64 {
        self.quote_price
    }
}

// ── Trade terms ─────────────────────────────────────────────────────────

/// Direction of a trade as named by the protocol.
///
/// `Buy`: the maker pays out base asset and receives quote asset.
/// `Sell`: the maker pays out quote asset and receives base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeType::Buy => write!(f, "buy"),
            TradeType::Sell => write!(f, "sell"),
        }
    }
}

impl std::str::FromStr for TradeType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "buy" => Ok(TradeType::Buy),
            "sell" => Ok(TradeType::Sell),
            _ => Err(format!("invalid trade type: {s}")),
        }
    }
}

/// Amounts proposed by the counterparty, in each asset's smallest unit.
///
/// `input_*` is what the counterparty sends, `output_*` what it receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapTerms {
    pub input_asset: AssetId,
    pub input_amount: u64,
    pub output_asset: AssetId,
    pub output_amount: u64,
}

// ── Balances and fees ───────────────────────────────────────────────────

/// Maker holdings of the two market assets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub base_amount: u64,
    pub quote_amount: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub basis_point: u64,
    pub fixed_base_fee: u64,
    pub fixed_quote_fee: u64,
}

/// The maker does not charge a fee on top of its price.
pub const DEFAULT_FEE: Fee = Fee {
    basis_point: 0,
    fixed_base_fee: 0,
    fixed_quote_fee: 0,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketWithFee {
    pub market: Market,
    pub fee: Fee,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalanceWithFee {
    pub balance: Balance,
    pub fee: Fee,
}

/// Reply to a price request: the counter-asset amount for the requested
/// amount, plus the current price, fee and liquidity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceWithFee {
    pub price: Price,
    pub fee: Fee,
    pub amount: f64,
    pub asset: AssetId,
    pub balance: Balance,
}
