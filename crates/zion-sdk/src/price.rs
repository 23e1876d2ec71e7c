//! Conversion between the two assets of the market at the quoted price.
//!
//! Results are plain `f64` divisions/multiplications: fractional amounts are
//! legal here and must be quantized by callers before they reach a
//! transaction.

use crate::market::{Price, SwapTerms, TradeType};

/// Amount the counterparty should receive for the input it offers.
pub fn amount_out(trade_type: TradeType, terms: &SwapTerms, price: &Price) -> f64 {
    let input = terms.input_amount as f64;
    match trade_type {
        TradeType::Buy => input / price.base_price(),
        TradeType::Sell => input / price.quote_price(),
    }
}

/// Amount the counterparty should send for the output it requests.
pub fn amount_in(trade_type: TradeType, terms: &SwapTerms, price: &Price) -> f64 {
    let output = terms.output_amount as f64;
    match trade_type {
        TradeType::Buy => output * price.base_price(),
        TradeType::Sell => output * price.quote_price(),
    }
}

/// Counter-asset equivalent of `amount` of either market asset.
pub fn quote_preview(
    trade_type: TradeType,
    is_base_asset: bool,
    amount: f64,
    price: &Price,
) -> f64 {
    match (trade_type, is_base_asset) {
        (TradeType::Buy, true) => amount * price.base_price(),
        (TradeType::Buy, false) => amount / price.base_price(),
        (TradeType::Sell, true) => amount / price.quote_price(),
        (TradeType::Sell, false) => amount * price.quote_price(),
    }
}
