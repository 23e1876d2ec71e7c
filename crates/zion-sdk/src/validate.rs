//! Proposal checks run before any wallet or transaction work.

use lwk_wollet::elements::AssetId;

use crate::error::{Error, Result};
use crate::market::{Balance, Market, Price, SwapTerms, TradeType};
use crate::price::{amount_in, amount_out};

/// The caller's market must be exactly the maker's market.
pub fn require_valid_market(valid: &Market, given: &Market) -> Result<()> {
    if given.base_asset != valid.base_asset {
        return Err(Error::InvalidMarket(format!(
            "base asset must be {}",
            valid.base_asset
        )));
    }
    if given.quote_asset != valid.quote_asset {
        return Err(Error::InvalidMarket(format!(
            "quote asset must be {}",
            valid.quote_asset
        )));
    }
    Ok(())
}

pub fn require_valid_asset(market: &Market, asset: &AssetId) -> Result<()> {
    if !market.contains(asset) {
        return Err(Error::AssetNotInMarket(asset.to_string()));
    }
    Ok(())
}

/// Buy: counterparty sends quote and receives base. Sell: the mirror.
pub fn require_valid_trade_type(
    market: &Market,
    trade_type: TradeType,
    terms: &SwapTerms,
) -> Result<()> {
    let (expected_in, expected_out) = match trade_type {
        TradeType::Buy => (market.quote_asset, market.base_asset),
        TradeType::Sell => (market.base_asset, market.quote_asset),
    };
    if terms.input_asset != expected_in || terms.output_asset != expected_out {
        return Err(Error::TradeTypeMismatch(trade_type));
    }
    Ok(())
}

/// Largest amount every `f64` price computation represents exactly.
pub const MAX_PRICED_AMOUNT: u64 = 1 << 53;

/// Both amounts must match the quoted price exactly, with no tolerance.
pub fn require_valid_price(trade_type: TradeType, terms: &SwapTerms, price: &Price) -> Result<()> {
    if terms.input_amount == 0 || terms.output_amount == 0 {
        return Err(Error::BadPricing("amounts must be positive".into()));
    }
    if terms.input_amount > MAX_PRICED_AMOUNT || terms.output_amount > MAX_PRICED_AMOUNT {
        return Err(Error::BadPricing(format!(
            "amounts above {MAX_PRICED_AMOUNT} cannot be priced exactly"
        )));
    }

    let expected_out = amount_out(trade_type, terms, price);
    if terms.output_amount as f64 != expected_out {
        return Err(Error::BadPricing(format!(
            "output amount {} does not match {expected_out}",
            terms.output_amount
        )));
    }

    let expected_in = amount_in(trade_type, terms, price);
    if terms.input_amount as f64 != expected_in {
        return Err(Error::BadPricing(format!(
            "input amount {} does not match {expected_in}",
            terms.input_amount
        )));
    }
    Ok(())
}

/// Only the asset the maker pays out is checked; equality is admitted.
pub fn require_enough_balance(
    trade_type: TradeType,
    terms: &SwapTerms,
    balance: &Balance,
) -> Result<()> {
    let (available, side) = match trade_type {
        TradeType::Buy => (balance.base_amount, "base"),
        TradeType::Sell => (balance.quote_amount, "quote"),
    };
    if terms.output_amount > available {
        return Err(Error::InsufficientFunds(format!(
            "not enough {side} asset balance for requested amount ({} > {available})",
            terms.output_amount
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(byte: u8) -> AssetId {
        AssetId::from_slice(&[byte; 32]).unwrap()
    }

    fn market() -> Market {
        Market::new(asset(0xaa), asset(0xbb)).unwrap()
    }

    fn price() -> Price {
        Price::new(100.0, 0.01).unwrap()
    }

    fn buy_terms(input_amount: u64, output_amount: u64) -> SwapTerms {
        SwapTerms {
            input_asset: asset(0xbb),
            input_amount,
            output_asset: asset(0xaa),
            output_amount,
        }
    }

    fn sell_terms(input_amount: u64, output_amount: u64) -> SwapTerms {
        SwapTerms {
            input_asset: asset(0xaa),
            input_amount,
            output_asset: asset(0xbb),
            output_amount,
        }
    }

    // ── market / asset ──────────────────────────────────────────────────

    #[test]
    fn same_market_is_valid() {
        assert!(require_valid_market(&market(), &market()).is_ok());
    }

    #[test]
    fn market_differing_in_either_asset_is_invalid() {
        let valid = market();
        let candidates = [
            Market::new(asset(0x01), asset(0xbb)).unwrap(),
            Market::new(asset(0xaa), asset(0x01)).unwrap(),
            Market::new(asset(0xbb), asset(0xaa)).unwrap(),
            Market::new(asset(0x01), asset(0x02)).unwrap(),
        ];
        for given in candidates {
            let err = require_valid_market(&valid, &given).unwrap_err();
            assert!(matches!(err, Error::InvalidMarket(_)), "{given:?}");
        }
    }

    #[test]
    fn asset_must_belong_to_market() {
        assert!(require_valid_asset(&market(), &asset(0xaa)).is_ok());
        assert!(require_valid_asset(&market(), &asset(0xbb)).is_ok());
        assert!(matches!(
            require_valid_asset(&market(), &asset(0xcc)),
            Err(Error::AssetNotInMarket(_))
        ));
    }

    // ── trade type ──────────────────────────────────────────────────────

    #[test]
    fn trade_type_must_match_asset_direction() {
        let m = market();
        assert!(require_valid_trade_type(&m, TradeType::Buy, &buy_terms(100, 1)).is_ok());
        assert!(require_valid_trade_type(&m, TradeType::Sell, &sell_terms(1, 100)).is_ok());
        assert!(matches!(
            require_valid_trade_type(&m, TradeType::Buy, &sell_terms(1, 100)),
            Err(Error::TradeTypeMismatch(TradeType::Buy))
        ));
        assert!(matches!(
            require_valid_trade_type(&m, TradeType::Sell, &buy_terms(100, 1)),
            Err(Error::TradeTypeMismatch(TradeType::Sell))
        ));
    }

    #[test]
    fn trade_type_rejects_foreign_asset() {
        let mut t = buy_terms(100, 1);
        t.input_asset = asset(0xcc);
        assert!(require_valid_trade_type(&market(), TradeType::Buy, &t).is_err());
    }

    // ── pricing ─────────────────────────────────────────────────────────

    #[test]
    fn priced_terms_are_accepted() {
        assert!(require_valid_price(TradeType::Buy, &buy_terms(100, 1), &price()).is_ok());
        assert!(require_valid_price(TradeType::Buy, &buy_terms(500, 5), &price()).is_ok());
        assert!(require_valid_price(TradeType::Sell, &sell_terms(1, 100), &price()).is_ok());
        assert!(require_valid_price(TradeType::Sell, &sell_terms(3, 300), &price()).is_ok());
    }

    #[test]
    fn single_unit_perturbation_is_bad_pricing() {
        let cases = [
            (TradeType::Buy, buy_terms(101, 1)),
            (TradeType::Buy, buy_terms(99, 1)),
            (TradeType::Buy, buy_terms(100, 2)),
            (TradeType::Sell, sell_terms(2, 100)),
            (TradeType::Sell, sell_terms(1, 101)),
            (TradeType::Sell, sell_terms(1, 99)),
        ];
        for (trade_type, t) in cases {
            let err = require_valid_price(trade_type, &t, &price()).unwrap_err();
            assert!(matches!(err, Error::BadPricing(_)), "{t:?}");
        }
    }

    #[test]
    fn amounts_beyond_exact_float_range_are_bad_pricing() {
        let out = 1u64 << 50;
        let off_by_one = buy_terms(out * 100 + 1, out);
        assert_eq!((out * 100 + 1) as f64, (out * 100) as f64);
        assert!(matches!(
            require_valid_price(TradeType::Buy, &off_by_one, &price()),
            Err(Error::BadPricing(_))
        ));

        let within = buy_terms((1u64 << 46) * 100, 1 << 46);
        assert!(require_valid_price(TradeType::Buy, &within, &price()).is_ok());
        let over = buy_terms((1u64 << 47) * 100, 1 << 47);
        assert!(over.input_amount > MAX_PRICED_AMOUNT);
        assert!(matches!(
            require_valid_price(TradeType::Buy, &over, &price()),
            Err(Error::BadPricing(_))
        ));
    }

    #[test]
    fn zero_amounts_are_bad_pricing() {
        assert!(matches!(
            require_valid_price(TradeType::Buy, &buy_terms(0, 0), &price()),
            Err(Error::BadPricing(_))
        ));
    }

    // ── balance ─────────────────────────────────────────────────────────

    #[test]
    fn buy_checks_base_balance_inclusively() {
        let balance = Balance {
            base_amount: 5,
            quote_amount: 0,
        };
        assert!(require_enough_balance(TradeType::Buy, &buy_terms(500, 5), &balance).is_ok());
        assert!(matches!(
            require_enough_balance(TradeType::Buy, &buy_terms(600, 6), &balance),
            Err(Error::InsufficientFunds(_))
        ));
    }

    #[test]
    fn sell_checks_quote_balance_only() {
        let balance = Balance {
            base_amount: 0,
            quote_amount: 300,
        };
        assert!(require_enough_balance(TradeType::Sell, &sell_terms(3, 300), &balance).is_ok());
        assert!(matches!(
            require_enough_balance(TradeType::Sell, &sell_terms(4, 400), &balance),
            Err(Error::InsufficientFunds(_))
        ));
    }
}
