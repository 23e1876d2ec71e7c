//! JSON shapes of the trade protocol. Assets, scripts and keys travel as
//! hex, transactions as base64 PSETs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zion_sdk::elements::secp256k1_zkp::SecretKey;
use zion_sdk::elements::{AssetId, Script};
use zion_sdk::{
    Balance, BalanceWithFee, BlindingKeys, ErrorKind, Fee, Market, MarketWithFee, PriceWithFee,
    SwapAccept, SwapFail, SwapRequest, SwapTerms, TradeType, TxHashOrError, decode_pset,
    encode_pset, parse_asset,
};

use crate::error::ApiError;

fn asset_from_hex(text: &str) -> Result<AssetId, ApiError> {
    parse_asset(text).map_err(ApiError::invalid_request)
}

// ── Market data ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDto {
    pub base_asset: String,
    pub quote_asset: String,
}

impl MarketDto {
    pub fn to_market(&self) -> Result<Market, ApiError> {
        Ok(Market::new(
            asset_from_hex(&self.base_asset)?,
            asset_from_hex(&self.quote_asset)?,
        )?)
    }
}

impl From<Market> for MarketDto {
    fn from(market: Market) -> Self {
        Self {
            base_asset: market.base_asset.to_string(),
            quote_asset: market.quote_asset.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketWithFeeDto {
    pub market: MarketDto,
    pub fee: Fee,
}

impl From<MarketWithFee> for MarketWithFeeDto {
    fn from(m: MarketWithFee) -> Self {
        Self {
            market: m.market.into(),
            fee: m.fee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketsResponse {
    pub markets: Vec<MarketWithFeeDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancesRequest {
    pub market: MarketDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancesResponse {
    pub balance: Balance,
    pub fee: Fee,
}

impl From<BalanceWithFee> for BalancesResponse {
    fn from(b: BalanceWithFee) -> Self {
        Self {
            balance: b.balance,
            fee: b.fee,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPriceRequest {
    pub market: MarketDto,
    pub trade_type: TradeType,
    pub amount: u64,
    pub asset: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceDto {
    pub base_price: f64,
    pub quote_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketPriceResponse {
    pub price: PriceDto,
    pub fee: Fee,
    /// Amount of `asset` matching the requested amount.
    pub amount: f64,
    pub asset: String,
    pub balance: Balance,
}

impl From<PriceWithFee> for MarketPriceResponse {
    fn from(p: PriceWithFee) -> Self {
        Self {
            price: PriceDto {
                base_price: p.price.base_price(),
                quote_price: p.price.quote_price(),
            },
            fee: p.fee,
            amount: p.amount,
            asset: p.asset.to_string(),
            balance: p.balance,
        }
    }
}

// ── Trade ───────────────────────────────────────────────────────────────

/// Script hex → blinding private key hex.
pub type KeyMap = BTreeMap<String, String>;

fn keys_from_hex(map: &KeyMap, what: &str) -> Result<BlindingKeys, ApiError> {
    map.iter()
        .map(|(script, key)| {
            let script = hex::decode(script).map_err(|e| {
                ApiError::invalid_request(format!("bad {what} script '{script}': {e}"))
            })?;
            let key = hex::decode(key)
                .ok()
                .and_then(|bytes| SecretKey::from_slice(&bytes).ok())
                .ok_or_else(|| ApiError::invalid_request(format!("bad {what} blinding key")))?;
            Ok::<_, ApiError>((Script::from(script), key))
        })
        .collect()
}

fn keys_to_hex(keys: &BlindingKeys) -> KeyMap {
    keys.iter()
        .map(|(script, key)| {
            (
                hex::encode(script.as_bytes()),
                hex::encode(key.secret_bytes()),
            )
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapTermsDto {
    pub input_asset: String,
    pub input_amount: u64,
    pub output_asset: String,
    pub output_amount: u64,
}

impl SwapTermsDto {
    pub fn to_terms(&self) -> Result<SwapTerms, ApiError> {
        Ok(SwapTerms {
            input_asset: asset_from_hex(&self.input_asset)?,
            input_amount: self.input_amount,
            output_asset: asset_from_hex(&self.output_asset)?,
            output_amount: self.output_amount,
        })
    }
}

impl From<SwapTerms> for SwapTermsDto {
    fn from(t: SwapTerms) -> Self {
        Self {
            input_asset: t.input_asset.to_string(),
            input_amount: t.input_amount,
            output_asset: t.output_asset.to_string(),
            output_amount: t.output_amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapRequestDto {
    pub id: String,
    pub terms: SwapTermsDto,
    /// Base64 PSET with the counterparty's inputs and receiving output.
    pub transaction: String,
    #[serde(default)]
    pub input_blinding_keys: KeyMap,
    #[serde(default)]
    pub output_blinding_keys: KeyMap,
}

impl SwapRequestDto {
    pub fn to_request(&self) -> Result<SwapRequest, ApiError> {
        let pset = decode_pset(&self.transaction)?;
        Ok(SwapRequest {
            id: self.id.clone(),
            terms: self.terms.to_terms()?,
            pset,
            input_blinding_keys: keys_from_hex(&self.input_blinding_keys, "input")?,
            output_blinding_keys: keys_from_hex(&self.output_blinding_keys, "output")?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposeTradeRequest {
    pub market: MarketDto,
    pub trade_type: TradeType,
    pub swap_request: SwapRequestDto,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwapAcceptDto {
    /// Names the swap in a later failure notice.
    pub id: String,
    pub request_id: String,
    pub transaction: String,
    pub input_blinding_keys: KeyMap,
    pub output_blinding_keys: KeyMap,
    /// Unix seconds.
    pub expiry: i64,
}

impl From<SwapAccept> for SwapAcceptDto {
    fn from(a: SwapAccept) -> Self {
        Self {
            id: a.swap_id.to_string(),
            request_id: a.request_id,
            transaction: encode_pset(&a.pset),
            input_blinding_keys: keys_to_hex(&a.input_blinding_keys),
            output_blinding_keys: keys_to_hex(&a.output_blinding_keys),
            expiry: a.expiry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapFailDto {
    pub request_id: String,
    pub kind: ErrorKind,
    pub reason: String,
}

impl From<SwapFail> for SwapFailDto {
    fn from(f: SwapFail) -> Self {
        Self {
            request_id: f.request_id,
            kind: f.kind,
            reason: f.reason,
        }
    }
}

/// Exactly one of `swap_accept` or `swap_fail`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposeTradeResponse {
    SwapAccept(SwapAcceptDto),
    SwapFail(SwapFailDto),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompleteTradeRequest {
    /// Hex transaction or base64/hex PSET carrying every signature.
    SwapComplete { transaction: String },
    SwapFail { id: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompleteTradeResponse {
    TxHash(String),
    SwapFail { kind: ErrorKind, reason: String },
}

impl From<TxHashOrError> for CompleteTradeResponse {
    fn from(reply: TxHashOrError) -> Self {
        match reply {
            TxHashOrError::Broadcast { txid } => CompleteTradeResponse::TxHash(txid.to_string()),
            TxHashOrError::Failed { kind, reason } => {
                CompleteTradeResponse::SwapFail { kind, reason }
            }
        }
    }
}
