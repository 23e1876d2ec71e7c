//! The swap engine: admission, assembly, blinding and settlement for one
//! market.

use std::time::Duration;

use lwk_wollet::elements::pset::PartiallySignedTransaction;
use lwk_wollet::elements::{AssetId, OutPoint, Script, Txid};

use crate::assembly::{AssemblyParams, complete_swap_pset};
use crate::blinding::{BlindingKeys, blind_swap_pset, plan_blinding};
use crate::chain::Broadcaster;
use crate::coin_select::UtxoPool;
use crate::error::{Error, Result};
use crate::fee::DEFAULT_FEE_RATE;
use crate::market::{Balance, DEFAULT_FEE, Market, Price, PriceWithFee, SwapTerms, TradeType};
use crate::price::quote_preview;
use crate::reservation::{ReservationToken, Reservations};
use crate::settlement::complete_settlement;
use crate::validate::{
    require_enough_balance, require_valid_asset, require_valid_market, require_valid_price,
    require_valid_trade_type,
};
use crate::wallet::{MakerAddress, MakerWallet};

/// How long an accepted swap may wait for the counterparty's signature.
pub const DEFAULT_TRADE_EXPIRY: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub market: Market,
    pub price: Price,
    /// sat/vbyte
    pub fee_rate: f64,
    pub trade_expiry: Duration,
    /// Asset paying network fees.
    pub native_asset: AssetId,
}

impl EngineConfig {
    pub fn new(market: Market, price: Price, native_asset: AssetId) -> Self {
        Self {
            market,
            price,
            fee_rate: DEFAULT_FEE_RATE,
            trade_expiry: DEFAULT_TRADE_EXPIRY,
            native_asset,
        }
    }
}

/// A counterparty's swap proposal.
#[derive(Debug, Clone)]
pub struct SwapRequest {
    pub id: String,
    pub terms: SwapTerms,
    /// The counterparty's funding inputs and receiving output.
    pub pset: PartiallySignedTransaction,
    pub input_blinding_keys: BlindingKeys,
    pub output_blinding_keys: BlindingKeys,
}

/// The maker's completed, blinded and signed side of a swap.
#[derive(Debug, Clone)]
pub struct SwapAccept {
    pub swap_id: ReservationToken,
    pub request_id: String,
    pub pset: PartiallySignedTransaction,
    pub input_blinding_keys: BlindingKeys,
    pub output_blinding_keys: BlindingKeys,
    /// Unix seconds after which the maker may spend the inputs elsewhere.
    pub expiry: i64,
}

pub struct SwapEngine<W, B> {
    config: EngineConfig,
    wallet: W,
    broadcaster: B,
    reservations: Reservations,
}

impl<W: MakerWallet, B: Broadcaster> SwapEngine<W, B> {
    pub fn new(config: EngineConfig, wallet: W, broadcaster: B) -> Self {
        let reservations = Reservations::new(config.trade_expiry);
        Self {
            config,
            wallet,
            broadcaster,
            reservations,
        }
    }

    pub fn market(&self) -> &Market {
        &self.config.market
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Fresh holdings of the two market assets.
    pub fn balance(&self) -> Result<Balance> {
        self.wallet.refresh()?;
        self.holdings()
    }

    /// Holdings of the two market assets as of the last refresh.
    fn holdings(&self) -> Result<Balance> {
        let balances = self.wallet.balances()?;
        let market = &self.config.market;
        Ok(Balance {
            base_amount: balances.get(&market.base_asset).copied().unwrap_or(0),
            quote_amount: balances.get(&market.quote_asset).copied().unwrap_or(0),
        })
    }

    /// Counter-asset amount for `amount` of `asset`, with price and
    /// liquidity.
    pub fn quote(
        &self,
        market: &Market,
        trade_type: TradeType,
        amount: u64,
        asset: &AssetId,
    ) -> Result<PriceWithFee> {
        require_valid_market(&self.config.market, market)?;
        require_valid_asset(market, asset)?;
        let balance = self.balance()?;
        let preview = quote_preview(
            trade_type,
            market.is_base(asset),
            amount as f64,
            &self.config.price,
        );
        Ok(PriceWithFee {
            price: self.config.price,
            fee: DEFAULT_FEE,
            amount: preview,
            asset: market.counter_asset(asset),
            balance,
        })
    }

    // ── Trade ───────────────────────────────────────────────────────────

    /// Check a proposal against the market, the price and live balances.
    pub fn admit(
        &self,
        market: &Market,
        trade_type: TradeType,
        terms: &SwapTerms,
    ) -> Result<Balance> {
        require_valid_market(&self.config.market, market)?;
        require_valid_trade_type(market, trade_type, terms)?;
        require_valid_price(trade_type, terms, &self.config.price)?;
        let balance = self.balance()?;
        require_enough_balance(trade_type, terms, &balance)?;
        Ok(balance)
    }

    /// Admit, complete, blind and sign a proposed swap.
    ///
    /// The wallet is refreshed once; admission and coin selection read the
    /// same snapshot. The maker's inputs stay reserved until the swap expires or is
    /// abandoned.
    pub fn propose(
        &self,
        market: &Market,
        trade_type: TradeType,
        request: SwapRequest,
    ) -> Result<SwapAccept> {
        let SwapRequest {
            id: request_id,
            terms,
            pset,
            input_blinding_keys,
            output_blinding_keys,
        } = request;
        self.admit(market, trade_type, &terms)?;

        let receive = self.wallet.next_receiving_address()?;
        let change = self.wallet.next_change_address()?;
        let utxos = self
            .reservations
            .filter_available(self.wallet.unspent_outputs()?)?;
        let mut pool = UtxoPool::new(utxos);

        let receive_script = receive.script_pubkey();
        let change_script = change.script_pubkey();
        let assembled = complete_swap_pset(
            pset,
            &AssemblyParams {
                terms: &terms,
                receive_script: &receive_script,
                change_script: &change_script,
                native_asset: self.config.native_asset,
                fee_rate: self.config.fee_rate,
            },
            &mut pool,
        )?;

        let outpoints: Vec<OutPoint> = assembled.maker_inputs().map(|u| u.outpoint).collect();
        let token = self.reservations.reserve(&outpoints)?;

        let maker_scripts: Vec<Script> = assembled
            .maker_inputs()
            .map(|u| u.script_pubkey().clone())
            .collect();
        let blinder_index = assembled.first_maker_input as u32;
        let signed = self.blind_and_sign(
            assembled.pset,
            &input_blinding_keys,
            &output_blinding_keys,
            &maker_scripts,
            &[receive, change],
            blinder_index,
        );
        let (pset, input_blinding_keys, output_blinding_keys) = match signed {
            Ok(parts) => parts,
            Err(e) => {
                self.reservations.release(token)?;
                return Err(e);
            }
        };

        let expiry = chrono::Utc::now().timestamp() + self.config.trade_expiry.as_secs() as i64;
        log::info!(
            "accepted {trade_type} swap {token} for request {request_id}: {} of {} for {} of {}",
            terms.output_amount,
            terms.output_asset,
            terms.input_amount,
            terms.input_asset
        );
        Ok(SwapAccept {
            swap_id: token,
            request_id,
            pset,
            input_blinding_keys,
            output_blinding_keys,
            expiry,
        })
    }

    /// Merge the maker's keys into the request maps, then blind and sign.
    /// Nothing is blinded unless every input and output has a key.
    fn blind_and_sign(
        &self,
        mut pset: PartiallySignedTransaction,
        input_keys: &BlindingKeys,
        output_keys: &BlindingKeys,
        maker_scripts: &[Script],
        maker_addresses: &[MakerAddress],
        blinder_index: u32,
    ) -> Result<(PartiallySignedTransaction, BlindingKeys, BlindingKeys)> {
        let mut input_extra = Vec::with_capacity(maker_scripts.len());
        for script in maker_scripts {
            input_extra.push((script.clone(), self.wallet.blinding_key_for(script)?));
        }
        let output_extra = maker_addresses
            .iter()
            .map(|a| (a.script_pubkey(), a.blinding_key));

        let input_keys = input_keys.merged(input_extra);
        let output_keys = output_keys.merged(output_extra);

        let plan = plan_blinding(&pset, &input_keys, &output_keys)?;
        blind_swap_pset(&mut pset, &plan, blinder_index)?;
        let pset = self.wallet.sign(pset)?;
        Ok((pset, input_keys, output_keys))
    }

    /// Finalize and broadcast the counterparty-signed swap.
    pub fn complete(&self, signed: &str) -> Result<Txid> {
        complete_settlement(&self.wallet, &self.broadcaster, signed)
    }

    /// Release the inputs of a swap the counterparty gave up on.
    pub fn abandon(&self, swap_id: &str) -> Result<usize> {
        let token: ReservationToken = swap_id.parse().map_err(Error::UnknownSwap)?;
        let freed = self.reservations.release(token)?;
        if freed == 0 {
            return Err(Error::UnknownSwap(swap_id.to_string()));
        }
        log::info!("swap {token} abandoned, {freed} inputs released");
        Ok(freed)
    }
}
