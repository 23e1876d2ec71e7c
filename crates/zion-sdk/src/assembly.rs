//! Completes a counterparty's swap PSET with the maker's side of the trade.

use lwk_wollet::elements::pset::PartiallySignedTransaction;
use lwk_wollet::elements::{AssetId, Script};

use crate::coin_select::{ChangeOutput, Commitment, Selection, Target, UtxoPool};
use crate::error::Result;
use crate::fee::estimate_fee;
use crate::market::SwapTerms;
use crate::pset::{UnblindedUtxo, add_pset_input, add_pset_output, explicit_txout, fee_txout};

/// Everything the maker contributes to one swap, besides its funds.
pub struct AssemblyParams<'a> {
    pub terms: &'a SwapTerms,
    /// Receives the counterparty's payment.
    pub receive_script: &'a Script,
    /// Receives the surplus of every selection.
    pub change_script: &'a Script,
    pub native_asset: AssetId,
    pub fee_rate: f64,
}

/// Result of assembling a swap transaction (before blinding and signing).
#[derive(Debug, Clone)]
pub struct AssembledSwap {
    pub pset: PartiallySignedTransaction,
    pub trade_inputs: Vec<UnblindedUtxo>,
    pub fee_inputs: Vec<UnblindedUtxo>,
    pub fee_amount: u64,
    /// Index of the first maker input in the PSET.
    pub first_maker_input: usize,
}

impl AssembledSwap {
    pub fn maker_inputs(&self) -> impl Iterator<Item = &UnblindedUtxo> {
        self.trade_inputs.iter().chain(self.fee_inputs.iter())
    }
}

/// Append the maker payout, the maker's trade funds with change, and a
/// network fee paid from outputs the trade pass did not take.
pub fn complete_swap_pset(
    mut pset: PartiallySignedTransaction,
    params: &AssemblyParams<'_>,
    pool: &mut UtxoPool,
) -> Result<AssembledSwap> {
    let terms = params.terms;
    let first_maker_input = pset.n_inputs();

    let trade = pool.select(
        &[Target {
            asset: terms.output_asset,
            amount: terms.output_amount,
        }],
        Commitment::Trade,
    )?;

    add_pset_output(
        &mut pset,
        explicit_txout(&terms.input_asset, terms.input_amount, params.receive_script),
    );
    add_selection(&mut pset, &trade, params.change_script);

    let fee_amount = estimate_fee(pset.n_inputs() + 1, pset.n_outputs() + 1, params.fee_rate);
    let fee = pool.select(
        &[Target {
            asset: params.native_asset,
            amount: fee_amount,
        }],
        Commitment::Fee,
    )?;
    add_selection(&mut pset, &fee, params.change_script);
    add_pset_output(&mut pset, fee_txout(&params.native_asset, fee_amount));

    log::debug!(
        "assembled swap: {} trade inputs, {} fee inputs, fee {fee_amount}",
        trade.utxos.len(),
        fee.utxos.len()
    );

    Ok(AssembledSwap {
        pset,
        trade_inputs: trade.utxos,
        fee_inputs: fee.utxos,
        fee_amount,
        first_maker_input,
    })
}

fn add_selection(pset: &mut PartiallySignedTransaction, selection: &Selection, change: &Script) {
    for utxo in &selection.utxos {
        add_pset_input(pset, utxo);
    }
    for ChangeOutput { asset, amount } in &selection.change {
        add_pset_output(pset, explicit_txout(asset, *amount, change));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::pset::new_pset;
    use lwk_wollet::elements::hashes::Hash;
    use lwk_wollet::elements::{OutPoint, Txid};

    fn asset(byte: u8) -> AssetId {
        AssetId::from_slice(&[byte; 32]).unwrap()
    }

    fn utxo(n: u8, asset_byte: u8, value: u64) -> UnblindedUtxo {
        let outpoint = OutPoint::new(Txid::from_byte_array([n; 32]), 0);
        let txout = explicit_txout(&asset(asset_byte), value, &Script::from(vec![0x51, n]));
        UnblindedUtxo::explicit(outpoint, txout).unwrap()
    }

    const BASE: u8 = 0xaa;
    const QUOTE: u8 = 0xbb;
    const LBTC: u8 = 0xcc;

    fn terms() -> SwapTerms {
        SwapTerms {
            input_asset: asset(QUOTE),
            input_amount: 100,
            output_asset: asset(BASE),
            output_amount: 1,
        }
    }

    fn counterparty_pset() -> PartiallySignedTransaction {
        let mut pset = new_pset();
        add_pset_input(&mut pset, &utxo(0x10, QUOTE, 100));
        add_pset_output(
            &mut pset,
            explicit_txout(&asset(BASE), 1, &Script::from(vec![0x52])),
        );
        pset
    }

    fn assemble(pool: &mut UtxoPool) -> Result<AssembledSwap> {
        let t = terms();
        let receive = Script::from(vec![0x53]);
        let change = Script::from(vec![0x54]);
        let params = AssemblyParams {
            terms: &t,
            receive_script: &receive,
            change_script: &change,
            native_asset: asset(LBTC),
            fee_rate: 0.1,
        };
        complete_swap_pset(counterparty_pset(), &params, pool)
    }

    #[test]
    fn layout_is_payout_trade_then_fee() {
        let mut pool = UtxoPool::new(vec![utxo(1, BASE, 5), utxo(2, LBTC, 10_000)]);
        let swap = assemble(&mut pool).unwrap();
        let outputs = swap.pset.outputs();

        // counterparty receive, maker payout, base change, fee change, fee
        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[1].asset, Some(asset(QUOTE)));
        assert_eq!(outputs[1].amount, Some(100));
        assert_eq!(outputs[1].script_pubkey, Script::from(vec![0x53]));
        assert_eq!(outputs[2].amount, Some(4));
        assert_eq!(outputs[2].script_pubkey, Script::from(vec![0x54]));
        assert_eq!(outputs[3].amount, Some(10_000 - swap.fee_amount));
        assert!(outputs[4].script_pubkey.is_empty());
        assert_eq!(outputs[4].amount, Some(swap.fee_amount));

        assert_eq!(swap.pset.n_inputs(), 3);
        assert_eq!(swap.first_maker_input, 1);
    }

    #[test]
    fn fee_counts_the_outputs_about_to_be_added() {
        let mut pool = UtxoPool::new(vec![utxo(1, BASE, 1), utxo(2, LBTC, 10_000)]);
        let swap = assemble(&mut pool).unwrap();
        // before the fee pass: 2 inputs, 2 outputs (exact trade cover)
        assert_eq!(swap.fee_amount, estimate_fee(3, 3, 0.1));
    }

    #[test]
    fn fee_pass_never_reuses_trade_inputs() {
        // A single native output can cover the trade or the fee, not both.
        let mut pool = UtxoPool::new(vec![utxo(1, LBTC, 10_000)]);
        let mut t = terms();
        t.output_asset = asset(LBTC);
        t.output_amount = 1_000;
        let receive = Script::from(vec![0x53]);
        let change = Script::from(vec![0x54]);
        let params = AssemblyParams {
            terms: &t,
            receive_script: &receive,
            change_script: &change,
            native_asset: asset(LBTC),
            fee_rate: 0.1,
        };
        let err = complete_swap_pset(counterparty_pset(), &params, &mut pool).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds(_)));

        let mut pool = UtxoPool::new(vec![utxo(1, LBTC, 10_000), utxo(2, LBTC, 500)]);
        let swap = complete_swap_pset(counterparty_pset(), &params, &mut pool).unwrap();
        let trade: Vec<_> = swap.trade_inputs.iter().map(|u| u.outpoint).collect();
        assert!(swap.fee_inputs.iter().all(|u| !trade.contains(&u.outpoint)));
    }

    #[test]
    fn missing_fee_funds_is_insufficient() {
        let mut pool = UtxoPool::new(vec![utxo(1, BASE, 5)]);
        assert!(matches!(
            assemble(&mut pool),
            Err(Error::InsufficientFunds(_))
        ));
    }

    #[test]
    fn missing_trade_funds_is_insufficient() {
        let mut pool = UtxoPool::new(vec![utxo(2, LBTC, 10_000)]);
        assert!(matches!(
            assemble(&mut pool),
            Err(Error::InsufficientFunds(_))
        ));
    }
}
