use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use lwk_wollet::elements::confidential::{
    Asset, AssetBlindingFactor, Nonce, Value as ConfValue, ValueBlindingFactor,
};
use lwk_wollet::elements::encode::{deserialize, serialize};
use lwk_wollet::elements::pset::PartiallySignedTransaction;
use lwk_wollet::elements::{
    AssetId, OutPoint, Script, Sequence, Transaction, TxOut, TxOutSecrets, TxOutWitness,
};

use crate::error::{Error, Result};

/// A maker-owned unspent output with its secrets revealed.
#[derive(Debug, Clone, PartialEq)]
pub struct UnblindedUtxo {
    pub outpoint: OutPoint,
    pub txout: TxOut,
    pub secrets: TxOutSecrets,
}

impl UnblindedUtxo {
    /// Wrap an explicit output, whose secrets carry zero blinding factors.
    pub fn explicit(outpoint: OutPoint, txout: TxOut) -> Result<Self> {
        let secrets = explicit_secrets(&txout)?;
        Ok(Self {
            outpoint,
            txout,
            secrets,
        })
    }

    pub fn asset(&self) -> AssetId {
        self.secrets.asset
    }

    pub fn value(&self) -> u64 {
        self.secrets.value
    }

    pub fn script_pubkey(&self) -> &Script {
        &self.txout.script_pubkey
    }
}

/// Secrets of an unblinded output: the explicit asset and value with zero
/// blinding factors.
pub fn explicit_secrets(txout: &TxOut) -> Result<TxOutSecrets> {
    match (txout.asset, txout.value) {
        (Asset::Explicit(asset), ConfValue::Explicit(value)) => Ok(TxOutSecrets::new(
            asset,
            AssetBlindingFactor::zero(),
            value,
            ValueBlindingFactor::zero(),
        )),
        _ => Err(Error::Pset("output is not explicit".into())),
    }
}

pub(crate) fn new_pset() -> PartiallySignedTransaction {
    PartiallySignedTransaction::new_v2()
}

/// Build an explicit (non-confidential) TxOut.
pub fn explicit_txout(asset_id: &AssetId, amount: u64, script_pubkey: &Script) -> TxOut {
    TxOut {
        asset: Asset::Explicit(*asset_id),
        value: ConfValue::Explicit(amount),
        nonce: Nonce::Null,
        script_pubkey: script_pubkey.clone(),
        witness: TxOutWitness::default(),
    }
}

/// Network fee output: explicit, empty script.
pub fn fee_txout(asset_id: &AssetId, amount: u64) -> TxOut {
    explicit_txout(asset_id, amount, &Script::new())
}

pub(crate) fn add_pset_input(pset: &mut PartiallySignedTransaction, utxo: &UnblindedUtxo) {
    let input = lwk_wollet::elements::pset::Input {
        previous_txid: utxo.outpoint.txid,
        previous_output_index: utxo.outpoint.vout,
        witness_utxo: Some(utxo.txout.clone()),
        sequence: Some(Sequence::ENABLE_LOCKTIME_NO_RBF),
        ..Default::default()
    };
    pset.add_input(input);
}

pub(crate) fn add_pset_output(pset: &mut PartiallySignedTransaction, txout: TxOut) {
    let output = lwk_wollet::elements::pset::Output {
        amount: match txout.value {
            ConfValue::Explicit(v) => Some(v),
            _ => None,
        },
        asset: match txout.asset {
            Asset::Explicit(id) => Some(id),
            _ => None,
        },
        script_pubkey: txout.script_pubkey,
        ..Default::default()
    };
    pset.add_output(output);
}

/// The output spent by input `index`, from `witness_utxo` or from the full
/// previous transaction.
pub fn previous_output(pset: &PartiallySignedTransaction, index: usize) -> Option<TxOut> {
    let input = pset.inputs().get(index)?;
    if let Some(txout) = &input.witness_utxo {
        return Some(txout.clone());
    }
    input
        .non_witness_utxo
        .as_ref()
        .and_then(|tx| tx.output.get(input.previous_output_index as usize))
        .cloned()
}

// ── Encoding ────────────────────────────────────────────────────────────

pub fn encode_pset(pset: &PartiallySignedTransaction) -> String {
    BASE64.encode(serialize(pset))
}

/// Decode a PSET from base64, falling back to hex.
pub fn decode_pset(text: &str) -> Result<PartiallySignedTransaction> {
    let text = text.trim();
    // Hex text is also valid base64, so a base64 decode alone proves nothing.
    if let Some(pset) = BASE64.decode(text).ok().and_then(|b| deserialize(&b).ok()) {
        return Ok(pset);
    }
    let bytes = hex::decode(text)
        .map_err(|e| Error::MalformedTransaction(format!("PSET is neither base64 nor hex: {e}")))?;
    deserialize(&bytes).map_err(|e| Error::MalformedTransaction(format!("bad PSET: {e}")))
}

/// Decode a raw transaction from hex.
pub fn decode_tx_hex(text: &str) -> Result<Transaction> {
    let bytes = hex::decode(text.trim())
        .map_err(|e| Error::MalformedTransaction(format!("bad hex: {e}")))?;
    deserialize(&bytes).map_err(|e| Error::MalformedTransaction(format!("bad transaction: {e}")))
}
