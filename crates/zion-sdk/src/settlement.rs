//! Turns the counterparty's fully signed swap into a broadcast transaction.

use lwk_wollet::elements::{Transaction, Txid};

use crate::chain::Broadcaster;
use crate::error::{Error, Result};
use crate::pset::{decode_pset, decode_tx_hex};
use crate::wallet::LedgerSigner;

/// Decode and finalize a signed swap.
///
/// The text is tried as a PSET (base64, then hex) which gets finalized and
/// extracted. If that fails it is read as a raw transaction in hex.
pub fn finalize_settlement<S>(signer: &S, text: &str) -> Result<Transaction>
where
    S: LedgerSigner + ?Sized,
{
    let pset_err = match decode_pset(text) {
        Ok(pset) => match signer.finalize(pset) {
            Ok(tx) => return Ok(tx),
            Err(e) => e,
        },
        Err(e) => e,
    };
    log::debug!("not a finalizable PSET ({pset_err}), trying raw transaction");

    decode_tx_hex(text).map_err(|tx_err| {
        Error::MalformedTransaction(format!(
            "neither a signed PSET ({pset_err}) nor a raw transaction ({tx_err})"
        ))
    })
}

/// Finalize and broadcast. Broadcaster rejections keep their message.
pub fn complete_settlement<S, B>(signer: &S, broadcaster: &B, text: &str) -> Result<Txid>
where
    S: LedgerSigner + ?Sized,
    B: Broadcaster + ?Sized,
{
    let tx = finalize_settlement(signer, text)?;
    let txid = broadcaster.broadcast(&tx).map_err(|e| match e {
        Error::BroadcastFailed(msg) => Error::BroadcastFailed(msg),
        other => Error::BroadcastFailed(other.to_string()),
    })?;
    log::info!("settlement {txid} broadcast");
    Ok(txid)
}
