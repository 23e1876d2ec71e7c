//! What the engine needs from the maker's wallet.
//!
//! The traits are split by concern so tests can stand in for any one of
//! them; [`MakerWallet`] bundles them for the engine.

mod lwk;

pub use lwk::LwkWallet;

use std::collections::HashMap;
use std::sync::Arc;

use lwk_wollet::elements::pset::PartiallySignedTransaction;
use lwk_wollet::elements::secp256k1_zkp::SecretKey;
use lwk_wollet::elements::{Address, AssetId, Script, Transaction};

use crate::error::Result;
use crate::pset::UnblindedUtxo;

/// A maker address together with the private key that blinds outputs to it.
#[derive(Debug, Clone)]
pub struct MakerAddress {
    pub address: Address,
    pub blinding_key: SecretKey,
}

impl MakerAddress {
    pub fn script_pubkey(&self) -> Script {
        self.address.script_pubkey()
    }
}

pub trait BalanceOracle {
    /// Bring the local view up to date with the chain. Balances and unspent
    /// outputs read whatever the last refresh saw.
    fn refresh(&self) -> Result<()> {
        Ok(())
    }

    /// Holdings per asset as of the last refresh. Assets the wallet never
    /// held are absent.
    fn balances(&self) -> Result<HashMap<AssetId, u64>>;
}

pub trait AddressProvider {
    /// Never returns the same address twice within a process lifetime.
    fn next_receiving_address(&self) -> Result<MakerAddress>;
    fn next_change_address(&self) -> Result<MakerAddress>;
    /// Blinding private key for one of the wallet's own scripts.
    fn blinding_key_for(&self, script: &Script) -> Result<SecretKey>;
}

pub trait UtxoSource {
    fn unspent_outputs(&self) -> Result<Vec<UnblindedUtxo>>;
}

pub trait LedgerSigner {
    /// Add the maker's signatures for the inputs it owns.
    fn sign(&self, pset: PartiallySignedTransaction) -> Result<PartiallySignedTransaction>;
    /// Finalize every input and extract the network transaction.
    fn finalize(&self, pset: PartiallySignedTransaction) -> Result<Transaction>;
}

/// Everything the swap engine asks of the maker.
pub trait MakerWallet: BalanceOracle + AddressProvider + UtxoSource + LedgerSigner {}

impl<T: BalanceOracle + AddressProvider + UtxoSource + LedgerSigner + ?Sized> MakerWallet for T {}

// ── Shared handles ──────────────────────────────────────────────────────

impl<T: BalanceOracle + ?Sized> BalanceOracle for Arc<T> {
    fn refresh(&self) -> Result<()> {
        (**self).refresh()
    }

    fn balances(&self) -> Result<HashMap<AssetId, u64>> {
        (**self).balances()
    }
}

impl<T: AddressProvider + ?Sized> AddressProvider for Arc<T> {
    fn next_receiving_address(&self) -> Result<MakerAddress> {
        (**self).next_receiving_address()
    }

    fn next_change_address(&self) -> Result<MakerAddress> {
        (**self).next_change_address()
    }

    fn blinding_key_for(&self, script: &Script) -> Result<SecretKey> {
        (**self).blinding_key_for(script)
    }
}

impl<T: UtxoSource + ?Sized> UtxoSource for Arc<T> {
    fn unspent_outputs(&self) -> Result<Vec<UnblindedUtxo>> {
        (**self).unspent_outputs()
    }
}

impl<T: LedgerSigner + ?Sized> LedgerSigner for Arc<T> {
    fn sign(&self, pset: PartiallySignedTransaction) -> Result<PartiallySignedTransaction> {
        (**self).sign(pset)
    }

    fn finalize(&self, pset: PartiallySignedTransaction) -> Result<Transaction> {
        (**self).finalize(pset)
    }
}
