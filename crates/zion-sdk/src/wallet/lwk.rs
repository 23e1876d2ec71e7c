use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use lwk_common::Signer;
use lwk_signer::SwSigner;
use lwk_wollet::blocking::BlockchainBackend;
use lwk_wollet::elements::pset::PartiallySignedTransaction;
use lwk_wollet::elements::secp256k1_zkp::SecretKey;
use lwk_wollet::elements::{AssetId, Script, Transaction, Txid};
use lwk_wollet::{WalletTxOut, Wollet, WolletDescriptor};

use super::{AddressProvider, BalanceOracle, LedgerSigner, MakerAddress, UtxoSource};
use crate::chain::ElectrumBackend;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::pset::UnblindedUtxo;

/// Single-signature software wallet on a `ct(slip77, elwpkh)` descriptor.
pub struct LwkWallet {
    signer: SwSigner,
    wollet: RwLock<Wollet>,
    chain: ElectrumBackend,
    next_index: AtomicU32,
}

impl LwkWallet {
    pub fn new(
        mnemonic: &str,
        network: Network,
        electrum_url: &str,
        datadir: &Path,
    ) -> Result<Self> {
        let signer = SwSigner::new(mnemonic, network.is_mainnet())
            .map_err(|e| Error::Signer(e.to_string()))?;

        let slip77_key = signer
            .slip77_master_blinding_key()
            .map_err(|e| Error::Signer(e.to_string()))?;
        let xpub = signer.xpub();
        let descriptor_str = format!("ct(slip77({}),elwpkh({}/*))", slip77_key, xpub);
        let descriptor: WolletDescriptor = descriptor_str
            .parse()
            .map_err(|e: lwk_wollet::Error| Error::Descriptor(e.to_string()))?;

        let persist_dir = datadir.join(network.as_str()).join("wallet_db");
        let wollet = Wollet::with_fs_persist(network.into_lwk(), descriptor, &persist_dir)
            .map_err(|e| Error::WalletInit(e.to_string()))?;

        let first_unused = wollet
            .address(None)
            .map_err(|e| Error::Query(e.to_string()))?
            .index();
        log::info!(
            "wallet loaded on {network}, next address index {first_unused}, data in {}",
            persist_dir.display()
        );

        Ok(Self {
            signer,
            wollet: RwLock::new(wollet),
            chain: ElectrumBackend::new(electrum_url),
            next_index: AtomicU32::new(first_unused),
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Wollet>> {
        self.wollet.read().map_err(|_| Error::MutexPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Wollet>> {
        self.wollet.write().map_err(|_| Error::MutexPoisoned)
    }

    /// Scan the chain and apply what changed.
    ///
    /// The scan only needs a shared borrow, so addresses, signing and
    /// finalization keep working while Electrum answers.
    pub fn sync(&self) -> Result<()> {
        let mut client = self.chain.client()?;
        let update = {
            let wollet = self.read()?;
            client
                .full_scan(&*wollet)
                .map_err(|e| Error::Electrum(e.to_string()))?
        };
        if let Some(update) = update {
            self.write()?
                .apply_update(update)
                .map_err(|e| Error::Electrum(e.to_string()))?;
        }
        // Addresses handed out earlier may have been used since the last scan.
        let first_unused = self
            .read()?
            .address(None)
            .map_err(|e| Error::Query(e.to_string()))?
            .index();
        self.next_index.fetch_max(first_unused, Ordering::SeqCst);
        Ok(())
    }

    fn derive_address(&self) -> Result<MakerAddress> {
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        let address = self
            .read()?
            .address(Some(index))
            .map_err(|e| Error::Query(e.to_string()))?
            .address()
            .clone();
        let blinding_key = self.blinding_key_for(&address.script_pubkey())?;
        Ok(MakerAddress {
            address,
            blinding_key,
        })
    }
}

impl BalanceOracle for LwkWallet {
    fn refresh(&self) -> Result<()> {
        self.sync()
    }

    fn balances(&self) -> Result<HashMap<AssetId, u64>> {
        let balance = self
            .read()?
            .balance()
            .map_err(|e| Error::Query(e.to_string()))?;
        Ok(balance.iter().map(|(k, v)| (*k, *v)).collect())
    }
}

impl AddressProvider for LwkWallet {
    fn next_receiving_address(&self) -> Result<MakerAddress> {
        self.derive_address()
    }

    fn next_change_address(&self) -> Result<MakerAddress> {
        self.derive_address()
    }

    fn blinding_key_for(&self, script: &Script) -> Result<SecretKey> {
        let master = self
            .signer
            .slip77_master_blinding_key()
            .map_err(|e| Error::Signer(e.to_string()))?;
        Ok(master.blinding_private_key(script))
    }
}

impl UtxoSource for LwkWallet {
    fn unspent_outputs(&self) -> Result<Vec<UnblindedUtxo>> {
        let wollet = self.read()?;
        let utxos = wollet.utxos().map_err(|e| Error::Query(e.to_string()))?;
        let txs = wollet
            .transactions()
            .map_err(|e| Error::Query(e.to_string()))?;
        let by_txid: HashMap<Txid, &Transaction> = txs.iter().map(|t| (t.txid, &t.tx)).collect();

        let mut out = Vec::with_capacity(utxos.len());
        for utxo in utxos.iter().filter(|u| !u.is_spent) {
            match wallet_txout_to_unblinded(utxo, &by_txid) {
                Some(u) => out.push(u),
                None => log::warn!("skipping {}: funding transaction not in wallet", utxo.outpoint),
            }
        }
        Ok(out)
    }
}

impl LedgerSigner for LwkWallet {
    fn sign(&self, mut pset: PartiallySignedTransaction) -> Result<PartiallySignedTransaction> {
        self.read()?
            .add_details(&mut pset)
            .map_err(|e| Error::Signer(format!("add_details: {}", e)))?;
        let signed = self
            .signer
            .sign(&mut pset)
            .map_err(|e| Error::Signer(format!("{:?}", e)))?;
        log::debug!("added {signed} signatures");
        Ok(pset)
    }

    fn finalize(&self, mut pset: PartiallySignedTransaction) -> Result<Transaction> {
        self.read()?
            .finalize(&mut pset)
            .map_err(|e| Error::Finalize(e.to_string()))
    }
}

fn wallet_txout_to_unblinded(
    utxo: &WalletTxOut,
    txs: &HashMap<Txid, &Transaction>,
) -> Option<UnblindedUtxo> {
    let txout = txs
        .get(&utxo.outpoint.txid)?
        .output
        .get(utxo.outpoint.vout as usize)?
        .clone();
    Some(UnblindedUtxo {
        outpoint: utxo.outpoint,
        txout,
        secrets: utxo.unblinded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lwk_wollet::elements::secp256k1_zkp::{PublicKey, Secp256k1};

    const MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn wallet(dir: &Path) -> LwkWallet {
        LwkWallet::new(
            MNEMONIC,
            Network::LiquidRegtest,
            Network::LiquidRegtest.default_electrum_url(),
            dir,
        )
        .unwrap()
    }

    #[test]
    fn addresses_are_never_reused() {
        let dir = tempfile::tempdir().unwrap();
        let w = wallet(dir.path());
        let a = w.next_receiving_address().unwrap();
        let b = w.next_change_address().unwrap();
        let c = w.next_receiving_address().unwrap();
        assert_ne!(a.script_pubkey(), b.script_pubkey());
        assert_ne!(a.script_pubkey(), c.script_pubkey());
        assert_ne!(b.script_pubkey(), c.script_pubkey());
    }

    #[test]
    fn blinding_key_matches_address() {
        let dir = tempfile::tempdir().unwrap();
        let w = wallet(dir.path());
        let addr = w.next_receiving_address().unwrap();
        let secp = Secp256k1::new();
        assert_eq!(
            addr.address.blinding_pubkey,
            Some(PublicKey::from_secret_key(&secp, &addr.blinding_key))
        );
        assert_eq!(
            w.blinding_key_for(&addr.script_pubkey()).unwrap(),
            addr.blinding_key
        );
    }

    #[test]
    fn wallet_stays_usable_while_a_scan_holds_it() {
        let dir = tempfile::tempdir().unwrap();
        let w = wallet(dir.path());
        let scanning = w.read().unwrap();
        std::thread::scope(|s| {
            s.spawn(|| {
                let a = w.next_receiving_address().unwrap();
                let b = w.next_change_address().unwrap();
                assert_ne!(a.script_pubkey(), b.script_pubkey());
                assert!(w.balances().unwrap().values().all(|v| *v == 0));
                assert!(w.unspent_outputs().unwrap().is_empty());
            })
            .join()
            .unwrap();
        });
        drop(scanning);
    }

    #[test]
    fn bad_mnemonic_is_a_signer_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LwkWallet::new("not a mnemonic", Network::LiquidRegtest, "", dir.path())
            .err()
            .unwrap();
        assert!(matches!(err, Error::Signer(_)));
    }
}
