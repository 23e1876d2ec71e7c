//! In-memory collaborators and fixtures for driving the engine without a
//! wallet database or a network.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use lwk_wollet::elements::hashes::Hash;
use lwk_wollet::elements::pset::PartiallySignedTransaction;
use lwk_wollet::elements::secp256k1_zkp::{PublicKey, Secp256k1, SecretKey};
use lwk_wollet::elements::{Address, AddressParams, AssetId, OutPoint, Script, Transaction, Txid};

use crate::blinding::BlindingKeys;
use crate::chain::Broadcaster;
use crate::engine::SwapRequest;
use crate::error::{Error, Result};
use crate::market::SwapTerms;
use crate::pset::{UnblindedUtxo, add_pset_input, add_pset_output, explicit_txout, new_pset};
use crate::wallet::{AddressProvider, BalanceOracle, LedgerSigner, MakerAddress, UtxoSource};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn asset(byte: u8) -> AssetId {
    AssetId::from_slice(&[byte; 32]).expect("valid asset")
}

pub fn txid(byte: u8) -> Txid {
    Txid::from_byte_array([byte; 32])
}

/// Deterministic key from a tag byte and an index.
pub fn secret_key(tag: u8, index: u32) -> SecretKey {
    let mut bytes = [tag; 32];
    bytes[28..].copy_from_slice(&(index + 1).to_be_bytes());
    SecretKey::from_slice(&bytes).expect("valid key")
}

/// Confidential P2WPKH address with its blinding private key.
pub fn p2wpkh_address(spend_key: &SecretKey, blinding_key: &SecretKey) -> Address {
    let secp = Secp256k1::new();
    let pk = lwk_wollet::elements::bitcoin::PublicKey {
        inner: PublicKey::from_secret_key(&secp, spend_key),
        compressed: true,
    };
    let blinder = PublicKey::from_secret_key(&secp, blinding_key);
    Address::p2wpkh(&pk, Some(blinder), &AddressParams::ELEMENTS)
}

pub fn explicit_utxo(
    outpoint: OutPoint,
    asset: AssetId,
    value: u64,
    script: &Script,
) -> UnblindedUtxo {
    UnblindedUtxo::explicit(outpoint, explicit_txout(&asset, value, script))
        .expect("explicit output")
}

/// The taker's side of a swap: one funding output and a receiving address.
pub struct Counterparty {
    pub address: Address,
    pub blinding_key: SecretKey,
    next_vout: AtomicU32,
}

impl Counterparty {
    pub fn new(seed: u8) -> Self {
        let blinding_key = secret_key(0x60, seed as u32);
        Self {
            address: p2wpkh_address(&secret_key(0x50, seed as u32), &blinding_key),
            blinding_key,
            next_vout: AtomicU32::new(0),
        }
    }

    pub fn script_pubkey(&self) -> Script {
        self.address.script_pubkey()
    }

    /// A proposal paying exactly `input_amount` from a fresh funding output
    /// and receiving `output_amount` to the counterparty address.
    pub fn request(&self, id: &str, terms: SwapTerms) -> SwapRequest {
        let script = self.script_pubkey();
        let vout = self.next_vout.fetch_add(1, Ordering::SeqCst);
        let funding = explicit_utxo(
            OutPoint::new(txid(0xfe), vout),
            terms.input_asset,
            terms.input_amount,
            &script,
        );

        let mut pset = new_pset();
        add_pset_input(&mut pset, &funding);
        add_pset_output(
            &mut pset,
            explicit_txout(&terms.output_asset, terms.output_amount, &script),
        );

        let keys: BlindingKeys = [(script, self.blinding_key)].into_iter().collect();
        SwapRequest {
            id: id.to_string(),
            terms,
            pset,
            input_blinding_keys: keys.clone(),
            output_blinding_keys: keys,
        }
    }
}

// ---------------------------------------------------------------------------
// MockWallet
// ---------------------------------------------------------------------------

const SPEND_TAG: u8 = 0x11;
const BLIND_TAG: u8 = 0x22;
const FUNDING_TAG: u8 = 0x33;

/// Wallet double: explicit unspent outputs, deterministic addresses and
/// counters for every call the engine makes.
#[derive(Default)]
pub struct MockWallet {
    utxos: Mutex<Vec<UnblindedUtxo>>,
    balance_override: Mutex<Option<HashMap<AssetId, u64>>>,
    keys: Mutex<HashMap<Script, SecretKey>>,
    next_index: AtomicU32,
    next_funding: AtomicU32,
    refresh_calls: AtomicUsize,
    address_calls: AtomicUsize,
    sign_calls: AtomicUsize,
}

impl MockWallet {
    pub fn new() -> Self {
        Self::default()
    }

    fn address_at(&self, index: u32) -> MakerAddress {
        let blinding_key = secret_key(BLIND_TAG, index);
        let address = p2wpkh_address(&secret_key(SPEND_TAG, index), &blinding_key);
        self.keys
            .lock()
            .expect("keys lock")
            .insert(address.script_pubkey(), blinding_key);
        MakerAddress {
            address,
            blinding_key,
        }
    }

    /// Receive `value` of `asset` in a new explicit output.
    pub fn fund(&self, asset: AssetId, value: u64) -> UnblindedUtxo {
        let n = self.next_funding.fetch_add(1, Ordering::SeqCst);
        let address = self.address_at(1_000 + n);
        let mut txid_bytes = [FUNDING_TAG; 32];
        txid_bytes[28..].copy_from_slice(&n.to_be_bytes());
        let utxo = explicit_utxo(
            OutPoint::new(Txid::from_byte_array(txid_bytes), 0),
            asset,
            value,
            &address.script_pubkey(),
        );
        self.utxos.lock().expect("utxos lock").push(utxo.clone());
        utxo
    }

    /// Report these balances instead of the sum of the unspent outputs.
    pub fn set_balances(&self, balances: HashMap<AssetId, u64>) {
        *self.balance_override.lock().expect("balance lock") = Some(balances);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn address_calls(&self) -> usize {
        self.address_calls.load(Ordering::SeqCst)
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

impl BalanceOracle for MockWallet {
    fn refresh(&self) -> Result<()> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn balances(&self) -> Result<HashMap<AssetId, u64>> {
        if let Some(b) = self.balance_override.lock().expect("balance lock").clone() {
            return Ok(b);
        }
        let mut out: HashMap<AssetId, u64> = HashMap::new();
        for u in self.utxos.lock().expect("utxos lock").iter() {
            *out.entry(u.asset()).or_default() += u.value();
        }
        Ok(out)
    }
}

impl AddressProvider for MockWallet {
    fn next_receiving_address(&self) -> Result<MakerAddress> {
        self.address_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.address_at(self.next_index.fetch_add(1, Ordering::SeqCst)))
    }

    fn next_change_address(&self) -> Result<MakerAddress> {
        self.next_receiving_address()
    }

    fn blinding_key_for(&self, script: &Script) -> Result<SecretKey> {
        self.keys
            .lock()
            .expect("keys lock")
            .get(script)
            .copied()
            .ok_or_else(|| {
                Error::Signer(format!("script {} is not ours", hex::encode(script.as_bytes())))
            })
    }
}

impl UtxoSource for MockWallet {
    fn unspent_outputs(&self) -> Result<Vec<UnblindedUtxo>> {
        Ok(self.utxos.lock().expect("utxos lock").clone())
    }
}

impl LedgerSigner for MockWallet {
    fn sign(&self, pset: PartiallySignedTransaction) -> Result<PartiallySignedTransaction> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        Ok(pset)
    }

    fn finalize(&self, pset: PartiallySignedTransaction) -> Result<Transaction> {
        pset.extract_tx()
            .map_err(|e| Error::Finalize(format!("{e:?}")))
    }
}

// ---------------------------------------------------------------------------
// MockBroadcaster
// ---------------------------------------------------------------------------

/// Records broadcasts; rejects all of them when built with [`rejecting`].
///
/// [`rejecting`]: MockBroadcaster::rejecting
#[derive(Default)]
pub struct MockBroadcaster {
    reject_with: Option<String>,
    sent: Mutex<Vec<Transaction>>,
}

impl MockBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(message: &str) -> Self {
        Self {
            reject_with: Some(message.to_string()),
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.sent.lock().expect("sent lock").clone()
    }
}

impl Broadcaster for MockBroadcaster {
    fn broadcast(&self, tx: &Transaction) -> Result<Txid> {
        if let Some(msg) = &self.reject_with {
            return Err(Error::BroadcastFailed(msg.clone()));
        }
        self.sent.lock().expect("sent lock").push(tx.clone());
        Ok(tx.txid())
    }
}
