//! Blinding key resolution and confidential output blinding for swaps.
//!
//! Every input and every non-fee output of a swap must have a blinding key
//! in the request maps before any output is blinded. Resolution runs first
//! over the whole PSET so that a missing key never leaves a half-blinded
//! transaction behind.

use std::collections::HashMap;

use lwk_wollet::elements::pset::PartiallySignedTransaction;
use lwk_wollet::elements::secp256k1_zkp::{All, PublicKey, Secp256k1, SecretKey};
use lwk_wollet::elements::{Script, TxOutSecrets};
use rand::thread_rng;

use crate::error::{Error, Result, TxSide};
use crate::pset::{explicit_secrets, previous_output};

/// Immutable script → blinding private key map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlindingKeys(HashMap<Script, SecretKey>);

impl BlindingKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, script: &Script) -> Option<&SecretKey> {
        self.0.get(script)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Script, &SecretKey)> {
        self.0.iter()
    }

    /// A new map holding these keys plus `extra`. Keys in `extra` win on
    /// collision.
    pub fn merged(&self, extra: impl IntoIterator<Item = (Script, SecretKey)>) -> Self {
        let mut map = self.0.clone();
        map.extend(extra);
        Self(map)
    }
}

impl From<HashMap<Script, SecretKey>> for BlindingKeys {
    fn from(map: HashMap<Script, SecretKey>) -> Self {
        Self(map)
    }
}

impl FromIterator<(Script, SecretKey)> for BlindingKeys {
    fn from_iter<I: IntoIterator<Item = (Script, SecretKey)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolved blinding material for a whole PSET.
#[derive(Debug, Clone)]
pub struct BlindingPlan {
    /// Secrets of every input's previous output, by input index.
    pub input_secrets: HashMap<usize, TxOutSecrets>,
    /// Blinding public key of every output to blind, by output index.
    pub output_keys: Vec<(usize, PublicKey)>,
}

/// Resolve a key for every input and every non-fee output.
pub fn plan_blinding(
    pset: &PartiallySignedTransaction,
    input_keys: &BlindingKeys,
    output_keys: &BlindingKeys,
) -> Result<BlindingPlan> {
    let secp = Secp256k1::new();

    let mut input_secrets = HashMap::new();
    for index in 0..pset.n_inputs() {
        let prevout = previous_output(pset, index).ok_or_else(|| {
            Error::MalformedTransaction(format!("input {index} has no previous output"))
        })?;
        let key = input_keys
            .get(&prevout.script_pubkey)
            .ok_or(Error::MissingBlindingKey {
                side: TxSide::Input,
                index,
            })?;
        let secrets = input_secrets_for(&secp, &prevout, key, index)?;
        input_secrets.insert(index, secrets);
    }

    let mut keys = Vec::new();
    for (index, output) in pset.outputs().iter().enumerate() {
        if output.script_pubkey.is_empty() {
            continue;
        }
        let key = output_keys
            .get(&output.script_pubkey)
            .ok_or(Error::MissingBlindingKey {
                side: TxSide::Output,
                index,
            })?;
        keys.push((index, PublicKey::from_secret_key(&secp, key)));
    }

    Ok(BlindingPlan {
        input_secrets,
        output_keys: keys,
    })
}

fn input_secrets_for(
    secp: &Secp256k1<All>,
    prevout: &lwk_wollet::elements::TxOut,
    key: &SecretKey,
    index: usize,
) -> Result<TxOutSecrets> {
    if prevout.asset.is_explicit() && prevout.value.is_explicit() {
        return explicit_secrets(prevout);
    }
    prevout
        .unblind(secp, *key)
        .map_err(|e| Error::Blinding(format!("cannot unblind input {index}: {e}")))
}

/// Mark the planned outputs for blinding by `blinder_index` and blind them.
pub fn blind_swap_pset(
    pset: &mut PartiallySignedTransaction,
    plan: &BlindingPlan,
    blinder_index: u32,
) -> Result<()> {
    let outputs = pset.outputs_mut();
    for (index, pk) in &plan.output_keys {
        let output = outputs
            .get_mut(*index)
            .ok_or_else(|| Error::Pset(format!("output {index} out of range")))?;
        output.blinding_key = Some(lwk_wollet::elements::bitcoin::PublicKey {
            inner: *pk,
            compressed: true,
        });
        output.blinder_index = Some(blinder_index);
    }

    let secp = Secp256k1::new();
    pset.blind_last(&mut thread_rng(), &secp, &plan.input_secrets)
        .map_err(|e| Error::Blinding(format!("{e:?}")))?;
    Ok(())
}
