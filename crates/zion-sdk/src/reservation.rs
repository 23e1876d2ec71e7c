//! Short-lived claims on maker outputs handed out in pending swaps.
//!
//! Between a proposal being accepted and its settlement being broadcast, the
//! selected outputs are still unspent in the wallet. Without a claim a second
//! proposal would select them again and one of the two swaps would fail at
//! broadcast time.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lwk_wollet::elements::OutPoint;
use rand::RngCore;

use crate::error::{Error, Result};
use crate::pset::UnblindedUtxo;

/// Opaque handle for one swap's reserved outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReservationToken(u64);

impl ReservationToken {
    fn random() -> Self {
        Self(rand::thread_rng().next_u64())
    }
}

impl std::fmt::Display for ReservationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl std::str::FromStr for ReservationToken {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        u64::from_str_radix(s, 16)
            .map(ReservationToken)
            .map_err(|e| format!("invalid swap id '{s}': {e}"))
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    token: ReservationToken,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct Reservations {
    ttl: Duration,
    entries: Mutex<HashMap<OutPoint, Entry>>,
}

impl Reservations {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Drop outputs held by a live reservation.
    pub fn filter_available(&self, utxos: Vec<UnblindedUtxo>) -> Result<Vec<UnblindedUtxo>> {
        let mut entries = self.entries.lock().map_err(|_| Error::MutexPoisoned)?;
        prune(&mut entries, Instant::now());
        Ok(utxos
            .into_iter()
            .filter(|u| !entries.contains_key(&u.outpoint))
            .collect())
    }

    /// Claim every outpoint under a fresh token, or none of them.
    pub fn reserve(&self, outpoints: &[OutPoint]) -> Result<ReservationToken> {
        let now = Instant::now();
        let mut entries = self.entries.lock().map_err(|_| Error::MutexPoisoned)?;
        prune(&mut entries, now);

        if let Some(taken) = outpoints.iter().find(|op| entries.contains_key(*op)) {
            return Err(Error::InsufficientFunds(format!(
                "output {taken} is reserved by a pending swap"
            )));
        }

        let token = ReservationToken::random();
        let expires_at = now + self.ttl;
        for op in outpoints {
            entries.insert(*op, Entry { token, expires_at });
        }
        log::debug!("reserved {} outputs under {token}", outpoints.len());
        Ok(token)
    }

    /// Release everything held by `token`. Returns how many outputs were
    /// freed.
    pub fn release(&self, token: ReservationToken) -> Result<usize> {
        let mut entries = self.entries.lock().map_err(|_| Error::MutexPoisoned)?;
        let before = entries.len();
        entries.retain(|_, e| e.token != token);
        let freed = before - entries.len();
        if freed > 0 {
            log::debug!("released {freed} outputs held by {token}");
        }
        Ok(freed)
    }

    pub fn is_reserved(&self, outpoint: &OutPoint) -> Result<bool> {
        let mut entries = self.entries.lock().map_err(|_| Error::MutexPoisoned)?;
        prune(&mut entries, Instant::now());
        Ok(entries.contains_key(outpoint))
    }
}

fn prune(entries: &mut HashMap<OutPoint, Entry>, now: Instant) {
    entries.retain(|_, e| e.expires_at > now);
}
