//! Greedy coin selection over the maker's unspent outputs.
//!
//! The pool tags every output it hands out so the fee pass can never pick an
//! output the trade pass already committed.

use lwk_wollet::elements::AssetId;

use crate::error::{Error, Result};
use crate::pset::UnblindedUtxo;

/// Ownership tag of a pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commitment {
    Available,
    Trade,
    Fee,
}

/// Amount of one asset to cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub asset: AssetId,
    pub amount: u64,
}

/// Surplus of a selection, to be paid back to the maker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeOutput {
    pub asset: AssetId,
    pub amount: u64,
}

#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub utxos: Vec<UnblindedUtxo>,
    pub change: Vec<ChangeOutput>,
}

impl Selection {
    pub fn total(&self, asset: &AssetId) -> u64 {
        self.utxos
            .iter()
            .filter(|u| u.asset() == *asset)
            .map(|u| u.value())
            .sum()
    }
}

/// Pick outputs of `target.asset`, largest first, until the amount is
/// covered. Returns the chosen indices into `candidates` and their sum.
///
/// Ties keep the order of `candidates`, so a given pool always yields the
/// same selection.
pub fn select(candidates: &[&UnblindedUtxo], target: &Target) -> Result<(Vec<usize>, u64)> {
    let mut matching: Vec<usize> = (0..candidates.len())
        .filter(|&i| candidates[i].asset() == target.asset)
        .collect();
    matching.sort_by(|&a, &b| candidates[b].value().cmp(&candidates[a].value()));

    let mut chosen = Vec::new();
    let mut total: u64 = 0;
    for i in matching {
        if total >= target.amount && !chosen.is_empty() {
            break;
        }
        total = total.saturating_add(candidates[i].value());
        chosen.push(i);
    }

    if total < target.amount || chosen.is_empty() {
        return Err(Error::InsufficientFunds(format!(
            "need {} of asset {}, only {total} available",
            target.amount, target.asset
        )));
    }
    Ok((chosen, total))
}

/// The maker's spendable outputs for one assembly, with ownership tags.
#[derive(Debug, Clone)]
pub struct UtxoPool {
    entries: Vec<(UnblindedUtxo, Commitment)>,
}

impl UtxoPool {
    pub fn new(utxos: Vec<UnblindedUtxo>) -> Self {
        Self {
            entries: utxos
                .into_iter()
                .map(|u| (u, Commitment::Available))
                .collect(),
        }
    }

    pub fn available_value(&self, asset: &AssetId) -> u64 {
        self.entries
            .iter()
            .filter(|(u, c)| *c == Commitment::Available && u.asset() == *asset)
            .map(|(u, _)| u.value())
            .sum()
    }

    pub fn committed(&self, tag: Commitment) -> impl Iterator<Item = &UnblindedUtxo> {
        self.entries
            .iter()
            .filter(move |(_, c)| *c == tag)
            .map(|(u, _)| u)
    }

    /// Cover every target from available outputs and tag the chosen ones.
    ///
    /// Nothing is tagged unless all targets are covered.
    pub fn select(&mut self, targets: &[Target], tag: Commitment) -> Result<Selection> {
        let available: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, (_, c))| *c == Commitment::Available)
            .map(|(i, _)| i)
            .collect();

        let mut taken: Vec<usize> = Vec::new();
        let mut change = Vec::new();
        for target in targets {
            if target.amount == 0 {
                continue;
            }
            let remaining: Vec<usize> = available
                .iter()
                .copied()
                .filter(|i| !taken.contains(i))
                .collect();
            let candidates: Vec<&UnblindedUtxo> =
                remaining.iter().map(|&i| &self.entries[i].0).collect();
            let (chosen, total) = select(&candidates, target)?;
            taken.extend(chosen.into_iter().map(|c| remaining[c]));
            if total > target.amount {
                change.push(ChangeOutput {
                    asset: target.asset,
                    amount: total - target.amount,
                });
            }
        }

        let mut utxos = Vec::with_capacity(taken.len());
        for i in taken {
            self.entries[i].1 = tag;
            utxos.push(self.entries[i].0.clone());
        }
        Ok(Selection { utxos, change })
    }
}
