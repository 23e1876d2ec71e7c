//! Network fee estimation for swap transactions.

/// sat/vbyte used when the operator does not configure one.
pub const DEFAULT_FEE_RATE: f64 = 0.1;

const TX_OVERHEAD_VBYTES: u64 = 11;
/// Segwit P2WPKH input, signature and pubkey included.
const INPUT_VBYTES: u64 = 69;
/// Blinded output: commitments, nonce, range and surjection proofs.
const OUTPUT_VBYTES: u64 = 872;

pub fn estimate_vsize(n_inputs: usize, n_outputs: usize) -> u64 {
    TX_OVERHEAD_VBYTES + INPUT_VBYTES * n_inputs as u64 + OUTPUT_VBYTES * n_outputs as u64
}

/// Fee in satoshis, rounded up, never below one.
pub fn estimate_fee(n_inputs: usize, n_outputs: usize, fee_rate: f64) -> u64 {
    let fee = (estimate_vsize(n_inputs, n_outputs) as f64 * fee_rate).ceil();
    if fee.is_finite() && fee >= 1.0 {
        fee as u64
    } else {
        1
    }
}
