//! Gapped discrete-log lookup table.
//!
//! Balances are encrypted as `v·G`, so decryption must invert a scalar
//! multiplication over a small range. The table stores `k·G → k` only at
//! multiples of a configurable gap `g`; a query point is advanced by `G` up
//! to `g−1` times until it lands on a stored entry. If the non-negative pass
//! misses, the negated point is tried, yielding a negative log. A miss on
//! both sides is a hard [`CryptoError::DlogNotFound`].

use std::collections::HashMap;

use crate::error::CryptoError;
use crate::group::{compress, Point, Scalar, G};

/// Largest supported `max_balance_bits`; above this the table itself becomes
/// the bottleneck and the deployment should shard balances instead.
pub const MAX_BALANCE_BITS: u32 = 40;

pub struct DlogTable {
    gap: u32,
    max_value: u64,
    entries: HashMap<Vec<u8>, u64>,
}

impl DlogTable {
    pub fn build(max_balance_bits: u32, gap: u32) -> Result<Self, CryptoError> {
        if max_balance_bits == 0 || max_balance_bits > MAX_BALANCE_BITS {
            return Err(CryptoError::InvalidConfig(
                "max_balance_bits must be in 1..=40",
            ));
        }
        if gap == 0 {
            return Err(CryptoError::InvalidConfig("dlog gap must be nonzero"));
        }
        let max_value = (1u64 << max_balance_bits) - 1;
        let step = G * Scalar::from(gap as u64);
        let mut entries = HashMap::new();
        let mut acc = Point::IDENTITY;
        let mut k = 0u64;
        // One entry past max_value so queries near the top still land on a
        // stored multiple within gap−1 advances.
        while k < max_value + gap as u64 {
            entries.insert(compress(&acc), k);
            acc += step;
            k += gap as u64;
        }
        Ok(Self {
            gap,
            max_value,
            entries,
        })
    }

    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    /// Invert `p = k·G` for `k ∈ [−max_value, max_value]`.
    pub fn lookup(&self, p: &Point) -> Result<i64, CryptoError> {
        if let Some(v) = self.lookup_nonnegative(p) {
            return Ok(v as i64);
        }
        if let Some(v) = self.lookup_nonnegative(&-*p) {
            return Ok(-(v as i64));
        }
        Err(CryptoError::DlogNotFound)
    }

    fn lookup_nonnegative(&self, p: &Point) -> Option<u64> {
        let mut q = *p;
        for advanced in 0..self.gap as u64 {
            if let Some(&entry) = self.entries.get(&compress(&q)) {
                // Advancing moved the query up to the entry, so the query's
                // log is entry − advanced. A smaller entry means the query
                // was actually negative; leave that to the negation pass.
                if entry >= advanced {
                    return Some(entry - advanced);
                }
                return None;
            }
            q += G;
        }
        None
    }
}
