//! The k-mer lookup bitmap: a cheap, no-false-negative prefilter that lets
//! the scheduler skip a full trie search for queries that cannot possibly
//! have a match within `tau`.
//!
//! Grounded on `lambdaclass-ethrex`'s use of `bitvec` for compact fixed-size
//! bitsets (`crates/vm/levm`) — this crate has no bitset dependency of its
//! own to borrow, so the bitset crate is adopted wholesale from there.

use crate::helpe::*;
use bitvec::vec::BitVec;

/// Outcome of probing the bitmap for a query sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    Hit,
    Miss,
    /// The query's length doesn't match the bitmap's configured horizon;
    /// this would indicate a construction mismatch upstream, not a normal
    /// "no match" outcome.
    Error,
}

/// `tau + 1` k-mer bitmaps, one per slice of the sequence's tail, each
/// tolerating increasing positional drift to cover indels.
pub struct LookupBitmap {
    h: usize,
    tau: usize,
    slice_lens: Vec<usize>,
    slice_offsets: Vec<usize>,
    bitmaps: Vec<BitVec>,
}

impl LookupBitmap {
    pub fn new(h: usize, m: usize, tau: usize) -> Self {
        let slice_lens = slice_lengths(m, tau, K_MAX);
        let mut slice_offsets = Vec::with_capacity(slice_lens.len());
        let mut cursor = h;
        for &len in &slice_lens {
            cursor = cursor.saturating_sub(len);
            slice_offsets.push(cursor);
        }
        let bitmaps = slice_lens.iter().map(|&len| BitVec::repeat(false, 1usize << (2 * len))).collect();
        Self { h, tau, slice_lens, slice_offsets, bitmaps }
    }

    /// Marks every slice of `seq` as present. Slices that straddle a
    /// non-ACGT/pad byte (which should never occur given upstream
    /// validation) are silently skipped rather than poisoning the bitmap.
    pub fn insert(&mut self, seq: &[u8]) {
        for i in 0..self.slice_lens.len() {
            if let Some(code) = self.encode_slice(seq, i, 0) {
                self.bitmaps[i].set(code, true);
            }
        }
    }

    /// Probes every slice of `seq` at every shift within `+-(tau - i)` for
    /// slice `i`, to tolerate the positional drift an indel upstream of the
    /// slice would cause. A single bit set anywhere in that window is
    /// enough to call it a `Hit` — this prefilter only needs to avoid false
    /// negatives, so any plausible alignment is sufficient.
    pub fn probe(&self, seq: &[u8]) -> ProbeResult {
        if seq.len() != self.h {
            return ProbeResult::Error;
        }
        for i in 0..self.slice_lens.len() {
            let max_shift = (self.tau - i) as isize;
            for shift in -max_shift..=max_shift {
                if let Some(code) = self.encode_slice(seq, i, shift) {
                    if self.bitmaps[i][code] {
                        return ProbeResult::Hit;
                    }
                }
            }
        }
        ProbeResult::Miss
    }

    fn encode_slice(&self, seq: &[u8], slice: usize, shift: isize) -> Option<usize> {
        let start = self.slice_offsets[slice] as isize + shift;
        let len = self.slice_lens[slice] as isize;
        if start < 0 || start + len > self.h as isize {
            return None;
        }
        encode_kmer(&seq[start as usize..(start + len) as usize])
    }
}

/// Splits `m` into `tau + 1` slice lengths, as equal as possible, each
/// capped at `k_max`. The remainder is distributed one-per-slice starting
/// from the first (tail-most) slice.
fn slice_lengths(m: usize, tau: usize, k_max: usize) -> Vec<usize> {
    let n = tau + 1;
    let base = m / n;
    let rem = m % n;
    (0..n)
        .map(|i| {
            let len = if i < rem { base + 1 } else { base };
            len.clamp(1, k_max)
        })
        .collect()
}

/// 2-bit-per-base encoding (A=00, C=01, G=10, T=11); padding counts as `A`.
/// This is a deliberate, safe lossiness: it can only ever make the bitmap
/// report a spurious `Hit` for a query that doesn't actually match (the
/// trie search downstream will reject it), never a false `Miss`.
fn encode_kmer(bytes: &[u8]) -> Option<usize> {
    let mut code = 0usize;
    for &b in bytes {
        let bits = match b {
            b'A' | b'a' => 0,
            b'C' | b'c' => 1,
            b'G' | b'g' => 2,
            b'T' | b't' => 3,
            PAD_BYTE => 0,
            _ => return None,
        };
        code = (code << 2) | bits;
    }
    Some(code)
}
