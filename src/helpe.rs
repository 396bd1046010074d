pub use std::{
    sync::{Arc, Mutex, Condvar},
    ops::Range,
    cmp::Ordering as CmpOrdering,
};
pub use thiserror::Error;
pub use itertools::Itertools;
pub use rayon::prelude::*;

pub use crate::record::*;

/// The unit for counting bytes, offsets and lengths throughout this crate.
/// Sequence lengths, trie depths and arena indices are all small enough to
/// live comfortably in a `usize`; we don't bother with a narrower type.
pub type ByteSteps = usize;

/// The byte written into the head of every record during padding. Chosen to
/// be outside the DNA alphabet so it can never alias a real base at the trie
/// layer; the k-mer bitmap, by contrast, *deliberately* folds it onto `A`
/// (see [`crate::bitmap`]).
pub const PAD_BYTE: u8 = b' ';

/// Upper bound on k-mer slice length, so that a single slice's bitmap never
/// exceeds `2^(2*K_MAX)` bits.
pub const K_MAX: usize = 12;

/// How many hits a [`crate::trie::HitTower`] will hold per distance bucket
/// before it starts dropping and warning. Chosen generously; real overflow
/// only happens on pathological, highly-repetitive input.
pub const HIT_TOWER_CAPACITY: usize = 64;

/// Errors that can escape the public entry points of this crate.
///
/// Genuine allocation exhaustion and OS thread-spawn failure are the only
/// conditions this crate treats as fatal-by-construction; everything else
/// that can go wrong with a caller's input is reported here instead of
/// panicking.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("record {index} contains a non-DNA byte 0x{byte:02x}")]
    InvalidInput { index: usize, byte: u8 },
    #[error("no records survived preprocessing")]
    EmptyInput,
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
}

/// The threshold setting recognized by the `tau` configuration knob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TauSetting {
    Fixed(u32),
    Auto,
}

impl TauSetting {
    /// Resolves `Auto` against the padded median length `m`, per the rule of
    /// thumb: long reads can afford a wide band (8), short reads get a band
    /// that scales gently with their own length.
    pub fn resolve(&self, m: usize) -> u32 {
        match self {
            TauSetting::Fixed(t) => *t,
            TauSetting::Auto => {
                if m > 160 {
                    8
                } else {
                    (2 + m / 30) as u32
                }
            }
        }
    }
}

impl Default for TauSetting {
    fn default() -> Self {
        TauSetting::Auto
    }
}

/// Run-wide configuration. Nothing in here is mandatory to set: the
/// defaults reproduce the spec's own defaults (`tau = auto`, one worker).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub tau: TauSetting,
    pub threads: usize,
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            tau: TauSetting::Auto,
            threads: 1,
            verbose: false,
        }
    }
}

/// Summary of a completed run, handed back to the caller alongside whatever
/// pairs the sink was fed.
#[derive(Debug, Clone, Copy)]
pub struct RunStats {
    pub unique_count: usize,
    pub h: usize,
    pub m: usize,
    pub tau: u32,
    pub pairs_emitted: u64,
}

/// Length of the longest common prefix of two byte slices.
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Strips the left padding `pad()` added, recovering the original bytes.
pub fn unpad(seq: &[u8]) -> &[u8] {
    let first_real = seq.iter().position(|&b| b != PAD_BYTE).unwrap_or(seq.len());
    &seq[first_real..]
}
