//! A DNA sequence clustering core: deduplicate a bag of reads, then find
//! every pair of distinct sequences within an edit-distance threshold.
//!
//! The pipeline is four stages, run in order by [`run`]:
//!
//! 1. [`preprocess::sort_and_merge`] sorts and dedups the input bag, summing
//!    occurrence counts for exact duplicates.
//! 2. [`preprocess::pad`] left-pads every record to a common length `H` and
//!    reports the record-weighted median unpadded length `M`.
//! 3. The padded bag is partitioned into blocks, each building a [`trie::Trie`]
//!    and a [`bitmap::LookupBitmap`].
//! 4. [`scheduler::run`] walks the diagonal block-query schedule, probing the
//!    bitmap before paying for a trie search, and feeds every match within
//!    `tau` to a [`sink::PairSink`].

pub mod bitmap;
pub mod helpe;
pub mod preprocess;
pub mod record;
pub mod scheduler;
pub mod sink;
pub mod trie;

pub use crate::helpe::*;
pub use crate::sink::{BufferedPairSink, PairSink, VecPairSink};

/// Runs the full pipeline over a raw input bag, feeding every matched pair
/// to `sink`. Returns a summary of the run, including how many pairs were
/// emitted.
///
/// Input is validated defensively here rather than trusted from whatever
/// parsed it: a non-DNA byte anywhere in the bag is reported as
/// [`CoreError::InvalidInput`] rather than silently miscompiled into the
/// trie's alphabet.
pub fn run(raw: Vec<InputRecord>, config: RunConfig, sink: &dyn PairSink) -> Result<RunStats, CoreError> {
    if raw.is_empty() {
        return Err(CoreError::EmptyInput);
    }
    validate_alphabet(&raw)?;

    let deduped = preprocess::sort_and_merge(raw, config.threads.max(1));
    let (padded, h, m) = preprocess::pad(deduped);
    if padded.is_empty() {
        return Err(CoreError::EmptyInput);
    }

    let tau = config.tau.resolve(m);
    tracing::info!(unique = padded.len(), h, m, tau, "preprocessing complete");

    // A single record, or tau = 0, can never produce a match: sort_and_merge
    // has already collapsed every exact duplicate, so there is nothing left
    // for the scheduler to usefully do.
    let pairs_emitted = if padded.len() < 2 || tau == 0 {
        0
    } else {
        scheduler::run(&padded, h, m, tau, config.threads.max(1), sink, config.verbose)?
    };

    Ok(RunStats { unique_count: padded.len(), h, m, tau, pairs_emitted })
}
