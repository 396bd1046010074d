//! Turns a raw input bag into the sorted, deduplicated, padded record set
//! the trie/bitmap/scheduler stages operate on.
//!
//! Both operations here are framed as owned transformations: `sort_and_merge`
//! consumes the input `Vec` and returns a smaller one, with merged-away
//! duplicates simply never making it into the result, rather than being
//! nulled out in place and compacted afterwards.

use crate::helpe::*;
use std::sync::Arc;

/// Sorts `records` by sequence (ties broken by nothing further — duplicates
/// are, by definition, byte-identical) and merges exact duplicates, summing
/// their counts.
///
/// `worker_budget` bounds how many leaves of the recursive split this will
/// fan out across via `rayon::join`; once the budget is exhausted, the
/// remaining sub-ranges are merge-sorted sequentially. The result is
/// independent of `worker_budget` — merging is confluent, since by the time
/// two sorted halves meet, each has already collapsed its own duplicates, so
/// any repeated key can appear at most once per side at any merge step.
pub fn sort_and_merge(records: Vec<InputRecord>, worker_budget: usize) -> Vec<InputRecord> {
    merge_sort_rec(records, worker_budget.max(1))
}

fn merge_sort_rec(records: Vec<InputRecord>, budget: usize) -> Vec<InputRecord> {
    let n = records.len();
    if n <= 1 {
        return records;
    }
    let mut records = records;
    let right = records.split_off(n / 2);
    let left = records;

    let (sorted_left, sorted_right) = if budget > 1 {
        let left_budget = budget / 2;
        let right_budget = budget - left_budget;
        rayon::join(
            || merge_sort_rec(left, left_budget),
            || merge_sort_rec(right, right_budget),
        )
    } else {
        (merge_sort_rec(left, 1), merge_sort_rec(right, 1))
    };
    merge_dedup(sorted_left, sorted_right)
}

fn record_key(r: &InputRecord) -> (usize, &[u8]) {
    (r.seq.len(), &r.seq[..])
}

fn merge_dedup(left: Vec<InputRecord>, right: Vec<InputRecord>) -> Vec<InputRecord> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut li = left.into_iter().peekable();
    let mut ri = right.into_iter().peekable();
    loop {
        let take_left = match (li.peek(), ri.peek()) {
            (Some(l), Some(r)) => record_key(l) <= record_key(r),
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => break,
        };
        let next = if take_left { li.next().unwrap() } else { ri.next().unwrap() };
        push_or_merge(&mut out, next);
    }
    out
}

fn push_or_merge(out: &mut Vec<InputRecord>, rec: InputRecord) {
    if let Some(last) = out.last_mut() {
        if last.seq == rec.seq {
            last.count += rec.count;
            return;
        }
    }
    out.push(rec);
}

/// Left-pads every record to the length of the longest one (`H`), and
/// reports the median unpadded length (`M`): the smallest length `l` such
/// that the cumulative number of (deduplicated) records of length `<= l`
/// reaches at least half of `n`, the number of records. This is a median
/// over distinct records, not weighted by occurrence count — `n` counts
/// records, not reads.
///
/// `records` is expected to already be sorted by length (ascending), which
/// `sort_and_merge` guarantees.
pub fn pad(records: Vec<InputRecord>) -> (Vec<Arc<SequenceRecord>>, usize, usize) {
    if records.is_empty() {
        return (Vec::new(), 0, 0);
    }
    let h = records.iter().map(|r| r.seq.len()).max().unwrap_or(0);
    let n = records.len() as u64;
    let half = n.div_ceil(2);

    let mut cumulative = 0u64;
    let mut median = records[0].seq.len();
    for r in &records {
        cumulative += 1;
        median = r.seq.len();
        if cumulative >= half {
            break;
        }
    }

    let padded = records
        .into_iter()
        .map(|r| {
            let mut buf = vec![PAD_BYTE; h];
            let start = h - r.seq.len();
            buf[start..].copy_from_slice(&r.seq);
            Arc::new(SequenceRecord { seq: buf, count: r.count, info: r.info })
        })
        .collect();
    (padded, h, median)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(seq: &str, count: u64) -> InputRecord {
        InputRecord::new(seq.as_bytes().to_vec(), count, None)
    }

    #[test]
    fn dedup_sums_counts_and_sorts_by_length() {
        let records = vec![
            input("ACGTACGT", 2),
            input("AC", 5),
            input("ACGTACGT", 3),
            input("ACG", 1),
        ];
        let out = sort_and_merge(records, 4);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].seq, b"AC");
        assert_eq!(out[0].count, 5);
        assert_eq!(out[1].seq, b"ACG");
        assert_eq!(out[2].seq, b"ACGTACGT");
        assert_eq!(out[2].count, 5);
    }

    #[test]
    fn worker_budget_does_not_change_result() {
        let records = vec![
            input("TTTT", 1),
            input("AAAA", 1),
            input("AAAA", 1),
            input("CCCC", 2),
            input("TTTT", 4),
            input("GGGG", 1),
        ];
        let sequential = sort_and_merge(records.clone(), 1);
        let parallel = sort_and_merge(records, 64);
        assert_eq!(sequential.len(), parallel.len());
        for (a, b) in sequential.iter().zip(parallel.iter()) {
            assert_eq!(a.seq, b.seq);
            assert_eq!(a.count, b.count);
        }
    }

    #[test]
    fn empty_input_yields_empty_output() {
        let out = sort_and_merge(Vec::new(), 8);
        assert!(out.is_empty());
    }

    #[test]
    fn pad_reports_horizon_and_record_weighted_median() {
        let records = sort_and_merge(
            vec![input("AC", 1), input("ACGT", 1), input("ACGTACGT", 8)],
            1,
        );
        let (padded, h, m) = pad(records);
        assert_eq!(h, 8);
        // n = 3 records, half = ceil(3/2) = 2; cumulative record count
        // reaches 2 at the second (length-4) record, regardless of its
        // occurrence count.
        assert_eq!(m, 4);
        assert_eq!(padded[0].seq.len(), 8);
        assert_eq!(unpad(&padded[0].seq), b"AC");
    }

    #[test]
    fn pad_round_trips_through_unpad() {
        let records = sort_and_merge(vec![input("ACGT", 1), input("A", 1)], 1);
        let (padded, _, _) = pad(records);
        for rec in &padded {
            let original = unpad(&rec.seq);
            assert!(original == b"A" || original == b"ACGT");
        }
    }
}
