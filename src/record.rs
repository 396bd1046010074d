use crate::helpe::*;

/// One line of input: a raw, unpadded DNA sequence together with its
/// occurrence count and an optional opaque label.
///
/// This is the type callers build the input bag out of. [`crate::preprocess`]
/// consumes a `Vec<InputRecord>` and hands back the padded, deduplicated
/// [`SequenceRecord`]s the rest of the pipeline works on.
#[derive(Debug, Clone)]
pub struct InputRecord {
    pub seq: Vec<u8>,
    pub count: u64,
    pub info: Option<String>,
}

impl InputRecord {
    pub fn new(seq: Vec<u8>, count: u64, info: Option<String>) -> Self {
        Self { seq, count, info }
    }
}

/// A deduplicated, left-padded sequence, as it flows through the trie,
/// bitmap and scheduler stages.
///
/// There is deliberately no back-reference field here: a [`crate::trie::Trie`]
/// terminal node holds an `Option<Arc<SequenceRecord>>` pointing *at* a
/// record, rather than the record pointing into trie-internal arena
/// indices. That keeps a `SequenceRecord` free to be shared (via `Arc`)
/// across every trie it gets inserted into over the course of a run.
#[derive(Debug)]
pub struct SequenceRecord {
    /// Left-padded to the run's horizon `H`. Index arithmetic throughout
    /// the trie and bitmap assumes every record here has the same length.
    pub seq: Vec<u8>,
    pub count: u64,
    pub info: Option<String>,
}

impl SequenceRecord {
    /// The label this record should be printed under by the pair sink:
    /// its info tag if it has one, otherwise its unpadded sequence.
    pub fn label(&self) -> &[u8] {
        match &self.info {
            Some(tag) => tag.as_bytes(),
            None => unpad(&self.seq),
        }
    }
}

/// Validates that every record's sequence consists solely of the DNA
/// alphabet (`A`/`C`/`G`/`T`, either case). Called defensively at the
/// boundary rather than trusted from whatever parsed the input.
pub fn validate_alphabet(records: &[InputRecord]) -> Result<(), CoreError> {
    for (index, record) in records.iter().enumerate() {
        for &byte in &record.seq {
            if !matches!(byte.to_ascii_uppercase(), b'A' | b'C' | b'G' | b'T') {
                return Err(CoreError::InvalidInput { index, byte });
            }
        }
    }
    Ok(())
}
