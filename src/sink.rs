//! The pair sink: where matched `(label_a, label_b, distance)` triples go.
//!
//! Shaped as a trait the scheduler is generic over, rather than a single
//! concrete writer, following `ibu`'s `ParallelProcessor`/`ParallelReader`
//! split (`other_examples/.../ibu__src-parallel.rs.rs`): a thread-safe
//! interface the worker pool calls into, with the concrete sink choosing
//! how (or whether) it buffers and serializes.

use crate::helpe::*;
use std::io::Write;

/// Receives one matched pair at a time, from any worker thread. Implementors
/// must be internally synchronized: the scheduler calls `emit` concurrently
/// from every active worker.
pub trait PairSink: Sync {
    fn emit(&self, label_a: &[u8], label_b: &[u8], distance: u32);
}

/// An in-memory sink, mainly useful for tests: collects every emitted
/// triple behind a mutex.
#[derive(Default)]
pub struct VecPairSink {
    pairs: Mutex<Vec<(Vec<u8>, Vec<u8>, u32)>>,
}

impl VecPairSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<(Vec<u8>, Vec<u8>, u32)> {
        self.pairs.into_inner().unwrap()
    }

    pub fn len(&self) -> usize {
        self.pairs.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PairSink for VecPairSink {
    fn emit(&self, label_a: &[u8], label_b: &[u8], distance: u32) {
        self.pairs.lock().unwrap().push((label_a.to_vec(), label_b.to_vec(), distance));
    }
}

/// Writes tab-separated `label_a\tlabel_b\tdistance` lines to any
/// `Write` implementor, guarded by a mutex so concurrent workers don't
/// interleave partial lines.
pub struct BufferedPairSink<W: Write> {
    writer: Mutex<W>,
}

impl<W: Write> BufferedPairSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Mutex::new(writer) }
    }
}

impl<W: Write + Send> PairSink for BufferedPairSink<W> {
    fn emit(&self, label_a: &[u8], label_b: &[u8], distance: u32) {
        let mut w = self.writer.lock().unwrap();
        let _ = w.write_all(label_a);
        let _ = w.write_all(b"\t");
        let _ = w.write_all(label_b);
        let _ = w.write_all(format!("\t{}\n", distance).as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_collects_every_emission() {
        let sink = VecPairSink::new();
        sink.emit(b"a", b"b", 1);
        sink.emit(b"c", b"d", 2);
        assert_eq!(sink.len(), 2);
        let pairs = sink.into_inner();
        assert_eq!(pairs[0], (b"a".to_vec(), b"b".to_vec(), 1));
        assert_eq!(pairs[1], (b"c".to_vec(), b"d".to_vec(), 2));
    }

    #[test]
    fn buffered_sink_writes_tab_separated_lines() {
        let buf: Vec<u8> = Vec::new();
        let sink = BufferedPairSink::new(buf);
        sink.emit(b"AAAA", b"AAAC", 1);
        let inner = sink.writer.into_inner().unwrap();
        assert_eq!(inner, b"AAAA\tAAAC\t1\n");
    }
}
