//! Wraps one [`Mapper`] index and a [`RingBuffer`], turning raw window bytes
//! into verified candidate match edges.
//!
//! Generic over the mapper (`Matcher<M: Mapper>`) rather than boxed, so the
//! compiler can inline `put`/`get` into the hot parse loop — the design
//! notes' resolution of "generic vs. monomorphized matcher". A type-erased
//! [`DynMapper`] wrapper is offered separately for the config-driven factory
//! path, where the concrete mapper type is chosen at runtime.

use crate::buffer::RingBuffer;
use crate::bytes::lcp;
use crate::index::Mapper;
use crate::seq::Seq;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatcherError {
    /// A negative `skip` tried to rewind past the start of the window; the
    /// rewind was clamped to `-w`.
    StartOfBuffer,
}

impl std::fmt::Display for MatcherError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("skip would rewind past the start of the window")
    }
}

impl std::error::Error for MatcherError {}

/// Type-erased [`Mapper`], for call sites that select the concrete index at
/// runtime from configuration rather than at compile time.
pub struct DynMapper(Box<dyn Mapper>);

impl DynMapper {
    pub fn new(inner: impl Mapper + 'static) -> Self {
        DynMapper(Box::new(inner))
    }
}

impl Mapper for DynMapper {
    fn put(&mut self, pos: u32, le64_value: u64) {
        self.0.put(pos, le64_value)
    }
    fn get(&self, le64_value: u64, out: &mut Vec<crate::index::HashEntry>) {
        self.0.get(le64_value, out)
    }
    fn shift(&mut self, delta: u32) {
        self.0.shift(delta)
    }
    fn reset(&mut self) {
        self.0.reset()
    }
}

pub struct Matcher<M: Mapper> {
    buffer: RingBuffer,
    mapper: M,
    input_len: u32,
    min_match_len: u32,
    /// Next local position not yet indexed, gated by byte availability: the
    /// final `input_len - 1` bytes of the buffered data never have a stable
    /// prefix until more bytes arrive.
    next_to_index: usize,
    candidates: Vec<crate::index::HashEntry>,
}

impl<M: Mapper> Matcher<M> {
    pub fn new(buffer: RingBuffer, mapper: M, input_len: u32, min_match_len: u32) -> Self {
        Matcher { buffer, mapper, input_len, min_match_len, next_to_index: 0, candidates: Vec::new() }
    }

    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut RingBuffer {
        &mut self.buffer
    }

    pub fn mapper(&self) -> &M {
        &self.mapper
    }

    pub fn mapper_mut(&mut self) -> &mut M {
        &mut self.mapper
    }

    /// Load the little-endian 8-byte prefix at local position `pos`, using
    /// the buffer's read margin for positions near the tail.
    fn key_at(&self, pos: usize) -> u64 {
        let slice = self.buffer.margin_slice(pos);
        crate::bytes::load_le64(slice)
    }

    /// Index every newly-reachable position, bounded by both the new window
    /// head and how much of the tail has a fully-real (non-padding) prefix.
    fn index_up_to(&mut self, new_w: usize) {
        let len = self.buffer.len();
        let indexable_upper = len.saturating_sub(self.input_len as usize - 1);
        let upper = new_w.min(indexable_upper);
        let mut p = self.next_to_index;
        while p < upper {
            let value = self.key_at(p);
            self.mapper.put(p as u32, value);
            p += 1;
        }
        if upper > self.next_to_index {
            self.next_to_index = upper;
        }
    }

    /// Advance (or, if `n < 0`, rewind) the window head by `n` bytes,
    /// indexing newly-passed positions along the way.
    pub fn skip(&mut self, n: i64) -> Result<(), MatcherError> {
        if n >= 0 {
            let new_w = self.buffer.w() + n as usize;
            self.index_up_to(new_w);
            self.buffer.advance_w(n as usize);
            Ok(())
        } else {
            let w = self.buffer.w() as i64;
            let clamped = n.max(-w);
            self.buffer.rewind_w((-clamped) as usize);
            self.next_to_index = self.next_to_index.min(self.buffer.w());
            if clamped != n {
                Err(MatcherError::StartOfBuffer)
            } else {
                Ok(())
            }
        }
    }

    /// Apply a pending prune: shifts the mapper's stored positions and the
    /// matcher's own bookkeeping by `delta`, mirroring the buffer's own
    /// shift. Call this immediately after any `RingBuffer::write`/
    /// `read_from` call that returned `Some(delta)`.
    pub fn apply_shift(&mut self, delta: u32) {
        self.mapper.shift(delta);
        self.next_to_index = self.next_to_index.saturating_sub(delta as usize);
    }

    /// Outgoing edges at the current window head: always at least the
    /// one-byte literal edge, plus a back-reference edge for every
    /// sufficiently-long verified candidate.
    ///
    /// # Panics
    /// Panics if there is no byte available at the window head (callers
    /// should stop requesting edges once the buffer is exhausted).
    pub fn edges(&mut self, max_len: u32) -> Vec<Seq> {
        let w = self.buffer.w();
        let window = self.buffer.window();
        debug_assert!(w < window.len(), "edges() requires a byte at the window head");

        let mut out = vec![Seq::literal(window[w])];

        let key = self.key_at(w);
        self.candidates.clear();
        self.mapper.get(key, &mut self.candidates);

        let window_size = self.buffer.window_size();
        let real_avail = (window.len() - w) as u32;
        let effective_max = max_len.min(real_avail);

        for cand in &self.candidates {
            let j = cand.position as usize;
            if j >= w {
                continue;
            }
            let offset = (w - j) as u32;
            if offset == 0 || offset > window_size {
                continue;
            }
            let cap = effective_max as usize;
            let a = &window[j..(j + cap).min(window.len())];
            let b = &window[w..w + cap];
            let k = lcp(a, b).min(cap) as u32;
            if k >= self.min_match_len {
                out.push(Seq::reference(offset, k));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::hash::HashIndex;

    fn matcher(window_size: u32) -> Matcher<HashIndex> {
        let buf = RingBuffer::new(window_size, window_size / 2, window_size * 2);
        let idx = HashIndex::new(4, 14);
        Matcher::new(buf, idx, 4, 3)
    }

    #[test]
    fn edges_always_include_literal() {
        let mut m = matcher(1024);
        m.buffer_mut().write(b"abc").unwrap();
        let edges = m.edges(273);
        assert!(edges.iter().any(|e| e.lit_len == 1 && e.match_len == 0));
    }

    #[test]
    fn edges_find_a_repeated_pattern() {
        let mut m = matcher(1024);
        m.buffer_mut().write(b"foobarfoobar").unwrap();
        // Walk forward, indexing as we go, until we reach the second "foobar".
        for _ in 0..6 {
            m.skip(1).unwrap();
        }
        let edges = m.edges(273);
        let best = edges.iter().max_by_key(|e| e.match_len).unwrap();
        assert!(best.match_len >= 3, "expected a match of at least min_match_len, got {best:?}");
        assert_eq!(best.offset, 6);
    }

    #[test]
    fn skip_negative_clamps_at_start_of_buffer() {
        let mut m = matcher(1024);
        m.buffer_mut().write(b"hello").unwrap();
        m.skip(2).unwrap();
        assert_eq!(m.skip(-10), Err(MatcherError::StartOfBuffer));
        assert_eq!(m.buffer().w(), 0);
    }

    #[test]
    fn shift_keeps_candidates_addressable_after_prune() {
        let mut m = matcher(16);
        // window_size=16, shrink_size=8, buffer_size=32
        m.buffer_mut().write(b"0123456789abcdef0123456789abcdef").unwrap();
        for _ in 0..20 {
            m.skip(1).unwrap();
        }
        let (_, shifted) = m.buffer_mut().write(b"XYZ").unwrap();
        if let Some(delta) = shifted {
            m.apply_shift(delta);
        }
        // Matcher should still be usable post-shift without panicking.
        let _ = m.edges(8);
    }
}
