//! Backward-double-hash parser (BDHP): like BHP but probes two hash tables
//! keyed by different `input_len`s — a longer key for rare, high-confidence
//! hits and a shorter one that fills in once the long key misses.
//!
//! Grounded on the same dual-hash backward-extending strategy as the
//! single-table BHP, split across two tables instead of one.

use crate::buffer::RingBuffer;
use crate::bytes::load_le64;
use crate::seq::{Block, ParseFlags, Seq};

use super::backward_hash::SwapTable;
use super::{apply_no_trailing_literals, backward_extend, ParseError, Parser};

pub struct BackwardDoubleHashParser {
    buffer: RingBuffer,
    long: SwapTable,
    short: SwapTable,
    window_size: u32,
    min_match_len: u32,
    max_match_len: u32,
    block_size: u32,
}

impl BackwardDoubleHashParser {
    pub fn new(
        buffer: RingBuffer,
        long_input_len: u32,
        long_hash_bits: u32,
        short_input_len: u32,
        short_hash_bits: u32,
        window_size: u32,
        min_match_len: u32,
        max_match_len: u32,
        block_size: u32,
    ) -> Self {
        assert!(long_input_len > short_input_len);
        BackwardDoubleHashParser {
            buffer,
            long: SwapTable::new(long_input_len, long_hash_bits),
            short: SwapTable::new(short_input_len, short_hash_bits),
            window_size,
            min_match_len,
            max_match_len,
            block_size,
        }
    }

    pub fn buffer(&self) -> &RingBuffer {
        &self.buffer
    }

    pub fn buffer_mut(&mut self) -> &mut RingBuffer {
        &mut self.buffer
    }

    pub fn apply_shift(&mut self, delta: u32) {
        self.long.shift(delta);
        self.short.shift(delta);
    }

    pub fn reset_index(&mut self) {
        self.long.reset();
        self.short.reset();
    }

    fn extend(&self, i: usize, j: usize, limit: usize) -> usize {
        let a = &self.buffer.window()[j..];
        let b = &self.buffer.window()[i..];
        crate::bytes::lcp(a, b).min(limit)
    }

    fn verify(&self, i: usize, j: u32, len: usize) -> Option<(u32, u32)> {
        let j = j as usize;
        if j >= i {
            return None;
        }
        let offset = (i - j) as u32;
        if offset == 0 || offset > self.window_size {
            return None;
        }
        let limit = (len - i).min(self.max_match_len as usize);
        let k = self.extend(i, j, limit);
        if k < self.min_match_len as usize {
            None
        } else {
            Some((offset, k as u32))
        }
    }
}

impl Parser for BackwardDoubleHashParser {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, crate::buffer::BufferError> {
        let (n, shift) = self.buffer.write(bytes)?;
        if let Some(delta) = shift {
            self.apply_shift(delta);
        }
        Ok(n)
    }

    fn parse(&mut self, block: Option<&mut Block>, flags: ParseFlags) -> Result<u64, ParseError> {
        let w0 = self.buffer.w();
        let len = self.buffer.len();
        let available = len - w0;
        if available == 0 {
            return Err(ParseError::EmptyBuffer);
        }
        let n = available.min(self.block_size as usize);
        let input_end = w0 + n;

        let Some(block) = block else {
            for p in w0..input_end {
                let y = load_le64(self.buffer.margin_slice(p));
                self.long.insert(p as u32, y);
                self.short.insert(p as u32, y);
            }
            self.buffer.advance_w(n);
            return Ok(n as u64);
        };
        block.clear();

        let mut i = w0;
        let mut lit_index = w0;

        while i < input_end {
            let y = load_le64(self.buffer.margin_slice(i));
            let long_cand = self.long.swap(i as u32, y);
            let short_cand = self.short.swap(i as u32, y);

            let mut found = long_cand.and_then(|c| self.verify(i, c.position, len));
            if found.is_none() {
                found = short_cand.and_then(|c| self.verify(i, c.position, len));
            }

            if let Some((offset, mut k)) = found {
                let j = (i as u32 - offset) as usize;
                let mut match_start = i;
                let back_room = match_start - lit_index;
                if back_room > 0 {
                    let m = backward_extend(self.buffer.window(), lit_index, match_start, j);
                    match_start -= m;
                    k += m as u32;
                }
                block.sequences.push(Seq {
                    lit_len: (match_start - lit_index) as u32,
                    match_len: k,
                    offset,
                    aux: 0,
                });
                block.literals.extend_from_slice(&self.buffer.window()[lit_index..match_start]);
                let index_end = (match_start + k as usize).min(input_end);
                for p in (match_start + 1)..index_end {
                    let v = load_le64(self.buffer.margin_slice(p));
                    self.long.insert(p as u32, v);
                    self.short.insert(p as u32, v);
                }
                lit_index = match_start + k as usize;
                i = lit_index;
            } else {
                i += 1;
            }
        }

        let trailing = input_end - lit_index;
        if trailing > 0 {
            block.literals.extend_from_slice(&self.buffer.window()[lit_index..input_end]);
        }
        self.buffer.advance_w(input_end - w0);

        let dropped = apply_no_trailing_literals(block, flags, trailing);
        if dropped > 0 {
            self.buffer.rewind_w(dropped);
        }

        Ok((self.buffer.w() - w0) as u64)
    }
}
