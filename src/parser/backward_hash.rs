//! Backward-hash parser (BHP): fuses match-finding and parsing in a single
//! pass, indexing each position with a single overwrite-on-probe hash slot
//! as it's visited.
//!
//! Grounded on the hash-chain match search's insert/lookup/swap pattern,
//! simplified to a flat single-entry table (no chain) and generalized from
//! a fixed minimum match length to a configurable one.

use crate::buffer::RingBuffer;
use crate::bytes::{load_le64, load_le64_fast};
use crate::index::{hash_prefix, HashEntry};
use crate::seq::{Block, ParseFlags, Seq};

use super::{apply_no_trailing_literals, backward_extend, ParseError, Parser};

/// A raw single-slot hash table that both BHP and BDHP manage directly: the
/// parse loop needs "read the old entry, then overwrite" as one step, which
/// the shared `Mapper` contract doesn't expose.
pub(crate) struct SwapTable {
    table: Vec<HashEntry>,
    input_len: u32,
    hash_bits: u32,
}

impl SwapTable {
    pub(crate) fn new(input_len: u32, hash_bits: u32) -> Self {
        SwapTable { table: vec![HashEntry::EMPTY; 1 << hash_bits], input_len, hash_bits }
    }

    /// Hash `le64_value`, return the previous entry at that slot (if its
    /// stored value matches), and overwrite the slot with `(pos, value)`
    /// unconditionally.
    pub(crate) fn swap(&mut self, pos: u32, le64_value: u64) -> Option<HashEntry> {
        let slot = hash_prefix(le64_value, self.input_len, self.hash_bits) as usize;
        let prev = self.table[slot];
        self.table[slot] = HashEntry { position: pos, value: le64_value as u32 };
        if !prev.is_empty() && prev.value == le64_value as u32 {
            Some(prev)
        } else {
            None
        }
    }

    /// Insert without reading back the previous entry, used when indexing
    /// the span a match just covered.
    pub(crate) fn insert(&mut self, pos: u32, le64_value: u64) {
        let slot = hash_prefix(le64_value, self.input_len, self.hash_bits) as usize;
        self.table[slot] = HashEntry { position: pos, value: le64_value as u32 };
    }

    pub(crate) fn shift(&mut self, delta: u32) {
        for e in &mut self.table {
            if e.is_empty() {
                continue;
            }
            if e.position < delta {
                *e = HashEntry::EMPTY;
            } else {
                e.position -= delta;
            }
        }
    }

    pub(crate) fn reset(&mut self) {
        self.table.fill(HashEntry::EMPTY);
    }
}

pub struct BackwardHashParser {
    buffer: RingBuffer,
    table: SwapTable,
    window_size: u32,
    min_match_len: u32,
    max_match_len: u32,
    block_size: u32,
}

impl BackwardHashParser {
    pub fn new(
        buffer: RingBuffer,
        input_len: u32,
        hash_bits: u32,
        window_size: u32,
        min_match_len: u32,
        max_match_len: u32,
        block_size: u32,
    ) -> Self {
        BackwardHashParser {
            buffer,
            table: SwapTable::new(input_len, hash_bits),
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
        self.table.shift(delta);
    }

    pub fn reset_index(&mut self) {
        self.table.reset();
    }

    /// Word-parallel forward extension from a verified 8-byte collision:
    /// start from the already-known match length implied by `y` and the
    /// candidate's stored value, then keep comparing 8-byte words.
    fn extend_forward(&self, i: usize, j: usize, y: u64, limit: usize) -> usize {
        let jy = load_le64(self.buffer.margin_slice(j));
        let k = ((jy ^ y).trailing_zeros() as usize) >> 3;
        if k < 8 {
            return k.min(limit);
        }
        let mut p = 8;
        while p < limit {
            // SAFETY: `j + p < i + p <= len` (since `p < limit <= len - i`),
            // and `margin_slice` always has 8 live bytes past `len`.
            let xa = unsafe { load_le64_fast(self.buffer.margin_slice(j + p)) };
            let xb = unsafe { load_le64_fast(self.buffer.margin_slice(i + p)) };
            let diff = xa ^ xb;
            if diff != 0 {
                return (p + ((diff.trailing_zeros() as usize) >> 3)).min(limit);
            }
            p += 8;
        }
        limit
    }
}

impl Parser for BackwardHashParser {
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
                self.table.insert(p as u32, y);
            }
            self.buffer.advance_w(n);
            return Ok(n as u64);
        };
        block.clear();

        let mut i = w0;
        let mut lit_index = w0;

        while i < input_end {
            let y = load_le64(self.buffer.margin_slice(i));
            let candidate = self.table.swap(i as u32, y);

            let matched = candidate.and_then(|prev| {
                let j = prev.position as usize;
                if j >= i {
                    return None;
                }
                let offset = (i - j) as u32;
                if offset == 0 || offset > self.window_size {
                    return None;
                }
                let limit = (len - i).min(self.max_match_len as usize);
                let mut k = self.extend_forward(i, j, y, limit);
                if k < self.min_match_len as usize {
                    return None;
                }

                let mut match_start = i;
                let back_room = match_start - lit_index;
                if back_room > 0 {
                    let m = backward_extend(self.buffer.window(), lit_index, match_start, j);
                    match_start -= m;
                    k += m;
                }
                Some((match_start, j, offset, k as u32))
            });

            if let Some((match_start, j, offset, k)) = matched {
                block.sequences.push(Seq {
                    lit_len: (match_start - lit_index) as u32,
                    match_len: k,
                    offset,
                    aux: 0,
                });
                block.literals.extend_from_slice(&self.buffer.window()[lit_index..match_start]);
                // Index the covered span so future matches may land inside
                // the copied run.
                let index_end = (match_start + k as usize).min(input_end);
                for p in (match_start + 1)..index_end {
                    let v = load_le64(self.buffer.margin_slice(p));
                    self.table.insert(p as u32, v);
                }
                let _ = j;
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

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(window_size: u32, block_size: u32) -> BackwardHashParser {
        let buf = RingBuffer::new(window_size, window_size / 2, window_size * 2);
        BackwardHashParser::new(buf, 4, 16, window_size, 3, 273, block_size)
    }

    #[test]
    fn finds_a_match_across_a_mixed_literal_and_repeat_input() {
        let input = b"=====foofoobarfoobar bartender====";
        let mut p = parser(1024, 4096);
        p.buffer_mut().write(input).unwrap();
        let mut block = Block::new();
        let consumed = p.parse(Some(&mut block), 0).unwrap();
        assert_eq!(consumed, input.len() as u64);
        assert!(!block.sequences.is_empty());
        let total_literals: usize = block.sequences.iter().map(|s| s.lit_len as usize).sum::<usize>()
            + block.trailing_literals().len();
        assert!(total_literals < input.len());
    }

    #[test]
    fn empty_input_is_empty_buffer() {
        let mut p = parser(1024, 128);
        let mut block = Block::new();
        assert_eq!(p.parse(Some(&mut block), 0), Err(ParseError::EmptyBuffer));
    }
}
