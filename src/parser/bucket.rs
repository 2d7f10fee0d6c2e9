//! Bucket parser (BUP): like the backward-hash parsers, but probes a bucket
//! of recent candidates per slot instead of a single overwritten entry, and
//! keeps the strictly longer match (ties broken by the smaller offset).

use crate::buffer::RingBuffer;
use crate::bytes::{lcp, load_le64};
use crate::index::bucket::BucketHashIndex;
use crate::index::Mapper;
use crate::seq::{Block, ParseFlags, Seq};

use super::{apply_no_trailing_literals, backward_extend, ParseError, Parser};

pub struct BucketParser {
    buffer: RingBuffer,
    index: BucketHashIndex,
    window_size: u32,
    min_match_len: u32,
    max_match_len: u32,
    block_size: u32,
}

impl BucketParser {
    pub fn new(
        buffer: RingBuffer,
        input_len: u32,
        hash_bits: u32,
        bucket_size: usize,
        window_size: u32,
        min_match_len: u32,
        max_match_len: u32,
        block_size: u32,
    ) -> Self {
        BucketParser {
            buffer,
            index: BucketHashIndex::new(input_len, hash_bits, bucket_size),
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
        self.index.shift(delta);
    }

    pub fn reset_index(&mut self) {
        self.index.reset();
    }

    /// Scan every candidate in the bucket for `y`, returning the strictly
    /// longest verified match, ties broken toward the smaller offset.
    fn best_candidate(&self, i: usize, y: u64, len: usize) -> Option<(u32, u32)> {
        let limit = (len - i).min(self.max_match_len as usize);
        let window = self.buffer.window();
        let mut best: Option<(u32, u32)> = None;
        for entry in self.index.bucket_for(y).iter() {
            if entry.value != y as u32 {
                continue;
            }
            let j = entry.position as usize;
            if j >= i {
                continue;
            }
            let offset = (i - j) as u32;
            if offset == 0 || offset > self.window_size {
                continue;
            }
            let k = lcp(&window[j..], &window[i..i + limit.min(window.len() - i)]).min(limit) as u32;
            if k < self.min_match_len {
                continue;
            }
            best = match best {
                None => Some((offset, k)),
                Some((best_offset, best_k)) => {
                    if k > best_k || (k == best_k && offset < best_offset) {
                        Some((offset, k))
                    } else {
                        Some((best_offset, best_k))
                    }
                }
            };
        }
        best
    }
}

impl Parser for BucketParser {
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
                self.index.put(p as u32, y);
            }
            self.buffer.advance_w(n);
            return Ok(n as u64);
        };
        block.clear();

        let mut i = w0;
        let mut lit_index = w0;

        while i < input_end {
            let y = load_le64(self.buffer.margin_slice(i));
            let found = self.best_candidate(i, y, len);
            self.index.put(i as u32, y);

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
                    self.index.put(p as u32, v);
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

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(window_size: u32, block_size: u32) -> BucketParser {
        let buf = RingBuffer::new(window_size, window_size / 2, window_size * 2);
        BucketParser::new(buf, 4, 14, 8, window_size, 3, 273, block_size)
    }

    #[test]
    fn prefers_strictly_longer_match() {
        let mut p = parser(1024, 4096);
        p.buffer_mut().write(b"xxxxabcxxxxabcdefxxxxabc").unwrap();
        let mut block = Block::new();
        let consumed = p.parse(Some(&mut block), 0).unwrap();
        assert_eq!(consumed, 24);
        assert!(block.literals_invariant_holds());
    }

    #[test]
    fn empty_input_is_empty_buffer() {
        let mut p = parser(1024, 128);
        let mut block = Block::new();
        assert_eq!(p.parse(Some(&mut block), 0), Err(ParseError::EmptyBuffer));
    }
}
