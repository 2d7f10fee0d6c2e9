//! Replays a [`Block`] into a ring buffer, reconstructing the original
//! bytes. Mirrors [`crate::buffer::RingBuffer`] but is write-only from the
//! LZ perspective: every append either copies literal bytes in or expands a
//! back-reference via the overlapping-copy loop.
//!
//! The overlapping-copy step uses the usual `memcpy_using_offset` doubling
//! strategy, re-expressed over safe slice operations.

use log::warn;

use crate::seq::Block;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    LitLenOutOfRange,
    MatchLenOutOfRange,
    OffsetOutOfRange,
    FullBuffer,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            DecodeError::LitLenOutOfRange => "literal run longer than remaining literals",
            DecodeError::MatchLenOutOfRange => "match length exceeds window size",
            DecodeError::OffsetOutOfRange => "offset outside the reconstructed window",
            DecodeError::FullBuffer => "no space remains and prune could not free enough",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for DecodeError {}

pub struct Decoder {
    data: Vec<u8>,
    /// Read cursor: bytes `[0, read)` have already been drained via `read`.
    read: usize,
    window_size: u32,
    buffer_size: u32,
}

impl Decoder {
    pub fn new(window_size: u32, buffer_size: u32) -> Self {
        assert!(buffer_size >= window_size);
        Decoder { data: Vec::new(), read: 0, window_size, buffer_size }
    }

    pub fn window_size(&self) -> u32 {
        self.window_size
    }

    /// Bytes produced so far but not yet drained by `read`/`write_to`.
    pub fn unread(&self) -> &[u8] {
        &self.data[self.read..]
    }

    fn window_fill(&self) -> usize {
        self.data.len().min(self.window_size as usize)
    }

    /// Discard everything behind the current window, keeping only the most
    /// recent `window_size` bytes addressable for future back-references.
    /// Bytes already drained by `read` are dropped first; undrained bytes
    /// are never discarded by a prune.
    fn prune(&mut self) {
        let keep_from = self.read.max(self.data.len().saturating_sub(self.window_size as usize));
        if keep_from == 0 {
            return;
        }
        self.data.drain(..keep_from);
        self.read -= keep_from;
    }

    fn ensure_room(&mut self, additional: usize) -> Result<(), DecodeError> {
        if self.data.len() + additional <= self.buffer_size as usize {
            return Ok(());
        }
        self.prune();
        if self.data.len() + additional > self.buffer_size as usize {
            return Err(DecodeError::FullBuffer);
        }
        Ok(())
    }

    /// Validate, prune, then append a standalone back-reference — the
    /// strict `validate -> prune -> append` ordering chosen to avoid
    /// accepting an offset that would only become legal after pruning.
    pub fn write_match(&mut self, match_len: u32, offset: u32) -> Result<(), DecodeError> {
        if offset == 0 || offset as usize > self.window_fill() || offset > self.window_size {
            return Err(DecodeError::OffsetOutOfRange);
        }
        if match_len > self.window_size {
            return Err(DecodeError::MatchLenOutOfRange);
        }
        self.ensure_room(match_len as usize)?;
        self.overlapping_copy(match_len as usize, offset as usize);
        Ok(())
    }

    fn overlapping_copy(&mut self, mut m: usize, mut o: usize) {
        while m > o {
            let end = self.data.len();
            let chunk: Vec<u8> = self.data[end - o..].to_vec();
            self.data.extend_from_slice(&chunk);
            m -= o;
            o *= 2;
        }
        let end = self.data.len();
        let tail: Vec<u8> = self.data[end - o..end - o + m].to_vec();
        self.data.extend_from_slice(&tail);
    }

    /// Replay every sequence in `block`. Atomic at sequence granularity: a
    /// failing sequence leaves everything decoded so far in place and stops.
    pub fn write_block(&mut self, block: &Block) -> Result<(), DecodeError> {
        let mut lit_offset = 0usize;
        for seq in &block.sequences {
            let lit_len = seq.lit_len as usize;
            if lit_offset + lit_len > block.literals.len() {
                return Err(DecodeError::LitLenOutOfRange);
            }
            if seq.match_len > 0 {
                let window_fill_after_lits = self.window_fill() + lit_len;
                if seq.offset == 0 || seq.offset as usize > window_fill_after_lits.min(self.window_size as usize) {
                    warn!("rejecting sequence: offset {} out of range", seq.offset);
                    return Err(DecodeError::OffsetOutOfRange);
                }
                if seq.match_len > self.window_size {
                    warn!("rejecting sequence: match_len {} exceeds window_size", seq.match_len);
                    return Err(DecodeError::MatchLenOutOfRange);
                }
            } else if seq.offset != 0 {
                return Err(DecodeError::OffsetOutOfRange);
            }

            self.ensure_room(lit_len + seq.match_len as usize)?;
            self.data.extend_from_slice(&block.literals[lit_offset..lit_offset + lit_len]);
            lit_offset += lit_len;
            if seq.match_len > 0 {
                self.overlapping_copy(seq.match_len as usize, seq.offset as usize);
            }
        }

        let trailing = &block.literals[lit_offset..];
        if !trailing.is_empty() {
            self.ensure_room(trailing.len())?;
            self.data.extend_from_slice(trailing);
        }
        Ok(())
    }

    /// Drain up to `dst.len()` bytes into `dst`, returning how many were
    /// copied.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.data.len() - self.read);
        dst[..n].copy_from_slice(&self.data[self.read..self.read + n]);
        self.read += n;
        n
    }

    pub fn write_to(&mut self, writer: &mut impl std::io::Write) -> std::io::Result<usize> {
        let n = self.data.len() - self.read;
        writer.write_all(&self.data[self.read..])?;
        self.read = self.data.len();
        Ok(n)
    }
}
