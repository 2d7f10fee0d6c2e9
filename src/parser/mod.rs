//! Parsers consume a ring buffer's window and emit a [`Block`] of [`Seq`]
//! values. Every variant shares the same `parse` contract; they differ only
//! in how they pick edges at each position.

pub mod backward_double_hash;
pub mod backward_hash;
pub mod bucket;
pub mod greedy;
pub mod optimizer;

use crate::buffer::BufferError;
use crate::bytes::lcs;
use crate::seq::{Block, ParseFlags, NO_TRAILING_LITERALS};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing remains to parse or advance.
    EmptyBuffer,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("nothing left to parse")
    }
}

impl std::error::Error for ParseError {}

/// Shared contract: consume up to `block_size` bytes at the window head.
/// `block == None` advances and indexes without emitting sequences.
pub trait Parser {
    fn parse(&mut self, block: Option<&mut Block>, flags: ParseFlags) -> Result<u64, ParseError>;

    /// Append bytes to the underlying ring buffer, applying any shift a
    /// prune triggers to this parser's own index structures.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, BufferError>;
}

/// If `NO_TRAILING_LITERALS` is set and the block isn't empty, drop
/// `trailing` literal bytes already appended to `block.literals` and report
/// how far the caller should rewind its window head.
pub(crate) fn apply_no_trailing_literals(block: &mut Block, flags: ParseFlags, trailing: usize) -> usize {
    if trailing > 0 && flags & NO_TRAILING_LITERALS != 0 && !block.sequences.is_empty() {
        let new_len = block.literals.len() - trailing;
        block.literals.truncate(new_len);
        trailing
    } else {
        0
    }
}

/// Grow a match backward into the pending literal run: returns the number of
/// bytes the match grew by (and the literal run shrank by).
///
/// `lit_start` is the first unconsumed literal position, `i` the match's
/// current start, `j` the candidate's position in the window.
pub(crate) fn backward_extend(window: &[u8], lit_start: usize, i: usize, j: usize) -> usize {
    let back = i - lit_start;
    let a_start = j.saturating_sub(back);
    let a = &window[a_start..j];
    let b = &window[..i];
    lcs(a, b)
}
