//! Greedy parser: at each position, take the single longest edge the
//! matcher offers. No lookahead — the reference for correctness that every
//! other parser's output is checked against (the "backward-extension
//! optimality" property: BHP/BDHP must never emit a worse match than this
//! would at the same position).

use crate::index::Mapper;
use crate::matcher::Matcher;
use crate::seq::{Block, ParseFlags, Seq};

use super::{apply_no_trailing_literals, ParseError, Parser};

pub struct GreedyParser<M: Mapper> {
    matcher: Matcher<M>,
    max_match_len: u32,
    block_size: u32,
}

impl<M: Mapper> GreedyParser<M> {
    pub fn new(matcher: Matcher<M>, max_match_len: u32, block_size: u32) -> Self {
        GreedyParser { matcher, max_match_len, block_size }
    }

    pub fn matcher(&self) -> &Matcher<M> {
        &self.matcher
    }

    pub fn matcher_mut(&mut self) -> &mut Matcher<M> {
        &mut self.matcher
    }
}

impl<M: Mapper> Parser for GreedyParser<M> {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, crate::buffer::BufferError> {
        let (n, shift) = self.matcher.buffer_mut().write(bytes)?;
        if let Some(delta) = shift {
            self.matcher.apply_shift(delta);
        }
        Ok(n)
    }

    fn parse(&mut self, block: Option<&mut Block>, flags: ParseFlags) -> Result<u64, ParseError> {
        let w0 = self.matcher.buffer().w();
        let available = self.matcher.buffer().len() - w0;
        if available == 0 {
            return Err(ParseError::EmptyBuffer);
        }
        let n = available.min(self.block_size as usize);
        let end = w0 + n;

        let Some(block) = block else {
            self.matcher.skip(n as i64).ok();
            return Ok(n as u64);
        };
        block.clear();

        let mut lit_start = w0;
        let mut pending_lit_len: u32 = 0;

        while self.matcher.buffer().w() < end {
            let w = self.matcher.buffer().w();
            let remaining = (end - w) as u32;
            let max_len = self.max_match_len.min(remaining);
            let edges = self.matcher.edges(max_len);
            let best = edges.iter().max_by_key(|e| e.match_len.max(1)).copied().unwrap_or_else(Seq::default);

            if best.is_match() {
                block.sequences.push(Seq {
                    lit_len: pending_lit_len,
                    match_len: best.match_len,
                    offset: best.offset,
                    aux: 0,
                });
                block.literals.extend_from_slice(&self.matcher.buffer().window()[lit_start..lit_start + pending_lit_len as usize]);
                self.matcher.skip(best.match_len as i64).ok();
                pending_lit_len = 0;
                lit_start = self.matcher.buffer().w();
            } else {
                pending_lit_len += 1;
                self.matcher.skip(1).ok();
            }
        }

        if pending_lit_len > 0 {
            block.literals.extend_from_slice(&self.matcher.buffer().window()[lit_start..lit_start + pending_lit_len as usize]);
            let dropped = apply_no_trailing_literals(block, flags, pending_lit_len as usize);
            if dropped > 0 {
                self.matcher.skip(-(dropped as i64)).ok();
            }
        }

        Ok((self.matcher.buffer().w() - w0) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::RingBuffer;
    use crate::index::hash::HashIndex;

    fn parser(window_size: u32, block_size: u32) -> GreedyParser<HashIndex> {
        let buf = RingBuffer::new(window_size, window_size / 2, window_size * 2);
        let idx = HashIndex::new(4, 16);
        let m = Matcher::new(buf, idx, 4, 3);
        GreedyParser::new(m, 273, block_size)
    }

    #[test]
    fn empty_input_reports_empty_buffer() {
        let mut p = parser(1024, 128);
        let mut block = Block::new();
        assert_eq!(p.parse(Some(&mut block), 0), Err(ParseError::EmptyBuffer));
    }

    #[test]
    fn pure_literals_when_no_repeats() {
        let mut p = parser(1024, 128);
        p.matcher_mut().buffer_mut().write(b"abcdef").unwrap();
        let mut block = Block::new();
        let consumed = p.parse(Some(&mut block), 0).unwrap();
        assert_eq!(consumed, 6);
        assert!(block.sequences.iter().all(|s| !s.is_match()) || block.sequences.is_empty());
        assert!(block.literals_invariant_holds());
    }

    #[test]
    fn finds_a_repeated_run() {
        let mut p = parser(1024, 128);
        p.matcher_mut().buffer_mut().write(b"foobarfoobar").unwrap();
        let mut block = Block::new();
        let consumed = p.parse(Some(&mut block), 0).unwrap();
        assert_eq!(consumed, 12);
        assert!(block.sequences.iter().any(|s| s.is_match()));
    }

    #[test]
    fn no_trailing_literals_rewinds_head() {
        let mut p = parser(1024, 128);
        p.matcher_mut().buffer_mut().write(b"foobarfoobarXY").unwrap();
        let mut block = Block::new();
        let consumed = p.parse(Some(&mut block), crate::seq::NO_TRAILING_LITERALS).unwrap();
        assert!(consumed < 14);
        assert_eq!(p.matcher().buffer().w(), consumed as usize);
    }
}
