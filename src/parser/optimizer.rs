//! Dynamic-programming optimizer: computes a minimum-cost path of literal
//! and match edges across a block, instead of greedily committing to the
//! matcher's longest edge at each position.
//!
//! Uses [`Bitset`]/[`SmallIntSet`] (neither of which the hash-chain parsers
//! need) to track the live set of matches still reachable from the current
//! DP position: the bitset + small-int-set utilities together form the
//! live-match index.

use crate::bitset::SmallIntSet;
use crate::index::Mapper;
use crate::matcher::Matcher;
use crate::seq::{Block, ParseFlags, Seq};

use super::{apply_no_trailing_literals, ParseError, Parser};

/// One matcher-derived candidate: positions `[a, b)` can be produced by
/// copying `b - a` bytes from `a - offset`. `offset == 0` denotes a literal
/// run (used only internally by the DP, never stored in a reduced list).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Match {
    pub a: usize,
    pub b: usize,
    pub offset: u32,
}

/// Reference cost function: `bit_length(offset) + bit_length(match_len)`
/// for a match, `8` bits per literal byte otherwise (`offset == 0`).
/// Exposed so callers can reuse it, or supply their own `cost` and only
/// borrow `bit_length`.
pub fn default_cost(offset: u32, match_len: u32) -> u64 {
    if offset == 0 {
        8 * match_len as u64
    } else {
        bit_length(offset) + bit_length(match_len)
    }
}

fn bit_length(v: u32) -> u64 {
    if v == 0 {
        0
    } else {
        (32 - v.leading_zeros()) as u64
    }
}

/// Sort by `(offset asc, a asc, b desc)`, merge overlapping/contacting
/// matches that share an offset, and drop any match whose start position is
/// already shadowed by a previously kept match (necessarily of no greater
/// offset, since offset is the outer sort key) reaching at least as far.
fn reduce_matches(mut matches: Vec<Match>, n: usize) -> Vec<Match> {
    if matches.is_empty() {
        return matches;
    }
    matches.sort_by(|x, y| x.offset.cmp(&y.offset).then(x.a.cmp(&y.a)).then(y.b.cmp(&x.b)));
    let mut shadow = vec![0usize; n + 1];
    let mut out: Vec<Match> = Vec::new();
    for m in matches {
        if shadow[m.a] >= m.b {
            continue;
        }
        shadow[m.a] = shadow[m.a].max(m.b);
        if let Some(last) = out.last_mut() {
            if last.offset == m.offset && m.a <= last.b {
                last.b = last.b.max(m.b);
                continue;
            }
        }
        out.push(m);
    }
    out.sort_by(|x, y| x.a.cmp(&y.a));
    out
}

#[derive(Debug, Clone, Copy)]
struct DpNode {
    cost: u64,
    offset: u32,
    match_len: u32,
}

impl DpNode {
    const UNREACHED: DpNode = DpNode { cost: u64::MAX, offset: 0, match_len: 0 };
}

pub struct OptimizerParser<M: Mapper> {
    matcher: Matcher<M>,
    min_match_len: u32,
    max_match_len: u32,
    block_size: u32,
    cost: fn(u32, u32) -> u64,
}

impl<M: Mapper> OptimizerParser<M> {
    pub fn new(matcher: Matcher<M>, min_match_len: u32, max_match_len: u32, block_size: u32) -> Self {
        OptimizerParser { matcher, min_match_len, max_match_len, block_size, cost: default_cost }
    }

    pub fn with_cost(mut self, cost: fn(u32, u32) -> u64) -> Self {
        self.cost = cost;
        self
    }

    pub fn matcher(&self) -> &Matcher<M> {
        &self.matcher
    }

    pub fn matcher_mut(&mut self) -> &mut Matcher<M> {
        &mut self.matcher
    }

    fn add_match(&self, dp: &mut [DpNode], i: usize, min_n: u32, max_len: u32, offset: u32) {
        if dp[i].cost == u64::MAX {
            return;
        }
        let base = dp[i].cost;
        let mut n = min_n;
        while n <= max_len {
            let target = i + n as usize;
            if target >= dp.len() {
                break;
            }
            let c = base + (self.cost)(offset, n);
            if c < dp[target].cost {
                dp[target] = DpNode { cost: c, offset, match_len: n };
            }
            n += 1;
        }
    }
}

impl<M: Mapper> Parser for OptimizerParser<M> {
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

        // Pass 1: walk the block once, collecting every match edge the
        // matcher offers (this also performs the indexing `skip` always
        // does, so the window head lands on `end` exactly as in the other
        // parsers).
        let mut raw_matches = Vec::new();
        let mut local = 0usize;
        while local < n {
            let remaining = (n - local) as u32;
            let max_len = self.max_match_len.min(remaining);
            let edges = self.matcher.edges(max_len);
            for e in &edges {
                if e.is_match() {
                    raw_matches.push(Match { a: local, b: local + e.match_len as usize, offset: e.offset });
                }
            }
            self.matcher.skip(1).ok();
            local += 1;
        }

        let matches = reduce_matches(raw_matches, n);

        // Pass 2: DP over local positions [0, n].
        let mut dp = vec![DpNode::UNREACHED; n + 1];
        dp[0] = DpNode { cost: 0, offset: 0, match_len: 0 };
        let mut live = SmallIntSet::new();
        let mut next_match = 0usize;

        for i in 0..n {
            while next_match < matches.len() && matches[next_match].a <= i {
                live.insert(next_match as u32);
                next_match += 1;
            }
            let live_now: Vec<u32> = live.iter().collect();
            for idx in live_now {
                let m = matches[idx as usize];
                if m.b <= i {
                    live.remove(idx);
                    continue;
                }
                let remaining = (m.b - i) as u32;
                if remaining >= self.min_match_len {
                    self.add_match(&mut dp, i, self.min_match_len, remaining.min(self.max_match_len), m.offset);
                }
                if remaining <= self.min_match_len {
                    live.remove(idx);
                }
            }
            self.add_match(&mut dp, i, 1, 1, 0);
        }

        // Pass 3: reconstruct the path from `n` back to `0`.
        let mut edges_rev = Vec::new();
        let mut i = n;
        while i > 0 {
            let node = dp[i];
            debug_assert!(node.cost != u64::MAX, "every position must be reachable via the literal chain");
            let start = i - node.match_len as usize;
            edges_rev.push((start, node.offset, node.match_len));
            i = start;
        }
        edges_rev.reverse();

        let window = self.matcher.buffer().window();
        let mut pending_lit: u32 = 0;
        let mut lit_start_abs = w0;
        for (start, offset, len) in edges_rev {
            let abs = w0 + start;
            if offset == 0 {
                pending_lit += len;
            } else {
                block.sequences.push(Seq { lit_len: pending_lit, match_len: len, offset, aux: 0 });
                block.literals.extend_from_slice(&window[lit_start_abs..lit_start_abs + pending_lit as usize]);
                pending_lit = 0;
                lit_start_abs = abs + len as usize;
            }
        }

        if pending_lit > 0 {
            block.literals.extend_from_slice(&window[lit_start_abs..lit_start_abs + pending_lit as usize]);
            let dropped = apply_no_trailing_literals(block, flags, pending_lit as usize);
            if dropped > 0 {
                self.matcher.skip(-(dropped as i64)).ok();
            }
        }

        Ok((self.matcher.buffer().w() - w0) as u64)
    }
}
