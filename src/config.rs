//! One config struct per parser variant, a `set_defaults`/`verify` contract,
//! and a factory that builds the matching [`crate::parser::Parser`].
//!
//! Grounded on the preferences-struct-plus-constants pattern (fields,
//! display-level-style defaults, a single verify boundary before
//! construction rather than scattered runtime checks).

use log::debug;

use crate::buffer::RingBuffer;
use crate::index::hash::HashIndex;
use crate::matcher::Matcher;
use crate::parser::backward_double_hash::BackwardDoubleHashParser;
use crate::parser::backward_hash::BackwardHashParser;
use crate::parser::bucket::BucketParser;
use crate::parser::greedy::GreedyParser;
use crate::parser::optimizer::OptimizerParser;
use crate::parser::Parser;

pub const DEFAULT_WINDOW_SIZE: u32 = 8 * 1024 * 1024;
pub const DEFAULT_BLOCK_SIZE: u32 = 128 * 1024;
pub const DEFAULT_INPUT_LEN: u32 = 3;
pub const DEFAULT_MIN_MATCH_LEN: u32 = 3;
pub const DEFAULT_MAX_MATCH_LEN: u32 = 273;
pub const DEFAULT_BUCKET_SIZE: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    ShrinkSizeTooLarge,
    BufferSizeTooSmall,
    HashBitsTooLarge,
    InputLenOutOfRange,
    MinMatchLenTooLarge,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            ConfigError::ShrinkSizeTooLarge => "shrink_size must be < buffer_size",
            ConfigError::BufferSizeTooSmall => "buffer_size must be >= window_size",
            ConfigError::HashBitsTooLarge => "hash_bits must be <= min(24, 8 * input_len)",
            ConfigError::InputLenOutOfRange => "input_len must be in [2, 8]",
            ConfigError::MinMatchLenTooLarge => "min_match_len must be <= max_match_len",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ConfigError {}

/// Fields shared by every parser variant, embedded in each variant-specific
/// config below rather than factored into a base type, since each variant
/// fills a different subset of tunables.
#[derive(Debug, Clone, Copy)]
pub struct Common {
    pub window_size: u32,
    pub shrink_size: u32,
    pub buffer_size: u32,
    pub block_size: u32,
    pub min_match_len: u32,
    pub max_match_len: u32,
}

impl Default for Common {
    fn default() -> Self {
        Common { window_size: 0, shrink_size: 0, buffer_size: 0, block_size: 0, min_match_len: 0, max_match_len: 0 }
    }
}

impl Common {
    fn set_defaults(&mut self) {
        if self.window_size == 0 {
            self.window_size = DEFAULT_WINDOW_SIZE;
        }
        if self.shrink_size == 0 {
            self.shrink_size = (self.window_size / 2).min(32 * 1024);
        }
        if self.buffer_size == 0 {
            self.buffer_size = self.window_size;
        }
        if self.block_size == 0 {
            self.block_size = DEFAULT_BLOCK_SIZE;
        }
        if self.min_match_len == 0 {
            self.min_match_len = DEFAULT_MIN_MATCH_LEN;
        }
        if self.max_match_len == 0 {
            self.max_match_len = DEFAULT_MAX_MATCH_LEN;
        }
    }

    fn verify(&self) -> Result<(), ConfigError> {
        if self.shrink_size >= self.buffer_size {
            return Err(ConfigError::ShrinkSizeTooLarge);
        }
        if self.buffer_size < self.window_size {
            return Err(ConfigError::BufferSizeTooSmall);
        }
        if self.min_match_len > self.max_match_len {
            return Err(ConfigError::MinMatchLenTooLarge);
        }
        Ok(())
    }

    fn buffer(&self) -> RingBuffer {
        RingBuffer::new(self.window_size, self.shrink_size, self.buffer_size)
    }
}

/// `hash_bits` default: scale with the input so small inputs get a table no
/// bigger than they need, capped the same way `verify` caps any explicit
/// value.
fn default_hash_bits(input_len: u32, approx_input_size: u32) -> u32 {
    let scaled = 2 * approx_input_size.max(1).ilog2() + 6;
    scaled.min(24).min(8 * input_len)
}

fn verify_hash_bits(hash_bits: u32, input_len: u32) -> Result<(), ConfigError> {
    if !(2..=8).contains(&input_len) {
        return Err(ConfigError::InputLenOutOfRange);
    }
    if hash_bits > (8 * input_len).min(24) {
        return Err(ConfigError::HashBitsTooLarge);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GreedyConfig {
    pub common: Common,
    pub input_len: u32,
    pub hash_bits: u32,
}

impl GreedyConfig {
    pub fn set_defaults(&mut self) {
        self.common.set_defaults();
        if self.input_len == 0 {
            self.input_len = DEFAULT_INPUT_LEN;
        }
        if self.hash_bits == 0 {
            self.hash_bits = default_hash_bits(self.input_len, self.common.block_size);
        }
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        self.common.verify()?;
        verify_hash_bits(self.hash_bits, self.input_len)
    }

    pub fn build(&self) -> GreedyParser<HashIndex> {
        let idx = HashIndex::new(self.input_len, self.hash_bits);
        let matcher = Matcher::new(self.common.buffer(), idx, self.input_len, self.common.min_match_len);
        GreedyParser::new(matcher, self.common.max_match_len, self.common.block_size)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BhpConfig {
    pub common: Common,
    pub input_len: u32,
    pub hash_bits: u32,
}

impl BhpConfig {
    pub fn set_defaults(&mut self) {
        self.common.set_defaults();
        if self.input_len == 0 {
            self.input_len = DEFAULT_INPUT_LEN;
        }
        if self.hash_bits == 0 {
            self.hash_bits = default_hash_bits(self.input_len, self.common.block_size);
        }
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        self.common.verify()?;
        verify_hash_bits(self.hash_bits, self.input_len)
    }

    pub fn build(&self) -> BackwardHashParser {
        BackwardHashParser::new(
            self.common.buffer(),
            self.input_len,
            self.hash_bits,
            self.common.window_size,
            self.common.min_match_len,
            self.common.max_match_len,
            self.common.block_size,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BdhpConfig {
    pub common: Common,
    pub long_input_len: u32,
    pub long_hash_bits: u32,
    pub short_input_len: u32,
    pub short_hash_bits: u32,
}

impl BdhpConfig {
    pub fn set_defaults(&mut self) {
        self.common.set_defaults();
        if self.long_input_len == 0 {
            self.long_input_len = 6;
        }
        if self.short_input_len == 0 {
            self.short_input_len = DEFAULT_INPUT_LEN;
        }
        if self.long_hash_bits == 0 {
            self.long_hash_bits = default_hash_bits(self.long_input_len, self.common.block_size);
        }
        if self.short_hash_bits == 0 {
            self.short_hash_bits = default_hash_bits(self.short_input_len, self.common.block_size);
        }
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        self.common.verify()?;
        verify_hash_bits(self.long_hash_bits, self.long_input_len)?;
        verify_hash_bits(self.short_hash_bits, self.short_input_len)?;
        if self.long_input_len <= self.short_input_len {
            return Err(ConfigError::InputLenOutOfRange);
        }
        Ok(())
    }

    pub fn build(&self) -> BackwardDoubleHashParser {
        BackwardDoubleHashParser::new(
            self.common.buffer(),
            self.long_input_len,
            self.long_hash_bits,
            self.short_input_len,
            self.short_hash_bits,
            self.common.window_size,
            self.common.min_match_len,
            self.common.max_match_len,
            self.common.block_size,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BupConfig {
    pub common: Common,
    pub input_len: u32,
    pub hash_bits: u32,
    pub bucket_size: usize,
}

impl BupConfig {
    pub fn set_defaults(&mut self) {
        self.common.set_defaults();
        if self.input_len == 0 {
            self.input_len = DEFAULT_INPUT_LEN;
        }
        if self.hash_bits == 0 {
            self.hash_bits = default_hash_bits(self.input_len, self.common.block_size);
        }
        if self.bucket_size == 0 {
            self.bucket_size = DEFAULT_BUCKET_SIZE;
        }
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        self.common.verify()?;
        verify_hash_bits(self.hash_bits, self.input_len)
    }

    pub fn build(&self) -> BucketParser {
        BucketParser::new(
            self.common.buffer(),
            self.input_len,
            self.hash_bits,
            self.bucket_size,
            self.common.window_size,
            self.common.min_match_len,
            self.common.max_match_len,
            self.common.block_size,
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizerConfig {
    pub common: Common,
    pub input_len: u32,
    pub hash_bits: u32,
}

impl OptimizerConfig {
    pub fn set_defaults(&mut self) {
        self.common.set_defaults();
        if self.input_len == 0 {
            self.input_len = DEFAULT_INPUT_LEN;
        }
        if self.hash_bits == 0 {
            self.hash_bits = default_hash_bits(self.input_len, self.common.block_size);
        }
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        self.common.verify()?;
        verify_hash_bits(self.hash_bits, self.input_len)
    }

    pub fn build(&self) -> OptimizerParser<HashIndex> {
        let idx = HashIndex::new(self.input_len, self.hash_bits);
        let matcher = Matcher::new(self.common.buffer(), idx, self.input_len, self.common.min_match_len);
        OptimizerParser::new(matcher, self.common.min_match_len, self.common.max_match_len, self.common.block_size)
    }
}

/// Tagged union over every parser flavor: one sum type rather than a
/// separate concrete config type per variant.
#[derive(Debug, Clone, Copy)]
pub enum ParserConfig {
    Greedy(GreedyConfig),
    Bhp(BhpConfig),
    Bdhp(BdhpConfig),
    Bup(BupConfig),
    Optimizer(OptimizerConfig),
}

impl ParserConfig {
    pub fn set_defaults(&mut self) {
        match self {
            ParserConfig::Greedy(c) => c.set_defaults(),
            ParserConfig::Bhp(c) => c.set_defaults(),
            ParserConfig::Bdhp(c) => c.set_defaults(),
            ParserConfig::Bup(c) => c.set_defaults(),
            ParserConfig::Optimizer(c) => c.set_defaults(),
        }
    }

    pub fn verify(&self) -> Result<(), ConfigError> {
        match self {
            ParserConfig::Greedy(c) => c.verify(),
            ParserConfig::Bhp(c) => c.verify(),
            ParserConfig::Bdhp(c) => c.verify(),
            ParserConfig::Bup(c) => c.verify(),
            ParserConfig::Optimizer(c) => c.verify(),
        }
    }

    pub fn window_size(&self) -> u32 {
        match self {
            ParserConfig::Greedy(c) => c.common.window_size,
            ParserConfig::Bhp(c) => c.common.window_size,
            ParserConfig::Bdhp(c) => c.common.window_size,
            ParserConfig::Bup(c) => c.common.window_size,
            ParserConfig::Optimizer(c) => c.common.window_size,
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            ParserConfig::Greedy(_) => "greedy",
            ParserConfig::Bhp(_) => "bhp",
            ParserConfig::Bdhp(_) => "bdhp",
            ParserConfig::Bup(_) => "bup",
            ParserConfig::Optimizer(_) => "optimizer",
        }
    }
}

/// Build the parser selected by `cfg`, after running `set_defaults` and
/// `verify`. This is the crate's one factory boundary: call sites never
/// construct a concrete parser type directly.
pub fn build(mut cfg: ParserConfig) -> Result<Box<dyn Parser>, ConfigError> {
    cfg.set_defaults();
    cfg.verify()?;
    debug!("building parser: variant={}", cfg.variant_name());
    let parser: Box<dyn Parser> = match cfg {
        ParserConfig::Greedy(c) => Box::new(c.build()),
        ParserConfig::Bhp(c) => Box::new(c.build()),
        ParserConfig::Bdhp(c) => Box::new(c.build()),
        ParserConfig::Bup(c) => Box::new(c.build()),
        ParserConfig::Optimizer(c) => Box::new(c.build()),
    };
    Ok(parser)
}
