//! Thin CLI surface: a `clap`-derived argument grammar plus the glue that
//! turns parsed flags into a [`crate::config::ParserConfig`]. The core
//! library has no dependency on this module.

use clap::{Parser as ClapParser, Subcommand, ValueEnum};

use crate::config::{BdhpConfig, BhpConfig, BupConfig, Common, GreedyConfig, OptimizerConfig, ParserConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Variant {
    Greedy,
    Bhp,
    Bdhp,
    Bup,
    Optimizer,
}

#[derive(Debug, ClapParser)]
#[command(name = "lzseq", about = "LZ77 sequence parsing and decoding, without entropy coding")]
pub struct Cli {
    /// Increase log verbosity; repeat for more (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all but error-level logging.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Parse a file into sequences and report block statistics.
    Parse(ParseArgs),
    /// Parse a file, replay it through the decoder, and confirm the result
    /// is byte-identical to the input.
    Roundtrip(ParseArgs),
}

#[derive(Debug, clap::Args)]
pub struct ParseArgs {
    pub input: std::path::PathBuf,

    #[arg(long, value_enum, default_value = "bhp")]
    pub variant: Variant,

    #[arg(long)]
    pub window_size: Option<u32>,

    #[arg(long)]
    pub block_size: Option<u32>,

    #[arg(long)]
    pub input_len: Option<u32>,

    #[arg(long)]
    pub hash_bits: Option<u32>,

    #[arg(long)]
    pub min_match_len: Option<u32>,

    #[arg(long)]
    pub max_match_len: Option<u32>,

    #[arg(long)]
    pub bucket_size: Option<usize>,
}

impl ParseArgs {
    pub fn to_parser_config(&self) -> ParserConfig {
        let common = Common {
            window_size: self.window_size.unwrap_or(0),
            block_size: self.block_size.unwrap_or(0),
            min_match_len: self.min_match_len.unwrap_or(0),
            max_match_len: self.max_match_len.unwrap_or(0),
            ..Common::default()
        };
        match self.variant {
            Variant::Greedy => ParserConfig::Greedy(GreedyConfig {
                common,
                input_len: self.input_len.unwrap_or(0),
                hash_bits: self.hash_bits.unwrap_or(0),
            }),
            Variant::Bhp => ParserConfig::Bhp(BhpConfig {
                common,
                input_len: self.input_len.unwrap_or(0),
                hash_bits: self.hash_bits.unwrap_or(0),
            }),
            Variant::Bdhp => ParserConfig::Bdhp(BdhpConfig {
                common,
                long_input_len: self.input_len.unwrap_or(0),
                long_hash_bits: self.hash_bits.unwrap_or(0),
                ..BdhpConfig::default()
            }),
            Variant::Bup => ParserConfig::Bup(BupConfig {
                common,
                input_len: self.input_len.unwrap_or(0),
                hash_bits: self.hash_bits.unwrap_or(0),
                bucket_size: self.bucket_size.unwrap_or(0),
            }),
            Variant::Optimizer => ParserConfig::Optimizer(OptimizerConfig {
                common,
                input_len: self.input_len.unwrap_or(0),
                hash_bits: self.hash_bits.unwrap_or(0),
            }),
        }
    }
}

/// Map `-v`/`-q` repeat counts to a `log`/`env_logger` filter, the way the
/// teacher's display-level counter maps verbosity flags to log output.
pub fn log_filter(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}
