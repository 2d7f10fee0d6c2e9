//! Binary entry point for the `lzseq` command-line tool: parse a file into
//! sequences, or parse-then-decode and confirm the round trip.

use std::fs::File;
use std::io::Read;

use anyhow::{bail, Context, Result};
use clap::Parser as _;
use log::info;

use lzseq::cli::{log_filter, Cli, Command, ParseArgs};
use lzseq::config;
use lzseq::decoder::Decoder;
use lzseq::seq::Block;
use lzseq::Parser as LzParser;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let filter = log_filter(cli.verbose, cli.quiet);
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match cli.command {
        Command::Parse(args) => {
            let (blocks, total) = parse_file(&args)?;
            let sequences: usize = blocks.iter().map(|b| b.sequences.len()).sum();
            let literal_bytes: usize = blocks.iter().map(|b| b.literals.len()).sum();
            let match_bytes: usize =
                blocks.iter().flat_map(|b| b.sequences.iter()).map(|s| s.match_len as usize).sum();
            let encoded_bytes = literal_bytes + sequences * std::mem::size_of::<lzseq::Seq>();
            let ratio = if total == 0 { 0.0 } else { encoded_bytes as f64 / total as f64 };
            println!(
                "{total} bytes -> {} block(s), {sequences} sequence(s), {literal_bytes} literal byte(s), {match_bytes} matched byte(s), ratio {ratio:.3}",
                blocks.len(),
            );
            Ok(())
        }
        Command::Roundtrip(args) => run_roundtrip(&args),
    }
}

fn load_input(args: &ParseArgs) -> Result<Vec<u8>> {
    let mut f = File::open(&args.input).with_context(|| format!("opening {}", args.input.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf).with_context(|| format!("reading {}", args.input.display()))?;
    Ok(buf)
}

/// Feed the whole input through a freshly built parser, draining it one
/// block at a time until the buffer reports empty.
fn parse_file(args: &ParseArgs) -> Result<(Vec<Block>, usize)> {
    let data = load_input(args)?;
    let mut cfg = args.to_parser_config();
    cfg.set_defaults();
    let mut parser = config::build(cfg).context("building parser from configuration")?;

    parser.write(&data).context("writing input into the parser's buffer")?;

    let mut blocks = Vec::new();
    loop {
        let mut block = Block::new();
        match parser.parse(Some(&mut block), 0) {
            Ok(_) => blocks.push(block),
            Err(lzseq::ParseError::EmptyBuffer) => break,
        }
    }
    info!("parsed {} bytes into {} block(s)", data.len(), blocks.len());
    Ok((blocks, data.len()))
}

fn run_roundtrip(args: &ParseArgs) -> Result<()> {
    let data = load_input(args)?;
    let mut cfg = args.to_parser_config();
    cfg.set_defaults();
    let window_size = cfg.window_size();

    let (blocks, total) = parse_file(args)?;

    let mut decoder = Decoder::new(window_size, window_size.saturating_mul(2).max(window_size));
    for block in &blocks {
        decoder.write_block(block).context("replaying block through decoder")?;
    }
    if decoder.unread() == data.as_slice() {
        println!("roundtrip OK: {} bytes, {} block(s)", total, blocks.len());
        Ok(())
    } else {
        bail!("roundtrip mismatch: decoded {} bytes, expected {}", decoder.unread().len(), total);
    }
}
