//! Round-trip property: every parser variant, fed through `config::build`,
//! reproduces its input exactly after a full parse-then-decode cycle. This
//! is the general property; `scenarios.rs` pins the six specific numbered
//! cases instead.

use lzseq::config::{BdhpConfig, BhpConfig, BupConfig, Common, GreedyConfig, OptimizerConfig};
use lzseq::decoder::Decoder;
use lzseq::seq::Block;
use lzseq::{build_parser, ParseError, Parser, ParserConfig};

fn common(window_size: u32) -> Common {
    Common { window_size, block_size: 4096, ..Common::default() }
}

fn variants(window_size: u32) -> Vec<ParserConfig> {
    vec![
        ParserConfig::Greedy(GreedyConfig { common: common(window_size), input_len: 0, hash_bits: 0 }),
        ParserConfig::Bhp(BhpConfig { common: common(window_size), input_len: 0, hash_bits: 0 }),
        ParserConfig::Bdhp(BdhpConfig { common: common(window_size), ..BdhpConfig::default() }),
        ParserConfig::Bup(BupConfig { common: common(window_size), input_len: 0, hash_bits: 0, bucket_size: 0 }),
        ParserConfig::Optimizer(OptimizerConfig { common: common(window_size), input_len: 0, hash_bits: 0 }),
    ]
}

fn round_trip(cfg: ParserConfig, input: &[u8]) -> Vec<u8> {
    let window_size = {
        let mut c = cfg;
        c.set_defaults();
        c.window_size()
    };
    let mut parser = build_parser(cfg).unwrap();
    parser.write(input).unwrap();

    let mut decoder = Decoder::new(window_size, window_size.saturating_mul(2).max(window_size));
    loop {
        let mut block = Block::new();
        match parser.parse(Some(&mut block), 0) {
            Ok(_) => decoder.write_block(&block).unwrap(),
            Err(ParseError::EmptyBuffer) => break,
        }
    }
    decoder.unread().to_vec()
}

fn sample_inputs() -> Vec<Vec<u8>> {
    let mut rng_state: u64 = 0x9E37_79B9_7F4A_7C15;
    let mut next_byte = || {
        rng_state = rng_state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (rng_state >> 33) as u8
    };

    vec![
        Vec::new(),
        b"x".to_vec(),
        b"abababababababababab".to_vec(),
        b"the quick brown fox jumps over the lazy dog".repeat(10),
        (0..2000).map(|_| next_byte()).collect(),
        b"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".to_vec(),
    ]
}

#[test]
fn every_variant_round_trips_every_sample_input() {
    for input in sample_inputs() {
        for cfg in variants(4096) {
            let out = round_trip(cfg, &input);
            assert_eq!(out, input, "round trip mismatch for input len={}", input.len());
        }
    }
}

#[test]
fn no_trailing_literals_flag_still_round_trips_when_rewound_bytes_are_reparsed() {
    let input = b"foobarfoobarfoobarXYZ".repeat(5);
    let common = Common { window_size: 4096, block_size: 4096, ..Common::default() };
    let cfg = ParserConfig::Bhp(BhpConfig { common, input_len: 0, hash_bits: 0 });
    let window_size = {
        let mut c = cfg;
        c.set_defaults();
        c.window_size()
    };
    let mut parser = build_parser(cfg).unwrap();
    parser.write(&input).unwrap();

    let mut decoder = Decoder::new(window_size, window_size.saturating_mul(2).max(window_size));
    loop {
        let mut block = Block::new();
        match parser.parse(Some(&mut block), lzseq::NO_TRAILING_LITERALS) {
            Ok(0) => break,
            Ok(_) => decoder.write_block(&block).unwrap(),
            Err(ParseError::EmptyBuffer) => break,
        }
    }
    assert_eq!(decoder.unread(), input.as_slice());
}
