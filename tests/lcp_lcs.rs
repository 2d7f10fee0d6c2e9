//! Cross-checks `lcp`/`lcs` against naive reference scans over inputs wider
//! than the fixed cases and small fuzz already covered inside `bytes.rs`'s
//! own unit tests: boundary lengths around the 8-byte and 4-byte word steps,
//! and slices whose start addresses are deliberately unaligned.

use lzseq::bytes::{lcp, lcs};

fn naive_lcp(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

fn naive_lcs(a: &[u8], b: &[u8]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}

#[test]
fn lcp_matches_naive_at_every_word_boundary() {
    for len in 0..=40usize {
        for mismatch_at in 0..=len {
            let mut a = vec![1u8; len];
            let mut b = vec![1u8; len];
            if mismatch_at < len {
                b[mismatch_at] = 2;
            }
            assert_eq!(lcp(&a, &b), naive_lcp(&a, &b), "len={len} mismatch_at={mismatch_at}");
            assert_eq!(lcp(&b, &a), naive_lcp(&b, &a));
            a.truncate(len);
        }
    }
}

#[test]
fn lcs_matches_naive_at_every_word_boundary() {
    for len in 0..=40usize {
        for mismatch_at in 0..=len {
            let mut a = vec![7u8; len];
            let mut b = vec![7u8; len];
            if mismatch_at < len {
                // mismatch_at counted from the tail
                let idx = len - 1 - mismatch_at;
                b[idx] = 9;
            }
            assert_eq!(lcs(&a, &b), naive_lcs(&a, &b), "len={len} mismatch_at={mismatch_at}");
            assert_eq!(lcs(&b, &a), naive_lcs(&b, &a));
        }
    }
}

#[test]
fn lcp_on_unaligned_slices() {
    let data_a: Vec<u8> = (0..64u16).map(|i| (i % 251) as u8).collect();
    let mut data_b = data_a.clone();
    data_b[50] = 0xFF;
    for offset in 0..9usize {
        let a = &data_a[offset..];
        let b = &data_b[offset..];
        assert_eq!(lcp(a, b), naive_lcp(a, b), "offset={offset}");
    }
}

#[test]
fn lcp_and_lcs_agree_on_fully_identical_slices() {
    let data = b"the quick brown fox jumps over the lazy dog";
    assert_eq!(lcp(data, data), data.len());
    assert_eq!(lcs(data, data), data.len());
}

#[test]
fn lcp_and_lcs_are_zero_on_immediate_mismatch() {
    assert_eq!(lcp(b"abc", b"xbc"), 0);
    assert_eq!(lcs(b"abc", b"abx"), 0);
}
