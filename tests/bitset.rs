//! Broader coverage for `Bitset`/`SmallIntSet` beyond the fixed-case unit
//! tests inside `bitset.rs`: randomized insert/remove sequences cross-checked
//! against a plain `Vec<bool>`/`BTreeSet<u32>` oracle.

use lzseq::bitset::{Bitset, SmallIntSet};
use std::collections::BTreeSet;

struct Lcg(u64);

impl Lcg {
    fn next_usize(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((self.0 >> 33) as usize) % bound
    }
}

#[test]
fn bitset_matches_bool_vec_oracle_under_random_ops() {
    let len = 300;
    let mut bs = Bitset::new(len);
    let mut oracle = vec![false; len];
    let mut rng = Lcg(0x5EED_1234);

    for _ in 0..2000 {
        let i = rng.next_usize(len);
        if rng.next_usize(2) == 0 {
            bs.insert(i);
            oracle[i] = true;
        } else {
            bs.remove(i);
            oracle[i] = false;
        }
        assert_eq!(bs.contains(i), oracle[i]);
    }

    let expected_count = oracle.iter().filter(|&&b| b).count();
    assert_eq!(bs.count(), expected_count);

    for from in [0, 1, len / 2, len - 1, len] {
        let expected = oracle.iter().enumerate().skip(from.min(len)).find(|(_, &b)| b).map(|(i, _)| i);
        assert_eq!(bs.member_after(from), expected, "member_after({from})");
    }
}

#[test]
fn bitset_member_after_singleton_round_trips() {
    let mut b = Bitset::new(64);
    b.insert(5);
    assert_eq!(b.member_after(0), Some(5));
    assert_eq!(b.member_after(5), Some(5));
    assert_eq!(b.member_after(6), None);
}

#[test]
fn bitset_clear_empties_every_word() {
    let mut b = Bitset::new(128);
    for i in (0..128).step_by(3) {
        b.insert(i);
    }
    assert!(b.count() > 0);
    b.clear();
    assert_eq!(b.count(), 0);
    assert_eq!(b.member_after(0), None);
}

#[test]
fn small_int_set_matches_btreeset_oracle() {
    let mut set = SmallIntSet::new();
    let mut oracle: BTreeSet<u32> = BTreeSet::new();
    let mut rng = Lcg(0xC0FFEE);

    for _ in 0..500 {
        let v = rng.next_usize(64) as u32;
        match rng.next_usize(3) {
            0 => {
                set.insert(v);
                oracle.insert(v);
            }
            1 => {
                assert_eq!(set.remove(v), oracle.remove(&v));
            }
            _ => {
                assert_eq!(set.contains(v), oracle.contains(&v));
            }
        }
    }

    let got: Vec<u32> = set.iter().collect();
    let expected: Vec<u32> = oracle.into_iter().collect();
    assert_eq!(got, expected);
}

#[test]
fn small_int_set_retain_matches_filter() {
    let mut set = SmallIntSet::new();
    for v in 0..30u32 {
        set.insert(v);
    }
    set.retain(|v| v % 3 == 0);
    let got: Vec<u32> = set.iter().collect();
    let expected: Vec<u32> = (0..30u32).filter(|v| v % 3 == 0).collect();
    assert_eq!(got, expected);
}
