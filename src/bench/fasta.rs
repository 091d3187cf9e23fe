//! fasta: generates DNA sequences by repeating a fixed sequence and by
//! weighted random selection. `g`/`t` (and `G`/`T` in the repeated sequence)
//! are sourced; every emitted character is checked against that rule.

use std::convert::Infallible;
use crate::error::TaintError;
use crate::host::{HostStore, Tracked};

pub const LINE_LENGTH: usize = 60;

const IM: i64 = 139968;
const IA: i64 = 3877;
const IC: i64 = 29573;

const ALU: &str = "GGCCGGGCGCGGTGGCTCACGCCTGTAATCCCAGCACTTTGG\
GAGGCCGAGGCGGGCGGATCACCTGAGGTCAGGAGTTCGAGA\
CCAGCCTGGCCAACATGGTGAAACCCCGTCTCTACTAAAAAT\
ACAAAAATTAGCCGGGCGTGGTGGCGCGCGCCTGTAATCCCA\
GCTACTCGGGAGGCTGAGGCAGGAGAATCGCTTGAACCCGGG\
AGGCGGAGGTTGCAGTGAGCCGAGATCGCGCCACTGCACTCC\
AGCCTGGGCGACAGAGCGAGACTCCGTCTCAAAAA";

/// Linear congruential generator of the benchmark.
#[derive(Debug, Clone, Copy)]
pub struct Random {
    last: Tracked<i64>,
}
impl Default for Random {
    fn default() -> Self {
        Self::new()
    }
}
impl Random {
    pub fn new() -> Self {
        Self::from_state(Tracked::new(42))
    }
    pub fn from_state(last: Tracked<i64>) -> Self {
        Self { last }
    }
    pub fn state(&self) -> Tracked<i64> {
        self.last
    }

    /// Next number in `[0, max)`.
    pub fn gen_random(&mut self, max: f64) -> Tracked<f64> {
        self.last = (self.last * IA + IC) % IM;
        self.last.map(|last| max * last as f64 / IM as f64)
    }
}

/// Binary search of a cumulative probability table for `r`.
///
/// `prob(i)` yields the cumulative probability of entry `i`. The chosen index
/// carries the taint of every comparison that led to it.
pub fn select_index<E>(
    r: Tracked<f64>,
    count: usize,
    mut prob: impl FnMut(usize) -> Result<Tracked<f64>, E>,
) -> Result<Tracked<usize>, E> {
    let first = r.less_than(&prob(0)?);
    if *first.value() || count < 2 {
        return Ok(first.map(|_| 0));
    }
    let mut decided = first.map(|_| ());
    let (mut lo, mut hi) = (0, count - 1);
    while hi > lo + 1 {
        let i = (hi + lo) / 2;
        let below = r.less_than(&prob(i)?);
        if *below.value() {
            hi = i;
        } else {
            lo = i;
        }
        decided = decided.zip_with(below, |_, _| ());
    }
    Ok(decided.map(|_| hi))
}

#[derive(Debug, Clone, Copy)]
pub struct AminoAcid {
    pub c: Tracked<char>,
    pub p: f64,
}

fn table(store: &mut HostStore, entries: &[(char, f64)]) -> Vec<AminoAcid> {
    let mut cp = 0.0;
    entries
        .iter()
        .map(|&(c, p)| {
            cp += p;
            let c = if c == 'g' || c == 't' { store.source_value(c) } else { Tracked::new(c) };
            AminoAcid { c, p: cp }
        })
        .collect()
}

/// The IUB ambiguity codes, cumulative.
pub fn iub(store: &mut HostStore) -> Vec<AminoAcid> {
    table(
        store,
        &[
            ('a', 0.27),
            ('c', 0.12),
            ('g', 0.12),
            ('t', 0.27),
            ('B', 0.02),
            ('D', 0.02),
            ('H', 0.02),
            ('K', 0.02),
            ('M', 0.02),
            ('N', 0.02),
            ('R', 0.02),
            ('S', 0.02),
            ('V', 0.02),
            ('W', 0.02),
            ('Y', 0.02),
        ],
    )
}

/// Homo sapiens nucleotide frequencies, cumulative.
pub fn homo_sapiens(store: &mut HostStore) -> Vec<AminoAcid> {
    table(
        store,
        &[('a', 0.302954942668), ('c', 0.1979883004921), ('g', 0.1975473066391), ('t', 0.3015094502008)],
    )
}

fn alu(store: &mut HostStore) -> Vec<Tracked<char>> {
    ALU.chars()
        .map(|c| if c == 'G' || c == 'T' { store.source_value(c) } else { Tracked::new(c) })
        .collect()
}

pub fn select_random(rng: &mut Random, genes: &[AminoAcid]) -> Tracked<char> {
    let r = rng.gen_random(1.0);
    let index = match select_index(r, genes.len(), |i| Ok::<_, Infallible>(Tracked::new(genes[i].p))) {
        Ok(index) => index,
        Err(never) => match never {},
    };
    genes[*index.value()].c.zip_with(index, |c, _| c)
}

pub fn is_sourced(c: char) -> bool {
    matches!(c, 'G' | 'T' | 'g' | 't')
}

/// Checks one output line and appends it, sanitized, to `out`.
fn write_fasta(store: &mut HostStore, line: &[Tracked<char>], out: &mut String) -> Result<(), TaintError> {
    for ch in line {
        if is_sourced(*ch.value()) {
            store.assert_is_tainted(ch)?;
        } else {
            store.assert_is_not_tainted(ch)?;
        }
        out.push(store.sanitize(*ch).into_inner());
    }
    out.push('\n');
    Ok(())
}

fn make_repeat_fasta(store: &mut HostStore, header: &str, seq: &[Tracked<char>], n: usize, out: &mut String) -> Result<(), TaintError> {
    out.push_str(header);
    out.push('\n');
    let mut k = 0;
    let mut todo = n;
    while todo > 0 {
        let m = todo.min(LINE_LENGTH);
        let line: Vec<_> = (0..m)
            .map(|_| {
                let ch = seq[k];
                k = (k + 1) % seq.len();
                ch
            })
            .collect();
        write_fasta(store, &line, out)?;
        todo -= m;
    }
    Ok(())
}

fn make_random_fasta(
    store: &mut HostStore,
    rng: &mut Random,
    header: &str,
    genes: &[AminoAcid],
    n: usize,
    out: &mut String,
) -> Result<(), TaintError> {
    out.push_str(header);
    out.push('\n');
    let mut todo = n;
    while todo > 0 {
        let m = todo.min(LINE_LENGTH);
        let line: Vec<_> = (0..m).map(|_| select_random(rng, genes)).collect();
        write_fasta(store, &line, out)?;
        todo -= m;
    }
    Ok(())
}

/// The three FASTA records for `n`: `2n` repeated, `3n` IUB and `5n` homo
/// sapiens characters.
pub fn fasta(store: &mut HostStore, n: usize) -> Result<String, TaintError> {
    let alu = alu(store);
    let iub = iub(store);
    let homo_sapiens = homo_sapiens(store);
    let mut rng = Random::new();
    let mut out = String::new();
    make_repeat_fasta(store, ">ONE Homo sapiens alu", &alu, n * 2, &mut out)?;
    make_random_fasta(store, &mut rng, ">TWO IUB ambiguity codes", &iub, n * 3, &mut out)?;
    make_random_fasta(store, &mut rng, ">THREE Homo sapiens frequency", &homo_sapiens, n * 5, &mut out)?;
    Ok(out)
}

pub fn benchmark(store: &mut HostStore, n: i32) -> Result<i64, TaintError> {
    let out = fasta(store, n.max(0) as usize)?;
    tracing::debug!(len = out.len(), "fasta produced its output");
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_matches_the_reference_sequence() {
        let mut rng = Random::new();
        let first = rng.gen_random(1.0);
        assert_eq!(*rng.state().value(), 52439);
        assert_eq!(*first.value(), 52439.0 / 139968.0);
        rng.gen_random(1.0);
        assert_eq!(*rng.state().value(), (52439 * IA + IC) % IM);
    }

    #[test]
    fn selection_follows_the_cumulative_table() {
        let mut store = HostStore::new();
        let genes = homo_sapiens(&mut store);
        let pick = |r: f64| {
            let index = select_index(Tracked::new(r), genes.len(), |i| Ok::<_, ()>(Tracked::new(genes[i].p))).unwrap();
            *index.value()
        };
        assert_eq!(pick(0.1), 0);
        assert_eq!(pick(0.4), 1);
        assert_eq!(pick(0.6), 2);
        assert_eq!(pick(0.99), 3);
    }

    #[test]
    fn tainted_draw_taints_the_choice() {
        let mut store = HostStore::new();
        let genes = homo_sapiens(&mut store);
        let r = store.source_value(0.4);
        let index = select_index(r, genes.len(), |i| Ok::<_, ()>(Tracked::new(genes[i].p))).unwrap();
        assert!(store.is_tainted(&index));
        // 'c' itself is clean; the tainted draw is what taints it
        let c = genes[*index.value()].c.zip_with(index, |c, _| c);
        assert_eq!(*c.value(), 'c');
        assert!(store.is_tainted(&c));
    }

    #[test]
    fn output_has_the_expected_shape() {
        let mut store = HostStore::new();
        let out = fasta(&mut store, 40).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], ">ONE Homo sapiens alu");
        assert_eq!(lines[1], &ALU[..LINE_LENGTH]);
        assert_eq!(lines[2], &ALU[LINE_LENGTH..80]);
        assert_eq!(lines[3], ">TWO IUB ambiguity codes");
        let bases: usize = lines.iter().filter(|l| !l.starts_with('>')).map(|l| l.len()).sum();
        assert_eq!(bases, 40 * (2 + 3 + 5));
    }
}
