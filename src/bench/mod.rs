//! Taint-annotated benchmark programs. They only consume the runtime: values
//! are sourced, asserted and sanitized at the same points as the benchmark
//! suite they come from.

use std::fmt::{Display, Formatter};
use std::str::FromStr;
use serde::{Deserialize, Serialize};
use crate::error::TaintError;
use crate::runtime::TaintRuntime;

pub mod binary_trees;
pub mod fannkuch_redux;
pub mod fasta;
pub mod mandelbrot;
pub mod n_body;
pub mod pi_digits;
pub mod reverse_complement;
pub mod spectral_norm;

/// The value a benchmark run produces: a checksum or a float quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BenchResult {
    Int(i64),
    Float(f64),
}
impl BenchResult {
    /// Integers must match exactly; floats within a relative `1e-12`.
    pub fn matches(&self, expected: &BenchResult) -> bool {
        match (*self, *expected) {
            (BenchResult::Int(a), BenchResult::Int(b)) => a == b,
            (a, b) => {
                let (a, b) = (a.as_f64(), b.as_f64());
                a == b || (a - b).abs() <= 1e-12 * a.abs().max(b.abs())
            }
        }
    }
    pub fn as_f64(&self) -> f64 {
        match *self {
            BenchResult::Int(v) => v as f64,
            BenchResult::Float(v) => v,
        }
    }
}
impl From<i64> for BenchResult {
    fn from(v: i64) -> Self {
        BenchResult::Int(v)
    }
}
impl From<f64> for BenchResult {
    fn from(v: f64) -> Self {
        BenchResult::Float(v)
    }
}
impl Display for BenchResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchResult::Int(v) => write!(f, "{v}"),
            BenchResult::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Benchmark {
    BinaryTrees,
    Mandelbrot,
    FannkuchRedux,
    PiDigits,
    SpectralNorm,
    NBody,
    Fasta,
    ReverseComplement,
}
impl Benchmark {
    pub const ALL: [Benchmark; 8] = [
        Benchmark::BinaryTrees,
        Benchmark::Mandelbrot,
        Benchmark::FannkuchRedux,
        Benchmark::PiDigits,
        Benchmark::SpectralNorm,
        Benchmark::NBody,
        Benchmark::Fasta,
        Benchmark::ReverseComplement,
    ];

    /// Input the expected result belongs to.
    pub fn default_input(&self) -> i32 {
        match self {
            Benchmark::BinaryTrees => 15,
            Benchmark::Mandelbrot => 400,
            Benchmark::FannkuchRedux => 10,
            Benchmark::PiDigits => 1000,
            Benchmark::SpectralNorm => 100,
            Benchmark::NBody => 2000000,
            Benchmark::Fasta => 1000,
            Benchmark::ReverseComplement => 1000,
        }
    }
    pub fn expected_result(&self) -> BenchResult {
        match self {
            Benchmark::BinaryTrees => BenchResult::Int(6444382),
            Benchmark::Mandelbrot => BenchResult::Int(20213330),
            Benchmark::FannkuchRedux => BenchResult::Int(38),
            Benchmark::PiDigits => BenchResult::Int(0),
            Benchmark::SpectralNorm => BenchResult::Float(1.2742199912349306),
            Benchmark::NBody => BenchResult::Float(-0.16902646009754382),
            Benchmark::Fasta => BenchResult::Int(0),
            Benchmark::ReverseComplement => BenchResult::Int(0),
        }
    }

    /// Runs the host-side program once against `runtime`.
    pub fn run(&self, runtime: &mut TaintRuntime, input: i32) -> Result<BenchResult, TaintError> {
        let store = &mut runtime.host;
        Ok(match self {
            Benchmark::BinaryTrees => binary_trees::benchmark(store, input)?.into(),
            Benchmark::Mandelbrot => mandelbrot::benchmark(store, input)?.into(),
            Benchmark::FannkuchRedux => fannkuch_redux::benchmark(store, input)?.into(),
            Benchmark::PiDigits => pi_digits::benchmark(store, input)?.into(),
            Benchmark::SpectralNorm => spectral_norm::benchmark(store, input)?.into(),
            Benchmark::NBody => n_body::benchmark(store, input)?.into(),
            Benchmark::Fasta => fasta::benchmark(store, input)?.into(),
            Benchmark::ReverseComplement => reverse_complement::benchmark(store, input)?.into(),
        })
    }
}
impl Display for Benchmark {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Benchmark::BinaryTrees => "binary-trees",
                Benchmark::Mandelbrot => "mandelbrot",
                Benchmark::FannkuchRedux => "fannkuch-redux",
                Benchmark::PiDigits => "pi-digits",
                Benchmark::SpectralNorm => "spectral-norm",
                Benchmark::NBody => "n-body",
                Benchmark::Fasta => "fasta",
                Benchmark::ReverseComplement => "reverse-complement",
            }
        )
    }
}
impl FromStr for Benchmark {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Benchmark::ALL
            .into_iter()
            .find(|b| b.to_string() == s)
            .ok_or_else(|| format!("Unknown benchmark: {}", s))
    }
}
