//! The run boundary. Every benchmark-variant run gets a fresh
//! [`TaintRuntime`]; whatever error ends a run is reported here and the suite
//! moves on to the next variant.

use std::fmt::Display;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::Context;
use termcolor::WriteColor;
use wasmtime::{Engine, Module};
use crate::bench::{BenchResult, Benchmark};
use crate::config::{BenchmarkConfig, SuiteConfig};
use crate::error::TaintError;
use crate::interop::run_main;
use crate::mode::{AnalysisMode, Variant};
use crate::report::{print_banner, print_outcome, Outcome};
use crate::runtime::TaintRuntime;
use crate::value::Scalar;

/// Tally of a suite run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub passed: usize,
    pub failed: usize,
}

pub struct Harness<'a> {
    config: &'a SuiteConfig,
    results_dir: Option<PathBuf>,
    /// Only run variants whose host side runs in this mode.
    mode: Option<AnalysisMode>,
    engine: Engine,
}
impl<'a> Harness<'a> {
    pub fn new(config: &'a SuiteConfig) -> Self {
        Self {
            config,
            results_dir: None,
            mode: None,
            engine: Engine::default(),
        }
    }
    pub fn results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }
    pub fn mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn run<W: WriteColor>(&self, mut out: W) -> anyhow::Result<Summary> {
        let mut summary = Summary::default();
        for bench in self.config.benchmarks.iter() {
            let benchmark = bench.benchmark()?;
            print_banner(&mut out, &benchmark.to_string())?;

            for variant in self.selected(self.config.javascript.variants()) {
                let outcome_file = self.results_file(benchmark, "js", &variant)?;
                self.run_variant(&mut out, &mut summary, bench, &variant, outcome_file, || {
                    let mut runtime = TaintRuntime::new(variant.analysis_mode());
                    Ok(benchmark.run(&mut runtime, bench.input)?)
                })?;
            }

            let module_variants = (
                self.selected(self.config.webassembly.variants()),
                self.selected(self.config.javascript_webassembly.variants()),
            );
            if module_variants.0.is_empty() && module_variants.1.is_empty() {
                continue;
            }
            let Some(path) = bench.module.as_deref() else {
                tracing::warn!(benchmark = %benchmark, "no module configured; skipping webassembly variants");
                continue;
            };
            let module = Module::from_file(&self.engine, path).with_context(|| format!("could not load module `{}`", path.display()))?;
            for variant in module_variants.0 {
                let file = self.results_file(benchmark, "rs", &variant)?;
                self.run_variant(&mut out, &mut summary, bench, &variant, file, || {
                    Ok(main_result(run_main(&self.engine, &module, variant, bench.input)?.value))
                })?;
            }
            for variant in module_variants.1 {
                let file = self.results_file(benchmark, "js-rs", &variant)?;
                self.run_variant(&mut out, &mut summary, bench, &variant, file, || {
                    Ok(main_result(run_main(&self.engine, &module, variant, bench.input)?.value))
                })?;
            }
        }
        Ok(summary)
    }

    fn selected<V: Variant>(&self, variants: Vec<V>) -> Vec<V> {
        match self.mode {
            Some(mode) => variants.into_iter().filter(|v| v.analysis_mode() == mode).collect(),
            None => variants,
        }
    }

    /// `<results_dir>/<benchmark>/<family>/results-<variant>.txt`, emptied.
    fn results_file(&self, benchmark: Benchmark, family: &str, variant: &dyn Display) -> anyhow::Result<Option<PathBuf>> {
        let Some(dir) = &self.results_dir else {
            return Ok(None);
        };
        let dir = dir.join(benchmark.to_string()).join(family);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("results-{variant}.txt"));
        fs::write(&path, "")?;
        Ok(Some(path))
    }

    fn run_variant<W: WriteColor>(
        &self,
        mut out: W,
        summary: &mut Summary,
        bench: &BenchmarkConfig,
        variant: &dyn Display,
        results_file: Option<PathBuf>,
        mut run: impl FnMut() -> anyhow::Result<BenchResult>,
    ) -> anyhow::Result<()> {
        let expected = bench.expected_result();
        for iteration in 0..bench.iterations.max(1) {
            let start = Instant::now();
            let outcome = match run() {
                Ok(result) => Outcome::Finished {
                    result,
                    expected,
                    elapsed: start.elapsed(),
                },
                Err(e) => {
                    match e.downcast_ref::<TaintError>() {
                        Some(taint) => tracing::error!(%variant, iteration, error = %taint, "taint error ended the run"),
                        None => tracing::error!(%variant, iteration, error = %e, "run failed"),
                    }
                    Outcome::Failed { error: format!("{e:#}") }
                }
            };
            print_outcome(&mut out, 1, variant, &outcome)?;
            if let (Some(path), Outcome::Finished { elapsed, .. }) = (&results_file, &outcome) {
                append_time(path, elapsed.as_secs_f64() * 1000.0)?;
            }
            if outcome.passed() {
                summary.passed += 1;
            } else {
                summary.failed += 1;
                // later iterations would fail the same way
                break;
            }
        }
        Ok(())
    }
}

fn main_result(value: Scalar) -> BenchResult {
    match value {
        Scalar::I32(v) => BenchResult::Int(v.into()),
        Scalar::I64(v) => BenchResult::Int(v),
        Scalar::F32(v) => BenchResult::Float(v.into()),
        Scalar::F64(v) => BenchResult::Float(v),
    }
}

fn append_time(path: &Path, millis: f64) -> anyhow::Result<()> {
    let mut file = OpenOptions::new().append(true).create(true).open(path)?;
    writeln!(file, "{millis}")?;
    Ok(())
}

/// Runs `config` with [`Harness`], writing timings under `results_dir` when given.
pub fn run_suite<W: WriteColor>(out: W, config: &SuiteConfig, results_dir: Option<&Path>) -> anyhow::Result<Summary> {
    let mut harness = Harness::new(config);
    if let Some(dir) = results_dir {
        harness = harness.results_dir(dir);
    }
    harness.run(out)
}
