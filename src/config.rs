use std::path::{Path, PathBuf};
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use crate::bench::{BenchResult, Benchmark};
use crate::mode::{InteropVariant, JsVariant, WasmVariant};

/// Which benchmarks to run and which variants of each.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteConfig {
    pub benchmarks: Vec<BenchmarkConfig>,
    pub javascript: JsConfig,
    pub webassembly: WasmConfig,
    pub javascript_webassembly: InteropConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub name: String,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    pub input: i32,
    /// Overrides the known result; without it only the default input is checked.
    #[serde(default)]
    pub expected: Option<BenchResult>,
    /// Compiled module exporting `main(input)`, for the webassembly and
    /// interop variants.
    #[serde(default)]
    pub module: Option<PathBuf>,
}
fn default_iterations() -> u32 {
    1
}
impl BenchmarkConfig {
    pub fn new(benchmark: Benchmark, iterations: u32, input: i32) -> Self {
        Self {
            name: benchmark.to_string(),
            iterations,
            input,
            expected: None,
            module: None,
        }
    }
    pub fn benchmark(&self) -> anyhow::Result<Benchmark> {
        self.name.parse().map_err(|e: String| anyhow!(e))
    }
    /// Result the run has to reproduce, if one is known for this input.
    pub fn expected_result(&self) -> Option<BenchResult> {
        if self.expected.is_some() {
            return self.expected;
        }
        let benchmark = self.benchmark().ok()?;
        (benchmark.default_input() == self.input).then(|| benchmark.expected_result())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JsConfig {
    pub enabled: bool,
    pub baseline_enabled: bool,
    pub forward_enabled: bool,
    pub linvail_enabled: bool,
    pub taint_enabled: bool,
}
impl Default for JsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            baseline_enabled: true,
            forward_enabled: true,
            linvail_enabled: true,
            taint_enabled: true,
        }
    }
}
impl JsConfig {
    pub fn variants(&self) -> Vec<JsVariant> {
        if !self.enabled {
            return vec![];
        }
        [
            (self.baseline_enabled, JsVariant::NotInstrumented),
            (self.forward_enabled, JsVariant::InstrumentedForwardAnalysis),
            (self.linvail_enabled, JsVariant::InstrumentedLinvail),
            (self.taint_enabled, JsVariant::InstrumentedTaintAnalysis),
        ]
        .into_iter()
        .filter_map(|(on, v)| on.then_some(v))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasmConfig {
    pub enabled: bool,
    pub baseline_enabled: bool,
    pub forward_enabled: bool,
    pub shadow_enabled: bool,
    pub taint_enabled: bool,
}
impl Default for WasmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            baseline_enabled: true,
            forward_enabled: true,
            shadow_enabled: true,
            taint_enabled: true,
        }
    }
}
impl WasmConfig {
    pub fn variants(&self) -> Vec<WasmVariant> {
        if !self.enabled {
            return vec![];
        }
        [
            (self.baseline_enabled, WasmVariant::NotInstrumented),
            (self.forward_enabled, WasmVariant::InstrumentedForwardAnalysis),
            (self.shadow_enabled, WasmVariant::InstrumentedShadowExecutionAnalysis),
            (self.taint_enabled, WasmVariant::InstrumentedTaintAnalysis),
        ]
        .into_iter()
        .filter_map(|(on, v)| on.then_some(v))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteropConfig {
    pub enabled: bool,
    pub baseline_enabled: bool,
    pub forward_enabled: bool,
    /// Covers the `-js`, `-wasm` and `-both` taint variants.
    pub taint_enabled: bool,
}
impl Default for InteropConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            baseline_enabled: false,
            forward_enabled: false,
            taint_enabled: true,
        }
    }
}
impl InteropConfig {
    pub fn variants(&self) -> Vec<InteropVariant> {
        if !self.enabled {
            return vec![];
        }
        let mut variants = vec![];
        if self.baseline_enabled {
            variants.push(InteropVariant::NotInstrumented);
        }
        if self.forward_enabled {
            variants.push(InteropVariant::InstrumentedForwardAnalysis);
        }
        if self.taint_enabled {
            variants.extend([
                InteropVariant::InstrumentedTaintAnalysisJs,
                InteropVariant::InstrumentedTaintAnalysisWasm,
                InteropVariant::InstrumentedTaintAnalysisBoth,
            ]);
        }
        variants
    }
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            benchmarks: vec![
                BenchmarkConfig::new(Benchmark::BinaryTrees, 2, 15),
                BenchmarkConfig::new(Benchmark::Mandelbrot, 1, 400),
                BenchmarkConfig::new(Benchmark::FannkuchRedux, 2, 10),
                BenchmarkConfig::new(Benchmark::SpectralNorm, 2, 100),
                BenchmarkConfig::new(Benchmark::NBody, 1, 2000000),
            ],
            javascript: JsConfig::default(),
            webassembly: WasmConfig::default(),
            javascript_webassembly: InteropConfig::default(),
        }
    }
}
impl SuiteConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path).with_context(|| format!("could not read config `{}`", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("invalid config `{}`", path.display()))
    }

    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        let config: SuiteConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Every benchmark must name a program this crate can run with its input.
    pub fn validate(&self) -> anyhow::Result<()> {
        for bench in self.benchmarks.iter() {
            if bench.benchmark()? == Benchmark::SpectralNorm && bench.input % 2 != 0 {
                anyhow::bail!("spectral-norm works on pairs of rows; input {} is odd", bench.input);
            }
        }
        Ok(())
    }

    /// Keeps only the benchmarks named in `names` (all of them when empty).
    pub fn retain_benchmarks(&mut self, names: &[String]) {
        if !names.is_empty() {
            self.benchmarks.retain(|b| names.contains(&b.name));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config = SuiteConfig::from_toml(
            r#"
            [[benchmarks]]
            name = "fannkuch-redux"
            input = 7

            [javascript]
            linvail_enabled = false
            "#,
        )
        .unwrap();
        assert_eq!(config.benchmarks.len(), 1);
        assert_eq!(config.benchmarks[0].iterations, 1);
        assert_eq!(config.benchmarks[0].expected_result(), None);
        assert_eq!(
            config.javascript.variants(),
            vec![
                JsVariant::NotInstrumented,
                JsVariant::InstrumentedForwardAnalysis,
                JsVariant::InstrumentedTaintAnalysis
            ]
        );
        assert!(config.webassembly.variants().is_empty());
    }

    #[test]
    fn unknown_benchmarks_are_rejected() {
        let err = SuiteConfig::from_toml("[[benchmarks]]\nname = \"k-nucleotide\"\ninput = 0\n").unwrap_err();
        assert!(err.to_string().contains("k-nucleotide"));
    }

    #[test]
    fn defaults_know_their_results() {
        let config = SuiteConfig::default();
        let expected: Vec<_> = config.benchmarks.iter().map(|b| b.expected_result()).collect();
        assert_eq!(
            expected,
            vec![
                Some(BenchResult::Int(6444382)),
                Some(BenchResult::Int(20213330)),
                Some(BenchResult::Int(38)),
                Some(BenchResult::Float(1.2742199912349306)),
                Some(BenchResult::Float(-0.16902646009754382)),
            ]
        );
    }

    #[test]
    fn expected_results_can_be_floats() {
        let config = SuiteConfig::from_toml(
            r#"
            [[benchmarks]]
            name = "n-body"
            input = 1000
            expected = -0.16908762655036896

            [[benchmarks]]
            name = "fasta"
            input = 10
            expected = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.benchmarks[0].expected_result(), Some(BenchResult::Float(-0.16908762655036896)));
        assert_eq!(config.benchmarks[1].expected_result(), Some(BenchResult::Int(0)));
    }

    #[test]
    fn odd_spectral_norm_input_is_rejected() {
        let err = SuiteConfig::from_toml("[[benchmarks]]\nname = \"spectral-norm\"\ninput = 11\n").unwrap_err();
        assert!(err.to_string().contains("odd"));
    }
}
