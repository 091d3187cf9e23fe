use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Which analysis an instrumented artifact was built for.
///
/// Chosen when the program is instrumented, never switched while it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnalysisMode {
    NoAnalysis,
    ForwardAnalysis,
    /// Module side only.
    ShadowExecutionAnalysis,
    /// Host side only.
    LinvailAnalysis,
    TaintAnalysis,
}
impl AnalysisMode {
    pub const ALL: [AnalysisMode; 5] = [
        AnalysisMode::NoAnalysis,
        AnalysisMode::ForwardAnalysis,
        AnalysisMode::ShadowExecutionAnalysis,
        AnalysisMode::LinvailAnalysis,
        AnalysisMode::TaintAnalysis,
    ];

    /// Whether the host-value store is live in this mode.
    pub fn tracks_host_values(&self) -> bool {
        matches!(self, AnalysisMode::LinvailAnalysis | AnalysisMode::TaintAnalysis)
    }
    /// Whether the shadow memory and the taint channel are live in this mode.
    pub fn tracks_linear_memory(&self) -> bool {
        matches!(self, AnalysisMode::ShadowExecutionAnalysis | AnalysisMode::TaintAnalysis)
    }
}
impl Display for AnalysisMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                AnalysisMode::NoAnalysis => "NO_ANALYSIS",
                AnalysisMode::ForwardAnalysis => "FORWARD_ANALYSIS",
                AnalysisMode::ShadowExecutionAnalysis => "SHADOW_EXECUTION_ANALYSIS",
                AnalysisMode::LinvailAnalysis => "LINVAIL_ANALYSIS",
                AnalysisMode::TaintAnalysis => "TAINT_ANALYSIS",
            }
        )
    }
}
impl FromStr for AnalysisMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "NO_ANALYSIS" => Ok(AnalysisMode::NoAnalysis),
            "FORWARD_ANALYSIS" => Ok(AnalysisMode::ForwardAnalysis),
            "SHADOW_EXECUTION_ANALYSIS" => Ok(AnalysisMode::ShadowExecutionAnalysis),
            "LINVAIL_ANALYSIS" => Ok(AnalysisMode::LinvailAnalysis),
            "TAINT_ANALYSIS" => Ok(AnalysisMode::TaintAnalysis),
            _ => Err(format!("Unknown analysis mode: {}", s)),
        }
    }
}

// ==========================
// = Benchmark variant kinds =
// ==========================

/// Variants of a benchmark written for the host language only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsVariant {
    NotInstrumented,
    InstrumentedForwardAnalysis,
    InstrumentedLinvail,
    InstrumentedTaintAnalysis,
}

/// Variants of a benchmark compiled to a module only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WasmVariant {
    NotInstrumented,
    InstrumentedForwardAnalysis,
    InstrumentedShadowExecutionAnalysis,
    InstrumentedTaintAnalysis,
}

/// Variants of a benchmark where host code calls into a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteropVariant {
    NotInstrumented,
    InstrumentedForwardAnalysis,
    InstrumentedTaintAnalysisJs,
    InstrumentedTaintAnalysisWasm,
    InstrumentedTaintAnalysisBoth,
}

/// Shared surface of the three variant families.
pub trait Variant: Copy + Display {
    /// Mode the host-side runtime runs in.
    fn analysis_mode(&self) -> AnalysisMode;
    /// Whether a module built for this variant imports the `taint` family.
    fn requires_taint_imports(&self) -> bool;
}

impl JsVariant {
    pub const ALL: [JsVariant; 4] = [
        JsVariant::NotInstrumented,
        JsVariant::InstrumentedForwardAnalysis,
        JsVariant::InstrumentedLinvail,
        JsVariant::InstrumentedTaintAnalysis,
    ];
}
impl Variant for JsVariant {
    fn analysis_mode(&self) -> AnalysisMode {
        match self {
            JsVariant::NotInstrumented => AnalysisMode::NoAnalysis,
            JsVariant::InstrumentedForwardAnalysis => AnalysisMode::ForwardAnalysis,
            JsVariant::InstrumentedLinvail => AnalysisMode::LinvailAnalysis,
            JsVariant::InstrumentedTaintAnalysis => AnalysisMode::TaintAnalysis,
        }
    }
    fn requires_taint_imports(&self) -> bool {
        false
    }
}
impl Display for JsVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                JsVariant::NotInstrumented => "not-instrumented",
                JsVariant::InstrumentedForwardAnalysis => "instrumented-forward-analysis",
                JsVariant::InstrumentedLinvail => "instrumented-linvail",
                JsVariant::InstrumentedTaintAnalysis => "instrumented-taint-analysis",
            }
        )
    }
}
impl FromStr for JsVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JsVariant::ALL
            .into_iter()
            .find(|v| v.to_string() == s)
            .ok_or_else(|| format!("Unknown benchmark type: {}", s))
    }
}

impl WasmVariant {
    pub const ALL: [WasmVariant; 4] = [
        WasmVariant::NotInstrumented,
        WasmVariant::InstrumentedForwardAnalysis,
        WasmVariant::InstrumentedShadowExecutionAnalysis,
        WasmVariant::InstrumentedTaintAnalysis,
    ];
}
impl Variant for WasmVariant {
    fn analysis_mode(&self) -> AnalysisMode {
        match self {
            WasmVariant::NotInstrumented => AnalysisMode::NoAnalysis,
            WasmVariant::InstrumentedForwardAnalysis => AnalysisMode::ForwardAnalysis,
            WasmVariant::InstrumentedShadowExecutionAnalysis => AnalysisMode::ShadowExecutionAnalysis,
            WasmVariant::InstrumentedTaintAnalysis => AnalysisMode::TaintAnalysis,
        }
    }
    fn requires_taint_imports(&self) -> bool {
        !matches!(self, WasmVariant::NotInstrumented)
    }
}
impl Display for WasmVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                WasmVariant::NotInstrumented => "not-instrumented",
                WasmVariant::InstrumentedForwardAnalysis => "instrumented-forward-analysis",
                WasmVariant::InstrumentedShadowExecutionAnalysis => "instrumented-shadow-execution-analysis",
                WasmVariant::InstrumentedTaintAnalysis => "instrumented-taint-analysis",
            }
        )
    }
}
impl FromStr for WasmVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WasmVariant::ALL
            .into_iter()
            .find(|v| v.to_string() == s)
            .ok_or_else(|| format!("Unknown benchmark type: {}", s))
    }
}

impl InteropVariant {
    pub const ALL: [InteropVariant; 5] = [
        InteropVariant::NotInstrumented,
        InteropVariant::InstrumentedForwardAnalysis,
        InteropVariant::InstrumentedTaintAnalysisJs,
        InteropVariant::InstrumentedTaintAnalysisWasm,
        InteropVariant::InstrumentedTaintAnalysisBoth,
    ];
}
impl Variant for InteropVariant {
    fn analysis_mode(&self) -> AnalysisMode {
        match self {
            InteropVariant::NotInstrumented => AnalysisMode::NoAnalysis,
            InteropVariant::InstrumentedForwardAnalysis => AnalysisMode::ForwardAnalysis,
            InteropVariant::InstrumentedTaintAnalysisJs => AnalysisMode::TaintAnalysis,
            // the host side runs uninstrumented, only the module tracks taint
            InteropVariant::InstrumentedTaintAnalysisWasm => AnalysisMode::NoAnalysis,
            InteropVariant::InstrumentedTaintAnalysisBoth => AnalysisMode::TaintAnalysis,
        }
    }
    fn requires_taint_imports(&self) -> bool {
        !matches!(self, InteropVariant::NotInstrumented)
    }
}
impl Display for InteropVariant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                InteropVariant::NotInstrumented => "not-instrumented",
                InteropVariant::InstrumentedForwardAnalysis => "instrumented-forward-analysis",
                InteropVariant::InstrumentedTaintAnalysisJs => "instrumented-taint-analysis-js",
                InteropVariant::InstrumentedTaintAnalysisWasm => "instrumented-taint-analysis-wasm",
                InteropVariant::InstrumentedTaintAnalysisBoth => "instrumented-taint-analysis-both",
            }
        )
    }
}
impl FromStr for InteropVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InteropVariant::ALL
            .into_iter()
            .find(|v| v.to_string() == s)
            .ok_or_else(|| format!("Unknown benchmark type: {}", s))
    }
}
