use std::io;
use std::time::Duration;
use termcolor::{Color, ColorSpec, WriteColor};
use crate::bench::BenchResult;
use crate::mode::{InteropVariant, JsVariant, Variant, WasmVariant};

const SPACE_PER_TAB: usize = 4;

/// How one benchmark-variant run ended.
#[derive(Debug)]
pub enum Outcome {
    /// Finished; `expected` is what the result had to be, when known.
    Finished {
        result: BenchResult,
        expected: Option<BenchResult>,
        elapsed: Duration,
    },
    /// Aborted by a taint error or a failure in the module plumbing.
    Failed { error: String },
}
impl Outcome {
    pub fn passed(&self) -> bool {
        match self {
            Outcome::Finished { result, expected, .. } => expected.map_or(true, |e| result.matches(&e)),
            Outcome::Failed { .. } => false,
        }
    }
}

pub fn print_banner<W: WriteColor>(mut out: W, title: &str) -> io::Result<()> {
    let title = format!("==== {} ====", title.to_uppercase());
    writeln!(out, "{}", "=".repeat(title.len()))?;
    writeln!(out, "{title}")?;
    writeln!(out, "{}", "=".repeat(title.len()))
}

pub fn print_outcome<W: WriteColor>(mut out: W, tabs: i32, variant: &dyn std::fmt::Display, outcome: &Outcome) -> io::Result<()> {
    write!(out, "{}", tab(tabs))?;
    magenta_italics(&mut out, false, &variant.to_string())?;
    write!(out, ": ")?;
    match outcome {
        Outcome::Finished { result, expected, elapsed } => {
            if outcome.passed() {
                green(&mut out, true, "ok")?;
            } else {
                red(&mut out, true, "MISMATCH")?;
            }
            write!(out, " result={result}")?;
            if let Some(expected) = expected {
                write!(out, " expected={expected}")?;
            }
            blue(&mut out, false, &format!(" ({} ms)", elapsed.as_millis()))?;
        }
        Outcome::Failed { error } => {
            red(&mut out, true, "FAILED")?;
            write!(out, " {error}")?;
        }
    }
    writeln!(out)
}

fn print_family<W: WriteColor, V: Variant>(mut out: W, name: &str, variants: &[V]) -> io::Result<()> {
    blue(&mut out, true, name)?;
    writeln!(out)?;
    for variant in variants {
        write!(out, "{}{variant} -> ", tab(1))?;
        green(&mut out, false, &variant.analysis_mode().to_string())?;
        if variant.requires_taint_imports() {
            write!(out, " (taint imports)")?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Lists every variant family with the analysis mode each variant runs in.
pub fn print_variants<W: WriteColor>(mut out: W) -> io::Result<()> {
    print_banner(&mut out, "variants")?;
    print_family(&mut out, "javascript", &JsVariant::ALL)?;
    print_family(&mut out, "webassembly", &WasmVariant::ALL)?;
    print_family(&mut out, "javascript_webassembly", &InteropVariant::ALL)
}

// ===========================
// = Terminal Printing Logic =
// ===========================

pub fn color<W: WriteColor>(mut out: W, s: &str, bold: bool, italics: bool, c: Color) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(c)).set_bold(bold).set_italic(italics))?;
    write!(out, "{}", s)?;
    out.set_color(&ColorSpec::default())
}
pub fn blue<W: WriteColor>(out: W, bold: bool, s: &str) -> io::Result<()> {
    color(out, s, bold, false, Color::Blue)
}
pub fn green<W: WriteColor>(out: W, bold: bool, s: &str) -> io::Result<()> {
    color(out, s, bold, false, Color::Green)
}
pub fn magenta_italics<W: WriteColor>(out: W, bold: bool, s: &str) -> io::Result<()> {
    color(out, s, bold, true, Color::Magenta)
}
pub fn red<W: WriteColor>(out: W, bold: bool, s: &str) -> io::Result<()> {
    color(out, s, bold, false, Color::Red)
}
pub fn tab(tab: i32) -> String {
    " ".repeat(SPACE_PER_TAB * tab as usize)
}
