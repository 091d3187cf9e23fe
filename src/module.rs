use std::fmt::{Display, Formatter};
use std::str::FromStr;
use crate::channel::{ChannelPort, TaintChannel};
use crate::error::{expect_taint, Expectation};
use crate::shadow::ShadowMemory;
use crate::value::{Scalar, ScalarType, TaintedScalar};

/// Name of the import namespace holding the scalar families.
pub const TAINT_NAMESPACE: &str = "taint";

/// One family of scalar imports; each exists once per [`ScalarType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportOp {
    Taint,
    Sanitize,
    AssertIsTainted,
    AssertIsNotTainted,
    CheckIsTainted,
}
impl ImportOp {
    pub const ALL: [ImportOp; 5] = [
        ImportOp::Taint,
        ImportOp::Sanitize,
        ImportOp::AssertIsTainted,
        ImportOp::AssertIsNotTainted,
        ImportOp::CheckIsTainted,
    ];

    /// e.g. `assert_is_tainted_f64`
    pub fn import_name(&self, ty: ScalarType) -> String {
        format!("{self}_{ty}")
    }

    /// Splits an import name back into its family and scalar type. Modules
    /// built from `char` values name them `_char`; those travel as `i32`.
    pub fn parse_import(name: &str) -> Option<(ImportOp, ScalarType)> {
        let (prefix, ty) = name.rsplit_once('_')?;
        let ty = match ty {
            "char" => ScalarType::I32,
            ty => ScalarType::ALL.into_iter().find(|t| t.to_string() == ty)?,
        };
        Some((prefix.parse().ok()?, ty))
    }
}
impl Display for ImportOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ImportOp::Taint => "taint",
                ImportOp::Sanitize => "sanitize",
                ImportOp::AssertIsTainted => "assert_is_tainted",
                ImportOp::AssertIsNotTainted => "assert_is_not_tainted",
                ImportOp::CheckIsTainted => "check_is_tainted",
            }
        )
    }
}
impl FromStr for ImportOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ImportOp::ALL
            .into_iter()
            .find(|op| op.to_string() == s)
            .ok_or_else(|| format!("Unknown taint import: {}", s))
    }
}

/// Executes one scalar import as the callee of a module call.
///
/// The value always passes through unchanged (`check_is_tainted` returns the
/// flag as an `i32` instead); only the channel's result slot 0 is written.
pub fn invoke<P: ChannelPort + ?Sized>(port: &mut P, op: ImportOp, value: Scalar) -> anyhow::Result<Scalar> {
    let (result, result_taint) = match op {
        ImportOp::Taint => (value, true),
        ImportOp::Sanitize => (value, false),
        ImportOp::AssertIsTainted => {
            let tainted = port.get_argument_taint(0)?;
            expect_taint(Expectation::Tainted, tainted, || format!("argument {value}"))?;
            (value, true)
        }
        ImportOp::AssertIsNotTainted => {
            let tainted = port.get_argument_taint(0)?;
            expect_taint(Expectation::NotTainted, tainted, || format!("argument {value}"))?;
            (value, false)
        }
        ImportOp::CheckIsTainted => {
            let tainted = port.get_argument_taint(0)?;
            (Scalar::I32(tainted as i32), false)
        }
    };
    port.prepare_for_result_taints(1)?;
    port.set_result_taint(0, result_taint)?;
    Ok(result)
}

/// Module-side taint state for one run: the shadow of linear memory and the
/// call-boundary channel.
#[derive(Debug, Default)]
pub struct ModuleTaint {
    pub shadow: ShadowMemory,
    pub channel: TaintChannel,
    live: bool,
}
impl ModuleTaint {
    pub fn new(memory_pages: usize) -> Self {
        Self {
            shadow: ShadowMemory::with_pages(memory_pages),
            channel: TaintChannel::new(),
            live: true,
        }
    }

    /// Module state for modes that do not track linear memory: imports pass
    /// values through and assertions hold.
    pub fn inert() -> Self {
        Self::default()
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Performs a call from module code: publishes the argument taints, runs
    /// `callee` against the channel and collects `result_count` result taints.
    pub fn call<R>(
        &mut self,
        arg_taints: &[bool],
        result_count: usize,
        callee: impl FnOnce(&mut TaintChannel) -> anyhow::Result<R>,
    ) -> anyhow::Result<(R, Vec<bool>)> {
        self.channel.begin_call(arg_taints);
        let outcome = callee(&mut self.channel);
        let taints = self.channel.finish_call(result_count);
        Ok((outcome?, taints))
    }

    /// Calls the scalar import `op` with `arg` the way instrumented module
    /// code does, returning the value with the taint the channel reports.
    pub fn import(&mut self, op: ImportOp, arg: TaintedScalar) -> anyhow::Result<TaintedScalar> {
        if !self.live {
            return Ok(match op {
                ImportOp::CheckIsTainted => TaintedScalar::clean(0),
                _ => arg,
            });
        }
        let (value, taints) = self.call(&[arg.tainted], 1, |channel| invoke(channel, op, arg.value))?;
        Ok(TaintedScalar {
            value,
            tainted: taints[0],
        })
    }

    pub fn taint(&mut self, arg: TaintedScalar) -> anyhow::Result<TaintedScalar> {
        self.import(ImportOp::Taint, arg)
    }
    pub fn sanitize(&mut self, arg: TaintedScalar) -> anyhow::Result<TaintedScalar> {
        self.import(ImportOp::Sanitize, arg)
    }
    pub fn assert_is_tainted(&mut self, arg: TaintedScalar) -> anyhow::Result<TaintedScalar> {
        self.import(ImportOp::AssertIsTainted, arg)
    }
    pub fn assert_is_not_tainted(&mut self, arg: TaintedScalar) -> anyhow::Result<TaintedScalar> {
        self.import(ImportOp::AssertIsNotTainted, arg)
    }
    pub fn check_is_tainted(&mut self, arg: TaintedScalar) -> anyhow::Result<bool> {
        let res = self.import(ImportOp::CheckIsTainted, arg)?;
        Ok(res.value == Scalar::I32(1))
    }

    /// Instrumented `T.store`: writes the value's taint into the shadow.
    pub fn store(&mut self, addr: usize, value: TaintedScalar) {
        if self.live {
            self.shadow.store(addr, value.value.ty(), value.tainted);
        }
    }
    /// Instrumented `T.load`: taint of the addressed bytes at read time.
    pub fn load_taint(&self, addr: usize, ty: ScalarType) -> bool {
        self.live && self.shadow.load(addr, ty)
    }
}
