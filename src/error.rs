use std::fmt::{Display, Formatter};

/// The taint state an assertion expected to find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    Tainted,
    NotTainted,
}
impl Expectation {
    pub fn holds(&self, tainted: bool) -> bool {
        match self {
            Expectation::Tainted => tainted,
            Expectation::NotTainted => !tainted,
        }
    }
}
impl Display for Expectation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Expectation::Tainted => "tainted",
                Expectation::NotTainted => "not tainted",
            }
        )
    }
}

/// Failures raised by the taint runtime.
///
/// Both kinds end the benchmark variant that is running. The run boundary in
/// [`crate::harness`] catches them, reports them and moves on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TaintError {
    /// An `assert_is_tainted`/`assert_is_not_tainted` checkpoint saw the
    /// opposite taint state.
    #[error("taint invariant violated: expected {context} to be {expected}")]
    TaintInvariantViolation {
        expected: Expectation,
        context: String,
    },

    /// A taint import was called before the interop adapter bound it.
    #[error("import `{import}` was invoked before it was bound")]
    UnboundImportInvocation { import: String },
}
impl TaintError {
    pub fn violation(expected: Expectation, context: impl Into<String>) -> Self {
        TaintError::TaintInvariantViolation {
            expected,
            context: context.into(),
        }
    }
    pub fn unbound(import: impl Into<String>) -> Self {
        TaintError::UnboundImportInvocation {
            import: import.into(),
        }
    }
    pub fn is_violation(&self) -> bool {
        matches!(self, TaintError::TaintInvariantViolation { .. })
    }
}

/// Checks `tainted` against `expected`, building the violation lazily.
pub fn expect_taint(expected: Expectation, tainted: bool, context: impl FnOnce() -> String) -> Result<(), TaintError> {
    if expected.holds(tainted) {
        Ok(())
    } else {
        let context = context();
        tracing::debug!(%context, %expected, "taint assertion failed");
        Err(TaintError::violation(expected, context))
    }
}
