//! Taint-propagation runtime for host programs and the compiled modules they
//! call into, together with the taint-annotated benchmarks that exercise it.
//!
//! Host values carry taint through [`host::Tracked`] handles into a
//! [`host::HostStore`]; module memory is shadowed byte for byte by
//! [`shadow::ShadowMemory`]; scalar arguments and results cross calls through
//! the [`channel::TaintChannel`]. [`interop`] wires the two sides together for
//! modules run under wasmtime.

pub mod bench;
pub mod channel;
pub mod config;
pub mod error;
pub mod harness;
pub mod host;
pub mod interop;
pub mod mode;
pub mod module;
pub mod report;
pub mod runtime;
pub mod shadow;
pub mod value;

pub use error::TaintError;
pub use runtime::TaintRuntime;
