#![allow(dead_code)]

use std::io::Write;
use termcolor::{ColorSpec, WriteColor};
use taint_bench::error::TaintError;
use taint_bench::interop::Interop;
use taint_bench::mode::AnalysisMode;
use taint_bench::runtime::TaintRuntime;
use wasmtime::{Engine, Module};

/// Channel exports every instrumented test module carries: argument flags live
/// at `0..32`, result flags at `32..64`, one i32 per slot.
const CHANNEL_EXPORTS: &str = r#"
    (memory (export "memory") 1)
    (func (export "get_argument_taint") (param $i i32) (result i32)
        (i32.load (i32.mul (local.get $i) (i32.const 4))))
    (func (export "set_argument_taint") (param $i i32) (param $flag i32)
        (i32.store (i32.mul (local.get $i) (i32.const 4)) (local.get $flag)))
    (func (export "prepare_for_result_taints") (param $count i32)
        (memory.fill (i32.const 32) (i32.const 0) (i32.const 32)))
    (func (export "set_result_taint") (param $i i32) (param $flag i32)
        (i32.store (i32.add (i32.const 32) (i32.mul (local.get $i) (i32.const 4))) (local.get $flag)))
    (func (export "get_result_taint") (param $i i32) (result i32)
        (i32.load (i32.add (i32.const 32) (i32.mul (local.get $i) (i32.const 4)))))
"#;

/// A module instrumented the way the taint imports expect.
///
/// Memory above the channel: `do_loop` state at `128..160`, the `selectRandom`
/// generator at 256 with a four-entry gene table (`c: u32` at 0, `p: f64` at 8,
/// 16 bytes each) at 272, `a_js` index pairs at 352/360 with results at 368,
/// `advanceSingle` velocities at `400..448` and masses at 448/456, and the
/// `write_to_file` digit counter at 480.
pub const INSTRUMENTED: &str = r#"
(module
    (import "taint" "taint_f64" (func $taint_f64 (param f64) (result f64)))
    (import "taint" "sanitize_f64" (func $sanitize_f64 (param f64) (result f64)))
    (import "taint" "taint_i32" (func $taint_i32 (param i32) (result i32)))
    (import "taint" "assert_is_tainted_i32" (func $assert_is_tainted_i32 (param i32) (result i32)))
    (import "taint" "check_is_tainted_i32" (func $check_is_tainted_i32 (param i32) (result i32)))
    (import "js" "max" (func $max (param i32 i32) (result i32)))
    (import "js" "get_item" (func $get_item (param i32) (result i32)))
    (import "js" "do_loop" (func $do_loop (param i32 i32 i32 i32 f64 f64)))
    (import "taint" "taint_char" (func $taint_char (param i32) (result i32)))
    (import "taint" "assert_is_tainted_f64" (func $assert_is_tainted_f64 (param f64)))
    (import "taint" "js_log" (func $log_i32 (param i32)))
    (import "js" "getItem" (func $getItem (param i32) (result i32)))
    (import "js" "assert_is_tainted" (func $js_assert_is_tainted (param f64)))
    (import "js" "selectRandom" (func $select_random (param i32 i32 i32 i32 i32 i32) (result i32)))
    (import "js" "a_js" (func $a_js (param i32 i32 i32)))
    (import "js" "advanceSingle"
        (func $advance_single (param f64 f64 f64 f64 f64 f64 i32 i32 i32 i32 i32 i32 i32 i32 f64)))
    (import "js" "write_to_file" (func $write_to_file (param i32 i32)))
    (import "debug" "js_log" (func $js_log (param f64)))
    __CHANNEL__
    (func (export "tainted_pi") (result f64)
        (local $v f64) (local $t i32)
        (local.set $v (call $taint_f64 (f64.const 3.14)))
        ;; the import left its result taint in slot 0; forward it
        (local.set $t (i32.load (i32.const 32)))
        (call $prepare (i32.const 1))
        (call $set_result (i32.const 0) (local.get $t))
        (local.get $v))
    (func (export "plain_pi") (result f64)
        (f64.const 3.14))
    (func (export "sanitized_pi") (result f64)
        (call $sanitize_f64 (call $taint_f64 (f64.const 3.14))))
    (func (export "check_arg") (param $x i32) (result i32)
        (call $assert_is_tainted_i32 (local.get $x)))
    (func (export "is_arg_tainted") (param $x i32) (result i32)
        (call $check_is_tainted_i32 (local.get $x)))
    (func (export "call_max") (param $a i32) (param $b i32) (result i32)
        (call $max (local.get $a) (local.get $b)))
    (func (export "call_get_item") (param $level i32) (result i32)
        (call $get_item (local.get $level)))
    (func (export "step")
        (call $do_loop (i32.const 128) (i32.const 136) (i32.const 144) (i32.const 152) (f64.const 0.5) (f64.const -0.5)))
    (func (export "log") (param $x f64)
        (call $js_log (local.get $x)))
    (func (export "log_const")
        (call $js_log (f64.const 1.0)))
    (func (export "log_count") (param $x i32)
        (call $log_i32 (local.get $x)))
    (func (export "tainted_char") (param $c i32) (result i32)
        (call $taint_char (local.get $c)))
    (func (export "check_f64") (param $x f64)
        (call $assert_is_tainted_f64 (local.get $x)))
    (func (export "js_check_f64") (param $x f64)
        (call $js_assert_is_tainted (local.get $x)))
    (func (export "call_get_item_camel") (param $level i32) (result i32)
        (call $getItem (local.get $level)))
    (func (export "pick") (result i32)
        (call $select_random (i32.const 256) (i32.const 272) (i32.const 4) (i32.const 16) (i32.const 0) (i32.const 8)))
    (func (export "a_pair")
        (call $a_js (i32.const 352) (i32.const 360) (i32.const 368)))
    (func (export "advance")
        (call $advance_single
            (f64.const 1.0) (f64.const 0.0) (f64.const 0.0)
            (f64.const 0.0) (f64.const 0.0) (f64.const 0.0)
            (i32.const 400) (i32.const 408) (i32.const 416)
            (i32.const 424) (i32.const 432) (i32.const 440)
            (i32.const 448) (i32.const 456)
            (f64.const 0.5)))
    (func (export "write_digit") (param $d i32)
        (call $write_to_file (local.get $d) (i32.const 480)))
    (func (export "main") (param $n i32) (result i32)
        (call $taint_i32 (i32.mul (local.get $n) (i32.const 2))))
    (func $prepare (param $count i32)
        (memory.fill (i32.const 32) (i32.const 0) (i32.const 32)))
    (func $set_result (param $i i32) (param $flag i32)
        (i32.store (i32.add (i32.const 32) (i32.mul (local.get $i) (i32.const 4))) (local.get $flag)))
)
"#;

/// The same program without any taint instrumentation.
pub const PLAIN: &str = r#"
(module
    (memory (export "memory") 1)
    (func (export "main") (param $n i32) (result i32)
        (i32.mul (local.get $n) (i32.const 2)))
)
"#;

pub fn instrumented_wat() -> String {
    INSTRUMENTED.replace("__CHANNEL__", CHANNEL_EXPORTS)
}

pub fn compile(engine: &Engine, wat: &str) -> Module {
    Module::new(engine, wat).unwrap_or_else(|e| panic!("Failed to compile test module\nError: {e:#}"))
}

/// Instantiates the instrumented module with a runtime in `mode`, bound or not.
pub fn instrumented(mode: AnalysisMode, bind: bool) -> Interop {
    let engine = Engine::default();
    let module = compile(&engine, &instrumented_wat());
    let mut interop = Interop::instantiate(&engine, &module, TaintRuntime::new(mode), true)
        .unwrap_or_else(|e| panic!("Failed to instantiate test module\nError: {e:#}"));
    if bind {
        interop.bind_channel().unwrap();
    }
    interop
}

pub fn taint_error(err: &anyhow::Error) -> TaintError {
    match err.downcast_ref::<TaintError>() {
        Some(e) => e.clone(),
        None => panic!("expected a taint error, got: {err:#}"),
    }
}

pub struct TestBuffer {
    pub buf: Vec<u8>,
}
impl TestBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }
    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.buf).to_string()
    }
}

impl Write for TestBuffer {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }
    fn flush(&mut self) -> std::io::Result<()> { Ok(()) }
}

impl WriteColor for TestBuffer {
    fn supports_color(&self) -> bool { false }   // tests: ignore colors
    fn set_color(&mut self, _spec: &ColorSpec) -> std::io::Result<()> { Ok(()) }
    fn reset(&mut self) -> std::io::Result<()> { Ok(()) }
}
