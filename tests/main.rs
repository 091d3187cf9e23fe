use taint_bench::error::{Expectation, TaintError};
use taint_bench::interop::{run_main, Interop};
use taint_bench::mode::{AnalysisMode, InteropVariant};
use taint_bench::runtime::TaintRuntime;
use taint_bench::value::{Scalar, ScalarType, TaintedScalar};
use wasmtime::Engine;
use crate::utils::{compile, instrumented, instrumented_wat, taint_error, PLAIN};

mod utils;

#[test]
fn test_result_taint_round_trip() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    let res = interop.call("tainted_pi", &[]).unwrap();
    assert_eq!(res, vec![TaintedScalar::tainted(3.14)]);

    let res = interop.call("plain_pi", &[]).unwrap();
    assert_eq!(res, vec![TaintedScalar::clean(3.14)]);
}

#[test]
fn test_channel_isolation() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    for _ in 0..3 {
        assert!(interop.call("tainted_pi", &[]).unwrap()[0].tainted);
        assert!(!interop.call("plain_pi", &[]).unwrap()[0].tainted);
    }
}

#[test]
fn test_sanitize_clears_pending_taint() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    let res = interop.call("sanitized_pi", &[]).unwrap();
    assert_eq!(res, vec![TaintedScalar::clean(3.14)]);
}

#[test]
fn test_unbound_import() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, false);
    assert!(!interop.is_bound());
    let err = interop.call("tainted_pi", &[]).unwrap_err();
    assert_eq!(taint_error(&err), TaintError::unbound("taint_f64"));

    // binding afterwards makes the same call work
    interop.bind_channel().unwrap();
    assert!(interop.call("tainted_pi", &[]).unwrap()[0].tainted);
}

#[test]
fn test_assertion_in_module() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    // passing the assertion re-marks the value
    let res = interop.call("check_arg", &[TaintedScalar::tainted(7)]).unwrap();
    assert_eq!(res, vec![TaintedScalar::tainted(7)]);

    let err = interop.call("check_arg", &[TaintedScalar::clean(7)]).unwrap_err();
    let err = taint_error(&err);
    assert!(err.is_violation());
    assert!(matches!(
        err,
        TaintError::TaintInvariantViolation {
            expected: Expectation::Tainted,
            ..
        }
    ));
}

#[test]
fn test_check_is_tainted_import() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    let res = interop.call("is_arg_tainted", &[TaintedScalar::tainted(1)]).unwrap();
    assert_eq!(res, vec![TaintedScalar::clean(1)]);
    let res = interop.call("is_arg_tainted", &[TaintedScalar::clean(1)]).unwrap();
    assert_eq!(res, vec![TaintedScalar::clean(0)]);
}

#[test]
fn test_max_callback_propagates() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    let res = interop.call("call_max", &[TaintedScalar::clean(9), TaintedScalar::tainted(2)]).unwrap();
    // the tainted operand lost but decided the outcome
    assert_eq!(res, vec![TaintedScalar::tainted(9)]);
    let res = interop.call("call_max", &[TaintedScalar::clean(9), TaintedScalar::clean(2)]).unwrap();
    assert_eq!(res, vec![TaintedScalar::clean(9)]);
}

#[test]
fn test_callbacks_in_wasm_only_mode_lose_host_taint() {
    // the host side runs uninstrumented, so taint does not survive host code
    let mut interop = instrumented(AnalysisMode::NoAnalysis, true);
    let res = interop.call("call_max", &[TaintedScalar::tainted(9), TaintedScalar::clean(2)]).unwrap();
    assert_eq!(res, vec![TaintedScalar::clean(9)]);
    let res = interop.call("call_get_item", &[TaintedScalar::clean(3)]).unwrap();
    assert_eq!(res, vec![TaintedScalar::clean(1)]);
}

#[test]
fn test_get_item_callback() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    for (level, tainted) in [(3, true), (7, true), (2, false), (4, false)] {
        let res = interop.call("call_get_item", &[TaintedScalar::clean(level)]).unwrap();
        assert_eq!(res, vec![TaintedScalar { value: Scalar::I32(1), tainted }], "level {level}");
    }
}

#[test]
fn test_do_loop_reads_and_writes_shadow() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    interop.write_memory(128, TaintedScalar::tainted(0.0)).unwrap();
    interop.call("step", &[]).unwrap();

    let zi = interop.read_memory(128, ScalarType::F64).unwrap();
    let zr = interop.read_memory(136, ScalarType::F64).unwrap();
    let ti = interop.read_memory(144, ScalarType::F64).unwrap();
    let tr = interop.read_memory(152, ScalarType::F64).unwrap();
    assert_eq!(zi, TaintedScalar::tainted(0.5));
    assert_eq!(zr, TaintedScalar::clean(-0.5));
    assert_eq!(ti, TaintedScalar::tainted(0.25));
    assert_eq!(tr, TaintedScalar::clean(0.25));
}

#[test]
fn test_js_log() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    interop.call("log", &[TaintedScalar::tainted(2.5)]).unwrap();
    assert_eq!(interop.log(), ["js_log: 2.5 (tainted: true)".to_string()]);

    let mut unbound = instrumented(AnalysisMode::TaintAnalysis, false);
    unbound.call("log", &[TaintedScalar::clean(1.0)]).unwrap();
    assert_eq!(unbound.log(), ["js_log: 1".to_string()]);
}

#[test]
fn test_missing_taint_imports_fail_to_link() {
    let engine = Engine::default();
    let module = compile(&engine, &instrumented_wat());
    let res = Interop::instantiate(&engine, &module, TaintRuntime::new(AnalysisMode::NoAnalysis), false);
    assert!(res.is_err());
}

#[test]
fn test_run_main_per_variant() {
    let engine = Engine::default();
    let instrumented = compile(&engine, &instrumented_wat());
    let plain = compile(&engine, PLAIN);

    let res = run_main(&engine, &plain, InteropVariant::NotInstrumented, 21).unwrap();
    assert_eq!(res, TaintedScalar::clean(42));

    for variant in [
        InteropVariant::InstrumentedForwardAnalysis,
        InteropVariant::InstrumentedTaintAnalysisJs,
        InteropVariant::InstrumentedTaintAnalysisWasm,
        InteropVariant::InstrumentedTaintAnalysisBoth,
    ] {
        let res = run_main(&engine, &instrumented, variant, 21).unwrap();
        assert_eq!(res, TaintedScalar::tainted(42), "{variant}");
    }
}

#[test]
fn test_runtime_survives_the_run() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    interop.call("call_get_item", &[TaintedScalar::clean(3)]).unwrap();
    let runtime = interop.into_runtime();
    assert_eq!(runtime.mode(), AnalysisMode::TaintAnalysis);
    assert_eq!(runtime.host.sources(), 1);
}

#[test]
fn test_call_clears_argument_slots_of_earlier_calls() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    interop.call("log", &[TaintedScalar::tainted(2.5)]).unwrap();
    interop.call("log_const", &[]).unwrap();
    assert_eq!(
        interop.log(),
        ["js_log: 2.5 (tainted: true)".to_string(), "js_log: 1 (tainted: false)".to_string()]
    );
}

#[test]
fn test_js_log_in_taint_namespace() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    interop.call("log_count", &[TaintedScalar::tainted(7)]).unwrap();
    interop.call("log_count", &[TaintedScalar::clean(8)]).unwrap();
    assert_eq!(
        interop.log(),
        ["js_log: 7 (tainted: true)".to_string(), "js_log: 8 (tainted: false)".to_string()]
    );
}

#[test]
fn test_char_imports_travel_as_i32() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    let res = interop.call("tainted_char", &[TaintedScalar::clean('g' as i32)]).unwrap();
    assert_eq!(res, vec![TaintedScalar::tainted('g' as i32)]);
}

#[test]
fn test_assertions_without_result() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    assert!(interop.call("check_f64", &[TaintedScalar::tainted(0.5)]).unwrap().is_empty());
    let err = interop.call("check_f64", &[TaintedScalar::clean(0.5)]).unwrap_err();
    assert!(taint_error(&err).is_violation());

    assert!(interop.call("js_check_f64", &[TaintedScalar::tainted(0.5)]).is_ok());
    let err = interop.call("js_check_f64", &[TaintedScalar::clean(0.5)]).unwrap_err();
    assert!(taint_error(&err).is_violation());
}

#[test]
fn test_mismatched_taint_import_fails_to_link() {
    let engine = Engine::default();
    let module = compile(
        &engine,
        r#"(module (import "taint" "taint_f64" (func (param i32) (result i32))))"#,
    );
    let err = Interop::instantiate(&engine, &module, TaintRuntime::new(AnalysisMode::TaintAnalysis), true)
        .err()
        .unwrap();
    assert!(err.to_string().contains("taint_f64"), "{err:#}");
}

#[test]
fn test_get_item_camel_case_alias() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    for (level, tainted) in [(3, true), (2, false)] {
        let res = interop.call("call_get_item_camel", &[TaintedScalar::clean(level)]).unwrap();
        assert_eq!(res, vec![TaintedScalar { value: Scalar::I32(1), tainted }], "level {level}");
    }
}

const GENES: [(char, f64); 4] = [('a', 0.302954942668), ('c', 0.5009432431601), ('g', 0.6984905497992), ('t', 1.0)];

fn write_genes(interop: &mut Interop, tainted_entry: Option<usize>) {
    for (i, (c, p)) in GENES.into_iter().enumerate() {
        let entry = 272 + i * 16;
        interop.write_memory(entry, TaintedScalar::clean(c as i32)).unwrap();
        let p = TaintedScalar { value: Scalar::F64(p), tainted: tainted_entry == Some(i) };
        interop.write_memory(entry + 8, p).unwrap();
    }
}

#[test]
fn test_select_random_callback() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    write_genes(&mut interop, None);
    interop.write_memory(256, TaintedScalar::clean(42)).unwrap();

    // 42 steps to 52439, r = 0.3747: between the first two cumulative entries
    let res = interop.call("pick", &[]).unwrap();
    assert_eq!(res, vec![TaintedScalar::clean('c' as i32)]);
    assert_eq!(interop.read_memory(256, ScalarType::I32).unwrap(), TaintedScalar::clean(52439));

    // r = 0.729 compares against the tainted second entry on its way to 't'
    write_genes(&mut interop, Some(1));
    let res = interop.call("pick", &[]).unwrap();
    assert_eq!(res, vec![TaintedScalar::tainted('t' as i32)]);
}

#[test]
fn test_select_random_keeps_generator_taint() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    write_genes(&mut interop, None);
    interop.write_memory(256, TaintedScalar::tainted(42)).unwrap();
    let res = interop.call("pick", &[]).unwrap();
    assert_eq!(res, vec![TaintedScalar::tainted('c' as i32)]);
    assert_eq!(interop.read_memory(256, ScalarType::I32).unwrap(), TaintedScalar::tainted(52439));
}

#[test]
fn test_a_js_taints_the_sourced_lane() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    for (addr, v) in [(352, 0), (356, 1), (360, 2), (364, 3)] {
        interop.write_memory(addr, TaintedScalar::clean(v)).unwrap();
    }
    interop.call("a_pair", &[]).unwrap();
    assert_eq!(interop.read_memory(368, ScalarType::F64).unwrap(), TaintedScalar::clean(4.0));
    assert_eq!(interop.read_memory(376, ScalarType::F64).unwrap(), TaintedScalar::tainted(12.0));
}

#[test]
fn test_advance_single_updates_velocities() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    interop.write_memory(448, TaintedScalar::clean(2.0)).unwrap();
    interop.write_memory(456, TaintedScalar::clean(4.0)).unwrap();
    interop.call("advance", &[]).unwrap();

    // unit distance along x, dt = 0.5
    let vx1 = interop.read_memory(400, ScalarType::F64).unwrap();
    let vx2 = interop.read_memory(424, ScalarType::F64).unwrap();
    let vy2 = interop.read_memory(432, ScalarType::F64).unwrap();
    assert_eq!(vx1, TaintedScalar::tainted(-2.0));
    assert_eq!(vx2, TaintedScalar::tainted(1.0));
    assert_eq!(vy2, TaintedScalar::tainted(0.0));
    assert_eq!(interop.read_memory(448, ScalarType::F64).unwrap(), TaintedScalar::clean(2.0));
}

#[test]
fn test_write_to_file_callback() {
    let mut interop = instrumented(AnalysisMode::TaintAnalysis, true);
    for d in [3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5] {
        interop.call("write_digit", &[TaintedScalar::tainted(d)]).unwrap();
    }
    assert_eq!(interop.output(), "3141592653\t:10\n5");
    assert_eq!(interop.read_memory(480, ScalarType::I32).unwrap(), TaintedScalar::clean(11));

    let err = interop.call("write_digit", &[TaintedScalar::clean(8)]).unwrap_err();
    assert!(taint_error(&err).is_violation());
    assert_eq!(interop.output(), "3141592653\t:10\n5");
}
