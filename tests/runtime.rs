use num_bigint::BigInt;
use taint_bench::channel::{ChannelPort, TaintChannel, CHANNEL_CAPACITY};
use taint_bench::host::{HostStore, Tracked};
use taint_bench::mode::{AnalysisMode, InteropVariant, JsVariant, Variant, WasmVariant};
use taint_bench::module::{ImportOp, ModuleTaint};
use taint_bench::runtime::TaintRuntime;
use taint_bench::value::{ScalarType, TaintedScalar};

#[test]
fn test_comparisons_carry_operand_taint() {
    let mut store = HostStore::new();
    let a = store.source_value(3);
    let b = Tracked::new(4);
    for res in [a.less_than(&b), a.less_eq(&b), a.greater_than(&b), a.greater_eq(&b), a.equals(&b)] {
        assert!(store.is_tainted(&res));
    }
    assert!(*a.less_than(&b).value());
    assert!(!store.is_tainted(&b.equals(&b)));
}

#[test]
fn test_strings_and_bigints() {
    let mut store = HostStore::new();
    let hello = Tracked::new("hello ".to_string());
    let world = store.source_value("world".to_string());
    let joined = hello.concat(&world);
    assert_eq!(joined.value(), "hello world");
    assert!(store.is_tainted(&joined));
    assert_eq!(*Tracked::from_char_code(Tracked::new(65)).char_code().value(), 65);

    let big = store.source_value(BigInt::from(1u64 << 40));
    let product = big * Tracked::new(BigInt::from(1u64 << 40));
    assert_eq!(*product.value(), BigInt::from(1u128 << 80));
    assert!(store.assert_is_tainted(&product).is_ok());
}

#[test]
fn test_copies_share_taint() {
    let mut store = HostStore::new();
    let a = store.source_value(1.5f64);
    let copy = a;
    assert!(store.is_tainted(&copy));
    let sanitized = store.sanitize(copy);
    assert!(store.is_tainted(&a));
    assert!(!store.is_tainted(&sanitized));
    assert_eq!(store.sources(), 1);
}

#[test]
fn test_lifting_values_keeps_no_per_value_state() {
    let mut store = HostStore::new();
    let mut clean_after_sanitize = 0;
    for i in 0..1_000_000 {
        let lifted = store.lift(i, true);
        assert!(store.is_tainted(&lifted));
        let sanitized = store.sanitize(lifted);
        if !store.is_tainted(&sanitized) {
            clean_after_sanitize += 1;
        }
    }
    assert_eq!(clean_after_sanitize, 1_000_000);
    assert_eq!(store.sources(), 0);
    assert!(store.is_tainted(&store.lift(1, true)));
    assert!(!store.is_tainted(&store.lift(1, false)));
}

#[test]
fn test_module_memory_taint() {
    let mut module = ModuleTaint::new(1);
    module.store(16, TaintedScalar::tainted(1i64));
    assert!(module.load_taint(16, ScalarType::I64));
    assert!(module.load_taint(20, ScalarType::I32));
    module.store(16, TaintedScalar::clean(0i32));
    assert!(!module.load_taint(16, ScalarType::I32));
    assert!(module.load_taint(20, ScalarType::I32));

    let mut inert = ModuleTaint::inert();
    inert.store(16, TaintedScalar::tainted(1i64));
    assert!(!inert.load_taint(16, ScalarType::I64));
    assert_eq!(inert.taint(TaintedScalar::clean(2)).unwrap(), TaintedScalar::clean(2));
    assert!(inert.assert_is_tainted(TaintedScalar::clean(2)).is_ok());
}

#[test]
fn test_caller_side_channel() {
    let mut channel = TaintChannel::new();
    channel.begin_call(&[]);
    channel.set_argument_taint(2, true);
    channel.set_argument_taint(CHANNEL_CAPACITY as u32, true);
    assert!(!channel.get_argument_taint(1).unwrap());
    assert!(channel.get_argument_taint(2).unwrap());
    assert!(!channel.get_argument_taint(CHANNEL_CAPACITY as u32).unwrap());

    channel.prepare_for_result_taints(2).unwrap();
    channel.set_result_taint(1, true).unwrap();
    assert!(!channel.get_result_taint(0));
    assert!(channel.get_result_taint(1));
    assert_eq!(channel.finish_call(3), vec![false, true, false]);
    assert!(!channel.get_result_taint(1));
}

#[test]
fn test_import_names() {
    assert_eq!(ImportOp::AssertIsNotTainted.import_name(ScalarType::F32), "assert_is_not_tainted_f32");
    assert_eq!(ImportOp::parse_import("check_is_tainted_i64"), Some((ImportOp::CheckIsTainted, ScalarType::I64)));
    assert_eq!(ImportOp::parse_import("taint_f64"), Some((ImportOp::Taint, ScalarType::F64)));
    assert_eq!(ImportOp::parse_import("taint_char"), Some((ImportOp::Taint, ScalarType::I32)));
    assert_eq!(ImportOp::parse_import("assert_is_tainted_char"), Some((ImportOp::AssertIsTainted, ScalarType::I32)));
    assert_eq!(ImportOp::parse_import("taint_u8"), None);
    assert_eq!(ImportOp::parse_import("js_log"), None);
}

#[test]
fn test_modes_and_variants() {
    for mode in AnalysisMode::ALL {
        assert_eq!(mode.to_string().parse::<AnalysisMode>(), Ok(mode));
        let runtime = TaintRuntime::new(mode);
        assert_eq!(runtime.host.is_live(), mode.tracks_host_values());
        assert_eq!(runtime.module.is_live(), mode.tracks_linear_memory());
    }
    assert_eq!("taint-analysis".parse::<AnalysisMode>(), Ok(AnalysisMode::TaintAnalysis));

    for v in JsVariant::ALL {
        assert_eq!(v.to_string().parse::<JsVariant>(), Ok(v));
        assert!(!v.requires_taint_imports());
    }
    for v in WasmVariant::ALL {
        assert_eq!(v.to_string().parse::<WasmVariant>(), Ok(v));
    }
    for v in InteropVariant::ALL {
        assert_eq!(v.to_string().parse::<InteropVariant>(), Ok(v));
    }
    assert_eq!(InteropVariant::InstrumentedTaintAnalysisWasm.analysis_mode(), AnalysisMode::NoAnalysis);
    assert_eq!(InteropVariant::InstrumentedTaintAnalysisBoth.analysis_mode(), AnalysisMode::TaintAnalysis);
    assert!(!WasmVariant::NotInstrumented.requires_taint_imports());
    assert!(WasmVariant::InstrumentedShadowExecutionAnalysis.requires_taint_imports());
}
