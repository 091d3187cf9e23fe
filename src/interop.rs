//! Interop adapter: runs a compiled module under wasmtime with the taint
//! runtime of the current run wired into its imports.
//!
//! Protocol for a host -> module call ([`Interop::call`]):
//!  - argument taints go into the module's argument slots (`set_argument_taint`)
//!  - the module's result slots are prepared (`prepare_for_result_taints`), so a
//!    call that never touches the channel reads back untainted
//!  - after the call returns, result taints are read explicitly
//!    (`get_result_taint`)
//!
//! Module -> host calls go the other way round through the same exports: host
//! imports read `get_argument_taint` and answer through
//! `prepare_for_result_taints`/`set_result_taint`.

use std::collections::HashSet;
use anyhow::{anyhow, bail};
use wasi_common::sync::{add_to_linker, WasiCtxBuilder};
use wasi_common::WasiCtx;
use wasmtime::{AsContextMut, Caller, Engine, Extern, ExternType, FuncType, ImportType, Instance, Linker, Module, Store, TypedFunc, Val};
use crate::channel::{ChannelPort, UnboundPort, CHANNEL_CAPACITY};
use crate::interop::callbacks::{GeneTable, LoopPtrs, PairPtrs, DEBUG_NAMESPACE, JS_NAMESPACE};
use crate::mode::Variant;
use crate::module::{invoke, ImportOp, TAINT_NAMESPACE};
use crate::runtime::TaintRuntime;
use crate::shadow::TaintedMemory;
use crate::value::{Scalar, ScalarType, TaintedScalar};

pub mod callbacks;

/// Store data for an instantiated module.
pub struct HostState {
    wasi: WasiCtx,
    pub runtime: TaintRuntime,
    binding: ChannelBinding,
    /// Lines produced by `js_log`.
    pub log: Vec<String>,
    /// Text the module wrote through `write_to_file`.
    pub output: String,
}
impl HostState {
    fn new(wasi: WasiCtx, runtime: TaintRuntime) -> Self {
        Self {
            wasi,
            runtime,
            binding: ChannelBinding::Unbound,
            log: Vec::new(),
            output: String::new(),
        }
    }
}

/// Where taint imports find the module's channel.
#[derive(Clone)]
enum ChannelBinding {
    /// Nothing bound yet: taint imports fail, `js` callbacks see clean arguments.
    Unbound,
    Exports(ChannelExports),
}

/// The channel-management exports of an instrumented module.
#[derive(Clone)]
pub struct ChannelExports {
    get_argument_taint: TypedFunc<i32, i32>,
    prepare_for_result_taints: TypedFunc<i32, ()>,
    set_result_taint: TypedFunc<(i32, i32), ()>,
    // host-as-caller direction; older modules do not export these
    set_argument_taint: Option<TypedFunc<(i32, i32), ()>>,
    get_result_taint: Option<TypedFunc<i32, i32>>,
}
impl ChannelExports {
    pub fn from_instance(mut store: impl AsContextMut, instance: &Instance) -> anyhow::Result<Self> {
        Ok(Self {
            get_argument_taint: instance.get_typed_func(&mut store, "get_argument_taint")?,
            prepare_for_result_taints: instance.get_typed_func(&mut store, "prepare_for_result_taints")?,
            set_result_taint: instance.get_typed_func(&mut store, "set_result_taint")?,
            set_argument_taint: instance.get_typed_func(&mut store, "set_argument_taint").ok(),
            get_result_taint: instance.get_typed_func(&mut store, "get_result_taint").ok(),
        })
    }
}

/// A [`ChannelPort`] that forwards to the module's exports from inside a host
/// function.
struct ExportPort<'a, 'c> {
    caller: &'a mut Caller<'c, HostState>,
    exports: ChannelExports,
}
impl ChannelPort for ExportPort<'_, '_> {
    fn get_argument_taint(&mut self, index: u32) -> anyhow::Result<bool> {
        Ok(self.exports.get_argument_taint.call(&mut *self.caller, index as i32)? != 0)
    }
    fn prepare_for_result_taints(&mut self, count: u32) -> anyhow::Result<()> {
        self.exports.prepare_for_result_taints.call(&mut *self.caller, count as i32)
    }
    fn set_result_taint(&mut self, index: u32, flag: bool) -> anyhow::Result<()> {
        self.exports.set_result_taint.call(&mut *self.caller, (index as i32, flag as i32))
    }
}

fn with_port<R>(
    caller: &mut Caller<'_, HostState>,
    import: &str,
    f: impl FnOnce(&mut dyn ChannelPort) -> anyhow::Result<R>,
) -> anyhow::Result<R> {
    match caller.data().binding.clone() {
        ChannelBinding::Unbound => f(&mut UnboundPort { import: import.to_string() }),
        ChannelBinding::Exports(exports) => f(&mut ExportPort { caller, exports }),
    }
}

/// Argument taints for a `js` callback; clean when no channel is bound.
/// Arguments past the channel capacity read as clean.
fn callback_args(caller: &mut Caller<'_, HostState>, count: u32) -> anyhow::Result<Vec<bool>> {
    let ChannelBinding::Exports(exports) = caller.data().binding.clone() else {
        return Ok(vec![false; count as usize]);
    };
    let mut port = ExportPort { caller, exports };
    let mut taints = (0..count.min(CHANNEL_CAPACITY as u32))
        .map(|i| port.get_argument_taint(i))
        .collect::<anyhow::Result<Vec<_>>>()?;
    taints.resize(count as usize, false);
    Ok(taints)
}

/// Publishes a `js` callback's result taints; a no-op when nothing is bound.
fn callback_results(caller: &mut Caller<'_, HostState>, taints: &[bool]) -> anyhow::Result<()> {
    let ChannelBinding::Exports(exports) = caller.data().binding.clone() else {
        return Ok(());
    };
    let mut port = ExportPort { caller, exports };
    port.prepare_for_result_taints(taints.len() as u32)?;
    for (i, tainted) in taints.iter().enumerate() {
        port.set_result_taint(i as u32, *tainted)?;
    }
    Ok(())
}

/// The function type `import` declares.
fn declared_func(import: &ImportType<'_>) -> anyhow::Result<FuncType> {
    match import.ty() {
        ExternType::Func(ty) => Ok(ty),
        _ => bail!("import `{}::{}` is not a function", import.module(), import.name()),
    }
}

/// The scalar type of a function's only parameter.
fn single_scalar_param(import: &ImportType<'_>, ty: &FuncType) -> anyhow::Result<ScalarType> {
    let params: Vec<_> = ty.params().collect();
    match params.as_slice() {
        [param] => ScalarType::from_val_type(param),
        _ => None,
    }
    .ok_or_else(|| anyhow!("import `{}::{}` must take a single scalar", import.module(), import.name()))
}

/// Links every import `module` declares in the `taint` namespace to its
/// [`ImportOp`], with the signature the module declares. The assertion
/// families may declare no result.
pub fn link_taint_imports(linker: &mut Linker<HostState>, module: &Module) -> anyhow::Result<()> {
    let mut linked = HashSet::new();
    for import in module.imports() {
        let name = import.name();
        if import.module() != TAINT_NAMESPACE || name == LOG_IMPORT || !linked.insert(name) {
            continue;
        }
        let ty = declared_func(&import)?;
        let (op, scalar) = ImportOp::parse_import(name).ok_or_else(|| anyhow!("unknown taint import `{name}`"))?;
        let result = match op {
            ImportOp::CheckIsTainted => ScalarType::I32,
            _ => scalar,
        };
        let results: Vec<_> = ty.results().map(|t| ScalarType::from_val_type(&t)).collect();
        if single_scalar_param(&import, &ty)? != scalar || !(results.is_empty() || results == [Some(result)]) {
            bail!("taint import `{name}` does not have the signature of `{op}` on {scalar}");
        }

        let import_name = name.to_string();
        linker.func_new(TAINT_NAMESPACE, name, ty, move |mut caller, params, results| {
            let value = params
                .first()
                .and_then(Scalar::from_val)
                .ok_or_else(|| anyhow!("`{import_name}` called without its argument"))?;
            let out = with_port(&mut caller, &import_name, |port| invoke(port, op, value))?;
            if let Some(slot) = results.first_mut() {
                *slot = out.to_val();
            }
            Ok(())
        })?;
    }
    Ok(())
}

const LOG_IMPORT: &str = "js_log";

/// Host callbacks taking one scalar of whatever type the module declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarCallback {
    Log,
    AssertIsTainted,
}
impl ScalarCallback {
    fn of(namespace: &str, name: &str) -> Option<Self> {
        match (namespace, name) {
            (TAINT_NAMESPACE | JS_NAMESPACE | DEBUG_NAMESPACE, LOG_IMPORT) => Some(ScalarCallback::Log),
            (JS_NAMESPACE, "assert_is_tainted") => Some(ScalarCallback::AssertIsTainted),
            _ => None,
        }
    }
}

fn js_log(caller: &mut Caller<'_, HostState>, value: Scalar) -> anyhow::Result<()> {
    let tainted = match caller.data().binding.clone() {
        ChannelBinding::Exports(exports) => Some(ExportPort { caller: &mut *caller, exports }.get_argument_taint(0)?),
        ChannelBinding::Unbound => None,
    };
    let line = match tainted {
        Some(tainted) => format!("js_log: {} (tainted: {tainted})", value.number()),
        None => format!("js_log: {}", value.number()),
    };
    tracing::info!("{line}");
    caller.data_mut().log.push(line);
    Ok(())
}

fn js_assert_is_tainted(caller: &mut Caller<'_, HostState>, value: Scalar) -> anyhow::Result<bool> {
    let taints = callback_args(caller, 1)?;
    let host = &caller.data().runtime.host;
    let lifted = host.lift(value, taints[0]);
    host.assert_is_tainted(&lifted)?;
    Ok(host.is_tainted(&lifted))
}

/// Links `js_log` (in the `taint`, `js` and `debug` namespaces) and
/// `js::assert_is_tainted` for every scalar type `module` uses them with.
fn link_scalar_callbacks(linker: &mut Linker<HostState>, module: &Module) -> anyhow::Result<()> {
    let mut linked = HashSet::new();
    for import in module.imports() {
        let (namespace, name) = (import.module(), import.name());
        let Some(callback) = ScalarCallback::of(namespace, name) else {
            continue;
        };
        if !linked.insert((namespace, name)) {
            continue;
        }
        let ty = declared_func(&import)?;
        let scalar = single_scalar_param(&import, &ty)?;
        let results: Vec<_> = ty.results().map(|t| ScalarType::from_val_type(&t)).collect();
        let returns_value = match (callback, results.as_slice()) {
            (_, []) => false,
            (ScalarCallback::AssertIsTainted, [Some(ty)]) if *ty == scalar => true,
            _ => bail!("import `{namespace}::{name}` returns an unexpected type"),
        };

        linker.func_new(namespace, name, ty, move |mut caller, params, results| {
            let value = params
                .first()
                .and_then(Scalar::from_val)
                .ok_or_else(|| anyhow!("callback called without its argument"))?;
            match callback {
                ScalarCallback::Log => js_log(&mut caller, value)?,
                ScalarCallback::AssertIsTainted => {
                    let tainted = js_assert_is_tainted(&mut caller, value)?;
                    if returns_value {
                        callback_results(&mut caller, &[tainted])?;
                        results[0] = value.to_val();
                    }
                }
            }
            Ok(())
        })?;
    }
    Ok(())
}

fn memory_of(caller: &mut Caller<'_, HostState>) -> anyhow::Result<wasmtime::Memory> {
    match caller.get_export("memory") {
        Some(Extern::Memory(memory)) => Ok(memory),
        _ => bail!("module does not export its memory"),
    }
}

fn addr(ptr: i32) -> usize {
    ptr as u32 as usize
}

fn get_item(mut caller: Caller<'_, HostState>, level: i32) -> anyhow::Result<i32> {
    let taints = callback_args(&mut caller, 1)?;
    let host = &mut caller.data_mut().runtime.host;
    let level = host.lift(level, taints[0]);
    let item = callbacks::get_item(host, level);
    let tainted = host.is_tainted(&item);
    callback_results(&mut caller, &[tainted])?;
    Ok(item.into_inner())
}

/// Defines the `js` and `debug` callbacks used by the interop benchmarks.
pub fn link_host_callbacks(linker: &mut Linker<HostState>, module: &Module) -> anyhow::Result<()> {
    link_scalar_callbacks(linker, module)?;

    linker.func_wrap(JS_NAMESPACE, "max", |mut caller: Caller<'_, HostState>, a: i32, b: i32| -> anyhow::Result<i32> {
        let taints = callback_args(&mut caller, 2)?;
        let host = &mut caller.data_mut().runtime.host;
        let (a, b) = (host.lift(a, taints[0]), host.lift(b, taints[1]));
        let res = callbacks::max(a, b);
        let tainted = host.is_tainted(&res);
        callback_results(&mut caller, &[tainted])?;
        Ok(res.into_inner())
    })?;

    linker.func_wrap(JS_NAMESPACE, "getItem", get_item)?;
    linker.func_wrap(JS_NAMESPACE, "get_item", get_item)?;

    linker.func_wrap(JS_NAMESPACE, "get_complement_char", |mut caller: Caller<'_, HostState>, original: i32| -> anyhow::Result<i32> {
        let taints = callback_args(&mut caller, 1)?;
        let host = &mut caller.data_mut().runtime.host;
        let original = host.lift(original, taints[0]);
        let ch = callbacks::get_complement_char(host, original)?;
        let tainted = host.is_tainted(&ch);
        callback_results(&mut caller, &[tainted])?;
        Ok(ch.into_inner())
    })?;

    linker.func_wrap(
        JS_NAMESPACE,
        "do_loop",
        |mut caller: Caller<'_, HostState>, zi: i32, zr: i32, ti: i32, tr: i32, ci: f64, cr: f64| -> anyhow::Result<()> {
            let taints = callback_args(&mut caller, 6)?;
            let memory = memory_of(&mut caller)?;
            let (bytes, state) = memory.data_and_store_mut(&mut caller);
            let runtime = &mut state.runtime;
            let host = &mut runtime.host;
            let (ci, cr) = (host.lift(ci, taints[4]), host.lift(cr, taints[5]));
            let ptrs = LoopPtrs {
                zi: addr(zi),
                zr: addr(zr),
                ti: addr(ti),
                tr: addr(tr),
            };
            let mut view = TaintedMemory::new(bytes, &mut runtime.module.shadow);
            callbacks::do_loop(host, &mut view, ptrs, ci, cr)?;
            Ok(())
        },
    )?;

    linker.func_wrap(
        JS_NAMESPACE,
        "selectRandom",
        |mut caller: Caller<'_, HostState>, rng: i32, genes: i32, count: i32, stride: i32, c_offset: i32, p_offset: i32| -> anyhow::Result<i32> {
            let memory = memory_of(&mut caller)?;
            let (bytes, state) = memory.data_and_store_mut(&mut caller);
            let runtime = &mut state.runtime;
            let mut view = TaintedMemory::new(bytes, &mut runtime.module.shadow);
            let genes = GeneTable {
                ptr: addr(genes),
                count: addr(count),
                stride: addr(stride),
                c_offset: addr(c_offset),
                p_offset: addr(p_offset),
            };
            let code = callbacks::select_random(&runtime.host, &mut view, addr(rng), genes)?;
            let tainted = runtime.host.is_tainted(&code);
            callback_results(&mut caller, &[tainted])?;
            Ok(code.into_inner())
        },
    )?;

    linker.func_wrap(
        JS_NAMESPACE,
        "a_js",
        |mut caller: Caller<'_, HostState>, i: i32, j: i32, result: i32| -> anyhow::Result<()> {
            let memory = memory_of(&mut caller)?;
            let (bytes, state) = memory.data_and_store_mut(&mut caller);
            let runtime = &mut state.runtime;
            let mut view = TaintedMemory::new(bytes, &mut runtime.module.shadow);
            callbacks::a_js(&mut runtime.host, &mut view, addr(i), addr(j), addr(result))
        },
    )?;

    linker.func_wrap(
        JS_NAMESPACE,
        "advanceSingle",
        |mut caller: Caller<'_, HostState>,
         x1: f64,
         y1: f64,
         z1: f64,
         x2: f64,
         y2: f64,
         z2: f64,
         vx1: i32,
         vy1: i32,
         vz1: i32,
         vx2: i32,
         vy2: i32,
         vz2: i32,
         mass1: i32,
         mass2: i32,
         dt: f64|
         -> anyhow::Result<()> {
            let taints = callback_args(&mut caller, 15)?;
            let memory = memory_of(&mut caller)?;
            let (bytes, state) = memory.data_and_store_mut(&mut caller);
            let runtime = &mut state.runtime;
            let host = &mut runtime.host;
            let p1 = [host.lift(x1, taints[0]), host.lift(y1, taints[1]), host.lift(z1, taints[2])];
            let p2 = [host.lift(x2, taints[3]), host.lift(y2, taints[4]), host.lift(z2, taints[5])];
            let dt = host.lift(dt, taints[14]);
            let ptrs = PairPtrs {
                v1: [addr(vx1), addr(vy1), addr(vz1)],
                v2: [addr(vx2), addr(vy2), addr(vz2)],
                mass1: addr(mass1),
                mass2: addr(mass2),
            };
            let mut view = TaintedMemory::new(bytes, &mut runtime.module.shadow);
            callbacks::advance_single(host, &mut view, p1, p2, ptrs, dt)?;
            Ok(())
        },
    )?;

    linker.func_wrap(
        JS_NAMESPACE,
        "write_to_file",
        |mut caller: Caller<'_, HostState>, d: i32, i: i32| -> anyhow::Result<()> {
            let taints = callback_args(&mut caller, 2)?;
            let memory = memory_of(&mut caller)?;
            let (bytes, state) = memory.data_and_store_mut(&mut caller);
            let runtime = &mut state.runtime;
            let d = runtime.host.lift(d, taints[0]);
            let mut view = TaintedMemory::new(bytes, &mut runtime.module.shadow);
            callbacks::write_to_file(&mut runtime.host, &mut view, d, addr(i), &mut state.output)
        },
    )?;
    Ok(())
}

/// An instantiated module plus the taint runtime of its run.
pub struct Interop {
    store: Store<HostState>,
    instance: Instance,
}
impl Interop {
    /// Instantiates `module`. With `taint_imports`, the `taint` family is part
    /// of the import object; its imports fail until [`Interop::bind_channel`].
    pub fn instantiate(engine: &Engine, module: &Module, runtime: TaintRuntime, taint_imports: bool) -> anyhow::Result<Self> {
        let wasi = WasiCtxBuilder::new().inherit_stdio().build();
        let mut store = Store::new(engine, HostState::new(wasi, runtime));

        let mut linker = Linker::new(engine);
        add_to_linker(&mut linker, |state: &mut HostState| &mut state.wasi)?;
        link_host_callbacks(&mut linker, module)?;
        if taint_imports {
            link_taint_imports(&mut linker, module)?;
        }
        let instance = linker.instantiate(&mut store, module)?;

        Ok(Self { store, instance })
    }

    /// Wires the taint imports to the module's channel exports.
    pub fn bind_channel(&mut self) -> anyhow::Result<()> {
        let exports = ChannelExports::from_instance(&mut self.store, &self.instance)?;
        self.store.data_mut().binding = ChannelBinding::Exports(exports);
        Ok(())
    }
    pub fn is_bound(&self) -> bool {
        matches!(self.store.data().binding, ChannelBinding::Exports(_))
    }

    /// Calls the export `name` with tainted arguments and reads the result
    /// taints back through the channel after it returns.
    pub fn call(&mut self, name: &str, args: &[TaintedScalar]) -> anyhow::Result<Vec<TaintedScalar>> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| anyhow!("module does not export a function named `{name}`"))?;
        let ty = func.ty(&self.store);
        if ty.params().len() != args.len() {
            bail!("`{name}` takes {} arguments, got {}", ty.params().len(), args.len());
        }
        let result_types = ty
            .results()
            .map(|t| ScalarType::from_val_type(&t).ok_or_else(|| anyhow!("`{name}` returns a non-scalar value")))
            .collect::<anyhow::Result<Vec<_>>>()?;

        let binding = self.store.data().binding.clone();
        if let ChannelBinding::Exports(exports) = &binding {
            match &exports.set_argument_taint {
                Some(set) => {
                    for (i, arg) in args.iter().enumerate() {
                        set.call(&mut self.store, (i as i32, arg.tainted as i32))?;
                    }
                    // slots left over from an earlier call must not leak into this one
                    for i in args.len()..CHANNEL_CAPACITY {
                        set.call(&mut self.store, (i as i32, 0))?;
                    }
                }
                None if args.iter().any(|a| a.tainted) => {
                    tracing::warn!(name, "module cannot receive argument taint; passing arguments clean");
                }
                None => {}
            }
            exports.prepare_for_result_taints.call(&mut self.store, result_types.len() as i32)?;
        }

        let params: Vec<Val> = args.iter().map(|a| a.value.to_val()).collect();
        let mut results = vec![Val::I32(0); result_types.len()];
        func.call(&mut self.store, &params, &mut results)?;

        let mut out = Vec::with_capacity(results.len());
        for (i, val) in results.iter().enumerate() {
            let value = Scalar::from_val(val).ok_or_else(|| anyhow!("`{name}` returned a non-scalar value"))?;
            let tainted = match &binding {
                ChannelBinding::Exports(ChannelExports { get_result_taint: Some(get), .. }) => {
                    get.call(&mut self.store, i as i32)? != 0
                }
                _ => false,
            };
            out.push(TaintedScalar { value, tainted });
        }
        Ok(out)
    }

    /// Reads a scalar from the module's memory together with its shadow taint.
    pub fn read_memory(&mut self, addr: usize, ty: ScalarType) -> anyhow::Result<TaintedScalar> {
        let memory = self
            .instance
            .get_memory(&mut self.store, "memory")
            .ok_or_else(|| anyhow!("module does not export its memory"))?;
        let (bytes, state) = memory.data_and_store_mut(&mut self.store);
        let view = TaintedMemory::new(bytes, &mut state.runtime.module.shadow);
        let (value, tainted) = view.read(addr, ty)?;
        Ok(TaintedScalar { value, tainted })
    }
    /// Writes a scalar into the module's memory and its taint into the shadow.
    pub fn write_memory(&mut self, addr: usize, value: TaintedScalar) -> anyhow::Result<()> {
        let memory = self
            .instance
            .get_memory(&mut self.store, "memory")
            .ok_or_else(|| anyhow!("module does not export its memory"))?;
        let (bytes, state) = memory.data_and_store_mut(&mut self.store);
        let mut view = TaintedMemory::new(bytes, &mut state.runtime.module.shadow);
        view.write(addr, value.value, value.tainted)?;
        Ok(())
    }

    /// Number of parameters of the export `name`, if it is a function.
    pub fn param_count(&mut self, name: &str) -> Option<usize> {
        let func = self.instance.get_func(&mut self.store, name)?;
        Some(func.ty(&self.store).params().len())
    }

    pub fn runtime(&self) -> &TaintRuntime {
        &self.store.data().runtime
    }
    pub fn runtime_mut(&mut self) -> &mut TaintRuntime {
        &mut self.store.data_mut().runtime
    }
    pub fn log(&self) -> &[String] {
        &self.store.data().log
    }
    pub fn output(&self) -> &str {
        &self.store.data().output
    }
    /// Ends the run, handing back its taint state for inspection.
    pub fn into_runtime(self) -> TaintRuntime {
        self.store.into_data().runtime
    }
}

/// Runs the `main` export of a benchmark module as `variant`: fresh runtime,
/// taint imports and channel binding when the variant needs them, then
/// `main(input)` (or `main()` when it takes no input).
pub fn run_main<V: Variant>(engine: &Engine, module: &Module, variant: V, input: i32) -> anyhow::Result<TaintedScalar> {
    tracing::debug!(%variant, input, "running module main");
    let runtime = TaintRuntime::new(variant.analysis_mode());
    let mut interop = Interop::instantiate(engine, module, runtime, variant.requires_taint_imports())?;
    if variant.requires_taint_imports() {
        interop.bind_channel()?;
    }
    let args = match interop.param_count("main") {
        Some(0) => vec![],
        _ => vec![TaintedScalar::clean(input)],
    };
    let results = interop.call("main", &args)?;
    tracing::debug!(
        %variant,
        tainted_bytes = interop.runtime().module.shadow.tainted_bytes(),
        "module main returned"
    );
    results.into_iter().next().ok_or_else(|| anyhow!("`main` returned nothing"))
}
