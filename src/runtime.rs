use crate::host::HostStore;
use crate::mode::AnalysisMode;
use crate::module::ModuleTaint;

/// Initial linear memory (in pages) shadowed for a module-side run.
pub const DEFAULT_MEMORY_PAGES: usize = 1;

/// All taint state of one benchmark-variant run.
///
/// Created at the start of the run and dropped at its end; it is handed by
/// reference to every instrumented call site and to the interop adapter. A
/// new run always gets a new runtime, so no flag outlives its run.
#[derive(Debug)]
pub struct TaintRuntime {
    mode: AnalysisMode,
    pub host: HostStore,
    pub module: ModuleTaint,
}
impl TaintRuntime {
    pub fn new(mode: AnalysisMode) -> Self {
        let host = if mode.tracks_host_values() {
            HostStore::new()
        } else {
            HostStore::inert()
        };
        let module = if mode.tracks_linear_memory() {
            ModuleTaint::new(DEFAULT_MEMORY_PAGES)
        } else {
            ModuleTaint::inert()
        };
        tracing::debug!(%mode, host = host.is_live(), module = module.is_live(), "new taint runtime");
        Self { mode, host, module }
    }
    pub fn mode(&self) -> AnalysisMode {
        self.mode
    }
}
