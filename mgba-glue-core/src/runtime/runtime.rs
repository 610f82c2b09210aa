//! Wasmtime-backed runtime glue for mgba-glue.
//!
//! Responsibilities:
//! - Create a Wasmtime `Engine` with the feature flags native cores are built against.
//! - Build the per-module `Store` (WASI context with the optional filesystem preopen).
//! - Instantiate a compiled `wasmtime::Module` and run its reactor initializer.

use std::path::PathBuf;

use crate::abi::{self, UnknownImports};

use super::imports::HostImports;

use wasmtime::{Engine, Instance, Linker, Module, Store};
use wasmtime_wasi::p1::WasiP1Ctx;
use wasmtime_wasi::{DirPerms, FilePerms, WasiCtxBuilder};

/// Per-store host data.
pub struct HostState {
    pub wasi: WasiP1Ctx,
}

/// Options that shape the store a module is instantiated into.
#[derive(Clone, Debug, Default)]
pub struct RuntimeOptions {
    /// Host directory mounted at `/` in the core's virtual filesystem.
    pub fs_root: Option<PathBuf>,
    pub unknown_imports: UnknownImports,
    pub inherit_stdio: bool,
}

/// Create an engine with a broad set of WebAssembly features enabled.
///
/// Emscripten and wasi-sdk builds of the core routinely use bulk memory, SIMD and
/// multi-value; threads are enabled so shared-memory builds at least validate.
pub fn default_engine() -> Result<Engine, anyhow::Error> {
    let mut cfg = wasmtime::Config::new();

    cfg.wasm_multi_value(true);
    cfg.wasm_bulk_memory(true);
    cfg.wasm_reference_types(true);
    cfg.wasm_simd(true);

    cfg.wasm_multi_memory(true);
    cfg.wasm_tail_call(true);
    cfg.wasm_threads(true);

    Engine::new(&cfg)
}

/// Host-side runtime container for one native module.
pub struct WasmtimeRuntime {
    pub engine: Engine,
    pub store: Store<HostState>,
    pub linker: Linker<HostState>,
    unknown_imports: UnknownImports,
}

impl WasmtimeRuntime {
    /// Create a store and linker on `engine`.
    ///
    /// `engine` must be the engine the module was compiled with.
    pub fn new(engine: Engine, options: &RuntimeOptions) -> Result<Self, anyhow::Error> {
        let mut wasi = WasiCtxBuilder::new();
        if options.inherit_stdio {
            wasi.inherit_stdio();
        }
        if let Some(root) = &options.fs_root {
            wasi.preopened_dir(root, "/", DirPerms::all(), FilePerms::all())?;
        }

        let store = Store::new(
            &engine,
            HostState {
                wasi: wasi.build_p1(),
            },
        );
        let linker = Linker::new(&engine);

        Ok(Self {
            engine,
            store,
            linker,
            unknown_imports: options.unknown_imports,
        })
    }

    /// Link host imports for `module`, instantiate it and run `_initialize` if exported.
    pub fn instantiate(
        &mut self,
        module: &Module,
        host_imports: Option<&HostImports>,
    ) -> Result<Instance, anyhow::Error> {
        super::imports::define_imports(
            &mut self.linker,
            module,
            self.unknown_imports,
            host_imports,
        )?;

        let instance = self.linker.instantiate(&mut self.store, module)?;

        if let Ok(init) = instance.get_typed_func::<(), ()>(&mut self.store, abi::REACTOR_INIT) {
            tracing::debug!("running reactor initializer");
            init.call(&mut self.store, ())?;
        }

        Ok(instance)
    }

    /// Hand the store over to the module handle.
    pub fn into_store(self) -> Store<HostState> {
        self.store
    }
}
