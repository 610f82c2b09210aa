//! Wasmtime-backed runtime glue for mgba-glue.
//!
//! Responsibilities:
//! - Create a Wasmtime `Engine`/`Store` with feature flags enabled.
//! - Link WASI preview1 (the core's virtual filesystem), host-supplied imports,
//!   and stub unknown imports.
//! - Instantiate a compiled `wasmtime::Module`.
//!
//! Export resolution lives in `crate::resolve::FunctionTable`.

pub mod imports;
pub mod runtime;

pub use imports::HostImports;
pub use runtime::{HostState, RuntimeOptions, WasmtimeRuntime, default_engine};
