//! Host import definitions for the Wasmtime runtime.
//!
//! The core needs WASI preview1 (for its virtual filesystem and stdio). Emscripten
//! builds also import `env` helpers (`emscripten_resize_heap`, ...) that the host
//! supplies through [`HostImports`]. Anything left is handled according to
//! [`UnknownImports`].

use crate::abi::UnknownImports;

use super::runtime::HostState;
use wasmtime::{ExternType, Linker, Module};

/// Host-supplied imports, linked after WASI and before the unknown-import policy.
pub type HostImports =
    Box<dyn Fn(&mut Linker<HostState>) -> Result<(), anyhow::Error> + Send + Sync>;

/// Define all host imports for `module`.
///
/// Must be called before instantiating the module.
pub fn define_imports(
    linker: &mut Linker<HostState>,
    module: &Module,
    policy: UnknownImports,
    host: Option<&HostImports>,
) -> Result<(), anyhow::Error> {
    wasmtime_wasi::p1::add_to_linker_sync(linker, |state: &mut HostState| &mut state.wasi)?;

    if let Some(host) = host {
        host(linker)?;
    }

    for import in module.imports() {
        if import.module() == "env" && matches!(import.ty(), ExternType::Func(_)) {
            tracing::debug!(name = import.name(), "native module imports env function");
        }
    }

    match policy {
        UnknownImports::Trap => linker.define_unknown_imports_as_traps(module)?,
        UnknownImports::Reject => {}
    }

    Ok(())
}
