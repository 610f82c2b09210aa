//! mgba-glue: a host adapter for a WebAssembly build of the mGBA libretro core.
//!
//! The core is an Emscripten-style module that exports libretro entry points,
//! mGBA sensor setters (`mgba_set_accelerometer`, ...) and its own allocator.
//! This crate:
//! - instantiates the core once and resolves its exports into a typed table;
//! - downloads ROMs into the core's virtual filesystem (`/roms/<name>`);
//! - forwards host motion sensors, marshaling vectors through native memory.
//!
//! The entry point is [`Adapter`]. Host event shapes live in [`sensors`].
//!
//! ```no_run
//! # async fn demo() -> mgba_glue::GlueResult<()> {
//! use mgba_glue::{Adapter, AdapterConfig, ModuleSource};
//!
//! let config = AdapterConfig {
//!     fs_root: Some("/tmp/mgba-fs".into()),
//!     ..AdapterConfig::default()
//! };
//! let mut adapter = Adapter::new(config)?;
//! let core = std::fs::read("mgba_libretro.wasm")?;
//! adapter.init_module(ModuleSource::Buffer(core)).await?;
//! adapter.load_rom("https://example.com/game.gba", None).await?;
//! adapter.set_accelerometer(0.0, 0.0, 9.8)?;
//! adapter.run_frame()?;
//! # Ok(())
//! # }
//! ```

pub mod abi;
pub mod adapter;
pub mod error;
pub mod fetch;
pub mod fs;
pub mod loader;
pub mod marshal;
pub mod resolve;
pub mod runtime;
pub mod sensors;
pub mod state;

#[cfg(test)]
mod testing;

pub use abi::{SaveType, Symbol, UnknownImports, Vec3};
pub use adapter::{Adapter, AdapterConfig, ModuleInfo, ModuleSource, NativeModule, RomLoaded};
pub use error::{GlueError, GlueResult};
pub use fetch::{HttpFetcher, RomFetcher};
pub use runtime::{HostImports, HostState};
pub use sensors::{
    BrowserSensors, MiniProgramSensors, PendingSensors, SensorEvent, SensorSink, SensorSource,
};
