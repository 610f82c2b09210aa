//! The adapter: one instance per native core.
//!
//! Lifecycle:
//! 1. [`Adapter::init_module`] waits for the module source, instantiates it,
//!    resolves the [`FunctionTable`] and resolves the readiness signal.
//! 2. [`Adapter::load_rom`] fetches a ROM into the virtual filesystem and asks
//!    the core to load it.
//! 3. Sensor setters / [`Adapter::run_frame`] drive the core.
//!
//! Everything the adapter knows about the core lives in its [`NativeModule`];
//! there is no process-wide state, so independent adapters can coexist.

use std::path::PathBuf;

use serde::Deserialize;
use tokio::sync::oneshot;
use wasmtime::{Engine, Instance, Linker, Memory, Module, Store, TypedFunc};

use crate::abi::{
    self, DEFAULT_ROM_NAME, GuestPtr, LIBRETRO_API_VERSION, ROM_DIR, SaveType, Symbol,
    UnknownImports, Vec3,
};
use crate::error::{GlueError, GlueResult};
use crate::fetch::{HttpFetcher, RomFetcher};
use crate::fs::{self, HostDirFs, VirtualFs};
use crate::marshal::{self, Allocator};
use crate::resolve::FunctionTable;
use crate::runtime::{self, HostImports, HostState, RuntimeOptions, WasmtimeRuntime};
use crate::sensors::{SensorEvent, SensorSink, SensorSource};
use crate::state::{ReadySignal, ReadyWaiter};

/// Adapter configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Host directory backing the core's virtual filesystem. Without it the
    /// core has no filesystem and ROMs cannot be loaded.
    pub fs_root: Option<PathBuf>,
    pub unknown_imports: UnknownImports,
    /// Filename used by [`Adapter::load_rom`] when none is given.
    pub default_rom_name: String,
    /// Forward the core's stdout/stderr to the host process.
    pub inherit_stdio: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            fs_root: None,
            unknown_imports: UnknownImports::default(),
            default_rom_name: DEFAULT_ROM_NAME.to_string(),
            inherit_stdio: false,
        }
    }
}

/// Where the native module comes from.
pub enum ModuleSource {
    /// Compiled by the host already (any engine).
    Compiled(Module),
    /// Raw `.wasm` or `.wat` bytes, compiled with the adapter's engine.
    Buffer(Vec<u8>),
    /// Bytes the host delivers later; initialization waits for them.
    Deferred(oneshot::Receiver<Vec<u8>>),
}

/// Summary of an initialized module, carried by the readiness signal.
#[derive(Clone, Debug, PartialEq)]
pub struct ModuleInfo {
    pub resolved: Vec<Symbol>,
    pub api_version: Option<u32>,
    pub has_memory: bool,
    pub has_filesystem: bool,
}

/// Outcome of [`Adapter::load_rom`].
#[derive(Clone, Debug, PartialEq)]
pub struct RomLoaded {
    /// Virtual path the ROM was written to.
    pub path: String,
    pub len: usize,
    /// `retro_load_game`'s verdict, or `None` if the core does not export it.
    pub accepted: Option<bool>,
}

/// The instantiated core and everything resolved from it.
pub struct NativeModule {
    store: Store<HostState>,
    instance: Instance,
    memory: Option<Memory>,
    table: FunctionTable,
    fs: Option<HostDirFs>,
}

impl NativeModule {
    pub fn table(&self) -> &FunctionTable {
        &self.table
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn memory(&self) -> Option<Memory> {
        self.memory
    }

    pub fn filesystem(&self) -> Option<&HostDirFs> {
        self.fs.as_ref()
    }

    pub fn store_mut(&mut self) -> &mut Store<HostState> {
        &mut self.store
    }
}

#[derive(Copy, Clone, Debug)]
enum VectorSensor {
    Accelerometer,
    Gyroscope,
}

/// Host adapter for one native core.
pub struct Adapter<F = HttpFetcher> {
    config: AdapterConfig,
    engine: Engine,
    fetcher: F,
    module: Option<NativeModule>,
    ready: ReadySignal<ModuleInfo>,
    host_imports: Option<HostImports>,
    sensors: SensorSink,
}

impl Adapter<HttpFetcher> {
    pub fn new(config: AdapterConfig) -> GlueResult<Self> {
        Self::with_fetcher(config, HttpFetcher::default())
    }
}

impl<F: RomFetcher> Adapter<F> {
    pub fn with_fetcher(config: AdapterConfig, fetcher: F) -> GlueResult<Self> {
        let engine = runtime::default_engine().map_err(GlueError::Instantiation)?;
        Ok(Self {
            config,
            engine,
            fetcher,
            module: None,
            ready: ReadySignal::new(),
            host_imports: None,
            sensors: SensorSink::new(),
        })
    }

    /// Supply imports the core expects from its host (Emscripten `env`
    /// helpers and the like). `define` runs on every instantiation, after WASI
    /// is linked and before unresolved imports get the
    /// [`UnknownImports`] treatment.
    pub fn with_imports(
        mut self,
        define: impl Fn(&mut Linker<HostState>) -> anyhow::Result<()> + Send + Sync + 'static,
    ) -> Self {
        self.host_imports = Some(Box::new(define));
        self
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Engine used for [`ModuleSource::Buffer`] / [`ModuleSource::Deferred`].
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn module(&self) -> Option<&NativeModule> {
        self.module.as_ref()
    }

    pub fn module_mut(&mut self) -> Option<&mut NativeModule> {
        self.module.as_mut()
    }

    pub fn is_initialized(&self) -> bool {
        self.module.is_some()
    }

    /// Handle that resolves once [`Adapter::init_module`] succeeds.
    pub fn ready(&self) -> ReadyWaiter<ModuleInfo> {
        self.ready.waiter()
    }

    /// Instantiate the native module and resolve its exports.
    ///
    /// Only the first successful call initializes; later calls fail with
    /// [`GlueError::AlreadyInitialized`] and leave the loaded module and the
    /// readiness signal untouched.
    pub async fn init_module(&mut self, source: ModuleSource) -> GlueResult<ModuleInfo> {
        if self.module.is_some() {
            tracing::warn!("init_module called on an initialized adapter");
            return Err(GlueError::AlreadyInitialized);
        }

        let module = match source {
            ModuleSource::Compiled(module) => module,
            ModuleSource::Buffer(bytes) => self.compile(&bytes)?,
            ModuleSource::Deferred(rx) => {
                tracing::debug!("waiting for the host to deliver the native module");
                let bytes = rx.await.map_err(|_| {
                    GlueError::Instantiation(anyhow::anyhow!(
                        "host dropped the module source before delivering it"
                    ))
                })?;
                self.compile(&bytes)?
            }
        };

        if let Some(root) = &self.config.fs_root {
            std::fs::create_dir_all(root)?;
        }
        let options = RuntimeOptions {
            fs_root: self.config.fs_root.clone(),
            unknown_imports: self.config.unknown_imports,
            inherit_stdio: self.config.inherit_stdio,
        };

        let mut rt = WasmtimeRuntime::new(module.engine().clone(), &options)
            .map_err(GlueError::Instantiation)?;
        let instance = rt
            .instantiate(&module, self.host_imports.as_ref())
            .map_err(GlueError::Instantiation)?;
        let mut store = rt.into_store();

        let memory = instance.get_memory(&mut store, abi::MEMORY_EXPORT);
        let table = FunctionTable::resolve(&instance, &mut store);
        let api_version = match &table.api_version {
            Some(f) => match f.call(&mut store, ()) {
                Ok(v) => Some(v),
                Err(e) => {
                    tracing::warn!(error = %e, "retro_api_version trapped");
                    None
                }
            },
            None => None,
        };
        if let Some(v) = api_version.filter(|v| *v != LIBRETRO_API_VERSION) {
            tracing::warn!(
                core = v,
                host = LIBRETRO_API_VERSION,
                "libretro API version mismatch"
            );
        }

        let info = ModuleInfo {
            resolved: table.resolved().collect(),
            api_version,
            has_memory: memory.is_some(),
            has_filesystem: self.config.fs_root.is_some(),
        };

        self.module = Some(NativeModule {
            store,
            instance,
            memory,
            table,
            fs: self.config.fs_root.clone().map(HostDirFs::new),
        });
        self.ready.resolve(info.clone());

        tracing::info!(
            resolved = info.resolved.len(),
            api_version = ?info.api_version,
            filesystem = info.has_filesystem,
            "native module ready"
        );
        Ok(info)
    }

    fn compile(&self, bytes: &[u8]) -> GlueResult<Module> {
        crate::loader::compile_module(&self.engine, bytes)
            .map_err(|e| GlueError::Instantiation(e.into()))
    }

    /// Fetch a ROM into `/roms/<filename>` and ask the core to load it.
    ///
    /// The filesystem capability is checked before any network I/O. A failed
    /// fetch leaves the filesystem untouched.
    pub async fn load_rom(&mut self, url: &str, filename: Option<&str>) -> GlueResult<RomLoaded> {
        let name = filename.unwrap_or(&self.config.default_rom_name).to_string();
        if !fs::is_plain_file_name(&name) {
            return Err(GlueError::InvalidRomName(name));
        }

        let module = self.module.as_mut().ok_or(GlueError::NotInitialized)?;
        let Some(vfs) = module.fs.as_mut() else {
            return Err(GlueError::Capability("filesystem"));
        };

        let data = self.fetcher.fetch(url).await?;
        let path = stage_rom(vfs, &name, &data)?;
        tracing::info!(url, path = %path, len = data.len(), "ROM written to virtual filesystem");

        let accepted = match &module.table.load_game {
            Some(load_game) => {
                let ok = load_game
                    .call(&mut module.store, GuestPtr::NULL.0)
                    .map_err(GlueError::Trap)?;
                if ok == 0 {
                    tracing::warn!(path = %path, "core rejected the ROM");
                }
                Some(ok != 0)
            }
            None => {
                tracing::warn!("core does not export retro_load_game; ROM staged only");
                None
            }
        };

        Ok(RomLoaded {
            path,
            len: data.len(),
            accepted,
        })
    }

    pub fn set_accelerometer(&mut self, x: f32, y: f32, z: f32) -> GlueResult<()> {
        self.set_vector(VectorSensor::Accelerometer, Vec3::new(x, y, z))
    }

    pub fn set_gyroscope(&mut self, x: f32, y: f32, z: f32) -> GlueResult<()> {
        self.set_vector(VectorSensor::Gyroscope, Vec3::new(x, y, z))
    }

    pub fn set_light(&mut self, level: i32) -> GlueResult<()> {
        let Some(m) = self.module.as_mut() else {
            return Ok(());
        };
        let Some(setter) = &m.table.set_light_sensor else {
            return Ok(());
        };
        setter.call(&mut m.store, level).map_err(GlueError::Trap)
    }

    fn set_vector(&mut self, sensor: VectorSensor, v: Vec3) -> GlueResult<()> {
        let Some(m) = self.module.as_mut() else {
            return Ok(());
        };
        let setter = match sensor {
            VectorSensor::Accelerometer => m.table.set_accelerometer.as_ref(),
            VectorSensor::Gyroscope => m.table.set_gyroscope.as_ref(),
        };
        let Some(setter) = setter else {
            return Ok(());
        };
        let allocator = Allocator {
            malloc: m.table.malloc.as_ref(),
            free: m.table.free.as_ref(),
        };

        marshal::with_vec3(&mut m.store, m.memory, allocator, v, |store, ptr| {
            if ptr.is_null() {
                tracing::debug!(?sensor, "no native allocator; sample dropped");
                return Ok(());
            }
            setter.call(store, ptr.0).map_err(GlueError::Trap)
        })
    }

    /// A sink feeding this adapter's sensor slots.
    pub fn sensor_sink(&self) -> SensorSink {
        self.sensors.clone()
    }

    /// Wire a host event source to this adapter.
    pub fn bind_sensors(&self, source: &mut impl SensorSource) {
        source.bind(self.sensor_sink());
    }

    /// Apply the latest pending reading of each sensor. Returns how many were
    /// applied.
    ///
    /// Readings that arrived since the last pump replace each other; only the
    /// newest per sensor reaches the core. A failing reading is logged and skipped.
    pub fn pump_sensors(&mut self) -> usize {
        let pending = self.sensors.take();

        for event in pending.events() {
            let result = match event {
                SensorEvent::Accelerometer(v) => {
                    self.set_vector(VectorSensor::Accelerometer, v)
                }
                SensorEvent::Gyroscope(v) => self.set_vector(VectorSensor::Gyroscope, v),
                SensorEvent::Light(level) => self.set_light(level),
            };
            if let Err(e) = result {
                tracing::warn!(?event, error = %e, "failed to apply sensor reading");
            }
        }
        pending.len()
    }

    /// `retro_init`. Returns whether the core exports it.
    pub fn retro_init(&mut self) -> GlueResult<bool> {
        self.call_unit(Symbol::Init, |t| t.init.as_ref())
    }

    /// `retro_deinit`. Returns whether the core exports it.
    pub fn retro_deinit(&mut self) -> GlueResult<bool> {
        self.call_unit(Symbol::Deinit, |t| t.deinit.as_ref())
    }

    /// Apply pending sensor readings, then run one frame.
    pub fn run_frame(&mut self) -> GlueResult<bool> {
        self.pump_sensors();
        self.call_unit(Symbol::Run, |t| t.run.as_ref())
    }

    pub fn reset(&mut self) -> GlueResult<bool> {
        self.call_unit(Symbol::Reset, |t| t.reset.as_ref())
    }

    pub fn unload_game(&mut self) -> GlueResult<bool> {
        self.call_unit(Symbol::UnloadGame, |t| t.unload_game.as_ref())
    }

    fn call_unit(
        &mut self,
        symbol: Symbol,
        pick: fn(&FunctionTable) -> Option<&TypedFunc<(), ()>>,
    ) -> GlueResult<bool> {
        let Some(m) = self.module.as_mut() else {
            return Ok(false);
        };
        let Some(func) = pick(&m.table) else {
            tracing::trace!(%symbol, "not exported; skipping");
            return Ok(false);
        };
        func.call(&mut m.store, ()).map_err(GlueError::Trap)?;
        Ok(true)
    }

    pub fn api_version(&mut self) -> GlueResult<Option<u32>> {
        let Some(m) = self.module.as_mut() else {
            return Ok(None);
        };
        let Some(f) = &m.table.api_version else {
            return Ok(None);
        };
        f.call(&mut m.store, ()).map(Some).map_err(GlueError::Trap)
    }

    pub fn save_type(&mut self) -> GlueResult<Option<SaveType>> {
        let Some(m) = self.module.as_mut() else {
            return Ok(None);
        };
        let Some(f) = &m.table.get_save_type else {
            return Ok(None);
        };
        let code = f.call(&mut m.store, ()).map_err(GlueError::Trap)?;
        Ok(Some(SaveType::from(code)))
    }

    /// Serialize the core's state.
    ///
    /// `None` when the core cannot serialize (missing exports, zero size, or the
    /// core reported failure).
    pub fn save_state(&mut self) -> GlueResult<Option<Vec<u8>>> {
        let Some(m) = self.module.as_mut() else {
            return Ok(None);
        };
        let (Some(size_fn), Some(serialize)) = (&m.table.serialize_size, &m.table.serialize) else {
            return Ok(None);
        };
        let size = size_fn.call(&mut m.store, ()).map_err(GlueError::Trap)?;
        if size == 0 {
            return Ok(None);
        }
        let memory = m
            .memory
            .ok_or(GlueError::Capability("exported linear memory"))?;
        let allocator = Allocator {
            malloc: m.table.malloc.as_ref(),
            free: m.table.free.as_ref(),
        };

        let (ok, bytes) = marshal::with_out_buffer(&mut m.store, memory, allocator, size, |store, ptr| {
            serialize.call(store, (ptr.0, size)).map_err(GlueError::Trap)
        })?;
        if ok == 0 {
            tracing::warn!(size, "retro_serialize reported failure");
            return Ok(None);
        }
        Ok(Some(bytes))
    }

    /// Restore a state produced by [`Adapter::save_state`]. Returns the core's verdict;
    /// `false` when the core does not export `retro_unserialize`.
    pub fn load_state(&mut self, data: &[u8]) -> GlueResult<bool> {
        let Some(m) = self.module.as_mut() else {
            return Err(GlueError::NotInitialized);
        };
        let Some(unserialize) = &m.table.unserialize else {
            return Ok(false);
        };
        if m.table.malloc.is_none() {
            return Err(GlueError::Capability("native allocator"));
        }
        let memory = m
            .memory
            .ok_or(GlueError::Capability("exported linear memory"))?;
        let allocator = Allocator {
            malloc: m.table.malloc.as_ref(),
            free: m.table.free.as_ref(),
        };
        let len = data.len() as u32;

        let ok = marshal::with_bytes(&mut m.store, Some(memory), allocator, data, |store, ptr| {
            if ptr.is_null() {
                return Err(GlueError::Capability("native allocator"));
            }
            unserialize.call(store, (ptr.0, len)).map_err(GlueError::Trap)
        })?;
        Ok(ok != 0)
    }
}

/// Recreate [`ROM_DIR`] and write the ROM into it. Returns the virtual path.
pub fn stage_rom(vfs: &mut dyn VirtualFs, name: &str, data: &[u8]) -> std::io::Result<String> {
    if vfs.exists(ROM_DIR) {
        vfs.remove_dir_all(ROM_DIR)?;
    }
    vfs.create_dir(ROM_DIR)?;
    let path = format!("{ROM_DIR}/{name}");
    vfs.write_file(&path, data)?;
    Ok(path)
}
