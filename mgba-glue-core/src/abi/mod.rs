//! mgba-glue ABI module
//!
//! This module defines the ABI contract between:
//! - **Host**: this crate (the adapter embedding the core with Wasmtime)
//! - **Native**: the precompiled mGBA libretro core, built to WebAssembly
//!
//! ## Model
//! The native core exports a flat C ABI. Every argument and return value is an
//! `i32`: integers, booleans (0 / non-zero) and *pointers*, which are byte offsets
//! into the core's exported linear memory (`memory`).
//!
//! The host never hands the core an explicit game-info structure. The ROM is
//! written into the core's virtual filesystem under [`ROM_DIR`] and
//! `retro_load_game(0)` is called; the core opens the file by path.
//!
//! ## Exports (native -> host)
//! All exports are optional. Emscripten builds prefix C symbols with `_`, so the
//! resolver tries the plain name first and then the prefixed one.
//!
//! ### Memory
//! - `malloc(size) -> ptr`
//! - `free(ptr)`
//! - `memcpy(dst, src, len) -> dst`
//! - `memset(dst, byte, len) -> dst`
//!
//! ### mGBA sensors / cartridge
//! - `mgba_set_accelerometer(vec3_ptr)`: three `f32` (x, y, z), little-endian
//! - `mgba_set_gyroscope(vec3_ptr)`
//! - `mgba_set_light_sensor(level)`
//! - `mgba_get_save_type() -> i32`
//!
//! ### libretro
//! - `retro_init()`, `retro_deinit()`, `retro_api_version() -> u32`
//! - `retro_get_system_info(out_ptr)`, `retro_get_system_av_info(out_ptr)`
//! - `retro_set_environment(cb)`, `retro_set_video_refresh(cb)`,
//!   `retro_set_audio_sample_batch(cb)`, `retro_set_input_poll(cb)`,
//!   `retro_set_input_state(cb)` (callbacks are function-table indices)
//! - `retro_reset()`, `retro_run()`
//! - `retro_serialize_size() -> size`, `retro_serialize(ptr, size) -> bool`,
//!   `retro_unserialize(ptr, size) -> bool`
//! - `retro_load_game(info_ptr) -> bool`, `retro_unload_game()`

use core::fmt;

use serde::Deserialize;

/// libretro API version the host was written against.
pub const LIBRETRO_API_VERSION: u32 = libretro_sys::API_VERSION;

/// Name of the exported linear memory.
pub const MEMORY_EXPORT: &str = "memory";

/// WASI reactor initializer, called once after instantiation when exported.
pub const REACTOR_INIT: &str = "_initialize";

/// Directory (in the core's virtual filesystem) that receives ROM images.
pub const ROM_DIR: &str = "/roms";

/// Filename used when the caller does not name the ROM.
pub const DEFAULT_ROM_NAME: &str = "rom.gba";

/// Size in bytes of a marshaled [`Vec3`].
pub const VEC3_SIZE: u32 = 12;

/// Native export names (plain, unprefixed).
pub mod native_exports {
    // Memory
    pub const MALLOC: &str = "malloc";
    pub const FREE: &str = "free";
    pub const MEMCPY: &str = "memcpy";
    pub const MEMSET: &str = "memset";

    // mGBA extensions
    pub const SET_ACCELEROMETER: &str = "mgba_set_accelerometer";
    pub const SET_GYROSCOPE: &str = "mgba_set_gyroscope";
    pub const SET_LIGHT_SENSOR: &str = "mgba_set_light_sensor";
    pub const GET_SAVE_TYPE: &str = "mgba_get_save_type";

    // libretro
    pub const INIT: &str = "retro_init";
    pub const DEINIT: &str = "retro_deinit";
    pub const API_VERSION: &str = "retro_api_version";
    pub const GET_SYSTEM_INFO: &str = "retro_get_system_info";
    pub const GET_SYSTEM_AV_INFO: &str = "retro_get_system_av_info";
    pub const SET_ENVIRONMENT: &str = "retro_set_environment";
    pub const SET_VIDEO_REFRESH: &str = "retro_set_video_refresh";
    pub const SET_AUDIO_SAMPLE_BATCH: &str = "retro_set_audio_sample_batch";
    pub const SET_INPUT_POLL: &str = "retro_set_input_poll";
    pub const SET_INPUT_STATE: &str = "retro_set_input_state";
    pub const RESET: &str = "retro_reset";
    pub const RUN: &str = "retro_run";
    pub const SERIALIZE_SIZE: &str = "retro_serialize_size";
    pub const SERIALIZE: &str = "retro_serialize";
    pub const UNSERIALIZE: &str = "retro_unserialize";
    pub const LOAD_GAME: &str = "retro_load_game";
    pub const UNLOAD_GAME: &str = "retro_unload_game";
}

/// The fixed, enumerated set of native entry points the adapter knows about.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Symbol {
    Allocate,
    Free,
    CopyMemory,
    SetMemory,
    SetAccelerometer,
    SetGyroscope,
    SetLightSensor,
    GetSaveType,
    Init,
    Deinit,
    ApiVersion,
    GetSystemInfo,
    GetSystemAvInfo,
    SetEnvironment,
    SetVideoRefresh,
    SetAudioSampleBatch,
    SetInputPoll,
    SetInputState,
    Reset,
    Run,
    SerializeSize,
    Serialize,
    Unserialize,
    LoadGame,
    UnloadGame,
}

impl Symbol {
    /// Every symbol, in resolution order.
    pub const ALL: [Symbol; 25] = [
        Symbol::Allocate,
        Symbol::Free,
        Symbol::CopyMemory,
        Symbol::SetMemory,
        Symbol::SetAccelerometer,
        Symbol::SetGyroscope,
        Symbol::SetLightSensor,
        Symbol::GetSaveType,
        Symbol::Init,
        Symbol::Deinit,
        Symbol::ApiVersion,
        Symbol::GetSystemInfo,
        Symbol::GetSystemAvInfo,
        Symbol::SetEnvironment,
        Symbol::SetVideoRefresh,
        Symbol::SetAudioSampleBatch,
        Symbol::SetInputPoll,
        Symbol::SetInputState,
        Symbol::Reset,
        Symbol::Run,
        Symbol::SerializeSize,
        Symbol::Serialize,
        Symbol::Unserialize,
        Symbol::LoadGame,
        Symbol::UnloadGame,
    ];

    /// Plain export name of this symbol.
    pub const fn export_name(self) -> &'static str {
        use native_exports as n;
        match self {
            Symbol::Allocate => n::MALLOC,
            Symbol::Free => n::FREE,
            Symbol::CopyMemory => n::MEMCPY,
            Symbol::SetMemory => n::MEMSET,
            Symbol::SetAccelerometer => n::SET_ACCELEROMETER,
            Symbol::SetGyroscope => n::SET_GYROSCOPE,
            Symbol::SetLightSensor => n::SET_LIGHT_SENSOR,
            Symbol::GetSaveType => n::GET_SAVE_TYPE,
            Symbol::Init => n::INIT,
            Symbol::Deinit => n::DEINIT,
            Symbol::ApiVersion => n::API_VERSION,
            Symbol::GetSystemInfo => n::GET_SYSTEM_INFO,
            Symbol::GetSystemAvInfo => n::GET_SYSTEM_AV_INFO,
            Symbol::SetEnvironment => n::SET_ENVIRONMENT,
            Symbol::SetVideoRefresh => n::SET_VIDEO_REFRESH,
            Symbol::SetAudioSampleBatch => n::SET_AUDIO_SAMPLE_BATCH,
            Symbol::SetInputPoll => n::SET_INPUT_POLL,
            Symbol::SetInputState => n::SET_INPUT_STATE,
            Symbol::Reset => n::RESET,
            Symbol::Run => n::RUN,
            Symbol::SerializeSize => n::SERIALIZE_SIZE,
            Symbol::Serialize => n::SERIALIZE,
            Symbol::Unserialize => n::UNSERIALIZE,
            Symbol::LoadGame => n::LOAD_GAME,
            Symbol::UnloadGame => n::UNLOAD_GAME,
        }
    }

    /// Export name as emitted by Emscripten (`_` + C name).
    pub fn prefixed_name(self) -> String {
        format!("_{}", self.export_name())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.export_name())
    }
}

/// A byte offset into the core's linear memory. `0` is the null pointer.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct GuestPtr(pub u32);

impl GuestPtr {
    pub const NULL: GuestPtr = GuestPtr(0);

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

/// Three-axis sensor sample handed to the core.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Wire layout: x, y, z as little-endian `f32`.
    pub fn to_le_bytes(self) -> [u8; VEC3_SIZE as usize] {
        let mut out = [0u8; VEC3_SIZE as usize];
        out[0..4].copy_from_slice(&self.x.to_le_bytes());
        out[4..8].copy_from_slice(&self.y.to_le_bytes());
        out[8..12].copy_from_slice(&self.z.to_le_bytes());
        out
    }
}

/// Cartridge save memory kinds reported by `mgba_get_save_type`.
///
/// Values follow mGBA's `SavedataType`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SaveType {
    Autodetect,
    None,
    Sram,
    Flash512,
    Flash1M,
    Eeprom,
    Eeprom512,
    Sram512,
    Unknown(i32),
}

impl From<i32> for SaveType {
    fn from(code: i32) -> Self {
        match code {
            -1 => SaveType::Autodetect,
            0 => SaveType::None,
            1 => SaveType::Sram,
            2 => SaveType::Flash512,
            3 => SaveType::Flash1M,
            4 => SaveType::Eeprom,
            5 => SaveType::Eeprom512,
            6 => SaveType::Sram512,
            other => SaveType::Unknown(other),
        }
    }
}

/// What to do with module imports the host does not provide.
///
/// Emscripten builds import a handful of runtime helpers from `env`; most cores
/// never reach them on the paths this adapter drives.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnknownImports {
    /// Satisfy them with functions that trap when called.
    #[default]
    Trap,
    /// Fail instantiation.
    Reject,
}
