//! Native export resolution.
//!
//! [`FunctionTable`] is built once after instantiation and is read-only afterwards.
//! Every entry is optional: a core built without some export simply leaves that
//! entry empty and the calls that need it become no-ops.
//!
//! Lookup order per symbol:
//! 1. plain export name (`retro_run`)
//! 2. Emscripten-prefixed name (`_retro_run`)
//! 3. absent
//!
//! A found export is wrapped as a typed function of the symbol's fixed signature.
//! A signature mismatch is logged and treated as absent; it never aborts the pass.

use crate::abi::Symbol;

use wasmtime::{Func, Instance, Store, TypedFunc, WasmParams, WasmResults};

/// Typed view of the native module's exported entry points.
#[derive(Clone, Default)]
pub struct FunctionTable {
    pub malloc: Option<TypedFunc<u32, u32>>,
    pub free: Option<TypedFunc<u32, ()>>,
    pub memcpy: Option<TypedFunc<(u32, u32, u32), u32>>,
    pub memset: Option<TypedFunc<(u32, i32, u32), u32>>,

    pub set_accelerometer: Option<TypedFunc<u32, ()>>,
    pub set_gyroscope: Option<TypedFunc<u32, ()>>,
    pub set_light_sensor: Option<TypedFunc<i32, ()>>,
    pub get_save_type: Option<TypedFunc<(), i32>>,

    pub init: Option<TypedFunc<(), ()>>,
    pub deinit: Option<TypedFunc<(), ()>>,
    pub api_version: Option<TypedFunc<(), u32>>,
    pub get_system_info: Option<TypedFunc<u32, ()>>,
    pub get_system_av_info: Option<TypedFunc<u32, ()>>,
    pub set_environment: Option<TypedFunc<u32, ()>>,
    pub set_video_refresh: Option<TypedFunc<u32, ()>>,
    pub set_audio_sample_batch: Option<TypedFunc<u32, ()>>,
    pub set_input_poll: Option<TypedFunc<u32, ()>>,
    pub set_input_state: Option<TypedFunc<u32, ()>>,
    pub reset: Option<TypedFunc<(), ()>>,
    pub run: Option<TypedFunc<(), ()>>,
    pub serialize_size: Option<TypedFunc<(), u32>>,
    pub serialize: Option<TypedFunc<(u32, u32), u32>>,
    pub unserialize: Option<TypedFunc<(u32, u32), u32>>,
    pub load_game: Option<TypedFunc<u32, u32>>,
    pub unload_game: Option<TypedFunc<(), ()>>,
}

impl FunctionTable {
    /// Resolve every [`Symbol`] against `instance`.
    pub fn resolve<T: 'static>(instance: &Instance, store: &mut Store<T>) -> Self {
        let mut r = Resolver { instance, store };

        let table = Self {
            malloc: r.typed(Symbol::Allocate),
            free: r.typed(Symbol::Free),
            memcpy: r.typed(Symbol::CopyMemory),
            memset: r.typed(Symbol::SetMemory),
            set_accelerometer: r.typed(Symbol::SetAccelerometer),
            set_gyroscope: r.typed(Symbol::SetGyroscope),
            set_light_sensor: r.typed(Symbol::SetLightSensor),
            get_save_type: r.typed(Symbol::GetSaveType),
            init: r.typed(Symbol::Init),
            deinit: r.typed(Symbol::Deinit),
            api_version: r.typed(Symbol::ApiVersion),
            get_system_info: r.typed(Symbol::GetSystemInfo),
            get_system_av_info: r.typed(Symbol::GetSystemAvInfo),
            set_environment: r.typed(Symbol::SetEnvironment),
            set_video_refresh: r.typed(Symbol::SetVideoRefresh),
            set_audio_sample_batch: r.typed(Symbol::SetAudioSampleBatch),
            set_input_poll: r.typed(Symbol::SetInputPoll),
            set_input_state: r.typed(Symbol::SetInputState),
            reset: r.typed(Symbol::Reset),
            run: r.typed(Symbol::Run),
            serialize_size: r.typed(Symbol::SerializeSize),
            serialize: r.typed(Symbol::Serialize),
            unserialize: r.typed(Symbol::Unserialize),
            load_game: r.typed(Symbol::LoadGame),
            unload_game: r.typed(Symbol::UnloadGame),
        };

        tracing::debug!(
            resolved = table.resolved().count(),
            total = Symbol::ALL.len(),
            "resolved native exports"
        );
        table
    }

    /// Whether `symbol` resolved to a callable wrapper.
    pub fn is_resolved(&self, symbol: Symbol) -> bool {
        match symbol {
            Symbol::Allocate => self.malloc.is_some(),
            Symbol::Free => self.free.is_some(),
            Symbol::CopyMemory => self.memcpy.is_some(),
            Symbol::SetMemory => self.memset.is_some(),
            Symbol::SetAccelerometer => self.set_accelerometer.is_some(),
            Symbol::SetGyroscope => self.set_gyroscope.is_some(),
            Symbol::SetLightSensor => self.set_light_sensor.is_some(),
            Symbol::GetSaveType => self.get_save_type.is_some(),
            Symbol::Init => self.init.is_some(),
            Symbol::Deinit => self.deinit.is_some(),
            Symbol::ApiVersion => self.api_version.is_some(),
            Symbol::GetSystemInfo => self.get_system_info.is_some(),
            Symbol::GetSystemAvInfo => self.get_system_av_info.is_some(),
            Symbol::SetEnvironment => self.set_environment.is_some(),
            Symbol::SetVideoRefresh => self.set_video_refresh.is_some(),
            Symbol::SetAudioSampleBatch => self.set_audio_sample_batch.is_some(),
            Symbol::SetInputPoll => self.set_input_poll.is_some(),
            Symbol::SetInputState => self.set_input_state.is_some(),
            Symbol::Reset => self.reset.is_some(),
            Symbol::Run => self.run.is_some(),
            Symbol::SerializeSize => self.serialize_size.is_some(),
            Symbol::Serialize => self.serialize.is_some(),
            Symbol::Unserialize => self.unserialize.is_some(),
            Symbol::LoadGame => self.load_game.is_some(),
            Symbol::UnloadGame => self.unload_game.is_some(),
        }
    }

    /// Symbols that resolved, in [`Symbol::ALL`] order.
    pub fn resolved(&self) -> impl Iterator<Item = Symbol> + '_ {
        Symbol::ALL.into_iter().filter(|s| self.is_resolved(*s))
    }
}

struct Resolver<'a, T: 'static> {
    instance: &'a Instance,
    store: &'a mut Store<T>,
}

impl<T: 'static> Resolver<'_, T> {
    fn lookup(&mut self, symbol: Symbol) -> Option<Func> {
        if let Some(func) = self.instance.get_func(&mut *self.store, symbol.export_name()) {
            return Some(func);
        }
        self.instance
            .get_func(&mut *self.store, &symbol.prefixed_name())
    }

    fn typed<P, R>(&mut self, symbol: Symbol) -> Option<TypedFunc<P, R>>
    where
        P: WasmParams,
        R: WasmResults,
    {
        let func = self.lookup(symbol)?;
        match func.typed::<P, R>(&*self.store) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::warn!(%symbol, error = %e, "native export has unexpected signature; ignoring");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use wasmtime::{Engine, Module, Store};

    fn resolve_wat(wat: &str) -> FunctionTable {
        let engine = Engine::default();
        let module = Module::new(&engine, wat).unwrap();
        let mut store = Store::new(&engine, ());
        let instance = Instance::new(&mut store, &module, &[]).unwrap();
        FunctionTable::resolve(&instance, &mut store)
    }

    #[test]
    fn full_core_resolves_every_symbol() {
        let table = resolve_wat(testing::FULL_CORE_WAT);
        for symbol in Symbol::ALL {
            assert!(table.is_resolved(symbol), "{symbol} should resolve");
        }
    }

    #[test]
    fn empty_module_resolves_nothing() {
        let table = resolve_wat("(module)");
        assert_eq!(table.resolved().count(), 0);
        for symbol in Symbol::ALL {
            assert!(!table.is_resolved(symbol));
        }
    }

    #[test]
    fn falls_back_to_emscripten_prefix() {
        let table = resolve_wat(
            r#"(module
                (func (export "_mgba_set_light_sensor") (param i32))
                (func (export "_retro_run")))"#,
        );
        assert!(table.is_resolved(Symbol::SetLightSensor));
        assert!(table.is_resolved(Symbol::Run));
        assert_eq!(table.resolved().count(), 2);
    }

    #[test]
    fn plain_name_wins_over_prefixed() {
        let engine = Engine::default();
        let module = Module::new(
            &engine,
            r#"(module
                (func (export "retro_api_version") (result i32) i32.const 1)
                (func (export "_retro_api_version") (result i32) i32.const 2))"#,
        )
        .unwrap();
        let mut store = Store::new(&engine, ());
        let instance = Instance::new(&mut store, &module, &[]).unwrap();
        let table = FunctionTable::resolve(&instance, &mut store);
        let version = table.api_version.unwrap().call(&mut store, ()).unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn wrong_signature_is_absent_not_fatal() {
        let table = resolve_wat(
            r#"(module
                (func (export "mgba_get_save_type") (param i32) (result i32) i32.const 0)
                (func (export "retro_reset")))"#,
        );
        assert!(!table.is_resolved(Symbol::GetSaveType));
        assert!(table.is_resolved(Symbol::Reset));
    }

    #[test]
    fn non_function_export_is_absent() {
        let table = resolve_wat(r#"(module (memory (export "malloc") 1))"#);
        assert!(!table.is_resolved(Symbol::Allocate));
    }
}
