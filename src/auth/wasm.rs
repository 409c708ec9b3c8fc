//! Wasmtime host for the exchange's index module.

use super::engine::{IndexFn, IndexFunctions};
use crate::core::error::{AuthError, EngineError};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use wasmtime::{Config, Engine, Instance, Module, Store, TypedFunc};

type Args = (i32, i32, i32, i32, i32);

/// Upper bound on instructions for a single call; the exports are a handful of arithmetic ops.
const FUEL_PER_CALL: u64 = 1_000_000;

/// The module shipped with the crate when the `embedded-module` feature is enabled.
#[cfg(feature = "embedded-module")]
pub const EMBEDDED_MODULE: &[u8] =
    include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/css.wasm"));

struct Loaded {
    store: Store<()>,
    funcs: [TypedFunc<Args, i32>; 5],
}

/// [`IndexFunctions`] backed by a sandboxed WebAssembly instance.
///
/// The instance is released by [`close`](Self::close) or on drop, whichever comes first.
pub struct WasmIndexFunctions {
    inner: Mutex<Option<Loaded>>,
}

impl std::fmt::Debug for WasmIndexFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmIndexFunctions")
            .field("open", &!self.is_closed())
            .finish()
    }
}

impl WasmIndexFunctions {
    /// Compile and instantiate a module given as binary or WAT text.
    ///
    /// Fails if the module does not compile, needs imports, or lacks any of the
    /// five `(i32, i32, i32, i32, i32) -> i32` exports.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, AuthError> {
        let mut config = Config::new();
        config.consume_fuel(true);
        let engine = Engine::new(&config)
            .map_err(|e| AuthError::ModuleLoad(format!("create engine: {e}")))?;

        let module = Module::new(&engine, bytes.as_ref())
            .map_err(|e| AuthError::ModuleLoad(format!("compile module: {e}")))?;

        let mut store = Store::new(&engine, ());
        let instance = Instance::new(&mut store, &module, &[])
            .map_err(|e| AuthError::ModuleLoad(format!("instantiate module: {e}")))?;

        let mut funcs = Vec::with_capacity(IndexFn::ALL.len());
        for func in IndexFn::ALL {
            let typed = instance
                .get_typed_func::<Args, i32>(&mut store, func.export_name())
                .map_err(|e| {
                    AuthError::ModuleLoad(format!("export `{}`: {e}", func.export_name()))
                })?;
            funcs.push(typed);
        }
        let funcs: [TypedFunc<Args, i32>; 5] = funcs
            .try_into()
            .map_err(|_| AuthError::ModuleLoad("export table size mismatch".into()))?;

        Ok(Self {
            inner: Mutex::new(Some(Loaded { store, funcs })),
        })
    }

    /// Read a module from disk, then behave like [`from_bytes`](Self::from_bytes).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| AuthError::ModuleLoad(format!("read {}: {e}", path.display())))?;
        Self::from_bytes(bytes)
    }

    /// The bundled module.
    #[cfg(feature = "embedded-module")]
    pub fn embedded() -> Result<Self, AuthError> {
        Self::from_bytes(EMBEDDED_MODULE)
    }

    /// Drop the store and instance. Safe to call more than once.
    pub fn close(&self) {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        guard.take();
    }

    pub fn is_closed(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl IndexFunctions for WasmIndexFunctions {
    fn call(&self, func: IndexFn, [a, b, c, d, e]: [i32; 5]) -> Result<i32, EngineError> {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let Loaded { store, funcs } = guard
            .as_mut()
            .ok_or_else(|| EngineError::new("module closed"))?;

        store
            .set_fuel(FUEL_PER_CALL)
            .map_err(|e| EngineError::with_source("set fuel", e))?;
        funcs[func as usize]
            .call(&mut *store, (a, b, c, d, e))
            .map_err(|e| EngineError::with_source(format!("`{func}` trapped"), e))
    }

    fn release(&self) {
        self.close();
    }
}
