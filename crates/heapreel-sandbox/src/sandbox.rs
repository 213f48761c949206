//! A loaded allocator instance.

use wasmtime::{Config, Engine, Linker, Module, Store, Trap, TypedFunc, WasmParams, WasmResults};

use heapreel_core::{AllocatorHost, Annotation, HostError, LogEntry, ThreadId};

use crate::error::{LoadStage, SandboxError};
use crate::host::{self, HostState};
use crate::options::SandboxOptions;

/// An allocator loaded into its own wasmtime store.
///
/// Each sandbox owns its engine, store, and side-effect queues; two
/// sandboxes never share state. Annotations and log messages emitted by
/// the module's start function are queued like any other and are picked
/// up by the first drain.
///
/// # Examples
///
/// ```
/// use heapreel_core::AllocatorHost;
/// use heapreel_sandbox::{Sandbox, SandboxOptions};
///
/// let wat = r#"(module
///     (global $next (mut i32) (i32.const 0))
///     (memory (export "memory") 1)
///     (func (export "malloc") (param $size i32) (result i32)
///         (local $addr i32)
///         (local.set $addr (global.get $next))
///         (global.set $next (i32.add (global.get $next) (local.get $size)))
///         (local.get $addr))
///     (func (export "free") (param i32)))"#;
/// let mut sandbox = Sandbox::load(wat, SandboxOptions::with_capacity(64)).unwrap();
/// assert_eq!(sandbox.malloc(8), Ok(0));
/// assert_eq!(sandbox.malloc(8), Ok(8));
/// ```
pub struct Sandbox {
    store: Store<HostState>,
    malloc: Option<TypedFunc<i32, i32>>,
    free: Option<TypedFunc<i32, ()>>,
    fuel: Option<u64>,
}

impl Sandbox {
    /// Load allocator `source` (WebAssembly text or binary).
    ///
    /// # Errors
    ///
    /// [`SandboxError::InvalidOptions`] if `options` fail validation;
    /// [`SandboxError::Load`] if the module does not parse, imports
    /// anything outside the binding allowlist, traps in its start
    /// function, or exports `malloc`/`free` with the wrong signature.
    pub fn load(source: impl AsRef<[u8]>, options: SandboxOptions) -> Result<Self, SandboxError> {
        options.validate()?;
        let bytes = wat::parse_bytes(source.as_ref())
            .map_err(|e| SandboxError::load(LoadStage::Parse, e))?;

        let mut config = Config::new();
        config.consume_fuel(options.fuel.is_some());
        let engine =
            Engine::new(&config).map_err(|e| SandboxError::load(LoadStage::Compile, e))?;
        let module = Module::from_binary(&engine, &bytes)
            .map_err(|e| SandboxError::load(LoadStage::Compile, e))?;

        let mut linker = Linker::new(&engine);
        host::link(&mut linker).map_err(|e| SandboxError::load(LoadStage::Link, e))?;

        let mut store = Store::new(&engine, HostState::new(&options));
        store.limiter(|state| &mut state.limits);
        if let Some(fuel) = options.fuel {
            store
                .set_fuel(fuel)
                .map_err(|e| SandboxError::load(LoadStage::Start, e))?;
        }

        let pre = linker
            .instantiate_pre(&module)
            .map_err(|e| SandboxError::load(LoadStage::Link, e))?;
        let instance = pre
            .instantiate(&mut store)
            .map_err(|e| SandboxError::load(LoadStage::Start, describe(&e)))?;
        if let Some(reason) = store.data_mut().fault.take() {
            return Err(SandboxError::Load {
                stage: LoadStage::Start,
                reason,
            });
        }

        let malloc = match instance.get_func(&mut store, "malloc") {
            Some(f) => Some(
                f.typed::<i32, i32>(&store)
                    .map_err(|e| SandboxError::load(LoadStage::Exports, format!("malloc: {e}")))?,
            ),
            None => None,
        };
        let free = match instance.get_func(&mut store, "free") {
            Some(f) => Some(
                f.typed::<i32, ()>(&store)
                    .map_err(|e| SandboxError::load(LoadStage::Exports, format!("free: {e}")))?,
            ),
            None => None,
        };

        tracing::debug!(
            capacity = options.capacity,
            fuel = ?options.fuel,
            has_malloc = malloc.is_some(),
            has_free = free.is_some(),
            setup_annotations = store.data().annotations.len(),
            "allocator loaded"
        );
        Ok(Self {
            store,
            malloc,
            free,
            fuel: options.fuel,
        })
    }

    /// Thread the next call runs on behalf of.
    pub fn thread(&self) -> ThreadId {
        self.store.data().thread
    }

    /// Annotations queued and not yet drained.
    pub fn pending_annotations(&self) -> usize {
        self.store.data().annotations.len()
    }
}

/// Invoke `func`, refuelling first and surfacing binding faults.
fn call<P, R>(
    store: &mut Store<HostState>,
    func: &TypedFunc<P, R>,
    fuel: Option<u64>,
    params: P,
) -> Result<R, HostError>
where
    P: WasmParams,
    R: WasmResults,
{
    if let Some(fuel) = fuel {
        store.set_fuel(fuel).map_err(|e| HostError::Trap {
            reason: e.to_string(),
        })?;
    }
    store.data_mut().fault = None;
    let result = func.call(&mut *store, params);
    if let Some(reason) = store.data_mut().fault.take() {
        return Err(HostError::Fault { reason });
    }
    result.map_err(|e| HostError::Trap {
        reason: describe(&e),
    })
}

/// Prefer the trap code's message over the backtrace-laden top level.
fn describe(err: &wasmtime::Error) -> String {
    match err.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => "fuel budget exhausted".to_string(),
        Some(trap) => trap.to_string(),
        None => err.to_string(),
    }
}

impl AllocatorHost for Sandbox {
    fn capacity(&self) -> u32 {
        self.store.data().capacity
    }

    fn set_thread(&mut self, thread: ThreadId) {
        self.store.data_mut().thread = thread;
    }

    fn malloc(&mut self, size: u32) -> Result<i64, HostError> {
        let Some(func) = &self.malloc else {
            return Err(HostError::NotImplemented { export: "malloc" });
        };
        // Larger than any address space the options allow.
        let Ok(size) = i32::try_from(size) else {
            return Ok(-1);
        };
        call(&mut self.store, func, self.fuel, size).map(i64::from)
    }

    fn free(&mut self, address: u32) -> Result<(), HostError> {
        let Some(func) = &self.free else {
            return Err(HostError::NotImplemented { export: "free" });
        };
        let Ok(address) = i32::try_from(address) else {
            return Err(HostError::Fault {
                reason: format!("address {address} does not fit the guest ABI"),
            });
        };
        call(&mut self.store, func, self.fuel, address)
    }

    fn drain_annotations(&mut self) -> Vec<Annotation> {
        std::mem::take(&mut self.store.data_mut().annotations)
    }

    fn drain_logs(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.store.data_mut().logs)
    }
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.store.data();
        f.debug_struct("Sandbox")
            .field("capacity", &state.capacity)
            .field("thread", &state.thread)
            .field("fuel", &self.fuel)
            .field("pending_annotations", &state.annotations.len())
            .field("pending_logs", &state.logs.len())
            .finish()
    }
}
