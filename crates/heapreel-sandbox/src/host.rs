//! Store state and the host bindings linked into guest modules.
//!
//! The linker is the capability allowlist: a module that imports
//! anything not defined here fails to instantiate. Every binding lives
//! in the `env` module and touches only the owning store's state.

use indexmap::IndexMap;
use wasmtime::{Caller, Extern, Linker, StoreLimits, StoreLimitsBuilder};

use heapreel_core::{Annotation, AnnotationKind, Color, LogEntry, LogLevel, ThreadId};

use crate::options::SandboxOptions;

/// Import module every binding is defined in.
pub const IMPORT_MODULE: &str = "env";

/// Names of every host binding, in link order. A test keeps this in
/// step with what the linker defines.
pub const BINDINGS: [&str; 16] = [
    "getTotalMemory",
    "getThreadId",
    "isDebug",
    "optionLength",
    "readOption",
    "annotateRange",
    "annotateText",
    "annotatePointer",
    "annotateColor",
    "removeRange",
    "removeText",
    "removePointer",
    "removeColor",
    "logInfo",
    "logWarn",
    "logError",
];

// ── HostState ──────────────────────────────────────────────────────

/// Per-sandbox data owned by the wasmtime store.
pub(crate) struct HostState {
    pub(crate) capacity: u32,
    pub(crate) debug: bool,
    pub(crate) thread: ThreadId,
    pub(crate) options: IndexMap<String, String>,
    pub(crate) annotations: Vec<Annotation>,
    pub(crate) logs: Vec<LogEntry>,
    /// First binding misuse during the current call.
    pub(crate) fault: Option<String>,
    pub(crate) limits: StoreLimits,
}

impl HostState {
    pub(crate) fn new(options: &SandboxOptions) -> Self {
        Self {
            capacity: options.capacity,
            debug: options.debug,
            thread: ThreadId::default(),
            options: options.extra.clone(),
            annotations: Vec::new(),
            logs: Vec::new(),
            fault: None,
            limits: StoreLimitsBuilder::new()
                .memory_size(options.memory_limit)
                .instances(1)
                .build(),
        }
    }

    fn record_fault(&mut self, reason: String) {
        tracing::debug!(%reason, "host binding fault");
        if self.fault.is_none() {
            self.fault = Some(reason);
        }
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        if self.debug {
            let thread = self.thread.0;
            match level {
                LogLevel::Info => tracing::info!(target: "heapreel::guest", thread, "{message}"),
                LogLevel::Warn => tracing::warn!(target: "heapreel::guest", thread, "{message}"),
                LogLevel::Error => tracing::error!(target: "heapreel::guest", thread, "{message}"),
            }
        }
        self.logs.push(LogEntry::new(level, message));
    }

    fn color(&mut self, binding: &str, value: i32) -> Option<Color> {
        match u32::try_from(value).ok().map(Color::new) {
            Some(Ok(color)) => Some(color),
            _ => {
                self.record_fault(format!("{binding}: invalid color {value}"));
                None
            }
        }
    }
}

// ── Guest memory access ────────────────────────────────────────────

fn read_guest(
    caller: &mut Caller<'_, HostState>,
    binding: &str,
    ptr: i32,
    len: i32,
) -> Option<Vec<u8>> {
    let bytes = (|| {
        let memory = caller.get_export("memory").and_then(Extern::into_memory)?;
        let ptr = usize::try_from(ptr).ok()?;
        let mut buf = vec![0; usize::try_from(len).ok()?];
        memory.read(&*caller, ptr, &mut buf).ok()?;
        Some(buf)
    })();
    if bytes.is_none() {
        caller.data_mut().record_fault(format!(
            "{binding}: cannot read {len} bytes at {ptr} from guest memory"
        ));
    }
    bytes
}

fn read_string(
    caller: &mut Caller<'_, HostState>,
    binding: &str,
    ptr: i32,
    len: i32,
) -> Option<String> {
    let bytes = read_guest(caller, binding, ptr, len)?;
    match String::from_utf8(bytes) {
        Ok(s) => Some(s),
        Err(_) => {
            caller
                .data_mut()
                .record_fault(format!("{binding}: string at {ptr} is not valid UTF-8"));
            None
        }
    }
}

fn write_guest(caller: &mut Caller<'_, HostState>, binding: &str, ptr: i32, bytes: &[u8]) -> bool {
    let written = (|| {
        let memory = caller.get_export("memory").and_then(Extern::into_memory)?;
        let ptr = usize::try_from(ptr).ok()?;
        memory.write(&mut *caller, ptr, bytes).ok()
    })();
    if written.is_none() {
        caller.data_mut().record_fault(format!(
            "{binding}: cannot write {} bytes at {ptr} to guest memory",
            bytes.len()
        ));
    }
    written.is_some()
}

/// Addresses and sizes cross the boundary as `i32`; negative values are
/// reinterpreted as unsigned so that bounds validation rejects them.
fn unsigned(v: i32) -> u32 {
    v as u32
}

// ── Linking ────────────────────────────────────────────────────────

/// Define every binding of the allowlist on `linker`.
pub(crate) fn link(linker: &mut Linker<HostState>) -> wasmtime::Result<()> {
    let m = IMPORT_MODULE;

    linker.func_wrap(m, "getTotalMemory", |caller: Caller<'_, HostState>| {
        caller.data().capacity as i32
    })?;
    linker.func_wrap(m, "getThreadId", |caller: Caller<'_, HostState>| {
        caller.data().thread.0 as i32
    })?;
    linker.func_wrap(m, "isDebug", |caller: Caller<'_, HostState>| {
        i32::from(caller.data().debug)
    })?;

    linker.func_wrap(
        m,
        "optionLength",
        |mut caller: Caller<'_, HostState>, key_ptr: i32, key_len: i32| -> i32 {
            let Some(key) = read_string(&mut caller, "optionLength", key_ptr, key_len) else {
                return -1;
            };
            caller
                .data()
                .options
                .get(&key)
                .map_or(-1, |v| v.len() as i32)
        },
    )?;
    linker.func_wrap(
        m,
        "readOption",
        |mut caller: Caller<'_, HostState>,
         key_ptr: i32,
         key_len: i32,
         dst_ptr: i32,
         dst_cap: i32|
         -> i32 {
            let Some(key) = read_string(&mut caller, "readOption", key_ptr, key_len) else {
                return -1;
            };
            let Some(value) = caller.data().options.get(&key).cloned() else {
                return -1;
            };
            let n = value.len().min(usize::try_from(dst_cap).unwrap_or(0));
            if write_guest(&mut caller, "readOption", dst_ptr, &value.as_bytes()[..n]) {
                n as i32
            } else {
                -1
            }
        },
    )?;

    linker.func_wrap(
        m,
        "annotateRange",
        |mut caller: Caller<'_, HostState>, address: i32, size: i32, color: i32, alpha: f64| {
            let state = caller.data_mut();
            if let Some(color) = state.color("annotateRange", color) {
                state.annotations.push(Annotation::range(
                    unsigned(address),
                    unsigned(size),
                    Some(color),
                    Some(alpha),
                ));
            }
        },
    )?;
    linker.func_wrap(
        m,
        "annotateText",
        |mut caller: Caller<'_, HostState>, address: i32, ptr: i32, len: i32| {
            if let Some(text) = read_string(&mut caller, "annotateText", ptr, len) {
                caller
                    .data_mut()
                    .annotations
                    .push(Annotation::text(unsigned(address), text));
            }
        },
    )?;
    linker.func_wrap(
        m,
        "annotatePointer",
        |mut caller: Caller<'_, HostState>, address: i32, target: i32| {
            caller
                .data_mut()
                .annotations
                .push(Annotation::pointer(unsigned(address), unsigned(target)));
        },
    )?;
    linker.func_wrap(
        m,
        "annotateColor",
        |mut caller: Caller<'_, HostState>, address: i32, size: i32, color: i32| {
            let state = caller.data_mut();
            if let Some(color) = state.color("annotateColor", color) {
                state
                    .annotations
                    .push(Annotation::color(unsigned(address), unsigned(size), color));
            }
        },
    )?;

    for (name, kind) in [
        ("removeRange", AnnotationKind::RemoveRange),
        ("removeText", AnnotationKind::RemoveText),
        ("removePointer", AnnotationKind::RemovePointer),
        ("removeColor", AnnotationKind::RemoveColor),
    ] {
        linker.func_wrap(m, name, move |mut caller: Caller<'_, HostState>, address: i32| {
            caller
                .data_mut()
                .annotations
                .push(Annotation::remove(kind, unsigned(address)));
        })?;
    }

    for (name, level) in [
        ("logInfo", LogLevel::Info),
        ("logWarn", LogLevel::Warn),
        ("logError", LogLevel::Error),
    ] {
        linker.func_wrap(
            m,
            name,
            move |mut caller: Caller<'_, HostState>, ptr: i32, len: i32| {
                if let Some(message) = read_string(&mut caller, name, ptr, len) {
                    caller.data_mut().push_log(level, message);
                }
            },
        )?;
    }

    Ok(())
}
