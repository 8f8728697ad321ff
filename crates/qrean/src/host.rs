//! Host imports for the engine's `env` namespace.
//!
//! The engine is built freestanding and pulls a handful of libm functions,
//! the `on_found` detection hook and a `debug` printer from the host.

use log::{debug, warn};
use qrean_core::{read_cstring, MemoryView, Offset, RawEvent, ENGINE_LOG_TARGET};
use wasmtime::{Caller, Engine, Linker, Memory, StoreLimits, StoreLimitsBuilder};

use crate::collector::HookSlot;
use crate::{QreanError, Result};

const IMPORT_MODULE: &str = "env";

/// Per-store state visible to host imports.
pub(crate) struct HostState {
    pub(crate) hook: HookSlot,
    pub(crate) max_string_len: usize,
    pub(crate) limits: StoreLimits,
}

impl HostState {
    pub(crate) fn new(max_memory_bytes: u64, max_string_len: usize) -> Self {
        let limits = StoreLimitsBuilder::new()
            .memory_size(usize::try_from(max_memory_bytes).unwrap_or(usize::MAX))
            .instances(1)
            .build();
        Self {
            hook: HookSlot::default(),
            max_string_len,
            limits,
        }
    }
}

/// `Math.round`: halves round towards positive infinity.
pub(crate) fn js_round(x: f64) -> f64 {
    let floor = x.floor();
    if x - floor >= 0.5 {
        floor + 1.0
    } else {
        floor
    }
}

fn exported_memory(caller: &mut Caller<'_, HostState>) -> wasmtime::Result<Memory> {
    caller
        .get_export("memory")
        .and_then(|e| e.into_memory())
        .ok_or_else(|| wasmtime::Error::msg("engine does not export `memory`"))
}

/// Build a linker with every import the engine may ask for.
pub(crate) fn build_linker(engine: &Engine) -> Result<Linker<HostState>> {
    let mut linker = Linker::new(engine);
    register_math(&mut linker).map_err(QreanError::init_failed)?;
    register_hooks(&mut linker).map_err(QreanError::init_failed)?;
    Ok(linker)
}

fn register_math(linker: &mut Linker<HostState>) -> wasmtime::Result<()> {
    linker.func_wrap(IMPORT_MODULE, "atan2", |y: f64, x: f64| y.atan2(x))?;
    linker.func_wrap(IMPORT_MODULE, "pow", |n: f64, m: f64| n.powf(m))?;
    linker.func_wrap(IMPORT_MODULE, "sin", |th: f64| th.sin())?;
    linker.func_wrap(IMPORT_MODULE, "cos", |th: f64| th.cos())?;
    // Truncated remainder, same as C fmod.
    linker.func_wrap(IMPORT_MODULE, "fmod", |n: f64, m: f64| n % m)?;
    linker.func_wrap(IMPORT_MODULE, "round", js_round)?;
    linker.func_wrap(IMPORT_MODULE, "roundf", |f: f32| js_round(f64::from(f)) as f32)?;
    Ok(())
}

fn register_hooks(linker: &mut Linker<HostState>) -> wasmtime::Result<()> {
    linker.func_wrap(
        IMPORT_MODULE,
        "on_found",
        |mut caller: Caller<'_, HostState>,
         symbology: i32,
         text: i32,
         version: i32,
         level: i32,
         mask: i32,
         points: i32|
         -> wasmtime::Result<()> {
            let memory = exported_memory(&mut caller)?;
            let (bytes, state) = memory.data_and_store_mut(&mut caller);
            let raw = RawEvent::from_args([symbology, text, version, level, mask, points]);
            let limit = state.max_string_len;
            state
                .hook
                .deliver(&MemoryView::new(bytes), raw, limit)
                .map_err(wasmtime::Error::new)
        },
    )?;

    linker.func_wrap(
        IMPORT_MODULE,
        "debug",
        |mut caller: Caller<'_, HostState>, ptr: i32| -> wasmtime::Result<()> {
            let memory = exported_memory(&mut caller)?;
            let limit = caller.data().max_string_len;
            let view = MemoryView::new(memory.data(&caller));
            match read_cstring(&view, Offset::new(ptr as u32), limit) {
                Ok(bytes) => debug!(target: ENGINE_LOG_TARGET, "{}", String::from_utf8_lossy(&bytes)),
                Err(e) => warn!(target: ENGINE_LOG_TARGET, "unreadable debug message: {e}"),
            }
            Ok(())
        },
    )?;
    Ok(())
}
