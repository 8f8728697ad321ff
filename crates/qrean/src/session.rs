//! One engine instance and its request cycle.
//!
//! Every `encode` / `detect` call resets the arena, marshals its inputs
//! into freshly allocated blocks, calls the engine once and copies the
//! results back out before returning. Nothing returned by a session refers
//! into engine memory.

use log::{debug, warn};
use qrean_core::{
    encode_option_slot, image_record_len, read_image_record, to_cstring, write_cstring,
    write_image_record, CodecError, DetectOptions, Detected, EncodeOptions, Image, ImageRecord,
    ImageView, Offset, OptionRecord, ScratchBuffer, TextRecord, OPTION_SLOT_LEN,
};
use serde::{Deserialize, Serialize};
use wasmtime::{Func, Instance, Store, TypedFunc, Val, ValType};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::arena::Arena;
use crate::collector::{EventSink, HookGuard, OnFound};
use crate::config::SessionConfig;
use crate::host::HostState;
use crate::runtime::QreanRuntime;
use crate::{QreanError, Result};

/// Output of one `detect` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// Found symbols in the order the engine reported them.
    pub events: Vec<Detected>,
    /// The engine's in-place digitized copy of the input, alpha forced to 255.
    pub digitized: Image,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SessionState {
    Ready,
    Busy,
    Closed,
}

#[derive(Clone, Copy, Debug)]
enum GammaWidth {
    F32,
    F64,
}

/// `detect(out, out_size, image, gamma, eci)`. The gamma width and result
/// arity differ between engine builds and are read from the export.
struct DetectEntry {
    func: Func,
    gamma: GammaWidth,
    results: usize,
}

impl DetectEntry {
    fn resolve(store: &mut Store<HostState>, instance: &Instance) -> Result<Self> {
        let func = instance
            .get_func(&mut *store, "detect")
            .ok_or_else(|| QreanError::init_failed("engine does not export `detect`"))?;
        let ty = func.ty(&*store);
        let params: Vec<ValType> = ty.params().collect();
        let gamma = match params.as_slice() {
            [ValType::I32, ValType::I32, ValType::I32, ValType::F32, ValType::I32] => GammaWidth::F32,
            [ValType::I32, ValType::I32, ValType::I32, ValType::F64, ValType::I32] => GammaWidth::F64,
            _ => {
                return Err(QreanError::init_failed(format!(
                    "unexpected `detect` signature {ty:?}"
                )))
            }
        };
        let results = ty.results().len();
        Ok(Self {
            func,
            gamma,
            results,
        })
    }
}

/// An isolated engine instance.
///
/// Sessions are independent: each owns its own store, linear memory and
/// hook slot. Calls take `&mut self`, so one session never runs two engine
/// calls at once; share sessions across threads behind a `Mutex`.
pub struct Session {
    store: Store<HostState>,
    arena: Arena,
    encode: TypedFunc<(u32, u32), u32>,
    detect: DetectEntry,
    config: SessionConfig,
    state: SessionState,
}

impl Session {
    /// Instantiate the runtime's module and prepare its memory.
    pub fn create(runtime: &QreanRuntime, config: SessionConfig) -> Result<Self> {
        let state = HostState::new(runtime.config().max_memory_bytes(), config.max_string_len);
        let mut store = Store::new(runtime.engine(), state);
        store.limiter(|state| &mut state.limits);

        let instance = runtime
            .linker()
            .instantiate(&mut store, runtime.module())
            .map_err(QreanError::init_failed)?;

        let arena = Arena::bind(&mut store, &instance, config.arena_blocks)?;
        arena
            .grow(&mut store, config.extra_pages)
            .map_err(|e| QreanError::init_failed(format!("growing memory failed: {e}")))?;

        let encode = instance
            .get_typed_func::<(u32, u32), u32>(&mut store, "encode")
            .map_err(QreanError::init_failed)?;
        let detect = DetectEntry::resolve(&mut store, &instance)?;

        if config.debug {
            match instance.get_typed_func::<(), ()>(&mut store, "enable_debug") {
                Ok(enable) => enable
                    .call(&mut store, ())
                    .map_err(|e| QreanError::init_failed(format!("enable_debug: {e}")))?,
                Err(_) => warn!("engine has no `enable_debug` export; debug output stays off"),
            }
        }

        debug!(
            "session ready: memory={} bytes heap_base={:#x} detect gamma={:?}",
            arena.len(&store),
            arena.heap_base(),
            detect.gamma
        );

        Ok(Self {
            store,
            arena,
            encode,
            detect,
            config,
            state: SessionState::Ready,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current linear memory size in bytes.
    pub fn memory_len(&self) -> usize {
        self.arena.len(&self.store)
    }

    /// Start of the engine-managed heap.
    pub fn heap_base(&self) -> u32 {
        self.arena.heap_base()
    }

    /// Events the engine raised while no `detect` call was collecting.
    pub fn stray_events(&self) -> u64 {
        self.store.data().hook.stray_events()
    }

    pub fn is_closed(&self) -> bool {
        self.state == SessionState::Closed
    }

    /// Mark the session unusable. Later calls fail with `SessionClosed`.
    pub fn close(&mut self) {
        if self.state != SessionState::Closed {
            debug!("session closed");
        }
        self.state = SessionState::Closed;
    }

    /// Reset the arena explicitly. Encode and detect already do this on entry.
    pub fn reset(&mut self) -> Result<()> {
        self.run(|s| s.arena.reset(&mut s.store))
    }

    /// Render `text` as a symbol image.
    ///
    /// Returns `Ok(None)` when the engine cannot satisfy the request, for
    /// example text that does not fit a fixed version.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self, text)))]
    pub fn encode(
        &mut self,
        text: impl AsRef<[u8]>,
        options: &EncodeOptions,
    ) -> Result<Option<Image>> {
        let cstring = to_cstring(text.as_ref())?;
        let slot = encode_option_slot(options);
        self.run(|s| s.encode_inner(&cstring, &slot))
    }

    fn encode_inner(&mut self, cstring: &[u8], slot: &[u8; OPTION_SLOT_LEN]) -> Result<Option<Image>> {
        self.arena.reset(&mut self.store)?;

        let text_at = self.arena.alloc::<TextRecord>(&mut self.store, cstring.len())?;
        write_cstring(&mut self.arena.view_mut(&mut self.store), text_at, cstring)?;
        let opts_at = self.arena.alloc::<OptionRecord>(&mut self.store, OPTION_SLOT_LEN)?;
        self.arena.view_mut(&mut self.store).write_bytes(opts_at, slot)?;

        let result = self
            .encode
            .call(&mut self.store, (text_at.raw(), opts_at.raw()))
            .map_err(|e| QreanError::engine_call("encode", e))?;
        let image_at = Offset::<ImageRecord>::new(result);
        if image_at.is_null() {
            debug!("encode: engine declined the request");
            return Ok(None);
        }

        let image = read_image_record(&self.arena.view(&self.store), image_at)?;
        self.arena.free(&mut self.store, image_at)?;
        debug!("encode: {}x{} image", image.width(), image.height());
        Ok(Some(image))
    }

    /// Find every symbol in `image`.
    pub fn detect(&mut self, image: &Image, options: &DetectOptions) -> Result<Detection> {
        self.detect_view(image.view(), options, None)
    }

    /// [`Session::detect`], calling `on_found` for each symbol as the engine
    /// reports it.
    pub fn detect_with<F>(
        &mut self,
        image: &Image,
        options: &DetectOptions,
        on_found: F,
    ) -> Result<Detection>
    where
        F: FnMut(&Detected) + Send + 'static,
    {
        self.detect_view(image.view(), options, Some(Box::new(on_found)))
    }

    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "debug",
            skip(self, image, on_found),
            fields(width = image.width, height = image.height)
        )
    )]
    fn detect_view(
        &mut self,
        image: ImageView<'_>,
        options: &DetectOptions,
        on_found: Option<OnFound>,
    ) -> Result<Detection> {
        let resolved = options.resolve()?;
        let record_len = image_record_len(image.width, image.height)?;

        self.run(|s| {
            s.arena.reset(&mut s.store)?;
            if record_len as usize > s.arena.capacity(&s.store) {
                return Err(CodecError::BufferTooLarge {
                    width: image.width,
                    height: image.height,
                }
                .into());
            }
            let out_at = s
                .arena
                .alloc::<ScratchBuffer>(&mut s.store, resolved.output_buffer_size as usize)?;
            let image_at = s
                .arena
                .alloc::<ImageRecord>(&mut s.store, record_len as usize)?;
            write_image_record(&mut s.arena.view_mut(&mut s.store), image_at, image)?;

            let gamma = match s.detect.gamma {
                GammaWidth::F32 => Val::F32((resolved.gamma as f32).to_bits()),
                GammaWidth::F64 => Val::F64(resolved.gamma.to_bits()),
            };
            let params = [
                Val::I32(out_at.raw() as i32),
                Val::I32(resolved.output_buffer_size as i32),
                Val::I32(image_at.raw() as i32),
                gamma,
                Val::I32(resolved.eci_code.id() as i32),
            ];
            let mut results = vec![Val::I32(0); s.detect.results];

            let mut guard = HookGuard::install(&mut s.store, EventSink::new(on_found));
            let called = s.detect.func.call(&mut *guard, &params, &mut results);
            let mut sink = guard.finish();

            if let Some(fault) = sink.take_fault() {
                return Err(fault.into());
            }
            called.map_err(|e| QreanError::engine_call("detect", e))?;

            let mut digitized = read_image_record(&s.arena.view(&s.store), image_at)?;
            digitized.force_opaque();
            s.arena.free(&mut s.store, image_at)?;
            s.arena.free(&mut s.store, out_at)?;

            let events = sink.into_events();
            debug!("detect: {} symbol(s), engine returned {:?}", events.len(), results);
            Ok(Detection { events, digitized })
        })
    }

    /// Run `body` with the session marked busy. A panic inside `body`
    /// leaves the session busy for good.
    fn run<T>(&mut self, body: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        match self.state {
            SessionState::Closed => return Err(QreanError::SessionClosed),
            SessionState::Busy => return Err(QreanError::SessionBusy),
            SessionState::Ready => {}
        }
        self.state = SessionState::Busy;
        let out = body(self);
        self.state = SessionState::Ready;
        out
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state)
            .field("heap_base", &self.arena.heap_base())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
