//! Detection event collection.
//!
//! The engine reports hits through a single `on_found` import that carries
//! no call token. The store-wide [`HookSlot`] therefore holds at most one
//! [`EventSink`], installed by a [`HookGuard`] for exactly one `detect` call
//! and detached again when the guard goes out of scope. Events that arrive
//! while no sink is installed are dropped.

use std::ops::{Deref, DerefMut};

use log::{trace, warn};
use qrean_core::{decode_event, CodecError, Detected, MemoryView, RawEvent};
use wasmtime::Store;

use crate::host::HostState;

/// Callback invoked synchronously for every decoded event.
pub type OnFound = Box<dyn FnMut(&Detected) + Send + 'static>;

/// Result list for one `detect` call.
#[derive(Default)]
pub(crate) struct EventSink {
    events: Vec<Detected>,
    on_found: Option<OnFound>,
    fault: Option<CodecError>,
}

impl EventSink {
    pub(crate) fn new(on_found: Option<OnFound>) -> Self {
        Self {
            events: Vec::new(),
            on_found,
            fault: None,
        }
    }

    /// Decode and append one event. On failure the fault is kept so the
    /// caller can report it in place of the trap it causes.
    pub(crate) fn push(
        &mut self,
        mem: &MemoryView<'_>,
        raw: RawEvent,
        max_text_len: usize,
    ) -> Result<(), CodecError> {
        match decode_event(mem, raw, max_text_len) {
            Ok(event) => {
                trace!(
                    "event #{}: {} {:?} qr={:?}",
                    self.events.len(),
                    event.symbology,
                    event.text,
                    event.qr
                );
                if let Some(cb) = self.on_found.as_mut() {
                    cb(&event);
                }
                self.events.push(event);
                Ok(())
            }
            Err(e) => {
                self.fault = Some(e.clone());
                Err(e)
            }
        }
    }

    pub(crate) fn take_fault(&mut self) -> Option<CodecError> {
        self.fault.take()
    }

    pub(crate) fn into_events(self) -> Vec<Detected> {
        self.events
    }
}

/// Store-wide hook state. Inert unless a sink is installed.
#[derive(Default)]
pub(crate) struct HookSlot {
    sink: Option<EventSink>,
    stray: u64,
}

impl HookSlot {
    #[cfg(test)]
    pub(crate) fn is_attached(&self) -> bool {
        self.sink.is_some()
    }

    pub(crate) fn stray_events(&self) -> u64 {
        self.stray
    }

    /// Route one engine event to the installed sink.
    pub(crate) fn deliver(
        &mut self,
        mem: &MemoryView<'_>,
        raw: RawEvent,
        max_text_len: usize,
    ) -> Result<(), CodecError> {
        match self.sink.as_mut() {
            Some(sink) => sink.push(mem, raw, max_text_len),
            None => {
                self.stray += 1;
                warn!(
                    "dropping on_found event outside detect (symbology id {})",
                    raw.symbology_id
                );
                Ok(())
            }
        }
    }

    fn attach(&mut self, sink: EventSink) {
        debug_assert!(self.sink.is_none(), "hook already attached");
        self.sink = Some(sink);
    }

    fn detach(&mut self) -> Option<EventSink> {
        self.sink.take()
    }
}

/// Keeps a sink installed for the lifetime of the guard.
///
/// The guard derefs to the store so the engine can be called through it.
pub(crate) struct HookGuard<'s> {
    store: &'s mut Store<HostState>,
}

impl<'s> HookGuard<'s> {
    pub(crate) fn install(store: &'s mut Store<HostState>, sink: EventSink) -> Self {
        store.data_mut().hook.attach(sink);
        Self { store }
    }

    /// Detach and hand back the sink.
    pub(crate) fn finish(mut self) -> EventSink {
        // Drop detaches again, which is a no-op by then.
        self.store.data_mut().hook.detach().unwrap_or_default()
    }
}

impl Deref for HookGuard<'_> {
    type Target = Store<HostState>;

    fn deref(&self) -> &Self::Target {
        &*self.store
    }
}

impl DerefMut for HookGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.store
    }
}

impl Drop for HookGuard<'_> {
    fn drop(&mut self) {
        self.store.data_mut().hook.detach();
    }
}
