//! Engine compilation.
//!
//! Compiling the engine module is by far the most expensive step, so it
//! happens once per [`QreanRuntime`]. Sessions created from the same
//! runtime share the compiled code but nothing else.

use std::path::Path;

use log::debug;
use qrean_core::{EncodeOptions, Image};
use wasmtime::{Engine, Linker, Module};

use crate::config::{RuntimeConfig, SessionConfig};
use crate::host::{build_linker, HostState};
use crate::session::Session;
use crate::{QreanError, Result};

/// A compiled engine module plus the host import table.
///
/// Cheap to clone; clones share the compiled code.
#[derive(Clone)]
pub struct QreanRuntime {
    engine: Engine,
    module: Module,
    linker: Linker<HostState>,
    config: RuntimeConfig,
}

impl QreanRuntime {
    /// Compile an engine from WebAssembly bytes with default settings.
    pub fn new(wasm: &[u8]) -> Result<Self> {
        Self::with_config(wasm, RuntimeConfig::default())
    }

    pub fn with_config(wasm: &[u8], config: RuntimeConfig) -> Result<Self> {
        let engine = Engine::new(&config.to_wasmtime_config()).map_err(QreanError::init_failed)?;
        let module = Module::new(&engine, wasm).map_err(QreanError::init_failed)?;
        let linker = build_linker(&engine)?;
        debug!(
            "engine compiled: {} bytes, {} imports",
            wasm.len(),
            module.imports().len()
        );
        Ok(Self {
            engine,
            module,
            linker,
            config,
        })
    }

    /// Read and compile an engine module from disk.
    pub fn from_file(path: impl AsRef<Path>, config: RuntimeConfig) -> Result<Self> {
        let wasm = std::fs::read(path)?;
        Self::with_config(&wasm, config)
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub(crate) fn engine(&self) -> &Engine {
        &self.engine
    }

    pub(crate) fn module(&self) -> &Module {
        &self.module
    }

    pub(crate) fn linker(&self) -> &Linker<HostState> {
        &self.linker
    }

    /// Create a fresh, isolated session.
    pub fn session(&self, config: SessionConfig) -> Result<Session> {
        Session::create(self, config)
    }

    /// Encode on a throwaway session with default settings.
    pub fn encode_once(
        &self,
        text: impl AsRef<[u8]>,
        options: &EncodeOptions,
    ) -> Result<Option<Image>> {
        let mut session = self.session(SessionConfig::default())?;
        session.encode(text, options)
    }
}

impl std::fmt::Debug for QreanRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QreanRuntime")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
