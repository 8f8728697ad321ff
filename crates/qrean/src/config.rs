//! Runtime and session configuration.
//!
//! Both structs are plain serde types; every field has a default so a
//! partial JSON document is enough.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// WebAssembly page size in bytes.
pub const WASM_PAGE_SIZE: u64 = 64 * 1024;

const DEFAULT_MAX_MEMORY_PAGES: u32 = 1024; // 64 MiB
const DEFAULT_EXTRA_PAGES: u32 = 100;
const DEFAULT_ARENA_BLOCKS: u32 = 100;
const DEFAULT_MAX_STRING_LEN: usize = 64 * 1024;

/// Settings shared by every session created from one [`QreanRuntime`](crate::QreanRuntime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Emit DWARF debug info for the compiled engine.
    pub debug_info: bool,
    /// Upper bound on each session's linear memory, in 64 KiB pages.
    pub max_memory_pages: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debug_info: false,
            max_memory_pages: DEFAULT_MAX_MEMORY_PAGES,
        }
    }
}

impl RuntimeConfig {
    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = pages;
        self
    }

    pub fn with_debug_info(mut self, enabled: bool) -> Self {
        self.debug_info = enabled;
        self
    }

    pub fn max_memory_bytes(&self) -> u64 {
        u64::from(self.max_memory_pages) * WASM_PAGE_SIZE
    }

    pub(crate) fn to_wasmtime_config(&self) -> wasmtime::Config {
        let mut config = wasmtime::Config::new();
        config.debug_info(self.debug_info);
        config.strategy(wasmtime::Strategy::Cranelift);
        config
    }
}

/// Per-session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Pages grown on top of the module's initial memory at creation.
    pub extra_pages: u32,
    /// Block-count parameter handed to the engine allocator on every reset.
    pub arena_blocks: u32,
    /// Longest null-terminated string read back from the engine.
    pub max_string_len: usize,
    /// Switch on the engine's own debug output after instantiation.
    pub debug: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            extra_pages: DEFAULT_EXTRA_PAGES,
            arena_blocks: DEFAULT_ARENA_BLOCKS,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            debug: false,
        }
    }
}

impl SessionConfig {
    pub fn with_extra_pages(mut self, pages: u32) -> Self {
        self.extra_pages = pages;
        self
    }

    pub fn with_max_string_len(mut self, len: usize) -> Self {
        self.max_string_len = len;
        self
    }

    pub fn with_debug(mut self, enabled: bool) -> Self {
        self.debug = enabled;
        self
    }

    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
