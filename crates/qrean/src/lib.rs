//! Host-side driver for the Qrean barcode engine.
//!
//! The engine is a WebAssembly module that renders QR / micro QR /
//! rectangular micro QR / tiny QR symbols and 1D barcodes, and detects them
//! in RGBA images. It only exposes a flat linear memory and a few exports;
//! this crate re-establishes a typed, bounds-checked protocol on top of it.
//!
//! - [`QreanRuntime`] compiles the engine once.
//! - [`Session`] is one isolated engine instance with its own memory arena.
//! - [`core`] (`qrean-core`) holds the engine-independent wire types.
//!
//! ## Quickstart
//!
//! ```no_run
//! use qrean::{DataMode, EncodeOptions, QreanRuntime, SessionConfig, Symbology};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = QreanRuntime::from_file("qrean.wasm", Default::default())?;
//! let mut session = runtime.session(SessionConfig::default())?;
//!
//! let opts = EncodeOptions::new(Symbology::MicroQr).with_data_mode(DataMode::EightBit);
//! if let Some(img) = session.encode("test", &opts)? {
//!     let found = session.detect(&img, &Default::default())?;
//!     for hit in &found.events {
//!         println!("{} {:?} at {:?}", hit.symbology, hit.text, hit.points);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! Everything logs through the `log` facade. The engine's own debug output
//! (enabled with [`SessionConfig::debug`]) goes to the `qrean::engine`
//! target. With feature `tracing`, session calls are instrumented and
//! [`core::init_tracing`] installs a subscriber.

pub use qrean_core as core;

mod arena;
mod collector;
mod config;
mod error;
mod host;
mod runtime;
mod session;

pub use collector::OnFound;
pub use config::{RuntimeConfig, SessionConfig, WASM_PAGE_SIZE};
pub use error::{QreanError, Result};
pub use runtime::QreanRuntime;
pub use session::{Detection, Session};

pub use qrean_core::{
    CodecError, DataMode, DetectOptions, Detected, EciCode, EncodeOptions, ErrorLevel, Image,
    MaskPattern, Padding, QrInfo, QrVersion, Symbology, VersionFamily, ENGINE_LOG_TARGET,
};
