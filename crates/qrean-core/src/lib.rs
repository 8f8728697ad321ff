//! Engine-independent protocol layer for the qrean barcode engine.
//!
//! Everything here works over plain byte slices: the closed wire
//! enumerations, the encode option frame, typed offsets into linear memory,
//! null-terminated strings, the image record layout and the `on_found`
//! event decoder. The WebAssembly runtime lives in the `qrean` crate.

mod cstring;
mod detection;
mod enums;
mod error;
mod image;
mod logger;
mod memory;
mod options;

pub use cstring::{read_cstring, to_cstring, write_cstring};
pub use detection::{decode_event, Detected, QrInfo, RawEvent, POINTS_RECORD_LEN};
pub use enums::{
    DataMode, EciCode, ErrorLevel, MaskPattern, QrVersion, Symbology, VersionFamily,
};
pub use error::CodecError;
pub use image::{
    image_record_len, pixel_len, read_image_record, write_image_record, Image, ImageView,
    BYTES_PER_PIXEL, IMAGE_HEADER_LEN,
};
pub use memory::{
    ImageRecord, MemoryView, MemoryViewMut, Offset, OptionRecord, PixelBuffer, PointsRecord,
    ScratchBuffer, TextRecord,
};
pub use options::{
    encode_option_slot, encode_options, DetectOptions, EncodeOptions, OptionFrame, Padding,
    ResolvedDetectOptions, DEFAULT_GAMMA, DEFAULT_OUTPUT_BUFFER_SIZE, DEFAULT_SCALE,
    ECI_WORD_OFFSET, OPTION_FRAME_LEN, OPTION_FRAME_WORDS, OPTION_SLOT_LEN, PADDING_UNSET,
};

#[cfg(feature = "tracing")]
pub use logger::{init_tracing, try_init_tracing};

pub use logger::{init_with_level, init_with_levels, ENGINE_LOG_TARGET};
