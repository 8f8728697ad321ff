//! Encode / detect request options and the encode option frame.
//!
//! Every field is optional host-side and resolved to its documented default
//! before serialization; the engine only ever sees concrete ids.

use crate::enums::{DataMode, EciCode, ErrorLevel, MaskPattern, QrVersion, Symbology};
use crate::CodecError;
use serde::{Deserialize, Serialize};

/// Number of `u32` words in an option frame.
pub const OPTION_FRAME_WORDS: usize = 10;
/// Encoded option frame size in bytes.
pub const OPTION_FRAME_LEN: usize = OPTION_FRAME_WORDS * 4;
/// Engine sentinel for "let the engine decide" padding.
pub const PADDING_UNSET: u32 = u32::MAX;
pub const DEFAULT_SCALE: u32 = 4;
/// Bytes reserved for the option record in engine memory.
pub const OPTION_SLOT_LEN: usize = 64;
/// Extension word after the frame carrying the text charset; `0` means
/// the engine default.
pub const ECI_WORD_OFFSET: usize = OPTION_FRAME_LEN;

/// Quiet-zone padding in modules.
///
/// JSON accepts either a number (all four sides) or a list of at most four
/// numbers in `top, right, bottom, left` order; missing sides stay unset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PaddingRepr", into = "PaddingRepr")]
pub enum Padding {
    Uniform(u32),
    Sides {
        top: Option<u32>,
        right: Option<u32>,
        bottom: Option<u32>,
        left: Option<u32>,
    },
}

/// JSON form. Negative values are the "unset" sentinel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum PaddingRepr {
    Scalar(i64),
    List(Vec<i64>),
}

fn side_from_repr(value: i64) -> Result<Option<u32>, CodecError> {
    if value < 0 {
        return Ok(None);
    }
    u32::try_from(value)
        .ok()
        .filter(|v| *v != PADDING_UNSET)
        .map(Some)
        .ok_or_else(|| CodecError::invalid("padding", value))
}

impl TryFrom<PaddingRepr> for Padding {
    type Error = CodecError;

    fn try_from(repr: PaddingRepr) -> Result<Self, Self::Error> {
        match repr {
            PaddingRepr::Scalar(v) => Ok(match side_from_repr(v)? {
                Some(v) => Padding::Uniform(v),
                None => Padding::Sides {
                    top: None,
                    right: None,
                    bottom: None,
                    left: None,
                },
            }),
            PaddingRepr::List(values) => {
                if values.len() > 4 {
                    return Err(CodecError::invalid(
                        "padding",
                        format!("{} values, at most 4 allowed", values.len()),
                    ));
                }
                let side = |i: usize| values.get(i).copied().map_or(Ok(None), side_from_repr);
                Ok(Padding::Sides {
                    top: side(0)?,
                    right: side(1)?,
                    bottom: side(2)?,
                    left: side(3)?,
                })
            }
        }
    }
}

impl From<Padding> for PaddingRepr {
    fn from(padding: Padding) -> Self {
        match padding {
            Padding::Uniform(v) => PaddingRepr::Scalar(i64::from(v)),
            Padding::Sides { .. } => {
                let words = padding.to_words();
                let used = words
                    .iter()
                    .rposition(|w| *w != PADDING_UNSET)
                    .map_or(0, |i| i + 1);
                PaddingRepr::List(
                    words[..used]
                        .iter()
                        .map(|&w| if w == PADDING_UNSET { -1 } else { i64::from(w) })
                        .collect(),
                )
            }
        }
    }
}

impl Padding {
    /// Build from up to four values in `top, right, bottom, left` order.
    pub fn from_slice(values: &[u32]) -> Result<Self, CodecError> {
        if values.len() > 4 {
            return Err(CodecError::invalid(
                "padding",
                format!("{} values, at most 4 allowed", values.len()),
            ));
        }
        let side = |i: usize| values.get(i).copied();
        Ok(Padding::Sides {
            top: side(0),
            right: side(1),
            bottom: side(2),
            left: side(3),
        })
    }

    /// Wire form: four words, [`PADDING_UNSET`] for unset sides.
    pub fn to_words(self) -> [u32; 4] {
        match self {
            Padding::Uniform(v) => [v; 4],
            Padding::Sides {
                top,
                right,
                bottom,
                left,
            } => [top, right, bottom, left].map(|s| s.unwrap_or(PADDING_UNSET)),
        }
    }
}

/// Options for `encode`. Unset fields take the engine defaults
/// (QR, AUTO data mode, level M, AUTO version, AUTO mask, scale 4).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EncodeOptions {
    #[serde(alias = "codeType")]
    pub symbology: Option<Symbology>,
    #[serde(alias = "dataType")]
    pub data_mode: Option<DataMode>,
    #[serde(alias = "qrErrorLevel")]
    pub error_level: Option<ErrorLevel>,
    #[serde(alias = "qrVersion")]
    pub version: Option<QrVersion>,
    #[serde(alias = "qrMaskPattern")]
    pub mask_pattern: Option<MaskPattern>,
    pub eci_code: Option<EciCode>,
    /// Pixels per module; `0` is treated as unset.
    pub scale: Option<u32>,
    pub padding: Option<Padding>,
}

impl EncodeOptions {
    pub fn new(symbology: Symbology) -> Self {
        Self {
            symbology: Some(symbology),
            ..Self::default()
        }
    }

    pub fn with_data_mode(mut self, mode: DataMode) -> Self {
        self.data_mode = Some(mode);
        self
    }

    pub fn with_error_level(mut self, level: ErrorLevel) -> Self {
        self.error_level = Some(level);
        self
    }

    pub fn with_version(mut self, version: QrVersion) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_mask_pattern(mut self, mask: MaskPattern) -> Self {
        self.mask_pattern = Some(mask);
        self
    }

    pub fn with_eci_code(mut self, eci: EciCode) -> Self {
        self.eci_code = Some(eci);
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = Some(padding);
        self
    }

    pub fn resolved_scale(&self) -> u32 {
        match self.scale {
            Some(s) if s > 0 => s,
            _ => DEFAULT_SCALE,
        }
    }

    /// Resolve every default into a concrete frame.
    pub fn to_frame(&self) -> OptionFrame {
        let [top, right, bottom, left] = self
            .padding
            .map_or([PADDING_UNSET; 4], Padding::to_words);
        OptionFrame {
            symbology: self.symbology.unwrap_or_default(),
            data_mode: self.data_mode.unwrap_or_default(),
            error_level: self.error_level.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            mask_pattern: self.mask_pattern.unwrap_or_default(),
            padding: [top, right, bottom, left],
            scale: self.resolved_scale(),
        }
    }
}

impl From<Symbology> for EncodeOptions {
    fn from(symbology: Symbology) -> Self {
        Self::new(symbology)
    }
}

/// Fully resolved encode options in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionFrame {
    pub symbology: Symbology,
    pub data_mode: DataMode,
    pub error_level: ErrorLevel,
    pub version: QrVersion,
    pub mask_pattern: MaskPattern,
    /// top, right, bottom, left
    pub padding: [u32; 4],
    pub scale: u32,
}

impl OptionFrame {
    pub fn to_words(&self) -> [u32; OPTION_FRAME_WORDS] {
        let [top, right, bottom, left] = self.padding;
        [
            self.symbology.id(),
            self.data_mode.id(),
            self.error_level.id(),
            self.version.id(),
            self.mask_pattern.id(),
            top,
            right,
            bottom,
            left,
            self.scale,
        ]
    }

    pub fn to_bytes(&self) -> [u8; OPTION_FRAME_LEN] {
        let mut out = [0u8; OPTION_FRAME_LEN];
        for (chunk, word) in out.chunks_exact_mut(4).zip(self.to_words()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

/// Serialize an encode request into the 40-byte frame.
pub fn encode_options(options: &EncodeOptions) -> [u8; OPTION_FRAME_LEN] {
    options.to_frame().to_bytes()
}

/// Frame plus extension words, zero padded to [`OPTION_SLOT_LEN`].
pub fn encode_option_slot(options: &EncodeOptions) -> [u8; OPTION_SLOT_LEN] {
    let mut slot = [0u8; OPTION_SLOT_LEN];
    slot[..OPTION_FRAME_LEN].copy_from_slice(&encode_options(options));
    let eci = options.eci_code.map_or(0, EciCode::id);
    slot[ECI_WORD_OFFSET..ECI_WORD_OFFSET + 4].copy_from_slice(&eci.to_le_bytes());
    slot
}

pub const DEFAULT_GAMMA: f64 = 1.0;
pub const DEFAULT_OUTPUT_BUFFER_SIZE: u32 = 1024;

/// Options for `detect`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DetectOptions {
    /// Gamma applied before binarization.
    pub gamma: Option<f64>,
    /// Charset the engine converts decoded text to.
    pub eci_code: Option<EciCode>,
    /// Size of the scratch buffer the engine writes decoded text into.
    #[serde(alias = "outbufSize")]
    pub output_buffer_size: Option<u32>,
}

impl DetectOptions {
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = Some(gamma);
        self
    }

    pub fn with_eci_code(mut self, eci: EciCode) -> Self {
        self.eci_code = Some(eci);
        self
    }

    pub fn with_output_buffer_size(mut self, size: u32) -> Self {
        self.output_buffer_size = Some(size);
        self
    }

    /// Resolve defaults, rejecting values the engine cannot use.
    pub fn resolve(&self) -> Result<ResolvedDetectOptions, CodecError> {
        let gamma = self.gamma.unwrap_or(DEFAULT_GAMMA);
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(CodecError::invalid("gamma", gamma));
        }
        let output_buffer_size = self
            .output_buffer_size
            .unwrap_or(DEFAULT_OUTPUT_BUFFER_SIZE);
        if output_buffer_size == 0 {
            return Err(CodecError::invalid("output buffer size", 0));
        }
        Ok(ResolvedDetectOptions {
            gamma,
            eci_code: self.eci_code.unwrap_or_default(),
            output_buffer_size,
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResolvedDetectOptions {
    pub gamma: f64,
    pub eci_code: EciCode,
    pub output_buffer_size: u32,
}
