//! Closed enumerations shared with the engine.
//!
//! Every id below is part of the binary contract with the engine build and
//! must match its exported constants exactly. The string names are the
//! request vocabulary used by JSON options and `FromStr`.

use crate::CodecError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $( $(#[$vmeta:meta])* $variant:ident = $id:literal => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Every member, in wire-id order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Engine-side integer id.
            pub const fn id(self) -> u32 {
                match self {
                    $(Self::$variant => $id),+
                }
            }

            /// Request-side name.
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire),+
                }
            }

            /// Resolve an engine id; `None` if the id is not part of the table.
            pub fn from_id(id: u32) -> Option<Self> {
                match id {
                    $($id => Some(Self::$variant),)+
                    _ => None,
                }
            }

            /// Resolve an engine id, failing with `UnknownEngineId`.
            pub fn try_from_id(id: u32) -> Result<Self, CodecError> {
                Self::from_id(id).ok_or(CodecError::UnknownEngineId { kind: $kind, id })
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CodecError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.name() == s)
                    .ok_or_else(|| CodecError::invalid($kind, s))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

wire_enum! {
    /// Code family produced by `encode` and reported by `detect`.
    pub enum Symbology ("symbology") {
        Qr = 1 => "QR",
        MicroQr = 2 => "mQR",
        RectMicroQr = 3 => "rMQR",
        TinyQr = 4 => "tQR",
        Ean13 = 5 => "EAN13",
        Ean8 = 6 => "EAN8",
        Upca = 7 => "UPCA",
        Code39 = 8 => "CODE39",
        Code93 = 9 => "CODE93",
        Nw7 = 10 => "NW7",
        Itf = 11 => "ITF",
    }
}

impl Symbology {
    /// QR-family codes carry a version / error level / mask descriptor.
    pub const fn is_version_bearing(self) -> bool {
        matches!(
            self,
            Self::Qr | Self::MicroQr | Self::RectMicroQr | Self::TinyQr
        )
    }
}

impl Default for Symbology {
    fn default() -> Self {
        Self::Qr
    }
}

wire_enum! {
    /// Segment encoding used for the payload text.
    pub enum DataMode ("data mode") {
        Auto = 0 => "AUTO",
        Numeric = 1 => "NUMERIC",
        Alnum = 2 => "ALNUM",
        EightBit = 3 => "8BIT",
        Kanji = 4 => "KANJI",
    }
}

impl Default for DataMode {
    fn default() -> Self {
        Self::Auto
    }
}

wire_enum! {
    pub enum ErrorLevel ("error level") {
        L = 0 => "L",
        M = 1 => "M",
        Q = 2 => "Q",
        H = 3 => "H",
    }
}

impl Default for ErrorLevel {
    fn default() -> Self {
        Self::M
    }
}

wire_enum! {
    /// Data mask pattern. `Auto` lets the engine score all eight.
    pub enum MaskPattern ("mask pattern") {
        P0 = 0 => "0",
        P1 = 1 => "1",
        P2 = 2 => "2",
        P3 = 3 => "3",
        P4 = 4 => "4",
        P5 = 5 => "5",
        P6 = 6 => "6",
        P7 = 7 => "7",
        Auto = 10 => "AUTO",
    }
}

impl MaskPattern {
    /// Fixed mask by index (0..=7).
    pub fn from_index(index: u8) -> Option<Self> {
        if index < 8 {
            Self::from_id(u32::from(index))
        } else {
            None
        }
    }
}

impl Default for MaskPattern {
    fn default() -> Self {
        Self::Auto
    }
}

wire_enum! {
    /// Character set indicator attached to encoded or decoded text.
    pub enum EciCode ("ECI code") {
        Latin1 = 3 => "Latin1",
        ShiftJis = 20 => "ShiftJIS",
        Utf8 = 26 => "UTF-8",
    }
}

impl Default for EciCode {
    fn default() -> Self {
        Self::Latin1
    }
}

wire_enum! {
    /// Symbol version (size) selector.
    ///
    /// `R{h}x{w}` are the rectangular micro QR sizes, `M1`..`M4` the micro
    /// QR versions and `TQR` the single tiny QR size.
    pub enum QrVersion ("version") {
        Auto = 0 => "AUTO",
        AutoWidth = 1 => "AUTO-W",
        AutoHeight = 2 => "AUTO-H",
        V1 = 3 => "1",
        V2 = 4 => "2",
        V3 = 5 => "3",
        V4 = 6 => "4",
        V5 = 7 => "5",
        V6 = 8 => "6",
        V7 = 9 => "7",
        V8 = 10 => "8",
        V9 = 11 => "9",
        V10 = 12 => "10",
        V11 = 13 => "11",
        V12 = 14 => "12",
        V13 = 15 => "13",
        V14 = 16 => "14",
        V15 = 17 => "15",
        V16 = 18 => "16",
        V17 = 19 => "17",
        V18 = 20 => "18",
        V19 = 21 => "19",
        V20 = 22 => "20",
        V21 = 23 => "21",
        V22 = 24 => "22",
        V23 = 25 => "23",
        V24 = 26 => "24",
        V25 = 27 => "25",
        V26 = 28 => "26",
        V27 = 29 => "27",
        V28 = 30 => "28",
        V29 = 31 => "29",
        V30 = 32 => "30",
        V31 = 33 => "31",
        V32 = 34 => "32",
        V33 = 35 => "33",
        V34 = 36 => "34",
        V35 = 37 => "35",
        V36 = 38 => "36",
        V37 = 39 => "37",
        V38 = 40 => "38",
        V39 = 41 => "39",
        V40 = 42 => "40",
        M1 = 43 => "M1",
        M2 = 44 => "M2",
        M3 = 45 => "M3",
        M4 = 46 => "M4",
        R7x43 = 47 => "R7x43",
        R7x59 = 48 => "R7x59",
        R7x77 = 49 => "R7x77",
        R7x99 = 50 => "R7x99",
        R7x139 = 51 => "R7x139",
        R9x43 = 52 => "R9x43",
        R9x59 = 53 => "R9x59",
        R9x77 = 54 => "R9x77",
        R9x99 = 55 => "R9x99",
        R9x139 = 56 => "R9x139",
        R11x27 = 57 => "R11x27",
        R11x43 = 58 => "R11x43",
        R11x59 = 59 => "R11x59",
        R11x77 = 60 => "R11x77",
        R11x99 = 61 => "R11x99",
        R11x139 = 62 => "R11x139",
        R13x27 = 63 => "R13x27",
        R13x43 = 64 => "R13x43",
        R13x59 = 65 => "R13x59",
        R13x77 = 66 => "R13x77",
        R13x99 = 67 => "R13x99",
        R13x139 = 68 => "R13x139",
        R15x43 = 69 => "R15x43",
        R15x59 = 70 => "R15x59",
        R15x77 = 71 => "R15x77",
        R15x99 = 72 => "R15x99",
        R15x139 = 73 => "R15x139",
        R17x43 = 74 => "R17x43",
        R17x59 = 75 => "R17x59",
        R17x77 = 76 => "R17x77",
        R17x99 = 77 => "R17x99",
        R17x139 = 78 => "R17x139",
        Tqr = 79 => "TQR",
    }
}

/// Size class of a [`QrVersion`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VersionFamily {
    Auto,
    Standard,
    Micro,
    RectMicro,
    Tiny,
}

impl QrVersion {
    /// Lowest id that denotes a concrete symbol size.
    pub const LOWEST_FIXED: Self = Self::V1;

    /// Standard QR version by number (1..=40).
    pub fn standard(number: u8) -> Option<Self> {
        if (1..=40).contains(&number) {
            Self::from_id(u32::from(number) + 2)
        } else {
            None
        }
    }

    pub fn family(self) -> VersionFamily {
        match self.id() {
            0..=2 => VersionFamily::Auto,
            3..=42 => VersionFamily::Standard,
            43..=46 => VersionFamily::Micro,
            47..=78 => VersionFamily::RectMicro,
            _ => VersionFamily::Tiny,
        }
    }

    /// `true` for every id at or above [`QrVersion::LOWEST_FIXED`].
    pub fn is_fixed(self) -> bool {
        self.id() >= Self::LOWEST_FIXED.id()
    }
}

impl Default for QrVersion {
    fn default() -> Self {
        Self::Auto
    }
}
