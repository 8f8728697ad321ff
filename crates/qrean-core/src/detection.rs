//! Decoding of `on_found` events raised by the engine during `detect`.
//!
//! Each event carries raw offsets into linear memory. Everything it points
//! at is copied out immediately, so a [`Detected`] stays valid after the
//! arena is reset or the session is closed.

use crate::cstring::read_cstring;
use crate::enums::{ErrorLevel, MaskPattern, QrVersion, Symbology};
use crate::memory::{MemoryView, Offset, PointsRecord, TextRecord};
use crate::CodecError;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Byte length of the packed corner record (`4 * (x, y)` as `f32`).
pub const POINTS_RECORD_LEN: usize = 8 * 4;

/// Matrix-symbol descriptor reported for QR-family hits.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QrInfo {
    pub version: QrVersion,
    pub level: ErrorLevel,
    pub mask: MaskPattern,
}

/// One symbol found by `detect`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detected {
    pub symbology: Symbology,
    /// Decoded payload, lossily converted to UTF-8.
    pub text: String,
    /// Decoded payload exactly as the engine wrote it.
    pub bytes: Vec<u8>,
    /// Corners in traversal order, usually TL, TR, BR, BL.
    pub points: [Point2<f32>; 4],
    pub qr: Option<QrInfo>,
}

impl Detected {
    /// `true` when all corners are finite and the quad neither
    /// self-intersects nor collapses to zero area.
    pub fn is_simple_quad(&self) -> bool {
        let p = &self.points;
        if p.iter().any(|q| !q.x.is_finite() || !q.y.is_finite()) {
            return false;
        }
        if shoelace_area(p).abs() <= f32::EPSILON {
            return false;
        }
        // Only opposite edges can cross in a quadrilateral.
        !segments_cross(p[0], p[1], p[2], p[3]) && !segments_cross(p[1], p[2], p[3], p[0])
    }
}

fn shoelace_area(p: &[Point2<f32>; 4]) -> f32 {
    let mut acc = 0.0f32;
    for i in 0..4 {
        let a = p[i];
        let b = p[(i + 1) % 4];
        acc += a.x * b.y - b.x * a.y;
    }
    acc * 0.5
}

fn orient(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>) -> f32 {
    (b - a).perp(&(c - a))
}

fn segments_cross(a: Point2<f32>, b: Point2<f32>, c: Point2<f32>, d: Point2<f32>) -> bool {
    let d1 = orient(a, b, c);
    let d2 = orient(a, b, d);
    let d3 = orient(c, d, a);
    let d4 = orient(c, d, b);
    (d1 * d2 < 0.0) && (d3 * d4 < 0.0)
}

/// Arguments of one `on_found` call, as received from the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawEvent {
    pub symbology_id: u32,
    pub text: Offset<TextRecord>,
    pub version_id: u32,
    pub level_id: u32,
    pub mask_id: u32,
    pub points: Offset<PointsRecord>,
}

impl RawEvent {
    /// Build from the six `i32` hook arguments in ABI order.
    pub fn from_args(args: [i32; 6]) -> Self {
        let [symbology, text, version, level, mask, points] = args.map(|a| a as u32);
        Self {
            symbology_id: symbology,
            text: Offset::new(text),
            version_id: version,
            level_id: level,
            mask_id: mask,
            points: Offset::new(points),
        }
    }
}

/// Decode one event, copying text and corners out of `mem`.
///
/// Text is scanned for at most `max_text_len` bytes. Corner reads that leave
/// memory or yield non-finite values are `MalformedGeometry`.
pub fn decode_event(
    mem: &MemoryView<'_>,
    raw: RawEvent,
    max_text_len: usize,
) -> Result<Detected, CodecError> {
    let symbology = Symbology::try_from_id(raw.symbology_id)?;

    let bytes = match read_cstring(mem, raw.text, max_text_len) {
        Ok(bytes) => bytes,
        Err(CodecError::OutOfBounds { offset, .. }) => {
            return Err(CodecError::MalformedString {
                offset,
                limit: max_text_len,
            })
        }
        Err(e) => return Err(e),
    };
    let text = String::from_utf8_lossy(&bytes).into_owned();

    let points = read_points(mem, raw.points)?;
    let qr = descriptor(symbology, raw);

    Ok(Detected {
        symbology,
        text,
        bytes,
        points,
        qr,
    })
}

fn read_points(mem: &MemoryView<'_>, at: Offset<PointsRecord>) -> Result<[Point2<f32>; 4], CodecError> {
    let record = mem
        .slice(at, POINTS_RECORD_LEN)
        .map_err(|e| CodecError::MalformedGeometry {
            reason: e.to_string(),
        })?;
    let mut coords = [0.0f32; 8];
    for (dst, chunk) in coords.iter_mut().zip(record.chunks_exact(4)) {
        *dst = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    if let Some(i) = coords.iter().position(|c| !c.is_finite()) {
        return Err(CodecError::MalformedGeometry {
            reason: format!("corner {} has non-finite coordinate {}", i / 2, coords[i]),
        });
    }
    Ok([
        Point2::new(coords[0], coords[1]),
        Point2::new(coords[2], coords[3]),
        Point2::new(coords[4], coords[5]),
        Point2::new(coords[6], coords[7]),
    ])
}

fn descriptor(symbology: Symbology, raw: RawEvent) -> Option<QrInfo> {
    if !symbology.is_version_bearing() || raw.version_id < QrVersion::LOWEST_FIXED.id() {
        return None;
    }
    Some(QrInfo {
        version: QrVersion::from_id(raw.version_id)?,
        level: ErrorLevel::from_id(raw.level_id)?,
        mask: MaskPattern::from_id(raw.mask_id)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TEXT_AT: u32 = 8;
    const POINTS_AT: u32 = 32;

    fn memory_with(text: &[u8], points: [f32; 8]) -> Vec<u8> {
        let mut raw = vec![0u8; 96];
        let t = TEXT_AT as usize;
        raw[t..t + text.len()].copy_from_slice(text);
        let p = POINTS_AT as usize;
        for (i, v) in points.iter().enumerate() {
            raw[p + i * 4..p + i * 4 + 4].copy_from_slice(&v.to_le_bytes());
        }
        raw
    }

    const SQUARE: [f32; 8] = [0.0, 0.0, 10.0, 0.0, 10.0, 10.0, 0.0, 10.0];

    fn raw_event(symbology: u32, version: u32, level: u32, mask: u32) -> RawEvent {
        RawEvent::from_args([
            symbology as i32,
            TEXT_AT as i32,
            version as i32,
            level as i32,
            mask as i32,
            POINTS_AT as i32,
        ])
    }

    #[test]
    fn qr_event_carries_descriptor() {
        let raw = memory_with(b"Hello", SQUARE);
        let ev = decode_event(&MemoryView::new(&raw), raw_event(1, 3, 1, 2), 64).unwrap();
        assert_eq!(ev.symbology, Symbology::Qr);
        assert_eq!(ev.text, "Hello");
        assert_eq!(ev.bytes, b"Hello");
        assert_relative_eq!(ev.points[2].x, 10.0);
        assert_relative_eq!(ev.points[2].y, 10.0);
        assert_relative_eq!(ev.points[3].x, 0.0);
        assert_eq!(
            ev.qr,
            Some(QrInfo {
                version: QrVersion::V1,
                level: ErrorLevel::M,
                mask: MaskPattern::P2,
            })
        );
        assert!(ev.is_simple_quad());
    }

    #[test]
    fn descriptor_is_omitted_for_linear_codes_and_auto_versions() {
        let raw = memory_with(b"4901234567894", SQUARE);
        let view = MemoryView::new(&raw);
        let ean = decode_event(&view, raw_event(5, 3, 1, 2), 64).unwrap();
        assert_eq!(ean.symbology, Symbology::Ean13);
        assert_eq!(ean.qr, None);

        let auto = decode_event(&view, raw_event(1, 2, 1, 2), 64).unwrap();
        assert_eq!(auto.qr, None);

        let bad_mask = decode_event(&view, raw_event(2, 43, 0, 9), 64).unwrap();
        assert_eq!(bad_mask.qr, None);
    }

    #[test]
    fn unknown_symbology_is_rejected() {
        let raw = memory_with(b"x", SQUARE);
        assert_eq!(
            decode_event(&MemoryView::new(&raw), raw_event(99, 0, 0, 0), 64),
            Err(CodecError::UnknownEngineId {
                kind: "symbology",
                id: 99
            })
        );
    }

    #[test]
    fn text_scan_is_bounded() {
        let raw = memory_with(b"0123456789", SQUARE);
        let view = MemoryView::new(&raw);
        assert!(matches!(
            decode_event(&view, raw_event(1, 3, 1, 2), 4),
            Err(CodecError::MalformedString { offset: 8, limit: 4 })
        ));

        let mut ev = raw_event(1, 3, 1, 2);
        ev.text = Offset::new(4096);
        assert!(matches!(
            decode_event(&view, ev, 64),
            Err(CodecError::MalformedString { .. })
        ));
    }

    #[test]
    fn geometry_outside_memory_or_non_finite_is_malformed() {
        let raw = memory_with(b"x", SQUARE);
        let view = MemoryView::new(&raw);
        let mut ev = raw_event(1, 3, 1, 2);
        ev.points = Offset::new(80);
        assert!(matches!(
            decode_event(&view, ev, 64),
            Err(CodecError::MalformedGeometry { .. })
        ));
        ev.points = Offset::new(u32::MAX - 15);
        assert!(matches!(
            decode_event(&view, ev, 64),
            Err(CodecError::MalformedGeometry { .. })
        ));

        let mut pts = SQUARE;
        pts[5] = f32::NAN;
        let raw = memory_with(b"x", pts);
        assert!(matches!(
            decode_event(&MemoryView::new(&raw), raw_event(1, 3, 1, 2), 64),
            Err(CodecError::MalformedGeometry { .. })
        ));
    }

    #[test]
    fn bow_tie_and_degenerate_quads_are_not_simple() {
        let raw = memory_with(b"x", [0.0, 0.0, 10.0, 10.0, 10.0, 0.0, 0.0, 10.0]);
        let ev = decode_event(&MemoryView::new(&raw), raw_event(1, 3, 1, 2), 64).unwrap();
        assert!(!ev.is_simple_quad());

        let raw = memory_with(b"x", [1.0; 8]);
        let ev = decode_event(&MemoryView::new(&raw), raw_event(1, 3, 1, 2), 64).unwrap();
        assert!(!ev.is_simple_quad());
    }

    #[test]
    fn invalid_utf8_is_kept_in_bytes() {
        let raw = memory_with(&[0x82, 0xA0], SQUARE);
        let ev = decode_event(&MemoryView::new(&raw), raw_event(1, 3, 1, 2), 64).unwrap();
        assert_eq!(ev.bytes, vec![0x82, 0xA0]);
        assert!(ev.text.contains('\u{FFFD}'));
    }
}
