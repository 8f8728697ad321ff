//! RGBA images and the engine's image record layout.
//!
//! An image record is `{ width: u32, height: u32, pixels: u32 }` followed
//! directly by `width * height * 4` row-major RGBA bytes. The `pixels`
//! field points at those bytes.

use crate::memory::{ImageRecord, MemoryView, MemoryViewMut, Offset, PixelBuffer};
use crate::CodecError;
use serde::{Deserialize, Serialize};

/// Size of the `{ width, height, pixels }` header.
pub const IMAGE_HEADER_LEN: u32 = 12;
pub const BYTES_PER_PIXEL: usize = 4;

/// Borrowed RGBA image.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8], // row-major, len = w*h*4
}

/// Owned RGBA image. `data.len() == width * height * 4` always holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawImage")]
pub struct Image {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

#[derive(Deserialize)]
struct RawImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl TryFrom<RawImage> for Image {
    type Error = CodecError;

    fn try_from(raw: RawImage) -> Result<Self, Self::Error> {
        Image::new(raw.width, raw.height, raw.data)
    }
}

/// Number of pixel bytes for a `width` x `height` image.
///
/// Fails with `BufferTooLarge` when the full record (header + pixels) would
/// not be addressable by a 32-bit offset.
pub fn pixel_len(width: u32, height: u32) -> Result<usize, CodecError> {
    u64::from(width)
        .checked_mul(u64::from(height))
        .and_then(|px| px.checked_mul(BYTES_PER_PIXEL as u64))
        .filter(|len| len + u64::from(IMAGE_HEADER_LEN) <= u64::from(u32::MAX))
        .map(|len| len as usize)
        .ok_or(CodecError::BufferTooLarge { width, height })
}

/// Bytes needed for a complete image record.
pub fn image_record_len(width: u32, height: u32) -> Result<u32, CodecError> {
    // pixel_len guarantees the sum fits.
    Ok(pixel_len(width, height)? as u32 + IMAGE_HEADER_LEN)
}

impl Image {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self, CodecError> {
        let expected = pixel_len(width, height)?;
        if data.len() != expected {
            return Err(CodecError::InvalidOption {
                kind: "image",
                value: format!(
                    "{width}x{height} needs {expected} RGBA bytes, got {}",
                    data.len()
                ),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL;
        let px = &self.data[idx..idx + BYTES_PER_PIXEL];
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Set every alpha byte to 255.
    pub fn force_opaque(&mut self) {
        for px in self.data.chunks_exact_mut(BYTES_PER_PIXEL) {
            px[3] = 255;
        }
    }

    /// Reduce to a 1-bit matrix sampling every `step`-th pixel in both
    /// directions. `true` means light (non-zero red channel).
    pub fn binarize(&self, step: u32) -> Vec<Vec<bool>> {
        let step = step.max(1) as usize;
        (0..self.height as usize)
            .step_by(step)
            .map(|y| {
                (0..self.width as usize)
                    .step_by(step)
                    .map(|x| self.data[(y * self.width as usize + x) * BYTES_PER_PIXEL] != 0)
                    .collect()
            })
            .collect()
    }

    /// [`Image::binarize`] rendered as `'1'` (light) / `'0'` (dark) rows
    /// joined by newlines.
    pub fn bit_rows(&self, step: u32) -> String {
        self.binarize(step)
            .iter()
            .map(|row| row.iter().map(|&b| if b { '1' } else { '0' }).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Write `img` as an image record at `at`; the pixel bytes follow the header.
pub fn write_image_record(
    mem: &mut MemoryViewMut<'_>,
    at: Offset<ImageRecord>,
    img: ImageView<'_>,
) -> Result<(), CodecError> {
    let len = pixel_len(img.width, img.height)?;
    if img.data.len() != len {
        return Err(CodecError::InvalidOption {
            kind: "image",
            value: format!("expected {len} RGBA bytes, got {}", img.data.len()),
        });
    }
    let pixels: Offset<PixelBuffer> =
        at.offset_by(IMAGE_HEADER_LEN)
            .ok_or(CodecError::BufferTooLarge {
                width: img.width,
                height: img.height,
            })?;
    mem.write_u32(at, 0, img.width)?;
    mem.write_u32(at, 4, img.height)?;
    mem.write_u32(at, 8, pixels.raw())?;
    mem.write_bytes(pixels, img.data)
}

/// Copy the image record at `at` out of linear memory.
///
/// The pixel bytes are copied, never aliased, so the result stays valid
/// after the arena is reset.
pub fn read_image_record(mem: &MemoryView<'_>, at: Offset<ImageRecord>) -> Result<Image, CodecError> {
    let width = mem.read_u32(at, 0)?;
    let height = mem.read_u32(at, 4)?;
    let pixels = Offset::<PixelBuffer>::new(mem.read_u32(at, 8)?);
    let len = pixel_len(width, height)?;
    let data = mem.slice(pixels, len)?.to_vec();
    Ok(Image {
        width,
        height,
        data,
    })
}

#[cfg(feature = "image")]
impl Image {
    pub fn to_rgba_image(&self) -> Result<::image::RgbaImage, CodecError> {
        let (width, height) = (self.width, self.height);
        ::image::RgbaImage::from_raw(width, height, self.data.clone())
            .ok_or(CodecError::BufferTooLarge { width, height })
    }

    pub fn from_rgba_image(img: &::image::RgbaImage) -> Self {
        Self {
            width: img.width(),
            height: img.height(),
            data: img.as_raw().clone(),
        }
    }
}

#[cfg(feature = "image")]
impl From<::image::RgbaImage> for Image {
    fn from(img: ::image::RgbaImage) -> Self {
        let (width, height) = img.dimensions();
        Self {
            width,
            height,
            data: img.into_raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(width: u32, height: u32) -> Image {
        let mut data = Vec::new();
        for y in 0..height {
            for x in 0..width {
                let v = if (x + y) % 2 == 0 { 255 } else { 0 };
                data.extend_from_slice(&[v, v, v, 128]);
            }
        }
        Image::new(width, height, data).unwrap()
    }

    #[test]
    fn length_must_match_dimensions() {
        assert!(Image::new(2, 2, vec![0; 16]).is_ok());
        assert!(matches!(
            Image::new(2, 2, vec![0; 15]),
            Err(CodecError::InvalidOption { kind: "image", .. })
        ));
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        assert_eq!(
            pixel_len(u32::MAX, 2),
            Err(CodecError::BufferTooLarge {
                width: u32::MAX,
                height: 2
            })
        );
        assert!(pixel_len(32768, 32768).is_err());
        assert_eq!(image_record_len(19, 19).unwrap(), 12 + 19 * 19 * 4);
    }

    #[test]
    fn record_layout_is_little_endian_header_then_pixels() {
        let img = checker(3, 2);
        let mut raw = vec![0u8; 64];
        let at = Offset::new(8);
        write_image_record(&mut MemoryViewMut::new(&mut raw), at, img.view()).unwrap();

        assert_eq!(&raw[8..12], &3u32.to_le_bytes());
        assert_eq!(&raw[12..16], &2u32.to_le_bytes());
        assert_eq!(&raw[16..20], &20u32.to_le_bytes());
        assert_eq!(&raw[20..44], img.data());

        let back = read_image_record(&MemoryView::new(&raw), at).unwrap();
        assert_eq!(back, img);
    }

    #[test]
    fn read_copies_out_of_memory() {
        let img = checker(2, 2);
        let mut raw = vec![0u8; 40];
        write_image_record(&mut MemoryViewMut::new(&mut raw), Offset::new(0), img.view()).unwrap();
        let back = read_image_record(&MemoryView::new(&raw), Offset::new(0)).unwrap();
        raw.fill(0);
        assert_eq!(back, img);
    }

    #[test]
    fn record_that_does_not_fit_is_out_of_bounds() {
        let img = checker(4, 4);
        let mut raw = vec![0u8; 32];
        assert!(matches!(
            write_image_record(&mut MemoryViewMut::new(&mut raw), Offset::new(0), img.view()),
            Err(CodecError::OutOfBounds { .. })
        ));

        // Engine claims a pixel buffer beyond the end of memory.
        let mut raw = vec![0u8; 32];
        raw[0..4].copy_from_slice(&2u32.to_le_bytes());
        raw[4..8].copy_from_slice(&2u32.to_le_bytes());
        raw[8..12].copy_from_slice(&30u32.to_le_bytes());
        assert!(read_image_record(&MemoryView::new(&raw), Offset::new(0)).is_err());
    }

    #[test]
    fn binarize_samples_with_step() {
        let img = checker(4, 4);
        assert_eq!(img.bit_rows(1), "1010\n0101\n1010\n0101");
        assert_eq!(img.bit_rows(2), "11\n11");
        assert_eq!(img.binarize(0).len(), 4);
    }

    #[test]
    fn force_opaque_only_touches_alpha() {
        let mut img = checker(2, 1);
        img.force_opaque();
        assert_eq!(img.pixel(0, 0), Some([255, 255, 255, 255]));
        assert_eq!(img.pixel(1, 0), Some([0, 0, 0, 255]));
        assert_eq!(img.pixel(2, 0), None);
    }

    #[cfg(feature = "image")]
    #[test]
    fn rgba_image_conversion_keeps_pixels() {
        let img = checker(3, 2);
        let rgba = img.to_rgba_image().unwrap();
        assert_eq!(rgba.dimensions(), (3, 2));
        assert_eq!(rgba.as_raw(), img.data());
        assert_eq!(Image::from_rgba_image(&rgba), img);
    }

    #[test]
    fn serde_validates_length() {
        let ok = r#"{"width":1,"height":1,"data":[1,2,3,4]}"#;
        assert!(serde_json::from_str::<Image>(ok).is_ok());
        let bad = r#"{"width":2,"height":1,"data":[1,2,3,4]}"#;
        assert!(serde_json::from_str::<Image>(bad).is_err());
    }
}
