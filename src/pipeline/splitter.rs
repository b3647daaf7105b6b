//! Slice a composite favicon image into per-domain fragments

use bytes::Bytes;
use image::{RgbaImage, imageops};
use tracing::trace;

use crate::config::SlotLayout;
use crate::errors::{DecodeError, DecodeResult};
use crate::models::Domain;

/// Raw image bytes returned by one batch request
#[derive(Debug, Clone)]
pub struct CompositeImage {
    bytes: Bytes,
}

impl CompositeImage {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// One domain's slot, decoded to RGBA8
#[derive(Debug, Clone)]
pub struct IconFragment {
    pub domain: Domain,
    pub image: RgbaImage,
}

impl IconFragment {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Axis along which slots are laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Cuts a composite into equal slots, one per requested domain
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSplitter {
    layout: SlotLayout,
}

impl ImageSplitter {
    pub fn new(layout: SlotLayout) -> Self {
        Self { layout }
    }

    /// Decode `composite` and return one fragment per domain, in order
    pub fn split(
        &self,
        composite: CompositeImage,
        domains: &[Domain],
    ) -> DecodeResult<Vec<IconFragment>> {
        if domains.is_empty() {
            return Err(DecodeError::NoDomains);
        }

        let decoded = image::load_from_memory(composite.as_bytes()).map_err(|e| {
            DecodeError::Unreadable {
                message: e.to_string(),
            }
        })?;
        drop(composite);
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();

        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyImage { width, height });
        }

        if domains.len() == 1 {
            return Ok(vec![IconFragment {
                domain: domains[0].clone(),
                image: rgba,
            }]);
        }

        let slots = u32::try_from(domains.len()).map_err(|_| DecodeError::SlotMismatch {
            width,
            height,
            slots: domains.len(),
        })?;
        let axis = resolve_axis(self.layout, width, height, slots)?;
        trace!(
            "Splitting {}x{} composite into {} {:?} slots",
            width, height, slots, axis
        );

        let fragments = domains
            .iter()
            .enumerate()
            .map(|(i, domain)| {
                let i = i as u32;
                let view = match axis {
                    Axis::Horizontal => {
                        let slot = width / slots;
                        imageops::crop_imm(&rgba, i * slot, 0, slot, height)
                    }
                    Axis::Vertical => {
                        let slot = height / slots;
                        imageops::crop_imm(&rgba, 0, i * slot, width, slot)
                    }
                };
                IconFragment {
                    domain: domain.clone(),
                    image: view.to_image(),
                }
            })
            .collect();

        Ok(fragments)
    }
}

fn resolve_axis(layout: SlotLayout, width: u32, height: u32, slots: u32) -> DecodeResult<Axis> {
    let fits_width = width % slots == 0;
    let fits_height = height % slots == 0;
    let mismatch = || DecodeError::SlotMismatch {
        width,
        height,
        slots: slots as usize,
    };

    match layout {
        SlotLayout::Horizontal if fits_width => Ok(Axis::Horizontal),
        SlotLayout::Vertical if fits_height => Ok(Axis::Vertical),
        SlotLayout::Horizontal | SlotLayout::Vertical => Err(mismatch()),
        SlotLayout::Auto => {
            // Square slots are the strongest signal of the real layout
            if fits_width && width / slots == height {
                Ok(Axis::Horizontal)
            } else if fits_height && height / slots == width {
                Ok(Axis::Vertical)
            } else if fits_width {
                Ok(Axis::Horizontal)
            } else if fits_height {
                Ok(Axis::Vertical)
            } else {
                Err(mismatch())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn domains(n: usize) -> Vec<Domain> {
        (0..n)
            .map(|i| Domain::parse(&format!("d{i}.com")).unwrap())
            .collect()
    }

    fn encode(image: &RgbaImage) -> CompositeImage {
        let mut out = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        CompositeImage::new(out)
    }

    /// Each slot filled with a distinct colour derived from its index
    fn strip(slots: u32, slot: u32, horizontal: bool) -> RgbaImage {
        let (w, h) = if horizontal {
            (slots * slot, slot)
        } else {
            (slot, slots * slot)
        };
        RgbaImage::from_fn(w, h, |x, y| {
            let idx = if horizontal { x / slot } else { y / slot };
            Rgba([(idx * 40) as u8, (x % 7) as u8 * 30, (y % 5) as u8 * 50, 255])
        })
    }

    #[test]
    fn test_split_round_trip_horizontal() {
        let original = strip(4, 16, true);
        let fragments = ImageSplitter::default()
            .split(encode(&original), &domains(4))
            .unwrap();

        assert_eq!(fragments.len(), 4);
        let mut rebuilt = RgbaImage::new(64, 16);
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.domain, domains(4)[i]);
            assert_eq!((fragment.width(), fragment.height()), (16, 16));
            imageops::replace(&mut rebuilt, &fragment.image, i as i64 * 16, 0);
        }
        assert_eq!(rebuilt, original);
    }

    #[test]
    fn test_split_vertical_strip_detected_automatically() {
        let original = strip(3, 16, false);
        let fragments = ImageSplitter::default()
            .split(encode(&original), &domains(3))
            .unwrap();

        for (i, fragment) in fragments.iter().enumerate() {
            let expected = imageops::crop_imm(&original, 0, i as u32 * 16, 16, 16).to_image();
            assert_eq!(fragment.image, expected);
        }
    }

    #[test]
    fn test_forced_layout_rejects_indivisible_axis() {
        let original = strip(3, 16, false); // 16x48
        let result = ImageSplitter::new(SlotLayout::Horizontal).split(encode(&original), &domains(3));
        assert_eq!(
            result.unwrap_err(),
            DecodeError::SlotMismatch {
                width: 16,
                height: 48,
                slots: 3
            }
        );
    }

    #[test]
    fn test_single_domain_keeps_whole_image() {
        let original = RgbaImage::from_pixel(17, 13, Rgba([1, 2, 3, 255]));
        let fragments = ImageSplitter::default()
            .split(encode(&original), &domains(1))
            .unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].image, original);
    }

    #[test]
    fn test_indivisible_dimensions_fail() {
        let original = RgbaImage::from_pixel(50, 16, Rgba([0, 0, 0, 255]));
        let result = ImageSplitter::default().split(encode(&original), &domains(3));
        assert!(matches!(result, Err(DecodeError::SlotMismatch { .. })));
    }

    #[test]
    fn test_garbage_bytes_fail() {
        let result = ImageSplitter::default().split(CompositeImage::new(&b"not an image"[..]), &domains(2));
        assert!(matches!(result, Err(DecodeError::Unreadable { .. })));
    }

    #[test]
    fn test_no_domains_fail() {
        let original = strip(1, 16, true);
        let result = ImageSplitter::default().split(encode(&original), &[]);
        assert_eq!(result.unwrap_err(), DecodeError::NoDomains);
    }
}
