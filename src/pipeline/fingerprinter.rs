//! Blank detection and content hashing of icon fragments

use image::RgbaImage;
use sha2::{Digest, Sha256};

use super::splitter::IconFragment;
use crate::config::FingerprintConfig;
use crate::models::Fingerprint;

/// Classifies fragments as blank or hashes their pixels
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    border_px: u32,
    white_floor: u8,
    alpha_ceiling: u8,
    placeholder_prefixes: Vec<String>,
}

impl Fingerprinter {
    pub fn new(config: &FingerprintConfig) -> Self {
        Self {
            border_px: config.blank_border_px,
            white_floor: config.white_floor,
            alpha_ceiling: config.alpha_ceiling,
            placeholder_prefixes: config.placeholder_prefixes.clone(),
        }
    }

    pub fn classify(&self, fragment: &IconFragment) -> Fingerprint {
        if self.is_blank(&fragment.image) {
            return Fingerprint::Blank;
        }

        if self.is_placeholder(&fragment.image) {
            return Fingerprint::Blank;
        }

        Fingerprint::Digest(Self::digest(&fragment.image))
    }

    /// Placeholder prefixes are matched against the hash of the bare pixel
    /// bytes, the form in which the endpoint's generic icon is known
    fn is_placeholder(&self, image: &RgbaImage) -> bool {
        if self.placeholder_prefixes.is_empty() {
            return false;
        }
        let pixels = hex::encode(Sha256::digest(image.as_raw()));
        self.placeholder_prefixes
            .iter()
            .any(|prefix| pixels.starts_with(prefix.as_str()))
    }

    /// True when every pixel inside the tolerance border is white or transparent
    ///
    /// Fragments too small to have an interior are inspected in full.
    pub fn is_blank(&self, image: &RgbaImage) -> bool {
        let (width, height) = image.dimensions();
        let border = self.border_px;
        let (x_range, y_range) = if width > border * 2 && height > border * 2 {
            (border..width - border, border..height - border)
        } else {
            (0..width, 0..height)
        };

        y_range.clone().all(|y| {
            x_range.clone().all(|x| {
                let [r, g, b, a] = image.get_pixel(x, y).0;
                a <= self.alpha_ceiling
                    || (r >= self.white_floor && g >= self.white_floor && b >= self.white_floor)
            })
        })
    }

    /// SHA-256 over the dimensions and RGBA8 pixels in row-major order, as
    /// lowercase hex
    ///
    /// Width and height go in first as big-endian `u32`s, so equal pixel
    /// bytes in different shapes never collide. Never depends on the
    /// container the image came in.
    pub fn digest(image: &RgbaImage) -> String {
        let (width, height) = image.dimensions();
        let mut hasher = Sha256::new();
        hasher.update(width.to_be_bytes());
        hasher.update(height.to_be_bytes());
        hasher.update(image.as_raw());
        hex::encode(hasher.finalize())
    }
}

impl Default for Fingerprinter {
    fn default() -> Self {
        Self::new(&FingerprintConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Domain;
    use image::{DynamicImage, ImageFormat, Rgba, RgbImage};
    use std::io::Cursor;

    fn fragment(image: RgbaImage) -> IconFragment {
        IconFragment {
            domain: Domain::parse("a.com").unwrap(),
            image,
        }
    }

    fn red_square() -> RgbaImage {
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255]));
        for y in 4..12 {
            for x in 4..12 {
                img.put_pixel(x, y, Rgba([220, 20, 20, 255]));
            }
        }
        img
    }

    #[test]
    fn test_white_and_transparent_are_blank() {
        let fp = Fingerprinter::default();
        let white = RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255]));
        let clear = RgbaImage::from_pixel(16, 16, Rgba([12, 200, 3, 0]));
        let near_white = RgbaImage::from_pixel(16, 16, Rgba([250, 248, 252, 255]));

        assert_eq!(fp.classify(&fragment(white)), Fingerprint::Blank);
        assert_eq!(fp.classify(&fragment(clear)), Fingerprint::Blank);
        assert_eq!(fp.classify(&fragment(near_white)), Fingerprint::Blank);
    }

    #[test]
    fn test_border_noise_is_ignored() {
        let fp = Fingerprinter::default();
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        img.put_pixel(15, 7, Rgba([0, 0, 0, 255]));
        assert_eq!(fp.classify(&fragment(img)), Fingerprint::Blank);
    }

    #[test]
    fn test_colored_region_gets_digest() {
        let fp = Fingerprinter::default();
        let result = fp.classify(&fragment(red_square()));
        let digest = result.digest().expect("red square should hash");
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, Fingerprinter::digest(&red_square()));
    }

    #[test]
    fn test_single_interior_pixel_counts() {
        let fp = Fingerprinter::default();
        let mut img = RgbaImage::from_pixel(16, 16, Rgba([255, 255, 255, 255]));
        img.put_pixel(8, 8, Rgba([0, 0, 255, 255]));
        assert!(!fp.classify(&fragment(img)).is_blank());
    }

    #[test]
    fn test_tiny_fragment_inspected_in_full() {
        let fp = Fingerprinter::default();
        let img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        assert!(!fp.classify(&fragment(img)).is_blank());
    }

    #[test]
    fn test_placeholder_prefix_is_blank() {
        let img = red_square();
        let pixels = hex::encode(Sha256::digest(img.as_raw()));
        let config = FingerprintConfig {
            placeholder_prefixes: vec![pixels[..8].to_string()],
            ..FingerprintConfig::default()
        };
        let fp = Fingerprinter::new(&config);
        assert_eq!(fp.classify(&fragment(img.clone())), Fingerprint::Blank);

        // The shape-aware digest is not what placeholders are matched on
        let shaped = Fingerprinter::digest(&img);
        let config = FingerprintConfig {
            placeholder_prefixes: vec![shaped[..8].to_string()],
            ..FingerprintConfig::default()
        };
        assert!(!Fingerprinter::new(&config).classify(&fragment(img)).is_blank());
    }

    #[test]
    fn test_same_pixels_different_shape_differ() {
        let square = RgbaImage::from_pixel(16, 16, Rgba([200, 0, 0, 255]));
        let tall = RgbaImage::from_pixel(8, 32, Rgba([200, 0, 0, 255]));
        assert_eq!(square.as_raw(), tall.as_raw());

        let fp = Fingerprinter::default();
        assert_ne!(fp.classify(&fragment(square)), fp.classify(&fragment(tall)));
    }

    #[test]
    fn test_digest_independent_of_container() {
        let rgba = red_square();

        let mut png_rgba = Vec::new();
        rgba.write_to(&mut Cursor::new(&mut png_rgba), ImageFormat::Png)
            .unwrap();

        let rgb: RgbImage = DynamicImage::ImageRgba8(rgba.clone()).to_rgb8();
        let mut png_rgb = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut png_rgb), ImageFormat::Png)
            .unwrap();

        let mut bmp = Vec::new();
        DynamicImage::ImageRgb8(rgb)
            .write_to(&mut Cursor::new(&mut bmp), ImageFormat::Bmp)
            .unwrap();

        let digests: Vec<String> = [png_rgba, png_rgb, bmp]
            .iter()
            .map(|bytes| {
                let decoded = image::load_from_memory(bytes).unwrap().to_rgba8();
                Fingerprinter::digest(&decoded)
            })
            .collect();

        assert_eq!(digests[0], digests[1]);
        assert_eq!(digests[1], digests[2]);
        assert_eq!(digests[0], Fingerprinter::digest(&rgba));
    }
}
