//! Helpers shared by the integration tests

#![allow(dead_code)]

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::time::Duration;

use favicon_recon::config::Config;
use favicon_recon::models::Domain;

pub const SLOT: u32 = 16;

/// Horizontal strip with one slot per name; names starting with "red" get a
/// red square, everything else stays white
pub fn composite_png(names: &[&str]) -> Vec<u8> {
    let width = SLOT * names.len().max(1) as u32;
    let mut image = RgbaImage::from_pixel(width, SLOT, Rgba([255, 255, 255, 255]));
    for (i, name) in names.iter().enumerate() {
        if name.starts_with("red") {
            for y in 4..12 {
                for x in 4..12 {
                    image.put_pixel(i as u32 * SLOT + x, y, Rgba([200, 0, 0, 255]));
                }
            }
        }
    }
    let mut out = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

/// Config pointed at `endpoint` with fast, jitter-free retries
pub fn test_config(endpoint: &str, batch_size: usize) -> Config {
    let mut config = Config::default();
    config.endpoint.url = endpoint.to_string();
    config.batching.max_batch_size = batch_size;
    config.fetch.threads = 4;
    config.fetch.max_attempts = 3;
    config.fetch.initial_backoff = Duration::from_millis(1);
    config.fetch.max_backoff = Duration::from_millis(5);
    config.fetch.jitter = false;
    config.validate().unwrap();
    config
}

pub fn domains(names: &[&str]) -> Vec<Domain> {
    names.iter().map(|n| Domain::parse(n).unwrap()).collect()
}
