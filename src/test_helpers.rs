use image::{Rgb, RgbImage};
use std::{
    path::{Path, PathBuf},
    sync::Once,
};

static INIT: Once = Once::new();

pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .init();
    });
}

/// Writes a small gradient image, encoded according to the extension of `name`.
pub fn write_test_image(folder: &Path, name: &str, w: u32, h: u32) -> PathBuf {
    let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x * 10) as u8, (y * 10) as u8, 128]));
    let path = folder.join(name);
    img.save(&path).unwrap();
    path
}
