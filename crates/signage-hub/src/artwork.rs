//! Uploaded artwork conversion
//!
//! Runs before anything is written so a failed conversion leaves the sign
//! untouched.

use crate::Result;
use image::imageops::FilterType;
use image::ImageOutputFormat;
use std::io::Cursor;

/// Width of the preview derived from uploaded artwork
pub const PREVIEW_WIDTH: u32 = 500;

/// Turns uploaded artwork into a PNG preview
pub trait ArtworkConverter: Send + Sync {
    fn to_png(&self, source: &[u8]) -> Result<Vec<u8>>;
}

/// Raster converter: any format the `image` crate decodes
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageConverter;

impl ArtworkConverter for ImageConverter {
    fn to_png(&self, source: &[u8]) -> Result<Vec<u8>> {
        let img = image::load_from_memory(source)?;
        let height = (img.height() as u64 * PREVIEW_WIDTH as u64 / img.width().max(1) as u64) as u32;
        let resized = img.resize_exact(PREVIEW_WIDTH, height.max(1), FilterType::Triangle);

        let mut png = Vec::new();
        resized.write_to(&mut Cursor::new(&mut png), ImageOutputFormat::Png)?;
        Ok(png)
    }
}
