use image::{DynamicImage, ImageOutputFormat};
use reolink_common::CanonicalImage;
use std::io::Cursor;

use crate::device::CapturedFrame;
use crate::error::Result;

pub const JPEG_QUALITY: u8 = 90;

/// Re-encodes a captured frame as JPEG. The JPEG encoder takes neither alpha
/// nor 16-bit channels, so the frame is flattened to 8-bit RGB first.
pub fn to_canonical_jpeg(frame: &CapturedFrame) -> Result<CanonicalImage> {
    let rgb = DynamicImage::ImageRgb8(frame.image.to_rgb8());

    let mut data = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut data), ImageOutputFormat::Jpeg(JPEG_QUALITY))?;

    Ok(CanonicalImage::jpeg(data))
}
