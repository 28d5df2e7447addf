//! Integer-factor image downsampling.
//!
//! Each side is divided by the divisor (floor, at least one pixel) and
//! resampled with a bilinear filter. BGR and RGB buffers resize the same
//! way since channels are treated independently.

use bytes::Bytes;
use contracts::{DeviceError, ImageData, PixelFormat};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma, Pixel, Rgb};

/// Output dimensions for `divisor`
pub fn target_size(width: u32, height: u32, divisor: u32) -> (u32, u32) {
    let divisor = divisor.max(1);
    ((width / divisor).max(1), (height / divisor).max(1))
}

/// Downsample `image` by `divisor` on each side.
///
/// A divisor of 1 returns the image untouched.
///
/// # Errors
/// `DeviceError::IncompleteFrame` when the buffer is shorter than its
/// dimensions require.
pub fn downsample(image: ImageData, divisor: u32) -> Result<ImageData, DeviceError> {
    if !image.is_complete() {
        return Err(DeviceError::incomplete(format!(
            "expected {} bytes for {}x{} {}, got {}",
            image.expected_len(),
            image.width,
            image.height,
            image.format,
            image.data.len()
        )));
    }
    if divisor <= 1 {
        return Ok(image);
    }

    let (width, height) = target_size(image.width, image.height, divisor);
    let data = match image.format {
        PixelFormat::Mono8 => resize::<Luma<u8>>(&image, width, height),
        PixelFormat::Rgb8 | PixelFormat::Bgr8 => resize::<Rgb<u8>>(&image, width, height),
    }?;

    Ok(ImageData {
        width,
        height,
        format: image.format,
        data: Bytes::from(data),
    })
}

fn resize<P>(image: &ImageData, width: u32, height: u32) -> Result<Vec<u8>, DeviceError>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    let source: ImageBuffer<P, Vec<u8>> =
        ImageBuffer::from_raw(image.width, image.height, image.data.to_vec())
            .ok_or_else(|| DeviceError::incomplete("buffer does not match dimensions"))?;

    Ok(imageops::resize(&source, width, height, FilterType::Triangle).into_raw())
}
