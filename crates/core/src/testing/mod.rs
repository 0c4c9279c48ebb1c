//! Testing utilities and mock implementations.
//!
//! This module provides mocks for every injected collaborator of the
//! conversion pipeline, so orchestrator behaviour can be tested without real
//! codecs, external tools or a filesystem.
//!
//! # Example
//!
//! ```rust,ignore
//! use convertfun_core::testing::{MockConverter, RecordingRetriever};
//!
//! let converter = MockConverter::new().with_delay_ms(20);
//! converter.set_delay_for("slow.png", Duration::from_millis(200)).await;
//! converter.set_fail_for("broken.png").await;
//!
//! // Build a ConversionOrchestrator around it...
//! ```

mod mock_converter;
mod mock_heic;
mod mock_raster;
mod recording_retriever;

pub use mock_converter::{MockConverter, RecordedConversion};
pub use mock_heic::{MockHeicDecoder, RecordedHeicCall};
pub use mock_raster::MockRasterCodec;
pub use recording_retriever::{RecordedRetrieval, RecordingRetriever};

/// Test fixtures and helper functions.
pub mod fixtures {
    use image::codecs::avif::AvifEncoder;
    use image::codecs::jpeg::JpegEncoder;
    use image::codecs::png::PngEncoder;
    use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

    /// An 8x8 SVG filled with opaque red.
    pub const SVG_SQUARE: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="8" height="8" viewBox="0 0 8 8"><rect x="0" y="0" width="8" height="8" fill="#ff0000"/></svg>"##;

    /// A minimal GIF89a header. Enough for extension and passthrough tests.
    pub const GIF_HEADER: &[u8] = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";

    /// A gradient RGB image.
    pub fn rgb_image(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x * 40 % 256) as u8, (y * 40 % 256) as u8, 128])
        })
    }

    /// An RGBA image whose alpha varies per pixel.
    pub fn rgba_image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([200, (x * 30 % 256) as u8, (y * 30 % 256) as u8, ((x + y) * 50 % 256) as u8])
        })
    }

    /// PNG-encoded gradient image.
    pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(rgb_image(width, height))
            .write_with_encoder(PngEncoder::new(&mut buf))
            .expect("encode PNG fixture");
        buf
    }

    /// PNG-encoded image with transparency.
    pub fn transparent_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(rgba_image(width, height))
            .write_with_encoder(PngEncoder::new(&mut buf))
            .expect("encode PNG fixture");
        buf
    }

    /// JPEG-encoded gradient image.
    pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(rgb_image(width, height))
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buf, 90))
            .expect("encode JPEG fixture");
        buf
    }

    /// AVIF-encoded image with transparency.
    pub fn avif_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(rgba_image(width, height))
            .write_with_encoder(AvifEncoder::new(&mut buf))
            .expect("encode AVIF fixture");
        buf
    }
}
