//! Raster decode/encode surface.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use resvg::{tiny_skia, usvg};

use super::error::ConversionError;
use super::types::quality_percent;
use crate::format::{DecoderClass, FormatId, RasterTarget};

/// Turns bytes into pixels and pixels back into bytes.
///
/// Both calls are CPU-bound and run on the blocking pool.
pub trait RasterCodec: Send + Sync {
    /// Decodes `bytes` of the given source format into a pixel surface.
    fn decode(&self, bytes: &[u8], source: FormatId) -> Result<DynamicImage, ConversionError>;

    /// Encodes a surface into `target` at `quality` (0.0 - 1.0).
    ///
    /// `quality` applies to lossy targets only. WebP output is lossless.
    fn encode(
        &self,
        surface: &DynamicImage,
        target: RasterTarget,
        quality: f32,
    ) -> Result<Vec<u8>, ConversionError>;
}

/// [`RasterCodec`] backed by the `image` crate, with SVG rasterized by `resvg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRasterCodec;

impl ImageRasterCodec {
    pub fn new() -> Self {
        Self
    }

    fn rasterize_svg(bytes: &[u8]) -> Result<DynamicImage, ConversionError> {
        let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
            .map_err(|e| ConversionError::decode_failure(format!("invalid SVG: {}", e)))?;

        let size = tree.size().to_int_size();
        let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height())
            .ok_or_else(|| ConversionError::decode_failure("SVG has an empty canvas"))?;
        resvg::render(&tree, tiny_skia::Transform::default(), &mut pixmap.as_mut());

        // tiny-skia stores premultiplied alpha
        let mut rgba = RgbaImage::new(size.width(), size.height());
        for (dst, src) in rgba.pixels_mut().zip(pixmap.pixels()) {
            let c = src.demultiply();
            *dst = Rgba([c.red(), c.green(), c.blue(), c.alpha()]);
        }
        Ok(DynamicImage::ImageRgba8(rgba))
    }
}

impl RasterCodec for ImageRasterCodec {
    fn decode(&self, bytes: &[u8], source: FormatId) -> Result<DynamicImage, ConversionError> {
        match source.descriptor().decoder {
            DecoderClass::Vector => Self::rasterize_svg(bytes),
            DecoderClass::Raster => image::load_from_memory(bytes)
                .map_err(|e| ConversionError::decode_failure(e.to_string())),
            DecoderClass::Heic | DecoderClass::Opaque => Err(ConversionError::decode_failure(
                format!("{:?} cannot be decoded by the raster surface", source),
            )),
        }
    }

    fn encode(
        &self,
        surface: &DynamicImage,
        target: RasterTarget,
        quality: f32,
    ) -> Result<Vec<u8>, ConversionError> {
        let mut buf = Vec::new();
        let has_alpha = surface.color().has_alpha();

        let result = match target {
            RasterTarget::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(surface.to_rgb8());
                rgb.write_with_encoder(JpegEncoder::new_with_quality(
                    &mut buf,
                    quality_percent(quality),
                ))
            }
            RasterTarget::Png => {
                normalized(surface, has_alpha).write_with_encoder(PngEncoder::new(&mut buf))
            }
            // The image crate only ships a lossless WebP encoder; quality is unused.
            RasterTarget::Webp => normalized(surface, has_alpha)
                .write_with_encoder(WebPEncoder::new_lossless(&mut buf)),
        };

        result.map_err(|e| ConversionError::encode_failure(e.to_string()))?;
        Ok(buf)
    }
}

/// Converts to 8-bit RGB or RGBA, the layouts every encoder here accepts.
fn normalized(surface: &DynamicImage, keep_alpha: bool) -> DynamicImage {
    if keep_alpha {
        DynamicImage::ImageRgba8(surface.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(surface.to_rgb8())
    }
}

/// Composites `surface` over an opaque `background`, dropping the alpha channel.
pub fn flatten_onto(surface: &DynamicImage, background: Rgb<u8>) -> DynamicImage {
    if !surface.color().has_alpha() {
        return DynamicImage::ImageRgb8(surface.to_rgb8());
    }

    let rgba = surface.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, px) in rgba.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        let alpha = a as u32;
        let blend = |fg: u8, bg: u8| {
            ((fg as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8
        };
        out.put_pixel(
            x,
            y,
            Rgb([
                blend(r, background.0[0]),
                blend(g, background.0[1]),
                blend(b, background.0[2]),
            ]),
        );
    }
    DynamicImage::ImageRgb8(out)
}
