//! Mock raster codec for testing.

use image::{DynamicImage, RgbaImage};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::converter::{ConversionError, RasterCodec};
use crate::format::{FormatId, RasterTarget};

/// Mock implementation of the RasterCodec trait.
///
/// Decoding yields a transparent surface of a fixed size; encoding yields a
/// marker naming the target. Either step can be made to fail.
#[derive(Debug)]
pub struct MockRasterCodec {
    width: u32,
    height: u32,
    fail_decode: AtomicBool,
    fail_encode: AtomicBool,
    decodes: AtomicUsize,
    encodes: AtomicUsize,
}

impl Default for MockRasterCodec {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl MockRasterCodec {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            fail_decode: AtomicBool::new(false),
            fail_encode: AtomicBool::new(false),
            decodes: AtomicUsize::new(0),
            encodes: AtomicUsize::new(0),
        }
    }

    pub fn set_fail_decode(&self, fail: bool) {
        self.fail_decode.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_encode(&self, fail: bool) {
        self.fail_encode.store(fail, Ordering::SeqCst);
    }

    pub fn decode_count(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn encode_count(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }
}

impl RasterCodec for MockRasterCodec {
    fn decode(&self, _bytes: &[u8], source: FormatId) -> Result<DynamicImage, ConversionError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        if self.fail_decode.load(Ordering::SeqCst) {
            return Err(ConversionError::decode_failure(format!(
                "mock decode failure for {:?}",
                source
            )));
        }
        Ok(DynamicImage::ImageRgba8(RgbaImage::new(
            self.width,
            self.height,
        )))
    }

    fn encode(
        &self,
        surface: &DynamicImage,
        target: RasterTarget,
        _quality: f32,
    ) -> Result<Vec<u8>, ConversionError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        if self.fail_encode.load(Ordering::SeqCst) {
            return Err(ConversionError::encode_failure("mock encode failure"));
        }
        let alpha = if surface.color().has_alpha() { "rgba" } else { "rgb" };
        Ok(format!("mock:{}:{}", target.mime(), alpha).into_bytes())
    }
}
