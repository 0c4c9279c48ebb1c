//! Strategy selection and execution.

use async_trait::async_trait;
use image::Rgb;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::config::ConverterConfig;
use super::error::{ConversionError, HeicError};
use super::heic::{HeicDecoder, HeifConvertDecoder};
use super::raster::{flatten_onto, ImageRasterCodec, RasterCodec};
use super::traits::Converter;
use super::types::{Artifact, ConversionJob, ENCODE_QUALITY};
use crate::format::{DecoderClass, FormatId, Operation, OperationKind, RasterTarget};
use crate::metrics::CONVERSION_DURATION;

/// How a (source format, operation) pair is transformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Copy the source bytes unchanged, tagged with the source content type.
    Passthrough,
    /// Decode into a pixel surface and encode into the target.
    RasterReencode(RasterTarget),
    /// Hand the bytes to the HEIF container decoder (HEIC, HEIF, AVIF).
    HeicReencode(RasterTarget),
}

impl Strategy {
    /// Picks the strategy from the operation's semantics and the source's
    /// decoder class. Fails when the catalog does not offer the operation.
    pub fn select(source: FormatId, operation: Operation) -> Result<Self, ConversionError> {
        let descriptor = source.descriptor();
        let not_allowed = || ConversionError::OperationNotAllowed {
            format: source,
            operation,
        };

        if !descriptor.allows(operation) {
            return Err(not_allowed());
        }

        match (descriptor.decoder, operation.kind()) {
            (_, OperationKind::Passthrough) => Ok(Self::Passthrough),
            (DecoderClass::Heic, OperationKind::Reencode(target)) => Ok(Self::HeicReencode(target)),
            (DecoderClass::Raster | DecoderClass::Vector, OperationKind::Reencode(target)) => {
                Ok(Self::RasterReencode(target))
            }
            (DecoderClass::Opaque, OperationKind::Reencode(_)) => Err(not_allowed()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Passthrough => "passthrough",
            Self::RasterReencode(_) => "raster",
            Self::HeicReencode(_) => "heic",
        }
    }
}

/// [`Converter`] that dispatches every job to its [`Strategy`].
pub struct StrategyConverter {
    raster: Arc<dyn RasterCodec>,
    heic: Arc<dyn HeicDecoder>,
    background: Rgb<u8>,
}

impl StrategyConverter {
    /// Creates a converter from explicit collaborators.
    pub fn new(
        raster: Arc<dyn RasterCodec>,
        heic: Arc<dyn HeicDecoder>,
        background: Rgb<u8>,
    ) -> Self {
        Self {
            raster,
            heic,
            background,
        }
    }

    /// Creates the production converter: `image` raster codec and `heif-convert`.
    pub fn from_config(config: &ConverterConfig) -> Self {
        let background = config.background_rgb().unwrap_or_else(|| {
            warn!(
                "Invalid background colour {:?}, falling back to white",
                config.background
            );
            Rgb([255, 255, 255])
        });

        Self::new(
            Arc::new(ImageRasterCodec::new()),
            Arc::new(HeifConvertDecoder::new(config)),
            background,
        )
    }

    async fn passthrough(&self, job: &ConversionJob) -> Result<Artifact, ConversionError> {
        let bytes = job.file.read().await?;
        Ok(Artifact::new(bytes, job.source.descriptor().mime()))
    }

    async fn raster_reencode(
        &self,
        job: &ConversionJob,
        target: RasterTarget,
    ) -> Result<Artifact, ConversionError> {
        let bytes = job.file.read().await?;
        let source = job.source;

        let codec = Arc::clone(&self.raster);
        let surface = tokio::task::spawn_blocking(move || codec.decode(&bytes, source))
            .await
            .map_err(|e| ConversionError::decode_failure(format!("decode task failed: {}", e)))??;

        let codec = Arc::clone(&self.raster);
        let background = self.background;
        let encoded = tokio::task::spawn_blocking(move || {
            let surface = if target.supports_alpha() {
                surface
            } else {
                flatten_onto(&surface, background)
            };
            codec.encode(&surface, target, ENCODE_QUALITY)
        })
        .await
        .map_err(|e| ConversionError::encode_failure(format!("encode task failed: {}", e)))??;

        Ok(Artifact::new(encoded, target.mime()))
    }

    async fn heic_reencode(
        &self,
        job: &ConversionJob,
        target: RasterTarget,
    ) -> Result<Artifact, ConversionError> {
        let bytes = job.file.read().await?;
        let encoded = self
            .heic
            .decode_to(&bytes, target.mime(), ENCODE_QUALITY)
            .await
            .map_err(|e: HeicError| {
                warn!("HEIC decoder {} failed for {}: {}", self.heic.name(), job.job_id, e);
                ConversionError::from(e)
            })?;
        Ok(Artifact::new(encoded, target.mime()))
    }
}

#[async_trait]
impl Converter for StrategyConverter {
    fn name(&self) -> &str {
        "strategy"
    }

    async fn convert(&self, job: ConversionJob) -> Result<Artifact, ConversionError> {
        let strategy = Strategy::select(job.source, job.operation)?;
        debug!(
            "Job {}: {:?} -> {} via {}",
            job.job_id,
            job.source,
            job.operation,
            strategy.name()
        );

        let start = Instant::now();
        let result = match strategy {
            Strategy::Passthrough => self.passthrough(&job).await,
            Strategy::RasterReencode(target) => self.raster_reencode(&job, target).await,
            Strategy::HeicReencode(target) => self.heic_reencode(&job, target).await,
        };

        CONVERSION_DURATION
            .with_label_values(&[strategy.name()])
            .observe(start.elapsed().as_secs_f64());
        result
    }

    async fn validate(&self) -> Result<(), ConversionError> {
        if let Err(e) = self.heic.validate().await {
            // HEIC support is optional; everything else still works.
            warn!("HEIC decoder {} unavailable: {}", self.heic.name(), e);
        }
        Ok(())
    }
}
