//! Converter module for turning one input file into one output artifact.
//!
//! A job is dispatched to one of a small closed set of [`Strategy`] variants:
//!
//! - **Passthrough**: the bytes are copied unchanged (GIF optimize, PDF compress)
//! - **Raster re-encode**: decode to pixels, flatten if the target has no alpha,
//!   encode at [`ENCODE_QUALITY`]
//! - **HEIC re-encode**: delegate to an injected [`HeicDecoder`]
//!
//! # Example
//!
//! ```ignore
//! use convertfun_core::converter::{Converter, ConverterConfig, ConversionJob, StrategyConverter};
//!
//! let converter = StrategyConverter::from_config(&ConverterConfig::default());
//! let artifact = converter.convert(ConversionJob {
//!     job_id: "f1#1".to_string(),
//!     file,
//!     source: FormatId::Png,
//!     operation: Operation::Jpg,
//! }).await?;
//! println!("{} bytes of {}", artifact.len(), artifact.content_type);
//! ```

mod config;
mod error;
mod heic;
mod raster;
mod strategy;
mod traits;
mod types;

pub use config::{parse_hex_color, ConverterConfig};
pub use error::{ConversionError, FailureKind, HeicError};
pub use heic::{HeicDecoder, HeifConvertDecoder, UnavailableHeicDecoder};
pub use raster::{flatten_onto, ImageRasterCodec, RasterCodec};
pub use strategy::{Strategy, StrategyConverter};
pub use traits::Converter;
pub use types::{quality_percent, Artifact, ConversionJob, ENCODE_QUALITY};
