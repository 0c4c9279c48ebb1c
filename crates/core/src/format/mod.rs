//! Format catalog and detection.
//!
//! The catalog is a fixed table mapping each canonical source format to the
//! destination operations it supports. Detection resolves an [`InputFile`] to one
//! of those formats from its filename extension and declared content type.
//!
//! [`InputFile`]: crate::input::InputFile

mod catalog;
mod detect;

pub use catalog::{
    catalog, DecoderClass, FormatDescriptor, FormatId, Operation, OperationKind, RasterTarget,
};
pub use detect::{base_name, detect, detect_parts, extension_of};
