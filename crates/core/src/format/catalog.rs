//! Static format and operation tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical source formats recognized by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormatId {
    Heic,
    Heif,
    Jpeg,
    Png,
    Webp,
    Gif,
    Avif,
    Svg,
    Pdf,
}

/// Destination operations a user can pick for a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Jpg,
    Png,
    Webp,
    Optimize,
    Compress,
}

/// How the bytes of a source format can be turned into pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecoderClass {
    /// Decodable by the general raster surface.
    Raster,
    /// Vector document, rasterized before encoding.
    Vector,
    /// HEIF container (HEIC, HEIF, AVIF); needs the libheif-backed decoder.
    Heic,
    /// Not decodable into pixels at all.
    Opaque,
}

/// Raster encodings an operation can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RasterTarget {
    Jpeg,
    Png,
    Webp,
}

impl RasterTarget {
    /// MIME type of the encoded output.
    pub fn mime(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Whether the encoding can carry an alpha channel.
    pub fn supports_alpha(&self) -> bool {
        !matches!(self, Self::Jpeg)
    }
}

/// What an operation does to the bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    /// Decode and re-encode into a raster format.
    Reencode(RasterTarget),
    /// Keep the bytes as they are (placeholder for size reduction).
    Passthrough,
}

impl Operation {
    /// Every operation, in display order.
    pub const ALL: [Operation; 5] = [
        Operation::Jpg,
        Operation::Png,
        Operation::Webp,
        Operation::Optimize,
        Operation::Compress,
    ];

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Jpg => OperationKind::Reencode(RasterTarget::Jpeg),
            Self::Png => OperationKind::Reencode(RasterTarget::Png),
            Self::Webp => OperationKind::Reencode(RasterTarget::Webp),
            Self::Optimize | Self::Compress => OperationKind::Passthrough,
        }
    }

    /// Extension given to the downloaded artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Optimize => "gif",
            Self::Compress => "pdf",
        }
    }

    /// Output MIME type, or `None` when the source type is kept.
    pub fn mime(&self) -> Option<&'static str> {
        match self.kind() {
            OperationKind::Reencode(target) => Some(target.mime()),
            OperationKind::Passthrough => None,
        }
    }

    /// Short label for buttons.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Jpg => ".JPG",
            Self::Png => ".PNG",
            Self::Webp => ".WEBP",
            Self::Optimize => "Optimize",
            Self::Compress => "Compress",
        }
    }

    /// Parses an operation id, case-insensitively. `JPEG` is accepted for `JPG`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JPG" | "JPEG" => Some(Self::Jpg),
            "PNG" => Some(Self::Png),
            "WEBP" => Some(Self::Webp),
            "OPTIMIZE" => Some(Self::Optimize),
            "COMPRESS" => Some(Self::Compress),
            _ => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            Self::Jpg => "JPG",
            Self::Png => "PNG",
            Self::Webp => "WEBP",
            Self::Optimize => "OPTIMIZE",
            Self::Compress => "COMPRESS",
        };
        f.write_str(id)
    }
}

/// Capability descriptor of a source format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub id: FormatId,
    pub label: &'static str,
    /// Canonical MIME type; the first one is used when tagging passthrough output.
    pub mime_types: &'static [&'static str],
    pub extensions: &'static [&'static str],
    pub allowed_operations: &'static [Operation],
    pub decoder: DecoderClass,
}

impl FormatDescriptor {
    pub fn mime(&self) -> &'static str {
        self.mime_types[0]
    }

    pub fn allows(&self, operation: Operation) -> bool {
        self.allowed_operations.contains(&operation)
    }
}

static CATALOG: [FormatDescriptor; 9] = [
    FormatDescriptor {
        id: FormatId::Heic,
        label: "HEIC",
        mime_types: &["image/heic"],
        extensions: &["heic"],
        allowed_operations: &[Operation::Jpg, Operation::Png],
        decoder: DecoderClass::Heic,
    },
    FormatDescriptor {
        id: FormatId::Heif,
        label: "HEIC",
        mime_types: &["image/heif"],
        extensions: &["heif"],
        allowed_operations: &[Operation::Jpg, Operation::Png],
        decoder: DecoderClass::Heic,
    },
    FormatDescriptor {
        id: FormatId::Jpeg,
        label: "JPG",
        mime_types: &["image/jpeg", "image/jpg"],
        extensions: &["jpg", "jpeg"],
        allowed_operations: &[Operation::Png, Operation::Webp],
        decoder: DecoderClass::Raster,
    },
    FormatDescriptor {
        id: FormatId::Png,
        label: "PNG",
        mime_types: &["image/png"],
        extensions: &["png"],
        allowed_operations: &[Operation::Jpg, Operation::Webp],
        decoder: DecoderClass::Raster,
    },
    FormatDescriptor {
        id: FormatId::Webp,
        label: "WEBP",
        mime_types: &["image/webp"],
        extensions: &["webp"],
        allowed_operations: &[Operation::Jpg, Operation::Png],
        decoder: DecoderClass::Raster,
    },
    FormatDescriptor {
        id: FormatId::Gif,
        label: "GIF",
        mime_types: &["image/gif"],
        extensions: &["gif"],
        allowed_operations: &[Operation::Optimize],
        decoder: DecoderClass::Raster,
    },
    FormatDescriptor {
        id: FormatId::Avif,
        label: "AVIF",
        mime_types: &["image/avif"],
        extensions: &["avif"],
        allowed_operations: &[Operation::Jpg, Operation::Png],
        decoder: DecoderClass::Heic,
    },
    FormatDescriptor {
        id: FormatId::Svg,
        label: "SVG",
        mime_types: &["image/svg+xml"],
        extensions: &["svg"],
        allowed_operations: &[Operation::Png],
        decoder: DecoderClass::Vector,
    },
    FormatDescriptor {
        id: FormatId::Pdf,
        label: "PDF",
        mime_types: &["application/pdf"],
        extensions: &["pdf"],
        allowed_operations: &[Operation::Compress],
        decoder: DecoderClass::Opaque,
    },
];

impl FormatId {
    /// Capability descriptor for this format.
    pub fn descriptor(&self) -> &'static FormatDescriptor {
        // Catalog order mirrors the enum declaration order.
        &CATALOG[*self as usize]
    }

    /// Looks a MIME type up in the catalog. Matching is exact after trimming and
    /// lowercasing; parameters such as `; charset=...` are ignored.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let essence = mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        CATALOG
            .iter()
            .find(|d| d.mime_types.contains(&essence.as_str()))
            .map(|d| d.id)
    }

    /// Looks an extension (without the dot) up in the catalog, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        CATALOG
            .iter()
            .find(|d| d.extensions.contains(&ext.as_str()))
            .map(|d| d.id)
    }

    pub fn is_heic_family(&self) -> bool {
        matches!(self, Self::Heic | Self::Heif)
    }
}

/// All catalog entries.
pub fn catalog() -> &'static [FormatDescriptor] {
    &CATALOG
}
