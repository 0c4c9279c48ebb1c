//! Format detection from filename and declared content type.

use super::catalog::FormatId;
use crate::input::InputFile;

/// Final extension of a filename, without the dot. `None` when there is no dot
/// or nothing follows the last one.
pub fn extension_of(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext),
        _ => None,
    }
}

/// Filename with its final extension stripped; the whole name when there is none.
pub fn base_name(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, ext)) if !ext.is_empty() => base,
        _ => name,
    }
}

/// Resolves a file to a canonical format.
///
/// HEIC/HEIF extensions win unconditionally because hosts frequently report an
/// empty or generic content type for them. Otherwise a recognized declared type is
/// trusted, and the extension is the last resort.
pub fn detect(file: &InputFile) -> Option<FormatId> {
    detect_parts(file.name(), file.declared_type())
}

/// [`detect`] over the raw parts.
pub fn detect_parts(name: &str, declared_type: Option<&str>) -> Option<FormatId> {
    let by_extension = extension_of(name).and_then(FormatId::from_extension);

    if let Some(id) = by_extension.filter(FormatId::is_heic_family) {
        return Some(id);
    }

    if let Some(id) = declared_type.and_then(FormatId::from_mime) {
        return Some(id);
    }

    by_extension
}
