//! Source-kind classification by magic bytes.

use std::sync::OnceLock;

const PNG_HEADER: &[u8] = b"\x89PNG";
const JPEG_HEADER: &[u8] = b"\xff\xd8";
const GIF87_HEADER: &[u8] = b"GIF87a";
const GIF89_HEADER: &[u8] = b"GIF89a";
const EBML_HEADER: &[u8] = b"\x1a\x45\xdf\xa3";

/// Supported source kinds, detected from content rather than file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Png,
    Jpeg,
    Gif,
    /// Matroska or WebM (EBML header).
    WebM,
    /// MP4 family (ftyp box).
    Mp4,
    Svg,
    Unknown,
}

/// Classify a byte prefix into a source kind.
///
/// SVG detection scans the leading text for an `<svg>` tag; everything else
/// goes by magic numbers.
pub fn sniff(data: &[u8]) -> SourceKind {
    if data.starts_with(PNG_HEADER) {
        SourceKind::Png
    } else if data.starts_with(JPEG_HEADER) {
        SourceKind::Jpeg
    } else if data.starts_with(GIF87_HEADER) || data.starts_with(GIF89_HEADER) {
        SourceKind::Gif
    } else if data.starts_with(EBML_HEADER) {
        SourceKind::WebM
    } else if data.len() >= 12 && &data[4..8] == b"ftyp" {
        SourceKind::Mp4
    } else if is_svg(data) {
        SourceKind::Svg
    } else {
        SourceKind::Unknown
    }
}

/// Does the data look like an SVG document?
pub fn is_svg(data: &[u8]) -> bool {
    // only text can be SVG; scan a bounded prefix
    let prefix = &data[..data.len().min(4096)];
    let Ok(text) = std::str::from_utf8(prefix) else {
        return false;
    };
    svg_tag().is_match(text)
}

fn svg_tag() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"<svg[^>]*>").expect("static regex"))
}
