//! Attachment metadata extraction.
//!
//! Pulls flat string-keyed metadata out of sources for embedding into the
//! manifest's `content.attachment` map: PNG text chunks (`tEXt`, plus
//! uncompressed `iTXt`) and JPEG comment segments. The walkers only read
//! the container structure; no pixel data is decoded.

use crate::error::{Error, Result};
use crate::sniff::SourceKind;
use std::collections::BTreeMap;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

/// Extract attachment metadata for a source of the given kind.
///
/// Kinds without embedded text metadata yield an empty map.
pub fn extract_attachment(kind: SourceKind, data: &[u8]) -> BTreeMap<String, String> {
    match kind {
        SourceKind::Png => png_text_chunks(data).unwrap_or_default(),
        SourceKind::Jpeg => jpeg_comments(data),
        _ => BTreeMap::new(),
    }
}

/// Walk a PNG chunk sequence and collect its text chunks.
///
/// `tEXt` is keyword + Latin-1 text; `iTXt` is handled in its uncompressed
/// form only. Individually malformed chunks are skipped; a missing
/// signature or truncated chunk header is an invalid source.
pub fn png_text_chunks(data: &[u8]) -> Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    for (name, content) in PngChunks::new(data)? {
        match &name {
            b"tEXt" => {
                if let Some((keyword, text)) = split_text_chunk(content) {
                    out.insert(keyword, text);
                }
            }
            b"iTXt" => {
                if let Some((keyword, text)) = split_itxt_chunk(content) {
                    out.insert(keyword, text);
                }
            }
            _ => {}
        }
    }
    Ok(out)
}

/// Does the PNG carry an animation control chunk (APNG)?
pub fn png_is_animated(data: &[u8]) -> bool {
    PngChunks::new(data)
        .map(|mut chunks| chunks.any(|(name, _)| &name == b"acTL"))
        .unwrap_or(false)
}

/// Is the PNG palette-indexed (color type 3)?
///
/// The color type lives at a fixed offset inside the IHDR chunk, which the
/// format requires to come first.
pub fn png_is_palette(data: &[u8]) -> bool {
    // signature (8) + length (4) + "IHDR" (4) + width (4) + height (4) +
    // bit depth (1) = 25; color type is the next byte
    data.len() > 25
        && data.get(12..16).map(|name| name == b"IHDR").unwrap_or(false)
        && data[25] == 3
}

struct PngChunks<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> PngChunks<'a> {
    fn new(data: &'a [u8]) -> Result<Self> {
        if !data.starts_with(PNG_SIGNATURE) {
            return Err(Error::invalid_source("missing PNG signature"));
        }
        Ok(Self {
            data,
            offset: PNG_SIGNATURE.len(),
        })
    }
}

impl<'a> Iterator for PngChunks<'a> {
    type Item = ([u8; 4], &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let header = self.data.get(self.offset..self.offset + 8)?;
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let name: [u8; 4] = [header[4], header[5], header[6], header[7]];

        let content_start = self.offset + 8;
        let content = self.data.get(content_start..content_start + length)?;
        // content + CRC
        self.offset = content_start + length + 4;

        if &name == b"IEND" {
            return None;
        }
        Some((name, content))
    }
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn split_text_chunk(content: &[u8]) -> Option<(String, String)> {
    let null = content.iter().position(|&b| b == 0)?;
    let (raw_keyword, raw_text) = (&content[..null], &content[null + 1..]);
    if raw_text.is_empty() {
        return None;
    }
    Some((latin1(raw_keyword), latin1(raw_text)))
}

fn split_itxt_chunk(content: &[u8]) -> Option<(String, String)> {
    let null = content.iter().position(|&b| b == 0)?;
    let raw_keyword = &content[..null];
    let rest = &content[null + 1..];
    // compression flag + method
    let (&flag, rest) = rest.split_first()?;
    let (_method, rest) = rest.split_first()?;
    if flag != 0 {
        // compressed iTXt is not extracted
        return None;
    }
    // language tag and translated keyword, both null-terminated
    let lang_end = rest.iter().position(|&b| b == 0)?;
    let rest = &rest[lang_end + 1..];
    let translated_end = rest.iter().position(|&b| b == 0)?;
    let text = &rest[translated_end + 1..];
    if text.is_empty() {
        return None;
    }
    Some((latin1(raw_keyword), String::from_utf8_lossy(text).into_owned()))
}

/// Collect JPEG comment (COM) segments.
///
/// Multiple comments are keyed `comment`, `comment-2`, and so on.
pub fn jpeg_comments(data: &[u8]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    if !data.starts_with(b"\xff\xd8") {
        return out;
    }

    let mut offset = 2;
    let mut count = 0;
    while offset + 4 <= data.len() {
        if data[offset] != 0xff {
            break;
        }
        let marker = data[offset + 1];
        // standalone markers and entropy-coded data end the segment walk
        if marker == 0xd9 || marker == 0xda {
            break;
        }
        let length =
            u16::from_be_bytes([data[offset + 2], data[offset + 3]]) as usize;
        if length < 2 || offset + 2 + length > data.len() {
            break;
        }
        if marker == 0xfe {
            let text = &data[offset + 4..offset + 2 + length];
            let key = if count == 0 {
                "comment".to_string()
            } else {
                format!("comment-{}", count + 1)
            };
            out.insert(key, String::from_utf8_lossy(text).into_owned());
            count += 1;
        }
        offset += 2 + length;
    }
    out
}
