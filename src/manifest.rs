//! The CLSRS manifest document.
//!
//! One JSON document per asset maps compatibility levels to artifact file
//! names. Filenames are stored bare (no directories); a manifest and its
//! artifacts always live in the same directory.

use crate::error::Result;
use clsrs_common::MediaType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Magic value of the `ftype` field.
pub const SRS_FTYPE: &str = "CLSRS";

/// Manifest file extension.
pub const SRS_EXTENSION: &str = "srs";

/// A CLSRS manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SrsDocument {
    pub ftype: String,
    pub content: SrsContent,
    pub streams: SrsStreams,
}

/// The `content` section: media type plus extracted attachment metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SrsContent {
    #[serde(rename = "media-type")]
    pub media_type: MediaType,
    #[serde(default)]
    pub attachment: BTreeMap<String, String>,
}

/// The `streams` section; only the keys relevant to the media type are
/// present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SrsStreams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<SrsLevelMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<SrsLevelMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<Vec<SrsAudioEntry>>,
}

/// Tier-id → filename map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SrsLevelMap {
    pub levels: BTreeMap<String, String>,
}

/// One audio stream's channel-count → tier-id → filename map.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SrsAudioEntry {
    pub channels: BTreeMap<String, BTreeMap<String, String>>,
}

impl SrsDocument {
    /// Start an image manifest.
    pub fn new_image() -> Self {
        Self {
            ftype: SRS_FTYPE.to_string(),
            content: SrsContent {
                media_type: MediaType::Image,
                attachment: BTreeMap::new(),
            },
            streams: SrsStreams {
                image: Some(SrsLevelMap::default()),
                ..SrsStreams::default()
            },
        }
    }

    /// Start a video manifest; `has_audio` selects the media-type code and
    /// whether the audio stream list is present.
    pub fn new_video(has_audio: bool) -> Self {
        let media_type = if has_audio {
            MediaType::VideoWithAudio
        } else {
            MediaType::VideoOnly
        };
        Self {
            ftype: SRS_FTYPE.to_string(),
            content: SrsContent {
                media_type,
                attachment: BTreeMap::new(),
            },
            streams: SrsStreams {
                video: Some(SrsLevelMap::default()),
                audio: has_audio.then(Vec::new),
                ..SrsStreams::default()
            },
        }
    }

    /// Record one tier's artifact under the media type's level map.
    pub fn set_level(&mut self, level: u8, file_name: impl Into<String>) {
        let map = match self.content.media_type {
            MediaType::Image => self.streams.image.get_or_insert_with(Default::default),
            _ => self.streams.video.get_or_insert_with(Default::default),
        };
        map.levels.insert(level.to_string(), file_name.into());
    }

    /// Record one audio stream's artifact.
    pub fn push_audio(&mut self, channels: u32, level: u8, file_name: impl Into<String>) {
        let mut levels = BTreeMap::new();
        levels.insert(level.to_string(), file_name.into());
        let mut entry = SrsAudioEntry::default();
        entry.channels.insert(channels.to_string(), levels);
        self.streams
            .audio
            .get_or_insert_with(Vec::new)
            .push(entry);
    }

    /// Attach extracted metadata.
    pub fn set_attachment(&mut self, attachment: BTreeMap<String, String>) {
        self.content.attachment = attachment;
    }

    /// The level map of this manifest's media type.
    pub fn level_map(&self) -> Option<&BTreeMap<String, String>> {
        match self.content.media_type.stream_type_key() {
            "image" => self.streams.image.as_ref().map(|m| &m.levels),
            _ => self.streams.video.as_ref().map(|m| &m.levels),
        }
    }

    /// Whether a tier is recorded.
    pub fn has_level(&self, level: u8) -> bool {
        self.level_map()
            .map(|m| m.contains_key(&level.to_string()))
            .unwrap_or(false)
    }

    /// Write the manifest next to `output_stem`, returning the `.srs` path.
    ///
    /// Write-then-close; a crash mid-write is cleaned up by the caller
    /// discarding the asset's output directory.
    pub fn write(&self, output_stem: &Path) -> Result<PathBuf> {
        let path = output_stem.with_extension(SRS_EXTENSION);
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer(file, self)?;
        Ok(path)
    }

    /// Read a manifest back from disk.
    pub fn read(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let doc: SrsDocument = serde_json::from_reader(file)?;
        Ok(doc)
    }

    /// All artifact paths this manifest references, resolved against its
    /// directory, with the manifest itself last.
    pub fn referenced_files(&self, manifest_path: &Path) -> Vec<PathBuf> {
        let parent = manifest_path.parent().unwrap_or_else(|| Path::new(""));
        let mut files = Vec::new();

        if let Some(levels) = self.level_map() {
            for file_name in levels.values() {
                files.push(parent.join(file_name));
            }
        }
        if let Some(audio) = &self.streams.audio {
            for entry in audio {
                for levels in entry.channels.values() {
                    for file_name in levels.values() {
                        files.push(parent.join(file_name));
                    }
                }
            }
        }

        files.push(manifest_path.to_path_buf());
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_manifest_shape() {
        let mut doc = SrsDocument::new_image();
        doc.set_level(1, "pic.avif");
        doc.set_level(3, "pic.webp");

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["ftype"], "CLSRS");
        assert_eq!(json["content"]["media-type"], 0);
        assert_eq!(json["streams"]["image"]["levels"]["1"], "pic.avif");
        assert_eq!(json["streams"]["image"]["levels"]["3"], "pic.webp");
        assert!(json["streams"].get("video").is_none());
    }

    #[test]
    fn test_video_manifest_shape() {
        let mut doc = SrsDocument::new_video(true);
        doc.set_level(3, "clip_cl3.mp4");
        doc.push_audio(2, 3, "clip_track1_cl3.opus");

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["content"]["media-type"], 2);
        assert_eq!(json["streams"]["video"]["levels"]["3"], "clip_cl3.mp4");
        assert_eq!(
            json["streams"]["audio"][0]["channels"]["2"]["3"],
            "clip_track1_cl3.opus"
        );
    }

    #[test]
    fn test_video_only_manifest_has_no_audio_key() {
        let mut doc = SrsDocument::new_video(false);
        doc.set_level(3, "clip_cl3.mp4");

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["content"]["media-type"], 3);
        assert!(json["streams"].get("audio").is_none());
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let stem = dir.path().join("asset");

        let mut doc = SrsDocument::new_video(false);
        doc.set_level(1, "asset_cl1.mp4");
        doc.set_level(3, "asset_cl3.mp4");

        let path = doc.write(&stem).unwrap();
        assert_eq!(path.extension().unwrap(), "srs");

        let restored = SrsDocument::read(&path).unwrap();
        assert_eq!(restored, doc);
        assert_eq!(restored.level_map(), doc.level_map());
    }

    #[test]
    fn test_referenced_files() {
        let mut doc = SrsDocument::new_video(true);
        doc.set_level(3, "a_cl3.mp4");
        doc.push_audio(2, 4, "a_track1_cl4.m4a");

        let files = doc.referenced_files(Path::new("/out/a.srs"));
        assert_eq!(
            files,
            vec![
                PathBuf::from("/out/a_cl3.mp4"),
                PathBuf::from("/out/a_track1_cl4.m4a"),
                PathBuf::from("/out/a.srs"),
            ]
        );
    }

    #[test]
    fn test_has_level() {
        let mut doc = SrsDocument::new_image();
        doc.set_level(3, "x.webp");
        assert!(doc.has_level(3));
        assert!(!doc.has_level(1));
    }
}
