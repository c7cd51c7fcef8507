//! Core type definitions for codecs, containers, and media types.
//!
//! The enums here are serialized in lowercase for readability in configs and
//! logs; the CLSRS manifest itself stores media types as integer codes.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Delivery video codec, ordered by compatibility rank.
///
/// The ordering matters: a level table entry names the *least* advanced
/// codec acceptable for that level, and classification compares ranks
/// (H264 < VP8 < VP9 < AV1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    /// H.264 / AVC - maximum playback compatibility.
    H264,
    /// VP8.
    Vp8,
    /// VP9.
    Vp9,
    /// AV1 - highest coding efficiency, lowest compatibility.
    Av1,
}

impl VideoCodec {
    /// Fixed compatibility ordering used by level classification.
    pub fn compat_rank(&self) -> u8 {
        match self {
            Self::H264 => 0,
            Self::Vp8 => 1,
            Self::Vp9 => 2,
            Self::Av1 => 3,
        }
    }

    /// Map an ffprobe `codec_name` to the enum, if it is one we rank.
    pub fn from_codec_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "h264" | "avc" => Some(Self::H264),
            "vp8" => Some(Self::Vp8),
            "vp9" => Some(Self::Vp9),
            "av1" => Some(Self::Av1),
            _ => None,
        }
    }

    /// Container each codec is delivered in.
    pub fn preferred_container(&self) -> VideoContainer {
        match self {
            Self::H264 | Self::Av1 => VideoContainer::Mpeg4,
            Self::Vp8 | Self::Vp9 => VideoContainer::WebM,
        }
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::H264 => write!(f, "h264"),
            Self::Vp8 => write!(f, "vp8"),
            Self::Vp9 => write!(f, "vp9"),
            Self::Av1 => write!(f, "av1"),
        }
    }
}

impl std::str::FromStr for VideoCodec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_codec_name(s).ok_or_else(|| Error::unknown_codec(s))
    }
}

/// Delivery audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// AAC (Advanced Audio Coding).
    Aac,
    /// Vorbis.
    Vorbis,
    /// Opus.
    Opus,
}

impl AudioCodec {
    /// Map an ffprobe `codec_name` to the enum, if it is in the approved set.
    pub fn from_codec_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "aac" => Some(Self::Aac),
            "vorbis" => Some(Self::Vorbis),
            "opus" => Some(Self::Opus),
            _ => None,
        }
    }

    /// Compatibility level an already-approved audio stream is kept at when
    /// stream-copied.
    pub fn stream_copy_level(&self) -> u8 {
        match self {
            Self::Aac => 4,
            Self::Vorbis => 3,
            Self::Opus => 3,
        }
    }

    /// Container each codec is delivered in.
    pub fn preferred_container(&self) -> AudioContainer {
        match self {
            Self::Aac => AudioContainer::Mpeg4Audio,
            Self::Vorbis => AudioContainer::OggAudio,
            Self::Opus => AudioContainer::OggOpus,
        }
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aac => write!(f, "aac"),
            Self::Vorbis => write!(f, "vorbis"),
            Self::Opus => write!(f, "opus"),
        }
    }
}

/// Video container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoContainer {
    /// MP4.
    Mpeg4,
    /// WebM.
    WebM,
}

impl VideoContainer {
    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mpeg4 => ".mp4",
            Self::WebM => ".webm",
        }
    }

    /// The ffmpeg `-f` muxer name.
    pub fn ffmpeg_format(&self) -> &'static str {
        match self {
            Self::Mpeg4 => "mp4",
            Self::WebM => "webm",
        }
    }
}

/// Audio container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioContainer {
    /// MP4 audio (.m4a).
    Mpeg4Audio,
    /// Ogg with Vorbis (.oga).
    OggAudio,
    /// Ogg with Opus (.opus).
    OggOpus,
}

impl AudioContainer {
    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Mpeg4Audio => ".m4a",
            Self::OggAudio => ".oga",
            Self::OggOpus => ".opus",
        }
    }
}

/// Media-type code stored in a CLSRS manifest's `content.media-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MediaType {
    /// Still image.
    Image,
    /// Audio only.
    AudioOnly,
    /// Video with at least one audio stream.
    VideoWithAudio,
    /// Video without audio.
    VideoOnly,
}

impl MediaType {
    /// Which `streams` key of the manifest holds the level map for this
    /// media type.
    pub fn stream_type_key(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::AudioOnly => "audio",
            Self::VideoWithAudio | Self::VideoOnly => "video",
        }
    }
}

impl From<MediaType> for u8 {
    fn from(value: MediaType) -> Self {
        match value {
            MediaType::Image => 0,
            MediaType::AudioOnly => 1,
            MediaType::VideoWithAudio => 2,
            MediaType::VideoOnly => 3,
        }
    }
}

impl TryFrom<u8> for MediaType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Image),
            1 => Ok(Self::AudioOnly),
            2 => Ok(Self::VideoWithAudio),
            3 => Ok(Self::VideoOnly),
            other => Err(Error::InvalidMediaType(other)),
        }
    }
}

/// Bits per channel for the pixel formats the classifier understands.
///
/// Returns `None` for formats outside the delivery vocabulary; callers
/// treat those as failing every level's depth bound.
pub fn pixel_format_bits(pix_fmt: &str) -> Option<u8> {
    match pix_fmt {
        "yuv420p" | "yuvj420p" | "yuv422p" | "yuv444p" => Some(8),
        "yuv420p10le" | "yuv422p10le" | "yuv444p10le" => Some(10),
        "yuv420p12le" => Some(12),
        _ => None,
    }
}

/// Pixel format used when encoding at the given bit depth.
pub fn bits_to_pixel_format(bits: u8) -> Option<&'static str> {
    match bits {
        8 => Some("yuv420p"),
        10 => Some("yuv420p10le"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_codec_rank_ordering() {
        assert!(VideoCodec::H264.compat_rank() < VideoCodec::Vp8.compat_rank());
        assert!(VideoCodec::Vp8.compat_rank() < VideoCodec::Vp9.compat_rank());
        assert!(VideoCodec::Vp9.compat_rank() < VideoCodec::Av1.compat_rank());
    }

    #[test]
    fn test_video_codec_from_name() {
        assert_eq!(VideoCodec::from_codec_name("h264"), Some(VideoCodec::H264));
        assert_eq!(VideoCodec::from_codec_name("AVC"), Some(VideoCodec::H264));
        assert_eq!(VideoCodec::from_codec_name("av1"), Some(VideoCodec::Av1));
        assert_eq!(VideoCodec::from_codec_name("mpeg2video"), None);
    }

    #[test]
    fn test_preferred_containers() {
        assert_eq!(VideoCodec::H264.preferred_container(), VideoContainer::Mpeg4);
        assert_eq!(VideoCodec::Vp9.preferred_container(), VideoContainer::WebM);
        assert_eq!(VideoCodec::Av1.preferred_container(), VideoContainer::Mpeg4);
        assert_eq!(AudioCodec::Opus.preferred_container(), AudioContainer::OggOpus);
    }

    #[test]
    fn test_audio_stream_copy_levels() {
        assert_eq!(AudioCodec::Aac.stream_copy_level(), 4);
        assert_eq!(AudioCodec::Vorbis.stream_copy_level(), 3);
        assert_eq!(AudioCodec::Opus.stream_copy_level(), 3);
    }

    #[test]
    fn test_media_type_codes() {
        for code in 0u8..=3 {
            let mt = MediaType::try_from(code).unwrap();
            assert_eq!(u8::from(mt), code);
        }
        assert!(MediaType::try_from(4).is_err());
    }

    #[test]
    fn test_media_type_serialization() {
        let json = serde_json::to_string(&MediaType::VideoWithAudio).unwrap();
        assert_eq!(json, "2");

        let mt: MediaType = serde_json::from_str("0").unwrap();
        assert_eq!(mt, MediaType::Image);
    }

    #[test]
    fn test_pixel_format_bits() {
        assert_eq!(pixel_format_bits("yuv420p"), Some(8));
        assert_eq!(pixel_format_bits("yuv420p10le"), Some(10));
        assert_eq!(pixel_format_bits("bayer_bggr8"), None);
    }

    #[test]
    fn test_codec_serialization() {
        let json = serde_json::to_string(&VideoCodec::H264).unwrap();
        assert_eq!(json, r#""h264""#);

        let codec: VideoCodec = serde_json::from_str(r#""vp9""#).unwrap();
        assert_eq!(codec, VideoCodec::Vp9);
    }
}
