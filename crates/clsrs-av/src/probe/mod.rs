//! Media file probing.
//!
//! Extracts typed stream descriptors from media files using the ffprobe
//! command-line tool. The descriptors carry exactly the fields the
//! compatibility classifier and tier scheduler consume: codec, dimensions,
//! pixel format, frame rates, channel counts, and the demuxer stream index.

mod ffprobe;

pub use ffprobe::{probe_frame_durations, probe_with_ffprobe};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Information about a media file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Path to the media file.
    pub file_path: PathBuf,
    /// File size in bytes.
    pub file_size: u64,
    /// Container format name as reported by the demuxer.
    pub container: String,
    /// Duration in seconds, when known.
    pub duration: Option<f64>,
    /// Container-level bit rate in bits per second, when known.
    pub bit_rate: Option<u64>,
    /// Video streams in the file.
    pub video_streams: Vec<VideoStream>,
    /// Audio streams in the file.
    pub audio_streams: Vec<AudioStream>,
}

/// Descriptor of one video stream.
///
/// `index` is the demuxer's global stream index (usable with `-map 0:N`),
/// not a per-type counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoStream {
    /// Global demuxer stream index.
    pub index: u32,
    /// Codec name as reported by ffprobe (e.g. "h264", "vp9").
    pub codec_name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel format (e.g. "yuv420p", "yuv420p10le").
    pub pix_fmt: Option<String>,
    /// Playback frame rate; average frame rate, falling back to the raw
    /// frame rate when the average is unavailable.
    pub fps: Option<f64>,
}

/// Descriptor of one audio stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioStream {
    /// Global demuxer stream index.
    pub index: u32,
    /// Codec name as reported by ffprobe (e.g. "aac", "pcm_s16le").
    pub codec_name: String,
    /// Number of channels.
    pub channels: u32,
    /// Sample rate in Hz, when known.
    pub sample_rate: Option<u32>,
}

impl MediaInfo {
    /// Get the primary (first) video stream.
    pub fn primary_video(&self) -> Option<&VideoStream> {
        self.video_streams.first()
    }

    /// Whether the file carries any audio.
    pub fn has_audio(&self) -> bool {
        !self.audio_streams.is_empty()
    }

    /// Source size as a (width, height) pair, from the primary video stream.
    pub fn video_size(&self) -> Option<(u32, u32)> {
        self.primary_video().map(|v| (v.width, v.height))
    }
}

impl VideoStream {
    /// Shorter and longer side of the frame, in that order.
    pub fn min_max_side(&self) -> (u32, u32) {
        if self.width >= self.height {
            (self.height, self.width)
        } else {
            (self.width, self.height)
        }
    }
}
