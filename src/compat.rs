//! Compatibility-level classification.
//!
//! A level table describes, per compatibility level, the delivery codec and
//! the size/bit-depth box a stream must fit to count as already satisfying
//! that level. Classification walks the table from the most restrictive box
//! (the baseline level) outward and returns the first level the source
//! stream qualifies for, or 0 when a full transcode is required.

use clsrs_av::probe::VideoStream;
use clsrs_common::{pixel_format_bits, VideoCodec};
use serde::{Deserialize, Serialize};

/// One compatibility level's constraints and target codec.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSpec {
    /// Level id (1 = highest fidelity delivery tier).
    pub level: u8,
    /// Target codec for transcodes at this level; also the minimum codec
    /// rank a source must carry to stream-copy into it.
    pub codec: VideoCodec,
    /// Longest-side bound.
    pub max_side: u32,
    /// Shortest-side bound.
    pub min_side: u32,
    /// Pixel format bits-per-channel bound.
    pub max_bits: u8,
}

/// Ordered set of level specs for one frame-rate group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelTable {
    /// Levels ordered from most to least restrictive codec requirement
    /// (ascending level id).
    pub levels: Vec<LevelSpec>,
}

impl LevelTable {
    /// Default table for sources up to 30 fps.
    pub fn default_30fps() -> Self {
        Self {
            levels: vec![
                LevelSpec { level: 1, codec: VideoCodec::Av1, max_side: 7680, min_side: 4320, max_bits: 10 },
                LevelSpec { level: 2, codec: VideoCodec::Vp9, max_side: 3840, min_side: 2160, max_bits: 8 },
                LevelSpec { level: 3, codec: VideoCodec::H264, max_side: 1920, min_side: 1080, max_bits: 8 },
            ],
        }
    }

    /// Default table for sources above 30 fps.
    pub fn default_60fps() -> Self {
        Self {
            levels: vec![
                LevelSpec { level: 1, codec: VideoCodec::Av1, max_side: 3840, min_side: 2160, max_bits: 10 },
                LevelSpec { level: 2, codec: VideoCodec::Vp9, max_side: 2560, min_side: 1440, max_bits: 8 },
                LevelSpec { level: 3, codec: VideoCodec::H264, max_side: 1920, min_side: 1080, max_bits: 8 },
            ],
        }
    }

    /// The baseline (maximum-compatibility) level id.
    pub fn baseline_level(&self) -> u8 {
        self.levels.iter().map(|l| l.level).max().unwrap_or(0)
    }

    /// Look up one level's spec.
    pub fn level(&self, level: u8) -> Option<&LevelSpec> {
        self.levels.iter().find(|l| l.level == level)
    }
}

/// Does the stream already satisfy this level?
fn qualifies(stream: &VideoStream, spec: &LevelSpec) -> bool {
    let Some(codec) = VideoCodec::from_codec_name(&stream.codec_name) else {
        return false;
    };
    if codec.compat_rank() < spec.codec.compat_rank() {
        return false;
    }

    let (min_side, max_side) = stream.min_max_side();
    if min_side > spec.min_side || max_side > spec.max_side {
        return false;
    }

    match stream.pix_fmt.as_deref().and_then(pixel_format_bits) {
        Some(bits) => bits <= spec.max_bits,
        None => false,
    }
}

/// Classify a video stream against a level table.
///
/// Returns the first level the stream fully satisfies, walking levels from
/// the most permissive classification (the baseline box) to the least, or 0
/// when none is satisfied and a full tier-1 transcode is required.
pub fn classify(stream: &VideoStream, table: &LevelTable) -> u8 {
    for spec in table.levels.iter().rev() {
        if qualifies(stream, spec) {
            return spec.level;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(codec: &str, width: u32, height: u32, pix_fmt: &str, fps: f64) -> VideoStream {
        VideoStream {
            index: 0,
            codec_name: codec.to_string(),
            width,
            height,
            pix_fmt: Some(pix_fmt.to_string()),
            fps: Some(fps),
        }
    }

    #[test]
    fn test_h264_4k60_requires_full_transcode() {
        // H264 is not the 60fps table's top codec slot at 4K
        let s = stream("h264", 3840, 2160, "yuv420p", 60.0);
        assert_eq!(classify(&s, &LevelTable::default_60fps()), 0);
    }

    #[test]
    fn test_h264_1080p_is_baseline() {
        let s = stream("h264", 1920, 1080, "yuv420p", 60.0);
        assert_eq!(classify(&s, &LevelTable::default_60fps()), 3);
    }

    #[test]
    fn test_vp9_720p_is_baseline() {
        // a better-ranked codec inside the baseline box still classifies
        // as baseline
        let s = stream("vp9", 1280, 720, "yuv420p", 60.0);
        assert_eq!(classify(&s, &LevelTable::default_60fps()), 3);
    }

    #[test]
    fn test_av1_4k_is_level_1() {
        let s = stream("av1", 3840, 2160, "yuv420p10le", 60.0);
        assert_eq!(classify(&s, &LevelTable::default_60fps()), 1);
    }

    #[test]
    fn test_vp9_1440p_is_level_2() {
        let s = stream("vp9", 2560, 1440, "yuv420p", 60.0);
        assert_eq!(classify(&s, &LevelTable::default_60fps()), 2);
    }

    #[test]
    fn test_30fps_table_is_larger() {
        let s = stream("vp9", 3840, 2160, "yuv420p", 30.0);
        assert_eq!(classify(&s, &LevelTable::default_30fps()), 2);
        assert_eq!(classify(&s, &LevelTable::default_60fps()), 0);
    }

    #[test]
    fn test_unknown_codec_is_zero() {
        let s = stream("mpeg2video", 720, 576, "yuv420p", 25.0);
        assert_eq!(classify(&s, &LevelTable::default_30fps()), 0);
    }

    #[test]
    fn test_deep_pixel_format_fails_eight_bit_levels() {
        let s = stream("h264", 1920, 1080, "yuv420p10le", 30.0);
        assert_eq!(classify(&s, &LevelTable::default_30fps()), 0);
    }

    #[test]
    fn test_classification_is_idempotent() {
        let s = stream("vp9", 2560, 1440, "yuv420p", 60.0);
        let table = LevelTable::default_60fps();
        assert_eq!(classify(&s, &table), classify(&s, &table));
    }

    #[test]
    fn test_baseline_level() {
        assert_eq!(LevelTable::default_30fps().baseline_level(), 3);
        assert_eq!(LevelTable::default_60fps().baseline_level(), 3);
    }
}
