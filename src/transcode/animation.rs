//! Animation-loop encoding.
//!
//! GIF and animated-PNG sources become x264 MP4 loops: scaled into the
//! 1080/1920 box, GOP pinned to two seconds of frames, variable-frame-rate
//! sources resampled to a fixed rate, and transparent frames composited
//! over white (MP4 delivery has no alpha).

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::geometry::{limit_fps, scale_down};
use crate::transcode::image::has_transparency;
use clsrs_av::ffmpeg::{transcode_loop, LoopEncodeJob};
use clsrs_av::probe::probe_frame_durations;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Size box animation loops are scaled into.
const LOOP_SIZE_LIMIT: (u32, u32) = (1080, 1920);

/// Frame rate VFR sources are pinned to.
const VFR_PIN_FPS: u32 = 60;

/// Encoder for animation sources.
pub struct LoopEncoder<'a> {
    config: &'a PipelineConfig,
}

impl<'a> LoopEncoder<'a> {
    /// Create an encoder over the given configuration.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Encode an animation into an MP4 loop, returning the artifact path.
    pub fn encode(&self, input: &Path, output_stem: &Path) -> Result<PathBuf> {
        let info = clsrs_av::probe(input)?;
        let video = info
            .primary_video()
            .ok_or_else(|| Error::invalid_source("no video stream in animation"))?;
        let fps = video
            .fps
            .ok_or_else(|| Error::invalid_source("no frame rate on animation"))?;

        let (estimated_duration, vfr) = probe_frame_durations(input)?;
        debug!(
            "animation {:?}: {}s estimated, vfr={}",
            input, estimated_duration, vfr
        );

        let scaled = scale_down((video.width, video.height), LOOP_SIZE_LIMIT, -1);

        // over-rate sources are halved into range; VFR sources get pinned
        let (effective_fps, rate_valid) = limit_fps(fps, f64::from(VFR_PIN_FPS));
        let pin_fps = if vfr {
            Some(VFR_PIN_FPS)
        } else if !rate_valid {
            Some(effective_fps.round() as u32)
        } else {
            None
        };

        let gop_frames = if vfr {
            VFR_PIN_FPS * 2
        } else {
            (effective_fps.round() as u32) * 2
        };

        let flatten_alpha = image::open(input)
            .map(|img| has_transparency(&img))
            .unwrap_or(true);

        let output = output_stem.with_extension("mp4");
        let job = LoopEncodeJob {
            input: input.to_path_buf(),
            output: output.clone(),
            size: scaled.size(),
            pin_fps,
            crf: self.config.video.loop_crf,
            gop_frames,
            flatten_alpha,
            overwrite: self.config.video.overwrite,
        };
        transcode_loop(&job)?;

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_size_limit_matches_policy() {
        // animations share the baseline 1080/1920 box
        let scaled = scale_down((3840, 2160), LOOP_SIZE_LIMIT, -1);
        assert_eq!(scaled.size(), (1920, 1080));
    }
}
