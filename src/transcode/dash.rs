//! DASH video encoding.
//!
//! An alternative delivery form for video: one adaptive manifest with an
//! AV1 high tier and an H264 low tier, segmented by ffmpeg's dash muxer.
//! The sizing math pairs the two rungs so their aspect ratios match
//! exactly, and the CRF ladder keeps more detail for smaller sources.

use crate::config::DashConfig;
use crate::error::{Error, Result};
use crate::geometry::{dash_tier_sizes, DashTierSizes};
use clsrs_av::ffmpeg::dash::{encode_dash, DashAudio, DashJob};
use clsrs_av::probe::MediaInfo;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Web-compatible audio codecs that pass through unchanged.
const COMPATIBLE_AUDIO: [&str; 3] = ["aac", "vorbis", "opus"];

/// Resolved parameters for one DASH encode.
#[derive(Debug, Clone, PartialEq)]
pub struct DashEncodingParams {
    /// Paired tier sizes.
    pub sizes: DashTierSizes,
    /// GOP and segment length in frames.
    pub gop_frames: u32,
    /// Ladder-adjusted CRF.
    pub crf: u32,
    /// Ladder step used for the adjustment.
    pub low_tier_gap: u32,
    /// Source frame rate.
    pub fps: f64,
}

/// DASH encoder over one configuration.
pub struct DashEncoder<'a> {
    config: &'a DashConfig,
}

impl<'a> DashEncoder<'a> {
    /// Create an encoder over the given configuration.
    pub fn new(config: &'a DashConfig) -> Self {
        Self { config }
    }

    /// Compute tier sizes, GOP, and the ladder-adjusted CRF for a source.
    ///
    /// `strict` treats exactly-31fps sources as high-rate; above the
    /// boundary the low tier drops to a 360-line rung and the ladder step
    /// halves.
    pub fn calc_encoding_params(
        &self,
        info: &MediaInfo,
        strict: bool,
        size_precision: i32,
    ) -> Result<DashEncodingParams> {
        let video = info
            .primary_video()
            .ok_or_else(|| Error::invalid_source("no video stream"))?;
        let fps = video
            .fps
            .ok_or_else(|| Error::invalid_source("no frame rate on video stream"))?;

        let mut limited_min_size = self.config.min_size;
        let mut low_tier_gap = self.config.low_tier_crf_gap;
        let max_low_tier_fps = if strict { 30.0 } else { 31.0 };
        if fps > max_low_tier_fps {
            low_tier_gap = (low_tier_gap / 2).max(1);
            limited_min_size = 360;
        }

        let short_side = video.width.min(video.height);
        let mut crf = self.config.crf;
        for &rung in &self.config.tiers_min_size {
            if short_side < rung {
                crf = crf.saturating_sub(low_tier_gap).max(1);
            } else {
                break;
            }
        }

        let sizes = dash_tier_sizes((video.width, video.height), limited_min_size, size_precision);
        let gop_frames = (self.config.gop_seconds as f64 * fps).round() as u32;

        debug!(
            "dash params: sizes={:?} crf={} gop={} fps={}",
            sizes, crf, gop_frames, fps
        );

        Ok(DashEncodingParams {
            sizes,
            gop_frames,
            crf,
            low_tier_gap,
            fps,
        })
    }

    /// Encode a source into a segmented DASH rendition, returning the
    /// `.mpd` manifest path.
    pub fn encode(&self, input: &Path, output_stem: &Path) -> Result<PathBuf> {
        let info = clsrs_av::probe(input)?;
        let params = self.calc_encoding_params(&info, false, -1)?;

        let audio = match info.audio_streams.first() {
            None => DashAudio::None,
            Some(first)
                if !self.config.force_audio_transcode
                    && COMPATIBLE_AUDIO.contains(&first.codec_name.as_str())
                    && first.channels <= 2 =>
            {
                DashAudio::Copy
            }
            Some(_) => DashAudio::Opus {
                bitrate_kbps: self.config.opus_stereo_bitrate_kbps,
            },
        };

        let job = DashJob {
            input: input.to_path_buf(),
            output: output_stem.to_path_buf(),
            large_size: params.sizes.large,
            small_size: params.sizes.small,
            high_tier_crf: params.crf,
            low_tier_crf: params.crf,
            gop_frames: params.gop_frames,
            seg_duration: self.config.gop_seconds,
            threads: self.config.threads,
            audio,
        };
        Ok(encode_dash(&job)?)
    }
}
