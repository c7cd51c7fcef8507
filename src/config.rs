//! Pipeline configuration.
//!
//! All knobs live in immutable structs handed to the encoders at
//! construction time. Every field has a serde default so partial configs
//! deserialize cleanly.

use crate::compat::LevelTable;
use serde::{Deserialize, Serialize};

/// Top-level configuration for one pipeline instance.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub video: VideoEncoderConfig,

    #[serde(default)]
    pub image: ImageEncoderConfig,

    #[serde(default)]
    pub dash: DashConfig,

    #[serde(default)]
    pub tiers: TierPolicy,
}

/// Compatibility-level policy.
///
/// The level tables are plain data so that deployments with different
/// tier-numbering conventions only change configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TierPolicy {
    /// Table for sources at or below `fps_threshold`.
    #[serde(default = "LevelTable::default_30fps")]
    pub levels_30fps: LevelTable,

    /// Table for sources above `fps_threshold`.
    #[serde(default = "LevelTable::default_60fps")]
    pub levels_60fps: LevelTable,

    /// Frame-rate boundary between the two tables.
    #[serde(default = "default_fps_threshold")]
    pub fps_threshold: f64,

    /// Output frame-rate cap; faster sources are resampled down to this.
    #[serde(default = "default_fps_cap")]
    pub fps_cap: f64,
}

impl TierPolicy {
    /// Pick the level table for a source frame rate.
    pub fn table_for_fps(&self, fps: f64) -> &LevelTable {
        if fps > self.fps_threshold {
            &self.levels_60fps
        } else {
            &self.levels_30fps
        }
    }
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            levels_30fps: LevelTable::default_30fps(),
            levels_60fps: LevelTable::default_60fps(),
            fps_threshold: default_fps_threshold(),
            fps_cap: default_fps_cap(),
        }
    }
}

fn default_fps_threshold() -> f64 {
    30.0
}
fn default_fps_cap() -> f64 {
    60.0
}

/// How video assets are delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoDelivery {
    /// Per-tier files referenced by a CLSRS manifest.
    #[default]
    Srs,
    /// Segmented two-rung DASH with an `.mpd` manifest.
    Dash,
}

/// Video tier encoding settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoEncoderConfig {
    /// Delivery form for video sources.
    #[serde(default)]
    pub delivery: VideoDelivery,

    /// CRF for transcoded tiers.
    #[serde(default = "default_video_crf")]
    pub crf: u32,

    /// CRF for animation-loop encodes.
    #[serde(default = "default_loop_crf")]
    pub loop_crf: u32,

    /// GOP length in seconds.
    #[serde(default = "default_gop_length")]
    pub gop_length_seconds: f64,

    /// Opus bitrate for forced audio transcodes, bits per second.
    #[serde(default = "default_opus_bitrate")]
    pub opus_bitrate: u64,

    /// Overwrite existing artifacts.
    #[serde(default = "default_true")]
    pub overwrite: bool,
}

impl Default for VideoEncoderConfig {
    fn default() -> Self {
        Self {
            delivery: VideoDelivery::default(),
            crf: default_video_crf(),
            loop_crf: default_loop_crf(),
            gop_length_seconds: default_gop_length(),
            opus_bitrate: default_opus_bitrate(),
            overwrite: true,
        }
    }
}

fn default_video_crf() -> u32 {
    24
}
fn default_loop_crf() -> u32 {
    23
}
fn default_gop_length() -> f64 {
    2.0
}
fn default_opus_bitrate() -> u64 {
    96_000
}
fn default_true() -> bool {
    true
}

/// Which external codec a given image tier uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageCodec {
    Avif,
    Webp,
    JpegXl,
}

/// Strategy for JPEG sources below the lossy size threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JpegRepack {
    /// jpegtran arithmetic-coding repack (stays a JPEG).
    Arithmetic,
    /// cjxl `--lossless_jpeg` recompression (becomes a JXL).
    JpegXl,
}

/// Image tier encoding settings.
///
/// The tier-to-codec assignment is explicit here rather than living on the
/// encoder types, so a pipeline assembles its encoders from configuration
/// alone.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageEncoderConfig {
    /// Skip the noise heuristic and keep the full-size rung lossless.
    #[serde(default)]
    pub force_lossless: bool,

    /// Starting quality of the adaptive search.
    #[serde(default = "default_base_quality")]
    pub base_quality: u8,

    /// Hard quality floor; below it lossy artifacts are unacceptable.
    #[serde(default = "default_quality_floor")]
    pub quality_floor: u8,

    /// Quality decrement per attempt.
    #[serde(default = "default_quality_step")]
    pub quality_step: u8,

    /// Starting size-reduction target, percent.
    #[serde(default = "default_start_ratio")]
    pub start_ratio: u32,

    /// Starting target when a lossless candidate is in play.
    #[serde(default = "default_lossless_start_ratio")]
    pub lossless_start_ratio: u32,

    /// Per-attempt ratio decay divisor for WebP.
    #[serde(default = "default_webp_divisor")]
    pub webp_ratio_divisor: f64,

    /// Per-attempt ratio decay divisor for AVIF.
    #[serde(default = "default_avif_divisor")]
    pub avif_ratio_divisor: f64,

    /// Side length above which a CL2 rung is produced.
    #[serde(default = "default_cl2_trigger")]
    pub cl2_trigger_size: u32,

    /// Bounding box of the CL3 (baseline) rung.
    #[serde(default = "default_cl3_limit")]
    pub cl3_size_limit: u32,

    /// WebP's hard side-length ceiling.
    #[serde(default = "default_webp_max_size")]
    pub webp_max_size: u32,

    /// Edge-energy ratio below which an image counts as noiseless.
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: f64,

    /// JPEG sources with both sides at or below this are repacked
    /// losslessly instead of entering the lossy pipeline.
    #[serde(default = "default_jpeg_lossy_threshold")]
    pub jpeg_lossy_threshold: u32,

    /// Lossless repack strategy for small JPEGs.
    #[serde(default = "default_jpeg_repack")]
    pub jpeg_repack: JpegRepack,

    /// Codec of the full-size CL1 rung.
    #[serde(default = "default_cl1_codec")]
    pub cl1_codec: ImageCodec,

    /// Codec of the CL2 rung.
    #[serde(default = "default_cl23_codec")]
    pub cl2_codec: ImageCodec,

    /// Codec of the CL3 (baseline) rung.
    #[serde(default = "default_cl23_codec")]
    pub cl3_codec: ImageCodec,

    /// avifenc encoding speed (0..=10).
    #[serde(default = "default_avif_speed")]
    pub avif_speed: u8,

    /// avifenc quantizer deviation around the target.
    #[serde(default = "default_avif_qdeviation")]
    pub avif_quantizer_deviation: u8,

    /// Bounding box for rasterized SVG baselines.
    #[serde(default = "default_svg_raster_box")]
    pub svg_raster_box: u32,
}

impl Default for ImageEncoderConfig {
    fn default() -> Self {
        Self {
            force_lossless: false,
            base_quality: default_base_quality(),
            quality_floor: default_quality_floor(),
            quality_step: default_quality_step(),
            start_ratio: default_start_ratio(),
            lossless_start_ratio: default_lossless_start_ratio(),
            webp_ratio_divisor: default_webp_divisor(),
            avif_ratio_divisor: default_avif_divisor(),
            cl2_trigger_size: default_cl2_trigger(),
            cl3_size_limit: default_cl3_limit(),
            webp_max_size: default_webp_max_size(),
            noise_threshold: default_noise_threshold(),
            jpeg_lossy_threshold: default_jpeg_lossy_threshold(),
            jpeg_repack: default_jpeg_repack(),
            cl1_codec: default_cl1_codec(),
            cl2_codec: default_cl23_codec(),
            cl3_codec: default_cl23_codec(),
            avif_speed: default_avif_speed(),
            avif_quantizer_deviation: default_avif_qdeviation(),
            svg_raster_box: default_svg_raster_box(),
        }
    }
}

impl ImageEncoderConfig {
    /// Ratio decay divisor for a tier codec.
    pub fn ratio_divisor(&self, codec: ImageCodec) -> f64 {
        match codec {
            ImageCodec::Avif => self.avif_ratio_divisor,
            ImageCodec::Webp | ImageCodec::JpegXl => self.webp_ratio_divisor,
        }
    }
}

fn default_base_quality() -> u8 {
    95
}
fn default_quality_floor() -> u8 {
    60
}
fn default_quality_step() -> u8 {
    5
}
fn default_start_ratio() -> u32 {
    80
}
fn default_lossless_start_ratio() -> u32 {
    40
}
fn default_webp_divisor() -> f64 {
    1.375
}
fn default_avif_divisor() -> f64 {
    2.0
}
fn default_cl2_trigger() -> u32 {
    2048
}
fn default_cl3_limit() -> u32 {
    1024
}
fn default_webp_max_size() -> u32 {
    16383
}
fn default_noise_threshold() -> f64 {
    0.2
}
fn default_jpeg_lossy_threshold() -> u32 {
    1024
}
fn default_jpeg_repack() -> JpegRepack {
    JpegRepack::Arithmetic
}
fn default_cl1_codec() -> ImageCodec {
    ImageCodec::Avif
}
fn default_cl23_codec() -> ImageCodec {
    ImageCodec::Webp
}
fn default_avif_speed() -> u8 {
    6
}
fn default_avif_qdeviation() -> u8 {
    4
}
fn default_svg_raster_box() -> u32 {
    2048
}

/// DASH output settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DashConfig {
    /// Base CRF before the source-size ladder adjustment.
    #[serde(default = "default_dash_crf")]
    pub crf: u32,

    /// CRF step per ladder rung; halved (min 1) above 30 fps.
    #[serde(default = "default_lt_gap")]
    pub low_tier_crf_gap: u32,

    /// Descending ladder of shortest-side sizes; each rung the source falls
    /// below lowers the CRF by one gap (smaller sources keep more detail).
    #[serde(default = "default_tiers_min_size")]
    pub tiers_min_size: Vec<u32>,

    /// Low-tier shortest side; replaced by 360 above 30 fps.
    #[serde(default = "default_dash_min_size")]
    pub min_size: u32,

    /// GOP and segment length in seconds.
    #[serde(default = "default_dash_gop")]
    pub gop_seconds: u32,

    /// Encoding threads.
    #[serde(default = "default_dash_threads")]
    pub threads: u32,

    /// Opus bitrate for forced audio transcodes, kbps.
    #[serde(default = "default_dash_opus_kbps")]
    pub opus_stereo_bitrate_kbps: u32,

    /// Transcode audio even when the source codec is web-compatible.
    #[serde(default)]
    pub force_audio_transcode: bool,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            crf: default_dash_crf(),
            low_tier_crf_gap: default_lt_gap(),
            tiers_min_size: default_tiers_min_size(),
            min_size: default_dash_min_size(),
            gop_seconds: default_dash_gop(),
            threads: default_dash_threads(),
            opus_stereo_bitrate_kbps: default_dash_opus_kbps(),
            force_audio_transcode: false,
        }
    }
}

fn default_dash_crf() -> u32 {
    32
}
fn default_lt_gap() -> u32 {
    5
}
fn default_tiers_min_size() -> Vec<u32> {
    vec![1080, 720, 480]
}
fn default_dash_min_size() -> u32 {
    720
}
fn default_dash_gop() -> u32 {
    10
}
fn default_dash_threads() -> u32 {
    4
}
fn default_dash_opus_kbps() -> u32 {
    96
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.image.base_quality, 95);
        assert_eq!(config.image.quality_floor, 60);
        assert_eq!(config.image.cl2_trigger_size, 2048);
        assert_eq!(config.video.crf, 24);
        assert_eq!(config.tiers.fps_threshold, 30.0);
        assert_eq!(config.dash.min_size, 720);
    }

    #[test]
    fn test_table_selection_by_fps() {
        let policy = TierPolicy::default();
        assert_eq!(policy.table_for_fps(30.0), &policy.levels_30fps);
        assert_eq!(policy.table_for_fps(30.01), &policy.levels_60fps);
        assert_eq!(policy.table_for_fps(60.0), &policy.levels_60fps);
    }

    #[test]
    fn test_partial_config_deserializes() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"image": {"base_quality": 90}}"#).unwrap();
        assert_eq!(config.image.base_quality, 90);
        assert_eq!(config.image.quality_floor, 60);
    }

    #[test]
    fn test_ratio_divisor_per_codec() {
        let config = ImageEncoderConfig::default();
        assert_eq!(config.ratio_divisor(ImageCodec::Avif), 2.0);
        assert_eq!(config.ratio_divisor(ImageCodec::Webp), 1.375);
    }
}
