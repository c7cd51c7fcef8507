//! Tier scheduling.
//!
//! Turns a probed asset into an ordered list of stream specifications: one
//! per compatibility level that needs producing, marked either as a
//! transcode (new codec/size/CRF) or a stream copy (the source bitstream
//! already satisfies the level). Deduplication then prunes levels whose
//! rendition would be identical to their less-restrictive neighbor.

use crate::compat::{classify, LevelSpec, LevelTable};
use crate::config::{TierPolicy, VideoEncoderConfig};
use crate::error::{Error, Result};
use crate::geometry::scale_down;
use clsrs_av::probe::{AudioStream, MediaInfo, VideoStream};
use clsrs_common::{AudioCodec, AudioContainer, VideoCodec, VideoContainer};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Codec slot of a stream specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamCodec {
    /// Keep the source bitstream; demux only.
    Copy,
    /// Transcode to a delivery video codec.
    Video(VideoCodec),
    /// Transcode to a delivery audio codec.
    Audio(AudioCodec),
}

/// Container slot of a stream specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Video(VideoContainer),
    Audio(AudioContainer),
}

impl ContainerKind {
    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Video(c) => c.extension(),
            Self::Audio(c) => c.extension(),
        }
    }
}

/// One planned output rendition.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSpecification {
    /// Compatibility level this rendition serves.
    pub compatibility_level: u8,
    /// Source demuxer stream index.
    pub stream_index: u32,
    /// Target frame rate; `None` keeps the source rate.
    pub fps: Option<f64>,
    /// Target size; `None` keeps the source size.
    pub size: Option<(u32, u32)>,
    /// Codec, or the stream-copy marker.
    pub codec: StreamCodec,
    /// CRF rate control.
    pub crf: Option<u32>,
    /// Bitrate rate control, bits per second.
    pub bitrate: Option<u64>,
    /// Output artifact file name (bare, no directory).
    pub file_name: PathBuf,
    /// Output container.
    pub container: ContainerKind,
    /// Channel count of the source audio stream (audio specs only).
    pub source_audio_channels: u32,
}

/// The full plan for one asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaSpecification {
    pub video_streams: Vec<StreamSpecification>,
    pub audio_streams: Vec<StreamSpecification>,
}

/// Plans video and audio tiers for one asset.
pub struct TierScheduler<'a> {
    config: &'a VideoEncoderConfig,
    policy: &'a TierPolicy,
}

impl<'a> TierScheduler<'a> {
    /// Create a scheduler over the given configuration.
    pub fn new(config: &'a VideoEncoderConfig, policy: &'a TierPolicy) -> Self {
        Self { config, policy }
    }

    /// Classify the primary video stream's compatibility level.
    pub fn source_compatibility_level(&self, video: &VideoStream) -> u8 {
        let fps = video.fps.unwrap_or(0.0);
        classify(video, self.policy.table_for_fps(fps))
    }

    /// Build the tier plan for an asset.
    ///
    /// `output_stem` names the asset; artifacts are derived from its file
    /// name and live in its directory.
    pub fn schedule(&self, info: &MediaInfo, output_stem: &Path) -> Result<MediaSpecification> {
        let video = info
            .primary_video()
            .ok_or_else(|| Error::invalid_source("no video stream"))?;
        let input_fps = video
            .fps
            .ok_or_else(|| Error::invalid_source("no frame rate on video stream"))?;

        let table = self.policy.table_for_fps(input_fps);
        let source_level = classify(video, table);
        let output_fps = (input_fps > self.policy.fps_cap).then_some(self.policy.fps_cap);

        debug!(
            "scheduling {:?}: source level {}, fps {}",
            info.file_path, source_level, input_fps
        );

        let mut video_streams = Vec::new();
        for level_spec in &table.levels {
            if source_level < level_spec.level {
                video_streams.push(self.transcode_spec(
                    video,
                    level_spec,
                    output_fps,
                    output_stem,
                ));
            } else if source_level == level_spec.level {
                video_streams.push(demux_spec(video, level_spec.level, output_stem)?);
            }
            // source_level > level: the source already exceeds this tier's
            // requirements; no separate rendition
        }

        let audio_streams = info
            .audio_streams
            .iter()
            .map(|audio| self.audio_spec(audio, output_stem))
            .collect();

        Ok(MediaSpecification {
            video_streams,
            audio_streams,
        })
    }

    fn transcode_spec(
        &self,
        video: &VideoStream,
        level: &LevelSpec,
        output_fps: Option<f64>,
        output_stem: &Path,
    ) -> StreamSpecification {
        let (min_side, max_side) = video.min_max_side();
        let size = (min_side > level.min_side || max_side > level.max_side).then(|| {
            scale_down(
                (video.width, video.height),
                (level.min_side, level.max_side),
                -1,
            )
            .size()
        });

        let container = level.codec.preferred_container();
        StreamSpecification {
            compatibility_level: level.level,
            stream_index: video.index,
            fps: output_fps,
            size,
            codec: StreamCodec::Video(level.codec),
            crf: Some(self.config.crf),
            bitrate: None,
            file_name: tier_file_name(output_stem, level.level, container.extension()),
            container: ContainerKind::Video(container),
            source_audio_channels: 0,
        }
    }

    fn audio_spec(&self, audio: &AudioStream, output_stem: &Path) -> StreamSpecification {
        match AudioCodec::from_codec_name(&audio.codec_name) {
            Some(codec) => {
                // approved codec: keep the bitstream at its natural level
                let level = codec.stream_copy_level();
                let container = codec.preferred_container();
                StreamSpecification {
                    compatibility_level: level,
                    stream_index: audio.index,
                    fps: None,
                    size: None,
                    codec: StreamCodec::Copy,
                    crf: None,
                    bitrate: None,
                    file_name: track_file_name(
                        output_stem,
                        audio.index,
                        level,
                        container.extension(),
                    ),
                    container: ContainerKind::Audio(container),
                    source_audio_channels: audio.channels,
                }
            }
            None => {
                let codec = AudioCodec::Opus;
                let level = codec.stream_copy_level();
                let container = codec.preferred_container();
                StreamSpecification {
                    compatibility_level: level,
                    stream_index: audio.index,
                    fps: None,
                    size: None,
                    codec: StreamCodec::Audio(codec),
                    crf: None,
                    bitrate: Some(self.config.opus_bitrate),
                    file_name: track_file_name(
                        output_stem,
                        audio.index,
                        level,
                        container.extension(),
                    ),
                    container: ContainerKind::Audio(container),
                    source_audio_channels: audio.channels,
                }
            }
        }
    }

    /// Prune video tiers whose rendition would match their less-restrictive
    /// neighbor, walking from the most restrictive level outward.
    ///
    /// The baseline tier is never dropped; its absence from the plan is an
    /// error.
    pub fn deduplicate(
        &self,
        spec: MediaSpecification,
        table: &LevelTable,
    ) -> Result<MediaSpecification> {
        let baseline = table.baseline_level();
        if !spec
            .video_streams
            .iter()
            .any(|s| s.compatibility_level == baseline)
        {
            return Err(Error::MissingBaselineTier { level: baseline });
        }

        let mut video_streams = spec.video_streams;
        video_streams.sort_by_key(|s| s.compatibility_level);

        let mut index = 0;
        while index + 1 < video_streams.len() {
            if video_streams[index].size == video_streams[index + 1].size {
                debug!(
                    "dropping level {} rendition: identical size to level {}",
                    video_streams[index].compatibility_level,
                    video_streams[index + 1].compatibility_level
                );
                video_streams.remove(index);
            } else {
                index += 1;
            }
        }

        Ok(MediaSpecification {
            video_streams,
            audio_streams: spec.audio_streams,
        })
    }
}

fn stem_name(output_stem: &Path) -> String {
    output_stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

fn tier_file_name(output_stem: &Path, level: u8, extension: &str) -> PathBuf {
    PathBuf::from(format!("{}_cl{}{}", stem_name(output_stem), level, extension))
}

fn track_file_name(output_stem: &Path, track: u32, level: u8, extension: &str) -> PathBuf {
    PathBuf::from(format!(
        "{}_track{}_cl{}{}",
        stem_name(output_stem),
        track,
        level,
        extension
    ))
}

fn demux_spec(
    video: &VideoStream,
    level: u8,
    output_stem: &Path,
) -> Result<StreamSpecification> {
    // container follows the source codec, since the bitstream is kept
    let codec = VideoCodec::from_codec_name(&video.codec_name)
        .ok_or_else(|| clsrs_common::Error::unknown_codec(&video.codec_name))?;
    let container = codec.preferred_container();
    Ok(StreamSpecification {
        compatibility_level: level,
        stream_index: video.index,
        fps: None,
        size: None,
        codec: StreamCodec::Copy,
        crf: None,
        bitrate: None,
        file_name: tier_file_name(output_stem, level, container.extension()),
        container: ContainerKind::Video(container),
        source_audio_channels: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TierPolicy, VideoEncoderConfig};

    fn info(codec: &str, width: u32, height: u32, fps: f64, audio: Vec<AudioStream>) -> MediaInfo {
        MediaInfo {
            file_path: PathBuf::from("in.mkv"),
            file_size: 1 << 20,
            container: "matroska,webm".to_string(),
            duration: Some(10.0),
            bit_rate: Some(4_000_000),
            video_streams: vec![VideoStream {
                index: 0,
                codec_name: codec.to_string(),
                width,
                height,
                pix_fmt: Some("yuv420p".to_string()),
                fps: Some(fps),
            }],
            audio_streams: audio,
        }
    }

    fn scheduler_parts() -> (VideoEncoderConfig, TierPolicy) {
        (VideoEncoderConfig::default(), TierPolicy::default())
    }

    #[test]
    fn test_h264_4k60_plans_three_transcodes() {
        let (config, policy) = scheduler_parts();
        let scheduler = TierScheduler::new(&config, &policy);
        let info = info("h264", 3840, 2160, 60.0, vec![]);

        let spec = scheduler.schedule(&info, Path::new("/out/asset")).unwrap();
        assert_eq!(spec.video_streams.len(), 3);

        let cl1 = &spec.video_streams[0];
        assert_eq!(cl1.codec, StreamCodec::Video(VideoCodec::Av1));
        // already inside the level-1 box: no scaling
        assert_eq!(cl1.size, None);
        assert_eq!(cl1.file_name, PathBuf::from("asset_cl1.mp4"));

        let cl2 = &spec.video_streams[1];
        assert_eq!(cl2.codec, StreamCodec::Video(VideoCodec::Vp9));
        assert_eq!(cl2.size, Some((2560, 1440)));
        assert_eq!(cl2.file_name, PathBuf::from("asset_cl2.webm"));

        let cl3 = &spec.video_streams[2];
        assert_eq!(cl3.codec, StreamCodec::Video(VideoCodec::H264));
        assert_eq!(cl3.size, Some((1920, 1080)));
        assert_eq!(cl3.file_name, PathBuf::from("asset_cl3.mp4"));

        // none are stream copies
        assert!(spec
            .video_streams
            .iter()
            .all(|s| s.codec != StreamCodec::Copy));
    }

    #[test]
    fn test_compatible_source_stream_copies_baseline_only() {
        let (config, policy) = scheduler_parts();
        let scheduler = TierScheduler::new(&config, &policy);
        let info = info("h264", 1920, 1080, 30.0, vec![]);

        let spec = scheduler.schedule(&info, Path::new("/out/asset")).unwrap();
        assert_eq!(spec.video_streams.len(), 1);
        assert_eq!(spec.video_streams[0].compatibility_level, 3);
        assert_eq!(spec.video_streams[0].codec, StreamCodec::Copy);
        assert_eq!(spec.video_streams[0].size, None);
    }

    #[test]
    fn test_level_one_source_copies_top_and_transcodes_rest() {
        let (config, policy) = scheduler_parts();
        let scheduler = TierScheduler::new(&config, &policy);
        let mut info = info("av1", 3840, 2160, 60.0, vec![]);
        info.video_streams[0].pix_fmt = Some("yuv420p10le".to_string());

        let spec = scheduler.schedule(&info, Path::new("/out/asset")).unwrap();
        assert_eq!(spec.video_streams.len(), 3);
        assert_eq!(spec.video_streams[0].codec, StreamCodec::Copy);
        assert_eq!(
            spec.video_streams[1].codec,
            StreamCodec::Video(VideoCodec::Vp9)
        );
        assert_eq!(
            spec.video_streams[2].codec,
            StreamCodec::Video(VideoCodec::H264)
        );
    }

    #[test]
    fn test_fps_cap_only_above_limit() {
        let (config, policy) = scheduler_parts();
        let scheduler = TierScheduler::new(&config, &policy);

        let spec = scheduler
            .schedule(&info("h264", 3840, 2160, 120.0, vec![]), Path::new("a"))
            .unwrap();
        assert_eq!(spec.video_streams[0].fps, Some(60.0));

        let spec = scheduler
            .schedule(&info("h264", 3840, 2160, 60.0, vec![]), Path::new("a"))
            .unwrap();
        assert_eq!(spec.video_streams[0].fps, None);
    }

    #[test]
    fn test_audio_approved_codec_is_copied() {
        let (config, policy) = scheduler_parts();
        let scheduler = TierScheduler::new(&config, &policy);
        let audio = vec![AudioStream {
            index: 1,
            codec_name: "aac".to_string(),
            channels: 2,
            sample_rate: Some(48_000),
        }];
        let spec = scheduler
            .schedule(&info("h264", 1920, 1080, 30.0, audio), Path::new("/out/a"))
            .unwrap();

        let audio_spec = &spec.audio_streams[0];
        assert_eq!(audio_spec.codec, StreamCodec::Copy);
        assert_eq!(audio_spec.compatibility_level, 4);
        assert_eq!(audio_spec.file_name, PathBuf::from("a_track1_cl4.m4a"));
    }

    #[test]
    fn test_audio_pcm_is_forced_to_opus() {
        let (config, policy) = scheduler_parts();
        let scheduler = TierScheduler::new(&config, &policy);
        let audio = vec![AudioStream {
            index: 1,
            codec_name: "pcm_s16le".to_string(),
            channels: 6,
            sample_rate: Some(48_000),
        }];
        let spec = scheduler
            .schedule(&info("h264", 1920, 1080, 30.0, audio), Path::new("/out/a"))
            .unwrap();

        let audio_spec = &spec.audio_streams[0];
        assert_eq!(audio_spec.codec, StreamCodec::Audio(AudioCodec::Opus));
        assert_eq!(audio_spec.compatibility_level, 3);
        assert_eq!(audio_spec.bitrate, Some(96_000));
        assert_eq!(audio_spec.source_audio_channels, 6);
        assert_eq!(audio_spec.file_name, PathBuf::from("a_track1_cl3.opus"));
    }

    #[test]
    fn test_dedup_drops_equal_adjacent_sizes() {
        let (config, policy) = scheduler_parts();
        let scheduler = TierScheduler::new(&config, &policy);
        // 1440p30 h264: inside every level's box except none qualify by
        // codec... use a small source so cl2/cl3 sizes collapse to None
        let info = info("h264", 1280, 720, 30.0, vec![]);
        // force a plan where levels 1..3 are all unscaled transcodes
        let mut spec = scheduler.schedule(&info, Path::new("a")).unwrap();
        // a 720p 8-bit h264 source classifies as baseline; rebuild an
        // artificial all-transcode plan to exercise the dedup walk
        if spec.video_streams.len() == 1 {
            let baseline = spec.video_streams[0].clone();
            let mut cl1 = baseline.clone();
            cl1.compatibility_level = 1;
            cl1.codec = StreamCodec::Video(VideoCodec::Av1);
            let mut cl2 = baseline.clone();
            cl2.compatibility_level = 2;
            cl2.codec = StreamCodec::Video(VideoCodec::Vp9);
            spec.video_streams = vec![cl1, cl2, baseline];
        }

        let table = policy.table_for_fps(30.0);
        let deduped = scheduler.deduplicate(spec, table).unwrap();
        // all sizes None: only the baseline survives
        assert_eq!(deduped.video_streams.len(), 1);
        assert_eq!(deduped.video_streams[0].compatibility_level, 3);
    }

    #[test]
    fn test_dedup_keeps_distinct_sizes() {
        let (config, policy) = scheduler_parts();
        let scheduler = TierScheduler::new(&config, &policy);
        let info = info("h264", 3840, 2160, 60.0, vec![]);
        let spec = scheduler.schedule(&info, Path::new("a")).unwrap();

        let table = policy.table_for_fps(60.0);
        let deduped = scheduler.deduplicate(spec, table).unwrap();
        assert_eq!(deduped.video_streams.len(), 3);
        // adjacent survivors differ in size
        for pair in deduped.video_streams.windows(2) {
            assert_ne!(pair[0].size, pair[1].size);
        }
    }

    #[test]
    fn test_dedup_requires_baseline() {
        let (config, policy) = scheduler_parts();
        let scheduler = TierScheduler::new(&config, &policy);
        let spec = MediaSpecification::default();
        let table = policy.table_for_fps(30.0);
        assert!(matches!(
            scheduler.deduplicate(spec, table),
            Err(Error::MissingBaselineTier { level: 3 })
        ));
    }
}
