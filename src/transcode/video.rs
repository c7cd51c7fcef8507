//! SRS video encoding.
//!
//! The full tier pipeline for video containers: probe, classify, plan,
//! deduplicate, execute each surviving stream specification against its
//! ffmpeg strategy, and write the manifest once every artifact exists.

use crate::config::PipelineConfig;
use crate::error::{Error, Result};
use crate::manifest::SrsDocument;
use crate::schedule::{MediaSpecification, StreamCodec, StreamSpecification, TierScheduler};
use clsrs_av::ffmpeg;
use clsrs_av::probe::MediaInfo;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// SRS encoder for video assets.
pub struct SrsVideoEncoder<'a> {
    config: &'a PipelineConfig,
}

impl<'a> SrsVideoEncoder<'a> {
    /// Create an encoder over the given configuration.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Transcode one video asset, returning the manifest path.
    ///
    /// A failed baseline tier aborts the whole asset; failures in other
    /// tiers drop that tier from the manifest and the rest proceed.
    pub fn encode(&self, input: &Path, output_stem: &Path) -> Result<PathBuf> {
        let info = clsrs_av::probe(input)?;
        debug!("probed {:?}: {:?}", input, info);

        let scheduler = TierScheduler::new(&self.config.video, &self.config.tiers);
        let spec = scheduler.schedule(&info, output_stem)?;
        debug!("planned specification: {:?}", spec);

        let input_fps = info
            .primary_video()
            .and_then(|v| v.fps)
            .ok_or_else(|| Error::invalid_source("no frame rate on video stream"))?;
        let table = self.config.tiers.table_for_fps(input_fps);
        let spec = scheduler.deduplicate(spec, table)?;
        debug!("deduplicated specification: {:?}", spec);

        let baseline = table.baseline_level();
        let spec = self.execute(input, &info, spec, baseline, output_stem)?;

        self.write_srs(&spec, output_stem)
    }

    /// Run every stream specification, dropping non-baseline failures.
    fn execute(
        &self,
        input: &Path,
        info: &MediaInfo,
        spec: MediaSpecification,
        baseline: u8,
        output_stem: &Path,
    ) -> Result<MediaSpecification> {
        let output_dir = output_stem.parent().unwrap_or_else(|| Path::new(""));

        let mut video_streams = Vec::new();
        for stream in spec.video_streams {
            match self.run_video_stream(input, info, &stream, output_dir) {
                Ok(()) => video_streams.push(stream),
                Err(e) if stream.compatibility_level == baseline => {
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "dropping level {} rendition: {}",
                        stream.compatibility_level, e
                    );
                }
            }
        }

        let mut audio_streams = Vec::new();
        for stream in spec.audio_streams {
            match self.run_audio_stream(input, &stream, output_dir) {
                Ok(()) => audio_streams.push(stream),
                Err(e) => {
                    warn!(
                        "dropping audio track {} rendition: {}",
                        stream.stream_index, e
                    );
                }
            }
        }

        info!(
            "encoded {} video and {} audio renditions for {:?}",
            video_streams.len(),
            audio_streams.len(),
            input
        );

        Ok(MediaSpecification {
            video_streams,
            audio_streams,
        })
    }

    fn run_video_stream(
        &self,
        input: &Path,
        info: &MediaInfo,
        stream: &StreamSpecification,
        output_dir: &Path,
    ) -> Result<()> {
        let output = output_dir.join(&stream.file_name);
        match stream.codec {
            StreamCodec::Copy => {
                ffmpeg::stream_copy(
                    input,
                    stream.stream_index,
                    &output,
                    self.config.video.overwrite,
                )?;
            }
            StreamCodec::Video(codec) => {
                let source_fps = info
                    .primary_video()
                    .and_then(|v| v.fps)
                    .unwrap_or(self.config.tiers.fps_threshold);
                let job = ffmpeg::VideoEncodeJob {
                    input: input.to_path_buf(),
                    output,
                    stream_index: stream.stream_index,
                    size: stream.size,
                    fps: stream.fps,
                    crf: stream.crf,
                    bitrate: stream.bitrate,
                    output_fps: stream.fps.unwrap_or(source_fps),
                    gop_seconds: self.config.video.gop_length_seconds,
                    container: match stream.container {
                        crate::schedule::ContainerKind::Video(c) => c,
                        crate::schedule::ContainerKind::Audio(_) => {
                            return Err(Error::invalid_source(
                                "audio container on a video specification",
                            ))
                        }
                    },
                    overwrite: self.config.video.overwrite,
                };
                ffmpeg::transcode_video(&job, codec)?;
            }
            StreamCodec::Audio(_) => {
                return Err(Error::invalid_source(
                    "audio codec on a video specification",
                ))
            }
        }
        Ok(())
    }

    fn run_audio_stream(
        &self,
        input: &Path,
        stream: &StreamSpecification,
        output_dir: &Path,
    ) -> Result<()> {
        let output = output_dir.join(&stream.file_name);
        match stream.codec {
            StreamCodec::Copy => {
                ffmpeg::stream_copy(
                    input,
                    stream.stream_index,
                    &output,
                    self.config.video.overwrite,
                )?;
            }
            _ => {
                ffmpeg::audio::opus_transcode(
                    input,
                    stream.stream_index,
                    &output,
                    stream.bitrate.unwrap_or(self.config.video.opus_bitrate),
                    stream.source_audio_channels,
                    self.config.video.overwrite,
                )?;
            }
        }
        Ok(())
    }

    /// Assemble and persist the tier map.
    fn write_srs(&self, spec: &MediaSpecification, output_stem: &Path) -> Result<PathBuf> {
        let mut doc = SrsDocument::new_video(!spec.audio_streams.is_empty());

        for stream in &spec.video_streams {
            doc.set_level(
                stream.compatibility_level,
                stream.file_name.to_string_lossy().into_owned(),
            );
        }
        for stream in &spec.audio_streams {
            doc.push_audio(
                stream.source_audio_channels,
                stream.compatibility_level,
                stream.file_name.to_string_lossy().into_owned(),
            );
        }

        doc.write(output_stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ContainerKind;
    use clsrs_common::{AudioCodec, AudioContainer, VideoCodec, VideoContainer};

    fn video_spec(level: u8, size: Option<(u32, u32)>) -> StreamSpecification {
        StreamSpecification {
            compatibility_level: level,
            stream_index: 0,
            fps: None,
            size,
            codec: StreamCodec::Video(VideoCodec::H264),
            crf: Some(24),
            bitrate: None,
            file_name: PathBuf::from(format!("a_cl{}.mp4", level)),
            container: ContainerKind::Video(VideoContainer::Mpeg4),
            source_audio_channels: 0,
        }
    }

    #[test]
    fn test_write_srs_levels_and_audio() {
        let config = PipelineConfig::default();
        let encoder = SrsVideoEncoder::new(&config);
        let dir = tempfile::tempdir().unwrap();

        let spec = MediaSpecification {
            video_streams: vec![video_spec(1, None), video_spec(3, Some((1920, 1080)))],
            audio_streams: vec![StreamSpecification {
                compatibility_level: 3,
                stream_index: 1,
                fps: None,
                size: None,
                codec: StreamCodec::Audio(AudioCodec::Opus),
                crf: None,
                bitrate: Some(96_000),
                file_name: PathBuf::from("a_track1_cl3.opus"),
                container: ContainerKind::Audio(AudioContainer::OggOpus),
                source_audio_channels: 6,
            }],
        };

        let path = encoder.write_srs(&spec, &dir.path().join("a")).unwrap();
        let doc = SrsDocument::read(&path).unwrap();

        assert_eq!(u8::from(doc.content.media_type), 2);
        assert!(doc.has_level(1));
        assert!(doc.has_level(3));
        let audio = doc.streams.audio.as_ref().unwrap();
        assert_eq!(audio[0].channels["6"]["3"], "a_track1_cl3.opus");
    }

    #[test]
    fn test_write_srs_video_only_media_type() {
        let config = PipelineConfig::default();
        let encoder = SrsVideoEncoder::new(&config);
        let dir = tempfile::tempdir().unwrap();

        let spec = MediaSpecification {
            video_streams: vec![video_spec(3, None)],
            audio_streams: vec![],
        };

        let path = encoder.write_srs(&spec, &dir.path().join("b")).unwrap();
        let doc = SrsDocument::read(&path).unwrap();
        assert_eq!(u8::from(doc.content.media_type), 3);
        assert!(doc.streams.audio.is_none());
    }
}
