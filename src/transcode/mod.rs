//! Per-source-kind transcoders and dispatch.
//!
//! [`Transcoder`] sniffs the source kind from content and routes to the
//! matching pipeline: still images into the SRS image encoder, animations
//! into the MP4 loop encoder, video containers into the SRS video encoder,
//! SVG into the vector passthrough. Sources the targeted pipeline rejects
//! fall back to a plain pass-through copy so an input never ends up with
//! zero renditions.

pub mod animation;
pub mod dash;
pub mod image;
pub mod svg;
pub mod video;

pub use animation::LoopEncoder;
pub use dash::DashEncoder;
pub use image::SrsImageEncoder;
pub use svg::SvgEncoder;
pub use video::SrsVideoEncoder;

use crate::config::{JpegRepack, PipelineConfig, VideoDelivery};
use crate::error::{Error, Result};
use crate::metadata::png_is_animated;
use crate::sniff::{sniff, SourceKind};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What one transcode produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscodeOutcome {
    /// A manifest (`.srs` or `.mpd`) referencing one or more artifacts.
    Manifest(PathBuf),
    /// A single artifact with no manifest (repacks and pass-throughs).
    SingleFile(PathBuf),
}

impl TranscodeOutcome {
    /// Path of the manifest or artifact.
    pub fn path(&self) -> &Path {
        match self {
            Self::Manifest(p) | Self::SingleFile(p) => p,
        }
    }
}

/// Content-dispatched transcoder over one pipeline configuration.
pub struct Transcoder<'a> {
    config: &'a PipelineConfig,
}

impl<'a> Transcoder<'a> {
    /// Create a transcoder over the given configuration.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Transcode one source file, writing artifacts next to `output_stem`.
    pub fn transcode_file(&self, input: &Path, output_stem: &Path) -> Result<TranscodeOutcome> {
        let head = read_head(input)?;
        let kind = sniff(&head);
        info!("transcoding {:?} as {:?}", input, kind);

        let result = match kind {
            SourceKind::Png => {
                if png_is_animated(&std::fs::read(input)?) {
                    LoopEncoder::new(self.config)
                        .encode(input, output_stem)
                        .map(TranscodeOutcome::SingleFile)
                } else {
                    SrsImageEncoder::new(&self.config.image)
                        .encode(input, output_stem, self.config.image.force_lossless)
                        .map(TranscodeOutcome::Manifest)
                }
            }
            SourceKind::Jpeg => self.transcode_jpeg(input, output_stem),
            SourceKind::Gif => {
                if gif_is_animated(input)? {
                    LoopEncoder::new(self.config)
                        .encode(input, output_stem)
                        .map(TranscodeOutcome::SingleFile)
                } else {
                    SrsImageEncoder::new(&self.config.image)
                        .encode(input, output_stem, self.config.image.force_lossless)
                        .map(TranscodeOutcome::Manifest)
                }
            }
            SourceKind::WebM | SourceKind::Mp4 => match self.config.video.delivery {
                VideoDelivery::Srs => SrsVideoEncoder::new(self.config)
                    .encode(input, output_stem)
                    .map(TranscodeOutcome::Manifest),
                VideoDelivery::Dash => DashEncoder::new(&self.config.dash)
                    .encode(input, output_stem)
                    .map(TranscodeOutcome::Manifest),
            },
            SourceKind::Svg => SvgEncoder::new(&self.config.image)
                .encode(input, output_stem)
                .map(TranscodeOutcome::Manifest),
            SourceKind::Unknown => Err(Error::not_supported("unrecognized source format")),
        };

        match result {
            Err(Error::NotSupportedSource(reason)) => {
                warn!("{:?}: {}; passing through unchanged", input, reason);
                self.pass_through(input, output_stem)
            }
            Err(Error::AlreadyOptimized) => {
                info!("{:?}: already optimized; passing through unchanged", input);
                self.pass_through(input, output_stem)
            }
            other => other,
        }
    }

    fn transcode_jpeg(&self, input: &Path, output_stem: &Path) -> Result<TranscodeOutcome> {
        let (width, height) = ::image::image_dimensions(input)
            .map_err(|e| Error::invalid_source(e.to_string()))?;
        let threshold = self.config.image.jpeg_lossy_threshold;

        if width > threshold || height > threshold {
            return SrsImageEncoder::new(&self.config.image)
                .encode(input, output_stem, self.config.image.force_lossless)
                .map(TranscodeOutcome::Manifest);
        }

        // small JPEGs are repacked losslessly instead of re-encoded
        let data = std::fs::read(input)?;
        let (bytes, extension) = match self.config.image.jpeg_repack {
            JpegRepack::Arithmetic => {
                (clsrs_av::encoders::jpegtran::arithmetic_repack(&data)?, "jpg")
            }
            JpegRepack::JpegXl => (
                clsrs_av::encoders::JxlEncoder.recompress_jpeg(input)?,
                "jxl",
            ),
        };

        if bytes.len() as u64 >= data.len() as u64 {
            return Err(Error::AlreadyOptimized);
        }

        let output = output_stem.with_extension(extension);
        std::fs::write(&output, bytes)?;
        Ok(TranscodeOutcome::SingleFile(output))
    }

    /// Copy the source unchanged; the fallback when no pipeline applies.
    fn pass_through(&self, input: &Path, output_stem: &Path) -> Result<TranscodeOutcome> {
        let extension = input
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_else(|| "bin".to_string());
        let output = output_stem.with_extension(extension);
        std::fs::copy(input, &output)?;
        Ok(TranscodeOutcome::SingleFile(output))
    }
}

fn read_head(input: &Path) -> Result<Vec<u8>> {
    let mut head = vec![0u8; 4096];
    let mut file = std::fs::File::open(input)?;
    let read = file.read(&mut head)?;
    head.truncate(read);
    Ok(head)
}

fn gif_is_animated(input: &Path) -> Result<bool> {
    use ::image::AnimationDecoder;

    let file = std::fs::File::open(input)?;
    let decoder = ::image::codecs::gif::GifDecoder::new(std::io::BufReader::new(file))
        .map_err(|e| Error::invalid_source(e.to_string()))?;
    Ok(decoder.into_frames().take(2).count() > 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;

    #[test]
    fn test_pass_through_keeps_extension() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.dat");
        std::fs::write(&input, b"opaque bytes").unwrap();

        let config = PipelineConfig::default();
        let transcoder = Transcoder::new(&config);
        let outcome = transcoder
            .pass_through(&input, &dir.path().join("out"))
            .unwrap();

        let TranscodeOutcome::SingleFile(path) = outcome else {
            panic!("expected single file");
        };
        assert_eq!(path, dir.path().join("out.dat"));
        assert_eq!(std::fs::read(path).unwrap(), b"opaque bytes");
    }

    #[test]
    fn test_unknown_source_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.xyz");
        std::fs::write(&input, b"neither image nor video").unwrap();

        let config = PipelineConfig::default();
        let transcoder = Transcoder::new(&config);
        let outcome = transcoder
            .transcode_file(&input, &dir.path().join("out"))
            .unwrap();
        assert_eq!(
            outcome,
            TranscodeOutcome::SingleFile(dir.path().join("out.xyz"))
        );
    }
}
