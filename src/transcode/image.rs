//! SRS image encoding.
//!
//! Produces the multi-resolution image sheet: a full-size CL1 rung whose
//! quality is settled by the adaptive search, an optional CL2 rung bounded
//! at the CL2 trigger size, and the CL3 baseline rung bounded at the CL3
//! size limit. Noiseless sources get a lossless candidate that wins
//! outright when it beats the first lossy attempt.

use crate::config::{ImageCodec, ImageEncoderConfig};
use crate::error::{Error, Result};
use crate::manifest::SrsDocument;
use crate::metadata::{extract_attachment, png_is_palette};
use crate::noise::{noise_detection, Noisiness};
use crate::quality::QualitySearch;
use crate::sniff::sniff;
use clsrs_av::encoders::{AvifEncoder, JxlEncoder, WebpEncoder};
use clsrs_av::Workspace;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Does the raster carry actual transparency?
///
/// Grayscale and RGB images never do; images with an alpha channel count
/// as transparent unless every alpha sample is fully opaque.
pub fn has_transparency(img: &DynamicImage) -> bool {
    if !img.color().has_alpha() {
        return false;
    }
    img.pixels().any(|(_, _, pixel)| pixel.0[3] != u8::MAX)
}

/// SRS encoder for still images.
pub struct SrsImageEncoder<'a> {
    config: &'a ImageEncoderConfig,
}

struct TierArtifact {
    file_name: String,
    data: Vec<u8>,
}

impl<'a> SrsImageEncoder<'a> {
    /// Create an encoder over the given configuration.
    pub fn new(config: &'a ImageEncoderConfig) -> Self {
        Self { config }
    }

    /// Encode one image into its SRS sheet, returning the manifest path.
    ///
    /// `force_lossless` skips the noise heuristic and keeps the full-size
    /// rung lossless unconditionally.
    pub fn encode(
        &self,
        input: &Path,
        output_stem: &Path,
        force_lossless: bool,
    ) -> Result<PathBuf> {
        let data = std::fs::read(input)?;
        let kind = sniff(&data);

        if kind == crate::sniff::SourceKind::Png && png_is_palette(&data) {
            return Err(Error::not_supported("palette-mode PNG"));
        }

        let img = image::load_from_memory(&data)
            .map_err(|e| Error::invalid_source(e.to_string()))?;

        let workspace = Workspace::new(input)?;
        let attachment = extract_attachment(kind, &data);

        let (cl1, cl2, cl3) = if force_lossless {
            self.encode_lossless_tiers(&img, data.len() as u64, output_stem, &workspace)?
        } else {
            self.encode_lossy_tiers(&img, data.len() as u64, output_stem, &workspace)?
        };

        let output_dir = output_stem.parent().unwrap_or_else(|| Path::new(""));
        for artifact in [Some(&cl3), cl2.as_ref(), cl1.as_ref()].into_iter().flatten() {
            std::fs::write(output_dir.join(&artifact.file_name), &artifact.data)?;
        }

        let mut doc = SrsDocument::new_image();
        doc.set_attachment(attachment);
        let over_cl2_trigger = img.width() > self.config.cl2_trigger_size
            || img.height() > self.config.cl2_trigger_size;
        if let Some(cl1) = &cl1 {
            if over_cl2_trigger || cl2.is_some() {
                doc.set_level(1, cl1.file_name.clone());
            } else {
                // a full-size rung at CL2 scale is a CL2 rendition
                doc.set_level(2, cl1.file_name.clone());
            }
        }
        if let Some(cl2) = &cl2 {
            doc.set_level(2, cl2.file_name.clone());
        }
        doc.set_level(3, cl3.file_name.clone());

        doc.write(output_stem)
    }

    fn encode_lossy_tiers(
        &self,
        img: &DynamicImage,
        source_size: u64,
        output_stem: &Path,
        workspace: &Workspace,
    ) -> Result<(Option<TierArtifact>, Option<TierArtifact>, TierArtifact)> {
        let config = self.config;

        // stage the CL1 raster, clamped to WebP's hard ceiling when needed
        let cl1_img = self.bounded(img, self.cl1_bound(img));
        let cl1_staged = self.stage(&cl1_img, workspace, "cl1.png")?;

        let noisiness = noise_detection(img, config.noise_threshold);
        let mut quality = config.base_quality;
        let mut lossless_won = false;

        // fast search speed for AVIF; the winner is re-encoded at the
        // configured speed below
        let search_speed = config.avif_speed.saturating_mul(2).min(10);

        let (start_ratio, first_attempt) = if noisiness == Noisiness::Noiseless {
            let lossless = self.encode_tier(config.cl1_codec, &cl1_staged, 100, true, search_speed)?;
            let first_lossy =
                self.encode_tier(config.cl1_codec, &cl1_staged, quality, false, search_speed)?;
            debug!(
                "lossless candidate {} bytes vs first lossy {} bytes",
                lossless.len(),
                first_lossy.len()
            );
            if lossless.len() < first_lossy.len() {
                lossless_won = true;
                quality = 100;
                (config.lossless_start_ratio, Some(lossless))
            } else {
                (config.lossless_start_ratio, Some(first_lossy))
            }
        } else {
            (config.start_ratio, None)
        };

        let mut cl1_data = if lossless_won {
            first_attempt.unwrap_or_default()
        } else {
            let search = QualitySearch::new(
                config.base_quality,
                config.quality_floor,
                config.quality_step,
                start_ratio,
                config.ratio_divisor(config.cl1_codec),
            );
            let mut pending_first = first_attempt;
            let outcome = search.run(source_size, |q| {
                if let Some(data) = pending_first.take() {
                    return Ok(data);
                }
                self.encode_tier(config.cl1_codec, &cl1_staged, q, false, search_speed)
            })?;
            quality = outcome.quality;
            outcome.data
        };

        if config.cl1_codec == ImageCodec::Avif && !lossless_won {
            // settle the winner at the configured (slower) speed
            cl1_data =
                self.encode_tier(config.cl1_codec, &cl1_staged, quality, false, config.avif_speed)?;
        }

        info!("image settled at quality {}", quality);

        // CL2: only when the source is over the trigger size
        let cl2 = if img.width() > config.cl2_trigger_size
            || img.height() > config.cl2_trigger_size
        {
            let cl2_img = self.bounded(img, config.cl2_trigger_size);
            let staged = self.stage(&cl2_img, workspace, "cl2.png")?;
            let data =
                self.encode_tier(config.cl2_codec, &staged, quality, false, config.avif_speed)?;
            Some(TierArtifact {
                file_name: format!(
                    "{}_cl2{}",
                    stem_name(output_stem),
                    extension(config.cl2_codec)
                ),
                data,
            })
        } else {
            None
        };

        // CL3 baseline: bounded, one step below the settled quality
        let cl3_img = self.bounded(img, config.cl3_size_limit);
        let cl3_staged = self.stage(&cl3_img, workspace, "cl3.png")?;
        let cl3_quality = quality.saturating_sub(config.quality_step).max(1);
        let cl3_data =
            self.encode_tier(config.cl3_codec, &cl3_staged, cl3_quality, false, config.avif_speed)?;

        let (cl1_name, cl3_name) = tier_file_names(output_stem, config);
        Ok((
            Some(TierArtifact {
                file_name: cl1_name,
                data: cl1_data,
            }),
            cl2,
            TierArtifact {
                file_name: cl3_name,
                data: cl3_data,
            },
        ))
    }

    fn encode_lossless_tiers(
        &self,
        img: &DynamicImage,
        source_size: u64,
        output_stem: &Path,
        workspace: &Workspace,
    ) -> Result<(Option<TierArtifact>, Option<TierArtifact>, TierArtifact)> {
        let config = self.config;
        let (cl1_name, cl3_name) = tier_file_names(output_stem, config);

        if img.width() <= config.cl3_size_limit && img.height() <= config.cl3_size_limit {
            // small enough that one lossless baseline covers everything
            let staged = self.stage(img, workspace, "cl3.png")?;
            let data = self.encode_tier(config.cl3_codec, &staged, 100, true, config.avif_speed)?;
            return Ok((
                None,
                None,
                TierArtifact {
                    file_name: cl3_name,
                    data,
                },
            ));
        }

        let cl1_staged = self.stage(img, workspace, "cl1.png")?;
        let cl1_data = self.encode_tier(config.cl1_codec, &cl1_staged, 100, true, config.avif_speed)?;

        let cl3_img = self.bounded(img, config.cl3_size_limit);
        let cl3_staged = self.stage(&cl3_img, workspace, "cl3.png")?;
        let mut cl3_data =
            self.encode_tier(config.cl3_codec, &cl3_staged, 100, true, config.avif_speed)?;

        // squeeze the thumbnail until the pair beats the source
        let mut quality: u8 = 100;
        while (cl1_data.len() + cl3_data.len()) as u64 >= source_size && quality > 50 {
            quality -= 10;
            cl3_data =
                self.encode_tier(config.cl3_codec, &cl3_staged, quality, false, config.avif_speed)?;
        }

        Ok((
            Some(TierArtifact {
                file_name: cl1_name,
                data: cl1_data,
            }),
            None,
            TierArtifact {
                file_name: cl3_name,
                data: cl3_data,
            },
        ))
    }

    fn cl1_bound(&self, img: &DynamicImage) -> u32 {
        if self.config.cl1_codec == ImageCodec::Webp {
            self.config.webp_max_size
        } else {
            img.width().max(img.height())
        }
    }

    /// Downscale to fit a square bound; never upscales.
    fn bounded(&self, img: &DynamicImage, bound: u32) -> DynamicImage {
        if img.width() > bound || img.height() > bound {
            img.resize(bound, bound, FilterType::Lanczos3)
        } else {
            img.clone()
        }
    }

    fn stage(&self, img: &DynamicImage, workspace: &Workspace, name: &str) -> Result<PathBuf> {
        let path = workspace.temp_file(name);
        img.save_with_format(&path, image::ImageFormat::Png)
            .map_err(|e| Error::invalid_source(e.to_string()))?;
        Ok(path)
    }

    fn encode_tier(
        &self,
        codec: ImageCodec,
        staged: &Path,
        quality: u8,
        lossless: bool,
        avif_speed: u8,
    ) -> Result<Vec<u8>> {
        let data = match codec {
            ImageCodec::Avif => {
                let encoder = AvifEncoder {
                    speed: avif_speed,
                    quantizer_deviation: self.config.avif_quantizer_deviation,
                    ..AvifEncoder::default()
                };
                if lossless {
                    encoder.encode_lossless(staged)?
                } else {
                    encoder.encode(staged, quality)?
                }
            }
            ImageCodec::Webp => {
                let encoder = WebpEncoder::default();
                if lossless {
                    encoder.encode_lossless(staged)?
                } else {
                    encoder.encode(staged, quality)?
                }
            }
            ImageCodec::JpegXl => {
                let encoder = JxlEncoder;
                if lossless {
                    encoder.encode_lossless(staged)?
                } else {
                    encoder.encode(staged, quality)?
                }
            }
        };
        Ok(data)
    }
}

fn stem_name(output_stem: &Path) -> String {
    output_stem
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string())
}

fn extension(codec: ImageCodec) -> &'static str {
    match codec {
        ImageCodec::Avif => ".avif",
        ImageCodec::Webp => ".webp",
        ImageCodec::JpegXl => ".jxl",
    }
}

/// CL1 and CL3 artifact names; the baseline gets an explicit `_cl3` suffix
/// when both rungs share an extension.
fn tier_file_names(output_stem: &Path, config: &ImageEncoderConfig) -> (String, String) {
    let stem = stem_name(output_stem);
    let cl1_ext = extension(config.cl1_codec);
    let cl3_ext = extension(config.cl3_codec);
    let cl1 = format!("{}{}", stem, cl1_ext);
    let cl3 = if cl1_ext == cl3_ext {
        format!("{}_cl3{}", stem, cl3_ext)
    } else {
        format!("{}{}", stem, cl3_ext)
    };
    (cl1, cl3)
}
