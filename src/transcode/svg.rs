//! SVG handling.
//!
//! Vectors are kept as-is for the level-1 artifact (a vector scales to any
//! display) and rasterized once for the maximum-compatibility baseline.

use crate::config::ImageEncoderConfig;
use crate::error::Result;
use crate::manifest::SrsDocument;
use clsrs_av::encoders::{svg::rasterize, WebpEncoder};
use clsrs_av::Workspace;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Quality of the rasterized baseline.
const RASTER_QUALITY: u8 = 90;

/// SRS encoder for SVG sources.
pub struct SvgEncoder<'a> {
    config: &'a ImageEncoderConfig,
}

impl<'a> SvgEncoder<'a> {
    /// Create an encoder over the given configuration.
    pub fn new(config: &'a ImageEncoderConfig) -> Self {
        Self { config }
    }

    /// Keep the vector and write a rasterized baseline, returning the
    /// manifest path.
    pub fn encode(&self, input: &Path, output_stem: &Path) -> Result<PathBuf> {
        let output_dir = output_stem.parent().unwrap_or_else(|| Path::new(""));
        let stem = output_stem
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());

        let svg_name = format!("{}.svg", stem);
        std::fs::copy(input, output_dir.join(&svg_name))?;

        let png = rasterize(input, self.config.svg_raster_box)?;
        debug!("rasterized {:?} to {} bytes of PNG", input, png.len());

        let workspace = Workspace::new(input)?;
        let staged = workspace.temp_file("raster.png");
        std::fs::write(&staged, &png)?;

        let webp = WebpEncoder::default().encode(&staged, RASTER_QUALITY)?;
        let webp_name = format!("{}.webp", stem);
        std::fs::write(output_dir.join(&webp_name), webp)?;

        let mut doc = SrsDocument::new_image();
        doc.set_level(1, svg_name);
        doc.set_level(3, webp_name);
        doc.write(output_stem)
    }
}
