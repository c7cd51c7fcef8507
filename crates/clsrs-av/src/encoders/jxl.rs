//! cjxl wrapper.

use crate::exec;
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;

/// JPEG XL encoder.
#[derive(Debug, Clone, Default)]
pub struct JxlEncoder;

impl JxlEncoder {
    /// Encode a staged raster at the given quality (100 = mathematically
    /// lossless in cjxl).
    pub fn encode(&self, source: &Path, quality: u8) -> Result<Vec<u8>> {
        let output = tempfile::Builder::new()
            .suffix(".jxl")
            .tempfile()
            .map_err(Error::Io)?;

        let mut cmd = Command::new("cjxl");
        cmd.arg(source)
            .arg(output.path())
            .args(["-q", &quality.to_string()]);

        exec::run("cjxl", &mut cmd)?;

        let data = std::fs::read(output.path())?;
        if data.is_empty() {
            return Err(Error::empty_output("cjxl"));
        }
        Ok(data)
    }

    /// Encode losslessly.
    pub fn encode_lossless(&self, source: &Path) -> Result<Vec<u8>> {
        self.encode(source, 100)
    }

    /// Losslessly repack an existing JPEG bitstream into JPEG XL.
    ///
    /// The original JPEG can be reconstructed bit-exactly from the output.
    pub fn recompress_jpeg(&self, source: &Path) -> Result<Vec<u8>> {
        let output = tempfile::Builder::new()
            .suffix(".jxl")
            .tempfile()
            .map_err(Error::Io)?;

        let mut cmd = Command::new("cjxl");
        cmd.arg("--lossless_jpeg=1").arg(source).arg(output.path());

        exec::run("cjxl", &mut cmd)?;

        let data = std::fs::read(output.path())?;
        if data.is_empty() {
            return Err(Error::empty_output("cjxl"));
        }
        Ok(data)
    }
}
