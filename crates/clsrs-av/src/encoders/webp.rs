//! cwebp wrapper.

use crate::exec;
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;

/// WebP encoder settings.
#[derive(Debug, Clone)]
pub struct WebpEncoder {
    /// Compression effort passed as `-m` (0..=6).
    pub method: u8,
}

impl Default for WebpEncoder {
    fn default() -> Self {
        Self { method: 6 }
    }
}

impl WebpEncoder {
    /// Encode a staged raster at the given quality.
    pub fn encode(&self, source: &Path, quality: u8) -> Result<Vec<u8>> {
        self.run(source, |cmd| {
            cmd.args(["-q", &quality.to_string()]);
        })
    }

    /// Encode a staged raster losslessly.
    pub fn encode_lossless(&self, source: &Path) -> Result<Vec<u8>> {
        self.run(source, |cmd| {
            cmd.args(["-lossless", "-q", "100"]);
        })
    }

    fn run(&self, source: &Path, configure: impl FnOnce(&mut Command)) -> Result<Vec<u8>> {
        let output = tempfile::Builder::new()
            .suffix(".webp")
            .tempfile()
            .map_err(Error::Io)?;

        let mut cmd = Command::new("cwebp");
        cmd.args(["-quiet", "-m", &self.method.to_string()]);
        configure(&mut cmd);
        cmd.arg(source).arg("-o").arg(output.path());

        exec::run("cwebp", &mut cmd)?;

        let data = std::fs::read(output.path())?;
        if data.is_empty() {
            return Err(Error::empty_output("cwebp"));
        }
        Ok(data)
    }
}
