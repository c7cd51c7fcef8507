//! avifenc wrapper.

use crate::exec;
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;
use tracing::warn;

/// AVIF encoder settings.
///
/// Quality is the pipeline-wide 0..=100 scale; avifenc wants an AV1
/// quantizer, so `cq-level = 100 - quality` with the min/max quantizers
/// spread by `quantizer_deviation` around it.
#[derive(Debug, Clone)]
pub struct AvifEncoder {
    /// Encoding speed passed as `-s` (0 = slowest/best, 10 = fastest).
    pub speed: u8,
    /// Spread of `--min`/`--max` around the target quantizer.
    pub quantizer_deviation: u8,
    /// Output bit depth (`-d`).
    pub bit_depth: u8,
    /// Worker jobs (`-j`); `None` leaves the tool default.
    pub jobs: Option<u32>,
}

impl Default for AvifEncoder {
    fn default() -> Self {
        Self {
            speed: 6,
            quantizer_deviation: 4,
            bit_depth: 10,
            jobs: None,
        }
    }
}

impl AvifEncoder {
    /// Encode a staged raster at the given quality.
    ///
    /// Quality 100 switches to lossless mode. If the encoder exits cleanly
    /// but produces no bytes, one retry is made with the advanced AV1
    /// tuning flags disabled before the failure is surfaced.
    pub fn encode(&self, source: &Path, quality: u8) -> Result<Vec<u8>> {
        if quality >= 100 {
            return self.encode_lossless(source);
        }
        match self.encode_once(source, quality, true) {
            Ok(data) => Ok(data),
            Err(Error::EmptyOutput { .. }) => {
                warn!("avifenc produced empty output, retrying without advanced options");
                self.encode_once(source, quality, false)
            }
            Err(e) => Err(e),
        }
    }

    /// Encode a staged raster losslessly.
    pub fn encode_lossless(&self, source: &Path) -> Result<Vec<u8>> {
        let output = tempfile::Builder::new()
            .suffix(".avif")
            .tempfile()
            .map_err(Error::Io)?;

        let mut cmd = Command::new("avifenc");
        if let Some(jobs) = self.jobs {
            cmd.args(["-j", &jobs.to_string()]);
        }
        cmd.arg("--lossless");
        cmd.arg(source).arg(output.path());

        exec::run("avifenc", &mut cmd)?;
        read_non_empty(output.path())
    }

    fn encode_once(&self, source: &Path, quality: u8, advanced: bool) -> Result<Vec<u8>> {
        let crf = 100 - u32::from(quality);
        let min_q = crf.saturating_sub(u32::from(self.quantizer_deviation)).max(1);
        let max_q = (crf + u32::from(self.quantizer_deviation)).min(63);

        let output = tempfile::Builder::new()
            .suffix(".avif")
            .tempfile()
            .map_err(Error::Io)?;

        let mut cmd = Command::new("avifenc");
        if let Some(jobs) = self.jobs {
            cmd.args(["-j", &jobs.to_string()]);
        }
        cmd.args(["-d", &self.bit_depth.to_string()])
            .args(["-s", &self.speed.to_string()])
            .args(["--min", &min_q.to_string()])
            .args(["--max", &max_q.to_string()])
            .args(["-a", "end-usage=q"])
            .args(["-a", &format!("cq-level={}", crf)]);
        if advanced {
            cmd.args(["-a", "color:aq-mode=1"])
                .args(["-a", "color:enable-chroma-deltaq=1"]);
        }
        cmd.arg(source).arg(output.path());

        exec::run("avifenc", &mut cmd)?;
        read_non_empty(output.path())
    }
}

fn read_non_empty(path: &Path) -> Result<Vec<u8>> {
    let data = std::fs::read(path)?;
    if data.is_empty() {
        return Err(Error::empty_output("avifenc"));
    }
    Ok(data)
}
