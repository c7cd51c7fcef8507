//! rsvg-convert wrapper for SVG rasterization.

use crate::exec;
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;

/// Rasterize an SVG to PNG bytes, fit inside a square bounding box.
pub fn rasterize(source: &Path, box_size: u32) -> Result<Vec<u8>> {
    let mut cmd = Command::new("rsvg-convert");
    cmd.args(["--width", &box_size.to_string()])
        .args(["--height", &box_size.to_string()])
        .arg("--keep-aspect-ratio")
        .args(["--format", "png"])
        .arg(source);

    let output = exec::run("rsvg-convert", &mut cmd)?;
    if output.stdout.is_empty() {
        return Err(Error::empty_output("rsvg-convert"));
    }
    Ok(output.stdout)
}
