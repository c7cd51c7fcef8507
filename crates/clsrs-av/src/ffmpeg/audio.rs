//! Audio transcode strategy.

use crate::exec;
use crate::{Error, Result};
use std::path::Path;
use std::process::Command;

/// Transcode one audio stream to Opus.
///
/// Sources with more than two channels are downmixed to stereo before
/// encoding.
pub fn opus_transcode(
    input: &Path,
    stream_index: u32,
    output: &Path,
    bitrate: u64,
    source_channels: u32,
    overwrite: bool,
) -> Result<()> {
    let mut cmd = Command::new("ffmpeg");
    if overwrite {
        cmd.arg("-y");
    }
    cmd.arg("-i")
        .arg(input)
        .args(["-map", &format!("0:{}", stream_index)]);
    if source_channels > 2 {
        cmd.args(["-ac", "2"]);
    }
    cmd.args(["-c:a", "libopus"])
        .args(["-b:a", &bitrate.to_string()])
        .arg(output);

    exec::run("ffmpeg", &mut cmd)?;

    match std::fs::metadata(output) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(Error::empty_output("ffmpeg")),
    }
}
