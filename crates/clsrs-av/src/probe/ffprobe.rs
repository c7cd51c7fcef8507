//! FFprobe-based media probing.

use super::{AudioStream, MediaInfo, VideoStream};
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::process::Command;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    pix_fmt: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<String>,
}

/// Probe a media file using ffprobe.
pub fn probe_with_ffprobe(path: &Path) -> Result<MediaInfo> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffprobe")
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("ffprobe", stderr.to_string()));
    }

    let json_str = String::from_utf8(output.stdout)
        .map_err(|e| Error::parse_error("ffprobe", format!("Invalid UTF-8: {}", e)))?;

    let ff_output: FfprobeOutput = serde_json::from_str(&json_str)?;

    parse_ffprobe_output(path, ff_output)
}

fn parse_ffprobe_output(path: &Path, output: FfprobeOutput) -> Result<MediaInfo> {
    let mut info = MediaInfo {
        file_path: path.to_path_buf(),
        file_size: output.format.size.and_then(|s| s.parse().ok()).unwrap_or(0),
        container: output.format.format_name,
        duration: output.format.duration.and_then(|s| s.parse().ok()),
        bit_rate: output.format.bit_rate.and_then(|s| s.parse().ok()),
        video_streams: Vec::new(),
        audio_streams: Vec::new(),
    };

    for stream in output.streams {
        match stream.codec_type.as_str() {
            "video" => {
                info.video_streams.push(VideoStream {
                    index: stream.index,
                    codec_name: stream.codec_name.unwrap_or_default(),
                    width: stream.width.unwrap_or(0),
                    height: stream.height.unwrap_or(0),
                    pix_fmt: stream.pix_fmt,
                    fps: effective_frame_rate(
                        stream.avg_frame_rate.as_deref(),
                        stream.r_frame_rate.as_deref(),
                    ),
                });
            }
            "audio" => {
                info.audio_streams.push(AudioStream {
                    index: stream.index,
                    codec_name: stream.codec_name.unwrap_or_default(),
                    channels: stream.channels.unwrap_or(2),
                    sample_rate: stream.sample_rate.and_then(|s| s.parse().ok()),
                });
            }
            _ => {}
        }
    }

    Ok(info)
}

#[derive(Debug, Deserialize)]
struct FfprobeFrames {
    frames: Vec<FfprobeFrame>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFrame {
    duration_time: Option<String>,
}

/// Walk frame durations to estimate the duration and detect variable frame
/// rate sources (any frame whose duration differs from the first).
pub fn probe_frame_durations(path: &Path) -> Result<(f64, bool)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-show_entries",
            "frame=duration_time",
            "-print_format",
            "json",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::tool_not_found("ffprobe")
            } else {
                Error::Io(e)
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool_failed("ffprobe", stderr.to_string()));
    }

    let parsed: FfprobeFrames = serde_json::from_slice(&output.stdout)?;

    let mut first_value: Option<&str> = None;
    let mut duration_sum = 0.0;
    let mut vfr = false;
    for frame in &parsed.frames {
        let Some(raw) = frame.duration_time.as_deref() else {
            continue;
        };
        match first_value {
            None => first_value = Some(raw),
            Some(first) if first != raw => vfr = true,
            _ => {}
        }
        duration_sum += raw.parse::<f64>().unwrap_or(0.0);
    }
    Ok((duration_sum, vfr))
}

/// Playback frame rate: the average frame rate unless the demuxer reports
/// it as 0/0, in which case the raw frame rate applies.
fn effective_frame_rate(avg: Option<&str>, raw: Option<&str>) -> Option<f64> {
    match avg {
        Some("0/0") | None => raw.and_then(parse_frame_rate),
        Some(rate) => parse_frame_rate(rate),
    }
}

fn parse_frame_rate(rate_str: &str) -> Option<f64> {
    let parts: Vec<&str> = rate_str.split('/').collect();
    if parts.len() == 2 {
        let num: f64 = parts[0].parse().ok()?;
        let den: f64 = parts[1].parse().ok()?;
        if den != 0.0 {
            return Some(num / den);
        }
        return None;
    }
    rate_str.parse().ok()
}
