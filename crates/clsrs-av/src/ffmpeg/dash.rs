//! Two-rung DASH mux.
//!
//! Builds the single ffmpeg invocation that scales the source into a high
//! tier (svt-av1, 10-bit) and a low tier (x264, 8-bit), segments both, and
//! writes the `.mpd` manifest plus init/media segments next to it. When the
//! two rungs collapse to the same size only the low tier is produced.

use crate::exec;
use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// How the audio side of the DASH output is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashAudio {
    /// No audio stream in the source.
    None,
    /// The source audio is already web-compatible; pass it through.
    Copy,
    /// Transcode to stereo Opus at the given bitrate (kbps).
    Opus { bitrate_kbps: u32 },
}

/// Parameters for one DASH encode.
#[derive(Debug, Clone)]
pub struct DashJob {
    /// Source media file.
    pub input: PathBuf,
    /// Output stem; the manifest is written at `stem.mpd`.
    pub output: PathBuf,
    /// High-tier frame size.
    pub large_size: (u32, u32),
    /// Low-tier frame size.
    pub small_size: (u32, u32),
    /// High-tier CRF (svt-av1).
    pub high_tier_crf: u32,
    /// Low-tier CRF (x264).
    pub low_tier_crf: u32,
    /// GOP and segment length in frames.
    pub gop_frames: u32,
    /// Segment duration in seconds.
    pub seg_duration: u32,
    /// Encoding threads.
    pub threads: u32,
    /// Audio handling.
    pub audio: DashAudio,
}

/// Run the DASH encode, returning the manifest path.
pub fn encode_dash(job: &DashJob) -> Result<PathBuf> {
    let mpd = job.output.with_extension("mpd");
    let name = job
        .output
        .file_name()
        .ok_or_else(|| Error::InvalidInput("DASH output needs a file name".into()))?
        .to_string_lossy()
        .into_owned();

    let mut cmd = Command::new("ffmpeg");
    cmd.arg("-y").arg("-i").arg(&job.input);

    let (lw, lh) = job.large_size;
    let (sw, sh) = job.small_size;

    if job.large_size != job.small_size {
        cmd.args([
            "-filter_complex",
            &format!(
                "[0]scale={lw}x{lh}[v1],[0]scale={sw}x{sh}[v2],[v1]setsar=1[v1],[v2]setsar=1[v2]"
            ),
        ])
        .args(["-map", "[v1]", "-map", "[v2]", "-map", "0:a?"])
        .args(["-pix_fmt:0", "yuv420p10le", "-pix_fmt:1", "yuv420p"])
        .args(["-c:v:0", "libsvtav1", "-preset", "2", "-b:v:0", "0"])
        .args(["-crf:0", &job.high_tier_crf.to_string()])
        .args(["-c:v:1", "libx264", "-preset:v:1", "veryslow"])
        .args(["-crf:1", &job.low_tier_crf.to_string()]);
    } else {
        cmd.args(["-filter_complex", &format!("[0]scale={sw}x{sh},setsar=1[v1]")])
            .args(["-map", "[v1]", "-map", "0:a?"])
            .args(["-pix_fmt", "yuv420p"])
            .args(["-c:v", "libx264", "-preset:v", "veryslow"])
            .args(["-crf", &job.low_tier_crf.to_string()]);
    }

    cmd.args(["-threads", &job.threads.to_string()])
        .args(["-keyint_min", &job.gop_frames.to_string()])
        .args(["-g", &job.gop_frames.to_string()])
        .args(["-sc_threshold", "0"]);

    match job.audio {
        DashAudio::None | DashAudio::Copy => {
            cmd.args(["-c:a", "copy"]);
        }
        DashAudio::Opus { bitrate_kbps } => {
            cmd.args(["-ac", "2", "-c:a", "libopus"])
                .args(["-b:a", &format!("{}k", bitrate_kbps)]);
        }
    }

    cmd.args(["-dash_segment_type", "auto"])
        .args(["-seg_duration", &job.seg_duration.to_string()])
        .args([
            "-media_seg_name",
            &format!("{name}-chunk-$RepresentationID$-$Number%05d$.$ext$"),
        ])
        .args(["-init_seg_name", &format!("{name}-init-$RepresentationID$.$ext$")])
        .args(["-adaptation_sets", "id=0,streams=v id=1,streams=a"])
        .args(["-f", "dash"])
        .arg(&mpd);

    exec::run("ffmpeg", &mut cmd)?;

    require_manifest(&mpd)?;
    Ok(mpd)
}

fn require_manifest(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(Error::empty_output("ffmpeg")),
    }
}
