//! Video transcode strategies.
//!
//! Each delivery codec maps to one ffmpeg invocation shape. x264 and
//! svt-av1 run single-pass CRF unless a bitrate is set (then two-pass via a
//! passlogfile); libvpx-vp9 always runs two-pass with `-b:v 0` so the CRF
//! acts as a quality target.

use crate::exec;
use crate::{Error, Result};
use clsrs_common::{VideoCodec, VideoContainer};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Parameters for one video stream encode.
#[derive(Debug, Clone)]
pub struct VideoEncodeJob {
    /// Source media file.
    pub input: PathBuf,
    /// Output artifact path (extension decides nothing; the container is
    /// passed explicitly for the first-pass null output).
    pub output: PathBuf,
    /// Global demuxer index of the source video stream.
    pub stream_index: u32,
    /// Target frame size, `None` to keep the source size.
    pub size: Option<(u32, u32)>,
    /// Target frame rate, `None` to keep the source rate.
    pub fps: Option<f64>,
    /// CRF rate control.
    pub crf: Option<u32>,
    /// Bitrate rate control in bits per second.
    pub bitrate: Option<u64>,
    /// Effective output frame rate, used for GOP sizing.
    pub output_fps: f64,
    /// GOP length in seconds.
    pub gop_seconds: f64,
    /// Container of the output artifact.
    pub container: VideoContainer,
    /// Overwrite an existing output file.
    pub overwrite: bool,
}

impl VideoEncodeJob {
    fn vfilters(&self) -> Option<String> {
        let mut filters = String::new();
        if let Some((w, h)) = self.size {
            filters.push_str(&format!("scale={}:{}", w, h));
        }
        if let Some(fps) = self.fps {
            if !filters.is_empty() {
                filters.push(',');
            }
            filters.push_str(&format!("fps={}", fps));
        }
        if filters.is_empty() {
            None
        } else {
            Some(filters)
        }
    }

    fn gop_frames(&self) -> u32 {
        (self.output_fps * self.gop_seconds).round() as u32
    }
}

/// Demux one stream into its own file without re-encoding.
pub fn stream_copy(
    input: &Path,
    stream_index: u32,
    output: &Path,
    overwrite: bool,
) -> Result<()> {
    let mut cmd = Command::new("ffmpeg");
    if overwrite {
        cmd.arg("-y");
    }
    cmd.arg("-i")
        .arg(input)
        .args(["-map", &format!("0:{}", stream_index)])
        .args(["-c", "copy"])
        .arg(output);

    exec::run("ffmpeg", &mut cmd)?;
    require_output(output)
}

/// Transcode one video stream according to the job, using the strategy for
/// the given delivery codec.
pub fn transcode_video(job: &VideoEncodeJob, codec: VideoCodec) -> Result<()> {
    let codec_args: &[&str] = match codec {
        VideoCodec::H264 => &["-c:v", "libx264", "-preset", "veryslow"],
        VideoCodec::Vp8 | VideoCodec::Vp9 => &["-c:v", "libvpx-vp9", "-row-mt", "1"],
        VideoCodec::Av1 => &["-c:v", "libsvtav1", "-preset", "2"],
    };

    // vp9 wants two-pass even in CRF mode; the others only when
    // bitrate-driven
    let zero_bitrate = matches!(codec, VideoCodec::Vp8 | VideoCodec::Vp9);
    let two_pass = job.bitrate.is_some() || zero_bitrate;

    if two_pass {
        let pass_log = passlog_prefix()?;
        for pass in 1..=2 {
            let mut cmd =
                build_command(job, codec_args, Some((pass, pass_log.as_path())), zero_bitrate);
            exec::run("ffmpeg", &mut cmd)?;
        }
    } else {
        let mut cmd = build_command(job, codec_args, None, zero_bitrate);
        exec::run("ffmpeg", &mut cmd)?;
    }

    require_output(&job.output)
}

fn build_command(
    job: &VideoEncodeJob,
    codec_args: &[&str],
    encoding_pass: Option<(u32, &Path)>,
    zero_bitrate: bool,
) -> Command {
    let first_pass = matches!(encoding_pass, Some((1, _)));

    let mut cmd = Command::new("ffmpeg");
    if job.overwrite || first_pass {
        cmd.arg("-y");
    }
    cmd.arg("-i").arg(&job.input);
    cmd.args(["-map", &format!("0:{}", job.stream_index)]);
    if let Some(filters) = job.vfilters() {
        cmd.args(["-vf", &filters]);
    }
    cmd.args(codec_args);
    if let Some(crf) = job.crf {
        cmd.args(["-crf", &crf.to_string()]);
    }
    if let Some(bitrate) = job.bitrate {
        cmd.args(["-b:v", &bitrate.to_string()]);
    } else if zero_bitrate {
        cmd.args(["-b:v", "0"]);
    }
    if let Some((pass, log)) = encoding_pass {
        cmd.args(["-pass", &pass.to_string()]);
        cmd.arg("-passlogfile").arg(log);
    }
    cmd.args(["-g", &job.gop_frames().to_string()]);
    if first_pass {
        // the first pass only writes statistics
        cmd.args(["-f", job.container.ffmpeg_format()]);
        cmd.arg(null_sink());
    } else {
        cmd.arg(&job.output);
    }

    debug!("built ffmpeg video command: {:?}", cmd);
    cmd
}

/// Parameters for an animation-loop encode (GIF/APNG sources to MP4).
#[derive(Debug, Clone)]
pub struct LoopEncodeJob {
    /// Source animation.
    pub input: PathBuf,
    /// Output MP4 path.
    pub output: PathBuf,
    /// Target frame size.
    pub size: (u32, u32),
    /// Pin variable-frame-rate sources to this rate.
    pub pin_fps: Option<u32>,
    /// x264 CRF.
    pub crf: u32,
    /// GOP length in frames.
    pub gop_frames: u32,
    /// Composite transparent frames over a white background.
    pub flatten_alpha: bool,
    /// Overwrite an existing output file.
    pub overwrite: bool,
}

/// Encode an animation source as an x264 MP4 loop.
pub fn transcode_loop(job: &LoopEncodeJob) -> Result<()> {
    let (w, h) = job.size;
    let mut filters = format!("[0:v:0]scale={}:{}[v]", w, h);
    if let Some(fps) = job.pin_fps {
        filters.push_str(&format!(",[v]fps={}[v]", fps));
    }
    if job.flatten_alpha {
        filters.push_str(&format!(
            ",color=c=white:s={}x{}[bg],[bg][v]overlay=shortest=1:format=yuv420[v]",
            w, h
        ));
    }

    let mut cmd = Command::new("ffmpeg");
    if job.overwrite {
        cmd.arg("-y");
    }
    cmd.arg("-i")
        .arg(&job.input)
        .args(["-movflags", "+faststart"])
        .args(["-filter_complex", &filters])
        .args(["-map", "[v]"])
        .args(["-pix_fmt", "yuv420p"])
        .args(["-c:v", "libx264"])
        .args(["-crf", &job.crf.to_string()])
        .args(["-preset", "slow"])
        .args(["-g", &job.gop_frames.to_string()])
        .args(["-keyint_min", &job.gop_frames.to_string()])
        .args(["-sc_threshold", "0"])
        .arg(&job.output);

    exec::run("ffmpeg", &mut cmd)?;
    require_output(&job.output)
}

/// A fresh passlogfile prefix in the temp directory.
fn passlog_prefix() -> Result<PathBuf> {
    let file = tempfile::Builder::new()
        .prefix("clsrs-pass")
        .tempfile()
        .map_err(Error::Io)?;
    Ok(file.path().to_path_buf())
}

fn null_sink() -> &'static str {
    if cfg!(windows) {
        "NUL"
    } else {
        "/dev/null"
    }
}

fn require_output(path: &Path) -> Result<()> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(Error::empty_output("ffmpeg")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> VideoEncodeJob {
        VideoEncodeJob {
            input: PathBuf::from("in.mkv"),
            output: PathBuf::from("out_cl1.mp4"),
            stream_index: 0,
            size: Some((1920, 1080)),
            fps: Some(60.0),
            crf: Some(24),
            bitrate: None,
            output_fps: 60.0,
            gop_seconds: 2.0,
            container: VideoContainer::Mpeg4,
            overwrite: true,
        }
    }

    #[test]
    fn test_vfilters() {
        let j = job();
        assert_eq!(j.vfilters().unwrap(), "scale=1920:1080,fps=60");

        let mut unscaled = job();
        unscaled.size = None;
        unscaled.fps = None;
        assert!(unscaled.vfilters().is_none());
    }

    #[test]
    fn test_gop_frames() {
        assert_eq!(job().gop_frames(), 120);

        let mut ntsc = job();
        ntsc.output_fps = 23.976;
        assert_eq!(ntsc.gop_frames(), 48);
    }

    #[test]
    fn test_first_pass_writes_null_sink() {
        let log = PathBuf::from("/tmp/log");
        let cmd = build_command(&job(), &["-c:v", "libx264"], Some((1, log.as_path())), false);
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"-pass".to_string()));
        assert!(args.contains(&null_sink().to_string()));
        assert!(args.contains(&"mp4".to_string()));
        assert!(!args.contains(&"out_cl1.mp4".to_string()));
    }

    #[test]
    fn test_second_pass_writes_output() {
        let log = PathBuf::from("/tmp/log");
        let cmd = build_command(&job(), &["-c:v", "libx264"], Some((2, log.as_path())), false);
        let args: Vec<String> = cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert!(args.contains(&"out_cl1.mp4".to_string()));
    }
}
