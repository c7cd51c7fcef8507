//! # clsrs-av
//!
//! External-process boundary for the clsrs transcoding pipeline.
//!
//! This crate provides:
//! - Probing media files with ffprobe (typed stream descriptors)
//! - Subprocess wrappers for the delivery encoders: ffmpeg (x264,
//!   libvpx-vp9, svt-av1, opus, stream copy, DASH mux), avifenc, cwebp,
//!   cjxl, jpegtran, and rsvg-convert
//! - External tool detection and temp workspace management
//!
//! Nothing here implements a codec; every encode and decode is delegated to
//! an external tool, and this crate's job is building the command lines,
//! collecting the output bytes, and mapping failures into typed errors.
//!
//! ## Example
//!
//! ```no_run
//! use clsrs_av::probe;
//!
//! let info = probe("/path/to/video.webm")?;
//! println!("container: {}", info.container);
//! # Ok::<(), clsrs_av::Error>(())
//! ```

mod error;
mod exec;

pub mod encoders;
pub mod ffmpeg;
pub mod probe;
pub mod tools;
pub mod workspace;

// Re-exports
pub use error::{Error, Result};
pub use probe::{AudioStream, MediaInfo, VideoStream};
pub use tools::{check_tool, check_tools, require_tool, ToolInfo};
pub use workspace::Workspace;

/// Probe a media file and return its metadata.
///
/// # Example
///
/// ```no_run
/// use clsrs_av::probe;
///
/// let info = probe("/path/to/video.mp4")?;
/// if let Some(video) = info.primary_video() {
///     println!("codec: {} {}x{}", video.codec_name, video.width, video.height);
/// }
/// # Ok::<(), clsrs_av::Error>(())
/// ```
pub fn probe<P: AsRef<std::path::Path>>(path: P) -> Result<MediaInfo> {
    probe::probe_with_ffprobe(path.as_ref())
}
