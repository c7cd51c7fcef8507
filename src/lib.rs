//! Clsrs - compatibility-level media transcoding library
//!
//! Converts visual media (PNG, JPEG, GIF, SVG, video containers) into
//! space-efficient delivery renditions organized by compatibility level,
//! and writes the CLSRS manifest mapping each level to its artifact.
//!
//! The interesting parts live in four modules: [`geometry`] (integer
//! aspect-preserving scaling), [`compat`] (level classification),
//! [`schedule`] (tier planning and deduplication), and [`quality`] (the
//! adaptive size-bounded quality search). Everything that touches a codec
//! is delegated to external tools through the `clsrs-av` crate.
//!
//! # Example
//!
//! ```no_run
//! use clsrs::config::PipelineConfig;
//! use clsrs::transcode::Transcoder;
//! use std::path::Path;
//!
//! let config = PipelineConfig::default();
//! let transcoder = Transcoder::new(&config);
//! let outcome = transcoder.transcode_file(
//!     Path::new("in/picture.png"),
//!     Path::new("out/picture"),
//! )?;
//! println!("wrote {:?}", outcome.path());
//! # Ok::<(), clsrs::Error>(())
//! ```

pub mod compat;
pub mod config;
pub mod error;
pub mod geometry;
pub mod manifest;
pub mod metadata;
pub mod noise;
pub mod quality;
pub mod schedule;
pub mod sniff;
pub mod transcode;

pub use error::{Error, Result};

// Re-export the collaborator crates under their pipeline roles.
pub use clsrs_av as av;
pub use clsrs_common as common;
