//! Clsrs-Common: shared types for the clsrs transcoding pipeline.
//!
//! This crate provides the vocabulary used across clsrs:
//!
//! - **Codec enums**: video and audio codecs with their fixed compatibility
//!   ordering and ffmpeg name mappings
//! - **Containers**: preferred container per codec, with file extensions
//! - **Media types**: the CLSRS manifest media-type codes
//! - **Pixel formats**: bits-per-channel lookup for classification
//!
//! # Examples
//!
//! ```
//! use clsrs_common::{VideoCodec, MediaType};
//!
//! let codec = VideoCodec::from_codec_name("vp9").unwrap();
//! assert!(codec.compat_rank() > VideoCodec::H264.compat_rank());
//! assert_eq!(u8::from(MediaType::Image), 0);
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
