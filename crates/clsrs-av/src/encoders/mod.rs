//! Still-image encoder wrappers.
//!
//! Each encoder here shells out to an external tool and returns the encoded
//! bytes. Callers stage the (possibly rescaled) raster to a PNG file first;
//! the encoders never touch the raster themselves.

pub mod avif;
pub mod jpegtran;
pub mod jxl;
pub mod svg;
pub mod webp;

pub use avif::AvifEncoder;
pub use jxl::JxlEncoder;
pub use webp::WebpEncoder;
