//! Encoding of TIFF images and raw reading of PNG images
//!
//! The TIFF encoder writes big-endian baseline files, optionally tiled and compressed with
//! PackBits or Deflate, either all at once or page by page. The PNG reader validates a PNG
//! stream and derives its colour model without inflating the image data, so that the
//! compressed data can be passed on to another container.
//!
//! # Related Links
//! * <https://web.archive.org/web/20210108073850/https://www.adobe.io/open/standards/TIFF.html> - The TIFF specification
//! * <https://www.w3.org/TR/png/> - The PNG specification

pub mod encoder;
mod error;
pub mod icc;
pub mod png;
pub mod raster;
pub mod tags;

pub use self::error::{CodecError, CodecResult, FormatError, UnsupportedError, UsageError};
pub use self::icc::IccProfile;
pub use self::raster::{
    ColorModel, ColorSpace, ColorSpaceKind, Palette, Raster, RenderedImage, SampleBuffer,
    SampleType, Samples,
};
