use std::fmt;
use std::io;

use quick_error::quick_error;

use crate::tags::CompressionMethod;

quick_error! {
    /// Codec error kinds.
    #[derive(Debug)]
    pub enum CodecError {
        /// The input or the encoding parameters are not formatted properly.
        Format(err: FormatError) {
            from()
            display("Format error: {}", err)
        }
        /// The input is valid but uses a feature this crate does not implement.
        Unsupported(err: UnsupportedError) {
            from()
            display("The codec does not support the format `{}`", err)
        }
        /// The API was used in a way that cannot work.
        Usage(err: UsageError) {
            from()
            display("Usage error: {}", err)
        }
        /// An I/O Error occurred while reading or writing.
        Io(err: io::Error) {
            from()
            display("{}", err)
            source(err)
        }
    }
}

/// The image is not formatted properly.
///
/// This indicates that the encoder or reader could not make sense of the image
/// for some reason. Unlike [`UnsupportedError`], retrying with a more capable
/// implementation would not help.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum FormatError {
    /// The bands of a raster do not share one sample size.
    InconsistentSampleSize,
    /// A raster declares a bit depth that cannot be stored in its sample type.
    InvalidBitDepth(u8),
    /// The raster has no pixels.
    EmptyImage,
    /// A bilevel image carries a palette with other than two entries.
    InvalidBilevelPalette(usize),
    /// The stream does not start with the PNG signature.
    PngSignatureMismatch,
    /// A chunk checksum does not match its contents.
    ChunkCrcMismatch {
        chunk: [u8; 4],
        expected: u32,
        found: u32,
    },
    /// A chunk declares a length above 2^31 - 1.
    ChunkTooLong(u32),
    /// A chunk appeared before the IHDR chunk.
    ChunkBeforeHeader([u8; 4]),
    /// A chunk that may only appear once appeared again.
    DuplicateChunk([u8; 4]),
    /// A chunk appeared after the first IDAT chunk although it must precede it.
    ChunkAfterImageData([u8; 4]),
    /// A chunk has a length not allowed for its type.
    InvalidChunkLength { chunk: [u8; 4], length: usize },
    /// The IHDR chunk declares a zero width or height.
    InvalidDimensions(u32, u32),
    /// IHDR names a colour type outside {0, 2, 3, 4, 6}.
    InvalidColorType(u8),
    /// IHDR names a bit depth not allowed for its colour type.
    InvalidColorBitDepth { color_type: u8, bit_depth: u8 },
    /// IHDR names a compression method other than 0.
    InvalidCompressionMethod(u8),
    /// IHDR names a filter method other than 0.
    InvalidFilterMethod(u8),
    /// IHDR names an interlace method other than 0 or 1.
    InvalidInterlaceMethod(u8),
    /// A PLTE chunk accompanies a grayscale image.
    PaletteOnGrayscale,
    /// A palette image lacks its PLTE chunk.
    MissingPalette,
    /// A PLTE chunk with zero or more than 256 entries or a length not divisible by 3.
    InvalidPalette(usize),
    /// tRNS on an image whose colour type already carries an alpha channel.
    TransparencyWithAlpha,
    /// tRNS carries more alpha entries than the palette has colours.
    TooManyTransparencyEntries { entries: usize, palette: usize },
    /// An sRGB rendering intent outside 0..=3.
    InvalidRenderingIntent(u8),
    /// The iCCP payload could not be inflated.
    CorruptIccProfile,
    /// An ICC profile header failed validation.
    InvalidIccProfile(&'static str),
    /// The stream contains no IDAT chunk.
    MissingImageData,
    /// The stream ended before the IEND chunk.
    UnexpectedEof,
}

impl fmt::Display for FormatError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::FormatError::*;
        match *self {
            InconsistentSampleSize => write!(fmt, "all bands must share one sample size"),
            InvalidBitDepth(depth) => {
                write!(fmt, "bit depth {} does not fit the raster sample type", depth)
            }
            EmptyImage => write!(fmt, "image has no pixels"),
            InvalidBilevelPalette(size) => write!(
                fmt,
                "a 1 bit single band image needs a palette of 2 entries, found {}",
                size
            ),
            PngSignatureMismatch => write!(fmt, "PNG signature not found"),
            ChunkCrcMismatch {
                chunk,
                expected,
                found,
            } => write!(
                fmt,
                "CRC mismatch in chunk {}: expected {:#010x}, found {:#010x}",
                ChunkName(chunk),
                expected,
                found
            ),
            ChunkTooLong(len) => write!(fmt, "chunk length {} exceeds 2^31 - 1", len),
            ChunkBeforeHeader(chunk) => {
                write!(fmt, "chunk {} appears before IHDR", ChunkName(chunk))
            }
            DuplicateChunk(chunk) => write!(fmt, "duplicate {} chunk", ChunkName(chunk)),
            ChunkAfterImageData(chunk) => {
                write!(fmt, "chunk {} appears after IDAT", ChunkName(chunk))
            }
            InvalidChunkLength { chunk, length } => write!(
                fmt,
                "chunk {} has invalid length {}",
                ChunkName(chunk),
                length
            ),
            InvalidDimensions(width, height) => {
                write!(fmt, "invalid image dimensions {}x{}", width, height)
            }
            InvalidColorType(ty) => write!(fmt, "invalid colour type {}", ty),
            InvalidColorBitDepth {
                color_type,
                bit_depth,
            } => write!(
                fmt,
                "bit depth {} is not allowed for colour type {}",
                bit_depth, color_type
            ),
            InvalidCompressionMethod(m) => write!(fmt, "illegal compression method {}", m),
            InvalidFilterMethod(m) => write!(fmt, "illegal filter method {}", m),
            InvalidInterlaceMethod(m) => write!(fmt, "illegal interlace method {}", m),
            PaletteOnGrayscale => write!(fmt, "palette is not allowed for grayscale images"),
            MissingPalette => write!(fmt, "palette image without PLTE chunk"),
            InvalidPalette(len) => write!(fmt, "invalid PLTE chunk of {} bytes", len),
            TransparencyWithAlpha => write!(
                fmt,
                "tRNS chunk is not allowed for images with an alpha channel"
            ),
            TooManyTransparencyEntries { entries, palette } => write!(
                fmt,
                "tRNS chunk has {} entries but the palette only {}",
                entries, palette
            ),
            InvalidRenderingIntent(intent) => {
                write!(fmt, "invalid sRGB rendering intent {}", intent)
            }
            CorruptIccProfile => write!(fmt, "iCCP chunk could not be inflated"),
            InvalidIccProfile(reason) => write!(fmt, "invalid ICC profile: {}", reason),
            MissingImageData => write!(fmt, "no IDAT chunk found"),
            UnexpectedEof => write!(fmt, "stream ended before IEND"),
        }
    }
}

/// The image or encoding request uses a feature outside the supported baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UnsupportedError {
    /// Only NONE, PackBits and Deflate are written.
    Compression(CompressionMethod),
    /// A sample type this encoder cannot write, e.g. 64 bit floats.
    SampleType(crate::SampleType),
    /// Bit depths of 1 and 4 are only written for single band images.
    SubByteMultiband { bit_depth: u8, bands: usize },
    /// Indexed colour needs byte samples.
    PaletteSampleType(crate::SampleType),
    /// The band count does not cover the colour space components.
    BandCount { bands: usize, components: usize },
    /// Adam7 interlaced PNG files cannot be passed through raw.
    InterlacedPng,
    /// An unknown chunk marked as critical.
    CriticalChunk([u8; 4]),
    /// A strip or tile larger than a 32-bit byte count can describe.
    TileTooLarge { bytes: u64 },
    /// Offsets or byte counts beyond the 32-bit range of a classic TIFF file.
    FileTooLarge(u64),
}

impl fmt::Display for UnsupportedError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::UnsupportedError::*;
        match *self {
            Compression(method) => write!(fmt, "Compression method {:?}", method),
            SampleType(ty) => write!(fmt, "Sample type {:?}", ty),
            SubByteMultiband { bit_depth, bands } => write!(
                fmt,
                "{} bit samples with {} bands, sub-byte depths need a single band",
                bit_depth, bands
            ),
            PaletteSampleType(ty) => {
                write!(fmt, "Indexed colour with {:?} samples, byte required", ty)
            }
            BandCount { bands, components } => write!(
                fmt,
                "{} bands for a colour space of {} components",
                bands, components
            ),
            InterlacedPng => write!(fmt, "Interlaced PNG"),
            CriticalChunk(chunk) => write!(fmt, "Unknown critical chunk {}", ChunkName(chunk)),
            TileTooLarge { bytes } => write!(
                fmt,
                "Strip or tile of {} bytes, at most {} fit a classic TIFF byte count",
                bytes,
                u32::MAX
            ),
            FileTooLarge(value) => {
                write!(fmt, "Offset or byte count {} beyond the classic TIFF range", value)
            }
        }
    }
}

/// User attempted to use the codec in a way that is incompatible with a specific image.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UsageError {
    /// Extra images were configured while encoding incrementally.
    ExtraImagesWithIncremental,
    /// A sample buffer does not hold `width * height * bands` samples.
    RasterSizeMismatch { expected: usize, actual: usize },
    /// A requested sample region lies outside the raster.
    RegionOutOfBounds,
    /// A file was started on an encoder that has already written one.
    StreamAlreadyStarted,
    /// A multi-page context does not match the encoder's write position.
    ContextMismatch { expected: u64, actual: u64 },
}

impl fmt::Display for UsageError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use self::UsageError::*;
        match *self {
            ExtraImagesWithIncremental => write!(
                fmt,
                "extra images can not be combined with incremental multi-page encoding"
            ),
            RasterSizeMismatch { expected, actual } => write!(
                fmt,
                "sample buffer holds {} samples, {} expected",
                actual, expected
            ),
            RegionOutOfBounds => write!(fmt, "requested region lies outside the raster"),
            StreamAlreadyStarted => write!(fmt, "the encoder has already written a file"),
            ContextMismatch { expected, actual } => write!(
                fmt,
                "multi-page context expects the next directory at {}, but the encoder is at {}",
                expected, actual
            ),
        }
    }
}

/// Displays a chunk type as text when it is printable.
struct ChunkName([u8; 4]);

impl fmt::Display for ChunkName {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if self.0.iter().all(u8::is_ascii_graphic) {
            self.0.iter().try_for_each(|&b| write!(fmt, "{}", b as char))
        } else {
            write!(fmt, "{:02x?}", self.0)
        }
    }
}

/// Result of an image encoding/reading process
pub type CodecResult<T> = Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_chunk_names() {
        let err = CodecError::from(UnsupportedError::CriticalChunk(*b"ABCD"));
        assert_eq!(
            err.to_string(),
            "The codec does not support the format `Unknown critical chunk ABCD`"
        );

        let err = FormatError::DuplicateChunk([0, 1, 2, 3]);
        assert_eq!(err.to_string(), "duplicate [00, 01, 02, 03] chunk");
    }

    #[test]
    fn io_errors_keep_their_source() {
        use std::error::Error;

        let err = CodecError::from(io::Error::new(io::ErrorKind::Other, "disk full"));
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "disk full");
    }
}
