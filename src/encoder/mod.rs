//! Writing TIFF files.
//!
//! Files are big-endian. Pages are written in one pass: every directory is placed right before
//! the strips or tiles it describes, so the sink never has to be read back.

use std::io::{Seek, Write};

use crate::error::{CodecResult, UnsupportedError, UsageError};
use crate::raster::RenderedImage;
use crate::tags::CompressionMethod;

mod cache;
pub mod compression;
mod directory;
mod field;
mod image_info;
mod packing;
mod writer;

use self::cache::PixelCache;
use self::compression::Compressor;
use self::image_info::ImageInfo;
use self::packing::TilePacker;
use self::writer::TiffWriter;

pub use self::compression::DeflateLevel;
pub use self::field::{FieldValue, Rational, SRational, TiffField};
pub use self::image_info::ImageType;

/// Offset of the first directory, right after the header.
const FIRST_IFD_OFFSET: u64 = 8;

/// Where compressed data waits while its directory cannot be written yet.
///
/// Only consulted for sinks without `Seek`; seekable sinks get a placeholder that is patched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheStrategy {
    /// An anonymous temporary file, deleted when encoding of the page ends.
    #[default]
    TempFile,
    /// An in-memory buffer as large as the compressed page.
    Memory,
}

/// Encoding parameters.
#[derive(Clone)]
pub struct TiffEncodeParam<'a> {
    pub compression: CompressionMethod,
    pub deflate_level: DeflateLevel,
    pub tiled: bool,
    /// Tile width, `0` selects 256. Ignored for strips.
    pub tile_width: u32,
    /// Tile height or rows per strip, `0` selects 256 for tiles and 8 for strips.
    pub tile_height: u32,
    /// Additional fields for every page. Fields whose tag the encoder sets itself are ignored.
    pub extra_fields: Vec<TiffField>,
    /// Further pages written after the image passed to [`TiffEncoder::encode`].
    pub extra_images: Vec<RenderedImage<'a>>,
    pub cache: CacheStrategy,
}

impl Default for TiffEncodeParam<'_> {
    fn default() -> Self {
        TiffEncodeParam {
            compression: CompressionMethod::None,
            deflate_level: DeflateLevel::default(),
            tiled: false,
            tile_width: 0,
            tile_height: 0,
            extra_fields: Vec::new(),
            extra_images: Vec::new(),
            cache: CacheStrategy::default(),
        }
    }
}

impl<'a> TiffEncodeParam<'a> {
    pub fn with_compression(mut self, compression: CompressionMethod) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_deflate_level(mut self, level: DeflateLevel) -> Self {
        self.deflate_level = level;
        self
    }

    /// Write tiles of the given size instead of strips.
    pub fn with_tiles(mut self, width: u32, height: u32) -> Self {
        self.tiled = true;
        self.tile_width = width;
        self.tile_height = height;
        self
    }

    pub fn with_rows_per_strip(mut self, rows: u32) -> Self {
        self.tiled = false;
        self.tile_height = rows;
        self
    }

    pub fn with_extra_field(mut self, field: TiffField) -> Self {
        self.extra_fields.push(field);
        self
    }

    pub fn with_extra_image(mut self, image: RenderedImage<'a>) -> Self {
        self.extra_images.push(image);
        self
    }

    pub fn with_cache(mut self, cache: CacheStrategy) -> Self {
        self.cache = cache;
        self
    }
}

/// State of an incremental multi-page encode.
///
/// Holds the page that has been handed over but not written yet, because its directory must
/// point at the directory of the page after it.
pub struct Context<'b> {
    pending: RenderedImage<'b>,
    ifd_offset: u64,
}

impl Context<'_> {
    /// Offset the pending page's directory will be written at.
    pub fn ifd_offset(&self) -> u64 {
        self.ifd_offset
    }
}

/// Tiff encoder.
///
/// # Examples
/// ```
/// use image_codecs::encoder::{TiffEncodeParam, TiffEncoder};
/// use image_codecs::{RenderedImage, SampleBuffer, Samples};
///
/// # fn main() -> Result<(), image_codecs::CodecError> {
/// let raster = SampleBuffer::new(2, 2, 1, Samples::U8(vec![0, 128, 255, 64]))?;
///
/// let mut encoder = TiffEncoder::new(Vec::new(), TiffEncodeParam::default());
/// encoder.encode(RenderedImage::bare(&raster))?;
///
/// let tiff = encoder.into_inner();
/// assert_eq!(&tiff[..4], b"MM\0\x2a");
/// # Ok(())
/// # }
/// ```
pub struct TiffEncoder<'a, W: Write> {
    writer: TiffWriter<W>,
    param: TiffEncodeParam<'a>,
}

impl<'a, W: Write + Seek> TiffEncoder<'a, W> {
    /// Encoder for a seekable sink. Compressed pages are written without an intermediate cache.
    ///
    /// Offsets in the file are relative to the current position of `writer`.
    pub fn new_seekable(writer: W, param: TiffEncodeParam<'a>) -> CodecResult<Self> {
        Ok(TiffEncoder {
            writer: TiffWriter::new_seekable(writer)?,
            param,
        })
    }
}

impl<'a, W: Write> TiffEncoder<'a, W> {
    pub fn new(writer: W, param: TiffEncodeParam<'a>) -> Self {
        TiffEncoder {
            writer: TiffWriter::new(writer),
            param,
        }
    }

    pub fn param(&self) -> &TiffEncodeParam<'a> {
        &self.param
    }

    /// Write a complete file holding `image` followed by the extra images of the parameters.
    pub fn encode(&mut self, image: RenderedImage<'_>) -> CodecResult<()> {
        self.write_header()?;

        let extra_images = self.param.extra_images.clone();
        let mut ifd_offset = FIRST_IFD_OFFSET;
        let pages = std::iter::once(image).chain(extra_images.iter().copied());
        let last = extra_images.len();
        for (index, page) in pages.enumerate() {
            ifd_offset = self.encode_page(&page, ifd_offset, index == last)?;
        }

        self.writer.flush()?;
        Ok(())
    }

    /// Hand over the next page of an incremental multi-page file.
    ///
    /// The first call writes the file header and only buffers `image`. Every later call writes
    /// the previously buffered page and buffers `image` in its place. Finish with
    /// [`Self::finish_multiple`].
    pub fn encode_multiple<'b>(
        &mut self,
        context: Option<Context<'b>>,
        image: RenderedImage<'b>,
    ) -> CodecResult<Context<'b>> {
        if !self.param.extra_images.is_empty() {
            return Err(UsageError::ExtraImagesWithIncremental.into());
        }

        let ifd_offset = match context {
            None => {
                self.write_header()?;
                FIRST_IFD_OFFSET
            }
            Some(context) => self.encode_page(&context.pending, context.ifd_offset, false)?,
        };

        Ok(Context {
            pending: image,
            ifd_offset,
        })
    }

    /// Write the last buffered page, terminating the directory chain.
    pub fn finish_multiple(&mut self, context: Context<'_>) -> CodecResult<()> {
        self.encode_page(&context.pending, context.ifd_offset, true)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_header(&mut self) -> CodecResult<()> {
        if self.writer.offset() != 0 {
            return Err(UsageError::StreamAlreadyStarted.into());
        }
        self.writer.write_bytes(b"MM")?;
        self.writer.write_u16(42)?;
        self.writer.write_long(FIRST_IFD_OFFSET)?;
        Ok(())
    }

    /// Write one page whose directory starts at `ifd_offset`, the current position.
    ///
    /// Returns the offset of the next directory, `0` for the last page.
    fn encode_page(
        &mut self,
        image: &RenderedImage<'_>,
        ifd_offset: u64,
        is_last: bool,
    ) -> CodecResult<u64> {
        if self.writer.offset() != ifd_offset {
            return Err(UsageError::ContextMismatch {
                expected: ifd_offset,
                actual: self.writer.offset(),
            }
            .into());
        }

        let info = ImageInfo::new(image, &self.param)?;
        let mut compressor =
            Compressor::from_method(self.param.compression, self.param.deflate_level)?;

        let mut directory = info.directory(compressor.method());
        for field in &self.param.extra_fields {
            if !directory.insert(field.clone()) {
                log::debug!(
                    "extra field {:?} ignored, the tag is already set to {:?}",
                    field.tag(),
                    directory.get(field.tag_u16()).map(TiffField::value)
                );
            }
        }

        let dir_size = directory.size();
        let data_start = ifd_offset + dir_size;
        let mut packer = TilePacker::new(&info);

        let next_ifd_offset = if compressor.method() == CompressionMethod::None {
            let byte_counts = info.uncompressed_byte_counts();
            let padding = alignment_padding(data_start, info.bit_depth);
            let offsets = running_offsets(data_start + padding, &byte_counts);
            let (next_ifd_offset, pad) =
                next_directory(data_start + padding + byte_counts.iter().sum::<u64>(), is_last);
            check_long(next_ifd_offset)?;

            info.set_data_layout(&mut directory, &offsets, &byte_counts)?;
            directory.write(&mut self.writer, ifd_offset, next_ifd_offset)?;
            self.writer.write_zeros(padding)?;
            for index in 0..info.num_tiles {
                let tile = packer.pack(image.raster, &info, index)?;
                self.writer.write_bytes(tile)?;
            }
            self.writer.write_zeros(pad)?;

            next_ifd_offset
        } else {
            let mut cache = PixelCache::begin(&mut self.writer, self.param.cache, dir_size)?;
            log::debug!("caching compressed data in {}", cache.name());

            let mut byte_counts = Vec::with_capacity(info.num_tiles);
            for index in 0..info.num_tiles {
                let tile = packer.pack(image.raster, &info, index)?;
                byte_counts.push(cache.write_tile(
                    &mut self.writer,
                    &mut compressor,
                    tile,
                    info.bytes_per_row,
                )?);
            }

            let offsets = running_offsets(data_start, &byte_counts);
            let (next_ifd_offset, pad) =
                next_directory(data_start + byte_counts.iter().sum::<u64>(), is_last);
            check_long(next_ifd_offset)?;

            info.set_data_layout(&mut directory, &offsets, &byte_counts)?;
            cache.finish(&mut self.writer, &directory, ifd_offset, next_ifd_offset)?;
            self.writer.write_zeros(pad)?;

            next_ifd_offset
        };

        log::debug!(
            "wrote {}x{} {:?} page with {} {} at IFD offset {}",
            info.width,
            info.height,
            info.image_type,
            info.num_tiles,
            if info.tiled { "tiles" } else { "strips" },
            ifd_offset
        );

        Ok(next_ifd_offset)
    }
}

fn check_long(value: u64) -> CodecResult<u64> {
    if value > u64::from(u32::MAX) {
        return Err(UnsupportedError::FileTooLarge(value).into());
    }
    Ok(value)
}

/// Zero bytes needed in front of uncompressed data so that samples are naturally aligned.
fn alignment_padding(offset: u64, bit_depth: u8) -> u64 {
    match bit_depth {
        16 => offset % 2,
        32 => (4 - offset % 4) % 4,
        _ => 0,
    }
}

fn running_offsets(start: u64, byte_counts: &[u64]) -> Vec<u64> {
    byte_counts
        .iter()
        .scan(start, |offset, &count| {
            let current = *offset;
            *offset += count;
            Some(current)
        })
        .collect()
}

/// The next directory offset for a page ending at `end`, and the pad bytes that put it on a
/// word boundary.
fn next_directory(end: u64, is_last: bool) -> (u64, u64) {
    if is_last {
        (0, 0)
    } else {
        let pad = end % 2;
        (end + pad, pad)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment() {
        assert_eq!(alignment_padding(7, 8), 0);
        assert_eq!(alignment_padding(7, 16), 1);
        assert_eq!(alignment_padding(8, 16), 0);
        assert_eq!(alignment_padding(9, 32), 3);
        assert_eq!(alignment_padding(10, 32), 2);
        assert_eq!(alignment_padding(12, 32), 0);
    }

    #[test]
    fn offsets_accumulate() {
        assert_eq!(running_offsets(100, &[10, 5, 7]), [100, 110, 115]);
        assert!(running_offsets(100, &[]).is_empty());
    }

    #[test]
    fn next_directory_is_word_aligned() {
        assert_eq!(next_directory(101, false), (102, 1));
        assert_eq!(next_directory(100, false), (100, 0));
        assert_eq!(next_directory(101, true), (0, 0));
    }

    #[test]
    fn offsets_stay_within_32_bits() {
        assert_eq!(check_long(u64::from(u32::MAX)).unwrap(), u64::from(u32::MAX));
        assert!(matches!(
            check_long(1 << 32),
            Err(crate::CodecError::Unsupported(UnsupportedError::FileTooLarge(
                0x1_0000_0000
            )))
        ));
    }
}
