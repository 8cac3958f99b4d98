use super::directory::Directory;
use super::field::{FieldValue, Rational, TiffField};
use super::TiffEncodeParam;
use crate::error::{CodecResult, FormatError, UnsupportedError};
use crate::raster::{ColorModel, ColorSpaceKind, Raster, RenderedImage, SampleType};
use crate::tags::{CompressionMethod, ExtraSamples, PhotometricInterpretation, SampleFormat, Tag};

/// Rows per strip unless the parameters say otherwise.
const DEFAULT_ROWS_PER_STRIP: u32 = 8;
/// Tile edge length unless the parameters say otherwise.
const DEFAULT_TILE_SIZE: u32 = 256;

/// How the samples of an image are interpreted, decides the photometric interpretation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageType {
    BilevelWhiteIsZero,
    BilevelBlackIsZero,
    Gray,
    Palette,
    Rgb,
    Cmyk,
    YCbCr,
    CieLab,
    /// Bands without colour semantics, written as black-is-zero with extra samples.
    Generic,
}

impl ImageType {
    pub fn photometric(&self) -> PhotometricInterpretation {
        match self {
            ImageType::BilevelWhiteIsZero => PhotometricInterpretation::WhiteIsZero,
            ImageType::BilevelBlackIsZero | ImageType::Gray | ImageType::Generic => {
                PhotometricInterpretation::BlackIsZero
            }
            ImageType::Palette => PhotometricInterpretation::RGBPalette,
            ImageType::Rgb => PhotometricInterpretation::RGB,
            ImageType::Cmyk => PhotometricInterpretation::CMYK,
            ImageType::YCbCr => PhotometricInterpretation::YCbCr,
            ImageType::CieLab => PhotometricInterpretation::CIELab,
        }
    }
}

/// Everything the encoder derives from a raster and its colour model before writing a page.
#[derive(Clone, Debug)]
pub struct ImageInfo {
    pub image_type: ImageType,
    pub width: u32,
    pub height: u32,
    pub num_bands: usize,
    pub bit_depth: u8,
    pub sample_type: SampleType,
    pub tiled: bool,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles_across: u32,
    pub num_tiles: usize,
    pub bytes_per_row: usize,
    pub bytes_per_tile: usize,
    /// Red, green and blue tables of `2^bit_depth` entries each, for palette images.
    pub colormap: Option<Vec<u16>>,
    /// Meaning of every band beyond the colour components, in band order.
    pub extra_samples: Vec<ExtraSamples>,
}

impl ImageInfo {
    pub fn new(image: &RenderedImage<'_>, param: &TiffEncodeParam<'_>) -> CodecResult<Self> {
        let raster = image.raster;
        let bit_depth = validate_image(raster, image.color_model)?;
        let num_bands = raster.num_bands();
        let (width, height) = (raster.width(), raster.height());

        let image_type = classify(image.color_model, num_bands, bit_depth)?;

        let extra_samples = match (image_type, image.color_model) {
            (ImageType::Generic, _) => vec![ExtraSamples::Unspecified; num_bands - 1],
            (_, Some(model @ ColorModel::Component { space, .. })) => {
                let components = space.num_components();
                if num_bands < components {
                    return Err(UnsupportedError::BandCount {
                        bands: num_bands,
                        components,
                    }
                    .into());
                }
                let mut extra = vec![ExtraSamples::Unspecified; num_bands - components];
                // Alpha is the first band after the colour components.
                if model.has_alpha() {
                    if let Some(first) = extra.first_mut() {
                        *first = if model.is_alpha_premultiplied() {
                            ExtraSamples::AssociatedAlpha
                        } else {
                            ExtraSamples::UnassociatedAlpha
                        };
                    }
                }
                extra
            }
            _ => Vec::new(),
        };

        let colormap = match (image_type, image.color_model) {
            (ImageType::Palette, Some(ColorModel::Indexed { palette, .. })) => {
                let size = 1usize << bit_depth;
                let mut map = vec![0u16; 3 * size];
                for i in 0..palette.len().min(size) {
                    let (r, g, b) = palette.rgb(i);
                    map[i] = u16::from(r) * 257;
                    map[size + i] = u16::from(g) * 257;
                    map[2 * size + i] = u16::from(b) * 257;
                }
                Some(map)
            }
            _ => None,
        };

        let tiled = param.tiled;
        let (tile_width, tile_height) = if tiled {
            (
                non_zero_or(param.tile_width, DEFAULT_TILE_SIZE),
                non_zero_or(param.tile_height, DEFAULT_TILE_SIZE),
            )
        } else {
            (
                width,
                non_zero_or(param.tile_height, DEFAULT_ROWS_PER_STRIP).min(height),
            )
        };

        let tiles_across = width.div_ceil(tile_width);
        let tiles_down = height.div_ceil(tile_height);
        let num_tiles = tiles_across as usize * tiles_down as usize;

        let row_bits = u64::from(tile_width) * u64::from(bit_depth) * num_bands as u64;
        let tile_bytes = row_bits.div_ceil(8) * u64::from(tile_height);
        if tile_bytes > u64::from(u32::MAX) {
            return Err(UnsupportedError::TileTooLarge { bytes: tile_bytes }.into());
        }
        let bytes_per_row = row_bits.div_ceil(8) as usize;
        let bytes_per_tile = tile_bytes as usize;

        Ok(ImageInfo {
            image_type,
            width,
            height,
            num_bands,
            bit_depth,
            sample_type: raster.sample_type(),
            tiled,
            tile_width,
            tile_height,
            tiles_across,
            num_tiles,
            bytes_per_row,
            bytes_per_tile,
            colormap,
            extra_samples,
        })
    }

    /// Pixel origin of a tile and the number of its rows and columns that lie inside the image.
    pub fn tile_region(&self, index: usize) -> (u32, u32, u32, u32) {
        let col = index as u32 % self.tiles_across;
        let row = index as u32 / self.tiles_across;
        let x = col * self.tile_width;
        let y = row * self.tile_height;
        let width = self.tile_width.min(self.width - x);
        let height = self.tile_height.min(self.height - y);
        (x, y, width, height)
    }

    /// Rows stored for a tile: full tiles are padded, strips are cut at the image bottom.
    pub fn stored_rows(&self, index: usize) -> u32 {
        if self.tiled {
            self.tile_height
        } else {
            self.tile_region(index).3
        }
    }

    /// Uncompressed byte count of every tile or strip.
    pub fn uncompressed_byte_counts(&self) -> Vec<u64> {
        (0..self.num_tiles)
            .map(|i| self.stored_rows(i) as u64 * self.bytes_per_row as u64)
            .collect()
    }

    /// Build the directory for this image. Offsets and byte counts are zero placeholders to be
    /// replaced through [`Self::set_data_layout`]; they do not change the directory size.
    pub fn directory(&self, compression: CompressionMethod) -> Directory {
        let mut dir = Directory::new();
        let long = |v: u32| FieldValue::Long(vec![v]);
        let short = |v: u16| FieldValue::Short(vec![v]);

        dir.insert(TiffField::new(Tag::ImageWidth, long(self.width)));
        dir.insert(TiffField::new(Tag::ImageLength, long(self.height)));
        dir.insert(TiffField::new(
            Tag::BitsPerSample,
            FieldValue::Short(vec![u16::from(self.bit_depth); self.num_bands]),
        ));
        dir.insert(TiffField::new(Tag::Compression, short(compression.to_u16())));
        dir.insert(TiffField::new(
            Tag::PhotometricInterpretation,
            short(self.image_type.photometric().to_u16()),
        ));
        dir.insert(TiffField::new(
            Tag::SamplesPerPixel,
            short(self.num_bands as u16),
        ));

        let (offsets_tag, counts_tag) = self.layout_tags();
        let placeholder = FieldValue::Long(vec![0; self.num_tiles]);
        dir.insert(TiffField::new(offsets_tag, placeholder.clone()));
        dir.insert(TiffField::new(counts_tag, placeholder));

        if self.tiled {
            dir.insert(TiffField::new(Tag::TileWidth, long(self.tile_width)));
            dir.insert(TiffField::new(Tag::TileLength, long(self.tile_height)));
        } else {
            dir.insert(TiffField::new(Tag::RowsPerStrip, long(self.tile_height)));
        }

        if let Some(colormap) = &self.colormap {
            dir.insert(TiffField::new(
                Tag::ColorMap,
                FieldValue::Short(colormap.clone()),
            ));
        }

        if !self.extra_samples.is_empty() {
            dir.insert(TiffField::new(
                Tag::ExtraSamples,
                FieldValue::Short(self.extra_samples.iter().map(|s| s.to_u16()).collect()),
            ));
        }

        let sample_format = match self.sample_type {
            SampleType::Byte => None,
            SampleType::UShort => Some(SampleFormat::Uint),
            SampleType::Short | SampleType::Int => Some(SampleFormat::Int),
            SampleType::Float | SampleType::Double => Some(SampleFormat::IEEEFP),
        };
        if let Some(format) = sample_format {
            dir.insert(TiffField::new(
                Tag::SampleFormat,
                FieldValue::Short(vec![format.to_u16(); self.num_bands]),
            ));
        }

        if self.image_type == ImageType::YCbCr {
            // Samples are written at full resolution, without chroma subsampling.
            dir.insert(TiffField::new(
                Tag::YCbCrSubSampling,
                FieldValue::Short(vec![1, 1]),
            ));
            dir.insert(TiffField::new(Tag::YCbCrPositioning, short(1)));
            dir.insert(TiffField::new(
                Tag::ReferenceBlackWhite,
                FieldValue::Rational(
                    [0, 255, 128, 255, 128, 255]
                        .iter()
                        .map(|&n| Rational { n, d: 1 })
                        .collect(),
                ),
            ));
        }

        dir
    }

    /// Fill in the final data offsets and byte counts.
    pub fn set_data_layout(
        &self,
        dir: &mut Directory,
        offsets: &[u64],
        byte_counts: &[u64],
    ) -> CodecResult<()> {
        let (offsets_tag, counts_tag) = self.layout_tags();
        dir.set(TiffField::new(offsets_tag, longs(offsets)?));
        dir.set(TiffField::new(counts_tag, longs(byte_counts)?));
        Ok(())
    }

    fn layout_tags(&self) -> (Tag, Tag) {
        if self.tiled {
            (Tag::TileOffsets, Tag::TileByteCounts)
        } else {
            (Tag::StripOffsets, Tag::StripByteCounts)
        }
    }
}

fn longs(values: &[u64]) -> CodecResult<FieldValue> {
    let longs = values
        .iter()
        .map(|&v| u32::try_from(v).map_err(|_| UnsupportedError::FileTooLarge(v)))
        .collect::<Result<_, _>>()?;
    Ok(FieldValue::Long(longs))
}

fn non_zero_or(value: u32, default: u32) -> u32 {
    if value == 0 {
        default
    } else {
        value
    }
}

/// Check that the raster can be written and return its common bit depth.
fn validate_image(raster: &dyn Raster, color_model: Option<&ColorModel>) -> CodecResult<u8> {
    if raster.width() == 0 || raster.height() == 0 || raster.num_bands() == 0 {
        return Err(FormatError::EmptyImage.into());
    }

    let bands = raster.num_bands();
    let bit_depth = raster.sample_size(0);
    if (1..bands).any(|band| raster.sample_size(band) != bit_depth) {
        return Err(FormatError::InconsistentSampleSize.into());
    }

    if matches!(bit_depth, 1 | 4) && bands != 1 {
        return Err(UnsupportedError::SubByteMultiband { bit_depth, bands }.into());
    }

    let sample_type = raster.sample_type();
    let legal = match sample_type {
        SampleType::Byte => matches!(bit_depth, 1 | 4 | 8),
        SampleType::Short | SampleType::UShort => bit_depth == 16,
        SampleType::Int | SampleType::Float => bit_depth == 32,
        SampleType::Double => return Err(UnsupportedError::SampleType(sample_type).into()),
    };
    if !legal {
        return Err(FormatError::InvalidBitDepth(bit_depth).into());
    }

    if let Some(ColorModel::Indexed { .. }) = color_model {
        if sample_type != SampleType::Byte {
            return Err(UnsupportedError::PaletteSampleType(sample_type).into());
        }
    }

    Ok(bit_depth)
}

fn classify(
    color_model: Option<&ColorModel>,
    bands: usize,
    bit_depth: u8,
) -> CodecResult<ImageType> {
    let image_type = match color_model {
        None if bit_depth == 1 && bands == 1 => ImageType::BilevelBlackIsZero,
        None => ImageType::Generic,
        Some(ColorModel::Indexed { palette, .. }) => {
            if bands != 1 {
                return Err(UnsupportedError::BandCount {
                    bands,
                    components: 1,
                }
                .into());
            }

            if bit_depth == 1 {
                if palette.len() != 2 {
                    return Err(FormatError::InvalidBilevelPalette(palette.len()).into());
                }
                match (palette.rgb(0), palette.rgb(1)) {
                    ((0, 0, 0), (255, 255, 255)) => ImageType::BilevelBlackIsZero,
                    ((255, 255, 255), (0, 0, 0)) => ImageType::BilevelWhiteIsZero,
                    _ => ImageType::Palette,
                }
            } else {
                ImageType::Palette
            }
        }
        Some(ColorModel::Component { space, .. }) => match space.kind() {
            ColorSpaceKind::Gray => ImageType::Gray,
            ColorSpaceKind::Rgb => ImageType::Rgb,
            ColorSpaceKind::YCbCr => ImageType::YCbCr,
            ColorSpaceKind::Cmyk => ImageType::Cmyk,
            ColorSpaceKind::Lab => ImageType::CieLab,
            ColorSpaceKind::Other => ImageType::Generic,
        },
    };

    Ok(image_type)
}
