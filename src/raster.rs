//! Pixel containers and colour descriptions consumed by the encoder and produced by the PNG
//! reader.

use crate::error::{CodecResult, UsageError};
use crate::icc::IccProfile;

/// In-memory type of a single sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SampleType {
    /// Unsigned 8 bit, also used for packed 1 and 4 bit data.
    Byte,
    /// Signed 16 bit
    Short,
    /// Unsigned 16 bit
    UShort,
    /// Signed 32 bit
    Int,
    /// 32 bit IEEE floating point
    Float,
    /// 64 bit IEEE floating point
    Double,
}

/// Source of samples for encoding.
///
/// Samples are exchanged as raw bit patterns widened to `u32`: signed values keep their two's
/// complement bits and floats their IEEE representation.
pub trait Raster {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn num_bands(&self) -> usize;

    /// Significant bits of samples in the given band.
    fn sample_size(&self, band: usize) -> u8;

    fn sample_type(&self) -> SampleType;

    /// Append the samples of a region, pixel-interleaved and row by row, to `out`.
    ///
    /// The region must lie inside the raster.
    fn read_samples(&self, x: u32, y: u32, width: u32, height: u32, out: &mut Vec<u32>)
        -> CodecResult<()>;

    /// The whole raster as contiguous pixel-interleaved bytes, one byte per sample.
    ///
    /// Only byte rasters whose memory layout matches TIFF chunky layout return `Some`.
    fn interleaved_bytes(&self) -> Option<&[u8]> {
        None
    }
}

/// Owned sample storage of a [`SampleBuffer`].
#[derive(Clone, Debug, PartialEq)]
pub enum Samples {
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    F32(Vec<f32>),
}

impl Samples {
    fn len(&self) -> usize {
        match self {
            Samples::U8(v) => v.len(),
            Samples::I16(v) => v.len(),
            Samples::U16(v) => v.len(),
            Samples::I32(v) => v.len(),
            Samples::F32(v) => v.len(),
        }
    }

    fn sample_type(&self) -> SampleType {
        match self {
            Samples::U8(_) => SampleType::Byte,
            Samples::I16(_) => SampleType::Short,
            Samples::U16(_) => SampleType::UShort,
            Samples::I32(_) => SampleType::Int,
            Samples::F32(_) => SampleType::Float,
        }
    }

    fn bits(&self, idx: usize) -> u32 {
        match self {
            Samples::U8(v) => u32::from(v[idx]),
            Samples::I16(v) => u32::from(v[idx] as u16),
            Samples::U16(v) => u32::from(v[idx]),
            Samples::I32(v) => v[idx] as u32,
            Samples::F32(v) => v[idx].to_bits(),
        }
    }
}

/// A pixel-interleaved raster held in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBuffer {
    width: u32,
    height: u32,
    bands: usize,
    bit_depth: u8,
    samples: Samples,
}

impl SampleBuffer {
    /// Wrap `width * height * bands` samples.
    ///
    /// The bit depth is the full width of the sample type; see [`Self::with_bit_depth`] for
    /// 1 and 4 bit data.
    pub fn new(width: u32, height: u32, bands: usize, samples: Samples) -> CodecResult<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(bands))
            .ok_or(UsageError::RasterSizeMismatch {
                expected: usize::MAX,
                actual: samples.len(),
            })?;

        if samples.len() != expected {
            return Err(UsageError::RasterSizeMismatch {
                expected,
                actual: samples.len(),
            }
            .into());
        }

        let bit_depth = match samples {
            Samples::U8(_) => 8,
            Samples::I16(_) | Samples::U16(_) => 16,
            Samples::I32(_) | Samples::F32(_) => 32,
        };

        Ok(SampleBuffer {
            width,
            height,
            bands,
            bit_depth,
            samples,
        })
    }

    /// Declare fewer significant bits per sample, e.g. 1 for bilevel data stored one pixel per
    /// byte.
    pub fn with_bit_depth(mut self, bit_depth: u8) -> Self {
        self.bit_depth = bit_depth;
        self
    }

    pub fn samples(&self) -> &Samples {
        &self.samples
    }
}

impl Raster for SampleBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn num_bands(&self) -> usize {
        self.bands
    }

    fn sample_size(&self, _band: usize) -> u8 {
        self.bit_depth
    }

    fn sample_type(&self) -> SampleType {
        self.samples.sample_type()
    }

    fn read_samples(
        &self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        out: &mut Vec<u32>,
    ) -> CodecResult<()> {
        if u64::from(x) + u64::from(width) > u64::from(self.width)
            || u64::from(y) + u64::from(height) > u64::from(self.height)
        {
            return Err(UsageError::RegionOutOfBounds.into());
        }

        let row_len = self.width as usize * self.bands;
        let region_row = width as usize * self.bands;
        out.reserve(region_row * height as usize);
        for row in y as usize..(y + height) as usize {
            let start = row * row_len + x as usize * self.bands;
            out.extend((start..start + region_row).map(|idx| self.samples.bits(idx)));
        }

        Ok(())
    }

    fn interleaved_bytes(&self) -> Option<&[u8]> {
        match &self.samples {
            Samples::U8(bytes) if self.bit_depth == 8 => Some(bytes),
            _ => None,
        }
    }
}

/// Broad family of a colour space, used to pick a photometric interpretation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpaceKind {
    Gray,
    Rgb,
    YCbCr,
    Cmyk,
    Lab,
    Other,
}

/// A colour space.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Srgb,
    LinearRgb,
    Icc(IccProfile),
    YCbCr,
    Cmyk,
    CieLab,
    /// A space of the given number of components without further meaning.
    Generic(usize),
}

impl ColorSpace {
    pub fn kind(&self) -> ColorSpaceKind {
        match self {
            ColorSpace::Gray => ColorSpaceKind::Gray,
            ColorSpace::Srgb | ColorSpace::LinearRgb => ColorSpaceKind::Rgb,
            ColorSpace::YCbCr => ColorSpaceKind::YCbCr,
            ColorSpace::Cmyk => ColorSpaceKind::Cmyk,
            ColorSpace::CieLab => ColorSpaceKind::Lab,
            ColorSpace::Generic(_) => ColorSpaceKind::Other,
            ColorSpace::Icc(profile) => match &profile.color_space_signature() {
                b"GRAY" => ColorSpaceKind::Gray,
                b"RGB " => ColorSpaceKind::Rgb,
                b"YCbr" => ColorSpaceKind::YCbCr,
                b"CMYK" => ColorSpaceKind::Cmyk,
                b"Lab " => ColorSpaceKind::Lab,
                _ => ColorSpaceKind::Other,
            },
        }
    }

    pub fn num_components(&self) -> usize {
        match self {
            ColorSpace::Gray => 1,
            ColorSpace::Srgb
            | ColorSpace::LinearRgb
            | ColorSpace::YCbCr
            | ColorSpace::CieLab => 3,
            ColorSpace::Cmyk => 4,
            ColorSpace::Generic(n) => *n,
            ColorSpace::Icc(profile) => profile.num_components().unwrap_or(3),
        }
    }
}

/// Lookup tables of an indexed colour model.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Palette {
    pub red: Vec<u8>,
    pub green: Vec<u8>,
    pub blue: Vec<u8>,
    /// Per-entry alpha, as long as the colour tables when present.
    pub alpha: Option<Vec<u8>>,
}

impl Palette {
    /// Number of entries.
    pub fn len(&self) -> usize {
        self.red.len()
    }

    pub fn is_empty(&self) -> bool {
        self.red.is_empty()
    }

    /// Colour of an entry.
    pub fn rgb(&self, index: usize) -> (u8, u8, u8) {
        (self.red[index], self.green[index], self.blue[index])
    }
}

/// How sample values map to colours.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorModel {
    /// One sample per colour component, optionally followed by an alpha sample.
    Component {
        space: ColorSpace,
        has_alpha: bool,
        premultiplied: bool,
        transfer_type: SampleType,
    },
    /// A single sample indexing a palette.
    Indexed { bits: u8, palette: Palette },
}

impl ColorModel {
    /// An opaque model in the given colour space.
    pub fn opaque(space: ColorSpace, transfer_type: SampleType) -> Self {
        ColorModel::Component {
            space,
            has_alpha: false,
            premultiplied: false,
            transfer_type,
        }
    }

    /// A model with a trailing, unassociated alpha sample.
    pub fn with_alpha(space: ColorSpace, transfer_type: SampleType) -> Self {
        ColorModel::Component {
            space,
            has_alpha: true,
            premultiplied: false,
            transfer_type,
        }
    }

    /// Number of samples per pixel including alpha.
    pub fn num_components(&self) -> usize {
        match self {
            ColorModel::Component {
                space, has_alpha, ..
            } => space.num_components() + usize::from(*has_alpha),
            ColorModel::Indexed { .. } => 1,
        }
    }

    pub fn has_alpha(&self) -> bool {
        match self {
            ColorModel::Component { has_alpha, .. } => *has_alpha,
            ColorModel::Indexed { palette, .. } => palette.alpha.is_some(),
        }
    }

    pub fn is_alpha_premultiplied(&self) -> bool {
        matches!(
            self,
            ColorModel::Component {
                premultiplied: true,
                ..
            }
        )
    }

    pub fn transfer_type(&self) -> SampleType {
        match self {
            ColorModel::Component { transfer_type, .. } => *transfer_type,
            ColorModel::Indexed { .. } => SampleType::Byte,
        }
    }
}

/// An image handed to the TIFF encoder: samples plus their colour interpretation.
///
/// Without a colour model single band 1 bit data is written as bilevel and anything else as
/// generic black-is-zero samples.
#[derive(Clone, Copy)]
pub struct RenderedImage<'a> {
    pub raster: &'a dyn Raster,
    pub color_model: Option<&'a ColorModel>,
}

impl<'a> RenderedImage<'a> {
    pub fn new(raster: &'a dyn Raster, color_model: &'a ColorModel) -> Self {
        RenderedImage {
            raster,
            color_model: Some(color_model),
        }
    }

    /// An image without colour information.
    pub fn bare(raster: &'a dyn Raster) -> Self {
        RenderedImage {
            raster,
            color_model: None,
        }
    }
}
