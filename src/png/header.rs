use byteorder::{BigEndian, ReadBytesExt};

use super::chunk::ChunkType;
use crate::error::{CodecResult, FormatError, UnsupportedError};

/// Largest width or height a PNG may declare.
const MAX_DIMENSION: u32 = (1 << 31) - 1;

/// Colour type of a PNG image.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PngColorType {
    Gray,
    Rgb,
    Palette,
    GrayAlpha,
    RgbAlpha,
}

impl PngColorType {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PngColorType::Gray),
            2 => Some(PngColorType::Rgb),
            3 => Some(PngColorType::Palette),
            4 => Some(PngColorType::GrayAlpha),
            6 => Some(PngColorType::RgbAlpha),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            PngColorType::Gray => 0,
            PngColorType::Rgb => 2,
            PngColorType::Palette => 3,
            PngColorType::GrayAlpha => 4,
            PngColorType::RgbAlpha => 6,
        }
    }

    /// Samples per pixel.
    pub fn samples(self) -> usize {
        match self {
            PngColorType::Gray | PngColorType::Palette => 1,
            PngColorType::GrayAlpha => 2,
            PngColorType::Rgb => 3,
            PngColorType::RgbAlpha => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, PngColorType::GrayAlpha | PngColorType::RgbAlpha)
    }

    pub fn is_gray(self) -> bool {
        matches!(self, PngColorType::Gray | PngColorType::GrayAlpha)
    }

    fn allows_bit_depth(self, bit_depth: u8) -> bool {
        match self {
            PngColorType::Gray => matches!(bit_depth, 1 | 2 | 4 | 8 | 16),
            PngColorType::Palette => matches!(bit_depth, 1 | 2 | 4 | 8),
            PngColorType::Rgb | PngColorType::GrayAlpha | PngColorType::RgbAlpha => {
                matches!(bit_depth, 8 | 16)
            }
        }
    }
}

/// The contents of an IHDR chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ihdr {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: PngColorType,
}

impl Ihdr {
    /// Parse and validate an IHDR payload. Only non-interlaced baseline images are accepted.
    pub fn parse(mut data: &[u8]) -> CodecResult<Self> {
        if data.len() != 13 {
            return Err(FormatError::InvalidChunkLength {
                chunk: ChunkType::IHDR.0,
                length: data.len(),
            }
            .into());
        }

        let width = data.read_u32::<BigEndian>()?;
        let height = data.read_u32::<BigEndian>()?;
        let bit_depth = data.read_u8()?;
        let color_type = data.read_u8()?;
        let compression = data.read_u8()?;
        let filter = data.read_u8()?;
        let interlace = data.read_u8()?;

        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(FormatError::InvalidDimensions(width, height).into());
        }

        let ty = PngColorType::from_u8(color_type)
            .ok_or(FormatError::InvalidColorType(color_type))?;
        if !ty.allows_bit_depth(bit_depth) {
            return Err(FormatError::InvalidColorBitDepth {
                color_type,
                bit_depth,
            }
            .into());
        }

        if compression != 0 {
            return Err(FormatError::InvalidCompressionMethod(compression).into());
        }
        if filter != 0 {
            return Err(FormatError::InvalidFilterMethod(filter).into());
        }
        match interlace {
            0 => {}
            1 => return Err(UnsupportedError::InterlacedPng.into()),
            other => return Err(FormatError::InvalidInterlaceMethod(other).into()),
        }

        Ok(Ihdr {
            width,
            height,
            bit_depth,
            color_type: ty,
        })
    }
}
