//! Reading PNG files far enough to pass their compressed image data through untouched.
//!
//! The chunk stream is validated and the colour model derived, but IDAT data is never inflated
//! here. [`RawPng`] keeps it as one zlib stream for consumers that embed it elsewhere.

use std::io::Read;

use byteorder::{BigEndian, ByteOrder};
use flate2::read::ZlibDecoder;

use crate::error::{CodecResult, FormatError, UnsupportedError};
use crate::icc::IccProfile;
use crate::raster::{ColorModel, ColorSpace, Palette, SampleType};

mod chunk;
mod header;

use self::chunk::{Chunk, ChunkReader, ChunkType};

pub use self::chunk::SIGNATURE;
pub use self::header::{Ihdr, PngColorType};

/// Longest iCCP profile name, excluding the terminator.
const MAX_PROFILE_NAME: usize = 79;

/// Transparency declared by a tRNS chunk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transparency {
    /// The gray value, at image bit depth, that is fully transparent.
    Gray(u16),
    /// The colour, at image bit depth, that is fully transparent.
    Rgb { red: u16, green: u16, blue: u16 },
    /// Alpha of every palette entry. Entries tRNS leaves out are opaque.
    Palette(Vec<u8>),
}

/// Rendering intent of an sRGB chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderingIntent {
    Perceptual = 0,
    RelativeColorimetric = 1,
    Saturation = 2,
    AbsoluteColorimetric = 3,
}

impl RenderingIntent {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(RenderingIntent::Perceptual),
            1 => Some(RenderingIntent::RelativeColorimetric),
            2 => Some(RenderingIntent::Saturation),
            3 => Some(RenderingIntent::AbsoluteColorimetric),
            _ => None,
        }
    }
}

/// A parsed PNG file with its image data still compressed.
#[derive(Clone, Debug)]
pub struct RawPng {
    header: Ihdr,
    color_model: ColorModel,
    icc_profile: Option<IccProfile>,
    transparency: Option<Transparency>,
    rendering_intent: Option<RenderingIntent>,
    image_data: Vec<u8>,
}

impl RawPng {
    pub fn width(&self) -> u32 {
        self.header.width
    }

    pub fn height(&self) -> u32 {
        self.header.height
    }

    pub fn bit_depth(&self) -> u8 {
        self.header.bit_depth
    }

    pub fn color_type(&self) -> PngColorType {
        self.header.color_type
    }

    pub fn color_model(&self) -> &ColorModel {
        &self.color_model
    }

    pub fn icc_profile(&self) -> Option<&IccProfile> {
        self.icc_profile.as_ref()
    }

    /// Whether a tRNS chunk declared transparency.
    pub fn is_transparent(&self) -> bool {
        self.transparency.is_some()
    }

    pub fn transparency(&self) -> Option<&Transparency> {
        self.transparency.as_ref()
    }

    pub fn rendering_intent(&self) -> Option<RenderingIntent> {
        self.rendering_intent
    }

    /// The concatenated payload of all IDAT chunks, a zlib stream of filtered scanlines.
    pub fn image_data(&self) -> &[u8] {
        &self.image_data
    }

    pub fn into_image_data(self) -> Vec<u8> {
        self.image_data
    }

    /// Inflates the image data into filtered scanlines.
    pub fn image_data_decoder(&self) -> ZlibDecoder<&[u8]> {
        ZlibDecoder::new(&self.image_data[..])
    }
}

/// Chunk-derived state gathered while scanning a stream.
#[derive(Default)]
struct ChunkState {
    header: Option<Ihdr>,
    palette: Option<Palette>,
    transparency: Option<Transparency>,
    icc_profile: Option<IccProfile>,
    rendering_intent: Option<RenderingIntent>,
    image_data: Vec<u8>,
    seen_image_data: bool,
}

/// Reads a PNG stream into a [`RawPng`].
pub struct PngFileReader<R> {
    chunks: ChunkReader<R>,
    state: ChunkState,
}

impl<R: Read> PngFileReader<R> {
    pub fn new(reader: R) -> Self {
        PngFileReader {
            chunks: ChunkReader::new(reader),
            state: ChunkState::default(),
        }
    }

    /// Scan the stream up to IEND.
    ///
    /// Fails on any structural violation. The one soft failure is an embedded ICC profile with
    /// an invalid header, which is dropped.
    pub fn read_raw(mut self) -> CodecResult<RawPng> {
        self.chunks.read_signature()?;

        loop {
            let chunk = self.chunks.next_chunk()?;
            if chunk.chunk_type == ChunkType::IEND {
                break;
            }
            self.state.handle_chunk(chunk)?;
        }

        self.state.finish()
    }
}

impl ChunkState {
    fn handle_chunk(&mut self, chunk: Chunk) -> CodecResult<()> {
        let Chunk { chunk_type, data } = chunk;

        if chunk_type == ChunkType::IHDR {
            if self.header.is_some() {
                return Err(FormatError::DuplicateChunk(chunk_type.0).into());
            }
            self.header = Some(Ihdr::parse(&data)?);
            return Ok(());
        }

        let header = self
            .header
            .ok_or(FormatError::ChunkBeforeHeader(chunk_type.0))?;

        match chunk_type {
            ChunkType::IDAT => {
                self.seen_image_data = true;
                self.image_data.extend_from_slice(&data);
            }
            ChunkType::PLTE => {
                self.before_image_data(chunk_type)?;
                if self.palette.is_some() {
                    return Err(FormatError::DuplicateChunk(chunk_type.0).into());
                }
                self.palette = Some(read_palette(&header, &data)?);
            }
            ChunkType::TRNS => {
                self.before_image_data(chunk_type)?;
                self.transparency = Some(self.read_transparency(&header, &data)?);
            }
            ChunkType::ICCP => {
                self.before_image_data(chunk_type)?;
                self.icc_profile = read_icc_profile(&data)?;
            }
            ChunkType::SRGB => {
                self.before_image_data(chunk_type)?;
                if data.len() != 1 {
                    return Err(FormatError::InvalidChunkLength {
                        chunk: chunk_type.0,
                        length: data.len(),
                    }
                    .into());
                }
                let intent = RenderingIntent::from_u8(data[0])
                    .ok_or(FormatError::InvalidRenderingIntent(data[0]))?;
                self.rendering_intent = Some(intent);
            }
            other if other.is_critical() => {
                return Err(UnsupportedError::CriticalChunk(other.0).into());
            }
            other => {
                log::debug!("skipping {:?} chunk of {} bytes", other, data.len());
            }
        }

        Ok(())
    }

    fn before_image_data(&self, chunk_type: ChunkType) -> CodecResult<()> {
        if self.seen_image_data {
            return Err(FormatError::ChunkAfterImageData(chunk_type.0).into());
        }
        Ok(())
    }

    fn read_transparency(&self, header: &Ihdr, data: &[u8]) -> CodecResult<Transparency> {
        let invalid_length = || FormatError::InvalidChunkLength {
            chunk: ChunkType::TRNS.0,
            length: data.len(),
        };
        let sample = |idx: usize| BigEndian::read_u16(&data[2 * idx..]);

        match header.color_type {
            PngColorType::GrayAlpha | PngColorType::RgbAlpha => {
                Err(FormatError::TransparencyWithAlpha.into())
            }
            PngColorType::Gray => {
                if data.len() != 2 {
                    return Err(invalid_length().into());
                }
                Ok(Transparency::Gray(sample(0)))
            }
            PngColorType::Rgb => {
                if data.len() != 6 {
                    return Err(invalid_length().into());
                }
                Ok(Transparency::Rgb {
                    red: sample(0),
                    green: sample(1),
                    blue: sample(2),
                })
            }
            PngColorType::Palette => {
                let palette = self.palette.as_ref().ok_or(FormatError::MissingPalette)?;
                if data.len() > palette.len() {
                    return Err(FormatError::TooManyTransparencyEntries {
                        entries: data.len(),
                        palette: palette.len(),
                    }
                    .into());
                }
                let mut alpha = data.to_vec();
                alpha.resize(palette.len(), 0xFF);
                Ok(Transparency::Palette(alpha))
            }
        }
    }

    fn finish(self) -> CodecResult<RawPng> {
        let header = self.header.ok_or(FormatError::ChunkBeforeHeader(ChunkType::IEND.0))?;
        if !self.seen_image_data {
            return Err(FormatError::MissingImageData.into());
        }

        // The image data stays compressed, so samples are described as bytes at every depth.
        let transfer_type = SampleType::Byte;

        let color_model = match header.color_type {
            PngColorType::Gray => ColorModel::opaque(ColorSpace::Gray, transfer_type),
            PngColorType::GrayAlpha => ColorModel::with_alpha(ColorSpace::Gray, transfer_type),
            PngColorType::Rgb => ColorModel::opaque(self.rgb_space(), transfer_type),
            PngColorType::RgbAlpha => ColorModel::with_alpha(self.rgb_space(), transfer_type),
            PngColorType::Palette => {
                let mut palette = self.palette.clone().ok_or(FormatError::MissingPalette)?;
                if let Some(Transparency::Palette(alpha)) = &self.transparency {
                    palette.alpha = Some(alpha.clone());
                }
                ColorModel::Indexed {
                    bits: header.bit_depth,
                    palette,
                }
            }
        };

        Ok(RawPng {
            header,
            color_model,
            icc_profile: self.icc_profile,
            transparency: self.transparency,
            rendering_intent: self.rendering_intent,
            image_data: self.image_data,
        })
    }

    /// Colour space of truecolour images: the embedded profile, else sRGB, else linear RGB.
    fn rgb_space(&self) -> ColorSpace {
        if let Some(profile) = &self.icc_profile {
            if profile.num_components() == Some(3) {
                return ColorSpace::Icc(profile.clone());
            }
            log::warn!(
                "ignoring ICC profile with colour space {:?} for an RGB image",
                String::from_utf8_lossy(&profile.color_space_signature())
            );
        }

        if self.rendering_intent.is_some() {
            ColorSpace::Srgb
        } else {
            ColorSpace::LinearRgb
        }
    }
}

fn read_palette(header: &Ihdr, data: &[u8]) -> CodecResult<Palette> {
    if header.color_type.is_gray() {
        return Err(FormatError::PaletteOnGrayscale.into());
    }

    let entries = data.len() / 3;
    let max_entries = if header.color_type == PngColorType::Palette {
        1 << header.bit_depth
    } else {
        256
    };
    if data.len() % 3 != 0 || entries == 0 || entries > max_entries {
        return Err(FormatError::InvalidPalette(data.len()).into());
    }

    let mut palette = Palette::default();
    for rgb in data.chunks_exact(3) {
        palette.red.push(rgb[0]);
        palette.green.push(rgb[1]);
        palette.blue.push(rgb[2]);
    }
    Ok(palette)
}

/// Inflate an iCCP payload. A profile that inflates but fails validation yields `None`.
fn read_icc_profile(data: &[u8]) -> CodecResult<Option<IccProfile>> {
    let name_len = data
        .iter()
        .take(MAX_PROFILE_NAME + 1)
        .position(|&b| b == 0)
        .ok_or(FormatError::CorruptIccProfile)?;
    // The name terminator is followed by the compression method byte.
    let compressed = data
        .get(name_len + 2..)
        .ok_or(FormatError::CorruptIccProfile)?;

    let mut profile = Vec::new();
    ZlibDecoder::new(compressed)
        .read_to_end(&mut profile)
        .map_err(|_| FormatError::CorruptIccProfile)?;

    match IccProfile::from_bytes(profile) {
        Ok(profile) => Ok(Some(profile)),
        Err(err) => {
            log::warn!("dropping embedded ICC profile: {}", err);
            Ok(None)
        }
    }
}
