extern crate image_codecs;

use image_codecs::png::{PngColorType, PngFileReader, RawPng, Transparency, SIGNATURE};
use image_codecs::{
    CodecError, CodecResult, ColorModel, ColorSpace, FormatError, SampleType, UnsupportedError,
};

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom, Write};

/// Assembles PNG streams chunk by chunk.
struct PngBuilder {
    bytes: Vec<u8>,
}

impl PngBuilder {
    fn new() -> Self {
        PngBuilder {
            bytes: SIGNATURE.to_vec(),
        }
    }

    fn chunk(mut self, chunk_type: &[u8; 4], data: &[u8]) -> Self {
        self.bytes
            .extend_from_slice(&(data.len() as u32).to_be_bytes());
        self.bytes.extend_from_slice(chunk_type);
        self.bytes.extend_from_slice(data);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(chunk_type);
        hasher.update(data);
        self.bytes
            .extend_from_slice(&hasher.finalize().to_be_bytes());
        self
    }

    fn ihdr(self, width: u32, height: u32, bit_depth: u8, color_type: u8) -> Self {
        let mut data = width.to_be_bytes().to_vec();
        data.extend_from_slice(&height.to_be_bytes());
        data.extend_from_slice(&[bit_depth, color_type, 0, 0, 0]);
        self.chunk(b"IHDR", &data)
    }

    fn idat(self, scanlines: &[u8]) -> Self {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(scanlines).unwrap();
        let data = encoder.finish().unwrap();
        self.chunk(b"IDAT", &data)
    }

    fn iend(self) -> Vec<u8> {
        self.chunk(b"IEND", &[]).bytes
    }
}

fn read(bytes: &[u8]) -> CodecResult<RawPng> {
    PngFileReader::new(bytes).read_raw()
}

#[test]
fn minimal_gray_image() {
    let bytes = PngBuilder::new().ihdr(1, 1, 8, 0).idat(&[0, 0x7F]).iend();
    let raw = read(&bytes).unwrap();

    assert_eq!(raw.color_type(), PngColorType::Gray);
    assert_eq!(raw.bit_depth(), 8);
    assert_eq!(
        raw.color_model(),
        &ColorModel::opaque(ColorSpace::Gray, SampleType::Byte)
    );
    assert_eq!(raw.color_model().num_components(), 1);
    assert!(raw.icc_profile().is_none());
    assert!(!raw.is_transparent());
    assert!(raw.rendering_intent().is_none());

    let mut scanlines = Vec::new();
    raw.image_data_decoder()
        .read_to_end(&mut scanlines)
        .unwrap();
    assert_eq!(scanlines, [0, 0x7F]);
}

#[test]
fn reads_from_a_file() {
    let bytes = PngBuilder::new()
        .ihdr(2, 1, 16, 0)
        .chunk(b"tRNS", &[0x12, 0x34])
        .idat(&[0, 0, 1, 0, 2])
        .iend();
    let mut file: File = tempfile::tempfile().unwrap();
    file.write_all(&bytes).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();

    let raw = PngFileReader::new(file).read_raw().unwrap();
    assert_eq!((raw.width(), raw.height()), (2, 1));
    assert_eq!(raw.transparency(), Some(&Transparency::Gray(0x1234)));
    assert_eq!(raw.color_model().transfer_type(), SampleType::Byte);
}

#[test]
fn signature_is_checked_first() {
    let mut bytes = PngBuilder::new().ihdr(1, 1, 8, 0).idat(&[0, 0]).iend();
    bytes[1] = b'p';
    assert!(matches!(
        read(&bytes),
        Err(CodecError::Format(FormatError::PngSignatureMismatch))
    ));
    assert!(matches!(
        read(b"\x89PNG"),
        Err(CodecError::Format(FormatError::PngSignatureMismatch))
    ));
}

#[test]
fn transparency_against_colour_type() {
    for color_type in [4, 6] {
        let bytes = PngBuilder::new()
            .ihdr(1, 1, 8, color_type)
            .chunk(b"tRNS", &[0, 0])
            .idat(&[0; 5])
            .iend();
        assert!(matches!(
            read(&bytes),
            Err(CodecError::Format(FormatError::TransparencyWithAlpha))
        ));
    }

    let bytes = PngBuilder::new()
        .ihdr(1, 1, 8, 3)
        .chunk(b"PLTE", &[0, 0, 0, 255, 255, 255])
        .chunk(b"tRNS", &[0, 0, 0])
        .idat(&[0, 0])
        .iend();
    assert!(matches!(
        read(&bytes),
        Err(CodecError::Format(FormatError::TooManyTransparencyEntries {
            entries: 3,
            palette: 2
        }))
    ));

    let bytes = PngBuilder::new()
        .ihdr(1, 1, 8, 3)
        .chunk(b"PLTE", &[0, 0, 0, 255, 255, 255])
        .chunk(b"tRNS", &[0x80])
        .idat(&[0, 0])
        .iend();
    let raw = read(&bytes).unwrap();
    assert!(raw.is_transparent());
    match raw.color_model() {
        ColorModel::Indexed { bits, palette } => {
            assert_eq!(*bits, 8);
            assert_eq!(palette.len(), 2);
            assert_eq!(palette.alpha, Some(vec![0x80, 0xFF]));
        }
        other => panic!("expected an indexed model, got {:?}", other),
    }
}

#[test]
fn unknown_critical_chunks_abort() {
    let critical = PngBuilder::new()
        .ihdr(1, 1, 8, 2)
        .chunk(b"QUAK", &[1])
        .idat(&[0, 1, 2, 3])
        .iend();
    assert!(matches!(
        read(&critical),
        Err(CodecError::Unsupported(UnsupportedError::CriticalChunk(chunk))) if &chunk == b"QUAK"
    ));

    let ancillary = PngBuilder::new()
        .ihdr(1, 1, 8, 2)
        .chunk(b"qUAK", &[1])
        .idat(&[0, 1, 2, 3])
        .iend();
    let raw = read(&ancillary).unwrap();
    assert_eq!(
        raw.color_model(),
        &ColorModel::opaque(ColorSpace::LinearRgb, SampleType::Byte)
    );
}

#[test]
fn interlaced_images_are_unsupported() {
    let mut data = 1u32.to_be_bytes().to_vec();
    data.extend_from_slice(&1u32.to_be_bytes());
    data.extend_from_slice(&[8, 0, 0, 0, 1]);
    let bytes = PngBuilder::new()
        .chunk(b"IHDR", &data)
        .idat(&[0, 0])
        .iend();
    assert!(matches!(
        read(&bytes),
        Err(CodecError::Unsupported(UnsupportedError::InterlacedPng))
    ));
}

#[test]
fn corrupted_chunks_are_rejected() {
    let mut bytes = PngBuilder::new().ihdr(1, 1, 8, 0).idat(&[0, 0]).iend();
    // flip a bit inside the IHDR payload
    bytes[8 + 8 + 3] ^= 0x10;
    assert!(matches!(
        read(&bytes),
        Err(CodecError::Format(FormatError::ChunkCrcMismatch { .. }))
    ));
}

#[test]
fn srgb_selects_the_colour_space() {
    let bytes = PngBuilder::new()
        .ihdr(1, 1, 16, 2)
        .chunk(b"sRGB", &[2])
        .idat(&[0; 7])
        .iend();
    let raw = read(&bytes).unwrap();
    assert_eq!(
        raw.color_model(),
        &ColorModel::opaque(ColorSpace::Srgb, SampleType::Byte)
    );
}

#[test]
fn wide_samples_are_described_as_bytes() {
    let gray = PngBuilder::new().ihdr(1, 1, 16, 0).idat(&[]).iend();
    let raw = read(&gray).unwrap();
    assert_eq!(raw.bit_depth(), 16);
    assert_eq!(
        raw.color_model(),
        &ColorModel::opaque(ColorSpace::Gray, SampleType::Byte)
    );

    let gray_alpha = PngBuilder::new().ihdr(1, 1, 16, 4).idat(&[0; 5]).iend();
    let raw = read(&gray_alpha).unwrap();
    assert_eq!(
        raw.color_model(),
        &ColorModel::with_alpha(ColorSpace::Gray, SampleType::Byte)
    );
}
