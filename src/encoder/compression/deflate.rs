use crate::encoder::compression::*;
use flate2::{write::ZlibEncoder, Compression as FlateCompression};

/// The Deflate algorithm used to compress image data in TIFF files.
#[derive(Debug, Clone)]
pub struct Deflate {
    level: FlateCompression,
    buffer: Vec<u8>,
}

/// The level of compression used by the Deflate algorithm.
/// It allows trading compression ratio for compression speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[non_exhaustive]
pub enum DeflateLevel {
    /// The fastest possible compression mode.
    Fast = 1,
    /// The conserative choice between speed and ratio.
    #[default]
    Balanced = 6,
    /// The best compression available with Deflate.
    Best = 9,
}

impl Deflate {
    /// Lets be greedy and allocate more bytes in advance. We will likely encode longer image strips.
    const DEFAULT_BUFFER_SIZE: usize = 256;

    /// Create a new deflate compressor with a specific level of compression.
    pub fn with_level(level: DeflateLevel) -> Self {
        Self {
            buffer: Vec::with_capacity(Self::DEFAULT_BUFFER_SIZE),
            level: FlateCompression::new(level as u32),
        }
    }
}

impl Default for Deflate {
    fn default() -> Self {
        Self::with_level(DeflateLevel::default())
    }
}

impl Compression for Deflate {
    const COMPRESSION_METHOD: CompressionMethod = CompressionMethod::Deflate;

    fn get_algorithm(&self) -> Compressor {
        Compressor::Deflate(self.clone())
    }
}

impl CompressionAlgorithm for Deflate {
    fn write_to<W: Write>(&mut self, writer: &mut W, bytes: &[u8]) -> Result<u64, io::Error> {
        {
            let mut encoder = ZlibEncoder::new(&mut self.buffer, self.level);
            encoder.write_all(bytes)?;
            encoder.finish()?;
        }

        writer.write_all(&self.buffer)?;
        let compressed_byte_count = self.buffer.len() as u64;

        // Clear the buffer for the next compression.
        self.buffer.clear();

        Ok(compressed_byte_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::compression::tests::TEST_DATA;
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    #[test]
    fn test_deflate() {
        let mut compressed = Vec::new();
        let written = Deflate::default()
            .write_to(&mut compressed, TEST_DATA)
            .unwrap();
        assert_eq!(written as usize, compressed.len());
        // zlib header with default compression
        assert_eq!(&compressed[..2], &[0x78, 0x9C]);

        let mut decompressed = Vec::new();
        ZlibDecoder::new(&compressed[..])
            .read_to_end(&mut decompressed)
            .unwrap();
        assert_eq!(decompressed, TEST_DATA);
    }

    #[test]
    fn reuses_buffer_between_tiles() {
        let mut deflate = Deflate::with_level(DeflateLevel::Best);
        let mut first = Vec::new();
        let mut second = Vec::new();
        deflate.write_to(&mut first, &[0; 512]).unwrap();
        deflate.write_to(&mut second, &[0; 512]).unwrap();
        assert_eq!(first, second);
    }
}
