use std::io::{self, Write};

use crate::{
    error::{CodecResult, UnsupportedError},
    tags::CompressionMethod,
};

mod deflate;
mod packbits;
mod uncompressed;

pub use self::deflate::{Deflate, DeflateLevel};
pub use self::packbits::Packbits;
pub use self::uncompressed::Uncompressed;

/// An algorithm used for compression
pub trait CompressionAlgorithm {
    /// The function to encode a sequence of bytes into a sequence of bytes.
    fn write_to<W: Write>(&mut self, writer: &mut W, bytes: &[u8]) -> Result<u64, io::Error>;
}

/// An algorithm used for compression with associated optional buffers and/or configurations.
pub trait Compression: CompressionAlgorithm {
    /// The corresponding tag to the algorithm.
    const COMPRESSION_METHOD: CompressionMethod;

    /// Method to optain a type that can store each variant of comression algorithm.
    fn get_algorithm(&self) -> Compressor;
}

/// An enum to store each compression algorithm.
#[derive(Debug, Clone)]
pub enum Compressor {
    Uncompressed(Uncompressed),
    Packbits(Packbits),
    Deflate(Deflate),
}

impl Default for Compressor {
    /// The default compression strategy does not apply any compression.
    fn default() -> Self {
        Compressor::Uncompressed(Uncompressed)
    }
}

impl Compressor {
    /// Select the compressor for a method named in the encode parameters.
    pub fn from_method(method: CompressionMethod, level: DeflateLevel) -> CodecResult<Self> {
        match method {
            CompressionMethod::None => Ok(Uncompressed.get_algorithm()),
            CompressionMethod::PackBits => Ok(Packbits.get_algorithm()),
            CompressionMethod::Deflate => Ok(Deflate::with_level(level).get_algorithm()),
            other => Err(UnsupportedError::Compression(other).into()),
        }
    }

    pub fn method(&self) -> CompressionMethod {
        match self {
            Compressor::Uncompressed(_) => Uncompressed::COMPRESSION_METHOD,
            Compressor::Packbits(_) => Packbits::COMPRESSION_METHOD,
            Compressor::Deflate(_) => Deflate::COMPRESSION_METHOD,
        }
    }

    /// Compress one packed tile or strip made of rows of `bytes_per_row` bytes.
    ///
    /// PackBits runs never cross a row boundary, Deflate sees the tile as a single stream.
    /// Returns the number of bytes written.
    pub fn write_tile<W: Write>(
        &mut self,
        writer: &mut W,
        tile: &[u8],
        bytes_per_row: usize,
    ) -> Result<u64, io::Error> {
        match self {
            Compressor::Uncompressed(algorithm) => algorithm.write_to(writer, tile),
            Compressor::Packbits(algorithm) => {
                let mut written = 0;
                for row in tile.chunks(bytes_per_row.max(1)) {
                    written += algorithm.write_to(writer, row)?;
                }
                Ok(written)
            }
            Compressor::Deflate(algorithm) => algorithm.write_to(writer, tile),
        }
    }
}
