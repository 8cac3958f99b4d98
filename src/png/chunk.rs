//! PNG chunk framing: length, type, payload and CRC.

use std::fmt;
use std::io::{self, Read};

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{CodecError, CodecResult, FormatError};

/// The 8 bytes every PNG stream starts with.
pub const SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunk lengths are limited to 2^31 - 1 by the PNG format.
const MAX_CHUNK_LENGTH: u32 = (1 << 31) - 1;

/// The four letter type code of a chunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

impl ChunkType {
    pub const IHDR: ChunkType = ChunkType(*b"IHDR");
    pub const PLTE: ChunkType = ChunkType(*b"PLTE");
    pub const IDAT: ChunkType = ChunkType(*b"IDAT");
    pub const IEND: ChunkType = ChunkType(*b"IEND");
    pub const TRNS: ChunkType = ChunkType(*b"tRNS");
    pub const ICCP: ChunkType = ChunkType(*b"iCCP");
    pub const SRGB: ChunkType = ChunkType(*b"sRGB");

    /// Critical chunks have an uppercase first letter; a decoder must not skip them.
    pub fn is_critical(&self) -> bool {
        self.0[0] & 0x20 == 0
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// A chunk whose CRC has been verified.
#[derive(Clone, Debug)]
pub struct Chunk {
    pub chunk_type: ChunkType,
    pub data: Vec<u8>,
}

/// Reads the signature and then chunk after chunk from a PNG stream.
pub struct ChunkReader<R> {
    reader: R,
}

impl<R: Read> ChunkReader<R> {
    pub fn new(reader: R) -> Self {
        ChunkReader { reader }
    }

    /// Consume the signature. A stream too short to hold one does not carry it either.
    pub fn read_signature(&mut self) -> CodecResult<()> {
        let mut signature = [0; 8];
        match self.reader.read_exact(&mut signature) {
            Ok(()) if signature == SIGNATURE => Ok(()),
            Ok(()) => Err(FormatError::PngSignatureMismatch.into()),
            Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => {
                Err(FormatError::PngSignatureMismatch.into())
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn next_chunk(&mut self) -> CodecResult<Chunk> {
        let length = self
            .reader
            .read_u32::<BigEndian>()
            .map_err(truncated)?;
        if length > MAX_CHUNK_LENGTH {
            return Err(FormatError::ChunkTooLong(length).into());
        }

        let mut chunk_type = [0; 4];
        self.reader.read_exact(&mut chunk_type).map_err(truncated)?;

        // Grows with the data actually present, a bogus length must not allocate up front.
        let mut data = Vec::new();
        (&mut self.reader)
            .take(u64::from(length))
            .read_to_end(&mut data)?;
        if data.len() != length as usize {
            return Err(FormatError::UnexpectedEof.into());
        }

        let expected = self.reader.read_u32::<BigEndian>().map_err(truncated)?;
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&chunk_type);
        hasher.update(&data);
        let found = hasher.finalize();
        if found != expected {
            return Err(FormatError::ChunkCrcMismatch {
                chunk: chunk_type,
                expected,
                found,
            }
            .into());
        }

        Ok(Chunk {
            chunk_type: ChunkType(chunk_type),
            data,
        })
    }
}

fn truncated(err: io::Error) -> CodecError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        FormatError::UnexpectedEof.into()
    } else {
        err.into()
    }
}
