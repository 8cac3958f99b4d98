//! Holding compressed tiles until the directory in front of them can be written.
//!
//! A compressed page is laid out as directory followed by data, but the directory records byte
//! counts that are only known once the data has been compressed.

use std::fs::File;
use std::io::{self, BufWriter, Seek, SeekFrom, Write};

use super::compression::Compressor;
use super::directory::Directory;
use super::writer::TiffWriter;
use super::CacheStrategy;

pub(crate) enum PixelCache {
    /// Data goes straight to the sink behind a zeroed gap that the directory later fills.
    Seekable,
    /// Data goes to an anonymous temporary file, removed by the OS once the handle is dropped.
    File(BufWriter<File>),
    Memory(Vec<u8>),
}

impl PixelCache {
    /// Choose a strategy for the sink and prepare it for a directory of `dir_size` bytes.
    pub fn begin<W: Write>(
        writer: &mut TiffWriter<W>,
        strategy: CacheStrategy,
        dir_size: u64,
    ) -> io::Result<Self> {
        if writer.is_seekable() {
            writer.write_zeros(dir_size)?;
            return Ok(PixelCache::Seekable);
        }

        Ok(match strategy {
            CacheStrategy::TempFile => match tempfile::tempfile() {
                Ok(file) => PixelCache::File(BufWriter::new(file)),
                Err(err) => {
                    log::debug!("no temporary file ({}), caching compressed data in memory", err);
                    PixelCache::Memory(Vec::new())
                }
            },
            CacheStrategy::Memory => PixelCache::Memory(Vec::new()),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            PixelCache::Seekable => "seekable sink",
            PixelCache::File(_) => "temporary file",
            PixelCache::Memory(_) => "memory",
        }
    }

    /// Compress a tile into the cache, returning its compressed size.
    pub fn write_tile<W: Write>(
        &mut self,
        writer: &mut TiffWriter<W>,
        compressor: &mut Compressor,
        tile: &[u8],
        bytes_per_row: usize,
    ) -> io::Result<u64> {
        match self {
            PixelCache::Seekable => compressor.write_tile(writer, tile, bytes_per_row),
            PixelCache::File(file) => compressor.write_tile(file, tile, bytes_per_row),
            PixelCache::Memory(buffer) => compressor.write_tile(buffer, tile, bytes_per_row),
        }
    }

    /// Write `directory` at `ifd_offset` followed by the cached data, leaving the writer at the
    /// end of the data.
    pub fn finish<W: Write>(
        self,
        writer: &mut TiffWriter<W>,
        directory: &Directory,
        ifd_offset: u64,
        next_ifd_offset: u64,
    ) -> io::Result<()> {
        match self {
            PixelCache::Seekable => {
                let end = writer.offset();
                writer.goto_offset(ifd_offset)?;
                directory.write(writer, ifd_offset, next_ifd_offset)?;
                writer.goto_offset(end)?;
            }
            PixelCache::File(file) => {
                let mut file = file.into_inner().map_err(|err| err.into_error())?;
                file.seek(SeekFrom::Start(0))?;
                directory.write(writer, ifd_offset, next_ifd_offset)?;
                io::copy(&mut file, writer)?;
            }
            PixelCache::Memory(buffer) => {
                directory.write(writer, ifd_offset, next_ifd_offset)?;
                writer.write_bytes(&buffer)?;
            }
        }
        Ok(())
    }
}
