use byteorder::{BigEndian, WriteBytesExt};
use std::io::{self, Read, Seek, SeekFrom, Write};

/// Repositions a seekable sink to an absolute stream position.
type SeekFn<W> = fn(&mut W, u64) -> io::Result<u64>;

/// Big-endian writer that keeps track of the logical file offset.
///
/// The offset is counted rather than queried, so that sinks without `Seek` can be written to.
/// Sinks created with [`TiffWriter::new_seekable`] may additionally jump back to patch data.
pub struct TiffWriter<W> {
    writer: W,
    offset: u64,
    base: u64,
    seek: Option<SeekFn<W>>,
}

impl<W: Write> TiffWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            offset: 0,
            base: 0,
            seek: None,
        }
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), io::Error> {
        self.writer.write_all(bytes)?;
        self.offset += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, n: u8) -> Result<(), io::Error> {
        self.writer.write_u8(n)?;
        self.offset += 1;
        Ok(())
    }

    pub fn write_u16(&mut self, n: u16) -> Result<(), io::Error> {
        self.writer.write_u16::<BigEndian>(n)?;
        self.offset += 2;
        Ok(())
    }

    pub fn write_u32(&mut self, n: u32) -> Result<(), io::Error> {
        self.writer.write_u32::<BigEndian>(n)?;
        self.offset += 4;
        Ok(())
    }

    /// Write the low 32 bits of `n`.
    ///
    /// Offsets are tracked as `u64` but a classic TIFF stores them in 4 bytes.
    pub fn write_long(&mut self, n: u64) -> Result<(), io::Error> {
        self.write_u32(n as u32)
    }

    /// Write `count` zero bytes.
    pub fn write_zeros(&mut self, count: u64) -> Result<(), io::Error> {
        io::copy(&mut io::repeat(0).take(count), &mut self.writer)?;
        self.offset += count;
        Ok(())
    }

    /// Offset relative to the start of the TIFF stream.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_seekable(&self) -> bool {
        self.seek.is_some()
    }

    /// Reposition to an offset relative to the start of the TIFF stream.
    pub fn goto_offset(&mut self, offset: u64) -> Result<(), io::Error> {
        let seek = self.seek.ok_or_else(|| {
            io::Error::new(io::ErrorKind::Unsupported, "TIFF sink is not seekable")
        })?;
        seek(&mut self.writer, self.base + offset)?;
        self.offset = offset;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Seek> TiffWriter<W> {
    /// Wrap a seekable sink. Offsets are relative to its current position.
    pub fn new_seekable(mut writer: W) -> Result<Self, io::Error> {
        let base = writer.stream_position()?;
        let seek: SeekFn<W> = seek_to::<W>;
        Ok(Self {
            writer,
            offset: 0,
            base,
            seek: Some(seek),
        })
    }
}

fn seek_to<W: Seek>(writer: &mut W, pos: u64) -> io::Result<u64> {
    writer.seek(SeekFrom::Start(pos))
}

impl<W: Write> Write for TiffWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.writer.write(buf)?;
        self.offset += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn writes_big_endian_and_counts() {
        let mut writer = TiffWriter::new(Vec::new());
        writer.write_u16(0x4d4d).unwrap();
        writer.write_u32(0x0102_0304).unwrap();
        writer.write_long(0x1_0000_0008).unwrap();
        writer.write_zeros(3).unwrap();
        assert_eq!(writer.offset(), 13);
        assert_eq!(
            writer.into_inner(),
            [0x4d, 0x4d, 1, 2, 3, 4, 0, 0, 0, 8, 0, 0, 0]
        );
    }

    #[test]
    fn patches_seekable_sinks() {
        let mut cursor = Cursor::new(vec![0xAA]);
        cursor.set_position(1);
        let mut writer = TiffWriter::new_seekable(cursor).unwrap();
        writer.write_u32(0).unwrap();
        writer.write_u8(7).unwrap();
        writer.goto_offset(0).unwrap();
        writer.write_u32(0xDEAD_BEEF).unwrap();
        writer.goto_offset(5).unwrap();
        assert_eq!(
            writer.into_inner().into_inner(),
            [0xAA, 0xDE, 0xAD, 0xBE, 0xEF, 7]
        );
    }

    #[test]
    fn plain_sinks_refuse_to_seek() {
        let mut writer = TiffWriter::new(Vec::new());
        assert!(!writer.is_seekable());
        assert!(writer.goto_offset(0).is_err());
    }
}
