//! A minimal big-endian TIFF reader used to check encoder output.

#![allow(dead_code)]

use byteorder::{BigEndian, ByteOrder};
use std::io::Read;

pub const IMAGE_WIDTH: u16 = 256;
pub const IMAGE_LENGTH: u16 = 257;
pub const BITS_PER_SAMPLE: u16 = 258;
pub const COMPRESSION: u16 = 259;
pub const PHOTOMETRIC: u16 = 262;
pub const SOFTWARE: u16 = 305;
pub const STRIP_OFFSETS: u16 = 273;
pub const SAMPLES_PER_PIXEL: u16 = 277;
pub const ROWS_PER_STRIP: u16 = 278;
pub const STRIP_BYTE_COUNTS: u16 = 279;
pub const COLOR_MAP: u16 = 320;
pub const TILE_WIDTH: u16 = 322;
pub const TILE_LENGTH: u16 = 323;
pub const TILE_OFFSETS: u16 = 324;
pub const TILE_BYTE_COUNTS: u16 = 325;
pub const EXTRA_SAMPLES: u16 = 338;
pub const SAMPLE_FORMAT: u16 = 339;
pub const YCBCR_SUBSAMPLING: u16 = 530;
pub const YCBCR_POSITIONING: u16 = 531;
pub const REFERENCE_BLACK_WHITE: u16 = 532;

#[derive(Debug)]
pub struct Entry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    /// Integer values; rationals contribute numerator and denominator.
    pub values: Vec<u64>,
}

#[derive(Debug)]
pub struct Ifd {
    pub offset: u64,
    pub entries: Vec<Entry>,
    pub next: u64,
}

impl Ifd {
    pub fn entry(&self, tag: u16) -> Option<&Entry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    pub fn values(&self, tag: u16) -> &[u64] {
        match self.entry(tag) {
            Some(entry) => &entry.values,
            None => panic!("tag {} missing", tag),
        }
    }

    pub fn value(&self, tag: u16) -> u64 {
        self.values(tag)[0]
    }

    pub fn tags(&self) -> Vec<u16> {
        self.entries.iter().map(|e| e.tag).collect()
    }

    /// The stored bytes of every strip or tile.
    pub fn chunks<'a>(&self, file: &'a [u8]) -> Vec<&'a [u8]> {
        let (offsets, counts) = if self.entry(TILE_OFFSETS).is_some() {
            (self.values(TILE_OFFSETS), self.values(TILE_BYTE_COUNTS))
        } else {
            (self.values(STRIP_OFFSETS), self.values(STRIP_BYTE_COUNTS))
        };
        assert_eq!(offsets.len(), counts.len());
        offsets
            .iter()
            .zip(counts)
            .map(|(&offset, &count)| &file[offset as usize..(offset + count) as usize])
            .collect()
    }
}

fn type_len(field_type: u16) -> usize {
    match field_type {
        1 | 2 | 6 | 7 => 1,
        3 | 8 => 2,
        4 | 9 | 11 => 4,
        5 | 10 | 12 => 8,
        other => panic!("unknown field type {}", other),
    }
}

fn read_values(data: &[u8], field_type: u16, count: usize) -> Vec<u64> {
    let mut values = Vec::new();
    for i in 0..count {
        match type_len(field_type) {
            1 => values.push(u64::from(data[i])),
            2 => values.push(u64::from(BigEndian::read_u16(&data[2 * i..]))),
            4 => values.push(u64::from(BigEndian::read_u32(&data[4 * i..]))),
            _ if field_type == 12 => values.push(BigEndian::read_u64(&data[8 * i..])),
            _ => {
                values.push(u64::from(BigEndian::read_u32(&data[8 * i..])));
                values.push(u64::from(BigEndian::read_u32(&data[8 * i + 4..])));
            }
        }
    }
    values
}

/// Parse the header and follow the chain of directories.
pub fn read_ifds(file: &[u8]) -> Vec<Ifd> {
    assert_eq!(&file[..4], b"MM\0\x2a", "not a big-endian TIFF");
    let mut offset = u64::from(BigEndian::read_u32(&file[4..]));
    assert_eq!(offset, 8);

    let mut ifds = Vec::new();
    while offset != 0 {
        assert_eq!(offset % 2, 0, "directory at odd offset {}", offset);
        let start = offset as usize;
        let count = BigEndian::read_u16(&file[start..]) as usize;
        let mut entries = Vec::with_capacity(count);
        for i in 0..count {
            let entry = &file[start + 2 + 12 * i..start + 14 + 12 * i];
            let tag = BigEndian::read_u16(entry);
            let field_type = BigEndian::read_u16(&entry[2..]);
            let value_count = BigEndian::read_u32(&entry[4..]);
            let size = type_len(field_type) * value_count as usize;
            let data = if size <= 4 {
                &entry[8..]
            } else {
                &file[BigEndian::read_u32(&entry[8..]) as usize..]
            };
            entries.push(Entry {
                tag,
                field_type,
                count: value_count,
                values: read_values(data, field_type, value_count as usize),
            });
        }
        let next = u64::from(BigEndian::read_u32(&file[start + 2 + 12 * count..]));
        ifds.push(Ifd {
            offset,
            entries,
            next,
        });
        offset = next;
    }
    ifds
}

pub fn unpack_bits(mut data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some((&header, rest)) = data.split_first() {
        let header = header as i8;
        if header >= 0 {
            let len = header as usize + 1;
            out.extend_from_slice(&rest[..len]);
            data = &rest[len..];
        } else if header != -128 {
            out.extend(std::iter::repeat(rest[0]).take((1 - i32::from(header)) as usize));
            data = &rest[1..];
        } else {
            data = rest;
        }
    }
    out
}

pub fn inflate(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .expect("invalid deflate data");
    out
}
