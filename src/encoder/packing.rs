//! Conversion of raster samples into the packed big-endian byte layout of a tile or strip.

use super::image_info::ImageInfo;
use crate::error::CodecResult;
use crate::raster::Raster;

/// Reusable buffers for packing the tiles of one page.
pub struct TilePacker {
    samples: Vec<u32>,
    tile: Vec<u8>,
}

impl TilePacker {
    pub fn new(info: &ImageInfo) -> Self {
        TilePacker {
            samples: Vec::new(),
            tile: Vec::with_capacity(info.bytes_per_tile),
        }
    }

    /// Pack tile `index`.
    ///
    /// Every stored row is `info.bytes_per_row` long. Columns and rows outside the image are
    /// zero, and 1 and 4 bit rows are padded to a byte boundary.
    pub fn pack(&mut self, raster: &dyn Raster, info: &ImageInfo, index: usize) -> CodecResult<&[u8]> {
        let (x, y, width, height) = info.tile_region(index);
        let stored_rows = info.stored_rows(index) as usize;
        let row_len = info.bytes_per_row;

        self.tile.clear();

        let full_rows = x == 0 && width == info.width && width == info.tile_width;
        match raster.interleaved_bytes() {
            Some(bytes) if full_rows && info.bit_depth == 8 => {
                let start = y as usize * row_len;
                self.tile
                    .extend_from_slice(&bytes[start..start + height as usize * row_len]);
            }
            _ => {
                self.samples.clear();
                raster.read_samples(x, y, width, height, &mut self.samples)?;
                let samples_per_row = width as usize * info.num_bands;
                for row in self.samples.chunks(samples_per_row.max(1)) {
                    let start = self.tile.len();
                    pack_row(row, info.bit_depth, &mut self.tile);
                    self.tile.resize(start + row_len, 0);
                }
            }
        }

        self.tile.resize(stored_rows * row_len, 0);
        Ok(&self.tile)
    }
}

/// Append one row of samples at the given bit depth.
fn pack_row(samples: &[u32], bit_depth: u8, out: &mut Vec<u8>) {
    match bit_depth {
        1 => {
            for chunk in samples.chunks(8) {
                let byte = chunk
                    .iter()
                    .enumerate()
                    .fold(0u8, |acc, (i, &s)| acc | (((s & 1) as u8) << (7 - i)));
                out.push(byte);
            }
        }
        4 => {
            for chunk in samples.chunks(2) {
                let high = (chunk[0] & 0xF) as u8;
                let low = chunk.get(1).map_or(0, |&s| (s & 0xF) as u8);
                out.push((high << 4) | low);
            }
        }
        8 => out.extend(samples.iter().map(|&s| s as u8)),
        16 => {
            for &s in samples {
                out.extend_from_slice(&(s as u16).to_be_bytes());
            }
        }
        _ => {
            for &s in samples {
                out.extend_from_slice(&s.to_be_bytes());
            }
        }
    }
}
