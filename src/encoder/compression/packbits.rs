use crate::encoder::compression::*;

/// Compressor that uses the Packbits[^note] algorithm to compress bytes.
///
/// Each call to [`CompressionAlgorithm::write_to`] encodes one row; runs never span rows.
///
/// [^note]: PackBits is often ineffective on continuous tone images,
///          including many grayscale images. In such cases, it is better
///          to leave the image uncompressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Packbits;

impl Compression for Packbits {
    const COMPRESSION_METHOD: CompressionMethod = CompressionMethod::PackBits;

    fn get_algorithm(&self) -> Compressor {
        Compressor::Packbits(*self)
    }
}

impl CompressionAlgorithm for Packbits {
    fn write_to<W: Write>(&mut self, writer: &mut W, bytes: &[u8]) -> Result<u64, io::Error> {
        let mut out = Vec::with_capacity(bytes.len() + (bytes.len() + 127) / 128);
        pack_row(bytes, &mut out);
        writer.write_all(&out)?;
        Ok(out.len() as u64)
    }
}

/// Longest run of a repeated byte one header can describe.
const MAX_REPEAT: usize = 127;
/// Longest literal sequence one header can describe.
const MAX_LITERAL: usize = 128;

/// The classic TIFF PackBits encoder, applied to a single row.
fn pack_row(input: &[u8], out: &mut Vec<u8>) {
    if input.is_empty() {
        return;
    }

    let in_max = input.len() - 1;
    let mut pos = 0;

    while pos <= in_max {
        // Replicate run
        let mut run = 1;
        let replicate = input[pos];
        while run < MAX_REPEAT && pos < in_max && input[pos] == input[pos + 1] {
            run += 1;
            pos += 1;
        }
        if run > 1 {
            pos += 1;
            out.push((-(run as i8 - 1)) as u8);
            out.push(replicate);
        }

        // Literal run; a pair is only worth a repeat header when followed by a third copy
        run = 0;
        let header = out.len();
        out.push(0);
        while run < MAX_LITERAL
            && ((pos < in_max && input[pos] != input[pos + 1])
                || (pos + 1 < in_max && input[pos] != input[pos + 2]))
        {
            run += 1;
            out.push(input[pos]);
            pos += 1;
        }
        if run > 0 {
            out[header] = (run - 1) as u8;
        } else {
            out.truncate(header);
        }

        // A single byte left at the end of the row
        if pos == in_max {
            if run > 0 && run < MAX_LITERAL {
                out[header] += 1;
            } else {
                out.push(0);
            }
            out.push(input[pos]);
            pos += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::compression::tests::TEST_DATA;
    use std::io::Cursor;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut compressed_data = Vec::<u8>::new();
        let mut writer = Cursor::new(&mut compressed_data);
        Packbits.write_to(&mut writer, data).unwrap();
        compressed_data
    }

    /// Reference decoder from the TIFF 6.0 specification, section 9.
    fn unpack(mut data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some((&header, rest)) = data.split_first() {
            let header = header as i8;
            if header >= 0 {
                let len = header as usize + 1;
                out.extend_from_slice(&rest[..len]);
                data = &rest[len..];
            } else if header != -128 {
                let len = (1 - header as isize) as usize;
                out.extend(std::iter::repeat(rest[0]).take(len));
                data = &rest[1..];
            } else {
                data = rest;
            }
        }
        out
    }

    #[test]
    fn test_packbits_single_byte() {
        assert_eq!(compress(&[0x3F]), [0x00, 0x3F]);
    }

    #[test]
    fn test_packbits_rept() {
        // compress buffer with repetitive sequence
        const UNCOMPRESSED_DATA: &[u8] =
            b"This strrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrrring hangs.";
        const EXPECTED_COMPRESSED_DATA: &[u8] = b"\x06This st\xD1r\x09ing hangs.";

        assert_eq!(compress(UNCOMPRESSED_DATA), EXPECTED_COMPRESSED_DATA);
    }

    #[test]
    fn test_packbits() {
        let compressed = compress(TEST_DATA);
        assert_eq!(compressed[0], 0x3C);
        assert_eq!(&compressed[1..], TEST_DATA);
    }

    #[test]
    fn identical_bytes_compress_to_two() {
        for n in 2..=127 {
            let data = vec![0x5A; n];
            let compressed = compress(&data);
            assert_eq!(compressed, [(1 - n as i16) as u8, 0x5A], "run of {}", n);
        }
    }

    #[test]
    fn long_runs_are_split() {
        assert_eq!(compress(&[5; 128]), [0x82, 5, 0, 5]);
        assert_eq!(compress(&[5; 300]), [0x82, 5, 0x82, 5, 0xD3, 5]);
    }

    #[test]
    fn pairs_stay_literal() {
        assert_eq!(compress(&[1, 2, 2, 1]), [3, 1, 2, 2, 1]);
        assert_eq!(compress(&[1, 1, 2, 3, 3, 3, 4]), [0xFF, 1, 0, 2, 0xFE, 3, 0, 4]);
        assert_eq!(compress(&[0xAA, 0xAA, 0xAA, 0xBB]), [0xFE, 0xAA, 0, 0xBB]);
    }

    #[test]
    fn trailing_byte_merges_into_literal() {
        let data: Vec<u8> = (0..130).collect();
        let compressed = compress(&data);
        assert_eq!(compressed.len(), 132);
        assert_eq!(compressed[0], 127);
        assert_eq!(&compressed[129..], &[1, 128, 129]);
    }

    #[test]
    fn decodes_to_input() {
        let mut state = 0x1234_5678u32;
        for len in 1..300 {
            let data: Vec<u8> = (0..len)
                .map(|_| {
                    // xorshift, folded to few values to get runs
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    if state % 3 == 0 {
                        (state >> 8) as u8
                    } else {
                        (state % 3) as u8
                    }
                })
                .collect();
            assert_eq!(unpack(&compress(&data)), data, "input {:?}", data);
        }
    }
}
