#![no_main]
use image_codecs::encoder::{TiffEncodeParam, TiffEncoder};
use image_codecs::tags::CompressionMethod;
use image_codecs::{RenderedImage, SampleBuffer, Samples};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let width = u32::from(data[0] % 64) + 1;
    let bands = usize::from(data[1] % 4) + 1;
    let compression = match data[2] % 3 {
        0 => CompressionMethod::None,
        1 => CompressionMethod::PackBits,
        _ => CompressionMethod::Deflate,
    };
    let tiled = data[3] & 1 != 0;

    let pixels = &data[4..];
    let height = (pixels.len() / (width as usize * bands)) as u32;
    let len = width as usize * height as usize * bands;
    let raster = match SampleBuffer::new(width, height, bands, Samples::U8(pixels[..len].to_vec())) {
        Ok(raster) => raster,
        Err(_) => return,
    };

    let mut param = TiffEncodeParam::default().with_compression(compression);
    if tiled {
        param = param.with_tiles(16, 16);
    }
    let mut encoder = TiffEncoder::new(Vec::new(), param);
    let _ = encoder.encode(RenderedImage::bare(&raster));
});
