#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let raw = match image_codecs::png::PngFileReader::new(data).read_raw() {
        Ok(raw) => raw,
        Err(_) => return,
    };

    let mut scanlines = Vec::new();
    let _ = std::io::Read::read_to_end(&mut raw.image_data_decoder(), &mut scanlines);
});
