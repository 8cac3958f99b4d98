//! Minimal ICC profile wrapper.
//!
//! Only the fixed 128 byte header is inspected; the tag table is carried along untouched.

use byteorder::{BigEndian, ByteOrder};

use crate::error::FormatError;

const HEADER_LEN: usize = 128;
const FILE_SIGNATURE: &[u8; 4] = b"acsp";

/// An embedded ICC colour profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IccProfile {
    data: Vec<u8>,
}

impl IccProfile {
    /// Validate the header of a serialized profile and wrap it.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, FormatError> {
        if data.len() < HEADER_LEN {
            return Err(FormatError::InvalidIccProfile("shorter than its header"));
        }

        let declared = BigEndian::read_u32(&data[..4]) as usize;
        if declared < HEADER_LEN || declared > data.len() {
            return Err(FormatError::InvalidIccProfile("declared size out of range"));
        }

        if &data[36..40] != FILE_SIGNATURE {
            return Err(FormatError::InvalidIccProfile("missing acsp signature"));
        }

        Ok(IccProfile { data })
    }

    /// The serialized profile.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// The data colour space signature, e.g. `b"RGB "`.
    pub fn color_space_signature(&self) -> [u8; 4] {
        [self.data[16], self.data[17], self.data[18], self.data[19]]
    }

    /// Number of colour components of the data colour space, if known.
    pub fn num_components(&self) -> Option<usize> {
        match &self.color_space_signature() {
            b"GRAY" => Some(1),
            b"RGB " | b"XYZ " | b"Lab " | b"Luv " | b"YCbr" | b"Yxy " | b"HSV " | b"HLS "
            | b"CMY " => Some(3),
            b"CMYK" => Some(4),
            _ => None,
        }
    }
}
