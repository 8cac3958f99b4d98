use std::cmp::Ordering;
use std::io::Write;

use super::writer::TiffWriter;
use crate::tags::{Tag, Type};

/// Type to represent tiff values of type `RATIONAL`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rational {
    pub n: u32,
    pub d: u32,
}

/// Type to represent tiff values of type `SRATIONAL`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SRational {
    pub n: i32,
    pub d: i32,
}

/// The values of a field, one variant per TIFF field type.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Byte(Vec<u8>),
    /// Each string is written as UTF-8 followed by a NUL terminator.
    Ascii(Vec<String>),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<Rational>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<SRational>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl FieldValue {
    pub fn field_type(&self) -> Type {
        match self {
            FieldValue::Byte(_) => Type::BYTE,
            FieldValue::Ascii(_) => Type::ASCII,
            FieldValue::Short(_) => Type::SHORT,
            FieldValue::Long(_) => Type::LONG,
            FieldValue::Rational(_) => Type::RATIONAL,
            FieldValue::SByte(_) => Type::SBYTE,
            FieldValue::Undefined(_) => Type::UNDEFINED,
            FieldValue::SShort(_) => Type::SSHORT,
            FieldValue::SLong(_) => Type::SLONG,
            FieldValue::SRational(_) => Type::SRATIONAL,
            FieldValue::Float(_) => Type::FLOAT,
            FieldValue::Double(_) => Type::DOUBLE,
        }
    }

    /// Number of values; for ASCII the number of strings.
    pub fn len(&self) -> usize {
        match self {
            FieldValue::Byte(v) | FieldValue::Undefined(v) => v.len(),
            FieldValue::Ascii(v) => v.len(),
            FieldValue::Short(v) => v.len(),
            FieldValue::Long(v) => v.len(),
            FieldValue::Rational(v) => v.len(),
            FieldValue::SByte(v) => v.len(),
            FieldValue::SShort(v) => v.len(),
            FieldValue::SLong(v) => v.len(),
            FieldValue::SRational(v) => v.len(),
            FieldValue::Float(v) => v.len(),
            FieldValue::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A single directory entry.
///
/// Fields compare by tag only, which is the order entries take in a directory.
#[derive(Clone, Debug)]
pub struct TiffField {
    tag: u16,
    value: FieldValue,
}

impl TiffField {
    pub fn new(tag: impl Into<u16>, value: FieldValue) -> Self {
        TiffField {
            tag: tag.into(),
            value,
        }
    }

    pub fn tag(&self) -> Tag {
        Tag::from_u16_exhaustive(self.tag)
    }

    pub fn tag_u16(&self) -> u16 {
        self.tag
    }

    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    pub fn field_type(&self) -> Type {
        self.value.field_type()
    }

    /// The count stored in the directory entry.
    ///
    /// For ASCII fields this is the encoded byte length including every NUL terminator.
    pub fn count(&self) -> u32 {
        match &self.value {
            FieldValue::Ascii(strings) => strings.iter().map(|s| s.len() as u32 + 1).sum(),
            value => value.len() as u32,
        }
    }

    /// Size of the encoded value in bytes.
    pub fn value_size(&self) -> u64 {
        u64::from(self.count()) * u64::from(self.field_type().byte_len())
    }

    /// Whether the value lives in the overflow area rather than inside the entry.
    pub fn is_out_of_line(&self) -> bool {
        self.value_size() > 4
    }

    /// Write the encoded value without any padding.
    pub fn write_value<W: Write>(&self, writer: &mut TiffWriter<W>) -> std::io::Result<()> {
        match &self.value {
            FieldValue::Byte(v) | FieldValue::Undefined(v) => writer.write_bytes(v)?,
            FieldValue::Ascii(strings) => {
                for s in strings {
                    writer.write_bytes(s.as_bytes())?;
                    writer.write_u8(0)?;
                }
            }
            FieldValue::Short(v) => {
                for &x in v {
                    writer.write_u16(x)?;
                }
            }
            FieldValue::Long(v) => {
                for &x in v {
                    writer.write_u32(x)?;
                }
            }
            FieldValue::Rational(v) => {
                for x in v {
                    writer.write_u32(x.n)?;
                    writer.write_u32(x.d)?;
                }
            }
            FieldValue::SByte(v) => {
                for &x in v {
                    writer.write_u8(x as u8)?;
                }
            }
            FieldValue::SShort(v) => {
                for &x in v {
                    writer.write_u16(x as u16)?;
                }
            }
            FieldValue::SLong(v) => {
                for &x in v {
                    writer.write_u32(x as u32)?;
                }
            }
            FieldValue::SRational(v) => {
                for x in v {
                    writer.write_u32(x.n as u32)?;
                    writer.write_u32(x.d as u32)?;
                }
            }
            FieldValue::Float(v) => {
                for &x in v {
                    writer.write_u32(x.to_bits())?;
                }
            }
            FieldValue::Double(v) => {
                for &x in v {
                    let bits = x.to_bits();
                    writer.write_u32((bits >> 32) as u32)?;
                    writer.write_u32(bits as u32)?;
                }
            }
        }
        Ok(())
    }
}

impl PartialEq for TiffField {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
    }
}

impl Eq for TiffField {}

impl PartialOrd for TiffField {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TiffField {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tag.cmp(&other.tag)
    }
}
