use std::io::Write;

use super::field::TiffField;
use super::writer::TiffWriter;

/// Bytes of the entry count in front of the entries.
const ENTRY_COUNT_LEN: u64 = 2;
/// Bytes of a single entry: tag, type, count and value or offset.
const ENTRY_LEN: u64 = 12;
/// Bytes of the next-IFD offset after the entries.
const NEXT_IFD_LEN: u64 = 4;

/// The fields of one Image File Directory, kept in ascending tag order.
#[derive(Clone, Debug, Default)]
pub struct Directory {
    fields: Vec<TiffField>,
}

impl Directory {
    pub fn new() -> Self {
        Directory { fields: Vec::new() }
    }

    /// Add a field unless its tag is already present.
    ///
    /// Returns `false` and drops `field` when the tag was registered before.
    pub fn insert(&mut self, field: TiffField) -> bool {
        match self.fields.binary_search(&field) {
            Ok(_) => false,
            Err(idx) => {
                self.fields.insert(idx, field);
                true
            }
        }
    }

    /// Add a field, replacing any previous field with the same tag.
    pub fn set(&mut self, field: TiffField) {
        match self.fields.binary_search(&field) {
            Ok(idx) => self.fields[idx] = field,
            Err(idx) => self.fields.insert(idx, field),
        }
    }

    pub fn get(&self, tag: impl Into<u16>) -> Option<&TiffField> {
        let tag = tag.into();
        self.fields
            .binary_search_by_key(&tag, TiffField::tag_u16)
            .ok()
            .map(|idx| &self.fields[idx])
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TiffField> {
        self.fields.iter()
    }

    /// Size of the entry table including count and next-IFD offset.
    fn table_size(&self) -> u64 {
        ENTRY_COUNT_LEN + ENTRY_LEN * self.len() as u64 + NEXT_IFD_LEN
    }

    /// Total bytes the directory occupies: the entry table followed by the field overflow.
    pub fn size(&self) -> u64 {
        self.table_size()
            + self
                .iter()
                .filter(|f| f.is_out_of_line())
                .map(TiffField::value_size)
                .sum::<u64>()
    }

    /// Serialize the directory, assuming it starts at `ifd_offset` in the file.
    ///
    /// Values that do not fit into an entry are appended after the table, in entry order, and
    /// referenced by absolute offset. Exactly [`Self::size`] bytes are written.
    pub fn write<W: Write>(
        &self,
        writer: &mut TiffWriter<W>,
        ifd_offset: u64,
        next_ifd_offset: u64,
    ) -> std::io::Result<()> {
        let mut overflow_offset = ifd_offset + self.table_size();

        writer.write_u16(self.len() as u16)?;
        for field in self.iter() {
            writer.write_u16(field.tag_u16())?;
            writer.write_u16(field.field_type().to_u16())?;
            writer.write_u32(field.count())?;

            if field.is_out_of_line() {
                writer.write_long(overflow_offset)?;
                overflow_offset += field.value_size();
            } else {
                // Pad the data with zeros to the correct length
                field.write_value(writer)?;
                writer.write_zeros(4 - field.value_size())?;
            }
        }
        writer.write_long(next_ifd_offset)?;

        for field in self.iter().filter(|f| f.is_out_of_line()) {
            field.write_value(writer)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::field::FieldValue;
    use crate::tags::Tag;

    fn short(tag: Tag, values: &[u16]) -> TiffField {
        TiffField::new(tag, FieldValue::Short(values.to_vec()))
    }

    #[test]
    fn keeps_ascending_order_and_first_registration() {
        let mut dir = Directory::new();
        assert!(dir.insert(short(Tag::SamplesPerPixel, &[3])));
        assert!(dir.insert(short(Tag::ImageWidth, &[10])));
        assert!(dir.insert(short(Tag::Compression, &[1])));
        assert!(!dir.insert(short(Tag::ImageWidth, &[99])));

        let tags: Vec<u16> = dir.iter().map(TiffField::tag_u16).collect();
        assert_eq!(tags, [256, 259, 277]);
        assert_eq!(
            dir.get(Tag::ImageWidth).map(TiffField::value),
            Some(&FieldValue::Short(vec![10]))
        );

        dir.set(short(Tag::ImageWidth, &[99]));
        assert_eq!(
            dir.get(Tag::ImageWidth).map(TiffField::value),
            Some(&FieldValue::Short(vec![99]))
        );
        assert_eq!(dir.len(), 3);
    }

    #[test]
    fn overflow_follows_table_in_entry_order() {
        let mut dir = Directory::new();
        dir.insert(short(Tag::SampleFormat, &[1, 1, 1]));
        dir.insert(short(Tag::BitsPerSample, &[8, 8, 8]));
        dir.insert(short(Tag::Compression, &[1]));

        // 2 + 3 * 12 + 4 table bytes, two overflowing 6 byte values
        assert_eq!(dir.size(), 42 + 12);

        let mut writer = TiffWriter::new(Vec::new());
        dir.write(&mut writer, 8, 0).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes.len() as u64, dir.size());

        assert_eq!(&bytes[0..2], &[0, 3]);
        // BitsPerSample points right after the table
        assert_eq!(&bytes[2..14], &[1, 2, 0, 3, 0, 0, 0, 3, 0, 0, 0, 50]);
        // Compression is inline, left aligned
        assert_eq!(&bytes[14..26], &[1, 3, 0, 3, 0, 0, 0, 1, 0, 1, 0, 0]);
        // SampleFormat follows the BitsPerSample overflow
        assert_eq!(&bytes[26..38], &[1, 83, 0, 3, 0, 0, 0, 3, 0, 0, 0, 56]);
        assert_eq!(&bytes[38..42], &[0, 0, 0, 0]);
        assert_eq!(&bytes[42..48], &[0, 8, 0, 8, 0, 8]);
        assert_eq!(&bytes[48..54], &[0, 1, 0, 1, 0, 1]);
    }
}
