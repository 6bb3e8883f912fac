//! WDB5 header and field structure definitions

use binrw::{BinRead, BinWrite};
use bitflags::bitflags;

/// Magic signature of a WDB5 table
pub const WDB5_MAGIC: [u8; 4] = *b"WDB5";

bitflags! {
    /// Table-level flags stored in the WDB5 header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TableFlags: u16 {
        /// Records are addressed through an offset map (variable-size rows)
        const OFFSET_MAP = 0x01;
        /// A secondary key is present
        const SECONDARY_KEY = 0x02;
        /// Row ids are stored in a list after the string block
        const NON_INLINE_IDS = 0x04;
    }
}

/// WDB5 file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little, magic = b"WDB5")]
pub struct Wdb5Header {
    /// Number of records in the file
    pub record_count: u32,
    /// Number of columns in each record
    pub field_count: u32,
    /// Size of each on-disk record in bytes
    pub record_size: u32,
    /// Size of the string block in bytes
    pub string_table_size: u32,
    /// Table hash
    pub table_hash: u32,
    /// Layout hash
    pub layout_hash: u32,
    /// Lowest row id
    pub min_id: u32,
    /// Highest row id
    pub max_id: u32,
    /// Locale
    pub locale: u32,
    /// Size of the copy table in bytes
    pub copy_table_size: u32,
    /// Raw table flags
    pub flags: u16,
    /// Column holding the row id when ids are inline
    pub id_index: u16,
}

impl Wdb5Header {
    /// The size of a WDB5 header in bytes
    pub const SIZE: usize = 48;

    /// Decoded table flags; unknown bits are kept
    pub fn table_flags(&self) -> TableFlags {
        TableFlags::from_bits_retain(self.flags)
    }

    /// Whether an id list follows the string block
    pub fn has_id_list(&self) -> bool {
        self.table_flags().contains(TableFlags::NON_INLINE_IDS)
    }

    /// Number of entries in the copy table
    pub fn copy_count(&self) -> u32 {
        self.copy_table_size / 8
    }
}

/// Column descriptor following the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct FieldStructure {
    /// `32 - bits` is the stored width of one element in bits
    pub bits: i16,
    /// Offset of the column within an on-disk record
    pub offset: u16,
}

impl FieldStructure {
    /// Size of a field structure entry on disk
    pub const SIZE: usize = 4;

    /// Build the descriptor for an element stored with `width` bytes
    pub fn for_width(width: usize, offset: u16) -> Self {
        Self {
            bits: 32 - (width as i16) * 8,
            offset,
        }
    }

    /// Stored width of one element in bytes
    pub fn byte_width(&self) -> usize {
        let bits = 32 - i32::from(self.bits);
        if bits <= 0 { 0 } else { (bits / 8) as usize }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::BinReaderExt;
    use std::io::Cursor;

    #[test]
    fn test_parse_header() {
        let mut data = Vec::new();
        data.extend_from_slice(b"WDB5");
        for value in [2u32, 3, 9, 17, 0xAAAA, 0xBBBB, 1, 5, 0, 8] {
            data.extend_from_slice(&value.to_le_bytes());
        }
        data.extend_from_slice(&4u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        assert_eq!(data.len(), Wdb5Header::SIZE);

        let header: Wdb5Header = Cursor::new(&data).read_le().unwrap();
        assert_eq!(header.record_count, 2);
        assert_eq!(header.layout_hash, 0xBBBB);
        assert_eq!(header.copy_count(), 1);
        assert!(header.has_id_list());
    }

    #[test]
    fn test_rejects_other_magic() {
        let mut data = b"WDBC".to_vec();
        data.resize(Wdb5Header::SIZE, 0);
        assert!(Cursor::new(&data).read_le::<Wdb5Header>().is_err());
    }

    #[test]
    fn test_field_structure_widths() {
        assert_eq!(FieldStructure { bits: 0, offset: 0 }.byte_width(), 4);
        assert_eq!(FieldStructure { bits: 16, offset: 0 }.byte_width(), 2);
        assert_eq!(FieldStructure { bits: 24, offset: 0 }.byte_width(), 1);
        assert_eq!(FieldStructure { bits: -32, offset: 0 }.byte_width(), 8);
        assert_eq!(FieldStructure::for_width(2, 6).bits, 16);
    }
}
