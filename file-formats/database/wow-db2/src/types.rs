//! Common types used throughout the library

/// Represents a string reference in a DB2 record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringRef(pub u32);

impl StringRef {
    /// Create a new string reference from an offset
    pub fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// Get the offset of the string reference
    pub fn offset(&self) -> u32 {
        self.0
    }
}

/// A row-copy entry: `new_row_id` is a duplicate of `source_row_id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordCopy {
    /// Id of the row whose fields are duplicated
    pub source_row_id: u32,
    /// Id the duplicate is published under
    pub new_row_id: u32,
}

impl RecordCopy {
    /// Size of one copy-table entry on disk
    pub const SIZE: usize = 8;

    /// Create a new copy entry
    pub fn new(source_row_id: u32, new_row_id: u32) -> Self {
        Self {
            source_row_id,
            new_row_id,
        }
    }
}
