//! String block parsing functionality

use crate::{Error, Result, StringRef};

/// Represents the string block of a DB2 table
#[derive(Debug, Clone, Default)]
pub struct StringBlock {
    /// The raw bytes of the string block
    data: Vec<u8>,
}

impl StringBlock {
    /// Create a string block from raw bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Get a string from the string block using a string reference
    pub fn get_string(&self, string_ref: StringRef) -> Result<&str> {
        let offset = string_ref.offset() as usize;
        if offset >= self.data.len() {
            // An empty block still answers the null reference
            if offset == 0 {
                return Ok("");
            }
            return Err(Error::OutOfBounds(format!(
                "String reference offset out of bounds: {} (max: {})",
                offset,
                self.data.len()
            )));
        }

        let end = self.data[offset..]
            .iter()
            .position(|&b| b == 0)
            .map_or(self.data.len(), |pos| offset + pos);

        std::str::from_utf8(&self.data[offset..end])
            .map_err(|e| Error::TypeConversion(format!("Invalid UTF-8 string: {e}")))
    }

    /// Get the raw data of the string block
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the size of the string block in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}
