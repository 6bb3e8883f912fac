//! Schema definitions for DB2 tables
//!
//! A [`TableSchema`] describes the materialized record layout the decoder
//! produces, not the compressed on-disk layout. Every field occupies
//! `array_size * field_type.size()` bytes. When the row id is not stored in
//! the record data, an extra 4-byte id slot is placed at the front of every
//! record and all field offsets shift by 4.

use crate::{Error, Result};

/// Size of the id slot prepended to records whose index is not embedded
pub const EXTERNAL_ID_SIZE: usize = 4;

/// Represents the type of a field in a DB2 record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 8-bit integer
    Byte,
    /// 16-bit integer
    Short,
    /// 32-bit integer
    Int,
    /// 32-bit floating point number
    Float,
    /// 64-bit integer
    Long,
    /// Localized string (offset into the string block)
    LocalizedString,
    /// Plain string (offset into the string block)
    String,
}

impl FieldType {
    /// Get the size of the field type in bytes
    pub fn size(&self) -> usize {
        match self {
            FieldType::Byte => 1,
            FieldType::Short => 2,
            FieldType::Int | FieldType::Float => 4,
            FieldType::Long => 8,
            // String fields hold a 32-bit string block offset
            FieldType::LocalizedString | FieldType::String => 4,
        }
    }

    /// Whether this field references the string block
    pub fn is_string(&self) -> bool {
        matches!(self, FieldType::LocalizedString | FieldType::String)
    }

    /// Parse a format character (`b h i f l s S`)
    pub fn from_format_char(c: char) -> Result<Self> {
        match c {
            'b' => Ok(FieldType::Byte),
            'h' => Ok(FieldType::Short),
            'i' => Ok(FieldType::Int),
            'f' => Ok(FieldType::Float),
            'l' => Ok(FieldType::Long),
            's' => Ok(FieldType::LocalizedString),
            'S' => Ok(FieldType::String),
            other => Err(Error::SchemaValidation(format!(
                "Unsupported column type specified '{other}'"
            ))),
        }
    }

    /// The format character for this type
    pub fn format_char(&self) -> char {
        match self {
            FieldType::Byte => 'b',
            FieldType::Short => 'h',
            FieldType::Int => 'i',
            FieldType::Float => 'f',
            FieldType::Long => 'l',
            FieldType::LocalizedString => 's',
            FieldType::String => 'S',
        }
    }
}

/// Represents a field in a DB2 schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaField {
    /// Name of the field
    pub name: String,
    /// Type of the field
    pub field_type: FieldType,
    /// Number of inline elements (1 for scalar fields)
    pub array_size: usize,
}

impl SchemaField {
    /// Create a new scalar schema field
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new_array(name, field_type, 1)
    }

    /// Create a new array schema field
    pub fn new_array(name: impl Into<String>, field_type: FieldType, array_size: usize) -> Self {
        Self {
            name: name.into(),
            field_type,
            array_size,
        }
    }

    /// Get the total size of the field in bytes
    pub fn size(&self) -> usize {
        self.field_type.size() * self.array_size
    }
}

/// Immutable description of a table's record layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    name: String,
    fields: Vec<SchemaField>,
    index_field: Option<usize>,
    parent_index_field: Option<usize>,
    layout_hash: u32,
    offsets: Vec<usize>,
    record_size: usize,
}

impl TableSchema {
    /// Build a schema and compute its offset table.
    ///
    /// `index_field` is the position of the row id inside the record data,
    /// or `None` when ids are supplied externally.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<SchemaField>,
        index_field: Option<usize>,
        parent_index_field: Option<usize>,
        layout_hash: u32,
    ) -> Result<Self> {
        let name = name.into();

        if let Some(field) = fields.iter().find(|f| f.array_size == 0) {
            return Err(Error::SchemaValidation(format!(
                "{name}: field '{}' has an empty array",
                field.name
            )));
        }

        if let Some(index) = index_field {
            match fields.get(index) {
                Some(field) if field.field_type == FieldType::Int && field.array_size == 1 => {}
                Some(field) => {
                    return Err(Error::SchemaValidation(format!(
                        "{name}: index field '{}' must be a scalar int",
                        field.name
                    )));
                }
                None => {
                    return Err(Error::SchemaValidation(format!(
                        "{name}: index field {index} out of range (fields: {})",
                        fields.len()
                    )));
                }
            }
        }

        if let Some(parent) = parent_index_field {
            if parent >= fields.len() {
                return Err(Error::SchemaValidation(format!(
                    "{name}: parent index field {parent} out of range (fields: {})",
                    fields.len()
                )));
            }
        }

        let base = if index_field.is_some() {
            0
        } else {
            EXTERNAL_ID_SIZE
        };

        let mut offsets = Vec::with_capacity(fields.len());
        let mut cursor = base;
        for field in &fields {
            offsets.push(cursor);
            cursor += field.size();
        }

        Ok(Self {
            name,
            fields,
            index_field,
            parent_index_field,
            layout_hash,
            offsets,
            record_size: cursor,
        })
    }

    /// Build a schema from a format string such as `"iSh"` plus per-field array sizes.
    ///
    /// Fields are named `field_0`, `field_1`, ... An empty `array_sizes`
    /// slice means every field is scalar.
    pub fn from_format(
        name: impl Into<String>,
        format: &str,
        array_sizes: &[usize],
        index_field: Option<usize>,
        parent_index_field: Option<usize>,
        layout_hash: u32,
    ) -> Result<Self> {
        let name = name.into();
        let count = format.chars().count();
        if !array_sizes.is_empty() && array_sizes.len() != count {
            return Err(Error::SchemaValidation(format!(
                "{name}: {count} format characters but {} array sizes",
                array_sizes.len()
            )));
        }

        let fields = format
            .chars()
            .enumerate()
            .map(|(i, c)| {
                let size = array_sizes.get(i).copied().unwrap_or(1);
                FieldType::from_format_char(c)
                    .map(|ty| SchemaField::new_array(format!("field_{i}"), ty, size))
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(name, fields, index_field, parent_index_field, layout_hash)
    }

    /// Name of the table
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fields in declaration order
    pub fn fields(&self) -> &[SchemaField] {
        &self.fields
    }

    /// Get a field by position
    pub fn field(&self, index: usize) -> Option<&SchemaField> {
        self.fields.get(index)
    }

    /// Position of a field by name
    pub fn field_position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Number of declared columns, matching the on-disk field count
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Expected layout hash
    pub fn layout_hash(&self) -> u32 {
        self.layout_hash
    }

    /// Position of the embedded index field, if any
    pub fn index_field(&self) -> Option<usize> {
        self.index_field
    }

    /// Position of the parent index field, if any
    pub fn parent_index_field(&self) -> Option<usize> {
        self.parent_index_field
    }

    /// Whether the row id is stored inside the record data
    pub fn has_index_field_in_data(&self) -> bool {
        self.index_field.is_some()
    }

    /// Size of a materialized record in bytes
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Byte offset of the row id within a materialized record.
    ///
    /// Records with an external id carry it in the leading slot, so the
    /// offset is 0 in that case too.
    pub fn index_field_offset(&self) -> usize {
        self.index_field.map_or(0, |index| self.offsets[index])
    }

    /// Byte offset of the parent index field, if the table has one
    pub fn parent_index_field_offset(&self) -> Option<usize> {
        self.parent_index_field.map(|index| self.offsets[index])
    }

    /// Byte offset of a field within a materialized record
    pub fn field_offset(&self, field: usize) -> Option<usize> {
        self.offsets.get(field).copied()
    }

    /// Position of the index among flattened array elements
    pub fn db_index_field(&self) -> usize {
        self.index_field.map_or(0, |index| {
            self.fields[..index].iter().map(|f| f.array_size).sum()
        })
    }

    /// Number of flattened array elements, plus one for an external id
    pub fn db_field_count(&self) -> usize {
        let elements: usize = self.fields.iter().map(|f| f.array_size).sum();
        if self.has_index_field_in_data() {
            elements
        } else {
            elements + 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn sample(index: Option<usize>) -> TableSchema {
        TableSchema::new(
            "Sample",
            vec![
                SchemaField::new("id", FieldType::Int),
                SchemaField::new_array("pair", FieldType::Short, 2),
                SchemaField::new("kind", FieldType::Byte),
            ],
            index,
            Some(2),
            0xDEAD_BEEF,
        )
        .unwrap()
    }

    #[test]
    fn test_embedded_index_record_size() {
        let schema = sample(Some(0));
        assert_eq!(schema.record_size(), 9);
        assert_eq!(schema.index_field_offset(), 0);
        assert_eq!(schema.field_offset(1), Some(4));
        assert_eq!(schema.field_offset(2), Some(8));
        assert_eq!(schema.parent_index_field_offset(), Some(8));
        assert_eq!(schema.db_field_count(), 4);
    }

    #[test]
    fn test_external_index_shifts_offsets() {
        let schema = sample(None);
        assert_eq!(schema.record_size(), 13);
        assert_eq!(schema.index_field_offset(), 0);
        assert_eq!(schema.field_offset(0), Some(4));
        assert_eq!(schema.parent_index_field_offset(), Some(12));
        assert_eq!(schema.db_field_count(), 5);
    }

    #[test]
    fn test_index_offset_after_arrays() {
        let schema = TableSchema::from_format("T", "fShi", &[3, 1, 2, 1], Some(3), None, 0).unwrap();
        assert_eq!(schema.index_field_offset(), 12 + 4 + 4);
        assert_eq!(schema.db_index_field(), 3 + 1 + 2);
    }

    #[test_case('b', 1)]
    #[test_case('h', 2)]
    #[test_case('i', 4)]
    #[test_case('f', 4)]
    #[test_case('l', 8)]
    #[test_case('s', 4)]
    #[test_case('S', 4)]
    fn test_format_char_widths(c: char, width: usize) {
        let ty = FieldType::from_format_char(c).unwrap();
        assert_eq!(ty.size(), width);
        assert_eq!(ty.format_char(), c);
    }

    #[test]
    fn test_unknown_format_char() {
        assert!(matches!(
            TableSchema::from_format("T", "ix", &[], None, None, 0),
            Err(Error::SchemaValidation(_))
        ));
    }

    #[test]
    fn test_index_must_be_scalar_int() {
        let result = TableSchema::from_format("T", "fi", &[], Some(0), None, 0);
        assert!(matches!(result, Err(Error::SchemaValidation(_))));

        let result = TableSchema::from_format("T", "i", &[], Some(4), None, 0);
        assert!(matches!(result, Err(Error::SchemaValidation(_))));
    }

    #[test]
    fn test_array_size_count_mismatch() {
        let result = TableSchema::from_format("T", "ii", &[1], None, None, 0);
        assert!(matches!(result, Err(Error::SchemaValidation(_))));
    }
}
