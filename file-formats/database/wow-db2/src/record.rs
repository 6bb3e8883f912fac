//! Typed access to materialized records

use crate::schema::{FieldType, TableSchema};
use crate::stringblock::StringBlock;
use crate::{Error, Result, StringRef};

/// A decoded row: a fixed-size byte span laid out per [`TableSchema`] plus its row id
#[derive(Debug, Clone, Copy)]
pub struct TableRecord<'a> {
    id: u32,
    data: &'a [u8],
    schema: &'a TableSchema,
    strings: &'a StringBlock,
}

impl<'a> TableRecord<'a> {
    pub(crate) fn new(
        id: u32,
        data: &'a [u8],
        schema: &'a TableSchema,
        strings: &'a StringBlock,
    ) -> Self {
        Self {
            id,
            data,
            schema,
            strings,
        }
    }

    /// Row id
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Raw materialized bytes
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Schema the record was decoded with
    pub fn schema(&self) -> &'a TableSchema {
        self.schema
    }

    /// Get an unsigned byte
    pub fn get_u8(&self, field: usize, array_index: usize) -> Result<u8> {
        let bytes = self.element::<1>(field, array_index, &[FieldType::Byte])?;
        Ok(bytes[0])
    }

    /// Get an unsigned 16-bit value
    pub fn get_u16(&self, field: usize, array_index: usize) -> Result<u16> {
        self.element(field, array_index, &[FieldType::Short])
            .map(u16::from_le_bytes)
    }

    /// Get a signed 16-bit value
    pub fn get_i16(&self, field: usize, array_index: usize) -> Result<i16> {
        self.element(field, array_index, &[FieldType::Short])
            .map(i16::from_le_bytes)
    }

    /// Get an unsigned 32-bit value
    pub fn get_u32(&self, field: usize, array_index: usize) -> Result<u32> {
        self.element(field, array_index, &[FieldType::Int])
            .map(u32::from_le_bytes)
    }

    /// Get a signed 32-bit value
    pub fn get_i32(&self, field: usize, array_index: usize) -> Result<i32> {
        self.element(field, array_index, &[FieldType::Int])
            .map(i32::from_le_bytes)
    }

    /// Get a 32-bit float
    pub fn get_f32(&self, field: usize, array_index: usize) -> Result<f32> {
        self.element(field, array_index, &[FieldType::Float])
            .map(f32::from_le_bytes)
    }

    /// Get an unsigned 64-bit value
    pub fn get_u64(&self, field: usize, array_index: usize) -> Result<u64> {
        self.element(field, array_index, &[FieldType::Long])
            .map(u64::from_le_bytes)
    }

    /// Get a localized or plain string
    pub fn get_string(&self, field: usize, array_index: usize) -> Result<&'a str> {
        let offset = self
            .element(
                field,
                array_index,
                &[FieldType::String, FieldType::LocalizedString],
            )
            .map(u32::from_le_bytes)?;
        self.strings.get_string(StringRef::new(offset))
    }

    /// Position of a named field, for use with the typed accessors
    pub fn field_index(&self, name: &str) -> Result<usize> {
        self.schema.field_position(name).ok_or_else(|| {
            Error::FieldAccess(format!("{}: no field named '{name}'", self.schema.name()))
        })
    }

    fn element<const N: usize>(
        &self,
        field: usize,
        array_index: usize,
        allowed: &[FieldType],
    ) -> Result<[u8; N]> {
        let def = self.schema.field(field).ok_or_else(|| {
            Error::FieldAccess(format!(
                "{}: field {field} out of range (fields: {})",
                self.schema.name(),
                self.schema.field_count()
            ))
        })?;

        if !allowed.contains(&def.field_type) || def.field_type.size() != N {
            return Err(Error::FieldAccess(format!(
                "{}: field '{}' is {:?}, not {:?}",
                self.schema.name(),
                def.name,
                def.field_type,
                allowed[0]
            )));
        }

        if array_index >= def.array_size {
            return Err(Error::FieldAccess(format!(
                "{}: index {array_index} out of range for '{}' (size: {})",
                self.schema.name(),
                def.name,
                def.array_size
            )));
        }

        let start = self.schema.field_offset(field).unwrap_or_default() + array_index * N;
        self.data
            .get(start..start + N)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                Error::OutOfBounds(format!(
                    "{}: record of {} bytes has no element at {start}",
                    self.schema.name(),
                    self.data.len()
                ))
            })
    }
}
