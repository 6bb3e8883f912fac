//! WDB5 table writing functionality
//!
//! Every column is stored at full width, so a written table decodes back to
//! the same materialized rows. Used for fixtures and conversion tools.

use crate::header::{FieldStructure, TableFlags, Wdb5Header};
use crate::schema::{FieldType, TableSchema};
use crate::types::RecordCopy;
use crate::{Error, Result};
use binrw::BinWrite;
use std::collections::HashMap;
use std::io::{Cursor, Write};

/// A single element value for [`Db2Writer`]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 8-bit integer
    Byte(u8),
    /// 16-bit integer
    Short(u16),
    /// 32-bit integer
    Int(u32),
    /// 32-bit float
    Float(f32),
    /// 64-bit integer
    Long(u64),
    /// String stored in the string block
    String(String),
}

impl Value {
    fn matches(&self, field_type: FieldType) -> bool {
        matches!(
            (self, field_type),
            (Value::Byte(_), FieldType::Byte)
                | (Value::Short(_), FieldType::Short)
                | (Value::Int(_), FieldType::Int)
                | (Value::Float(_), FieldType::Float)
                | (Value::Long(_), FieldType::Long)
                | (
                    Value::String(_),
                    FieldType::String | FieldType::LocalizedString
                )
        )
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

/// Builder for WDB5 tables
#[derive(Debug, Clone)]
pub struct Db2Writer<'a> {
    schema: &'a TableSchema,
    table_hash: u32,
    locale: u32,
    rows: Vec<(u32, Vec<Value>)>,
    copies: Vec<RecordCopy>,
}

impl<'a> Db2Writer<'a> {
    /// Create a writer for the given schema
    pub fn new(schema: &'a TableSchema) -> Self {
        Self {
            schema,
            table_hash: 0,
            locale: 0,
            rows: Vec::new(),
            copies: Vec::new(),
        }
    }

    /// Set the table hash written to the header
    pub fn with_table_hash(mut self, table_hash: u32) -> Self {
        self.table_hash = table_hash;
        self
    }

    /// Set the locale written to the header
    pub fn with_locale(mut self, locale: u32) -> Self {
        self.locale = locale;
        self
    }

    /// Add a row. `values` lists every array element of every field in order.
    ///
    /// When the schema embeds the index, the index value must equal `id`.
    pub fn add_row(&mut self, id: u32, values: Vec<Value>) -> Result<&mut Self> {
        let expected: usize = self.schema.fields().iter().map(|f| f.array_size).sum();
        if values.len() != expected {
            return Err(Error::SchemaValidation(format!(
                "{}: row {id} has {} values, schema needs {expected}",
                self.schema.name(),
                values.len()
            )));
        }

        let mut cursor = 0;
        for (position, field) in self.schema.fields().iter().enumerate() {
            for value in &values[cursor..cursor + field.array_size] {
                if !value.matches(field.field_type) {
                    return Err(Error::TypeConversion(format!(
                        "{}: field '{}' is {:?}, got {value:?}",
                        self.schema.name(),
                        field.name,
                        field.field_type
                    )));
                }
            }
            if self.schema.index_field() == Some(position) && values[cursor] != Value::Int(id) {
                return Err(Error::SchemaValidation(format!(
                    "{}: index value {:?} does not match row id {id}",
                    self.schema.name(),
                    values[cursor]
                )));
            }
            cursor += field.array_size;
        }

        self.rows.push((id, values));
        Ok(self)
    }

    /// Add a copy-table entry publishing `source_row_id` again as `new_row_id`
    pub fn add_copy(&mut self, source_row_id: u32, new_row_id: u32) -> &mut Self {
        self.copies
            .push(RecordCopy::new(source_row_id, new_row_id));
        self
    }

    /// Serialize the table
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        Ok(())
    }

    /// Serialize the table into a byte vector
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let (strings, string_offsets) = self.build_string_block();

        let mut structures = Vec::with_capacity(self.schema.field_count());
        let mut disk_offset = 0usize;
        for field in self.schema.fields() {
            let offset = u16::try_from(disk_offset).map_err(|_| {
                Error::SchemaValidation(format!(
                    "{}: record exceeds {} bytes",
                    self.schema.name(),
                    u16::MAX
                ))
            })?;
            structures.push(FieldStructure::for_width(field.field_type.size(), offset));
            disk_offset += field.size();
        }
        let record_size = disk_offset;

        let mut records = Vec::with_capacity(record_size * self.rows.len());
        for (_, values) in &self.rows {
            for value in values {
                match value {
                    Value::Byte(v) => records.push(*v),
                    Value::Short(v) => records.extend_from_slice(&v.to_le_bytes()),
                    Value::Int(v) => records.extend_from_slice(&v.to_le_bytes()),
                    Value::Float(v) => records.extend_from_slice(&v.to_le_bytes()),
                    Value::Long(v) => records.extend_from_slice(&v.to_le_bytes()),
                    Value::String(s) => {
                        let offset = string_offsets.get(s.as_str()).copied().unwrap_or(0);
                        records.extend_from_slice(&offset.to_le_bytes());
                    }
                }
            }
        }

        let external_ids = !self.schema.has_index_field_in_data();
        let flags = if external_ids {
            TableFlags::NON_INLINE_IDS
        } else {
            TableFlags::empty()
        };

        let header = Wdb5Header {
            record_count: self.rows.len() as u32,
            field_count: self.schema.field_count() as u32,
            record_size: record_size as u32,
            string_table_size: strings.len() as u32,
            table_hash: self.table_hash,
            layout_hash: self.schema.layout_hash(),
            min_id: self.rows.iter().map(|(id, _)| *id).min().unwrap_or(0),
            max_id: self.rows.iter().map(|(id, _)| *id).max().unwrap_or(0),
            locale: self.locale,
            copy_table_size: (self.copies.len() * RecordCopy::SIZE) as u32,
            flags: flags.bits(),
            id_index: self.schema.index_field().unwrap_or(0) as u16,
        };

        let mut out = Cursor::new(Vec::new());
        header
            .write(&mut out)
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;
        for structure in &structures {
            structure
                .write(&mut out)
                .map_err(|e| Error::InvalidHeader(e.to_string()))?;
        }

        let mut out = out.into_inner();
        out.extend_from_slice(&records);
        out.extend_from_slice(&strings);
        if external_ids {
            for (id, _) in &self.rows {
                out.extend_from_slice(&id.to_le_bytes());
            }
        }
        for copy in &self.copies {
            out.extend_from_slice(&copy.new_row_id.to_le_bytes());
            out.extend_from_slice(&copy.source_row_id.to_le_bytes());
        }

        Ok(out)
    }

    /// Build a string block; offset 0 is the empty string
    fn build_string_block(&self) -> (Vec<u8>, HashMap<&str, u32>) {
        let mut block = vec![0u8];
        let mut offsets = HashMap::new();
        offsets.insert("", 0);

        for (_, values) in &self.rows {
            for value in values {
                if let Value::String(s) = value {
                    offsets.entry(s.as_str()).or_insert_with(|| {
                        let offset = block.len() as u32;
                        block.extend_from_slice(s.as_bytes());
                        block.push(0);
                        offset
                    });
                }
            }
        }

        (block, offsets)
    }
}
