//! Schema-driven WDB5 table loading

use crate::header::{FieldStructure, TableFlags, Wdb5Header};
use crate::record::TableRecord;
use crate::schema::TableSchema;
use crate::stringblock::StringBlock;
use crate::types::RecordCopy;
use crate::{Error, Result};
use binrw::BinReaderExt;
use std::io::{Cursor, Read};

/// A decoded table: materialized rows, row ids, copy entries and strings
#[derive(Debug, Clone)]
pub struct Db2Table {
    schema: TableSchema,
    header: Wdb5Header,
    rows: Vec<u8>,
    ids: Vec<u32>,
    copies: Vec<RecordCopy>,
    strings: StringBlock,
}

/// Where one on-disk column lands in a materialized record
#[derive(Debug, Clone, Copy)]
struct ColumnMapping {
    disk_offset: usize,
    disk_width: usize,
    target_offset: usize,
    target_width: usize,
    array_size: usize,
}

impl Db2Table {
    /// Read a whole table from a reader and decode it
    pub fn parse<R: Read>(reader: &mut R, schema: &TableSchema) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data, schema)
    }

    /// Decode a table from memory
    pub fn from_bytes(data: &[u8], schema: &TableSchema) -> Result<Self> {
        let available = data.len() as u64;
        if data.len() < Wdb5Header::SIZE {
            return Err(Error::Truncated {
                expected: Wdb5Header::SIZE as u64,
                found: available,
            });
        }

        let header: Wdb5Header = Cursor::new(data)
            .read_le()
            .map_err(|e| Error::InvalidHeader(e.to_string()))?;

        validate_header(&header, schema)?;

        let field_table_size = u64::from(header.field_count) * FieldStructure::SIZE as u64;
        let records_size = u64::from(header.record_count) * u64::from(header.record_size);
        let id_list_size = if header.has_id_list() {
            u64::from(header.record_count) * 4
        } else {
            0
        };
        let required = Wdb5Header::SIZE as u64
            + field_table_size
            + records_size
            + u64::from(header.string_table_size)
            + id_list_size
            + u64::from(header.copy_table_size);
        if required > available {
            return Err(Error::Truncated {
                expected: required,
                found: available,
            });
        }

        // Every section fits, so the offsets below stay inside `data`.
        let mut cursor = Wdb5Header::SIZE;
        let mut reader = Cursor::new(&data[cursor..cursor + field_table_size as usize]);
        let mut structures = Vec::with_capacity(header.field_count as usize);
        for _ in 0..header.field_count {
            let structure: FieldStructure = reader
                .read_le()
                .map_err(|e| Error::InvalidHeader(e.to_string()))?;
            structures.push(structure);
        }
        cursor += field_table_size as usize;

        let columns = map_columns(&header, &structures, schema)?;

        let record_size = header.record_size as usize;
        let records = &data[cursor..cursor + records_size as usize];
        cursor += records_size as usize;

        let strings = StringBlock::new(
            data[cursor..cursor + header.string_table_size as usize].to_vec(),
        );
        cursor += header.string_table_size as usize;

        let id_list = if header.has_id_list() {
            let bytes = &data[cursor..cursor + id_list_size as usize];
            cursor += id_list_size as usize;
            Some(bytes)
        } else {
            None
        };

        let copy_bytes = &data[cursor..cursor + header.copy_table_size as usize];

        let target_size = schema.record_size();
        let mut rows = vec![0u8; target_size * header.record_count as usize];
        let mut ids = Vec::with_capacity(header.record_count as usize);

        for index in 0..header.record_count as usize {
            let disk = &records[index * record_size..(index + 1) * record_size];
            let row = &mut rows[index * target_size..(index + 1) * target_size];
            materialize(disk, row, &columns);

            let id = match id_list {
                Some(list) => {
                    let id = read_u32(list, index * 4);
                    row[..4].copy_from_slice(&id.to_le_bytes());
                    id
                }
                None => read_u32(row, schema.index_field_offset()),
            };
            ids.push(id);
        }

        let copies = copy_bytes
            .chunks_exact(RecordCopy::SIZE)
            .map(|entry| RecordCopy::new(read_u32(entry, 4), read_u32(entry, 0)))
            .collect::<Vec<_>>();

        log::debug!(
            "Decoded {}: {} records, {} copies, {} string bytes",
            schema.name(),
            ids.len(),
            copies.len(),
            strings.size()
        );

        Ok(Self {
            schema: schema.clone(),
            header,
            rows,
            ids,
            copies,
            strings,
        })
    }

    /// The schema the table was decoded with
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// The file header
    pub fn header(&self) -> &Wdb5Header {
        &self.header
    }

    /// Number of primary records
    pub fn record_count(&self) -> usize {
        self.ids.len()
    }

    /// Get a primary record by position
    pub fn record(&self, index: usize) -> Option<TableRecord<'_>> {
        let size = self.schema.record_size();
        let id = *self.ids.get(index)?;
        let data = self.rows.get(index * size..(index + 1) * size)?;
        Some(TableRecord::new(id, data, &self.schema, &self.strings))
    }

    /// Find a primary record by row id
    pub fn record_by_id(&self, id: u32) -> Option<TableRecord<'_>> {
        self.ids
            .iter()
            .position(|&row_id| row_id == id)
            .and_then(|index| self.record(index))
    }

    /// Iterate over primary records in file order
    pub fn records(&self) -> impl Iterator<Item = TableRecord<'_>> + '_ {
        (0..self.ids.len()).filter_map(move |index| self.record(index))
    }

    /// Copy-table entries in file order
    pub fn copies(&self) -> &[RecordCopy] {
        &self.copies
    }

    /// The string block
    pub fn strings(&self) -> &StringBlock {
        &self.strings
    }
}

fn validate_header(header: &Wdb5Header, schema: &TableSchema) -> Result<()> {
    if header.layout_hash != schema.layout_hash() {
        return Err(Error::LayoutMismatch {
            expected: schema.layout_hash(),
            found: header.layout_hash,
        });
    }

    if header.field_count as usize != schema.field_count() {
        return Err(Error::SchemaValidation(format!(
            "{}: file declares {} fields, schema has {}",
            schema.name(),
            header.field_count,
            schema.field_count()
        )));
    }

    let flags = header.table_flags();
    if flags.contains(TableFlags::OFFSET_MAP) {
        return Err(Error::Unsupported(format!(
            "{}: offset-map tables are not supported",
            schema.name()
        )));
    }

    if header.has_id_list() == schema.has_index_field_in_data() {
        return Err(Error::SchemaValidation(format!(
            "{}: id list present: {}, schema expects index in data: {}",
            schema.name(),
            header.has_id_list(),
            schema.has_index_field_in_data()
        )));
    }

    if header.copy_table_size as usize % RecordCopy::SIZE != 0 {
        return Err(Error::InvalidHeader(format!(
            "copy table size {} is not a multiple of {}",
            header.copy_table_size,
            RecordCopy::SIZE
        )));
    }

    Ok(())
}

fn map_columns(
    header: &Wdb5Header,
    structures: &[FieldStructure],
    schema: &TableSchema,
) -> Result<Vec<ColumnMapping>> {
    schema
        .fields()
        .iter()
        .zip(structures)
        .enumerate()
        .map(|(position, (field, structure))| {
            let disk_width = structure.byte_width();
            let target_width = field.field_type.size();
            if disk_width == 0 || disk_width > target_width {
                return Err(Error::SchemaValidation(format!(
                    "{}: column '{}' stored with {disk_width} bytes, schema type {:?} holds {target_width}",
                    schema.name(),
                    field.name,
                    field.field_type
                )));
            }

            let disk_offset = structure.offset as usize;
            let disk_end = disk_offset + disk_width * field.array_size;
            if disk_end > header.record_size as usize {
                return Err(Error::SchemaValidation(format!(
                    "{}: column '{}' ends at {disk_end}, record size is {}",
                    schema.name(),
                    field.name,
                    header.record_size
                )));
            }

            Ok(ColumnMapping {
                disk_offset,
                disk_width,
                target_offset: schema.field_offset(position).unwrap_or_default(),
                target_width,
                array_size: field.array_size,
            })
        })
        .collect()
}

/// Copy every column element into its schema slot, zero-extending narrow columns
fn materialize(disk: &[u8], row: &mut [u8], columns: &[ColumnMapping]) {
    for column in columns {
        for element in 0..column.array_size {
            let src = column.disk_offset + element * column.disk_width;
            let dst = column.target_offset + element * column.target_width;
            row[dst..dst + column.disk_width].copy_from_slice(&disk[src..src + column.disk_width]);
        }
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(buf)
}
