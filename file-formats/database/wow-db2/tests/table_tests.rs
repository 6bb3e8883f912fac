use pretty_assertions::assert_eq;
use proptest::prelude::*;
use wow_db2::{
    Db2Table, Db2Writer, Error, FieldType, RecordCopy, SchemaField, TableSchema, Value,
};

const LAYOUT: u32 = 0x1234_5678;

fn external_id_schema() -> TableSchema {
    TableSchema::new(
        "Map",
        vec![
            SchemaField::new("Directory", FieldType::String),
            SchemaField::new_array("Flags", FieldType::Int, 2),
            SchemaField::new("Name", FieldType::LocalizedString),
            SchemaField::new("ParentMapID", FieldType::Short),
            SchemaField::new("Expansion", FieldType::Byte),
        ],
        None,
        Some(3),
        LAYOUT,
    )
    .unwrap()
}

fn map_row(directory: &str, parent: i16) -> Vec<Value> {
    vec![
        directory.into(),
        Value::Int(1),
        Value::Int(2),
        directory.into(),
        Value::Short(parent as u16),
        Value::Byte(0),
    ]
}

#[test]
fn test_decode_external_ids_and_copies() {
    let schema = external_id_schema();
    let mut writer = Db2Writer::new(&schema);
    writer.add_row(0, map_row("Azeroth", -1)).unwrap();
    writer.add_row(1, map_row("Kalimdor", 0)).unwrap();
    writer.add_copy(0, 2);
    let bytes = writer.to_bytes().unwrap();

    let table = Db2Table::from_bytes(&bytes, &schema).unwrap();
    assert_eq!(table.record_count(), 2);
    assert_eq!(table.copies(), &[RecordCopy::new(0, 2)]);

    let kalimdor = table.record_by_id(1).unwrap();
    assert_eq!(kalimdor.get_string(0, 0).unwrap(), "Kalimdor");
    assert_eq!(kalimdor.get_u32(1, 1).unwrap(), 2);
    assert_eq!(kalimdor.get_string(2, 0).unwrap(), "Kalimdor");
    assert_eq!(kalimdor.get_i16(3, 0).unwrap(), 0);

    let azeroth = table.record(0).unwrap();
    assert_eq!(azeroth.id(), 0);
    assert_eq!(azeroth.get_i16(3, 0).unwrap(), -1);
    // The external id occupies the leading slot of the materialized record.
    assert_eq!(&azeroth.data()[..4], &0u32.to_le_bytes());
    assert_eq!(azeroth.data().len(), schema.record_size());
}

#[test]
fn test_decode_embedded_index() {
    let schema = TableSchema::new(
        "Embedded",
        vec![
            SchemaField::new("Value", FieldType::Float),
            SchemaField::new("ID", FieldType::Int),
        ],
        Some(1),
        None,
        LAYOUT,
    )
    .unwrap();

    let mut writer = Db2Writer::new(&schema);
    writer
        .add_row(42, vec![Value::Float(1.5), Value::Int(42)])
        .unwrap();
    writer
        .add_row(7, vec![Value::Float(-2.0), Value::Int(7)])
        .unwrap();
    let table = Db2Table::from_bytes(&writer.to_bytes().unwrap(), &schema).unwrap();

    let ids: Vec<u32> = table.records().map(|r| r.id()).collect();
    assert_eq!(ids, vec![42, 7]);
    assert_eq!(table.record_by_id(7).unwrap().get_f32(0, 0).unwrap(), -2.0);
    assert!(!table.header().has_id_list());
}

#[test]
fn test_writer_rejects_index_mismatch() {
    let schema = TableSchema::from_format("T", "i", &[], Some(0), None, LAYOUT).unwrap();
    let mut writer = Db2Writer::new(&schema);
    assert!(matches!(
        writer.add_row(3, vec![Value::Int(4)]),
        Err(Error::SchemaValidation(_))
    ));
    assert!(matches!(
        writer.add_row(3, vec![Value::Float(3.0)]),
        Err(Error::TypeConversion(_))
    ));
}

/// Hand-built table with compressed columns: a 1-byte int and a 1-byte short
fn compressed_table(layout: u32, flags: u16, truncate: usize) -> Vec<u8> {
    let mut data = Vec::new();
    data.extend_from_slice(b"WDB5");
    data.extend_from_slice(&2u32.to_le_bytes()); // record_count
    data.extend_from_slice(&2u32.to_le_bytes()); // field_count
    data.extend_from_slice(&2u32.to_le_bytes()); // record_size
    data.extend_from_slice(&1u32.to_le_bytes()); // string_table_size
    data.extend_from_slice(&0u32.to_le_bytes()); // table_hash
    data.extend_from_slice(&layout.to_le_bytes());
    data.extend_from_slice(&10u32.to_le_bytes()); // min_id
    data.extend_from_slice(&11u32.to_le_bytes()); // max_id
    data.extend_from_slice(&0u32.to_le_bytes()); // locale
    data.extend_from_slice(&0u32.to_le_bytes()); // copy_table_size
    data.extend_from_slice(&flags.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes()); // id_index

    // Field structures: both columns stored in one byte
    data.extend_from_slice(&24i16.to_le_bytes());
    data.extend_from_slice(&0u16.to_le_bytes());
    data.extend_from_slice(&24i16.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());

    data.extend_from_slice(&[0xFE, 0x80]);
    data.extend_from_slice(&[0x01, 0x02]);
    data.push(0); // string block
    data.extend_from_slice(&10u32.to_le_bytes());
    data.extend_from_slice(&11u32.to_le_bytes());

    data.truncate(data.len() - truncate);
    data
}

fn compressed_schema() -> TableSchema {
    TableSchema::from_format("Compressed", "ih", &[], None, None, LAYOUT).unwrap()
}

#[test]
fn test_narrow_columns_are_zero_extended() {
    let table = Db2Table::from_bytes(&compressed_table(LAYOUT, 0x04, 0), &compressed_schema())
        .unwrap();

    let first = table.record(0).unwrap();
    assert_eq!(first.id(), 10);
    assert_eq!(first.get_u32(0, 0).unwrap(), 0xFE);
    assert_eq!(first.get_u16(1, 0).unwrap(), 0x80);

    let second = table.record_by_id(11).unwrap();
    assert_eq!(second.get_u32(0, 0).unwrap(), 1);
    assert_eq!(second.get_u16(1, 0).unwrap(), 2);
}

#[test]
fn test_layout_mismatch_is_rejected() {
    let result = Db2Table::from_bytes(&compressed_table(0xFFFF, 0x04, 0), &compressed_schema());
    assert!(matches!(
        result,
        Err(Error::LayoutMismatch {
            expected: LAYOUT,
            found: 0xFFFF
        })
    ));
}

#[test]
fn test_truncated_source_is_rejected() {
    let result = Db2Table::from_bytes(&compressed_table(LAYOUT, 0x04, 3), &compressed_schema());
    assert!(matches!(result, Err(Error::Truncated { .. })));

    let result = Db2Table::from_bytes(b"WDB5", &compressed_schema());
    assert!(matches!(result, Err(Error::Truncated { .. })));
}

#[test]
fn test_offset_map_is_unsupported() {
    let result = Db2Table::from_bytes(&compressed_table(LAYOUT, 0x05, 0), &compressed_schema());
    assert!(matches!(result, Err(Error::Unsupported(_))));
}

#[test]
fn test_id_list_must_match_schema() {
    // Flags say the ids are inline, the schema says they are external.
    let result = Db2Table::from_bytes(&compressed_table(LAYOUT, 0x00, 0), &compressed_schema());
    assert!(matches!(result, Err(Error::SchemaValidation(_))));
}

#[test]
fn test_wider_disk_column_is_rejected() {
    let schema = TableSchema::from_format("Compressed", "bh", &[], None, None, LAYOUT).unwrap();
    let mut data = compressed_table(LAYOUT, 0x04, 0);
    // First column declared as 4 bytes wide while the schema holds a byte
    data[48..50].copy_from_slice(&0i16.to_le_bytes());
    assert!(matches!(
        Db2Table::from_bytes(&data, &schema),
        Err(Error::SchemaValidation(_))
    ));
}

#[test]
fn test_accessor_contract_violations() {
    let schema = external_id_schema();
    let mut writer = Db2Writer::new(&schema);
    writer.add_row(0, map_row("Azeroth", -1)).unwrap();
    let table = Db2Table::from_bytes(&writer.to_bytes().unwrap(), &schema).unwrap();
    let record = table.record(0).unwrap();

    assert!(matches!(record.get_u32(9, 0), Err(Error::FieldAccess(_))));
    assert!(matches!(record.get_u32(1, 2), Err(Error::FieldAccess(_))));
    assert!(matches!(record.get_f32(1, 0), Err(Error::FieldAccess(_))));
    assert!(matches!(record.get_u8(0, 0), Err(Error::FieldAccess(_))));
    assert_eq!(record.field_index("ParentMapID").unwrap(), 3);
    assert!(matches!(
        record.field_index("Missing"),
        Err(Error::FieldAccess(_))
    ));
}

fn field_type() -> impl Strategy<Value = FieldType> {
    prop_oneof![
        Just(FieldType::Byte),
        Just(FieldType::Short),
        Just(FieldType::Int),
        Just(FieldType::Float),
        Just(FieldType::Long),
        Just(FieldType::LocalizedString),
        Just(FieldType::String),
    ]
}

proptest! {
    #[test]
    fn prop_record_size_is_sum_of_fields(
        fields in prop::collection::vec((field_type(), 1usize..5), 1..12),
        embed in any::<bool>(),
    ) {
        let mut fields: Vec<SchemaField> = fields
            .into_iter()
            .enumerate()
            .map(|(i, (ty, n))| SchemaField::new_array(format!("f{i}"), ty, n))
            .collect();
        let index = if embed {
            fields.insert(0, SchemaField::new("ID", FieldType::Int));
            Some(0)
        } else {
            None
        };

        let expected: usize = fields.iter().map(|f| f.field_type.size() * f.array_size).sum::<usize>()
            + if embed { 0 } else { 4 };
        let schema = TableSchema::new("Prop", fields, index, None, 0).unwrap();
        prop_assert_eq!(schema.record_size(), expected);
        prop_assert_eq!(schema.index_field_offset(), 0);
    }

    #[test]
    fn prop_index_offset_is_prefix_sum(
        before in prop::collection::vec((field_type(), 1usize..4), 0..8),
    ) {
        let prefix: usize = before.iter().map(|(ty, n)| ty.size() * n).sum();
        let mut fields: Vec<SchemaField> = before
            .into_iter()
            .enumerate()
            .map(|(i, (ty, n))| SchemaField::new_array(format!("f{i}"), ty, n))
            .collect();
        let position = fields.len();
        fields.push(SchemaField::new("ID", FieldType::Int));

        let schema = TableSchema::new("Prop", fields, Some(position), None, 0).unwrap();
        prop_assert_eq!(schema.index_field_offset(), prefix);
        for pair in (0..=position).collect::<Vec<_>>().windows(2) {
            prop_assert!(schema.field_offset(pair[0]) <= schema.field_offset(pair[1]));
        }
    }
}
