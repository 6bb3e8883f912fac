//! Map registry decoded from `Map.db2`

use crate::error::{Error, Result};
use crate::storage::ArchiveStorage;
use std::collections::btree_map::{self, BTreeMap};
use std::collections::BTreeSet;
use wow_db2::{Db2Table, FieldType, RecordCopy, SchemaField, TableSchema};

/// Archive path of the Map table
pub const MAP_TABLE_PATH: &str = "DBFilesClient\\Map.db2";

/// Map directory names must be shorter than this many bytes
pub const MAP_NAME_LIMIT: usize = 64;

/// Layout hash of the supported Map table
pub const MAP_LAYOUT_HASH: u32 = 0xF568_DF12;

/// Schema of the supported Map table; the row id is not stored in the record
pub fn map_schema() -> wow_db2::Result<TableSchema> {
    TableSchema::new(
        "Map",
        vec![
            SchemaField::new("Directory", FieldType::String),
            SchemaField::new_array("Flags", FieldType::Int, 2),
            SchemaField::new("MinimapIconScale", FieldType::Float),
            SchemaField::new_array("CorpsePos", FieldType::Float, 2),
            SchemaField::new("MapName", FieldType::LocalizedString),
            SchemaField::new("MapDescription0", FieldType::LocalizedString),
            SchemaField::new("MapDescription1", FieldType::LocalizedString),
            SchemaField::new("AreaTableID", FieldType::Short),
            SchemaField::new("LoadingScreenID", FieldType::Short),
            SchemaField::new("CorpseMapID", FieldType::Short),
            SchemaField::new("TimeOfDayOverride", FieldType::Short),
            SchemaField::new("ParentMapID", FieldType::Short),
            SchemaField::new("CosmeticParentMapID", FieldType::Short),
            SchemaField::new("WindSettingsID", FieldType::Short),
            SchemaField::new("InstanceType", FieldType::Byte),
            SchemaField::new("MapType", FieldType::Byte),
            SchemaField::new("ExpansionID", FieldType::Byte),
            SchemaField::new("MaxImageIndex", FieldType::Byte),
            SchemaField::new("TimeOffset", FieldType::Byte),
        ],
        None,
        None,
        MAP_LAYOUT_HASH,
    )
}

/// One map: its directory name and the map it inherits tiles from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapEntry {
    pub name: String,
    pub parent_id: Option<u32>,
}

/// Maps by id, in ascending id order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MapRegistry {
    maps: BTreeMap<u32, MapEntry>,
    parent_ids: BTreeSet<u32>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and decode the Map table from storage
    pub fn load<S: ArchiveStorage>(storage: &S) -> Result<Self> {
        let data = storage
            .read_named(MAP_TABLE_PATH)?
            .ok_or_else(|| Error::MissingTable(MAP_TABLE_PATH.to_string()))?;
        let schema = map_schema()?;
        let table = Db2Table::from_bytes(&data, &schema)?;
        let registry = Self::from_table(&table)?;
        log::info!("Loaded {} maps", registry.len());
        Ok(registry)
    }

    /// Build the registry from a decoded table: primary rows, then copies
    pub fn from_table(table: &Db2Table) -> Result<Self> {
        let schema = table.schema();
        let directory = field_position(schema, "Directory")?;
        let parent = field_position(schema, "ParentMapID")?;
        let cosmetic_parent = field_position(schema, "CosmeticParentMapID")?;

        let mut registry = Self::new();
        for record in table.records() {
            let name = record.get_string(directory, 0)?;
            let mut parent_id = record.get_i16(parent, 0)?;
            if parent_id < 0 {
                parent_id = record.get_i16(cosmetic_parent, 0)?;
            }
            let parent_id = u32::try_from(parent_id).ok();
            registry.insert_primary(record.id(), name, parent_id)?;
        }

        registry.apply_copies(table.copies());
        Ok(registry)
    }

    /// Add a primary row; its parent joins the parent set
    pub fn insert_primary(&mut self, id: u32, name: &str, parent_id: Option<u32>) -> Result<()> {
        if name.len() >= MAP_NAME_LIMIT {
            return Err(Error::MapNameTooLong {
                map_id: id,
                name: name.to_string(),
                limit: MAP_NAME_LIMIT,
            });
        }

        if let Some(parent) = parent_id {
            self.parent_ids.insert(parent);
        }
        self.maps.insert(
            id,
            MapEntry {
                name: name.to_string(),
                parent_id,
            },
        );
        Ok(())
    }

    /// Publish copy rows under their new ids. Copies of unknown rows are
    /// ignored and the parent set is left unchanged.
    pub fn apply_copies(&mut self, copies: &[RecordCopy]) {
        for copy in copies {
            let Some(source) = self.maps.get(&copy.source_row_id).cloned() else {
                log::debug!(
                    "Ignoring copy of unknown map {} as {}",
                    copy.source_row_id,
                    copy.new_row_id
                );
                continue;
            };
            self.maps.insert(copy.new_row_id, source);
        }
    }

    pub fn get(&self, id: u32) -> Option<&MapEntry> {
        self.maps.get(&id)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, u32, MapEntry> {
        self.maps.iter()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }

    /// Whether another map names this one as its parent
    pub fn is_parent(&self, id: u32) -> bool {
        self.parent_ids.contains(&id)
    }

    pub fn parent_ids(&self) -> &BTreeSet<u32> {
        &self.parent_ids
    }
}

pub(crate) fn field_position(schema: &TableSchema, name: &str) -> Result<usize> {
    schema.field_position(name).ok_or_else(|| {
        Error::Table(wow_db2::Error::FieldAccess(format!(
            "{} has no field {name}",
            schema.name()
        )))
    })
}
