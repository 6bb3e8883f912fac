//! Game object models listed in `GameObjectDisplayInfo.db2`
//!
//! Every display with a model file is converted like any building or doodad
//! model. Displays whose model has an output afterwards are listed in
//! `<output>/temp_gameobject_models`:
//!
//! ```text
//! magic "VMAP_4.B"
//! per display: display id (u32), is building (u8), name length (u32), name
//! ```

use crate::building::BuildingExtractor;
use crate::error::{Error, Result};
use crate::map_registry::field_position;
use crate::storage::{ArchiveStorage, FileRef};
use crate::vmap::RAW_VMAP_MAGIC;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use wow_db2::{Db2Table, FieldType, SchemaField, TableSchema};

/// Archive path of the display table
pub const GAMEOBJECT_TABLE_PATH: &str = "DBFilesClient\\GameObjectDisplayInfo.db2";

/// Layout hash of the supported display table
pub const GAMEOBJECT_LAYOUT_HASH: u32 = 0x9F20_98D1;

/// Name of the model list inside the output directory
pub const MODEL_LIST_FILE: &str = "temp_gameobject_models";

/// First bytes of a building root (`MVER` as stored)
const WMO_HEADER_MAGIC: &[u8; 4] = b"REVM";

/// Schema of the supported display table; the row id is not stored in the record
pub fn gameobject_display_schema() -> wow_db2::Result<TableSchema> {
    TableSchema::new(
        "GameObjectDisplayInfo",
        vec![
            SchemaField::new("FileDataID", FieldType::Int),
            SchemaField::new_array("GeoBox", FieldType::Float, 6),
            SchemaField::new("OverrideLootEffectScale", FieldType::Float),
            SchemaField::new("OverrideNameScale", FieldType::Float),
            SchemaField::new("ObjectEffectPackageID", FieldType::Short),
        ],
        None,
        None,
        GAMEOBJECT_LAYOUT_HASH,
    )
}

/// One entry of the model list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameObjectModel {
    pub display_id: u32,
    /// The model is a building rather than a doodad model
    pub is_wmo: bool,
    /// Output file name
    pub name: String,
}

impl GameObjectModel {
    pub fn write<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.display_id)?;
        writer.write_u8(u8::from(self.is_wmo))?;
        writer.write_u32::<LittleEndian>(self.name.len() as u32)?;
        writer.write_all(self.name.as_bytes())?;
        Ok(())
    }

    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let display_id = reader.read_u32::<LittleEndian>()?;
        let is_wmo = reader.read_u8()? != 0;
        let name_len = reader.read_u32::<LittleEndian>()? as usize;
        let mut name = vec![0u8; name_len];
        reader.read_exact(&mut name)?;
        Ok(Self {
            display_id,
            is_wmo,
            name: String::from_utf8_lossy(&name).into_owned(),
        })
    }
}

/// Read a model list file
pub fn read_model_list(data: &[u8]) -> Result<Vec<GameObjectModel>> {
    let Some(body) = data.strip_prefix(RAW_VMAP_MAGIC.as_slice()) else {
        return Err(Error::invalid_chunk(MODEL_LIST_FILE, "missing magic"));
    };

    let mut cursor = io::Cursor::new(body);
    let mut models = Vec::new();
    while (cursor.position() as usize) < body.len() {
        models.push(GameObjectModel::read(&mut cursor)?);
    }
    Ok(models)
}

/// Convert the model of every display and write the model list.
///
/// A client without the display table gets an empty list. A table that
/// does not match the supported layout aborts the run.
pub fn extract_gameobject_models<S: ArchiveStorage>(
    storage: &S,
    buildings: &mut BuildingExtractor,
) -> Result<Vec<GameObjectModel>> {
    let models = match storage.read_named(GAMEOBJECT_TABLE_PATH)? {
        Some(data) => {
            let schema = gameobject_display_schema()?;
            let table = Db2Table::from_bytes(&data, &schema)?;
            convert_displays(storage, buildings, &table)?
        }
        None => {
            log::warn!("{GAMEOBJECT_TABLE_PATH} not found, no game object models extracted");
            Vec::new()
        }
    };

    let path = buildings.output_dir().join(MODEL_LIST_FILE);
    let mut out = BufWriter::new(File::create(&path)?);
    out.write_all(RAW_VMAP_MAGIC)?;
    for model in &models {
        model.write(&mut out)?;
    }
    out.flush()?;

    log::info!("Extracted {} game object models", models.len());
    Ok(models)
}

fn convert_displays<S: ArchiveStorage>(
    storage: &S,
    buildings: &mut BuildingExtractor,
    table: &Db2Table,
) -> Result<Vec<GameObjectModel>> {
    let file_data_id = field_position(table.schema(), "FileDataID")?;

    let mut models = Vec::new();
    for record in table.records() {
        let file_id = record.get_u32(file_data_id, 0)?;
        if file_id == 0 {
            continue;
        }

        let Some(data) = storage.read_file(FileRef::Id(file_id))? else {
            log::debug!("Model file {file_id} of display {} not in storage", record.id());
            continue;
        };
        let name = FileRef::Id(file_id).to_string();
        let is_wmo = data.starts_with(WMO_HEADER_MAGIC);
        let outcome = if is_wmo {
            buildings.extract(storage, &name)?
        } else {
            buildings.extract_model(storage, &name)?
        };

        if outcome.has_output() {
            models.push(GameObjectModel {
                display_id: record.id(),
                is_wmo,
                name,
            });
        }
    }
    Ok(models)
}
