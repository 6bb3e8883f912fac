//! Object placements of a terrain tile (`_obj0.adt` or unsplit `.adt`)
//!
//! - **MMDX/MMID**: model file names and their offsets
//! - **MWMO/MWID**: building file names and their offsets
//! - **MDDF**: model placements referencing MMID
//! - **MODF**: building placements referencing MWID

use super::chunk::{ChunkReader, RawChunk, string_at};
use crate::error::Result;
use crate::storage::FileRef;
use binrw::BinRead;

/// M2 model placement (doodad) - 36 bytes per entry.
///
/// ```text
/// Offset | Size | Field
/// -------|------|---------------------------
/// 0x00   |  4   | nameId (MMID index or file id)
/// 0x04   |  4   | uniqueId
/// 0x08   | 12   | position (X, Y, Z)
/// 0x14   | 12   | rotation in degrees
/// 0x20   |  2   | scale (1024 = 1.0)
/// 0x22   |  2   | flags
/// ```
#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(little)]
pub struct DoodadPlacement {
    pub name_id: u32,
    pub unique_id: u32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: u16,
    pub flags: u16,
}

impl DoodadPlacement {
    /// Entry size in bytes
    pub const SIZE: usize = 36;

    /// Convert scale to floating point (1024 = 1.0)
    #[must_use]
    pub fn get_scale(&self) -> f32 {
        f32::from(self.scale) / 1024.0
    }

    /// Check if nameId is a file data ID instead of an MMID index
    #[must_use]
    pub fn uses_file_data_id(&self) -> bool {
        self.flags & 0x40 != 0
    }
}

/// WMO placement - 64 bytes per entry.
///
/// The same layout is used by the map-wide building of a WDT.
#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(little)]
pub struct WmoPlacement {
    pub name_id: u32,
    pub unique_id: u32,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub extents_min: [f32; 3],
    pub extents_max: [f32; 3],
    pub flags: u16,
    pub doodad_set: u16,
    pub name_set: u16,
    /// Scale factor (1024 = 1.0), only meaningful with flag 0x4
    pub scale: u16,
}

impl WmoPlacement {
    /// Entry size in bytes
    pub const SIZE: usize = 64;

    /// Scale factor; 1.0 unless the placement carries one
    #[must_use]
    pub fn get_scale(&self) -> f32 {
        if self.has_scale() {
            f32::from(self.scale) / 1024.0
        } else {
            1.0
        }
    }

    /// Check if WMO is destructible (server-controllable)
    #[must_use]
    pub fn is_destroyable(&self) -> bool {
        self.flags & 0x1 != 0
    }

    /// Check if the scale field is used
    #[must_use]
    pub fn has_scale(&self) -> bool {
        self.flags & 0x4 != 0
    }

    /// Check if nameId is a file data ID instead of an MWID index
    #[must_use]
    pub fn uses_file_data_id(&self) -> bool {
        self.flags & 0x8 != 0
    }
}

/// Names and placements of one terrain tile
#[derive(Debug, Clone, Default)]
pub struct AdtObjects {
    /// Model names in MMID order
    pub doodad_names: Vec<String>,
    /// Building names in MWID order
    pub wmo_names: Vec<String>,
    pub doodads: Vec<DoodadPlacement>,
    pub wmos: Vec<WmoPlacement>,
}

impl AdtObjects {
    /// Parse the object chunks of a tile; unknown chunks are ignored
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut mmdx = None;
        let mut mmid = None;
        let mut mwmo = None;
        let mut mwid = None;
        let mut objects = Self::default();

        for chunk in ChunkReader::new(data) {
            let chunk = chunk?;
            match &chunk.id {
                b"MMDX" => mmdx = Some(chunk),
                b"MMID" => mmid = Some(chunk.u32_list()),
                b"MWMO" => mwmo = Some(chunk),
                b"MWID" => mwid = Some(chunk.u32_list()),
                b"MDDF" => objects.doodads = chunk.entries(DoodadPlacement::SIZE)?,
                b"MODF" => objects.wmos = chunk.entries(WmoPlacement::SIZE)?,
                _ => {}
            }
        }

        objects.doodad_names = resolve_names(mmdx.as_ref(), mmid);
        objects.wmo_names = resolve_names(mwmo.as_ref(), mwid);
        log::debug!(
            "Tile objects: {} models, {} buildings, {} model placements, {} building placements",
            objects.doodad_names.len(),
            objects.wmo_names.len(),
            objects.doodads.len(),
            objects.wmos.len()
        );
        Ok(objects)
    }

    /// Archive name of a model placement
    pub fn doodad_name(&self, placement: &DoodadPlacement) -> Option<String> {
        if placement.uses_file_data_id() {
            return Some(FileRef::Id(placement.name_id).to_string());
        }
        self.doodad_names
            .get(placement.name_id as usize)
            .filter(|name| !name.is_empty())
            .cloned()
    }

    /// Archive name of a building placement
    pub fn wmo_name(&self, placement: &WmoPlacement) -> Option<String> {
        wmo_placement_name(&self.wmo_names, placement)
    }
}

/// Resolve a building placement's name against a name list
pub(crate) fn wmo_placement_name(names: &[String], placement: &WmoPlacement) -> Option<String> {
    if placement.uses_file_data_id() {
        return Some(FileRef::Id(placement.name_id).to_string());
    }
    names
        .get(placement.name_id as usize)
        .filter(|name| !name.is_empty())
        .cloned()
}

/// Order names by the offset table when present, else by position.
/// Offsets that hit no string keep their slot as an empty name.
fn resolve_names(chunk: Option<&RawChunk<'_>>, offsets: Option<Vec<u32>>) -> Vec<String> {
    let Some(chunk) = chunk else {
        return Vec::new();
    };
    match offsets {
        Some(offsets) => {
            let strings = chunk.strings();
            offsets
                .iter()
                .map(|offset| string_at(&strings, *offset).unwrap_or_default().to_string())
                .collect()
        }
        None => chunk.string_list(),
    }
}

/// Names in a raw string chunk by position
pub(crate) fn chunk_names(chunk: &RawChunk<'_>) -> Vec<String> {
    chunk.string_list()
}
