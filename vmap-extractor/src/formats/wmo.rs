//! Building (WMO) root and group files
//!
//! The root holds the header (MOHD), group names (MOGN), doodad tables
//! (MODS/MODN/MODI/MODD) and, on newer clients, the group file ids (GFID).
//! Each group file holds one MOGP chunk: a fixed header followed by the
//! geometry sub-chunks.

use super::chunk::{ChunkReader, string_at};
use crate::error::{Error, Result};
use crate::storage::FileRef;
use binrw::{BinRead, BinReaderExt};
use bitflags::bitflags;
use glam::Vec3;
use std::collections::BTreeSet;
use std::io::Cursor;

/// Doodad model extensions accepted in MODN
const MODEL_EXTENSIONS: [&str; 3] = [".m2", ".mdx", ".mdl"];

/// MOHD - root header (64 bytes)
#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(little)]
pub struct MohdHeader {
    pub material_count: u32,
    pub group_count: u32,
    pub portal_count: u32,
    pub light_count: u32,
    pub doodad_name_count: u32,
    pub doodad_def_count: u32,
    pub doodad_set_count: u32,
    pub ambient_color: [u8; 4],
    pub wmo_id: u32,
    pub bbox_min: [f32; 3],
    pub bbox_max: [f32; 3],
    pub flags: u16,
    pub lod_count: u16,
}

impl MohdHeader {
    pub const SIZE: usize = 64;
}

/// MODS - Doodad sets chunk
#[derive(Debug, Clone, PartialEq, BinRead)]
#[br(little)]
pub struct ModsEntry {
    pub name: [u8; 20],
    pub start_index: u32,
    pub count: u32,
    pub padding: u32,
}

impl ModsEntry {
    pub const SIZE: usize = 32;

    /// Spawn index range of this set
    pub fn range(&self) -> std::ops::Range<u32> {
        self.start_index..self.start_index.saturating_add(self.count)
    }
}

/// MODD - Doodad definitions chunk
#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(little)]
pub struct ModdEntry {
    pub name_index_and_flags: u32, // nameIndex is bits 0-23, flags are bits 24-31
    pub position: [f32; 3],
    pub orientation: [f32; 4], // Quaternion (X, Y, Z, W)
    pub scale: f32,
    pub color: [u8; 4],
}

impl ModdEntry {
    pub const SIZE: usize = 40;

    /// Extract the name index (bits 0-23)
    pub fn name_index(&self) -> u32 {
        self.name_index_and_flags & 0x00FF_FFFF
    }
}

bitflags! {
    /// MOGP group flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GroupFlags: u32 {
        const HAS_BSP = 0x0000_0001;
        const HAS_LIGHT_MAP = 0x0000_0002;
        const HAS_VERTEX_COLORS = 0x0000_0004;
        const EXTERIOR = 0x0000_0008;
        const EXTERIOR_LIT = 0x0000_0040;
        /// Group cannot be reached by players
        const UNREACHABLE = 0x0000_0080;
        const HAS_LIGHTS = 0x0000_0200;
        const HAS_DOODADS = 0x0000_0800;
        const HAS_WATER = 0x0000_1000;
        const INTERIOR = 0x0000_2000;
        /// Portal-culling helper geometry
        const ANTIPORTAL = 0x0400_0000;
    }
}

/// MOGP header (68 bytes)
#[derive(Debug, Clone, Copy, PartialEq, BinRead)]
#[br(little)]
pub struct MogpHeader {
    /// Offset into MOGN
    pub group_name: u32,
    pub descriptive_name: u32,
    pub flags: u32,
    pub bbox_min: [f32; 3],
    pub bbox_max: [f32; 3],
    pub portal_start: u16,
    pub portal_count: u16,
    pub trans_batch_count: u16,
    pub int_batch_count: u16,
    pub ext_batch_count: u16,
    pub padding: u16,
    pub fog_ids: [u8; 4],
    pub liquid_type: u32,
    /// WMOAreaTable group id
    pub group_id: u32,
    pub flags2: u32,
    pub unknown: u32,
}

impl MogpHeader {
    pub const SIZE: usize = 68;

    pub fn group_flags(&self) -> GroupFlags {
        GroupFlags::from_bits_retain(self.flags)
    }
}

bitflags! {
    /// MOPY per-triangle material flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TriangleFlags: u8 {
        const UNK_01 = 0x01;
        const NO_CAM_COLLIDE = 0x02;
        const DETAIL = 0x04;
        const COLLISION = 0x08;
        const HINT = 0x10;
        const RENDER = 0x20;
        const CULL_OBJECTS = 0x40;
        const COLLIDE_HIT = 0x80;
    }
}

/// MOPY entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, BinRead)]
#[br(little)]
pub struct TriangleMaterial {
    pub flags: u8,
    pub material_id: u8,
}

impl TriangleMaterial {
    pub const SIZE: usize = 2;

    /// Whether the triangle takes part in collision
    pub fn is_collision(&self) -> bool {
        let flags = TriangleFlags::from_bits_retain(self.flags);
        let render = flags.contains(TriangleFlags::RENDER) && !flags.contains(TriangleFlags::DETAIL);
        flags.contains(TriangleFlags::COLLISION) || render
    }
}

/// Parsed building root
#[derive(Debug, Clone)]
pub struct WmoRoot {
    pub header: MohdHeader,
    /// MOGN as `(offset, name)`
    pub group_names: Vec<(u32, String)>,
    pub doodad_sets: Vec<ModsEntry>,
    /// MODN as `(offset, name)`
    pub doodad_names: Vec<(u32, String)>,
    /// MODI file ids, indexed by name index
    pub doodad_file_ids: Vec<u32>,
    pub doodad_spawns: Vec<ModdEntry>,
    /// GFID group file ids
    pub group_file_ids: Vec<u32>,
}

impl WmoRoot {
    /// Parse a root file; MOHD is required
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut header = None;
        let mut group_names = Vec::new();
        let mut doodad_sets = Vec::new();
        let mut doodad_names = Vec::new();
        let mut doodad_file_ids = Vec::new();
        let mut doodad_spawns = Vec::new();
        let mut group_file_ids = Vec::new();

        for chunk in ChunkReader::new(data) {
            let chunk = chunk?;
            match &chunk.id {
                b"MOHD" => header = chunk.entries::<MohdHeader>(MohdHeader::SIZE)?.into_iter().next(),
                b"MOGN" => group_names = chunk.strings(),
                b"MODS" => doodad_sets = chunk.entries(ModsEntry::SIZE)?,
                b"MODN" => doodad_names = chunk.strings(),
                b"MODI" => doodad_file_ids = chunk.u32_list(),
                b"MODD" => doodad_spawns = chunk.entries(ModdEntry::SIZE)?,
                b"GFID" => group_file_ids = chunk.u32_list(),
                _ => {}
            }
        }

        let header = header.ok_or_else(|| Error::invalid_chunk("MOHD", "missing root header"))?;
        Ok(Self {
            header,
            group_names,
            doodad_sets,
            doodad_names,
            doodad_file_ids,
            doodad_spawns,
            group_file_ids,
        })
    }

    /// Name indices whose doodads can be placed.
    ///
    /// MODN names are keyed by byte offset and must name a model file; MODI
    /// entries are keyed by index and must be non-zero.
    pub fn valid_doodad_names(&self) -> BTreeSet<u32> {
        let mut valid: BTreeSet<u32> = self
            .doodad_names
            .iter()
            .filter(|(_, name)| has_model_extension(name))
            .map(|(offset, _)| *offset)
            .collect();

        valid.extend(
            self.doodad_file_ids
                .iter()
                .enumerate()
                .filter(|(_, id)| **id != 0)
                .map(|(index, _)| index as u32),
        );
        valid
    }

    /// Archive names of the models behind every valid doodad name
    pub fn doodad_model_names(&self) -> Vec<String> {
        let valid = self.valid_doodad_names();
        let named = self
            .doodad_names
            .iter()
            .filter(|(offset, _)| valid.contains(offset))
            .map(|(_, name)| name.clone());
        let by_id = self
            .doodad_file_ids
            .iter()
            .filter(|id| **id != 0)
            .map(|id| FileRef::Id(*id).to_string());
        named.chain(by_id).collect()
    }

    /// Group name at a MOGN offset
    pub fn group_name_at(&self, offset: u32) -> Option<&str> {
        string_at(&self.group_names, offset)
    }
}

fn has_model_extension(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    MODEL_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Parsed building group
#[derive(Debug, Clone)]
pub struct WmoGroup {
    pub header: MogpHeader,
    /// MOPY, one entry per triangle
    pub materials: Vec<TriangleMaterial>,
    /// MOVI
    pub indices: Vec<u16>,
    /// MOVT
    pub vertices: Vec<Vec3>,
    /// Index count of each MOBA render batch
    pub batch_index_counts: Vec<u16>,
    /// MODR indices into the root's doodad spawns
    pub doodad_refs: Vec<u16>,
}

/// MOBA entry size; the index count is a `u16` at byte 16
const MOBA_ENTRY_SIZE: usize = 24;
const MOBA_INDEX_COUNT_OFFSET: usize = 16;

impl WmoGroup {
    /// Parse a group file; MOGP is required
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mogp = ChunkReader::new(data)
            .filter_map(|chunk| match chunk {
                Ok(chunk) if &chunk.id == b"MOGP" => Some(Ok(chunk)),
                Ok(_) => None,
                Err(e) => Some(Err(e)),
            })
            .next()
            .ok_or_else(|| Error::invalid_chunk("MOGP", "missing group chunk"))??;

        if mogp.data.len() < MogpHeader::SIZE {
            return Err(Error::invalid_chunk(
                "MOGP",
                format!("header needs {} bytes, found {}", MogpHeader::SIZE, mogp.data.len()),
            ));
        }

        let header: MogpHeader = Cursor::new(&mogp.data[..MogpHeader::SIZE])
            .read_le()
            .map_err(|e| Error::invalid_chunk("MOGP", e.to_string()))?;

        let mut group = Self {
            header,
            materials: Vec::new(),
            indices: Vec::new(),
            vertices: Vec::new(),
            batch_index_counts: Vec::new(),
            doodad_refs: Vec::new(),
        };

        for chunk in ChunkReader::new(&mogp.data[MogpHeader::SIZE..]) {
            let chunk = chunk?;
            match &chunk.id {
                b"MOPY" => group.materials = chunk.entries(TriangleMaterial::SIZE)?,
                b"MOVI" => group.indices = chunk.u16_list(),
                b"MOVT" => {
                    group.vertices = chunk
                        .entries::<[f32; 3]>(12)?
                        .into_iter()
                        .map(Vec3::from_array)
                        .collect();
                }
                b"MOBA" => {
                    group.batch_index_counts = chunk
                        .data
                        .chunks_exact(MOBA_ENTRY_SIZE)
                        .map(|entry| {
                            u16::from_le_bytes([
                                entry[MOBA_INDEX_COUNT_OFFSET],
                                entry[MOBA_INDEX_COUNT_OFFSET + 1],
                            ])
                        })
                        .collect();
                }
                b"MODR" => group.doodad_refs = chunk.u16_list(),
                _ => {}
            }
        }

        Ok(group)
    }

    /// Groups that never take part in collision
    pub fn should_skip(&self, root: &WmoRoot) -> bool {
        let flags = self.header.group_flags();
        flags.intersects(GroupFlags::UNREACHABLE | GroupFlags::ANTIPORTAL)
            || root.group_name_at(self.header.group_name) == Some("antiportal")
    }

    /// Number of triangles listed in MOVI
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
