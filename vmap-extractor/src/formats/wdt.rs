//! World definition (WDT) files
//!
//! A WDT lists which of the 64x64 tiles of a map exist. Maps made of a
//! single building instead carry one MWMO name and one MODF placement.

use super::adt::{WmoPlacement, chunk_names, wmo_placement_name};
use super::chunk::ChunkReader;
use super::{MAP_SIZE, MAP_TILE_COUNT};
use crate::error::{Error, Result};
use bitflags::bitflags;

bitflags! {
    /// MPHD header flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MphdFlags: u32 {
        /// Map is a single global building
        const WMO_ONLY = 0x0001;
        const ADT_HAS_MCCV = 0x0002;
        const ADT_HAS_BIG_ALPHA = 0x0004;
        const ADT_HAS_DOODADREFS_SORTED = 0x0008;
        const ADT_HAS_LIGHTING_VERTICES = 0x0010;
        const ADT_HAS_UPSIDE_DOWN_GROUND = 0x0020;
        /// MAID chunk with file ids is present
        const HAS_MAID = 0x0200;
    }
}

/// MAIN entry flag: tile has terrain data
const MAIN_HAS_ADT: u32 = 0x1;

/// MAIN entry size (flags + async id)
const MAIN_ENTRY_SIZE: usize = 8;

/// MAID section holding `_obj0.adt` file ids
const MAID_OBJ0_SECTION: usize = 1;

/// Parsed world definition
#[derive(Debug, Clone)]
pub struct WdtFile {
    pub flags: MphdFlags,
    /// MAIN flags stored in \[Y\]\[X\] order
    tiles: Vec<u32>,
    /// `_obj0.adt` file ids stored in \[Y\]\[X\] order, empty without MAID
    obj0_ids: Vec<u32>,
    /// Map-wide building names (MWMO)
    pub wmo_names: Vec<String>,
    /// Map-wide building placements (MODF)
    pub wmo_placements: Vec<WmoPlacement>,
}

impl WdtFile {
    /// Parse a WDT; MAIN is required
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut flags = MphdFlags::empty();
        let mut tiles = None;
        let mut obj0_ids = Vec::new();
        let mut wmo_names = Vec::new();
        let mut wmo_placements = Vec::new();

        for chunk in ChunkReader::new(data) {
            let chunk = chunk?;
            match &chunk.id {
                b"MPHD" => {
                    let raw = chunk.u32_list().first().copied().unwrap_or(0);
                    flags = MphdFlags::from_bits_retain(raw);
                }
                b"MAIN" => {
                    if chunk.data.len() < MAP_TILE_COUNT * MAIN_ENTRY_SIZE {
                        return Err(Error::invalid_chunk(
                            "MAIN",
                            format!(
                                "expected {} bytes, found {}",
                                MAP_TILE_COUNT * MAIN_ENTRY_SIZE,
                                chunk.data.len()
                            ),
                        ));
                    }
                    tiles = Some(chunk.u32_list().into_iter().step_by(2).collect());
                }
                b"MAID" => {
                    obj0_ids = chunk
                        .u32_list()
                        .into_iter()
                        .skip(MAID_OBJ0_SECTION * MAP_TILE_COUNT)
                        .take(MAP_TILE_COUNT)
                        .collect();
                }
                b"MWMO" => wmo_names = chunk_names(&chunk),
                b"MODF" => wmo_placements = chunk.entries(WmoPlacement::SIZE)?,
                _ => {}
            }
        }

        let tiles = tiles.ok_or_else(|| Error::invalid_chunk("MAIN", "chunk not found"))?;

        Ok(Self {
            flags,
            tiles,
            obj0_ids,
            wmo_names,
            wmo_placements,
        })
    }

    /// Whether the tile at (x, y) has terrain data
    pub fn has_tile(&self, x: usize, y: usize) -> bool {
        x < MAP_SIZE
            && y < MAP_SIZE
            && self
                .tiles
                .get(y * MAP_SIZE + x)
                .is_some_and(|flags| flags & MAIN_HAS_ADT != 0)
    }

    /// File id of the tile's `_obj0.adt`, if the WDT lists one
    pub fn obj0_file_id(&self, x: usize, y: usize) -> Option<u32> {
        if x >= MAP_SIZE || y >= MAP_SIZE {
            return None;
        }
        self.obj0_ids
            .get(y * MAP_SIZE + x)
            .copied()
            .filter(|id| *id != 0)
    }

    /// Number of tiles with terrain data
    pub fn tile_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|flags| *flags & MAIN_HAS_ADT != 0)
            .count()
    }

    /// Map-wide building placements with their archive names
    pub fn global_wmos(&self) -> impl Iterator<Item = (String, &WmoPlacement)> + '_ {
        self.wmo_placements.iter().filter_map(|placement| {
            wmo_placement_name(&self.wmo_names, placement).map(|name| (name, placement))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::WdtBuilder;

    #[test]
    fn test_tiles_and_file_ids() {
        let data = WdtBuilder::new()
            .tile(5, 5)
            .tile(63, 0)
            .obj0_file_id(5, 5, 777)
            .build();
        let wdt = WdtFile::parse(&data).unwrap();

        assert!(wdt.has_tile(5, 5));
        assert!(wdt.has_tile(63, 0));
        assert!(!wdt.has_tile(0, 63));
        assert!(!wdt.has_tile(64, 0));
        assert_eq!(wdt.tile_count(), 2);
        assert_eq!(wdt.obj0_file_id(5, 5), Some(777));
        assert_eq!(wdt.obj0_file_id(63, 0), None);
        assert!(wdt.flags.contains(MphdFlags::HAS_MAID));
    }

    #[test]
    fn test_global_wmo() {
        let data = WdtBuilder::new()
            .global_wmo("World\\wmo\\Dungeon\\Crypt.wmo", 42, [10.0, 20.0, 30.0])
            .build();
        let wdt = WdtFile::parse(&data).unwrap();
        assert!(wdt.flags.contains(MphdFlags::WMO_ONLY));

        let globals: Vec<_> = wdt.global_wmos().collect();
        assert_eq!(globals.len(), 1);
        assert_eq!(globals[0].0, "World\\wmo\\Dungeon\\Crypt.wmo");
        assert_eq!(globals[0].1.unique_id, 42);
    }

    #[test]
    fn test_missing_main_is_an_error() {
        let data = crate::test_utils::chunk(b"MVER", &18u32.to_le_bytes());
        assert!(matches!(
            WdtFile::parse(&data),
            Err(Error::InvalidChunk { .. })
        ));
    }
}
