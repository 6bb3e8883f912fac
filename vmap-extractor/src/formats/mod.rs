//! Readers for the client source formats the extractor branches on
//!
//! Only the chunks needed to place buildings and models are decoded:
//!
//! - **WDT**: tile presence (MAIN), per-tile file ids (MAID) and the
//!   optional map-wide building (MWMO/MODF)
//! - **ADT**: model and building names plus their placements
//! - **WMO**: root header, doodad tables and group geometry
//! - **M2**: the collision mesh of doodad models

pub mod adt;
pub mod chunk;
pub mod m2;
pub mod wdt;
pub mod wmo;

pub use adt::{AdtObjects, DoodadPlacement, WmoPlacement};
pub use chunk::{ChunkReader, RawChunk};
pub use m2::{M2Header, M2Model};
pub use wdt::{MphdFlags, WdtFile};
pub use wmo::{GroupFlags, MogpHeader, MohdHeader, ModdEntry, ModsEntry, WmoGroup, WmoRoot};

/// Map dimensions (64x64 grid)
pub const MAP_SIZE: usize = 64;

/// Total number of tiles
pub const MAP_TILE_COUNT: usize = MAP_SIZE * MAP_SIZE;
