//! Offline extraction of building collision data and object placements
//! from World of Warcraft clients.
//!
//! A run reads the `Map` client table through [`wow_db2`], walks every map's
//! 64x64 tile grid and writes two kinds of output into one directory:
//!
//! - one file per building (WMO) and per doodad model (M2) holding its
//!   collision geometry
//! - `dir_bin/<map>_<x>_<y>` placement files listing the buildings and
//!   models of each tile, inherited from the parent map where the map has
//!   no tile of its own
//! - `temp_gameobject_models`, the game object displays whose model was
//!   extracted
//!
//! # Examples
//!
//! ```no_run
//! use vmap_extractor::{ExtractorConfig, NoProgress, Pipeline};
//! use vmap_extractor::storage::LooseStorageProvider;
//!
//! let config = ExtractorConfig::new("/games/wow", "./Buildings", false);
//! let provider = LooseStorageProvider::new(&config.data_dir);
//! let mut pipeline = Pipeline::open(config, &provider)?;
//! let stats = pipeline.run(&mut NoProgress)?;
//! println!("{} tiles written", stats.tiles);
//! # Ok::<(), vmap_extractor::Error>(())
//! ```

pub mod building;
pub mod config;
pub mod error;
pub mod formats;
pub mod gameobjects;
pub mod map_registry;
pub mod naming;
pub mod object_ids;
pub mod pipeline;
pub mod storage;
pub mod tile;
pub mod vmap;

pub mod test_utils;

pub use building::{BuildingExtractor, ExtractOutcome};
pub use config::ExtractorConfig;
pub use error::{Error, Result};
pub use gameobjects::GameObjectModel;
pub use map_registry::{MapEntry, MapRegistry};
pub use object_ids::ObjectIdAllocator;
pub use pipeline::Pipeline;
pub use tile::{NoProgress, TileExtractor, TileProgress, TileStats};
