//! One extraction run: environment checks, storage, registry and traversal

use crate::building::BuildingExtractor;
use crate::config::{ExtractorConfig, LEGACY_DIR_FILE};
use crate::error::{Error, Result};
use crate::gameobjects::extract_gameobject_models;
use crate::map_registry::MapRegistry;
use crate::object_ids::ObjectIdAllocator;
use crate::storage::{ArchiveStorage, Locale, StorageNegotiator, StorageProvider};
use crate::tile::{TileExtractor, TileProgress, TileStats};
use std::fs;
use std::path::Path;

/// Refuse clients whose `Data/` holds MPQ archives
pub fn check_client(storage_dir: &Path) -> Result<()> {
    let entries = match fs::read_dir(storage_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };

    for entry in entries {
        let entry = entry?;
        let name = entry.file_name();
        let is_mpq = Path::new(&name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("mpq"));
        if is_mpq {
            return Err(Error::UnsupportedClient(format!(
                "{} holds MPQ archives ({}); only storage-based clients are supported",
                storage_dir.display(),
                name.to_string_lossy()
            )));
        }
    }
    Ok(())
}

/// Refuse an output directory holding artifacts of an earlier run
pub fn check_output(config: &ExtractorConfig) -> Result<()> {
    for used in [config.output_dir.join(LEGACY_DIR_FILE), config.bin_dir()] {
        if used.exists() {
            return Err(Error::PollutedOutput(used));
        }
    }
    Ok(())
}

/// Create the output and placement directories, refusing a used output directory
pub fn prepare_output(config: &ExtractorConfig) -> Result<()> {
    check_output(config)?;
    fs::create_dir_all(config.bin_dir())?;
    log::debug!("Writing to {}", config.output_dir.display());
    Ok(())
}

/// All state of a run, owned in one place
#[derive(Debug)]
pub struct Pipeline<S> {
    config: ExtractorConfig,
    storage: S,
    locale: Locale,
    build: u32,
    registry: MapRegistry,
    buildings: BuildingExtractor,
    ids: ObjectIdAllocator,
    gameobject_models: usize,
}

impl<S: ArchiveStorage> Pipeline<S> {
    /// Check the environment, open storage and load the map registry.
    ///
    /// Nothing is written unless every check passes; the output directories
    /// are created last.
    pub fn open<P>(config: ExtractorConfig, provider: &P) -> Result<Self>
    where
        P: StorageProvider<Storage = S>,
    {
        check_client(&config.storage_dir())?;
        check_output(&config)?;

        let negotiated = StorageNegotiator::new(provider).negotiate()?;
        let registry = MapRegistry::load(&negotiated.storage)?;

        prepare_output(&config)?;
        let buildings = BuildingExtractor::new(&config.output_dir, config.precise);

        Ok(Self {
            config,
            storage: negotiated.storage,
            locale: negotiated.locale,
            build: negotiated.build,
            registry,
            buildings,
            ids: ObjectIdAllocator::new(),
            gameobject_models: 0,
        })
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn build(&self) -> u32 {
        self.build
    }

    pub fn registry(&self) -> &MapRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Number of game objects that received a unique id so far
    pub fn object_count(&self) -> usize {
        self.ids.len()
    }

    /// Number of game object displays listed in the model list
    pub fn gameobject_model_count(&self) -> usize {
        self.gameobject_models
    }

    /// Convert the game object models, then walk every map and write
    /// buildings and placements
    pub fn run(&mut self, progress: &mut dyn TileProgress) -> Result<TileStats> {
        self.gameobject_models =
            extract_gameobject_models(&self.storage, &mut self.buildings)?.len();

        let mut tiles = TileExtractor::new(
            &self.storage,
            &self.registry,
            &mut self.buildings,
            &mut self.ids,
            self.config.bin_dir(),
        );
        let stats = tiles.run(progress)?;

        log::info!(
            "Extracted {} tiles ({} from parent maps) with {} placements",
            stats.tiles,
            stats.parent_tiles,
            stats.placements
        );
        Ok(stats)
    }
}
