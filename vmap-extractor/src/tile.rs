//! Tile traversal and placement conversion
//!
//! Every map of the registry is walked over its 64x64 grid, x outer and y
//! inner. A tile missing from the map itself is taken from the parent map
//! when there is one, and the records are still tagged with the current map.

use crate::building::BuildingExtractor;
use crate::error::Result;
use crate::formats::{AdtObjects, DoodadPlacement, MAP_SIZE, WdtFile, WmoPlacement};
use crate::map_registry::MapRegistry;
use crate::naming::{canonical_name, model_output_name};
use crate::object_ids::ObjectIdAllocator;
use crate::storage::{ArchiveStorage, FileRef};
use crate::vmap::{self, ModelPlacement, PlacementFlags};
use glam::{EulerRot, Mat3, Quat, Vec3};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Size of one tile in world units
pub const TILE_SIZE: f32 = 533.333_33;

/// Tile coordinate written for map-wide buildings
pub const GLOBAL_TILE: u32 = 65;

/// Offset applied to map-wide buildings, whose coordinates start at the map corner
const GLOBAL_OFFSET: Vec3 = Vec3::new(TILE_SIZE * 32.0, TILE_SIZE * 32.0, 0.0);

/// Observer for traversal progress
pub trait TileProgress {
    /// A map with a readable WDT is about to be traversed
    fn begin_map(&mut self, _map_id: u32, _name: &str) {}

    /// Column `x` of the grid is done
    fn row_done(&mut self, _x: usize) {}

    fn end_map(&mut self, _map_id: u32) {}
}

/// Progress observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl TileProgress for NoProgress {}

/// Counters for one traversal
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TileStats {
    /// Maps whose WDT could be read
    pub maps: usize,
    /// Tile files written
    pub tiles: usize,
    /// Tile files written from a parent map's tile
    pub parent_tiles: usize,
    /// Placement records written, map-wide buildings included
    pub placements: usize,
}

/// A loaded WDT
#[derive(Debug)]
pub struct WdtHandle {
    pub map_id: u32,
    pub name: String,
    pub wdt: WdtFile,
    /// Converted tiles kept for child maps; only maps that are parents keep one
    tile_cache: Option<HashMap<(usize, usize), Vec<ModelPlacement>>>,
}

/// Cached outcome of loading a map's WDT
#[derive(Debug)]
pub enum WdtState {
    Loaded(Box<WdtHandle>),
    Failed,
}

/// Walks maps and writes one placement file per tile
pub struct TileExtractor<'a, S> {
    storage: &'a S,
    registry: &'a MapRegistry,
    buildings: &'a mut BuildingExtractor,
    ids: &'a mut ObjectIdAllocator,
    bin_dir: PathBuf,
    wdts: HashMap<u32, WdtState>,
}

impl<'a, S: ArchiveStorage> TileExtractor<'a, S> {
    pub fn new(
        storage: &'a S,
        registry: &'a MapRegistry,
        buildings: &'a mut BuildingExtractor,
        ids: &'a mut ObjectIdAllocator,
        bin_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            storage,
            registry,
            buildings,
            ids,
            bin_dir: bin_dir.into(),
            wdts: HashMap::new(),
        }
    }

    /// Cached WDT state of a map; `None` until the map is first needed
    pub fn wdt_state(&self, map_id: u32) -> Option<&WdtState> {
        self.wdts.get(&map_id)
    }

    /// Traverse every map in registry order
    pub fn run(&mut self, progress: &mut dyn TileProgress) -> Result<TileStats> {
        let registry = self.registry;
        let mut stats = TileStats::default();

        for (&map_id, entry) in registry.iter() {
            if !self.get_or_load(map_id, &mut stats)? {
                continue;
            }

            let mut parent = None;
            if let Some(parent_id) = entry.parent_id {
                if self.get_or_load(parent_id, &mut stats)? {
                    parent = Some(parent_id);
                }
            }

            log::info!("Processing map {map_id} ({})", entry.name);
            stats.maps += 1;
            progress.begin_map(map_id, &entry.name);

            for x in 0..MAP_SIZE {
                for y in 0..MAP_SIZE {
                    if let Some(count) = self.extract_tile(map_id, map_id, x, y)? {
                        stats.tiles += 1;
                        stats.placements += count;
                        continue;
                    }
                    let Some(parent_id) = parent else {
                        continue;
                    };
                    if let Some(count) = self.extract_tile(map_id, parent_id, x, y)? {
                        stats.tiles += 1;
                        stats.parent_tiles += 1;
                        stats.placements += count;
                    }
                }
                progress.row_done(x);
            }

            progress.end_map(map_id);
        }

        Ok(stats)
    }

    /// Load a map's WDT once; failures are remembered
    fn get_or_load(&mut self, map_id: u32, stats: &mut TileStats) -> Result<bool> {
        if let Some(state) = self.wdts.get(&map_id) {
            return Ok(matches!(state, WdtState::Loaded(_)));
        }

        let state = match self.load_wdt(map_id, stats) {
            Ok(Some(handle)) => WdtState::Loaded(Box::new(handle)),
            Ok(None) => WdtState::Failed,
            Err(e) if !e.is_fatal() => {
                log::warn!("Couldn't load WDT of map {map_id}: {e}");
                WdtState::Failed
            }
            Err(e) => return Err(e),
        };

        let loaded = matches!(state, WdtState::Loaded(_));
        self.wdts.insert(map_id, state);
        Ok(loaded)
    }

    fn load_wdt(&mut self, map_id: u32, stats: &mut TileStats) -> Result<Option<WdtHandle>> {
        let Some(entry) = self.registry.get(map_id) else {
            log::debug!("Map {map_id} is not in the registry");
            return Ok(None);
        };

        let path = format!("World\\Maps\\{0}\\{0}.wdt", entry.name);
        let Some(data) = self.storage.read_named(&path)? else {
            log::debug!("No WDT for map {map_id} at {path}");
            return Ok(None);
        };
        let wdt = WdtFile::parse(&data)?;
        log::debug!("Loaded {path} with {} tiles", wdt.tile_count());

        let mut placements = Vec::new();
        for (name, placement) in wdt.global_wmos() {
            self.buildings.extract(self.storage, &name)?;
            placements.extend(wmo_placements(self.buildings, self.ids, &name, placement, true)?);
        }
        if !placements.is_empty() {
            let path = self.bin_dir.join(format!("{map_id:04}"));
            write_placements(&path, &placements, map_id, GLOBAL_TILE, GLOBAL_TILE, false)?;
            stats.placements += placements.len();
        }

        let tile_cache = self.registry.is_parent(map_id).then(HashMap::new);
        Ok(Some(WdtHandle {
            map_id,
            name: entry.name.clone(),
            wdt,
            tile_cache,
        }))
    }

    /// Convert tile (x, y) of `source_id` into the current map's tile file.
    ///
    /// Returns the number of records written, or `None` if the source has no
    /// such tile.
    fn extract_tile(&mut self, map_id: u32, source_id: u32, x: usize, y: usize) -> Result<Option<usize>> {
        let Some(WdtState::Loaded(handle)) = self.wdts.get_mut(&source_id) else {
            return Ok(None);
        };
        if !handle.wdt.has_tile(x, y) {
            return Ok(None);
        }

        let path = self.bin_dir.join(format!("{map_id:04}_{x:02}_{y:02}"));
        let parent_spawn = map_id != source_id;

        if let Some(cached) = handle.tile_cache.as_ref().and_then(|cache| cache.get(&(x, y))) {
            write_placements(&path, cached, map_id, x as u32, y as u32, parent_spawn)?;
            return Ok(Some(cached.len()));
        }

        let objects = match read_tile_objects(self.storage, handle, x, y) {
            Ok(Some(objects)) => objects,
            Ok(None) => return Ok(None),
            Err(e) if !e.is_fatal() => {
                log::warn!("Couldn't read tile {x}_{y} of map {source_id}: {e}");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let placements = convert_tile(self.storage, self.buildings, self.ids, &objects)?;
        write_placements(&path, &placements, map_id, x as u32, y as u32, parent_spawn)?;

        let count = placements.len();
        if let Some(cache) = handle.tile_cache.as_mut() {
            cache.insert((x, y), placements);
        }
        Ok(Some(count))
    }
}

/// Read the object chunks of a tile: MAID file id, then `_obj0.adt`, then the unsplit tile
fn read_tile_objects<S: ArchiveStorage>(
    storage: &S,
    handle: &WdtHandle,
    x: usize,
    y: usize,
) -> Result<Option<AdtObjects>> {
    let data = match handle.wdt.obj0_file_id(x, y) {
        Some(id) => storage.read_file(FileRef::Id(id))?,
        None => {
            let name = &handle.name;
            let obj0 = format!("World\\Maps\\{name}\\{name}_{x}_{y}_obj0.adt");
            match storage.read_named(&obj0)? {
                Some(data) => Some(data),
                None => storage.read_named(&format!("World\\Maps\\{name}\\{name}_{x}_{y}.adt"))?,
            }
        }
    };

    data.map(|data| AdtObjects::parse(&data)).transpose()
}

/// Placements of one tile: models first, then buildings with their doodad sets
fn convert_tile<S: ArchiveStorage>(
    storage: &S,
    buildings: &mut BuildingExtractor,
    ids: &mut ObjectIdAllocator,
    objects: &AdtObjects,
) -> Result<Vec<ModelPlacement>> {
    for name in objects.wmo_names.iter().filter(|name| !name.is_empty()) {
        let outcome = buildings.extract(storage, name)?;
        if !outcome.has_output() {
            log::debug!("No building output for {name}: {outcome:?}");
        }
    }

    for name in objects.doodad_names.iter().filter(|name| !name.is_empty()) {
        buildings.extract_model(storage, name)?;
    }

    let mut placements = Vec::new();
    for doodad in &objects.doodads {
        let Some(name) = objects.doodad_name(doodad) else {
            continue;
        };
        if doodad.uses_file_data_id() {
            buildings.extract_model(storage, &name)?;
        }
        if let Some(placement) = doodad_placement(buildings, ids, &name, doodad)? {
            placements.push(placement);
        }
    }

    for wmo in &objects.wmos {
        let Some(name) = objects.wmo_name(wmo) else {
            continue;
        };
        if wmo.uses_file_data_id() {
            buildings.extract(storage, &name)?;
        }
        placements.extend(wmo_placements(buildings, ids, &name, wmo, false)?);
    }

    Ok(placements)
}

/// Client coordinates to vmap coordinates
fn fix_coords(v: [f32; 3]) -> Vec3 {
    Vec3::new(v[2], v[0], v[1])
}

/// Whether an output exists and holds geometry
fn has_geometry(path: &Path) -> Result<bool> {
    Ok(vmap::building_vertex_count(path)?.is_some_and(|count| count > 0))
}

fn doodad_placement(
    buildings: &BuildingExtractor,
    ids: &mut ObjectIdAllocator,
    name: &str,
    doodad: &DoodadPlacement,
) -> Result<Option<ModelPlacement>> {
    let model = model_output_name(name);
    if !has_geometry(&buildings.output_path(&model))? {
        return Ok(None);
    }

    Ok(Some(ModelPlacement {
        flags: PlacementFlags::M2,
        name_set: 0,
        unique_id: ids.get_or_create(doodad.unique_id, 0),
        position: fix_coords(doodad.position),
        rotation: Vec3::from_array(doodad.rotation),
        scale: doodad.get_scale(),
        bounds: None,
        name: model,
    }))
}

/// The building record followed by the models of its doodad set
fn wmo_placements(
    buildings: &BuildingExtractor,
    ids: &mut ObjectIdAllocator,
    name: &str,
    wmo: &WmoPlacement,
    global: bool,
) -> Result<Vec<ModelPlacement>> {
    let canonical = canonical_name(name);
    let offset = if global { GLOBAL_OFFSET } else { Vec3::ZERO };
    let mut placements = Vec::new();

    if !wmo.is_destroyable() && has_geometry(&buildings.output_path(&canonical))? {
        placements.push(ModelPlacement {
            flags: PlacementFlags::empty(),
            name_set: wmo.name_set as u8,
            unique_id: ids.get_or_create(wmo.unique_id, 0),
            position: fix_coords(wmo.position) + offset,
            rotation: Vec3::from_array(wmo.rotation),
            scale: wmo.get_scale(),
            bounds: Some([
                fix_coords(wmo.extents_min) + offset,
                fix_coords(wmo.extents_max) + offset,
            ]),
            name: canonical.clone(),
        });
    }

    let Some(data) = buildings.doodads(&canonical) else {
        return Ok(placements);
    };
    let Some(set) = data.sets.get(usize::from(wmo.doodad_set)) else {
        return Ok(placements);
    };

    let base = fix_coords(wmo.position) + offset;
    let rotation = Mat3::from_euler(
        EulerRot::ZYX,
        wmo.rotation[1].to_radians(),
        wmo.rotation[0].to_radians(),
        wmo.rotation[2].to_radians(),
    );

    let range = set.range();
    let mut doodad_id = 0u16;
    for &index in &data.references {
        if !range.contains(&u32::from(index)) {
            continue;
        }
        let Some(spawn) = data.spawns.get(usize::from(index)) else {
            continue;
        };
        let Some(model) = data.model_name(spawn) else {
            continue;
        };
        if !has_geometry(&buildings.output_path(&model))? {
            continue;
        }

        doodad_id += 1;
        let [qx, qy, qz, qw] = spawn.orientation;
        let spawn_rotation = Mat3::from_quat(Quat::from_xyzw(qx, qy, qz, qw).normalize()) * rotation;
        let (a, b, c) = Quat::from_mat3(&spawn_rotation).to_euler(EulerRot::XYZ);

        placements.push(ModelPlacement {
            flags: PlacementFlags::M2,
            name_set: 0,
            unique_id: ids.get_or_create(wmo.unique_id, doodad_id),
            position: base + rotation * Vec3::from_array(spawn.position),
            rotation: Vec3::new(b.to_degrees(), c.to_degrees(), a.to_degrees()),
            scale: spawn.scale,
            bounds: None,
            name: model,
        });
    }

    Ok(placements)
}

/// Write a placement file, replacing any previous content
fn write_placements(
    path: &Path,
    placements: &[ModelPlacement],
    map_id: u32,
    tile_x: u32,
    tile_y: u32,
    parent_spawn: bool,
) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    for placement in placements {
        placement.write(&mut out, map_id, tile_x, tile_y, parent_spawn)?;
    }
    out.flush()?;
    Ok(())
}
