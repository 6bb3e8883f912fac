//! Building (WMO) and doodad model (M2) extraction
//!
//! Each building is converted once into `<output>/<canonical name>`; later
//! requests for the same name are no-ops. The doodad tables of every
//! building whose root could be read are kept so that tile conversion can
//! place the models of a building's doodad set. Doodad models are converted
//! to their collision mesh the same way, once per output name.

use crate::error::{Error, Result};
use crate::formats::chunk::string_at;
use crate::formats::{M2Model, ModdEntry, ModsEntry, WmoGroup, WmoRoot};
use crate::naming::{canonical_name, is_group_fragment, model_archive_name, model_output_name};
use crate::storage::{ArchiveStorage, FileRef};
use crate::vmap;
use std::collections::{BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Doodad tables of one building plus the spawns its groups reference
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WmoDoodadData {
    pub sets: Vec<ModsEntry>,
    pub spawns: Vec<ModdEntry>,
    /// MODN names keyed by byte offset
    pub names: Vec<(u32, String)>,
    /// MODI file ids keyed by index
    pub file_ids: Vec<u32>,
    /// Spawn indices referenced by accepted groups, ascending
    pub references: BTreeSet<u16>,
}

impl WmoDoodadData {
    fn from_root(root: &WmoRoot) -> Self {
        Self {
            sets: root.doodad_sets.clone(),
            spawns: root.doodad_spawns.clone(),
            names: root.doodad_names.clone(),
            file_ids: root.doodad_file_ids.clone(),
            references: BTreeSet::new(),
        }
    }

    /// Output name of the model a spawn places
    pub fn model_name(&self, spawn: &ModdEntry) -> Option<String> {
        let index = spawn.name_index();
        if !self.names.is_empty() {
            return string_at(&self.names, index).map(model_output_name);
        }
        self.file_ids
            .get(index as usize)
            .filter(|id| **id != 0)
            .map(|id| FileRef::Id(*id).to_string())
    }
}

/// Result of one extraction request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Output written with this many vertices over this many groups
    Extracted { vertices: u32, groups: u32 },
    /// Output already present
    AlreadyExtracted,
    /// Name looks like a numbered group file
    SkippedFragment,
    /// Root or model not in storage or not readable
    MissingRoot,
    /// A group could not be converted; the output was removed
    Incomplete,
    /// Model without collision triangles; nothing is written
    NoCollision,
}

impl ExtractOutcome {
    /// Whether an output file exists after the request
    pub fn has_output(&self) -> bool {
        matches!(self, Self::Extracted { .. } | Self::AlreadyExtracted)
    }
}

/// Converts buildings into the output directory
#[derive(Debug)]
pub struct BuildingExtractor {
    output_dir: PathBuf,
    precise: bool,
    doodads: HashMap<String, WmoDoodadData>,
}

impl BuildingExtractor {
    pub fn new(output_dir: impl Into<PathBuf>, precise: bool) -> Self {
        Self {
            output_dir: output_dir.into(),
            precise,
            doodads: HashMap::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of an output file by canonical name
    pub fn output_path(&self, canonical: &str) -> PathBuf {
        self.output_dir.join(canonical)
    }

    /// Doodad data of a building whose root was read, by canonical name
    pub fn doodads(&self, canonical: &str) -> Option<&WmoDoodadData> {
        self.doodads.get(canonical)
    }

    /// Extract one building by archive name
    pub fn extract<S: ArchiveStorage>(&mut self, storage: &S, entry: &str) -> Result<ExtractOutcome> {
        let canonical = canonical_name(entry);
        let path = self.output_path(&canonical);
        if path.exists() {
            return Ok(ExtractOutcome::AlreadyExtracted);
        }

        if is_group_fragment(&canonical) {
            log::debug!("Skipping group file {entry}");
            return Ok(ExtractOutcome::SkippedFragment);
        }

        let root = match read_unit(storage, entry).and_then(|data| WmoRoot::parse(&data)) {
            Ok(root) => root,
            Err(e) if !e.is_fatal() => {
                log::warn!("Couldn't open RootWmo {entry}: {e}");
                return Ok(ExtractOutcome::MissingRoot);
            }
            Err(e) => return Err(e),
        };

        log::debug!(
            "Extracting {entry} ({} groups, {} doodads)",
            root.header.group_count,
            root.doodad_spawns.len()
        );

        for model in root.doodad_model_names() {
            self.extract_model(storage, &model)?;
        }

        let mut data = WmoDoodadData::from_root(&root);
        let result = self.write_building(storage, entry, &root, &path, &mut data.references);
        self.doodads.insert(canonical, data);

        match result {
            Ok((vertices, groups)) => Ok(ExtractOutcome::Extracted { vertices, groups }),
            Err(e) => {
                if let Err(remove) = fs::remove_file(&path) {
                    log::warn!("Couldn't remove {}: {remove}", path.display());
                }
                if e.is_fatal() {
                    return Err(e);
                }
                log::warn!("Failed to extract {entry}: {e}");
                Ok(ExtractOutcome::Incomplete)
            }
        }
    }

    /// Extract the collision mesh of one doodad model by archive name.
    ///
    /// `.mdx`/`.mdl` references are read from the `.m2` file. Models without
    /// collision triangles produce no output.
    pub fn extract_model<S: ArchiveStorage>(&self, storage: &S, entry: &str) -> Result<ExtractOutcome> {
        let path = self.output_path(&model_output_name(entry));
        if path.exists() {
            return Ok(ExtractOutcome::AlreadyExtracted);
        }

        let source = model_archive_name(entry);
        let model = match read_unit(storage, &source).and_then(|data| M2Model::parse(&data)) {
            Ok(model) => model,
            Err(e) if !e.is_fatal() => {
                log::debug!("Couldn't open model {source}: {e}");
                return Ok(ExtractOutcome::MissingRoot);
            }
            Err(e) => return Err(e),
        };
        if !model.has_collision() {
            return Ok(ExtractOutcome::NoCollision);
        }

        let mut out = BufWriter::new(File::create(&path)?);
        let vertices = vmap::write_model(&mut out, &model)?;
        out.flush()?;
        log::trace!("Extracted model {source} ({vertices} vertices)");
        Ok(ExtractOutcome::Extracted {
            vertices,
            groups: 1,
        })
    }

    /// Write the root header and every accepted group, then patch the header.
    ///
    /// Doodad references of the groups written so far are collected into
    /// `references` even when a later group fails.
    fn write_building<S: ArchiveStorage>(
        &self,
        storage: &S,
        entry: &str,
        root: &WmoRoot,
        path: &Path,
        references: &mut BTreeSet<u16>,
    ) -> Result<(u32, u32)> {
        let mut out = BufWriter::new(File::create(path)?);
        vmap::write_root_header(&mut out, root.header.group_count, root.header.wmo_id)?;

        let valid_names = root.valid_doodad_names();
        let mut vertices = 0u32;
        let mut groups = 0u32;

        for group_name in group_file_names(entry, root) {
            let group = read_unit(storage, &group_name).and_then(|data| WmoGroup::parse(&data))?;
            if group.should_skip(root) {
                log::debug!("Skipping group {group_name}");
                continue;
            }

            vertices = add_vertices(vertices, vmap::write_group(&mut out, &group, self.precise)?)?;
            groups += 1;

            for reference in &group.doodad_refs {
                let Some(spawn) = root.doodad_spawns.get(usize::from(*reference)) else {
                    continue;
                };
                if valid_names.contains(&spawn.name_index()) {
                    references.insert(*reference);
                }
            }
        }

        vmap::patch_root_header(&mut out, vertices, groups)?;
        out.flush()?;
        Ok((vertices, groups))
    }
}

/// Running vertex total of a building; it must fit the header's `u32`
fn add_vertices(total: u32, group: u32) -> Result<u32> {
    total.checked_add(group).ok_or_else(|| {
        Error::invalid_chunk(
            "MOVT",
            format!("building vertex total overflows: {total} + {group}"),
        )
    })
}

/// Group files of a root: GFID ids when present, else `<root>_NNN.wmo`
fn group_file_names(entry: &str, root: &WmoRoot) -> Vec<String> {
    if !root.group_file_ids.is_empty() {
        return root
            .group_file_ids
            .iter()
            .filter(|id| **id != 0)
            .map(|id| FileRef::Id(*id).to_string())
            .collect();
    }

    let stem = entry.rsplit_once('.').map_or(entry, |(stem, _)| stem);
    (0..root.header.group_count)
        .map(|i| format!("{stem}_{i:03}.wmo"))
        .collect()
}

/// Read a building or group, treating absence as a missing unit
fn read_unit<S: ArchiveStorage>(storage: &S, name: &str) -> Result<Vec<u8>> {
    storage
        .read_named(name)?
        .ok_or_else(|| Error::ResourceMissing(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{GroupBuilder, M2Builder, MemoryStorage, RootBuilder};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const INN: &str = "World\\wmo\\Azeroth\\Goldshire INN.wmo";

    fn triangle_group(doodad_refs: &[u16]) -> Vec<u8> {
        GroupBuilder::new()
            .vertex([0.0, 0.0, 0.0])
            .vertex([1.0, 0.0, 0.0])
            .vertex([0.0, 1.0, 0.0])
            .triangle([0, 1, 2], 0x08)
            .batch(3)
            .doodad_refs(doodad_refs)
            .build()
    }

    fn inn_root() -> Vec<u8> {
        RootBuilder::new(2, 501)
            .doodad_name("World\\Chair.mdx")
            .doodad_name("World\\Glow.blp")
            .doodad_set("Set_$DefaultGlobal", 0, 3)
            .doodad_spawn(0, [1.0, 0.0, 0.0])
            .doodad_spawn(16, [2.0, 0.0, 0.0])
            .doodad_spawn(0, [3.0, 0.0, 0.0])
            .group_file_ids(&[9001, 9002])
            .build()
    }

    fn inn_storage() -> MemoryStorage {
        MemoryStorage::new(26972)
            .with_file(INN, inn_root())
            .with_file_id(9001, triangle_group(&[0, 1, 7]))
            .with_file_id(9002, triangle_group(&[2]))
    }

    #[test]
    fn test_extracts_building_and_doodads() {
        let dir = TempDir::new().unwrap();
        let mut extractor = BuildingExtractor::new(dir.path(), true);

        let outcome = extractor.extract(&inn_storage(), INN).unwrap();
        assert_eq!(
            outcome,
            ExtractOutcome::Extracted {
                vertices: 6,
                groups: 2
            }
        );

        let path = dir.path().join("Goldshire_Inn.wmo");
        assert_eq!(vmap::building_vertex_count(&path).unwrap(), Some(6));

        let doodads = extractor.doodads("Goldshire_Inn.wmo").unwrap();
        // Spawn 1 names a texture, spawn 7 does not exist
        assert_eq!(doodads.references, BTreeSet::from([0, 2]));
        assert_eq!(doodads.model_name(&doodads.spawns[0]).as_deref(), Some("Chair.m2"));
    }

    #[test]
    fn test_second_extract_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let storage = inn_storage();
        let mut extractor = BuildingExtractor::new(dir.path(), false);

        assert!(matches!(
            extractor.extract(&storage, INN).unwrap(),
            ExtractOutcome::Extracted { .. }
        ));
        let path = dir.path().join("Goldshire_Inn.wmo");
        let first = fs::read(&path).unwrap();

        assert_eq!(
            extractor.extract(&storage, "world\\WMO\\azeroth\\goldshire inn.wmo").unwrap(),
            ExtractOutcome::AlreadyExtracted
        );
        assert_eq!(fs::read(&path).unwrap(), first);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_fragment_and_missing_root() {
        let dir = TempDir::new().unwrap();
        let mut extractor = BuildingExtractor::new(dir.path(), false);
        let storage = inn_storage();

        assert_eq!(
            extractor.extract(&storage, "World\\wmo\\Inn_000.wmo").unwrap(),
            ExtractOutcome::SkippedFragment
        );
        assert_eq!(
            extractor.extract(&storage, "World\\wmo\\Missing.wmo").unwrap(),
            ExtractOutcome::MissingRoot
        );
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_group_removes_output_but_keeps_doodads() {
        let dir = TempDir::new().unwrap();
        let storage = MemoryStorage::new(26972)
            .with_file(INN, inn_root())
            .with_file_id(9001, triangle_group(&[0, 1]));

        let mut extractor = BuildingExtractor::new(dir.path(), false);
        assert_eq!(
            extractor.extract(&storage, INN).unwrap(),
            ExtractOutcome::Incomplete
        );
        assert!(!dir.path().join("Goldshire_Inn.wmo").exists());

        // References of the group read before the failure survive
        let doodads = extractor.doodads("Goldshire_Inn.wmo").unwrap();
        assert_eq!(doodads.sets.len(), 1);
        assert_eq!(doodads.references, BTreeSet::from([0]));
    }

    #[test]
    fn test_doodad_models_are_extracted_with_the_building() {
        let dir = TempDir::new().unwrap();
        let chair = M2Builder::new()
            .vertex([0.0, 0.0, 0.0])
            .vertex([1.0, 0.0, 0.0])
            .vertex([0.0, 1.0, 0.0])
            .triangle([0, 1, 2])
            .build();
        let storage = inn_storage().with_file("World\\Chair.m2", chair);

        let mut extractor = BuildingExtractor::new(dir.path(), false);
        extractor.extract(&storage, INN).unwrap();

        assert_eq!(
            vmap::building_vertex_count(&dir.path().join("Chair.m2")).unwrap(),
            Some(3)
        );
        assert_eq!(
            extractor.extract_model(&storage, "World\\Chair.mdx").unwrap(),
            ExtractOutcome::AlreadyExtracted
        );
    }

    #[test]
    fn test_model_outcomes() {
        let dir = TempDir::new().unwrap();
        let storage = MemoryStorage::new(1)
            .with_file("World\\Flower.m2", M2Builder::new().build())
            .with_file_id(
                0x2A,
                M2Builder::new()
                    .vertex([0.0; 3])
                    .vertex([1.0, 0.0, 0.0])
                    .vertex([0.0, 0.0, 1.0])
                    .triangle([0, 1, 2])
                    .chunked()
                    .build(),
            )
            .with_file("World\\Broken.m2", b"MD20".to_vec());
        let extractor = BuildingExtractor::new(dir.path(), false);

        assert_eq!(
            extractor.extract_model(&storage, "World\\Flower.mdx").unwrap(),
            ExtractOutcome::NoCollision
        );
        assert!(!dir.path().join("Flower.m2").exists());
        assert_eq!(
            extractor.extract_model(&storage, "World\\Broken.m2").unwrap(),
            ExtractOutcome::MissingRoot
        );
        assert_eq!(
            extractor.extract_model(&storage, "World\\Missing.m2").unwrap(),
            ExtractOutcome::MissingRoot
        );
        assert_eq!(
            extractor.extract_model(&storage, "FILE0000002A.xxx").unwrap(),
            ExtractOutcome::Extracted {
                vertices: 3,
                groups: 1
            }
        );
        assert!(dir.path().join("FILE0000002A.xxx").is_file());
    }

    #[test]
    fn test_vertex_total_overflow_is_a_format_error() {
        assert_eq!(add_vertices(7, 5).unwrap(), 12);
        let err = add_vertices(u32::MAX - 1, 2).unwrap_err();
        assert!(matches!(err, Error::InvalidChunk { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_named_groups_and_skipped_groups() {
        let dir = TempDir::new().unwrap();
        let root = RootBuilder::new(2, 7)
            .group_name("hall")
            .group_name("antiportal")
            .build();
        let storage = MemoryStorage::new(1)
            .with_file("World\\wmo\\Tower.wmo", root)
            .with_file("World\\wmo\\Tower_000.wmo", triangle_group(&[]))
            .with_file(
                "World\\wmo\\Tower_001.wmo",
                GroupBuilder::new().group_name(5).build(),
            );

        let mut extractor = BuildingExtractor::new(dir.path(), true);
        assert_eq!(
            extractor.extract(&storage, "World\\wmo\\Tower.wmo").unwrap(),
            ExtractOutcome::Extracted {
                vertices: 3,
                groups: 1
            }
        );

        let data = fs::read(dir.path().join("Tower.wmo")).unwrap();
        assert_eq!(u32::from_le_bytes(data[12..16].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(data[16..20].try_into().unwrap()), 7);
    }

    #[test]
    fn test_file_id_doodad_names() {
        let data = WmoDoodadData {
            file_ids: vec![0, 0xABC],
            ..WmoDoodadData::default()
        };
        let spawn = |index| ModdEntry {
            name_index_and_flags: index,
            position: [0.0; 3],
            orientation: [0.0, 0.0, 0.0, 1.0],
            scale: 1.0,
            color: [0; 4],
        };
        assert_eq!(data.model_name(&spawn(1)).as_deref(), Some("FILE00000ABC.xxx"));
        assert_eq!(data.model_name(&spawn(0)), None);
        assert_eq!(data.model_name(&spawn(5)), None);
    }
}
