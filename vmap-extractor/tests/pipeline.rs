//! End-to-end extraction over an in-memory client

use glam::Vec3;
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use vmap_extractor::gameobjects::{GAMEOBJECT_TABLE_PATH, MODEL_LIST_FILE, read_model_list};
use vmap_extractor::map_registry::MAP_TABLE_PATH;
use vmap_extractor::storage::LocaleMask;
use vmap_extractor::test_utils::{
    AdtBuilder, GameObjectTableBuilder, GroupBuilder, M2Builder, MapTableBuilder, MemoryProvider,
    MemoryStorage, RootBuilder, WdtBuilder,
};
use vmap_extractor::vmap::{self, PlacementFlags, PlacementRecord};
use vmap_extractor::{Error, ExtractorConfig, GameObjectModel, NoProgress, Pipeline};

const INN: &str = "World\\wmo\\Azeroth\\Inn.wmo";
const DUNGEON: &str = "World\\wmo\\Dungeon\\Dungeon.wmo";

fn square_group() -> Vec<u8> {
    GroupBuilder::new()
        .vertex([0.0, 0.0, 0.0])
        .vertex([1.0, 0.0, 0.0])
        .vertex([0.0, 1.0, 0.0])
        .triangle([0, 1, 2], 0x08)
        .batch(3)
        .doodad_refs(&[0])
        .build()
}

fn chair() -> Vec<u8> {
    M2Builder::new()
        .vertex([0.0, 0.0, 0.0])
        .vertex([0.5, 0.0, 0.0])
        .vertex([0.0, 0.5, 0.0])
        .triangle([0, 1, 2])
        .build()
}

fn client() -> MemoryStorage {
    let maps = MapTableBuilder::new()
        .map(0, "Azeroth", -1, -1)
        .map(5, "Dungeon", -1, -1)
        .map(10, "Phase", 0, -1)
        .copy(0, 2)
        .build()
        .unwrap();

    let inn = RootBuilder::new(1, 77)
        .doodad_name("World\\Chair.mdx")
        .doodad_set("Set_$DefaultGlobal", 0, 1)
        .doodad_spawn(0, [1.0, 0.0, 0.0])
        .build();

    let azeroth_tile = AdtBuilder::new()
        .wmo(INN)
        .wmo_placement(0, 100, [10.0, 20.0, 30.0], 0, 0)
        .build();

    let displays = GameObjectTableBuilder::new()
        .display(300, 0xC0DE)
        .build()
        .unwrap();

    MemoryStorage::new(26972)
        .with_file(MAP_TABLE_PATH, maps)
        .with_file(GAMEOBJECT_TABLE_PATH, displays)
        .with_file("World\\Chair.m2", chair())
        .with_file_id(0xC0DE, chair())
        .with_file(
            "World\\Maps\\Azeroth\\Azeroth.wdt",
            WdtBuilder::new().tile(5, 5).tile(6, 6).build(),
        )
        .with_file("World\\Maps\\Azeroth\\Azeroth_5_5_obj0.adt", azeroth_tile)
        .with_file("World\\Maps\\Phase\\Phase.wdt", WdtBuilder::new().tile(6, 6).build())
        .with_file("World\\Maps\\Phase\\Phase_6_6_obj0.adt", AdtBuilder::new().build())
        .with_file(
            "World\\Maps\\Dungeon\\Dungeon.wdt",
            WdtBuilder::new().global_wmo(DUNGEON, 7, [0.0, 0.0, 0.0]).build(),
        )
        .with_file(INN, inn)
        .with_file("World\\wmo\\Azeroth\\Inn_000.wmo", square_group())
        .with_file(DUNGEON, RootBuilder::new(1, 78).build())
        .with_file("World\\wmo\\Dungeon\\Dungeon_000.wmo", square_group())
}

fn provider() -> MemoryProvider {
    MemoryProvider::new(LocaleMask::ENUS)
        .with_storage(LocaleMask::ENUS | LocaleMask::ENGB, client())
}

fn records(output: &Path, name: &str) -> Vec<PlacementRecord> {
    PlacementRecord::read_all(&fs::read(output.join("dir_bin").join(name)).unwrap()).unwrap()
}

#[test]
fn test_full_extraction() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("Buildings");

    let config = ExtractorConfig::new(dir.path(), &output, false);
    let mut pipeline = Pipeline::open(config, &provider()).unwrap();
    assert_eq!(pipeline.build(), 26972);
    assert_eq!(pipeline.registry().len(), 4);

    let stats = pipeline.run(&mut NoProgress).unwrap();
    assert_eq!(stats.maps, 4);
    // Azeroth, its copy, and Phase's own tile plus the inherited one
    assert_eq!(stats.tiles, 4);
    assert_eq!(stats.parent_tiles, 1);
    assert_eq!(pipeline.object_count(), 3);
    assert_eq!(pipeline.gameobject_model_count(), 1);

    let models = read_model_list(&fs::read(output.join(MODEL_LIST_FILE)).unwrap()).unwrap();
    assert_eq!(
        models,
        vec![GameObjectModel {
            display_id: 300,
            is_wmo: false,
            name: "FILE0000C0DE.xxx".to_string(),
        }]
    );
    assert_eq!(
        vmap::building_vertex_count(&output.join("Chair.m2")).unwrap(),
        Some(3)
    );

    let inn_vertices = vmap::building_vertex_count(&output.join("Inn.wmo")).unwrap();
    assert!(inn_vertices.is_some_and(|count| count > 0));

    let azeroth = records(&output, "0000_05_05");
    assert_eq!(azeroth.len(), 2);
    let inn = &azeroth[0];
    assert_eq!(inn.map_id, 0);
    assert_eq!((inn.tile_x, inn.tile_y), (5, 5));
    assert_eq!(inn.placement.name, "Inn.wmo");
    assert_eq!(inn.placement.flags, PlacementFlags::HAS_BOUND);
    assert_eq!(inn.placement.unique_id, 1);
    assert_eq!(inn.placement.position, Vec3::new(30.0, 10.0, 20.0));
    assert_eq!(
        inn.placement.bounds,
        Some([Vec3::new(29.0, 9.0, 19.0), Vec3::new(31.0, 11.0, 21.0)])
    );

    let chair = &azeroth[1];
    assert_eq!(chair.placement.name, "Chair.m2");
    assert_eq!(chair.placement.flags, PlacementFlags::M2);
    assert_eq!(chair.placement.unique_id, 2);
    assert_eq!(chair.placement.position, Vec3::new(31.0, 10.0, 20.0));
    assert_eq!(chair.placement.scale, 1.0);

    // Copy of Azeroth, read from its own WDT
    let copy = records(&output, "0002_05_05");
    assert_eq!(copy.len(), 2);
    assert!(copy.iter().all(|r| r.map_id == 2));
    assert!(
        copy.iter()
            .all(|r| !r.placement.flags.contains(PlacementFlags::PARENT_SPAWN))
    );

    // Phase inherits (5, 5) from Azeroth and keeps the same object ids
    let inherited = records(&output, "0010_05_05");
    assert_eq!(inherited.len(), 2);
    for (child, parent) in inherited.iter().zip(&azeroth) {
        assert_eq!(child.map_id, 10);
        assert!(child.placement.flags.contains(PlacementFlags::PARENT_SPAWN));
        assert_eq!(child.placement.unique_id, parent.placement.unique_id);
    }
    assert!(records(&output, "0010_06_06").is_empty());
    assert!(!output.join("dir_bin").join("0000_06_06").exists());

    let global = records(&output, "0005");
    assert_eq!(global.len(), 1);
    assert_eq!((global[0].tile_x, global[0].tile_y), (65, 65));
    assert_eq!(global[0].placement.name, "Dungeon.wmo");
    assert_eq!(global[0].placement.unique_id, 3);
    let offset = 533.333_33_f32 * 32.0;
    assert!((global[0].placement.position - Vec3::new(offset, offset, 0.0)).length() < 0.01);
}

#[test]
fn test_second_run_refuses_output() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("Buildings");

    let config = ExtractorConfig::new(dir.path(), &output, true);
    let mut pipeline = Pipeline::open(config.clone(), &provider()).unwrap();
    pipeline.run(&mut NoProgress).unwrap();
    let first = fs::read(output.join("dir_bin").join("0000_05_05")).unwrap();

    let err = Pipeline::open(config, &provider()).unwrap_err();
    assert!(matches!(err, Error::PollutedOutput(_)));
    assert_eq!(fs::read(output.join("dir_bin").join("0000_05_05")).unwrap(), first);
}

#[test]
fn test_missing_map_table_is_fatal() {
    let dir = TempDir::new().unwrap();
    let provider = MemoryProvider::new(LocaleMask::ENUS)
        .with_storage(LocaleMask::ENUS | LocaleMask::ENGB, MemoryStorage::new(26972));
    let config = ExtractorConfig::new(dir.path(), dir.path().join("out"), false);

    let err = Pipeline::open(config.clone(), &provider).unwrap_err();
    assert!(matches!(err, Error::MissingTable(_)));
    assert!(err.is_fatal());

    // Nothing was written, so a retry fails the same way instead of as polluted
    assert!(!config.bin_dir().exists());
    let err = Pipeline::open(config, &provider).unwrap_err();
    assert!(matches!(err, Error::MissingTable(_)));
}
