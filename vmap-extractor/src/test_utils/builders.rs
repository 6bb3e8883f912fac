//! Byte-level builders for client source files

use crate::formats::{MAP_SIZE, MAP_TILE_COUNT};
use crate::gameobjects::gameobject_display_schema;
use crate::map_registry::{MAP_LAYOUT_HASH, map_schema};
use wow_db2::{Db2Writer, TableSchema, Value};

/// Encode one chunk; `id` is given readable and stored reversed
pub fn chunk(id: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + payload.len());
    out.extend(id.iter().rev());
    out.extend((payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn mver(version: u32) -> Vec<u8> {
    chunk(b"MVER", &version.to_le_bytes())
}

fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn u32s(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

fn u16s(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// NUL-terminated string block plus the offset of each name
fn string_block(names: &[String]) -> (Vec<u8>, Vec<u32>) {
    let mut block = Vec::new();
    let mut offsets = Vec::with_capacity(names.len());
    for name in names {
        offsets.push(block.len() as u32);
        block.extend_from_slice(name.as_bytes());
        block.push(0);
    }
    (block, offsets)
}

fn wmo_placement_bytes(name_id: u32, unique_id: u32, position: [f32; 3], flags: u16, doodad_set: u16) -> Vec<u8> {
    let mut entry = Vec::with_capacity(64);
    entry.extend(name_id.to_le_bytes());
    entry.extend(unique_id.to_le_bytes());
    entry.extend(floats(&position));
    entry.extend(floats(&[0.0, 0.0, 0.0]));
    entry.extend(floats(&[position[0] - 1.0, position[1] - 1.0, position[2] - 1.0]));
    entry.extend(floats(&[position[0] + 1.0, position[1] + 1.0, position[2] + 1.0]));
    entry.extend(flags.to_le_bytes());
    entry.extend(doodad_set.to_le_bytes());
    entry.extend(0u16.to_le_bytes());
    entry.extend(1024u16.to_le_bytes());
    entry
}

/// Builds a WDT
#[derive(Debug, Clone, Default)]
pub struct WdtBuilder {
    tiles: Vec<(usize, usize)>,
    obj0_ids: Vec<(usize, usize, u32)>,
    global: Option<(String, u32, [f32; 3])>,
}

impl WdtBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a tile as present
    pub fn tile(mut self, x: usize, y: usize) -> Self {
        self.tiles.push((x, y));
        self
    }

    /// Give a tile an `_obj0.adt` file id (adds a MAID chunk)
    pub fn obj0_file_id(mut self, x: usize, y: usize, id: u32) -> Self {
        self.obj0_ids.push((x, y, id));
        self
    }

    /// Make this a single-building map
    pub fn global_wmo(mut self, name: &str, unique_id: u32, position: [f32; 3]) -> Self {
        self.global = Some((name.to_string(), unique_id, position));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut flags = 0u32;
        if self.global.is_some() {
            flags |= 0x1;
        }
        if !self.obj0_ids.is_empty() {
            flags |= 0x200;
        }

        let mut mphd = vec![0u32; 8];
        mphd[0] = flags;

        let mut main = vec![0u32; MAP_TILE_COUNT * 2];
        for (x, y) in &self.tiles {
            main[(y * MAP_SIZE + x) * 2] = 0x1;
        }

        let mut out = mver(18);
        out.extend(chunk(b"MPHD", &u32s(&mphd)));
        out.extend(chunk(b"MAIN", &u32s(&main)));

        if !self.obj0_ids.is_empty() {
            let mut maid = vec![0u32; MAP_TILE_COUNT * 8];
            for (x, y, id) in &self.obj0_ids {
                maid[MAP_TILE_COUNT + y * MAP_SIZE + x] = *id;
            }
            out.extend(chunk(b"MAID", &u32s(&maid)));
        }

        if let Some((name, unique_id, position)) = &self.global {
            let (block, _) = string_block(std::slice::from_ref(name));
            out.extend(chunk(b"MWMO", &block));
            out.extend(chunk(
                b"MODF",
                &wmo_placement_bytes(0, *unique_id, *position, 0, 0),
            ));
        }
        out
    }
}

/// Builds the object chunks of a terrain tile
#[derive(Debug, Clone, Default)]
pub struct AdtBuilder {
    doodads: Vec<String>,
    wmos: Vec<String>,
    mddf: Vec<u8>,
    modf: Vec<u8>,
}

impl AdtBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a model name (MMDX/MMID)
    pub fn doodad(mut self, name: &str) -> Self {
        self.doodads.push(name.to_string());
        self
    }

    /// Add a building name (MWMO/MWID)
    pub fn wmo(mut self, name: &str) -> Self {
        self.wmos.push(name.to_string());
        self
    }

    /// Add an MDDF entry with zero rotation
    pub fn doodad_placement(
        mut self,
        name_id: u32,
        unique_id: u32,
        position: [f32; 3],
        scale: u16,
        flags: u16,
    ) -> Self {
        self.mddf.extend(name_id.to_le_bytes());
        self.mddf.extend(unique_id.to_le_bytes());
        self.mddf.extend(floats(&position));
        self.mddf.extend(floats(&[0.0, 0.0, 0.0]));
        self.mddf.extend(scale.to_le_bytes());
        self.mddf.extend(flags.to_le_bytes());
        self
    }

    /// Add an MODF entry with zero rotation and a 2-unit box around `position`
    pub fn wmo_placement(
        mut self,
        name_id: u32,
        unique_id: u32,
        position: [f32; 3],
        flags: u16,
        doodad_set: u16,
    ) -> Self {
        self.modf.extend(wmo_placement_bytes(
            name_id, unique_id, position, flags, doodad_set,
        ));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let (mmdx, mmid) = string_block(&self.doodads);
        let (mwmo, mwid) = string_block(&self.wmos);

        let mut out = mver(18);
        out.extend(chunk(b"MMDX", &mmdx));
        out.extend(chunk(b"MMID", &u32s(&mmid)));
        out.extend(chunk(b"MWMO", &mwmo));
        out.extend(chunk(b"MWID", &u32s(&mwid)));
        out.extend(chunk(b"MDDF", &self.mddf));
        out.extend(chunk(b"MODF", &self.modf));
        out
    }
}

/// Builds a WMO root file
#[derive(Debug, Clone, Default)]
pub struct RootBuilder {
    group_count: u32,
    wmo_id: u32,
    group_names: Vec<String>,
    doodad_names: Vec<String>,
    doodad_file_ids: Vec<u32>,
    doodad_sets: Vec<u8>,
    doodad_spawns: Vec<u8>,
    group_file_ids: Vec<u32>,
}

impl RootBuilder {
    pub fn new(group_count: u32, wmo_id: u32) -> Self {
        Self {
            group_count,
            wmo_id,
            ..Self::default()
        }
    }

    /// Append a MOGN name; offsets follow the order of calls
    pub fn group_name(mut self, name: &str) -> Self {
        self.group_names.push(name.to_string());
        self
    }

    /// Append a MODN name; offsets follow the order of calls
    pub fn doodad_name(mut self, name: &str) -> Self {
        self.doodad_names.push(name.to_string());
        self
    }

    pub fn doodad_file_ids(mut self, ids: &[u32]) -> Self {
        self.doodad_file_ids.extend_from_slice(ids);
        self
    }

    pub fn doodad_set(mut self, name: &str, start: u32, count: u32) -> Self {
        let mut raw_name = [0u8; 20];
        let len = name.len().min(19);
        raw_name[..len].copy_from_slice(&name.as_bytes()[..len]);
        self.doodad_sets.extend(raw_name);
        self.doodad_sets.extend(start.to_le_bytes());
        self.doodad_sets.extend(count.to_le_bytes());
        self.doodad_sets.extend(0u32.to_le_bytes());
        self
    }

    /// Add an unrotated, unscaled spawn
    pub fn doodad_spawn(self, name_index: u32, position: [f32; 3]) -> Self {
        self.doodad_spawn_with(name_index, position, [0.0, 0.0, 0.0, 1.0], 1.0)
    }

    /// Add a spawn with an (x, y, z, w) orientation and scale
    pub fn doodad_spawn_with(
        mut self,
        name_index: u32,
        position: [f32; 3],
        orientation: [f32; 4],
        scale: f32,
    ) -> Self {
        self.doodad_spawns.extend(name_index.to_le_bytes());
        self.doodad_spawns.extend(floats(&position));
        self.doodad_spawns.extend(floats(&orientation));
        self.doodad_spawns.extend(scale.to_le_bytes());
        self.doodad_spawns.extend([0xFF, 0xFF, 0xFF, 0xFF]);
        self
    }

    pub fn group_file_ids(mut self, ids: &[u32]) -> Self {
        self.group_file_ids.extend_from_slice(ids);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let (mogn, _) = string_block(&self.group_names);
        let (modn, _) = string_block(&self.doodad_names);

        let mut mohd = Vec::with_capacity(64);
        mohd.extend(u32s(&[
            0,
            self.group_count,
            0,
            0,
            self.doodad_names.len() as u32,
            (self.doodad_spawns.len() / 40) as u32,
            (self.doodad_sets.len() / 32) as u32,
        ]));
        mohd.extend([0u8; 4]);
        mohd.extend(self.wmo_id.to_le_bytes());
        mohd.extend(floats(&[-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]));
        mohd.extend(0u16.to_le_bytes());
        mohd.extend(0u16.to_le_bytes());

        let mut out = mver(17);
        out.extend(chunk(b"MOHD", &mohd));
        out.extend(chunk(b"MOGN", &mogn));
        out.extend(chunk(b"MODS", &self.doodad_sets));
        if !self.doodad_names.is_empty() {
            out.extend(chunk(b"MODN", &modn));
        }
        if !self.doodad_file_ids.is_empty() {
            out.extend(chunk(b"MODI", &u32s(&self.doodad_file_ids)));
        }
        out.extend(chunk(b"MODD", &self.doodad_spawns));
        if !self.group_file_ids.is_empty() {
            out.extend(chunk(b"GFID", &u32s(&self.group_file_ids)));
        }
        out
    }
}

/// Builds a doodad model with a collision mesh
#[derive(Debug, Clone)]
pub struct M2Builder {
    version: u32,
    chunked: bool,
    indices: Vec<u16>,
    vertices: Vec<f32>,
}

impl Default for M2Builder {
    fn default() -> Self {
        Self {
            version: 264,
            chunked: false,
            indices: Vec::new(),
            vertices: Vec::new(),
        }
    }
}

impl M2Builder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Wrap the header in an `MD21` chunk
    pub fn chunked(mut self) -> Self {
        self.chunked = true;
        self
    }

    pub fn vertex(mut self, position: [f32; 3]) -> Self {
        self.vertices.extend(position);
        self
    }

    pub fn triangle(mut self, indices: [u16; 3]) -> Self {
        self.indices.extend(indices);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        const HEADER_SIZE: usize = 0xF0;
        let index_offset = HEADER_SIZE;
        let vertex_offset = index_offset + self.indices.len() * 2;

        let mut md20 = Vec::with_capacity(vertex_offset + self.vertices.len() * 4);
        md20.extend(b"MD20");
        md20.extend(self.version.to_le_bytes());
        md20.resize(0xD8, 0);
        md20.extend(u32s(&[
            self.indices.len() as u32,
            index_offset as u32,
            (self.vertices.len() / 3) as u32,
            vertex_offset as u32,
            0,
            0,
        ]));
        md20.extend(u16s(&self.indices));
        md20.extend(floats(&self.vertices));

        if !self.chunked {
            return md20;
        }
        let mut out = Vec::with_capacity(md20.len() + 8);
        out.extend(b"MD21");
        out.extend((md20.len() as u32).to_le_bytes());
        out.extend(md20);
        out
    }
}

/// Builds a GameObjectDisplayInfo table
#[derive(Debug, Clone, Default)]
pub struct GameObjectTableBuilder {
    displays: Vec<(u32, u32)>,
}

impl GameObjectTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a display row referencing a model file id; 0 means none
    pub fn display(mut self, id: u32, file_data_id: u32) -> Self {
        self.displays.push((id, file_data_id));
        self
    }

    pub fn build(&self) -> wow_db2::Result<Vec<u8>> {
        let schema = gameobject_display_schema()?;
        let mut writer = Db2Writer::new(&schema);
        for (id, file_data_id) in &self.displays {
            let mut values = vec![Value::Int(*file_data_id)];
            values.extend(std::iter::repeat_n(Value::Float(0.0), 6));
            values.extend([Value::Float(1.0), Value::Float(1.0), Value::Short(0)]);
            writer.add_row(*id, values)?;
        }
        writer.to_bytes()
    }
}

/// Builds a WMO group file
#[derive(Debug, Clone, Default)]
pub struct GroupBuilder {
    flags: u32,
    group_name: u32,
    group_id: u32,
    materials: Vec<u8>,
    indices: Vec<u16>,
    vertices: Vec<f32>,
    batches: Vec<u16>,
    doodad_refs: Vec<u16>,
}

impl GroupBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }

    /// MOGN offset of the group's name
    pub fn group_name(mut self, offset: u32) -> Self {
        self.group_name = offset;
        self
    }

    pub fn group_id(mut self, id: u32) -> Self {
        self.group_id = id;
        self
    }

    /// Add a triangle with its MOPY flags
    pub fn triangle(mut self, indices: [u16; 3], flags: u8) -> Self {
        self.indices.extend(indices);
        self.materials.extend([flags, 0]);
        self
    }

    pub fn vertex(mut self, position: [f32; 3]) -> Self {
        self.vertices.extend(position);
        self
    }

    /// Add a render batch covering `index_count` indices
    pub fn batch(mut self, index_count: u16) -> Self {
        self.batches.push(index_count);
        self
    }

    pub fn doodad_refs(mut self, refs: &[u16]) -> Self {
        self.doodad_refs.extend_from_slice(refs);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut header = Vec::with_capacity(68);
        header.extend(self.group_name.to_le_bytes());
        header.extend(0u32.to_le_bytes());
        header.extend(self.flags.to_le_bytes());
        header.extend(floats(&[-1.0, -1.0, -1.0, 1.0, 1.0, 1.0]));
        header.extend(u16s(&[0, 0, 0, 0, self.batches.len() as u16, 0]));
        header.extend([0u8; 4]);
        header.extend(0u32.to_le_bytes());
        header.extend(self.group_id.to_le_bytes());
        header.extend(0u32.to_le_bytes());
        header.extend(0u32.to_le_bytes());

        let mut moba = Vec::with_capacity(self.batches.len() * 24);
        let mut start = 0u32;
        for count in &self.batches {
            moba.extend([0u8; 12]);
            moba.extend(start.to_le_bytes());
            moba.extend(count.to_le_bytes());
            moba.extend([0u8; 6]);
            start += u32::from(*count);
        }

        let mut mogp = header;
        mogp.extend(chunk(b"MOPY", &self.materials));
        mogp.extend(chunk(b"MOVI", &u16s(&self.indices)));
        mogp.extend(chunk(b"MOVT", &floats(&self.vertices)));
        mogp.extend(chunk(b"MOBA", &moba));
        if !self.doodad_refs.is_empty() {
            mogp.extend(chunk(b"MODR", &u16s(&self.doodad_refs)));
        }

        let mut out = mver(17);
        out.extend(chunk(b"MOGP", &mogp));
        out
    }
}

/// Builds a Map table
#[derive(Debug, Clone)]
pub struct MapTableBuilder {
    layout_hash: u32,
    maps: Vec<(u32, String, i16, i16)>,
    copies: Vec<(u32, u32)>,
}

impl Default for MapTableBuilder {
    fn default() -> Self {
        Self {
            layout_hash: MAP_LAYOUT_HASH,
            maps: Vec::new(),
            copies: Vec::new(),
        }
    }
}

impl MapTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write the table with another layout hash
    pub fn layout_hash(mut self, layout_hash: u32) -> Self {
        self.layout_hash = layout_hash;
        self
    }

    /// Add a map row; parents of -1 mean none
    pub fn map(mut self, id: u32, directory: &str, parent: i16, cosmetic_parent: i16) -> Self {
        self.maps
            .push((id, directory.to_string(), parent, cosmetic_parent));
        self
    }

    /// Publish `source` again as `new`
    pub fn copy(mut self, source: u32, new: u32) -> Self {
        self.copies.push((source, new));
        self
    }

    pub fn build(&self) -> wow_db2::Result<Vec<u8>> {
        let base = map_schema()?;
        let schema = TableSchema::new(
            base.name(),
            base.fields().to_vec(),
            base.index_field(),
            base.parent_index_field(),
            self.layout_hash,
        )?;

        let mut writer = Db2Writer::new(&schema);
        for (id, directory, parent, cosmetic_parent) in &self.maps {
            writer.add_row(
                *id,
                vec![
                    directory.as_str().into(),
                    Value::Int(0),
                    Value::Int(0),
                    Value::Float(1.0),
                    Value::Float(0.0),
                    Value::Float(0.0),
                    directory.as_str().into(),
                    "".into(),
                    "".into(),
                    Value::Short(0),
                    Value::Short(0),
                    Value::Short(0xFFFF),
                    Value::Short(0),
                    Value::Short(*parent as u16),
                    Value::Short(*cosmetic_parent as u16),
                    Value::Short(0),
                    Value::Byte(0),
                    Value::Byte(0),
                    Value::Byte(0),
                    Value::Byte(0),
                    Value::Byte(0),
                ],
            )?;
        }
        for (source, new) in &self.copies {
            writer.add_copy(*source, *new);
        }
        writer.to_bytes()
    }
}
