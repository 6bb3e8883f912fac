//! Raw vmap output files
//!
//! Two kinds of files are written:
//!
//! - **Building files** (`<output>/<Name>.wmo`): an 8-byte magic, the total
//!   vertex count, the group count and the root WMO id, followed by one
//!   block per accepted group. Doodad models (`<output>/<Name>.m2`) use the
//!   same layout with a single group holding the collision mesh.
//! - **Placement files** (`<output>/dir_bin/<map>_<x>_<y>`): a flat list of
//!   model placement records.

use crate::error::{Error, Result};
use crate::formats::{M2Model, WmoGroup};
use bitflags::bitflags;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Building file magic
pub const RAW_VMAP_MAGIC: &[u8; 8] = b"VMAP_4.B";

/// Offset of the vertex count in a building file
pub const VERTEX_COUNT_OFFSET: u64 = 8;

/// Offset of the group count in a building file
pub const GROUP_COUNT_OFFSET: u64 = 12;

/// Write a building header with placeholder vertex count
pub fn write_root_header<W: Write>(writer: &mut W, group_count: u32, root_wmo_id: u32) -> io::Result<()> {
    write_header(writer, 0, group_count, root_wmo_id)
}

fn write_header<W: Write>(writer: &mut W, vertex_count: u32, group_count: u32, root_wmo_id: u32) -> io::Result<()> {
    writer.write_all(RAW_VMAP_MAGIC)?;
    writer.write_u32::<LittleEndian>(vertex_count)?;
    writer.write_u32::<LittleEndian>(group_count)?;
    writer.write_u32::<LittleEndian>(root_wmo_id)?;
    Ok(())
}

/// Overwrite the vertex and group counts of a finished building file
pub fn patch_root_header<W: Write + Seek>(writer: &mut W, vertex_count: u32, group_count: u32) -> io::Result<()> {
    writer.seek(SeekFrom::Start(VERTEX_COUNT_OFFSET))?;
    writer.write_u32::<LittleEndian>(vertex_count)?;
    writer.seek(SeekFrom::Start(GROUP_COUNT_OFFSET))?;
    writer.write_u32::<LittleEndian>(group_count)?;
    writer.seek(SeekFrom::End(0))?;
    Ok(())
}

/// Vertex count stored in a building file.
///
/// `None` when the file does not exist or is too short to hold a header.
pub fn building_vertex_count(path: &Path) -> io::Result<Option<u32>> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut header = [0u8; 12];
    match file.read_exact(&mut header) {
        Ok(()) => Ok(Some(u32::from_le_bytes([
            header[8], header[9], header[10], header[11],
        ]))),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

/// Append one group block and return the number of vertices written.
///
/// Precise output keeps every index and vertex. Compact output keeps only
/// collision triangles and the vertices they use, renumbered in vertex order.
pub fn write_group<W: Write>(writer: &mut W, group: &WmoGroup, precise: bool) -> Result<u32> {
    let header = &group.header;
    write_group_header(writer, header.flags, header.group_id, header.bbox_min, header.bbox_max)?;

    let batches: Vec<u32> = group.batch_index_counts.iter().map(|c| u32::from(*c)).collect();
    let (indices, vertices) = if precise {
        (group.indices.clone(), group.vertices.clone())
    } else {
        collision_mesh(group)?
    };

    write_mesh(writer, &batches, &indices, &vertices)?;
    Ok(vertices.len() as u32)
}

/// Write a complete single-group file for a doodad model's collision mesh.
///
/// Vertices are converted to vmap axes (`y` negated) and every triangle's
/// winding is flipped. Returns the number of vertices written.
pub fn write_model<W: Write>(writer: &mut W, model: &M2Model) -> io::Result<u32> {
    let vertices: Vec<Vec3> = model
        .vertices
        .iter()
        .map(|v| Vec3::new(v.x, -v.y, v.z))
        .collect();
    let mut indices = model.indices.clone();
    for triangle in indices.chunks_exact_mut(3) {
        triangle.swap(1, 2);
    }

    let vertex_count = vertices.len() as u32;
    write_header(writer, vertex_count, 1, 0)?;
    write_group_header(writer, 0, 0, [0.0; 3], [0.0; 3])?;
    write_mesh(writer, &[indices.len() as u32], &indices, &vertices)?;
    Ok(vertex_count)
}

fn write_group_header<W: Write>(
    writer: &mut W,
    flags: u32,
    group_id: u32,
    bbox_min: [f32; 3],
    bbox_max: [f32; 3],
) -> io::Result<()> {
    writer.write_u32::<LittleEndian>(flags)?;
    writer.write_u32::<LittleEndian>(group_id)?;
    for v in bbox_min.iter().chain(&bbox_max) {
        writer.write_f32::<LittleEndian>(*v)?;
    }
    // Liquid geometry is not extracted
    writer.write_u32::<LittleEndian>(0)?;
    Ok(())
}

/// `GRP `, `INDX` and `VERT` blocks of one group
fn write_mesh<W: Write>(writer: &mut W, batches: &[u32], indices: &[u16], vertices: &[Vec3]) -> io::Result<()> {
    writer.write_all(b"GRP ")?;
    writer.write_u32::<LittleEndian>(batches.len() as u32 * 4 + 4)?;
    writer.write_u32::<LittleEndian>(batches.len() as u32)?;
    for count in batches {
        writer.write_u32::<LittleEndian>(*count)?;
    }

    writer.write_all(b"INDX")?;
    writer.write_u32::<LittleEndian>(indices.len() as u32 * 2 + 4)?;
    writer.write_u32::<LittleEndian>(indices.len() as u32)?;
    for index in indices {
        writer.write_u16::<LittleEndian>(*index)?;
    }

    writer.write_all(b"VERT")?;
    writer.write_u32::<LittleEndian>(vertices.len() as u32 * 12 + 4)?;
    writer.write_u32::<LittleEndian>(vertices.len() as u32)?;
    for vertex in vertices {
        write_vec3(writer, *vertex)?;
    }
    Ok(())
}

/// Collision triangles of a group with their vertices renumbered
fn collision_mesh(group: &WmoGroup) -> Result<(Vec<u16>, Vec<Vec3>)> {
    let vertex_count = group.vertices.len();
    let mut used = vec![false; vertex_count];
    let mut triangles = Vec::new();

    for (i, triangle) in group.indices.chunks_exact(3).enumerate() {
        let collides = group
            .materials
            .get(i)
            .is_some_and(|material| material.is_collision());
        if !collides {
            continue;
        }
        if triangle.iter().any(|index| usize::from(*index) >= vertex_count) {
            return Err(Error::invalid_chunk(
                "MOVI",
                format!("triangle {i} references a vertex past {vertex_count}"),
            ));
        }
        for index in triangle {
            used[usize::from(*index)] = true;
        }
        triangles.extend_from_slice(triangle);
    }

    let mut renumbered = vec![0u16; vertex_count];
    let mut vertices = Vec::new();
    for (index, vertex) in group.vertices.iter().enumerate() {
        if used[index] {
            renumbered[index] = vertices.len() as u16;
            vertices.push(*vertex);
        }
    }

    let indices = triangles
        .iter()
        .map(|index| renumbered[usize::from(*index)])
        .collect();
    Ok((indices, vertices))
}

bitflags! {
    /// Placement record flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PlacementFlags: u8 {
        /// Placement of a doodad model rather than a building
        const M2 = 0x1;
        /// Record carries a bounding box
        const HAS_BOUND = 0x2;
        /// Record was taken from the parent map's tile
        const PARENT_SPAWN = 0x4;
    }
}

/// One placed model or building, independent of the tile it is written to
#[derive(Debug, Clone, PartialEq)]
pub struct ModelPlacement {
    pub flags: PlacementFlags,
    pub name_set: u8,
    pub unique_id: u32,
    pub position: Vec3,
    /// Rotation in degrees
    pub rotation: Vec3,
    pub scale: f32,
    /// World-space bounding box, buildings only
    pub bounds: Option<[Vec3; 2]>,
    /// Output file name of the model or building
    pub name: String,
}

impl ModelPlacement {
    /// Write the record tagged with the owning map and tile.
    ///
    /// `HAS_BOUND` follows `bounds`; `PARENT_SPAWN` is added when requested.
    pub fn write<W: Write>(
        &self,
        writer: &mut W,
        map_id: u32,
        tile_x: u32,
        tile_y: u32,
        parent_spawn: bool,
    ) -> io::Result<()> {
        let mut flags = self.flags - PlacementFlags::HAS_BOUND;
        if self.bounds.is_some() {
            flags |= PlacementFlags::HAS_BOUND;
        }
        flags.set(PlacementFlags::PARENT_SPAWN, parent_spawn);

        writer.write_u32::<LittleEndian>(map_id)?;
        writer.write_u32::<LittleEndian>(tile_x)?;
        writer.write_u32::<LittleEndian>(tile_y)?;
        writer.write_u8(flags.bits())?;
        writer.write_u8(self.name_set)?;
        writer.write_u32::<LittleEndian>(self.unique_id)?;
        write_vec3(writer, self.position)?;
        write_vec3(writer, self.rotation)?;
        writer.write_f32::<LittleEndian>(self.scale)?;
        if let Some([min, max]) = self.bounds {
            write_vec3(writer, min)?;
            write_vec3(writer, max)?;
        }
        writer.write_u32::<LittleEndian>(self.name.len() as u32)?;
        writer.write_all(self.name.as_bytes())?;
        Ok(())
    }
}

fn write_vec3<W: Write>(writer: &mut W, v: Vec3) -> io::Result<()> {
    writer.write_f32::<LittleEndian>(v.x)?;
    writer.write_f32::<LittleEndian>(v.y)?;
    writer.write_f32::<LittleEndian>(v.z)?;
    Ok(())
}

fn read_vec3<R: Read>(reader: &mut R) -> io::Result<Vec3> {
    Ok(Vec3::new(
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
        reader.read_f32::<LittleEndian>()?,
    ))
}

/// A placement record as stored in a placement file
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementRecord {
    pub map_id: u32,
    pub tile_x: u32,
    pub tile_y: u32,
    /// Placement with the flags exactly as stored
    pub placement: ModelPlacement,
}

impl PlacementRecord {
    pub fn read<R: Read>(reader: &mut R) -> io::Result<Self> {
        let map_id = reader.read_u32::<LittleEndian>()?;
        let tile_x = reader.read_u32::<LittleEndian>()?;
        let tile_y = reader.read_u32::<LittleEndian>()?;
        let flags = PlacementFlags::from_bits_retain(reader.read_u8()?);
        let name_set = reader.read_u8()?;
        let unique_id = reader.read_u32::<LittleEndian>()?;
        let position = read_vec3(reader)?;
        let rotation = read_vec3(reader)?;
        let scale = reader.read_f32::<LittleEndian>()?;
        let bounds = if flags.contains(PlacementFlags::HAS_BOUND) {
            Some([read_vec3(reader)?, read_vec3(reader)?])
        } else {
            None
        };
        let name_len = reader.read_u32::<LittleEndian>()? as usize;
        let mut name = vec![0u8; name_len];
        reader.read_exact(&mut name)?;

        Ok(Self {
            map_id,
            tile_x,
            tile_y,
            placement: ModelPlacement {
                flags,
                name_set,
                unique_id,
                position,
                rotation,
                scale,
                bounds,
                name: String::from_utf8_lossy(&name).into_owned(),
            },
        })
    }

    /// Read every record of a placement file
    pub fn read_all(data: &[u8]) -> io::Result<Vec<Self>> {
        let mut cursor = io::Cursor::new(data);
        let mut records = Vec::new();
        while (cursor.position() as usize) < data.len() {
            records.push(Self::read(&mut cursor)?);
        }
        Ok(records)
    }
}
