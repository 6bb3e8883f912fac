//! Doodad models (M2)
//!
//! Only the collision mesh is read. Pre-Legion files start with the `MD20`
//! header; Legion and later wrap it in an `MD21` chunk, and every offset in
//! the header is relative to the start of the `MD20` data.
//!
//! ```text
//! Offset | Size | Field
//! -------|------|---------------------------
//! 0x00   |  4   | magic "MD20"
//! 0x04   |  4   | version
//! 0xA0   | 24   | bounding box
//! 0xB8   |  4   | bounding sphere radius
//! 0xBC   | 24   | collision box
//! 0xD4   |  4   | collision sphere radius
//! 0xD8   |  8   | bounding triangles (count, offset)
//! 0xE0   |  8   | bounding vertices (count, offset)
//! 0xE8   |  8   | bounding normals (count, offset)
//! ```

use crate::error::{Error, Result};
use binrw::{BinRead, BinReaderExt};
use glam::Vec3;
use std::io::Cursor;

/// Magic of the chunk wrapping the header on Legion and later
pub const MD21_MAGIC: [u8; 4] = *b"MD21";

/// Magic of the model header
pub const MD20_MAGIC: [u8; 4] = *b"MD20";

/// Oldest header layout with the collision arrays at 0xD8 (Wrath of the Lich King)
pub const MIN_VERSION: u32 = 264;

/// Count and offset of an array stored elsewhere in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead)]
#[br(little)]
pub struct M2Array {
    pub count: u32,
    pub offset: u32,
}

/// The part of the model header up to the collision arrays
#[derive(Debug, Clone, PartialEq, BinRead)]
#[br(little, magic = b"MD20")]
pub struct M2Header {
    pub version: u32,
    #[br(pad_before = 0x98)]
    pub bounding_box_min: [f32; 3],
    pub bounding_box_max: [f32; 3],
    pub bounding_sphere_radius: f32,
    pub collision_box_min: [f32; 3],
    pub collision_box_max: [f32; 3],
    pub collision_sphere_radius: f32,
    pub bounding_triangles: M2Array,
    pub bounding_vertices: M2Array,
    pub bounding_normals: M2Array,
}

impl M2Header {
    pub const SIZE: usize = 0xF0;
}

/// Collision mesh of a model, in model coordinates
#[derive(Debug, Clone, PartialEq)]
pub struct M2Model {
    pub header: M2Header,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u16>,
    pub vertices: Vec<Vec3>,
}

impl M2Model {
    /// Parse a model file, `MD20` or `MD21`-wrapped
    pub fn parse(data: &[u8]) -> Result<Self> {
        let data = md20_data(data)?;
        if data.len() < M2Header::SIZE {
            return Err(Error::invalid_chunk(
                "MD20",
                format!("header needs {} bytes, found {}", M2Header::SIZE, data.len()),
            ));
        }

        let header: M2Header = Cursor::new(&data[..M2Header::SIZE])
            .read_le()
            .map_err(|e| Error::invalid_chunk("MD20", e.to_string()))?;
        if header.version < MIN_VERSION {
            return Err(Error::invalid_chunk(
                "MD20",
                format!("unsupported model version {}", header.version),
            ));
        }

        let indices = array_bytes(data, header.bounding_triangles, 2, "bounding triangles")?
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect();
        let vertices = array_bytes(data, header.bounding_vertices, 12, "bounding vertices")?
            .chunks_exact(12)
            .map(|b| {
                let f = |i: usize| f32::from_le_bytes([b[i], b[i + 1], b[i + 2], b[i + 3]]);
                Vec3::new(f(0), f(4), f(8))
            })
            .collect();

        Ok(Self {
            header,
            indices,
            vertices,
        })
    }

    /// Whether the model has collision triangles at all
    pub fn has_collision(&self) -> bool {
        !self.indices.is_empty()
    }
}

/// The `MD20` data of a file, unwrapping an `MD21` chunk
fn md20_data(data: &[u8]) -> Result<&[u8]> {
    if data.len() < 8 || data[..4] != MD21_MAGIC {
        return match data.get(..4) {
            Some(magic) if magic == MD20_MAGIC => Ok(data),
            _ => Err(Error::invalid_chunk("MD20", "not a model file")),
        };
    }

    let size = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    data.get(8..)
        .and_then(|rest| rest.get(..size))
        .ok_or_else(|| {
            Error::invalid_chunk(
                "MD21",
                format!("chunk of {size} bytes runs past end of data"),
            )
        })
}

fn array_bytes<'a>(data: &'a [u8], array: M2Array, element_size: usize, what: &str) -> Result<&'a [u8]> {
    let start = array.offset as usize;
    (array.count as usize)
        .checked_mul(element_size)
        .and_then(|len| start.checked_add(len))
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| {
            Error::invalid_chunk(
                "MD20",
                format!("{} {what} at offset {start} run past end of data", array.count),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::M2Builder;
    use pretty_assertions::assert_eq;

    fn triangle() -> M2Builder {
        M2Builder::new()
            .vertex([1.0, 2.0, 3.0])
            .vertex([4.0, 5.0, 6.0])
            .vertex([7.0, 8.0, 9.0])
            .triangle([0, 1, 2])
    }

    #[test]
    fn test_collision_mesh() {
        let model = M2Model::parse(&triangle().build()).unwrap();
        assert_eq!(model.header.version, 264);
        assert_eq!(model.indices, vec![0, 1, 2]);
        assert_eq!(model.vertices[2], Vec3::new(7.0, 8.0, 9.0));
        assert!(model.has_collision());
    }

    #[test]
    fn test_md21_wrapped_model() {
        let chunked = triangle().version(274).chunked().build();
        assert_eq!(&chunked[..4], b"MD21");

        let model = M2Model::parse(&chunked).unwrap();
        assert_eq!(model.header.version, 274);
        assert_eq!(model.vertices.len(), 3);
    }

    #[test]
    fn test_model_without_collision() {
        let model = M2Model::parse(&M2Builder::new().build()).unwrap();
        assert!(!model.has_collision());
    }

    #[test]
    fn test_rejects_old_and_truncated_models() {
        assert!(M2Model::parse(&triangle().version(256).build()).is_err());
        assert!(M2Model::parse(b"REVM\x04\0\0\0").is_err());

        let mut data = triangle().build();
        data.truncate(M2Header::SIZE + 4);
        assert!(matches!(
            M2Model::parse(&data),
            Err(Error::InvalidChunk { .. })
        ));
    }
}
