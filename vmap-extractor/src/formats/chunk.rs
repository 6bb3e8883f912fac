//! Chunked file reading shared by WDT, ADT and WMO sources

use crate::error::{Error, Result};
use binrw::{BinRead, BinReaderExt};
use std::io::Cursor;

/// Chunk header size (magic + size)
pub const CHUNK_HEADER_SIZE: usize = 8;

/// One chunk borrowed from a file buffer
#[derive(Debug, Clone, Copy)]
pub struct RawChunk<'a> {
    /// Readable chunk id (`MVER`, not the stored `REVM`)
    pub id: [u8; 4],
    /// Chunk payload
    pub data: &'a [u8],
}

impl RawChunk<'_> {
    /// Readable chunk id as a string
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }

    /// Read fixed-size entries filling the payload; a trailing partial entry is ignored
    pub fn entries<T>(&self, entry_size: usize) -> Result<Vec<T>>
    where
        T: for<'b> BinRead<Args<'b> = ()>,
    {
        let count = self.data.len() / entry_size;
        let mut cursor = Cursor::new(self.data);
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let entry: T = cursor
                .read_le()
                .map_err(|e| Error::invalid_chunk(self.name(), e.to_string()))?;
            entries.push(entry);
        }
        Ok(entries)
    }

    /// Little-endian `u32` list
    pub fn u32_list(&self) -> Vec<u32> {
        self.data
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect()
    }

    /// Little-endian `u16` list
    pub fn u16_list(&self) -> Vec<u16> {
        self.data
            .chunks_exact(2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .collect()
    }

    /// NUL-separated string block as `(offset, string)` pairs, empty strings skipped
    pub fn strings(&self) -> Vec<(u32, String)> {
        self.split_strings()
            .filter(|(_, name)| !name.is_empty())
            .collect()
    }

    /// Every NUL-separated entry in order, empty ones included.
    ///
    /// Names addressed by position rather than offset must be read this way
    /// so that an empty entry still takes its slot.
    pub fn string_list(&self) -> Vec<String> {
        self.split_strings().map(|(_, name)| name).collect()
    }

    fn split_strings(&self) -> impl Iterator<Item = (u32, String)> + '_ {
        let data = self.data;
        let mut start = 0;
        std::iter::from_fn(move || {
            if start >= data.len() {
                return None;
            }
            let end = data[start..]
                .iter()
                .position(|&b| b == 0)
                .map_or(data.len(), |pos| start + pos);
            let entry = (
                start as u32,
                String::from_utf8_lossy(&data[start..end]).into_owned(),
            );
            start = end + 1;
            Some(entry)
        })
    }
}

/// Iterator over the top-level chunks of a buffer
#[derive(Debug, Clone)]
pub struct ChunkReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ChunkReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for ChunkReader<'a> {
    type Item = Result<RawChunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let remaining = self.data.len().saturating_sub(self.pos);
        if remaining < CHUNK_HEADER_SIZE {
            if remaining > 0 {
                log::debug!("Ignoring {remaining} trailing bytes after last chunk");
            }
            self.pos = self.data.len();
            return None;
        }

        let header = &self.data[self.pos..self.pos + CHUNK_HEADER_SIZE];
        // Chunk ids are stored little-endian, so the readable id is reversed
        let id = [header[3], header[2], header[1], header[0]];
        let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]) as usize;

        let start = self.pos + CHUNK_HEADER_SIZE;
        let Some(end) = start.checked_add(size).filter(|end| *end <= self.data.len()) else {
            self.pos = self.data.len();
            return Some(Err(Error::invalid_chunk(
                String::from_utf8_lossy(&id),
                format!(
                    "chunk of {size} bytes at offset {} runs past end of data",
                    start - CHUNK_HEADER_SIZE
                ),
            )));
        };

        self.pos = end;
        Some(Ok(RawChunk {
            id,
            data: &self.data[start..end],
        }))
    }
}

/// Look up a string by byte offset in a string block read with [`RawChunk::strings`]
pub fn string_at(strings: &[(u32, String)], offset: u32) -> Option<&str> {
    strings
        .binary_search_by_key(&offset, |(o, _)| *o)
        .ok()
        .map(|index| strings[index].1.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::chunk;

    #[test]
    fn test_iterates_chunks() {
        let mut data = chunk(b"MVER", &18u32.to_le_bytes());
        data.extend(chunk(b"MWMO", b"a.wmo\0\0b.wmo\0"));

        let chunks: Vec<_> = ChunkReader::new(&data).collect::<Result<_>>().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(&chunks[0].id, b"MVER");
        assert_eq!(chunks[0].u32_list(), vec![18]);
        assert_eq!(
            chunks[1].strings(),
            vec![(0, "a.wmo".to_string()), (7, "b.wmo".to_string())]
        );
        assert_eq!(string_at(&chunks[1].strings(), 7), Some("b.wmo"));
        assert_eq!(string_at(&chunks[1].strings(), 3), None);
    }

    #[test]
    fn test_string_list_keeps_empty_slots() {
        let data = chunk(b"MMDX", b"\0World\\Tree.m2\0\0World\\Rock.m2\0");
        let mmdx = ChunkReader::new(&data).next().unwrap().unwrap();
        assert_eq!(
            mmdx.string_list(),
            vec!["", "World\\Tree.m2", "", "World\\Rock.m2"]
        );
        assert_eq!(mmdx.strings().len(), 2);
    }

    #[test]
    fn test_overlong_chunk_is_an_error() {
        let mut data = chunk(b"MODF", &[0u8; 8]);
        data.truncate(12);
        let mut reader = ChunkReader::new(&data);
        assert!(matches!(
            reader.next(),
            Some(Err(Error::InvalidChunk { .. }))
        ));
        assert!(reader.next().is_none());
    }
}
