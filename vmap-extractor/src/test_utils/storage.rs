//! In-memory storage implementations

use crate::error::Result;
use crate::storage::{ArchiveStorage, FileRef, LocaleMask, StorageProvider};
use std::cell::Cell;
use std::collections::HashMap;

/// Storage holding files in memory, keyed like the loose-file backend
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    build: u32,
    files: HashMap<String, Vec<u8>>,
    ids: HashMap<u32, Vec<u8>>,
}

impl MemoryStorage {
    /// Create an empty storage reporting `build`
    pub fn new(build: u32) -> Self {
        Self {
            build,
            ..Self::default()
        }
    }

    /// Add a file by path
    pub fn with_file(mut self, name: &str, data: Vec<u8>) -> Self {
        self.insert(name, data);
        self
    }

    /// Add a file by file id
    pub fn with_file_id(mut self, id: u32, data: Vec<u8>) -> Self {
        self.ids.insert(id, data);
        self
    }

    /// Add or replace a file by path
    pub fn insert(&mut self, name: &str, data: Vec<u8>) {
        self.files.insert(key(name), data);
    }
}

fn key(name: &str) -> String {
    name.replace('\\', "/").to_ascii_lowercase()
}

impl ArchiveStorage for MemoryStorage {
    fn build_number(&self) -> u32 {
        self.build
    }

    fn read_file(&self, file: FileRef<'_>) -> Result<Option<Vec<u8>>> {
        Ok(match file {
            FileRef::Name(name) => self.files.get(&key(name)).cloned(),
            FileRef::Id(id) => self.ids.get(&id).cloned(),
        })
    }
}

/// Provider handing out a prepared [`MemoryStorage`] per locale mask
#[derive(Debug, Default)]
pub struct MemoryProvider {
    installed: LocaleMask,
    storages: Vec<(LocaleMask, MemoryStorage)>,
    open_calls: Cell<usize>,
}

impl MemoryProvider {
    /// Create a provider reporting `installed` locales
    pub fn new(installed: LocaleMask) -> Self {
        Self {
            installed,
            ..Self::default()
        }
    }

    /// Serve `storage` when opened with exactly `flags`
    pub fn with_storage(mut self, flags: LocaleMask, storage: MemoryStorage) -> Self {
        self.storages.push((flags, storage));
        self
    }

    /// Number of `open` calls so far
    pub fn open_calls(&self) -> usize {
        self.open_calls.get()
    }
}

impl StorageProvider for MemoryProvider {
    type Storage = MemoryStorage;

    fn installed_locales(&self) -> Result<LocaleMask> {
        Ok(self.installed)
    }

    fn open(&self, locales: LocaleMask) -> Result<Option<MemoryStorage>> {
        self.open_calls.set(self.open_calls.get() + 1);
        Ok(self
            .storages
            .iter()
            .find(|(flags, _)| *flags == locales)
            .map(|(_, storage)| storage.clone()))
    }
}
