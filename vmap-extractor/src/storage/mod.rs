//! Client archive storage
//!
//! The extractor never touches client archives directly. It talks to an
//! [`ArchiveStorage`] opened for one locale, which is obtained from a
//! [`StorageProvider`] by the [`StorageNegotiator`].

pub mod locale;
pub mod loose;
pub mod negotiator;

pub use locale::{Locale, LocaleMask};
pub use loose::{DATA_DIR, LooseStorage, LooseStorageProvider};
pub use negotiator::{NegotiatedStorage, StorageNegotiator};

use crate::error::Result;
use std::fmt;

/// Reference to a file in storage, either by path or by numeric file id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRef<'a> {
    Name(&'a str),
    Id(u32),
}

impl<'a> FileRef<'a> {
    /// Classify a name; `FILE%08X.xxx` placeholders become file ids
    pub fn parse(name: &'a str) -> Self {
        file_id_from_name(name).map_or(FileRef::Name(name), FileRef::Id)
    }
}

impl fmt::Display for FileRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRef::Name(name) => f.write_str(name),
            FileRef::Id(id) => write!(f, "FILE{id:08X}.xxx"),
        }
    }
}

/// Parse a `FILE%08X.xxx` placeholder name into its file id
pub fn file_id_from_name(name: &str) -> Option<u32> {
    let hex = name
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("FILE"))
        .and_then(|_| name.get(4..12))?;
    let suffix = name.get(12..)?;
    if !suffix.eq_ignore_ascii_case(".xxx") {
        return None;
    }
    u32::from_str_radix(hex, 16).ok()
}

/// An opened client storage
pub trait ArchiveStorage {
    /// Client build number; 0 means the storage is unusable
    fn build_number(&self) -> u32;

    /// Read a whole file. `Ok(None)` means the file is not in storage.
    fn read_file(&self, file: FileRef<'_>) -> Result<Option<Vec<u8>>>;

    /// Read a file by name, resolving `FILE%08X.xxx` placeholders to ids
    fn read_named(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.read_file(FileRef::parse(name))
    }
}

/// Something that can open client storage for a set of locales
pub trait StorageProvider {
    /// Storage handle type
    type Storage: ArchiveStorage;

    /// Locales installed in the client
    fn installed_locales(&self) -> Result<LocaleMask>;

    /// Open storage restricted to the given locales; `Ok(None)` if it cannot be opened
    fn open(&self, locales: LocaleMask) -> Result<Option<Self::Storage>>;
}
