//! Storage backed by an extracted client tree
//!
//! Layout:
//!
//! ```text
//! <root>/.build.info          pipe-separated build metadata
//! <root>/listfile.csv         optional `id;path` mapping
//! <root>/Data/...             client files
//! <root>/Data/<locale>/...    locale-specific overrides
//! ```
//!
//! Lookups are case-insensitive and treat `\` and `/` alike.

use super::{ArchiveStorage, FileRef, Locale, LocaleMask, StorageProvider};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Build metadata file at the client root
pub const BUILD_INFO_FILE: &str = ".build.info";

/// Optional file id mapping at the client root
pub const LISTFILE: &str = "listfile.csv";

/// Directory holding the client files
pub const DATA_DIR: &str = "Data";

/// Fields of interest from `.build.info`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildInfo {
    pub build: u32,
    pub locales: LocaleMask,
}

impl BuildInfo {
    /// Parse `.build.info` content. The first active row wins.
    ///
    /// Headers look like `Version!STRING:0`; only the part before `!` is matched.
    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'|')
            .flexible(true)
            .from_reader(content.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.split('!').next().is_some_and(|n| n.trim() == name))
        };
        let version = column("Version")
            .ok_or_else(|| Error::Storage("build info has no Version column".to_string()))?;
        let tags = column("Tags");
        let active = column("Active");

        let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
        let row = rows
            .iter()
            .find(|row| active.and_then(|i| row.get(i)).is_none_or(|v| v.trim() == "1"))
            .or_else(|| rows.first())
            .ok_or_else(|| Error::Storage("build info has no rows".to_string()))?;

        let build = row
            .get(version)
            .and_then(|v| v.trim().rsplit('.').next())
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(0);

        let locales = tags
            .and_then(|i| row.get(i))
            .map(|tags| {
                tags.split(|c: char| c.is_whitespace() || c == ':' || c == '?')
                    .filter_map(LocaleMask::from_tag)
                    .fold(LocaleMask::empty(), |mask, flag| mask | flag)
            })
            .unwrap_or_default();

        Ok(Self { build, locales })
    }
}

/// Opens [`LooseStorage`] for a client root
#[derive(Debug, Clone)]
pub struct LooseStorageProvider {
    root: PathBuf,
}

impl LooseStorageProvider {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn build_info(&self) -> Result<Option<BuildInfo>> {
        let path = self.root.join(BUILD_INFO_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        BuildInfo::parse(&content).map(Some)
    }

    /// Locale directories present under `Data/`
    fn locale_dirs(&self) -> LocaleMask {
        Locale::ALL
            .iter()
            .filter(|locale| **locale != Locale::None)
            .filter(|locale| self.root.join(DATA_DIR).join(locale.name()).is_dir())
            .fold(LocaleMask::empty(), |mask, locale| {
                mask | locale.storage_flags()
            })
    }
}

impl StorageProvider for LooseStorageProvider {
    type Storage = LooseStorage;

    fn installed_locales(&self) -> Result<LocaleMask> {
        let tagged = self.build_info()?.map(|info| info.locales).unwrap_or_default();
        Ok(tagged | self.locale_dirs())
    }

    fn open(&self, locales: LocaleMask) -> Result<Option<LooseStorage>> {
        let data_dir = self.root.join(DATA_DIR);
        if !data_dir.is_dir() {
            return Ok(None);
        }

        let build = self.build_info()?.map_or(0, |info| info.build);
        let locale_dir = Locale::ALL
            .iter()
            .filter(|locale| locales.intersects(locale.storage_flags()))
            .map(|locale| data_dir.join(locale.name()))
            .find(|dir| dir.is_dir());

        let mut index = HashMap::new();
        index_files(&data_dir, &data_dir, &mut index)?;
        if let Some(dir) = &locale_dir {
            index_files(dir, dir, &mut index)?;
        }

        let listfile_path = self.root.join(LISTFILE);
        let listfile = if listfile_path.is_file() {
            read_listfile(&listfile_path)?
        } else {
            HashMap::new()
        };

        log::debug!(
            "Indexed {} files under {} ({} listfile entries)",
            index.len(),
            data_dir.display(),
            listfile.len()
        );

        Ok(Some(LooseStorage {
            build,
            index,
            listfile,
        }))
    }
}

/// Files of an extracted client tree
#[derive(Debug, Clone)]
pub struct LooseStorage {
    build: u32,
    index: HashMap<String, PathBuf>,
    listfile: HashMap<u32, String>,
}

impl LooseStorage {
    fn lookup(&self, name: &str) -> Option<&Path> {
        self.index.get(&index_key(name)).map(PathBuf::as_path)
    }
}

impl ArchiveStorage for LooseStorage {
    fn build_number(&self) -> u32 {
        self.build
    }

    fn read_file(&self, file: FileRef<'_>) -> Result<Option<Vec<u8>>> {
        let path = match file {
            FileRef::Name(name) => self.lookup(name),
            FileRef::Id(id) => self
                .listfile
                .get(&id)
                .and_then(|name| self.lookup(name))
                .or_else(|| self.lookup(&file.to_string())),
        };

        match path {
            Some(path) => Ok(Some(fs::read(path)?)),
            None => Ok(None),
        }
    }
}

fn index_key(name: &str) -> String {
    name.replace('\\', "/").trim_start_matches('/').to_ascii_lowercase()
}

/// Index every file below `dir`. Symbolic links to directories are not followed.
fn index_files(base: &Path, dir: &Path, index: &mut HashMap<String, PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            index_files(base, &path, index)?;
        } else if file_type.is_symlink() && path.is_dir() {
            log::debug!("Not following directory link {}", path.display());
        } else if let Ok(relative) = path.strip_prefix(base) {
            let key = index_key(&relative.to_string_lossy());
            index.insert(key, path);
        }
    }
    Ok(())
}

fn read_listfile(path: &Path) -> Result<HashMap<u32, String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut entries = HashMap::new();
    for record in reader.records() {
        let record = record?;
        let (Some(id), Some(name)) = (record.get(0), record.get(1)) else {
            continue;
        };
        if let Ok(id) = id.trim().parse::<u32>() {
            entries.insert(id, name.trim().to_string());
        }
    }
    Ok(entries)
}
