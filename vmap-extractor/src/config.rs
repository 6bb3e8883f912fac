//! Run configuration

use crate::storage::DATA_DIR;
use std::path::{Path, PathBuf};

/// Default output directory, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "./Buildings";

/// Name of the placement directory inside the output directory
pub const BIN_DIR: &str = "dir_bin";

/// Name of the legacy placement list; its presence marks a used output directory
pub const LEGACY_DIR_FILE: &str = "dir";

/// Settings for one extraction run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorConfig {
    /// Client root holding `Data/` and `.build.info`
    pub data_dir: PathBuf,
    /// Where building files and `dir_bin/` are written
    pub output_dir: PathBuf,
    /// Keep every triangle and vertex instead of the collision mesh only
    pub precise: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            precise: false,
        }
    }
}

impl ExtractorConfig {
    pub fn new(data_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>, precise: bool) -> Self {
        Self {
            data_dir: data_dir.into(),
            output_dir: output_dir.into(),
            precise,
        }
    }

    /// Directory receiving the placement files
    pub fn bin_dir(&self) -> PathBuf {
        self.output_dir.join(BIN_DIR)
    }

    /// The client's `Data/` directory
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join(DATA_DIR)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
