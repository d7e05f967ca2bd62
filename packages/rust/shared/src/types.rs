//! Core domain types shared across globdef crates.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default suffix appended to a data file's name to locate its sidecar.
pub const DEFAULT_SIDECAR_SUFFIX: &str = ".globdef";

/// Suffix appended to a sidecar path while it is being rewritten.
pub const SIDECAR_TEMP_SUFFIX: &str = ".tmp";

// ---------------------------------------------------------------------------
// Bundle
// ---------------------------------------------------------------------------

/// A data file paired with the location of its persisted fact store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bundle {
    /// The data file being enriched.
    pub data_path: PathBuf,
    /// The sidecar holding the data file's fact store.
    pub sidecar_path: PathBuf,
}

impl Bundle {
    /// Pair `data_path` with the sidecar found by appending `suffix` to its file name.
    pub fn new(data_path: impl Into<PathBuf>, suffix: &str) -> Self {
        let data_path = data_path.into();
        let sidecar_path = sidecar_path_for(&data_path, suffix);
        Self {
            data_path,
            sidecar_path,
        }
    }

    /// Path used for the atomic write of this bundle's sidecar.
    pub fn sidecar_temp_path(&self) -> PathBuf {
        temp_path_for(&self.sidecar_path)
    }
}

impl std::fmt::Display for Bundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.data_path.display())
    }
}

/// Derive the sidecar location of a data file.
pub fn sidecar_path_for(data_path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = data_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    data_path.with_file_name(name)
}

/// Derive the temporary path a file is written to before being renamed into place.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name: OsString = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(SIDECAR_TEMP_SUFFIX);
    path.with_file_name(name)
}
