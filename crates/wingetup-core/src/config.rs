//! Loading checkver files from disk.

use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;
use wingetup_schema::package_id::CHECKVER_SUFFIX;
use wingetup_schema::{CheckverConfig, CheckverError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: CheckverError,
    },

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Read and parse a checkver file, deriving identifier and manifest path.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid config.
pub fn load_checkver(path: &Path) -> Result<CheckverConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    CheckverConfig::parse(&content, Some(path)).map_err(|source| ConfigError::Invalid {
        path: path.to_path_buf(),
        source,
    })
}

/// Every `*.checkver.yaml` below `dir`, sorted by path.
///
/// # Errors
///
/// Returns an error if the directory cannot be traversed.
pub fn walk_checkver_files(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|source| ConfigError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_file()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.ends_with(CHECKVER_SUFFIX))
        {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// Find the checkver file configuring `package_id` below `dir`.
pub fn find_checkver(dir: &Path, package_id: &str) -> Option<(PathBuf, CheckverConfig)> {
    walk_checkver_files(dir)
        .ok()?
        .into_iter()
        .filter_map(|p| load_checkver(&p).ok().map(|c| (p, c)))
        .find(|(_, c)| c.package_identifier.as_ref().is_some_and(|id| id.as_str() == package_id))
}
