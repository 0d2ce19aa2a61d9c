//! File hashing.

use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use wingetup_schema::InstallerSha256;

#[derive(Error, Debug)]
pub enum HashFileError {
    #[error("IO error hashing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is empty: {0}")]
    Empty(PathBuf),
}

/// Compute the SHA256 of a file (streaming).
///
/// # Errors
///
/// Returns an error if the file cannot be read or is empty.
pub fn hash_file(path: &Path) -> Result<InstallerSha256, HashFileError> {
    let io_err = |source| HashFileError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = std::fs::File::open(path).map_err(io_err)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 65536]; // 64KB buffer
    let mut total = 0usize;

    loop {
        let bytes_read = file.read(&mut buffer).map_err(io_err)?;
        if bytes_read == 0 {
            break;
        }
        total += bytes_read;
        hasher.update(&buffer[..bytes_read]);
    }

    if total == 0 {
        return Err(HashFileError::Empty(path.to_path_buf()));
    }
    Ok(InstallerSha256::from_bytes(&hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn hashes_uppercase() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("setup.exe");
        std::fs::write(&path, "hello world").unwrap();
        assert_eq!(
            hash_file(&path).unwrap().as_str(),
            "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9"
        );
    }

    #[test]
    fn rejects_empty_and_missing_files() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.msi");
        std::fs::write(&empty, "").unwrap();
        assert!(matches!(hash_file(&empty), Err(HashFileError::Empty(_))));
        assert!(matches!(
            hash_file(&dir.path().join("missing.msi")),
            Err(HashFileError::Io { .. })
        ));
    }
}
