//! MSIX `SignatureSha256`: the SHA256 of the package's `AppxSignature.p7x`.

use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{info, warn};
use wingetup_schema::InstallerSha256;

const SIGNATURE_ENTRY: &str = "AppxSignature.p7x";

/// Hash the signature entry of an MSIX/APPX package.
///
/// Unreadable packages and packages without a signature yield `None`.
pub async fn signature_sha256(package: &Path) -> Option<InstallerSha256> {
    let path: PathBuf = package.to_path_buf();
    let result = tokio::task::spawn_blocking(move || read_signature_hash(&path))
        .await
        .map_err(std::io::Error::other);

    match result {
        Ok(Ok(Some(hash))) => {
            info!("SignatureSha256: {hash}");
            Some(hash)
        }
        Ok(Ok(None)) => {
            warn!("{} has no {SIGNATURE_ENTRY}", package.display());
            None
        }
        Ok(Err(e)) => {
            warn!("could not read {}: {e}", package.display());
            None
        }
        Err(e) => {
            warn!("signature task failed: {e}");
            None
        }
    }
}

fn read_signature_hash(path: &Path) -> Result<Option<InstallerSha256>, zip::result::ZipError> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    let mut entry = match archive.by_name(SIGNATURE_ENTRY) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 65536];
    loop {
        let n = entry.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(Some(InstallerSha256::from_bytes(&hasher.finalize())))
}
