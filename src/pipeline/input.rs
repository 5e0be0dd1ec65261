//! Input loading: read a user-supplied `.xlsx` / `.docx` path into memory.
//!
//! Both inputs are ZIP-based Office packages. The `PK\x03\x04` magic is
//! checked up front so a mislabelled file surfaces as
//! [`BolError::NotAnOfficePackage`] instead of an opaque ZIP error deep in
//! the codec.

use crate::error::BolError;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Local file header signature of a ZIP archive.
pub const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";

/// Read an Office package from disk.
pub async fn read_package(path: &Path) -> Result<Vec<u8>, BolError> {
    let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::PermissionDenied => BolError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => BolError::FileNotFound {
            path: path.to_path_buf(),
        },
    })?;

    check_magic(path, &bytes)?;
    debug!("Read {} ({} bytes)", path.display(), bytes.len());
    Ok(bytes)
}

/// Reject buffers that do not start with the ZIP signature.
pub fn check_magic(path: &Path, bytes: &[u8]) -> Result<(), BolError> {
    if bytes.len() >= 4 && bytes[..4] == ZIP_MAGIC {
        return Ok(());
    }
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    Err(BolError::NotAnOfficePackage {
        path: path.to_path_buf(),
        magic,
    })
}
