use std::fs;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::{DriverdockError, Result};

/// Total uncompressed size cap while extracting (zip bomb protection).
const MAX_UNCOMPRESSED_SIZE: u64 = 256 * 1024 * 1024;

/// A regular file pulled out of a TAR stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarEntry {
    pub name: String,
    pub data: Vec<u8>,
}

/// Inflate a gzip stream into memory.
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| DriverdockError::Archive(format!("invalid gzip stream: {}", e)))?;
    Ok(out)
}

/// Parse a POSIX TAR stream into its regular-file entries.
///
/// Pure function, no filesystem or network coupling. Header layout: 100-byte
/// NUL-padded name at offset 0, 12-byte octal ASCII size at offset 124,
/// content padded up to the next 512-byte boundary. An all-NUL 512-byte
/// block (or the end of the buffer) terminates the stream.
pub fn parse_tar(data: &[u8]) -> Result<Vec<TarEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset + 512 <= data.len() {
        let header = &data[offset..offset + 512];

        let name = String::from_utf8_lossy(&header[..100])
            .trim_end_matches('\0')
            .trim()
            .to_string();
        if name.is_empty() {
            break;
        }

        let size_field = String::from_utf8_lossy(&header[124..136]);
        let size_field = size_field.trim_end_matches('\0').trim();
        let size = u64::from_str_radix(size_field, 8).map_err(|_| {
            DriverdockError::Archive(format!(
                "invalid octal size field {:?} for tar entry {:?}",
                size_field, name
            ))
        })? as usize;

        let content_start = offset + 512;
        let content_end = content_start.checked_add(size).ok_or_else(|| {
            DriverdockError::Archive(format!("tar entry {:?} has an absurd size", name))
        })?;
        if content_end > data.len() {
            return Err(DriverdockError::Archive(format!(
                "truncated tar stream: entry {:?} claims {} bytes past the end",
                name, size
            )));
        }

        // Trailing '/' marks a directory entry; only files carry content.
        if !name.ends_with('/') {
            entries.push(TarEntry {
                name,
                data: data[content_start..content_end].to_vec(),
            });
        }

        let padded = size.div_ceil(512) * 512;
        offset = content_start + padded;
    }

    Ok(entries)
}

/// Write parsed TAR entries under a target directory, rejecting entries that
/// would escape it.
pub fn unpack_entries(entries: &[TarEntry], target_dir: &Path) -> Result<()> {
    for entry in entries {
        let relative = Path::new(&entry.name);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(DriverdockError::Archive(format!(
                "tar entry {:?} has an unsafe path",
                entry.name
            )));
        }

        let out_path = target_dir.join(relative);
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, &entry.data)?;
    }

    Ok(())
}

/// Extract a zip archive to a target directory.
///
/// Zip-slip protection via `enclosed_name()` and an uncompressed-size cap.
pub fn extract_zip(bytes: &[u8], target_dir: &Path) -> Result<()> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor)
        .map_err(|e| DriverdockError::Archive(format!("corrupted zip archive: {}", e)))?;

    fs::create_dir_all(target_dir)?;

    let mut total_uncompressed: u64 = 0;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| DriverdockError::Archive(format!("failed to read zip entry {}: {}", i, e)))?;

        total_uncompressed = total_uncompressed.saturating_add(file.size());
        if total_uncompressed > MAX_UNCOMPRESSED_SIZE {
            return Err(DriverdockError::Archive(format!(
                "total uncompressed size exceeds {} bytes",
                MAX_UNCOMPRESSED_SIZE
            )));
        }

        // enclosed_name() returns None for entries with path traversal
        let entry_path = file
            .enclosed_name()
            .ok_or_else(|| {
                DriverdockError::Archive(format!("zip entry {:?} has an unsafe path", file.name()))
            })?
            .to_path_buf();

        let out_path = target_dir.join(&entry_path);

        if file.is_dir() {
            fs::create_dir_all(&out_path)?;
        } else {
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }

            let mut buf = Vec::new();
            file.read_to_end(&mut buf).map_err(|e| {
                DriverdockError::Archive(format!(
                    "failed to read zip entry {}: {}",
                    entry_path.display(),
                    e
                ))
            })?;

            fs::write(&out_path, &buf)?;
        }
    }

    Ok(())
}
