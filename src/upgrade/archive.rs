//! Extraction of the executable from a release archive.
//!
//! Release archives are gzip-compressed tar streams. The binary is located
//! with a single forward scan over the entries; nothing is unpacked to disk
//! and the archive is never seeked or buffered beyond what gzip and tar need.

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;
use tracing::debug;

use crate::core::BackplaneError;

/// Read the entry named `binary_name` out of a `.tar.gz` archive.
///
/// An entry matches when its whole path, or its final path component, equals
/// `binary_name`, so both `ocm-backplane` and `./ocm-backplane` are found.
/// Directories and links with that name are skipped.
pub fn extract_binary(archive: &[u8], binary_name: &str) -> Result<Vec<u8>, BackplaneError> {
    let read_error = |source| BackplaneError::ArchiveRead { source };

    let mut archive = Archive::new(GzDecoder::new(archive));
    for entry in archive.entries().map_err(read_error)? {
        let mut entry = entry.map_err(read_error)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let path = entry.path().map_err(read_error)?.into_owned();
        if !matches_binary(&path, binary_name) {
            debug!("Skipping archive entry {}", path.display());
            continue;
        }

        // The header size is untrusted, so the buffer grows with the data read
        let mut data = Vec::new();
        entry.read_to_end(&mut data).map_err(read_error)?;
        if data.len() as u64 != entry.size() {
            return Err(read_error(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!(
                    "entry {} is truncated: header claims {} bytes, archive holds {}",
                    path.display(),
                    entry.size(),
                    data.len()
                ),
            )));
        }
        debug!("Extracted {} ({} bytes)", path.display(), data.len());
        return Ok(data);
    }

    Err(BackplaneError::BinaryNotFound {
        name: binary_name.to_string(),
    })
}

fn matches_binary(path: &Path, binary_name: &str) -> bool {
    path == Path::new(binary_name)
        || path.file_name().and_then(|name| name.to_str()) == Some(binary_name)
}
