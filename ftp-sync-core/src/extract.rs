//! 7z extraction backed by `sevenz-rust`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::contract::{ExpandError, Expander};

#[derive(Debug, Default, Clone, Copy)]
pub struct SevenZipExpander;

impl Expander for SevenZipExpander {
    fn expand(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExpandError> {
        std::fs::create_dir_all(dest).map_err(|source| ExpandError::Io {
            path: dest.to_path_buf(),
            source,
        })?;

        let mut extracted = Vec::new();
        sevenz_rust::decompress_file_with_extract_fn(archive, dest, |entry, reader, target| {
            if !entry.is_directory() {
                debug!(entry = entry.name(), target = %target.display(), "Extracting entry");
                extracted.push(target.clone());
            }
            sevenz_rust::default_entry_extract_fn(entry, reader, target)
        })
        .map_err(|e| ExpandError::Archive {
            path: archive.to_path_buf(),
            message: e.to_string(),
        })?;

        info!(archive = %archive.display(), files = extracted.len(), "Archive expanded");
        Ok(extracted)
    }
}
