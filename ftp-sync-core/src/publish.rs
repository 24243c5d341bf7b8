//! Uploads expanded files to the destination container, keyed by base name.
//!
//! Directory structure is flattened: two files sharing a base name land on the
//! same key and the later upload wins. A failed upload is logged and the
//! remaining files are still uploaded; nothing is rolled back.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, error, info};

use crate::contract::{BlobStore, StoreError};

#[derive(Debug, Default, Clone, Serialize)]
pub struct PublishReport {
    /// Keys written, in upload order (a key appears once per upload).
    pub uploaded: Vec<String>,
    pub failed: Vec<FailedUpload>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailedUpload {
    pub local_path: PathBuf,
    pub error: String,
}

pub fn object_key(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().into_owned())
}

pub async fn publish<S: BlobStore + ?Sized>(store: &S, files: &[PathBuf]) -> PublishReport {
    let mut report = PublishReport::default();
    for file in files {
        match upload_one(store, file).await {
            Ok(key) => {
                info!(key = %key, local = %file.display(), "File uploaded");
                report.uploaded.push(key);
            }
            Err(e) => {
                error!(error = %e, local = %file.display(), "Upload failed, continuing");
                report.failed.push(FailedUpload {
                    local_path: file.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
    info!(
        uploaded = report.uploaded.len(),
        failed = report.failed.len(),
        "Publishing finished"
    );
    report
}

async fn upload_one<S: BlobStore + ?Sized>(store: &S, file: &Path) -> Result<String, StoreError> {
    let key = object_key(file).ok_or_else(|| {
        StoreError::Backend(format!("{} has no file name", file.display()))
    })?;
    let bytes = store.put_file(key.clone(), file.to_path_buf()).await?;
    debug!(key = %key, bytes, "Upload streamed");
    Ok(key)
}
