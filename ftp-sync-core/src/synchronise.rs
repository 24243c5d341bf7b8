//! High-level pipeline: one synchronisation run, from remote walk to upload.
//!
//! A run:
//!   - walks the remote archive for matching files and resolves the watermark
//!     from the destination container,
//!   - keeps the files strictly newer than the watermark,
//!   - downloads and expands them one by one into a fresh scratch directory,
//!   - uploads every expanded file, keyed by base name.
//!
//! # Error Handling
//! Environmental failures are logged and absorbed: an unreachable remote means
//! "no files found", an unreachable container means "no watermark" (so every
//! file is new), and per-file download, expansion and upload failures only drop
//! that file. The run fails only on a caller contract violation in the filter
//! or when the scratch directory cannot be created.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::contract::{Archive, BlobStore, Expander, Timestamp};
use crate::fetch::{create_scratch_dir, extracted_files};
use crate::filter::{newer_than, FilterError};
use crate::publish::{publish, PublishReport};
use crate::watermark::{resolve_watermark, Watermark};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("failed to create scratch directory under {root}: {source}")]
    Scratch {
        root: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What a run did, for logs and callers.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub watermark: Watermark,
    pub found: usize,
    pub selected: Vec<String>,
    pub scratch_dir: Option<PathBuf>,
    pub extracted: Vec<PathBuf>,
    pub published: PublishReport,
}

pub async fn synchronise<A, S>(
    archive: &A,
    store: &S,
    expander: Arc<dyn Expander>,
    scratch_root: &Path,
) -> Result<SyncReport, SyncError>
where
    A: Archive + ?Sized,
    S: BlobStore + ?Sized,
{
    let run_id = Uuid::new_v4();
    let span = info_span!("sync_run", %run_id);
    run(run_id, archive, store, expander, scratch_root)
        .instrument(span)
        .await
}

async fn run<A, S>(
    run_id: Uuid,
    archive: &A,
    store: &S,
    expander: Arc<dyn Expander>,
    scratch_root: &Path,
) -> Result<SyncReport, SyncError>
where
    A: Archive + ?Sized,
    S: BlobStore + ?Sized,
{
    info!("[SYNC] Starting synchronisation run");

    let found = match archive.list_matching().await {
        Ok(found) => found,
        Err(e) => {
            error!(error = %e, "[SYNC][ERROR] Failed to connect or list files");
            Vec::new()
        }
    };
    let watermark = resolve_watermark(store).await;

    let selected = newer_than(&found, &Timestamp::Utc(watermark.at))?;
    let mut report = SyncReport {
        run_id,
        watermark,
        found: found.len(),
        selected: selected.into_iter().map(|entry| entry.path).collect(),
        scratch_dir: None,
        extracted: Vec::new(),
        published: PublishReport::default(),
    };
    if report.selected.is_empty() {
        info!("[SYNC] No new files to process");
        return Ok(report);
    }

    let scratch = create_scratch_dir(scratch_root).map_err(|source| SyncError::Scratch {
        root: scratch_root.to_path_buf(),
        source,
    })?;
    report.scratch_dir = Some(scratch.clone());

    let fetched = match archive
        .fetch(report.selected.clone(), scratch.clone(), expander)
        .await
    {
        Ok(fetched) => fetched,
        Err(e) => {
            error!(error = %e, "[SYNC][ERROR] FTP connection failed, nothing downloaded");
            Vec::new()
        }
    };
    report.extracted = extracted_files(fetched);

    report.published = publish(store, &report.extracted).await;
    info!(
        selected = report.selected.len(),
        extracted = report.extracted.len(),
        uploaded = report.published.uploaded.len(),
        failed = report.published.failed.len(),
        "[SYNC] Synchronisation run finished"
    );
    Ok(report)
}
