//! Fetch-and-expand: bring selected remote files into a scratch directory and
//! unpack them.
//!
//! Files are handled one at a time: each archive is downloaded and expanded
//! before the next download starts, so two remote archives sharing a base name
//! never overwrite each other before extraction. Failures are isolated per
//! remote file: a file that cannot be downloaded or expanded is logged and
//! contributes nothing, the rest of the batch goes on.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use uuid::Uuid;

use crate::contract::{Expander, FetchError, Fetched, RemoteError, RemoteTree};
use crate::walker::base_name;

/// Creates a fresh `ftp-sync-<uuid>` directory under `root`. It is never
/// removed by this crate.
pub fn create_scratch_dir(root: &Path) -> std::io::Result<PathBuf> {
    let dir = root.join(format!("ftp-sync-{}", Uuid::new_v4()));
    fs::create_dir_all(&dir)?;
    info!(path = %dir.display(), "Created scratch directory");
    Ok(dir)
}

/// Downloads and expands each path in turn, one outcome per path.
pub fn fetch_all<R, E>(tree: &mut R, paths: &[String], expander: &E, scratch: &Path) -> Vec<Fetched>
where
    R: RemoteTree + ?Sized,
    E: Expander + ?Sized,
{
    paths
        .iter()
        .map(|remote_path| {
            let outcome = fetch_one(tree, remote_path, expander, scratch);
            match &outcome {
                Ok(files) => info!(
                    remote = %remote_path,
                    files = files.len(),
                    "File downloaded and extracted successfully"
                ),
                Err(FetchError::Download(e)) => {
                    error!(error = %e, remote = %remote_path, "Error downloading file")
                }
                Err(FetchError::Expand(e)) => {
                    error!(error = %e, remote = %remote_path, "Error extracting file")
                }
            }
            Fetched {
                remote_path: remote_path.clone(),
                outcome,
            }
        })
        .collect()
}

fn fetch_one<R, E>(
    tree: &mut R,
    remote_path: &str,
    expander: &E,
    scratch: &Path,
) -> Result<Vec<PathBuf>, FetchError>
where
    R: RemoteTree + ?Sized,
    E: Expander + ?Sized,
{
    let local = download_one(tree, remote_path, scratch)?;
    Ok(expander.expand(&local, scratch)?)
}

/// Streams `remote_path` into `scratch` under its base name. A partial file
/// left by a failed transfer is removed.
pub fn download_one<R: RemoteTree + ?Sized>(
    tree: &mut R,
    remote_path: &str,
    scratch: &Path,
) -> Result<PathBuf, RemoteError> {
    let name = base_name(remote_path);
    if name.is_empty() {
        return Err(RemoteError::Protocol(format!(
            "remote path {remote_path:?} has no file name"
        )));
    }
    let local = scratch.join(name);
    match tree.retrieve_to(remote_path, &local) {
        Ok(bytes) => {
            info!(remote = %remote_path, local = %local.display(), bytes, "File downloaded");
            Ok(local)
        }
        Err(e) => {
            if local.exists() {
                if let Err(cleanup) = fs::remove_file(&local) {
                    warn!(error = %cleanup, local = %local.display(), "Could not remove partial download");
                }
            }
            Err(e)
        }
    }
}

/// Every extracted file of the successful fetches, in fetch order.
pub fn extracted_files(fetched: Vec<Fetched>) -> Vec<PathBuf> {
    fetched
        .into_iter()
        .filter_map(|f| f.outcome.ok())
        .flatten()
        .collect()
}
