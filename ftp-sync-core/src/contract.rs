//! # contract: seams and shared data types for a synchronisation run
//!
//! Every external collaborator of a run is reached through one trait here:
//!
//! - [`RemoteTree`]: a blocking, stateful session on the remote file tree
//!   (working directory, listing, modification times, retrieval).
//! - [`Archive`]: the async view of the remote archive used by the
//!   orchestration: list matching files, then download and expand a batch of
//!   them one file at a time.
//! - [`BlobStore`]: the destination container (list objects, put object).
//! - [`Expander`]: archive extraction into a local directory.
//!
//! ## Mocking & Testing
//! - All traits are annotated for `mockall`; the mocks are exported behind the
//!   `test-export-mocks` feature so the CLI crate can use them too.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use mockall::automock;
use serde::Serialize;
use thiserror::Error;

/// A modification time as reported by a remote or local source.
///
/// FTP `MDTM` replies carry no zone marker, so they arrive as [`Timestamp::Naive`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Timestamp {
    Utc(DateTime<Utc>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    pub fn is_aware(&self) -> bool {
        matches!(self, Timestamp::Utc(_))
    }

    /// Attaches UTC to a naive value; aware values are returned unchanged.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Timestamp::Utc(at) => *at,
            Timestamp::Naive(naive) => Utc.from_utc_datetime(naive),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(at: DateTime<Utc>) -> Self {
        Timestamp::Utc(at)
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(naive: NaiveDateTime) -> Self {
        Timestamp::Naive(naive)
    }
}

/// One matched file on the remote tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEntry {
    /// Fully qualified remote path, `/`-joined.
    pub path: String,
    /// `None` when the server refused to report a modification time.
    pub modified_at: Option<Timestamp>,
}

/// Outcome of the change-directory probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    NotADirectory,
}

#[derive(Debug, Error)]
pub enum RemoteError {
    /// A permanent negative (5xx) reply.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("unexpected server reply: {0}")]
    Protocol(String),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("local I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("background task failed: {0}")]
    Task(String),
}

/// Why a single selected file contributed nothing to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("download failed: {0}")]
    Download(#[from] RemoteError),
    #[error("extraction failed: {0}")]
    Expand(#[from] ExpandError),
}

/// Result of downloading and expanding one remote file.
#[derive(Debug)]
pub struct Fetched {
    pub remote_path: String,
    /// Files extracted from the archive, in extraction order.
    pub outcome: Result<Vec<PathBuf>, FetchError>,
}

/// A blocking session on a hierarchical remote file tree.
///
/// Implementations keep a current working directory; the walker relies on it
/// to classify entries through [`RemoteTree::probe`].
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait RemoteTree {
    fn current_dir(&mut self) -> Result<String, RemoteError>;

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError>;

    /// Try to enter `path`. A refusal means `path` is a file and is reported
    /// as [`EntryKind::NotADirectory`], not as an error.
    fn probe(&mut self, path: &str) -> Result<EntryKind, RemoteError>;

    /// Names in the current working directory, in server order.
    fn list_names(&mut self) -> Result<Vec<String>, RemoteError>;

    fn modified_at(&mut self, path: &str) -> Result<NaiveDateTime, RemoteError>;

    /// Stream the remote file at `path` into the local file `dest`, returning
    /// the number of bytes written.
    fn retrieve_to(&mut self, path: &str, dest: &Path) -> Result<u64, RemoteError>;
}

/// The remote archive as seen by a run.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Archive: Send + Sync {
    /// Every file under the configured root whose base name matches the pattern.
    async fn list_matching(&self) -> Result<Vec<RemoteEntry>, RemoteError>;

    /// Download each path into `scratch` and expand it there before the next
    /// one is downloaded. One outcome per path, in order. An `Err` means no
    /// session could be established at all.
    async fn fetch(
        &self,
        paths: Vec<String>,
        scratch: PathBuf,
        expander: Arc<dyn Expander>,
    ) -> Result<Vec<Fetched>, RemoteError>;
}

/// Metadata of an object in the destination container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store error: {0}")]
    Backend(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The destination container.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn list_objects(&self) -> Result<Vec<StoredObject>, StoreError>;

    /// Stream the local file `local` to `key`, replacing any existing object.
    /// Returns the number of bytes stored.
    async fn put_file(&self, key: String, local: PathBuf) -> Result<u64, StoreError>;
}

#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("failed to expand {path}: {message}")]
    Archive { path: PathBuf, message: String },
    #[error("I/O error expanding {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Archive extraction.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Expander: Send + Sync {
    /// Extract `archive` into `dest`, returning the paths of the extracted files.
    fn expand(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>, ExpandError>;
}
