//! Derives the "latest processed" point from the destination container.
//!
//! Nothing is persisted: the watermark is the newest `last_modified` among the
//! objects currently in the container.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info};

use crate::contract::{BlobStore, StoredObject};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Watermark {
    /// Name of the newest object, `None` when the container looked empty.
    pub object: Option<String>,
    pub at: DateTime<Utc>,
}

impl Watermark {
    /// The earliest representable instant: every remote file is newer.
    pub fn beginning() -> Self {
        Self {
            object: None,
            at: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// Newest object wins; on equal timestamps the first one listed is kept.
    pub fn from_objects(objects: &[StoredObject]) -> Self {
        objects.iter().fold(Self::beginning(), |current, object| {
            if object.last_modified > current.at {
                Self {
                    object: Some(object.name.clone()),
                    at: object.last_modified,
                }
            } else {
                current
            }
        })
    }
}

/// Resolves the watermark. A store that cannot be listed is logged and treated
/// as empty, so the run considers every remote file new.
pub async fn resolve_watermark<S: BlobStore + ?Sized>(store: &S) -> Watermark {
    let objects = match store.list_objects().await {
        Ok(objects) => objects,
        Err(e) => {
            error!(error = %e, "Failed to list destination container, assuming it is empty");
            return Watermark::beginning();
        }
    };

    let watermark = Watermark::from_objects(&objects);
    match &watermark.object {
        Some(name) => info!(object = %name, modified_at = %watermark.at, "Most recent object found"),
        None => info!(at = %watermark.at, "No object found in container"),
    }
    watermark
}
