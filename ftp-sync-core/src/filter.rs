//! Selects the remote entries that are strictly newer than a threshold.

use thiserror::Error;
use tracing::{info, warn};

use crate::contract::{RemoteEntry, Timestamp};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    /// The caller passed a threshold without a time zone.
    #[error("threshold {0} has no time zone; a UTC threshold is required")]
    NaiveThreshold(chrono::NaiveDateTime),
}

/// Entries whose modification time is strictly greater than `threshold`,
/// in input order.
///
/// Naive modification times are read as UTC. Entries without a modification
/// time are never newer and are left out.
pub fn newer_than(
    entries: &[RemoteEntry],
    threshold: &Timestamp,
) -> Result<Vec<RemoteEntry>, FilterError> {
    let threshold = match threshold {
        Timestamp::Utc(at) => *at,
        Timestamp::Naive(naive) => return Err(FilterError::NaiveThreshold(*naive)),
    };
    info!(%threshold, "Comparing against threshold");

    let mut newer = Vec::new();
    for entry in entries {
        let Some(modified_at) = entry.modified_at else {
            warn!(path = %entry.path, "No modification time, not treated as newer");
            continue;
        };
        if !modified_at.is_aware() {
            info!(path = %entry.path, "Modification time has no time zone, assuming UTC");
        }
        let modified_at = modified_at.to_utc();
        if modified_at > threshold {
            info!(path = %entry.path, %modified_at, "Newer than threshold, included");
            newer.push(RemoteEntry {
                path: entry.path.clone(),
                modified_at: Some(Timestamp::Utc(modified_at)),
            });
        } else {
            info!(path = %entry.path, %modified_at, "Not newer than threshold");
        }
    }

    if newer.is_empty() {
        info!("No file newer than the threshold was found");
    } else {
        info!(count = newer.len(), "Files newer than the threshold");
    }
    Ok(newer)
}
