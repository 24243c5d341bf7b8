//! Recursive walk over a remote tree that has no "is directory" query.
//!
//! Each listed item is classified by trying to enter it ([`RemoteTree::probe`]):
//! entering succeeds for directories, which are walked in turn, and is refused
//! for files, which are matched against the [`NamePattern`]. Any path containing
//! the exclusion marker is skipped before it is probed.
//!
//! The working directory of the session is restored before every return.

use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::contract::{EntryKind, RemoteEntry, RemoteTree, Timestamp};

/// File name pattern, anchored at the start of the base name.
#[derive(Debug, Clone)]
pub struct NamePattern {
    source: String,
    anchored: Regex,
}

impl NamePattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let anchored = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(Self {
            source: pattern.to_string(),
            anchored,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, base_name: &str) -> bool {
        self.anchored.is_match(base_name)
    }
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub pattern: NamePattern,
    pub exclude_marker: String,
}

impl WalkOptions {
    pub fn new(pattern: NamePattern) -> Self {
        Self {
            pattern,
            exclude_marker: crate::config::DEFAULT_EXCLUDE_MARKER.to_string(),
        }
    }

    fn is_excluded(&self, path: &str) -> bool {
        !self.exclude_marker.is_empty() && path.contains(&self.exclude_marker)
    }
}

/// Every matching file under `root`, in server listing order. A relative
/// `root` is resolved against the session's working directory first, so every
/// reported path is absolute.
pub fn walk<R: RemoteTree + ?Sized>(tree: &mut R, root: &str, options: &WalkOptions) -> Vec<RemoteEntry> {
    let root = resolve_root(tree, root);
    let mut found = Vec::new();
    visit(tree, &root, options, &mut found);
    info!(root = %root, count = found.len(), "Remote walk finished");
    found
}

fn resolve_root<R: RemoteTree + ?Sized>(tree: &mut R, root: &str) -> String {
    if root.starts_with('/') {
        return root.to_string();
    }
    let origin = match tree.current_dir() {
        Ok(origin) => origin,
        Err(e) => {
            warn!(error = %e, root, "Could not read working directory, walking root as given");
            return root.to_string();
        }
    };
    let absolute = tree.change_dir(root).and_then(|()| tree.current_dir());
    restore(tree, &origin);
    match absolute {
        Ok(absolute) => {
            debug!(root, resolved = %absolute, "Resolved relative root");
            absolute
        }
        Err(e) => {
            warn!(error = %e, root, "Could not resolve relative root, walking it as given");
            root.to_string()
        }
    }
}

pub fn join_remote(dir: &str, item: &str) -> String {
    if item.starts_with('/') {
        item.to_string()
    } else if dir.ends_with('/') {
        format!("{dir}{item}")
    } else {
        format!("{dir}/{item}")
    }
}

pub fn base_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

fn visit<R: RemoteTree + ?Sized>(
    tree: &mut R,
    dir: &str,
    options: &WalkOptions,
    found: &mut Vec<RemoteEntry>,
) {
    let origin = match tree.current_dir() {
        Ok(origin) => origin,
        Err(e) => {
            error!(error = %e, dir, "Could not read working directory, skipping");
            return;
        }
    };
    visit_listing(tree, dir, &origin, options, found);
    restore(tree, &origin);
}

fn visit_listing<R: RemoteTree + ?Sized>(
    tree: &mut R,
    dir: &str,
    origin: &str,
    options: &WalkOptions,
    found: &mut Vec<RemoteEntry>,
) {
    let items = match tree.change_dir(dir).and_then(|()| tree.list_names()) {
        Ok(items) => items,
        Err(e) => {
            error!(error = %e, dir, "Error accessing directory");
            return;
        }
    };

    for item in items {
        let name = base_name(&item);
        if name.is_empty() || name == "." || name == ".." {
            continue;
        }
        let full_path = join_remote(dir, &item);
        if options.is_excluded(&full_path) {
            info!(path = %full_path, marker = %options.exclude_marker, "Ignoring excluded path");
            continue;
        }

        match tree.probe(&full_path) {
            Ok(EntryKind::Directory) => {
                debug!(path = %full_path, "Accessing directory");
                visit(tree, &full_path, options, found);
                restore(tree, origin);
            }
            Ok(EntryKind::NotADirectory) => {
                if let Some(entry) = check_file(tree, &full_path, options) {
                    found.push(entry);
                }
            }
            Err(e) => {
                error!(error = %e, path = %full_path, dir, "Unexpected error, abandoning directory");
                return;
            }
        }
    }
}

fn check_file<R: RemoteTree + ?Sized>(
    tree: &mut R,
    full_path: &str,
    options: &WalkOptions,
) -> Option<RemoteEntry> {
    if !options.pattern.matches(base_name(full_path)) {
        return None;
    }
    info!(path = full_path, "Matching file found");
    let modified_at = match tree.modified_at(full_path) {
        Ok(naive) => {
            debug!(path = full_path, modified_at = %naive, "Modification time read");
            Some(Timestamp::Naive(naive))
        }
        Err(e) => {
            warn!(error = %e, path = full_path, "Could not read modification time, keeping file without one");
            None
        }
    };
    Some(RemoteEntry {
        path: full_path.to_string(),
        modified_at,
    })
}

fn restore<R: RemoteTree + ?Sized>(tree: &mut R, origin: &str) {
    if let Err(e) = tree.change_dir(origin) {
        error!(error = %e, dir = origin, "Failed to restore working directory");
    }
}
