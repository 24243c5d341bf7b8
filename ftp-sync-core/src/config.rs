use std::fmt;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::walker::NamePattern;

/// Subtrees whose path contains this marker are never visited.
pub const DEFAULT_EXCLUDE_MARKER: &str = "Legado";

/// Login used when no credentials are configured.
pub const ANONYMOUS_USER: &str = "anonymous";
pub const ANONYMOUS_PASSWORD: &str = "anonymous@";

/// Everything a run needs to know, loaded once per process.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub remote: RemoteConfig,
    pub store: StoreConfig,
    pub scratch_root: PathBuf,
}

#[derive(Clone)]
pub struct RemoteConfig {
    /// `host` or `host:port`.
    pub server: String,
    pub root_dir: String,
    pub user: String,
    pub password: String,
    pub name_pattern: NamePattern,
    pub exclude_marker: String,
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("server", &self.server)
            .field("root_dir", &self.root_dir)
            .field("user", &self.user)
            .field("name_pattern", &self.name_pattern.as_str())
            .field("exclude_marker", &self.exclude_marker)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct StoreConfig {
    pub connection_string: String,
    pub container: String,
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("connection_string_set", &!self.connection_string.is_empty())
            .field("container", &self.container)
            .finish()
    }
}

impl SyncConfig {
    pub fn trace_loaded(&self) {
        info!(
            ftp_server = %self.remote.server,
            ftp_directory = %self.remote.root_dir,
            pattern = %self.remote.name_pattern.as_str(),
            exclude_marker = %self.remote.exclude_marker,
            container = %self.store.container,
            scratch_root = %self.scratch_root.display(),
            "Loaded SyncConfig"
        );
        debug!(?self, "SyncConfig loaded (full debug)");
    }
}
