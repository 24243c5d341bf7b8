/// `load_config` module: reads the job's configuration from the environment into
/// the core [`SyncConfig`].
///
/// # Responsibilities
/// - Require the five deployment settings (server, directory, pattern,
///   connection string, container); there are no defaults for these.
/// - Apply defaults for the optional ones (anonymous login, exclusion marker,
///   scratch root).
/// - Validate the name pattern and the connection string up front, so a bad
///   deployment fails at startup rather than on the first tick.
///
/// # Errors
/// All errors use `anyhow::Error` and name the offending variable; secrets are
/// never included in messages or logs.
use anyhow::{anyhow, Context, Result};
use ftp_sync_core::config::{
    RemoteConfig, StoreConfig, SyncConfig, ANONYMOUS_PASSWORD, ANONYMOUS_USER,
    DEFAULT_EXCLUDE_MARKER,
};
use ftp_sync_core::walker::NamePattern;
use std::path::PathBuf;
use tracing::{error, info};

use crate::upload::ConnectionString;

pub const FTP_SERVER: &str = "FTP_SERVER";
pub const FTP_DIRECTORY: &str = "FTP_DIRECTORY";
pub const REGEX_PATTERN: &str = "REGEX_PATTERN";
pub const BLOB_CONNECTION_STRING: &str = "BLOB_CONNECTION_STRING";
pub const BLOB_CONTAINER_NAME: &str = "BLOB_CONTAINER_NAME";
pub const FTP_USER: &str = "FTP_USER";
pub const FTP_PASSWORD: &str = "FTP_PASSWORD";
pub const FTP_EXCLUDE_MARKER: &str = "FTP_EXCLUDE_MARKER";
pub const SCRATCH_ROOT: &str = "SCRATCH_ROOT";

/// Loads the configuration from the process environment.
pub fn load_config() -> Result<SyncConfig> {
    load_config_from(|name| std::env::var(name).ok())
}

/// Loads the configuration through `lookup`, which returns a variable's value if set.
pub fn load_config_from<F>(lookup: F) -> Result<SyncConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |name: &str| -> Result<String> {
        match lookup(name).filter(|value| !value.trim().is_empty()) {
            Some(value) => Ok(value),
            None => {
                error!(variable = name, "Required environment variable missing");
                Err(anyhow!("missing required environment variable {name}"))
            }
        }
    };
    let optional = |name: &str, default: &str| -> String {
        lookup(name)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    let server = required(FTP_SERVER)?;
    let root_dir = required(FTP_DIRECTORY)?;
    let pattern = required(REGEX_PATTERN)?;
    let connection_string = required(BLOB_CONNECTION_STRING)?;
    let container = required(BLOB_CONTAINER_NAME)?;

    let name_pattern = NamePattern::new(&pattern)
        .with_context(|| format!("{REGEX_PATTERN} is not a valid regular expression"))?;
    ConnectionString::parse(&connection_string)
        .with_context(|| format!("{BLOB_CONNECTION_STRING} is not a valid connection string"))?;

    let scratch_root = lookup(SCRATCH_ROOT)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);

    let config = SyncConfig {
        remote: RemoteConfig {
            server,
            root_dir,
            user: optional(FTP_USER, ANONYMOUS_USER),
            password: optional(FTP_PASSWORD, ANONYMOUS_PASSWORD),
            name_pattern,
            exclude_marker: optional(FTP_EXCLUDE_MARKER, DEFAULT_EXCLUDE_MARKER),
        },
        store: StoreConfig {
            connection_string,
            container,
        },
        scratch_root,
    };
    info!("Configuration loaded from environment");
    Ok(config)
}
