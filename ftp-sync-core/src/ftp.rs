//! FTP adapter: a [`RemoteTree`] over a `suppaftp` session and the
//! [`Archive`] used by a run.
//!
//! The session is blocking, so every use of it runs on tokio's blocking pool.
//! One session is opened for the walk and one for the downloads of a run.
//! Transfers are streamed straight into the scratch file.

use std::fs::File;
use std::io;
use std::net::Ipv6Addr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::{info, warn};

use crate::config::RemoteConfig;
use crate::contract::{
    Archive, EntryKind, Expander, Fetched, RemoteEntry, RemoteError, RemoteTree,
};
use crate::fetch::fetch_all;
use crate::walker::{walk, WalkOptions};

const DEFAULT_FTP_PORT: u16 = 21;

/// Appends the default FTP port when `server` does not name one. A bare IPv6
/// address is bracketed first.
pub fn server_address(server: &str) -> String {
    if server.parse::<Ipv6Addr>().is_ok() {
        return format!("[{server}]:{DEFAULT_FTP_PORT}");
    }
    let has_port = server.rsplit_once(':').is_some_and(|(host, port)| {
        let plain_host = !host.is_empty() && (!host.contains(':') || host.ends_with(']'));
        plain_host && port.parse::<u16>().is_ok()
    });
    if has_port {
        server.to_string()
    } else {
        format!("{server}:{DEFAULT_FTP_PORT}")
    }
}

/// Permanent negative (5xx) replies become [`RemoteError::PermissionDenied`].
pub fn map_ftp_error(e: FtpError) -> RemoteError {
    match e {
        FtpError::UnexpectedResponse(response) => {
            let message = String::from_utf8_lossy(&response.body).trim().to_string();
            if (500..600).contains(&response.status.code()) {
                RemoteError::PermissionDenied(message)
            } else {
                RemoteError::Protocol(message)
            }
        }
        FtpError::ConnectionError(e) => RemoteError::Connection(e.to_string()),
        other => RemoteError::Protocol(other.to_string()),
    }
}

/// Reads the outcome of a CWD probe: a refusal marks a file.
pub fn classify_cwd(result: Result<(), RemoteError>) -> Result<EntryKind, RemoteError> {
    match result {
        Ok(()) => Ok(EntryKind::Directory),
        Err(RemoteError::PermissionDenied(_)) => Ok(EntryKind::NotADirectory),
        Err(e) => Err(e),
    }
}

pub struct FtpSession {
    stream: FtpStream,
}

impl FtpSession {
    /// Connects, logs in and switches to binary transfers.
    pub fn open(config: &RemoteConfig) -> Result<Self, RemoteError> {
        let address = server_address(&config.server);
        let mut stream = FtpStream::connect(address.as_str()).map_err(map_ftp_error)?;
        stream
            .login(config.user.as_str(), config.password.as_str())
            .map_err(map_ftp_error)?;
        stream
            .transfer_type(FileType::Binary)
            .map_err(map_ftp_error)?;
        info!(
            server = %address,
            welcome = stream.get_welcome_msg().unwrap_or_default(),
            "Connected to FTP server"
        );
        Ok(Self { stream })
    }

    pub fn close(mut self) {
        if let Err(e) = self.stream.quit() {
            warn!(error = %map_ftp_error(e), "FTP QUIT failed");
        }
    }
}

impl RemoteTree for FtpSession {
    fn current_dir(&mut self) -> Result<String, RemoteError> {
        self.stream.pwd().map_err(map_ftp_error)
    }

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        self.stream.cwd(path).map_err(map_ftp_error)
    }

    fn probe(&mut self, path: &str) -> Result<EntryKind, RemoteError> {
        classify_cwd(self.change_dir(path))
    }

    fn list_names(&mut self) -> Result<Vec<String>, RemoteError> {
        self.stream.nlst(None).map_err(map_ftp_error)
    }

    fn modified_at(&mut self, path: &str) -> Result<NaiveDateTime, RemoteError> {
        self.stream.mdtm(path).map_err(map_ftp_error)
    }

    fn retrieve_to(&mut self, path: &str, dest: &Path) -> Result<u64, RemoteError> {
        let mut file = File::create(dest)?;
        self.stream
            .retr(path, |reader| io::copy(reader, &mut file).map_err(FtpError::ConnectionError))
            .map_err(map_ftp_error)
    }
}

/// The remote archive reached over FTP.
#[derive(Debug, Clone)]
pub struct FtpArchive {
    config: RemoteConfig,
}

impl FtpArchive {
    pub fn new(config: RemoteConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Archive for FtpArchive {
    async fn list_matching(&self) -> Result<Vec<RemoteEntry>, RemoteError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let mut session = FtpSession::open(&config)?;
            let options = WalkOptions {
                pattern: config.name_pattern.clone(),
                exclude_marker: config.exclude_marker.clone(),
            };
            let found = walk(&mut session, &config.root_dir, &options);
            for entry in &found {
                info!(path = %entry.path, modified_at = ?entry.modified_at, "Found file");
            }
            session.close();
            Ok(found)
        })
        .await
        .map_err(|e| RemoteError::Task(e.to_string()))?
    }

    async fn fetch(
        &self,
        paths: Vec<String>,
        scratch: PathBuf,
        expander: Arc<dyn Expander>,
    ) -> Result<Vec<Fetched>, RemoteError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || {
            let mut session = FtpSession::open(&config)?;
            let fetched = fetch_all(&mut session, &paths, expander.as_ref(), &scratch);
            session.close();
            Ok(fetched)
        })
        .await
        .map_err(|e| RemoteError::Task(e.to_string()))?
    }
}
