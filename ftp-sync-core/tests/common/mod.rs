#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use ftp_sync_core::contract::{EntryKind, RemoteError, RemoteTree};

/// Builds a 7z archive holding `files` (name, content) and returns its bytes.
pub fn seven_zip(files: &[(&str, &str)]) -> Vec<u8> {
    let work = tempfile::tempdir().unwrap();
    let source = work.path().join("source");
    std::fs::create_dir_all(&source).unwrap();
    for (name, content) in files {
        std::fs::write(source.join(name), content).unwrap();
    }
    let archive = work.path().join("fixture.7z");
    sevenz_rust::compress_to_path(&source, &archive).unwrap();
    std::fs::read(archive).unwrap()
}

pub fn naive(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

/// In-memory remote tree that behaves like an FTP session: entering a file is
/// refused with a 5xx-style error, and the working directory is tracked.
#[derive(Debug, Default)]
pub struct FakeTree {
    dirs: BTreeMap<String, Vec<String>>,
    files: BTreeMap<String, (Option<NaiveDateTime>, Vec<u8>)>,
    failing_retrievals: BTreeSet<String>,
    cwd: String,
    /// Every path passed to `probe`, in order.
    pub probed: Vec<String>,
}

impl FakeTree {
    pub fn new() -> Self {
        let mut tree = Self {
            cwd: "/".to_string(),
            ..Self::default()
        };
        tree.dirs.insert("/".to_string(), Vec::new());
        tree
    }

    pub fn cwd(&self) -> &str {
        &self.cwd
    }

    pub fn dir(mut self, path: &str) -> Self {
        self.ensure_dir(path);
        self
    }

    pub fn file(mut self, path: &str, modified_at: Option<NaiveDateTime>) -> Self {
        self.add_file(path, modified_at, path.as_bytes().to_vec());
        self
    }

    pub fn file_with_content(mut self, path: &str, content: &[u8]) -> Self {
        self.add_file(path, Some(naive(2024, 1, 1, 0, 0, 0)), content.to_vec());
        self
    }

    pub fn failing_retrieval(mut self, path: &str) -> Self {
        self.failing_retrievals.insert(path.to_string());
        self
    }

    fn add_file(&mut self, path: &str, modified_at: Option<NaiveDateTime>, content: Vec<u8>) {
        let (parent, name) = split(path);
        self.ensure_dir(&parent);
        self.dirs.get_mut(&parent).unwrap().push(name);
        self.files.insert(path.to_string(), (modified_at, content));
    }

    fn ensure_dir(&mut self, path: &str) {
        if self.dirs.contains_key(path) {
            return;
        }
        let (parent, name) = split(path);
        self.ensure_dir(&parent);
        self.dirs.get_mut(&parent).unwrap().push(name);
        self.dirs.insert(path.to_string(), Vec::new());
    }

    fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            path.to_string()
        } else if self.cwd == "/" {
            format!("/{path}")
        } else {
            format!("{}/{path}", self.cwd)
        }
    }
}

fn split(path: &str) -> (String, String) {
    let (parent, name) = path.rsplit_once('/').unwrap();
    let parent = if parent.is_empty() { "/" } else { parent };
    (parent.to_string(), name.to_string())
}

fn denied(path: &str) -> RemoteError {
    RemoteError::PermissionDenied(format!("550 {path}: No such directory"))
}

impl RemoteTree for FakeTree {
    fn current_dir(&mut self) -> Result<String, RemoteError> {
        Ok(self.cwd.clone())
    }

    fn change_dir(&mut self, path: &str) -> Result<(), RemoteError> {
        let target = self.resolve(path);
        if self.dirs.contains_key(&target) {
            self.cwd = target;
            Ok(())
        } else {
            Err(denied(path))
        }
    }

    fn probe(&mut self, path: &str) -> Result<EntryKind, RemoteError> {
        self.probed.push(path.to_string());
        match self.change_dir(path) {
            Ok(()) => Ok(EntryKind::Directory),
            Err(RemoteError::PermissionDenied(_)) => Ok(EntryKind::NotADirectory),
            Err(e) => Err(e),
        }
    }

    fn list_names(&mut self) -> Result<Vec<String>, RemoteError> {
        Ok(self.dirs.get(&self.cwd).cloned().unwrap_or_default())
    }

    fn modified_at(&mut self, path: &str) -> Result<NaiveDateTime, RemoteError> {
        match self.files.get(&self.resolve(path)) {
            Some((Some(at), _)) => Ok(*at),
            _ => Err(RemoteError::PermissionDenied(format!("550 {path}: MDTM refused"))),
        }
    }

    fn retrieve_to(&mut self, path: &str, dest: &Path) -> Result<u64, RemoteError> {
        if self.failing_retrievals.contains(path) {
            // A server that aborts mid-transfer leaves a partial file behind.
            std::fs::write(dest, b"partial")?;
            return Err(RemoteError::Connection(format!("426 {path}: Transfer aborted")));
        }
        let content = self
            .files
            .get(&self.resolve(path))
            .map(|(_, content)| content.clone())
            .ok_or_else(|| RemoteError::PermissionDenied(format!("550 {path}: No such file")))?;
        std::fs::write(dest, &content)?;
        Ok(content.len() as u64)
    }
}
