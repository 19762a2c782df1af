#![allow(dead_code)]

use artsync::transport::Transport;
use artsync::{ArtsyncError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// In-memory store keyed by remote path, recording every call.
#[derive(Default)]
pub struct MockTransport {
    pub remote: Mutex<HashMap<String, Vec<u8>>>,
    pub execs: Mutex<Vec<String>>,
    pub uploads: Mutex<Vec<(PathBuf, String)>>,
    pub downloads: Mutex<Vec<(String, PathBuf)>>,
    pub closed: Mutex<bool>,
    /// Make every transfer fail as if the channel dropped
    pub drop_channel: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn broken() -> Self {
        Self {
            drop_channel: true,
            ..Self::default()
        }
    }

    pub fn add_remote(&self, path: &str, data: &[u8]) {
        self.remote.lock().unwrap().insert(path.to_string(), data.to_vec());
    }

    pub fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

impl Transport for MockTransport {
    fn exec(&self, command: &str) -> Result<String> {
        self.execs.lock().unwrap().push(command.to_string());
        Ok(String::new())
    }

    fn upload_file(&self, local: &Path, remote: &str) -> Result<()> {
        if self.drop_channel {
            return Err(ArtsyncError::Connection("channel dropped".into()));
        }
        let data = std::fs::read(local)?;
        self.remote.lock().unwrap().insert(remote.to_string(), data);
        self.uploads.lock().unwrap().push((local.to_path_buf(), remote.to_string()));
        Ok(())
    }

    fn download_file(&self, remote: &str, local: &Path) -> Result<()> {
        if self.drop_channel {
            return Err(ArtsyncError::Connection("channel dropped".into()));
        }
        self.downloads.lock().unwrap().push((remote.to_string(), local.to_path_buf()));
        let data = self
            .remote
            .lock()
            .unwrap()
            .get(remote)
            .cloned()
            .ok_or_else(|| ArtsyncError::RemoteCommand(format!("{}: No such file", remote)))?;
        std::fs::write(local, data)?;
        Ok(())
    }

    fn close(&self) -> Result<()> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

pub fn sha1_of(data: &[u8]) -> String {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("blob");
    std::fs::write(&path, data).unwrap();
    artsync::hasher::file_hash(&path).unwrap()
}
