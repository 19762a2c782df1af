use crate::hasher::{ContentHasher, Sha1Hasher, ALGORITHM};
use crate::manifest::{Entry, Manifest};
use crate::store::{compose_local_path, compose_remote_path, is_contained, remote_parent};
use crate::transport::ssh::{SshConfig, SshConnection};
use crate::transport::{shell_quote, Transport};
use crate::{ArtsyncError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming the default remote user.
pub const USER_ENV: &str = "ARTIFACT_STORAGE_USER";

/// Explicit argument, then environment, then manifest.
pub fn resolve_user(explicit: Option<&str>, env: Option<&str>, manifest: Option<&str>) -> Option<String> {
    explicit.or(env).or(manifest).map(str::to_string)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    /// A channel failure happened; the session cannot be reused.
    Broken,
    Closed,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Only this logical path; every entry when `None`
    pub file: Option<String>,
    /// Prefix for local destinations
    pub dest: Option<PathBuf>,
    /// Skip entries whose logical path does not match
    pub pattern: Option<Regex>,
    /// Hash each file after it is written
    pub verify: bool,
    /// Transfer even if the local copy already has the right hash
    pub force: bool,
    pub progress: bool,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            file: None,
            dest: None,
            pattern: None,
            verify: true,
            force: false,
            progress: false,
        }
    }
}

/// Logical paths touched by a fetch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchReport {
    pub fetched: Vec<String>,
    pub skipped: Vec<String>,
}

/// One session against a content-addressed store.
///
/// Processing is fail-fast: the first error (including a hash mismatch)
/// stops the run, files fetched before it stay on disk.
pub struct SyncEngine<T: Transport, H: ContentHasher = Sha1Hasher> {
    transport: T,
    hasher: H,
    store_dir: String,
    state: SessionState,
}

impl SyncEngine<SshConnection> {
    /// Connect to `manifest.server` over SSH.
    pub fn open(manifest: &Manifest, user: Option<&str>, key_path: Option<PathBuf>) -> Result<Self> {
        let env_user = std::env::var(USER_ENV).ok();
        let user = resolve_user(user, env_user.as_deref(), manifest.user.as_deref());
        let config = SshConfig::from_server(&manifest.server, user, key_path)?;

        info!("Connecting to {}@{}:{}...", config.user, config.host, config.port);
        let conn = SshConnection::connect(&config)?;
        info!("Connected.");
        debug!("Content addresses use {}", ALGORITHM);

        Ok(Self::with_transport(conn, Sha1Hasher, manifest))
    }
}

impl<T: Transport, H: ContentHasher> SyncEngine<T, H> {
    /// Start an open session over an already established transport.
    pub fn with_transport(transport: T, hasher: H, manifest: &Manifest) -> Self {
        Self {
            transport,
            hasher,
            store_dir: manifest.store_dir.clone(),
            state: SessionState::Open,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    pub fn store_dir(&self) -> &str {
        &self.store_dir
    }

    pub fn close(mut self) -> Result<()> {
        self.ensure_open()?;
        self.state = SessionState::Closed;
        self.transport.close()
    }

    /// Download the selected entries of `manifest` into the local tree.
    ///
    /// Remote locations are composed from this session's store directory.
    pub fn fetch(&mut self, manifest: &Manifest, options: &FetchOptions) -> Result<FetchReport> {
        self.ensure_open()?;

        let selected: Vec<(&String, &Entry)> = match &options.file {
            Some(key) => {
                let pair = manifest
                    .files
                    .as_ref()
                    .and_then(|files| files.get_key_value(key.as_str()))
                    .ok_or_else(|| ArtsyncError::Config(format!("'{}' is not in the manifest", key)))?;
                vec![pair]
            }
            None => manifest.entries().collect(),
        };

        let selected: Vec<_> = selected
            .into_iter()
            .filter(|(key, _)| options.pattern.as_ref().map_or(true, |p| p.is_match(key)))
            .collect();

        let pb = if options.progress {
            let pb = ProgressBar::new(selected.len() as u64);
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            ) {
                pb.set_style(style);
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut report = FetchReport::default();
        for (key, entry) in selected {
            pb.set_message(key.clone());
            let result = self.fetch_entry(key, entry, options);
            if self.track(result)? {
                report.fetched.push(key.clone());
            } else {
                report.skipped.push(key.clone());
            }
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            "Fetch done: {} fetched, {} already present.",
            report.fetched.len(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Upload `source` to its content address and return the digest.
    ///
    /// The manifest is not touched.
    pub fn put(&mut self, source: &Path) -> Result<String> {
        self.ensure_open()?;
        let result = self.put_file(source);
        self.track(result)
    }

    fn fetch_entry(&self, key: &str, entry: &Entry, options: &FetchOptions) -> Result<bool> {
        if !is_contained(key) {
            return Err(ArtsyncError::NotRelative {
                path: PathBuf::from(key),
                base: options.dest.clone().unwrap_or_else(|| PathBuf::from(".")),
            });
        }
        let local = compose_local_path(options.dest.as_deref(), key);

        if !options.force && local.is_file() {
            let actual = self.hasher.hash_file(&local)?;
            if actual == entry.hash {
                info!("Skipping {} (already present)", key);
                return Ok(false);
            }
            warn!("Replacing {:?}: has hash {}, expected {}", local, actual, entry.hash);
        }

        if let Some(parent) = local.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| ArtsyncError::file(parent, e))?;
        }

        let remote = compose_remote_path(&self.store_dir, &entry.hash, key);
        info!("Fetching {} from {}", key, remote);
        self.transport.download_file(&remote, &local)?;

        if options.verify {
            self.verify(&entry.hash, &local)?;
        }
        Ok(true)
    }

    fn put_file(&self, source: &Path) -> Result<String> {
        let hash = self.hasher.hash_file(source)?;
        let remote = compose_remote_path(&self.store_dir, &hash, &source.to_string_lossy());

        let command = format!("mkdir -p {}", shell_quote(remote_parent(&remote)));
        debug!("Running remote command: {}", command);
        self.transport.exec(&command)?;

        self.transport.upload_file(source, &remote)?;
        info!("Uploaded {:?} to {}", source, remote);
        Ok(hash)
    }

    fn verify(&self, expected: &str, path: &Path) -> Result<()> {
        let actual = self.hasher.hash_file(path)?;
        if actual != expected {
            return Err(ArtsyncError::HashMismatch {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            SessionState::Open => Ok(()),
            _ => Err(ArtsyncError::SessionClosed),
        }
    }

    fn track<R>(&mut self, result: Result<R>) -> Result<R> {
        if let Err(e) = &result {
            if e.is_connection_failure() {
                self.state = SessionState::Broken;
            }
        }
        result
    }
}
