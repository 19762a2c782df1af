use crate::engine::SyncEngine;
use crate::hasher::ContentHasher;
use crate::manifest::{Manifest, Properties, PropValue};
use crate::transport::Transport;
use crate::{ArtsyncError, Result};
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// A file sent to the store by [`upload_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub path: PathBuf,
    pub hash: String,
    /// Manifest key, set when the file was appended
    pub key: Option<String>,
}

/// Lexically resolve `.` and `..` without touching the filesystem.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

/// Key of `file` relative to the directory holding `manifest_path`.
///
/// `None` when the directory is not an ancestor of `file`.
pub fn relative_to_manifest(file: &Path, manifest_path: &Path) -> Result<Option<String>> {
    let file = absolute(file)?;
    let manifest = absolute(manifest_path)?;
    let base = manifest.parent().unwrap_or(Path::new("/"));

    let relative = match file.strip_prefix(base) {
        Ok(rel) if !rel.as_os_str().is_empty() => rel,
        _ => return Ok(None),
    };

    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect();
    Ok(Some(parts.join("/")))
}

/// Put every file; with `append`, record each one in `manifest` and save it once.
///
/// A `<hash> <path>` line is written to `out` per upload. The upload of a
/// file happens before its manifest key is computed, so a file outside the
/// manifest's directory is stored remotely but fails the run with
/// `NotRelative`, leaving the document untouched.
pub fn upload_files<T, H, W>(
    engine: &mut SyncEngine<T, H>,
    manifest: &mut Manifest,
    manifest_path: &Path,
    files: &[PathBuf],
    append: bool,
    out: &mut W,
) -> Result<Vec<Uploaded>>
where
    T: Transport,
    H: ContentHasher,
    W: Write,
{
    let mut uploaded = Vec::with_capacity(files.len());

    for file in files {
        let hash = engine.put(file)?;
        writeln!(out, "{} {}", hash, file.display())?;

        let key = if append {
            let key = relative_to_manifest(file, manifest_path)?.ok_or_else(|| ArtsyncError::NotRelative {
                path: file.clone(),
                base: manifest_path.parent().map(Path::to_path_buf).unwrap_or_default(),
            })?;

            let mut properties = Properties::new();
            properties.insert("hash".into(), PropValue::Str(hash.clone()));
            manifest.append_file(engine.hasher(), file, Some(&key), properties)?;
            info!("Appended {} to manifest", key);
            Some(key)
        } else {
            None
        };

        uploaded.push(Uploaded {
            path: file.clone(),
            hash,
            key,
        });
    }

    if append {
        manifest.save(manifest_path)?;
    }
    Ok(uploaded)
}
