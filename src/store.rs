//! Where artifacts live, remotely and locally.

use std::path::{Component, Path, PathBuf};

/// Last path component of `name`, accepting both `/` and `\` separators.
pub fn basename(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// `store_dir/hash/basename(filename)`
///
/// Upload and download both go through here, so identical content always
/// resolves to the same remote location.
pub fn compose_remote_path(store_dir: &str, hash: &str, filename: &str) -> String {
    format!("{}/{}/{}", store_dir, hash, basename(filename))
}

/// Parent directory of a composed remote path.
pub fn remote_parent(remote: &str) -> &str {
    match remote.rfind('/') {
        Some(0) => "/",
        Some(idx) => &remote[..idx],
        None => ".",
    }
}

/// A logical path must stay inside the destination: relative, no `..`.
pub fn is_contained(logical: &str) -> bool {
    !logical.is_empty()
        && Path::new(logical)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Local destination of a logical path, under `dest` when given.
pub fn compose_local_path(dest: Option<&Path>, logical: &str) -> PathBuf {
    match dest {
        Some(prefix) => prefix.join(logical),
        None => PathBuf::from(logical),
    }
}
