use crate::{ArtsyncError, Result};
use sha1::{Digest, Sha1};
use std::io::Read;
use std::path::Path;

/// Name of the digest used for every content address.
pub const ALGORITHM: &str = "sha1";

const BUFFER_SIZE: usize = 64 * 1024;

/// Computes the content hash of a local file.
pub trait ContentHasher {
    /// Read `path` fully and return its lowercase hex digest.
    fn hash_file(&self, path: &Path) -> Result<String>;
}

/// SHA-1 over the whole file, hex encoded (same output as `sha1sum`).
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha1Hasher;

impl ContentHasher for Sha1Hasher {
    fn hash_file(&self, path: &Path) -> Result<String> {
        let mut file = std::fs::File::open(path).map_err(|e| ArtsyncError::file(path, e))?;
        let mut hasher = Sha1::new();
        let mut buffer = vec![0u8; BUFFER_SIZE];

        loop {
            let n = file.read(&mut buffer).map_err(|e| ArtsyncError::file(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }

        Ok(hex::encode(hasher.finalize()))
    }
}

/// Hash a file with the process-wide algorithm.
pub fn file_hash(path: &Path) -> Result<String> {
    Sha1Hasher.hash_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digests() {
        let dir = tempfile::tempdir().unwrap();
        let empty = dir.path().join("empty");
        let abc = dir.path().join("abc");
        std::fs::write(&empty, b"").unwrap();
        std::fs::write(&abc, b"abc").unwrap();

        assert_eq!(file_hash(&empty).unwrap(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
        assert_eq!(file_hash(&abc).unwrap(), "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_hash_is_stable_and_spans_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..(BUFFER_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &data).unwrap();

        let first = file_hash(&path).unwrap();
        let second = file_hash(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, hex::encode(Sha1::digest(&data)));
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }

    #[test]
    fn test_missing_file_names_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope");
        match file_hash(&path) {
            Err(ArtsyncError::File { path: p, .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
