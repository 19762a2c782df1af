mod common;

use artsync::engine::SyncEngine;
use artsync::hasher::Sha1Hasher;
use artsync::manifest::Manifest;
use artsync::upload::upload_files;
use artsync::ArtsyncError;
use common::{sha1_of, MockTransport};

const MANIFEST: &str = "server: xxx\ndir: yyy\nfiles: {}\n";

#[test]
fn test_upload_and_append_saves_relative_keys() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = dir.path().join("conf_dir").join("artifacts.yaml");
    std::fs::create_dir_all(manifest_path.parent().unwrap()).unwrap();
    std::fs::write(&manifest_path, MANIFEST).unwrap();

    let file = dir.path().join("conf_dir").join("data").join("x.bin");
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(&file, b"artifact").unwrap();
    let hash = sha1_of(b"artifact");

    let transport = MockTransport::new();
    let mut manifest = Manifest::load(&manifest_path).unwrap();
    let mut engine = SyncEngine::with_transport(&transport, Sha1Hasher, &manifest);
    let mut out = Vec::new();

    let uploaded = upload_files(
        &mut engine,
        &mut manifest,
        &manifest_path,
        &[file.clone()],
        true,
        &mut out,
    )
    .unwrap();

    assert_eq!(uploaded.len(), 1);
    assert_eq!(uploaded[0].key.as_deref(), Some("data/x.bin"));
    assert_eq!(String::from_utf8(out).unwrap(), format!("{} {}\n", hash, file.display()));
    assert_eq!(transport.uploads.lock().unwrap()[0].1, format!("yyy/{}/x.bin", hash));

    let saved = Manifest::load(&manifest_path).unwrap();
    assert_eq!(saved.entry("data/x.bin").unwrap().hash, hash);
    assert_eq!(saved.server, "xxx");
}

#[test]
fn test_upload_without_append_leaves_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = dir.path().join("artifacts.yaml");
    std::fs::write(&manifest_path, MANIFEST).unwrap();
    let file = dir.path().join("x.bin");
    std::fs::write(&file, b"artifact").unwrap();

    let transport = MockTransport::new();
    let mut manifest = Manifest::load(&manifest_path).unwrap();
    let mut engine = SyncEngine::with_transport(&transport, Sha1Hasher, &manifest);

    let uploaded = upload_files(
        &mut engine,
        &mut manifest,
        &manifest_path,
        &[file],
        false,
        &mut Vec::<u8>::new(),
    )
    .unwrap();

    assert_eq!(uploaded[0].key, None);
    assert_eq!(transport.uploads.lock().unwrap().len(), 1);
    assert!(manifest.is_empty());
    assert_eq!(std::fs::read_to_string(&manifest_path).unwrap(), MANIFEST);
}

#[test]
fn test_append_outside_manifest_dir_fails_after_upload() {
    let conf = tempfile::tempdir().unwrap();
    let elsewhere = tempfile::tempdir().unwrap();
    let manifest_path = conf.path().join("artifacts.yaml");
    std::fs::write(&manifest_path, MANIFEST).unwrap();
    let file = elsewhere.path().join("x.bin");
    std::fs::write(&file, b"artifact").unwrap();

    let transport = MockTransport::new();
    let mut manifest = Manifest::load(&manifest_path).unwrap();
    let mut engine = SyncEngine::with_transport(&transport, Sha1Hasher, &manifest);

    let err = upload_files(
        &mut engine,
        &mut manifest,
        &manifest_path,
        &[file.clone()],
        true,
        &mut Vec::<u8>::new(),
    )
    .unwrap_err();

    match err {
        ArtsyncError::NotRelative { path, .. } => assert_eq!(path, file),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(transport.uploads.lock().unwrap().len(), 1);
    assert_eq!(std::fs::read_to_string(&manifest_path).unwrap(), MANIFEST);
}

#[test]
fn test_upload_no_files_is_noop() {
    let dir = tempfile::tempdir().unwrap();
    let manifest_path = dir.path().join("artifacts.yaml");
    std::fs::write(&manifest_path, MANIFEST).unwrap();

    let transport = MockTransport::new();
    let mut manifest = Manifest::load(&manifest_path).unwrap();
    let mut engine = SyncEngine::with_transport(&transport, Sha1Hasher, &manifest);

    let uploaded = upload_files(&mut engine, &mut manifest, &manifest_path, &[], false, &mut Vec::<u8>::new()).unwrap();
    assert!(uploaded.is_empty());
    assert!(transport.execs.lock().unwrap().is_empty());
}
