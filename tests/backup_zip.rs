#[path = "../src/backup.rs"]
mod backup;

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

#[test]
fn zip_export_and_import_roundtrip() {
    let workspace = temp_dir("rosterd-backup-src");
    let workspace2 = temp_dir("rosterd-backup-dst");
    let out_dir = temp_dir("rosterd-backup-out");

    let bytes = b"sqlite-test-payload";
    std::fs::write(workspace.join("rosterd.sqlite3"), bytes).expect("write source db");

    let bundle_path = out_dir.join("nested").join("workspace.zip");
    let export = backup::export_workspace_bundle(&workspace, &bundle_path).expect("export bundle");
    assert_eq!(export.bundle_format, backup::BUNDLE_FORMAT);
    assert_eq!(export.entry_count, 3);
    assert_eq!(export.db_sha256.len(), 64);

    let f = File::open(&bundle_path).expect("open bundle");
    let mut archive = zip::ZipArchive::new(f).expect("open zip archive");
    let mut manifest = String::new();
    archive
        .by_name("manifest.json")
        .expect("manifest entry")
        .read_to_string(&mut manifest)
        .expect("read manifest");
    assert!(manifest.contains(backup::BUNDLE_FORMAT));
    assert!(manifest.contains(&export.db_sha256));
    archive
        .by_name("db/rosterd.sqlite3")
        .expect("database entry in bundle");

    let import = backup::import_workspace_bundle(&bundle_path, &workspace2).expect("import bundle");
    assert_eq!(import.bundle_format_detected, backup::BUNDLE_FORMAT);
    assert_eq!(import.db_sha256, export.db_sha256);

    let restored = std::fs::read(workspace2.join("rosterd.sqlite3")).expect("read restored db");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(workspace2);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn checksum_mismatch_leaves_workspace_untouched() {
    let out_dir = temp_dir("rosterd-backup-tampered");
    let workspace = temp_dir("rosterd-backup-tampered-dst");
    std::fs::write(workspace.join("rosterd.sqlite3"), b"current").expect("write current db");

    let bundle_path = out_dir.join("tampered.zip");
    let f = File::create(&bundle_path).expect("create bundle");
    let mut zip = zip::ZipWriter::new(f);
    let opts = zip::write::FileOptions::default();
    zip.start_file("manifest.json", opts).expect("start manifest");
    zip.write_all(
        format!(
            "{{\"format\":\"{}\",\"dbSha256\":\"{}\"}}",
            backup::BUNDLE_FORMAT,
            "0".repeat(64)
        )
        .as_bytes(),
    )
    .expect("write manifest");
    zip.start_file("db/rosterd.sqlite3", opts).expect("start db");
    zip.write_all(b"replacement").expect("write db");
    zip.finish().expect("finish zip");

    let e = backup::import_workspace_bundle(&bundle_path, &workspace).expect_err("mismatch");
    assert!(format!("{e:#}").contains("checksum mismatch"));
    let kept = std::fs::read(workspace.join("rosterd.sqlite3")).expect("read current db");
    assert_eq!(kept, b"current");

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn bare_sqlite_import_is_supported() {
    let out_dir = temp_dir("rosterd-backup-raw");
    let workspace = temp_dir("rosterd-backup-raw-dst");

    let raw_file = out_dir.join("copy.sqlite3");
    let bytes = b"raw-sqlite-copy";
    std::fs::write(&raw_file, bytes).expect("write sqlite file");

    let import = backup::import_workspace_bundle(&raw_file, &workspace).expect("import sqlite");
    assert_eq!(import.bundle_format_detected, "sqlite3");

    let restored = std::fs::read(workspace.join("rosterd.sqlite3")).expect("read restored sqlite");
    assert_eq!(restored, bytes);

    let _ = std::fs::remove_dir_all(out_dir);
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn export_without_database_fails() {
    let workspace = temp_dir("rosterd-backup-empty");
    let out = workspace.join("out.zip");
    assert!(backup::export_workspace_bundle(&workspace, &out).is_err());
    assert!(!out.exists());
    let _ = std::fs::remove_dir_all(workspace);
}
