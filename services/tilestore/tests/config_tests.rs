//! Configuration cascade across files.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tilestore::LocalConfig;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_no_files_gives_defaults() {
    let config = LocalConfig::find::<PathBuf>(&[]).unwrap();
    assert_eq!(config.catalog.hostname, "");
    assert_eq!(config.catalog.database, "datacube");
    assert_eq!(config.catalog.port, 5432);
    assert!(config.locations.is_empty());
    assert!(config.files_loaded.is_empty());
}

#[test]
fn test_single_file() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "one.yaml",
        "catalog:\n  hostname: db.internal\n  database: tiles\nlocations:\n  ls7_ortho: file:///g/data/ls7\n",
    );

    let config = LocalConfig::find(&[path.clone()]).unwrap();
    assert_eq!(config.catalog.hostname, "db.internal");
    assert_eq!(config.catalog.database, "tiles");
    assert_eq!(config.location("ls7_ortho"), Some("file:///g/data/ls7"));
    assert_eq!(config.location("missing"), None);
    assert_eq!(config.files_loaded, vec![path]);
}

#[test]
fn test_later_files_override_earlier() {
    let dir = TempDir::new().unwrap();
    let base = write(
        &dir,
        "base.yaml",
        "catalog:\n  hostname: db.internal\n  port: 6000\nlocations:\n  a: file:///a\n  b: file:///b\n",
    );
    let user = write(
        &dir,
        "user.yaml",
        "catalog:\n  hostname: localhost\nlocations:\n  b: file:///home/b\n  c: file:///c\n",
    );

    let config = LocalConfig::find(&[base, user]).unwrap();
    assert_eq!(config.catalog.hostname, "localhost");
    assert_eq!(config.catalog.port, 6000);
    assert_eq!(config.catalog.database, "datacube");
    assert_eq!(config.location("a"), Some("file:///a"));
    assert_eq!(config.location("b"), Some("file:///home/b"));
    assert_eq!(config.location("c"), Some("file:///c"));
}

#[test]
fn test_missing_files_are_skipped() {
    let dir = TempDir::new().unwrap();
    let present = write(&dir, "present.yaml", "catalog:\n  database: archive\n");
    let missing = dir.path().join("absent.yaml");

    let config = LocalConfig::find(&[missing, present.clone()]).unwrap();
    assert_eq!(config.catalog.database, "archive");
    assert_eq!(config.files_loaded, vec![present]);
}

#[test]
fn test_empty_file_changes_nothing() {
    let dir = TempDir::new().unwrap();
    let empty = write(&dir, "empty.yaml", "\n");

    let config = LocalConfig::find(&[empty]).unwrap();
    assert_eq!(config.catalog, tilestore::CatalogConfig::default());
}

#[test]
fn test_env_substitution_in_file() {
    std::env::set_var("TILESTORE_CFG_TEST_DB", "from_env");
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "env.yaml",
        "catalog:\n  database: ${TILESTORE_CFG_TEST_DB}\n  hostname: ${TILESTORE_CFG_TEST_UNSET:-fallback}\n",
    );

    let config = LocalConfig::find(&[path]).unwrap();
    assert_eq!(config.catalog.database, "from_env");
    assert_eq!(config.catalog.hostname, "fallback");
}

#[test]
fn test_invalid_files_are_errors() {
    let dir = TempDir::new().unwrap();
    let unknown = write(&dir, "unknown.yaml", "catalog:\n  flavour: postgres\n");
    assert!(LocalConfig::find(&[unknown]).is_err());

    let bad_port = write(&dir, "port.yaml", "catalog:\n  port: 0\n");
    assert!(LocalConfig::find(&[bad_port]).is_err());

    let empty_location = write(&dir, "loc.yaml", "locations:\n  a: ''\n");
    assert!(LocalConfig::find(&[empty_location]).is_err());
}
