// Tests du binaire: codes de sortie et persistance de l'image
mod common;

use std::fs;
use std::process::Command;

use common::{TestImage, record_size};

fn fatcheck() -> Command {
    Command::new(env!("CARGO_BIN_EXE_fatcheck"))
}

#[test]
fn test_missing_argument() {
    let output = fatcheck().output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("usage:"));
}

#[test]
fn test_unreadable_image() {
    let dir = tempfile::tempdir().unwrap();
    let output = fatcheck().arg(dir.path().join("missing.img")).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_invalid_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("zero.img");
    fs::write(&path, vec![0u8; 64 * 1024]).unwrap();

    let output = fatcheck().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid geometry"));
}

#[test]
fn test_repairs_are_persisted() {
    let mut image = TestImage::new_fat16();
    image
        .add_root(b"BIG     DAT", 0x20, 100, 6000)
        .chain(&(100..110).collect::<Vec<u16>>());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.img");
    fs::write(&path, &image.data).unwrap();

    let output = fatcheck().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("/BIG.DAT"), "{}", stdout);
    assert!(stdout.contains("image updated"));

    let repaired = fs::read(&path).unwrap();
    let root = common::ROOT_OFFSET;
    assert_eq!(record_size(&repaired[root..root + 32]), 5120);
}

#[test]
fn test_clean_image_not_rewritten() {
    let image = TestImage::new_fat16();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clean.img");
    fs::write(&path, &image.data).unwrap();

    let output = fatcheck().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("image updated"));
    assert_eq!(fs::read(&path).unwrap(), image.data);
}

#[test]
fn test_tree_listing_printed() {
    let mut image = TestImage::new_fat16();
    image
        .add_root(b"BIG     DAT", 0x20, 100, 6000)
        .chain(&(100..110).collect::<Vec<u16>>())
        .add_root(b"DOCS       ", 0x10, 10, 0)
        .chain(&[10])
        .add_in_dir(10, 0, b"NOTE    TXT", 0x21, 11, 10)
        .chain(&[11]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tree.img");
    fs::write(&path, &image.data).unwrap();

    let output = fatcheck().arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    // taille lue avant réparation
    assert!(
        stdout.contains("BIG.DAT (6000 bytes) (starting cluster 100)    a\n"),
        "{}",
        stdout
    );
    assert!(stdout.contains("DOCS/ (directory)\n    NOTE.TXT (10 bytes) (starting cluster 11) r  a\n"));
}
