//! Listing indenté de l'arborescence
//!
//! Une ligne par entrée: le label du volume, les répertoires (`NAME/`) et les
//! fichiers avec leur taille, leur cluster de départ et leurs attributs
//! `rhsa`. Chaque niveau décale de quatre espaces. Les répertoires cachés ne
//! sont ni affichés ni parcourus.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::Result;
use crate::directory::{DirEntry, EntryKind};
use crate::filesystem::Volume;
use crate::walker::{self, Visit};

const INDENT: usize = 4;

#[derive(Debug, Clone)]
pub struct ListingLine {
    /// `/DIR/NAME.EXT`
    pub path: String,
    /// 0 pour les entrées de la racine
    pub depth: usize,
    pub entry: DirEntry,
}

impl fmt::Display for ListingLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let entry = &self.entry;
        let name = String::from_utf8_lossy(entry.name());
        let ext = String::from_utf8_lossy(entry.extension());
        let indent = self.depth * INDENT;

        match entry.kind() {
            EntryKind::VolumeLabel if ext.is_empty() => write!(f, "Volume: {}", name),
            EntryKind::VolumeLabel => write!(f, "Volume: {:<8}{}", name, ext),
            EntryKind::Directory => {
                write!(f, "{:indent$}{}/ (directory)", "", entry.short_name(), indent = indent)
            }
            EntryKind::File => write!(
                f,
                "{:indent$}{}.{} ({} bytes) (starting cluster {}) {}",
                "",
                name,
                ext,
                entry.file_size(),
                entry.start_cluster(),
                entry.attributes(),
                indent = indent
            ),
        }
    }
}

/// Liste l'arbre du volume, chaque répertoire suivi de son contenu
///
/// Chaque répertoire n'est ouvert qu'une fois, même si plusieurs entrées
/// pointent vers lui.
pub fn list_tree(volume: &mut Volume<'_>, prune_at_empty: bool) -> Result<Vec<ListingLine>> {
    let mut lines = Vec::new();
    let mut entered = BTreeSet::new();

    walker::walk(volume, prune_at_empty, |volume, slot| {
        let entry = &slot.entry;
        let is_dir = entry.kind() == EntryKind::Directory;
        if is_dir && entry.attributes().is_hidden() {
            return Visit::Skip;
        }

        lines.push(ListingLine {
            path: slot.path.clone(),
            depth: slot.depth,
            entry: entry.clone(),
        });

        let start = entry.start_cluster();
        if !is_dir || !entered.insert(start) {
            return Visit::Skip;
        }
        let clusters = volume.fat().chain(start).len();
        Visit::Enter { start, clusters }
    })?;

    Ok(tree_order(lines))
}

fn parent(path: &str) -> &str {
    &path[..path.rfind('/').unwrap_or(0)]
}

/// Le parcours finit un répertoire avant d'ouvrir ses sous-répertoires:
/// replace chaque contenu juste sous son répertoire.
fn tree_order(lines: Vec<ListingLine>) -> Vec<ListingLine> {
    let mut children: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (index, line) in lines.iter().enumerate() {
        children.entry(parent(&line.path)).or_default().push(index);
    }

    let mut order = Vec::with_capacity(lines.len());
    let mut stack: Vec<usize> = children.remove("").unwrap_or_default();
    stack.reverse();
    while let Some(index) = stack.pop() {
        order.push(index);
        let line = &lines[index];
        if line.entry.kind() != EntryKind::Directory {
            continue;
        }
        // deux répertoires de même nom ne listent leur contenu qu'une fois
        if let Some(kids) = children.remove(line.path.as_str()) {
            stack.extend(kids.into_iter().rev());
        }
    }

    order.into_iter().map(|index| lines[index].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::FileAttributes;
    use crate::test_image::{ImageBuilder, record};

    fn render(image: &mut [u8]) -> Vec<String> {
        let mut volume = Volume::open(image).unwrap();
        list_tree(&mut volume, true)
            .unwrap()
            .iter()
            .map(|line| alloc::format!("{}", line))
            .collect()
    }

    #[test]
    fn test_listing_tree() {
        let mut image = ImageBuilder::fat16()
            .root_record(record(b"MYDISK     ", FileAttributes::VOLUME_ID, 0, 0))
            .root_record(record(
                b"README  TXT",
                FileAttributes::READ_ONLY | FileAttributes::ARCHIVE,
                5,
                120,
            ))
            .root_record(record(b"DOCS       ", FileAttributes::DIRECTORY, 20, 0))
            .root_record(record(
                b"TRASH      ",
                FileAttributes::DIRECTORY | FileAttributes::HIDDEN,
                21,
                0,
            ))
            .root_record(record(b"LAST    BIN", FileAttributes::ARCHIVE, 0, 0))
            .chain(&[5])
            .chain(&[20])
            .chain(&[21])
            .dir_record(20, 0, record(b".          ", FileAttributes::DIRECTORY, 20, 0))
            .dir_record(20, 1, record(b"NOTE    TXT", 0x00, 30, 2000))
            .dir_record(21, 0, record(b"JUNK    TXT", 0x00, 0, 0))
            .build();

        assert_eq!(
            render(&mut image),
            vec![
                "Volume: MYDISK",
                "README.TXT (120 bytes) (starting cluster 5) r  a",
                "DOCS/ (directory)",
                "    NOTE.TXT (2000 bytes) (starting cluster 30)     ",
                "LAST.BIN (0 bytes) (starting cluster 0)    a",
            ]
        );
    }

    #[test]
    fn test_listing_split_label() {
        let mut image = ImageBuilder::fat16()
            .root_record(record(b"BACKUP  V2 ", FileAttributes::VOLUME_ID, 0, 0))
            .build();
        assert_eq!(render(&mut image), vec!["Volume: BACKUP  V2"]);
    }

    #[test]
    fn test_listing_directory_loop() {
        let mut image = ImageBuilder::fat16()
            .root_record(record(b"A          ", FileAttributes::DIRECTORY, 20, 0))
            .chain(&[20])
            .dir_record(20, 0, record(b"BACK       ", FileAttributes::DIRECTORY, 20, 0))
            .build();
        assert_eq!(
            render(&mut image),
            vec!["A/ (directory)", "    BACK/ (directory)"]
        );
    }
}
