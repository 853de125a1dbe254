//! Parcours de l'arborescence des répertoires

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::Result;
use crate::directory::{self, DirEntry, Slot};
use crate::filesystem::{DirLocation, Volume};

/// Entrée utilisée, passée au visiteur
#[derive(Debug, Clone)]
pub struct DirSlot {
    /// Offset de l'entrée dans l'image
    pub offset: usize,
    pub entry: DirEntry,
    /// `/DIR/NAME.EXT`
    pub path: String,
    /// 0 pour les entrées de la racine
    pub depth: usize,
    /// Vrai sous un répertoire ouvert avec [`Visit::EnterHidden`]
    pub hidden: bool,
}

/// Suite du parcours après une entrée
///
/// `clusters` borne la lecture du répertoire aux premiers clusters de sa
/// chaîne, ceux que le visiteur a effectivement retenus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Skip,
    Enter { start: u16, clusters: usize },
    /// Comme `Enter`, tout le sous-arbre est marqué caché
    EnterHidden { start: u16, clusters: usize },
}

struct PendingDir {
    location: DirLocation,
    path: String,
    depth: usize,
    hidden: bool,
}

/// Parcourt l'arbre depuis la racine, en profondeur et dans l'ordre du disque
///
/// Le visiteur reçoit les fichiers, répertoires et labels de volume. Les
/// entrées `.`/`..`, les fragments de noms longs et les entrées supprimées
/// sont sautés. Avec `prune_at_empty` une entrée vide termine son répertoire,
/// sinon toutes les entrées sont lues.
pub fn walk<'a, F>(volume: &mut Volume<'a>, prune_at_empty: bool, mut visitor: F) -> Result<()>
where
    F: FnMut(&mut Volume<'a>, &DirSlot) -> Visit,
{
    let mut stack = vec![PendingDir {
        location: DirLocation::Root,
        path: String::new(),
        depth: 0,
        hidden: false,
    }];

    while let Some(dir) = stack.pop() {
        log::debug!("walking {:?} ({})", dir.location, if dir.path.is_empty() { "/" } else { dir.path.as_str() });

        let mut children = Vec::new();
        for offset in volume.slot_offsets(dir.location)? {
            let entry = match directory::decode(&volume.read_record(offset)) {
                Slot::Entry(entry) => entry,
                Slot::Empty if prune_at_empty => break,
                _ => continue,
            };

            let slot = DirSlot {
                offset,
                path: alloc::format!("{}/{}", dir.path, entry.short_name()),
                entry,
                depth: dir.depth,
                hidden: dir.hidden,
            };

            let (start, clusters, hidden) = match visitor(volume, &slot) {
                Visit::Skip => continue,
                Visit::Enter { start, clusters } => (start, clusters, dir.hidden),
                Visit::EnterHidden { start, clusters } => (start, clusters, true),
            };
            if !volume.geometry().is_valid_cluster(start) {
                log::warn!("{}: not entering directory at invalid cluster {}", slot.path, start);
                continue;
            }

            children.push(PendingDir {
                location: DirLocation::Chain { start, clusters },
                path: slot.path,
                depth: dir.depth + 1,
                hidden,
            });
        }

        // dépilés dans l'ordre du disque
        stack.extend(children.into_iter().rev());
    }

    Ok(())
}
