//! Vérification et réparation de la cohérence taille/chaîne
//!
//! Une passe parcourt l'arbre, accorde la taille de chaque fichier avec sa
//! chaîne de clusters, puis transforme les clusters qu'aucune entrée n'a
//! atteints en fichiers récupérés à la racine.

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use crate::directory::{self, EntryKind, Slot};
use crate::fat_table::{Chain, ChainEnd, ClusterLink};
use crate::filesystem::{DirLocation, Volume};
use crate::geometry::Geometry;
use crate::report::{FindingKind, Report, SizeRepair};
use crate::walker::{self, DirSlot, Visit};
use crate::{FsckError, Result};

/// Réglages d'une passe. Les valeurs par défaut sont celles de `fatcheck <image>`.
#[derive(Debug, Clone)]
pub struct Options {
    /// La première entrée vide termine son répertoire
    pub prune_at_empty: bool,
    /// Vérifie aussi les fichiers sous les répertoires cachés. Désactivé par
    /// défaut: ces arbres (corbeilles etc.) sont comptabilisés, jamais modifiés.
    pub descend_hidden: bool,
    /// Les chaînes récupérées s'appellent `<prefix><nnnn>.<extension>`
    pub recovered_prefix: String,
    pub recovered_extension: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            prune_at_empty: true,
            descend_hidden: false,
            recovered_prefix: "FILE".into(),
            recovered_extension: "CHK".into(),
        }
    }
}

/// Passe complète de vérification et réparation sur `volume`
pub fn check(volume: &mut Volume<'_>, options: &Options) -> Result<Report> {
    let mut checker = Checker::new(*volume.geometry(), options);
    walker::walk(volume, options.prune_at_empty, |volume, slot| {
        checker.visit(volume, slot)
    })?;
    checker.reclaim_orphans(volume)?;
    Ok(checker.report)
}

/// Dernier numéro de fichier récupéré
const MAX_RECOVERED: u32 = 9999;

fn defect(end: ChainEnd) -> Option<FindingKind> {
    match end {
        ChainEnd::EndOfChain => None,
        ChainEnd::Free(cluster) => Some(FindingKind::FreeInChain { cluster }),
        ChainEnd::Bad(cluster) => Some(FindingKind::BadCluster { cluster }),
        ChainEnd::OutOfRange(cluster) => Some(FindingKind::ClusterOutOfRange { cluster }),
        ChainEnd::Cycle(cluster) => Some(FindingKind::ChainCycle { cluster }),
        ChainEnd::CrossLinked(cluster) => Some(FindingKind::CrossLinked { cluster }),
    }
}

struct Checker<'o> {
    options: &'o Options,
    geometry: Geometry,
    /// Clusters appartenant à une entrée déjà vue
    claimed: Vec<bool>,
    report: Report,
    next_recovered: u32,
}

impl<'o> Checker<'o> {
    fn new(geometry: Geometry, options: &'o Options) -> Self {
        Self {
            options,
            geometry,
            claimed: vec![false; geometry.max_cluster as usize + 1],
            // la racine
            report: Report { directories_checked: 1, ..Report::default() },
            next_recovered: 0,
        }
    }

    fn walk_unclaimed(&self, volume: &Volume<'_>, start: u16) -> Chain {
        let claimed = &self.claimed;
        volume.fat().walk_chain(start, |c| claimed[c as usize])
    }

    fn claim(&mut self, clusters: &[u16]) {
        for &c in clusters {
            self.claimed[c as usize] = true;
        }
    }

    fn visit(&mut self, volume: &mut Volume<'_>, slot: &DirSlot) -> Visit {
        let result = match slot.entry.kind() {
            EntryKind::VolumeLabel => {
                log::debug!("volume label {}", slot.entry.short_name());
                Ok(Visit::Skip)
            }
            EntryKind::Directory => self.check_directory(volume, slot),
            EntryKind::File if slot.hidden => {
                let chain = self.walk_unclaimed(volume, slot.entry.start_cluster());
                self.claim(&chain.clusters);
                Ok(Visit::Skip)
            }
            EntryKind::File => self.check_file(volume, slot).map(|()| Visit::Skip),
        };

        result.unwrap_or_else(|e| {
            log::error!("{}: {}", slot.path, e);
            Visit::Skip
        })
    }

    /// Réserve la chaîne d'un sous-répertoire et décide d'y entrer ou non
    fn check_directory(&mut self, volume: &mut Volume<'_>, slot: &DirSlot) -> Result<Visit> {
        let start = slot.entry.start_cluster();
        let chain = self.walk_unclaimed(volume, start);

        if chain.is_empty() {
            // rien de sûr où entrer, l'entrée elle-même n'est pas touchée
            if !slot.hidden {
                if let Some(kind) = defect(chain.end) {
                    self.report.record(&slot.path, kind);
                }
            }
            return Ok(Visit::Skip);
        }

        self.claim(&chain.clusters);
        let clusters = chain.len();
        if slot.hidden {
            return Ok(Visit::EnterHidden { start, clusters });
        }

        if let (Some(kind), Some(last)) = (defect(chain.end), chain.last()) {
            volume.fat_mut().truncate(last)?;
            self.report.repairs += 1;
            self.report.record(&slot.path, kind);
        }
        self.report.directories_checked += 1;

        if slot.entry.attributes().is_hidden() && !self.options.descend_hidden {
            log::debug!("{}: hidden, not inspecting", slot.path);
            Ok(Visit::EnterHidden { start, clusters })
        } else {
            Ok(Visit::Enter { start, clusters })
        }
    }

    /// Accorde la taille de l'entrée avec sa chaîne, puis réserve ce qui reste
    fn check_file(&mut self, volume: &mut Volume<'_>, slot: &DirSlot) -> Result<()> {
        self.report.files_checked += 1;

        let start = slot.entry.start_cluster();
        let declared = slot.entry.file_size();
        let required = self.geometry.required_clusters(declared);
        log::debug!("{}: {} bytes from cluster {}", slot.path, declared, start);

        if start == 0 {
            if declared != 0 {
                self.correct_size(volume, slot, 0, 0);
            }
            return Ok(());
        }

        let chain = self.walk_unclaimed(volume, start);
        let allocated = chain.len();

        if chain.is_empty() {
            // le cluster de départ lui-même est inutilisable
            if let Some(kind) = defect(chain.end) {
                self.report.record(&slot.path, kind);
            }
            volume.set_entry_start(slot.offset, 0);
            self.report.repairs += 1;
            if declared != 0 {
                self.correct_size(volume, slot, 0, 0);
            }
            return Ok(());
        }

        if required < allocated {
            let (keep, excess) = chain.clusters.split_at(required);
            let mut fat = volume.fat_mut();
            if let Some(&last) = keep.last() {
                fat.truncate(last)?;
            }
            for &cluster in excess {
                fat.mark_free(cluster)?;
            }
            if keep.is_empty() {
                volume.set_entry_start(slot.offset, 0);
            }

            self.claim(keep);
            self.report.repairs += 1;
            self.report.clusters_freed += excess.len();
            self.report.record(
                &slot.path,
                FindingKind::SizeMismatch {
                    declared,
                    clusters: allocated,
                    repair: SizeRepair::ChainTruncated { freed: excess.len() },
                },
            );
            return Ok(());
        }

        self.claim(&chain.clusters);

        if let (Some(kind), Some(last)) = (defect(chain.end), chain.last()) {
            volume.fat_mut().truncate(last)?;
            self.report.repairs += 1;
            self.report.record(&slot.path, kind);
        }

        if required > allocated {
            let size = self.geometry.capacity(allocated);
            self.correct_size(volume, slot, allocated, size);
        }
        Ok(())
    }

    fn correct_size(&mut self, volume: &mut Volume<'_>, slot: &DirSlot, clusters: usize, size: u32) {
        volume.set_entry_size(slot.offset, size);
        self.report.repairs += 1;
        self.report.record(
            &slot.path,
            FindingKind::SizeMismatch {
                declared: slot.entry.file_size(),
                clusters,
                repair: SizeRepair::SizeCorrected { size },
            },
        );
    }

    /// Enregistre chaque cluster alloué qu'aucune entrée n'a atteint
    ///
    /// À appeler une fois tout l'arbre parcouru.
    fn reclaim_orphans(&mut self, volume: &mut Volume<'_>) -> Result<()> {
        let max = self.geometry.max_cluster;
        let fat = volume.fat();

        let mut lost = vec![false; max as usize + 1];
        for cluster in 2..=max {
            lost[cluster as usize] = !self.claimed[cluster as usize]
                && !matches!(fat.next(cluster), ClusterLink::Free | ClusterLink::Bad);
        }

        // une tête est un cluster perdu vers lequel aucun autre cluster perdu ne pointe
        let mut linked_to = vec![false; max as usize + 1];
        for cluster in (2..=max).filter(|&c| lost[c as usize]) {
            if let ClusterLink::Continuation(next) = fat.next(cluster) {
                if lost[next as usize] {
                    linked_to[next as usize] = true;
                }
            }
        }
        let heads: Vec<u16> = (2..=max)
            .filter(|&c| lost[c as usize] && !linked_to[c as usize])
            .collect();

        if !lost.iter().any(|&l| l) {
            return Ok(());
        }
        let mut taken = self.root_names(volume)?;

        for head in heads {
            self.recover_chain(volume, head, &mut taken)?;
        }
        // ce qui reste ne forme que des boucles
        for cluster in 2..=max {
            if lost[cluster as usize] && !self.claimed[cluster as usize] {
                self.recover_chain(volume, cluster, &mut taken)?;
            }
        }
        Ok(())
    }

    fn recover_chain(&mut self, volume: &mut Volume<'_>, head: u16, taken: &mut BTreeSet<String>) -> Result<()> {
        let chain = self.walk_unclaimed(volume, head);
        let Some(last) = chain.last() else {
            return Ok(());
        };
        self.claim(&chain.clusters);
        if !chain.end.is_clean() {
            volume.fat_mut().truncate(last)?;
            self.report.repairs += 1;
        }

        let Some(name) = self.recovered_name(taken) else {
            self.report.record("/", FindingKind::DirectoryFull { start: head });
            return Ok(());
        };
        let size = self.geometry.capacity(chain.len());
        match volume.create_dirent(&name, head, size) {
            Ok(_) => {
                self.report.repairs += 1;
                self.report.files_recovered += 1;
                self.report.record(
                    &alloc::format!("/{}", name),
                    FindingKind::OrphanCluster {
                        start: head,
                        clusters: chain.len(),
                        name,
                    },
                );
                Ok(())
            }
            Err(FsckError::DirectoryFull) => {
                self.report.record("/", FindingKind::DirectoryFull { start: head });
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn root_names(&self, volume: &Volume<'_>) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for offset in volume.slot_offsets(DirLocation::Root)? {
            if let Slot::Entry(entry) = directory::decode(&volume.read_record(offset)) {
                names.insert(entry.short_name());
            }
        }
        Ok(names)
    }

    /// Premier `<prefix><nnnn>.<ext>` absent de la racine, comparé sous sa
    /// forme 8.3 telle qu'elle sera écrite
    ///
    /// `None` une fois les numéros épuisés.
    fn recovered_name(&mut self, taken: &mut BTreeSet<String>) -> Option<String> {
        while self.next_recovered <= MAX_RECOVERED {
            let name = alloc::format!(
                "{}{:04}.{}",
                self.options.recovered_prefix,
                self.next_recovered,
                self.options.recovered_extension
            );
            self.next_recovered += 1;

            let Slot::Entry(entry) = directory::decode(&directory::encode(&name, 0, 0)) else {
                continue;
            };
            let stored = entry.short_name();
            if taken.insert(stored.clone()) {
                return Some(stored);
            }
        }
        None
    }
}
