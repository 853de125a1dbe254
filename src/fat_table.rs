//! Accès à la table d'allocation et parcours des chaînes de clusters

use alloc::vec;
use alloc::vec::Vec;

use byteorder::{ByteOrder, LittleEndian};

use crate::geometry::{FatType, Geometry};
use crate::{FsckError, Result};

/// Valeur décodée d'une entrée de la FAT
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterLink {
    Free,
    Continuation(u16),
    EndOfChain,
    Bad,
    /// Cluster 1 ou numéro au-delà de la zone de données
    Reserved(u16),
}

/// Raison de l'arrêt d'un parcours de chaîne
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainEnd {
    EndOfChain,
    /// L'entrée de ce cluster est libre alors que la chaîne y mène
    Free(u16),
    /// Ce cluster est marqué défectueux
    Bad(u16),
    /// Le dernier cluster pointe vers cette valeur hors limites
    OutOfRange(u16),
    /// Le dernier cluster revient sur ce cluster déjà visité
    Cycle(u16),
    /// Le dernier cluster pointe vers ce cluster, qui appartient à une autre chaîne
    CrossLinked(u16),
}

impl ChainEnd {
    pub fn is_clean(&self) -> bool {
        matches!(self, ChainEnd::EndOfChain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    /// Clusters dont les données appartiennent à la chaîne, dans l'ordre des liens
    pub clusters: Vec<u16>,
    pub end: ChainEnd,
}

impl Chain {
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    pub fn last(&self) -> Option<u16> {
        self.clusters.last().copied()
    }
}

/// Vue sur la table d'allocation dans l'image
///
/// Lecture dans la première copie, écriture dans toutes les copies.
pub struct FatTable<B> {
    image: B,
    geometry: Geometry,
}

impl<B: AsRef<[u8]>> FatTable<B> {
    pub fn new(image: B, geometry: Geometry) -> Self {
        Self { image, geometry }
    }

    /// Valeur brute de l'entrée, sur 12 ou 16 bits
    pub fn raw_entry(&self, cluster: u16) -> u16 {
        let fat = &self.image.as_ref()[self.geometry.fat_offset(0)..];
        match self.geometry.fat_type {
            FatType::Fat12 => {
                let off = cluster as usize * 3 / 2;
                let pair = LittleEndian::read_u16(&fat[off..off + 2]);
                if cluster & 1 == 1 { pair >> 4 } else { pair & 0x0FFF }
            }
            FatType::Fat16 => {
                let off = cluster as usize * 2;
                LittleEndian::read_u16(&fat[off..off + 2])
            }
        }
    }

    /// Classe une valeur brute
    pub fn classify(&self, raw: u16) -> ClusterLink {
        let (bad, eoc) = match self.geometry.fat_type {
            FatType::Fat12 => (0x0FF7, 0x0FF8),
            FatType::Fat16 => (0xFFF7, 0xFFF8),
        };
        match raw {
            0 => ClusterLink::Free,
            r if r >= eoc => ClusterLink::EndOfChain,
            r if r == bad => ClusterLink::Bad,
            r if self.geometry.is_valid_cluster(r) => ClusterLink::Continuation(r),
            r => ClusterLink::Reserved(r),
        }
    }

    /// Lien stocké dans l'entrée de `cluster`
    pub fn next(&self, cluster: u16) -> ClusterLink {
        self.classify(self.raw_entry(cluster))
    }

    /// Suit la chaîne depuis `start`
    pub fn chain(&self, start: u16) -> Chain {
        self.walk_chain(start, |_| false)
    }

    /// Suit la chaîne depuis `start` et s'arrête avant tout cluster pour
    /// lequel `claimed` renvoie `true`
    ///
    /// Termine en au plus `max_cluster` étapes: chaque cluster est visité une
    /// seule fois.
    pub fn walk_chain<F>(&self, start: u16, claimed: F) -> Chain
    where
        F: Fn(u16) -> bool,
    {
        let mut clusters = Vec::new();
        if !self.geometry.is_valid_cluster(start) {
            return Chain { clusters, end: ChainEnd::OutOfRange(start) };
        }
        if claimed(start) {
            return Chain { clusters, end: ChainEnd::CrossLinked(start) };
        }

        let mut visited = vec![false; self.geometry.max_cluster as usize + 1];
        let mut current = start;
        let end = loop {
            match self.next(current) {
                ClusterLink::Free => break ChainEnd::Free(current),
                ClusterLink::Bad => break ChainEnd::Bad(current),
                _ => {}
            }
            visited[current as usize] = true;
            clusters.push(current);

            match self.next(current) {
                ClusterLink::Continuation(next) if visited[next as usize] => {
                    break ChainEnd::Cycle(next);
                }
                ClusterLink::Continuation(next) if claimed(next) => {
                    break ChainEnd::CrossLinked(next);
                }
                ClusterLink::Continuation(next) => current = next,
                ClusterLink::Reserved(raw) => break ChainEnd::OutOfRange(raw),
                _ => break ChainEnd::EndOfChain,
            }
        };

        Chain { clusters, end }
    }

    /// Nombre de clusters atteints depuis `start` avant le premier lien qui
    /// n'est pas une continuation
    pub fn chain_length(&self, start: u16) -> Result<usize> {
        let chain = self.chain(start);
        match chain.end {
            ChainEnd::OutOfRange(cluster) if chain.is_empty() => {
                Err(FsckError::ClusterOutOfRange { cluster })
            }
            ChainEnd::Cycle(cluster) => Err(FsckError::ChainCycle { cluster }),
            _ => Ok(chain.len()),
        }
    }

    /// Nombre d'entrées non libres sur toute la zone de données
    pub fn allocated_clusters(&self) -> usize {
        (2..=self.geometry.max_cluster)
            .filter(|&c| self.next(c) != ClusterLink::Free)
            .count()
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> FatTable<B> {
    fn write_raw(&mut self, cluster: u16, value: u16) {
        let geometry = self.geometry;
        for copy in 0..geometry.num_fats {
            let start = geometry.fat_offset(copy);
            let fat = &mut self.image.as_mut()[start..start + geometry.fat_len()];
            match geometry.fat_type {
                FatType::Fat12 => {
                    let off = cluster as usize * 3 / 2;
                    let existing = LittleEndian::read_u16(&fat[off..off + 2]);
                    let packed = if cluster & 1 == 1 {
                        (existing & 0x000F) | (value << 4)
                    } else {
                        (existing & 0xF000) | (value & 0x0FFF)
                    };
                    LittleEndian::write_u16(&mut fat[off..off + 2], packed);
                }
                FatType::Fat16 => {
                    let off = cluster as usize * 2;
                    LittleEndian::write_u16(&mut fat[off..off + 2], value);
                }
            }
        }
    }

    /// Écrit `link` dans l'entrée de `cluster`
    pub fn set_next(&mut self, cluster: u16, link: ClusterLink) -> Result<()> {
        if !self.geometry.is_valid_cluster(cluster) {
            return Err(FsckError::ClusterOutOfRange { cluster });
        }
        let value = match (link, self.geometry.fat_type) {
            (ClusterLink::Free, _) => 0,
            (ClusterLink::Continuation(next), _) | (ClusterLink::Reserved(next), _) => next,
            (ClusterLink::EndOfChain, FatType::Fat12) => 0x0FFF,
            (ClusterLink::EndOfChain, FatType::Fat16) => 0xFFFF,
            (ClusterLink::Bad, FatType::Fat12) => 0x0FF7,
            (ClusterLink::Bad, FatType::Fat16) => 0xFFF7,
        };
        self.write_raw(cluster, value);
        Ok(())
    }

    pub fn mark_free(&mut self, cluster: u16) -> Result<()> {
        self.set_next(cluster, ClusterLink::Free)
    }

    /// Fait de `last` le dernier cluster de sa chaîne
    pub fn truncate(&mut self, last: u16) -> Result<()> {
        self.set_next(last, ClusterLink::EndOfChain)
    }

    /// Chaîne `clusters` dans l'ordre et termine la chaîne
    pub fn link(&mut self, clusters: &[u16]) -> Result<()> {
        for pair in clusters.windows(2) {
            self.set_next(pair[0], ClusterLink::Continuation(pair[1]))?;
        }
        if let Some(&last) = clusters.last() {
            self.truncate(last)?;
        }
        Ok(())
    }
}
