//! Volume: l'image en mémoire et sa géométrie, empruntées pour toute une passe

use alloc::vec::Vec;

use crate::directory::{self, DirRecord, SLOT_DELETED, SLOT_EMPTY, Slot};
use crate::fat_table::FatTable;
use crate::geometry::{DIR_ENTRY_SIZE, Geometry};
use crate::{BootSector, FsckError, Result};

/// Emplacement des entrées d'un répertoire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirLocation {
    /// Tableau de taille fixe après les FATs
    Root,
    /// Les `clusters` premiers clusters de la chaîne partant de `start`
    Chain { start: u16, clusters: usize },
}

pub struct Volume<'a> {
    image: &'a mut [u8],
    geometry: Geometry,
}

impl<'a> Volume<'a> {
    /// Lit le secteur de boot de `image` et garde l'image pour la passe
    pub fn open(image: &'a mut [u8]) -> Result<Self> {
        let geometry = BootSector::parse(image)?.geometry()?;
        Self::with_geometry(image, geometry)
    }

    pub fn with_geometry(image: &'a mut [u8], geometry: Geometry) -> Result<Self> {
        let needed = geometry.required_image_len();
        if image.len() < needed {
            return Err(FsckError::ImageTooSmall {
                needed,
                actual: image.len(),
            });
        }
        Ok(Self { image, geometry })
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn fat(&self) -> FatTable<&[u8]> {
        FatTable::new(&*self.image, self.geometry)
    }

    pub fn fat_mut(&mut self) -> FatTable<&mut [u8]> {
        FatTable::new(&mut *self.image, self.geometry)
    }

    /// Offsets de toutes les entrées d'un répertoire, dans l'ordre du disque
    pub fn slot_offsets(&self, location: DirLocation) -> Result<Vec<usize>> {
        match location {
            DirLocation::Root => {
                let base = self.geometry.root_dir_offset();
                Ok((0..self.geometry.root_entry_count as usize)
                    .map(|i| base + i * DIR_ENTRY_SIZE)
                    .collect())
            }
            DirLocation::Chain { start, clusters } => {
                let per_cluster = self.geometry.entries_per_cluster();
                let chain = self.fat().chain(start);
                let mut offsets = Vec::with_capacity(chain.len().min(clusters) * per_cluster);
                for cluster in chain.clusters.into_iter().take(clusters) {
                    let base = self.geometry.cluster_to_offset(cluster)?;
                    offsets.extend((0..per_cluster).map(|i| base + i * DIR_ENTRY_SIZE));
                }
                Ok(offsets)
            }
        }
    }

    pub fn read_record(&self, offset: usize) -> DirRecord {
        let mut record = [0u8; DIR_ENTRY_SIZE];
        record.copy_from_slice(&self.image[offset..offset + DIR_ENTRY_SIZE]);
        record
    }

    pub fn write_record(&mut self, offset: usize, record: &DirRecord) {
        self.image[offset..offset + DIR_ENTRY_SIZE].copy_from_slice(record);
    }

    /// Réécrit la taille de l'entrée à `offset`
    pub fn set_entry_size(&mut self, offset: usize, size: u32) {
        let mut record = self.read_record(offset);
        directory::set_file_size(&mut record, size);
        self.write_record(offset, &record);
    }

    /// Réécrit le cluster de départ de l'entrée à `offset`
    pub fn set_entry_start(&mut self, offset: usize, cluster: u16) {
        let mut record = self.read_record(offset);
        directory::set_start_cluster(&mut record, cluster);
        self.write_record(offset, &record);
    }

    /// Ajoute un fichier normal à la racine
    ///
    /// Prend la première entrée vide ou supprimée. Si c'était la marque de fin,
    /// l'entrée suivante est remise à zéro pour garder la racine terminée, sauf
    /// si elle est encore utilisée. Renvoie l'offset de la nouvelle entrée.
    pub fn create_dirent(&mut self, filename: &str, start_cluster: u16, size: u32) -> Result<usize> {
        let slots = self.slot_offsets(DirLocation::Root)?;
        for (index, &offset) in slots.iter().enumerate() {
            match self.image[offset] {
                SLOT_EMPTY => {
                    self.write_record(offset, &directory::encode(filename, start_cluster, size));
                    if let Some(&next) = slots.get(index + 1) {
                        // une entrée vivante ou un fragment de nom long ne s'efface pas
                        if matches!(
                            directory::decode(&self.read_record(next)),
                            Slot::Empty | Slot::Deleted
                        ) {
                            self.write_record(next, &[0u8; DIR_ENTRY_SIZE]);
                        }
                    }
                    return Ok(offset);
                }
                SLOT_DELETED => {
                    self.write_record(offset, &directory::encode(filename, start_cluster, size));
                    return Ok(offset);
                }
                _ => {}
            }
        }
        Err(FsckError::DirectoryFull)
    }
}
