//! Géométrie du volume et adressage des clusters

use crate::{FsckError, Result};

/// Taille d'une entrée de répertoire sur le disque
pub const DIR_ENTRY_SIZE: usize = 32;

/// Premier numéro de cluster de la zone de données
pub const FIRST_DATA_CLUSTER: u16 = 2;

/// Largeur des entrées de la table d'allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatType {
    Fat12,
    Fat16,
}

impl FatType {
    /// Nombre de clusters en dessous duquel le volume est en FAT12
    pub const FAT12_MAX_CLUSTERS: u32 = 4085;
    /// Nombre de clusters à partir duquel commence FAT32
    pub const FAT16_MAX_CLUSTERS: u32 = 65525;

    pub fn from_cluster_count(clusters: u32) -> Result<Self> {
        if clusters < Self::FAT12_MAX_CLUSTERS {
            Ok(FatType::Fat12)
        } else if clusters < Self::FAT16_MAX_CLUSTERS {
            Ok(FatType::Fat16)
        } else {
            Err(FsckError::InvalidGeometry("too many clusters for FAT12/16"))
        }
    }

    pub fn bits(&self) -> u32 {
        match self {
            FatType::Fat12 => 12,
            FatType::Fat16 => 16,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FatType::Fat12 => "FAT12",
            FatType::Fat16 => "FAT16",
        }
    }
}

/// Constantes de disposition d'un volume FAT12/16 validé
///
/// Produite par [`crate::BootSector::geometry`]; tous les offsets partent du
/// début de l'image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub bytes_per_sector: u32,
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub num_fats: u32,
    pub fat_size_sectors: u32,
    pub root_entry_count: u32,
    pub total_sectors: u32,
    pub fat_type: FatType,
    /// Plus grand numéro de cluster adressable
    pub max_cluster: u16,
}

impl Geometry {
    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sector * self.sectors_per_cluster
    }

    pub fn entries_per_cluster(&self) -> usize {
        self.cluster_size() as usize / DIR_ENTRY_SIZE
    }

    /// Nombre de clusters de la zone de données
    pub fn cluster_count(&self) -> u32 {
        self.max_cluster as u32 - 1
    }

    /// `true` ssi `cluster` est dans `[2, max_cluster]`
    pub fn is_valid_cluster(&self, cluster: u16) -> bool {
        (FIRST_DATA_CLUSTER..=self.max_cluster).contains(&cluster)
    }

    /// Offset de la copie `copy` de la FAT
    pub fn fat_offset(&self, copy: u32) -> usize {
        ((self.reserved_sectors + copy * self.fat_size_sectors) * self.bytes_per_sector) as usize
    }

    pub fn fat_len(&self) -> usize {
        (self.fat_size_sectors * self.bytes_per_sector) as usize
    }

    pub fn root_dir_offset(&self) -> usize {
        self.fat_offset(self.num_fats)
    }

    pub fn root_dir_len(&self) -> usize {
        self.root_entry_count as usize * DIR_ENTRY_SIZE
    }

    fn root_dir_sectors(&self) -> u32 {
        (self.root_entry_count * DIR_ENTRY_SIZE as u32).div_ceil(self.bytes_per_sector)
    }

    pub fn first_data_sector(&self) -> u32 {
        self.reserved_sectors + self.num_fats * self.fat_size_sectors + self.root_dir_sectors()
    }

    pub fn data_offset(&self) -> usize {
        (self.first_data_sector() * self.bytes_per_sector) as usize
    }

    /// Taille minimale de l'image pour que tous les clusters soient adressables
    pub fn required_image_len(&self) -> usize {
        self.data_offset() + self.cluster_count() as usize * self.cluster_size() as usize
    }

    /// Offset du premier octet de `cluster`
    pub fn cluster_to_offset(&self, cluster: u16) -> Result<usize> {
        if !self.is_valid_cluster(cluster) {
            return Err(FsckError::ClusterOutOfRange { cluster });
        }
        let index = (cluster - FIRST_DATA_CLUSTER) as usize;
        Ok(self.data_offset() + index * self.cluster_size() as usize)
    }

    /// Clusters nécessaires pour `size` octets
    pub fn required_clusters(&self, size: u32) -> usize {
        size.div_ceil(self.cluster_size()) as usize
    }

    /// Octets que peut contenir une chaîne de `clusters` clusters
    pub fn capacity(&self, clusters: usize) -> u32 {
        (clusters as u64 * self.cluster_size() as u64).min(u32::MAX as u64) as u32
    }
}
