//! Images FAT12/16 en mémoire pour les tests unitaires

use crate::directory::{DirRecord, encode};
use crate::fat_table::{ClusterLink, FatTable};
use crate::geometry::{DIR_ENTRY_SIZE, FatType, Geometry};

pub fn fat16_geometry() -> Geometry {
    Geometry {
        bytes_per_sector: 512,
        sectors_per_cluster: 1,
        reserved_sectors: 1,
        num_fats: 2,
        fat_size_sectors: 32,
        root_entry_count: 512,
        total_sectors: 8192,
        fat_type: FatType::Fat16,
        max_cluster: 8096,
    }
}

pub fn fat12_geometry() -> Geometry {
    Geometry {
        bytes_per_sector: 512,
        sectors_per_cluster: 1,
        reserved_sectors: 1,
        num_fats: 2,
        fat_size_sectors: 9,
        root_entry_count: 224,
        total_sectors: 2880,
        fat_type: FatType::Fat12,
        max_cluster: 2848,
    }
}

pub struct ImageBuilder {
    image: Vec<u8>,
    geometry: Geometry,
    root_used: usize,
}

impl ImageBuilder {
    fn new(geometry: Geometry, media: u8, fs_type: &[u8; 8]) -> Self {
        let g = geometry;
        let mut image = vec![0u8; (g.total_sectors * g.bytes_per_sector) as usize];

        image[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]);
        image[3..11].copy_from_slice(b"MSDOS5.0");
        image[11..13].copy_from_slice(&(g.bytes_per_sector as u16).to_le_bytes());
        image[13] = g.sectors_per_cluster as u8;
        image[14..16].copy_from_slice(&(g.reserved_sectors as u16).to_le_bytes());
        image[16] = g.num_fats as u8;
        image[17..19].copy_from_slice(&(g.root_entry_count as u16).to_le_bytes());
        image[19..21].copy_from_slice(&(g.total_sectors as u16).to_le_bytes());
        image[21] = media;
        image[22..24].copy_from_slice(&(g.fat_size_sectors as u16).to_le_bytes());
        image[38] = 0x29;
        image[43..54].copy_from_slice(b"NO NAME    ");
        image[54..62].copy_from_slice(fs_type);
        image[510] = 0x55;
        image[511] = 0xAA;

        for copy in 0..g.num_fats {
            let off = g.fat_offset(copy);
            match g.fat_type {
                FatType::Fat12 => image[off..off + 3].copy_from_slice(&[media, 0xFF, 0xFF]),
                FatType::Fat16 => image[off..off + 4].copy_from_slice(&[media, 0xFF, 0xFF, 0xFF]),
            }
        }

        Self { image, geometry, root_used: 0 }
    }

    pub fn fat16() -> Self {
        Self::new(fat16_geometry(), 0xF8, b"FAT16   ")
    }

    pub fn fat12() -> Self {
        Self::new(fat12_geometry(), 0xF0, b"FAT12   ")
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    fn set(mut self, cluster: u16, link: ClusterLink) -> Self {
        FatTable::new(&mut self.image[..], self.geometry)
            .set_next(cluster, link)
            .unwrap();
        self
    }

    pub fn link(self, from: u16, to: u16) -> Self {
        self.set(from, ClusterLink::Continuation(to))
    }

    pub fn bad(self, cluster: u16) -> Self {
        self.set(cluster, ClusterLink::Bad)
    }

    /// Chaîne `clusters` dans l'ordre, terminé par une fin de chaîne
    pub fn chain(mut self, clusters: &[u16]) -> Self {
        FatTable::new(&mut self.image[..], self.geometry)
            .link(clusters)
            .unwrap();
        self
    }

    /// Place `record` dans la prochaine entrée libre de la racine
    pub fn root_record(mut self, record: DirRecord) -> Self {
        let off = self.geometry.root_dir_offset() + self.root_used * DIR_ENTRY_SIZE;
        self.image[off..off + DIR_ENTRY_SIZE].copy_from_slice(&record);
        self.root_used += 1;
        self
    }

    pub fn root_file(self, name: &str, start: u16, size: u32) -> Self {
        self.root_record(encode(name, start, size))
    }

    /// Place `record` à l'index `index` du cluster de répertoire `cluster`
    pub fn dir_record(mut self, cluster: u16, index: usize, record: DirRecord) -> Self {
        let off = self.geometry.cluster_to_offset(cluster).unwrap() + index * DIR_ENTRY_SIZE;
        self.image[off..off + DIR_ENTRY_SIZE].copy_from_slice(&record);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.image
    }
}

/// Entrée aux attributs explicites, nom donné en 11 octets bruts
pub fn record(name: &[u8; 11], attributes: u8, start: u16, size: u32) -> DirRecord {
    let mut record = encode("X.X", start, size);
    record[..11].copy_from_slice(name);
    record[11] = attributes;
    record
}
