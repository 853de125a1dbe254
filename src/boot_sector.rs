use crate::geometry::{FatType, Geometry};
use crate::{FsckError, Result};

// secteur de boot FAT12/16 (BPB + BPB étendu)

pub const BOOT_SECTOR_SIZE: usize = 512;
const SIGNATURE_OFFSET: usize = 510;

#[repr(C, packed)]
#[derive(Clone, Copy, Debug)]
pub struct BootSector {
    pub jmp_boot: [u8; 3],
    pub oem_name: [u8; 8],
    pub bytes_per_sector: u16,
    pub sectors_per_cluster: u8,
    pub reserved_sector_count: u16,
    pub num_fats: u8,
    pub root_entry_count: u16,
    pub total_sectors_16: u16,
    pub media: u8,
    pub fat_size_16: u16,
    pub sectors_per_track: u16,
    pub num_heads: u16,
    pub hidden_sectors: u32,
    pub total_sectors_32: u32,
    pub drive_number: u8,
    pub reserved1: u8,
    pub boot_signature: u8,
    pub volume_id: u32,
    pub volume_label: [u8; 11],
    pub fs_type: [u8; 8],
}

impl BootSector {
    /// Lit le BPB dans le premier secteur de l'image
    ///
    /// Vérifie la longueur et la signature `0x55AA`; les valeurs des champs
    /// sont vérifiées par [`BootSector::validate`].
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BOOT_SECTOR_SIZE {
            return Err(FsckError::ImageTooSmall {
                needed: BOOT_SECTOR_SIZE,
                actual: data.len(),
            });
        }
        if data[SIGNATURE_OFFSET..SIGNATURE_OFFSET + 2] != [0x55, 0xAA] {
            return Err(FsckError::InvalidGeometry("missing 0x55AA boot signature"));
        }
        // Longueur vérifiée plus haut et BootSector n'est que des octets:
        // la lecture non alignée de size_of::<BootSector>() reste dans `data`.
        Ok(unsafe { core::ptr::read_unaligned(data.as_ptr() as *const BootSector) })
    }

    /// Vérifier que le boot sector décrit un volume FAT12/16 utilisable
    pub fn validate(&self) -> Result<()> {
        if self.jmp_boot[0] != 0xEB && self.jmp_boot[0] != 0xE9 {
            return Err(FsckError::InvalidGeometry("bad jump instruction"));
        }

        let bytes_per_sector = self.bytes_per_sector;
        if !matches!(bytes_per_sector, 512 | 1024 | 2048 | 4096) {
            return Err(FsckError::InvalidGeometry("bad bytes per sector"));
        }

        let sectors_per_cluster = self.sectors_per_cluster;
        if sectors_per_cluster == 0 || !sectors_per_cluster.is_power_of_two() {
            return Err(FsckError::InvalidGeometry("bad sectors per cluster"));
        }

        if self.num_fats == 0 {
            return Err(FsckError::InvalidGeometry("no FAT"));
        }

        let reserved = self.reserved_sector_count;
        if reserved == 0 {
            return Err(FsckError::InvalidGeometry("no reserved sectors"));
        }

        // FAT32 laisse ces deux champs à zéro
        let fat_size = self.fat_size_16;
        let root_entries = self.root_entry_count;
        if fat_size == 0 || root_entries == 0 {
            return Err(FsckError::InvalidGeometry("FAT32 volumes are not supported"));
        }

        if self.first_data_sector() >= self.total_sectors() {
            return Err(FsckError::InvalidGeometry("data region starts past the volume end"));
        }

        Ok(())
    }

    pub fn cluster_size(&self) -> u32 {
        self.bytes_per_sector as u32 * self.sectors_per_cluster as u32
    }

    pub fn total_sectors(&self) -> u32 {
        if self.total_sectors_16 != 0 {
            self.total_sectors_16 as u32
        } else {
            self.total_sectors_32
        }
    }

    fn root_dir_sectors(&self) -> u32 {
        let bytes = self.root_entry_count as u32 * 32;
        bytes.div_ceil(self.bytes_per_sector as u32)
    }

    pub fn first_data_sector(&self) -> u32 {
        self.reserved_sector_count as u32
            + self.num_fats as u32 * self.fat_size_16 as u32
            + self.root_dir_sectors()
    }

    pub fn volume_label(&self) -> [u8; 11] {
        self.volume_label
    }

    /// Valide puis calcule la géométrie utilisée par la vérification
    pub fn geometry(&self) -> Result<Geometry> {
        self.validate()?;

        let data_sectors = self.total_sectors() - self.first_data_sector();
        let clusters = data_sectors / self.sectors_per_cluster as u32;
        if clusters == 0 {
            return Err(FsckError::InvalidGeometry("no data clusters"));
        }
        let fat_type = FatType::from_cluster_count(clusters)?;

        // La FAT peut être plus courte que la zone de données; seuls les
        // clusters qui ont une entrée sont adressables.
        let fat_bits = self.fat_size_16 as u32 * self.bytes_per_sector as u32 * 8;
        let fat_slots = fat_bits / fat_type.bits();
        if fat_slots <= 2 {
            return Err(FsckError::InvalidGeometry("FAT too small"));
        }
        let max_cluster = (clusters + 1).min(fat_slots - 1);

        Ok(Geometry {
            bytes_per_sector: self.bytes_per_sector as u32,
            sectors_per_cluster: self.sectors_per_cluster as u32,
            reserved_sectors: self.reserved_sector_count as u32,
            num_fats: self.num_fats as u32,
            fat_size_sectors: self.fat_size_16 as u32,
            root_entry_count: self.root_entry_count as u32,
            total_sectors: self.total_sectors(),
            fat_type,
            max_cluster: max_cluster as u16,
        })
    }
}
