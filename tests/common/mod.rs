// Images FAT16 construites en mémoire pour les tests d'intégration
#![allow(dead_code)]

pub const CLUSTER_SIZE: u32 = 512;
const TOTAL_SECTORS: usize = 8192;
const RESERVED: usize = 1;
const FAT_SECTORS: usize = 32;
const NUM_FATS: usize = 2;
const ROOT_ENTRIES: usize = 512;

pub const FAT_OFFSET: usize = RESERVED * 512;
pub const ROOT_OFFSET: usize = (RESERVED + NUM_FATS * FAT_SECTORS) * 512;
pub const DATA_OFFSET: usize = ROOT_OFFSET + ROOT_ENTRIES * 32;

/// Volume FAT16: secteurs et clusters de 512 octets, deux FATs, 512 entrées racine
pub struct TestImage {
    pub data: Vec<u8>,
    root_used: usize,
}

impl TestImage {
    pub fn new_fat16() -> Self {
        let mut data = vec![0u8; TOTAL_SECTORS * 512];

        data[0..3].copy_from_slice(&[0xEB, 0x3C, 0x90]); // saut
        data[3..11].copy_from_slice(b"MSWIN4.1"); // OEM
        data[11..13].copy_from_slice(&512u16.to_le_bytes()); // octets par secteur
        data[13] = 1; // secteurs par cluster
        data[14..16].copy_from_slice(&(RESERVED as u16).to_le_bytes());
        data[16] = NUM_FATS as u8;
        data[17..19].copy_from_slice(&(ROOT_ENTRIES as u16).to_le_bytes());
        data[19..21].copy_from_slice(&(TOTAL_SECTORS as u16).to_le_bytes());
        data[21] = 0xF8; // media
        data[22..24].copy_from_slice(&(FAT_SECTORS as u16).to_le_bytes());
        data[38] = 0x29;
        data[54..62].copy_from_slice(b"FAT16   ");
        data[510] = 0x55;
        data[511] = 0xAA;

        let mut image = Self { data, root_used: 0 };
        image.set_fat(0, 0xFFF8);
        image.set_fat(1, 0xFFFF);
        image
    }

    pub fn set_fat(&mut self, cluster: u16, value: u16) {
        for copy in 0..NUM_FATS {
            let off = FAT_OFFSET + copy * FAT_SECTORS * 512 + cluster as usize * 2;
            self.data[off..off + 2].copy_from_slice(&value.to_le_bytes());
        }
    }

    pub fn fat(&self, copy: usize, cluster: u16) -> u16 {
        let off = FAT_OFFSET + copy * FAT_SECTORS * 512 + cluster as usize * 2;
        u16::from_le_bytes([self.data[off], self.data[off + 1]])
    }

    pub fn chain(&mut self, clusters: &[u16]) -> &mut Self {
        for pair in clusters.windows(2) {
            self.set_fat(pair[0], pair[1]);
        }
        if let Some(&last) = clusters.last() {
            self.set_fat(last, 0xFFFF);
        }
        self
    }

    fn entry(name: &[u8; 11], attr: u8, start: u16, size: u32) -> [u8; 32] {
        let mut raw = [0u8; 32];
        raw[..11].copy_from_slice(name);
        raw[11] = attr;
        raw[26..28].copy_from_slice(&start.to_le_bytes());
        raw[28..32].copy_from_slice(&size.to_le_bytes());
        raw
    }

    pub fn add_root(&mut self, name: &[u8; 11], attr: u8, start: u16, size: u32) -> &mut Self {
        let off = ROOT_OFFSET + self.root_used * 32;
        self.data[off..off + 32].copy_from_slice(&Self::entry(name, attr, start, size));
        self.root_used += 1;
        self
    }

    pub fn add_in_dir(&mut self, cluster: u16, index: usize, name: &[u8; 11], attr: u8, start: u16, size: u32) -> &mut Self {
        let off = DATA_OFFSET + (cluster as usize - 2) * 512 + index * 32;
        self.data[off..off + 32].copy_from_slice(&Self::entry(name, attr, start, size));
        self
    }

    pub fn root_record(&self, index: usize) -> &[u8] {
        let off = ROOT_OFFSET + index * 32;
        &self.data[off..off + 32]
    }
}

pub fn record_size(record: &[u8]) -> u32 {
    u32::from_le_bytes([record[28], record[29], record[30], record[31]])
}

pub fn record_start(record: &[u8]) -> u16 {
    u16::from_le_bytes([record[26], record[27]])
}
