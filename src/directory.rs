//! Codage des entrées de répertoire FAT12/16 (32 octets)

use alloc::string::String;
use core::fmt;

use arrayvec::ArrayVec;
use byteorder::{ByteOrder, LittleEndian};

use crate::geometry::DIR_ENTRY_SIZE;

pub type DirRecord = [u8; DIR_ENTRY_SIZE];

/// Premier octet d'une entrée jamais utilisée; marque aussi la fin du répertoire
pub const SLOT_EMPTY: u8 = 0x00;
/// Premier octet d'une entrée supprimée
pub const SLOT_DELETED: u8 = 0xE5;
/// Premier octet qui remplace un 0xE5 littéral
pub const SLOT_E5_ESCAPE: u8 = 0x05;
pub const DOT: u8 = 0x2E;

/// Extension écrite quand le nom n'en a pas
pub const DEFAULT_EXTENSION: &[u8; 3] = b"___";

const NAME_LEN: usize = 8;
const EXT_LEN: usize = 3;
const ATTR_OFFSET: usize = 11;
const START_CLUSTER_OFFSET: usize = 26;
const SIZE_OFFSET: usize = 28;

/// Attributs d'un fichier/dossier
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct FileAttributes(pub u8);

impl FileAttributes {
    pub const NORMAL: u8 = 0x00;
    pub const READ_ONLY: u8 = 0x01;
    pub const HIDDEN: u8 = 0x02;
    pub const SYSTEM: u8 = 0x04;
    pub const VOLUME_ID: u8 = 0x08;
    pub const DIRECTORY: u8 = 0x10;
    pub const ARCHIVE: u8 = 0x20;
    pub const LONG_NAME: u8 = 0x0F;

    pub fn is_directory(&self) -> bool {
        self.0 & Self::DIRECTORY != 0
    }

    pub fn is_long_name(&self) -> bool {
        self.0 & Self::LONG_NAME == Self::LONG_NAME
    }

    pub fn is_volume_id(&self) -> bool {
        self.0 & Self::VOLUME_ID != 0
    }

    pub fn is_hidden(&self) -> bool {
        self.0 & Self::HIDDEN != 0
    }

    pub fn is_read_only(&self) -> bool {
        self.0 & Self::READ_ONLY != 0
    }

    pub fn is_system(&self) -> bool {
        self.0 & Self::SYSTEM != 0
    }

    pub fn is_archive(&self) -> bool {
        self.0 & Self::ARCHIVE != 0
    }
}

impl fmt::Debug for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Attributes(0x{:02x})", self.0)
    }
}

/// Colonne `rhsa`, un espace pour chaque attribut absent
impl fmt::Display for FileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let flag = |set: bool, c: char| if set { c } else { ' ' };
        write!(
            f,
            "{}{}{}{}",
            flag(self.is_read_only(), 'r'),
            flag(self.is_hidden(), 'h'),
            flag(self.is_system(), 's'),
            flag(self.is_archive(), 'a'),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
    VolumeLabel,
}

/// Entrée utilisée, décodée
#[derive(Clone, PartialEq, Eq)]
pub struct DirEntry {
    name: ArrayVec<u8, NAME_LEN>,
    extension: ArrayVec<u8, EXT_LEN>,
    attributes: FileAttributes,
    start_cluster: u16,
    file_size: u32,
}

impl DirEntry {
    pub fn name(&self) -> &[u8] {
        &self.name
    }

    pub fn extension(&self) -> &[u8] {
        &self.extension
    }

    pub fn attributes(&self) -> FileAttributes {
        self.attributes
    }

    pub fn start_cluster(&self) -> u16 {
        self.start_cluster
    }

    pub fn file_size(&self) -> u32 {
        self.file_size
    }

    pub fn kind(&self) -> EntryKind {
        if self.attributes.is_volume_id() {
            EntryKind::VolumeLabel
        } else if self.attributes.is_directory() {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }

    /// `NAME.EXT`, ou `NAME` sans extension
    pub fn short_name(&self) -> String {
        let name = String::from_utf8_lossy(&self.name);
        let ext = String::from_utf8_lossy(&self.extension);
        if ext.is_empty() {
            name.into_owned()
        } else {
            alloc::format!("{}.{}", name, ext)
        }
    }
}

impl fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DirEntry")
            .field("name", &self.short_name())
            .field("attributes", &self.attributes)
            .field("cluster", &self.start_cluster)
            .field("size", &self.file_size)
            .finish()
    }
}

/// Nature d'une entrée de répertoire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Empty,
    Deleted,
    Dot,
    LongName,
    Entry(DirEntry),
}

/// Copie de `field` sans les espaces de remplissage finaux
fn strip_padding<const N: usize>(field: &[u8]) -> ArrayVec<u8, N> {
    let end = field.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    field[..end].iter().copied().collect()
}

pub fn decode(record: &DirRecord) -> Slot {
    match record[0] {
        SLOT_EMPTY => return Slot::Empty,
        SLOT_DELETED => return Slot::Deleted,
        DOT => return Slot::Dot,
        _ => {}
    }

    let attributes = FileAttributes(record[ATTR_OFFSET]);
    if attributes.is_long_name() {
        return Slot::LongName;
    }

    let mut name = strip_padding::<NAME_LEN>(&record[..NAME_LEN]);
    if name.first() == Some(&SLOT_E5_ESCAPE) {
        name[0] = SLOT_DELETED;
    }

    Slot::Entry(DirEntry {
        name,
        extension: strip_padding::<EXT_LEN>(&record[NAME_LEN..NAME_LEN + EXT_LEN]),
        attributes,
        start_cluster: LittleEndian::read_u16(&record[START_CLUSTER_OFFSET..]),
        file_size: LittleEndian::read_u32(&record[SIZE_OFFSET..]),
    })
}

/// Construit l'entrée d'un fichier normal pour `filename`
///
/// Avec perte: le chemin est retiré, le reste passe en majuscules et est
/// coupé en 8.3. Un nom sans extension reçoit [`DEFAULT_EXTENSION`].
pub fn encode(filename: &str, start_cluster: u16, size: u32) -> DirRecord {
    let mut record = [0u8; DIR_ENTRY_SIZE];

    let base_name = filename
        .rfind(['/', '\\'])
        .map_or(filename, |sep| &filename[sep + 1..]);

    let (stem, ext) = match base_name.rfind('.') {
        Some(dot) => (&base_name[..dot], Some(&base_name[dot + 1..])),
        None => (base_name, None),
    };

    let mut name = [b' '; NAME_LEN];
    for (dst, src) in name.iter_mut().zip(stem.bytes()) {
        *dst = src.to_ascii_uppercase();
    }

    let mut extension = *DEFAULT_EXTENSION;
    match ext {
        Some(ext) => {
            extension = [b' '; EXT_LEN];
            for (dst, src) in extension.iter_mut().zip(ext.bytes()) {
                *dst = src.to_ascii_uppercase();
            }
        }
        None => log::warn!("no extension given for {:?}, defaulting to .___", base_name),
    }

    // un 0xE5 en tête serait relu comme une entrée supprimée
    if name[0] == SLOT_DELETED {
        name[0] = SLOT_E5_ESCAPE;
    }

    record[..NAME_LEN].copy_from_slice(&name);
    record[NAME_LEN..NAME_LEN + EXT_LEN].copy_from_slice(&extension);
    record[ATTR_OFFSET] = FileAttributes::NORMAL;
    set_start_cluster(&mut record, start_cluster);
    set_file_size(&mut record, size);
    record
}

pub fn set_start_cluster(record: &mut DirRecord, cluster: u16) {
    LittleEndian::write_u16(&mut record[START_CLUSTER_OFFSET..START_CLUSTER_OFFSET + 2], cluster);
}

pub fn set_file_size(record: &mut DirRecord, size: u32) {
    LittleEndian::write_u32(&mut record[SIZE_OFFSET..SIZE_OFFSET + 4], size);
}
