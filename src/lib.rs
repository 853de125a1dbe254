#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod error;
pub mod boot_sector;
pub mod geometry;
pub mod fat_table;
pub mod directory;
pub mod filesystem;
pub mod walker;
pub mod report;
pub mod checker;
pub mod listing;

#[cfg(test)]
mod test_image;

pub use error::{FsckError, Result};
pub use boot_sector::BootSector;
pub use geometry::{FatType, Geometry};
pub use fat_table::{Chain, ChainEnd, ClusterLink, FatTable};
pub use directory::{DirEntry, EntryKind, FileAttributes, Slot};
pub use filesystem::{DirLocation, Volume};
pub use walker::{DirSlot, Visit, walk};
pub use report::{Finding, FindingKind, Report, SizeRepair};
pub use checker::{Options, check};
pub use listing::{ListingLine, list_tree};
