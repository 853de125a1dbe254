//! Anomalies relevées pendant une passe

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Une incohérence, déjà réparée sauf mention contraire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FindingKind {
    /// L'entrée ou un lien pointe hors de la zone de données
    ClusterOutOfRange { cluster: u16 },
    /// La chaîne revient sur `cluster`; coupée avant la boucle
    ChainCycle { cluster: u16 },
    /// La chaîne atteint un cluster défectueux; coupée avant
    BadCluster { cluster: u16 },
    /// La chaîne atteint un cluster libre; coupée avant
    FreeInChain { cluster: u16 },
    /// La chaîne atteint `cluster`, qui appartient déjà à une autre entrée
    CrossLinked { cluster: u16 },
    /// La taille déclarée ne correspond pas à la chaîne; `clusters` est la
    /// longueur de la chaîne avant réparation
    SizeMismatch { declared: u32, clusters: usize, repair: SizeRepair },
    /// Chaîne non référencée, enregistrée comme nouvelle entrée de la racine
    OrphanCluster { start: u16, clusters: usize, name: String },
    /// Une chaîne orpheline n'a pas pu être enregistrée. Non réparé.
    DirectoryFull { start: u16 },
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ClusterOutOfRange { cluster } => {
                write!(f, "cluster {} out of range, chain cut", cluster)
            }
            Self::ChainCycle { cluster } => {
                write!(f, "chain loops back to cluster {}, chain cut", cluster)
            }
            Self::BadCluster { cluster } => {
                write!(f, "chain reaches bad cluster {}, chain cut", cluster)
            }
            Self::FreeInChain { cluster } => {
                write!(f, "chain reaches free cluster {}, chain cut", cluster)
            }
            Self::CrossLinked { cluster } => {
                write!(f, "cross-linked at cluster {}, chain cut", cluster)
            }
            Self::SizeMismatch { declared, clusters, repair: SizeRepair::ChainTruncated { freed } } => {
                write!(
                    f,
                    "size {} needs fewer than the {} cluster(s) allocated, {} freed",
                    declared, clusters, freed
                )
            }
            Self::SizeMismatch { declared, clusters, repair: SizeRepair::SizeCorrected { size } } => {
                write!(
                    f,
                    "size {} exceeds the {} cluster(s) allocated, size set to {}",
                    declared, clusters, size
                )
            }
            Self::OrphanCluster { start, clusters, name } => write!(
                f,
                "{} lost cluster(s) from {} recovered as {}",
                clusters, start, name
            ),
            Self::DirectoryFull { start } => write!(
                f,
                "lost chain at cluster {} left in place: root directory is full",
                start
            ),
        }
    }
}

/// Réparation d'un désaccord taille/chaîne
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeRepair {
    /// Chaîne coupée à la taille déclarée, `freed` clusters libérés
    ChainTruncated { freed: usize },
    /// Taille ramenée à ce que contient la chaîne
    SizeCorrected { size: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Chemin de l'entrée depuis la racine, séparé par `/`
    pub path: String,
    pub kind: FindingKind,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.kind)
    }
}

/// Bilan d'une passe
#[derive(Debug, Default, Clone)]
pub struct Report {
    pub findings: Vec<Finding>,
    pub files_checked: usize,
    pub directories_checked: usize,
    pub clusters_freed: usize,
    pub files_recovered: usize,
    /// Nombre d'écritures faites dans l'image
    pub repairs: usize,
}

impl Report {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn is_modified(&self) -> bool {
        self.repairs > 0
    }

    pub fn record(&mut self, path: &str, kind: FindingKind) {
        let finding = Finding { path: path.into(), kind };
        match finding.kind {
            FindingKind::DirectoryFull { .. } => log::warn!("{}", finding),
            _ => log::info!("{}", finding),
        }
        self.findings.push(finding);
    }

    /// Anomalies d'un chemin
    pub fn findings_for<'r>(&'r self, path: &'r str) -> impl Iterator<Item = &'r FindingKind> + 'r {
        self.findings
            .iter()
            .filter(move |f| f.path == path)
            .map(|f| &f.kind)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} files and {} directories checked, {} findings, {} clusters freed, {} files recovered",
            self.files_checked,
            self.directories_checked,
            self.findings.len(),
            self.clusters_freed,
            self.files_recovered
        )
    }
}
