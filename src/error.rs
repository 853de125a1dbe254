use thiserror::Error;

pub type Result<T> = core::result::Result<T, FsckError>;

/// Erreurs qui arrêtent une opération
///
/// Les incohérences d'une image valide ne sont pas des erreurs: la
/// vérification les répare et produit un [`crate::Finding`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsckError {
    #[error("invalid geometry: {0}")]
    InvalidGeometry(&'static str),

    #[error("image too small: need {needed} bytes, have {actual}")]
    ImageTooSmall { needed: usize, actual: usize },

    #[error("cluster {cluster} is outside the data region")]
    ClusterOutOfRange { cluster: u16 },

    #[error("cluster chain loops back to cluster {cluster}")]
    ChainCycle { cluster: u16 },

    #[error("root directory has no free slot")]
    DirectoryFull,
}
