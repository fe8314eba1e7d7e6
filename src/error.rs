// ============================================================================
// Erreurs de la librairie
// ============================================================================
// Deux familles d'erreurs :
// - FetchError : récupération des données de marché (réseau, format, parsing)
// - PersistenceError : lecture / écriture du fichier de config
//
// CONCEPT RUST : thiserror
// - #[derive(Error)] génère l'implémentation de std::error::Error
// - #[error("...")] génère Display
// - Le binaire (main.rs) continue d'utiliser anyhow pour le contexte
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;

/// Erreur lors de la récupération de données de marché
#[derive(Debug, Error)]
pub enum FetchError {
    /// Échec réseau ou statut HTTP non 2xx
    #[error("transport error: {0}")]
    Transport(String),

    /// Réponse de forme inattendue (nombre de colonnes, enveloppe vide, etc.)
    #[error("schema error: {0}")]
    Schema(String),

    /// Champ date / nombre / timestamp illisible
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<csv::Error> for FetchError {
    fn from(err: csv::Error) -> Self {
        FetchError::Parse(format!("csv: {}", err))
    }
}

/// Erreur lors de la lecture ou de l'écriture de la config
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("no home directory found")]
    NoHomeDir,

    #[error("config I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config at {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
