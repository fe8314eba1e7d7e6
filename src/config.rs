// ============================================================================
// ConfigStore : persistance de la liste de symboles
// ============================================================================
// Format du fichier (~/.ponzi par défaut) :
//   { "Stocks": [ { "Symbol": "SPY" }, { "Symbol": "MO" } ] }
//
// CONCEPTS RUST :
// 1. Serde rename : noms JSON capitalisés, champs Rust en snake_case
// 2. Mutex<()> : verrou dédié au fichier, indépendant de celui du board
// 3. Fichier absent ou vide = liste vide (premier lancement)
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PersistenceError;

/// Nom du fichier de config dans le home de l'utilisateur
pub const CONFIG_FILE_NAME: &str = ".ponzi";

#[derive(Debug, Default, Serialize, Deserialize)]
struct Config {
    #[serde(rename = "Stocks", alias = "stocks", default)]
    stocks: Vec<ConfigStock>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigStock {
    #[serde(rename = "Symbol", alias = "symbol")]
    symbol: String,
}

/// Lecture / écriture de la liste de symboles
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Chemin par défaut : ~/.ponzi
    pub fn default_path() -> Result<PathBuf, PersistenceError> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or(PersistenceError::NoHomeDir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Charge la liste ordonnée des symboles
    pub fn load(&self) -> Result<Vec<String>, PersistenceError> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No config file, starting empty");
                return Ok(Vec::new());
            }
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let config: Config =
            serde_json::from_str(&content).map_err(|source| PersistenceError::Json {
                path: self.path.clone(),
                source,
            })?;

        let symbols: Vec<String> = config.stocks.into_iter().map(|s| s.symbol).collect();
        debug!(count = symbols.len(), "Config loaded");
        Ok(symbols)
    }

    /// Réécrit entièrement le fichier avec la liste donnée
    pub fn save(&self, symbols: &[String]) -> Result<(), PersistenceError> {
        let config = Config {
            stocks: symbols
                .iter()
                .map(|symbol| ConfigStock {
                    symbol: symbol.clone(),
                })
                .collect(),
        };

        let json = serde_json::to_string_pretty(&config).map_err(|source| PersistenceError::Json {
            path: self.path.clone(),
            source,
        })?;

        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        fs::write(&self.path, json).map_err(|source| PersistenceError::Io {
            path: self.path.clone(),
            source,
        })?;

        debug!(count = symbols.len(), path = %self.path.display(), "Config saved");
        Ok(())
    }
}
