// ============================================================================
// Module : api
// ============================================================================
// Sources de données de marché :
// - SessionSource : historique journalier d'un symbole
// - LiveQuoteSource : cotations live de plusieurs symboles en un appel
//
// Le coordinateur ne dépend que de ces traits. Le choix du backend se fait
// une seule fois au démarrage (HistoryBackend), puis il est injecté.
// ============================================================================

pub mod csv_history;  // Parsing CSV commun
pub mod google;       // Google Finance (historique + live)
pub mod yahoo;        // Yahoo Finance (historique)

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, error, warn};

use crate::error::FetchError;
use crate::models::{LiveQuote, TradingSession};

pub use google::{GoogleHistory, GoogleLiveQuotes};
pub use yahoo::YahooHistory;

/// Historique journalier d'un symbole sur une plage de dates
#[async_trait]
pub trait SessionSource: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, FetchError>;
}

/// Cotations live de plusieurs symboles, un seul appel réseau
#[async_trait]
pub trait LiveQuoteSource: Send + Sync {
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<LiveQuote>, FetchError>;
}

/// Crée le client HTTP partagé par les backends
///
/// User-Agent de navigateur pour éviter les blocages côté fournisseur.
pub fn http_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .timeout(std::time::Duration::from_secs(30))
        .build()
        .map_err(FetchError::from)
}

/// GET qui renvoie le corps en texte, erreur si statut non 2xx
pub(crate) async fn get_text(client: &reqwest::Client, url: reqwest::Url) -> Result<String, FetchError> {
    debug!(url = %url, "GET");
    let response = client.get(url).send().await?;

    let status = response.status();
    if !status.is_success() {
        error!(status = %status, "Provider returned error status");
        return Err(FetchError::Transport(format!("HTTP {}", status)));
    }

    Ok(response.text().await?)
}

// ============================================================================
// Sélection du backend d'historique
// ============================================================================

/// Backend choisi en ligne de commande
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SourceKind {
    Google,
    Yahoo,
    /// Google puis Yahoo si Google échoue
    Fallback,
}

/// Ensemble fermé des backends d'historique
///
/// CONCEPT RUST : enum plutôt que dispatch par string
/// - Les variantes sont connues à la compilation
/// - Fallback essaie chaque backend dans l'ordre
#[derive(Debug, Clone)]
pub enum HistoryBackend {
    Google(GoogleHistory),
    Yahoo(YahooHistory),
    Fallback(Vec<HistoryBackend>),
}

impl HistoryBackend {
    pub fn from_kind(kind: SourceKind, client: reqwest::Client) -> Self {
        match kind {
            SourceKind::Google => HistoryBackend::Google(GoogleHistory::new(client)),
            SourceKind::Yahoo => HistoryBackend::Yahoo(YahooHistory::new(client)),
            SourceKind::Fallback => HistoryBackend::Fallback(vec![
                HistoryBackend::Google(GoogleHistory::new(client.clone())),
                HistoryBackend::Yahoo(YahooHistory::new(client)),
            ]),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            HistoryBackend::Google(_) => "google",
            HistoryBackend::Yahoo(_) => "yahoo",
            HistoryBackend::Fallback(_) => "fallback",
        }
    }
}

#[async_trait]
impl SessionSource for HistoryBackend {
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, FetchError> {
        match self {
            HistoryBackend::Google(google) => google.fetch(symbol, start, end).await,
            HistoryBackend::Yahoo(yahoo) => yahoo.fetch(symbol, start, end).await,
            HistoryBackend::Fallback(backends) => {
                for backend in backends {
                    match backend.fetch(symbol, start, end).await {
                        Ok(sessions) => return Ok(sessions),
                        Err(e) => {
                            warn!(ticker = %symbol, backend = backend.name(), error = %e, "Backend failed, trying next");
                        }
                    }
                }
                Err(FetchError::Transport(format!(
                    "all {} backends failed",
                    backends.len()
                )))
            }
        }
    }
}
