// ============================================================================
// API Client : Yahoo Finance
// ============================================================================
// Historique journalier via l'endpoint CSV ichart (7 colonnes, AdjClose
// ignorée pour rester homogène avec Google).
//
// CONCEPT : paramètres de date éclatés
// - a/b/c : mois (0-indexé), jour, année de début
// - d/e/f : mois (0-indexé), jour, année de fin
// ============================================================================

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use tracing::{info, instrument};

use crate::api::csv_history::{parse_history_csv, YAHOO_LAYOUT};
use crate::api::{get_text, SessionSource};
use crate::error::FetchError;
use crate::models::TradingSession;

const TABLE_URL: &str = "http://ichart.yahoo.com/table.csv";

/// Historiques journaliers depuis Yahoo Finance
#[derive(Debug, Clone)]
pub struct YahooHistory {
    client: reqwest::Client,
}

impl YahooHistory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Construit l'URL de l'endpoint CSV
fn build_yahoo_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<reqwest::Url, FetchError> {
    let params = [
        ("s", symbol.to_string()),
        ("a", start.month0().to_string()),
        ("b", start.day().to_string()),
        ("c", start.year().to_string()),
        ("d", end.month0().to_string()),
        ("e", end.day().to_string()),
        ("f", end.year().to_string()),
        ("g", "d".to_string()),
        ("ignore", ".csv".to_string()),
    ];
    reqwest::Url::parse_with_params(TABLE_URL, &params)
        .map_err(|e| FetchError::Transport(format!("invalid url: {}", e)))
}

#[async_trait]
impl SessionSource for YahooHistory {
    #[instrument(skip(self), name = "yahoo_history")]
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, FetchError> {
        let url = build_yahoo_url(symbol, start, end)?;
        let body = get_text(&self.client, url).await?;
        let sessions = parse_history_csv(&body, YAHOO_LAYOUT)?;
        info!(sessions = sessions.len(), "Fetched Yahoo history");
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_yahoo_url() {
        let start = NaiveDate::from_ymd_opt(2015, 1, 5).unwrap();
        let end = NaiveDate::from_ymd_opt(2015, 9, 15).unwrap();
        let url = build_yahoo_url("AAPL", start, end).unwrap().to_string();
        assert!(url.contains("yahoo.com"));
        assert!(url.contains("s=AAPL"));
        // Mois 0-indexés
        assert!(url.contains("a=0"));
        assert!(url.contains("d=8"));
        assert!(url.contains("f=2015"));
        assert!(url.contains("g=d"));
    }
}
