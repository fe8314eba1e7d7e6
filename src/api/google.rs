// ============================================================================
// API Client : Google Finance
// ============================================================================
// Deux endpoints :
// - /finance/historical : historique journalier en CSV (6 colonnes)
// - /finance/info : cotations live de plusieurs symboles en un seul appel,
//   JSON préfixé par "//"
// ============================================================================

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::api::csv_history::{parse_history_csv, GOOGLE_LAYOUT};
use crate::api::{get_text, LiveQuoteSource, SessionSource};
use crate::error::FetchError;
use crate::models::{LiveQuote, TradingSession};

const HISTORY_URL: &str = "http://www.google.com/finance/historical";
const INFO_URL: &str = "http://www.google.com/finance/info";

/// Historiques journaliers depuis Google Finance
#[derive(Debug, Clone)]
pub struct GoogleHistory {
    client: reqwest::Client,
}

impl GoogleHistory {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn build_history_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> Result<reqwest::Url, FetchError> {
    let format_date = |date: NaiveDate| date.format("%b %d, %Y").to_string();
    reqwest::Url::parse_with_params(
        HISTORY_URL,
        &[
            ("q", symbol.to_string()),
            ("startdate", format_date(start)),
            ("enddate", format_date(end)),
            ("output", "csv".to_string()),
        ],
    )
    .map_err(|e| FetchError::Transport(format!("invalid url: {}", e)))
}

#[async_trait]
impl SessionSource for GoogleHistory {
    #[instrument(skip(self), name = "google_history")]
    async fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<TradingSession>, FetchError> {
        let url = build_history_url(symbol, start, end)?;
        let body = get_text(&self.client, url).await?;
        let sessions = parse_history_csv(&body, GOOGLE_LAYOUT)?;
        info!(sessions = sessions.len(), "Fetched Google history");
        Ok(sessions)
    }
}

// ============================================================================
// Cotations live
// ============================================================================

/// Entrée brute de /finance/info (toutes les valeurs sont des strings)
#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(rename = "t", alias = "T", default)]
    ticker: String,
    #[serde(rename = "l", alias = "L", default)]
    price: String,
    #[serde(rename = "c", alias = "C", default)]
    change: String,
    #[serde(rename = "cp", alias = "Cp", default)]
    percent_change: String,
    #[serde(rename = "lt_dts", alias = "Lt_dts", default)]
    timestamp: String,
}

/// Cotations live depuis Google Finance
#[derive(Debug, Clone)]
pub struct GoogleLiveQuotes {
    client: reqwest::Client,
}

impl GoogleLiveQuotes {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn build_info_url(symbols: &[String]) -> Result<reqwest::Url, FetchError> {
    let query = symbols.join(",");
    reqwest::Url::parse_with_params(INFO_URL, &[("client", "ig"), ("q", query.as_str())])
        .map_err(|e| FetchError::Transport(format!("invalid url: {}", e)))
}

#[async_trait]
impl LiveQuoteSource for GoogleLiveQuotes {
    #[instrument(skip(self), name = "google_live")]
    async fn fetch(&self, symbols: &[String]) -> Result<Vec<LiveQuote>, FetchError> {
        let url = build_info_url(symbols)?;
        let body = get_text(&self.client, url).await?;
        let quotes = parse_live_quotes(&body)?;
        info!(quotes = quotes.len(), "Fetched live quotes");
        Ok(quotes)
    }
}

/// Parse la réponse de /finance/info
///
/// - Le corps commence par "//" avant le tableau JSON
/// - change / percent change vides (hors séance) valent 0
/// - percent change est fourni en pourcentage, converti en fraction
/// - Une enveloppe vide est une erreur
pub fn parse_live_quotes(body: &str) -> Result<Vec<LiveQuote>, FetchError> {
    let json = body
        .trim_start()
        .strip_prefix("//")
        .ok_or_else(|| FetchError::Schema("missing \"//\" prefix".to_string()))?;

    let raw: Vec<RawQuote> =
        serde_json::from_str(json.trim()).map_err(|e| FetchError::Schema(e.to_string()))?;

    if raw.is_empty() {
        return Err(FetchError::Schema("expected at least one entry".to_string()));
    }

    raw.into_iter()
        .map(|entry| {
            debug!(ticker = %entry.ticker, "Parsing live quote");
            let timestamp = NaiveDateTime::parse_from_str(&entry.timestamp, "%Y-%m-%dT%H:%M:%SZ")
                .map_err(|e| {
                    FetchError::Parse(format!("{} timestamp {:?}: {}", entry.ticker, entry.timestamp, e))
                })?
                .and_utc();

            Ok(LiveQuote {
                price: parse_number(&entry.ticker, "price", &entry.price)?,
                change: parse_optional(&entry.ticker, "change", &entry.change)?,
                percent_change: parse_optional(&entry.ticker, "percent change", &entry.percent_change)?
                    / 100.0,
                timestamp,
                symbol: entry.ticker,
            })
        })
        .collect()
}

/// Les indices utilisent des séparateurs de milliers ("16,384.58")
fn parse_number(ticker: &str, name: &str, value: &str) -> Result<f64, FetchError> {
    value
        .trim()
        .replace(',', "")
        .parse::<f64>()
        .map_err(|e| FetchError::Parse(format!("{} {} {:?}: {}", ticker, name, value, e)))
}

fn parse_optional(ticker: &str, name: &str, value: &str) -> Result<f64, FetchError> {
    if value.trim().is_empty() {
        Ok(0.0)
    } else {
        parse_number(ticker, name, value)
    }
}
