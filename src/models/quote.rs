// ============================================================================
// Structure : LiveQuote
// ============================================================================
// Cotation quasi temps réel d'un symbole (dernier échange connu)
//
// Une LiveQuote n'est jamais persistée : elle est convertie en séance
// synthétique du jour avant la fusion dans le snapshot.
// ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use serde::{Deserialize, Serialize};

use crate::models::{SessionOrigin, TradingSession};

/// Symboles des indices affichés dans le header, avec leur libellé
pub const INDEX_SYMBOLS: [(&str, &str); 3] = [
    (".DJI", "DOW"),
    (".INX", "S&P"),
    (".IXIC", "NASDAQ"),
];

/// Cotation live d'un symbole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveQuote {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub change: f64,
    /// Variation en fraction (normalisée à l'ingestion)
    pub percent_change: f64,
}

impl LiveQuote {
    /// Jour de bourse de la cotation (New York, tronqué à minuit)
    pub fn session_date(&self) -> NaiveDate {
        self.timestamp.with_timezone(&New_York).date_naive()
    }

    /// Convertit la cotation en séance synthétique du jour
    ///
    /// Le volume n'est pas connu en live : 0.
    pub fn to_session(&self) -> TradingSession {
        TradingSession {
            date: self.session_date(),
            open: self.price,
            high: self.price,
            low: self.price,
            close: self.price,
            volume: 0,
            change: self.change,
            percent_change: self.percent_change,
            origin: SessionOrigin::Live(self.timestamp),
        }
    }

    /// Libellé d'affichage : nom de l'indice si connu, sinon le symbole
    pub fn label(&self) -> &str {
        INDEX_SYMBOLS
            .iter()
            .find(|(symbol, _)| *symbol == self.symbol)
            .map(|(_, label)| *label)
            .unwrap_or(self.symbol.as_str())
    }
}

/// Liste des symboles d'indices sous forme owned
pub fn index_symbols() -> Vec<String> {
    INDEX_SYMBOLS.iter().map(|(s, _)| s.to_string()).collect()
}
