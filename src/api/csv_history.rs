// ============================================================================
// Parsing des historiques CSV
// ============================================================================
// Les deux fournisseurs renvoient un CSV avec une ligne d'en-tête puis une
// ligne par séance :
// - Google : Date, Open, High, Low, Close, Volume           (6 champs, "2-Jan-06")
// - Yahoo  : Date, Open, High, Low, Close, Volume, AdjClose (7 champs, "2006-01-02")
//
// Une seule ligne avec le mauvais nombre de champs invalide toute la réponse.
// ============================================================================

use chrono::NaiveDate;

use crate::error::FetchError;
use crate::models::TradingSession;

/// Description du format CSV d'un fournisseur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CsvLayout {
    pub field_count: usize,
    pub date_format: &'static str,
}

pub const GOOGLE_LAYOUT: CsvLayout = CsvLayout {
    field_count: 6,
    date_format: "%d-%b-%y",
};

pub const YAHOO_LAYOUT: CsvLayout = CsvLayout {
    field_count: 7,
    date_format: "%Y-%m-%d",
};

/// Parse un historique CSV complet
///
/// L'ordre des lignes est conservé tel quel : c'est le coordinateur qui
/// normalise avant de calculer les variations. La colonne AdjClose est ignorée.
pub fn parse_history_csv(body: &str, layout: CsvLayout) -> Result<Vec<TradingSession>, FetchError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut sessions = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record?;

        if record.len() != layout.field_count {
            return Err(FetchError::Schema(format!(
                "record length should be {}, got {}",
                layout.field_count,
                record.len()
            )));
        }

        // Ligne d'en-tête
        if i == 0 {
            continue;
        }

        let field = |n: usize| record.get(n).unwrap_or_default();

        let date = NaiveDate::parse_from_str(field(0), layout.date_format)
            .map_err(|e| FetchError::Parse(format!("date {:?}: {}", field(0), e)))?;

        sessions.push(TradingSession::new(
            date,
            parse_float(field(1))?,
            parse_float(field(2))?,
            parse_float(field(3))?,
            parse_float(field(4))?,
            parse_volume(field(5))?,
        ));
    }

    Ok(sessions)
}

fn parse_float(value: &str) -> Result<f64, FetchError> {
    value
        .parse::<f64>()
        .map_err(|e| FetchError::Parse(format!("number {:?}: {}", value, e)))
}

fn parse_volume(value: &str) -> Result<u64, FetchError> {
    value
        .parse::<u64>()
        .map_err(|e| FetchError::Parse(format!("volume {:?}: {}", value, e)))
}
