// ============================================================================
// Structure : TradingSession
// ============================================================================
// Une séance de bourse (une journée) pour un symbole
//
// CONCEPTS RUST :
// 1. NaiveDate : date calendaire sans heure ni fuseau (chrono)
// 2. Copy : la structure est petite, on la copie au lieu de la cloner
// 3. Champs dérivés : change / percent_change calculés une seule fois
// ============================================================================

use std::cmp::Reverse;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Provenance d'une séance
///
/// CONCEPT : l'historique l'emporte toujours sur une cotation live
/// - History : barre journalière réglée, issue d'un historique CSV
/// - Live : séance synthétique construite depuis une cotation en cours,
///   avec l'horodatage de la cotation (la plus récente l'emporte)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOrigin {
    History,
    Live(DateTime<Utc>),
}

/// Statistiques d'une séance de bourse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradingSession {
    /// Jour de la séance (heure de New York)
    pub date: NaiveDate,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,

    /// Variation absolue par rapport à la clôture précédente
    pub change: f64,

    /// Variation relative, en fraction (0.05 = +5%)
    pub percent_change: f64,

    pub origin: SessionOrigin,
}

impl TradingSession {
    /// Crée une séance historique, sans variation calculée
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
            change: 0.0,
            percent_change: 0.0,
            origin: SessionOrigin::History,
        }
    }

    /// Vérifie si la séance vient d'une cotation live
    pub fn is_live(&self) -> bool {
        matches!(self.origin, SessionOrigin::Live(_))
    }

    /// Horodatage de la cotation pour une séance live
    pub fn quoted_at(&self) -> Option<DateTime<Utc>> {
        match self.origin {
            SessionOrigin::Live(timestamp) => Some(timestamp),
            SessionOrigin::History => None,
        }
    }
}

/// Trie les séances de la plus récente à la plus ancienne
///
/// Les backends renvoient l'un ou l'autre ordre, on normalise avant
/// de calculer les variations.
pub fn sort_newest_first(sessions: &mut [TradingSession]) {
    sessions.sort_by_key(|s| Reverse(s.date));
}

/// Calcule change / percent_change sur une séquence triée (plus récente en tête)
///
/// CONCEPT : fenêtre de récupération
/// - change[i] = close[i] - close[i+1]
/// - percent_change[i] = change[i] / close[i+1]
/// - La séance la plus ancienne n'a pas de référence dans la fenêtre : 0 / 0
pub fn derive_changes(sessions: &mut [TradingSession]) {
    let len = sessions.len();
    for i in 0..len {
        if i + 1 < len {
            let previous_close = sessions[i + 1].close;
            let change = sessions[i].close - previous_close;
            sessions[i].change = change;
            sessions[i].percent_change = if previous_close != 0.0 {
                change / previous_close
            } else {
                0.0
            };
        } else {
            sessions[i].change = 0.0;
            sessions[i].percent_change = 0.0;
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
