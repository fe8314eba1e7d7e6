// ============================================================================
// Structure : Snapshot
// ============================================================================
// Vue cohérente des données de marché à un instant donné :
// - refresh_time : fin du dernier cycle commité
// - dates : ensemble trié de toutes les dates connues
// - sessions : symbole → (date → séance)
// - index_quotes : cotations des indices pour le header
//
// CONCEPTS RUST :
// 1. BTreeSet / BTreeMap : collections triées (ordre des dates gratuit)
// 2. Entry API : insertion ou mise à jour sans double lookup
// 3. Fusion idempotente : appliquer deux fois le même cycle ne change rien
// ============================================================================

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::models::{LiveQuote, TradingSession};

/// Résultats bruts d'un cycle, prêts à être fusionnés
///
/// Construit hors du verrou par le coordinateur ; seule la fusion
/// est faite sous verrou exclusif.
#[derive(Debug, Clone)]
pub struct CycleData {
    pub finished_at: DateTime<Utc>,

    /// Historiques réussis (variations déjà calculées)
    pub histories: Vec<(String, Vec<TradingSession>)>,

    /// Cotations live des symboles suivis (vide si l'appel a échoué)
    pub live_quotes: Vec<LiveQuote>,

    /// None si la jambe indices n'a pas été lancée ou a échoué
    pub index_quotes: Option<Vec<LiveQuote>>,
}

/// Statistiques d'une fusion, pour les logs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub new_dates: usize,
    pub merged_sessions: usize,
    pub skipped_live: usize,
}

/// Instantané des données du board
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    refresh_time: Option<DateTime<Utc>>,
    dates: BTreeSet<NaiveDate>,
    sessions: HashMap<String, BTreeMap<NaiveDate, TradingSession>>,
    index_quotes: Vec<LiveQuote>,
}

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_time(&self) -> Option<DateTime<Utc>> {
        self.refresh_time
    }

    /// Toutes les dates connues, en ordre croissant
    pub fn dates(&self) -> &BTreeSet<NaiveDate> {
        &self.dates
    }

    /// Les `n` dates les plus récentes, en ordre croissant
    pub fn recent_dates(&self, n: usize) -> Vec<NaiveDate> {
        let skip = self.dates.len().saturating_sub(n);
        self.dates.iter().skip(skip).copied().collect()
    }

    pub fn session(&self, symbol: &str, date: NaiveDate) -> Option<&TradingSession> {
        self.sessions.get(symbol)?.get(&date)
    }

    pub fn sessions_for(&self, symbol: &str) -> Option<&BTreeMap<NaiveDate, TradingSession>> {
        self.sessions.get(symbol)
    }

    pub fn index_quotes(&self) -> &[LiveQuote] {
        &self.index_quotes
    }

    /// Fusionne les résultats d'un cycle
    ///
    /// Règles :
    /// - les dates sont une union (jamais de disparition)
    /// - les séances historiques remplacent l'entrée existante de même date
    /// - une séance live n'est insérée que si la date n'a pas de séance
    ///   historique ; entre deux lives, la cotation la plus récente l'emporte
    /// - les indices ne sont remplacés que si leur jambe a réussi
    /// - refresh_time ne recule jamais (les cycles peuvent se chevaucher)
    pub fn apply(&mut self, data: CycleData) -> MergeStats {
        let mut stats = MergeStats::default();
        self.refresh_time = Some(match self.refresh_time {
            Some(current) => current.max(data.finished_at),
            None => data.finished_at,
        });

        for (symbol, sessions) in data.histories {
            let entries = self.sessions.entry(symbol).or_default();
            for session in sessions {
                if self.dates.insert(session.date) {
                    stats.new_dates += 1;
                }
                entries.insert(session.date, session);
                stats.merged_sessions += 1;
            }
        }

        for quote in data.live_quotes {
            let session = quote.to_session();
            let entries = self.sessions.entry(quote.symbol).or_default();

            if let Some(existing) = entries.get(&session.date) {
                match existing.quoted_at() {
                    None => {
                        debug!(date = %session.date, "Live quote skipped, history already present");
                        stats.skipped_live += 1;
                        continue;
                    }
                    Some(stored) if stored > quote.timestamp => {
                        debug!(date = %session.date, "Live quote skipped, newer quote already present");
                        stats.skipped_live += 1;
                        continue;
                    }
                    Some(_) => {}
                }
            }

            if self.dates.insert(session.date) {
                stats.new_dates += 1;
            }
            entries.insert(session.date, session);
            stats.merged_sessions += 1;
        }

        if let Some(index_quotes) = data.index_quotes {
            self.index_quotes = index_quotes;
        }

        stats
    }

    /// Oublie les séances des symboles qui ne sont plus suivis
    ///
    /// L'ensemble des dates n'est pas touché. Retourne le nombre de
    /// symboles retirés.
    pub fn retain_symbols(&mut self, symbols: &[String]) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|symbol, _| symbols.contains(symbol));
        before - self.sessions.len()
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 9, d).unwrap()
    }

    fn history(d: u32, close: f64) -> TradingSession {
        TradingSession::new(day(d), close, close, close, close, 500)
    }

    fn live(symbol: &str, d: u32, price: f64) -> LiveQuote {
        LiveQuote {
            symbol: symbol.to_string(),
            timestamp: Utc.with_ymd_and_hms(2015, 9, d, 17, 0, 0).unwrap(),
            price,
            change: 0.5,
            percent_change: 0.01,
        }
    }

    fn cycle(
        histories: Vec<(&str, Vec<TradingSession>)>,
        live_quotes: Vec<LiveQuote>,
        index_quotes: Option<Vec<LiveQuote>>,
    ) -> CycleData {
        CycleData {
            finished_at: Utc::now(),
            histories: histories
                .into_iter()
                .map(|(s, h)| (s.to_string(), h))
                .collect(),
            live_quotes,
            index_quotes,
        }
    }

    fn assert_keys_in_dates(snapshot: &Snapshot) {
        for entries in snapshot.sessions.values() {
            for date in entries.keys() {
                assert!(snapshot.dates().contains(date), "missing date {}", date);
            }
        }
    }

    #[test]
    fn test_history_wins_over_live() {
        let mut snapshot = Snapshot::new();
        let stats = snapshot.apply(cycle(
            vec![("SPY", vec![history(15, 200.0), history(14, 198.0)])],
            vec![live("SPY", 15, 205.0)],
            None,
        ));

        let kept = snapshot.session("SPY", day(15)).unwrap();
        assert_eq!(kept.close, 200.0);
        assert!(!kept.is_live());
        assert_eq!(stats.skipped_live, 1);
    }

    #[test]
    fn test_live_does_not_clobber_committed_history() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(cycle(vec![("SPY", vec![history(15, 200.0)])], vec![], None));

        // Cycle suivant : l'historique échoue, seule la cotation live arrive
        snapshot.apply(cycle(vec![], vec![live("SPY", 15, 210.0)], None));

        assert_eq!(snapshot.session("SPY", day(15)).unwrap().close, 200.0);
    }

    #[test]
    fn test_newer_live_replaces_older_live() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(cycle(vec![], vec![live("SPY", 16, 201.0)], None));
        snapshot.apply(cycle(vec![], vec![live("SPY", 16, 203.0)], None));

        let s = snapshot.session("SPY", day(16)).unwrap();
        assert_eq!(s.close, 203.0);
        assert!(s.is_live());
    }

    #[test]
    fn test_older_live_from_slower_cycle_is_ignored() {
        let mut snapshot = Snapshot::new();

        let mut fresh = live("SPY", 16, 205.0);
        fresh.timestamp = Utc.with_ymd_and_hms(2015, 9, 16, 19, 0, 0).unwrap();
        let mut first = cycle(vec![], vec![fresh], None);
        first.finished_at = Utc.with_ymd_and_hms(2015, 9, 16, 19, 0, 5).unwrap();
        snapshot.apply(first);

        // Cycle lancé plus tôt, commité après
        let mut stale = live("SPY", 16, 200.0);
        stale.timestamp = Utc.with_ymd_and_hms(2015, 9, 16, 15, 0, 0).unwrap();
        let mut second = cycle(vec![], vec![stale], None);
        second.finished_at = Utc.with_ymd_and_hms(2015, 9, 16, 15, 0, 5).unwrap();
        let stats = snapshot.apply(second);

        let s = snapshot.session("SPY", day(16)).unwrap();
        assert_eq!(s.close, 205.0);
        assert_eq!(s.quoted_at(), Some(Utc.with_ymd_and_hms(2015, 9, 16, 19, 0, 0).unwrap()));
        assert_eq!(stats.skipped_live, 1);
        assert_eq!(
            snapshot.refresh_time(),
            Some(Utc.with_ymd_and_hms(2015, 9, 16, 19, 0, 5).unwrap())
        );
    }

    #[test]
    fn test_retain_symbols_keeps_dates() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(cycle(
            vec![("A", vec![history(14, 1.0)]), ("B", vec![history(15, 2.0)])],
            vec![],
            None,
        ));

        assert_eq!(snapshot.retain_symbols(&["A".to_string()]), 1);
        assert!(snapshot.sessions_for("B").is_none());
        assert!(snapshot.sessions_for("A").is_some());
        assert_eq!(snapshot.dates().len(), 2);
    }

    #[test]
    fn test_history_replaces_live_for_same_date() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(cycle(vec![], vec![live("SPY", 16, 201.0)], None));
        snapshot.apply(cycle(vec![("SPY", vec![history(16, 199.0)])], vec![], None));

        let s = snapshot.session("SPY", day(16)).unwrap();
        assert_eq!(s.close, 199.0);
        assert!(!s.is_live());
    }

    #[test]
    fn test_dates_never_shrink() {
        let mut snapshot = Snapshot::new();
        let cycles = vec![
            cycle(vec![("A", vec![history(14, 1.0), history(15, 2.0)])], vec![], None),
            // Tout échoue
            cycle(vec![], vec![], None),
            cycle(vec![("B", vec![history(16, 3.0)])], vec![live("A", 17, 2.5)], None),
            cycle(vec![("A", vec![history(15, 2.1)])], vec![], None),
        ];

        let mut before = snapshot.dates().clone();
        for data in cycles {
            snapshot.apply(data);
            let after = snapshot.dates().clone();
            assert!(after.is_superset(&before));
            assert_keys_in_dates(&snapshot);
            before = after;
        }

        assert_eq!(snapshot.dates().len(), 4);
        // Les dates non récupérées à nouveau gardent leur valeur
        assert_eq!(snapshot.session("A", day(14)).unwrap().close, 1.0);
        assert_eq!(snapshot.session("A", day(15)).unwrap().close, 2.1);
    }

    #[test]
    fn test_index_quotes_kept_when_leg_fails() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(cycle(vec![], vec![], Some(vec![live(".DJI", 15, 16000.0)])));
        snapshot.apply(cycle(vec![], vec![], None));
        assert_eq!(snapshot.index_quotes().len(), 1);

        snapshot.apply(cycle(vec![], vec![], Some(vec![])));
        assert!(snapshot.index_quotes().is_empty());
    }

    #[test]
    fn test_recent_dates() {
        let mut snapshot = Snapshot::new();
        snapshot.apply(cycle(
            vec![("A", vec![history(14, 1.0), history(15, 1.0), history(16, 1.0)])],
            vec![],
            None,
        ));
        assert_eq!(snapshot.recent_dates(2), vec![day(15), day(16)]);
        assert_eq!(snapshot.recent_dates(10).len(), 3);
        assert!(snapshot.recent_dates(0).is_empty());
    }
}
