// ============================================================================
// RefreshCoordinator : cycle de rafraîchissement
// ============================================================================
// Un cycle :
// 1. Lit la liste de symboles (verrou partagé, copie)
// 2. Lance en parallèle un fetch d'historique par symbole distinct,
//    un fetch live pour tous les symboles, un fetch live pour les indices
// 3. Attend la fin de toutes les tâches (un échec n'annule rien)
// 4. Normalise les historiques et calcule les variations
// 5. Fusionne le tout sous le verrou exclusif, une seule fois
//
// CONCEPTS RUST :
// 1. JoinSet : groupe de tâches tokio, collecte des résultats à la fin
// 2. Arc<dyn Trait> : sources injectées, partagées entre les tâches
// 3. Pas d'I/O sous verrou : le commit ne fait que de la fusion en mémoire
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use crate::api::{LiveQuoteSource, SessionSource};
use crate::error::FetchError;
use crate::models::{
    derive_changes, exchange_today, index_symbols, sort_newest_first, BoardHandle, CycleData,
    LiveQuote, TradingSession,
};

/// Fenêtre d'historique par défaut, en jours calendaires
pub const DEFAULT_LOOKBACK_DAYS: i64 = 30;

/// Portée d'un cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshScope {
    /// Tous les symboles du board + indices
    Full,
    /// Un symbole qui vient d'être ajouté, sans attendre le prochain cycle
    Symbol(String),
}

/// Résumé d'un cycle, pour les logs et les tests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub histories_ok: usize,
    pub histories_failed: usize,
    pub live_ok: bool,
    /// None si la jambe indices n'a pas été lancée
    pub index_ok: Option<bool>,
    pub new_dates: usize,
}

/// Résultat d'une tâche du cycle
enum Leg {
    History(String, Result<Vec<TradingSession>, FetchError>),
    Live(Result<Vec<LiveQuote>, FetchError>),
    Index(Result<Vec<LiveQuote>, FetchError>),
}

/// Orchestration des fetchs et du commit dans le board
#[derive(Clone)]
pub struct RefreshCoordinator {
    board: BoardHandle,
    sessions: Arc<dyn SessionSource>,
    quotes: Arc<dyn LiveQuoteSource>,
    lookback: Duration,
    index_symbols: Vec<String>,
}

impl RefreshCoordinator {
    pub fn new(
        board: BoardHandle,
        sessions: Arc<dyn SessionSource>,
        quotes: Arc<dyn LiveQuoteSource>,
    ) -> Self {
        Self {
            board,
            sessions,
            quotes,
            lookback: Duration::days(DEFAULT_LOOKBACK_DAYS),
            index_symbols: index_symbols(),
        }
    }

    pub fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback = Duration::days(days.max(1));
        self
    }

    pub fn with_index_symbols(mut self, symbols: Vec<String>) -> Self {
        self.index_symbols = symbols;
        self
    }

    /// Exécute un cycle complet et commit ce qui a réussi
    ///
    /// Les indices ne sont rafraîchis que pour un cycle Full.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, scope: RefreshScope) -> CycleReport {
        let symbols = match &scope {
            RefreshScope::Full => distinct(self.board.symbols()),
            RefreshScope::Symbol(symbol) => vec![symbol.clone()],
        };
        let with_indices = scope == RefreshScope::Full && !self.index_symbols.is_empty();

        let end = exchange_today(Utc::now());
        let start = end - self.lookback;
        info!(symbols = symbols.len(), %start, %end, "Starting refresh cycle");

        let mut tasks = JoinSet::new();

        for symbol in &symbols {
            let source = Arc::clone(&self.sessions);
            let symbol = symbol.clone();
            tasks.spawn(async move {
                let result = source.fetch(&symbol, start, end).await;
                Leg::History(symbol, result)
            });
        }

        // Pas d'appel live sans symbole : le fournisseur renverrait une enveloppe vide
        if !symbols.is_empty() {
            let source = Arc::clone(&self.quotes);
            let batch = symbols.clone();
            tasks.spawn(async move { Leg::Live(source.fetch(&batch).await) });
        }

        if with_indices {
            let source = Arc::clone(&self.quotes);
            let batch = self.index_symbols.clone();
            tasks.spawn(async move { Leg::Index(source.fetch(&batch).await) });
        }

        let mut report = CycleReport {
            index_ok: with_indices.then_some(false),
            ..CycleReport::default()
        };
        let mut histories = Vec::new();
        let mut live_quotes = Vec::new();
        let mut index_quotes = None;

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Leg::History(symbol, Ok(mut sessions))) => {
                    sort_newest_first(&mut sessions);
                    derive_changes(&mut sessions);
                    report.histories_ok += 1;
                    histories.push((symbol, sessions));
                }
                Ok(Leg::History(symbol, Err(e))) => {
                    warn!(ticker = %symbol, error = %e, "History fetch failed");
                    report.histories_failed += 1;
                }
                Ok(Leg::Live(Ok(mut quotes))) => {
                    report.live_ok = true;
                    // Le fournisseur peut renvoyer un symbole différent de celui demandé
                    quotes.retain(|quote| {
                        let requested = symbols.contains(&quote.symbol);
                        if !requested {
                            warn!(ticker = %quote.symbol, "Live quote for unrequested symbol dropped");
                        }
                        requested
                    });
                    live_quotes = quotes;
                }
                Ok(Leg::Live(Err(e))) => {
                    warn!(error = %e, "Live quote fetch failed");
                }
                Ok(Leg::Index(Ok(quotes))) => {
                    report.index_ok = Some(true);
                    index_quotes = Some(quotes);
                }
                Ok(Leg::Index(Err(e))) => {
                    warn!(error = %e, "Index quote fetch failed");
                }
                Err(e) => {
                    error!(error = %e, "Refresh task panicked or was cancelled");
                }
            }
        }

        let data = CycleData {
            finished_at: Utc::now(),
            histories,
            live_quotes,
            index_quotes,
        };

        let (stats, dropped) = {
            let mut guard = self.board.write();
            let state = &mut *guard;
            let stats = state.snapshot.apply(data);
            // Symboles supprimés pendant ou avant le cycle
            let dropped = state.snapshot.retain_symbols(&state.symbols);
            (stats, dropped)
        };
        report.new_dates = stats.new_dates;

        info!(
            histories_ok = report.histories_ok,
            histories_failed = report.histories_failed,
            live_ok = report.live_ok,
            merged = stats.merged_sessions,
            new_dates = stats.new_dates,
            dropped_symbols = dropped,
            "Refresh cycle committed"
        );
        report
    }
}

/// Dédoublonne en gardant l'ordre de première apparition
fn distinct(symbols: Vec<String>) -> Vec<String> {
    let mut seen = BTreeSet::new();
    symbols
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}

// ============================================================================
// Tests unitaires
// ============================================================================
