// ============================================================================
// Scheduler : déclenchement des cycles
// ============================================================================
// Deux sources de demandes de rafraîchissement, même coordinateur :
// - un timer qui se réveille à chaque heure pile
// - les touches de l'utilisateur (Ctrl+R, ajout d'un symbole)
//
// Les demandes passent par un channel tokio ; le dispatcher lance une tâche
// par cycle. Les cycles peuvent se chevaucher : la fusion est idempotente.
// ============================================================================

use chrono::{DateTime, Duration, DurationRound, Utc};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::refresh::{RefreshCoordinator, RefreshScope};

/// Prochaine heure pile strictement après `now`
pub fn next_top_of_hour(now: DateTime<Utc>) -> DateTime<Utc> {
    let hour = Duration::hours(1);
    let truncated = now.duration_trunc(hour).unwrap_or(now);
    truncated + hour
}

/// Timer horaire : envoie une demande Full à chaque heure pile
///
/// L'échéance est recalculée après chaque réveil, le timer ne dérive pas.
pub fn spawn_hourly(requests: UnboundedSender<RefreshScope>) -> JoinHandle<()> {
    spawn_hourly_with_clock(requests, Utc::now)
}

/// Même timer, avec une horloge fournie (tests en temps tokio suspendu)
pub fn spawn_hourly_with_clock<C>(requests: UnboundedSender<RefreshScope>, clock: C) -> JoinHandle<()>
where
    C: Fn() -> DateTime<Utc> + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            let now = clock();
            let next = next_top_of_hour(now);
            let wait = (next - now).to_std().unwrap_or_default();
            debug!(%next, "Next scheduled refresh");
            tokio::time::sleep(wait).await;

            info!("Scheduled refresh");
            if requests.send(RefreshScope::Full).is_err() {
                debug!("Refresh channel closed, stopping timer");
                break;
            }
        }
    })
}

/// Dispatcher : une tâche par demande, `on_commit` appelé après chaque commit
pub fn spawn_dispatcher<F>(
    coordinator: RefreshCoordinator,
    mut requests: UnboundedReceiver<RefreshScope>,
    on_commit: F,
) -> JoinHandle<()>
where
    F: Fn() + Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        while let Some(scope) = requests.recv().await {
            let coordinator = coordinator.clone();
            let on_commit = on_commit.clone();
            tokio::spawn(async move {
                let report = coordinator.run_cycle(scope).await;
                if report.histories_failed > 0 {
                    warn!(failed = report.histories_failed, "Cycle finished with failures");
                }
                on_commit();
            });
        }
        debug!("Refresh dispatcher exiting (channel closed)");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_next_top_of_hour() {
        let now = Utc.with_ymd_and_hms(2015, 9, 14, 10, 17, 42).unwrap();
        assert_eq!(
            next_top_of_hour(now),
            Utc.with_ymd_and_hms(2015, 9, 14, 11, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_next_top_of_hour_on_the_hour_moves_forward() {
        let now = Utc.with_ymd_and_hms(2015, 9, 14, 23, 0, 0).unwrap();
        assert_eq!(
            next_top_of_hour(now),
            Utc.with_ymd_and_hms(2015, 9, 15, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_hourly_timer_fires_on_each_top_of_hour() {
        let start = tokio::time::Instant::now();
        let base = Utc.with_ymd_and_hms(2015, 9, 14, 10, 59, 0).unwrap();
        let clock = move || base + Duration::from_std(start.elapsed()).unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let timer = spawn_hourly_with_clock(tx, clock);

        // 11:00 puis 12:00 : l'échéance est recalculée après le premier réveil
        assert_eq!(rx.recv().await, Some(RefreshScope::Full));
        let first = start.elapsed().as_secs();
        assert!((60..61).contains(&first), "first fire after {}s", first);

        assert_eq!(rx.recv().await, Some(RefreshScope::Full));
        let second = start.elapsed().as_secs();
        assert!((3660..3661).contains(&second), "second fire after {}s", second);

        assert!(rx.try_recv().is_err());
        timer.abort();
    }

    #[tokio::test]
    async fn test_dispatcher_runs_cycle_and_notifies() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use std::sync::Arc;

        use async_trait::async_trait;
        use chrono::NaiveDate;

        use crate::api::{LiveQuoteSource, SessionSource};
        use crate::error::FetchError;
        use crate::models::{BoardHandle, BoardState, LiveQuote, TradingSession};

        struct Empty;

        #[async_trait]
        impl SessionSource for Empty {
            async fn fetch(
                &self,
                _symbol: &str,
                _start: NaiveDate,
                _end: NaiveDate,
            ) -> Result<Vec<TradingSession>, FetchError> {
                Ok(Vec::new())
            }
        }

        #[async_trait]
        impl LiveQuoteSource for Empty {
            async fn fetch(&self, _symbols: &[String]) -> Result<Vec<LiveQuote>, FetchError> {
                Err(FetchError::Schema("expected at least one entry".to_string()))
            }
        }

        let board = BoardHandle::new(BoardState::with_symbols(vec!["SPY".to_string()]));
        let coordinator = RefreshCoordinator::new(board.clone(), Arc::new(Empty), Arc::new(Empty));

        let commits = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let (done_tx, mut done_rx) = tokio::sync::mpsc::unbounded_channel();

        let counter = Arc::clone(&commits);
        spawn_dispatcher(coordinator, rx, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = done_tx.send(());
        });

        tx.send(RefreshScope::Full).unwrap();
        done_rx.recv().await.unwrap();

        assert_eq!(commits.load(Ordering::SeqCst), 1);
        assert!(board.read().snapshot.refresh_time().is_some());
    }
}
