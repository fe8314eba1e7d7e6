// ============================================================================
// Ponzi - Tableau de bord boursier en terminal
// ============================================================================
// Grille symboles × jours de bourse, rafraîchie toutes les heures et à la
// demande, colorée selon la variation.
//
// CONCEPTS RUST CLÉS :
// 1. Terminal raw mode : contrôle total du terminal
// 2. Event loop bloquante : un seul channel (touches, resize, repaint)
// 3. Async à côté du sync : runtime tokio pour les cycles, UI sur le thread
//    principal
// 4. État partagé : BoardHandle (RwLock) lu par l'UI, écrit par les cycles
// ============================================================================

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};

use ponzi::api::{google::GoogleLiveQuotes, http_client, HistoryBackend, SourceKind};
use ponzi::app::{App, Command};
use ponzi::config::ConfigStore;
use ponzi::models::{BoardHandle, BoardState};
use ponzi::refresh::{RefreshCoordinator, RefreshScope, DEFAULT_LOOKBACK_DAYS};
use ponzi::scheduler::{spawn_dispatcher, spawn_hourly};
use ponzi::ui::{render, viewport, Event, EventHandler};

// ============================================================================
// Ligne de commande
// ============================================================================

/// Tableau de bord boursier en terminal
#[derive(Debug, Parser)]
#[command(name = "ponzi", version, about)]
struct Cli {
    /// Fichier de config (par défaut ~/.ponzi)
    #[arg(long, env = "PONZI_CONFIG")]
    config: Option<PathBuf>,

    /// Backend des historiques
    #[arg(long, env = "PONZI_SOURCE", value_enum, default_value_t = SourceKind::Fallback)]
    source: SourceKind,

    /// Profondeur d'historique en jours calendaires
    #[arg(long, env = "PONZI_LOOKBACK_DAYS", default_value_t = DEFAULT_LOOKBACK_DAYS)]
    lookback_days: i64,
}

// ============================================================================
// Logging
// ============================================================================

/// Initialise le logging vers fichier (rotation quotidienne)
///
/// Le TUI occupe stdout : les logs vont uniquement dans
/// `<data_local_dir>/ponzi/logs/ponzi.log`, ou `./logs` à défaut.
///
/// ```bash
/// RUST_LOG=ponzi=trace ponzi
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = dirs::data_local_dir()
        .map(|dir| dir.join("ponzi").join("logs"))
        .unwrap_or_else(|| PathBuf::from("./logs"));

    std::fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "ponzi.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_thread_ids(true) // utile avec les tâches tokio
                .with_line_number(true),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ponzi=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialized");
    Ok(())
}

// ============================================================================
// Point d'entrée
// ============================================================================

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging().unwrap_or_else(|e| {
        eprintln!("Warning: failed to initialize logging: {}", e);
        eprintln!("Continuing without logging...");
    });

    info!(source = ?cli.source, lookback_days = cli.lookback_days, "Ponzi starting up");

    // Config : une erreur de lecture est fatale
    let store = open_config(cli.config)?;
    let symbols = load_symbols(&store)?;

    let board = BoardHandle::new(BoardState::with_symbols(symbols));

    // Runtime tokio : les cycles vivent dans ses workers, l'UI reste ici
    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let _guard = runtime.enter();

    let client = http_client().context("Failed to build HTTP client")?;
    let coordinator = RefreshCoordinator::new(
        board.clone(),
        Arc::new(HistoryBackend::from_kind(cli.source, client.clone())),
        Arc::new(GoogleLiveQuotes::new(client)),
    )
    .with_lookback_days(cli.lookback_days);

    let events = EventHandler::new();
    let (requests, request_rx) = tokio::sync::mpsc::unbounded_channel();

    let repaint = events.sender();
    spawn_dispatcher(coordinator, request_rx, move || {
        // UI déjà fermée : plus rien à redessiner
        let _ = repaint.send(Event::Repaint);
    });
    spawn_hourly(requests.clone());

    // Premier cycle dès le démarrage
    requests
        .send(RefreshScope::Full)
        .context("Refresh dispatcher is not running")?;

    debug!("Setting up terminal");
    let mut terminal = setup_terminal().map_err(|e| {
        error!(error = ?e, "Failed to set up terminal");
        e
    })?;

    let mut app = App::new(board, store);
    let result = run(&mut terminal, &mut app, &events, &requests);

    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    // Les cycles en vol sont abandonnés
    drop(_guard);
    runtime.shutdown_background();

    result
}

// ============================================================================
// Config
// ============================================================================

fn open_config(path: Option<PathBuf>) -> Result<ConfigStore> {
    let path = match path {
        Some(path) => path,
        None => ConfigStore::default_path().map_err(|e| {
            error!(error = %e, "Cannot locate config file");
            anyhow::Error::new(e).context("Cannot locate config file")
        })?,
    };
    Ok(ConfigStore::new(path))
}

/// Charge la liste de symboles ; l'échec est loggé avant d'être remonté
fn load_symbols(store: &ConfigStore) -> Result<Vec<String>> {
    match store.load() {
        Ok(symbols) => {
            info!(count = symbols.len(), "Symbols loaded");
            Ok(symbols)
        }
        Err(e) => {
            error!(error = %e, path = %store.path().display(), "Failed to load config");
            Err(anyhow::Error::new(e)
                .context(format!("Failed to load config {}", store.path().display())))
        }
    }
}

// ============================================================================
// Boucle d'événements
// ============================================================================

/// Dessine, attend un événement, le traite ; jusqu'à Ctrl+C
fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    requests: &UnboundedSender<RefreshScope>,
) -> Result<()> {
    while app.is_running() {
        terminal.draw(|frame| {
            app.update_scroll(viewport::grid_height(frame.size().height));
            render(frame, app);
        })?;

        match events.next()? {
            Event::Key(key) => match app.handle_key(key) {
                Some(Command::Refresh(scope)) => {
                    debug!(?scope, "Refresh requested");
                    if requests.send(scope).is_err() {
                        error!("Refresh dispatcher stopped, request dropped");
                    }
                }
                Some(Command::Quit) | None => {}
            },
            // Le prochain tour de boucle redessine
            Event::Resize | Event::Repaint => {}
            // next() convertit déjà les erreurs de lecture en Err
            Event::Error(message) => bail!("Terminal input failed: {}", message),
        }
    }

    Ok(())
}

// ============================================================================
// Terminal
// ============================================================================

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    let terminal = execute!(stdout, EnterAlternateScreen)
        .and_then(|_| Terminal::new(CrosstermBackend::new(stdout)));

    // Ne pas laisser le terminal en raw mode si la suite échoue
    if terminal.is_err() {
        let _ = disable_raw_mode();
    }
    terminal.context("Failed to initialize terminal")
}

/// Restaure le terminal, même si la boucle a échoué
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["ponzi"]).unwrap();
        assert_eq!(cli.source, SourceKind::Fallback);
        assert_eq!(cli.lookback_days, DEFAULT_LOOKBACK_DAYS);
    }

    #[test]
    fn test_load_symbols() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ponzi::config::CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"Stocks":[{"Symbol":"SPY"},{"Symbol":"MO"}]}"#).unwrap();

        let store = open_config(Some(path)).unwrap();
        assert_eq!(load_symbols(&store).unwrap(), vec!["SPY", "MO"]);
    }

    #[test]
    fn test_load_symbols_rejects_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ponzi::config::CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        let store = open_config(Some(path)).unwrap();
        let err = load_symbols(&store).unwrap_err();
        assert!(err.to_string().contains("Failed to load config"));
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "ponzi",
            "--config",
            "/tmp/ponzi.json",
            "--source",
            "yahoo",
            "--lookback-days",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/ponzi.json")));
        assert_eq!(cli.source, SourceKind::Yahoo);
        assert_eq!(cli.lookback_days, 10);
    }
}
