// ============================================================================
// Board - Rendu de la grille symboles × dates
// ============================================================================
// Une frame = un seul verrou en lecture sur le board :
// - header : heure du dernier refresh, marché ouvert/fermé, indices
// - ligne des dates (les plus récentes qui tiennent en largeur)
// - grille : une rangée par symbole, une cellule de 4 lignes par date
// - footer : raccourcis clavier
// - overlay centré pendant la saisie d'un symbole
//
// CONCEPTS RATATUI :
// 1. Layout vertical pour header / dates / grille / footer
// 2. Rect calculés à la main pour les cellules (taille fixe)
// 3. Clear + Block pour un popup par-dessus la grille
// ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::America::New_York;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, Mode};
use crate::models::{is_market_hours, BoardState, LiveQuote, TradingSession};
use crate::ui::viewport::{
    self, Tone, CELL_HEIGHT, CELL_PADDING, CELL_WIDTH, FOOTER_LINES, SYMBOL_WIDTH,
};

/// Cellule sans données
const PLACEHOLDER: &str = "--";

/// Verts, du plus pâle au plus vif
const UP_COLORS: [Color; 5] = [
    Color::Rgb(170, 220, 170),
    Color::Rgb(120, 200, 120),
    Color::Rgb(70, 180, 70),
    Color::Rgb(30, 160, 30),
    Color::Rgb(0, 230, 0),
];

/// Rouges, du plus pâle au plus vif
const DOWN_COLORS: [Color; 5] = [
    Color::Rgb(230, 170, 170),
    Color::Rgb(220, 120, 120),
    Color::Rgb(200, 70, 70),
    Color::Rgb(180, 30, 30),
    Color::Rgb(255, 0, 0),
];

/// Dessine l'interface complète
pub fn render(frame: &mut Frame, app: &App) {
    let size = frame.size();
    let chunks = create_layout(size);

    // Un seul verrou en lecture pour toute la frame
    {
        let state = app.board().read();
        let dates = state
            .snapshot
            .recent_dates(viewport::visible_date_count(size.width, state.snapshot.dates().len()));

        render_header(frame, &state, chunks[0]);
        render_date_labels(frame, &dates, chunks[1]);
        render_grid(frame, app, &state, &dates, chunks[2]);
    }

    render_footer(frame, chunks[3]);

    if app.mode() == Mode::Composing {
        render_input_overlay(frame, app, size);
    }
}

/// Header (1) / dates (1) / grille / footer
fn create_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(FOOTER_LINES),
        ])
        .split(area)
        .to_vec()
}

// ============================================================================
// Header
// ============================================================================

fn render_header(frame: &mut Frame, state: &BoardState, area: Rect) {
    let mut spans = vec![
        Span::styled(
            "Ponzi",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(
            refresh_label(state.snapshot.refresh_time()),
            Style::default().fg(Color::Gray),
        ),
        Span::raw("  "),
    ];

    if is_market_hours(&Utc::now()) {
        spans.push(Span::styled("● Market open", Style::default().fg(Color::Green)));
    } else {
        spans.push(Span::styled("● Market closed", Style::default().fg(Color::DarkGray)));
    }

    for quote in state.snapshot.index_quotes() {
        spans.push(Span::raw("   "));
        spans.push(Span::styled(
            quote.label().to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            index_quote_text(quote),
            Style::default().fg(tone_color(viewport::tone(&quote.to_session()))),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// "Updated 9/14/15 10:17 AM" en heure de New York
fn refresh_label(refresh_time: Option<DateTime<Utc>>) -> String {
    match refresh_time {
        Some(time) => format!(
            "Updated {}",
            time.with_timezone(&New_York).format("%-m/%-d/%y %-I:%M %p")
        ),
        None => "Not refreshed yet".to_string(),
    }
}

fn index_quote_text(quote: &LiveQuote) -> String {
    format!(
        "{:.2} {:+.2} ({:+.1}%)",
        quote.price,
        quote.change,
        quote.percent_change * 100.0
    )
}

// ============================================================================
// Dates et grille
// ============================================================================

fn render_date_labels(frame: &mut Frame, dates: &[NaiveDate], area: Rect) {
    let mut spans = vec![Span::raw(" ".repeat(SYMBOL_WIDTH as usize))];
    spans.extend(dates.iter().map(|date| {
        Span::styled(
            format!(
                "{:<width$}",
                date.format("%a %-m/%-d").to_string(),
                width = (CELL_WIDTH + CELL_PADDING) as usize
            ),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )
    }));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_grid(
    frame: &mut Frame,
    app: &App,
    state: &BoardState,
    dates: &[NaiveDate],
    area: Rect,
) {
    if state.symbols.is_empty() {
        let hint = Paragraph::new(Line::from(Span::styled(
            "No symbols, start typing to add one",
            Style::default().fg(Color::Gray),
        )))
        .alignment(Alignment::Center);
        frame.render_widget(hint, area);
        return;
    }

    let selection = app.selection();
    let rows = state
        .symbols
        .iter()
        .enumerate()
        .skip(selection.scroll_offset)
        .take(viewport::visible_row_count(area.height));

    for (row, symbol) in rows {
        let top = area.y + viewport::row_top(row, selection.scroll_offset) as u16;

        let symbol_style = if row == selection.index {
            Style::default()
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::REVERSED)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let label_area = Rect::new(area.x, top, SYMBOL_WIDTH.min(area.width), CELL_HEIGHT)
            .intersection(area);
        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(symbol.as_str(), symbol_style))),
            label_area,
        );

        for (column, date) in dates.iter().enumerate() {
            let left = area.x + SYMBOL_WIDTH + column as u16 * (CELL_WIDTH + CELL_PADDING);
            let cell_area = Rect::new(left, top, CELL_WIDTH, CELL_HEIGHT).intersection(area);
            if cell_area.area() == 0 {
                continue;
            }

            let session = state.snapshot.session(symbol, *date);
            frame.render_widget(Paragraph::new(cell_lines(session)), cell_area);
        }
    }
}

/// Les 4 lignes d'une cellule : prix / variation / variation % / volume
fn cell_lines(session: Option<&TradingSession>) -> Vec<Line<'static>> {
    let Some(session) = session else {
        return vec![Line::from(Span::styled(
            PLACEHOLDER,
            Style::default().fg(Color::DarkGray),
        ))];
    };

    let style = Style::default().fg(tone_color(viewport::tone(session)));
    let volume = if session.is_live() {
        PLACEHOLDER.to_string()
    } else {
        format_volume(session.volume)
    };

    vec![
        Line::from(Span::styled(
            format!("{:.2}", session.close),
            style.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(format!("{:+.2}", session.change), style)),
        Line::from(Span::styled(
            format!("{:+.1}%", session.percent_change * 100.0),
            style,
        )),
        Line::from(Span::styled(volume, Style::default().fg(Color::Gray))),
    ]
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Flat => Color::White,
        Tone::Up(level) => UP_COLORS[(level as usize).min(UP_COLORS.len() - 1)],
        Tone::Down(level) => DOWN_COLORS[(level as usize).min(DOWN_COLORS.len() - 1)],
    }
}

/// Volume compact : 950, 12.3K, 4.5M, 1.2B
fn format_volume(volume: u64) -> String {
    let v = volume as f64;
    if v >= 1e9 {
        format!("{:.1}B", v / 1e9)
    } else if v >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if v >= 1e3 {
        format!("{:.1}K", v / 1e3)
    } else {
        volume.to_string()
    }
}

// ============================================================================
// Footer et overlay de saisie
// ============================================================================

fn render_footer(frame: &mut Frame, area: Rect) {
    let key = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    let hints = Line::from(vec![
        Span::styled("[↑↓]", key),
        Span::raw(" Navigate  "),
        Span::styled("[Shift+↑↓]", key),
        Span::raw(" Move  "),
        Span::styled("[type]", Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)),
        Span::raw(" Add  "),
        Span::styled("[Del]", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
        Span::raw(" Remove  "),
        Span::styled("[Ctrl+R]", key),
        Span::raw(" Refresh  "),
        Span::styled("[Ctrl+C]", key),
        Span::raw(" Quit"),
    ]);

    frame.render_widget(Paragraph::new(hints).alignment(Alignment::Center), area);
}

fn render_input_overlay(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect(30, 3, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green))
        .title(" Add symbol ");

    let line = Line::from(vec![
        Span::styled(
            app.selection().input_buffer.as_str(),
            Style::default().fg(Color::White),
        ),
        Span::styled(
            "█",
            Style::default().fg(Color::White).add_modifier(Modifier::SLOW_BLINK),
        ),
    ]);

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(line).block(block), popup);
}

/// Rect de taille fixe centré dans `area` (borné à `area`)
fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};

    use crate::config::{ConfigStore, CONFIG_FILE_NAME};
    use crate::models::{BoardHandle, CycleData};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2015, 9, d).unwrap()
    }

    fn session(date: NaiveDate, close: f64, change: f64, pct: f64) -> TradingSession {
        let mut s = TradingSession::new(date, close, close, close, close, 1_250_000);
        s.change = change;
        s.percent_change = pct;
        s
    }

    fn screen(app: &App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn app_with_data(dir: &tempfile::TempDir) -> App {
        let board = BoardHandle::new(BoardState::with_symbols(vec![
            "AAPL".to_string(),
            "MSFT".to_string(),
        ]));
        board.write().snapshot.apply(CycleData {
            finished_at: Utc.with_ymd_and_hms(2015, 9, 15, 14, 17, 0).unwrap(),
            histories: vec![(
                "AAPL".to_string(),
                vec![session(day(15), 116.28, 1.07, 0.0093), session(day(14), 115.21, 0.0, 0.0)],
            )],
            live_quotes: Vec::new(),
            index_quotes: None,
        });
        App::new(board, ConfigStore::new(dir.path().join(CONFIG_FILE_NAME)))
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(950), "950");
        assert_eq!(format_volume(12_300), "12.3K");
        assert_eq!(format_volume(4_500_000), "4.5M");
        assert_eq!(format_volume(1_200_000_000), "1.2B");
    }

    #[test]
    fn test_refresh_label_uses_new_york_time() {
        let time = Utc.with_ymd_and_hms(2015, 9, 15, 14, 17, 0).unwrap();
        assert_eq!(refresh_label(Some(time)), "Updated 9/15/15 10:17 AM");
        assert_eq!(refresh_label(None), "Not refreshed yet");
    }

    #[test]
    fn test_cell_lines() {
        let lines = cell_lines(Some(&session(day(15), 116.28, 1.07, 0.0093)));
        assert_eq!(lines.len(), CELL_HEIGHT as usize);
        assert_eq!(lines[0].spans[0].content, "116.28");
        assert_eq!(lines[1].spans[0].content, "+1.07");
        assert_eq!(lines[2].spans[0].content, "+0.9%");
        assert_eq!(lines[3].spans[0].content, "1.2M");

        let missing = cell_lines(None);
        assert_eq!(missing[0].spans[0].content, PLACEHOLDER);
    }

    #[test]
    fn test_live_cell_hides_volume() {
        let mut live = session(day(15), 10.0, 0.5, 0.05);
        live.origin = crate::models::SessionOrigin::Live(Utc::now());
        assert_eq!(cell_lines(Some(&live))[3].spans[0].content, PLACEHOLDER);
    }

    #[test]
    fn test_tone_colors() {
        assert_eq!(tone_color(Tone::Flat), Color::White);
        assert_eq!(tone_color(Tone::Up(4)), UP_COLORS[4]);
        assert_eq!(tone_color(Tone::Down(0)), DOWN_COLORS[0]);
    }

    #[test]
    fn test_centered_rect() {
        let area = Rect::new(0, 0, 80, 24);
        assert_eq!(centered_rect(30, 3, area), Rect::new(25, 10, 30, 3));
        assert_eq!(centered_rect(30, 3, Rect::new(0, 0, 10, 2)), Rect::new(0, 0, 10, 2));
    }

    #[test]
    fn test_render_grid() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with_data(&dir);
        let text = screen(&app, 80, 20);

        assert!(text.contains("Updated 9/15/15 10:17 AM"));
        assert!(text.contains("Mon 9/14"));
        assert!(text.contains("Tue 9/15"));
        assert!(text.contains("AAPL"));
        assert!(text.contains("116.28"));
        // MSFT n'a aucune donnée : placeholder
        assert!(text.contains("MSFT"));
        assert!(text.contains(PLACEHOLDER));
    }

    #[test]
    fn test_render_composing_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let mut app = app_with_data(&dir);
        app.handle_key(KeyEvent::new(KeyCode::Char('Z'), KeyModifiers::SHIFT));

        let text = screen(&app, 80, 20);
        assert!(text.contains("Add symbol"));
        assert!(text.contains('Z'));
    }

    #[test]
    fn test_render_tiny_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_with_data(&dir);
        // Ne panique pas même sans place pour la grille
        screen(&app, 8, 3);
    }
}
