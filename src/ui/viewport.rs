// ============================================================================
// Viewport : fenêtre visible du board
// ============================================================================
// Calculs purs (sans ratatui) :
// - combien de colonnes de dates tiennent en largeur (les plus récentes)
// - combien de lignes de symboles tiennent en hauteur
// - ajustement incrémental du scroll pour garder la sélection visible
// - seuils de couleur selon la variation
//
// Une cellule fait 4 lignes : prix / variation / variation % / volume.
// ============================================================================

use crate::models::TradingSession;

/// Largeur de la colonne des symboles
pub const SYMBOL_WIDTH: u16 = 10;

/// Largeur d'une cellule de date
pub const CELL_WIDTH: u16 = 12;

/// Hauteur d'une cellule (prix, variation, variation %, volume)
pub const CELL_HEIGHT: u16 = 4;

/// Espacement entre deux cellules (horizontal et vertical)
pub const CELL_PADDING: u16 = 1;

/// Lignes au-dessus de la grille (header + libellés des dates)
pub const HEADER_LINES: u16 = 2;

/// Lignes sous la grille (raccourcis clavier)
pub const FOOTER_LINES: u16 = 1;

/// Seuils de |variation %| (en fraction), croissants
pub const TONE_THRESHOLDS: [f64; 5] = [0.0, 0.05, 0.10, 0.25, 0.50];

/// Nombre de colonnes de dates affichées
///
/// min(colonnes qui tiennent, dates connues) ; les plus récentes sont prises.
pub fn visible_date_count(width: u16, total_dates: usize) -> usize {
    let available = width.saturating_sub(SYMBOL_WIDTH) / (CELL_WIDTH + CELL_PADDING);
    (available as usize).min(total_dates)
}

/// Hauteur disponible pour la grille dans un terminal de hauteur `height`
pub fn grid_height(height: u16) -> u16 {
    height.saturating_sub(HEADER_LINES + FOOTER_LINES)
}

/// Nombre de lignes de symboles qui tiennent entièrement en hauteur
pub fn visible_row_count(grid_height: u16) -> usize {
    ((grid_height + CELL_PADDING) / (CELL_HEIGHT + CELL_PADDING)) as usize
}

/// Ligne de départ (relative à la grille) d'une rangée de symbole
pub fn row_top(row: usize, scroll_offset: usize) -> usize {
    row.saturating_sub(scroll_offset) * (CELL_HEIGHT + CELL_PADDING) as usize
}

/// Ajuste le scroll d'une rangée à la fois jusqu'à ce que la bande de la
/// sélection soit entièrement visible
///
/// CONCEPT : viewport "collant"
/// - Pas de recalcul depuis une origine fixe
/// - Le scroll ne bouge que si la sélection sort par le haut ou par le bas
pub fn adjust_scroll(mut scroll_offset: usize, selected: usize, grid_height: u16) -> usize {
    let height = grid_height as usize;

    while scroll_offset > selected {
        scroll_offset -= 1;
    }

    while scroll_offset < selected
        && row_top(selected, scroll_offset) + CELL_HEIGHT as usize > height
    {
        scroll_offset += 1;
    }

    scroll_offset
}

/// Niveau de couleur d'une cellule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Aucune variation
    Flat,
    /// Hausse, intensité 0..=4
    Up(u8),
    /// Baisse, intensité 0..=4
    Down(u8),
}

/// Intensité selon |variation %| : le plus grand seuil strictement dépassé
pub fn severity(percent_change: f64) -> u8 {
    let magnitude = percent_change.abs();
    TONE_THRESHOLDS
        .iter()
        .rposition(|&threshold| magnitude > threshold)
        .unwrap_or(0) as u8
}

/// Couleur d'une séance : le signe de `change` choisit la famille
pub fn tone(session: &TradingSession) -> Tone {
    let level = severity(session.percent_change);
    if session.change > 0.0 {
        Tone::Up(level)
    } else if session.change < 0.0 {
        Tone::Down(level)
    } else {
        Tone::Flat
    }
}
