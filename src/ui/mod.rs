// ============================================================================
// Module : ui
// ============================================================================
// Interface terminal : événements, géométrie de la grille, rendu
// ============================================================================

pub mod board;    // Rendu du board
pub mod events;   // Channel d'événements et touches
pub mod viewport; // Fenêtre visible, scroll, couleurs

pub use board::render;
pub use events::{Event, EventHandler};
