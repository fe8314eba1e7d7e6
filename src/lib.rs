// ============================================================================
// Ponzi - Library
// ============================================================================
// Moteur de rafraîchissement, modèles et interface, exposés pour le binaire
// et les tests
// ============================================================================

pub mod api;       // Sources d'historiques et de cotations live
pub mod app;       // Contrôleur des entrées
pub mod config;    // Persistance de la liste de symboles
pub mod error;     // Erreurs de fetch et de persistance
pub mod models;    // Séances, snapshot, board
pub mod refresh;   // Cycles de rafraîchissement
pub mod scheduler; // Timer horaire et dispatcher
pub mod ui;        // Interface utilisateur
