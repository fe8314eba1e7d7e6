// ============================================================================
// Module : models
// ============================================================================
// Structures de données du board : séances, cotations, snapshot, état partagé
// ============================================================================

pub mod board;          // BoardState + handle RwLock
pub mod market_hours;   // Heures d'ouverture NYSE
pub mod quote;          // Cotations live
pub mod session;        // Séances journalières
pub mod snapshot;       // Fusion des cycles

pub use board::{BoardHandle, BoardState};
pub use market_hours::{exchange_today, is_market_hours};
pub use quote::{index_symbols, LiveQuote, INDEX_SYMBOLS};
pub use session::{derive_changes, sort_newest_first, SessionOrigin, TradingSession};
pub use snapshot::{CycleData, MergeStats, Snapshot};
