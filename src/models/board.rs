// ============================================================================
// Structure : BoardState
// ============================================================================
// Source de vérité unique partagée entre l'UI et les cycles de rafraîchissement
//
// CONCEPTS RUST :
// 1. Arc<RwLock<T>> : plusieurs lecteurs OU un seul écrivain
//    - Le rendu prend un verrou partagé le temps d'une frame
//    - Les commits et les éditions prennent le verrou exclusif
// 2. Poisoning : si un thread panique avec le verrou, on récupère quand même
//    la donnée (PoisonError::into_inner) plutôt que de propager la panique
// 3. Sections critiques courtes : jamais d'I/O sous le verrou
// ============================================================================

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::models::Snapshot;

/// Symboles suivis + snapshot des données
#[derive(Debug, Clone, Default)]
pub struct BoardState {
    /// Liste ordonnée des symboles (ordre choisi par l'utilisateur)
    pub symbols: Vec<String>,

    /// Données de marché fusionnées
    pub snapshot: Snapshot,
}

impl BoardState {
    /// Board sans données, avec la liste de symboles de la config
    pub fn with_symbols(symbols: Vec<String>) -> Self {
        Self {
            symbols,
            snapshot: Snapshot::new(),
        }
    }

    /// Insère un symbole à `index` (borné à la longueur de la liste)
    ///
    /// Retourne l'index effectif d'insertion.
    pub fn insert_symbol(&mut self, index: usize, symbol: String) -> usize {
        let index = index.min(self.symbols.len());
        self.symbols.insert(index, symbol);
        index
    }

    /// Supprime le symbole à `index`, s'il existe
    pub fn remove_symbol(&mut self, index: usize) -> Option<String> {
        if index < self.symbols.len() {
            Some(self.symbols.remove(index))
        } else {
            None
        }
    }

    /// Échange deux symboles (no-op si un index est hors limites)
    pub fn swap_symbols(&mut self, a: usize, b: usize) -> bool {
        if a < self.symbols.len() && b < self.symbols.len() {
            self.symbols.swap(a, b);
            true
        } else {
            false
        }
    }
}

/// Handle partagé vers le board
///
/// CONCEPT : Newtype autour de Arc<RwLock<>>
/// - Clone bon marché (incrémente juste le compteur de l'Arc)
/// - Centralise la gestion du poisoning
#[derive(Debug, Clone, Default)]
pub struct BoardHandle {
    inner: Arc<RwLock<BoardState>>,
}

impl BoardHandle {
    pub fn new(state: BoardState) -> Self {
        Self {
            inner: Arc::new(RwLock::new(state)),
        }
    }

    /// Verrou partagé (rendu d'une frame, lecture de la liste)
    pub fn read(&self) -> RwLockReadGuard<'_, BoardState> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Verrou exclusif (commit d'un cycle, édition structurelle)
    pub fn write(&self) -> RwLockWriteGuard<'_, BoardState> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copie de la liste de symboles (le verrou est relâché au retour)
    pub fn symbols(&self) -> Vec<String> {
        self.read().symbols.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(symbols: &[&str]) -> BoardState {
        BoardState::with_symbols(symbols.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_insert_symbol() {
        let mut state = board(&["A", "B", "C"]);
        assert_eq!(state.insert_symbol(1, "X".to_string()), 1);
        assert_eq!(state.symbols, vec!["A", "X", "B", "C"]);

        // Index trop grand : ajout en fin
        assert_eq!(state.insert_symbol(42, "Z".to_string()), 4);
        assert_eq!(state.symbols.last().map(String::as_str), Some("Z"));
    }

    #[test]
    fn test_remove_and_swap() {
        let mut state = board(&["A", "B", "C"]);
        assert_eq!(state.remove_symbol(1), Some("B".to_string()));
        assert_eq!(state.remove_symbol(5), None);
        assert!(state.swap_symbols(0, 1));
        assert_eq!(state.symbols, vec!["C", "A"]);
        assert!(!state.swap_symbols(0, 2));
    }

    #[test]
    fn test_handle_shares_state() {
        let handle = BoardHandle::new(board(&["A"]));
        let other = handle.clone();
        other.write().symbols.push("B".to_string());
        assert_eq!(handle.symbols(), vec!["A", "B"]);
    }

    #[test]
    fn test_readers_never_see_partial_edit() {
        let handle = BoardHandle::new(board(&["A", "B", "C"]));
        let writer = handle.clone();

        let edits = std::thread::spawn(move || {
            for i in 0..500 {
                let mut state = writer.write();
                state.insert_symbol(1, format!("S{}", i));
                state.remove_symbol(1);
            }
        });

        for _ in 0..500 {
            let state = handle.read();
            assert_eq!(state.symbols.len(), 3);
            assert_eq!(state.symbols[0], "A");
        }

        edits.join().unwrap();
        assert_eq!(handle.symbols(), vec!["A", "B", "C"]);
    }
}
