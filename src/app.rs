// ============================================================================
// Structure : App (InputController)
// ============================================================================
// Machine à états qui traduit les touches en :
// - changements de sélection (navigation, scroll)
// - éditions structurelles de la liste (insertion, suppression, réordonnancement)
// - demandes de rafraîchissement
//
// CONCEPTS RUST :
// 1. Enum pour state machine : Normal / Composing
// 2. Commandes retournées plutôt qu'exécutées : App ne fait aucune I/O réseau,
//    la boucle principale transmet les Command au dispatcher
// 3. Éditions atomiques : la liste est modifiée sous le verrou exclusif du
//    board, la sauvegarde se fait après relâchement du verrou
// ============================================================================

use crossterm::event::KeyEvent;
use tracing::{debug, error, info};

use crate::config::ConfigStore;
use crate::models::BoardHandle;
use crate::refresh::RefreshScope;
use crate::ui::events::{
    has_reorder_modifier, is_backspace_key, is_delete_key, is_down_key, is_enter_key,
    is_escape_key, is_quit_key, is_refresh_key, is_up_key, printable_char,
};
use crate::ui::viewport;

/// Mode de saisie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Navigation dans le board
    Normal,
    /// Saisie d'un nouveau symbole
    Composing,
}

/// Sélection courante, lue par le rendu
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Rangée sélectionnée
    pub index: usize,
    /// Première rangée visible
    pub scroll_offset: usize,
    /// Symbole en cours de saisie
    pub input_buffer: String,
}

/// Action à exécuter par la boucle principale
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Refresh(RefreshScope),
    Quit,
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}

/// État de l'interface et contrôleur des entrées
pub struct App {
    running: bool,
    mode: Mode,
    selection: Selection,
    board: BoardHandle,
    store: ConfigStore,
}

impl App {
    pub fn new(board: BoardHandle, store: ConfigStore) -> Self {
        Self {
            running: true,
            mode: Mode::Normal,
            selection: Selection::default(),
            board,
            store,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn board(&self) -> &BoardHandle {
        &self.board
    }

    /// Recalcule le scroll pour la hauteur de grille courante
    pub fn update_scroll(&mut self, grid_height: u16) {
        self.selection.scroll_offset = viewport::adjust_scroll(
            self.selection.scroll_offset,
            self.selection.index,
            grid_height,
        );
    }

    /// Traite une touche ; retourne éventuellement une commande à exécuter
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if is_quit_key(&key) {
            info!("User quit");
            self.running = false;
            return Some(Command::Quit);
        }

        if is_refresh_key(&key) {
            info!("User requested refresh");
            return Some(Command::Refresh(RefreshScope::Full));
        }

        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Composing => self.handle_composing_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Option<Command> {
        let direction = if is_up_key(&key) {
            Some(Direction::Up)
        } else if is_down_key(&key) {
            Some(Direction::Down)
        } else {
            None
        };

        if let Some(direction) = direction {
            if has_reorder_modifier(&key) {
                self.reorder_selected(direction);
            } else {
                self.move_selection(direction);
            }
            return None;
        }

        if is_delete_key(&key) {
            self.delete_selected();
            return None;
        }

        if let Some(c) = printable_char(&key) {
            debug!("Entering composing mode");
            self.mode = Mode::Composing;
            self.selection.input_buffer.push(c);
        }

        None
    }

    fn handle_composing_key(&mut self, key: KeyEvent) -> Option<Command> {
        if is_enter_key(&key) {
            return self.submit_input();
        }

        if is_backspace_key(&key) {
            // Un buffer vide reste en mode saisie
            self.selection.input_buffer.pop();
        } else if is_escape_key(&key) {
            debug!("Composing cancelled");
            self.selection.input_buffer.clear();
            self.mode = Mode::Normal;
        } else if let Some(c) = printable_char(&key) {
            self.selection.input_buffer.push(c);
        }

        None
    }

    /// Déplace la sélection d'une rangée, avec bouclage aux extrémités
    fn move_selection(&mut self, direction: Direction) {
        let len = self.board.read().symbols.len();
        if len == 0 {
            self.selection.index = 0;
            return;
        }

        let index = self.selection.index.min(len - 1);
        self.selection.index = match direction {
            Direction::Up if index == 0 => len - 1,
            Direction::Up => index - 1,
            Direction::Down => (index + 1) % len,
        };
    }

    /// Échange le symbole sélectionné avec son voisin ; la sélection suit
    ///
    /// Aux extrémités de la liste, rien ne bouge.
    fn reorder_selected(&mut self, direction: Direction) {
        let index = self.selection.index;
        let swapped = {
            let mut state = self.board.write();
            let neighbor = match direction {
                Direction::Up => index.checked_sub(1),
                Direction::Down => Some(index + 1).filter(|&n| n < state.symbols.len()),
            };
            neighbor.filter(|&n| state.swap_symbols(index, n))
        };

        if let Some(neighbor) = swapped {
            info!(from = index, to = neighbor, "Symbol moved");
            self.selection.index = neighbor;
            self.persist();
        }
    }

    /// Insère le symbole saisi à la position de la sélection
    fn submit_input(&mut self) -> Option<Command> {
        let symbol = self.selection.input_buffer.trim().to_uppercase();
        self.selection.input_buffer.clear();
        self.mode = Mode::Normal;

        if symbol.is_empty() {
            debug!("Empty symbol, ignoring");
            return None;
        }

        let index = self
            .board
            .write()
            .insert_symbol(self.selection.index, symbol.clone());
        self.selection.index = index;
        info!(ticker = %symbol, index, "Symbol added");

        self.persist();
        Some(Command::Refresh(RefreshScope::Symbol(symbol)))
    }

    /// Supprime le symbole sélectionné et borne la sélection
    fn delete_selected(&mut self) {
        let (removed, len) = {
            let mut state = self.board.write();
            let removed = state.remove_symbol(self.selection.index);
            (removed, state.symbols.len())
        };

        if let Some(symbol) = removed {
            info!(ticker = %symbol, "Symbol removed");
            self.selection.index = self.selection.index.min(len.saturating_sub(1));
            self.persist();
        }
    }

    /// Sauvegarde la liste ; un échec est loggé, jamais annulé
    fn persist(&self) {
        let symbols = self.board.symbols();
        if let Err(e) = self.store.save(&symbols) {
            error!(error = %e, "Failed to save config, keeping in-memory edit");
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
