// ============================================================================
// Gestion des événements
// ============================================================================
// La boucle UI bloque sur un seul channel qui reçoit :
// - les touches et redimensionnements (thread de lecture du terminal)
// - les demandes de repaint (envoyées après chaque commit d'un cycle)
//
// CONCEPTS RUST :
// 1. mpsc channel : plusieurs producteurs (thread input, tâches tokio),
//    un seul consommateur (la boucle UI)
// 2. Threading : la lecture crossterm est bloquante, elle vit dans son thread
// ============================================================================

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use anyhow::{anyhow, Context, Result};
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, error};

/// Événements de la boucle UI
#[derive(Debug, Clone)]
pub enum Event {
    /// Touche pressée
    Key(KeyEvent),

    /// Le terminal a changé de taille
    Resize,

    /// Le board a été mis à jour, il faut redessiner
    Repaint,

    /// La lecture du terminal a échoué ; le thread de lecture s'est arrêté
    Error(String),
}

/// Gestionnaire d'événements
pub struct EventHandler {
    sender: Sender<Event>,
    receiver: Receiver<Event>,
}

impl EventHandler {
    /// Crée le channel et démarre le thread de lecture du terminal
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();

        let input = sender.clone();
        thread::spawn(move || forward_terminal_events(input, event::read));

        Self { sender, receiver }
    }

    /// Sender pour les producteurs externes (repaint)
    pub fn sender(&self) -> Sender<Event> {
        self.sender.clone()
    }

    /// Attend le prochain événement (bloquant)
    ///
    /// Une erreur de lecture du terminal est remontée en `Err` : plus aucune
    /// touche n'arrivera, la boucle UI doit s'arrêter.
    pub fn next(&self) -> Result<Event> {
        match self.receiver.recv().context("Event channel disconnected")? {
            Event::Error(message) => Err(anyhow!("Terminal input failed: {}", message)),
            event => Ok(event),
        }
    }
}

/// Boucle du thread de lecture : transmet touches et resize jusqu'à une
/// erreur de lecture (transmise elle aussi) ou la fermeture du channel
fn forward_terminal_events<F>(input: Sender<Event>, mut read: F)
where
    F: FnMut() -> std::io::Result<CrosstermEvent>,
{
    loop {
        let forwarded = match read() {
            // Sur certains OS on reçoit Press ET Release : on garde Press
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                input.send(Event::Key(key))
            }
            Ok(CrosstermEvent::Resize(_, _)) => input.send(Event::Resize),
            Ok(_) => Ok(()),
            Err(e) => {
                error!(error = %e, "Failed to read terminal event");
                let _ = input.send(Event::Error(e.to_string()));
                break;
            }
        };

        if forwarded.is_err() {
            debug!("Event channel closed, input thread exiting");
            break;
        }
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Helpers : reconnaître les touches
// ============================================================================

/// Ctrl+C : quitter (dans tous les modes)
pub fn is_quit_key(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('c'))
}

/// Ctrl+R : rafraîchir (dans tous les modes)
pub fn is_refresh_key(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && matches!(key.code, KeyCode::Char('r'))
}

pub fn is_up_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Up)
}

pub fn is_down_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Down)
}

/// Shift, Alt ou Ctrl + flèche : déplacer le symbole
pub fn has_reorder_modifier(key: &KeyEvent) -> bool {
    key.modifiers
        .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT | KeyModifiers::CONTROL)
}

pub fn is_enter_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Enter)
}

pub fn is_backspace_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Backspace)
}

pub fn is_delete_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Delete)
}

pub fn is_escape_key(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Esc)
}

/// Caractère imprimable sans Ctrl/Alt (Shift autorisé pour les majuscules)
pub fn printable_char(key: &KeyEvent) -> Option<char> {
    if key
        .modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
    {
        return None;
    }
    match key.code {
        KeyCode::Char(c) if !c.is_control() => Some(c),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_quit_and_refresh_need_ctrl() {
        assert!(is_quit_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit_key(&key(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(is_refresh_key(&key(KeyCode::Char('r'), KeyModifiers::CONTROL)));
        assert!(!is_refresh_key(&key(KeyCode::Char('r'), KeyModifiers::NONE)));
    }

    #[test]
    fn test_printable_char() {
        assert_eq!(printable_char(&key(KeyCode::Char('a'), KeyModifiers::NONE)), Some('a'));
        assert_eq!(printable_char(&key(KeyCode::Char('A'), KeyModifiers::SHIFT)), Some('A'));
        assert_eq!(printable_char(&key(KeyCode::Char('r'), KeyModifiers::CONTROL)), None);
        assert_eq!(printable_char(&key(KeyCode::Enter, KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_reorder_modifier() {
        assert!(has_reorder_modifier(&key(KeyCode::Up, KeyModifiers::SHIFT)));
        assert!(has_reorder_modifier(&key(KeyCode::Down, KeyModifiers::ALT)));
        assert!(!has_reorder_modifier(&key(KeyCode::Up, KeyModifiers::NONE)));
    }

    #[test]
    fn test_read_failure_ends_event_stream() {
        let (sender, receiver) = mpsc::channel();
        let handler = EventHandler { sender, receiver };

        let mut reads = vec![
            Err(std::io::Error::new(std::io::ErrorKind::Other, "tty gone")),
            Ok(CrosstermEvent::Key(key(KeyCode::Char('a'), KeyModifiers::NONE))),
        ];
        // Le handler garde son propre sender : seul Event::Error débloque next()
        forward_terminal_events(handler.sender(), move || {
            reads.pop().unwrap_or_else(|| Ok(CrosstermEvent::FocusGained))
        });

        assert!(matches!(handler.next().unwrap(), Event::Key(_)));
        let err = handler.next().unwrap_err();
        assert!(err.to_string().contains("tty gone"));
    }

    #[test]
    fn test_handler_receives_repaint() {
        let (sender, receiver) = mpsc::channel();
        let handler = EventHandler { sender, receiver };
        handler.sender().send(Event::Repaint).unwrap();
        assert!(matches!(handler.next().unwrap(), Event::Repaint));
    }
}
