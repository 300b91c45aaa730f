/// Keyboard input collector.
///
/// The game is turn-based: every Press (or terminal auto-Repeat) of a key is
/// one command. Nothing is queued across frames; whatever arrives while
/// playback is busy is read and thrown away by the caller.
///
/// Release events are ignored, so terminals without keyboard enhancement
/// behave the same as those with it.

use std::time::Duration;

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use snakefall::domain::entity::MoveDir;

/// What the player asked for this frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Move(MoveDir),
    Restart,
    NextLevel,
    PrevLevel,
    Confirm,
    Quit,
}

pub struct InputState {
    /// Keys pressed (or auto-repeated) during the most recent drain, in order.
    pressed: Vec<KeyCode>,
    /// Raw key events collected during drain, for modifier checks.
    raw_events: Vec<KeyEvent>,
    /// Set when the terminal was resized; the renderer must redraw fully.
    pub resized: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            pressed: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            resized: false,
        }
    }

    /// Drain all pending terminal events.
    /// Call this once per frame, before the simulation is advanced.
    pub fn drain_events(&mut self) {
        self.pressed.clear();
        self.raw_events.clear();
        self.resized = false;

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => {
                    self.raw_events.push(key);
                    if key.kind != KeyEventKind::Release {
                        self.pressed.push(key.code);
                    }
                }
                Ok(Event::Resize(_, _)) => self.resized = true,
                _ => {}
            }
        }
    }

    /// Check if any raw event this frame has Ctrl+C
    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }

    /// Actions for this frame, in the order the keys arrived.
    pub fn actions(&self) -> Vec<Action> {
        if self.ctrl_c_pressed() {
            return vec![Action::Quit];
        }
        self.pressed.iter().filter_map(|&code| action_for_key(code)).collect()
    }
}

/// Arrows/WASD move, R restart, N/P level, Enter/Space confirm, Esc/Q quit.
pub fn action_for_key(code: KeyCode) -> Option<Action> {
    match code {
        KeyCode::Up    | KeyCode::Char('w') | KeyCode::Char('W') => Some(Action::Move(MoveDir::Up)),
        KeyCode::Down  | KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::Move(MoveDir::Down)),
        KeyCode::Left  | KeyCode::Char('a') | KeyCode::Char('A') => Some(Action::Move(MoveDir::Left)),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Some(Action::Move(MoveDir::Right)),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Restart),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(Action::NextLevel),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(Action::PrevLevel),
        KeyCode::Enter | KeyCode::Char(' ') => Some(Action::Confirm),
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('Q') => Some(Action::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrows_and_wasd_move() {
        assert_eq!(action_for_key(KeyCode::Left), Some(Action::Move(MoveDir::Left)));
        assert_eq!(action_for_key(KeyCode::Char('w')), Some(Action::Move(MoveDir::Up)));
        assert_eq!(action_for_key(KeyCode::Char('D')), Some(Action::Move(MoveDir::Right)));
    }

    #[test]
    fn meta_keys() {
        assert_eq!(action_for_key(KeyCode::Char('r')), Some(Action::Restart));
        assert_eq!(action_for_key(KeyCode::Esc), Some(Action::Quit));
        assert_eq!(action_for_key(KeyCode::Char('n')), Some(Action::NextLevel));
        assert_eq!(action_for_key(KeyCode::Char('x')), None);
    }
}
