/// Event playback: the engine resolves a whole step at once, this spreads
/// the resulting events over wall-clock time so moves, drops and the
/// absorption can be seen.
///
/// While anything is queued or the last event is still on screen the
/// front-end is busy and drops player input.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use snakefall::config::SpeedConfig;
use snakefall::domain::entity::Cell;
use snakefall::sim::event::GameEvent;
use snakefall::sim::world::WorldState;

pub struct Playback {
    queue: VecDeque<GameEvent>,
    hold_until: Option<Instant>,
    move_time: Duration,
    fall_time: Duration,
    absorb_time: Duration,

    /// Body as currently drawn, head first. `None` means draw the world.
    shown_snake: Option<Vec<Cell>>,
    /// Rock positions as currently drawn, by rock id.
    shown_rocks: HashMap<usize, Cell>,
}

impl Playback {
    pub fn new(speed: &SpeedConfig) -> Self {
        Playback {
            queue: VecDeque::new(),
            hold_until: None,
            move_time: Duration::from_millis(speed.move_ms),
            fall_time: Duration::from_millis(speed.fall_ms),
            absorb_time: Duration::from_millis(speed.absorb_ms),
            shown_snake: None,
            shown_rocks: HashMap::new(),
        }
    }

    /// Queue events produced from `before`. The drawn board starts from
    /// `before` and catches up with the world one event at a time.
    pub fn push(&mut self, before: &WorldState, events: Vec<GameEvent>) {
        if events.is_empty() {
            return;
        }
        if !self.is_busy() {
            self.shown_snake = Some(before.snake.cells());
            self.shown_rocks = before.rocks.iter().map(|r| (r.id, r.cell)).collect();
        }
        self.queue.extend(events);
    }

    pub fn is_busy(&self) -> bool {
        !self.queue.is_empty() || self.hold_until.is_some()
    }

    /// Drop everything (level change or restart).
    pub fn clear(&mut self) {
        self.queue.clear();
        self.hold_until = None;
        self.shown_snake = None;
        self.shown_rocks.clear();
    }

    /// Release every event that is due at `now`, in order.
    pub fn tick(&mut self, now: Instant) -> Vec<GameEvent> {
        let mut due = vec![];
        loop {
            if let Some(until) = self.hold_until {
                if now < until {
                    break;
                }
                self.hold_until = None;
            }
            let ev = match self.queue.pop_front() {
                Some(ev) => ev,
                None => break,
            };
            self.apply(&ev);
            let hold = self.duration_of(&ev);
            if !hold.is_zero() {
                self.hold_until = Some(now + hold);
            }
            due.push(ev);
        }
        if !self.is_busy() {
            self.shown_snake = None;
            self.shown_rocks.clear();
        }
        due
    }

    pub fn shown_snake(&self) -> Option<&[Cell]> {
        self.shown_snake.as_deref()
    }

    pub fn shown_rock(&self, id: usize) -> Option<Cell> {
        self.shown_rocks.get(&id).copied()
    }

    fn apply(&mut self, ev: &GameEvent) {
        match ev {
            GameEvent::Moved { segments, .. }
            | GameEvent::Fell { segments }
            | GameEvent::Died { segments, .. }
            | GameEvent::AbsorbShift { segments } => {
                self.shown_snake = Some(segments.clone());
            }
            GameEvent::SegmentAbsorbed { .. } => {
                if let Some(body) = &mut self.shown_snake {
                    if !body.is_empty() {
                        body.remove(0);
                    }
                }
            }
            GameEvent::RockPushed { id, to, .. } | GameEvent::RockFell { id, to, .. } => {
                self.shown_rocks.insert(*id, *to);
            }
            _ => {}
        }
    }

    fn duration_of(&self, ev: &GameEvent) -> Duration {
        match ev {
            GameEvent::Moved { .. } => self.move_time,
            GameEvent::Fell { .. } | GameEvent::RockFell { .. } => self.fall_time,
            GameEvent::AbsorbShift { .. } | GameEvent::SegmentAbsorbed { .. } => self.absorb_time,
            // A push lands together with the move that caused it
            _ => Duration::ZERO,
        }
    }
}
