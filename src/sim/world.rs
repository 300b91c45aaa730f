/// WorldState: the complete snapshot of a level in play.
///
/// ## Layers
///
/// Terrain and occupancy are stored separately and composed at query time
/// through `board()`:
///   - `tiles`: static classification. Never mutated after load.
///   - `pickups`: removed (never replaced) when eaten.
///   - `rocks`: positions mutate in place (push, gravity).
///   - `snake`: the body, head first.
///
/// `start` keeps the level as loaded so `restart_level` can rebuild it.
///
/// The world is `Clone`: `simulate` runs a step on a copy, replays and
/// property tests compare whole snapshots.

use std::collections::HashMap;

use crate::config::RulesConfig;
use crate::domain::entity::{Cell, Rock, Snake};
use crate::domain::physics::Board;
use crate::domain::tile::Tile;

/// Lifecycle of a level.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// Built, gravity not yet applied.
    NotStarted,
    /// Accepts step commands.
    Running,
    /// Head reached a goal; absorption in progress, input rejected.
    Finishing,
    /// Terminal.
    Dead,
    /// Terminal.
    Won,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Dead | Phase::Won)
    }
}

/// Level contents as loaded, before any command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StartConfig {
    pub snake: Snake,
    pub pickups: HashMap<Cell, usize>,
    pub rocks: Vec<Rock>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorldState {
    // ── Terrain ──
    /// `tiles[y][x]`, row 0 is the bottom of the level.
    pub tiles: Vec<Vec<Tile>>,
    pub width: usize,
    pub height: usize,

    // ── Occupancy ──
    pub pickups: HashMap<Cell, usize>,
    pub rocks: Vec<Rock>,
    pub snake: Snake,

    // ── Progress ──
    pub phase: Phase,
    /// Goal cell being absorbed into (set on entering Finishing).
    pub finish_goal: Option<Cell>,
    pub pickups_total: usize,
    /// Accepted (non-blocked) steps since the last start.
    pub moves: u32,

    // ── Meta ──
    pub level_name: String,
    pub rules: RulesConfig,
    pub start: StartConfig,
}

impl WorldState {
    /// Assemble a world from validated level contents. Phase is NotStarted.
    pub fn new(
        level_name: String,
        tiles: Vec<Vec<Tile>>,
        start: StartConfig,
        rules: RulesConfig,
    ) -> Self {
        let height = tiles.len();
        let width = tiles.first().map_or(0, |r| r.len());
        WorldState {
            tiles,
            width,
            height,
            pickups: start.pickups.clone(),
            rocks: start.rocks.clone(),
            snake: start.snake.clone(),
            phase: Phase::NotStarted,
            finish_goal: None,
            pickups_total: start.pickups.len(),
            moves: 0,
            level_name,
            rules,
            start,
        }
    }

    /// Borrowed physics view over terrain + pickups + rocks.
    pub fn board(&self) -> Board<'_> {
        Board {
            tiles: &self.tiles,
            width: self.width,
            height: self.height,
            pickups: &self.pickups,
            rocks: &self.rocks,
        }
    }

    /// Terrain at `cell`. Out of bounds = wall.
    #[inline]
    pub fn terrain_at(&self, cell: Cell) -> Tile {
        self.board().tile_at(cell)
    }

    pub fn pickups_remaining(&self) -> usize {
        self.pickups.len()
    }

    /// Does the goal accept the head right now?
    pub fn goal_open(&self) -> bool {
        !self.rules.require_all_pickups || self.pickups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::MoveDir;

    fn tiny() -> WorldState {
        let mut tiles = vec![vec![Tile::Empty; 4]; 2];
        tiles[0] = vec![Tile::Ground; 4];
        tiles[1][3] = Tile::Goal;
        let mut pickups = HashMap::new();
        pickups.insert(Cell::new(2, 1), 0);
        let start = StartConfig {
            snake: Snake::new(Cell::new(0, 1), 1, MoveDir::Right),
            pickups,
            rocks: vec![],
        };
        WorldState::new("tiny".into(), tiles, start, RulesConfig::default())
    }

    #[test]
    fn new_world_copies_start_config() {
        let w = tiny();
        assert_eq!(w.phase, Phase::NotStarted);
        assert_eq!((w.width, w.height), (4, 2));
        assert_eq!(w.pickups_total, 1);
        assert_eq!(w.snake, w.start.snake);
        assert!(w.terrain_at(Cell::new(3, 1)).is_goal());
    }

    #[test]
    fn goal_gate_follows_rules() {
        let mut w = tiny();
        assert!(w.goal_open());
        w.rules.require_all_pickups = true;
        assert!(!w.goal_open());
        w.pickups.clear();
        assert!(w.goal_open());
    }

    #[test]
    fn terminal_phases() {
        assert!(Phase::Dead.is_terminal());
        assert!(Phase::Won.is_terminal());
        assert!(!Phase::Finishing.is_terminal());
        assert!(!Phase::Running.is_terminal());
    }
}
