/// Unified physics layer: single source of truth.
///
/// ## Architecture
///
/// Two distinct concepts:
///   1. TERRAIN:   what the cell IS (static tile classification)
///   2. OCCUPANCY: what is IN the cell (pickups, rocks, snake segments)
///
/// These are queried separately. Entry = terrain passable && no blocking occupant.
/// Support = what lies directly below, read through both layers.
///
/// ## Support Classification
///
/// The cell under a snake segment is classified as ONE of:
///   - `Own`   : another segment of the same body (never support)
///   - `Hazard`: hazard tile (a pickup lying on it does not neutralize it)
///   - `Safe`  : rock, wall, ground, goal, or a pickup
///   - `Open`  : nothing
///
/// Rocks cover whatever tile they sit in, so a rock is `Safe` even on a hazard.
/// Outside the level rectangle reads as Wall: the edge is a floor and a wall.
///
/// A rock is supported by: wall/ground below, another rock below, or a
/// snake segment below.

use std::collections::HashMap;

use super::entity::{Cell, Rock, Snake};
use super::tile::Tile;

// ══════════════════════════════════════════════════════════════
// Board: immutable view of terrain + occupancy
// ══════════════════════════════════════════════════════════════

/// Borrowed view of the grid for physics queries.
/// `tiles[y][x]`, row 0 is the bottom of the level.
#[derive(Clone, Copy)]
pub struct Board<'a> {
    pub tiles: &'a [Vec<Tile>],
    pub width: usize,
    pub height: usize,
    pub pickups: &'a HashMap<Cell, usize>,
    pub rocks: &'a [Rock],
}

/// What a segment rests on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Footing {
    Open,
    Own,
    Safe,
    Hazard,
}

impl<'a> Board<'a> {
    // ── Layer 1: terrain ──

    #[inline]
    pub fn in_bounds(&self, cell: Cell) -> bool {
        cell.x >= 0 && cell.y >= 0
            && (cell.x as usize) < self.width
            && (cell.y as usize) < self.height
    }

    /// Static classification at `cell`. Out of bounds = wall.
    #[inline]
    pub fn tile_at(&self, cell: Cell) -> Tile {
        if !self.in_bounds(cell) {
            return Tile::Wall;
        }
        self.tiles[cell.y as usize][cell.x as usize]
    }

    // ── Layer 2: occupancy ──

    /// Index (into `rocks`) of the rock at `cell`, if any.
    pub fn rock_at(&self, cell: Cell) -> Option<usize> {
        self.rocks.iter().position(|r| r.cell == cell)
    }

    /// Is there a rock at `cell`, excluding rock index `skip`?
    pub fn has_rock_except(&self, cell: Cell, skip: usize) -> bool {
        self.rocks.iter().enumerate().any(|(i, r)| i != skip && r.cell == cell)
    }

    pub fn has_pickup(&self, cell: Cell) -> bool {
        self.pickups.contains_key(&cell)
    }

    // ── Combined queries ──

    /// Classify what lies under `cell` for a segment of `snake`.
    pub fn footing_below(&self, cell: Cell, snake: &Snake) -> Footing {
        let below = cell.below();
        if snake.contains(below) {
            return Footing::Own;
        }
        if self.rock_at(below).is_some() {
            return Footing::Safe;
        }
        let tile = self.tile_at(below);
        if tile.is_hazard() {
            return Footing::Hazard;
        }
        if tile.is_safe_support() || self.has_pickup(below) {
            return Footing::Safe;
        }
        Footing::Open
    }

    /// Does any segment stand on safe footing?
    pub fn snake_supported(&self, snake: &Snake) -> bool {
        snake.segments.iter().any(|&seg| self.footing_below(seg, snake) == Footing::Safe)
    }

    /// Is rock `idx` held up by terrain, another rock, or the snake?
    pub fn rock_supported(&self, idx: usize, snake: &Snake) -> bool {
        let below = self.rocks[idx].cell.below();
        self.tile_at(below).is_solid()
            || self.has_rock_except(below, idx)
            || snake.contains(below)
    }

    /// Can a rock be pushed into `cell`?
    pub fn rock_can_enter(&self, cell: Cell, snake: &Snake) -> bool {
        self.tile_at(cell).is_passable()
            && self.rock_at(cell).is_none()
            && !snake.contains(cell)
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entity::MoveDir;

    /// Rows are written top-down; the last row is y = 0.
    /// Legend: '#'=Wall '='=Ground '^'=Hazard 'G'=Goal 'A'=pickup 'R'=rock
    fn board_from(rows: &[&str]) -> (Vec<Vec<Tile>>, HashMap<Cell, usize>, Vec<Rock>, usize, usize) {
        let h = rows.len();
        let w = rows[0].len();
        let mut t = vec![vec![Tile::Empty; w]; h];
        let mut pickups = HashMap::new();
        let mut rocks = vec![];
        for (row_idx, row) in rows.iter().enumerate() {
            let y = h - 1 - row_idx;
            for (x, ch) in row.chars().enumerate() {
                let cell = Cell::new(x as i32, y as i32);
                t[y][x] = match ch {
                    '#' => Tile::Wall,
                    '=' => Tile::Ground,
                    '^' => Tile::Hazard,
                    'G' => Tile::Goal,
                    'A' => { pickups.insert(cell, pickups.len()); Tile::Empty }
                    'R' => { rocks.push(Rock::new(rocks.len(), cell)); Tile::Empty }
                    _   => Tile::Empty,
                };
            }
        }
        (t, pickups, rocks, w, h)
    }

    fn view<'a>(
        t: &'a [Vec<Tile>], p: &'a HashMap<Cell, usize>, r: &'a [Rock], w: usize, h: usize,
    ) -> Board<'a> {
        Board { tiles: t, width: w, height: h, pickups: p, rocks: r }
    }

    fn snake_at(cells: &[(i32, i32)]) -> Snake {
        let mut s = Snake::new(Cell::new(cells[0].0, cells[0].1), 1, MoveDir::Right);
        for &(x, y) in &cells[1..] {
            s.segments.push_back(Cell::new(x, y));
        }
        s
    }

    // ── terrain ──

    #[test]
    fn out_of_bounds_is_wall() {
        let (t, p, r, w, h) = board_from(&["..."]);
        let b = view(&t, &p, &r, w, h);
        assert_eq!(b.tile_at(Cell::new(-1, 0)), Tile::Wall);
        assert_eq!(b.tile_at(Cell::new(0, -1)), Tile::Wall);
        assert_eq!(b.tile_at(Cell::new(3, 0)), Tile::Wall);
        assert_eq!(b.tile_at(Cell::new(1, 0)), Tile::Empty);
    }

    #[test]
    fn rows_are_bottom_up() {
        let (t, p, r, w, h) = board_from(&[
            "G..",
            "===",
        ]);
        let b = view(&t, &p, &r, w, h);
        assert_eq!(b.tile_at(Cell::new(0, 1)), Tile::Goal);
        assert_eq!(b.tile_at(Cell::new(0, 0)), Tile::Ground);
    }

    // ── footing ──

    #[test]
    fn footing_on_ground_is_safe() {
        let (t, p, r, w, h) = board_from(&[
            "...",
            "===",
        ]);
        let b = view(&t, &p, &r, w, h);
        let s = snake_at(&[(1, 1)]);
        assert_eq!(b.footing_below(Cell::new(1, 1), &s), Footing::Safe);
        assert!(b.snake_supported(&s));
    }

    #[test]
    fn bottom_edge_is_safe() {
        let (t, p, r, w, h) = board_from(&["..."]);
        let b = view(&t, &p, &r, w, h);
        let s = snake_at(&[(1, 0)]);
        assert_eq!(b.footing_below(Cell::new(1, 0), &s), Footing::Safe);
    }

    #[test]
    fn footing_on_hazard() {
        let (t, p, r, w, h) = board_from(&[
            "...",
            ".^.",
        ]);
        let b = view(&t, &p, &r, w, h);
        let s = snake_at(&[(1, 1)]);
        assert_eq!(b.footing_below(Cell::new(1, 1), &s), Footing::Hazard);
        assert!(!b.snake_supported(&s));
    }

    #[test]
    fn own_body_is_not_support() {
        let (t, p, r, w, h) = board_from(&[
            "...",
            "...",
            "...",
            "###",
        ]);
        let b = view(&t, &p, &r, w, h);
        // vertical snake, head on top, tail resting on the wall
        let s = snake_at(&[(1, 3), (1, 2), (1, 1)]);
        assert_eq!(b.footing_below(Cell::new(1, 3), &s), Footing::Own);
        assert_eq!(b.footing_below(Cell::new(1, 1), &s), Footing::Safe);
        assert!(b.snake_supported(&s));
    }

    #[test]
    fn pickup_and_goal_are_support() {
        let (t, p, r, w, h) = board_from(&[
            "...",
            "A.G",
            "...",
        ]);
        let b = view(&t, &p, &r, w, h);
        let s = snake_at(&[(0, 2)]);
        assert_eq!(b.footing_below(Cell::new(0, 2), &s), Footing::Safe);
        let s = snake_at(&[(2, 2)]);
        assert_eq!(b.footing_below(Cell::new(2, 2), &s), Footing::Safe);
        let s = snake_at(&[(1, 2)]);
        assert_eq!(b.footing_below(Cell::new(1, 2), &s), Footing::Open);
    }

    #[test]
    fn rock_covers_hazard() {
        let (t, p, mut r, w, h) = board_from(&[
            "...",
            ".^.",
            "===",
        ]);
        r.push(Rock::new(0, Cell::new(1, 1)));
        let b = view(&t, &p, &r, w, h);
        let s = snake_at(&[(1, 2)]);
        assert_eq!(b.footing_below(Cell::new(1, 2), &s), Footing::Safe);
    }

    // ── rocks ──

    #[test]
    fn rock_support_sources() {
        let (t, p, r, w, h) = board_from(&[
            "R..",
            "R.R",
            "=..",
        ]);
        let b = view(&t, &p, &r, w, h);
        let empty = snake_at(&[(1, 2)]);
        // r[0] = (0,2) sits on r[1] = (0,1) which sits on ground
        assert!(b.rock_supported(0, &empty));
        assert!(b.rock_supported(1, &empty));
        // r[2] = (2,1) has nothing under it
        assert!(!b.rock_supported(2, &empty));

        let holding = snake_at(&[(2, 0), (1, 0)]);
        assert!(b.rock_supported(2, &holding));
    }

    #[test]
    fn rock_entry_rules() {
        let (t, p, r, w, h) = board_from(&[
            "R.#",
            "...",
        ]);
        let b = view(&t, &p, &r, w, h);
        let s = snake_at(&[(1, 0)]);
        assert!(b.rock_can_enter(Cell::new(1, 1), &s));
        assert!(!b.rock_can_enter(Cell::new(2, 1), &s)); // wall
        assert!(!b.rock_can_enter(Cell::new(0, 1), &s)); // rock
        assert!(!b.rock_can_enter(Cell::new(1, 0), &s)); // snake
    }
}
