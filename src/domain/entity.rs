/// Entities: Cell, MoveDir, Snake, Rock.
///
/// Coordinates are integer cells with `y` growing upward; `y = 0` is the
/// bottom row of a level. "Down" is always `(0, -1)`.

use std::collections::VecDeque;
use std::fmt;
use std::ops::Add;

use thiserror::Error;

/// Half a step: a segment closer than this to the goal is inside it.
pub const ABSORB_RADIUS: f32 = 0.5;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    /// The cell directly underneath.
    pub fn below(self) -> Cell {
        self + MoveDir::Down
    }

    /// Euclidean distance between cell centres.
    pub fn distance_to(self, other: Cell) -> f32 {
        let dx = (other.x - self.x) as f32;
        let dy = (other.y - self.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Are the two cells exactly one orthogonal step apart?
    pub fn is_adjacent(self, other: Cell) -> bool {
        (self.x - other.x).abs() + (self.y - other.y).abs() == 1
    }
}

impl Add<MoveDir> for Cell {
    type Output = Cell;

    fn add(self, dir: MoveDir) -> Cell {
        let (dx, dy) = dir.delta();
        Cell { x: self.x + dx, y: self.y + dy }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// One discrete step direction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MoveDir {
    Up,
    Down,
    Left,
    Right,
}

/// A direction request that is not one of the four unit vectors.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
#[error("({dx}, {dy}) is not an orthogonal unit step")]
pub struct InvalidDirection {
    pub dx: i32,
    pub dy: i32,
}

impl MoveDir {
    pub fn delta(self) -> (i32, i32) {
        match self {
            MoveDir::Up    => (0, 1),
            MoveDir::Down  => (0, -1),
            MoveDir::Left  => (-1, 0),
            MoveDir::Right => (1, 0),
        }
    }

    pub fn from_vector(dx: i32, dy: i32) -> Result<MoveDir, InvalidDirection> {
        match (dx, dy) {
            (0, 1)  => Ok(MoveDir::Up),
            (0, -1) => Ok(MoveDir::Down),
            (-1, 0) => Ok(MoveDir::Left),
            (1, 0)  => Ok(MoveDir::Right),
            _ => Err(InvalidDirection { dx, dy }),
        }
    }

    pub fn opposite(self) -> MoveDir {
        match self {
            MoveDir::Up    => MoveDir::Down,
            MoveDir::Down  => MoveDir::Up,
            MoveDir::Left  => MoveDir::Right,
            MoveDir::Right => MoveDir::Left,
        }
    }

    /// Script letter used by replays and level metadata.
    pub fn letter(self) -> char {
        match self {
            MoveDir::Up    => 'U',
            MoveDir::Down  => 'D',
            MoveDir::Left  => 'L',
            MoveDir::Right => 'R',
        }
    }

    pub fn from_letter(c: char) -> Option<MoveDir> {
        match c.to_ascii_uppercase() {
            'U' => Some(MoveDir::Up),
            'D' => Some(MoveDir::Down),
            'L' => Some(MoveDir::Left),
            'R' => Some(MoveDir::Right),
            _ => None,
        }
    }

    pub fn from_name(s: &str) -> Option<MoveDir> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up"    | "u" => Some(MoveDir::Up),
            "down"  | "d" => Some(MoveDir::Down),
            "left"  | "l" => Some(MoveDir::Left),
            "right" | "r" => Some(MoveDir::Right),
            _ => None,
        }
    }
}

/// Why a snake body is not a legal settled body.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Error)]
pub enum BodyDefect {
    #[error("snake has no segments")]
    Empty,
    #[error("segment {index} repeats cell {cell}")]
    Duplicate { index: usize, cell: Cell },
    #[error("segment {index} at {cell} is not adjacent to the segment ahead of it")]
    Broken { index: usize, cell: Cell },
}

/// The creature: ordered cells, head first.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Snake {
    pub segments: VecDeque<Cell>,
    /// Presentation hint only. Rules never read it.
    pub facing: MoveDir,
}

impl Snake {
    /// Head at `spawn`, body trailing straight back from `facing`.
    pub fn new(spawn: Cell, length: usize, facing: MoveDir) -> Self {
        let back = facing.opposite();
        let mut segments = VecDeque::with_capacity(length);
        let mut cell = spawn;
        for i in 0..length {
            if i > 0 { cell = cell + back; }
            segments.push_back(cell);
        }
        Snake { segments, facing }
    }

    pub fn head(&self) -> Option<Cell> {
        self.segments.front().copied()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.segments.contains(&cell)
    }

    pub fn cells(&self) -> Vec<Cell> {
        self.segments.iter().copied().collect()
    }

    /// Follow-the-leader: new head at `target`, every segment takes the
    /// place of the one ahead of it. Returns the vacated tail cell.
    pub fn advance(&mut self, target: Cell) -> Option<Cell> {
        self.segments.push_front(target);
        self.segments.pop_back()
    }

    /// Put back the cell `advance` vacated: the body is one longer and
    /// nothing behind the old head moved.
    pub fn regrow(&mut self, vacated: Cell) {
        self.segments.push_back(vacated);
    }

    /// Shift every segment by the same step (gravity).
    pub fn translate(&mut self, dir: MoveDir) {
        for seg in self.segments.iter_mut() {
            *seg = *seg + dir;
        }
    }

    /// Remove the head (goal absorption).
    pub fn absorb_head(&mut self) -> Option<Cell> {
        self.segments.pop_front()
    }

    pub fn check_invariants(&self) -> Result<(), BodyDefect> {
        if self.segments.is_empty() {
            return Err(BodyDefect::Empty);
        }
        for (i, &cell) in self.segments.iter().enumerate() {
            if self.segments.iter().take(i).any(|&c| c == cell) {
                return Err(BodyDefect::Duplicate { index: i, cell });
            }
            if i > 0 && !self.segments[i - 1].is_adjacent(cell) {
                return Err(BodyDefect::Broken { index: i, cell });
            }
        }
        Ok(())
    }
}

/// A pushable rock.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Rock {
    pub id: usize,
    pub cell: Cell,
}

impl Rock {
    pub fn new(id: usize, cell: Cell) -> Self {
        Rock { id, cell }
    }
}
