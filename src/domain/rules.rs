/// Movement, hazard and absorption rules, truth-table driven.
///
/// Pure functions operating on a `Board` + `Snake`, no side effects.
/// These encode "what is legal" and "what happens" without performing it.
///
/// ## Step Truth Table
///
/// `target = head + dir`. The first matching row decides.
/// ┌───────────────────────────────────┬──────────────┬──────────────────┐
/// │ Condition                          │ Result       │ Notes            │
/// ├───────────────────────────────────┼──────────────┼──────────────────┤
/// │ target tile solid (wall/ground)    │ BLOCKED      │ level edge = wall│
/// │ target holds own segment (any)     │ BLOCKED      │ tail included    │
/// │ target holds rock, beyond solid    │ BLOCKED      │                  │
/// │ target holds rock, beyond rock     │ BLOCKED      │ no chained push  │
/// │ target holds rock, beyond segment  │ BLOCKED      │                  │
/// │ target holds rock, beyond free     │ PUSH + MOVE  │ rock moves 1 cell│
/// │ otherwise                          │ MOVE         │                  │
/// └───────────────────────────────────┴──────────────┴──────────────────┘
/// Pickups and hazards on `target` never block; they resolve after commit.
///
/// ## Hazard Truth Table
///
/// ┌───────────────────────────────────────────────┬────────┐
/// │ Condition                                      │ Verdict│
/// ├───────────────────────────────────────────────┼────────┤
/// │ any segment INSIDE a hazard cell               │ LETHAL │
/// │ some segment on hazard, NO segment on safe     │ LETHAL │
/// │ some segment on hazard, some segment on safe   │ SAFE   │
/// │ no hazard contact                              │ SAFE   │
/// └───────────────────────────────────────────────┴────────┘
/// One safely supported segment anywhere protects the whole body.
///
/// ## Gravity
///
/// The snake falls one cell iff NO segment has `Footing::Safe`.
/// A rock falls one cell iff `Board::rock_supported` is false.

use super::entity::{Cell, MoveDir, Snake, ABSORB_RADIUS};
use super::physics::{Board, Footing};

/// Why a step was refused.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum BlockReason {
    /// Wall or ground in the way.
    Terrain,
    /// The snake's own body is in the way.
    Body,
    /// A rock is in the way and cannot move further.
    RockStuck { rock_id: usize },
}

/// How the snake died.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DeathCause {
    /// A segment occupies a hazard cell.
    Impaled { cell: Cell },
    /// A segment rests on a hazard with no safe footing anywhere.
    Spiked { cell: Cell },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum HazardVerdict {
    Safe,
    Lethal(DeathCause),
}

/// A rock displacement that accompanies a step.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Push {
    /// Index into the rock list.
    pub rock: usize,
    pub from: Cell,
    pub to: Cell,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StepPlan {
    Blocked { target: Cell, reason: BlockReason },
    Advance { target: Cell, push: Option<Push>, eats: bool },
}

// ── Step planning ──

/// Decide what a single step in `dir` would do. See truth table above.
/// An empty snake cannot step; that is reported as `Body`.
pub fn plan_step(board: &Board, snake: &Snake, dir: MoveDir) -> StepPlan {
    let head = match snake.head() {
        Some(h) => h,
        None => return StepPlan::Blocked { target: Cell::new(0, 0), reason: BlockReason::Body },
    };
    let target = head + dir;

    if board.tile_at(target).is_solid() {
        return StepPlan::Blocked { target, reason: BlockReason::Terrain };
    }
    if snake.contains(target) {
        return StepPlan::Blocked { target, reason: BlockReason::Body };
    }

    let push = match board.rock_at(target) {
        Some(idx) => {
            let beyond = target + dir;
            if !board.rock_can_enter(beyond, snake) {
                let rock_id = board.rocks[idx].id;
                return StepPlan::Blocked { target, reason: BlockReason::RockStuck { rock_id } };
            }
            Some(Push { rock: idx, from: target, to: beyond })
        }
        None => None,
    };

    StepPlan::Advance { target, push, eats: board.has_pickup(target) }
}

// ── Hazard evaluation ──

/// Evaluate hazard contact for the whole body. See truth table above.
pub fn evaluate_hazard(board: &Board, snake: &Snake) -> HazardVerdict {
    if let Some(&cell) = snake.segments.iter().find(|&&seg| board.tile_at(seg).is_hazard()) {
        return HazardVerdict::Lethal(DeathCause::Impaled { cell });
    }

    let mut contact = None;
    let mut any_safe = false;
    for &seg in &snake.segments {
        match board.footing_below(seg, snake) {
            Footing::Hazard => { contact.get_or_insert(seg); }
            Footing::Safe => any_safe = true,
            Footing::Open | Footing::Own => {}
        }
    }

    match contact {
        Some(cell) if !any_safe => HazardVerdict::Lethal(DeathCause::Spiked { cell }),
        _ => HazardVerdict::Safe,
    }
}

// ── Gravity ──

/// Does the snake stay where it is this cascade tick?
pub fn snake_supported(board: &Board, snake: &Snake) -> bool {
    board.snake_supported(snake)
}

/// Does rock `idx` stay where it is this cascade tick?
pub fn rock_supported(board: &Board, idx: usize, snake: &Snake) -> bool {
    board.rock_supported(idx, snake)
}

// ── Goal / absorption ──

/// Is `cell` inside the goal (closer than half a step)?
pub fn inside_goal(cell: Cell, goal: Cell) -> bool {
    cell.distance_to(goal) < ABSORB_RADIUS
}

/// One discrete step from `from` toward `goal` along the dominant axis.
/// Ties go vertical. `None` when already there.
pub fn absorb_direction(from: Cell, goal: Cell) -> Option<MoveDir> {
    let dx = goal.x - from.x;
    let dy = goal.y - from.y;
    if dx == 0 && dy == 0 {
        return None;
    }
    if dx.abs() > dy.abs() {
        Some(if dx > 0 { MoveDir::Right } else { MoveDir::Left })
    } else {
        Some(if dy > 0 { MoveDir::Up } else { MoveDir::Down })
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use crate::domain::entity::Rock;
    use crate::domain::tile::Tile;

    /// Helper: build terrain + occupancy from a diagram, top row first.
    /// Legend: '#'=Wall '='=Ground '^'=Hazard 'G'=Goal 'A'=pickup 'R'=rock
    ///         '0'..'9' = snake segment index (0 = head)
    struct Fixture {
        tiles: Vec<Vec<Tile>>,
        pickups: HashMap<Cell, usize>,
        rocks: Vec<Rock>,
        snake: Snake,
        width: usize,
        height: usize,
    }

    impl Fixture {
        fn new(rows: &[&str]) -> Self {
            let height = rows.len();
            let width = rows[0].len();
            let mut tiles = vec![vec![Tile::Empty; width]; height];
            let mut pickups = HashMap::new();
            let mut rocks = vec![];
            let mut segs: Vec<(u32, Cell)> = vec![];
            for (row_idx, row) in rows.iter().enumerate() {
                let y = height - 1 - row_idx;
                for (x, ch) in row.chars().enumerate() {
                    let cell = Cell::new(x as i32, y as i32);
                    match ch {
                        '#' => tiles[y][x] = Tile::Wall,
                        '=' => tiles[y][x] = Tile::Ground,
                        '^' => tiles[y][x] = Tile::Hazard,
                        'G' => tiles[y][x] = Tile::Goal,
                        'A' => { pickups.insert(cell, pickups.len()); }
                        'R' => rocks.push(Rock::new(rocks.len(), cell)),
                        d if d.is_ascii_digit() => segs.push((d.to_digit(10).unwrap_or(0), cell)),
                        _ => {}
                    }
                }
            }
            segs.sort();
            let mut snake = Snake::new(segs[0].1, 1, MoveDir::Right);
            for &(_, c) in &segs[1..] {
                snake.segments.push_back(c);
            }
            Fixture { tiles, pickups, rocks, snake, width, height }
        }

        fn board(&self) -> Board<'_> {
            Board {
                tiles: &self.tiles,
                width: self.width,
                height: self.height,
                pickups: &self.pickups,
                rocks: &self.rocks,
            }
        }
    }

    // ── plan_step ──

    #[test]
    fn plain_move() {
        let f = Fixture::new(&[
            "210..",
            "=====",
        ]);
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Right);
        assert_eq!(plan, StepPlan::Advance { target: Cell::new(3, 1), push: None, eats: false });
    }

    #[test]
    fn wall_blocks() {
        let f = Fixture::new(&[
            "210#",
            "====",
        ]);
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Right);
        assert!(matches!(plan, StepPlan::Blocked { reason: BlockReason::Terrain, .. }));
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Down);
        assert!(matches!(plan, StepPlan::Blocked { reason: BlockReason::Terrain, .. }));
    }

    #[test]
    fn level_edge_blocks() {
        let f = Fixture::new(&["012"]);
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Left);
        assert!(matches!(plan, StepPlan::Blocked { reason: BlockReason::Terrain, .. }));
    }

    #[test]
    fn own_body_blocks_including_tail() {
        let f = Fixture::new(&[
            "01.",
            "32.",
            "===",
        ]);
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Down);
        assert_eq!(plan, StepPlan::Blocked { target: Cell::new(0, 1), reason: BlockReason::Body });
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Right);
        assert_eq!(plan, StepPlan::Blocked { target: Cell::new(1, 2), reason: BlockReason::Body });
    }

    #[test]
    fn pickup_and_hazard_do_not_block() {
        let f = Fixture::new(&[
            "10A",
            "=^=",
        ]);
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Right);
        assert_eq!(plan, StepPlan::Advance { target: Cell::new(2, 1), push: None, eats: true });
    }

    #[test]
    fn push_rock_into_free_cell() {
        let f = Fixture::new(&[
            "10R.",
            "====",
        ]);
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Right);
        assert_eq!(plan, StepPlan::Advance {
            target: Cell::new(2, 1),
            push: Some(Push { rock: 0, from: Cell::new(2, 1), to: Cell::new(3, 1) }),
            eats: false,
        });
    }

    #[test]
    fn chained_rocks_block() {
        let f = Fixture::new(&[
            "10RR.",
            "=====",
        ]);
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Right);
        assert_eq!(plan, StepPlan::Blocked {
            target: Cell::new(2, 1),
            reason: BlockReason::RockStuck { rock_id: 0 },
        });
    }

    #[test]
    fn rock_against_wall_blocks() {
        let f = Fixture::new(&[
            "10R#",
            "====",
        ]);
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Right);
        assert!(matches!(plan, StepPlan::Blocked { reason: BlockReason::RockStuck { .. }, .. }));
    }

    #[test]
    fn rock_against_own_body_blocks() {
        let f = Fixture::new(&[
            ".R0",
            ".21",
            "===",
        ]);
        // head at (2,2), rock at (1,2); pushing left would put the rock at (0,2): free
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Left);
        assert!(matches!(plan, StepPlan::Advance { push: Some(_), .. }));

        let f = Fixture::new(&[
            "4R0",
            "321",
            "===",
        ]);
        let plan = plan_step(&f.board(), &f.snake, MoveDir::Left);
        assert!(matches!(plan, StepPlan::Blocked { reason: BlockReason::RockStuck { .. }, .. }));
    }

    // ── evaluate_hazard ──

    #[test]
    fn hazard_contact_without_safe_support_is_lethal() {
        let f = Fixture::new(&[
            "210",
            "^^.",
            "...",
        ]);
        assert_eq!(
            evaluate_hazard(&f.board(), &f.snake),
            HazardVerdict::Lethal(DeathCause::Spiked { cell: Cell::new(1, 2) }),
        );
    }

    #[test]
    fn one_safe_segment_protects_the_whole_body() {
        let f = Fixture::new(&[
            "210",
            "^^=",
        ]);
        assert_eq!(evaluate_hazard(&f.board(), &f.snake), HazardVerdict::Safe);
    }

    #[test]
    fn pickup_footing_protects() {
        let f = Fixture::new(&[
            "210",
            "^A.",
        ]);
        assert_eq!(evaluate_hazard(&f.board(), &f.snake), HazardVerdict::Safe);
    }

    #[test]
    fn segment_inside_hazard_is_lethal_regardless() {
        let mut f = Fixture::new(&[
            "...",
            "10.",
            "===",
        ]);
        f.tiles[1][0] = Tile::Hazard; // the tail's own cell
        assert_eq!(
            evaluate_hazard(&f.board(), &f.snake),
            HazardVerdict::Lethal(DeathCause::Impaled { cell: Cell::new(0, 1) }),
        );
    }

    #[test]
    fn no_contact_is_safe_even_unsupported() {
        let f = Fixture::new(&[
            "10.",
            "...",
            "...",
        ]);
        assert_eq!(evaluate_hazard(&f.board(), &f.snake), HazardVerdict::Safe);
    }

    // ── gravity ──

    #[test]
    fn snake_on_rock_is_supported() {
        let f = Fixture::new(&[
            "10.",
            "R..",
            "...",
        ]);
        assert!(snake_supported(&f.board(), &f.snake));
        assert!(!rock_supported(&f.board(), 0, &f.snake));
    }

    #[test]
    fn rock_on_snake_is_supported() {
        let f = Fixture::new(&[
            ".R.",
            "10.",
            "===",
        ]);
        assert!(rock_supported(&f.board(), 0, &f.snake));
        assert!(snake_supported(&f.board(), &f.snake));
    }

    // ── absorption ──

    #[test]
    fn absorb_direction_dominant_axis() {
        let g = Cell::new(5, 5);
        assert_eq!(absorb_direction(Cell::new(5, 5), g), None);
        assert_eq!(absorb_direction(Cell::new(4, 5), g), Some(MoveDir::Right));
        assert_eq!(absorb_direction(Cell::new(5, 7), g), Some(MoveDir::Down));
        assert_eq!(absorb_direction(Cell::new(2, 4), g), Some(MoveDir::Right));
        // tie → vertical
        assert_eq!(absorb_direction(Cell::new(4, 4), g), Some(MoveDir::Up));
    }

    #[test]
    fn inside_goal_only_on_the_cell() {
        let g = Cell::new(1, 1);
        assert!(inside_goal(g, g));
        assert!(!inside_goal(Cell::new(1, 2), g));
    }
}
