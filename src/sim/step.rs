/// The step function: resolves one directional command completely.
///
/// Processing order:
///   1. Phase guard (only Running accepts commands)
///   2. Movement plan (blocked → report and stop, nothing mutated)
///   3. Push commit (rock moves one cell)
///   4. Movement commit (follow-the-leader)
///   5. Growth (pickup on the target cell)
///   6. Hazard check
///   7. Goal check
///   8. Gravity cascade to a fixpoint, hazard + goal rechecked after every drop
///
/// Rule queries live in `domain::rules` (pure). This module only commits
/// what they decide and records events for the presentation layer.
///
/// The finishing sequence is driven separately by `finish_tick`, one
/// absorbed segment per call, so a front-end can pace it.

use crate::domain::entity::{Cell, MoveDir};
use crate::domain::rules::{self, HazardVerdict, Push, StepPlan};
use super::event::{Cascade, CommandError, GameEvent, StepOutcome, StepReport};
use super::world::{Phase, WorldState};

// ══════════════════════════════════════════════════════════════
// Lifecycle
// ══════════════════════════════════════════════════════════════

/// NotStarted → Running, then settle the level. A body spawned over a
/// hazard with nothing safe under it dies here.
pub fn start(world: &mut WorldState) -> Vec<GameEvent> {
    let mut events = vec![];
    if world.phase != Phase::NotStarted {
        return events;
    }
    world.phase = Phase::Running;
    log::info!("level '{}' started", world.level_name);

    if !resolve_terminal(world, &mut events) {
        settle(world, &mut events);
    }
    events
}

/// Rebuild the level's start configuration. Phase returns to NotStarted.
pub fn restart_level(world: &mut WorldState) {
    world.snake = world.start.snake.clone();
    world.pickups = world.start.pickups.clone();
    world.rocks = world.start.rocks.clone();
    world.pickups_total = world.pickups.len();
    world.phase = Phase::NotStarted;
    world.finish_goal = None;
    world.moves = 0;
    log::info!("level '{}' restarted", world.level_name);
}

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut WorldState, dir: MoveDir) -> Result<StepReport, CommandError> {
    if world.phase != Phase::Running {
        return Err(CommandError::NotRunning(world.phase));
    }

    let mut events = Vec::new();
    let head = match world.snake.head() {
        Some(h) => h,
        None => return Err(CommandError::NotRunning(world.phase)),
    };

    let (target, push, eats) = match rules::plan_step(&world.board(), &world.snake, dir) {
        StepPlan::Blocked { target, reason } => {
            log::debug!("{dir:?} from {head} blocked at {target}: {reason:?}");
            events.push(GameEvent::Blocked { head, target, reason });
            return Ok(StepReport { outcome: StepOutcome::Blocked(reason), events });
        }
        StepPlan::Advance { target, push, eats } => (target, push, eats),
    };

    world.snake.facing = dir;
    resolve_push(world, push, &mut events);
    let vacated = world.snake.advance(target);
    world.moves += 1;

    // Moved carries the body after growth, so it is emitted after it
    let mut growth = vec![];
    let grew = eats && resolve_growth(world, target, vacated, &mut growth);
    events.push(GameEvent::Moved { from: head, to: target, segments: world.snake.cells() });
    events.append(&mut growth);
    log::debug!("{dir:?}: {head} -> {target}");

    if !resolve_terminal(world, &mut events) {
        settle(world, &mut events);
    }

    let outcome = terminal_outcome(&events).unwrap_or(StepOutcome::Moved { grew });
    Ok(StepReport { outcome, events })
}

/// `step` for a raw vector command. Non-unit vectors are rejected.
pub fn step_vector(world: &mut WorldState, dx: i32, dy: i32) -> Result<StepReport, CommandError> {
    let dir = MoveDir::from_vector(dx, dy)?;
    step(world, dir)
}

/// Pure form: run `dir` against a copy and return the copy.
pub fn simulate(world: &WorldState, dir: MoveDir) -> (WorldState, Result<StepReport, CommandError>) {
    let mut next = world.clone();
    let result = step(&mut next, dir);
    (next, result)
}

// ══════════════════════════════════════════════════════════════
// Push / growth
// ══════════════════════════════════════════════════════════════

fn resolve_push(world: &mut WorldState, push: Option<Push>, events: &mut Vec<GameEvent>) {
    let push = match push { Some(p) => p, None => return };
    let rock = &mut world.rocks[push.rock];
    rock.cell = push.to;
    events.push(GameEvent::RockPushed { id: rock.id, from: push.from, to: push.to });
}

/// Eat the pickup at `target` and keep the vacated tail cell.
fn resolve_growth(
    world: &mut WorldState,
    target: Cell,
    vacated: Option<Cell>,
    events: &mut Vec<GameEvent>,
) -> bool {
    if world.pickups.remove(&target).is_none() {
        return false;
    }
    events.push(GameEvent::PickupEaten { cell: target, remaining: world.pickups.len() });
    if let Some(tail) = vacated {
        world.snake.regrow(tail);
    }
    events.push(GameEvent::Grew { length: world.snake.len() });
    log::debug!("ate pickup at {target}, length {}", world.snake.len());
    true
}

// ══════════════════════════════════════════════════════════════
// Hazard / goal
// ══════════════════════════════════════════════════════════════

/// Hazard check, then goal check. True if the level left Running.
fn resolve_terminal(world: &mut WorldState, events: &mut Vec<GameEvent>) -> bool {
    if let HazardVerdict::Lethal(cause) = rules::evaluate_hazard(&world.board(), &world.snake) {
        world.phase = Phase::Dead;
        events.push(GameEvent::Died { cause, segments: world.snake.cells() });
        log::info!("snake died: {cause:?}");
        return true;
    }

    let head = match world.snake.head() { Some(h) => h, None => return false };
    if world.terrain_at(head).is_goal() && world.goal_open() {
        world.phase = Phase::Finishing;
        world.finish_goal = Some(head);
        events.push(GameEvent::GoalEntered { goal: head });
        log::info!("goal entered at {head} after {} moves", world.moves);
        return true;
    }
    false
}

fn terminal_outcome(events: &[GameEvent]) -> Option<StepOutcome> {
    events.iter().rev().find_map(|e| match e {
        GameEvent::Died { cause, .. } => Some(StepOutcome::Died(*cause)),
        GameEvent::GoalEntered { .. } => Some(StepOutcome::GoalEntered),
        _ => None,
    })
}

// ══════════════════════════════════════════════════════════════
// Gravity
// ══════════════════════════════════════════════════════════════

/// One gravity tick: every unsupported rock drops one cell (lowest first),
/// then the snake drops one cell if it is Running and unsupported.
/// Hazards and goals are rechecked after each of the two.
pub fn cascade_once(world: &mut WorldState, events: &mut Vec<GameEvent>) -> Cascade {
    let mut moved = false;

    let mut order: Vec<usize> = (0..world.rocks.len()).collect();
    order.sort_by_key(|&i| (world.rocks[i].cell.y, world.rocks[i].cell.x));
    for i in order {
        if rules::rock_supported(&world.board(), i, &world.snake) {
            continue;
        }
        let from = world.rocks[i].cell;
        let to = from.below();
        world.rocks[i].cell = to;
        events.push(GameEvent::RockFell { id: world.rocks[i].id, from, to });
        moved = true;
    }

    // A rock dropping away can leave the body resting only on spikes
    if moved && world.phase == Phase::Running && resolve_terminal(world, events) {
        return Cascade::Interrupted;
    }

    if world.phase == Phase::Running && !rules::snake_supported(&world.board(), &world.snake) {
        world.snake.translate(MoveDir::Down);
        events.push(GameEvent::Fell { segments: world.snake.cells() });
        moved = true;
        if resolve_terminal(world, events) {
            return Cascade::Interrupted;
        }
    }

    if moved { Cascade::Fell } else { Cascade::Settled }
}

/// Cascade until nothing moves or the level ends. Every drop lowers
/// something by a cell and the level has a floor, so this terminates.
fn settle(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    while cascade_once(world, events) == Cascade::Fell {}
}

// ══════════════════════════════════════════════════════════════
// Finishing sequence
// ══════════════════════════════════════════════════════════════

/// Absorb exactly one segment. The remaining body first walks toward the
/// goal (follow-the-leader) until its head is inside it.
pub fn finish_tick(world: &mut WorldState) -> Result<Vec<GameEvent>, CommandError> {
    if world.phase != Phase::Finishing {
        return Err(CommandError::NotFinishing(world.phase));
    }
    let mut events = vec![];
    let goal = match world.finish_goal.or_else(|| world.snake.head()) {
        Some(g) => g,
        None => return Ok(win(world, events)),
    };

    let mut budget = world.width + world.height;
    while let Some(head) = world.snake.head() {
        if rules::inside_goal(head, goal) || budget == 0 {
            break;
        }
        let dir = match rules::absorb_direction(head, goal) { Some(d) => d, None => break };
        world.snake.advance(head + dir);
        world.snake.facing = dir;
        events.push(GameEvent::AbsorbShift { segments: world.snake.cells() });
        budget -= 1;
    }

    if let Some(cell) = world.snake.absorb_head() {
        events.push(GameEvent::SegmentAbsorbed { cell, remaining: world.snake.len() });
        log::debug!("absorbed segment at {cell}, {} left", world.snake.len());
    }

    if world.snake.is_empty() {
        return Ok(win(world, events));
    }
    // Rocks stay put until the body is gone; the goal cell is reserved for it
    Ok(events)
}

/// Won, then let rocks that rested on the body come down.
fn win(world: &mut WorldState, mut events: Vec<GameEvent>) -> Vec<GameEvent> {
    world.phase = Phase::Won;
    settle(world, &mut events);
    events.push(GameEvent::Won);
    log::info!("level '{}' won in {} moves", world.level_name, world.moves);
    events
}

/// Drive `finish_tick` until the level is won.
pub fn finish_all(world: &mut WorldState) -> Result<Vec<GameEvent>, CommandError> {
    let mut events = finish_tick(world)?;
    while world.phase == Phase::Finishing {
        events.extend(finish_tick(world)?);
    }
    Ok(events)
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════
