/// Deterministic replay of a command script.
///
/// A script is a string of direction letters (`U D L R`, case-insensitive);
/// whitespace is ignored, so scripts can be wrapped or grouped:
///
/// ```text
/// RRR U LLLL
/// ```
///
/// Running a replay starts the world if needed, applies every command in
/// order, records each report (rejections included), and drives the
/// finishing sequence to the end if the level was reached.

use thiserror::Error;

use crate::domain::entity::MoveDir;
use super::event::{CommandError, GameEvent, StepReport};
use super::step;
use super::world::{Phase, WorldState};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("unknown command '{ch}' at position {pos}")]
    UnknownCommand { ch: char, pos: usize },
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Replay {
    pub commands: Vec<MoveDir>,
}

/// Everything a replay produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplayLog {
    pub start_events: Vec<GameEvent>,
    pub reports: Vec<Result<StepReport, CommandError>>,
    pub finish_events: Vec<GameEvent>,
    pub phase: Phase,
    pub moves: u32,
}

impl ReplayLog {
    /// Every event in the order it happened.
    pub fn events(&self) -> impl Iterator<Item = &GameEvent> {
        self.start_events
            .iter()
            .chain(self.reports.iter().flat_map(|r| r.iter().flat_map(|rep| rep.events.iter())))
            .chain(self.finish_events.iter())
    }
}

impl Replay {
    pub fn parse(script: &str) -> Result<Self, ReplayError> {
        let mut commands = vec![];
        for (pos, ch) in script.chars().enumerate() {
            if ch.is_whitespace() {
                continue;
            }
            match MoveDir::from_letter(ch) {
                Some(dir) => commands.push(dir),
                None => return Err(ReplayError::UnknownCommand { ch, pos }),
            }
        }
        Ok(Replay { commands })
    }

    pub fn to_script(&self) -> String {
        self.commands.iter().map(|d| d.letter()).collect()
    }

    pub fn run(&self, world: &mut WorldState) -> ReplayLog {
        let start_events = step::start(world);
        let reports: Vec<_> = self.commands.iter().map(|&dir| step::step(world, dir)).collect();

        let finish_events = if world.phase == Phase::Finishing {
            step::finish_all(world).unwrap_or_default()
        } else {
            vec![]
        };

        log::debug!(
            "replayed {} commands: {:?} after {} moves",
            self.commands.len(), world.phase, world.moves,
        );

        ReplayLog {
            start_events,
            reports,
            finish_events,
            phase: world.phase,
            moves: world.moves,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RulesConfig;
    use crate::sim::event::StepOutcome;
    use crate::sim::level::{build_world, embedded_levels, parse_level};

    fn world(text: &str) -> WorldState {
        build_world(&parse_level(text).unwrap(), &RulesConfig::default()).unwrap()
    }

    #[test]
    fn parse_ignores_whitespace_and_case() {
        let r = Replay::parse("rr U\n l").unwrap();
        assert_eq!(r.commands, vec![MoveDir::Right, MoveDir::Right, MoveDir::Up, MoveDir::Left]);
        assert_eq!(r.to_script(), "RRUL");
    }

    #[test]
    fn parse_rejects_unknown_letters() {
        assert_eq!(
            Replay::parse("RRX").unwrap_err(),
            ReplayError::UnknownCommand { ch: 'X', pos: 2 },
        );
    }

    #[test]
    fn corridor_replay_wins() {
        let mut w = world("@ length=1\nP...G\n");
        let log = Replay::parse("RRRR").unwrap().run(&mut w);
        assert_eq!(log.phase, Phase::Won);
        assert_eq!(log.moves, 4);
        let outcomes: Vec<_> = log.reports.iter().map(|r| r.as_ref().unwrap().outcome).collect();
        assert_eq!(outcomes, vec![
            StepOutcome::Moved { grew: false },
            StepOutcome::Moved { grew: false },
            StepOutcome::Moved { grew: false },
            StepOutcome::GoalEntered,
        ]);
        assert_eq!(log.events().last(), Some(&GameEvent::Won));
    }

    #[test]
    fn commands_after_the_end_are_rejected() {
        let mut w = world("@ length=1\nP.G\n");
        let log = Replay::parse("RRR").unwrap().run(&mut w);
        assert_eq!(log.reports[2], Err(CommandError::NotRunning(Phase::Finishing)));
        assert_eq!(log.phase, Phase::Won);
    }

    #[test]
    fn first_level_solution() {
        let mut w = build_world(&embedded_levels()[0], &RulesConfig::default()).unwrap();
        let log = Replay::parse("RRRRRRRR").unwrap().run(&mut w);
        assert_eq!(log.phase, Phase::Won);
    }

    #[test]
    fn replay_is_deterministic() {
        let script = Replay::parse("RRRURRDRRRLLRRRRRRRR").unwrap();
        for def in embedded_levels() {
            let mut a = build_world(&def, &RulesConfig::default()).unwrap();
            let mut b = a.clone();
            let first = script.run(&mut a);
            let second = script.run(&mut b);
            assert_eq!(first, second, "replay diverged on {}", def.name);
            assert_eq!(a, b);
        }
    }
}
