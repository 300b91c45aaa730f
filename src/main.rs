/// Entry point and game loop.
///
/// Usage: `snakefall [LEVEL_FILE] [--replay SCRIPT]`
///
/// With `--replay` the script is run headless against the first level and
/// the result printed; otherwise the terminal front-end starts.

mod ui;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use snakefall::config::GameConfig;
use snakefall::sim::event::GameEvent;
use snakefall::sim::level::{self, LevelDef};
use snakefall::sim::replay::Replay;
use snakefall::sim::step;
use snakefall::sim::world::{Phase, WorldState};
use ui::gamepad::GamepadState;
use ui::input::{Action, InputState};
use ui::playback::Playback;
use ui::renderer::{Hud, Renderer};
use ui::sound::{sfx_for, SoundEngine};

#[derive(Debug, Default, PartialEq, Eq)]
struct Args {
    level_file: Option<PathBuf>,
    replay: Option<String>,
}

fn parse_args(args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut out = Args::default();
    let mut args = args;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--replay" => match args.next() {
                Some(script) => out.replay = Some(script),
                None => return Err("--replay needs a command script".into()),
            },
            flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
            path => {
                if out.level_file.is_some() {
                    return Err(format!("unexpected argument {path}"));
                }
                out.level_file = Some(PathBuf::from(path));
            }
        }
    }
    Ok(out)
}

fn main() -> ExitCode {
    // stderr is under the TUI, so stay quiet unless asked
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            eprintln!("usage: snakefall [LEVEL_FILE] [--replay SCRIPT]");
            return ExitCode::FAILURE;
        }
    };

    let config = GameConfig::load();

    let levels = match &args.level_file {
        Some(path) => match level::load_level_file(path) {
            Ok(defs) => defs,
            Err(e) => {
                eprintln!("{e}");
                return ExitCode::FAILURE;
            }
        },
        None => level::level_list(&config),
    };

    if let Some(script) = &args.replay {
        return run_replay(&levels, script, &config);
    }

    let mut session = match Session::new(levels, &config) {
        Some(s) => s,
        None => {
            eprintln!("no playable level");
            return ExitCode::FAILURE;
        }
    };

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return ExitCode::FAILURE;
    }

    let sound = SoundEngine::new();
    let result = game_loop(&mut session, &mut renderer, sound.as_ref(), &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Headless: play `script` on the first level and print what happened.
fn run_replay(levels: &[LevelDef], script: &str, config: &GameConfig) -> ExitCode {
    let replay = match Replay::parse(script) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let def = match levels.first() {
        Some(d) => d,
        None => {
            eprintln!("no level to replay on");
            return ExitCode::FAILURE;
        }
    };
    let mut world = match level::build_world(def, &config.rules) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("{}: {e}", def.name);
            return ExitCode::FAILURE;
        }
    };

    let log = replay.run(&mut world);
    for (dir, report) in replay.commands.iter().zip(&log.reports) {
        match report {
            Ok(r) => println!("{} {:?}", dir.letter(), r.outcome),
            Err(e) => println!("{} rejected: {e}", dir.letter()),
        }
    }
    println!("{}: {:?} after {} moves", world.level_name, log.phase, log.moves);
    ExitCode::SUCCESS
}

// ── Session: level list + the world being played ──

struct Session {
    levels: Vec<LevelDef>,
    index: usize,
    world: WorldState,
    message: String,
}

impl Session {
    fn new(levels: Vec<LevelDef>, config: &GameConfig) -> Option<Self> {
        let mut skipped = vec![];
        let (index, world) = levels.iter().enumerate().find_map(|(i, def)| {
            match build(def, config) {
                Ok(w) => Some((i, w)),
                Err(msg) => {
                    skipped.push(msg);
                    None
                }
            }
        })?;
        let mut session = Session { levels, index, world, message: skipped.join("; ") };
        step::start(&mut session.world);
        Some(session)
    }

    /// Move `delta` levels along the list, skipping any that fail to build.
    /// Skipped levels are reported in the message bar.
    fn switch(&mut self, delta: isize, config: &GameConfig) {
        let n = self.levels.len() as isize;
        let mut skipped = vec![];
        for k in 1..=n {
            let i = (self.index as isize + delta * k).rem_euclid(n) as usize;
            match build(&self.levels[i], config) {
                Ok(world) => {
                    self.index = i;
                    self.world = world;
                    self.message = skipped.join("; ");
                    step::start(&mut self.world);
                    return;
                }
                Err(msg) => skipped.push(msg),
            }
        }
    }

    /// Enter on an ended level: next level after a win, retry after a death.
    fn confirm(&mut self, config: &GameConfig) {
        if !self.world.phase.is_terminal() {
            return;
        }
        if self.world.phase == Phase::Won {
            self.switch(1, config);
        } else {
            self.restart();
        }
    }

    fn restart(&mut self) {
        step::restart_level(&mut self.world);
        step::start(&mut self.world);
        self.message.clear();
    }
}

fn build(def: &LevelDef, config: &GameConfig) -> Result<WorldState, String> {
    level::build_world(def, &config.rules).map_err(|e| {
        log::warn!("skipping level '{}': {e}", def.name);
        format!("skipped '{}': {e}", def.name)
    })
}

fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);
    let mut playback = Playback::new(&config.speed);
    let frame = Duration::from_millis(config.speed.frame_ms);

    loop {
        kb.drain_events();
        gp.update();
        if kb.resized {
            renderer.invalidate();
        }

        let mut actions = kb.actions();
        actions.extend(gp.actions());

        for action in actions {
            match action {
                Action::Quit => return Ok(()),
                Action::Restart => {
                    playback.clear();
                    session.restart();
                }
                Action::NextLevel => {
                    playback.clear();
                    session.switch(1, config);
                }
                Action::PrevLevel => {
                    playback.clear();
                    session.switch(-1, config);
                }
                Action::Confirm => {
                    if !playback.is_busy() {
                        session.confirm(config);
                    }
                }
                Action::Move(dir) => {
                    // Busy: the board is still catching up, drop the input
                    if playback.is_busy() || session.world.phase != Phase::Running {
                        continue;
                    }
                    let before = session.world.clone();
                    match step::step(&mut session.world, dir) {
                        Ok(report) => playback.push(&before, report.events),
                        Err(e) => log::debug!("{e}"),
                    }
                }
            }
        }

        // Absorption is paced by playback: one tick each time it drains
        if session.world.phase == Phase::Finishing && !playback.is_busy() {
            let before = session.world.clone();
            match step::finish_tick(&mut session.world) {
                Ok(events) => playback.push(&before, events),
                Err(e) => log::warn!("{e}"),
            }
        }

        let due = playback.tick(Instant::now());
        play_sounds(sound, &due);

        let hud = Hud {
            level_index: session.index,
            level_count: session.levels.len(),
            pad_connected: gp.connected,
            message: &session.message,
        };
        renderer.render(&session.world, &playback, &hud)?;

        std::thread::sleep(frame);
    }
}

fn play_sounds(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let sfx = match sound {
        Some(s) => s,
        None => return,
    };
    for sfx_kind in events.iter().filter_map(sfx_for) {
        sfx.play(sfx_kind);
    }
}
