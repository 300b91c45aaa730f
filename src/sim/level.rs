/// Level loader with pack support.
///
/// ## Sources (priority order):
///   1. A file named on the command line (`.txt` level or `.slp` pack)
///   2. Built-in embedded levels
///   3. `levels/` directory (individual `.txt` files and `.slp` packs)
///
/// ## Pack format (`.slp`, Snakefall Level Pack):
///   ```text
///   ## Pack Name
///   ## Author: name
///   ---
///   # Level 1 - Name
///   @ length=2 facing=left
///   <map rows>
///   ---
///   # Level 2 - Name
///   <map rows>
///   ```
///
/// Levels are separated by a line containing only `---`.
/// Lines starting with `##` are comments.
///
/// ## Single-level format (`.txt`):
///   Line 1: `# Level Name`
///   Optional: `@ length=N facing=up|down|left|right`
///   Lines: map rows, top of the level first. The LAST row is y = 0.
///
/// ## Tile legend:
///   '#' = Wall        '=' = Ground
///   '^' = Hazard      'G' = Goal
///   'P' = Spawn (head of the snake)
///   'A' = Pickup      'R' = Rock
///   '.' / ' ' = Empty

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{GameConfig, RulesConfig};
use crate::domain::entity::{BodyDefect, Cell, MoveDir, Rock, Snake};
use crate::domain::tile::Tile;
use crate::sim::world::{StartConfig, WorldState};

/// Runtime level data (owned strings, loaded from file or embedded).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelDef {
    pub name: String,
    /// Map rows, top of the level first.
    pub rows: Vec<String>,
    /// Overrides `rules.initial_length`.
    pub length: Option<usize>,
    pub facing: Option<MoveDir>,
}

/// A level that cannot be played. Raised at load time; the engine never
/// starts a world that failed these checks.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LevelError {
    #[error("level has no map rows")]
    Empty,
    #[error("unknown tile '{ch}' at row {row}, column {col}")]
    UnknownTile { ch: char, row: usize, col: usize },
    #[error("bad metadata `{0}`")]
    BadMetadata(String),
    #[error("level has no spawn ('P')")]
    MissingSpawn,
    #[error("level has {0} spawns; exactly one is required")]
    MultipleSpawns(usize),
    #[error("level has no goal ('G')")]
    MissingGoal,
    #[error("initial length must be at least 1")]
    ZeroLength,
    #[error("initial body leaves the level at {0}")]
    BodyOutOfBounds(Cell),
    #[error("initial body overlaps {tile:?} at {cell}")]
    BodyOnTerrain { cell: Cell, tile: Tile },
    #[error("initial body overlaps a rock or pickup at {0}")]
    BodyOnOccupant(Cell),
    #[error("initial body is malformed: {0}")]
    Body(#[from] BodyDefect),
    #[error("could not read {path}: {message}")]
    Io { path: String, message: String },
}

// ══════════════════════════════════════════════════════════════
// Single-level parsing
// ══════════════════════════════════════════════════════════════

/// Parse a single level from text content.
pub fn parse_level(content: &str) -> Result<LevelDef, LevelError> {
    let mut name = String::new();
    let mut rows: Vec<String> = vec![];
    let mut length = None;
    let mut facing = None;

    for line in content.lines() {
        let line = line.trim_end();
        if line.starts_with("##") {
            continue;
        }
        if rows.is_empty() && name.is_empty() && is_name_line(line) {
            name = line[1..].trim().to_string();
        } else if let Some(meta) = line.strip_prefix("@ ") {
            parse_metadata(meta, &mut length, &mut facing)?;
        } else if rows.is_empty() && line.trim().is_empty() {
            // leading blank lines
        } else {
            rows.push(line.to_string());
        }
    }

    while rows.last().map_or(false, |r| r.trim().is_empty()) {
        rows.pop();
    }

    if rows.is_empty() {
        return Err(LevelError::Empty);
    }

    let max_width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    for row in &mut rows {
        let w = row.chars().count();
        if w < max_width {
            row.extend(std::iter::repeat('.').take(max_width - w));
        }
    }

    if name.is_empty() {
        name = "Unnamed Level".to_string();
    }

    Ok(LevelDef { name, rows, length, facing })
}

/// Distinguish `# Level Name` from `#..P..G#` (level data).
/// A name line starts with `#` and contains something that is not a tile.
fn is_name_line(line: &str) -> bool {
    match line.strip_prefix('#') {
        Some(rest) => rest.chars().any(|c| !c.is_whitespace() && tile_symbol(c).is_none()),
        None => false,
    }
}

fn parse_metadata(
    meta: &str,
    length: &mut Option<usize>,
    facing: &mut Option<MoveDir>,
) -> Result<(), LevelError> {
    for pair in meta.split_whitespace() {
        let bad = || LevelError::BadMetadata(pair.to_string());
        let (key, value) = pair.split_once('=').ok_or_else(bad)?;
        match key {
            "length" => *length = Some(value.parse::<usize>().map_err(|_| bad())?),
            "facing" => *facing = Some(MoveDir::from_name(value).ok_or_else(bad)?),
            _ => return Err(bad()),
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════
// Pack parsing
// ══════════════════════════════════════════════════════════════

/// Parse every level of a `.slp` pack. Sections holding only comments are
/// skipped; a text with no `---` is a single level.
pub fn parse_pack(content: &str) -> Vec<Result<LevelDef, LevelError>> {
    let mut sections: Vec<String> = vec![String::new()];
    for line in content.lines() {
        if line.trim() == "---" {
            sections.push(String::new());
            continue;
        }
        if let Some(current) = sections.last_mut() {
            current.push_str(line);
            current.push('\n');
        }
    }

    sections
        .iter()
        .filter(|s| s.lines().any(|l| !l.trim().is_empty() && !l.trim_start().starts_with("##")))
        .map(|s| parse_level(s))
        .collect()
}

// ══════════════════════════════════════════════════════════════
// World construction
// ══════════════════════════════════════════════════════════════

/// What a level character places. Spawn and occupants sit on Empty terrain.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Symbol {
    Terrain(Tile),
    Spawn,
    Pickup,
    Rock,
}

fn tile_symbol(ch: char) -> Option<Symbol> {
    match ch {
        '#' => Some(Symbol::Terrain(Tile::Wall)),
        '=' => Some(Symbol::Terrain(Tile::Ground)),
        '^' => Some(Symbol::Terrain(Tile::Hazard)),
        'G' => Some(Symbol::Terrain(Tile::Goal)),
        '.' | ' ' => Some(Symbol::Terrain(Tile::Empty)),
        'P' => Some(Symbol::Spawn),
        'A' => Some(Symbol::Pickup),
        'R' => Some(Symbol::Rock),
        _ => None,
    }
}

/// Build a world from a level definition, validating everything the rule
/// engine relies on. The result is NotStarted.
pub fn build_world(def: &LevelDef, rules: &RulesConfig) -> Result<WorldState, LevelError> {
    let height = def.rows.len();
    let width = def.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    if height == 0 || width == 0 {
        return Err(LevelError::Empty);
    }

    let mut tiles = vec![vec![Tile::Empty; width]; height];
    let mut pickups = HashMap::new();
    let mut rocks = vec![];
    let mut spawns = vec![];
    let mut goals = 0;

    for (row_idx, row) in def.rows.iter().enumerate() {
        let y = height - 1 - row_idx;
        for (x, ch) in row.chars().enumerate() {
            let cell = Cell::new(x as i32, y as i32);
            match tile_symbol(ch) {
                Some(Symbol::Terrain(tile)) => {
                    if tile.is_goal() {
                        goals += 1;
                    }
                    tiles[y][x] = tile;
                }
                Some(Symbol::Spawn) => spawns.push(cell),
                Some(Symbol::Pickup) => {
                    let id = pickups.len();
                    pickups.insert(cell, id);
                }
                Some(Symbol::Rock) => rocks.push(Rock::new(rocks.len(), cell)),
                None => return Err(LevelError::UnknownTile { ch, row: row_idx, col: x }),
            }
        }
    }

    let spawn = match spawns.as_slice() {
        [] => return Err(LevelError::MissingSpawn),
        [one] => *one,
        many => return Err(LevelError::MultipleSpawns(many.len())),
    };
    if goals == 0 {
        return Err(LevelError::MissingGoal);
    }

    let length = def.length.unwrap_or(rules.initial_length);
    if length == 0 {
        return Err(LevelError::ZeroLength);
    }
    let snake = Snake::new(spawn, length, def.facing.unwrap_or(MoveDir::Right));
    snake.check_invariants()?;

    for &seg in &snake.segments {
        let in_bounds = seg.x >= 0 && seg.y >= 0
            && (seg.x as usize) < width && (seg.y as usize) < height;
        if !in_bounds {
            return Err(LevelError::BodyOutOfBounds(seg));
        }
        let tile = tiles[seg.y as usize][seg.x as usize];
        if tile != Tile::Empty {
            return Err(LevelError::BodyOnTerrain { cell: seg, tile });
        }
        if pickups.contains_key(&seg) || rocks.iter().any(|r| r.cell == seg) {
            return Err(LevelError::BodyOnOccupant(seg));
        }
    }

    log::debug!(
        "built level '{}' {}x{}: {} pickups, {} rocks, snake length {}",
        def.name, width, height, pickups.len(), rocks.len(), length,
    );

    Ok(WorldState::new(
        def.name.clone(),
        tiles,
        StartConfig { snake, pickups, rocks },
        rules.clone(),
    ))
}

// ══════════════════════════════════════════════════════════════
// File and directory loading
// ══════════════════════════════════════════════════════════════

/// Load a `.txt` level or `.slp` pack from disk. Broken levels inside a
/// pack are logged and skipped; a pack with no good level is an error.
pub fn load_level_file(path: &Path) -> Result<Vec<LevelDef>, LevelError> {
    let content = std::fs::read_to_string(path).map_err(|e| LevelError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    if is_pack(path) {
        let mut levels = vec![];
        let mut first_err = None;
        for (i, result) in parse_pack(&content).into_iter().enumerate() {
            match result {
                Ok(def) => levels.push(def),
                Err(e) => {
                    log::warn!("{} level {}: {e}", path.display(), i + 1);
                    first_err.get_or_insert(e);
                }
            }
        }
        if levels.is_empty() {
            return Err(first_err.unwrap_or(LevelError::Empty));
        }
        Ok(levels)
    } else {
        parse_level(&content).map(|def| vec![def])
    }
}

fn is_pack(path: &Path) -> bool {
    path.extension().map_or(false, |e| e == "slp")
}

/// Every `.txt` level and `.slp` pack in `dir`, ordered by file name.
/// Returns `(file name, level)` pairs; unreadable or broken files are skipped.
pub fn load_from_directory(dir: &Path) -> Vec<(String, LevelDef)> {
    let mut results = vec![];

    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("no level directory {}: {e}", dir.display());
            return results;
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|p| p.extension().map_or(false, |e| e == "txt" || e == "slp"))
        .collect();
    paths.sort();

    for path in paths {
        let filename = path.file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();
        match load_level_file(&path) {
            Ok(defs) => results.extend(defs.into_iter().map(|def| (filename.clone(), def))),
            Err(e) => log::warn!("skipping {}: {e}", path.display()),
        }
    }

    results
}

/// The playable level list: built-in levels, then the levels directory.
pub fn level_list(config: &GameConfig) -> Vec<LevelDef> {
    let mut levels = embedded_levels();
    let from_dir = load_from_directory(&config.levels_dir);
    if !from_dir.is_empty() {
        log::info!("{} levels from {}", from_dir.len(), config.levels_dir.display());
    }
    levels.extend(from_dir.into_iter().map(|(_, def)| def));
    levels
}

// ══════════════════════════════════════════════════════════════
// Embedded levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        make_embedded("Level 1 - First Steps", None, &[
            ".............",
            "..P.......G..",
            "=============",
        ]),
        make_embedded("Level 2 - Apple Bridge", None, &[
            "..............",
            "..P...A....G..",
            "=====...======",
        ]),
        make_embedded("Level 3 - Spike Pit", None, &[
            ".................",
            "..P.A.........G..",
            "======^^^========",
        ]),
        make_embedded("Level 4 - Rock Step", None, &[
            ".................",
            "..P.R.........G..",
            "=======..========",
        ]),
        make_embedded("Level 5 - The Drop", None, &[
            "..P.......",
            "=====.....",
            "..........",
            "..........",
            "......G...",
            "==========",
        ]),
        make_embedded("Level 6 - Long Way Down", Some(2), &[
            "#..........#",
            "#.P........#",
            "#===...R...#",
            "#......=...#",
            "#..^^^.....#",
            "#..====..G.#",
            "############",
        ]),
    ]
}

fn make_embedded(name: &str, length: Option<usize>, map: &[&str]) -> LevelDef {
    LevelDef {
        name: name.to_string(),
        rows: map.iter().map(|s| s.to_string()).collect(),
        length,
        facing: None,
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::world::Phase;

    fn rules() -> RulesConfig {
        RulesConfig::default()
    }

    #[test]
    fn parse_name_metadata_and_rows() {
        let def = parse_level("# Tiny\n@ length=1 facing=left\nP...G\n").unwrap();
        assert_eq!(def.name, "Tiny");
        assert_eq!(def.length, Some(1));
        assert_eq!(def.facing, Some(MoveDir::Left));
        assert_eq!(def.rows, vec!["P...G".to_string()]);
    }

    #[test]
    fn wall_row_is_not_a_name() {
        let def = parse_level("#P.G#\n#####\n").unwrap();
        assert_eq!(def.name, "Unnamed Level");
        assert_eq!(def.rows.len(), 2);
    }

    #[test]
    fn ragged_rows_are_padded() {
        let def = parse_level("P..G\n==\n").unwrap();
        assert_eq!(def.rows[1], "==..");
    }

    #[test]
    fn empty_text_is_an_error() {
        assert_eq!(parse_level("# Only a name\n\n"), Err(LevelError::Empty));
    }

    #[test]
    fn bad_metadata_is_an_error() {
        assert!(matches!(parse_level("@ speed=3\nP.G\n"), Err(LevelError::BadMetadata(_))));
        assert!(matches!(parse_level("@ facing=north\nP.G\n"), Err(LevelError::BadMetadata(_))));
        assert!(matches!(parse_level("@ length=x\nP.G\n"), Err(LevelError::BadMetadata(_))));
    }

    #[test]
    fn build_places_rows_bottom_up() {
        let def = parse_level("@ length=1\n..G\nPAR\n").unwrap();
        let w = build_world(&def, &rules()).unwrap();
        assert_eq!((w.width, w.height), (3, 2));
        assert_eq!(w.phase, Phase::NotStarted);
        assert_eq!(w.snake.cells(), vec![Cell::new(0, 0)]);
        assert_eq!(w.terrain_at(Cell::new(2, 1)), Tile::Goal);
        assert!(w.pickups.contains_key(&Cell::new(1, 0)));
        assert_eq!(w.rocks, vec![Rock::new(0, Cell::new(2, 0))]);
    }

    #[test]
    fn default_body_trails_opposite_facing() {
        let def = parse_level("..P.G\n=====\n").unwrap();
        let w = build_world(&def, &rules()).unwrap();
        assert_eq!(w.snake.cells(), vec![Cell::new(2, 1), Cell::new(1, 1), Cell::new(0, 1)]);
    }

    #[test]
    fn spawn_and_goal_are_required() {
        let def = parse_level("....G\n").unwrap();
        assert_eq!(build_world(&def, &rules()).unwrap_err(), LevelError::MissingSpawn);
        let def = parse_level("@ length=1\nP.P.G\n").unwrap();
        assert_eq!(build_world(&def, &rules()).unwrap_err(), LevelError::MultipleSpawns(2));
        let def = parse_level("@ length=1\nP....\n").unwrap();
        assert_eq!(build_world(&def, &rules()).unwrap_err(), LevelError::MissingGoal);
    }

    #[test]
    fn unknown_tile_is_reported_with_position() {
        let def = parse_level("@ length=1\nP.x.G\n").unwrap();
        assert_eq!(
            build_world(&def, &rules()).unwrap_err(),
            LevelError::UnknownTile { ch: 'x', row: 0, col: 2 },
        );
    }

    #[test]
    fn illegal_initial_bodies_are_refused() {
        let def = parse_level("@ length=0\nP...G\n").unwrap();
        assert_eq!(build_world(&def, &rules()).unwrap_err(), LevelError::ZeroLength);

        let def = parse_level("@ length=3\n.P..G\n").unwrap();
        assert_eq!(
            build_world(&def, &rules()).unwrap_err(),
            LevelError::BodyOutOfBounds(Cell::new(-1, 0)),
        );

        let def = parse_level("@ length=2\n#P..G\n").unwrap();
        assert!(matches!(
            build_world(&def, &rules()).unwrap_err(),
            LevelError::BodyOnTerrain { tile: Tile::Wall, .. },
        ));

        let def = parse_level("@ length=2\nGP..G\n").unwrap();
        assert!(matches!(
            build_world(&def, &rules()).unwrap_err(),
            LevelError::BodyOnTerrain { tile: Tile::Goal, .. },
        ));

        let def = parse_level("@ length=2\nRP..G\n").unwrap();
        assert_eq!(
            build_world(&def, &rules()).unwrap_err(),
            LevelError::BodyOnOccupant(Cell::new(0, 0)),
        );
    }

    #[test]
    fn pack_splits_on_separator_and_skips_header() {
        let text = "## Test Pack\n## Author: me\n---\n# One\n@ length=1\nP.G\n---\n# Two\n@ length=1\nG.P\n";
        let levels = parse_pack(text);
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].as_ref().unwrap().name, "One");
        assert_eq!(levels[1].as_ref().unwrap().name, "Two");
    }

    #[test]
    fn pack_without_separator_is_one_level() {
        let levels = parse_pack("# Solo\n@ length=1\nP.G\n");
        assert_eq!(levels.len(), 1);
        assert!(levels[0].is_ok());
    }

    #[test]
    fn every_embedded_level_builds() {
        for def in embedded_levels() {
            if let Err(e) = build_world(&def, &rules()) {
                panic!("{}: {e}", def.name);
            }
        }
    }

    #[test]
    fn missing_directory_is_empty() {
        assert!(load_from_directory(Path::new("/definitely/not/a/levels/dir")).is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_level_file(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(matches!(err, LevelError::Io { .. }));
    }
}
