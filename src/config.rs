/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::{Path, PathBuf};

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub speed: SpeedConfig,
    pub rules: RulesConfig,
    pub gamepad: GamepadConfig,
    pub levels_dir: PathBuf,
}

/// Presentation cadence. The rule engine never reads these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeedConfig {
    pub frame_ms: u64,
    pub move_ms: u64,    // playback time for one step
    pub fall_ms: u64,    // playback time for one gravity drop
    pub absorb_ms: u64,  // playback time for one absorption tick
}

/// Rule knobs carried into every `WorldState`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RulesConfig {
    pub initial_length: usize,
    /// Goal only accepts the head once every pickup is eaten.
    pub require_all_pickups: bool,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub restart: Vec<String>,
}

impl Default for RulesConfig {
    fn default() -> Self {
        RulesConfig {
            initial_length: default_initial_length(),
            require_all_pickups: false,
        }
    }
}

impl Default for SpeedConfig {
    fn default() -> Self {
        let t = TomlSpeed::default();
        SpeedConfig {
            frame_ms: t.frame_ms,
            move_ms: t.move_ms,
            fall_ms: t.fall_ms,
            absorb_ms: t.absorb_ms,
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    speed: TomlSpeed,
    #[serde(default)]
    rules: TomlRules,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlSpeed {
    #[serde(default = "default_frame")]
    frame_ms: u64,
    #[serde(default = "default_move")]
    move_ms: u64,
    #[serde(default = "default_fall")]
    fall_ms: u64,
    #[serde(default = "default_absorb")]
    absorb_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlRules {
    #[serde(default = "default_initial_length")]
    initial_length: usize,
    #[serde(default)]
    require_all_pickups: bool,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_restart")]
    restart: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_dir")]
    levels_dir: String,
}

// ── Defaults ──

fn default_frame() -> u64 { 16 }
fn default_move() -> u64 { 120 }
fn default_fall() -> u64 { 80 }
fn default_absorb() -> u64 { 80 }
fn default_initial_length() -> usize { 3 }

fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["Select".into()] }
fn default_restart() -> Vec<String> { vec!["Y".into()] }
fn default_levels_dir() -> String { "levels".into() }

impl Default for TomlSpeed {
    fn default() -> Self {
        TomlSpeed {
            frame_ms: default_frame(),
            move_ms: default_move(),
            fall_ms: default_fall(),
            absorb_ms: default_absorb(),
        }
    }
}

impl Default for TomlRules {
    fn default() -> Self {
        TomlRules {
            initial_length: default_initial_length(),
            require_all_pickups: false,
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            restart: default_restart(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_dir: default_levels_dir(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        Self::resolve(toml_cfg, &search_dirs)
    }

    /// Build from TOML text (no file lookup). Parse errors fall back to defaults.
    pub fn from_toml_str(text: &str) -> Self {
        let toml_cfg = match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => cfg,
            Err(e) => {
                log::warn!("config parse error: {e}; using default settings");
                TomlConfig::default()
            }
        };
        Self::resolve(toml_cfg, &[])
    }

    fn resolve(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        // Resolve levels directory
        let levels_dir_str = &toml_cfg.general.levels_dir;
        let levels_dir = if Path::new(levels_dir_str).is_absolute() {
            PathBuf::from(levels_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(levels_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(levels_dir_str))
        };

        let mut initial_length = toml_cfg.rules.initial_length;
        if initial_length == 0 {
            log::warn!("rules.initial_length = 0 is not playable; using {}", default_initial_length());
            initial_length = default_initial_length();
        }

        GameConfig {
            speed: SpeedConfig {
                frame_ms: toml_cfg.speed.frame_ms.max(1),
                move_ms: toml_cfg.speed.move_ms,
                fall_ms: toml_cfg.speed.fall_ms,
                absorb_ms: toml_cfg.speed.absorb_ms,
            },
            rules: RulesConfig {
                initial_length,
                require_all_pickups: toml_cfg.rules.require_all_pickups,
            },
            gamepad: GamepadConfig {
                confirm: toml_cfg.gamepad.confirm,
                cancel: toml_cfg.gamepad.cancel,
                restart: toml_cfg.gamepad.restart,
            },
            levels_dir,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::resolve(TomlConfig::default(), &[])
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
pub(crate) fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => {
                        log::info!("loaded {}", path.display());
                        return cfg;
                    }
                    Err(e) => {
                        log::warn!("{} parse error: {e}; using default settings", path.display());
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    log::warn!("could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg = GameConfig::from_toml_str("");
        assert_eq!(cfg.speed, SpeedConfig::default());
        assert_eq!(cfg.speed.move_ms, 120);
        assert_eq!(cfg.rules, RulesConfig::default());
        assert_eq!(cfg.rules.initial_length, 3);
        assert!(!cfg.rules.require_all_pickups);
        assert_eq!(cfg.gamepad.confirm, vec!["A".to_string(), "Start".to_string()]);
        assert_eq!(cfg.levels_dir, PathBuf::from("levels"));
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            "[speed]\nfall_ms = 40\n\n[rules]\nrequire_all_pickups = true\n",
        );
        assert_eq!(cfg.speed.fall_ms, 40);
        assert_eq!(cfg.speed.move_ms, 120);
        assert!(cfg.rules.require_all_pickups);
        assert_eq!(cfg.rules.initial_length, 3);
    }

    #[test]
    fn zero_length_is_replaced() {
        let cfg = GameConfig::from_toml_str("[rules]\ninitial_length = 0\n");
        assert_eq!(cfg.rules.initial_length, 3);
    }

    #[test]
    fn malformed_file_falls_back() {
        let cfg = GameConfig::from_toml_str("[speed\nmove_ms = ");
        assert_eq!(cfg.speed, SpeedConfig::default());
    }

    #[test]
    fn absolute_levels_dir_is_kept() {
        let cfg = GameConfig::from_toml_str("[general]\nlevels_dir = \"/opt/snakefall/levels\"\n");
        assert_eq!(cfg.levels_dir, PathBuf::from("/opt/snakefall/levels"));
    }
}
