//! Application-level configuration loading: houses, paths with their clues, scoring and
//! anti-cheat thresholds, plus the shared admin passcode.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use indexmap::IndexMap;
use serde::Deserialize;
use serde_with::{DurationMilliSeconds, serde_as};
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUEST_TRAIL_CONFIG_PATH";
/// Environment variable holding the shared admin passcode.
const ADMIN_PASSCODE_ENV: &str = "QUEST_TRAIL_ADMIN_PASSCODE";
/// Passcode used when neither the environment nor the config file provide one.
const DEFAULT_ADMIN_PASSCODE: &str = "mischief-managed";
/// Text shown when a path has no clue for the requested stage.
pub const FALLBACK_CLUE: &str = "Wait for the next instruction...";

const DEFAULT_TOTAL_STAGES: u32 = 5;
const DEFAULT_SCAN_COOLDOWN: Duration = Duration::from_millis(1_500);
const DEFAULT_MAX_TAB_SWITCH_WARNINGS: u32 = 1;

/// Points awarded and deducted by the stage-progression rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ScoringRules {
    /// Points granted for every stage completed.
    pub advance_points: i32,
    /// Points removed when a QR code from another path is scanned.
    pub wrong_path_penalty: i32,
    /// Points removed when a team scans a stage ahead of its target.
    pub sequence_break_penalty: i32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            advance_points: 20,
            wrong_path_penalty: 5,
            sequence_break_penalty: 5,
        }
    }
}

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    houses: Vec<String>,
    paths: IndexMap<String, Vec<String>>,
    total_stages: u32,
    scoring: ScoringRules,
    scan_cooldown: Duration,
    max_tab_switch_warnings: u32,
    admin_passcode: String,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to the baked-in defaults.
    ///
    /// The admin passcode is taken from `QUEST_TRAIL_ADMIN_PASSCODE` when set.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        houses = app_config.houses.len(),
                        paths = app_config.paths.len(),
                        stages = app_config.total_stages,
                        "loaded hunt configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        };

        match env::var(ADMIN_PASSCODE_ENV) {
            Ok(passcode) if !passcode.trim().is_empty() => config.with_admin_passcode(passcode),
            _ => {
                if config.admin_passcode == DEFAULT_ADMIN_PASSCODE {
                    warn!("admin passcode not configured; using the built-in default");
                }
                config
            }
        }
    }

    /// Replace the admin passcode.
    pub fn with_admin_passcode(mut self, passcode: impl Into<String>) -> Self {
        self.admin_passcode = passcode.into();
        self
    }

    /// Replace the per-team scan cooldown.
    pub fn with_scan_cooldown(mut self, cooldown: Duration) -> Self {
        self.scan_cooldown = cooldown;
        self
    }

    /// Houses teams are sorted into, in display order.
    pub fn houses(&self) -> &[String] {
        &self.houses
    }

    /// Identifiers of the configured paths, in display order.
    pub fn path_ids(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    /// Whether `path_id` names a configured path.
    pub fn has_path(&self, path_id: &str) -> bool {
        self.paths.contains_key(path_id)
    }

    /// Clue guiding a team on `path_id` towards `stage` (1-based).
    pub fn clue(&self, path_id: &str, stage: u32) -> Option<&str> {
        let index = usize::try_from(stage.checked_sub(1)?).ok()?;
        self.paths
            .get(path_id)?
            .get(index)
            .map(String::as_str)
            .filter(|clue| !clue.trim().is_empty())
    }

    /// Number of stages every path is made of.
    pub fn total_stages(&self) -> u32 {
        self.total_stages
    }

    /// Scoring rules used when evaluating scans.
    pub fn scoring(&self) -> ScoringRules {
        self.scoring
    }

    /// Minimum delay between two scans of the same team.
    pub fn scan_cooldown(&self) -> Duration {
        self.scan_cooldown
    }

    /// Tab switches tolerated with a warning before a team is disqualified.
    pub fn max_tab_switch_warnings(&self) -> u32 {
        self.max_tab_switch_warnings
    }

    /// Shared passcode protecting the admin routes.
    pub fn admin_passcode(&self) -> &str {
        &self.admin_passcode
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            houses: default_houses(),
            paths: default_paths(),
            total_stages: DEFAULT_TOTAL_STAGES,
            scoring: ScoringRules::default(),
            scan_cooldown: DEFAULT_SCAN_COOLDOWN,
            max_tab_switch_warnings: DEFAULT_MAX_TAB_SWITCH_WARNINGS,
            admin_passcode: DEFAULT_ADMIN_PASSCODE.to_string(),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde(default)]
    houses: Vec<String>,
    #[serde(default)]
    paths: Vec<RawPath>,
    total_stages: Option<u32>,
    scoring: Option<ScoringRules>,
    #[serde_as(as = "Option<DurationMilliSeconds<u64>>")]
    #[serde(default, rename = "scan_cooldown_ms")]
    scan_cooldown: Option<Duration>,
    max_tab_switch_warnings: Option<u32>,
    admin_passcode: Option<String>,
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single path and its ordered clues.
struct RawPath {
    id: String,
    #[serde(default)]
    clues: Vec<String>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();

        let houses: Vec<String> = value
            .houses
            .into_iter()
            .map(|house| house.trim().to_string())
            .filter(|house| !house.is_empty())
            .collect();

        let paths: IndexMap<String, Vec<String>> = value
            .paths
            .into_iter()
            .filter(|path| !path.id.trim().is_empty())
            .map(|path| (path.id.trim().to_string(), path.clues))
            .collect();

        let total_stages = match value.total_stages {
            Some(0) => {
                warn!("total_stages must be at least 1; using the default");
                defaults.total_stages
            }
            Some(stages) => stages,
            None => defaults.total_stages,
        };

        Self {
            houses: if houses.is_empty() {
                defaults.houses
            } else {
                houses
            },
            paths: if paths.is_empty() {
                defaults.paths
            } else {
                paths
            },
            total_stages,
            scoring: value.scoring.unwrap_or(defaults.scoring),
            scan_cooldown: value.scan_cooldown.unwrap_or(defaults.scan_cooldown),
            max_tab_switch_warnings: value
                .max_tab_switch_warnings
                .unwrap_or(defaults.max_tab_switch_warnings),
            admin_passcode: value
                .admin_passcode
                .filter(|passcode| !passcode.trim().is_empty())
                .unwrap_or(defaults.admin_passcode),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_houses() -> Vec<String> {
    ["Gryffindor", "Slytherin", "Hufflepuff", "Ravenclaw"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Built-in clue catalogue shipped with the binary.
fn default_paths() -> IndexMap<String, Vec<String>> {
    let alpha = [
        "I used to zoom on the road, now I stand still and carry your food. Find me where wheels meet meals!",
        "Standing proud for every techie, this place welcomes you politely.",
        "Where answers end and marks begin, seek the cell that judges if you lose or win.",
        "Engines roar, then fall to hush, here they wait without a rush. Find your clue among the lanes.",
        "Dribble, pass, shoot... and score! Find the place with a painted floor.",
    ];
    let beta = [
        "A plate of noodles and a drink so cool, a poster here makes you drool.",
        "I'm the hub where minds huddle, find me!",
        "Not a classroom, not a mall, yet many dreams begin here small.",
        "I stand by the road, round and tall, show you yourself, no glass hall. Plants around me.",
        "Under my giant metal crown, athletes cheer and never frown. Come where champions play!",
    ];
    let gamma = [
        "Always stand in front of the canteen but only get waste to eat.",
        "I point the way but never walked, I speak direction without talk.",
        "A stage with a screen where we showcase your talent, find where I am!",
        "I am marked with lines but not a notebook, I hold two nets yet catch no fish.",
        "I give shadow in the sun and a place to sit and cheer like an audience.",
    ];

    [("alpha", alpha), ("beta", beta), ("gamma", gamma)]
        .into_iter()
        .map(|(id, clues)| {
            (
                id.to_string(),
                clues.into_iter().map(String::from).collect(),
            )
        })
        .collect()
}
