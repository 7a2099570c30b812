use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tilequest_engine::{InputAction, MapPos, SimConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const CONFIG_ENV_VAR: &str = "TILEQUEST_CONFIG";
const ROOT_ENV_VAR: &str = "TILEQUEST_ROOT";

pub(crate) type BootstrapResult<T> = Result<T, String>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct AppConfig {
    pub(crate) sim: SimConfig,
    /// Map resource ids, relative to the asset root.
    pub(crate) maps: Vec<String>,
    pub(crate) player: String,
    pub(crate) objects: Vec<PlacedObject>,
    pub(crate) questions: Option<String>,
    pub(crate) frame_ms: u64,
    pub(crate) script: Vec<ScriptStep>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sim: SimConfig::default(),
            maps: vec!["maps/start.xml".to_string()],
            player: "objects/player.xml".to_string(),
            objects: Vec::new(),
            questions: None,
            frame_ms: 16,
            script: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct PlacedObject {
    pub(crate) resource: String,
    pub(crate) row: i32,
    pub(crate) col: i32,
}

impl PlacedObject {
    pub(crate) fn pos(&self) -> MapPos {
        MapPos::new(self.row, self.col)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ScriptMove {
    Up,
    Down,
    Left,
    Right,
    Idle,
}

impl ScriptMove {
    pub(crate) fn action(self) -> Option<InputAction> {
        match self {
            ScriptMove::Up => Some(InputAction::MoveUp),
            ScriptMove::Down => Some(InputAction::MoveDown),
            ScriptMove::Left => Some(InputAction::MoveLeft),
            ScriptMove::Right => Some(InputAction::MoveRight),
            ScriptMove::Idle => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct ScriptStep {
    #[serde(rename = "move")]
    pub(crate) movement: ScriptMove,
    pub(crate) ticks: usize,
}

pub(crate) struct AppWiring {
    pub(crate) config: AppConfig,
    pub(crate) asset_root: PathBuf,
}

pub(crate) fn build_app() -> BootstrapResult<AppWiring> {
    init_tracing();
    info!("=== tilequest startup ===");

    let config = match env::var(CONFIG_ENV_VAR) {
        Ok(path) => load_config(Path::new(&path))?,
        Err(_) => AppConfig::default(),
    };
    let config = AppConfig {
        sim: config.sim.with_env_overrides(),
        ..config
    };
    let asset_root = env::var(ROOT_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));
    info!(
        asset_root = %asset_root.display(),
        maps = config.maps.len(),
        tile_size_px = config.sim.tile_size_px,
        walk_ms_per_pixel = config.sim.walk_ms_per_pixel,
        "config_resolved"
    );

    Ok(AppWiring { config, asset_root })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

pub(crate) fn load_config(path: &Path) -> BootstrapResult<AppConfig> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read config '{}': {error}", path.display()))?;
    parse_config_json(&raw)
}

pub(crate) fn parse_config_json(raw: &str) -> BootstrapResult<AppConfig> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    match serde_path_to_error::deserialize::<_, AppConfig>(&mut deserializer) {
        Ok(config) => Ok(config),
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            if path.is_empty() || path == "." {
                Err(format!("parse config json: {source}"))
            } else {
                Err(format!("parse config json at {path}: {source}"))
            }
        }
    }
}
