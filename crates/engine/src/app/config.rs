use std::env;
use std::fmt::Display;
use std::str::FromStr;

use serde::Deserialize;
use tracing::warn;

pub const TILE_SIZE_ENV_VAR: &str = "TILEQUEST_TILE_SIZE_PX";
pub const WALK_SPEED_ENV_VAR: &str = "TILEQUEST_WALK_MS_PER_PIXEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tile_size_px: u32,
    /// Walker pacing, in milliseconds per pixel travelled.
    pub walk_ms_per_pixel: u64,
    /// One animation frame every `walk_ms_per_pixel * frame_time_multiple` ms.
    pub frame_time_multiple: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tile_size_px: 32,
            walk_ms_per_pixel: 5,
            frame_time_multiple: 10,
        }
    }
}

impl SimConfig {
    pub fn with_env_overrides(self) -> Self {
        Self {
            tile_size_px: parse_override(
                TILE_SIZE_ENV_VAR,
                env::var(TILE_SIZE_ENV_VAR),
                self.tile_size_px,
            ),
            walk_ms_per_pixel: parse_override(
                WALK_SPEED_ENV_VAR,
                env::var(WALK_SPEED_ENV_VAR),
                self.walk_ms_per_pixel,
            ),
            ..self
        }
    }

    pub fn tile_px(&self) -> i32 {
        i32::try_from(self.tile_size_px.max(1)).unwrap_or(i32::MAX)
    }

    pub fn ms_per_pixel(&self) -> u64 {
        self.walk_ms_per_pixel.max(1)
    }

    pub fn frame_time_ms(&self) -> u64 {
        self.ms_per_pixel().saturating_mul(self.frame_time_multiple.max(1))
    }
}

fn parse_override<T>(env_var: &'static str, raw: Result<String, env::VarError>, fallback: T) -> T
where
    T: FromStr + Copy + Display,
{
    match raw {
        Ok(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(
                    env_var,
                    value = value.as_str(),
                    fallback = %fallback,
                    "invalid config env var value; falling back to config"
                );
                fallback
            }
        },
        Err(env::VarError::NotPresent) => fallback,
        Err(err) => {
            warn!(
                env_var,
                error = %err,
                "unable to read config env var; falling back to config"
            );
            fallback
        }
    }
}
