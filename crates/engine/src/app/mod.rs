mod collision;
mod config;
mod input;
mod loop_runner;
mod object;
mod quiz;
mod rendering;
mod tilemap;
mod types;
mod walker;
mod world;

pub use collision::{CollisionConflict, CollisionIndex};
pub use config::{SimConfig, TILE_SIZE_ENV_VAR, WALK_SPEED_ENV_VAR};
pub use input::{InputAction, InputSnapshot};
pub use loop_runner::{run_headless, InputSource, LoopConfig, LoopSummary, ScriptedInput};
pub use object::{AnimationCursor, FrameSet, ObjectKind, ObjectSpec, SimObject};
pub use quiz::{Question, QuestionBank, QuizBankError, QuizEngine, QuizOutcome};
pub use rendering::{
    camera_offset, world_to_screen_px, DrawRequest, RecordingSink, RenderSink, Viewport,
};
pub use tilemap::{MapLoaded, TileMap};
pub use types::{Extents, Facing, MapPos, ObjectId, ScreenPos, TextureKey, TileSize};
pub use walker::{WalkStep, Walker};
pub use world::{GameWorld, TickDiagnostics};
