use thiserror::Error;

pub mod app;
pub mod content;

pub use app::{
    camera_offset, run_headless, AnimationCursor, CollisionConflict, CollisionIndex, DrawRequest,
    Extents, Facing, FrameSet, GameWorld, InputAction, InputSnapshot, InputSource, LoopConfig,
    LoopSummary, MapLoaded, MapPos, ObjectId, ObjectKind, ObjectSpec, Question, QuestionBank,
    QuizBankError, QuizEngine, QuizOutcome, RecordingSink, RenderSink, ScreenPos, ScriptedInput,
    SimConfig, SimObject, TextureKey, TickDiagnostics, TileMap, TileSize, Viewport, WalkStep,
    Walker, TILE_SIZE_ENV_VAR, WALK_SPEED_ENV_VAR,
};
pub use content::{
    AssetLoader, ContentError, ContentErrorCode, MapData, MemoryAssets, ObjectDef, ObjectDefKind,
    SourceLocation, XmlAssets,
};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("map index {index} is out of range; {map_count} map(s) are known")]
    InvalidMapIndex { index: usize, map_count: usize },
    #[error("position {pos} lies outside the map extents {extents}")]
    OutOfBounds { pos: MapPos, extents: Extents },
    #[error("tile {pos} claimed by object {displaced} and object {kept}; keeping {kept}")]
    CollisionConflict {
        pos: MapPos,
        kept: ObjectId,
        displaced: ObjectId,
    },
    #[error("invalid state for {operation}: {reason}")]
    InvalidState {
        operation: &'static str,
        reason: &'static str,
    },
    #[error("object {id} is not loaded")]
    UnknownObject { id: ObjectId },
    #[error(transparent)]
    Content(#[from] ContentError),
}

impl From<CollisionConflict> for SimError {
    fn from(conflict: CollisionConflict) -> Self {
        SimError::CollisionConflict {
            pos: conflict.pos,
            kept: conflict.kept,
            displaced: conflict.displaced,
        }
    }
}
