use tracing::{debug, info, warn};

use crate::content::AssetLoader;
use crate::SimError;

use super::collision::{CollisionConflict, CollisionIndex};
use super::config::SimConfig;
use super::input::InputSnapshot;
use super::object::{
    Neighbors, ObjectKind, ObjectSpec, SimObject, TickCommand, TickContext, TickEvents,
};
use super::quiz::{QuestionBank, QuizEngine, QuizOutcome};
use super::rendering::{camera_offset, RenderSink, Viewport};
use super::tilemap::{MapLoaded, TileMap};
use super::types::{MapPos, ObjectId, ObjectIdAllocator};

/// Per-tick anomalies that were recovered from rather than returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickDiagnostics {
    /// Conflicts found by the most recent collision rebuild.
    pub last_conflicts: Vec<CollisionConflict>,
    pub total_conflicts: u64,
    /// `use_collectible` calls ignored because every collectible was already collected.
    pub clamped_collectibles: u64,
    pub failed_object_ticks: u64,
    pub ticks: u64,
}

/// Owns the map, the object list, the collision index and aggregate play
/// state, and advances all of them once per tick.
pub struct GameWorld {
    config: SimConfig,
    assets: Box<dyn AssetLoader>,
    tile_map: TileMap,
    quiz: QuizEngine,
    allocator: ObjectIdAllocator,
    objects: Vec<SimObject>,
    collision: CollisionIndex,
    player: Option<ObjectId>,
    playtime_ms: u64,
    paused: bool,
    collectibles: u32,
    collected: u32,
    hints: Vec<String>,
    diagnostics: TickDiagnostics,
}

impl GameWorld {
    pub fn new(config: SimConfig, maps: Vec<String>, assets: Box<dyn AssetLoader>) -> Self {
        Self {
            tile_map: TileMap::new(maps, config.tile_px()),
            config,
            assets,
            quiz: QuizEngine::new(QuestionBank::default()),
            allocator: ObjectIdAllocator::default(),
            objects: Vec::new(),
            collision: CollisionIndex::new(),
            player: None,
            playtime_ms: 0,
            paused: false,
            collectibles: 0,
            collected: 0,
            hints: Vec::new(),
            diagnostics: TickDiagnostics::default(),
        }
    }

    pub fn with_question_bank(mut self, bank: QuestionBank) -> Self {
        self.quiz = QuizEngine::new(bank);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn tile_map(&self) -> &TileMap {
        &self.tile_map
    }

    pub fn quiz(&self) -> &QuizEngine {
        &self.quiz
    }

    pub fn diagnostics(&self) -> &TickDiagnostics {
        &self.diagnostics
    }

    /// Loads map `index`; with `respawn` the player jumps to the map's spawn cell.
    ///
    /// The collision index is rebuilt before returning.
    pub fn load_map(&mut self, index: usize, respawn: bool) -> Result<MapLoaded, SimError> {
        let loaded = self.tile_map.load_map(index, respawn, self.assets.as_mut())?;
        if loaded.respawn_requested {
            if let Some(player) = self.player.and_then(|id| self.object_mut(id)) {
                player.set_map_pos(loaded.spawn, false);
                debug!(object = %player.id(), spawn = %loaded.spawn, "player_respawned");
            }
        }
        self.update_collision();
        Ok(loaded)
    }

    /// Loads an object definition through the asset collaborator and places it at `pos`.
    pub fn load_object(&mut self, resource: &str, pos: MapPos) -> Result<ObjectId, SimError> {
        let def = self.assets.load_object(resource)?;
        let id = self.spawn_object(ObjectSpec::from_def(def, pos))?;
        info!(object = %id, resource, pos = %pos, "object_loaded");
        Ok(id)
    }

    pub fn spawn_object(&mut self, spec: ObjectSpec) -> Result<ObjectId, SimError> {
        if spec.kind == ObjectKind::Player && self.player.is_some() {
            return Err(SimError::InvalidState {
                operation: "spawn_object",
                reason: "a player object is already loaded",
            });
        }
        let id = self.allocator.allocate();
        let object = SimObject::new(id, spec, &self.tile_map, &self.config)?;
        match object.kind() {
            ObjectKind::Player => self.player = Some(id),
            ObjectKind::Pickup { .. } => self.add_collectible(),
            ObjectKind::Static => {}
        }
        debug!(
            object = %id,
            kind = object.kind().name(),
            pos = %object.map_pos(),
            "object_spawned"
        );
        self.objects.push(object);
        Ok(id)
    }

    /// Removes the object from the list and from the current collision index.
    pub fn unload_object(&mut self, id: ObjectId) -> Result<SimObject, SimError> {
        let Some(index) = self.objects.iter().position(|object| object.id() == id) else {
            return Err(SimError::UnknownObject { id });
        };
        let object = self.objects.remove(index);
        self.collision.remove(id);
        if self.player == Some(id) {
            self.player = None;
        }
        debug!(object = %id, kind = object.kind().name(), "object_unloaded");
        Ok(object)
    }

    /// Moves an object to `pos`, walking when `anim` is set.
    pub fn place_object(&mut self, id: ObjectId, pos: MapPos, anim: bool) -> Result<(), SimError> {
        let extents = self.tile_map.size();
        let object = self
            .objects
            .iter_mut()
            .find(|object| object.id() == id)
            .ok_or(SimError::UnknownObject { id })?;
        if let Some(outside) = extents.first_outside(pos, object.size()) {
            return Err(SimError::OutOfBounds {
                pos: outside,
                extents,
            });
        }
        object.set_map_pos(pos, anim);
        Ok(())
    }

    pub fn object(&self, id: ObjectId) -> Option<&SimObject> {
        self.objects.iter().find(|object| object.id() == id)
    }

    fn object_mut(&mut self, id: ObjectId) -> Option<&mut SimObject> {
        self.objects.iter_mut().find(|object| object.id() == id)
    }

    /// Objects in insertion order.
    pub fn objects(&self) -> &[SimObject] {
        &self.objects
    }

    pub fn player(&self) -> Option<&SimObject> {
        self.player.and_then(|id| self.object(id))
    }

    /// Rebuilds the collision index from the live object list.
    ///
    /// Conflicts are logged and recorded in [`TickDiagnostics`], never returned as errors.
    pub fn update_collision(&mut self) -> &[CollisionConflict] {
        let conflicts = self.collision.rebuild(self.tile_map.size(), &self.objects);
        for conflict in &conflicts {
            let err = SimError::from(*conflict);
            warn!(
                pos = %conflict.pos,
                kept = %conflict.kept,
                displaced = %conflict.displaced,
                error = %err,
                "collision_conflict"
            );
        }
        self.diagnostics.total_conflicts += conflicts.len() as u64;
        self.diagnostics.last_conflicts = conflicts;
        &self.diagnostics.last_conflicts
    }

    pub fn collision_at(&self, pos: MapPos) -> Option<ObjectId> {
        self.collision.occupant(pos)
    }

    pub fn collision_index(&self) -> &CollisionIndex {
        &self.collision
    }

    pub fn playtime_ms(&self) -> u64 {
        self.playtime_ms
    }

    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            debug!(paused, "sim_pause_changed");
        }
        self.paused = paused;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn collected(&self) -> u32 {
        self.collected
    }

    pub fn remaining(&self) -> u32 {
        self.collectibles - self.collected
    }

    pub fn total_collectibles(&self) -> u32 {
        self.collectibles
    }

    pub fn add_collectible(&mut self) {
        self.collectibles = self.collectibles.saturating_add(1);
    }

    /// Returns `false`, leaving the counters untouched, once everything is collected.
    pub fn use_collectible(&mut self) -> bool {
        if self.collected >= self.collectibles {
            warn!(
                collected = self.collected,
                total = self.collectibles,
                "collectible_overuse_clamped"
            );
            self.diagnostics.clamped_collectibles += 1;
            return false;
        }
        self.collected += 1;
        true
    }

    pub fn add_hint(&mut self, hint: impl Into<String>) {
        self.hints.push(hint.into());
    }

    pub fn hints(&self) -> &[String] {
        &self.hints
    }

    /// Asks the next question and pauses the simulation until it is answered.
    pub fn start_quiz(&mut self) -> Result<usize, SimError> {
        let question = self.quiz.start_quiz()?;
        self.set_paused(true);
        Ok(question)
    }

    pub fn provide_answer(&mut self, selections: Vec<bool>) -> Result<QuizOutcome, SimError> {
        let outcome = self.quiz.provide_answer(selections)?;
        self.set_paused(false);
        Ok(outcome)
    }

    /// Advances the simulation by `delta_ms`.
    ///
    /// While paused only the quiz advances. Otherwise the collision index is
    /// rebuilt, every object is updated in insertion order against that
    /// snapshot, deferred removals are applied, and playtime accumulates.
    pub fn run_tick(&mut self, delta_ms: u64, input: &InputSnapshot) {
        self.diagnostics.ticks += 1;
        if self.paused {
            self.quiz.run_tick(delta_ms);
            return;
        }

        self.update_collision();

        let mut events = TickEvents::default();
        for index in 0..self.objects.len() {
            let (before, rest) = self.objects.split_at_mut(index);
            let Some((object, after)) = rest.split_first_mut() else {
                break;
            };
            let mut ctx = TickContext {
                map: &self.tile_map,
                collision: &self.collision,
                input,
                others: Neighbors { before, after },
                events: &mut events,
            };
            if let Err(err) = object.run_tick(delta_ms, &mut ctx) {
                warn!(object = %object.id(), error = %err, "object_tick_failed");
                self.diagnostics.failed_object_ticks += 1;
            }
        }
        self.apply_tick_commands(events);

        self.playtime_ms = self.playtime_ms.saturating_add(delta_ms);
    }

    fn apply_tick_commands(&mut self, events: TickEvents) {
        for command in events.into_commands() {
            match command {
                TickCommand::RegisterHint(hint) => self.add_hint(hint),
                TickCommand::UseCollectible => {
                    self.use_collectible();
                }
                TickCommand::Unload(id) => {
                    if let Err(err) = self.unload_object(id) {
                        warn!(object = %id, error = %err, "deferred_unload_failed");
                    }
                }
            }
        }
    }

    /// Draws the map, then every object, with the camera centred on the
    /// camera-centre object when there is one.
    pub fn render(&self, sink: &mut dyn RenderSink, viewport: Viewport) {
        let camera = self
            .objects
            .iter()
            .find(|object| object.is_camera_center())
            .map(|object| camera_offset(object.center(), viewport));
        self.tile_map.render(sink, camera, Some(viewport));
        for object in &self.objects {
            object.render(sink, camera);
        }
    }
}
