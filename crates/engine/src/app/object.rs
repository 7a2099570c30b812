use tracing::{debug, info, warn};

use crate::content::{ObjectDef, ObjectDefKind};
use crate::SimError;

use super::collision::CollisionIndex;
use super::config::SimConfig;
use super::input::InputSnapshot;
use super::rendering::{DrawRequest, RenderSink};
use super::tilemap::TileMap;
use super::types::{Facing, MapPos, ObjectId, ScreenPos, TextureKey, TileSize};
use super::walker::{WalkStep, Walker};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKind {
    Player,
    Static,
    Pickup { hint: String },
}

impl ObjectKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectKind::Player => "player",
            ObjectKind::Static => "static",
            ObjectKind::Pickup { .. } => "pickup",
        }
    }
}

impl From<ObjectDefKind> for ObjectKind {
    fn from(kind: ObjectDefKind) -> Self {
        match kind {
            ObjectDefKind::Player => ObjectKind::Player,
            ObjectDefKind::Static => ObjectKind::Static,
            ObjectDefKind::Pickup { hint } => ObjectKind::Pickup { hint },
        }
    }
}

/// Texture frames per direction. `side` is drawn as-is facing right and
/// mirrored facing left.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameSet {
    pub up: Vec<TextureKey>,
    pub down: Vec<TextureKey>,
    pub side: Vec<TextureKey>,
}

impl FrameSet {
    pub fn single(texture: impl Into<TextureKey>) -> Self {
        let texture = texture.into();
        Self {
            up: vec![texture.clone()],
            down: vec![texture.clone()],
            side: vec![texture],
        }
    }

    /// Copies a non-empty direction into the empty ones, preferring `down`.
    pub fn filled(mut self) -> Self {
        let source = [&self.down, &self.side, &self.up]
            .into_iter()
            .find(|frames| !frames.is_empty())
            .cloned()
            .unwrap_or_default();
        for frames in [&mut self.up, &mut self.down, &mut self.side] {
            if frames.is_empty() {
                frames.clone_from(&source);
            }
        }
        self
    }

    pub fn for_facing(&self, facing: Facing) -> &[TextureKey] {
        match facing {
            Facing::Up => &self.up,
            Facing::Down => &self.down,
            Facing::Left | Facing::Right => &self.side,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.up.is_empty() && self.down.is_empty() && self.side.is_empty()
    }
}

impl From<TextureKey> for FrameSet {
    fn from(texture: TextureKey) -> Self {
        Self::single(texture)
    }
}

/// Frame indices into the active direction's frame list.
///
/// Frame `stop_frame` is the rest pose; walking cycles `loop_frame..=end_frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationCursor {
    current: usize,
    loop_frame: usize,
    end_frame: usize,
    stop_frame: usize,
}

impl AnimationCursor {
    pub fn for_frame_count(count: usize) -> Self {
        Self {
            current: 0,
            loop_frame: usize::from(count > 1),
            end_frame: count.saturating_sub(1),
            stop_frame: 0,
        }
    }

    pub fn current(&self) -> usize {
        self.current
    }

    fn advance(&mut self) {
        self.current = if self.current >= self.end_frame {
            self.loop_frame
        } else {
            self.current + 1
        };
    }

    fn stop(&mut self) {
        self.current = self.stop_frame;
    }
}

/// Everything needed to construct a [`SimObject`] besides its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSpec {
    pub kind: ObjectKind,
    pub map_pos: MapPos,
    pub size: TileSize,
    pub frames: FrameSet,
    pub collision: bool,
    pub camera_center: bool,
}

impl ObjectSpec {
    pub fn player(map_pos: MapPos, frames: FrameSet) -> Self {
        Self {
            kind: ObjectKind::Player,
            map_pos,
            size: TileSize::default(),
            frames,
            collision: true,
            camera_center: true,
        }
    }

    pub fn static_object(
        map_pos: MapPos,
        size: TileSize,
        frames: FrameSet,
        collision: bool,
    ) -> Self {
        Self {
            kind: ObjectKind::Static,
            map_pos,
            size,
            frames,
            collision,
            camera_center: false,
        }
    }

    pub fn pickup(map_pos: MapPos, hint: impl Into<String>, frames: FrameSet) -> Self {
        Self {
            kind: ObjectKind::Pickup { hint: hint.into() },
            map_pos,
            size: TileSize::default(),
            frames,
            collision: true,
            camera_center: false,
        }
    }

    pub fn from_def(def: ObjectDef, map_pos: MapPos) -> Self {
        let kind = ObjectKind::from(def.kind);
        Self {
            camera_center: kind == ObjectKind::Player,
            kind,
            map_pos,
            size: def.size,
            frames: def.frames,
            collision: def.collision,
        }
    }
}

/// Side effects requested by objects during a tick, applied once every
/// object has been updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TickCommand {
    RegisterHint(String),
    UseCollectible,
    Unload(ObjectId),
}

#[derive(Debug, Default)]
pub(crate) struct TickEvents {
    commands: Vec<TickCommand>,
    consumed: Vec<ObjectId>,
}

impl TickEvents {
    pub(crate) fn is_consumed(&self, id: ObjectId) -> bool {
        self.consumed.contains(&id)
    }

    fn consume_pickup(&mut self, id: ObjectId, hint: &str) {
        self.consumed.push(id);
        self.commands.push(TickCommand::RegisterHint(hint.to_string()));
        self.commands.push(TickCommand::UseCollectible);
        self.commands.push(TickCommand::Unload(id));
    }

    pub(crate) fn into_commands(self) -> Vec<TickCommand> {
        self.commands
    }
}

/// Shared view of every object except the one being updated.
pub(crate) struct Neighbors<'a> {
    pub(crate) before: &'a [SimObject],
    pub(crate) after: &'a [SimObject],
}

impl<'a> Neighbors<'a> {
    pub(crate) fn get(&self, id: ObjectId) -> Option<&'a SimObject> {
        self.before
            .iter()
            .chain(self.after.iter())
            .find(|object| object.id == id)
    }
}

pub(crate) struct TickContext<'a> {
    pub(crate) map: &'a TileMap,
    pub(crate) collision: &'a CollisionIndex,
    pub(crate) input: &'a InputSnapshot,
    pub(crate) others: Neighbors<'a>,
    pub(crate) events: &'a mut TickEvents,
}

#[derive(Debug, Clone)]
pub struct SimObject {
    id: ObjectId,
    kind: ObjectKind,
    map_pos: MapPos,
    screen_pos: ScreenPos,
    size: TileSize,
    facing: Facing,
    frames: FrameSet,
    anim: AnimationCursor,
    collision: bool,
    camera_center: bool,
    config: SimConfig,
    walker: Option<Walker>,
}

impl SimObject {
    /// Fails with [`SimError::OutOfBounds`] unless the whole footprint lies
    /// inside the map's current extents.
    pub fn new(
        id: ObjectId,
        spec: ObjectSpec,
        map: &TileMap,
        config: &SimConfig,
    ) -> Result<Self, SimError> {
        let extents = map.size();
        if let Some(pos) = extents.first_outside(spec.map_pos, spec.size) {
            return Err(SimError::OutOfBounds { pos, extents });
        }
        let facing = Facing::default();
        let anim = AnimationCursor::for_frame_count(spec.frames.for_facing(facing).len());
        let collision = spec.collision || spec.kind != ObjectKind::Static;
        Ok(Self {
            id,
            kind: spec.kind,
            map_pos: spec.map_pos,
            screen_pos: ScreenPos::of_tile(spec.map_pos, config.tile_px()),
            size: spec.size,
            facing,
            frames: spec.frames,
            anim,
            collision,
            camera_center: spec.camera_center,
            config: *config,
            walker: None,
        })
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn kind(&self) -> &ObjectKind {
        &self.kind
    }

    pub fn is_player(&self) -> bool {
        self.kind == ObjectKind::Player
    }

    pub fn map_pos(&self) -> MapPos {
        self.map_pos
    }

    pub fn screen_pos(&self) -> ScreenPos {
        self.screen_pos
    }

    pub fn size(&self) -> TileSize {
        self.size
    }

    pub fn facing(&self) -> Facing {
        self.facing
    }

    pub fn animation(&self) -> AnimationCursor {
        self.anim
    }

    pub fn collision_enabled(&self) -> bool {
        self.collision
    }

    pub fn is_camera_center(&self) -> bool {
        self.camera_center
    }

    /// `true` while a tile-to-tile walk is in flight.
    pub fn is_moving(&self) -> bool {
        self.walker.is_some()
    }

    pub fn walker(&self) -> Option<&Walker> {
        self.walker.as_ref()
    }

    /// Screen position shifted by half the object's pixel size.
    pub fn center(&self) -> ScreenPos {
        let tile_px = self.config.tile_px();
        let (rows, cols) = self.size.span();
        ScreenPos {
            x: self.screen_pos.x.saturating_add(cols.saturating_mul(tile_px) / 2),
            y: self.screen_pos.y.saturating_add(rows.saturating_mul(tile_px) / 2),
        }
    }

    pub fn current_frame(&self) -> Option<&TextureKey> {
        self.frames.for_facing(self.facing).get(self.anim.current)
    }

    /// Moves to `pos`, walking there when `anim` is set and jumping otherwise.
    ///
    /// The tile position changes immediately; only the pixel position trails
    /// behind while walking. Restarting mid-walk discards the previous walk.
    pub fn set_map_pos(&mut self, pos: MapPos, anim: bool) {
        let tile_px = self.config.tile_px();
        let target = ScreenPos::of_tile(pos, tile_px);
        if !anim {
            self.walker = None;
            self.map_pos = pos;
            self.screen_pos = target;
            self.stop_frame(self.facing);
            return;
        }

        let (d_row, d_col) = (pos.row - self.map_pos.row, pos.col - self.map_pos.col);
        if let Some(facing) = Facing::from_step(d_row, d_col) {
            self.face(facing);
        }
        let walker = self.walker.get_or_insert_with(|| Walker::new(&self.config));
        walker.set_destination(pos, self.screen_pos, target);
        self.map_pos = pos;
    }

    /// Pixel placement snaps to the tile containing `pos`.
    pub fn set_screen_pos(&mut self, pos: ScreenPos, anim: bool) {
        let tile = pos.containing_tile(self.config.tile_px());
        self.set_map_pos(tile, anim);
    }

    /// `true` if any footprint tile, shifted by the offset, is blocked on the map.
    pub fn check_map_collision(&self, map: &TileMap, d_row: i32, d_col: i32) -> bool {
        self.size
            .footprint(self.map_pos.offset(d_row, d_col))
            .any(|pos| map.collision(pos))
    }

    /// `true` if another object occupies any footprint tile at the offset.
    pub fn check_object_collision(&self, index: &CollisionIndex, d_row: i32, d_col: i32) -> bool {
        !self.occupants_at(index, d_row, d_col).is_empty()
    }

    /// Distinct objects, other than this one, occupying the footprint at the offset.
    pub fn occupants_at(&self, index: &CollisionIndex, d_row: i32, d_col: i32) -> Vec<ObjectId> {
        let mut occupants = Vec::new();
        for pos in self.size.footprint(self.map_pos.offset(d_row, d_col)) {
            if let Some(id) = index.occupant(pos) {
                if id != self.id && !occupants.contains(&id) {
                    occupants.push(id);
                }
            }
        }
        occupants
    }

    pub fn render(&self, sink: &mut dyn RenderSink, camera: Option<ScreenPos>) {
        let Some(texture) = self.current_frame() else {
            return;
        };
        sink.draw(DrawRequest {
            texture: texture.clone(),
            position: self.screen_pos,
            camera,
            mirrored: self.facing.is_mirrored(),
        });
    }

    /// Whether a mover may step onto this object's tiles.
    pub fn admits_entry(&self) -> bool {
        matches!(self.kind, ObjectKind::Pickup { .. })
    }

    /// Invoked when another object moves onto this one; returns whether the
    /// mover may enter.
    pub(crate) fn collide(&self, events: &mut TickEvents) -> bool {
        let ObjectKind::Pickup { hint } = &self.kind else {
            return false;
        };
        if events.is_consumed(self.id) {
            warn!(object = %self.id, "pickup_already_consumed");
            return true;
        }
        info!(object = %self.id, hint = hint.as_str(), pos = %self.map_pos, "pickup_collected");
        events.consume_pickup(self.id, hint);
        true
    }

    pub(crate) fn run_tick(
        &mut self,
        delta_ms: u64,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), SimError> {
        match self.kind {
            ObjectKind::Player => self.run_player_tick(delta_ms, ctx),
            ObjectKind::Static | ObjectKind::Pickup { .. } => self.advance_walker(delta_ms),
        }
    }

    fn run_player_tick(
        &mut self,
        delta_ms: u64,
        ctx: &mut TickContext<'_>,
    ) -> Result<(), SimError> {
        if self.is_moving() {
            return self.advance_walker(delta_ms);
        }
        let Some(direction) = ctx.input.direction() else {
            return Ok(());
        };
        let (d_row, d_col) = direction.step();
        let target = self.map_pos.offset(d_row, d_col);

        if self.check_map_collision(ctx.map, d_row, d_col) {
            debug!(object = %self.id, target = %target, "move_blocked_by_map");
            return Ok(());
        }

        let occupants: Vec<&SimObject> = self
            .occupants_at(ctx.collision, d_row, d_col)
            .into_iter()
            .filter_map(|id| ctx.others.get(id))
            .collect();
        if let Some(blocker) = occupants.iter().find(|other| !other.admits_entry()) {
            debug!(
                object = %self.id,
                target = %target,
                blocker = %blocker.id,
                "move_blocked_by_object"
            );
            return Ok(());
        }
        for other in occupants {
            other.collide(ctx.events);
        }

        self.set_map_pos(target, true);
        Ok(())
    }

    fn advance_walker(&mut self, delta_ms: u64) -> Result<(), SimError> {
        let Some(walker) = self.walker.as_mut() else {
            return Ok(());
        };
        match walker.run_tick(delta_ms) {
            Ok(step) => {
                self.apply_walk_step(step);
                Ok(())
            }
            Err(err) => {
                self.walker = None;
                self.screen_pos = ScreenPos::of_tile(self.map_pos, self.config.tile_px());
                Err(err)
            }
        }
    }

    /// The only path through which a walk mutates the object.
    fn apply_walk_step(&mut self, step: WalkStep) {
        self.screen_pos = step.position;
        for _ in 0..step.frames_advanced {
            self.advance_frame(self.facing);
        }
        if let Some(destination) = step.arrived {
            self.walker = None;
            self.map_pos = destination;
            self.screen_pos = ScreenPos::of_tile(destination, self.config.tile_px());
            self.stop_frame(self.facing);
        }
    }

    fn face(&mut self, facing: Facing) {
        if self.facing != facing {
            self.facing = facing;
            self.anim = AnimationCursor::for_frame_count(self.frames.for_facing(facing).len());
        }
    }

    fn advance_frame(&mut self, facing: Facing) {
        self.face(facing);
        self.anim.advance();
    }

    fn stop_frame(&mut self, facing: Facing) {
        self.face(facing);
        self.anim.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::rendering::RecordingSink;
    use crate::content::{MapData, MemoryAssets};

    fn open_map(rows: &[&str]) -> TileMap {
        let mut assets =
            MemoryAssets::new().with_map("m", MapData::from_ascii(rows, MapPos::new(0, 0)));
        let mut map = TileMap::new(vec!["m".to_string()], 32);
        map.load_map(0, false, &mut assets).expect("load");
        map
    }

    fn walking_frames() -> FrameSet {
        FrameSet {
            up: vec!["up0".into(), "up1".into(), "up2".into()],
            down: vec!["down0".into(), "down1".into(), "down2".into()],
            side: vec!["side0".into(), "side1".into(), "side2".into()],
        }
    }

    fn player_at(map: &TileMap, pos: MapPos) -> SimObject {
        SimObject::new(
            ObjectId(0),
            ObjectSpec::player(pos, walking_frames()),
            map,
            &SimConfig::default(),
        )
        .expect("player")
    }

    #[test]
    fn construction_outside_extents_is_out_of_bounds() {
        let map = open_map(&["...", "..."]);
        let err = SimObject::new(
            ObjectId(1),
            ObjectSpec::static_object(
                MapPos::new(1, 2),
                TileSize::new(2, 1),
                FrameSet::single("rock"),
                true,
            ),
            &map,
            &SimConfig::default(),
        )
        .expect_err("err");
        match err {
            SimError::OutOfBounds { pos, .. } => assert_eq!(pos, MapPos::new(1, 3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn only_static_objects_may_opt_out_of_collision() {
        let map = open_map(&["...", "..."]);
        let mut spec = ObjectSpec::pickup(MapPos::new(0, 0), "key", FrameSet::single("chest"));
        spec.collision = false;
        let chest = SimObject::new(ObjectId(1), spec, &map, &SimConfig::default()).expect("chest");
        assert!(chest.collision_enabled());

        let ghost = SimObject::new(
            ObjectId(2),
            ObjectSpec::static_object(
                MapPos::new(1, 1),
                TileSize::default(),
                FrameSet::single("mist"),
                false,
            ),
            &map,
            &SimConfig::default(),
        )
        .expect("ghost");
        assert!(!ghost.collision_enabled());
    }

    #[test]
    fn pixel_position_tracks_tile_position() {
        let map = open_map(&["....", "...."]);
        let mut player = player_at(&map, MapPos::new(1, 2));
        assert_eq!(player.screen_pos(), ScreenPos::new(64, 32));
        assert_eq!(player.center(), ScreenPos::new(80, 48));

        player.set_map_pos(MapPos::new(0, 0), false);
        assert_eq!(player.screen_pos(), ScreenPos::new(0, 0));
        assert!(!player.is_moving());
    }

    #[test]
    fn set_screen_pos_snaps_to_containing_tile() {
        let map = open_map(&["....", "...."]);
        let mut player = player_at(&map, MapPos::new(0, 0));
        player.set_screen_pos(ScreenPos::new(70, 40), false);
        assert_eq!(player.map_pos(), MapPos::new(1, 2));
        assert_eq!(player.screen_pos(), ScreenPos::new(64, 32));
    }

    #[test]
    fn animated_move_walks_then_snaps() {
        let map = open_map(&["...."]);
        let mut player = player_at(&map, MapPos::new(0, 0));
        player.set_map_pos(MapPos::new(0, 1), true);
        assert!(player.is_moving());
        assert_eq!(player.facing(), Facing::Right);
        assert_eq!(player.screen_pos(), ScreenPos::new(0, 0));

        player.advance_walker(80).expect("tick");
        assert_eq!(player.screen_pos(), ScreenPos::new(16, 0));
        assert_eq!(player.animation().current(), 1);

        player.advance_walker(80).expect("tick");
        assert!(!player.is_moving());
        assert_eq!(player.map_pos(), MapPos::new(0, 1));
        assert_eq!(player.screen_pos(), ScreenPos::new(32, 0));
        assert_eq!(player.animation().current(), 0);
    }

    #[test]
    fn animation_wraps_to_loop_frame() {
        let mut cursor = AnimationCursor::for_frame_count(3);
        let seen: Vec<usize> = (0..5)
            .map(|_| {
                cursor.advance();
                cursor.current()
            })
            .collect();
        assert_eq!(seen, vec![1, 2, 1, 2, 1]);
        cursor.stop();
        assert_eq!(cursor.current(), 0);

        let mut still = AnimationCursor::for_frame_count(1);
        still.advance();
        assert_eq!(still.current(), 0);
    }

    #[test]
    fn map_collision_checks_the_whole_footprint() {
        let map = open_map(&["...", "..#", "..."]);
        let rock = SimObject::new(
            ObjectId(2),
            ObjectSpec::static_object(
                MapPos::new(0, 0),
                TileSize::new(2, 2),
                FrameSet::single("rock"),
                true,
            ),
            &map,
            &SimConfig::default(),
        )
        .expect("rock");
        assert!(!rock.check_map_collision(&map, 0, 0));
        assert!(rock.check_map_collision(&map, 0, 1));
        assert!(rock.check_map_collision(&map, -1, 0));
    }

    #[test]
    fn left_facing_renders_mirrored_side_frame() {
        let map = open_map(&["...."]);
        let mut player = player_at(&map, MapPos::new(0, 2));
        player.set_map_pos(MapPos::new(0, 1), true);
        let mut sink = RecordingSink::default();
        player.render(&mut sink, None);
        assert_eq!(sink.requests.len(), 1);
        assert_eq!(sink.requests[0].texture.as_str(), "side0");
        assert!(sink.requests[0].mirrored);
    }

    #[test]
    fn pickup_collide_registers_once_per_tick() {
        let map = open_map(&["...."]);
        let pickup = SimObject::new(
            ObjectId(7),
            ObjectSpec::pickup(MapPos::new(0, 3), "key", FrameSet::single("chest")),
            &map,
            &SimConfig::default(),
        )
        .expect("pickup");
        let mut events = TickEvents::default();
        assert!(pickup.collide(&mut events));
        assert!(pickup.collide(&mut events));
        assert_eq!(
            events.into_commands(),
            vec![
                TickCommand::RegisterHint("key".to_string()),
                TickCommand::UseCollectible,
                TickCommand::Unload(ObjectId(7)),
            ]
        );
    }

    #[test]
    fn static_objects_refuse_entry() {
        let map = open_map(&["...."]);
        let rock = SimObject::new(
            ObjectId(3),
            ObjectSpec::static_object(
                MapPos::new(0, 0),
                TileSize::default(),
                FrameSet::single("rock"),
                true,
            ),
            &map,
            &SimConfig::default(),
        )
        .expect("rock");
        let mut events = TickEvents::default();
        assert!(!rock.collide(&mut events));
        assert!(!rock.admits_entry());
        assert!(events.into_commands().is_empty());
    }

    #[test]
    fn filled_frame_set_copies_down_into_empty_directions() {
        let frames = FrameSet {
            down: vec!["d".into()],
            side: vec!["s".into()],
            ..FrameSet::default()
        }
        .filled();
        assert_eq!(frames.up, vec![TextureKey::from("d")]);
        assert_eq!(frames.side, vec![TextureKey::from("s")]);
        assert!(FrameSet::default().filled().is_empty());
    }
}
