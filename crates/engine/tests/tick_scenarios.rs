use tilequest_engine::{
    Extents, FrameSet, GameWorld, InputAction, InputSnapshot, MapData, MapPos, MemoryAssets,
    ObjectDef, ObjectDefKind, ObjectSpec, ScreenPos, SimConfig, SimError, TileSize,
};

fn world_with_map(rows: &[&str]) -> GameWorld {
    let assets = MemoryAssets::new()
        .with_map("level", MapData::from_ascii(rows, MapPos::new(0, 0)))
        .with_object(
            "chest",
            ObjectDef {
                kind: ObjectDefKind::Pickup {
                    hint: "key".to_string(),
                },
                size: TileSize::default(),
                collision: true,
                frames: FrameSet::single("chest"),
            },
        );
    let mut world = GameWorld::new(
        SimConfig::default(),
        vec!["level".to_string()],
        Box::new(assets),
    );
    world.load_map(0, false).expect("load map");
    world
}

fn open_rows(rows: usize, cols: usize) -> Vec<String> {
    vec![".".repeat(cols); rows]
}

fn held(action: InputAction) -> InputSnapshot {
    InputSnapshot::empty().with_action_down(action, true)
}

#[test]
fn every_out_of_bounds_cell_is_blocked() {
    let world = world_with_map(&["...", "..."]);
    let map = world.tile_map();
    assert_eq!(map.size(), Extents::new(2, 3));
    for row in -2..5 {
        for col in -2..6 {
            let pos = MapPos::new(row, col);
            if !map.contains(pos) {
                assert!(map.collision(pos), "{pos} should be blocked");
            }
        }
    }
}

#[test]
fn move_into_wall_is_rejected_without_starting_a_walk() {
    let mut world = world_with_map(&["......", "......", "...#..", "......"]);
    let player = world
        .spawn_object(ObjectSpec::player(MapPos::new(2, 2), FrameSet::single("hero")))
        .expect("player");

    world.run_tick(16, &held(InputAction::MoveRight));

    let player = world.object(player).expect("player");
    assert_eq!(player.map_pos(), MapPos::new(2, 2));
    assert_eq!(player.screen_pos(), ScreenPos::new(64, 64));
    assert!(!player.is_moving());
    assert!(player.walker().is_none());
}

#[test]
fn stepping_onto_pickup_collects_hint_and_removes_it() {
    let rows = open_rows(8, 8);
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();
    let mut world = world_with_map(&rows);
    let player = world
        .spawn_object(ObjectSpec::player(MapPos::new(5, 4), FrameSet::single("hero")))
        .expect("player");
    let chest = world.load_object("chest", MapPos::new(5, 5)).expect("chest");
    assert_eq!(world.total_collectibles(), 1);
    let remaining_before = world.remaining();

    world.run_tick(16, &held(InputAction::MoveRight));

    assert_eq!(world.hints(), &["key".to_string()]);
    assert_eq!(world.remaining(), remaining_before - 1);
    assert!(world.object(chest).is_none());
    assert_eq!(world.objects().len(), 1);
    assert_eq!(world.object(player).expect("player").map_pos(), MapPos::new(5, 5));
}

#[test]
fn static_object_blocks_adjacent_move() {
    let mut world = world_with_map(&["....", "...."]);
    let player = world
        .spawn_object(ObjectSpec::player(MapPos::new(0, 0), FrameSet::single("hero")))
        .expect("player");
    world
        .spawn_object(ObjectSpec::static_object(
            MapPos::new(0, 1),
            TileSize::new(1, 2),
            FrameSet::single("tree"),
            true,
        ))
        .expect("tree");
    world.update_collision();

    let probe = world.object(player).expect("player");
    assert!(probe.check_object_collision(world.collision_index(), 0, 1));
    assert!(!probe.check_object_collision(world.collision_index(), 1, 0));

    world.run_tick(16, &held(InputAction::MoveRight));
    assert_eq!(world.object(player).expect("player").map_pos(), MapPos::new(0, 0));
}

#[test]
fn unloaded_object_leaves_its_tile_unoccupied() {
    let mut world = world_with_map(&["....", "...."]);
    let rock = world
        .spawn_object(ObjectSpec::static_object(
            MapPos::new(1, 1),
            TileSize::default(),
            FrameSet::single("rock"),
            true,
        ))
        .expect("rock");
    world.update_collision();
    assert_eq!(world.collision_at(MapPos::new(1, 1)), Some(rock));

    world.unload_object(rock).expect("unload");
    assert_eq!(world.collision_at(MapPos::new(1, 1)), None);
    world.update_collision();
    assert_eq!(world.collision_at(MapPos::new(1, 1)), None);
}

#[test]
fn collectible_counters_follow_add_and_use() {
    let mut world = world_with_map(&[".."]);
    assert_eq!(world.total_collectibles(), 0);
    assert_eq!(world.collected(), 0);
    for _ in 0..3 {
        world.add_collectible();
    }
    for _ in 0..2 {
        assert!(world.use_collectible());
    }
    assert_eq!(world.remaining(), 1);
    assert_eq!(world.collected(), 2);
}

#[test]
fn overlapping_objects_are_flagged_without_aborting_the_tick() {
    let mut world = world_with_map(&["...", "..."]);
    let first = world
        .spawn_object(ObjectSpec::static_object(
            MapPos::new(0, 0),
            TileSize::new(2, 1),
            FrameSet::single("crate"),
            true,
        ))
        .expect("first");
    let second = world
        .spawn_object(ObjectSpec::static_object(
            MapPos::new(0, 1),
            TileSize::default(),
            FrameSet::single("crate"),
            true,
        ))
        .expect("second");

    world.run_tick(16, &InputSnapshot::empty());

    let diagnostics = world.diagnostics();
    assert_eq!(diagnostics.last_conflicts.len(), 1);
    assert_eq!(diagnostics.last_conflicts[0].kept, second);
    assert_eq!(diagnostics.last_conflicts[0].displaced, first);
    assert_eq!(world.collision_at(MapPos::new(0, 1)), Some(second));
    assert_eq!(world.collision_at(MapPos::new(0, 0)), Some(first));
    assert_eq!(world.playtime_ms(), 16);

    let err = SimError::from(diagnostics.last_conflicts[0]);
    assert!(matches!(err, SimError::CollisionConflict { .. }));
}

#[test]
fn walk_finishes_on_the_destination_regardless_of_tick_size() {
    let rows = open_rows(4, 4);
    let rows: Vec<&str> = rows.iter().map(String::as_str).collect();

    let run = |deltas: &[u64]| {
        let mut world = world_with_map(&rows);
        let id = world
            .spawn_object(ObjectSpec::player(MapPos::new(0, 0), FrameSet::single("hero")))
            .expect("player");
        world
            .place_object(id, MapPos::new(2, 1), true)
            .expect("place");
        for delta in deltas {
            world.run_tick(*delta, &InputSnapshot::empty());
        }
        let player = world.object(id).expect("player").clone();
        (player.map_pos(), player.screen_pos(), player.is_moving(), player.animation())
    };

    let deadline = {
        let mut world = world_with_map(&rows);
        let id = world
            .spawn_object(ObjectSpec::player(MapPos::new(0, 0), FrameSet::single("hero")))
            .expect("player");
        world.place_object(id, MapPos::new(2, 1), true).expect("place");
        world
            .object(id)
            .and_then(|player| player.walker())
            .and_then(|walker| walker.movement_deadline_ms())
            .expect("deadline")
    };

    let single = run(&[deadline]);
    let mut chunks = vec![7; (deadline / 7) as usize];
    chunks.push(deadline % 7);
    let chunked = run(&chunks);

    assert_eq!(single, chunked);
    assert_eq!(single.0, MapPos::new(2, 1));
    assert_eq!(single.1, ScreenPos::new(32, 64));
    assert!(!single.2);
}

#[test]
fn map_reload_with_respawn_rebuilds_collision() {
    let mut world = world_with_map(&["...", "..."]);
    let player = world
        .spawn_object(ObjectSpec::player(MapPos::new(1, 2), FrameSet::single("hero")))
        .expect("player");
    world.update_collision();
    assert_eq!(world.collision_at(MapPos::new(1, 2)), Some(player));

    world.load_map(0, true).expect("reload");
    assert_eq!(world.collision_at(MapPos::new(0, 0)), Some(player));
    assert_eq!(world.collision_at(MapPos::new(1, 2)), None);

    let err = world.load_map(4, false).expect_err("err");
    assert!(matches!(err, SimError::InvalidMapIndex { index: 4, .. }));
}
