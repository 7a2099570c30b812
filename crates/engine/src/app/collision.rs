use super::object::SimObject;
use super::types::{grow_extent, Extents, MapPos, ObjectId};

/// Two collision-enabled objects resolved to the same tile during a rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionConflict {
    pub pos: MapPos,
    /// Later-inserted object, which keeps the tile.
    pub kept: ObjectId,
    pub displaced: ObjectId,
}

/// Tile -> occupying object, rebuilt from the live object list.
///
/// Grows with the same amortized doubling as the tile map's storage.
#[derive(Debug, Clone, Default)]
pub struct CollisionIndex {
    extents: Extents,
    cells: Vec<Option<ObjectId>>,
}

impl CollisionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extents(&self) -> Extents {
        self.extents
    }

    /// Clears the index and inserts every collision-enabled object in order.
    ///
    /// A tile claimed twice keeps the later object; each clash is returned.
    pub fn rebuild(
        &mut self,
        map_extents: Extents,
        objects: &[SimObject],
    ) -> Vec<CollisionConflict> {
        self.extents = Extents::new(
            grow_extent(self.extents.rows, i64::from(map_extents.rows)),
            grow_extent(self.extents.cols, i64::from(map_extents.cols)),
        );
        self.cells.clear();
        self.cells.resize(self.extents.cell_count(), None);

        let mut conflicts = Vec::new();
        for object in objects.iter().filter(|object| object.collision_enabled()) {
            let id = object.id();
            for pos in object.size().footprint(object.map_pos()) {
                let Some(index) = self.extents.index_of(pos) else {
                    continue;
                };
                if let Some(previous) = self.cells[index].replace(id) {
                    if previous != id {
                        conflicts.push(CollisionConflict {
                            pos,
                            kept: id,
                            displaced: previous,
                        });
                    }
                }
            }
        }
        conflicts
    }

    pub fn occupant(&self, pos: MapPos) -> Option<ObjectId> {
        let index = self.extents.index_of(pos)?;
        self.cells.get(index).copied().flatten()
    }

    /// Drops every tile held by `id`; returns whether any was held.
    pub fn remove(&mut self, id: ObjectId) -> bool {
        let mut removed = false;
        for cell in &mut self.cells {
            if *cell == Some(id) {
                *cell = None;
                removed = true;
            }
        }
        removed
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::config::SimConfig;
    use crate::app::object::{FrameSet, ObjectSpec};
    use crate::app::tilemap::TileMap;
    use crate::app::types::TileSize;
    use crate::content::{MapData, MemoryAssets};

    fn map(rows: &[&str]) -> TileMap {
        let mut assets =
            MemoryAssets::new().with_map("m", MapData::from_ascii(rows, MapPos::new(0, 0)));
        let mut map = TileMap::new(vec!["m".to_string()], 32);
        map.load_map(0, false, &mut assets).expect("load");
        map
    }

    fn rock(id: u64, pos: MapPos, size: TileSize, collision: bool, map: &TileMap) -> SimObject {
        SimObject::new(
            ObjectId(id),
            ObjectSpec::static_object(pos, size, FrameSet::single("rock"), collision),
            map,
            &SimConfig::default(),
        )
        .expect("rock")
    }

    #[test]
    fn rebuild_indexes_full_footprints_and_skips_disabled_objects() {
        let map = map(&["....", "....", "...."]);
        let objects = vec![
            rock(0, MapPos::new(0, 0), TileSize::new(2, 2), true, &map),
            rock(1, MapPos::new(2, 3), TileSize::default(), false, &map),
        ];
        let mut index = CollisionIndex::new();
        let conflicts = index.rebuild(map.size(), &objects);
        assert!(conflicts.is_empty());
        assert_eq!(index.occupied_count(), 4);
        assert_eq!(index.occupant(MapPos::new(1, 1)), Some(ObjectId(0)));
        assert_eq!(index.occupant(MapPos::new(2, 3)), None);
        assert_eq!(index.occupant(MapPos::new(-1, 0)), None);
    }

    #[test]
    fn shared_tile_keeps_the_later_object_and_reports_conflict() {
        let map = map(&["...", "..."]);
        let objects = vec![
            rock(4, MapPos::new(1, 1), TileSize::default(), true, &map),
            rock(9, MapPos::new(1, 1), TileSize::default(), true, &map),
        ];
        let mut index = CollisionIndex::new();
        let conflicts = index.rebuild(map.size(), &objects);
        assert_eq!(
            conflicts,
            vec![CollisionConflict {
                pos: MapPos::new(1, 1),
                kept: ObjectId(9),
                displaced: ObjectId(4),
            }]
        );
        assert_eq!(index.occupant(MapPos::new(1, 1)), Some(ObjectId(9)));
    }

    #[test]
    fn adjacent_probe_reports_the_occupant() {
        let map = map(&["...", "..."]);
        let objects = vec![
            rock(0, MapPos::new(0, 0), TileSize::default(), true, &map),
            rock(1, MapPos::new(0, 1), TileSize::default(), true, &map),
        ];
        let mut index = CollisionIndex::new();
        index.rebuild(map.size(), &objects);
        assert!(objects[0].check_object_collision(&index, 0, 1));
        assert!(!objects[0].check_object_collision(&index, 1, 0));
        assert!(!objects[0].check_object_collision(&index, 0, 0));
    }

    #[test]
    fn remove_clears_every_tile_of_the_object() {
        let map = map(&["...", "..."]);
        let objects = vec![rock(3, MapPos::new(0, 0), TileSize::new(3, 1), true, &map)];
        let mut index = CollisionIndex::new();
        index.rebuild(map.size(), &objects);
        assert!(index.remove(ObjectId(3)));
        assert_eq!(index.occupied_count(), 0);
        assert!(!index.remove(ObjectId(3)));
    }

    #[test]
    fn index_extents_grow_and_never_shrink() {
        let mut index = CollisionIndex::new();
        index.rebuild(Extents::new(3, 2), &[]);
        assert_eq!(index.extents(), Extents::new(3, 2));
        index.rebuild(Extents::new(4, 2), &[]);
        assert_eq!(index.extents(), Extents::new(6, 2));
        index.rebuild(Extents::new(1, 1), &[]);
        assert_eq!(index.extents(), Extents::new(6, 2));
    }
}
