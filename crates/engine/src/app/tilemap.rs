use tracing::{debug, info};

use crate::content::AssetLoader;
use crate::SimError;

use super::rendering::{DrawRequest, RenderSink, Viewport};
use super::types::{grow_extent, Extents, MapPos, ScreenPos, TextureKey};

/// Outcome of a successful [`TileMap::load_map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapLoaded {
    pub index: usize,
    pub spawn: MapPos,
    /// Set when the caller asked for the respawn-target object to be moved to `spawn`.
    pub respawn_requested: bool,
}

/// Layered tile grid plus a parallel walkability grid.
///
/// Storage extents only grow. Cells outside the grid are treated as blocked by
/// [`TileMap::collision`].
#[derive(Debug, Clone)]
pub struct TileMap {
    maps: Vec<String>,
    current_map: Option<usize>,
    spawn: MapPos,
    extents: Extents,
    map_extents: Extents,
    /// `[layer][row][col]`
    layers: Vec<Vec<Vec<Option<TextureKey>>>>,
    /// `[row][col]`
    walkable: Vec<Vec<bool>>,
    tile_px: i32,
}

impl TileMap {
    pub fn new(maps: Vec<String>, tile_px: i32) -> Self {
        Self {
            maps,
            current_map: None,
            spawn: MapPos::default(),
            extents: Extents::default(),
            map_extents: Extents::default(),
            layers: Vec::new(),
            walkable: Vec::new(),
            tile_px: tile_px.max(1),
        }
    }

    pub fn map_count(&self) -> usize {
        self.maps.len()
    }

    pub fn current_map(&self) -> Option<usize> {
        self.current_map
    }

    pub fn load_map(
        &mut self,
        index: usize,
        respawn: bool,
        assets: &mut dyn AssetLoader,
    ) -> Result<MapLoaded, SimError> {
        let Some(resource) = self.maps.get(index).cloned() else {
            return Err(SimError::InvalidMapIndex {
                index,
                map_count: self.maps.len(),
            });
        };
        let data = assets.load_map(&resource)?;
        data.validate(&resource)?;

        self.resize_storage(data.extents.rows as i32, data.extents.cols as i32, true);

        self.layers = (0..data.layers.len())
            .map(|_| vec![vec![None; self.extents.cols as usize]; self.extents.rows as usize])
            .collect();
        for row in 0..self.extents.rows as i32 {
            for col in 0..self.extents.cols as i32 {
                let pos = MapPos::new(row, col);
                let (r, c) = (row as usize, col as usize);
                // Storage beyond the loaded map's footprint stays blocked.
                self.walkable[r][c] = data.walkable_at(pos);
                for (layer_index, layer) in self.layers.iter_mut().enumerate() {
                    layer[r][c] = data.tile_at(layer_index, pos).cloned();
                }
            }
        }

        self.current_map = Some(index);
        self.spawn = data.spawn;
        self.map_extents = data.extents;
        info!(
            map_index = index,
            resource = resource.as_str(),
            rows = data.extents.rows,
            cols = data.extents.cols,
            storage = %self.extents,
            layers = self.layers.len(),
            "map_loaded"
        );

        Ok(MapLoaded {
            index,
            spawn: data.spawn,
            respawn_requested: respawn,
        })
    }

    /// Spawn cell of the last loaded map; `None` until a map is loaded.
    pub fn spawn(&self) -> Option<MapPos> {
        self.current_map.map(|_| self.spawn)
    }

    /// `true` when the cell is not walkable or lies outside the grid.
    pub fn collision(&self, pos: MapPos) -> bool {
        if !self.extents.contains(pos) {
            return true;
        }
        !self.walkable[pos.row as usize][pos.col as usize]
    }

    pub fn size(&self) -> Extents {
        self.extents
    }

    /// Extents of the last loaded map, which may be smaller than storage.
    pub fn map_size(&self) -> Extents {
        self.map_extents
    }

    pub fn contains(&self, pos: MapPos) -> bool {
        self.extents.contains(pos)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn tile_at(&self, layer: usize, pos: MapPos) -> Option<&TextureKey> {
        if !self.extents.contains(pos) {
            return None;
        }
        self.layers.get(layer)?[pos.row as usize][pos.col as usize].as_ref()
    }

    pub fn set_walkable(&mut self, pos: MapPos, walkable: bool) -> Result<(), SimError> {
        if !self.extents.contains(pos) {
            return Err(SimError::OutOfBounds {
                pos,
                extents: self.extents,
            });
        }
        self.walkable[pos.row as usize][pos.col as usize] = walkable;
        Ok(())
    }

    /// Grows storage to fit `rows` x `cols` (or current + delta when not `absolute`).
    ///
    /// Existing cells keep their contents; new cells start walkable and empty.
    pub fn resize_storage(&mut self, rows: i32, cols: i32, absolute: bool) -> Extents {
        let (target_rows, target_cols) = if absolute {
            (i64::from(rows), i64::from(cols))
        } else {
            (
                i64::from(self.extents.rows) + i64::from(rows),
                i64::from(self.extents.cols) + i64::from(cols),
            )
        };
        let next = Extents::new(
            grow_extent(self.extents.rows, target_rows),
            grow_extent(self.extents.cols, target_cols),
        );
        if next == self.extents {
            return next;
        }

        let (row_count, col_count) = (next.rows as usize, next.cols as usize);
        for row in &mut self.walkable {
            row.resize(col_count, true);
        }
        self.walkable.resize(row_count, vec![true; col_count]);
        for layer in &mut self.layers {
            for row in layer.iter_mut() {
                row.resize(col_count, None);
            }
            layer.resize(row_count, vec![None; col_count]);
        }

        debug!(from = %self.extents, to = %next, "map_storage_grown");
        self.extents = next;
        next
    }

    /// Draws every non-empty tile, layer by layer, culled to the viewport if given.
    pub fn render(
        &self,
        sink: &mut dyn RenderSink,
        camera: Option<ScreenPos>,
        viewport: Option<Viewport>,
    ) {
        let (rows, cols) = self.visible_range(camera, viewport);
        for layer in &self.layers {
            for row in rows.clone() {
                for col in cols.clone() {
                    let Some(texture) = &layer[row as usize][col as usize] else {
                        continue;
                    };
                    sink.draw(DrawRequest {
                        texture: texture.clone(),
                        position: ScreenPos::of_tile(MapPos::new(row, col), self.tile_px),
                        camera,
                        mirrored: false,
                    });
                }
            }
        }
    }

    fn visible_range(
        &self,
        camera: Option<ScreenPos>,
        viewport: Option<Viewport>,
    ) -> (std::ops::Range<i32>, std::ops::Range<i32>) {
        let all_rows = 0..self.extents.rows as i32;
        let all_cols = 0..self.extents.cols as i32;
        let (Some(camera), Some(viewport)) = (camera, viewport) else {
            return (all_rows, all_cols);
        };
        let first = ScreenPos::new(camera.x, camera.y).containing_tile(self.tile_px);
        let last = ScreenPos::new(
            camera.x + viewport.width as i32 - 1,
            camera.y + viewport.height as i32 - 1,
        )
        .containing_tile(self.tile_px);
        let rows = first.row.max(0)..(last.row + 1).min(all_rows.end);
        let cols = first.col.max(0)..(last.col + 1).min(all_cols.end);
        (rows, cols)
    }
}
