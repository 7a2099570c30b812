use std::collections::HashMap;

use crate::app::{Extents, FrameSet, MapPos, TextureKey, TileSize};

use super::error::{ContentError, ContentErrorCode};

/// Asset-loading collaborator: turns resource ids into map and object data.
pub trait AssetLoader {
    fn load_map(&mut self, resource: &str) -> Result<MapData, ContentError>;
    fn load_object(&mut self, resource: &str) -> Result<ObjectDef, ContentError>;
}

/// A parsed map: layered texture grid plus walkability, both row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    pub extents: Extents,
    pub layers: Vec<Vec<Option<TextureKey>>>,
    pub walkable: Vec<bool>,
    pub spawn: MapPos,
}

impl MapData {
    /// Builds a single-layer map from rows of `.` (floor) and `#` (wall).
    pub fn from_ascii(rows: &[&str], spawn: MapPos) -> Self {
        let row_count = rows.len() as u32;
        let col_count = rows.iter().map(|row| row.chars().count()).max().unwrap_or(0) as u32;
        let extents = Extents::new(row_count, col_count);
        let mut walkable = Vec::with_capacity(extents.cell_count());
        let mut layer = Vec::with_capacity(extents.cell_count());
        for row in rows {
            let mut chars = row.chars();
            for _ in 0..col_count {
                let blocked = chars.next() == Some('#');
                walkable.push(!blocked);
                layer.push(Some(TextureKey::from(if blocked { "wall" } else { "floor" })));
            }
        }
        Self {
            extents,
            layers: vec![layer],
            walkable,
            spawn,
        }
    }

    pub fn validate(&self, resource: &str) -> Result<(), ContentError> {
        let expected = self.extents.cell_count();
        if self.walkable.len() != expected {
            return Err(ContentError::new(
                ContentErrorCode::ShapeMismatch,
                format!(
                    "walkability grid has {} cells; map extents {} need {}",
                    self.walkable.len(),
                    self.extents,
                    expected
                ),
                resource,
            ));
        }
        for (index, layer) in self.layers.iter().enumerate() {
            if layer.len() != expected {
                return Err(ContentError::new(
                    ContentErrorCode::ShapeMismatch,
                    format!(
                        "layer {} has {} cells; map extents {} need {}",
                        index,
                        layer.len(),
                        self.extents,
                        expected
                    ),
                    resource,
                ));
            }
        }
        if !self.extents.contains(self.spawn) {
            return Err(ContentError::new(
                ContentErrorCode::InvalidValue,
                format!(
                    "spawn {} lies outside map extents {}",
                    self.spawn, self.extents
                ),
                resource,
            ));
        }
        Ok(())
    }

    pub fn walkable_at(&self, pos: MapPos) -> bool {
        self.extents
            .index_of(pos)
            .and_then(|index| self.walkable.get(index).copied())
            .unwrap_or(false)
    }

    pub fn tile_at(&self, layer: usize, pos: MapPos) -> Option<&TextureKey> {
        let index = self.extents.index_of(pos)?;
        self.layers.get(layer)?.get(index)?.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectDefKind {
    Player,
    Static,
    Pickup { hint: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectDef {
    pub kind: ObjectDefKind,
    pub size: TileSize,
    pub collision: bool,
    pub frames: FrameSet,
}

/// In-memory loader keyed by resource id.
#[derive(Debug, Default, Clone)]
pub struct MemoryAssets {
    maps: HashMap<String, MapData>,
    objects: HashMap<String, ObjectDef>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_map(mut self, resource: impl Into<String>, map: MapData) -> Self {
        self.insert_map(resource, map);
        self
    }

    pub fn with_object(mut self, resource: impl Into<String>, object: ObjectDef) -> Self {
        self.insert_object(resource, object);
        self
    }

    pub fn insert_map(&mut self, resource: impl Into<String>, map: MapData) {
        self.maps.insert(resource.into(), map);
    }

    pub fn insert_object(&mut self, resource: impl Into<String>, object: ObjectDef) {
        self.objects.insert(resource.into(), object);
    }
}

impl AssetLoader for MemoryAssets {
    fn load_map(&mut self, resource: &str) -> Result<MapData, ContentError> {
        let map = self.maps.get(resource).cloned().ok_or_else(|| {
            ContentError::new(
                ContentErrorCode::UnknownResource,
                "no map registered under this id",
                resource,
            )
        })?;
        map.validate(resource)?;
        Ok(map)
    }

    fn load_object(&mut self, resource: &str) -> Result<ObjectDef, ContentError> {
        self.objects.get(resource).cloned().ok_or_else(|| {
            ContentError::new(
                ContentErrorCode::UnknownResource,
                "no object registered under this id",
                resource,
            )
        })
    }
}
