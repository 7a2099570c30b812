use std::fmt;

/// Integer tile coordinate. Rows grow downward, columns grow rightward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct MapPos {
    pub row: i32,
    pub col: i32,
}

impl MapPos {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub const fn offset(self, d_row: i32, d_col: i32) -> Self {
        Self {
            row: self.row + d_row,
            col: self.col + d_col,
        }
    }
}

impl fmt::Display for MapPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Pixel coordinate in world space (tile (0,0) top-left corner is the origin).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ScreenPos {
    pub x: i32,
    pub y: i32,
}

impl ScreenPos {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn of_tile(pos: MapPos, tile_px: i32) -> Self {
        Self {
            x: pos.col * tile_px,
            y: pos.row * tile_px,
        }
    }

    /// Tile containing this pixel, rounding toward negative infinity.
    pub fn containing_tile(self, tile_px: i32) -> MapPos {
        let tile_px = tile_px.max(1);
        MapPos {
            row: self.y.div_euclid(tile_px),
            col: self.x.div_euclid(tile_px),
        }
    }
}

/// Object footprint measured in tiles: `x` columns wide, `y` rows tall.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileSize {
    pub x: u32,
    pub y: u32,
}

impl Default for TileSize {
    fn default() -> Self {
        Self { x: 1, y: 1 }
    }
}

impl TileSize {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Tile span as `(rows, cols)`, at least one tile each way and saturated to `i32`.
    pub fn span(self) -> (i32, i32) {
        (saturate_i32(self.y.max(1)), saturate_i32(self.x.max(1)))
    }

    /// Every tile covered by an object of this size anchored at `origin`.
    pub fn footprint(self, origin: MapPos) -> impl Iterator<Item = MapPos> {
        let (rows, cols) = self.span();
        (0..rows).flat_map(move |dr| (0..cols).map(move |dc| origin.offset(dr, dc)))
    }
}

fn saturate_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Extents {
    pub rows: u32,
    pub cols: u32,
}

impl Extents {
    pub const fn new(rows: u32, cols: u32) -> Self {
        Self { rows, cols }
    }

    pub fn contains(self, pos: MapPos) -> bool {
        pos.row >= 0
            && pos.col >= 0
            && (pos.row as u32) < self.rows
            && (pos.col as u32) < self.cols
    }

    /// First tile of the footprint of `size` at `origin` that lies outside,
    /// in the same row-major order as [`TileSize::footprint`].
    pub fn first_outside(self, origin: MapPos, size: TileSize) -> Option<MapPos> {
        if !self.contains(origin) {
            return Some(origin);
        }
        let (rows, cols) = size.span();
        if i64::from(origin.col) + i64::from(cols) > i64::from(self.cols) {
            return Some(MapPos::new(origin.row, saturate_i32(self.cols)));
        }
        if i64::from(origin.row) + i64::from(rows) > i64::from(self.rows) {
            return Some(MapPos::new(saturate_i32(self.rows), origin.col));
        }
        None
    }

    pub fn cell_count(self) -> usize {
        self.rows as usize * self.cols as usize
    }

    pub(crate) fn index_of(self, pos: MapPos) -> Option<usize> {
        if !self.contains(pos) {
            return None;
        }
        Some(pos.row as usize * self.cols as usize + pos.col as usize)
    }
}

impl fmt::Display for Extents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.rows, self.cols)
    }
}

/// Grows one storage axis to fit `target`, at least doubling when it grows at all.
pub(crate) fn grow_extent(current: u32, target: i64) -> u32 {
    if target <= i64::from(current) {
        return current;
    }
    let target = u32::try_from(target).unwrap_or(u32::MAX);
    target.max(current.saturating_mul(2))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Facing {
    Up,
    #[default]
    Down,
    Left,
    Right,
}

impl Facing {
    /// Facing for a tile step; the dominant axis wins, vertical on ties.
    pub fn from_step(d_row: i32, d_col: i32) -> Option<Self> {
        if d_row == 0 && d_col == 0 {
            return None;
        }
        if d_row.abs() >= d_col.abs() {
            Some(if d_row < 0 { Facing::Up } else { Facing::Down })
        } else {
            Some(if d_col < 0 { Facing::Left } else { Facing::Right })
        }
    }

    pub const fn step(self) -> (i32, i32) {
        match self {
            Facing::Up => (-1, 0),
            Facing::Down => (1, 0),
            Facing::Left => (0, -1),
            Facing::Right => (0, 1),
        }
    }

    pub const fn is_mirrored(self) -> bool {
        matches!(self, Facing::Left)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureKey(pub String);

impl TextureKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TextureKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default)]
pub struct ObjectIdAllocator {
    next: u64,
}

impl ObjectIdAllocator {
    pub fn allocate(&mut self) -> ObjectId {
        let id = ObjectId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}
