use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::{Document, Node};
use tracing::debug;

use crate::app::{Extents, FrameSet, MapPos, TextureKey, TileSize};

use super::error::{ContentError, ContentErrorCode, SourceLocation};
use super::loader::{AssetLoader, MapData, ObjectDef, ObjectDefKind};

const EMPTY_TILE: &str = ".";
const WALKABLE_CELL: char = '.';
const BLOCKED_CELL: char = '#';

/// Filesystem loader reading `<Map>` and `<Object>` XML documents relative to `root`.
#[derive(Debug, Clone)]
pub struct XmlAssets {
    root: PathBuf,
}

impl XmlAssets {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, resource: &str) -> Result<(PathBuf, String), ContentError> {
        let path = self.root.join(resource);
        let raw = fs::read_to_string(&path).map_err(|source| ContentError {
            code: ContentErrorCode::ReadFile,
            message: format!("failed to read XML file: {source}"),
            resource: resource.to_string(),
            file_path: Some(path.clone()),
            location: None,
        })?;
        Ok((path, raw))
    }
}

impl AssetLoader for XmlAssets {
    fn load_map(&mut self, resource: &str) -> Result<MapData, ContentError> {
        let (path, raw) = self.read(resource)?;
        let map = parse_map_document(resource, &path, &raw)?;
        map.validate(resource).map_err(|mut error| {
            error.file_path = Some(path.clone());
            error
        })?;
        debug!(
            resource,
            rows = map.extents.rows,
            cols = map.extents.cols,
            layers = map.layers.len(),
            "map_resource_parsed"
        );
        Ok(map)
    }

    fn load_object(&mut self, resource: &str) -> Result<ObjectDef, ContentError> {
        let (path, raw) = self.read(resource)?;
        parse_object_document(resource, &path, &raw)
    }
}

struct ParseCtx<'a, 'input> {
    resource: &'a str,
    file_path: &'a Path,
    doc: &'a Document<'input>,
}

impl ParseCtx<'_, '_> {
    fn error_at(
        &self,
        code: ContentErrorCode,
        message: String,
        node: Node<'_, '_>,
    ) -> ContentError {
        let pos = self.doc.text_pos_at(node.range().start);
        ContentError {
            code,
            message,
            resource: self.resource.to_string(),
            file_path: Some(self.file_path.to_path_buf()),
            location: Some(SourceLocation {
                line: pos.row as usize,
                column: pos.col as usize,
            }),
        }
    }

    fn attr<T: FromStr>(&self, node: Node<'_, '_>, name: &str) -> Result<Option<T>, ContentError> {
        let Some(raw) = node.attribute(name) else {
            return Ok(None);
        };
        raw.trim().parse::<T>().map(Some).map_err(|_| {
            self.error_at(
                ContentErrorCode::InvalidValue,
                format!(
                    "attribute {}='{}' on <{}> is not a valid value",
                    name,
                    raw,
                    node.tag_name().name()
                ),
                node,
            )
        })
    }

    fn required_attr<T: FromStr>(&self, node: Node<'_, '_>, name: &str) -> Result<T, ContentError> {
        self.attr(node, name)?.ok_or_else(|| {
            self.error_at(
                ContentErrorCode::MissingField,
                format!(
                    "missing required attribute '{}' on <{}>",
                    name,
                    node.tag_name().name()
                ),
                node,
            )
        })
    }
}

fn parse_document<'input>(
    resource: &str,
    file_path: &Path,
    raw: &'input str,
) -> Result<Document<'input>, ContentError> {
    Document::parse(raw).map_err(|error| ContentError {
        code: ContentErrorCode::XmlMalformed,
        message: format!("malformed XML: {error}"),
        resource: resource.to_string(),
        file_path: Some(file_path.to_path_buf()),
        location: Some(SourceLocation {
            line: error.pos().row as usize,
            column: error.pos().col as usize,
        }),
    })
}

fn text_rows<'a>(node: Node<'a, '_>) -> Vec<&'a str> {
    node.text()
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

pub(crate) fn parse_map_document(
    resource: &str,
    file_path: &Path,
    raw: &str,
) -> Result<MapData, ContentError> {
    let doc = parse_document(resource, file_path, raw)?;
    let ctx = ParseCtx {
        resource,
        file_path,
        doc: &doc,
    };
    let root = doc.root_element();
    if root.tag_name().name() != "Map" {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Map>".to_string(),
            root,
        ));
    }

    let rows: u32 = ctx.required_attr(root, "rows")?;
    let cols: u32 = ctx.required_attr(root, "cols")?;
    let spawn = MapPos::new(
        ctx.required_attr(root, "spawnRow")?,
        ctx.required_attr(root, "spawnCol")?,
    );
    let extents = Extents::new(rows, cols);

    let mut layers = Vec::new();
    let mut walkable: Option<Vec<bool>> = None;
    for child in root.children().filter(|node| node.is_element()) {
        match child.tag_name().name() {
            "Layer" => layers.push(parse_layer(&ctx, child, extents)?),
            "Walk" => {
                if walkable.is_some() {
                    return Err(ctx.error_at(
                        ContentErrorCode::DuplicateField,
                        "duplicate <Walk> grid in <Map>".to_string(),
                        child,
                    ));
                }
                walkable = Some(parse_walk(&ctx, child, extents)?);
            }
            other => {
                return Err(ctx.error_at(
                    ContentErrorCode::UnknownField,
                    format!("unknown element <{}> in <Map>", other),
                    child,
                ))
            }
        }
    }

    let Some(walkable) = walkable else {
        return Err(ctx.error_at(
            ContentErrorCode::MissingField,
            "missing required <Walk> grid in <Map>".to_string(),
            root,
        ));
    };

    Ok(MapData {
        extents,
        layers,
        walkable,
        spawn,
    })
}

fn parse_layer(
    ctx: &ParseCtx<'_, '_>,
    node: Node<'_, '_>,
    extents: Extents,
) -> Result<Vec<Option<TextureKey>>, ContentError> {
    let rows = text_rows(node);
    check_row_count(ctx, node, rows.len(), extents)?;
    let mut cells = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        let keys: Vec<&str> = row.split_whitespace().collect();
        if keys.len() != extents.cols as usize {
            return Err(ctx.error_at(
                ContentErrorCode::ShapeMismatch,
                format!(
                    "<Layer> row {} has {} tiles; expected {}",
                    row_index,
                    keys.len(),
                    extents.cols
                ),
                node,
            ));
        }
        cells.extend(keys.into_iter().map(|key| {
            if key == EMPTY_TILE {
                None
            } else {
                Some(TextureKey::from(key))
            }
        }));
    }
    Ok(cells)
}

fn parse_walk(
    ctx: &ParseCtx<'_, '_>,
    node: Node<'_, '_>,
    extents: Extents,
) -> Result<Vec<bool>, ContentError> {
    let rows = text_rows(node);
    check_row_count(ctx, node, rows.len(), extents)?;
    // Capacity comes from the text; `cols` is untrusted until every row matches it.
    let mut cells = Vec::with_capacity(rows.iter().map(|row| row.len()).sum());
    for (row_index, row) in rows.iter().enumerate() {
        if row.chars().count() != extents.cols as usize {
            return Err(ctx.error_at(
                ContentErrorCode::ShapeMismatch,
                format!(
                    "<Walk> row {} has {} cells; expected {}",
                    row_index,
                    row.chars().count(),
                    extents.cols
                ),
                node,
            ));
        }
        for cell in row.chars() {
            match cell {
                WALKABLE_CELL => cells.push(true),
                BLOCKED_CELL => cells.push(false),
                other => {
                    return Err(ctx.error_at(
                        ContentErrorCode::InvalidValue,
                        format!(
                            "invalid walk cell '{}'; allowed values: '{}' '{}'",
                            other, WALKABLE_CELL, BLOCKED_CELL
                        ),
                        node,
                    ))
                }
            }
        }
    }
    Ok(cells)
}

fn check_row_count(
    ctx: &ParseCtx<'_, '_>,
    node: Node<'_, '_>,
    found: usize,
    extents: Extents,
) -> Result<(), ContentError> {
    if found == extents.rows as usize {
        return Ok(());
    }
    Err(ctx.error_at(
        ContentErrorCode::ShapeMismatch,
        format!(
            "<{}> has {} rows; expected {}",
            node.tag_name().name(),
            found,
            extents.rows
        ),
        node,
    ))
}

pub(crate) fn parse_object_document(
    resource: &str,
    file_path: &Path,
    raw: &str,
) -> Result<ObjectDef, ContentError> {
    let doc = parse_document(resource, file_path, raw)?;
    let ctx = ParseCtx {
        resource,
        file_path,
        doc: &doc,
    };
    let root = doc.root_element();
    if root.tag_name().name() != "Object" {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidRoot,
            "root element must be <Object>".to_string(),
            root,
        ));
    }
    let kind_name: String = ctx.required_attr(root, "kind")?;

    let mut seen_fields = HashSet::<String>::new();
    let mut size = TileSize::default();
    let mut collision = true;
    let mut hint: Option<String> = None;
    let mut frames = FrameSet::default();
    for field in root.children().filter(|node| node.is_element()) {
        let field_name = field.tag_name().name();
        let dedup_key = match field_name {
            "frames" => format!("frames:{}", field.attribute("dir").unwrap_or_default()),
            _ => field_name.to_string(),
        };
        if !seen_fields.insert(dedup_key) {
            return Err(ctx.error_at(
                ContentErrorCode::DuplicateField,
                format!("duplicate field <{}> in <Object>", field_name),
                field,
            ));
        }

        match field_name {
            "size" => {
                size = TileSize::new(
                    ctx.attr(field, "x")?.unwrap_or(1),
                    ctx.attr(field, "y")?.unwrap_or(1),
                );
                if size.x == 0 || size.y == 0 {
                    return Err(ctx.error_at(
                        ContentErrorCode::InvalidValue,
                        "object size must be at least 1x1".to_string(),
                        field,
                    ));
                }
            }
            "collision" => {
                let value = field.text().map(str::trim).unwrap_or_default();
                collision = value.parse::<bool>().map_err(|_| {
                    ctx.error_at(
                        ContentErrorCode::InvalidValue,
                        format!("collision '{}' must be true or false", value),
                        field,
                    )
                })?;
            }
            "hint" => {
                hint = Some(field.text().map(str::trim).unwrap_or_default().to_string());
            }
            "frames" => {
                let keys: Vec<TextureKey> = field
                    .text()
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(TextureKey::from)
                    .collect();
                match field.attribute("dir") {
                    Some("up") => frames.up = keys,
                    Some("down") => frames.down = keys,
                    Some("side") => frames.side = keys,
                    other => {
                        return Err(ctx.error_at(
                            ContentErrorCode::InvalidValue,
                            format!(
                                "invalid frames dir '{}'; allowed values: up down side",
                                other.unwrap_or_default()
                            ),
                            field,
                        ))
                    }
                }
            }
            _ => {
                return Err(ctx.error_at(
                    ContentErrorCode::UnknownField,
                    format!("unknown field <{}> in <Object>", field_name),
                    field,
                ))
            }
        }
    }

    let kind = match (kind_name.as_str(), hint) {
        ("player", None) => ObjectDefKind::Player,
        ("static", None) => ObjectDefKind::Static,
        ("pickup", Some(hint)) => ObjectDefKind::Pickup { hint },
        ("pickup", None) => {
            return Err(ctx.error_at(
                ContentErrorCode::MissingField,
                "pickup objects require a <hint>".to_string(),
                root,
            ))
        }
        ("player" | "static", Some(_)) => {
            return Err(ctx.error_at(
                ContentErrorCode::UnknownField,
                format!("<hint> is only valid on pickup objects, not '{}'", kind_name),
                root,
            ))
        }
        (other, _) => {
            return Err(ctx.error_at(
                ContentErrorCode::InvalidValue,
                format!(
                    "invalid object kind '{}'; allowed values: player static pickup",
                    other
                ),
                root,
            ))
        }
    };

    if !collision && kind != ObjectDefKind::Static {
        return Err(ctx.error_at(
            ContentErrorCode::InvalidValue,
            format!(
                "<collision>false</collision> is only valid on static objects, not '{}'",
                kind_name
            ),
            root,
        ));
    }

    Ok(ObjectDef {
        kind,
        size,
        collision,
        frames: frames.filled(),
    })
}
