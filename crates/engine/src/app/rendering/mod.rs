mod transform;

pub use transform::{camera_offset, world_to_screen_px, Viewport};

use super::types::{ScreenPos, TextureKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawRequest {
    pub texture: TextureKey,
    /// World pixel position of the sprite's top-left corner.
    pub position: ScreenPos,
    pub camera: Option<ScreenPos>,
    pub mirrored: bool,
}

impl DrawRequest {
    pub fn screen_position(&self) -> ScreenPos {
        world_to_screen_px(self.position, self.camera)
    }
}

/// Rendering collaborator. Holds no simulation state.
pub trait RenderSink {
    fn draw(&mut self, request: DrawRequest);
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub requests: Vec<DrawRequest>,
}

impl RecordingSink {
    pub fn clear(&mut self) {
        self.requests.clear();
    }

    pub fn draws_of(&self, texture: &str) -> impl Iterator<Item = &DrawRequest> {
        let texture = texture.to_string();
        self.requests
            .iter()
            .filter(move |request| request.texture.as_str() == texture)
    }
}

impl RenderSink for RecordingSink {
    fn draw(&mut self, request: DrawRequest) {
        self.requests.push(request);
    }
}
