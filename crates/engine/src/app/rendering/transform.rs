use crate::app::ScreenPos;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
        }
    }
}

/// Top-left world pixel of a viewport centred on `center`.
pub fn camera_offset(center: ScreenPos, viewport: Viewport) -> ScreenPos {
    ScreenPos {
        x: center.x - (viewport.width / 2) as i32,
        y: center.y - (viewport.height / 2) as i32,
    }
}

pub fn world_to_screen_px(world: ScreenPos, camera: Option<ScreenPos>) -> ScreenPos {
    match camera {
        Some(camera) => ScreenPos {
            x: world.x - camera.x,
            y: world.y - camera.y,
        },
        None => world,
    }
}
