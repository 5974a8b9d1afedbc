use crate::core::{ClearColor, WindowConfig};
use crate::scene::TriangleScene;

/// Everything the driver needs besides the platform.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub window: WindowConfig,
    /// Never set by the program itself, so the device default applies.
    pub clear_color: ClearColor,
    pub scene: TriangleScene,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            clear_color: ClearColor::TRANSPARENT,
            scene: TriangleScene::default(),
        }
    }
}
