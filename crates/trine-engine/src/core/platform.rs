use anyhow::Result;

use super::device::GraphicsDevice;

/// Window creation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    /// Inner width in logical pixels.
    pub width: u32,
    /// Inner height in logical pixels.
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Hello World".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Window/context provider.
///
/// Call order is fixed: `init`, `create_window`, `make_current`,
/// `load_device`, then any number of `should_close`/`poll_events` rounds,
/// and finally `destroy_window` and `terminate`. The context returned by
/// `make_current` is the only way to reach the device, so nothing depends on
/// a thread-bound "current" context.
pub trait Platform {
    type Window;
    type Context;
    type Device: GraphicsDevice;

    /// Brings up the windowing subsystem.
    fn init(&mut self) -> Result<()>;

    fn create_window(&mut self, config: &WindowConfig) -> Result<Self::Window>;

    /// Creates the graphics context bound to `window`.
    fn make_current(&mut self, window: &Self::Window) -> Result<Self::Context>;

    /// Resolves the GPU entry points for `context`.
    fn load_device(&mut self, context: Self::Context) -> Result<Self::Device>;

    /// Whether the user asked to close `window`.
    fn should_close(&self, window: &Self::Window) -> bool;

    /// Processes pending OS events without blocking.
    fn poll_events(&mut self);

    fn destroy_window(&mut self, window: Self::Window);

    /// Shuts the windowing subsystem down. Must be the last call.
    fn terminate(&mut self);
}
