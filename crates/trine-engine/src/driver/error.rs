use std::fmt;

use crate::core::DeviceError;

/// Fatal failure before the render loop is reached.
#[derive(Debug)]
pub enum StartupError {
    /// The windowing subsystem could not be brought up.
    PlatformInit(anyhow::Error),
    WindowCreation(anyhow::Error),
    /// No graphics context could be bound to the window.
    Context(anyhow::Error),
    /// The GPU device behind the context could not be loaded.
    Loader(anyhow::Error),
    /// Creating or configuring a GPU object failed.
    Resources(DeviceError),
}

impl StartupError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        -1
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::PlatformInit(e) => write!(f, "failed to initialize windowing: {e:#}"),
            StartupError::WindowCreation(e) => write!(f, "failed to create window: {e:#}"),
            StartupError::Context(e) => write!(f, "failed to create graphics context: {e:#}"),
            StartupError::Loader(e) => write!(f, "failed to load GPU device: {e:#}"),
            StartupError::Resources(e) => write!(f, "failed to set up GPU resources: {e}"),
        }
    }
}

impl std::error::Error for StartupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StartupError::PlatformInit(e)
            | StartupError::WindowCreation(e)
            | StartupError::Context(e)
            | StartupError::Loader(e) => Some(e.as_ref()),
            StartupError::Resources(e) => Some(e),
        }
    }
}

impl From<DeviceError> for StartupError {
    fn from(e: DeviceError) -> Self {
        StartupError::Resources(e)
    }
}
