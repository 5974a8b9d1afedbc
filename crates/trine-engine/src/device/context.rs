use std::sync::Arc;

use anyhow::{Context, Result};
use winit::window::Window;

/// Rendering context of one window: the wgpu instance plus the surface bound
/// to the window.
///
/// Making a window current creates this value; loading the device consumes
/// it. Holding it explicitly replaces any notion of a thread-global current
/// context.
pub struct WgpuContext {
    pub(crate) window: Arc<Window>,
    pub(crate) instance: wgpu::Instance,
    pub(crate) surface: wgpu::Surface<'static>,
}

impl WgpuContext {
    pub fn new(window: Arc<Window>) -> Result<Self> {
        // All backends; wgpu picks the best one the platform offers.
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // The surface keeps its own `Arc` to the window, hence `'static`.
        let surface = instance
            .create_surface(Arc::clone(&window))
            .context("failed to create wgpu surface")?;

        Ok(Self { window, instance, surface })
    }
}
