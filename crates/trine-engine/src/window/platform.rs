use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::error::OsError;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::platform::pump_events::{EventLoopExtPumpEvents, PumpStatus};
use winit::window::{Window, WindowAttributes, WindowId};

use crate::core::{Platform, WindowConfig};
use crate::device::{Device, GpuInit, WgpuBackend, WgpuContext, WgpuDevice};

/// Event rounds to wait for the OS to hand out a window.
const CREATE_ROUNDS: usize = 500;
const CREATE_ROUND_TIMEOUT: Duration = Duration::from_millis(10);

/// A window owned by [`WinitPlatform`].
pub struct WinitWindow {
    window: Arc<Window>,
}

impl WinitWindow {
    pub fn id(&self) -> WindowId {
        self.window.id()
    }
}

/// State driven by the pumped event loop.
///
/// winit only creates windows from inside its callbacks, so window creation
/// is queued here and performed on the next callback that allows it.
#[derive(Default)]
struct Pump {
    pending: Option<WindowAttributes>,
    created: Option<Result<Window, OsError>>,
    resumed: bool,
    close_requested: HashSet<WindowId>,
    exited: bool,
}

impl Pump {
    fn create_pending(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(attrs) = self.pending.take() {
            self.created = Some(event_loop.create_window(attrs));
        }
    }
}

impl ApplicationHandler for Pump {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.resumed = true;
        self.create_pending(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Poll);
        if self.resumed {
            self.create_pending(event_loop);
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::debug!("close requested for {id:?}");
                self.close_requested.insert(id);
            }
            WindowEvent::Destroyed => {
                self.close_requested.remove(&id);
            }
            WindowEvent::Resized(size) => {
                log::trace!("{id:?} resized to {}x{}", size.width, size.height);
            }
            _ => {}
        }
    }
}

/// [`Platform`] over a pumped winit event loop and a wgpu surface.
///
/// Events are processed only when the driver asks for it, which keeps the
/// frame loop in the caller's hands instead of inside `run_app`.
pub struct WinitPlatform {
    gpu_init: GpuInit,
    event_loop: Option<EventLoop<()>>,
    pump: Pump,
}

impl WinitPlatform {
    pub fn new(gpu_init: GpuInit) -> Self {
        Self {
            gpu_init,
            event_loop: None,
            pump: Pump::default(),
        }
    }

    fn pump(&mut self, timeout: Duration) {
        let Some(event_loop) = self.event_loop.as_mut() else {
            return;
        };
        if let PumpStatus::Exit(code) = event_loop.pump_app_events(Some(timeout), &mut self.pump) {
            log::debug!("event loop exited with code {code}");
            self.pump.exited = true;
        }
    }
}

impl Default for WinitPlatform {
    fn default() -> Self {
        Self::new(GpuInit::default())
    }
}

impl Platform for WinitPlatform {
    type Window = WinitWindow;
    type Context = WgpuContext;
    type Device = WgpuDevice;

    fn init(&mut self) -> Result<()> {
        let event_loop = EventLoop::new().context("failed to create winit EventLoop")?;
        event_loop.set_control_flow(ControlFlow::Poll);
        self.event_loop = Some(event_loop);
        self.pump = Pump::default();
        Ok(())
    }

    fn create_window(&mut self, config: &WindowConfig) -> Result<WinitWindow> {
        anyhow::ensure!(self.event_loop.is_some(), "windowing subsystem is not initialized");

        let attrs = Window::default_attributes()
            .with_title(config.title.clone())
            .with_inner_size(LogicalSize::new(
                f64::from(config.width),
                f64::from(config.height),
            ));
        self.pump.pending = Some(attrs);

        for _ in 0..CREATE_ROUNDS {
            self.pump(CREATE_ROUND_TIMEOUT);
            if let Some(created) = self.pump.created.take() {
                let window = created.context("failed to create window")?;
                log::info!("created window \"{}\" ({}x{})", config.title, config.width, config.height);
                return Ok(WinitWindow { window: Arc::new(window) });
            }
            anyhow::ensure!(!self.pump.exited, "event loop exited before the window was created");
        }

        self.pump.pending = None;
        anyhow::bail!("the OS did not hand out a window in time")
    }

    fn make_current(&mut self, window: &WinitWindow) -> Result<WgpuContext> {
        WgpuContext::new(Arc::clone(&window.window))
    }

    fn load_device(&mut self, context: WgpuContext) -> Result<WgpuDevice> {
        let backend = pollster::block_on(WgpuBackend::new(context, &self.gpu_init))?;
        Ok(Device::new(backend))
    }

    fn should_close(&self, window: &WinitWindow) -> bool {
        self.pump.exited || self.pump.close_requested.contains(&window.id())
    }

    fn poll_events(&mut self) {
        self.pump(Duration::ZERO);
    }

    fn destroy_window(&mut self, window: WinitWindow) {
        let id = window.id();
        drop(window);
        // Let the OS see the window go away.
        self.pump(Duration::ZERO);
        self.pump.close_requested.remove(&id);
    }

    fn terminate(&mut self) {
        self.pump = Pump::default();
        self.event_loop = None;
    }
}
