//! Application driver.
//!
//! Brings the platform up, uploads the triangle, compiles and links its
//! program, runs the render loop until the window is closed, and tears
//! everything down again in a fixed order.

mod config;
mod error;
#[cfg(test)]
mod mock;

use std::io::{self, Write};

use crate::core::{
    AttribFormat, AttribLayout, BufferId, BufferTarget, ClearMask, DeviceResult, GraphicsDevice,
    IndexFormat, Platform, ProgramId, ShaderId, VertexArrayId,
};
use crate::diagnostics::{print_compile_log, print_link_log};
use crate::scene::{TriangleScene, COLOR_OUTPUT, POSITION_ATTRIBUTE};
use crate::shader::ShaderStage;
use crate::time::FrameStats;
use crate::window::WinitPlatform;

pub use config::AppConfig;
pub use error::StartupError;

/// Outcome of a run that reached the render loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Loop iterations, one per presented (or attempted) frame.
    pub frames: u64,
    /// Stages that failed to compile.
    pub compile_failures: u32,
    pub program_linked: bool,
    /// Frames whose draw was rejected by the device.
    pub skipped_draws: u64,
}

/// Runs the triangle on the default winit/wgpu platform, printing info logs
/// to stdout. Returns the process exit code.
pub fn run() -> i32 {
    run_with(WinitPlatform::default(), &AppConfig::default(), &mut io::stdout())
}

/// Runs on `platform` and maps the result to an exit code: `0` after a
/// normal shutdown, `-1` on any startup failure.
pub fn run_with<P: Platform>(mut platform: P, config: &AppConfig, out: &mut dyn Write) -> i32 {
    match try_run(&mut platform, config, out) {
        Ok(report) => {
            log::debug!("run finished: {report:?}");
            0
        }
        Err(e) => {
            log::error!("{e}");
            e.exit_code()
        }
    }
}

/// Runs the whole lifecycle. Every path out of this function has released
/// what it created and terminated the platform.
pub fn try_run<P: Platform>(
    platform: &mut P,
    config: &AppConfig,
    out: &mut dyn Write,
) -> Result<RunReport, StartupError> {
    platform.init().map_err(StartupError::PlatformInit)?;

    let window = match platform.create_window(&config.window) {
        Ok(window) => window,
        Err(e) => {
            platform.terminate();
            return Err(StartupError::WindowCreation(e));
        }
    };

    let context = match platform.make_current(&window) {
        Ok(context) => context,
        Err(e) => {
            shutdown(platform, window);
            return Err(StartupError::Context(e));
        }
    };

    let mut device = match platform.load_device(context) {
        Ok(device) => device,
        Err(e) => {
            shutdown(platform, window);
            return Err(StartupError::Loader(e));
        }
    };

    let mut resources = Resources::default();
    let setup = match set_up(&mut device, &config.scene, &mut resources, out) {
        Ok(setup) => setup,
        Err(e) => {
            resources.release(&mut device);
            drop(device);
            shutdown(platform, window);
            return Err(StartupError::Resources(e));
        }
    };

    let mut report = RunReport {
        compile_failures: setup.compile_failures,
        program_linked: setup.program_linked,
        ..RunReport::default()
    };

    let mut stats = FrameStats::new();
    let mut draw_warned = false;
    let clear = ClearMask::COLOR | ClearMask::DEPTH;

    while !platform.should_close(&window) {
        device.clear(clear, config.clear_color);

        if let Err(e) = device.draw_elements(config.scene.index_count()) {
            report.skipped_draws += 1;
            if !draw_warned {
                log::warn!("skipping draws: {e}");
                draw_warned = true;
            }
        }

        match device.present() {
            Ok(outcome) => log::trace!("frame {}: {outcome:?}", stats.frames()),
            Err(e) if e.is_fatal() => {
                log::error!("presentation failed: {e}");
                break;
            }
            Err(e) => log::warn!("present failed: {e}"),
        }

        stats.tick();
        platform.poll_events();
    }

    report.frames = stats.frames();
    log::info!("{}", stats.summary());

    resources.release(&mut device);
    drop(device);
    shutdown(platform, window);

    Ok(report)
}

fn shutdown<P: Platform>(platform: &mut P, window: P::Window) {
    platform.destroy_window(window);
    platform.terminate();
}

/// Objects created during setup, released in reverse dependency order.
#[derive(Debug, Default)]
struct Resources {
    vertex_array: Option<VertexArrayId>,
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    vertex_shader: Option<ShaderId>,
    fragment_shader: Option<ShaderId>,
    program: Option<ProgramId>,
}

impl Resources {
    fn release<D: GraphicsDevice>(&mut self, device: &mut D) {
        if let Some(program) = self.program.take() {
            warn_on_err(device.delete_program(program));
        }
        for shader in [self.fragment_shader.take(), self.vertex_shader.take()]
            .into_iter()
            .flatten()
        {
            warn_on_err(device.delete_shader(shader));
        }
        for buffer in [self.index_buffer.take(), self.vertex_buffer.take()]
            .into_iter()
            .flatten()
        {
            warn_on_err(device.delete_buffer(buffer));
        }
        if let Some(vao) = self.vertex_array.take() {
            warn_on_err(device.delete_vertex_array(vao));
        }
    }
}

fn warn_on_err(result: DeviceResult<()>) {
    if let Err(e) = result {
        log::warn!("failed to release GPU object: {e}");
    }
}

struct Setup {
    compile_failures: u32,
    program_linked: bool,
}

fn set_up<D: GraphicsDevice>(
    device: &mut D,
    scene: &TriangleScene,
    res: &mut Resources,
    out: &mut dyn Write,
) -> DeviceResult<Setup> {
    let vao = device.create_vertex_array()?;
    res.vertex_array = Some(vao);
    device.bind_vertex_array(Some(vao))?;

    let vbo = device.create_buffer(BufferTarget::Vertex, scene.vertex_bytes())?;
    res.vertex_buffer = Some(vbo);
    let ebo = device.create_buffer(BufferTarget::Index, scene.index_bytes())?;
    res.index_buffer = Some(ebo);
    device.bind_index_buffer(ebo, IndexFormat::Uint32)?;

    let mut compile_failures = 0;
    let vs = compile_stage(device, ShaderStage::Vertex, scene.vertex_shader, out)?;
    res.vertex_shader = Some(vs.0);
    compile_failures += u32::from(!vs.1);
    let fs = compile_stage(device, ShaderStage::Fragment, scene.fragment_shader, out)?;
    res.fragment_shader = Some(fs.0);
    compile_failures += u32::from(!fs.1);

    let program = device.create_program()?;
    res.program = Some(program);
    device.attach_shader(program, vs.0)?;
    device.attach_shader(program, fs.0)?;
    device.bind_frag_data_location(program, 0, COLOR_OUTPUT)?;

    let program_linked = device.link_program(program)?;
    if program_linked {
        device.use_program(Some(program))?;
    } else {
        log::error!("failed to link shader program!");
        report_io(print_link_log(&*device, program, out));
    }

    match device.attrib_location(program, POSITION_ATTRIBUTE)? {
        Some(location) => {
            device.enable_vertex_attrib(location)?;
            device.vertex_attrib_pointer(
                location,
                vbo,
                AttribLayout::packed(AttribFormat::Float32x2),
            )?;
        }
        None => log::warn!("program has no `{POSITION_ATTRIBUTE}` attribute"),
    }

    Ok(Setup { compile_failures, program_linked })
}

/// Creates and compiles one stage. A compile failure is not an error here:
/// it is logged, its info log printed, and setup carries on.
fn compile_stage<D: GraphicsDevice>(
    device: &mut D,
    stage: ShaderStage,
    source: &str,
    out: &mut dyn Write,
) -> DeviceResult<(ShaderId, bool)> {
    let shader = device.create_shader(stage)?;
    device.shader_source(shader, source)?;
    let compiled = device.compile_shader(shader)?;
    if !compiled {
        log::error!("failed to compile {stage} shader!");
        report_io(print_compile_log(&*device, shader, out));
    }
    Ok((shader, compiled))
}

fn report_io(result: io::Result<()>) {
    if let Err(e) = result {
        log::warn!("failed to print info log: {e}");
    }
}
