use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::core::{
    AttribFormat, AttribLayout, BufferId, BufferTarget, ClearColor, DeviceError, DeviceResult,
    IndexFormat, PresentOutcome, ProgramId,
};
use crate::shader::ProgramInterface;

use super::backend::{Backend, ProgramSources};
use super::context::WgpuContext;
use super::error::SurfaceErrorAction;
use super::frame::{DrawCall, FrameCommands};
use super::init::GpuInit;
use super::state::Device;
use super::surface::SurfaceState;

/// The handle device backed by wgpu.
pub type WgpuDevice = Device<WgpuBackend>;

struct GpuProgram {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    interface: ProgramInterface,
}

/// Pipelines depend on the program, the attribute layouts feeding it and the
/// surface format, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    inputs: Vec<(u32, AttribLayout)>,
    format: wgpu::TextureFormat,
}

impl PipelineKey {
    fn of(draw: &DrawCall, format: wgpu::TextureFormat) -> Self {
        Self {
            program: draw.program,
            inputs: draw.inputs.iter().map(|i| (i.location, i.layout)).collect(),
            format,
        }
    }
}

/// Owns wgpu core objects, the surface and every GPU resource behind the
/// device's handles.
pub struct WgpuBackend {
    window: Arc<Window>,

    /// Outlives the surface created from it.
    _instance: wgpu::Instance,

    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: SurfaceState,

    buffers: HashMap<BufferId, wgpu::Buffer>,
    programs: HashMap<ProgramId, GpuProgram>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl WgpuBackend {
    /// Requests an adapter and device compatible with the context's surface
    /// and configures the surface.
    ///
    /// Adapter/device acquisition is asynchronous under wgpu.
    pub async fn new(context: WgpuContext, init: &GpuInit) -> Result<Self> {
        let WgpuContext { window, instance, surface } = context;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable GPU adapter")?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("trine device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create wgpu device/queue")?;

        let caps = surface.get_capabilities(&adapter);
        let surface = SurfaceState::configure(surface, &device, &caps, init, window.inner_size())
            .context("no supported surface formats")?;
        log::debug!("surface format {:?}", surface.format());

        Ok(Self {
            window,
            _instance: instance,
            device,
            queue,
            surface,
            buffers: HashMap::new(),
            programs: HashMap::new(),
            pipelines: HashMap::new(),
        })
    }

    /// Returns the active surface format.
    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface.format()
    }

    fn build_pipeline(&self, key: &PipelineKey) -> DeviceResult<wgpu::RenderPipeline> {
        let program = self
            .programs
            .get(&key.program)
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, key.program.get()))?;

        let attributes: Vec<[wgpu::VertexAttribute; 1]> = key
            .inputs
            .iter()
            .map(|(location, layout)| {
                [wgpu::VertexAttribute {
                    format: vertex_format(layout.format),
                    offset: 0,
                    shader_location: *location,
                }]
            })
            .collect();
        // One buffer slot per attribute; the attribute offset goes into the
        // slice bound at draw time.
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = key
            .inputs
            .iter()
            .zip(&attributes)
            .map(|((_, layout), attrs)| wgpu::VertexBufferLayout {
                array_stride: layout.effective_stride(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attrs,
            })
            .collect();

        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("trine pipeline layout"),
                bind_group_layouts: &[],
                immediate_size: 0,
            });

        Ok(self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("trine pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some(&program.interface.vertex_entry),
                    compilation_options: Default::default(),
                    buffers: &buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some(&program.interface.fragment_entry),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: key.format,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            }))
    }

    /// Acquires the next surface texture, mapping acquisition errors to a
    /// present outcome.
    fn acquire(&mut self) -> DeviceResult<Result<wgpu::SurfaceTexture, PresentOutcome>> {
        self.surface.resize(&self.device, self.window.inner_size());
        if !self.surface.is_drawable() {
            return Ok(Err(PresentOutcome::Skipped));
        }

        match self.surface.surface.get_current_texture() {
            Ok(texture) => Ok(Ok(texture)),
            Err(err) => {
                log::warn!("failed to acquire surface texture: {err}");
                match self.surface.recover(&self.device, err) {
                    SurfaceErrorAction::Reconfigured => Ok(Err(PresentOutcome::Reconfigured)),
                    SurfaceErrorAction::SkipFrame => Ok(Err(PresentOutcome::Skipped)),
                    SurfaceErrorAction::Fatal => Err(DeviceError::SurfaceLost),
                }
            }
        }
    }
}

impl Backend for WgpuBackend {
    fn upload_buffer(&mut self, id: BufferId, target: BufferTarget, contents: &[u8]) -> Result<()> {
        let usage = match target {
            BufferTarget::Vertex => wgpu::BufferUsages::VERTEX,
            BufferTarget::Index => wgpu::BufferUsages::INDEX,
        };
        let label = format!("trine {id}");
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&label),
            contents,
            usage: usage | wgpu::BufferUsages::COPY_DST,
        });
        if let Some(old) = self.buffers.insert(id, buffer) {
            old.destroy();
        }
        Ok(())
    }

    fn release_buffer(&mut self, id: BufferId) {
        if let Some(buffer) = self.buffers.remove(&id) {
            buffer.destroy();
        }
    }

    fn prepare_program(&mut self, id: ProgramId, sources: ProgramSources<'_>) -> Result<()> {
        if let Some(out) = sources.interface.color_outputs.iter().find(|o| o.location != 0) {
            anyhow::bail!(
                "fragment output `{}` writes color slot {}; only slot 0 is backed by the window",
                out.name,
                out.location
            );
        }

        let module = |stage: &str, source: &str| {
            let label = format!("trine {id} {stage}");
            self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&label),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_string())),
            })
        };
        let program = GpuProgram {
            vertex: module("vertex", sources.vertex),
            fragment: module("fragment", sources.fragment),
            interface: sources.interface.clone(),
        };

        self.programs.insert(id, program);
        log::debug!("prepared GPU modules for {id}");
        Ok(())
    }

    fn release_program(&mut self, id: ProgramId) {
        self.programs.remove(&id);
        self.pipelines.retain(|key, _| key.program != id);
    }

    fn submit(&mut self, frame: FrameCommands) -> DeviceResult<PresentOutcome> {
        let surface_texture = match self.acquire()? {
            Ok(texture) => texture,
            Err(outcome) => return Ok(outcome),
        };

        let format = self.surface.format();
        let keys: Vec<PipelineKey> = frame.draws.iter().map(|d| PipelineKey::of(d, format)).collect();
        for key in &keys {
            if !self.pipelines.contains_key(key) {
                let pipeline = self.build_pipeline(key)?;
                log::debug!("built pipeline for {} ({:?})", key.program, key.format);
                self.pipelines.insert(key.clone(), pipeline);
            }
        }

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("trine frame encoder"),
            });

        {
            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("trine pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: load_op(frame.clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                // No depth attachment; a depth clear has nothing to act on.
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            for (draw, key) in frame.draws.iter().zip(&keys) {
                let (Some(pipeline), Some(index)) =
                    (self.pipelines.get(key), self.buffers.get(&draw.index_buffer))
                else {
                    continue;
                };
                rpass.set_pipeline(pipeline);
                for (slot, input) in draw.inputs.iter().enumerate() {
                    let Some(vbo) = self.buffers.get(&input.buffer) else {
                        continue;
                    };
                    rpass.set_vertex_buffer(slot as u32, vbo.slice(input.layout.offset..));
                }
                rpass.set_index_buffer(index.slice(..), index_format(draw.index_format));
                rpass.draw_indexed(0..draw.count, 0, 0..1);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        self.window.pre_present_notify();
        surface_texture.present();
        Ok(PresentOutcome::Presented)
    }
}

fn load_op(clear: Option<ClearColor>) -> wgpu::LoadOp<wgpu::Color> {
    match clear {
        Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
            r: f64::from(c.r),
            g: f64::from(c.g),
            b: f64::from(c.b),
            a: f64::from(c.a),
        }),
        None => wgpu::LoadOp::Load,
    }
}

fn vertex_format(format: AttribFormat) -> wgpu::VertexFormat {
    match format {
        AttribFormat::Float32 => wgpu::VertexFormat::Float32,
        AttribFormat::Float32x2 => wgpu::VertexFormat::Float32x2,
        AttribFormat::Float32x3 => wgpu::VertexFormat::Float32x3,
        AttribFormat::Float32x4 => wgpu::VertexFormat::Float32x4,
    }
}

fn index_format(format: IndexFormat) -> wgpu::IndexFormat {
    match format {
        IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
        IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
    }
}
