//! Recording test double for the driver: a scripted platform and a device
//! that runs the real handle bookkeeping and shader front-end without a GPU.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use anyhow::{anyhow, Result};

use crate::core::{
    AttribLayout, BufferId, BufferTarget, ClearColor, ClearMask, DeviceError, DeviceResult,
    GraphicsDevice,
    IndexFormat, Platform, PresentOutcome, ProgramId, ShaderId, VertexArrayId, WindowConfig,
};
use crate::device::{Backend, Device, FrameCommands, ProgramSources};
use crate::shader::ShaderStage;

#[derive(Debug, Clone, PartialEq)]
pub(super) enum Call {
    Init,
    CreateWindow((String, u32, u32)),
    MakeCurrent,
    LoadDevice,
    PollEvents,
    DestroyWindow,
    Terminate,
    Upload(BufferTarget, Vec<u8>),
    Submit(FrameCommands),
    Delete(&'static str),
    DeviceDropped { live_objects: usize },
}

#[derive(Debug, Clone, Default)]
pub(super) struct Journal(Rc<RefCell<Vec<Call>>>);

impl Journal {
    fn push(&self, call: Call) {
        self.0.borrow_mut().push(call);
    }

    pub(super) fn calls(&self) -> Vec<Call> {
        self.0.borrow().clone()
    }

    pub(super) fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.borrow().iter().filter(|c| pred(c)).count()
    }

    /// Kinds of the objects deleted so far, in order.
    pub(super) fn deletes(&self) -> Vec<&'static str> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Delete(kind) => Some(*kind),
                _ => None,
            })
            .collect()
    }

    pub(super) fn submitted(&self) -> Vec<FrameCommands> {
        self.0
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::Submit(frame) => Some(frame.clone()),
                _ => None,
            })
            .collect()
    }
}

/// How a scripted present fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PresentFault {
    SurfaceLost,
    Timeout,
}

impl PresentFault {
    fn into_error(self) -> DeviceError {
        match self {
            PresentFault::SurfaceLost => DeviceError::SurfaceLost,
            PresentFault::Timeout => DeviceError::Backend(anyhow!("surface acquire timed out")),
        }
    }
}

pub(super) struct RecordingBackend {
    journal: Journal,
    fail_index_upload: bool,
    /// `(n, fault)`: the n-th submit, counted from 1, fails with `fault`.
    present_faults: Vec<(usize, PresentFault)>,
    submits: usize,
}

impl Backend for RecordingBackend {
    fn upload_buffer(&mut self, _id: BufferId, target: BufferTarget, contents: &[u8]) -> Result<()> {
        if self.fail_index_upload && target == BufferTarget::Index {
            return Err(anyhow!("out of device memory"));
        }
        self.journal.push(Call::Upload(target, contents.to_vec()));
        Ok(())
    }

    fn release_buffer(&mut self, _id: BufferId) {}

    fn prepare_program(&mut self, _id: ProgramId, _sources: ProgramSources<'_>) -> Result<()> {
        Ok(())
    }

    fn release_program(&mut self, _id: ProgramId) {}

    fn submit(&mut self, frame: FrameCommands) -> DeviceResult<PresentOutcome> {
        self.submits += 1;
        self.journal.push(Call::Submit(frame));
        match self.present_faults.iter().find(|(n, _)| *n == self.submits) {
            Some((_, fault)) => Err(fault.into_error()),
            None => Ok(PresentOutcome::Presented),
        }
    }
}

/// [`Device`] over a [`RecordingBackend`] that also journals deletions by
/// object kind.
pub(super) struct MockDevice {
    inner: Device<RecordingBackend>,
    journal: Journal,
    shader_stages: HashMap<ShaderId, ShaderStage>,
    buffer_targets: HashMap<BufferId, BufferTarget>,
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        self.journal.push(Call::DeviceDropped { live_objects: self.inner.live_objects() });
    }
}

impl GraphicsDevice for MockDevice {
    fn create_vertex_array(&mut self) -> DeviceResult<VertexArrayId> {
        self.inner.create_vertex_array()
    }

    fn bind_vertex_array(&mut self, vao: Option<VertexArrayId>) -> DeviceResult<()> {
        self.inner.bind_vertex_array(vao)
    }

    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> DeviceResult<BufferId> {
        let id = self.inner.create_buffer(target, contents)?;
        self.buffer_targets.insert(id, target);
        Ok(id)
    }

    fn bind_index_buffer(&mut self, buffer: BufferId, format: IndexFormat) -> DeviceResult<()> {
        self.inner.bind_index_buffer(buffer, format)
    }

    fn create_shader(&mut self, stage: ShaderStage) -> DeviceResult<ShaderId> {
        let id = self.inner.create_shader(stage)?;
        self.shader_stages.insert(id, stage);
        Ok(id)
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) -> DeviceResult<()> {
        self.inner.shader_source(shader, source)
    }

    fn compile_shader(&mut self, shader: ShaderId) -> DeviceResult<bool> {
        self.inner.compile_shader(shader)
    }

    fn shader_info_log_len(&self, shader: ShaderId) -> DeviceResult<usize> {
        self.inner.shader_info_log_len(shader)
    }

    fn shader_info_log(&self, shader: ShaderId, buf: &mut [u8]) -> DeviceResult<usize> {
        self.inner.shader_info_log(shader, buf)
    }

    fn create_program(&mut self) -> DeviceResult<ProgramId> {
        self.inner.create_program()
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> DeviceResult<()> {
        self.inner.attach_shader(program, shader)
    }

    fn bind_frag_data_location(
        &mut self,
        program: ProgramId,
        slot: u32,
        name: &str,
    ) -> DeviceResult<()> {
        self.inner.bind_frag_data_location(program, slot, name)
    }

    fn link_program(&mut self, program: ProgramId) -> DeviceResult<bool> {
        self.inner.link_program(program)
    }

    fn program_info_log_len(&self, program: ProgramId) -> DeviceResult<usize> {
        self.inner.program_info_log_len(program)
    }

    fn program_info_log(&self, program: ProgramId, buf: &mut [u8]) -> DeviceResult<usize> {
        self.inner.program_info_log(program, buf)
    }

    fn use_program(&mut self, program: Option<ProgramId>) -> DeviceResult<()> {
        self.inner.use_program(program)
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> DeviceResult<Option<u32>> {
        self.inner.attrib_location(program, name)
    }

    fn enable_vertex_attrib(&mut self, location: u32) -> DeviceResult<()> {
        self.inner.enable_vertex_attrib(location)
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        buffer: BufferId,
        layout: AttribLayout,
    ) -> DeviceResult<()> {
        self.inner.vertex_attrib_pointer(location, buffer, layout)
    }

    fn clear(&mut self, mask: ClearMask, color: ClearColor) {
        self.inner.clear(mask, color);
    }

    fn draw_elements(&mut self, count: u32) -> DeviceResult<()> {
        self.inner.draw_elements(count)
    }

    fn present(&mut self) -> DeviceResult<PresentOutcome> {
        self.inner.present()
    }

    fn delete_program(&mut self, program: ProgramId) -> DeviceResult<()> {
        self.inner.delete_program(program)?;
        self.journal.push(Call::Delete("program"));
        Ok(())
    }

    fn delete_shader(&mut self, shader: ShaderId) -> DeviceResult<()> {
        self.inner.delete_shader(shader)?;
        let kind = match self.shader_stages.remove(&shader) {
            Some(ShaderStage::Vertex) => "vertex shader",
            Some(ShaderStage::Fragment) => "fragment shader",
            None => "shader",
        };
        self.journal.push(Call::Delete(kind));
        Ok(())
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> DeviceResult<()> {
        self.inner.delete_buffer(buffer)?;
        let kind = match self.buffer_targets.remove(&buffer) {
            Some(BufferTarget::Vertex) => "vertex buffer",
            Some(BufferTarget::Index) => "index buffer",
            None => "buffer",
        };
        self.journal.push(Call::Delete(kind));
        Ok(())
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayId) -> DeviceResult<()> {
        self.inner.delete_vertex_array(vao)?;
        self.journal.push(Call::Delete("vertex array"));
        Ok(())
    }

    fn live_objects(&self) -> usize {
        self.inner.live_objects()
    }
}

pub(super) struct MockWindow;
pub(super) struct MockContext;

/// Scripted platform. Each `fail_*` flag makes the matching step fail; the
/// window reports a close request after `close_after` event polls.
/// `fail_index_upload` and `present_faults` are handed to the device's
/// backend.
#[derive(Default)]
pub(super) struct MockPlatform {
    pub(super) fail_init: bool,
    pub(super) fail_window: bool,
    pub(super) fail_context: bool,
    pub(super) fail_loader: bool,
    pub(super) fail_index_upload: bool,
    pub(super) present_faults: Vec<(usize, PresentFault)>,
    close_after: u64,
    polls: u64,
    journal: Journal,
}

impl MockPlatform {
    pub(super) fn closing_after(polls: u64) -> Self {
        Self { close_after: polls, ..Self::default() }
    }

    pub(super) fn journal(&self) -> Journal {
        self.journal.clone()
    }
}

impl Platform for MockPlatform {
    type Window = MockWindow;
    type Context = MockContext;
    type Device = MockDevice;

    fn init(&mut self) -> Result<()> {
        self.journal.push(Call::Init);
        if self.fail_init {
            return Err(anyhow!("no display"));
        }
        Ok(())
    }

    fn create_window(&mut self, config: &WindowConfig) -> Result<MockWindow> {
        self.journal.push(Call::CreateWindow((
            config.title.clone(),
            config.width,
            config.height,
        )));
        if self.fail_window {
            return Err(anyhow!("window refused"));
        }
        Ok(MockWindow)
    }

    fn make_current(&mut self, _window: &MockWindow) -> Result<MockContext> {
        self.journal.push(Call::MakeCurrent);
        if self.fail_context {
            return Err(anyhow!("no compatible surface"));
        }
        Ok(MockContext)
    }

    fn load_device(&mut self, _context: MockContext) -> Result<MockDevice> {
        self.journal.push(Call::LoadDevice);
        if self.fail_loader {
            return Err(anyhow!("no adapter"));
        }
        let backend = RecordingBackend {
            journal: self.journal.clone(),
            fail_index_upload: self.fail_index_upload,
            present_faults: self.present_faults.clone(),
            submits: 0,
        };
        Ok(MockDevice {
            inner: Device::new(backend),
            journal: self.journal.clone(),
            shader_stages: HashMap::new(),
            buffer_targets: HashMap::new(),
        })
    }

    fn should_close(&self, _window: &MockWindow) -> bool {
        self.polls >= self.close_after
    }

    fn poll_events(&mut self) {
        self.polls += 1;
        self.journal.push(Call::PollEvents);
    }

    fn destroy_window(&mut self, _window: MockWindow) {
        self.journal.push(Call::DestroyWindow);
    }

    fn terminate(&mut self) {
        self.journal.push(Call::Terminate);
    }
}
