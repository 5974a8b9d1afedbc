use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;

use crate::core::{
    AttribLayout, BufferId, BufferTarget, ClearColor, ClearMask, DeviceError, DeviceResult,
    GraphicsDevice, HandleAllocator, IndexFormat, PresentOutcome, ProgramId, ShaderId,
    VertexArrayId,
};
use crate::shader::{self, CompiledShader, FragDataBinding, LinkedProgram, ShaderStage};

use super::backend::{Backend, ProgramSources};
use super::frame::{DrawCall, FrameCommands, VertexInput};

struct BufferObject {
    target: BufferTarget,
    len: u64,
}

struct ShaderObject {
    source: String,
    /// Source as of the last compile; what a link consumes.
    compiled_source: String,
    compiled: CompiledShader,
}

#[derive(Default)]
struct ProgramObject {
    attached: Vec<ShaderId>,
    bindings: Vec<FragDataBinding>,
    linked: Option<LinkedProgram>,
}

impl ProgramObject {
    fn log(&self) -> &str {
        self.linked.as_ref().map_or("", LinkedProgram::log)
    }

    fn is_linked(&self) -> bool {
        self.linked.as_ref().is_some_and(LinkedProgram::is_linked)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct AttribState {
    enabled: bool,
    source: Option<(BufferId, AttribLayout)>,
}

#[derive(Default)]
struct VertexArrayObject {
    attribs: BTreeMap<u32, AttribState>,
    index: Option<(BufferId, IndexFormat)>,
}

/// Handle-based graphics device over a GPU [`Backend`].
///
/// Owns the object tables, the current bindings and the frame being
/// recorded. Everything a backend receives has already been validated here,
/// so a backend never sees a dangling handle or an incomplete draw.
pub struct Device<B> {
    backend: B,
    names: HandleAllocator,

    buffers: HashMap<BufferId, BufferObject>,
    shaders: HashMap<ShaderId, ShaderObject>,
    programs: HashMap<ProgramId, ProgramObject>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayObject>,

    current_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,

    frame: FrameCommands,
}

impl<B: Backend> Device<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            names: HandleAllocator::new(),
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            current_program: None,
            bound_vertex_array: None,
            frame: FrameCommands::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Commands recorded since the last present.
    pub fn pending_frame(&self) -> &FrameCommands {
        &self.frame
    }

    fn next_name(&mut self) -> DeviceResult<NonZeroU32> {
        self.names.allocate().ok_or(DeviceError::HandlesExhausted)
    }

    fn buffer(&self, id: BufferId, target: BufferTarget) -> DeviceResult<&BufferObject> {
        let buffer = self
            .buffers
            .get(&id)
            .ok_or_else(|| DeviceError::unknown(BufferId::KIND, id.get()))?;
        if buffer.target != target {
            return Err(DeviceError::WrongBufferTarget { buffer: id, expected: target });
        }
        Ok(buffer)
    }

    fn shader_object(&self, id: ShaderId) -> DeviceResult<&ShaderObject> {
        self.shaders
            .get(&id)
            .ok_or_else(|| DeviceError::unknown(ShaderId::KIND, id.get()))
    }

    fn program_object(&self, id: ProgramId) -> DeviceResult<&ProgramObject> {
        self.programs
            .get(&id)
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, id.get()))
    }

    fn bound_vertex_array_mut(&mut self) -> DeviceResult<&mut VertexArrayObject> {
        let id = self.bound_vertex_array.ok_or(DeviceError::NoVertexArrayBound)?;
        self.vertex_arrays
            .get_mut(&id)
            .ok_or_else(|| DeviceError::unknown(VertexArrayId::KIND, id.get()))
    }

    /// Resolves the active program and bound vertex array into a draw.
    fn resolve_draw(&self, count: u32) -> DeviceResult<DrawCall> {
        let program = self.current_program.ok_or(DeviceError::NoActiveProgram)?;
        let interface = self
            .program_object(program)?
            .linked
            .as_ref()
            .and_then(LinkedProgram::interface)
            .ok_or(DeviceError::ProgramNotLinked(program))?;

        let vertex_array = self.bound_vertex_array.ok_or(DeviceError::NoVertexArrayBound)?;
        let vao = self
            .vertex_arrays
            .get(&vertex_array)
            .ok_or_else(|| DeviceError::unknown(VertexArrayId::KIND, vertex_array.get()))?;

        let mut inputs = Vec::with_capacity(interface.attributes.len());
        for attr in &interface.attributes {
            let source = vao
                .attribs
                .get(&attr.location)
                .filter(|a| a.enabled)
                .and_then(|a| a.source);
            let Some((buffer, layout)) = source else {
                return Err(DeviceError::AttributeNotEnabled {
                    vao: vertex_array,
                    location: attr.location,
                });
            };
            self.buffer(buffer, BufferTarget::Vertex)?;
            inputs.push(VertexInput { location: attr.location, buffer, layout });
        }

        let (index_buffer, index_format) =
            vao.index.ok_or(DeviceError::MissingIndexBuffer(vertex_array))?;
        let index_len = self.buffer(index_buffer, BufferTarget::Index)?.len;
        if u64::from(count) * index_format.size() > index_len {
            return Err(DeviceError::IndexRangeOutOfBounds { buffer: index_buffer, count });
        }

        Ok(DrawCall {
            program,
            vertex_array,
            inputs,
            index_buffer,
            index_format,
            count,
        })
    }
}

fn copy_log(log: &str, buf: &mut [u8]) -> usize {
    let n = log.len().min(buf.len());
    buf[..n].copy_from_slice(&log.as_bytes()[..n]);
    n
}

impl<B: Backend> GraphicsDevice for Device<B> {
    fn create_vertex_array(&mut self) -> DeviceResult<VertexArrayId> {
        let id = VertexArrayId::new(self.next_name()?);
        self.vertex_arrays.insert(id, VertexArrayObject::default());
        Ok(id)
    }

    fn bind_vertex_array(&mut self, vao: Option<VertexArrayId>) -> DeviceResult<()> {
        if let Some(id) = vao {
            if !self.vertex_arrays.contains_key(&id) {
                return Err(DeviceError::unknown(VertexArrayId::KIND, id.get()));
            }
        }
        self.bound_vertex_array = vao;
        Ok(())
    }

    fn create_buffer(&mut self, target: BufferTarget, contents: &[u8]) -> DeviceResult<BufferId> {
        let id = BufferId::new(self.next_name()?);
        self.backend.upload_buffer(id, target, contents)?;
        self.buffers.insert(id, BufferObject { target, len: contents.len() as u64 });
        log::trace!("{id}: {} bytes of {target:?} data", contents.len());
        Ok(id)
    }

    fn bind_index_buffer(&mut self, buffer: BufferId, format: IndexFormat) -> DeviceResult<()> {
        self.buffer(buffer, BufferTarget::Index)?;
        self.bound_vertex_array_mut()?.index = Some((buffer, format));
        Ok(())
    }

    fn create_shader(&mut self, stage: ShaderStage) -> DeviceResult<ShaderId> {
        let id = ShaderId::new(self.next_name()?);
        self.shaders.insert(
            id,
            ShaderObject {
                source: String::new(),
                compiled_source: String::new(),
                compiled: CompiledShader::pending(stage),
            },
        );
        Ok(id)
    }

    fn shader_source(&mut self, shader: ShaderId, source: &str) -> DeviceResult<()> {
        let obj = self
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| DeviceError::unknown(ShaderId::KIND, shader.get()))?;
        obj.source = source.to_string();
        Ok(())
    }

    fn compile_shader(&mut self, shader: ShaderId) -> DeviceResult<bool> {
        let obj = self
            .shaders
            .get_mut(&shader)
            .ok_or_else(|| DeviceError::unknown(ShaderId::KIND, shader.get()))?;
        obj.compiled = shader::compile(obj.compiled.stage(), &obj.source);
        obj.compiled_source.clone_from(&obj.source);
        Ok(obj.compiled.is_compiled())
    }

    fn shader_info_log_len(&self, shader: ShaderId) -> DeviceResult<usize> {
        Ok(self.shader_object(shader)?.compiled.log().len())
    }

    fn shader_info_log(&self, shader: ShaderId, buf: &mut [u8]) -> DeviceResult<usize> {
        Ok(copy_log(self.shader_object(shader)?.compiled.log(), buf))
    }

    fn create_program(&mut self) -> DeviceResult<ProgramId> {
        let id = ProgramId::new(self.next_name()?);
        self.programs.insert(id, ProgramObject::default());
        Ok(id)
    }

    fn attach_shader(&mut self, program: ProgramId, shader: ShaderId) -> DeviceResult<()> {
        self.shader_object(shader)?;
        let obj = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, program.get()))?;
        if !obj.attached.contains(&shader) {
            obj.attached.push(shader);
        }
        Ok(())
    }

    fn bind_frag_data_location(
        &mut self,
        program: ProgramId,
        slot: u32,
        name: &str,
    ) -> DeviceResult<()> {
        let obj = self
            .programs
            .get_mut(&program)
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, program.get()))?;
        obj.bindings.retain(|b| b.name != name);
        obj.bindings.push(FragDataBinding { slot, name: name.to_string() });
        Ok(())
    }

    fn link_program(&mut self, program: ProgramId) -> DeviceResult<bool> {
        let obj = self
            .programs
            .get(&program)
            .ok_or_else(|| DeviceError::unknown(ProgramId::KIND, program.get()))?;

        // Shaders deleted after attaching simply drop out of the link.
        let attached: Vec<&ShaderObject> =
            obj.attached.iter().filter_map(|s| self.shaders.get(s)).collect();
        let stages: Vec<&CompiledShader> = attached.iter().map(|s| &s.compiled).collect();
        let mut linked = shader::link(&stages, &obj.bindings);

        self.backend.release_program(program);
        if let Some(interface) = linked.interface() {
            let source_of = |stage: ShaderStage| {
                attached
                    .iter()
                    .find(|s| s.compiled.stage() == stage)
                    .map_or("", |s| s.compiled_source.as_str())
            };
            let sources = ProgramSources {
                vertex: source_of(ShaderStage::Vertex),
                fragment: source_of(ShaderStage::Fragment),
                interface,
            };
            if let Err(e) = self.backend.prepare_program(program, sources) {
                linked = LinkedProgram::failed(format!("error: {e:#}\n"));
            }
        }

        let status = linked.is_linked();
        if let Some(obj) = self.programs.get_mut(&program) {
            obj.linked = Some(linked);
        }
        Ok(status)
    }

    fn program_info_log_len(&self, program: ProgramId) -> DeviceResult<usize> {
        Ok(self.program_object(program)?.log().len())
    }

    fn program_info_log(&self, program: ProgramId, buf: &mut [u8]) -> DeviceResult<usize> {
        Ok(copy_log(self.program_object(program)?.log(), buf))
    }

    fn use_program(&mut self, program: Option<ProgramId>) -> DeviceResult<()> {
        if let Some(id) = program {
            if !self.program_object(id)?.is_linked() {
                return Err(DeviceError::ProgramNotLinked(id));
            }
        }
        self.current_program = program;
        Ok(())
    }

    fn attrib_location(&self, program: ProgramId, name: &str) -> DeviceResult<Option<u32>> {
        Ok(self
            .program_object(program)?
            .linked
            .as_ref()
            .and_then(|l| l.attrib_location(name)))
    }

    fn enable_vertex_attrib(&mut self, location: u32) -> DeviceResult<()> {
        self.bound_vertex_array_mut()?
            .attribs
            .entry(location)
            .or_default()
            .enabled = true;
        Ok(())
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        buffer: BufferId,
        layout: AttribLayout,
    ) -> DeviceResult<()> {
        self.buffer(buffer, BufferTarget::Vertex)?;
        self.bound_vertex_array_mut()?
            .attribs
            .entry(location)
            .or_default()
            .source = Some((buffer, layout));
        Ok(())
    }

    fn clear(&mut self, mask: ClearMask, color: ClearColor) {
        if mask.color {
            // A clear discards anything recorded before it.
            self.frame.draws.clear();
            self.frame.clear = Some(color);
        }
        self.frame.clear_depth |= mask.depth;
    }

    fn draw_elements(&mut self, count: u32) -> DeviceResult<()> {
        let draw = self.resolve_draw(count)?;
        self.frame.draws.push(draw);
        Ok(())
    }

    fn present(&mut self) -> DeviceResult<PresentOutcome> {
        let frame = std::mem::take(&mut self.frame);
        self.backend.submit(frame)
    }

    fn delete_program(&mut self, program: ProgramId) -> DeviceResult<()> {
        if self.programs.remove(&program).is_none() {
            return Err(DeviceError::unknown(ProgramId::KIND, program.get()));
        }
        self.backend.release_program(program);
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.frame.draws.retain(|d| d.program != program);
        Ok(())
    }

    fn delete_shader(&mut self, shader: ShaderId) -> DeviceResult<()> {
        self.shaders
            .remove(&shader)
            .map(|_| ())
            .ok_or_else(|| DeviceError::unknown(ShaderId::KIND, shader.get()))
    }

    fn delete_buffer(&mut self, buffer: BufferId) -> DeviceResult<()> {
        if self.buffers.remove(&buffer).is_none() {
            return Err(DeviceError::unknown(BufferId::KIND, buffer.get()));
        }
        self.backend.release_buffer(buffer);
        self.frame
            .draws
            .retain(|d| d.index_buffer != buffer && d.inputs.iter().all(|i| i.buffer != buffer));
        Ok(())
    }

    fn delete_vertex_array(&mut self, vao: VertexArrayId) -> DeviceResult<()> {
        if self.vertex_arrays.remove(&vao).is_none() {
            return Err(DeviceError::unknown(VertexArrayId::KIND, vao.get()));
        }
        if self.bound_vertex_array == Some(vao) {
            self.bound_vertex_array = None;
        }
        Ok(())
    }

    fn live_objects(&self) -> usize {
        self.buffers.len() + self.shaders.len() + self.programs.len() + self.vertex_arrays.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AttribFormat;
    use crate::scene::{TriangleScene, COLOR_OUTPUT, POSITION_ATTRIBUTE};

    #[derive(Default)]
    struct NullBackend {
        uploads: HashMap<BufferId, Vec<u8>>,
        programs: Vec<ProgramId>,
        frames: Vec<FrameCommands>,
    }

    impl Backend for NullBackend {
        fn upload_buffer(
            &mut self,
            id: BufferId,
            _target: BufferTarget,
            contents: &[u8],
        ) -> anyhow::Result<()> {
            self.uploads.insert(id, contents.to_vec());
            Ok(())
        }

        fn release_buffer(&mut self, id: BufferId) {
            self.uploads.remove(&id);
        }

        fn prepare_program(&mut self, id: ProgramId, _: ProgramSources<'_>) -> anyhow::Result<()> {
            self.programs.push(id);
            Ok(())
        }

        fn release_program(&mut self, id: ProgramId) {
            self.programs.retain(|p| *p != id);
        }

        fn submit(&mut self, frame: FrameCommands) -> DeviceResult<PresentOutcome> {
            self.frames.push(frame);
            Ok(PresentOutcome::Presented)
        }
    }

    struct Fixture {
        device: Device<NullBackend>,
        vao: VertexArrayId,
        vbo: BufferId,
        ebo: BufferId,
        program: ProgramId,
    }

    fn triangle(vertex_shader: &str) -> Fixture {
        let scene = TriangleScene::default();
        let mut device = Device::new(NullBackend::default());

        let vao = device.create_vertex_array().unwrap();
        device.bind_vertex_array(Some(vao)).unwrap();
        let vbo = device.create_buffer(BufferTarget::Vertex, scene.vertex_bytes()).unwrap();
        let ebo = device.create_buffer(BufferTarget::Index, scene.index_bytes()).unwrap();
        device.bind_index_buffer(ebo, IndexFormat::Uint32).unwrap();

        let vs = device.create_shader(ShaderStage::Vertex).unwrap();
        device.shader_source(vs, vertex_shader).unwrap();
        device.compile_shader(vs).unwrap();
        let fs = device.create_shader(ShaderStage::Fragment).unwrap();
        device.shader_source(fs, scene.fragment_shader).unwrap();
        device.compile_shader(fs).unwrap();

        let program = device.create_program().unwrap();
        device.attach_shader(program, vs).unwrap();
        device.attach_shader(program, fs).unwrap();
        device.bind_frag_data_location(program, 0, COLOR_OUTPUT).unwrap();

        Fixture { device, vao, vbo, ebo, program }
    }

    fn wire_position(f: &mut Fixture) {
        let loc = f
            .device
            .attrib_location(f.program, POSITION_ATTRIBUTE)
            .unwrap()
            .unwrap();
        f.device.enable_vertex_attrib(loc).unwrap();
        f.device
            .vertex_attrib_pointer(loc, f.vbo, AttribLayout::packed(AttribFormat::Float32x2))
            .unwrap();
    }

    #[test]
    fn full_setup_records_one_draw_per_frame() {
        let mut f = triangle(crate::scene::VERTEX_SHADER_SOURCE);
        assert!(f.device.link_program(f.program).unwrap());
        f.device.use_program(Some(f.program)).unwrap();
        wire_position(&mut f);

        f.device.clear(ClearMask::COLOR | ClearMask::DEPTH, ClearColor::TRANSPARENT);
        f.device.draw_elements(3).unwrap();
        assert_eq!(f.device.present().unwrap(), PresentOutcome::Presented);

        let frames = &f.device.backend().frames;
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].clear, Some(ClearColor::TRANSPARENT));
        assert!(frames[0].clear_depth);
        let draw = &frames[0].draws[0];
        assert_eq!(draw.count, 3);
        assert_eq!(draw.index_buffer, f.ebo);
        assert_eq!(draw.vertex_array, f.vao);
        assert_eq!(draw.inputs[0].buffer, f.vbo);

        // Present hands the frame off; the next one starts empty.
        assert!(f.device.pending_frame().is_empty());
    }

    #[test]
    fn compile_failure_is_reported_through_info_log() {
        let mut f = triangle("@vertex fn main( {");
        let vs = ShaderId::new(std::num::NonZeroU32::new(4).unwrap());
        let len = f.device.shader_info_log_len(vs).unwrap();
        assert!(len > 0);

        let mut buf = vec![0u8; len];
        assert_eq!(f.device.shader_info_log(vs, &mut buf).unwrap(), len);

        assert!(!f.device.link_program(f.program).unwrap());
        assert!(f.device.program_info_log_len(f.program).unwrap() > 0);
        assert!(matches!(
            f.device.use_program(Some(f.program)),
            Err(DeviceError::ProgramNotLinked(_))
        ));
        assert!(f.device.backend().programs.is_empty());
    }

    #[test]
    fn draw_without_enabled_attribute_is_rejected() {
        let mut f = triangle(crate::scene::VERTEX_SHADER_SOURCE);
        f.device.link_program(f.program).unwrap();
        f.device.use_program(Some(f.program)).unwrap();

        let err = f.device.draw_elements(3).unwrap_err();
        assert!(matches!(err, DeviceError::AttributeNotEnabled { location: 0, .. }));
        assert!(f.device.pending_frame().draws.is_empty());
    }

    #[test]
    fn draw_past_index_buffer_is_rejected() {
        let mut f = triangle(crate::scene::VERTEX_SHADER_SOURCE);
        f.device.link_program(f.program).unwrap();
        f.device.use_program(Some(f.program)).unwrap();
        wire_position(&mut f);

        assert!(matches!(
            f.device.draw_elements(4),
            Err(DeviceError::IndexRangeOutOfBounds { count: 4, .. })
        ));
    }

    #[test]
    fn wrong_buffer_target_is_rejected() {
        let mut f = triangle(crate::scene::VERTEX_SHADER_SOURCE);
        assert!(matches!(
            f.device.bind_index_buffer(f.vbo, IndexFormat::Uint32),
            Err(DeviceError::WrongBufferTarget { .. })
        ));
    }

    #[test]
    fn objects_are_released_exactly_once() {
        let mut f = triangle(crate::scene::VERTEX_SHADER_SOURCE);
        assert_eq!(f.device.live_objects(), 6);

        f.device.delete_program(f.program).unwrap();
        f.device.delete_buffer(f.ebo).unwrap();
        f.device.delete_buffer(f.vbo).unwrap();
        f.device.delete_vertex_array(f.vao).unwrap();
        assert!(f.device.delete_buffer(f.vbo).is_err());

        let shaders: Vec<ShaderId> = f.device.shaders.keys().copied().collect();
        for s in shaders {
            f.device.delete_shader(s).unwrap();
        }
        assert_eq!(f.device.live_objects(), 0);
        assert!(f.device.backend().uploads.is_empty());
    }

    #[test]
    fn exhausted_names_are_not_reused() {
        let mut device = Device::new(NullBackend::default());
        device.names = HandleAllocator::starting_at(NonZeroU32::MAX);

        let last = device.create_program().unwrap();
        assert_eq!(last.get(), u32::MAX);
        assert!(matches!(device.create_shader(ShaderStage::Vertex), Err(DeviceError::HandlesExhausted)));
        assert!(matches!(
            device.create_buffer(BufferTarget::Vertex, &[0; 8]),
            Err(DeviceError::HandlesExhausted)
        ));
        assert_eq!(device.live_objects(), 1);
        assert!(device.backend().uploads.is_empty());
    }

    #[test]
    fn deleting_the_active_program_unbinds_it() {
        let mut f = triangle(crate::scene::VERTEX_SHADER_SOURCE);
        f.device.link_program(f.program).unwrap();
        f.device.use_program(Some(f.program)).unwrap();
        f.device.delete_program(f.program).unwrap();

        assert!(matches!(f.device.draw_elements(3), Err(DeviceError::NoActiveProgram)));
    }
}
