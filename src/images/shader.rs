// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
Shader programs.

A [Program] is a backend-agnostic description: two GLSL bodies and the attribute locations they
expect.  A context compiles it lazily, once per [ProgramConfig] variant, through a
[ProgramCompiler].
*/

use crate::bindings::resource::{ResourceCore, ResourceId};
use crate::bindings::uniforms::{Uniform, UniformPayload, UniformPayloadRef};
use crate::images::vertex_layout::VertexLayout;
use crate::imp::{Backend, NativeId, UniformLocation, gl_enums};
use logwise::privacy::LogIt;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

#[derive(Debug)]
struct Shared {
    core: ResourceCore,
    name: String,
    vertex: String,
    fragment: String,
    attributes: Vec<(String, u32)>,
}

/// A shader program description.  Clones share identity.
#[derive(Debug, Clone)]
pub struct Program {
    shared: Arc<Shared>,
}

impl Program {
    pub fn new(name: &str, vertex: &str, fragment: &str) -> Self {
        Self::with_attributes(name, vertex, fragment, Vec::new())
    }

    /// A program that binds each attribute of `layout` to the attribute's location.
    pub fn for_layout(name: &str, vertex: &str, fragment: &str, layout: &VertexLayout) -> Self {
        let attributes = layout
            .attributes()
            .iter()
            .filter_map(|a| a.location.map(|l| (a.name.clone(), l)))
            .collect();
        Self::with_attributes(name, vertex, fragment, attributes)
    }

    pub fn with_attributes(name: &str, vertex: &str, fragment: &str, attributes: Vec<(String, u32)>) -> Self {
        Program {
            shared: Arc::new(Shared {
                core: ResourceCore::new(),
                name: name.to_string(),
                vertex: vertex.to_string(),
                fragment: fragment.to_string(),
                attributes,
            }),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.shared.core.id()
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn vertex_source(&self) -> &str {
        &self.shared.vertex
    }

    pub fn fragment_source(&self) -> &str {
        &self.shared.fragment
    }

    /// `(name, location)` pairs bound before linking.
    pub fn attributes(&self) -> &[(String, u32)] {
        &self.shared.attributes
    }

    /// Releases every compiled variant at each context's next finish.
    pub fn close(&self) {
        self.shared.core.close();
    }

    pub(crate) fn core(&self) -> &ResourceCore {
        &self.shared.core
    }
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for Program {}

/// Compilation variant of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProgramConfig {
    /// 2D samplers read `samplerExternalOES` images.
    pub external_texture_sampler: bool,
}

impl ProgramConfig {
    pub const DEFAULT: ProgramConfig = ProgramConfig {
        external_texture_sampler: false,
    };
    pub const EXTERNAL_TEXTURE_SAMPLER: ProgramConfig = ProgramConfig {
        external_texture_sampler: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Link,
}

impl ShaderStage {
    fn gl(self) -> u32 {
        match self {
            ShaderStage::Vertex => gl_enums::VERTEX_SHADER,
            ShaderStage::Fragment | ShaderStage::Link => gl_enums::FRAGMENT_SHADER,
        }
    }
}

impl Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => write!(f, "vertex"),
            ShaderStage::Fragment => write!(f, "fragment"),
            ShaderStage::Link => write!(f, "link"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShaderError {
    #[error(
        "Error compiling shader: {debug_name} stage={stage} : {code:#x} : '{log}' : source='{shader_source}', backend='{version}'"
    )]
    Compile {
        debug_name: String,
        stage: ShaderStage,
        shader_source: String,
        log: String,
        code: u32,
        version: String,
    },
    #[error("Error linking program: {debug_name} : {code:#x} : '{log}', backend='{version}'")]
    Link {
        debug_name: String,
        log: String,
        code: u32,
        version: String,
    },
}

/// Turns a [Program] into a linked native program.
///
/// Implement this to feed a context shaders from your own shader pipeline.
pub trait ProgramCompiler: std::fmt::Debug + Send {
    fn compile(
        &self,
        backend: &mut dyn Backend,
        program: &Program,
        config: ProgramConfig,
    ) -> Result<NativeId, ShaderError>;
}

/// Source preamble used by [GlslProgramCompiler].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlslConfig {
    /// Emitted as the first line of both stages, e.g. `#version 100`.
    pub version_header: Option<String>,
    /// GLSL ES: emit a default float precision in the fragment stage.
    pub gles: bool,
}

impl Default for GlslConfig {
    fn default() -> Self {
        GlslConfig {
            version_header: None,
            gles: false,
        }
    }
}

/// Compiles GLSL sources as written, after a small preamble.
///
/// The external-sampler variant enables `GL_OES_EGL_image_external` and defines `SAMPLER_2D`
/// as `samplerExternalOES`; otherwise `SAMPLER_2D` is `sampler2D`.
#[derive(Debug, Clone, Default)]
pub struct GlslProgramCompiler {
    config: GlslConfig,
}

impl GlslProgramCompiler {
    pub fn new(config: GlslConfig) -> Self {
        GlslProgramCompiler { config }
    }

    pub(crate) fn preamble(&self, stage: ShaderStage, config: ProgramConfig) -> String {
        let mut out = String::new();
        if let Some(header) = &self.config.version_header {
            out.push_str(header);
            out.push('\n');
        }
        if config.external_texture_sampler {
            out.push_str("#extension GL_OES_EGL_image_external : require\n");
            out.push_str("#define SAMPLER_2D samplerExternalOES\n");
        } else {
            out.push_str("#define SAMPLER_2D sampler2D\n");
        }
        if self.config.gles && stage == ShaderStage::Fragment {
            out.push_str("precision mediump float;\n");
        }
        out
    }

    fn compile_stage(
        &self,
        backend: &mut dyn Backend,
        program: &Program,
        stage: ShaderStage,
        config: ProgramConfig,
    ) -> Result<NativeId, ShaderError> {
        let body = match stage {
            ShaderStage::Vertex => program.vertex_source(),
            _ => program.fragment_source(),
        };
        let source = self.preamble(stage, config) + body;
        let shader = backend.create_shader(stage.gl());
        if backend.compile_shader(shader, &source) {
            return Ok(shader);
        }
        let log = backend.shader_info_log(shader);
        let code = backend.error();
        backend.delete_shader(shader);
        Err(ShaderError::Compile {
            debug_name: program.name().to_string(),
            stage,
            shader_source: source,
            log,
            code,
            version: backend.version_string(),
        })
    }
}

impl ProgramCompiler for GlslProgramCompiler {
    fn compile(
        &self,
        backend: &mut dyn Backend,
        program: &Program,
        config: ProgramConfig,
    ) -> Result<NativeId, ShaderError> {
        let vertex = self.compile_stage(backend, program, ShaderStage::Vertex, config)?;
        let fragment = match self.compile_stage(backend, program, ShaderStage::Fragment, config) {
            Ok(f) => f,
            Err(e) => {
                backend.delete_shader(vertex);
                return Err(e);
            }
        };
        let native = backend.create_program();
        backend.attach_shader(native, vertex);
        backend.attach_shader(native, fragment);
        for (name, location) in program.attributes() {
            backend.bind_attrib_location(native, *location, name);
        }
        let linked = backend.link_program(native);
        backend.delete_shader(vertex);
        backend.delete_shader(fragment);
        if !linked {
            let log = backend.program_info_log(native);
            let code = backend.error();
            backend.delete_program(native);
            return Err(ShaderError::Link {
                debug_name: program.name().to_string(),
                log,
                code,
                version: backend.version_string(),
            });
        }
        logwise::info_sync!(
            "Compiled program {name} config={config}",
            name = LogIt(program.name()),
            config = LogIt(&config)
        );
        Ok(native)
    }
}

/// One native compilation of a program, with its uniform bookkeeping.
#[derive(Debug)]
pub(crate) struct CompiledProgram {
    pub(crate) native: NativeId,
    locations: HashMap<Arc<str>, UniformLocation>,
    values: HashMap<Uniform, UniformPayload>,
}

impl CompiledProgram {
    pub(crate) fn new(native: NativeId) -> Self {
        CompiledProgram {
            native,
            locations: HashMap::new(),
            values: HashMap::new(),
        }
    }

    pub(crate) fn uniform_location<B: Backend + ?Sized>(&mut self, backend: &mut B, uniform: &Uniform) -> UniformLocation {
        if let Some(location) = self.locations.get(uniform.name()) {
            return *location;
        }
        let location = backend.uniform_location(self.native, uniform.name());
        self.locations.insert(Arc::from(uniform.name()), location);
        location
    }

    /// Records `payload` as the value of `uniform`.  Returns false if it already was.
    pub(crate) fn replace_value(&mut self, uniform: &Uniform, payload: UniformPayloadRef<'_>) -> bool {
        match self.values.get_mut(uniform) {
            Some(stored) if payload.matches(stored) => false,
            Some(stored) => {
                payload.overwrite(stored);
                true
            }
            None => {
                self.values.insert(uniform.clone(), payload.to_payload());
                true
            }
        }
    }
}
