use std::path::Path;
use std::rc::Rc;

use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::renderer::backend::{Backend, ProgramId, StageId};
use crate::renderer::context::RenderContext;
use crate::renderer::error::{RenderError, ShaderError};

use super::source::{read_source, ShaderSources, StageKind};
use super::uniform::UniformValue;

/// A linked shader program.
///
/// Uniform setters look the name up on every call; a name the program does
/// not declare is ignored.
pub struct Shader {
    backend: Rc<dyn Backend>,
    program: ProgramId,
    name: String,
}

impl Shader {
    /// Loads a combined `#type`-directive source file. The shader is named
    /// after the file stem.
    pub fn from_file(ctx: &RenderContext, path: impl AsRef<Path>) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let backend = ctx.backend("shader")?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let sources = ShaderSources::parse(&read_source(path))?;
        let program = compile_program(backend.as_ref(), &sources)?;
        log::debug!("shader `{name}` loaded from {}", path.display());

        Ok(Self {
            backend: Rc::clone(backend),
            program,
            name,
        })
    }

    /// Builds a shader from one combined `#type`-directive source.
    pub fn from_source(
        ctx: &RenderContext,
        name: impl Into<String>,
        source: &str,
    ) -> Result<Self, RenderError> {
        let backend = ctx.backend("shader")?;
        let sources = ShaderSources::parse(source)?;
        Self::build(backend, name.into(), &sources)
    }

    /// Builds a shader from separate vertex and fragment sources.
    pub fn from_sources(
        ctx: &RenderContext,
        name: impl Into<String>,
        vertex: &str,
        fragment: &str,
    ) -> Result<Self, RenderError> {
        let backend = ctx.backend("shader")?;
        Self::build(backend, name.into(), &ShaderSources::from_pair(vertex, fragment))
    }

    fn build(
        backend: &Rc<dyn Backend>,
        name: String,
        sources: &ShaderSources,
    ) -> Result<Self, RenderError> {
        let program = compile_program(backend.as_ref(), sources)?;
        log::debug!("shader `{name}` linked");
        Ok(Self {
            backend: Rc::clone(backend),
            program,
            name,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> ProgramId {
        self.program
    }

    pub fn bind(&self) {
        self.backend.use_program(Some(self.program));
    }

    pub fn unbind(&self) {
        self.backend.use_program(None);
    }

    pub fn set_int(&self, name: &str, value: i32) {
        self.upload(name, UniformValue::Int(value));
    }

    pub fn set_float(&self, name: &str, value: f32) {
        self.upload(name, UniformValue::Float(value));
    }

    pub fn set_float2(&self, name: &str, value: Vec2) {
        self.upload(name, UniformValue::Float2(value));
    }

    pub fn set_float3(&self, name: &str, value: Vec3) {
        self.upload(name, UniformValue::Float3(value));
    }

    pub fn set_float4(&self, name: &str, value: Vec4) {
        self.upload(name, UniformValue::Float4(value));
    }

    pub fn set_mat3(&self, name: &str, value: Mat3) {
        self.upload(name, UniformValue::Mat3(value));
    }

    pub fn set_mat4(&self, name: &str, value: Mat4) {
        self.upload(name, UniformValue::Mat4(value));
    }

    fn upload(&self, name: &str, value: UniformValue) {
        if let Some(location) = self.backend.uniform_location(self.program, name) {
            self.backend.upload_uniform(location, value);
        }
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        self.backend.delete_program(self.program);
    }
}

impl std::fmt::Debug for Shader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shader")
            .field("name", &self.name)
            .field("program", &self.program)
            .finish()
    }
}

/// Compiles every stage and links them into one program.
///
/// Nothing is left behind on failure: stages created so far and the program
/// are released before the error is returned.
fn compile_program(backend: &dyn Backend, sources: &ShaderSources) -> Result<ProgramId, ShaderError> {
    if sources.len() > 2 {
        log::error!("only two shader stages are supported, got {}", sources.len());
        return Err(ShaderError::TooManyStages(sources.len()));
    }

    let mut seen: Vec<StageKind> = Vec::with_capacity(2);
    for (kind, _) in sources.iter() {
        if seen.contains(&kind) {
            log::error!("shader stage `{kind}` declared more than once");
            return Err(ShaderError::DuplicateStage(kind));
        }
        seen.push(kind);
    }

    let program = backend.create_program();
    let mut stages = Vec::with_capacity(sources.len());

    let release = |stages: &[StageId]| {
        for &stage in stages {
            backend.delete_stage(stage);
        }
        backend.delete_program(program);
    };

    for (kind, source) in sources.iter() {
        let stage = backend.create_stage(kind);
        stages.push(stage);

        if let Err(log) = backend.compile_stage(stage, source) {
            log::error!("{kind} shader compilation failed:\n{log}");
            release(stages.as_slice());
            return Err(ShaderError::Compile { stage: kind, log });
        }
        backend.attach_stage(program, stage);
    }

    if let Err(log) = backend.link_program(program) {
        log::error!("shader link failed:\n{log}");
        release(stages.as_slice());
        return Err(ShaderError::Link { log });
    }

    for stage in stages {
        backend.detach_stage(program, stage);
        backend.delete_stage(stage);
    }

    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::{HeadlessBackend, ResourceStats};

    const VS: &str = "@group(0) @binding(0) var<uniform> u_view_projection: mat4x4<f32>;\n\
        @vertex fn vs(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> { return u_view_projection * vec4<f32>(p, 1.0); }\n";
    const FS: &str = "@group(0) @binding(1) var<uniform> u_color: vec4<f32>;\n\
        @fragment fn fs() -> @location(0) vec4<f32> { return u_color; }\n";

    fn headless() -> (RenderContext, Rc<HeadlessBackend>) {
        let backend = Rc::new(HeadlessBackend::new());
        (RenderContext::with_backend(backend.clone()), backend)
    }

    // ---- construction ----

    #[test]
    fn success_leaves_only_the_program() {
        let (ctx, backend) = headless();
        let shader = Shader::from_sources(&ctx, "flat", VS, FS).unwrap();
        assert_eq!(shader.name(), "flat");

        let stats = backend.stats();
        assert_eq!((stats.programs, stats.stages), (1, 0));

        drop(shader);
        assert_eq!(backend.stats().programs, 0);
    }

    #[test]
    fn combined_source_with_pixel_alias_links() {
        let (ctx, _backend) = headless();
        let src = format!("#type vertex\n{VS}#type pixel\n{FS}");
        assert!(Shader::from_source(&ctx, "combined", &src).is_ok());
    }

    #[test]
    fn three_stages_fail_before_anything_is_created() {
        let (ctx, backend) = headless();
        let src = format!("#type vertex\n{VS}#type fragment\n{FS}#type fragment\n{FS}");
        let err = Shader::from_source(&ctx, "three", &src).unwrap_err();
        assert!(matches!(err, RenderError::Shader(ShaderError::TooManyStages(3))));
        assert_eq!(backend.stats(), ResourceStats::default());
    }

    #[test]
    fn duplicate_stage_is_rejected() {
        let (ctx, backend) = headless();
        let src = format!("#type vertex\n{VS}#type vertex\n{VS}");
        let err = Shader::from_source(&ctx, "dup", &src).unwrap_err();
        assert!(matches!(err, RenderError::Shader(ShaderError::DuplicateStage(StageKind::Vertex))));
        assert_eq!(backend.stats(), ResourceStats::default());
    }

    #[test]
    fn compile_failure_releases_everything() {
        let (ctx, backend) = headless();
        let err = Shader::from_sources(&ctx, "bad", VS, "this is not wgsl").unwrap_err();
        assert!(matches!(
            err,
            RenderError::Shader(ShaderError::Compile { stage: StageKind::Fragment, .. })
        ));
        assert_eq!(backend.stats(), ResourceStats::default());
    }

    #[test]
    fn link_failure_releases_everything() {
        let (ctx, backend) = headless();
        let fs = "@fragment fn fs(@location(2) c: vec4<f32>) -> @location(0) vec4<f32> { return c; }\n";
        let err = Shader::from_sources(&ctx, "mismatch", VS, fs).unwrap_err();
        assert!(matches!(err, RenderError::Shader(ShaderError::Link { .. })));
        assert_eq!(backend.stats(), ResourceStats::default());
    }

    #[test]
    fn missing_file_fails_at_link() {
        let (ctx, backend) = headless();
        let dir = tempfile::tempdir().unwrap();
        let err = Shader::from_file(&ctx, dir.path().join("missing.wgsl")).unwrap_err();
        match err {
            RenderError::Shader(ShaderError::Link { log }) => assert!(log.contains("vertex")),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.stats(), ResourceStats::default());
    }

    #[test]
    fn file_name_becomes_shader_name() {
        let (ctx, _backend) = headless();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flat_color.wgsl");
        std::fs::write(&path, format!("#type vertex\n{VS}#type fragment\n{FS}")).unwrap();
        assert_eq!(Shader::from_file(&ctx, &path).unwrap().name(), "flat_color");
    }

    #[test]
    fn null_context_is_unsupported() {
        let err = Shader::from_sources(&RenderContext::null(), "x", VS, FS).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedApi { .. }));
    }

    // ---- uniforms ----

    #[test]
    fn uniforms_reach_the_bound_program() {
        let (ctx, backend) = headless();
        let shader = Shader::from_sources(&ctx, "flat", VS, FS).unwrap();
        shader.bind();
        shader.set_float4("u_color", Vec4::new(0.2, 0.3, 0.8, 1.0));
        assert_eq!(
            backend.uniform(shader.id(), "u_color"),
            Some(UniformValue::Float4(Vec4::new(0.2, 0.3, 0.8, 1.0)))
        );
    }

    #[test]
    fn missing_uniform_is_silent() {
        let (ctx, backend) = headless();
        let shader = Shader::from_sources(&ctx, "flat", VS, FS).unwrap();
        shader.bind();
        let before = backend.snapshot();
        shader.set_float("u_does_not_exist", 1.0);
        assert_eq!(backend.snapshot(), before);
    }

    #[test]
    fn mismatched_uniform_type_is_skipped() {
        let (ctx, backend) = headless();
        let shader = Shader::from_sources(&ctx, "flat", VS, FS).unwrap();
        shader.bind();
        shader.set_mat3("u_color", Mat3::IDENTITY);
        assert_eq!(backend.uniform(shader.id(), "u_color"), None);
    }
}
