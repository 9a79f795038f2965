use std::collections::HashMap;
use std::path::Path;
use std::rc::Rc;

use crate::renderer::context::RenderContext;
use crate::renderer::error::RenderError;

use super::program::Shader;

/// Name-keyed shader registry.
#[derive(Debug, Default)]
pub struct ShaderLibrary {
    shaders: HashMap<String, Rc<Shader>>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `shader` under its own name.
    pub fn add(&mut self, shader: Shader) -> Result<Rc<Shader>, RenderError> {
        let name = shader.name().to_owned();
        self.add_named(name, shader)
    }

    pub fn add_named(
        &mut self,
        name: impl Into<String>,
        shader: Shader,
    ) -> Result<Rc<Shader>, RenderError> {
        let name = name.into();
        if self.exists(&name) {
            log::error!("shader `{name}` already exists");
            return Err(RenderError::ShaderExists(name));
        }
        let shader = Rc::new(shader);
        self.shaders.insert(name, Rc::clone(&shader));
        Ok(shader)
    }

    /// Loads a shader file and registers it under its file stem.
    pub fn load(
        &mut self,
        ctx: &RenderContext,
        path: impl AsRef<Path>,
    ) -> Result<Rc<Shader>, RenderError> {
        let shader = Shader::from_file(ctx, path)?;
        self.add(shader)
    }

    pub fn load_named(
        &mut self,
        ctx: &RenderContext,
        name: impl Into<String>,
        path: impl AsRef<Path>,
    ) -> Result<Rc<Shader>, RenderError> {
        let shader = Shader::from_file(ctx, path)?;
        self.add_named(name, shader)
    }

    pub fn get(&self, name: &str) -> Result<Rc<Shader>, RenderError> {
        self.shaders.get(name).cloned().ok_or_else(|| {
            log::error!("shader `{name}` not found");
            RenderError::ShaderNotFound(name.to_owned())
        })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.shaders.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::backend::HeadlessBackend;

    const SOURCE: &str = "#type vertex\n\
        @vertex fn vs(@location(0) p: vec3<f32>) -> @builtin(position) vec4<f32> { return vec4<f32>(p, 1.0); }\n\
        #type fragment\n\
        @fragment fn fs() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }\n";

    fn ctx() -> RenderContext {
        RenderContext::with_backend(Rc::new(HeadlessBackend::new()))
    }

    #[test]
    fn load_registers_under_file_stem() {
        let ctx = ctx();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("texture.wgsl");
        std::fs::write(&path, SOURCE).unwrap();

        let mut library = ShaderLibrary::new();
        library.load(&ctx, &path).unwrap();
        assert!(library.exists("texture"));
        assert_eq!(library.get("texture").unwrap().name(), "texture");

        library.load_named(&ctx, "alias", &path).unwrap();
        assert_eq!(library.len(), 2);
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let ctx = ctx();
        let mut library = ShaderLibrary::new();
        library.add(Shader::from_source(&ctx, "flat", SOURCE).unwrap()).unwrap();
        let err = library
            .add(Shader::from_source(&ctx, "flat", SOURCE).unwrap())
            .unwrap_err();
        assert!(matches!(err, RenderError::ShaderExists(ref n) if n == "flat"));
    }

    #[test]
    fn missing_name_is_an_error() {
        let library = ShaderLibrary::new();
        assert!(!library.exists("nope"));
        assert!(matches!(library.get("nope"), Err(RenderError::ShaderNotFound(_))));
    }
}
