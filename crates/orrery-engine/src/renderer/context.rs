use std::rc::Rc;

use super::api::RendererApi;
use super::backend::{Backend, HeadlessBackend};
use super::error::RenderError;

/// The backend every resource `create` call goes through.
///
/// Built once from the configured [`RendererApi`]; the backend cannot be
/// swapped afterwards. Cloning shares the backend.
#[derive(Clone)]
pub struct RenderContext {
    api: RendererApi,
    backend: Option<Rc<dyn Backend>>,
}

impl RenderContext {
    /// A context for `RendererApi::None`. Every resource creation fails.
    pub fn null() -> Self {
        Self {
            api: RendererApi::None,
            backend: None,
        }
    }

    pub fn headless() -> Self {
        Self::with_backend(Rc::new(HeadlessBackend::new()))
    }

    pub fn with_backend(backend: Rc<dyn Backend>) -> Self {
        Self {
            api: backend.api(),
            backend: Some(backend),
        }
    }

    pub fn api(&self) -> RendererApi {
        self.api
    }

    /// The backend, or `UnsupportedApi` when there is none. `resource`
    /// names what the caller was about to create.
    pub fn backend(&self, resource: &'static str) -> Result<&Rc<dyn Backend>, RenderError> {
        self.backend.as_ref().ok_or_else(|| {
            log::error!("renderer api `{}` cannot create {resource}", self.api);
            RenderError::UnsupportedApi {
                api: self.api,
                resource,
            }
        })
    }
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext").field("api", &self.api).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_context_has_no_backend() {
        let ctx = RenderContext::null();
        assert_eq!(ctx.api(), RendererApi::None);
        assert!(matches!(
            ctx.backend("vertex buffer"),
            Err(RenderError::UnsupportedApi { api: RendererApi::None, resource: "vertex buffer" })
        ));
    }

    #[test]
    fn api_follows_the_backend() {
        assert_eq!(RenderContext::headless().api(), RendererApi::Headless);
        assert!(RenderContext::headless().backend("x").is_ok());
    }
}
