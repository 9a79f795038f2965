use std::fmt;
use std::str::FromStr;

use super::error::RenderError;

/// Graphics backend selected once at startup.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum RendererApi {
    /// No backend. Every resource creation fails.
    None,
    /// CPU-side state machine; no GPU or display required.
    Headless,
    /// Hardware backend on top of wgpu.
    #[default]
    Wgpu,
}

impl RendererApi {
    /// Environment variable consulted by [`RendererApi::from_env`].
    pub const ENV_VAR: &'static str = "ORRERY_RENDERER";

    /// Reads the backend from `ORRERY_RENDERER`.
    ///
    /// An unset variable yields `Ok(None)`; a set but unrecognised name is an
    /// error.
    pub fn from_env() -> Result<Option<Self>, RenderError> {
        match std::env::var(Self::ENV_VAR) {
            Ok(value) => value.parse().map(Some),
            Err(_) => Ok(None),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RendererApi::None => "none",
            RendererApi::Headless => "headless",
            RendererApi::Wgpu => "wgpu",
        }
    }
}

impl FromStr for RendererApi {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(RendererApi::None),
            "headless" => Ok(RendererApi::Headless),
            "wgpu" => Ok(RendererApi::Wgpu),
            _ => {
                log::error!("unknown renderer api `{s}`");
                Err(RenderError::UnknownApi(s.to_owned()))
            }
        }
    }
}

impl fmt::Display for RendererApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
