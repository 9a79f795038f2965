use std::fmt;
use std::path::Path;

use crate::renderer::error::ShaderError;

const TYPE_TOKEN: &str = "#type";

/// Pipeline stage a source block compiles to.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    /// Maps a `#type` directive argument to a stage. `pixel` is an alias
    /// for `fragment`.
    pub fn from_directive(name: &str) -> Option<Self> {
        match name {
            "vertex" => Some(StageKind::Vertex),
            "fragment" | "pixel" => Some(StageKind::Fragment),
            _ => None,
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
        })
    }
}

/// Per-stage source blocks in file order.
///
/// Duplicates are kept so the compiler can reject them; a map would hide a
/// second `#type vertex` block.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ShaderSources {
    stages: Vec<(StageKind, String)>,
}

impl ShaderSources {
    /// Splits a combined source on `#type <stage>` directive lines.
    pub fn parse(source: &str) -> Result<Self, ShaderError> {
        let mut stages = Vec::new();
        let mut pos = source.find(TYPE_TOKEN);

        while let Some(start) = pos {
            let eol = source[start..]
                .find(['\r', '\n'])
                .map(|i| start + i)
                .ok_or_else(|| syntax_error(start, "directive line is not terminated"))?;

            // The stage name must be separated from the token.
            let rest = &source[start + TYPE_TOKEN.len()..eol];
            let name = if rest.starts_with([' ', '\t']) {
                rest.trim()
            } else {
                source[start..eol].trim()
            };
            let kind = StageKind::from_directive(name).ok_or_else(|| {
                log::error!("invalid shader stage `{name}`");
                ShaderError::UnknownStage(name.to_owned())
            })?;

            let body_start = source[eol..]
                .find(|c| c != '\r' && c != '\n')
                .map(|i| eol + i)
                .ok_or_else(|| syntax_error(eol, "directive has no stage source"))?;

            pos = source[body_start..].find(TYPE_TOKEN).map(|i| body_start + i);
            let body_end = pos.unwrap_or(source.len());

            stages.push((kind, source[body_start..body_end].to_owned()));
        }

        Ok(Self { stages })
    }

    /// Builds sources from a separate vertex and fragment block.
    pub fn from_pair(vertex: impl Into<String>, fragment: impl Into<String>) -> Self {
        Self {
            stages: vec![
                (StageKind::Vertex, vertex.into()),
                (StageKind::Fragment, fragment.into()),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, kind: StageKind) -> Option<&str> {
        self.stages
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, s)| s.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (StageKind, &str)> {
        self.stages.iter().map(|(k, s)| (*k, s.as_str()))
    }
}

fn syntax_error(offset: usize, reason: &'static str) -> ShaderError {
    log::error!("shader syntax error at byte {offset}: {reason}");
    ShaderError::Syntax { offset, reason }
}

/// Reads a shader file. An unreadable file is logged and read as empty.
pub fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            log::error!("could not open shader file `{}`: {err}", path.display());
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_vertex_and_fragment() {
        let src = "#type vertex\nVS BODY\n#type fragment\nFS BODY\n";
        let sources = ShaderSources::parse(src).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources.get(StageKind::Vertex), Some("VS BODY\n"));
        assert_eq!(sources.get(StageKind::Fragment), Some("FS BODY\n"));
    }

    #[test]
    fn pixel_is_fragment_and_names_are_trimmed() {
        let src = "#type   vertex  \r\nv\n#type pixel\nf";
        let sources = ShaderSources::parse(src).unwrap();
        let kinds: Vec<_> = sources.iter().map(|(k, _)| k).collect();
        assert_eq!(kinds, [StageKind::Vertex, StageKind::Fragment]);
        assert_eq!(sources.get(StageKind::Fragment), Some("f"));
    }

    #[test]
    fn blank_lines_after_directive_are_skipped() {
        let sources = ShaderSources::parse("#type vertex\n\n\nbody").unwrap();
        assert_eq!(sources.get(StageKind::Vertex), Some("body"));
    }

    #[test]
    fn duplicates_are_preserved_in_order() {
        let src = "#type vertex\na\n#type vertex\nb\n#type fragment\nc\n";
        let sources = ShaderSources::parse(src).unwrap();
        assert_eq!(sources.len(), 3);
    }

    #[test]
    fn text_before_first_directive_is_ignored() {
        let sources = ShaderSources::parse("// header\n#type vertex\nv\n").unwrap();
        assert_eq!(sources.len(), 1);
    }

    #[test]
    fn unknown_stage_is_rejected() {
        let err = ShaderSources::parse("#type geometry\nbody").unwrap_err();
        assert!(matches!(err, ShaderError::UnknownStage(ref s) if s == "geometry"));
    }

    #[test]
    fn stage_name_glued_to_the_token_is_unknown() {
        let err = ShaderSources::parse("#typevertex\nbody").unwrap_err();
        assert!(matches!(err, ShaderError::UnknownStage(ref s) if s == "#typevertex"));
    }

    #[test]
    fn tab_separates_the_stage_name() {
        let sources = ShaderSources::parse("#type\tfragment\nbody").unwrap();
        assert_eq!(sources.get(StageKind::Fragment), Some("body"));
    }

    #[test]
    fn unterminated_directive_is_a_syntax_error() {
        let err = ShaderSources::parse("#type vertex").unwrap_err();
        assert!(matches!(err, ShaderError::Syntax { offset: 0, .. }));
    }

    #[test]
    fn directive_without_body_is_a_syntax_error() {
        let err = ShaderSources::parse("#type vertex\n\n").unwrap_err();
        assert!(matches!(err, ShaderError::Syntax { .. }));
    }

    #[test]
    fn empty_source_has_no_stages() {
        assert!(ShaderSources::parse("").unwrap().is_empty());
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(read_source(&dir.path().join("nope.wgsl")), "");
    }
}
