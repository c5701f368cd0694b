use std::path::Path;

use crate::error::RenderError;
use crate::highlight::Language;

/// The parsed form of a file-include argument: a path with an optional
/// inclusive 0-based line range.
#[derive(Debug, Clone, PartialEq)]
pub struct IncludeSpec {
    pub path: String,
    pub range: Option<(usize, usize)>,
}

impl IncludeSpec {
    /// Parse `<path>` or `<path>:<start>-<end>`.
    pub fn parse(argument: &str) -> Result<IncludeSpec, RenderError> {
        let argument = argument.trim();
        let Some((path, suffix)) = argument.split_once(':') else {
            return Ok(IncludeSpec {
                path: argument.to_string(),
                range: None,
            });
        };

        let (start, end) = suffix.split_once('-').ok_or_else(|| {
            RenderError::InvalidRange(format!("expected '<start>-<end>', got '{}'", suffix))
        })?;
        let start = parse_bound(start)?;
        let end = parse_bound(end)?;

        Ok(IncludeSpec {
            path: path.to_string(),
            range: Some((start, end)),
        })
    }

    /// Pick the highlight profile from the path's last extension segment.
    /// A path with no extension is malformed rather than guessed at.
    pub fn language(&self) -> Result<Language, RenderError> {
        match Path::new(&self.path).extension().and_then(|e| e.to_str()) {
            Some(ext) => Ok(Language::from_extension(ext)),
            None => Err(RenderError::MissingExtension(self.path.clone())),
        }
    }
}

fn parse_bound(text: &str) -> Result<usize, RenderError> {
    let text = text.trim();
    text.parse::<usize>()
        .map_err(|_| RenderError::InvalidRange(format!("'{}' is not a line number", text)))
}

/// Read the file and keep every line whose 0-based index falls in the
/// inclusive `[start, end]` range, preserving original line endings and
/// order. A range that selects nothing yields an empty string.
pub fn read_slice(path: &Path, start: usize, end: usize) -> Result<String, RenderError> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| RenderError::Io(format!("cannot read '{}': {}", path.display(), e)))?;

    let mut slice = String::new();
    for (index, line) in source.split_inclusive('\n').enumerate() {
        if index >= start && index <= end {
            slice.push_str(line);
        }
    }
    Ok(slice)
}
