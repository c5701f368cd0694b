use std::fmt;
use std::ops::Range;

#[derive(Debug)]
pub enum RenderError {
    /// `link` arguments that did not split into a title and a URL.
    MalformedLink(String),
    /// Include range suffix that is not a `<start>-<end>` integer pair.
    InvalidRange(String),
    /// Include path with no extension to choose a highlight language by.
    MissingExtension(String),
    Highlight(String),
    Io(String),
    Custom(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::MalformedLink(args) => {
                write!(f, "link expects '<title> <url>', got '{}'", args)
            }
            RenderError::InvalidRange(detail) => {
                write!(f, "invalid line range: {}", detail)
            }
            RenderError::MissingExtension(path) => {
                write!(f, "cannot pick a highlight language for '{}': no file extension", path)
            }
            RenderError::Highlight(msg) => write!(f, "highlighting failed: {}", msg),
            RenderError::Io(msg) => write!(f, "I/O error: {}", msg),
            RenderError::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<std::io::Error> for RenderError {
    fn from(err: std::io::Error) -> Self {
        RenderError::Io(err.to_string())
    }
}

/// A render error or warning enriched with source location information.
#[derive(Debug)]
pub struct DiagnosticError {
    pub error: RenderError,
    pub span: Option<Range<usize>>,
    pub source_id: usize,
    pub is_warning: bool,
}

impl DiagnosticError {
    /// Create a fatal diagnostic with a source span.
    pub fn error(error: RenderError, span: Range<usize>, source_id: usize) -> Self {
        DiagnosticError {
            error,
            span: Some(span),
            source_id,
            is_warning: false,
        }
    }

    /// Create a warning diagnostic with a source span.
    pub fn warning(message: String, span: Range<usize>, source_id: usize) -> Self {
        DiagnosticError {
            error: RenderError::Custom(message),
            span: Some(span),
            source_id,
            is_warning: true,
        }
    }
}

impl From<RenderError> for DiagnosticError {
    fn from(error: RenderError) -> Self {
        DiagnosticError {
            error,
            span: None,
            source_id: 0,
            is_warning: false,
        }
    }
}

impl From<std::io::Error> for DiagnosticError {
    fn from(err: std::io::Error) -> Self {
        DiagnosticError::from(RenderError::from(err))
    }
}

impl fmt::Display for DiagnosticError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.error.fmt(f)
    }
}

impl std::error::Error for DiagnosticError {}
