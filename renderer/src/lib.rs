pub mod assembler;
pub mod error;
pub mod handlers;
pub mod highlight;
pub mod include;

pub use assembler::{DEFAULT_INCLUDE_CEILING, RenderOptions, Renderer, render_notebook};
pub use error::{DiagnosticError, RenderError};
