use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use labnote::Notebook;
use labnote::line::LineKind;

use crate::error::DiagnosticError;
use crate::handlers::{self, Handler, RenderContext, write_divider};
use crate::highlight::Highlighter;

/// Inclusive end index applied when an include directive carries no
/// explicit line range.
pub const DEFAULT_INCLUDE_CEILING: usize = 500;

/// Fixed document header: charset, the relative stylesheet link (not
/// validated to exist), and the MathJax loader for inline math.
pub const HEADER: &str = concat!(
    "<!DOCTYPE html>\n",
    "<html lang=\"en\">\n",
    "<meta charset=\"utf-8\"/>\n",
    "<link rel=\"stylesheet\" type='text/css' href=\"resources/styles.css\">\n",
    "<script type=\"text/javascript\" async ",
    "src=\"https://cdnjs.cloudflare.com/ajax/libs/mathjax/2.7.2/",
    "MathJax.js?config=TeX-MML-AM_CHTML\"></script>\n",
    "<body>\n",
    "<div style=\"width: 90%; padding: 25px;\">\n",
);

pub const FOOTER: &str = "</div>\n</body>\n</html>";

/// Knobs for a render run.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Inclusive end index used when an include directive has no explicit
    /// line range.
    pub max_include_lines: usize,
    /// Directory against which relative include paths are resolved.
    pub base_dir: PathBuf,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            max_include_lines: DEFAULT_INCLUDE_CEILING,
            base_dir: PathBuf::from("."),
        }
    }
}

/// Drives one pass over a parsed notebook: fixed header, one fragment per
/// line dispatched through the handler registry, fixed footer.
pub struct Renderer {
    handlers: HashMap<&'static str, Handler>,
    highlighter: Highlighter,
    options: RenderOptions,
}

impl Renderer {
    pub fn new(options: RenderOptions) -> Self {
        Renderer {
            handlers: handlers::registry(),
            highlighter: Highlighter::new(),
            options,
        }
    }

    /// Render the notebook into `out`. On success, returns the warnings
    /// accumulated along the way; a fatal directive error aborts the pass
    /// and may leave the sink partially written.
    pub fn render(
        &self,
        notebook: &Notebook,
        out: &mut dyn Write,
    ) -> Result<Vec<DiagnosticError>, DiagnosticError> {
        let mut ctx = RenderContext {
            out,
            highlighter: &self.highlighter,
            options: &self.options,
            source_id: notebook.source_id,
            warnings: Vec::new(),
        };

        ctx.out.write_all(HEADER.as_bytes())?;

        for line in &notebook.lines {
            match &line.kind {
                LineKind::Blank => writeln!(ctx.out, "<br>")?,
                LineKind::Comment => {}
                LineKind::Divider { label } => write_divider(&mut ctx, label)?,
                LineKind::Directive(directive) => {
                    // Unknown tags are skipped so older builds tolerate
                    // newer log files.
                    if let Some(handler) = self.handlers.get(directive.name.as_str()) {
                        handler(&mut ctx, &directive.args, directive.span.clone())?;
                    }
                }
                LineKind::Text(text) => writeln!(ctx.out, "{}<br>", text)?,
            }
        }

        ctx.out.write_all(FOOTER.as_bytes())?;
        ctx.out.flush()?;

        Ok(ctx.warnings)
    }
}

/// Render with default options.
pub fn render_notebook(
    notebook: &Notebook,
    out: &mut dyn Write,
) -> Result<Vec<DiagnosticError>, DiagnosticError> {
    Renderer::new(RenderOptions::default()).render(notebook, out)
}
