use std::collections::HashMap;
use std::io::Write;
use std::ops::Range;

use crate::assembler::RenderOptions;
use crate::error::{DiagnosticError, RenderError};
use crate::highlight::{Highlighter, Language};
use crate::include::{self, IncludeSpec};

const CODE_DIV_OPEN: &str =
    "<div style=\"padding-left: 50px; padding-right: 50px; width: 80%\">";
const INCLUDE_DIV_OPEN: &str =
    "<div style=\"padding-left: 50px; padding-right: 60px; width: 80%\">";
const DIV_CLOSE: &str = "</div>";

/// State shared by all handlers during one render pass: the output sink,
/// the highlighter, the run options, and the warnings collected so far.
pub struct RenderContext<'a> {
    pub out: &'a mut dyn Write,
    pub highlighter: &'a Highlighter,
    pub options: &'a RenderOptions,
    pub source_id: usize,
    pub warnings: Vec<DiagnosticError>,
}

impl RenderContext<'_> {
    fn spanned(&self, error: RenderError, span: &Range<usize>) -> DiagnosticError {
        DiagnosticError::error(error, span.clone(), self.source_id)
    }
}

/// A tag handler: consumes the directive's argument string and appends one
/// HTML fragment to the sink.
pub type Handler = fn(&mut RenderContext<'_>, &str, Range<usize>) -> Result<(), DiagnosticError>;

/// Build the tag-name-to-handler mapping. Constructed once per Renderer
/// and read-only afterwards; lookups that miss are skipped by the caller.
pub fn registry() -> HashMap<&'static str, Handler> {
    HashMap::from([
        ("img", image as Handler),
        ("bold", bold as Handler),
        ("link", link as Handler),
        ("code", code as Handler),
        ("incl", include_file as Handler),
        ("exec", exec as Handler),
        ("div_line", div_line as Handler),
    ])
}

/// `%% img <path>` — the path may be wrapped in literal `[` `]`.
fn image(
    ctx: &mut RenderContext<'_>,
    args: &str,
    _span: Range<usize>,
) -> Result<(), DiagnosticError> {
    let path = args.trim_start_matches('[').trim_end_matches(']');
    writeln!(
        ctx.out,
        "<div style=\"text-align: center; width: 100%\"><img src=\"{}\"></div>",
        path
    )?;
    Ok(())
}

/// `%% bold <text>`
fn bold(
    ctx: &mut RenderContext<'_>,
    args: &str,
    _span: Range<usize>,
) -> Result<(), DiagnosticError> {
    writeln!(ctx.out, "<b>{}</b><br>", args)?;
    Ok(())
}

/// `%% link <title> <url>` — stray `%` characters are stripped before the
/// split, so copied URLs with percent markers still work.
fn link(
    ctx: &mut RenderContext<'_>,
    args: &str,
    span: Range<usize>,
) -> Result<(), DiagnosticError> {
    let cleaned = args.replace('%', "");
    let mut tokens = cleaned.split_whitespace();
    let (Some(title), Some(url), None) = (tokens.next(), tokens.next(), tokens.next()) else {
        return Err(ctx.spanned(RenderError::MalformedLink(args.to_string()), &span));
    };
    writeln!(ctx.out, "<a href=\"{}\" target=\"_blank\">{}</a><br>", url, title)?;
    Ok(())
}

/// `%% code <source line>` — one line of code, highlighted as Python.
fn code(
    ctx: &mut RenderContext<'_>,
    args: &str,
    span: Range<usize>,
) -> Result<(), DiagnosticError> {
    let highlighted = ctx
        .highlighter
        .highlight(args, Language::Python)
        .map_err(|e| ctx.spanned(e, &span))?;
    write!(ctx.out, "{}{}{}", CODE_DIV_OPEN, highlighted, DIV_CLOSE)?;
    Ok(())
}

/// `%% incl <path>[:<start>-<end>]` — embed a highlighted slice of an
/// external file. See `include::IncludeSpec` for the argument grammar.
fn include_file(
    ctx: &mut RenderContext<'_>,
    args: &str,
    span: Range<usize>,
) -> Result<(), DiagnosticError> {
    let spec = IncludeSpec::parse(args).map_err(|e| ctx.spanned(e, &span))?;
    let (start, end) = spec.range.unwrap_or((0, ctx.options.max_include_lines));

    if start > end {
        ctx.warnings.push(DiagnosticError::warning(
            format!("include range {}-{} selects no lines", start, end),
            span.clone(),
            ctx.source_id,
        ));
    }

    let resolved = ctx.options.base_dir.join(&spec.path);
    let slice = include::read_slice(&resolved, start, end).map_err(|e| ctx.spanned(e, &span))?;
    let language = spec.language().map_err(|e| ctx.spanned(e, &span))?;
    let contents = ctx
        .highlighter
        .highlight(&slice, language)
        .map_err(|e| ctx.spanned(e, &span))?;

    write!(ctx.out, "{}{}{}", INCLUDE_DIV_OPEN, contents, DIV_CLOSE)?;
    Ok(())
}

/// `%% exec` — reserved for running code and capturing its output into the
/// document. Parses as a known tag, emits nothing.
fn exec(
    _ctx: &mut RenderContext<'_>,
    _args: &str,
    _span: Range<usize>,
) -> Result<(), DiagnosticError> {
    Ok(())
}

/// `%% div_line <args>` — authored form of the section divider. The first
/// argument token is dropped, matching the divider line shape where the
/// marker precedes the label.
fn div_line(
    ctx: &mut RenderContext<'_>,
    args: &str,
    _span: Range<usize>,
) -> Result<(), DiagnosticError> {
    let label = match args.split_once(char::is_whitespace) {
        Some((_, rest)) => rest.trim_start(),
        None => "",
    };
    write_divider(ctx, label)
}

/// Horizontal rule with a small right-floated label. Shared by the
/// assembler's divider branch and the `div_line` tag.
pub fn write_divider(ctx: &mut RenderContext<'_>, label: &str) -> Result<(), DiagnosticError> {
    writeln!(
        ctx.out,
        "<hr>\n<div style=\"float: right; font-size: 8px;\">{}</div>",
        label
    )?;
    Ok(())
}
