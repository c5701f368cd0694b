use std::io::Write;
use std::path::Path;

use labnote::Notebook;
use labnote::line::{Category, classify};
use renderer::highlight::Language;
use renderer::include::IncludeSpec;
use renderer::assembler::{FOOTER, HEADER};
use renderer::{DiagnosticError, RenderOptions, Renderer};

fn parse(source: &str) -> Notebook {
    labnote::parser::Parser::new(source.to_string(), 0)
        .parse()
        .expect("parse failed")
}

fn render(source: &str) -> String {
    let mut output = Vec::new();
    renderer::render_notebook(&parse(source), &mut output).expect("render failed");
    String::from_utf8(output).unwrap()
}

/// Rendered document with the fixed header and footer stripped.
fn body(source: &str) -> String {
    let html = render(source);
    let html = html.strip_prefix(HEADER).expect("missing header");
    let html = html.strip_suffix(FOOTER).expect("missing footer");
    html.to_string()
}

fn render_err(source: &str) -> DiagnosticError {
    let mut output = Vec::new();
    renderer::render_notebook(&parse(source), &mut output).expect_err("expected render failure")
}

fn render_in(dir: &Path, source: &str) -> Result<(String, Vec<DiagnosticError>), DiagnosticError> {
    render_with(
        RenderOptions {
            base_dir: dir.to_path_buf(),
            ..RenderOptions::default()
        },
        source,
    )
}

fn render_with(
    options: RenderOptions,
    source: &str,
) -> Result<(String, Vec<DiagnosticError>), DiagnosticError> {
    let mut output = Vec::new();
    let warnings = Renderer::new(options).render(&parse(source), &mut output)?;
    Ok((String::from_utf8(output).unwrap(), warnings))
}

/// Write a file with `count` lines "line0".."line<count-1>" into `dir`.
fn write_numbered(dir: &Path, name: &str, prefix: &str, count: usize) {
    let mut file = std::fs::File::create(dir.join(name)).unwrap();
    for i in 0..count {
        writeln!(file, "{}{}", prefix, i).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Classifier
// ---------------------------------------------------------------------------

#[test]
fn classify_by_prefix() {
    assert_eq!(classify(""), Category::Blank);
    assert_eq!(classify("   "), Category::Blank);
    assert_eq!(classify("/* note to self */"), Category::Comment);
    assert_eq!(classify("== Day 1"), Category::Divider);
    assert_eq!(classify("%% bold hello"), Category::Directive);
    assert_eq!(classify("just some prose"), Category::Text);
}

#[test]
fn classify_divider_marker_followed_by_tag_marker_is_text() {
    assert_eq!(classify("==%% odd"), Category::Text);
}

#[test]
fn classify_is_stateless() {
    let line = "%% img shot.png";
    assert_eq!(classify(line), classify(line));
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

#[test]
fn directive_without_tag_name_is_a_parse_error() {
    let result = labnote::parser::Parser::new("%%".to_string(), 0).parse();
    let errors = result.expect_err("expected parse failure");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("missing a tag name"));
}

#[test]
fn directive_args_preserve_interior_whitespace() {
    assert_eq!(body("%% bold a  b"), "<b>a  b</b><br>\n");
}

// ---------------------------------------------------------------------------
// Line rendering
// ---------------------------------------------------------------------------

#[test]
fn plain_text_lines_kept_in_order() {
    assert_eq!(body("first\nsecond"), "first<br>\nsecond<br>\n");
}

#[test]
fn blank_line_becomes_break() {
    assert_eq!(body("a\n\nb"), "a<br>\n<br>\nb<br>\n");
}

#[test]
fn comment_line_is_discarded() {
    assert_eq!(body("/* private */\nvisible"), "visible<br>\n");
}

#[test]
fn divider_renders_rule_and_label() {
    assert_eq!(
        body("== Day 1"),
        "<hr>\n<div style=\"float: right; font-size: 8px;\">Day 1</div>\n"
    );
}

#[test]
fn bare_divider_renders_empty_label() {
    assert_eq!(
        body("=="),
        "<hr>\n<div style=\"float: right; font-size: 8px;\"></div>\n"
    );
}

#[test]
fn tag_names_are_case_insensitive() {
    let lower = body("%% img a.png");
    assert_eq!(body("%% IMG a.png"), lower);
    assert_eq!(body("%% Img a.png"), lower);
}

#[test]
fn unknown_tag_is_skipped_without_error() {
    assert_eq!(body("%% foobar x"), "");
}

#[test]
fn bold_wraps_argument() {
    assert_eq!(body("%% bold hello world"), "<b>hello world</b><br>\n");
}

#[test]
fn image_strips_optional_brackets() {
    assert_eq!(
        body("%% img [plot.png]"),
        "<div style=\"text-align: center; width: 100%\"><img src=\"plot.png\"></div>\n"
    );
}

#[test]
fn image_plain_path() {
    assert_eq!(
        body("%% img figures/plot.png"),
        "<div style=\"text-align: center; width: 100%\"><img src=\"figures/plot.png\"></div>\n"
    );
}

#[test]
fn link_strips_percent_and_splits_title_url() {
    assert_eq!(
        body("%% link mytitle https://example.com/%foo"),
        "<a href=\"https://example.com/foo\" target=\"_blank\">mytitle</a><br>\n"
    );
}

#[test]
fn link_with_three_tokens_fails() {
    let err = render_err("%% link my title https://example.com");
    assert!(err.to_string().contains("link expects"), "got: {}", err);
    assert!(err.span.is_some());
}

#[test]
fn code_line_is_highlighted_inline() {
    let html = body("%% code import numpy as np");
    assert!(html.starts_with("<div style=\"padding-left: 50px; padding-right: 50px; width: 80%\">"));
    assert!(html.contains("<pre"), "got: {}", html);
    assert!(html.contains("style="), "expected inline styles, got: {}", html);
    assert!(html.trim_end().ends_with("</div>"));
}

#[test]
fn exec_tag_emits_nothing() {
    assert_eq!(body("%% exec ./train.sh"), "");
}

#[test]
fn div_line_tag_drops_first_argument_token() {
    assert_eq!(
        body("%% div_line x Day 2"),
        "<hr>\n<div style=\"float: right; font-size: 8px;\">Day 2</div>\n"
    );
}

#[test]
fn document_is_sandwiched_between_header_and_footer() {
    let html = render("== Day 1\n%% bold hello\n\nplain text");
    assert!(html.starts_with(HEADER));
    assert!(html.ends_with(FOOTER));

    let day = html.find("Day 1</div>").expect("divider fragment");
    let bold = html.find("<b>hello</b><br>").expect("bold fragment");
    let blank = html[bold..].find("<br>\n<br>").expect("blank break") + bold;
    let text = html.find("plain text<br>").expect("text fragment");
    assert!(day < bold && bold < blank && blank < text);
}

// ---------------------------------------------------------------------------
// File inclusion
// ---------------------------------------------------------------------------

#[test]
fn include_keeps_only_the_requested_range() {
    let dir = tempfile::tempdir().unwrap();
    write_numbered(dir.path(), "data.txt", "line", 10);

    let (html, warnings) = render_in(dir.path(), "%% incl data.txt:2-4").unwrap();
    assert!(warnings.is_empty());
    for kept in ["line2", "line3", "line4"] {
        assert!(html.contains(kept), "missing {}", kept);
    }
    for dropped in ["line1", "line5"] {
        assert!(!html.contains(dropped), "unexpected {}", dropped);
    }
    let at2 = html.find("line2").unwrap();
    let at4 = html.find("line4").unwrap();
    assert!(at2 < at4);
}

#[test]
fn include_empty_range_yields_empty_fragment_and_warning() {
    let dir = tempfile::tempdir().unwrap();
    write_numbered(dir.path(), "data.txt", "line", 10);

    let (html, warnings) = render_in(dir.path(), "%% incl data.txt:5-3").unwrap();
    assert!(!html.contains("line"));
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].is_warning);
    assert!(warnings[0].to_string().contains("selects no lines"));
}

#[test]
fn include_without_range_stops_at_the_default_ceiling() {
    let dir = tempfile::tempdir().unwrap();
    write_numbered(dir.path(), "big.txt", "row", 600);

    let (html, _) = render_in(dir.path(), "%% incl big.txt").unwrap();
    assert!(html.contains("row500"));
    assert!(!html.contains("row501"));
}

#[test]
fn include_ceiling_is_configurable() {
    let dir = tempfile::tempdir().unwrap();
    write_numbered(dir.path(), "data.txt", "row", 10);

    let options = RenderOptions {
        max_include_lines: 2,
        base_dir: dir.path().to_path_buf(),
    };
    let (html, _) = render_with(options, "%% incl data.txt").unwrap();
    assert!(html.contains("row2"));
    assert!(!html.contains("row3"));
}

#[test]
fn include_missing_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = render_in(dir.path(), "%% incl nope.txt").unwrap_err();
    assert!(err.to_string().contains("cannot read"), "got: {}", err);
}

#[test]
fn include_extensionless_path_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("LICENSE"), "MIT\n").unwrap();

    let err = render_in(dir.path(), "%% incl LICENSE").unwrap_err();
    assert!(err.to_string().contains("no file extension"), "got: {}", err);
}

#[test]
fn include_malformed_range_is_fatal() {
    let err = render_err("%% incl data.txt:a-b");
    assert!(err.to_string().contains("not a line number"), "got: {}", err);

    let err = render_err("%% incl data.txt:12");
    assert!(err.to_string().contains("<start>-<end>"), "got: {}", err);
}

#[test]
fn include_language_uses_last_extension_segment() {
    let spec = IncludeSpec::parse("tool.v2.py").unwrap();
    assert_eq!(spec.language().unwrap(), Language::Python);

    let spec = IncludeSpec::parse("notes.backup.txt").unwrap();
    assert_eq!(spec.language().unwrap(), Language::PlainText);
}

#[test]
fn include_range_parses_into_path_and_bounds() {
    let spec = IncludeSpec::parse("src/run.py:10-20").unwrap();
    assert_eq!(spec.path, "src/run.py");
    assert_eq!(spec.range, Some((10, 20)));

    let spec = IncludeSpec::parse("src/run.py").unwrap();
    assert_eq!(spec.range, None);
}
