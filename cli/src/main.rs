mod test_runner;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};

use renderer::{DEFAULT_INCLUDE_CEILING, DiagnosticError, RenderOptions, Renderer};

const SUBCOMMANDS: &[&str] = &["build", "test", "help"];

#[derive(Parser)]
#[command(name = "labnote", version, about = "Compiles labnote working logs to HTML")]
struct Cli {
    /// Disable colored error output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a log file into an HTML document
    Build(BuildArgs),

    /// Run .test.ln test files
    Test(TestArgs),
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Log file to compile
    file: String,

    /// Output path (default: the input with its extension replaced by .html)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Parse only, don't render (exit 0 if valid)
    #[arg(long)]
    check: bool,

    /// Dump the classified line list instead of rendering
    #[arg(long)]
    dump: bool,

    /// Inclusive end index used when an include directive has no line range
    #[arg(long, default_value_t = DEFAULT_INCLUDE_CEILING)]
    max_include_lines: usize,
}

#[derive(clap::Args)]
struct TestArgs {
    /// Path to a .test.ln file or directory containing them
    path: String,

    /// Run only tests in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List available categories and exit
    #[arg(long)]
    list_categories: bool,
}

fn main() {
    // Backwards compatibility: if the first positional arg is not a known
    // subcommand, inject "build" so `labnote log.ln` works like
    // `labnote build log.ln`.
    let mut args: Vec<String> = std::env::args().collect();
    if let Some(first_pos) = args.iter().skip(1).find(|a| !a.starts_with('-')) {
        let first_pos = first_pos.clone();
        if !SUBCOMMANDS.contains(&first_pos.as_str()) {
            let pos = args.iter().position(|a| *a == first_pos).unwrap();
            args.insert(pos, "build".to_string());
        }
    }

    let cli = Cli::parse_from(&args);

    match cli.command {
        Command::Build(build_args) => do_build(build_args, cli.no_color),
        Command::Test(test_args) => {
            let path = Path::new(&test_args.path);
            if test_args.list_categories {
                test_runner::list_categories(path);
                return;
            }
            let exit_code = test_runner::run_tests(path, cli.no_color, &test_args.category);
            process::exit(exit_code);
        }
    }
}

fn do_build(args: BuildArgs, no_color: bool) {
    let color_choice = if no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    // Read source
    let source = match std::fs::read_to_string(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    // Set up codespan file database
    let mut files = SimpleFiles::new();
    let file_id = files.add(args.file.clone(), source.clone());

    // Parse
    let parser = labnote::parser::Parser::new(source, file_id);
    let notebook = match parser.parse() {
        Ok(n) => n,
        Err(errors) => {
            let writer = StandardStream::stderr(color_choice);
            let config = term::Config::default();
            for error in &errors {
                let diagnostic = error.to_diagnostic();
                let _ =
                    term::emit_to_write_style(&mut writer.lock(), &config, &files, &diagnostic);
            }
            process::exit(1);
        }
    };

    // --check: parse succeeded, exit
    if args.check {
        eprintln!("ok: {} parsed successfully", args.file);
        return;
    }

    // --dump: print the classified line list
    if args.dump {
        println!("{:#?}", notebook);
        return;
    }

    // Include paths resolve against the log file's directory
    let base_dir = Path::new(&args.file)
        .parent()
        .map(|p| p.to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."));

    let output_path = args
        .output
        .unwrap_or_else(|| derive_output_path(&args.file));

    let renderer = Renderer::new(RenderOptions {
        max_include_lines: args.max_include_lines,
        base_dir,
    });

    let out_file = match File::create(&output_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: cannot write '{}': {}", output_path.display(), e);
            process::exit(1);
        }
    };
    let mut out = BufWriter::new(out_file);

    let result = renderer.render(&notebook, &mut out);

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    match result {
        Ok(warnings) => {
            if let Err(e) = out.flush() {
                eprintln!("error: cannot write '{}': {}", output_path.display(), e);
                process::exit(1);
            }
            emit_diagnostics(&writer, &config, &files, &warnings);
        }
        Err(error) => {
            emit_diagnostic_error(&writer, &config, &files, &error);
            process::exit(1);
        }
    }
}

/// Output path: the input with everything from the file name's first `.`
/// onward replaced by `.html`. Dots in parent directories are left alone.
fn derive_output_path(input: &str) -> PathBuf {
    let path = Path::new(input);
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or(input);
    let stem = name.split('.').next().unwrap_or(name);
    path.with_file_name(format!("{}.html", stem))
}

fn emit_diagnostic_error(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    error: &DiagnosticError,
) {
    if let Some(span) = &error.span {
        let severity = if error.is_warning {
            Severity::Warning
        } else {
            Severity::Error
        };
        let diagnostic = Diagnostic::new(severity)
            .with_message(error.to_string())
            .with_labels(vec![Label::primary(error.source_id, span.clone())]);
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
    } else {
        let prefix = if error.is_warning {
            "warning"
        } else {
            "render error"
        };
        eprintln!("{}: {}", prefix, error);
    }
}

fn emit_diagnostics(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostics: &[DiagnosticError],
) {
    for diag in diagnostics {
        emit_diagnostic_error(writer, config, files, diag);
    }
}
