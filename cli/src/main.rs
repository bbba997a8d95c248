use std::error::Error;
use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use clap::{ArgAction, Parser};
use jcsv::{Document, ParseOptions, SerializeOptions};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jcsv", version, about = "JCSV multi-table reader and formatter")]
struct Args {
    /// Input file path. Omit or use '-' to read from stdin.
    input: Option<String>,

    /// Output file path (prints to stdout if omitted).
    #[arg(short, long, value_name = "file")]
    output: Option<String>,

    /// Regenerate a leading #manifest block with fresh start_line values.
    #[arg(long)]
    manifest: bool,

    /// Emit the JSON view instead of JCSV text.
    #[arg(long, conflicts_with_all = ["check", "list"])]
    json: bool,

    /// Inline referenced tables in the JSON view.
    #[arg(long, requires = "json")]
    expand: bool,

    /// JSON indentation (0 for compact output).
    #[arg(long, value_name = "number", default_value_t = 2)]
    indent: usize,

    /// Report every diagnostic and fail if there is any.
    #[arg(long, conflicts_with = "list")]
    check: bool,

    /// Print one `name<TAB>rows<TAB>columns` line per table.
    #[arg(long)]
    list: bool,

    /// Skip malformed blocks instead of failing.
    #[arg(long)]
    lenient: bool,

    /// Ignore the manifest index and scan for headers.
    #[arg(long = "no-index")]
    no_index: bool,

    /// Leave reference cells unresolved.
    #[arg(long)]
    raw: bool,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Format,
    Json,
    Check,
    List,
}

impl Mode {
    fn from_args(args: &Args) -> Self {
        if args.check {
            Mode::Check
        } else if args.list {
            Mode::List
        } else if args.json {
            Mode::Json
        } else {
            Mode::Format
        }
    }
}

#[derive(Debug)]
enum InputSource {
    Stdin,
    File(String),
}

impl InputSource {
    fn label(&self) -> String {
        match self {
            InputSource::Stdin => "stdin".to_string(),
            InputSource::File(path) => display_path(path),
        }
    }
}

fn main() {
    let args = Args::parse();
    init_tracing(args.verbose);
    if let Err(err) = run(&args) {
        eprintln!("ERROR  {err}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "error",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn run(args: &Args) -> Result<(), Box<dyn Error>> {
    let (input_text, input_source) = read_input(args.input.as_deref())?;
    let options = ParseOptions::new()
        .with_strict(!args.lenient)
        .with_manifest(!args.no_index)
        .with_resolve_refs(!args.raw);
    let document = jcsv::parse_with_options(&input_text, &options)?;
    tracing::debug!(
        tables = document.len(),
        diagnostics = document.errors().len(),
        "parsed {}",
        input_source.label()
    );

    let mode = Mode::from_args(args);
    if mode == Mode::Check {
        return run_check(&document, &input_source);
    }
    report_diagnostics(&document);

    let output_target = OutputTarget::from_arg(args.output.as_deref());
    let mut writer = output_target.open()?;
    emit(&mut *writer, &document, mode, args)?;
    drop(writer);
    if let OutputTarget::File(path) = &output_target {
        println!("✔ Wrote {} → {}", input_source.label(), display_path(path));
    }
    Ok(())
}

fn run_check(document: &Document, input_source: &InputSource) -> Result<(), Box<dyn Error>> {
    report_diagnostics(document);
    let count = document.errors().len();
    if count > 0 {
        return Err(format!("{count} problem(s) in {}", input_source.label()).into());
    }
    println!(
        "✔ {} is valid ({} tables)",
        input_source.label(),
        document.len()
    );
    Ok(())
}

fn report_diagnostics(document: &Document) {
    for error in document.errors() {
        eprintln!("WARN  {error}");
    }
}

fn read_input(input: Option<&str>) -> Result<(String, InputSource), Box<dyn Error>> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok((buf, InputSource::Stdin))
        }
        Some(path) => {
            let buf = fs::read_to_string(path)?;
            Ok((buf, InputSource::File(path.to_string())))
        }
    }
}

#[derive(Clone, Debug)]
enum OutputTarget {
    Stdout,
    File(String),
}

impl OutputTarget {
    fn from_arg(output: Option<&str>) -> Self {
        match output {
            Some(path) if path != "-" => OutputTarget::File(path.to_string()),
            _ => OutputTarget::Stdout,
        }
    }

    fn open(&self) -> io::Result<Box<dyn Write>> {
        match self {
            OutputTarget::Stdout => Ok(Box::new(io::stdout().lock())),
            OutputTarget::File(path) => Ok(Box::new(BufWriter::new(fs::File::create(path)?))),
        }
    }
}

/// Render the document in the selected mode.
fn emit(
    writer: &mut dyn Write,
    document: &Document,
    mode: Mode,
    args: &Args,
) -> Result<(), Box<dyn Error>> {
    match mode {
        Mode::Json => {
            let view = document.to_json(args.expand);
            if args.indent == 0 {
                serde_json::to_writer(&mut *writer, &view)?;
            } else {
                let indent = " ".repeat(args.indent);
                let formatter = PrettyFormatter::with_indent(indent.as_bytes());
                let mut serializer = serde_json::Serializer::with_formatter(&mut *writer, formatter);
                view.serialize(&mut serializer)?;
            }
            writeln!(writer)?;
        }
        Mode::List => {
            for table in document.tables() {
                writeln!(
                    writer,
                    "{}\t{}\t{}",
                    table.name(),
                    table.record_count(),
                    table.column_count()
                )?;
            }
        }
        Mode::Format | Mode::Check => {
            let options = SerializeOptions::new().with_manifest(args.manifest);
            jcsv::to_writer_with_options(&mut *writer, document, &options)?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// A path shown relative to the working directory when it lies below it.
fn display_path(path: &str) -> String {
    let path = Path::new(path);
    std::env::current_dir()
        .ok()
        .and_then(|cwd| path.strip_prefix(&cwd).ok().map(Path::to_path_buf))
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
