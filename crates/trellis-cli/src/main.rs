use serde_json::Value;
use std::io::Read;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use trellis::Graph;
use trellis::paper::{HeadlessError, PaperOptions, Sorting, render_graph_svg};

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Json(serde_json::Error),
    Model(trellis::Error),
    Render(HeadlessError),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::Model(err) => write!(f, "{err}"),
            CliError::Render(err) => write!(f, "{err}"),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<trellis::Error> for CliError {
    fn from(value: trellis::Error) -> Self {
        Self::Model(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::Render(value)
    }
}

impl From<trellis::paper::Error> for CliError {
    fn from(value: trellis::paper::Error) -> Self {
        Self::Render(value.into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Render,
    Normalize,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    out: Option<String>,
    options: Option<String>,
    sorting: Option<Sorting>,
    connector: Option<String>,
    grid: Option<f64>,
    pretty: bool,
    verbose: bool,
}

fn usage() -> &'static str {
    "trellis-cli\n\
\n\
USAGE:\n\
  trellis-cli [render] [--sorting exact|approx|none] [--options <path>] [--connector <name>] [--grid <size>] [--out <path>] [--verbose] [<path>|-]\n\
  trellis-cli normalize [--pretty] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', the graph JSON ({\"cells\": [...]}) is read from stdin.\n\
  - --options reads paper options as JSON; the other flags override it.\n\
  - --grid sets the grid size and draws the grid.\n\
  - normalize prints the graph after loading: generated ids, default types and z values.\n\
  - Diagnostics go to stderr; RUST_LOG overrides the log filter.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "render" => args.command = Command::Render,
            "normalize" => args.command = Command::Normalize,
            "--pretty" => args.pretty = true,
            "--verbose" | "-v" => args.verbose = true,
            "--sorting" => {
                let Some(mode) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.sorting = Some(
                    mode.parse::<Sorting>()
                        .map_err(|_| CliError::Usage(usage()))?,
                );
            }
            "--options" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.options = Some(path.clone());
            }
            "--connector" => {
                let Some(name) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.connector = Some(name.clone());
            }
            "--grid" => {
                let Some(size) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let size = size.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !(size.is_finite() && size > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
                args.grid = Some(size);
            }
            "--out" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(out.clone());
            }
            "--" => {
                if let Some(rest) = it.next() {
                    if args.input.is_some() {
                        return Err(CliError::Usage(usage()));
                    }
                    args.input = Some(rest.clone());
                }
                if it.next().is_some() {
                    return Err(CliError::Usage(usage()));
                }
            }
            "-" => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some("-".to_string());
            }
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(path.to_string());
            }
        }
    }

    Ok(args)
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

fn read_input(input: Option<&str>) -> Result<String, CliError> {
    match input {
        None | Some("-") => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
        Some(path) => Ok(std::fs::read_to_string(path)?),
    }
}

fn write_text(text: &str, out: Option<&str>) -> Result<(), CliError> {
    match out {
        None => {
            print!("{text}");
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            info!(path, bytes = text.len(), "wrote output");
            Ok(())
        }
    }
}

fn paper_options(args: &Args) -> Result<PaperOptions, CliError> {
    let mut options = match args.options.as_deref() {
        Some(path) => PaperOptions::from_json_str(&std::fs::read_to_string(path)?)?,
        None => PaperOptions::default(),
    };
    if let Some(sorting) = args.sorting {
        options = options.with_sorting(sorting);
    }
    if let Some(name) = args.connector.as_deref() {
        options = options.with_default_connector(name, Value::Object(Default::default()));
    }
    if let Some(size) = args.grid {
        options.grid_size = size;
        options.draw_grid = true;
    }
    options.validate()?;
    Ok(options)
}

fn run(args: Args) -> Result<(), CliError> {
    let text = read_input(args.input.as_deref())?;
    let mut graph = Graph::from_json_str(&text)?;
    debug!(cells = graph.len(), "loaded graph");

    match args.command {
        Command::Normalize => {
            let json = graph.to_json();
            let mut text = if args.pretty {
                serde_json::to_string_pretty(&json)?
            } else {
                serde_json::to_string(&json)?
            };
            text.push('\n');
            write_text(&text, args.out.as_deref())
        }
        Command::Render => {
            let options = paper_options(&args)?;
            debug!(sorting = %options.sorting, "rendering");
            let svg = render_graph_svg(&mut graph, options)?;
            write_text(&svg, args.out.as_deref())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };

    init_tracing(args.verbose);

    if let Err(err) = run(args) {
        eprintln!("{err}");
        std::process::exit(1);
    }
}
