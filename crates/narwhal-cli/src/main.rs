use narwhal::{EngineEvent, Frame, LayoutConfig, RenderMode, Session};
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

const DEFAULT_LIMIT_MS: f64 = 30_000.0;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Engine(narwhal::Error),
    Json(serde_json::Error),
    NotRevealed(f64),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Engine(err) => write!(f, "{err}"),
            CliError::Json(err) => write!(f, "JSON error: {err}"),
            CliError::NotRevealed(ms) => {
                write!(f, "graph was not fully revealed within {ms} ms of simulated time")
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<narwhal::Error> for CliError {
    fn from(value: narwhal::Error) -> Self {
        Self::Engine(value)
    }
}

impl From<narwhal_core::Error> for CliError {
    fn from(value: narwhal_core::Error) -> Self {
        Self::Engine(value.into())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
enum Command {
    #[default]
    Layout,
    Timeline,
}

#[derive(Debug, Clone, Copy)]
struct RenderModeArg(RenderMode);

impl FromStr for RenderModeArg {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self(RenderMode::Standard)),
            "batch" => Ok(Self(RenderMode::Batch)),
            "sequential" => Ok(Self(RenderMode::Sequential)),
            _ => Err(()),
        }
    }
}

#[derive(Debug)]
struct Args {
    command: Command,
    input: Option<String>,
    config: Option<String>,
    render_mode: Option<RenderMode>,
    limit_ms: f64,
    pretty: bool,
    out: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            command: Command::Layout,
            input: None,
            config: None,
            render_mode: None,
            limit_ms: DEFAULT_LIMIT_MS,
            pretty: false,
            out: None,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LayoutOut<'a> {
    simulated_ms: f64,
    frame: &'a Frame,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimelineOut<'a> {
    simulated_ms: f64,
    events: &'a [EngineEvent],
}

fn usage() -> &'static str {
    "narwhal-cli\n\
\n\
USAGE:\n\
  narwhal-cli [layout] [--config <path>] [--render-mode standard|batch|sequential] [--limit-ms <ms>] [--pretty] [--out <path>] [<path>|-]\n\
  narwhal-cli timeline [--config <path>] [--render-mode standard|batch|sequential] [--limit-ms <ms>] [--pretty] [--out <path>] [<path>|-]\n\
\n\
NOTES:\n\
  - If <path> is omitted or '-', graph JSON is read from stdin.\n\
  - layout runs the graph until it is fully revealed and prints the final frame.\n\
  - timeline prints the lifecycle events with their simulated timestamps.\n\
  - --config is a JSON object merged onto the default layout configuration.\n\
  - Set RUST_LOG (e.g. RUST_LOG=narwhal=debug) for diagnostics on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args::default();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "layout" => args.command = Command::Layout,
            "timeline" => args.command = Command::Timeline,
            "--pretty" => args.pretty = true,
            "--config" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.config = Some(path.clone());
            }
            "--render-mode" => {
                let Some(mode) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                let RenderModeArg(mode) = mode.parse().map_err(|_| CliError::Usage(usage()))?;
                args.render_mode = Some(mode);
            }
            "--limit-ms" => {
                let Some(ms) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.limit_ms = ms.parse::<f64>().map_err(|_| CliError::Usage(usage()))?;
                if !(args.limit_ms.is_finite() && args.limit_ms > 0.0) {
                    return Err(CliError::Usage(usage()));
                }
            }
            "--out" => {
                let Some(path) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.out = Some(path.clone());
            }
            other if other.starts_with("--") => return Err(CliError::Usage(usage())),
            other => {
                if args.input.is_some() {
                    return Err(CliError::Usage(usage()));
                }
                args.input = Some(other.to_string());
            }
        }
    }

    Ok(args)
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

fn write_json(value: &impl Serialize, pretty: bool, out: Option<&str>) -> Result<(), CliError> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    match out {
        None => println!("{text}"),
        Some(path) => std::fs::write(path, text)?,
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<LayoutConfig, CliError> {
    let mut config = match args.config.as_deref() {
        None => LayoutConfig::default(),
        Some(path) => {
            let overrides: Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            LayoutConfig::from_value(&overrides)?
        }
    };
    if let Some(mode) = args.render_mode {
        config.render_mode = mode;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), CliError> {
    let config = load_config(&args)?;
    let text = read_input(args.input.as_deref())?;

    let mut session = Session::new(config);
    session.load_json(&text)?;
    let revealed = session.run_until_revealed(args.limit_ms);
    tracing::info!(
        target: "narwhal::cli",
        revealed,
        simulated_ms = session.now(),
        events = session.events().len(),
        "run.finished"
    );

    match args.command {
        Command::Layout => {
            if !revealed {
                return Err(CliError::NotRevealed(args.limit_ms));
            }
            let frame = session.frame();
            write_json(
                &LayoutOut {
                    simulated_ms: session.now(),
                    frame: &frame,
                },
                args.pretty,
                args.out.as_deref(),
            )
        }
        Command::Timeline => write_json(
            &TimelineOut {
                simulated_ms: session.now(),
                events: session.events(),
            },
            args.pretty,
            args.out.as_deref(),
        ),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

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

    match run(args) {
        Ok(()) => {}
        Err(err @ CliError::NotRevealed(_)) => {
            eprintln!("{err}");
            std::process::exit(3);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
