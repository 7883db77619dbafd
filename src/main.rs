//! `satie` command line: check, dump, and run soundscape scripts.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use satie::dsl::{Compiler, Diagnostic, ParseOutput};
use satie::playback::{AudioBackend, RecordingBackend, WavBackend};
use satie::session::{load_config, load_config_from, Session, SessionConfig};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "satie", version, about = "Generative soundscape scripts")]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse a script and print its diagnostics.
    Check(CheckArgs),
    /// Print the resolved statements of a script.
    Dump(DumpArgs),
    /// Play a script.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
struct CheckArgs {
    script: PathBuf,

    /// Reject unknown ease names.
    #[arg(long)]
    strict_easing: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Yaml,
    Json,
}

#[derive(Parser, Debug)]
struct DumpArgs {
    script: PathBuf,

    #[arg(long, value_enum, default_value_t = Format::Yaml)]
    format: Format,

    /// Seed for group multipliers.
    #[arg(long, default_value_t = 0)]
    seed: u64,
}

#[derive(Parser, Debug)]
struct RunArgs {
    script: PathBuf,

    /// Stop after this many seconds. Runs until Ctrl-C when absent.
    #[arg(long)]
    seconds: Option<f64>,

    /// Scheduler step in seconds. Defaults to the configured tick.
    #[arg(long)]
    step: Option<f64>,

    #[arg(long)]
    seed: Option<u64>,

    /// Sleep for each step so playback follows the wall clock.
    #[arg(long)]
    realtime: bool,

    /// Config file. Defaults to ~/.satie/config.yaml.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Record backend calls instead of opening clips, then print them.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.cmd {
        Command::Check(args) => cmd_check(args),
        Command::Dump(args) => cmd_dump(args),
        Command::Run(args) => cmd_run(args),
    };
    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_script(path: &Path) -> CliResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()).into())
}

fn print_diagnostics(path: &Path, diagnostics: &[Diagnostic]) {
    for diag in diagnostics {
        eprintln!("{}:{diag}", path.display());
    }
}

fn cmd_check(args: CheckArgs) -> CliResult<ExitCode> {
    let source = read_script(&args.script)?;
    let options = satie::dsl::ParseOptions {
        strict_easing: args.strict_easing,
    };
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let output = Compiler::compile(&source, options, &mut rng);
    print_diagnostics(&args.script, &output.diagnostics);
    println!(
        "{}: {} statement(s), {} diagnostic(s)",
        args.script.display(),
        output.statements.len(),
        output.diagnostics.len()
    );
    Ok(if output.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn cmd_dump(args: DumpArgs) -> CliResult<ExitCode> {
    let source = read_script(&args.script)?;
    let mut rng = ChaCha8Rng::seed_from_u64(args.seed);
    let output: ParseOutput = Compiler::compile(&source, Default::default(), &mut rng);
    print_diagnostics(&args.script, &output.diagnostics);
    let text = match args.format {
        Format::Yaml => serde_yaml::to_string(&output.statements)?,
        Format::Json => serde_json::to_string_pretty(&output.statements)?,
    };
    println!("{text}");
    Ok(ExitCode::SUCCESS)
}

fn cmd_run(args: RunArgs) -> CliResult<ExitCode> {
    let mut config: SessionConfig = match &args.config {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(step) = args.step {
        if !(step.is_finite() && step > 0.0) {
            return Err("--step must be positive".into());
        }
        config.tick_seconds = step;
    }
    if let Some(seconds) = args.seconds {
        if !(seconds.is_finite() && seconds >= 0.0) {
            return Err("--seconds must not be negative".into());
        }
    }

    let source = read_script(&args.script)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
        warn!("failed to install Ctrl-C handler: {e}");
    }

    let mut session = Session::new(config);
    session.load(&source);
    print_diagnostics(&args.script, session.diagnostics());

    if args.dry_run {
        let mut backend = RecordingBackend::new(session.config().default_clip_seconds);
        drive(&mut session, &mut backend, &args, &interrupted);
        for call in backend.lifecycle() {
            println!("{}", serde_json::to_string(call)?);
        }
    } else {
        let root = match session.config().clip_root.clone() {
            Some(root) => root,
            None => std::env::current_dir()?,
        };
        let mut backend = WavBackend::new(root);
        info!(root = %backend.root().display(), "clip root");
        drive(&mut session, &mut backend, &args, &interrupted);
    }
    Ok(ExitCode::SUCCESS)
}

/// Tick the session until time runs out, the scene goes quiet, or Ctrl-C.
fn drive(
    session: &mut Session,
    backend: &mut dyn AudioBackend,
    args: &RunArgs,
    interrupted: &AtomicBool,
) {
    let step = session.config().tick_seconds;
    let mut elapsed = 0.0;
    loop {
        if interrupted.load(Ordering::SeqCst) {
            info!("interrupted");
            break;
        }
        if session.scheduler().is_idle() {
            info!(elapsed, "nothing left to play");
            break;
        }
        let dt = match args.seconds {
            Some(limit) if elapsed + 1e-9 >= limit => break,
            Some(limit) => step.min(limit - elapsed),
            None => step,
        };
        session.tick(dt, backend);
        elapsed += dt;
        if args.realtime {
            thread::sleep(Duration::from_secs_f64(dt));
        }
    }
    session.hard_reset(backend);
}
