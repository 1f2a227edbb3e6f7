//! nestcanvas - inspect a canvas snapshot from the command line

use clap::{Parser, Subcommand};
use nestcanvas::canvas::CanvasSession;
use nestcanvas::config::loader;
use nestcanvas::model::{Millis, PersistedEntry, Viewport};
use nestcanvas::report;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Time far enough ahead that every animation and lock has finished.
const SETTLED: Millis = Millis::new(60_000);

#[derive(Parser, Debug)]
#[command(name = "nestcanvas")]
#[command(version)]
#[command(about = "Inspect and lay out a nested canvas snapshot")]
struct Args {
    /// JSON array of persisted entries
    snapshot: PathBuf,

    /// Path to config file (defaults to ~/.config/nestcanvas/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Override the save debounce window in milliseconds
    #[arg(long, value_name = "MS")]
    debounce_ms: Option<u64>,

    /// Override the log file location
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Command {
    /// Print the entry tree with the slug each entry gets in URLs
    Tree,
    /// Print the camera that frames the top level
    Fit {
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
        #[arg(long, default_value_t = 800.0)]
        height: f64,
    },
    /// Plan hub alignment for the top level and print the moves
    Layout {
        /// Seed for the layout jitter
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 1280.0)]
        width: f64,
        #[arg(long, default_value_t = 800.0)]
        height: f64,
    },
    /// Resolve a slug path such as `/travel-plans/budget`
    Path { path: String },
}

fn read_snapshot(path: &Path) -> Result<Vec<PersistedEntry>, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = loader::resolve(args.config.clone(), args.debounce_ms, args.log_file.clone())?;
    nestcanvas::logging::init_from_config(&config)?;
    info!(config = ?config, "Configuration loaded and resolved");

    let records = read_snapshot(&args.snapshot)?;
    info!(count = records.len(), path = %args.snapshot.display(), "Snapshot read");

    let mut settings = config.session_settings();
    let viewport = match args.command {
        Command::Fit { width, height } => Viewport::new(width, height),
        Command::Layout {
            seed,
            width,
            height,
        } => {
            settings.seed = Some(seed);
            Viewport::new(width, height)
        }
        _ => Viewport::new(1280.0, 800.0),
    };

    let mut session = CanvasSession::new(settings, viewport);
    for warning in session.load(records) {
        let line = report::render_warning(&warning);
        warn!("{line}");
        eprintln!("warning: {line}");
    }

    match &args.command {
        Command::Tree => print!("{}", report::render_tree(session.store())),
        Command::Fit { .. } => {
            session.fit_to_content(Millis::ZERO);
            session.tick(SETTLED);
            println!("{}", report::render_camera(session.camera()));
        }
        Command::Layout { .. } => {
            session.fit_to_content(Millis::ZERO);
            session.tick(SETTLED);
            let plan = session.auto_layout(SETTLED)?;
            print!("{}", report::render_plan(&plan));
        }
        Command::Path { path } => {
            session.navigate_to_path(path, Millis::ZERO)?;
            println!(
                "{}",
                report::render_stack(session.store(), session.navigation().stack())
            );
            println!("{}", session.url_path());
        }
    }

    Ok(())
}
