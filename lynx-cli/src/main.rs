use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use lynx_core::export::export_snapshot;
use lynx_core::input::StepMoves;
use lynx_core::link::Location;
use lynx_core::{verify_solution, Levelset, Outcome, Session, SessionParams, SolutionFile};

#[derive(Parser)]
#[command(name = "lynx")]
#[command(about = "Chip's Challenge levels under the Lynx rules")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the levels in a `.dat` set.
    Info { set: PathBuf },
    /// Replay the solutions in a `.tws` file and report which levels complete.
    Verify {
        set: PathBuf,
        solutions: PathBuf,
        #[arg(long)]
        level: Option<u16>,
        #[arg(long)]
        params: Option<PathBuf>,
    },
    /// Play a move string, one step per letter (N, W, S, E, `.` to wait).
    Play {
        set: PathBuf,
        #[arg(long)]
        level: u16,
        #[arg(long)]
        moves: String,
        /// Undo this many ticks after the moves are played.
        #[arg(long, default_value_t = 0)]
        rewind: u32,
        #[arg(long)]
        params: Option<PathBuf>,
        #[arg(long)]
        export: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    init_tracing();
    match Cli::parse().command {
        Command::Info { set } => info_cmd(&set),
        Command::Verify {
            set,
            solutions,
            level,
            params,
        } => verify_cmd(&set, &solutions, level, params.as_deref()),
        Command::Play {
            set,
            level,
            moves,
            rewind,
            params,
            export,
        } => play_cmd(&set, level, &moves, rewind, params.as_deref(), export.as_deref()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_set(path: &Path) -> Result<Levelset> {
    Levelset::load(path).with_context(|| format!("loading level set {}", path.display()))
}

fn load_params(path: Option<&Path>) -> Result<SessionParams> {
    path.map_or_else(|| Ok(SessionParams::default()), SessionParams::load)
}

fn info_cmd(set: &Path) -> Result<ExitCode> {
    let levelset = load_set(set)?;
    println!("{} levels", levelset.levels.len());
    for level in &levelset.levels {
        let time = match level.time_limit {
            0 => "---".to_string(),
            t => t.to_string(),
        };
        println!(
            "{:>4}  {:<4}  time {:>4}  chips {:>3}  {}",
            level.number, level.password, time, level.chips_required, level.title
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn verify_cmd(
    set: &Path,
    solutions: &Path,
    only: Option<u16>,
    params: Option<&Path>,
) -> Result<ExitCode> {
    let levelset = load_set(set)?;
    let file = SolutionFile::load(solutions)
        .with_context(|| format!("loading solutions {}", solutions.display()))?;
    let params = load_params(params)?;
    if !file.set_name.is_empty() {
        info!(set = %file.set_name, solutions = file.solutions.len(), "loaded solutions");
    }

    let mut tried = 0u32;
    let mut passed = 0u32;
    for level in &levelset.levels {
        if only.is_some_and(|n| n != level.number) {
            continue;
        }
        let Some(solution) = file.for_level(level.number) else {
            println!("{:>4}  ----  no solution  {}", level.number, level.title);
            continue;
        };
        tried += 1;
        match verify_solution(level, solution, &params) {
            Ok(verdict) => {
                let mark = if verdict.completed { "ok  " } else { "FAIL" };
                if verdict.completed {
                    passed += 1;
                }
                println!(
                    "{:>4}  {mark}  {:>6} ticks  {}",
                    level.number, verdict.ticks, level.title
                );
            }
            Err(err) => {
                warn!(level = level.number, error = %err, "replay could not run");
                println!("{:>4}  FAIL  {err:#}", level.number);
            }
        }
    }

    if tried == 0 {
        bail!("no level had a solution to replay");
    }
    println!(
        "passed {passed} of {tried} ({:.1}%)",
        f64::from(passed) * 100.0 / f64::from(tried)
    );
    Ok(if passed == tried {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn play_cmd(
    set: &Path,
    number: u16,
    moves: &str,
    rewind: u32,
    params: Option<&Path>,
    export: Option<&Path>,
) -> Result<ExitCode> {
    let levelset = load_set(set)?;
    let level = levelset
        .level(usize::from(number))
        .with_context(|| format!("{} has no level {number}", set.display()))?;
    let Some(input) = StepMoves::parse(moves) else {
        bail!("moves may only contain N, W, S, E and '.'");
    };
    let ticks = input.ticks();
    let mut session = Session::start(level, Box::new(input), load_params(params)?);
    if session.state().is_invalid() {
        warn!(level = number, "level is invalid; this run proves nothing");
    }

    for _ in 0..ticks {
        let outcome = session.advance();
        let sounds = session.take_sounds();
        if !sounds.is_empty() {
            debug!(tick = session.state().tick, ?sounds, "sounds");
        }
        if outcome != Outcome::Playing {
            break;
        }
    }
    for _ in 0..rewind {
        if !session.rewind()? {
            warn!("rewind history exhausted");
            break;
        }
    }

    let state = session.state();
    let chip = state
        .chip()
        .map_or_else(|| "gone".to_string(), |c| Location::from_pos(c.pos).to_string());
    println!("level {} \"{}\" after {} ticks", state.level_number, state.title, state.tick);
    println!("chip at {chip}, {} chips still needed", state.chips_needed);
    if let Some(seconds) = state.time_left() {
        println!("{seconds} seconds left");
    }
    if let Some(reason) = state.end_reason {
        println!("{}", reason.message());
    }
    println!("checksum {}", state.checksum());
    println!(
        "rewind history: {} ticks in {} bytes",
        session.history_len(),
        session.history_bytes()
    );

    if let Some(dir) = export {
        export_snapshot(state, session.outcome(), dir)
            .with_context(|| format!("exporting to {}", dir.display()))?;
        info!(dir = %dir.display(), "exported snapshot");
    }
    Ok(ExitCode::SUCCESS)
}
