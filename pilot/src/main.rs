//! `pilot` CLI: swarm message tooling, goal compilation and scenario runs.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;

use pilot::core::goal::Goal;
use pilot::exit_codes;
use pilot::io::config::{AutomationConfig, DEFAULT_CONFIG_FILE, load_config, write_config};
use pilot::io::scenario::ScenarioFile;
use pilot::io::status_store::write_status;
use pilot::logging;
use pilot::simulate::run_scenario;
use pilot::swarm::inbox::TOKEN_WRAPPER_PREFIX;
use pilot::swarm::{action_to_command, protocol};

#[derive(Parser)]
#[command(
    name = "pilot",
    version,
    about = "Tick-driven automation orchestrator and swarm protocol tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a swarm message for an action.
    Encode {
        /// Wrap the message as `swarm|TOKEN|payload`.
        #[arg(long)]
        token: Option<String>,
        #[command(subcommand)]
        action: EncodeAction,
    },
    /// Decode a swarm message and print the action as JSON.
    Decode { text: String },
    /// Compile a goal (JSON, `kind`-tagged) and print its task list.
    Compile { goal_json: String },
    /// Manage the automation config file.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Run a scenario file against the scripted planner and world.
    Simulate {
        scenario: PathBuf,
        /// Also write the final status snapshot to this path.
        #[arg(long)]
        status_out: Option<PathBuf>,
        /// Print one status line per tick to stderr.
        #[arg(long)]
        trace: bool,
    },
}

#[derive(Subcommand)]
enum EncodeAction {
    #[command(allow_negative_numbers = true)]
    Goto {
        x: i32,
        y: i32,
        z: i32,
        #[arg(long)]
        ignore_y: bool,
    },
    Mine {
        #[arg(required = true)]
        blocks: Vec<String>,
    },
    Stop,
    Pause,
    Resume,
    Recover,
    SafeMode {
        #[arg(action = ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write the default config.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
    /// Print the effective config (defaults filled in).
    Show {
        #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Encode { token, action } => cmd_encode(token.as_deref(), action),
        Command::Decode { text } => Ok(cmd_decode(&text)),
        Command::Compile { goal_json } => cmd_compile(&goal_json),
        Command::Config { action } => match action {
            ConfigAction::Init { force, path } => cmd_config_init(&path, force),
            ConfigAction::Show { path } => cmd_config_show(&path),
        },
        Command::Simulate {
            scenario,
            status_out,
            trace,
        } => cmd_simulate(&scenario, status_out.as_deref(), trace),
    }
}

fn cmd_encode(token: Option<&str>, action: EncodeAction) -> Result<i32> {
    let message = match action {
        EncodeAction::Goto { x, y, z, ignore_y } => protocol::go_to(x, y, z, ignore_y)?,
        EncodeAction::Mine { blocks } => protocol::mine(blocks.as_slice())?,
        EncodeAction::Stop => protocol::stop()?,
        EncodeAction::Pause => protocol::pause()?,
        EncodeAction::Resume => protocol::resume()?,
        EncodeAction::Recover => protocol::recover()?,
        EncodeAction::SafeMode { enabled } => protocol::safe_mode(enabled)?,
    };
    match token {
        Some(token) if token.contains('|') || token.trim().is_empty() => {
            bail!("--token must be non-empty and must not contain '|'")
        }
        Some(token) => println!("{TOKEN_WRAPPER_PREFIX}{token}|{message}"),
        None => println!("{message}"),
    }
    Ok(exit_codes::OK)
}

fn cmd_decode(text: &str) -> i32 {
    let decoded = protocol::try_decode(text).and_then(|action| {
        action_to_command(&action)?;
        Ok(action)
    });
    match decoded {
        Ok(action) => match serde_json::to_string_pretty(&action) {
            Ok(json) => {
                println!("{json}");
                exit_codes::OK
            }
            Err(err) => {
                eprintln!("serialize action: {err}");
                exit_codes::INVALID
            }
        },
        Err(err) => {
            eprintln!("malformed swarm message: {err}");
            exit_codes::MALFORMED
        }
    }
}

#[derive(Serialize)]
struct CompiledGoal {
    name: &'static str,
    explain: String,
    tasks: Vec<CompiledTask>,
}

#[derive(Serialize)]
struct CompiledTask {
    name: &'static str,
    instant: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

fn cmd_compile(goal_json: &str) -> Result<i32> {
    let goal: Goal = serde_json::from_str(goal_json).context("parse goal json")?;
    let tasks = goal.compile();
    let compiled = CompiledGoal {
        name: goal.name(),
        explain: goal.explain(),
        tasks: tasks
            .iter()
            .map(|task| CompiledTask {
                name: task.name(),
                instant: task.is_instant(),
                detail: task.detail(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&compiled).context("serialize compiled goal")?
    );
    Ok(exit_codes::OK)
}

fn cmd_config_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &AutomationConfig::default())?;
    println!("{}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_config_show(path: &Path) -> Result<i32> {
    let cfg = load_config(path)?;
    print!("{}", toml::to_string_pretty(&cfg).context("serialize config toml")?);
    Ok(exit_codes::OK)
}

fn cmd_simulate(scenario_path: &Path, status_out: Option<&Path>, trace: bool) -> Result<i32> {
    let scenario = ScenarioFile::load(scenario_path)?;
    let report = run_scenario(&scenario, |status, events| {
        if trace {
            eprintln!("{}", status.summary());
            for event in events {
                eprintln!("  {event:?}");
            }
        }
    });
    if let Some(path) = status_out {
        write_status(path, &report.status)
            .with_context(|| format!("write status {}", path.display()))?;
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("serialize simulation report")?
    );
    if report.passed() {
        Ok(exit_codes::OK)
    } else {
        for mismatch in &report.mismatches {
            eprintln!("{}: {mismatch}", report.scenario_id);
        }
        Ok(exit_codes::FAILED)
    }
}
