//! Logiloop CLI
//!
//! A headless driver for the conveyor loop engine: an interactive text mode
//! reading commands from stdin, and a scripted demo that checks determinism.

mod view;

use clap::{Parser, Subcommand};
use logiloop_core::command::{Command, CommandOutcome};
use logiloop_core::config::LoopConfig;
use logiloop_core::data_loader::load_config;
use logiloop_core::engine::LoopEngine;
use logiloop_core::id::NodeId;
use logiloop_core::node::{GraphNode, NodeType};
use logiloop_core::presenter::Presenter;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;
use view::{TextView, describe_row};

/// Demo contents handed out in rotation.
const DEMO_CONTENTS: &[&str] = &["Apples", "Pears", "Bread", "Milk", "Cheese", "Coffee"];

#[derive(Parser)]
#[command(name = "logiloop")]
#[command(about = "Discrete-step simulation of a closed conveyor loop")]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read commands from stdin and print every change
    Run {
        /// Layout config (.ron, .toml or .json); defaults to the basic loop
        #[arg(short, long)]
        layout: Option<PathBuf>,
    },

    /// Run a scripted retrieve/commission cycle twice and compare results
    Demo {
        /// Number of ticks to simulate
        #[arg(short, long, default_value = "40")]
        ticks: u64,

        /// Layout config (.ron, .toml or .json); defaults to the basic loop
        #[arg(short, long)]
        layout: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run { layout } => {
            let engine = build_engine(layout.as_deref())?;
            run_interactive(engine, std::io::stdin().lock())
        }
        Commands::Demo { ticks, layout } => {
            let config = load_or_default(layout.as_deref())?;
            let first = run_demo(&config, ticks, true)?;
            let second = run_demo(&config, ticks, false)?;
            println!("state hash: {first:#018x}");
            if first != second {
                return Err(format!("replay diverged: {first:#018x} != {second:#018x}").into());
            }
            println!("replay matches");
            Ok(())
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

fn load_or_default(path: Option<&Path>) -> Result<LoopConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "loading layout");
            Ok(load_config(path)?)
        }
        None => Ok(LoopConfig::default()),
    }
}

fn build_engine(path: Option<&Path>) -> Result<LoopEngine, Box<dyn std::error::Error>> {
    let config = load_or_default(path)?;
    Ok(LoopEngine::from_config(&config)?)
}

/// First node of the given type, in id order.
fn first_of(engine: &LoopEngine, node_type: NodeType) -> Option<NodeId> {
    engine
        .nodes()
        .iter()
        .find(|n| n.node_type() == node_type)
        .map(GraphNode::id)
}

// ===========================================================================
// Interactive mode
// ===========================================================================

/// One line of interactive input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Step(u32),
    Retrieve(Option<String>),
    Commission,
    Show,
    Table,
    Help,
    Quit,
}

const HELP: &str = "commands: step [n] | retrieve [content] | commission | show | table | help | quit";

fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();
    let input = match verb {
        "step" | "s" => match rest.as_slice() {
            [] => Input::Step(1),
            [n] => Input::Step(n.parse().map_err(|_| format!("not a tick count: {n}"))?),
            _ => return Err("usage: step [n]".into()),
        },
        "retrieve" | "r" => Input::Retrieve((!rest.is_empty()).then(|| rest.join(" "))),
        "commission" | "c" => Input::Commission,
        "show" => Input::Show,
        "table" | "t" => Input::Table,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => return Err(format!("unknown command: {other}")),
    };
    Ok(Some(input))
}

fn run_interactive(
    engine: LoopEngine,
    input: impl BufRead,
) -> Result<(), Box<dyn std::error::Error>> {
    let retrieval = first_of(&engine, NodeType::Retrieval);
    let commissioning = first_of(&engine, NodeType::Commissioning);
    let mut presenter = Presenter::new(engine, TextView::new(std::io::stdout()));
    let mut next_content = 0usize;

    println!("{HELP}");
    for line in input.lines() {
        let parsed = match parse_line(&line?) {
            Ok(Some(parsed)) => parsed,
            Ok(None) => continue,
            Err(message) => {
                println!("{message}");
                continue;
            }
        };

        let commands: Vec<Command> = match parsed {
            Input::Step(n) => (0..n).map(|_| Command::Step).collect(),
            Input::Retrieve(content) => {
                let Some(node) = retrieval else {
                    println!("layout has no retrieval node");
                    continue;
                };
                let content = content.unwrap_or_else(|| {
                    let c = DEMO_CONTENTS[next_content % DEMO_CONTENTS.len()];
                    next_content += 1;
                    c.to_string()
                });
                vec![Command::retrieve(node, content)]
            }
            Input::Commission => match commissioning {
                Some(node) => vec![Command::Commission { node }],
                None => continue,
            },
            Input::Show => {
                for node in presenter.engine().view_nodes() {
                    println!("{}", view::describe(&node));
                }
                continue;
            }
            Input::Table => {
                for row in presenter.container_table() {
                    println!("{}", describe_row(&row));
                }
                continue;
            }
            Input::Help => {
                println!("{HELP}");
                continue;
            }
            Input::Quit => break,
        };

        for command in commands {
            match presenter.receive_input(command) {
                Ok(CommandOutcome::Stepped(report)) => println!(
                    "tick {}: {} moved, {} stored, {} entered",
                    report.tick, report.moved, report.stored, report.retrieved_into_loop
                ),
                Ok(CommandOutcome::Retrieved(tun)) => println!("retrieved {tun}"),
                Ok(CommandOutcome::Commissioned) => {}
                // Already shown by the view.
                Err(_) => break,
            }
        }
    }

    info!(
        tick = presenter.engine().tick(),
        hash = presenter.engine().state_hash(),
        "session finished"
    );
    Ok(())
}

// ===========================================================================
// Demo
// ===========================================================================

/// Retrieve whenever the spur is free, commission whenever the station is
/// busy, and step. Returns the final state hash.
fn run_demo(config: &LoopConfig, ticks: u64, print: bool) -> Result<u64, Box<dyn std::error::Error>> {
    let mut engine = LoopEngine::from_config(config)?;
    let retrieval = first_of(&engine, NodeType::Retrieval);
    let commissioning = first_of(&engine, NodeType::Commissioning);

    for tick in 0..ticks {
        if let Some(node) = retrieval.filter(|&n| engine.node(n).is_some_and(GraphNode::is_empty)) {
            let content = DEMO_CONTENTS[tick as usize % DEMO_CONTENTS.len()];
            engine.retrieve_container(node, content)?;
        }
        if let Some(node) = commissioning {
            // A blocked station just waits for the next tick.
            if let Err(e) = engine.commission_container(node) {
                tracing::debug!(error = %e, "commission deferred");
            }
        }
        let report = engine.step()?;

        if print {
            let occupied: Vec<String> = engine
                .nodes()
                .iter()
                .filter_map(|n| n.container().map(|c| format!("{}={}", n.id(), c.transport_unit())))
                .collect();
            println!("tick {:>3}: {}", report.tick, occupied.join(" "));
        }
    }

    let events = engine.events();
    info!(
        ticks,
        events = events.total_written(),
        dropped = events.dropped_count(),
        "demo finished"
    );
    Ok(engine.state_hash())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_commands() {
        assert_eq!(parse_line("step"), Ok(Some(Input::Step(1))));
        assert_eq!(parse_line("  step 5 "), Ok(Some(Input::Step(5))));
        assert_eq!(parse_line("retrieve"), Ok(Some(Input::Retrieve(None))));
        assert_eq!(
            parse_line("r green apples"),
            Ok(Some(Input::Retrieve(Some("green apples".into()))))
        );
        assert_eq!(parse_line("c"), Ok(Some(Input::Commission)));
        assert_eq!(parse_line("quit"), Ok(Some(Input::Quit)));
        assert_eq!(parse_line(""), Ok(None));
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(parse_line("step many").is_err());
        assert!(parse_line("step 1 2").is_err());
        assert!(parse_line("fly").is_err());
    }

    #[test]
    fn demo_is_deterministic() {
        let config = LoopConfig::default();
        let a = run_demo(&config, 50, false).unwrap();
        let b = run_demo(&config, 50, false).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn interactive_session_runs_to_quit() {
        let script = "retrieve Apples\nstep 7\ntable\ncommission\nbogus\nquit\nstep\n";
        run_interactive(LoopEngine::new(), script.as_bytes()).unwrap();
    }
}
