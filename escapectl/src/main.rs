// Escape room control CLI
// Trains the room agents and prints layouts, policies, and reward history

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "escapectl")]
#[command(about = "Escape room reinforcement learning sandbox", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a layout and train an agent on it
    Train {
        /// Room number or name (1/collect, 2/pursuit, 3/plank)
        #[arg(short, long, default_value = "1")]
        room: String,

        /// Agent to train (defaults to the room's own agent)
        #[arg(short, long, value_enum)]
        agent: Option<AgentKind>,

        /// Training units (iterations or episodes); defaults to the agent's budget
        #[arg(short = 'n', long)]
        units: Option<usize>,

        /// Grid side length
        #[arg(long)]
        size: Option<usize>,

        /// Random seed for a reproducible session
        #[arg(long)]
        seed: Option<u64>,

        /// Room or agent setting, e.g. --set "Walls=5" --set "Alpha=0.2"
        #[arg(long = "set", value_name = "KEY=VALUE")]
        settings: Vec<String>,

        /// Number of recent episodes shown in the reward graph
        #[arg(long, default_value = "100")]
        graph: usize,

        /// Write the training history as JSON
        #[arg(long)]
        history_out: Option<String>,
    },

    /// Generate and print a layout without training
    Layout {
        /// Room number or name
        #[arg(short, long, default_value = "1")]
        room: String,

        /// Grid side length
        #[arg(long)]
        size: Option<usize>,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Room setting
        #[arg(long = "set", value_name = "KEY=VALUE")]
        settings: Vec<String>,

        /// Print the integer cell codes instead of glyphs
        #[arg(long)]
        codes: bool,
    },

    /// List the settings a room and its agents accept
    Options {
        /// Room number or name
        #[arg(short, long, default_value = "1")]
        room: String,

        /// Print the schema as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Learning algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AgentKind {
    /// Policy iteration (room 1 only)
    Dp,
    /// On-policy TD control
    Sarsa,
    /// Off-policy TD control
    QLearning,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            room,
            agent,
            units,
            size,
            seed,
            settings,
            graph,
            history_out,
        } => {
            let session = commands::Session::parse(&room, size, seed, &settings)?;
            commands::train(&session, agent, units, graph, history_out.as_deref())?;
        }

        Commands::Layout {
            room,
            size,
            seed,
            settings,
            codes,
        } => {
            let session = commands::Session::parse(&room, size, seed, &settings)?;
            commands::show_layout(&session, codes)?;
        }

        Commands::Options { room, json } => {
            commands::show_options(&room, json)?;
        }
    }

    Ok(())
}
