// Command implementations for escapectl

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

use escape_rl_agent::{PolicyIterationAgent, PolicyIterationConfig, QLearning, Sarsa, TdConfig, TdLearner, TdMethod};
use escape_rl_core::{
    rollout, Environment, Grid, Learning, OptionKind, OptionSpec, Pos, Settings, State, Trajectory,
    TrainingMode, DEFAULT_ROLLOUT_STEPS,
};
use escape_rl_env::{CollectRoom, PlankRoom, PursuitRoom, RoomKind};

use crate::AgentKind;

/// Room choice, seed, and settings shared by every command
pub struct Session {
    pub room: RoomKind,
    pub size: usize,
    pub seed: Option<u64>,
    pub settings: Settings,
}

impl Session {
    pub fn parse(room: &str, size: Option<usize>, seed: Option<u64>, pairs: &[String]) -> Result<Self> {
        let room: RoomKind = room.parse().with_context(|| format!("Unknown room '{room}'"))?;

        let mut settings = Settings::new();
        for pair in pairs {
            let (key, raw) = pair
                .split_once('=')
                .with_context(|| format!("Expected KEY=VALUE, got '{pair}'"))?;
            let raw = raw.trim();
            let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            settings.set(key.trim(), value);
        }

        Ok(Self {
            room,
            size: size.unwrap_or_else(|| room.default_size()),
            seed,
            settings,
        })
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    fn build<E: Environment>(&self, mut room: E, rng: &mut StdRng) -> Result<E> {
        room.generate_layout(&self.settings, rng)
            .with_context(|| format!("Failed to generate a layout for {}", self.room))?;
        info!(room = %self.room, size = self.size, "layout ready");
        Ok(room)
    }
}

/// Options of a training run
pub struct TrainOptions<'a> {
    pub units: Option<usize>,
    pub graph: usize,
    pub history_out: Option<&'a str>,
}

pub fn train(
    session: &Session,
    agent: Option<AgentKind>,
    units: Option<usize>,
    graph: usize,
    history_out: Option<&str>,
) -> Result<()> {
    let agent = agent.unwrap_or(match session.room {
        RoomKind::Collect => AgentKind::Dp,
        RoomKind::Pursuit => AgentKind::Sarsa,
        RoomKind::Plank => AgentKind::QLearning,
    });
    let options = TrainOptions {
        units,
        graph,
        history_out,
    };

    match agent {
        AgentKind::Dp => {
            if session.room != RoomKind::Collect {
                bail!("Policy iteration needs a transition model, which {} does not provide", session.room);
            }
            let mut rng = session.rng();
            let room = session.build(CollectRoom::new(session.size)?, &mut rng)?;
            drive(PolicyIterationAgent::new(room, &session.settings, rng), session, &options)
        }
        AgentKind::Sarsa => train_td::<Sarsa>(session, &options),
        AgentKind::QLearning => train_td::<QLearning>(session, &options),
    }
}

fn train_td<M: TdMethod>(session: &Session, options: &TrainOptions<'_>) -> Result<()> {
    let mut rng = session.rng();
    match session.room {
        RoomKind::Collect => {
            let room = session.build(CollectRoom::new(session.size)?, &mut rng)?;
            drive(TdLearner::<_, M>::new(room, &session.settings, rng), session, options)
        }
        RoomKind::Pursuit => {
            let room = session.build(PursuitRoom::new(session.size)?, &mut rng)?;
            drive(TdLearner::<_, M>::new(room, &session.settings, rng), session, options)
        }
        RoomKind::Plank => {
            let room = session.build(PlankRoom::new(session.size)?, &mut rng)?;
            drive(TdLearner::<_, M>::new(room, &session.settings, rng), session, options)
        }
    }
}

fn drive<A>(mut agent: A, session: &Session, options: &TrainOptions<'_>) -> Result<()>
where
    A: Learning,
    A::Env: Clone,
{
    println!("🤖 {} in {}", agent.name(), agent.env().name());
    println!("{}", agent.env().grid().render());

    let unit = match agent.training_mode() {
        TrainingMode::Iterative => "iterations",
        TrainingMode::Episodic => "episodes",
    };
    let done = match options.units {
        Some(n) => {
            let done = agent.train(n).len();
            agent.extract_policy();
            done
        }
        None => agent.run_to_completion(),
    };
    println!("Trained for {done} {unit} (converged: {})", agent.is_trained());

    let policy = agent.policy().clone();
    let start = agent.env().initial_state();
    let mut env = agent.env().clone();
    let mut rng = session.rng();
    let run = rollout(&mut env, &policy, start, agent.gamma(), DEFAULT_ROLLOUT_STEPS, &mut rng);

    println!("\n🧭 Greedy run from {}", start.position());
    println!("{}", render_trace(env.grid(), &run.trajectory));
    println!(
        "End: {:?}  Steps: {}  Reward: {:.2}  Discounted: {:.2}",
        run.end,
        run.trajectory.len(),
        run.trajectory.total_reward,
        run.discounted_return
    );

    let history = agent.history().snapshot();
    if !history.episodes.is_empty() {
        print_reward_graph(&history.rewards(), options.graph);
    }
    if let Some(last) = history.iteration_deltas.last() {
        println!("\nFinal evaluation delta: {last:.3e}");
    }

    if let Some(path) = options.history_out {
        std::fs::write(path, serde_json::to_string_pretty(&history)?)
            .with_context(|| format!("Failed to write history to {path}"))?;
        println!("History written to {path}");
    }

    Ok(())
}

/// Overlay the action taken at each visited cell on the grid
fn render_trace<S: State>(grid: &Grid, trajectory: &Trajectory<S>) -> String {
    let mut marks = HashMap::new();
    for t in &trajectory.transitions {
        marks.insert(t.state.position(), t.action.glyph());
    }

    let mut out = String::new();
    for row in 0..grid.size() {
        for col in 0..grid.size() {
            let pos = Pos::new(row, col);
            out.push(marks.get(&pos).copied().unwrap_or_else(|| grid.get(pos).glyph()));
        }
        out.push('\n');
    }
    out
}

fn print_reward_graph(rewards: &[f64], episodes: usize) {
    let start = rewards.len().saturating_sub(episodes);
    let recent = &rewards[start..];
    if recent.is_empty() {
        return;
    }

    let max_reward = recent.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min_reward = recent.iter().copied().fold(f64::INFINITY, f64::min);
    let avg_reward = recent.iter().sum::<f64>() / recent.len() as f64;

    let graph_height = 10;
    let graph_width = 50;

    println!("\n📊 Reward Graph (last {} episodes)", recent.len());
    println!("Max: {max_reward:.2}  Avg: {avg_reward:.2}  Min: {min_reward:.2}");
    println!("┌{}┐", "─".repeat(graph_width));
    for h in (0..graph_height).rev() {
        let line: String = (0..graph_width)
            .map(|i| {
                let reward = recent[(i * recent.len()) / graph_width];
                let normalized = (reward - min_reward) / (max_reward - min_reward + 1e-6);
                if (normalized * f64::from(graph_height)) as i32 >= h {
                    '█'
                } else {
                    ' '
                }
            })
            .collect();
        println!("│{line}│");
    }
    println!("└{}┘", "─".repeat(graph_width));
    println!(" Episode {} {}", start + 1, start + recent.len());
}

pub fn show_layout(session: &Session, codes: bool) -> Result<()> {
    let mut rng = session.rng();
    match session.room {
        RoomKind::Collect => {
            let room = session.build(CollectRoom::new(session.size)?, &mut rng)?;
            print_room(&room, codes);
            println!("Bag: {}  Rope: {}  Slippery tiles: {}", room.bag(), room.rope(), room.slips().len());
        }
        RoomKind::Pursuit => {
            let room = session.build(PursuitRoom::new(session.size)?, &mut rng)?;
            print_room(&room, codes);
            println!(
                "Key: {}  Door: {}  Portal: {:?}  Patrol length: {}",
                room.key(),
                room.door(),
                room.portal(),
                room.patrol_route().len() - 1
            );
        }
        RoomKind::Plank => {
            let room = session.build(PlankRoom::new(session.size)?, &mut rng)?;
            let start = room.initial_state();
            print_room(&room, codes);
            println!("{}", room.grid_for(&start).render());
            println!("Door: {}  Keys: {:?}", room.door(), room.keys());
        }
    }
    Ok(())
}

/// Grid as rows of space-separated cell codes
fn render_codes(grid: &Grid) -> String {
    let mut out = String::new();
    for row in grid.codes().rows() {
        let line: Vec<String> = row.iter().map(u8::to_string).collect();
        out.push_str(&line.join(" "));
        out.push('\n');
    }
    out
}

fn print_room<E: Environment>(room: &E, codes: bool) {
    println!("🗺️  {} ({}×{})", room.name(), room.size(), room.size());
    if codes {
        println!("{}", render_codes(room.grid()));
    } else {
        println!("{}", room.grid().render());
    }
    println!("Start: {}  Exit: {}", room.start(), room.exit());
}

pub fn show_options(room: &str, json: bool) -> Result<()> {
    let room: RoomKind = room.parse().with_context(|| format!("Unknown room '{room}'"))?;

    let mut sections = vec![(room.name().to_string(), room.options())];
    if room == RoomKind::Collect {
        sections.push((
            PolicyIterationAgent::<CollectRoom>::NAME.to_string(),
            PolicyIterationConfig::schema(),
        ));
    }
    sections.push((Sarsa::NAME.to_string(), TdConfig::schema(Sarsa::DEFAULT_MAX_EPISODES)));
    sections.push((QLearning::NAME.to_string(), TdConfig::schema(QLearning::DEFAULT_MAX_EPISODES)));

    if json {
        let mut map = serde_json::Map::new();
        for (name, schema) in sections {
            map.insert(name, serde_json::to_value(schema)?);
        }
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    for (name, schema) in sections {
        println!("{name}");
        for spec in &schema {
            println!("   {:<18} {:<40} default: {}", spec.key, describe(spec), spec.default);
        }
        println!();
    }
    Ok(())
}

fn describe(spec: &OptionSpec) -> String {
    match &spec.kind {
        OptionKind::Dropdown { options } if options.len() > 6 => {
            format!("{}, {}..{}", options[0], options[1], options[options.len() - 1])
        }
        OptionKind::Dropdown { options } => options.join(" | "),
        OptionKind::Float => "float".to_string(),
        OptionKind::Int => "integer".to_string(),
    }
}
