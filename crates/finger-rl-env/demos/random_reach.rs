//! Example: Random agent on the simulated reach task

use std::path::PathBuf;

use clap::Parser;
use finger_rl_env::{
    ActionSpace, Environment, FingerReach, FingerReachConfig, FingerType, TimeLimit,
    TrackedEnvironment,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "random_reach")]
#[command(about = "Drive the simulated finger with random actions")]
struct Args {
    /// JSON config file; overrides --finger-type and --seed
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Robot variant (single, tri)
    #[arg(short, long, default_value = "single")]
    finger_type: FingerType,

    /// Number of episodes to run
    #[arg(short, long, default_value = "5")]
    episodes: usize,

    /// Steps per episode
    #[arg(long, default_value = "250")]
    max_steps: usize,

    /// Seed for goals and actions
    #[arg(long, default_value = "0")]
    seed: u64,

    /// Write the recorded episodes to this JSON file
    #[arg(long)]
    record: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => FingerReachConfig::from_json_file(path)?,
        None => FingerReachConfig {
            finger_type: args.finger_type,
            seed: Some(args.seed),
            ..FingerReachConfig::default()
        },
    };

    let env = FingerReach::simulated(config)?;
    let env = TimeLimit::new(env, args.max_steps);
    let mut env = TrackedEnvironment::new(env);

    let action_space = env.action_space();
    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut episode_rewards = Vec::new();

    for episode in 0..args.episodes {
        env.reset().await?;
        loop {
            let action = action_space.sample(&mut rng);
            let step = env.step(action).await?;
            if step.done || step.truncated {
                break;
            }
        }

        let info = env.episode_info();
        let total_reward = info.as_ref().map_or(0.0, |e| e.total_reward);
        let steps = info.as_ref().map_or(0, |e| e.steps);
        episode_rewards.push(total_reward);
        println!(
            "Episode {}: Total Reward = {:.2}, Steps = {}",
            episode + 1,
            total_reward,
            steps
        );
    }

    let avg_reward: f64 = episode_rewards.iter().sum::<f64>() / episode_rewards.len().max(1) as f64;
    println!("\nAverage Reward over {} episodes: {:.2}", args.episodes, avg_reward);

    if let Some(path) = &args.record {
        env.env.env.logger().save_json(path)?;
        println!("Recorded episodes written to {}", path.display());
    }

    env.close().await?;
    Ok(())
}
