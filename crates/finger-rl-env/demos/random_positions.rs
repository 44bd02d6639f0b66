//! Example: Send the simulated finger to random joint positions

use clap::Parser;
use finger_rl_env::{
    ControlMode, FingerDriver, FingerType, SamplingStrategy, SimFinger, PHYSICAL_TICK_S,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Ticks spent tracking each position
const TICKS_PER_POSITION: usize = 300;

#[derive(Parser)]
#[command(name = "random_positions")]
#[command(about = "Move the simulated finger between random joint positions")]
struct Args {
    /// Robot variant (single, tri)
    #[arg(short, long, default_value = "single")]
    finger_type: FingerType,

    /// Number of positions to visit
    #[arg(short, long, default_value = "10")]
    positions: usize,

    /// Seed for the positions
    #[arg(long, default_value = "0")]
    seed: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut finger = SimFinger::new(
        args.finger_type.num_fingers(),
        PHYSICAL_TICK_S,
        false,
        SamplingStrategy::Separated,
    );
    finger.reset_to_pose()?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    for _ in 0..args.positions {
        let position = finger.sample_reaching_joint_positions(&mut rng);
        for tick in 0..TICKS_PER_POSITION {
            finger.set_action(&position, ControlMode::Position)?;
            finger.step_tick(tick == 0)?;
        }

        let reached = finger.observation().position;
        let tips = finger.forward_kinematics(&reached)?;
        println!("Target: {position:.3?}");
        println!("Reached: {reached:.3?} tips {tips:.3?} at t = {:.2} s", finger.sim_time());
    }

    Ok(())
}
