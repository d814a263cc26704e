mod client;
mod engine;
mod impls;
mod net;

use std::time::Duration;

use clap::Parser;
use color_eyre::Result;
use log::{info, LevelFilter};

use client::App;
use engine::config::{BattleConfig, ChaosConfig};

#[derive(Parser)]
#[command(name = "netbattle")]
#[command(about = "Peer-to-peer card battle over a simulated link", long_about = None)]
struct Cli {
    /// Let the autopilot play the local side too, without a terminal UI
    #[arg(long)]
    headless: bool,

    /// How long a headless run may last, in seconds
    #[arg(long, default_value_t = 60)]
    seconds: u64,

    /// One-way link latency in milliseconds
    #[arg(long, default_value_t = 30)]
    latency_ms: u64,

    /// Extra random delay per frame in milliseconds
    #[arg(long, default_value_t = 10)]
    jitter_ms: u64,

    /// Chance of losing an unreliable frame
    #[arg(long, default_value_t = 0.05)]
    drop: f64,

    /// Seed for folders, autopilots and the link
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Log level written to netbattle.log
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    simple_logging::log_to_file("netbattle.log", cli.log_level)?;

    let config = BattleConfig::default().with_seed(cli.seed);
    let chaos = ChaosConfig::default()
        .with_latency(Duration::from_millis(cli.latency_ms))
        .with_jitter(Duration::from_millis(cli.jitter_ms))
        .with_drop_rate(cli.drop)
        .with_seed(cli.seed);

    let mut app = App::new(config, chaos, cli.headless)?;
    if cli.headless {
        app.run_headless(Duration::from_secs(cli.seconds))?;
    } else {
        app.run()?;
    }
    info!("main: {}", app.summary());
    println!("{}", app.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_comes_from_the_command_line() {
        let cli = Cli::try_parse_from(["netbattle", "--headless", "--log-level", "debug"]).unwrap();
        assert!(cli.headless);
        assert_eq!(cli.log_level, LevelFilter::Debug);

        let cli = Cli::try_parse_from(["netbattle"]).unwrap();
        assert_eq!(cli.log_level, LevelFilter::Info);
        assert_eq!(cli.seconds, 60);
    }
}
