use std::process::ExitCode;

use connectors::{SceneConfig, Simulation, SimulationError};
use log::{error, info};

const USAGE: &str = "usage: connectors [CONFIG.json] [--seed N] [--headless FRAMES] [--no-gizmo] [--no-orbit]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    config: Option<String>,
    seed: Option<u64>,
    headless: Option<u32>,
    no_gizmo: bool,
    no_orbit: bool,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => {
                let value = args.next().ok_or("--seed needs a value")?;
                parsed.seed = Some(value.parse().map_err(|_| format!("invalid seed '{}'", value))?);
            }
            "--headless" => {
                let value = args.next().ok_or("--headless needs a frame count")?;
                parsed.headless = Some(value.parse().map_err(|_| format!("invalid frame count '{}'", value))?);
            }
            "--no-gizmo" => parsed.no_gizmo = true,
            "--no-orbit" => parsed.no_orbit = true,
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            path => {
                if parsed.config.replace(path.to_string()).is_some() {
                    return Err("only one config file may be given".into());
                }
            }
        }
    }
    Ok(parsed)
}

fn run(args: Args) -> Result<(), SimulationError> {
    let config = match &args.config {
        Some(path) => {
            let config = SceneConfig::load(path)?;
            info!("Loaded scene config from {}", path);
            config
        }
        None => SceneConfig::default(),
    };

    let mut sim = Simulation::new().with_config(config);
    if let Some(seed) = args.seed {
        sim = sim.with_seed(seed);
    }
    if args.no_gizmo {
        sim = sim.with_gizmo(false);
    }
    if args.no_orbit {
        sim = sim.with_orbit(false);
    }

    match args.headless {
        Some(frames) => {
            let report = sim.run_headless(frames)?;
            println!(
                "{} frames ({:.2}s): mean distance to origin {:.3}",
                report.frames, report.elapsed, report.mean_distance
            );
            Ok(())
        }
        None => sim.run(),
    }
}

fn main() -> ExitCode {
    if let Err(e) = simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Info)
        .env()
        .init()
    {
        eprintln!("failed to initialise logging: {}", e);
    }

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{}\n{}", msg, USAGE);
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_all_options() {
        let args = parse(&["scene.json", "--seed", "5", "--headless", "600", "--no-gizmo", "--no-orbit"]).unwrap();
        assert_eq!(
            args,
            Args {
                config: Some("scene.json".into()),
                seed: Some(5),
                headless: Some(600),
                no_gizmo: true,
                no_orbit: true,
            }
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse(&["--seed"]).is_err());
        assert!(parse(&["--seed", "x"]).is_err());
        assert!(parse(&["--frobnicate"]).is_err());
        assert!(parse(&["a.json", "b.json"]).is_err());
        assert_eq!(parse(&[]).unwrap(), Args::default());
    }
}
