use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use worldline::api::{run_http_server, validate_profile};
use worldline::core::{
    Profile, SIMULATION_RUNS, SimConfig, bundle_presets, default_branches,
    default_candidate_budget, find_most_impactful_branch, generate_worldline_candidates,
    instantiate_bundle, instantiate_preset, preset_events, run_simulation_with, score_candidates,
};

#[derive(Parser, Debug)]
#[command(
    name = "worldline",
    about = "Monte Carlo household projection: income, expenses, pension, and life-event worldlines"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Simulate a single profile and print the result as JSON
    Simulate {
        #[arg(long, help = "Path to a profile JSON file")]
        profile: PathBuf,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = SIMULATION_RUNS)]
        runs: u32,
    },
    /// Print the default branch set for a profile
    Branches {
        #[arg(long)]
        profile: PathBuf,
    },
    /// Generate and score worldline candidates from the default branches
    Worldlines {
        #[arg(long)]
        profile: PathBuf,
        #[arg(long, default_value_t = default_candidate_budget())]
        max: usize,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = SIMULATION_RUNS)]
        runs: u32,
    },
    /// Print the preset event catalog instantiated for a profile
    Presets {
        #[arg(long)]
        profile: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(message) = run(cli).await {
        eprintln!("{message}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("Server error: {e}")),

        Command::Simulate {
            profile,
            seed,
            runs,
        } => {
            let profile = load_profile(&profile)?;
            let config = SimConfig { runs, seed };
            let result = run_simulation_with(&profile, &config);
            print_json(&result)
        }

        Command::Branches { profile } => {
            let profile = load_profile(&profile)?;
            print_json(&default_branches(&profile))
        }

        Command::Worldlines {
            profile,
            max,
            seed,
            runs,
        } => {
            let profile = load_profile(&profile)?;
            let branches = default_branches(&profile);
            let candidates = generate_worldline_candidates(&branches, max);
            let cancel = AtomicBool::new(false);
            let config = SimConfig { runs, seed };
            let outcome = score_candidates(
                &profile,
                candidates,
                &config,
                |done, total| info!(done, total, "worldline candidate finished"),
                &cancel,
            );
            let most_impactful = find_most_impactful_branch(&outcome.candidates);
            print_json(&serde_json::json!({
                "candidates": outcome.candidates,
                "mostImpactful": most_impactful,
                "cancelled": outcome.cancelled,
            }))
        }

        Command::Presets { profile } => {
            let profile = match profile {
                Some(path) => load_profile(&path)?,
                None => Profile::default(),
            };
            let events: Vec<_> = preset_events()
                .into_iter()
                .map(|preset| instantiate_preset(preset, &profile, None))
                .collect();
            let bundles: Vec<_> = bundle_presets()
                .iter()
                .map(|bundle| {
                    serde_json::json!({
                        "id": bundle.id,
                        "name": bundle.name,
                        "coupleOnly": bundle.couple_only,
                        "events": instantiate_bundle(bundle, &profile, None),
                    })
                })
                .collect();
            print_json(&serde_json::json!({ "presets": events, "bundles": bundles }))
        }
    }
}

fn load_profile(path: &PathBuf) -> Result<Profile, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read {}: {e}", path.display()))?;
    let profile: Profile =
        serde_json::from_str(&raw).map_err(|e| format!("Invalid profile JSON: {e}"))?;

    let errors = validate_profile(&profile);
    if !errors.is_empty() {
        let summary = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(format!("Invalid profile: {summary}"));
    }
    Ok(profile)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), String> {
    let out = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    println!("{out}");
    Ok(())
}
