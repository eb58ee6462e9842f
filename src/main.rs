//! cell-sim entry point — CLI wiring and config-driven simulation runs.

use std::path::Path;
use std::process;

use cell_sim::config::ScenarioConfig;
use cell_sim::io::export::export_csv;
use cell_sim::runner::run_scenario;

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    seed_override: Option<u64>,
    trace_out: Option<String>,
    quiet: bool,
}

fn print_help() {
    eprintln!("cell-sim — discrete-event battery discharge simulator");
    eprintln!();
    eprintln!("Usage: cell-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>   Load scenario from TOML config file");
    eprintln!("  --preset <name>     Use a built-in preset (baseline, pulsed, depletion)");
    eprintln!("  --seed <u64>        Override random seed");
    eprintln!("  --trace-out <path>  Export the sample trace to CSV");
    eprintln!("  --quiet             Suppress the per-sample output");
    eprintln!("  --help              Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the baseline preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        seed_override: None,
        trace_out: None,
        quiet: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--seed" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --seed requires a u64 argument");
                    process::exit(1);
                }
                if let Ok(s) = args[i].parse::<u64>() {
                    cli.seed_override = Some(s);
                } else {
                    eprintln!("error: --seed value \"{}\" is not a valid u64", args[i]);
                    process::exit(1);
                }
            }
            "--trace-out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --trace-out requires a path argument");
                    process::exit(1);
                }
                cli.trace_out = Some(args[i].clone());
            }
            "--quiet" => {
                cli.quiet = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

fn main() {
    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then baseline default
    let mut scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::baseline()
    };

    // Apply seed override
    if let Some(seed) = cli.seed_override {
        scenario.simulation.seed = seed;
    }

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    // Run
    let result = run_scenario(&scenario);

    // Print per-sample rows
    if !cli.quiet {
        for row in &result.rows {
            println!("{row}");
        }
    }

    // Print the summary report
    println!("\n{}", result.report);

    // Export CSV if requested
    if let Some(ref path) = cli.trace_out {
        if let Err(e) = export_csv(&result.rows, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Trace written to {path}");
    }
}
