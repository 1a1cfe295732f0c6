use pipefuzz_core::campaign::{CampaignReport, PreparedCampaign};
use pipefuzz_core::config::PipefuzzConfig;

use clap::Parser;
use log::{LevelFilter, info};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// Command to fuzz, relative to the working directory
    target_command: String,
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Number of mutated candidates to run after the seed
    #[clap(short, long)]
    iterations: Option<usize>,
    #[clap(long)]
    seed_file: Option<PathBuf>,
    #[clap(long)]
    rng_seed: Option<u64>,
    /// Per-run timeout in milliseconds, 0 to wait forever
    #[clap(long)]
    timeout_ms: Option<u64>,
    #[clap(long)]
    working_dir: Option<PathBuf>,
    #[clap(long)]
    no_html_fragments: bool,
    /// Print the report as JSON
    #[clap(long)]
    json: bool,
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn load_config(cli: &Cli) -> Result<PipefuzzConfig, anyhow::Error> {
    let mut config = match &cli.config_file {
        Some(config_path) => {
            info!("Loading configuration from specified path: {config_path:?}");
            PipefuzzConfig::load_from_file(config_path)?
        }
        None => {
            let default_config_path = PathBuf::from("pipefuzz.toml");
            if default_config_path.exists() {
                info!("No config file specified, loading default: {default_config_path:?}");
                PipefuzzConfig::load_from_file(&default_config_path)?
            } else {
                PipefuzzConfig::default()
            }
        }
    };

    if let Some(iterations) = cli.iterations {
        config.fuzzer.campaign_size = iterations;
    }
    if let Some(rng_seed) = cli.rng_seed {
        config.fuzzer.rng_seed = Some(rng_seed);
    }
    if cli.no_html_fragments {
        config.fuzzer.html_fragments = false;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.executor.timeout_ms = timeout_ms;
    }
    if let Some(working_dir) = &cli.working_dir {
        config.executor.working_dir = working_dir.clone();
    }
    if let Some(seed_file) = &cli.seed_file {
        config.seed.path = seed_file.clone();
    }
    Ok(config)
}

fn print_report(report: &CampaignReport) {
    for (n, finding) in report.findings.iter().enumerate() {
        println!(
            "\n=== Crash {} (exit code {}, candidate {}) ===",
            n + 1,
            finding.exit_code,
            finding.candidate_index
        );
        match (&finding.mutator, &finding.mutation) {
            (Some(mutator), Some(mutation)) => println!("Mutation: {mutator}, {mutation}"),
            (Some(mutator), None) => println!("Mutation: {mutator}, no change"),
            _ => println!("Mutation: none (seed input)"),
        }
        println!("Output:\n{}", finding.output);
        println!("Input (md5 {}):\n{}", finding.input_hash, finding.input);
    }

    let stats = &report.stats;
    println!(
        "\nExecutions: {}, clean: {}, crashes: {} ({} distinct), timeouts: {}, errors: {}, rng seed: {}, elapsed: {} ms",
        stats.executions,
        stats.clean,
        stats.crashes,
        report.findings.len(),
        stats.timeouts,
        stats.errors,
        report.rng_seed,
        stats.elapsed_ms
    );
    if let Some(input) = &report.first_timeout {
        println!("First input that timed out:\n{input}");
    }
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    let config = load_config(&cli)?;
    log::debug!("Effective configuration: {config:#?}");

    let prepared = PreparedCampaign::new(&config, &cli.target_command)?;
    println!("Command: {}", prepared.shell());

    let report = prepared.run();

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exactly_one_target_is_required() {
        assert!(Cli::try_parse_from(["pipefuzz"]).is_err());
        assert!(Cli::try_parse_from(["pipefuzz", "./a", "./b"]).is_err());
        let cli = Cli::try_parse_from(["pipefuzz", "./target"]).unwrap();
        assert_eq!(cli.target_command, "./target");
    }

    #[test]
    fn flags_override_config() {
        let cli = Cli::try_parse_from([
            "pipefuzz",
            "./target",
            "--config-file",
            "./no_such_config_for_cli_test.toml",
        ])
        .unwrap();
        assert!(load_config(&cli).is_err());

        let cli = Cli::try_parse_from([
            "pipefuzz",
            "./target",
            "-i",
            "100",
            "--rng-seed",
            "9",
            "--timeout-ms",
            "0",
            "--seed-file",
            "seed.html",
            "--working-dir",
            "targets",
            "--no-html-fragments",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();
        assert_eq!(config.fuzzer.campaign_size, 100);
        assert_eq!(config.fuzzer.rng_seed, Some(9));
        assert!(!config.fuzzer.html_fragments);
        assert_eq!(config.executor.timeout(), None);
        assert_eq!(config.executor.working_dir, PathBuf::from("targets"));
        assert_eq!(config.seed.path, PathBuf::from("seed.html"));
    }
}
