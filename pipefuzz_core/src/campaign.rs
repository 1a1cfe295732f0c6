use crate::config::PipefuzzConfig;
use crate::executor::{CommandExecutor, CommandExecutorConfig, Executor, RunOutcome};
use crate::findings::{Finding, FindingSet};
use crate::generator::{Candidate, InputGenerator};
use crate::mutator::MutatorCatalog;
use crate::oracle::{CrashOracle, Oracle};
use crate::scheduler::{RandomScheduler, Scheduler, SchedulerError};
use crate::shell::ShellCommand;
use log::{debug, error, info, warn};
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that stop a campaign before any candidate runs.
#[derive(Error, Debug)]
pub enum CampaignError {
    #[error("Could not find command '{command}' in {working_dir:?}")]
    TargetNotFound {
        command: String,
        working_dir: PathBuf,
    },
    #[error("Failed to plan mutations: {0}")]
    Scheduler(#[from] SchedulerError),
}

/// Counters accumulated over one campaign.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct CampaignStats {
    pub executions: usize,
    pub clean: usize,
    pub crashes: usize,
    pub duplicate_crashes: usize,
    pub timeouts: usize,
    pub errors: usize,
    pub elapsed_ms: u64,
}

/// Everything a finished campaign has to say.
#[derive(Debug, Serialize)]
pub struct CampaignReport {
    pub command: ShellCommand,
    pub rng_seed: u64,
    pub stats: CampaignStats,
    pub findings: Vec<Finding>,
    /// First candidate that hung the target, if any did.
    pub first_timeout: Option<String>,
}

/// Outcome of running a list of candidates through an executor.
#[derive(Debug, Default)]
pub struct CampaignRun {
    pub findings: FindingSet,
    pub stats: CampaignStats,
    pub first_timeout: Option<String>,
}

/// Checks that `command` names an existing path under `working_dir`.
pub fn validate_target(working_dir: &Path, command: &str) -> Result<(), CampaignError> {
    if working_dir.join(command).exists() {
        Ok(())
    } else {
        Err(CampaignError::TargetNotFound {
            command: command.to_string(),
            working_dir: working_dir.to_path_buf(),
        })
    }
}

/// Reads the seed file, falling back to an empty seed if it cannot be read.
pub fn load_seed(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(seed) => {
            debug!("Loaded {} byte seed from {path:?}", seed.len());
            seed
        }
        Err(e) => {
            warn!("Could not read seed file {path:?}: {e}. Continuing with an empty seed.");
            String::new()
        }
    }
}

/// Generates candidates from a seed and feeds them, one at a time, to a target.
///
/// The campaign owns its random source, so a given `rng_seed` always yields
/// the same mutation plan and the same candidates.
pub struct Campaign {
    catalog: MutatorCatalog,
    scheduler: Box<dyn Scheduler>,
    oracle: Box<dyn Oracle<String>>,
    rng: ChaCha8Rng,
    rng_seed: u64,
    campaign_size: usize,
}

impl Campaign {
    pub fn new(catalog: MutatorCatalog, campaign_size: usize, rng_seed: u64) -> Self {
        Self {
            catalog,
            scheduler: Box::new(RandomScheduler::new()),
            oracle: Box::new(CrashOracle::new()),
            rng: ChaCha8Rng::seed_from_u64(rng_seed),
            rng_seed,
            campaign_size,
        }
    }

    pub fn with_scheduler(mut self, scheduler: Box<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_oracle(mut self, oracle: Box<dyn Oracle<String>>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Plans the campaign and builds its candidate list, baseline first.
    pub fn prepare(&mut self, seed: &str) -> Result<Vec<Candidate>, CampaignError> {
        let plan = self
            .scheduler
            .plan(self.catalog.len(), self.campaign_size, &mut self.rng)?;
        let candidates = InputGenerator::new(&self.catalog).candidates_with_baseline(
            seed,
            &plan,
            &mut self.rng,
        )?;
        info!(
            "Planned {} mutations over {} mutators",
            plan.len(),
            self.catalog.len()
        );
        Ok(candidates)
    }

    /// Runs every candidate in order and classifies the results.
    ///
    /// Execution errors are logged and counted; they never stop the loop.
    pub fn execute<E: Executor<String>>(
        &self,
        executor: &mut E,
        candidates: &[Candidate],
    ) -> CampaignRun {
        let start_time = Instant::now();
        let progress_step = (candidates.len() / 10).max(1);
        let mut run = CampaignRun::default();

        for (index, candidate) in candidates.iter().enumerate() {
            run.stats.executions += 1;
            let result = match executor.execute(&candidate.input) {
                Ok(result) => result,
                Err(e) => {
                    error!("Candidate {index} could not be executed: {e}");
                    run.stats.errors += 1;
                    continue;
                }
            };

            match result.outcome {
                RunOutcome::TimedOut => {
                    run.stats.timeouts += 1;
                    run.first_timeout
                        .get_or_insert_with(|| candidate.input.clone());
                }
                RunOutcome::Exited(0) => run.stats.clean += 1,
                RunOutcome::Exited(_) => {}
            }

            if let Some(report) = self.oracle.examine(&candidate.input, &result) {
                run.stats.crashes += 1;
                let exit_code = report.exit_code;
                if run.findings.insert(Finding::new(report, index, candidate)) {
                    info!("New crash signature from candidate {index} (exit code {exit_code})");
                } else {
                    run.stats.duplicate_crashes += 1;
                    debug!("Candidate {index} repeated a known crash signature");
                }
            }

            if (index + 1) % progress_step == 0 {
                info!(
                    "Executed {}/{}, findings: {}, timeouts: {}, errors: {}",
                    index + 1,
                    candidates.len(),
                    run.findings.len(),
                    run.stats.timeouts,
                    run.stats.errors
                );
            }
        }

        run.stats.elapsed_ms = start_time.elapsed().as_millis() as u64;
        run
    }
}

/// A validated, fully planned campaign that has not run yet.
pub struct PreparedCampaign {
    shell: ShellCommand,
    timeout: Option<Duration>,
    campaign: Campaign,
    candidates: Vec<Candidate>,
}

impl PreparedCampaign {
    /// Validates the target, loads the seed and plans every candidate.
    ///
    /// Nothing is executed; a missing target or an unusable plan fails here.
    pub fn new(config: &PipefuzzConfig, command: &str) -> Result<Self, CampaignError> {
        let working_dir = &config.executor.working_dir;
        validate_target(working_dir, command)?;

        let seed = load_seed(&config.seed.path);

        let rng_seed = config.fuzzer.rng_seed.unwrap_or_else(rand::random);
        info!("Using rng seed {rng_seed}");

        let mut campaign = Campaign::new(
            config.fuzzer.catalog(),
            config.fuzzer.campaign_size,
            rng_seed,
        );
        let candidates = campaign.prepare(&seed)?;

        Ok(Self {
            shell: ShellCommand::for_host(command, working_dir.clone()),
            timeout: config.executor.timeout(),
            campaign,
            candidates,
        })
    }

    /// The exact command line every candidate will be fed to.
    pub fn shell(&self) -> &ShellCommand {
        &self.shell
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Runs every candidate against the target and collects the report.
    pub fn run(self) -> CampaignReport {
        let mut executor = CommandExecutor::new(CommandExecutorConfig {
            shell: self.shell.clone(),
            timeout: self.timeout,
        });
        let run = self.campaign.execute(&mut executor, &self.candidates);
        info!(
            "Campaign finished in {} ms: {} executions, {} distinct crashes",
            run.stats.elapsed_ms,
            run.stats.executions,
            run.findings.len()
        );

        CampaignReport {
            command: self.shell,
            rng_seed: self.campaign.rng_seed(),
            stats: run.stats,
            findings: run.findings.into_vec(),
            first_timeout: run.first_timeout,
        }
    }
}

/// Validates the target, loads the seed, then plans and runs a full campaign.
pub fn run_campaign(
    config: &PipefuzzConfig,
    command: &str,
) -> Result<CampaignReport, CampaignError> {
    Ok(PreparedCampaign::new(config, command)?.run())
}
