pub mod campaign;
pub mod config;
pub mod executor;
pub mod findings;
pub mod generator;
pub mod input;
pub mod mutator;
pub mod oracle;
pub mod scheduler;
pub mod shell;

pub use campaign::{
    Campaign, CampaignError, CampaignReport, CampaignRun, CampaignStats, PreparedCampaign,
    load_seed, run_campaign, validate_target,
};
pub use config::PipefuzzConfig;
pub use executor::{
    CommandExecutor, CommandExecutorConfig, Executor, ExecutorError, RunOutcome, RunResult,
};
pub use findings::{Finding, FindingSet};
pub use generator::{Candidate, InputGenerator};
pub use input::Input;
pub use mutator::{Mutation, Mutator, MutatorCatalog, MutatorKind};
pub use oracle::{CrashOracle, CrashReport, Oracle};
pub use scheduler::{MutationPlan, RandomScheduler, Scheduler, SchedulerError};
pub use shell::ShellCommand;
