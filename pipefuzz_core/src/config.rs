use crate::mutator::{DEFAULT_MAX_RANDOM_STRING_LEN, MutatorCatalog};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct FuzzerSettings {
    #[serde(default = "default_campaign_size")]
    pub campaign_size: usize,
    /// Seed for the campaign's random source; drawn from OS entropy when absent.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default = "default_max_random_string_len")]
    pub max_random_string_len: usize,
    #[serde(default = "default_html_fragments")]
    pub html_fragments: bool,
}

pub fn default_campaign_size() -> usize {
    1000
}
fn default_max_random_string_len() -> usize {
    DEFAULT_MAX_RANDOM_STRING_LEN
}
fn default_html_fragments() -> bool {
    true
}

impl FuzzerSettings {
    pub fn catalog(&self) -> MutatorCatalog {
        MutatorCatalog::standard(self.max_random_string_len, self.html_fragments)
    }
}

impl Default for FuzzerSettings {
    fn default() -> Self {
        Self {
            campaign_size: default_campaign_size(),
            rng_seed: None,
            max_random_string_len: default_max_random_string_len(),
            html_fragments: default_html_fragments(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct ExecutorSettings {
    /// Per-run timeout; `0` waits for the target forever.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
}

fn default_timeout_ms() -> u64 {
    2000
}
pub fn default_working_dir() -> PathBuf {
    PathBuf::from("./")
}

impl ExecutorSettings {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            working_dir: default_working_dir(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct SeedSettings {
    #[serde(default = "default_seed_path")]
    pub path: PathBuf,
}

pub fn default_seed_path() -> PathBuf {
    PathBuf::from("sample.html")
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            path: default_seed_path(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[serde(deny_unknown_fields)]
pub struct PipefuzzConfig {
    #[serde(default)]
    pub fuzzer: FuzzerSettings,
    #[serde(default)]
    pub executor: ExecutorSettings,
    #[serde(default)]
    pub seed: SeedSettings,
}

impl PipefuzzConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, anyhow::Error> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file at {:?}: {}", path, e))?;

        Self::from_toml_str(&content).map_err(|e| {
            anyhow::anyhow!("Failed to parse TOML from config file {:?}: {}", path, e)
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
