/*!
 * Search configuration
 *
 * Every field has a default, so a config file only needs the values it
 * changes. Command line flags are applied on top of a loaded file.
 */

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::candidates::{DateRules, DIGITS};
use crate::error::Result;
use crate::pipeline::StageKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Upper bound on workers for any list or generative stage.
    pub max_workers: usize,
    /// Workers for the checksum PIN stage.
    pub pin_workers: usize,
    /// Stall timeout while waiting for a stage's workers.
    pub wait_timeout_secs: u64,
    pub progress_interval_secs: u64,

    /// Stages to run, in order.
    pub stages: Vec<StageKind>,
    /// Optional time budget per stage, in seconds.
    pub stage_budgets: BTreeMap<StageKind, u64>,

    pub dictionary: Option<PathBuf>,
    pub dictionary_limit: usize,

    pub first_year: u16,
    pub last_year: u16,
    pub day_stride: u32,
    pub birth_years: Vec<u16>,

    pub pattern_triples: bool,

    /// Cap on weighted-random candidates; `None` runs until stopped.
    pub random_limit: Option<u64>,
    pub random_seed: Option<u64>,

    pub exhaustive: ExhaustiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhaustiveConfig {
    pub alphabet: String,
    pub min_len: usize,
    pub max_len: usize,
}

impl Default for ExhaustiveConfig {
    fn default() -> Self {
        Self {
            alphabet: DIGITS.to_string(),
            min_len: 8,
            max_len: 12,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        let dates = DateRules::default();
        Self {
            max_workers: 100,
            pin_workers: 50,
            wait_timeout_secs: 60,
            progress_interval_secs: 5,
            stages: StageKind::ALL.to_vec(),
            stage_budgets: BTreeMap::new(),
            dictionary: None,
            dictionary_limit: 1_000_000,
            first_year: dates.first_year,
            last_year: dates.last_year,
            day_stride: dates.day_stride,
            birth_years: dates.birth_years,
            pattern_triples: true,
            random_limit: Some(100_000),
            random_seed: None,
            exhaustive: ExhaustiveConfig::default(),
        }
    }
}

impl SearchConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        Ok(config)
    }

    pub fn date_rules(&self) -> DateRules {
        DateRules {
            first_year: self.first_year,
            last_year: self.last_year,
            day_stride: self.day_stride,
            birth_years: self.birth_years.clone(),
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        Duration::from_secs(self.wait_timeout_secs.max(1))
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_secs(self.progress_interval_secs.max(1))
    }

    pub fn stage_budget(&self, kind: StageKind) -> Option<Duration> {
        self.stage_budgets
            .get(&kind)
            .map(|secs| Duration::from_secs(*secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.max_workers, 100);
        assert_eq!(config.pin_workers, 50);
        assert_eq!(config.stages, StageKind::ALL.to_vec());
        assert_eq!(config.exhaustive.min_len, 8);
        assert_eq!(config.exhaustive.max_len, 12);
        assert_eq!(config.progress_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "max_workers": 8,
                "stages": ["common", "identity"],
                "stage_budgets": {{ "identity": 30 }},
                "random_limit": null,
                "exhaustive": {{ "max_len": 9 }}
            }}"#
        )
        .unwrap();

        let config = SearchConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.max_workers, 8);
        assert_eq!(config.pin_workers, 50);
        assert_eq!(config.stages, vec![StageKind::Common, StageKind::Identity]);
        assert_eq!(
            config.stage_budget(StageKind::Identity),
            Some(Duration::from_secs(30))
        );
        assert_eq!(config.stage_budget(StageKind::Common), None);
        assert_eq!(config.random_limit, None);
        assert_eq!(config.exhaustive.min_len, 8);
        assert_eq!(config.exhaustive.max_len, 9);
    }

    #[test]
    fn test_bad_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(SearchConfig::load_from_file(file.path()).is_err());
        assert!(SearchConfig::load_from_file(Path::new("/nonexistent/keyhunt.json")).is_err());
    }
}
