/*!
 * Stage pipeline
 *
 * A pipeline is a fixed, ordered list of stages chosen when the session
 * starts. Each stage binds one candidate source to a worker count.
 */

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::candidates::{
    common_passwords, date_candidates, dictionary_from_path, identity_candidates,
    pattern_candidates, CandidateSource, ExhaustiveGenerator, WeightedRandomGenerator,
};
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::pin;

/// The standard stages, cheapest and most likely first.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum StageKind {
    ChecksumPins,
    Common,
    Identity,
    Dates,
    Patterns,
    Dictionary,
    Adaptive,
    Exhaustive,
}

impl StageKind {
    pub const ALL: [StageKind; 8] = [
        StageKind::ChecksumPins,
        StageKind::Common,
        StageKind::Identity,
        StageKind::Dates,
        StageKind::Patterns,
        StageKind::Dictionary,
        StageKind::Adaptive,
        StageKind::Exhaustive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StageKind::ChecksumPins => "checksum-pins",
            StageKind::Common => "common",
            StageKind::Identity => "identity",
            StageKind::Dates => "dates",
            StageKind::Patterns => "patterns",
            StageKind::Dictionary => "dictionary",
            StageKind::Adaptive => "adaptive",
            StageKind::Exhaustive => "exhaustive",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One pipeline element. Immutable once built.
#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    source: CandidateSource,
    workers: usize,
    budget: Option<Duration>,
}

impl Stage {
    pub fn new(name: impl Into<String>, source: CandidateSource, workers: usize) -> Result<Self> {
        let name = name.into();
        if workers == 0 {
            return Err(Error::NoWorkers(name));
        }
        Ok(Self {
            name,
            source,
            workers,
            budget: None,
        })
    }

    /// Stop this stage (but not the session) once `budget` has elapsed.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &CandidateSource {
        &self.source
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new(stages: Vec<Stage>) -> Self {
        Self { stages }
    }

    pub fn push(&mut self, stage: Stage) {
        self.stages.push(stage);
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Pipeline of `config.stages` for a target and optional hardware address.
    pub fn standard(target: &str, secondary: Option<&str>, config: &SearchConfig) -> Result<Self> {
        let mut pipeline = Pipeline::default();
        for &kind in &config.stages {
            let source = build_source(kind, target, secondary, config)?;
            let workers = match kind {
                StageKind::ChecksumPins => config.pin_workers.max(1),
                StageKind::Adaptive | StageKind::Exhaustive => config.max_workers.max(1),
                _ => list_workers(source.size_hint().unwrap_or(0), config.max_workers),
            };

            let mut stage = Stage::new(kind.name(), source, workers)?;
            if let Some(budget) = config.stage_budget(kind) {
                stage = stage.with_budget(budget);
            }
            pipeline.push(stage);
        }
        Ok(pipeline)
    }
}

/// Candidate source for one standard stage.
pub fn build_source(
    kind: StageKind,
    target: &str,
    secondary: Option<&str>,
    config: &SearchConfig,
) -> Result<CandidateSource> {
    let source = match kind {
        StageKind::ChecksumPins => CandidateSource::from_list(pin::generate_pins()),
        StageKind::Common => CandidateSource::from_list(common_passwords()),
        StageKind::Identity => CandidateSource::from_list(identity_candidates(target, secondary)),
        StageKind::Dates => CandidateSource::from_list(date_candidates(&config.date_rules())?),
        StageKind::Patterns => {
            CandidateSource::from_list(pattern_candidates(config.pattern_triples))
        }
        StageKind::Dictionary => CandidateSource::from_list(
            config
                .dictionary
                .as_deref()
                .map(|path| dictionary_from_path(path, config.dictionary_limit))
                .unwrap_or_default(),
        ),
        StageKind::Adaptive => {
            let generator = match config.random_seed {
                Some(seed) => WeightedRandomGenerator::with_seed(config.random_limit, seed),
                None => WeightedRandomGenerator::new(config.random_limit),
            };
            CandidateSource::generative(generator)
        }
        StageKind::Exhaustive => {
            let range = &config.exhaustive;
            CandidateSource::generative(ExhaustiveGenerator::new(
                &range.alphabet,
                range.min_len,
                range.max_len,
            )?)
        }
    };
    Ok(source)
}

/// Workers for a list of `len` candidates: one per ten, capped at `max`.
pub fn list_workers(len: u64, max: usize) -> usize {
    let wanted = usize::try_from(len / 10 + 1).unwrap_or(usize::MAX);
    wanted.min(max).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_workers() {
        assert_eq!(list_workers(0, 100), 1);
        assert_eq!(list_workers(12, 100), 2);
        assert_eq!(list_workers(555, 100), 56);
        assert_eq!(list_workers(1_000_000, 100), 100);
        assert_eq!(list_workers(1_000_000, 0), 1);
    }

    #[test]
    fn test_zero_workers_rejected() {
        let source = CandidateSource::from_list(vec!["a".into()]);
        assert!(matches!(
            Stage::new("empty", source, 0),
            Err(Error::NoWorkers(name)) if name == "empty"
        ));
    }

    #[test]
    fn test_standard_pipeline_order() {
        let config = SearchConfig::default();
        let pipeline = Pipeline::standard("MyHome_5G", Some("aa:bb:cc:dd:ee:ff"), &config).unwrap();
        let names: Vec<&str> = pipeline.stages().iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "checksum-pins",
                "common",
                "identity",
                "dates",
                "patterns",
                "dictionary",
                "adaptive",
                "exhaustive"
            ]
        );

        let pins = &pipeline.stages()[0];
        assert_eq!(pins.workers(), 50);
        assert_eq!(pins.source().size_hint(), Some(11_000));

        // No dictionary configured: an empty, still finite stage.
        assert_eq!(pipeline.stages()[5].source().size_hint(), Some(0));
        assert_eq!(pipeline.stages()[6].source().size_hint(), Some(100_000));
    }

    #[test]
    fn test_stage_selection_and_budget() {
        let mut config = SearchConfig::default();
        config.stages = vec![StageKind::Identity, StageKind::Common];
        config.stage_budgets.insert(StageKind::Common, 3);

        let pipeline = Pipeline::standard("net", None, &config).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.stages()[0].name(), "identity");
        assert_eq!(pipeline.stages()[0].budget(), None);
        assert_eq!(pipeline.stages()[1].budget(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_invalid_exhaustive_config() {
        let mut config = SearchConfig::default();
        config.stages = vec![StageKind::Exhaustive];
        config.exhaustive.alphabet = String::new();
        assert!(Pipeline::standard("net", None, &config).is_err());
    }
}
