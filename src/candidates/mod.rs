/*!
 * Candidate sources
 *
 * A source is either materialized (a finite ordered list, split across the
 * workers of a stage before it starts) or generative (a synchronized producer
 * that every worker pulls from). Neither kind can fail: running out of
 * candidates is the normal end of a source.
 */

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

mod exhaustive;
mod lists;
mod random;

pub use exhaustive::{ExhaustiveGenerator, DIGITS};
pub use lists::{
    common_passwords, date_candidates, dictionary_from_lines, dictionary_from_path,
    hardware_candidates, identity_candidates, name_candidates, pattern_candidates, DateRules,
    COMMON_PASSWORDS,
};
pub use random::WeightedRandomGenerator;

/// On-demand candidate producer shared by all workers of a stage.
///
/// Implementations synchronize internally and never hand the same candidate
/// to two callers during one stage run.
pub trait Generator: Send + Sync + fmt::Debug {
    /// Next candidate, or `None` once the generator is exhausted.
    fn next_candidate(&self) -> Option<String>;

    /// Total number of candidates this generator will emit, if bounded.
    fn size_hint(&self) -> Option<u64>;

    /// A generator over the same candidate space, starting from the beginning.
    ///
    /// Each stage run pulls from its own fork, so a pipeline can be run more
    /// than once.
    fn fork(&self) -> Arc<dyn Generator>;
}

/// Where a stage gets its candidates from.
#[derive(Clone)]
pub enum CandidateSource {
    Materialized(Arc<[String]>),
    Generative(Arc<dyn Generator>),
}

impl CandidateSource {
    /// Materialized source over `candidates`, keeping first occurrences only.
    pub fn from_list(candidates: Vec<String>) -> Self {
        CandidateSource::Materialized(dedup_stable(candidates).into())
    }

    pub fn generative<G: Generator + 'static>(generator: G) -> Self {
        CandidateSource::Generative(Arc::new(generator))
    }

    pub fn is_finite(&self) -> bool {
        self.size_hint().is_some()
    }

    /// Known candidate count; `None` for unbounded generators.
    pub fn size_hint(&self) -> Option<u64> {
        match self {
            CandidateSource::Materialized(items) => Some(items.len() as u64),
            CandidateSource::Generative(generator) => generator.size_hint(),
        }
    }

    /// Split a materialized list into `workers` strided partitions.
    ///
    /// Worker `i` gets items `i, i + workers, i + 2 * workers, ...`, so the
    /// head of the list is tried first across all workers and each partition
    /// keeps list order. Returns `None` for generative sources.
    pub fn partitions(&self, workers: usize) -> Option<Vec<Partition>> {
        let CandidateSource::Materialized(items) = self else {
            return None;
        };
        let workers = workers.max(1);
        Some(
            (0..workers)
                .map(|offset| Partition {
                    items: Arc::clone(items),
                    next: offset,
                    stride: workers,
                })
                .collect(),
        )
    }
}

impl fmt::Debug for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateSource::Materialized(items) => f
                .debug_struct("Materialized")
                .field("len", &items.len())
                .finish(),
            CandidateSource::Generative(generator) => {
                f.debug_tuple("Generative").field(generator).finish()
            }
        }
    }
}

/// One worker's share of a materialized list.
#[derive(Debug, Clone)]
pub struct Partition {
    items: Arc<[String]>,
    next: usize,
    stride: usize,
}

impl Iterator for Partition {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        let item = self.items.get(self.next)?;
        self.next += self.stride;
        Some(item.clone())
    }
}

/// Removes repeats while keeping the first occurrence of each candidate.
pub fn dedup_stable(candidates: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(candidates.len());
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.clone()))
        .collect()
}
