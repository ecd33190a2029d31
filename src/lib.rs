/*!
 * keyhunt: staged concurrent candidate search
 *
 * Candidates for an access credential are tried against a pass/fail oracle
 * in a fixed order of stages, cheapest and most likely first. Each stage is
 * raced by a pool of workers; the first accepted candidate ends the search.
 */

pub mod candidates;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod oracle;
pub mod pin;
pub mod pipeline;
pub mod progress;
pub mod session;

// Re-exports
pub use candidates::{CandidateSource, ExhaustiveGenerator, Generator, WeightedRandomGenerator};
pub use config::{ExhaustiveConfig, SearchConfig};
pub use coordinator::{Coordinator, SearchEvent, StageReport};
pub use engine::{Engine, SessionHandle};
pub use error::{Error, Result};
pub use oracle::{CommandOracle, Oracle, SetOracle};
pub use pipeline::{Pipeline, Stage, StageKind};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use session::{Outcome, Session, Winner};
