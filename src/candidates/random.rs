/*!
 * Weighted-random candidate generator
 *
 * Each pull picks a candidate shape by fixed weight:
 * - 40% numeric: 8 digits (20), 9 digits (10), 10 digits (10)
 * - 30% date: DDMMYYYY or YYYYMMDD, years 1950-2030
 * - 30% digit pattern: alternating/paired digits (15), doubled 4-digit block (15)
 *
 * A candidate already handed out is rejected and the pull retried; after
 * `SHAPE_RETRIES` collisions the generator falls back to uniform numeric
 * strings.
 */

use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Generator;

const SHAPE_RETRIES: usize = 8;
const FALLBACK_RETRIES: usize = 64;
const FALLBACK_WIDTHS: std::ops::RangeInclusive<u32> = 8..=12;

const FIRST_YEAR: i32 = 1950;
const LAST_YEAR: i32 = 2030;

#[derive(Debug, Clone, Copy)]
enum Shape {
    Digits(u32),
    Date,
    DigitPair,
    DoubledBlock,
}

const SHAPES: [(Shape, u32); 6] = [
    (Shape::Digits(8), 20),
    (Shape::Digits(9), 10),
    (Shape::Digits(10), 10),
    (Shape::Date, 30),
    (Shape::DigitPair, 15),
    (Shape::DoubledBlock, 15),
];

#[derive(Debug)]
struct RandomState {
    rng: StdRng,
    seen: HashSet<String>,
    emitted: u64,
}

/// Unbounded (or `limit`-bounded) random generator that never repeats itself.
#[derive(Debug)]
pub struct WeightedRandomGenerator {
    limit: Option<u64>,
    seed: Option<u64>,
    state: Mutex<RandomState>,
}

impl WeightedRandomGenerator {
    pub fn new(limit: Option<u64>) -> Self {
        Self::from_rng(limit, None, StdRng::from_entropy())
    }

    /// Deterministic generator, mostly for tests and reproducible runs.
    pub fn with_seed(limit: Option<u64>, seed: u64) -> Self {
        Self::from_rng(limit, Some(seed), StdRng::seed_from_u64(seed))
    }

    fn from_rng(limit: Option<u64>, seed: Option<u64>, rng: StdRng) -> Self {
        Self {
            limit,
            seed,
            state: Mutex::new(RandomState {
                rng,
                seen: HashSet::new(),
                emitted: 0,
            }),
        }
    }

    /// Number of candidates emitted so far.
    pub fn emitted(&self) -> u64 {
        self.state.lock().emitted
    }
}

impl Generator for WeightedRandomGenerator {
    fn next_candidate(&self) -> Option<String> {
        let mut state = self.state.lock();
        if self.limit.is_some_and(|limit| state.emitted >= limit) {
            return None;
        }

        let RandomState { rng, seen, emitted } = &mut *state;

        for _ in 0..SHAPE_RETRIES {
            let shape = pick_shape(rng);
            let candidate = sample(rng, shape);
            if seen.insert(candidate.clone()) {
                *emitted += 1;
                return Some(candidate);
            }
        }

        for width in FALLBACK_WIDTHS {
            for _ in 0..FALLBACK_RETRIES {
                let candidate = uniform_digits(rng, width);
                if seen.insert(candidate.clone()) {
                    *emitted += 1;
                    return Some(candidate);
                }
            }
        }

        None
    }

    fn size_hint(&self) -> Option<u64> {
        self.limit
    }

    fn fork(&self) -> Arc<dyn Generator> {
        let generator = match self.seed {
            Some(seed) => Self::with_seed(self.limit, seed),
            None => Self::new(self.limit),
        };
        Arc::new(generator)
    }
}

fn pick_shape(rng: &mut StdRng) -> Shape {
    let total: u32 = SHAPES.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (shape, weight) in SHAPES {
        if roll < weight {
            return shape;
        }
        roll -= weight;
    }
    Shape::Digits(8)
}

fn sample(rng: &mut StdRng, shape: Shape) -> String {
    match shape {
        Shape::Digits(width) => {
            let low = 10u64.pow(width - 1);
            rng.gen_range(low..low * 10).to_string()
        }
        Shape::Date => random_date(rng),
        Shape::DigitPair => {
            let a = rng.gen_range(0..10u8);
            let b = (a + rng.gen_range(1..10u8)) % 10;
            let (a, b) = (char::from(b'0' + a), char::from(b'0' + b));
            if rng.gen_bool(0.5) {
                [a, b, a, b, a, b, a, b].iter().collect()
            } else {
                [a, a, b, b, a, a, b, b].iter().collect()
            }
        }
        Shape::DoubledBlock => {
            let block = format!("{:04}", rng.gen_range(0..10_000u32));
            block.repeat(2)
        }
    }
}

fn random_date(rng: &mut StdRng) -> String {
    loop {
        let year = rng.gen_range(FIRST_YEAR..=LAST_YEAR);
        let month = rng.gen_range(1..=12);
        let day = rng.gen_range(1..=31);
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            let format = if rng.gen_bool(0.5) { "%d%m%Y" } else { "%Y%m%d" };
            return date.format(format).to_string();
        }
    }
}

fn uniform_digits(rng: &mut StdRng, width: u32) -> String {
    let value = rng.gen_range(0..10u64.pow(width));
    format!("{:0width$}", value, width = width as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_no_repeats_single_thread() {
        let generator = WeightedRandomGenerator::with_seed(None, 42);
        let mut seen = HashSet::new();
        for _ in 0..20_000 {
            let candidate = generator.next_candidate().unwrap();
            assert!(seen.insert(candidate.clone()), "repeated {}", candidate);
        }
    }

    #[test]
    fn test_no_repeats_across_threads() {
        let generator = Arc::new(WeightedRandomGenerator::with_seed(Some(8_000), 7));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let generator = Arc::clone(&generator);
                thread::spawn(move || {
                    let mut out = Vec::new();
                    while let Some(candidate) = generator.next_candidate() {
                        out.push(candidate);
                    }
                    out
                })
            })
            .collect();

        let all: Vec<String> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        assert_eq!(all.len(), 8_000);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_limit_is_respected() {
        let generator = WeightedRandomGenerator::with_seed(Some(3), 1);
        assert!(generator.next_candidate().is_some());
        assert!(generator.next_candidate().is_some());
        assert!(generator.next_candidate().is_some());
        assert!(generator.next_candidate().is_none());
        assert_eq!(generator.emitted(), 3);
        assert_eq!(generator.size_hint(), Some(3));
    }

    #[test]
    fn test_candidates_are_numeric() {
        let generator = WeightedRandomGenerator::with_seed(Some(2_000), 3);
        while let Some(candidate) = generator.next_candidate() {
            assert!(candidate.len() >= 8 && candidate.len() <= 12, "{}", candidate);
            assert!(candidate.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn test_fork_starts_over() {
        let generator = WeightedRandomGenerator::with_seed(Some(50), 4);
        let first: Vec<_> = std::iter::from_fn(|| generator.next_candidate()).collect();
        assert!(generator.next_candidate().is_none());

        let fork = generator.fork();
        let again: Vec<_> = std::iter::from_fn(|| fork.next_candidate()).collect();
        assert_eq!(again, first);
        assert_eq!(generator.emitted(), 50);
    }

    #[test]
    fn test_seeded_runs_match() {
        let a = WeightedRandomGenerator::with_seed(Some(100), 9);
        let b = WeightedRandomGenerator::with_seed(Some(100), 9);
        let left: Vec<_> = std::iter::from_fn(|| a.next_candidate()).collect();
        let right: Vec<_> = std::iter::from_fn(|| b.next_candidate()).collect();
        assert_eq!(left, right);
    }
}
