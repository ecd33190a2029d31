/*!
 * Exhaustive shortlex enumeration
 *
 * Every string over the alphabet with length in `min_len..=max_len`, shortest
 * first and lexicographic (by alphabet order) within a length. Workers share a
 * single atomic cursor into the index space, so no candidate is handed out
 * twice and no call stack grows with the length.
 */

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::Generator;
use crate::error::{Error, Result};

pub const DIGITS: &str = "0123456789";

#[derive(Debug)]
pub struct ExhaustiveGenerator {
    alphabet: Vec<char>,
    min_len: usize,
    max_len: usize,
    total: u64,
    cursor: AtomicU64,
}

impl ExhaustiveGenerator {
    pub fn new(alphabet: &str, min_len: usize, max_len: usize) -> Result<Self> {
        let symbols: Vec<char> = alphabet.chars().collect();
        if symbols.is_empty() {
            return Err(Error::EmptyAlphabet);
        }
        let mut unique = HashSet::with_capacity(symbols.len());
        if let Some(&dup) = symbols.iter().find(|c| !unique.insert(**c)) {
            return Err(Error::DuplicateSymbol(dup));
        }
        if min_len > max_len {
            return Err(Error::InvalidLengthRange {
                min: min_len,
                max: max_len,
            });
        }

        let radix = symbols.len();
        let too_large = Error::KeyspaceTooLarge {
            radix,
            max: max_len,
        };
        let mut total: u64 = 0;
        for len in min_len..=max_len {
            let count = u32::try_from(len)
                .ok()
                .and_then(|len| (radix as u64).checked_pow(len));
            total = match count.and_then(|count| total.checked_add(count)) {
                Some(total) => total,
                None => return Err(too_large),
            };
        }

        Ok(Self {
            alphabet: symbols,
            min_len,
            max_len,
            total,
            cursor: AtomicU64::new(0),
        })
    }

    /// Decimal digits, the common case.
    pub fn digits(min_len: usize, max_len: usize) -> Result<Self> {
        Self::new(DIGITS, min_len, max_len)
    }

    /// Size of the whole keyspace.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Candidate at a shortlex position, or `None` past the end.
    pub fn candidate_at(&self, index: u64) -> Option<String> {
        let radix = self.alphabet.len() as u64;
        let mut offset = index;
        for len in self.min_len..=self.max_len {
            let count = radix.pow(len as u32);
            if offset < count {
                return Some(self.render(offset, len));
            }
            offset -= count;
        }
        None
    }

    fn render(&self, mut offset: u64, len: usize) -> String {
        let radix = self.alphabet.len() as u64;
        let mut buffer = vec![self.alphabet[0]; len];
        for slot in buffer.iter_mut().rev() {
            *slot = self.alphabet[(offset % radix) as usize];
            offset /= radix;
        }
        buffer.into_iter().collect()
    }
}

impl Generator for ExhaustiveGenerator {
    fn next_candidate(&self) -> Option<String> {
        let total = self.total;
        let index = self
            .cursor
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |i| {
                (i < total).then_some(i + 1)
            })
            .ok()?;
        self.candidate_at(index)
    }

    fn size_hint(&self) -> Option<u64> {
        Some(self.total)
    }

    fn fork(&self) -> Arc<dyn Generator> {
        Arc::new(Self {
            alphabet: self.alphabet.clone(),
            min_len: self.min_len,
            max_len: self.max_len,
            total: self.total,
            cursor: AtomicU64::new(0),
        })
    }
}
