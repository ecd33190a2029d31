/*!
 * Materialized candidate lists
 *
 * Each builder returns candidates in priority order with duplicates removed.
 */

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use tracing::debug;

use super::dedup_stable;
use crate::error::{Error, Result};

/// Extremely common credentials, tried before anything else.
pub const COMMON_PASSWORDS: &[&str] = &[
    "12345678",
    "00000000",
    "11111111",
    "12341234",
    "12344321",
    "11223344",
    "87654321",
    "12121212",
    "12312312",
    "10041004",
    "20002000",
    "20202020",
    "123456789",
    "1234567890",
    "88888888",
    "password",
    "qwertyui",
    "iloveyou",
    "admin123",
    "password1",
];

/// Suffixes appended to the cleaned network name.
const NAME_SUFFIXES: &[&str] = &["123", "1234", "2023", "2024"];

const NAME_WINDOW: usize = 8;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9]").expect("valid regex"));

static ADDRESS_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[:\-.\s]").expect("valid regex"));

static HEX_ONLY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-f]+$").expect("valid regex"));

pub fn common_passwords() -> Vec<String> {
    dedup_stable(COMMON_PASSWORDS.iter().map(|s| s.to_string()).collect())
}

/// Transforms of the target's public name.
///
/// The name is reduced to lower-case ASCII alphanumerics; an empty result
/// yields no candidates.
pub fn name_candidates(name: &str) -> Vec<String> {
    let clean = NON_ALPHANUMERIC.replace_all(name, "").to_lowercase();
    if clean.is_empty() {
        return Vec::new();
    }

    let mut out = vec![clean.clone()];
    out.extend(NAME_SUFFIXES.iter().map(|suffix| format!("{clean}{suffix}")));
    out.push(format!("1{clean}"));
    out.push(format!("{clean}wifi"));

    // Windows of up to 8 characters at every second position.
    for start in (0..clean.len()).step_by(2) {
        let end = (start + NAME_WINDOW).min(clean.len());
        out.push(clean[start..end].to_string());
    }

    dedup_stable(out)
}

/// Transforms of the hardware address: last 6 hex chars, first 6, full.
///
/// Separators are stripped and the address is lower-cased. Anything that is
/// not at least 6 hex characters yields no candidates.
pub fn hardware_candidates(address: &str) -> Vec<String> {
    let hex = ADDRESS_SEPARATORS.replace_all(address, "").to_lowercase();
    if hex.len() < 6 || !HEX_ONLY.is_match(&hex) {
        debug!(address, "hardware address not usable for candidates");
        return Vec::new();
    }

    dedup_stable(vec![
        hex[hex.len() - 6..].to_string(),
        hex[..6].to_string(),
        hex.clone(),
    ])
}

/// Name-derived then hardware-derived candidates.
pub fn identity_candidates(name: &str, hardware: Option<&str>) -> Vec<String> {
    let mut out = name_candidates(name);
    if let Some(address) = hardware {
        out.extend(hardware_candidates(address));
    }
    dedup_stable(out)
}

/// Year and day ranges for the date list.
#[derive(Debug, Clone)]
pub struct DateRules {
    pub first_year: u16,
    pub last_year: u16,
    /// Only every Nth day of each month is used across the full year range.
    pub day_stride: u32,
    /// Years that get every calendar day.
    pub birth_years: Vec<u16>,
}

impl Default for DateRules {
    fn default() -> Self {
        Self {
            first_year: 1950,
            last_year: 2030,
            day_stride: 3,
            birth_years: vec![
                1975, 1980, 1985, 1988, 1990, 1992, 1995, 1998, 2000, 2005,
            ],
        }
    }
}

fn ddmmyyyy(year: u16, month: u32, day: u32) -> Option<String> {
    NaiveDate::from_ymd_opt(year as i32, month, day).map(|d| d.format("%d%m%Y").to_string())
}

/// Date-shaped candidates.
///
/// Order: `YYYYYYYY` for every year, then sparse `DDMMYYYY` over the whole
/// range, then every day of the birth years. Impossible dates are skipped.
pub fn date_candidates(rules: &DateRules) -> Result<Vec<String>> {
    if rules.first_year > rules.last_year {
        return Err(Error::InvalidYearRange {
            first: rules.first_year,
            last: rules.last_year,
        });
    }
    let stride = rules.day_stride.max(1) as usize;
    let years = rules.first_year..=rules.last_year;

    let mut out: Vec<String> = years.clone().map(|y| format!("{y:04}{y:04}")).collect();

    for year in years {
        for month in 1..=12 {
            out.extend((1..=31).step_by(stride).filter_map(|day| ddmmyyyy(year, month, day)));
        }
    }

    for &year in &rules.birth_years {
        for month in 1..=12 {
            out.extend((1..=31).filter_map(|day| ddmmyyyy(year, month, day)));
        }
    }

    Ok(dedup_stable(out))
}

fn ascii(bytes: &[u8]) -> String {
    bytes.iter().copied().map(char::from).collect()
}

/// Digit patterns.
///
/// `ABABABAB` and `AABBAABB` for every ordered pair of distinct digits (180
/// entries), optionally `ABCABCAB` for distinct triples, then repeated digits
/// and ascending/descending runs.
pub fn pattern_candidates(include_triples: bool) -> Vec<String> {
    let mut out = Vec::with_capacity(1000);

    for a in b'0'..=b'9' {
        for b in b'0'..=b'9' {
            if a == b {
                continue;
            }
            out.push(ascii(&[a, b, a, b, a, b, a, b]));
            out.push(ascii(&[a, a, b, b, a, a, b, b]));
        }
    }

    if include_triples {
        for a in b'0'..=b'9' {
            for b in b'0'..=b'9' {
                for c in b'0'..=b'9' {
                    if a == b || b == c || a == c {
                        continue;
                    }
                    out.push(ascii(&[a, b, c, a, b, c, a, b]));
                }
            }
        }
    }

    for digit in 0..=9 {
        out.push(digit.to_string().repeat(8));
    }

    for start in 0..=2u32 {
        let run: String = (start..start + 8).map(|d| char::from(b'0' + d as u8)).collect();
        out.push(run.chars().rev().collect());
        out.push(run);
    }

    dedup_stable(out)
}

/// Dictionary from any ordered line source, capped at `limit` lines.
///
/// Lines are trimmed and blanks skipped; file order is kept as priority.
pub fn dictionary_from_lines<I>(lines: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let words = lines
        .into_iter()
        .take(limit)
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    dedup_stable(words)
}

/// Dictionary from a line-oriented file.
///
/// A missing or unreadable file yields an empty list.
pub fn dictionary_from_path(path: &Path, limit: usize) -> Vec<String> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "dictionary unavailable");
            return Vec::new();
        }
    };

    let reader = BufReader::new(file);
    dictionary_from_lines(reader.lines().map_while(std::result::Result::ok), limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_common_passwords_order() {
        let list = common_passwords();
        assert_eq!(list[0], "12345678");
        assert_eq!(list[1], "00000000");
        assert_eq!(list.len(), COMMON_PASSWORDS.len());
    }

    #[test]
    fn test_name_candidates() {
        let list = name_candidates("MyHome_5G");
        assert_eq!(list[0], "myhome5g");
        assert!(list.contains(&"myhome5g123".to_string()));
        assert!(list.contains(&"myhome5g1234".to_string()));
        assert!(list.contains(&"1myhome5g".to_string()));
        assert!(list.contains(&"myhome5gwifi".to_string()));
        assert!(list.contains(&"home5g".to_string()));
    }

    #[test]
    fn test_name_windows() {
        let list = name_candidates("abcdefghijkl");
        assert!(list.contains(&"abcdefgh".to_string()));
        assert!(list.contains(&"cdefghij".to_string()));
        assert!(list.contains(&"efghijkl".to_string()));
        assert!(list.contains(&"kl".to_string()));
    }

    #[test]
    fn test_name_without_alphanumerics() {
        assert!(name_candidates("__ --").is_empty());
    }

    #[test]
    fn test_hardware_candidates() {
        let list = hardware_candidates("AA:BB:CC:11:22:33");
        assert_eq!(list, vec!["112233", "aabbcc", "aabbcc112233"]);

        let dashed = hardware_candidates("aa-bb-cc-11-22-33");
        assert_eq!(dashed, list);
    }

    #[test]
    fn test_hardware_rejects_garbage() {
        assert!(hardware_candidates("not a mac").is_empty());
        assert!(hardware_candidates("ab:cd").is_empty());
    }

    #[test]
    fn test_identity_combines_sources() {
        let list = identity_candidates("Net", Some("00:11:22:33:44:55"));
        assert_eq!(list[0], "net");
        assert!(list.contains(&"001122334455".to_string()));
    }

    #[test]
    fn test_dates() {
        let rules = DateRules {
            first_year: 1999,
            last_year: 2000,
            day_stride: 10,
            birth_years: vec![1990],
        };
        let list = date_candidates(&rules).unwrap();
        assert_eq!(list[0], "19991999");
        assert_eq!(list[1], "20002000");
        assert!(list.contains(&"01011999".to_string()));
        assert!(list.contains(&"11052000".to_string()));
        // Stride 10 skips the 2nd outside birth years.
        assert!(!list.contains(&"02011999".to_string()));
        // Birth years get every day, invalid dates never appear.
        assert!(list.contains(&"02011990".to_string()));
        assert!(list.contains(&"31121990".to_string()));
        assert!(!list.contains(&"30021990".to_string()));
    }

    #[test]
    fn test_dates_reject_inverted_range() {
        let rules = DateRules {
            first_year: 2001,
            last_year: 2000,
            ..DateRules::default()
        };
        assert!(date_candidates(&rules).is_err());
    }

    #[test]
    fn test_pair_patterns() {
        let list = pattern_candidates(false);
        let pairs: Vec<_> = list.iter().take(180).collect();
        assert_eq!(pairs.len(), 180);
        assert!(list.contains(&"01010101".to_string()));
        assert!(list.contains(&"00110011".to_string()));
        assert!(list.contains(&"98989898".to_string()));
        assert!(!list.iter().any(|p| p.starts_with("012012")));
        assert!(list.contains(&"77777777".to_string()));
        assert!(list.contains(&"12345678".to_string()));
        assert!(list.contains(&"76543210".to_string()));
    }

    #[test]
    fn test_triple_patterns() {
        let list = pattern_candidates(true);
        assert!(list.contains(&"12312312".to_string()));
        assert!(list.iter().all(|p| p.len() == 8));
    }

    #[test]
    fn test_dictionary_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "  second  ").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "first").unwrap();
        writeln!(file, "fourth").unwrap();
        writeln!(file, "beyond-limit").unwrap();

        let words = dictionary_from_path(file.path(), 5);
        assert_eq!(words, vec!["first", "second", "fourth"]);
    }

    #[test]
    fn test_missing_dictionary_is_empty() {
        let words = dictionary_from_path(Path::new("/nonexistent/words.txt"), 10);
        assert!(words.is_empty());
    }
}
