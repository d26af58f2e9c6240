//! Daily sequential business keys.
//!
//! # Purpose
//! Produces human-readable identifiers of the form `PREFIX-YYYYMMDD-NNNN`
//! for roles and profile mappings. The numeric suffix restarts at `0001` on
//! every UTC calendar day.
//!
//! # Key invariants
//! - The date component is always derived from UTC, so day boundaries do not
//!   depend on the host time zone.
//! - The suffix is exactly [`SEQUENCE_WIDTH`] digits. Lexicographic order of
//!   keys under one day prefix therefore equals numeric order.
//! - Keys whose suffix does not parse are ignored when computing the next
//!   value; they never reset numbering.
//! - Past [`MAX_SEQUENCE`] allocation fails closed with
//!   [`SequenceError::Exhausted`].
//!
//! # Concurrency
//! Everything here is a pure function. Store backends are responsible for
//! running "read high-water mark, compute next, insert" as one atomic unit.
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// Number of digits in the zero-padded sequence suffix.
pub const SEQUENCE_WIDTH: usize = 4;

/// Largest sequence number representable in [`SEQUENCE_WIDTH`] digits.
pub const MAX_SEQUENCE: u32 = 9_999;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SequenceError {
    #[error("sequence exhausted for {day_prefix}: {sequence} exceeds {MAX_SEQUENCE}")]
    Exhausted { day_prefix: String, sequence: u32 },
}

/// Entity tag that starts every business key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPrefix {
    Role,
    ProfileMapping,
}

impl KeyPrefix {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyPrefix::Role => "ROLE",
            KeyPrefix::ProfileMapping => "MAP",
        }
    }
}

impl fmt::Display for KeyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entity tag plus UTC calendar date, e.g. `ROLE-20261016`.
///
/// This is the uniqueness scope of a sequence number: two keys collide only
/// if they share a day prefix and a suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayPrefix {
    prefix: KeyPrefix,
    value: String,
}

impl DayPrefix {
    /// Derive the day prefix for `now`, read once by the caller at allocation time.
    pub fn new(prefix: KeyPrefix, now: DateTime<Utc>) -> Self {
        Self {
            prefix,
            value: format!("{}-{}", prefix.as_str(), now.format("%Y%m%d")),
        }
    }

    pub fn prefix(&self) -> KeyPrefix {
        self.prefix
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Anchored Postgres regex matching only well-formed keys under this prefix.
    ///
    /// The prefix alphabet is `[A-Z0-9-]`, so it needs no escaping.
    pub fn key_pattern(&self) -> String {
        format!("^{}-[0-9]{{{SEQUENCE_WIDTH}}}$", self.value)
    }

    /// Parse the numeric suffix of `key` if it belongs to this day prefix.
    ///
    /// Returns `None` for keys from another prefix or day, and for malformed
    /// suffixes (wrong width, non-digits, extra segments).
    pub fn parse_sequence(&self, key: &str) -> Option<u32> {
        let suffix = key.strip_prefix(self.value.as_str())?.strip_prefix('-')?;
        if suffix.len() != SEQUENCE_WIDTH || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }

    /// Render the full business key for `sequence`.
    ///
    /// # Errors
    /// - [`SequenceError::Exhausted`] when `sequence` does not fit the fixed width.
    pub fn key(&self, sequence: u32) -> Result<String, SequenceError> {
        if sequence > MAX_SEQUENCE {
            return Err(SequenceError::Exhausted {
                day_prefix: self.value.clone(),
                sequence,
            });
        }
        Ok(format!("{}-{:0width$}", self.value, sequence, width = SEQUENCE_WIDTH))
    }

    /// Highest well-formed sequence among `keys`, skipping anything unparsable.
    pub fn max_sequence<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Option<u32> {
        keys.into_iter()
            .filter_map(|key| self.parse_sequence(key))
            .max()
    }
}

impl fmt::Display for DayPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Next sequence number given the persisted high-water mark and the highest
/// suffix currently stored under the day prefix.
///
/// Taking the maximum of both keeps numbers from being reissued after the
/// newest record is deleted, and tolerates rows written before the
/// high-water mark existed.
pub fn next_sequence(high_water: Option<u32>, stored_max: Option<u32>) -> u32 {
    high_water.max(stored_max).map_or(1, |last| last.saturating_add(1))
}

/// Allocate the next business key for `day` in one step.
///
/// # Errors
/// - [`SequenceError::Exhausted`] when the day has used every suffix.
pub fn allocate(
    day: &DayPrefix,
    high_water: Option<u32>,
    stored_max: Option<u32>,
) -> Result<(u32, String), SequenceError> {
    let sequence = next_sequence(high_water, stored_max);
    let key = issue(day, sequence)?;
    Ok((sequence, key))
}

/// Render a sequence number the caller has already reserved.
///
/// The key is not counted as issued until its record is stored; see
/// [`record_issued`].
///
/// # Errors
/// - [`SequenceError::Exhausted`] when `sequence` does not fit the fixed width.
pub fn issue(day: &DayPrefix, sequence: u32) -> Result<String, SequenceError> {
    let key = day.key(sequence)?;
    tracing::debug!(day_prefix = %day, sequence, "reserved business key");
    Ok(key)
}

/// Count a business key whose record has been stored.
pub fn record_issued(prefix: KeyPrefix) {
    metrics::counter!(
        "backoffice_business_keys_allocated_total",
        "prefix" => prefix.as_str()
    )
    .increment(1);
}
