//! Memory Size Parser
//!
//! Parses human-readable budgets such as `"1KB"` or `"512mb"` into bytes.

use thiserror::Error;
use tracing::debug;

// == Units ==
/// Recognized suffixes and their binary multipliers.
const UNITS: [(&str, u64); 4] = [
    ("KB", 1 << 10),
    ("MB", 1 << 20),
    ("GB", 1 << 30),
    ("TB", 1 << 40),
];

// == Size Parse Error ==
/// Reasons a memory size string is rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SizeParseError {
    #[error("memory size '{0}' has no recognized unit (KB, MB, GB, TB)")]
    UnknownUnit(String),

    #[error("memory size '{0}' doesn't contain any number")]
    MissingNumber(String),

    #[error("memory size '{input}' has an invalid number: {reason}")]
    InvalidNumber { input: String, reason: String },

    #[error("memory size '{0}' does not fit in 64 bits")]
    Overflow(String),
}

// == Parse ==
/// Parses `text` into a byte count.
///
/// The number must be plain ASCII digits directly followed by one of
/// `KB`, `MB`, `GB` or `TB` (any case). Multiples are binary, so `1KB` is 1024.
pub fn parse_memory_size(text: &str) -> Result<u64, SizeParseError> {
    let split = text.len().checked_sub(2).filter(|&i| text.is_char_boundary(i));
    let Some(split) = split else {
        return Err(SizeParseError::UnknownUnit(text.to_string()));
    };

    let (digits, suffix) = text.split_at(split);
    let multiplier = UNITS
        .iter()
        .find(|(unit, _)| suffix.eq_ignore_ascii_case(unit))
        .map(|&(_, multiplier)| multiplier)
        .ok_or_else(|| SizeParseError::UnknownUnit(text.to_string()))?;

    if digits.is_empty() {
        return Err(SizeParseError::MissingNumber(text.to_string()));
    }

    // u64::from_str accepts a leading '+', we don't
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SizeParseError::InvalidNumber {
            input: text.to_string(),
            reason: format!("'{}' is not an unsigned integer", digits),
        });
    }

    let number: u64 = digits
        .parse()
        .map_err(|e: std::num::ParseIntError| SizeParseError::InvalidNumber {
            input: text.to_string(),
            reason: e.to_string(),
        })?;

    let bytes = number
        .checked_mul(multiplier)
        .ok_or_else(|| SizeParseError::Overflow(text.to_string()))?;

    debug!("Parsed memory size '{}' as {} bytes", text, bytes);
    Ok(bytes)
}
