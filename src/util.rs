use crate::config::{MAX_CHANNEL, MAX_UNIVERSE};
use log::trace;
use thiserror::Error;
use url::Url;

/// Longest value the operator may type into a field.
pub(crate) const INPUT_CHAR_LIMIT: usize = 120;

/// Why an edit buffer cannot be committed. Shown next to the field, never fatal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("not a number")]
    NotANumber,

    #[error("input out of range ({min}-{max})")]
    OutOfRange { min: u16, max: u16 },

    #[error("url invalid")]
    InvalidUrl,
}

/// Parses an unsigned decimal integer within `min..=max`.
///
/// Only ASCII digits are accepted, so `+5` or ` 5` are rejected rather than
/// silently normalised.
pub fn parse_bounded(input: &str, min: u16, max: u16) -> Result<u16, ValidationError> {
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::NotANumber);
    }
    // Anything too long for u64 is out of range anyway.
    let value: u64 = input.parse().map_err(|_| ValidationError::OutOfRange { min, max })?;
    if value < u64::from(min) || value > u64::from(max) {
        trace!("parse_bounded: {} outside {}..={}", value, min, max);
        return Err(ValidationError::OutOfRange { min, max });
    }
    Ok(value as u16)
}

pub fn validate_universe(input: &str) -> Result<u16, ValidationError> {
    parse_bounded(input, 1, MAX_UNIVERSE)
}

pub fn validate_channel(input: &str) -> Result<u16, ValidationError> {
    parse_bounded(input, 1, MAX_CHANNEL)
}

/// Accepts absolute `http`/`https` URLs with a host, e.g. `http://127.0.0.1:8888`.
pub fn validate_host_url(input: &str) -> Result<String, ValidationError> {
    if input.trim() != input {
        return Err(ValidationError::InvalidUrl);
    }
    let url = Url::parse(input).map_err(|_| ValidationError::InvalidUrl)?;
    let scheme_ok = matches!(url.scheme(), "http" | "https");
    let host_ok = url.host_str().is_some_and(|h| !h.is_empty());
    if !scheme_ok || !host_ok {
        return Err(ValidationError::InvalidUrl);
    }
    Ok(input.to_string())
}

/// Moves a numeric buffer by one step. Returns `None` when the buffer does not
/// hold a number; stepping down stops at 1.
pub(crate) fn step_numeric(input: &str, up: bool) -> Option<String> {
    let value: u64 = input.parse().ok()?;
    if up {
        Some(value.saturating_add(1).to_string())
    } else if value > 1 {
        Some((value - 1).to_string())
    } else {
        None
    }
}
