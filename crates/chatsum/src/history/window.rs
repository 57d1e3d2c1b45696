//! Window selection: which slice of a conversation gets summarized.
//!
//! The argument grammar accepted by `/sum` is:
//!
//! | Argument | Window |
//! |----------|--------|
//! | *(empty)* | [`Window::All`] |
//! | `<N>m` / `<N>h` | [`Window::Since`] the last N minutes / hours |
//! | `<N>` | [`Window::Last`] N lines |
//!
//! The duration form is always tried first, so `5m` is never read as a
//! malformed count.

use std::fmt;
use std::num::NonZeroUsize;

use chrono::TimeDelta;

/// Grammar shown to the user when an argument is rejected.
pub const WINDOW_GRAMMAR: &str = "[<N>m|<N>h|<N>]";

/// A selection rule applied to a conversation's stored history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// Every stored record.
    All,
    /// Records with `timestamp >= now - duration`.
    Since(TimeDelta),
    /// The final `n` records (or fewer if less are stored).
    Last(NonZeroUsize),
}

/// Why a window argument was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowParseError {
    #[error("line count must be a positive integer, got {0}; expected {g}", g = WINDOW_GRAMMAR)]
    NonPositiveCount(String),
    #[error("time window '{0}' is too large; expected {g}", g = WINDOW_GRAMMAR)]
    OutOfRange(String),
    #[error("invalid window '{0}'; expected {g}", g = WINDOW_GRAMMAR)]
    Invalid(String),
}

impl Window {
    /// Parse a `/sum` argument. `None` and blank strings select everything.
    pub fn parse(arg: Option<&str>) -> Result<Self, WindowParseError> {
        let arg = arg.map(str::trim).unwrap_or_default();
        if arg.is_empty() {
            return Ok(Window::All);
        }

        if let Some(window) = parse_duration(arg)? {
            return Ok(window);
        }
        parse_count(arg)
    }

    /// Count-bounded window. Zero and negative counts are rejected.
    pub fn last(n: i64) -> Result<Self, WindowParseError> {
        usize::try_from(n)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(Window::Last)
            .ok_or_else(|| WindowParseError::NonPositiveCount(n.to_string()))
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::All => write!(f, "all history"),
            Window::Since(d) if d.num_minutes() % 60 == 0 && d.num_hours() > 0 => {
                write!(f, "last {}h", d.num_hours())
            }
            Window::Since(d) => write!(f, "last {}m", d.num_minutes()),
            Window::Last(n) => write!(f, "last {n} lines"),
        }
    }
}

/// Try the `<digits><m|h>` form. `Ok(None)` means "not this form".
fn parse_duration(arg: &str) -> Result<Option<Window>, WindowParseError> {
    let Some(unit) = arg.chars().last() else {
        return Ok(None);
    };
    let to_delta: fn(i64) -> Option<TimeDelta> = match unit.to_ascii_lowercase() {
        'm' => TimeDelta::try_minutes,
        'h' => TimeDelta::try_hours,
        _ => return Ok(None),
    };
    let digits = arg.strip_suffix(unit).unwrap_or_default();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Ok(None);
    }

    let out_of_range = || WindowParseError::OutOfRange(arg.to_string());
    let n: i64 = digits.parse().map_err(|_| out_of_range())?;
    to_delta(n)
        .map(|d| Some(Window::Since(d)))
        .ok_or_else(out_of_range)
}

/// The `[+|-]<digits>` form. Counts too large for `usize` saturate, which
/// selects the whole history just like any other count past its length.
fn parse_count(arg: &str) -> Result<Window, WindowParseError> {
    let (negative, digits) = match arg.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, arg.strip_prefix('+').unwrap_or(arg)),
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(WindowParseError::Invalid(arg.to_string()));
    }
    if negative || digits.bytes().all(|b| b == b'0') {
        return Err(WindowParseError::NonPositiveCount(arg.to_string()));
    }
    let n = digits.parse::<NonZeroUsize>().unwrap_or(NonZeroUsize::MAX);
    Ok(Window::Last(n))
}
