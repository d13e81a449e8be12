//! Reference number generation.

use super::{StoreError, StoreResult};

pub const REFERENCE_PREFIX: &str = "CLR-";

const REFERENCE_SPACE: i64 = 1_000_000;

/// Generate a `CLR-######` reference from the last six digits of
/// `now_millis`, stepping forward past any number already taken.
pub fn generate_reference<F>(now_millis: i64, is_taken: F) -> StoreResult<String>
where
    F: Fn(&str) -> bool,
{
    let start = now_millis.rem_euclid(REFERENCE_SPACE);
    for step in 0..REFERENCE_SPACE {
        let candidate = format_reference((start + step) % REFERENCE_SPACE);
        if !is_taken(&candidate) {
            return Ok(candidate);
        }
    }
    Err(StoreError::ReferenceSpaceExhausted)
}

fn format_reference(n: i64) -> String {
    format!("{}{:06}", REFERENCE_PREFIX, n)
}

/// Check that a string looks like `CLR-` followed by six digits.
pub fn is_reference(s: &str) -> bool {
    s.strip_prefix(REFERENCE_PREFIX)
        .is_some_and(|digits| digits.len() == 6 && digits.bytes().all(|b| b.is_ascii_digit()))
}
