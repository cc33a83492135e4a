//! Spreadsheet column letters ↔ zero-based positions

use crate::error::{EtlError, EtlResult};
use crate::types::ColumnWindow;
use regex::Regex;
use std::sync::OnceLock;

/// Last column Excel can address (XFD)
pub const MAX_COLUMN: usize = 16_383;

fn letters_pattern() -> Result<&'static Regex, String> {
    static PATTERN: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z]+$"))
        .as_ref()
        .map_err(|e| format!("regex error: {}", e))
}

/// Parse a range expression like `"A:D"` into the window `[0, 1, 2, 3]`.
///
/// Letters are case-insensitive and both ends are inclusive.
pub fn parse_column_range(expression: &str) -> EtlResult<ColumnWindow> {
    let trimmed = expression.trim();
    let separators = trimmed.matches(':').count();
    if separators != 1 {
        return Err(EtlError::range(
            expression,
            format!("expected exactly one ':' separator, found {}", separators),
        ));
    }

    let (start, end) = trimmed
        .split_once(':')
        .ok_or_else(|| EtlError::range(expression, "missing ':' separator"))?;

    let first = letters_to_index(start.trim())
        .map_err(|reason| EtlError::range(expression, format!("start {}", reason)))?;
    let last = letters_to_index(end.trim())
        .map_err(|reason| EtlError::range(expression, format!("end {}", reason)))?;

    if first > last {
        return Err(EtlError::range(
            expression,
            format!(
                "start column {} comes after end column {}",
                index_to_letters(first),
                index_to_letters(last)
            ),
        ));
    }

    Ok(ColumnWindow::contiguous(first, last))
}

/// Convert column letters to a zero-based position (A→0, Z→25, AA→26)
pub fn column_letters_to_index(letters: &str) -> EtlResult<usize> {
    letters_to_index(letters).map_err(|reason| EtlError::range(letters, reason))
}

fn letters_to_index(letters: &str) -> Result<usize, String> {
    if !letters_pattern()?.is_match(letters) {
        return Err(format!("'{}' is not a column letter sequence", letters));
    }

    let mut value: usize = 0;
    for c in letters.bytes() {
        let digit = (c.to_ascii_uppercase() - b'A') as usize + 1;
        value = value
            .checked_mul(26)
            .and_then(|v| v.checked_add(digit))
            .filter(|v| *v <= MAX_COLUMN + 1)
            .ok_or_else(|| format!("'{}' is beyond the last column XFD", letters))?;
    }

    Ok(value - 1)
}

/// Convert a zero-based position to column letters (0→A, 25→Z, 26→AA)
pub fn index_to_letters(n: usize) -> String {
    let mut result = String::new();
    let mut num = n;

    loop {
        let remainder = num % 26;
        result.insert(0, (b'A' + remainder as u8) as char);
        if num < 26 {
            break;
        }
        num = num / 26 - 1;
    }

    result
}
