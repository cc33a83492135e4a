//! Period tokens embedded in extract file names
//!
//! Extracts are named `<prefix>.<year>.<month>.<day>.<extension>`, for example
//! `AvanceVentasINTI.2023.05.10.xlsx`.

use crate::error::{EtlError, EtlResult};
use crate::types::FileDate;
use chrono::NaiveDate;

const MIN_SEGMENTS: usize = 5;

/// Take year, month and day from a file name, literally.
///
/// Tokens are not padded or range-checked; `"2023.13.99"` is accepted.
pub fn extract_file_date(file_name: &str) -> EtlResult<FileDate> {
    let segments: Vec<&str> = file_name.split('.').collect();
    if segments.len() < MIN_SEGMENTS {
        return Err(EtlError::filename(
            file_name,
            format!(
                "expected at least {} '.'-separated segments, found {}",
                MIN_SEGMENTS,
                segments.len()
            ),
        ));
    }

    Ok(FileDate::new(segments[1], segments[2], segments[3]))
}

/// Like [`extract_file_date`], but the tokens must also form a real calendar date.
pub fn extract_calendar_date(file_name: &str) -> EtlResult<FileDate> {
    let date = extract_file_date(file_name)?;
    to_naive_date(&date).map_err(|reason| EtlError::filename(file_name, reason))?;
    Ok(date)
}

fn to_naive_date(date: &FileDate) -> Result<NaiveDate, String> {
    let year: i32 = date
        .year
        .parse()
        .map_err(|_| format!("year '{}' is not a number", date.year))?;
    let month: u32 = date
        .month
        .parse()
        .map_err(|_| format!("month '{}' is not a number", date.month))?;
    let day: u32 = date
        .day
        .parse()
        .map_err(|_| format!("day '{}' is not a number", date.day))?;

    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| format!("{} is not a calendar date", date))
}
