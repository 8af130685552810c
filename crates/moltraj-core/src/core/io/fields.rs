//! Helpers for fixed-column and whitespace-separated records.

use super::error::{FormatError, FormatResult, ParseErrorKind};
use super::format::FormatKind;
use std::str::FromStr;

/// The trimmed content of columns `start..end`, clamped to the line length.
pub fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).unwrap_or("").trim()
}

/// The character at column `index`, or a space when the line is shorter.
pub fn column_char(line: &str, index: usize) -> char {
    line.as_bytes().get(index).map_or(' ', |&byte| byte as char)
}

pub fn parse_int<T: FromStr>(value: &str, field: &str) -> Result<T, ParseErrorKind> {
    value.trim().parse().map_err(|_| ParseErrorKind::InvalidInt {
        field: field.to_string(),
        value: value.to_string(),
    })
}

pub fn parse_float(value: &str, field: &str) -> Result<f64, ParseErrorKind> {
    value.trim().parse().map_err(|_| ParseErrorKind::InvalidFloat {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Whether `value` printed with `decimals` digits fits in `width` characters.
pub fn fits_float(value: f64, width: usize, decimals: usize) -> bool {
    value.is_finite() && format!("{value:.decimals$}").len() <= width
}

pub fn fits_int(value: i64, width: usize) -> bool {
    value.to_string().len() <= width
}

/// Fails with `ValueTooWide` when a float would overflow its column.
pub fn check_float_width(
    format: FormatKind,
    value: f64,
    width: usize,
    decimals: usize,
    context: &str,
) -> FormatResult<()> {
    if fits_float(value, width, decimals) {
        Ok(())
    } else {
        Err(FormatError::ValueTooWide {
            format,
            context: format!("{context} ({value}) does not fit in {width} columns"),
        })
    }
}

/// Keeps at most `width` characters of `value`, reporting whether it was cut.
pub fn truncate(value: &str, width: usize) -> (&str, bool) {
    match value.char_indices().nth(width) {
        Some((index, _)) => (&value[..index], true),
        None => (value, false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_and_trim_clamps_to_the_line() {
        assert_eq!(slice_and_trim("ATOM      1  N", 12, 16), "N");
        assert_eq!(slice_and_trim("ATOM", 12, 16), "");
        assert_eq!(column_char("ABC", 1), 'B');
        assert_eq!(column_char("ABC", 10), ' ');
    }

    #[test]
    fn parse_helpers_name_the_field() {
        assert_eq!(parse_int::<i64>(" 42 ", "serial"), Ok(42));
        let error = parse_float("1.2.3", "x coordinate").unwrap_err();
        assert_eq!(error.to_string(), "invalid number for x coordinate (value: '1.2.3')");
    }

    #[test]
    fn width_checks_use_the_printed_representation() {
        assert!(fits_float(-999.999, 8, 3));
        assert!(!fits_float(-10000.0, 8, 3));
        assert!(!fits_float(f64::NAN, 8, 3));
        assert!(fits_int(99999, 5));
        assert!(!fits_int(100000, 5));
        assert!(check_float_width(FormatKind::Pdb, 123456.0, 8, 3, "x coordinate").is_err());
    }

    #[test]
    fn truncate_reports_cut_values() {
        assert_eq!(truncate("ABCDE", 4), ("ABCD", true));
        assert_eq!(truncate("AB", 4), ("AB", false));
    }
}
