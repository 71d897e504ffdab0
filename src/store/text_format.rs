use std::path::Path;

use chrono::NaiveDateTime;

use crate::error::{EtaError, Result};

/// `YYYY-MM-DD HH:MM:SS.ffffff`, always six fractional digits.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Counts are whole numbers in practice, so they are written without a
/// fractional part when they have none.
pub fn format_count(count: f64) -> String {
    if count.fract() == 0.0 && count.abs() < 1e15 {
        format!("{count:.0}")
    } else {
        count.to_string()
    }
}

pub fn encode_lines<T>(values: &[T], fmt: impl Fn(&T) -> String) -> String {
    let mut out = String::new();
    for v in values {
        out.push_str(&fmt(v));
        out.push('\n');
    }
    out
}

/// Parse one value per non-blank line. Errors carry the 1-based line number.
fn decode_lines<T>(
    path: &Path,
    content: &str,
    parse: impl Fn(&str) -> std::result::Result<T, String>,
) -> Result<Vec<T>> {
    let mut values = Vec::new();
    for (i, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let value = parse(line).map_err(|reason| EtaError::ParseFailure {
            path: path.to_path_buf(),
            line: i + 1,
            value: line.to_string(),
            reason,
        })?;
        values.push(value);
    }
    Ok(values)
}

pub fn decode_timestamps(path: &Path, content: &str) -> Result<Vec<NaiveDateTime>> {
    decode_lines(path, content, |line| {
        let ts = NaiveDateTime::parse_from_str(line, TIMESTAMP_FORMAT).map_err(|e| e.to_string())?;
        // chrono accepts a short or missing fraction here; the file format does not.
        if format_timestamp(&ts) != line {
            return Err("expected YYYY-MM-DD HH:MM:SS.ffffff".to_string());
        }
        Ok(ts)
    })
}

/// Accepts any float spelling, including the `9.000000000000000000e+01`
/// form older files were written in.
pub fn decode_counts(path: &Path, content: &str) -> Result<Vec<f64>> {
    decode_lines(path, content, |line| {
        let count: f64 = line.parse().map_err(|e: std::num::ParseFloatError| e.to_string())?;
        if count.is_finite() {
            Ok(count)
        } else {
            Err("count is not finite".to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn path() -> &'static Path {
        Path::new("data/timestamps.txt")
    }

    #[test]
    fn test_timestamp_always_has_six_fraction_digits() {
        let ts = NaiveDate::from_ymd_opt(2016, 5, 4)
            .unwrap()
            .and_hms_opt(13, 7, 9)
            .unwrap();
        assert_eq!(format_timestamp(&ts), "2016-05-04 13:07:09.000000");

        let ts = NaiveDate::from_ymd_opt(2016, 5, 4)
            .unwrap()
            .and_hms_micro_opt(13, 7, 9, 42)
            .unwrap();
        assert_eq!(format_timestamp(&ts), "2016-05-04 13:07:09.000042");
    }

    #[test]
    fn test_decode_timestamps_exact_format() {
        let content = "2016-05-04 13:07:09.123456\n2016-05-04 13:17:09.000001\n";
        let ts = decode_timestamps(path(), content).unwrap();
        assert_eq!(ts.len(), 2);
        assert_eq!(format_timestamp(&ts[0]), "2016-05-04 13:07:09.123456");
        assert_eq!(format_timestamp(&ts[1]), "2016-05-04 13:17:09.000001");
    }

    #[test]
    fn test_decode_timestamps_rejects_missing_fraction() {
        let content = "2016-05-04 13:07:09.123456\n2016-05-04 13:17:09\n";
        match decode_timestamps(path(), content) {
            Err(EtaError::ParseFailure { line, value, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(value, "2016-05-04 13:17:09");
            }
            other => panic!("expected parse failure, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_timestamps_rejects_other_layouts() {
        assert!(decode_timestamps(path(), "2016-05-04T13:07:09.123456\n").is_err());
        assert!(decode_timestamps(path(), "2016-05-04 13:07:09.123\n").is_err());
        assert!(decode_timestamps(path(), "04/05/2016 13:07:09.123456\n").is_err());
    }

    #[test]
    fn test_decode_counts_accepts_scientific_notation() {
        let content = "9.000000000000000000e+01\n80\n72.5\n\n";
        let counts = decode_counts(Path::new("data/uploads.txt"), content).unwrap();
        assert_eq!(counts, vec![90.0, 80.0, 72.5]);
    }

    #[test]
    fn test_decode_counts_rejects_garbage_and_nan() {
        assert!(decode_counts(Path::new("u"), "ninety\n").is_err());
        assert!(decode_counts(Path::new("u"), "NaN\n").is_err());
    }

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(90.0), "90");
        assert_eq!(format_count(0.0), "0");
        assert_eq!(format_count(72.5), "72.5");
        assert_eq!(format_count(-3.0), "-3");
    }

    #[test]
    fn test_encode_lines_trailing_newline() {
        let out = encode_lines(&[1.0, 2.0], |c| format_count(*c));
        assert_eq!(out, "1\n2\n");
        assert_eq!(encode_lines::<f64>(&[], |c| format_count(*c)), "");
    }
}
