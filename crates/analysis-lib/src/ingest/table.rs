//! Minimal header-indexed CSV reader
//!
//! The experiment collectors write plain comma-separated files with a header row.
//! Quoted fields (with `""` escapes) are supported; embedded newlines are not.

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

/// A parsed CSV file
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    malformed: usize,
}

impl CsvTable {
    /// Parse `content`; only a malformed header fails, malformed records are counted
    pub fn parse(content: &str) -> Result<Self> {
        let mut lines = content
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !line.trim().is_empty());

        let Some(header) = lines.next() else {
            return Ok(Self::default());
        };
        let headers: Vec<String> = split_record(header)?
            .into_iter()
            .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
            .collect();

        let mut rows = Vec::new();
        let mut malformed = 0;
        for line in lines {
            match split_record(line) {
                Ok(fields) => rows.push(fields),
                Err(_) => malformed += 1,
            }
        }

        Ok(Self {
            headers,
            rows,
            malformed,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Records dropped because they could not be split into fields
    pub fn malformed_rows(&self) -> usize {
        self.malformed
    }

    /// Index of the first header matching any of `names` (case-insensitive)
    pub fn column(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| {
            self.headers
                .iter()
                .position(|header| header.eq_ignore_ascii_case(name))
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(|fields| Row { fields })
    }
}

/// One record of a [`CsvTable`]
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    fields: &'a [String],
}

impl<'a> Row<'a> {
    /// Trimmed field at `index`; `None` when the column is absent or the cell empty
    pub fn get(&self, index: Option<usize>) -> Option<&'a str> {
        index
            .and_then(|i| self.fields.get(i))
            .map(|field| field.trim())
            .filter(|field| !field.is_empty())
    }

    pub fn timestamp(&self, index: Option<usize>) -> Option<DateTime<Utc>> {
        self.get(index).and_then(parse_timestamp)
    }

    /// Finite number, or `None` for blanks and placeholders like `<unknown>` or `NaN`
    pub fn number(&self, index: Option<usize>) -> Option<f64> {
        self.get(index)
            .and_then(|field| field.parse::<f64>().ok())
            .filter(|v| v.is_finite())
    }

    /// Non-negative whole count; tolerates `"3.0"` as written by dataframe tooling
    pub fn count(&self, index: Option<usize>) -> Option<u32> {
        self.number(index)
            .filter(|v| *v >= 0.0 && v.fract() == 0.0 && *v <= u32::MAX as f64)
            .map(|v| v as u32)
    }
}

fn split_record(line: &str) -> Result<Vec<String>> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }

    if in_quotes {
        bail!("unterminated quoted field in line {:?}", line);
    }
    fields.push(field);
    Ok(fields)
}

/// Parse the timestamp encodings the collectors produce
///
/// Accepts RFC 3339, `YYYY-MM-DD[T ]HH:MM:SS[.f]` (taken as UTC), the same with a
/// numeric offset, and Unix epoch seconds.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    raw.parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite())
        .and_then(|secs| DateTime::from_timestamp_millis((secs * 1000.0).round() as i64))
}
