//! Reading citations produced by the upstream extractor.
//!
//! Two shapes are accepted:
//!
//! - a JSON array of records keyed `Тип документа` / `Номер` / `Дата`
//! - the extractor's line format, one record per line:
//!
//! ```text
//! ГОСТ; ГОСТ 1234-56 от 01.01.2000; действует
//! Приказ; Приказ №12 от 05.05.2022; статус неизвестен
//! ```

use chrono::NaiveDate;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

use super::Citation;

/// Extra field keeping the extractor's combined number-and-date text
pub const NUMBER_AND_DATE_FIELD: &str = "Номер и дата";

const DATE_FORMAT: &str = "%d.%m.%Y";

/// Input encodings understood by [`read_citations`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputFormat {
    /// Pick by file extension: `.json` is JSON, anything else is lines
    #[default]
    Auto,
    Json,
    Lines,
}

impl InputFormat {
    fn resolve(self, path: &Path) -> InputFormat {
        match self {
            InputFormat::Auto => {
                let is_json = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("json"));
                if is_json {
                    InputFormat::Json
                } else {
                    InputFormat::Lines
                }
            }
            other => other,
        }
    }
}

/// Errors raised while loading citations
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid citation JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load citations from a file
pub fn read_citations(path: &Path, format: InputFormat) -> Result<Vec<Citation>, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.display().to_string(),
        source,
    })?;

    match format.resolve(path) {
        InputFormat::Json => Ok(serde_json::from_str(&content)?),
        _ => Ok(parse_extractor_output(&content)),
    }
}

/// Parse the extractor's `type; number and date; status` lines.
///
/// Lines that do not split into exactly three fields are skipped with a
/// warning. The third field is the model's own guess and is discarded.
pub fn parse_extractor_output(text: &str) -> Vec<Citation> {
    let mut citations = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split(';').map(str::trim).collect();
        if parts.len() != 3 {
            tracing::warn!("Skipping extractor line (expected 3 fields): {}", line);
            continue;
        }

        citations.push(parse_record(parts[0], parts[1]));
    }

    citations
}

fn parse_record(doc_type: &str, number_and_date: &str) -> Citation {
    let (number, date) = split_number_and_date(number_and_date);
    let number = strip_prefix_ignore_case(number, doc_type)
        .unwrap_or(number)
        .trim()
        .trim_start_matches('№')
        .trim();

    let mut citation = Citation::new(doc_type, number)
        .with_extra(NUMBER_AND_DATE_FIELD, number_and_date.to_string());
    if let Some(date) = date {
        citation = citation.with_date(normalize_date(date));
    }
    citation
}

fn split_number_and_date(text: &str) -> (&str, Option<&str>) {
    static SPLIT: OnceLock<Regex> = OnceLock::new();
    let re = SPLIT.get_or_init(|| {
        Regex::new(r"(?i)^(?P<number>.*?)\s+от\s+(?P<date>.+)$").expect("valid regex")
    });

    match re.captures(text) {
        Some(caps) => {
            let number = caps.name("number").map_or(text, |m| m.as_str());
            let date = caps.name("date").map(|m| m.as_str().trim());
            (number, date)
        }
        None => (text, None),
    }
}

/// Canonical `dd.mm.yyyy` when the date parses, otherwise the trimmed input
fn normalize_date(raw: &str) -> String {
    let cleaned = raw
        .trim()
        .trim_end_matches("г.")
        .trim_end_matches('г')
        .trim();

    match NaiveDate::parse_from_str(cleaned, DATE_FORMAT) {
        Ok(date) => date.format(DATE_FORMAT).to_string(),
        Err(_) => {
            tracing::debug!("Keeping unparsed date as cited: {}", raw);
            cleaned.to_string()
        }
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }

    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }

    let rest = chars.next().map_or(text.len(), |(idx, _)| idx);
    Some(&text[rest..])
}
