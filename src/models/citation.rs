//! Citation records exchanged with the upstream extractor and the report writer.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::Status;

/// Record key holding the document type
pub const DOC_TYPE_FIELD: &str = "Тип документа";

/// Record key holding the document number
pub const NUMBER_FIELD: &str = "Номер";

/// Record key holding the document date
pub const DATE_FIELD: &str = "Дата";

/// Record key added by enrichment
pub const STATUS_FIELD: &str = "Статус";

/// A structured reference to a regulatory document.
///
/// Keys other than type, number and date are kept in `extra` and written back
/// out untouched, so records survive the round trip through enrichment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Document type, e.g. "ГОСТ" or "Постановление Правительства РФ"
    #[serde(rename = "Тип документа", default, deserialize_with = "string_or_number")]
    pub doc_type: String,

    /// Document number as cited
    #[serde(rename = "Номер", default, deserialize_with = "string_or_number")]
    pub number: String,

    /// Issue date as cited; empty dates are treated as absent
    #[serde(
        rename = "Дата",
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<String>,

    /// Pass-through fields
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Citation {
    /// Create a citation without a date
    pub fn new(doc_type: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            doc_type: doc_type.into(),
            number: number.into(),
            date: None,
            extra: Map::new(),
        }
    }

    /// Set the issue date; blank strings leave the date absent
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        let date = date.into();
        self.date = if date.trim().is_empty() {
            None
        } else {
            Some(date.trim().to_string())
        };
        self
    }

    /// Attach a pass-through field
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Identity used for caching
    pub fn key(&self) -> CitationKey {
        CitationKey {
            doc_type: self.doc_type.clone(),
            number: self.number.clone(),
            date: self.date.clone(),
        }
    }
}

/// Cache identity of a citation: the ordered `(doc_type, number, date)` triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CitationKey {
    pub doc_type: String,
    pub number: String,
    pub date: Option<String>,
}

impl fmt::Display for CitationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.doc_type, self.number)?;
        if let Some(date) = &self.date {
            write!(f, " от {}", date)?;
        }
        Ok(())
    }
}

/// A citation annotated with its resolved status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedCitation {
    #[serde(flatten)]
    pub citation: Citation,

    #[serde(rename = "Статус")]
    pub status: Status,
}

impl EnrichedCitation {
    /// Attach a status, replacing any status the citation already carried
    pub fn new(mut citation: Citation, status: Status) -> Self {
        citation.extra.remove(STATUS_FIELD);
        Self { citation, status }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}
