//! Legal-force status of a regulatory document.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Outcome of a status lookup.
///
/// The serialized form is the Russian label consumed by the spreadsheet
/// writer, so the `serde` names and [`Status::label`] must stay in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// The document is in force
    #[serde(rename = "в силе")]
    Active,

    /// The document has lost force
    #[serde(rename = "утратил силу")]
    Repealed,

    /// The source has no record of the document
    #[serde(rename = "не найден")]
    NotFound,

    /// The document was found but its status could not be read
    #[serde(rename = "статус не определен")]
    Undetermined,

    /// The source could not be queried
    #[serde(rename = "ошибка запроса")]
    RequestError,

    /// The source refused access (HTTP 403)
    #[serde(rename = "доступ запрещен")]
    AccessDenied,
}

impl Status {
    /// All statuses, in declaration order
    pub const ALL: [Status; 6] = [
        Status::Active,
        Status::Repealed,
        Status::NotFound,
        Status::Undetermined,
        Status::RequestError,
        Status::AccessDenied,
    ];

    /// The label written to output records
    pub fn label(&self) -> &'static str {
        match self {
            Status::Active => "в силе",
            Status::Repealed => "утратил силу",
            Status::NotFound => "не найден",
            Status::Undetermined => "статус не определен",
            Status::RequestError => "ошибка запроса",
            Status::AccessDenied => "доступ запрещен",
        }
    }

    /// Whether the status came from a source that answered the query.
    ///
    /// `RequestError` and `AccessDenied` describe the lookup, not the document.
    pub fn is_conclusive(&self) -> bool {
        matches!(
            self,
            Status::Active | Status::Repealed | Status::NotFound | Status::Undetermined
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when a label does not name a [`Status`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status label: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Status::ALL
            .into_iter()
            .find(|status| status.label() == needle)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_match_serde_names() {
        for status in Status::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.label()));

            let back: Status = serde_json::from_str(&json).unwrap();
            assert_eq!(back, status);
        }
    }

    #[test]
    fn test_from_str() {
        assert_eq!("в силе".parse::<Status>(), Ok(Status::Active));
        assert_eq!(" Утратил силу ".parse::<Status>(), Ok(Status::Repealed));
        assert!("действует".parse::<Status>().is_err());
    }

    #[test]
    fn test_conclusive() {
        assert!(Status::NotFound.is_conclusive());
        assert!(!Status::RequestError.is_conclusive());
        assert!(!Status::AccessDenied.is_conclusive());
    }
}
