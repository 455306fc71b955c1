//! Phrase rules mapping registry text to a [`Status`].
//!
//! All matching is case-insensitive substring search on lowercased text.

use scraper::Selector;

use crate::models::Status;
use crate::sources::SourceError;

const NOTHING_FOUND: &str = "ничего не найдено";
const LOST_FORCE: &str = "утратил силу";
const NO_LONGER_IN_EFFECT: &str = "не действует";
const IN_FORCE: &str = "действующ";
const ENTERS_INTO_FORCE: &str = "вступает в силу";

/// Phrases that classify a single listing or search-result entry
#[derive(Debug, Clone, Copy)]
pub struct EntryRules {
    /// Any of these means the document lost force
    pub repealed: &'static [&'static str],
    /// Any of these means the document is in force; checked after `repealed`
    pub active: &'static [&'static str],
}

impl EntryRules {
    /// Rules for government.ru listing titles
    pub const LISTING: EntryRules = EntryRules {
        repealed: &[LOST_FORCE, NO_LONGER_IN_EFFECT],
        active: &[IN_FORCE, ENTERS_INTO_FORCE],
    };

    /// Rules for ConsultantPlus search-result blocks
    pub const SEARCH_RESULT: EntryRules = EntryRules {
        repealed: &[LOST_FORCE, NO_LONGER_IN_EFFECT],
        active: &[IN_FORCE],
    };
}

/// Classify a whole search-results page from the official portal.
///
/// Priority: nothing found, lost force, in force, otherwise undetermined.
/// The first phrase present wins.
pub fn classify_search_page(body: &str) -> Status {
    let body = body.to_lowercase();

    if body.contains(NOTHING_FOUND) {
        Status::NotFound
    } else if body.contains(LOST_FORCE) {
        Status::Repealed
    } else if body.contains(IN_FORCE) {
        Status::Active
    } else {
        Status::Undetermined
    }
}

/// Classify one entry, or `None` when no status phrase is present
pub fn classify_entry(text: &str, rules: &EntryRules) -> Option<Status> {
    let text = text.to_lowercase();

    if rules.repealed.iter().any(|p| text.contains(p)) {
        Some(Status::Repealed)
    } else if rules.active.iter().any(|p| text.contains(p)) {
        Some(Status::Active)
    } else {
        None
    }
}

/// Lowercased document number without the numero sign, for title matching
pub(crate) fn normalize_number(number: &str) -> String {
    number.replace('№', "").trim().to_lowercase()
}

pub(crate) fn parse_selector(selector: &str) -> Result<Selector, SourceError> {
    Selector::parse(selector)
        .map_err(|e| SourceError::Parse(format!("invalid selector {}: {:?}", selector, e)))
}

/// Case-insensitive containment
pub(crate) fn mentions(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
