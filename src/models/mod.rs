//! Core data models for citations and their resolved status.

mod citation;
mod input;
mod status;

pub use citation::{
    Citation, CitationKey, EnrichedCitation, DATE_FIELD, DOC_TYPE_FIELD, NUMBER_FIELD,
    STATUS_FIELD,
};
pub use input::{
    parse_extractor_output, read_citations, InputError, InputFormat, NUMBER_AND_DATE_FIELD,
};
pub use status::{Status, UnknownStatus};
