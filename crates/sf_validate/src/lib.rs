mod mapping;
mod normalize;
mod pattern;
mod record;
mod types;

pub use mapping::{classify_confidence, unmapped_required_fields, Confidence};
pub use normalize::normalize;
pub use pattern::{matches_format, pattern_for};
pub use record::{join_errors, normalize_record, validate_field, validate_record, FieldRule};
pub use types::FieldType;
