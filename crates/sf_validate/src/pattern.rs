use std::sync::OnceLock;

use regex::Regex;

use crate::types::FieldType;

fn compiled(cell: &OnceLock<Regex>, pattern: &str) -> &Regex {
	cell.get_or_init(|| Regex::new(pattern).expect("fixed format pattern must compile"))
}

macro_rules! fixed_pattern {
	($name:ident, $pattern:expr) => {
		fn $name() -> &'static Regex {
			static CELL: OnceLock<Regex> = OnceLock::new();
			compiled(&CELL, $pattern)
		}
	};
}

fixed_pattern!(phone_pattern, r"^1[3-9]\d{9}$");
fixed_pattern!(email_pattern, r"^[\w.-]+@[\w.-]+\.\w+$");
fixed_pattern!(url_pattern, r"^https?://");
fixed_pattern!(date_pattern, r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$");
fixed_pattern!(number_pattern, r"^-?\d+(\.\d+)?$");

/// The fixed format pattern for a field type, matched against the whole
/// trimmed string. `Text` and any unrecognised type have no pattern.
pub fn pattern_for(field_type: FieldType) -> Option<&'static Regex> {
	match field_type {
		FieldType::Phone => Some(phone_pattern()),
		FieldType::Email => Some(email_pattern()),
		FieldType::Url => Some(url_pattern()),
		FieldType::Date => Some(date_pattern()),
		FieldType::Number => Some(number_pattern()),
		FieldType::Text => None,
	}
}

pub fn matches_format(value: &str, field_type: FieldType) -> bool {
	match pattern_for(field_type) {
		Some(pattern) => pattern.is_match(value.trim()),
		None => true,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn phone_accepts_mobile_numbers_only() {
		assert!(matches_format("13812345678", FieldType::Phone));
		assert!(!matches_format("12812345678", FieldType::Phone));
		assert!(!matches_format("1381234567", FieldType::Phone));
	}

	#[test]
	fn email_requires_domain_and_tld() {
		assert!(matches_format("a@example.com", FieldType::Email));
		assert!(!matches_format("not-an-email", FieldType::Email));
	}

	#[test]
	fn url_requires_scheme() {
		assert!(matches_format("https://example.com", FieldType::Url));
		assert!(!matches_format("example.com", FieldType::Url));
	}

	#[test]
	fn date_accepts_variable_width_components() {
		assert!(matches_format("2024-1-5", FieldType::Date));
		assert!(matches_format("2024/01/05", FieldType::Date));
		assert!(!matches_format("24-01-05", FieldType::Date));
	}

	#[test]
	fn number_accepts_integers_and_decimals() {
		assert!(matches_format("42", FieldType::Number));
		assert!(matches_format("-3.14", FieldType::Number));
		assert!(!matches_format("4a2", FieldType::Number));
	}

	#[test]
	fn text_has_no_pattern() {
		assert!(matches_format("anything at all", FieldType::Text));
	}
}
