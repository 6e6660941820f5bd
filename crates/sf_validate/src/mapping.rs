use std::collections::HashSet;

use crate::record::FieldRule;

const AUTO_THRESHOLD: f64 = 0.8;
const REVIEW_THRESHOLD: f64 = 0.5;

/// How confident a column mapping is, and what that implies for the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
	/// >= 0.8: safe to import without a human in the loop.
	Auto,
	/// >= 0.5: import, but flag for review.
	Review,
	/// < 0.5: import, but a human should confirm the mapping.
	ManualConfirm,
}

pub fn classify_confidence(confidence: f64) -> Confidence {
	if confidence >= AUTO_THRESHOLD {
		Confidence::Auto
	} else if confidence >= REVIEW_THRESHOLD {
		Confidence::Review
	} else {
		Confidence::ManualConfirm
	}
}

/// Required fields the given mapping (column index -> field name) does not
/// cover. A non-empty result is a warning, not a hard failure.
pub fn unmapped_required_fields(mapped_field_names: &[String], rules: &[FieldRule]) -> Vec<String> {
	let mapped: HashSet<&str> = mapped_field_names.iter().map(String::as_str).collect();

	rules
		.iter()
		.filter(|rule| rule.required && !mapped.contains(rule.name.as_str()))
		.map(|rule| rule.label.clone())
		.collect()
}

#[cfg(test)]
mod tests {
	use crate::types::FieldType;

	use super::*;

	fn rule(name: &str, required: bool) -> FieldRule {
		FieldRule {
			name: name.to_string(),
			label: name.to_string(),
			field_type: FieldType::Text,
			required,
			custom_pattern: None,
		}
	}

	#[test]
	fn classifies_thresholds() {
		assert_eq!(classify_confidence(0.95), Confidence::Auto);
		assert_eq!(classify_confidence(0.8), Confidence::Auto);
		assert_eq!(classify_confidence(0.6), Confidence::Review);
		assert_eq!(classify_confidence(0.5), Confidence::Review);
		assert_eq!(classify_confidence(0.2), Confidence::ManualConfirm);
	}

	#[test]
	fn finds_unmapped_required_fields() {
		let rules = vec![rule("name", true), rule("phone", true), rule("email", false)];
		let mapped = vec!["name".to_string()];

		let unmapped = unmapped_required_fields(&mapped, &rules);
		assert_eq!(unmapped, vec!["phone".to_string()]);
	}
}
