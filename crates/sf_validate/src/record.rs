use std::collections::HashMap;

use crate::{normalize::normalize, pattern::matches_format, types::FieldType};

/// Everything the validation/normalization pipeline needs to know about a
/// project field. Deliberately independent of the schema registry's own
/// `Field` type so this crate stays a dependency-free leaf.
#[derive(Debug, Clone)]
pub struct FieldRule {
	pub name: String,
	pub label: String,
	pub field_type: FieldType,
	pub required: bool,
	pub custom_pattern: Option<String>,
}

fn is_blank(value: Option<&str>) -> bool {
	match value {
		None => true,
		Some(value) => value.trim().is_empty(),
	}
}

/// Validate a single field value against its rule. Ordering matches spec:
/// required check, then blank-skip, then format pattern, then custom pattern.
/// A malformed custom pattern is ignored rather than treated as a failure.
pub fn validate_field(value: Option<&str>, rule: &FieldRule) -> Result<(), String> {
	if rule.required && is_blank(value) {
		return Err(format!("{}: required", rule.label));
	}

	if is_blank(value) {
		return Ok(());
	}

	let value = value.expect("non-blank checked above").trim();

	if !matches_format(value, rule.field_type) {
		return Err(format!("{}: format", rule.label));
	}

	if let Some(pattern) = &rule.custom_pattern {
		match regex::Regex::new(pattern) {
			Ok(compiled) => {
				if !compiled.is_match(value) {
					return Err(format!("{}: custom", rule.label));
				}
			}
			Err(_) => {
				// A malformed custom pattern is ignored rather than fatal.
			}
		}
	}

	Ok(())
}

/// Validate a whole record against the project's active fields. Returns the
/// aggregated list of per-field error messages; the record is valid iff this
/// is empty.
pub fn validate_record(
	record: &HashMap<String, String>,
	rules: &[FieldRule],
) -> Result<(), Vec<String>> {
	let errors: Vec<String> = rules
		.iter()
		.filter_map(|rule| {
			let value = record.get(&rule.name).map(String::as_str);
			validate_field(value, rule).err()
		})
		.collect();

	if errors.is_empty() {
		Ok(())
	} else {
		Err(errors)
	}
}

/// Join per-field errors into the single aggregated message stored on an
/// error record.
pub fn join_errors(errors: &[String]) -> String {
	errors.join("; ")
}

/// Normalize every field of a record per its declared type. Fields absent
/// from the raw record, or entirely blank, normalize to an empty string.
pub fn normalize_record(
	raw: &HashMap<String, Option<String>>,
	rules: &[FieldRule],
) -> HashMap<String, String> {
	rules
		.iter()
		.map(|rule| {
			let value = raw.get(&rule.name).and_then(|value| value.as_deref());
			let normalized = match value {
				Some(value) if !value.trim().is_empty() => normalize(value, rule.field_type),
				_ => String::new(),
			};
			(rule.name.clone(), normalized)
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn rule(name: &str, field_type: FieldType, required: bool) -> FieldRule {
		FieldRule {
			name: name.to_string(),
			label: name.to_string(),
			field_type,
			required,
			custom_pattern: None,
		}
	}

	#[test]
	fn required_blank_field_fails() {
		let rule = rule("name", FieldType::Text, true);
		assert!(validate_field(None, &rule).is_err());
		assert!(validate_field(Some("  "), &rule).is_err());
	}

	#[test]
	fn optional_blank_field_is_skipped() {
		let rule = rule("email", FieldType::Email, false);
		assert!(validate_field(None, &rule).is_ok());
	}

	#[test]
	fn format_mismatch_fails_even_when_optional() {
		let rule = rule("phone", FieldType::Phone, false);
		assert!(validate_field(Some("12345"), &rule).is_err());
	}

	#[test]
	fn malformed_custom_pattern_is_ignored() {
		let mut rule = rule("code", FieldType::Text, false);
		rule.custom_pattern = Some("(unterminated".to_string());
		assert!(validate_field(Some("anything"), &rule).is_ok());
	}

	#[test]
	fn custom_pattern_failure_is_reported() {
		let mut rule = rule("code", FieldType::Text, false);
		rule.custom_pattern = Some(r"^[A-Z]{3}$".to_string());
		assert!(validate_field(Some("abc"), &rule).is_err());
		assert!(validate_field(Some("ABC"), &rule).is_ok());
	}

	#[test]
	fn validate_record_aggregates_errors() {
		let rules = vec![
			rule("name", FieldType::Text, true),
			rule("phone", FieldType::Phone, true),
		];
		let mut record = HashMap::new();
		record.insert("phone".to_string(), "not-a-phone".to_string());

		let errors = validate_record(&record, &rules).unwrap_err();
		assert_eq!(errors.len(), 2);
	}
}
