//! Optional capabilities the two-phase extraction algorithm does not depend
//! on: translating a human field label into a `snake_case` identifier, a
//! locally-derived validation pattern per field type, and standalone header
//! row recognition. Kept out of [`crate::Client::analyze_column_mapping`] so
//! that core column-mapping never grows a dependency on them.

use crate::{
	client::Client,
	error::{Error, Result},
	mapping::strip_code_fence,
};

/// Best-effort conversion of a label into a `snake_case` field name, mirroring
/// the cleanup `ai_client.py::generate_field_metadata` applies to the model's
/// translated response before using it as a column name.
pub fn label_to_snake_case(label: &str) -> String {
	label
		.trim()
		.to_lowercase()
		.chars()
		.map(|ch| if ch.is_whitespace() || ch == '-' { '_' } else { ch })
		.collect()
}

/// Locally-derived validation pattern for a field type, matching
/// `ai_client.py::_get_validation_rule`. Returns `None` for types with no
/// fixed-format check.
pub fn validation_rule_for(field_type: &str) -> Option<&'static str> {
	match field_type {
		"phone" => Some(r"^1[3-9]\d{9}$"),
		"email" => Some(r"^[\w.-]+@[\w.-]+\.\w+$"),
		"url" => Some(r"^https?://"),
		"date" => Some(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$"),
		"number" => Some(r"^-?\d+(\.\d+)?$"),
		_ => None,
	}
}

const MAX_HEADER_SAMPLE_ROWS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderRecognition {
	pub header_row: u32,
	pub headers: Vec<String>,
}

fn parse_header_recognition(text: &str) -> Result<HeaderRecognition> {
	let stripped = strip_code_fence(text);
	let value: serde_json::Value =
		serde_json::from_str(stripped).map_err(|error| Error::MalformedResponse(error.to_string()))?;

	let object = value
		.as_object()
		.ok_or_else(|| Error::MalformedResponse("response is not a JSON object".to_string()))?;

	let header_row = object.get("header_row").and_then(|value| value.as_u64()).unwrap_or(0) as u32;
	let headers = object
		.get("headers")
		.and_then(|value| value.as_array())
		.map(|values| values.iter().filter_map(|value| value.as_str()).map(str::to_string).collect())
		.unwrap_or_default();

	Ok(HeaderRecognition { header_row, headers })
}

impl Client {
	/// Standalone header-row recognition, independent of column mapping.
	/// Not used by the per-sheet extraction algorithm; offered for callers
	/// that want a header guess without a field list.
	pub async fn recognize_header(&self, sample_rows: &[Vec<String>]) -> Result<HeaderRecognition> {
		let rows_text = sample_rows
			.iter()
			.take(MAX_HEADER_SAMPLE_ROWS)
			.enumerate()
			.map(|(index, row)| {
				let row_str = row.iter().filter(|cell| !cell.is_empty()).cloned().collect::<Vec<_>>().join(" | ");
				format!("[row {}] {row_str}", index + 1)
			})
			.collect::<Vec<_>>()
			.join("\n");

		let prompt = format!(
			"You are a spreadsheet analysis expert. Here are the first {} rows of an Excel sheet:\n\n\
			{rows_text}\n\n\
			Determine which row is the header (1-{}, or 0 if none) and list its fields.\n\n\
			Respond in JSON:\n{{\n  \"header_row\": 1,\n  \"headers\": [\"field1\", \"field2\"]\n}}\n\n\
			Return only the JSON, nothing else.",
			sample_rows.len().min(MAX_HEADER_SAMPLE_ROWS),
			MAX_HEADER_SAMPLE_ROWS,
		);

		let response = self.call_with_retry(&prompt).await?;
		parse_header_recognition(&response)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn converts_label_to_snake_case() {
		assert_eq!(label_to_snake_case("Phone Number"), "phone_number");
		assert_eq!(label_to_snake_case("company-name"), "company_name");
	}

	#[test]
	fn looks_up_validation_rule_by_type() {
		assert!(validation_rule_for("phone").is_some());
		assert!(validation_rule_for("text").is_none());
	}

	#[test]
	fn parses_header_recognition_response() {
		let text = "{\"header_row\": 1, \"headers\": [\"name\", \"phone\"]}";
		let parsed = parse_header_recognition(text).unwrap();
		assert_eq!(parsed.header_row, 1);
		assert_eq!(parsed.headers, vec!["name".to_string(), "phone".to_string()]);
	}
}
