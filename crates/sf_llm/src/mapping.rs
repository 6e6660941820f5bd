use std::collections::HashMap;

use crate::error::{Error, Result};

/// Column-Mapping Artifact returned by the model for one sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMapping {
	pub header_row: u32,
	pub column_mappings: HashMap<usize, String>,
	pub confidence: f64,
	pub unmatched_columns: Vec<usize>,
}

/// Strip a leading/trailing markdown code fence (with or without a language
/// tag) around a model response, as `ai_client.py::_extract_json` does.
pub(crate) fn strip_code_fence(text: &str) -> &str {
	let text = text.trim();

	let Some(rest) = text.strip_prefix("```") else {
		return text;
	};

	let rest = match rest.find('\n') {
		Some(index) => &rest[index + 1..],
		None => rest,
	};

	rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Parse a column-mapping response, tolerating code fences and string-or-int
/// keys in `column_mappings`, and defaulting `confidence` to 0.5 if absent.
pub fn parse_column_mapping(text: &str) -> Result<ColumnMapping> {
	let stripped = strip_code_fence(text);

	let value: serde_json::Value = serde_json::from_str(stripped)
		.map_err(|error| Error::MalformedResponse(error.to_string()))?;

	let object = value
		.as_object()
		.ok_or_else(|| Error::MalformedResponse("response is not a JSON object".to_string()))?;

	let header_row = object
		.get("header_row")
		.and_then(|value| value.as_u64())
		.unwrap_or(0) as u32;

	let mut column_mappings = HashMap::new();
	if let Some(raw) = object.get("column_mappings").and_then(|value| value.as_object()) {
		for (key, value) in raw {
			let Ok(index) = key.parse::<usize>() else {
				continue;
			};
			let Some(field_name) = value.as_str() else {
				continue;
			};
			column_mappings.insert(index, field_name.to_string());
		}
	}

	let confidence = object
		.get("confidence")
		.and_then(|value| value.as_f64())
		.unwrap_or(0.5);

	let unmatched_columns = object
		.get("unmatched_columns")
		.and_then(|value| value.as_array())
		.map(|values| values.iter().filter_map(|value| value.as_u64()).map(|value| value as usize).collect())
		.unwrap_or_default();

	Ok(ColumnMapping {
		header_row,
		column_mappings,
		confidence,
		unmatched_columns,
	})
}
