use std::fmt;

/// The six field types a project may declare. `Text` is also the fallback
/// for any type string this system doesn't recognise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
	Text,
	Number,
	Email,
	Phone,
	Date,
	Url,
}

impl FieldType {
	pub fn as_str(&self) -> &'static str {
		match self {
			FieldType::Text => "text",
			FieldType::Number => "number",
			FieldType::Email => "email",
			FieldType::Phone => "phone",
			FieldType::Date => "date",
			FieldType::Url => "url",
		}
	}

	/// SQL-type mapping per the record table layout: text/email/phone/date/
	/// url go to TEXT, number goes to INTEGER, unknown types fall back to TEXT.
	pub fn sql_type(&self) -> &'static str {
		match self {
			FieldType::Number => "INTEGER",
			_ => "TEXT",
		}
	}
}

impl fmt::Display for FieldType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Unknown type strings are not an error - they fall back to `Text`, matching
/// the "text (and any unknown type): no pattern" rule.
impl From<&str> for FieldType {
	fn from(value: &str) -> Self {
		match value {
			"number" => FieldType::Number,
			"email" => FieldType::Email,
			"phone" => FieldType::Phone,
			"date" => FieldType::Date,
			"url" => FieldType::Url,
			_ => FieldType::Text,
		}
	}
}

impl From<String> for FieldType {
	fn from(value: String) -> Self {
		FieldType::from(value.as_str())
	}
}
