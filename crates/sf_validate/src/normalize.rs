use crate::types::FieldType;

/// Canonicalise a trimmed, non-blank value according to its field type.
/// Blank handling happens upstream in [`crate::record::validate_field`] -
/// this only transforms values known to be present.
pub fn normalize(value: &str, field_type: FieldType) -> String {
	let trimmed = value.trim();

	match field_type {
		FieldType::Phone => normalize_phone(trimmed),
		FieldType::Email => trimmed.to_lowercase(),
		FieldType::Date => normalize_date(trimmed),
		FieldType::Number => normalize_number(trimmed),
		FieldType::Text | FieldType::Url => trimmed.to_string(),
	}
}

fn normalize_phone(value: &str) -> String {
	let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();

	if digits.len() == 13 && digits.starts_with("86") {
		digits[2..].to_string()
	} else {
		digits
	}
}

fn normalize_date(value: &str) -> String {
	let replaced = value.replace('/', "-");

	let mut parts = replaced.splitn(3, '-');
	let (year, month, day) = match (parts.next(), parts.next(), parts.next()) {
		(Some(year), Some(month), Some(day)) => (year, month, day),
		_ => return replaced,
	};

	let valid = year.len() == 4
		&& year.chars().all(|c| c.is_ascii_digit())
		&& !month.is_empty()
		&& month.len() <= 2
		&& month.chars().all(|c| c.is_ascii_digit())
		&& !day.is_empty()
		&& day.len() <= 2
		&& day.chars().all(|c| c.is_ascii_digit());

	if !valid {
		return replaced;
	}

	format!("{year}-{month:0>2}-{day:0>2}")
}

fn normalize_number(value: &str) -> String {
	let stripped = value.replace(',', "");

	match stripped.parse::<f64>() {
		Ok(number) if number.fract() == 0.0 => format!("{}", number as i64),
		Ok(number) => {
			let rendered = format!("{number}");
			rendered
		}
		Err(_) => stripped,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn phone_strips_separators_and_country_code() {
		assert_eq!(normalize("138-1234-5678", FieldType::Phone), "13812345678");
		assert_eq!(normalize("8613812345678", FieldType::Phone), "13812345678");
		// 11-digit numbers that merely start with 86 are untouched.
		assert_eq!(normalize("13986543210", FieldType::Phone), "13986543210");
	}

	#[test]
	fn email_lowercases_and_trims() {
		assert_eq!(normalize("  A@Ex.COM ", FieldType::Email), "a@ex.com");
	}

	#[test]
	fn date_replaces_slashes_and_zero_pads() {
		assert_eq!(normalize("2024/1/5", FieldType::Date), "2024-01-05");
		assert_eq!(normalize("2024-11-23", FieldType::Date), "2024-11-23");
	}

	#[test]
	fn date_passes_through_unparseable_values() {
		assert_eq!(normalize("not-a-date", FieldType::Date), "not-a-date");
	}

	#[test]
	fn number_strips_thousands_separators_and_renders_integral_without_fraction() {
		assert_eq!(normalize("1,234", FieldType::Number), "1234");
		assert_eq!(normalize("1,234.50", FieldType::Number), "1234.5");
	}

	#[test]
	fn number_passes_through_unparseable_values() {
		assert_eq!(normalize("abc", FieldType::Number), "abc");
	}

	#[test]
	fn text_is_only_trimmed() {
		assert_eq!(normalize("  hello  ", FieldType::Text), "hello");
	}
}
