/// The subset of a project field's definition needed to describe it to the
/// model. Deliberately independent of `sf_schema::Field` so this crate does
/// not depend on the schema registry.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
	pub name: String,
	pub label: String,
	pub field_type: String,
	pub required: bool,
	pub extraction_hint: Option<String>,
}

pub(crate) fn describe(field: &FieldDescriptor) -> String {
	let required_mark = if field.required { " [required]" } else { "" };
	let hint = field
		.extraction_hint
		.as_deref()
		.map(|hint| format!(" - hint: {hint}"))
		.unwrap_or_default();

	format!(
		"- {} ({}, type: {}){}{}",
		field.name, field.label, field.field_type, required_mark, hint
	)
}
