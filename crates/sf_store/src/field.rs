use sea_query::ColumnType;

/// Everything the storage engine needs to know about an active field to
/// build DDL for it. Deliberately independent of `sf_schema::Field` so this
/// crate has no dependency on the schema registry.
#[derive(Debug, Clone)]
pub struct FieldSpec {
	pub name: String,
	pub sql_type: SqlType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
	Text,
	Integer,
}

impl SqlType {
	pub fn column_type(self) -> ColumnType {
		match self {
			SqlType::Text => ColumnType::Text,
			SqlType::Integer => ColumnType::Integer,
		}
	}
}

impl From<&str> for SqlType {
	fn from(field_type: &str) -> Self {
		match field_type {
			"number" => SqlType::Integer,
			_ => SqlType::Text,
		}
	}
}
