use sea_query::{Alias, ColumnDef, Iden, Table, TableCreateStatement};

use crate::field::FieldSpec;

pub const METADATA_COLUMNS: &[&str] = &[
	"raw_content",
	"source_file",
	"source_sheet",
	"source_row_number",
	"batch_id",
	"status",
	"error_message",
	"created_at",
	"updated_at",
];

#[derive(Iden)]
pub enum KnownColumn {
	Id,
	RawContent,
	SourceFile,
	SourceSheet,
	SourceRowNumber,
	BatchId,
	Status,
	ErrorMessage,
	CreatedAt,
	UpdatedAt,
}

pub fn table_name(project_id: i64) -> Alias {
	Alias::new(format!("project_{project_id}_records"))
}

pub fn field_column(name: &str) -> Alias {
	Alias::new(name)
}

/// Build a `CREATE TABLE` statement for a project's active field set.
/// Column order: surrogate id, one column per field, then fixed metadata.
pub fn create_table_statement(project_id: i64, fields: &[FieldSpec]) -> TableCreateStatement {
	let mut table = Table::create();
	table
		.table(table_name(project_id))
		.col(ColumnDef::new(KnownColumn::Id).integer().primary_key().auto_increment());

	for field in fields {
		table.col(&mut ColumnDef::new_with_type(field_column(&field.name), field.sql_type.column_type()));
	}

	table
		.col(ColumnDef::new(KnownColumn::RawContent).text())
		.col(ColumnDef::new(KnownColumn::SourceFile).text())
		.col(ColumnDef::new(KnownColumn::SourceSheet).text())
		.col(ColumnDef::new(KnownColumn::SourceRowNumber).integer())
		.col(ColumnDef::new(KnownColumn::BatchId).text())
		.col(ColumnDef::new(KnownColumn::Status).text())
		.col(ColumnDef::new(KnownColumn::ErrorMessage).text())
		.col(ColumnDef::new(KnownColumn::CreatedAt).text())
		.col(ColumnDef::new(KnownColumn::UpdatedAt).text());

	table.take()
}

/// Minimal migration operation implied by a change in active field set, per
/// the additive/destructive rule: fresh create, pure add-column, or a
/// destructive rebuild preserving the intersection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationPlan {
	CreateFresh,
	AddColumns(Vec<String>),
	DestructiveRebuild { to_add: Vec<String>, kept: Vec<String> },
}

pub fn plan_migration(table_exists: bool, current_columns: &[String], new_fields: &[FieldSpec]) -> MigrationPlan {
	if !table_exists {
		return MigrationPlan::CreateFresh;
	}

	let new_names: Vec<&str> = new_fields.iter().map(|field| field.name.as_str()).collect();

	let to_add: Vec<String> = new_names
		.iter()
		.filter(|name| !current_columns.iter().any(|column| column == *name))
		.map(|name| name.to_string())
		.collect();

	let to_remove: Vec<&String> = current_columns
		.iter()
		.filter(|column| !METADATA_COLUMNS.contains(&column.as_str()) && column.as_str() != "id")
		.filter(|column| !new_names.contains(&column.as_str()))
		.collect();

	if to_remove.is_empty() {
		if to_add.is_empty() {
			MigrationPlan::AddColumns(vec![])
		} else {
			MigrationPlan::AddColumns(to_add)
		}
	} else {
		let kept: Vec<String> = current_columns
			.iter()
			.filter(|column| !to_remove.contains(column))
			.cloned()
			.collect();
		MigrationPlan::DestructiveRebuild { to_add, kept }
	}
}
