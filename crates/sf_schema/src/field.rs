use rusqlite::{params, Row};
use sf_store::{FieldSpec, SqlType};

use crate::error::Result;
use crate::project::now;

/// A project's declared field. Soft-deleted fields keep their row (and their
/// physical column) around so a later re-creation with the same name can
/// restore the original history instead of starting a new column from
/// scratch.
#[derive(Debug, Clone)]
pub struct Field {
	pub id: i64,
	pub project_id: i64,
	pub name: String,
	pub label: String,
	pub field_type: String,
	pub required: bool,
	pub is_dedup_key: bool,
	pub validation_pattern: Option<String>,
	pub extraction_hint: Option<String>,
	pub display_order: i64,
	pub is_deleted: bool,
	pub deleted_at: Option<String>,
	pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct NewField {
	pub name: String,
	pub label: String,
	pub field_type: String,
	pub required: bool,
	pub is_dedup_key: bool,
	pub validation_pattern: Option<String>,
	pub extraction_hint: Option<String>,
	pub display_order: i64,
}

impl Field {
	pub fn to_spec(&self) -> FieldSpec {
		FieldSpec {
			name: self.name.clone(),
			sql_type: SqlType::from(self.field_type.as_str()),
		}
	}

	fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
		Ok(Field {
			id: row.get("id")?,
			project_id: row.get("project_id")?,
			name: row.get("field_name")?,
			label: row.get("field_label")?,
			field_type: row.get("field_type")?,
			required: row.get::<_, i64>("is_required")? != 0,
			is_dedup_key: row.get::<_, i64>("is_dedup_key")? != 0,
			validation_pattern: row.get("validation_rule")?,
			extraction_hint: row.get("extraction_hint")?,
			display_order: row.get("display_order")?,
			is_deleted: row.get::<_, i64>("is_deleted")? != 0,
			deleted_at: row.get("deleted_at")?,
			created_at: row.get("created_at")?,
		})
	}
}

const COLUMNS: &str = "id, project_id, field_name, field_label, field_type, is_required, \
	is_dedup_key, validation_rule, extraction_hint, display_order, is_deleted, deleted_at, created_at";

/// Active fields for a project, in display order. Mirrors `get_active_fields`:
/// soft-deleted rows are excluded.
pub async fn list_active(store: &sf_store::Store, project_id: i64) -> Result<Vec<Field>> {
	let connection = store.pool().get_owned().await?;
	let fields = tokio::task::spawn_blocking(move || {
		let mut statement = connection.prepare(&format!(
			"SELECT {COLUMNS} FROM project_fields WHERE project_id = ?1 AND is_deleted = 0 ORDER BY display_order"
		))?;
		let rows = statement
			.query_map(params![project_id], Field::from_row)?
			.collect::<rusqlite::Result<Vec<_>>>()?;
		Ok::<_, rusqlite::Error>(rows)
	})
	.await??;

	Ok(fields)
}

/// All fields for a project, including soft-deleted ones, in display order.
pub async fn list_all(store: &sf_store::Store, project_id: i64) -> Result<Vec<Field>> {
	let connection = store.pool().get_owned().await?;
	let fields = tokio::task::spawn_blocking(move || {
		let mut statement = connection
			.prepare(&format!("SELECT {COLUMNS} FROM project_fields WHERE project_id = ?1 ORDER BY display_order"))?;
		let rows = statement
			.query_map(params![project_id], Field::from_row)?
			.collect::<rusqlite::Result<Vec<_>>>()?;
		Ok::<_, rusqlite::Error>(rows)
	})
	.await??;

	Ok(fields)
}

async fn find_soft_deleted(store: &sf_store::Store, project_id: i64, name: &str) -> Result<Option<Field>> {
	let connection = store.pool().get_owned().await?;
	let name = name.to_string();
	let field = tokio::task::spawn_blocking(move || {
		connection
			.query_row(
				&format!("SELECT {COLUMNS} FROM project_fields WHERE project_id = ?1 AND field_name = ?2 AND is_deleted = 1"),
				params![project_id, name],
				Field::from_row,
			)
			.map(Some)
			.or_else(|error| match error {
				rusqlite::Error::QueryReturnedNoRows => Ok(None),
				other => Err(other),
			})
	})
	.await??;

	Ok(field)
}

/// Create a field. If a soft-deleted field of the same name already exists
/// for this project, it is restored in place - all attributes are overwritten
/// with the new ones and the deletion markers are cleared - rather than a
/// second row being inserted. Either way, if the project's records table
/// already exists it gets the new field's column added if missing. This is
/// additive only: other fields soft-deleted at the time keep their columns,
/// since they are absent from the active set but must not be dropped.
pub async fn create(store: &sf_store::Store, project_id: i64, field: NewField) -> Result<Field> {
	if let Some(existing) = find_soft_deleted(store, project_id, &field.name).await? {
		restore_with(store, existing.id, &field).await?;
	} else {
		insert_new(store, project_id, &field).await?;
	}

	add_field_column(store, project_id, &field).await?;

	get_by_name(store, project_id, &field.name)
		.await?
		.ok_or_else(|| crate::error::Error::Invariant(format!("field '{}' missing immediately after create", field.name)))
}

/// Add `field`'s column to the project's records table if the table exists
/// and doesn't have it yet, without touching any other column.
async fn add_field_column(store: &sf_store::Store, project_id: i64, field: &NewField) -> Result<()> {
	let spec = FieldSpec {
		name: field.name.clone(),
		sql_type: SqlType::from(field.field_type.as_str()),
	};
	store.add_column(project_id, &spec).await?;
	Ok(())
}

async fn insert_new(store: &sf_store::Store, project_id: i64, field: &NewField) -> Result<()> {
	let connection = store.pool().get_owned().await?;
	let field = field.clone();
	let created_at = now();
	tokio::task::spawn_blocking(move || {
		connection.execute(
			"INSERT INTO project_fields (project_id, field_name, field_label, field_type, is_required, \
			 is_dedup_key, validation_rule, extraction_hint, display_order, is_deleted, created_at) \
			 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, ?10)",
			params![
				project_id,
				field.name,
				field.label,
				field.field_type,
				field.required as i64,
				field.is_dedup_key as i64,
				field.validation_pattern,
				field.extraction_hint,
				field.display_order,
				created_at,
			],
		)
	})
	.await??;

	Ok(())
}

async fn restore_with(store: &sf_store::Store, field_id: i64, field: &NewField) -> Result<()> {
	let connection = store.pool().get_owned().await?;
	let field = field.clone();
	tokio::task::spawn_blocking(move || {
		connection.execute(
			"UPDATE project_fields SET field_label = ?1, field_type = ?2, is_required = ?3, is_dedup_key = ?4, \
			 validation_rule = ?5, extraction_hint = ?6, display_order = ?7, is_deleted = 0, deleted_at = NULL \
			 WHERE id = ?8",
			params![
				field.label,
				field.field_type,
				field.required as i64,
				field.is_dedup_key as i64,
				field.validation_pattern,
				field.extraction_hint,
				field.display_order,
				field_id,
			],
		)
	})
	.await??;

	Ok(())
}

pub async fn get_by_name(store: &sf_store::Store, project_id: i64, name: &str) -> Result<Option<Field>> {
	let connection = store.pool().get_owned().await?;
	let name = name.to_string();
	let field = tokio::task::spawn_blocking(move || {
		connection
			.query_row(
				&format!("SELECT {COLUMNS} FROM project_fields WHERE project_id = ?1 AND field_name = ?2"),
				params![project_id, name],
				Field::from_row,
			)
			.map(Some)
			.or_else(|error| match error {
				rusqlite::Error::QueryReturnedNoRows => Ok(None),
				other => Err(other),
			})
	})
	.await??;

	Ok(field)
}

/// Update a field's attributes. Renaming or retyping a field triggers a full
/// structural sync of the project's records table; other attribute changes
/// (label, required, hints, ordering) don't touch the table at all.
pub async fn update(store: &sf_store::Store, project_id: i64, field_id: i64, field: NewField) -> Result<Field> {
	let existing = get(store, field_id).await?;
	let structural_change = existing.name != field.name || existing.field_type != field.field_type;

	let connection = store.pool().get_owned().await?;
	let new_field = field.clone();
	tokio::task::spawn_blocking(move || {
		connection.execute(
			"UPDATE project_fields SET field_name = ?1, field_label = ?2, field_type = ?3, is_required = ?4, \
			 is_dedup_key = ?5, validation_rule = ?6, extraction_hint = ?7, display_order = ?8 WHERE id = ?9",
			params![
				new_field.name,
				new_field.label,
				new_field.field_type,
				new_field.required as i64,
				new_field.is_dedup_key as i64,
				new_field.validation_pattern,
				new_field.extraction_hint,
				new_field.display_order,
				field_id,
			],
		)
	})
	.await??;

	if structural_change {
		sync_table(store, project_id).await?;
	}

	get(store, field_id).await
}

pub async fn get(store: &sf_store::Store, field_id: i64) -> Result<Field> {
	let connection = store.pool().get_owned().await?;
	let field = tokio::task::spawn_blocking(move || {
		connection
			.query_row(&format!("SELECT {COLUMNS} FROM project_fields WHERE id = ?1"), params![field_id], Field::from_row)
	})
	.await??;

	Ok(field)
}

/// Soft-delete a field: mark it deleted and stamp `deleted_at`, but leave its
/// row (and its physical column) in place so `create` can restore it later.
pub async fn soft_delete(store: &sf_store::Store, field_id: i64) -> Result<()> {
	let connection = store.pool().get_owned().await?;
	let deleted_at = now();
	tokio::task::spawn_blocking(move || {
		connection.execute(
			"UPDATE project_fields SET is_deleted = 1, deleted_at = ?1 WHERE id = ?2",
			params![deleted_at, field_id],
		)
	})
	.await??;

	Ok(())
}

/// Restore a soft-deleted field without changing its attributes, re-adding
/// its column if the project's records table has since dropped it. Additive
/// only, for the same reason `create` is: any other field soft-deleted at
/// the time must keep its column rather than being read as removed.
pub async fn restore(store: &sf_store::Store, project_id: i64, field_id: i64) -> Result<Field> {
	let connection = store.pool().get_owned().await?;
	tokio::task::spawn_blocking(move || {
		connection.execute("UPDATE project_fields SET is_deleted = 0, deleted_at = NULL WHERE id = ?1", params![field_id])
	})
	.await??;

	let field = get(store, field_id).await?;
	store.add_column(project_id, &field.to_spec()).await?;
	get(store, field_id).await
}

/// Sync the project's physical records table to match its currently active
/// fields, if the table exists at all. A project with no table yet (nothing
/// extracted into it) has nothing to sync.
pub async fn sync_table(store: &sf_store::Store, project_id: i64) -> Result<()> {
	if !store.table_exists(project_id).await? {
		return Ok(());
	}

	let fields = list_active(store, project_id).await?;
	let specs: Vec<FieldSpec> = fields.iter().map(Field::to_spec).collect();
	store.ensure_schema(project_id, &specs).await?;

	Ok(())
}
