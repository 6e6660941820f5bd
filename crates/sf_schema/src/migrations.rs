use sf_store::Pool;

use crate::error::Result;

const CREATE_PROJECTS: &str = r#"
CREATE TABLE IF NOT EXISTS "projects" (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	name TEXT NOT NULL UNIQUE,
	description TEXT,
	dedup_enabled INTEGER NOT NULL DEFAULT 1,
	dedup_fields TEXT,
	dedup_strategy TEXT NOT NULL DEFAULT 'skip',
	created_at TEXT NOT NULL,
	updated_at TEXT
)"#;

const CREATE_PROJECT_FIELDS: &str = r#"
CREATE TABLE IF NOT EXISTS "project_fields" (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	project_id INTEGER NOT NULL,
	field_name TEXT NOT NULL,
	field_label TEXT NOT NULL,
	field_type TEXT NOT NULL,
	is_required INTEGER NOT NULL DEFAULT 0,
	is_dedup_key INTEGER NOT NULL DEFAULT 0,
	validation_rule TEXT,
	extraction_hint TEXT,
	display_order INTEGER NOT NULL DEFAULT 0,
	is_deleted INTEGER NOT NULL DEFAULT 0,
	deleted_at TEXT,
	created_at TEXT NOT NULL
)"#;

const CREATE_PROJECT_FIELDS_INDEX: &str =
	r#"CREATE INDEX IF NOT EXISTS "idx_project_fields_project_id" ON "project_fields" (project_id)"#;

pub async fn ensure_metadata_tables(pool: &Pool) -> Result<()> {
	let connection = pool.get_owned().await?;
	tokio::task::spawn_blocking(move || {
		connection.execute_batch(CREATE_PROJECTS)?;
		connection.execute_batch(CREATE_PROJECT_FIELDS)?;
		connection.execute_batch(CREATE_PROJECT_FIELDS_INDEX)?;
		Ok::<_, rusqlite::Error>(())
	})
	.await??;

	Ok(())
}
