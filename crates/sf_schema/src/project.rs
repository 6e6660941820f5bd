use rusqlite::{params, Row};

use crate::error::{Error, Result};

pub(crate) fn now() -> String {
	chrono::Utc::now().to_rfc3339()
}

#[derive(Debug, Clone)]
pub struct Project {
	pub id: i64,
	pub name: String,
	pub description: Option<String>,
	pub dedup_enabled: bool,
	pub dedup_fields: Vec<String>,
	pub dedup_strategy: String,
	pub created_at: String,
	pub updated_at: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
	pub name: String,
	pub description: Option<String>,
	pub dedup_enabled: bool,
	pub dedup_fields: Vec<String>,
	pub dedup_strategy: String,
}

fn join_fields(fields: &[String]) -> Option<String> {
	if fields.is_empty() {
		None
	} else {
		Some(fields.join(","))
	}
}

fn split_fields(value: Option<String>) -> Vec<String> {
	match value {
		Some(value) if !value.is_empty() => value.split(',').map(str::to_string).collect(),
		_ => Vec::new(),
	}
}

impl Project {
	fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
		Ok(Project {
			id: row.get("id")?,
			name: row.get("name")?,
			description: row.get("description")?,
			dedup_enabled: row.get::<_, i64>("dedup_enabled")? != 0,
			dedup_fields: split_fields(row.get("dedup_fields")?),
			dedup_strategy: row.get("dedup_strategy")?,
			created_at: row.get("created_at")?,
			updated_at: row.get("updated_at")?,
		})
	}
}

const COLUMNS: &str = "id, name, description, dedup_enabled, dedup_fields, dedup_strategy, created_at, updated_at";

async fn name_in_use(store: &sf_store::Store, name: &str) -> Result<bool> {
	let connection = store.pool().get_owned().await?;
	let name = name.to_string();
	let exists = tokio::task::spawn_blocking(move || {
		connection
			.query_row("SELECT 1 FROM projects WHERE name = ?1", params![name], |_| Ok(()))
			.map(|_| true)
			.or_else(|error| match error {
				rusqlite::Error::QueryReturnedNoRows => Ok(false),
				other => Err(other),
			})
	})
	.await??;

	Ok(exists)
}

/// Create a project. Names must be unique across the whole registry.
pub async fn create(store: &sf_store::Store, project: NewProject) -> Result<Project> {
	if name_in_use(store, &project.name).await? {
		return Err(Error::DuplicateProjectName(project.name));
	}

	let connection = store.pool().get_owned().await?;
	let created_at = now();
	let dedup_fields = join_fields(&project.dedup_fields);
	let new_project = project.clone();
	let id = tokio::task::spawn_blocking(move || {
		connection.execute(
			"INSERT INTO projects (name, description, dedup_enabled, dedup_fields, dedup_strategy, created_at) \
			 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
			params![
				new_project.name,
				new_project.description,
				new_project.dedup_enabled as i64,
				dedup_fields,
				new_project.dedup_strategy,
				created_at,
			],
		)?;
		Ok::<_, rusqlite::Error>(connection.last_insert_rowid())
	})
	.await??;

	get(store, id).await
}

pub async fn get(store: &sf_store::Store, project_id: i64) -> Result<Project> {
	let connection = store.pool().get_owned().await?;
	let project = tokio::task::spawn_blocking(move || {
		connection
			.query_row(&format!("SELECT {COLUMNS} FROM projects WHERE id = ?1"), params![project_id], Project::from_row)
			.map(Some)
			.or_else(|error| match error {
				rusqlite::Error::QueryReturnedNoRows => Ok(None),
				other => Err(other),
			})
	})
	.await??;

	project.ok_or(Error::UnknownProject(project_id))
}

pub async fn list(store: &sf_store::Store) -> Result<Vec<Project>> {
	let connection = store.pool().get_owned().await?;
	let projects = tokio::task::spawn_blocking(move || {
		let mut statement = connection.prepare(&format!("SELECT {COLUMNS} FROM projects ORDER BY created_at"))?;
		let rows = statement.query_map([], Project::from_row)?.collect::<rusqlite::Result<Vec<_>>>()?;
		Ok::<_, rusqlite::Error>(rows)
	})
	.await??;

	Ok(projects)
}

#[derive(Debug, Clone, Default)]
pub struct ProjectUpdate {
	pub name: Option<String>,
	pub description: Option<String>,
	pub dedup_enabled: Option<bool>,
	pub dedup_fields: Option<Vec<String>>,
	pub dedup_strategy: Option<String>,
}

pub async fn update(store: &sf_store::Store, project_id: i64, changes: ProjectUpdate) -> Result<Project> {
	let existing = get(store, project_id).await?;

	if let Some(name) = &changes.name {
		if *name != existing.name && name_in_use(store, name).await? {
			return Err(Error::DuplicateProjectName(name.clone()));
		}
	}

	let name = changes.name.unwrap_or(existing.name);
	let description = changes.description.or(existing.description);
	let dedup_enabled = changes.dedup_enabled.unwrap_or(existing.dedup_enabled);
	let dedup_fields = join_fields(&changes.dedup_fields.unwrap_or(existing.dedup_fields));
	let dedup_strategy = changes.dedup_strategy.unwrap_or(existing.dedup_strategy);
	let updated_at = now();

	let connection = store.pool().get_owned().await?;
	tokio::task::spawn_blocking(move || {
		connection.execute(
			"UPDATE projects SET name = ?1, description = ?2, dedup_enabled = ?3, dedup_fields = ?4, \
			 dedup_strategy = ?5, updated_at = ?6 WHERE id = ?7",
			params![name, description, dedup_enabled as i64, dedup_fields, dedup_strategy, updated_at, project_id],
		)
	})
	.await??;

	get(store, project_id).await
}

/// Delete a project. Per the project lifecycle, this cascades: the project's
/// field definitions and its physical records table go with it.
pub async fn delete(store: &sf_store::Store, project_id: i64) -> Result<()> {
	get(store, project_id).await?;

	store.drop_table(project_id).await?;

	let connection = store.pool().get_owned().await?;
	tokio::task::spawn_blocking(move || {
		connection.execute("DELETE FROM project_fields WHERE project_id = ?1", params![project_id])?;
		connection.execute("DELETE FROM projects WHERE id = ?1", params![project_id])
	})
	.await??;

	Ok(())
}
