use rusqlite::{params, OptionalExtension};
use sf_store::Pool;

use crate::error::{Error, Result};

const CREATE_PROCESSING_TASKS: &str = r#"
CREATE TABLE IF NOT EXISTS "processing_tasks" (
	id TEXT PRIMARY KEY,
	project_id INTEGER NOT NULL,
	status TEXT NOT NULL,
	batch_id TEXT NOT NULL,
	total_files INTEGER NOT NULL DEFAULT 0,
	processed_files INTEGER NOT NULL DEFAULT 0,
	total_rows INTEGER NOT NULL DEFAULT 0,
	processed_rows INTEGER NOT NULL DEFAULT 0,
	success_count INTEGER NOT NULL DEFAULT 0,
	error_count INTEGER NOT NULL DEFAULT 0,
	created_at TEXT NOT NULL,
	updated_at TEXT
)"#;

const CREATE_BATCHES: &str = r#"
CREATE TABLE IF NOT EXISTS "batches" (
	id TEXT PRIMARY KEY,
	project_id INTEGER NOT NULL,
	file_count INTEGER NOT NULL DEFAULT 0,
	record_count INTEGER NOT NULL DEFAULT 0,
	created_at TEXT NOT NULL
)"#;

const CREATE_AI_CONFIGS: &str = r#"
CREATE TABLE IF NOT EXISTS "ai_configs" (
	id INTEGER PRIMARY KEY AUTOINCREMENT,
	name TEXT NOT NULL,
	api_url TEXT NOT NULL,
	model_name TEXT NOT NULL,
	api_key TEXT NOT NULL,
	temperature REAL NOT NULL DEFAULT 0.2,
	max_tokens INTEGER NOT NULL DEFAULT 1024,
	is_default INTEGER NOT NULL DEFAULT 0,
	created_at TEXT NOT NULL,
	updated_at TEXT
)"#;

pub async fn ensure_tables(pool: &Pool) -> Result<()> {
	let connection = pool.get_owned().await?;
	tokio::task::spawn_blocking(move || {
		connection.execute_batch(CREATE_PROCESSING_TASKS)?;
		connection.execute_batch(CREATE_BATCHES)?;
		connection.execute_batch(CREATE_AI_CONFIGS)?;
		Ok::<_, rusqlite::Error>(())
	})
	.await??;

	Ok(())
}

fn now() -> String {
	chrono::Utc::now().to_rfc3339()
}

/// Resolve the model configuration to use for a run: the caller's explicit
/// `model_config_id`, or - if absent - whichever `ai_configs` row has
/// `is_default = 1`. No default configured is a setup-time `Config` error;
/// no task is ever created for it.
pub async fn resolve_llm_config(pool: &Pool, model_config_id: Option<i64>) -> Result<sf_llm::Config> {
	let connection = pool.get_owned().await?;
	let row = tokio::task::spawn_blocking(move || -> rusqlite::Result<Option<(String, String, String, f32, u32)>> {
		let query = match model_config_id {
			Some(_) => "SELECT api_url, model_name, api_key, temperature, max_tokens FROM ai_configs WHERE id = ?1",
			None => "SELECT api_url, model_name, api_key, temperature, max_tokens FROM ai_configs WHERE is_default = 1 LIMIT 1",
		};
		connection
			.query_row(query, params![model_config_id.unwrap_or(0)], |row| {
				Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
			})
			.optional()
	})
	.await??;

	let (api_url, model_name, api_key, temperature, max_tokens) =
		row.ok_or_else(|| Error::Config("no model configuration available".to_string()))?;

	Ok(sf_llm::Config {
		api_url,
		model_name,
		api_key,
		temperature,
		max_tokens,
	})
}

/// Allocate the next batch id for today: `batch_YYYYMMDD_NNNN`, one past the
/// highest existing suffix for the same date, starting at `0001`.
pub async fn allocate_batch_id(pool: &Pool) -> Result<String> {
	let date = chrono::Utc::now().format("%Y%m%d").to_string();
	let connection = pool.get_owned().await?;
	let prefix = format!("batch_{date}_");
	let like_pattern = format!("{prefix}%");

	let max_suffix = tokio::task::spawn_blocking(move || -> rusqlite::Result<Option<String>> {
		connection
			.query_row(
				"SELECT id FROM batches WHERE id LIKE ?1 ORDER BY id DESC LIMIT 1",
				params![like_pattern],
				|row| row.get(0),
			)
			.optional()
	})
	.await??;

	Ok(next_batch_id(&prefix, max_suffix.as_deref()))
}

fn next_batch_id(prefix: &str, existing_max: Option<&str>) -> String {
	let next_number = match existing_max {
		Some(id) => id
			.rsplit('_')
			.next()
			.and_then(|suffix| suffix.parse::<u32>().ok())
			.map(|n| n + 1)
			.unwrap_or(1),
		None => 1,
	};

	format!("{prefix}{next_number:04}")
}

pub struct NewTask {
	pub id: String,
	pub project_id: i64,
	pub batch_id: String,
	pub total_files: u32,
}

pub async fn create_task(pool: &Pool, task: &NewTask) -> Result<()> {
	let connection = pool.get_owned().await?;
	let task_id = task.id.clone();
	let project_id = task.project_id;
	let batch_id = task.batch_id.clone();
	let total_files = task.total_files;
	let created_at = now();

	tokio::task::spawn_blocking(move || {
		connection.execute(
			"INSERT INTO processing_tasks (id, project_id, status, batch_id, total_files, created_at) \
			 VALUES (?1, ?2, 'processing', ?3, ?4, ?5)",
			params![task_id, project_id, batch_id, total_files, created_at],
		)
	})
	.await??;

	Ok(())
}

pub async fn set_task_status(pool: &Pool, task_id: &str, status: &str) -> Result<()> {
	let connection = pool.get_owned().await?;
	let task_id = task_id.to_string();
	let status = status.to_string();
	let updated_at = now();

	let affected = tokio::task::spawn_blocking(move || {
		connection.execute(
			"UPDATE processing_tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
			params![status, updated_at, task_id],
		)
	})
	.await??;

	if affected == 0 {
		return Err(Error::ControlNotFound(task_id));
	}

	Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct TaskProgress {
	pub processed_files: u32,
	pub total_rows: u32,
	pub processed_rows: u32,
	pub success_count: u32,
	pub error_count: u32,
}

pub async fn update_task_progress(pool: &Pool, task_id: &str, progress: &TaskProgress) -> Result<()> {
	let connection = pool.get_owned().await?;
	let task_id = task_id.to_string();
	let progress = progress.clone();
	let updated_at = now();

	tokio::task::spawn_blocking(move || {
		connection.execute(
			"UPDATE processing_tasks SET processed_files = ?1, total_rows = ?2, processed_rows = ?3, \
			 success_count = ?4, error_count = ?5, updated_at = ?6 WHERE id = ?7",
			params![
				progress.processed_files,
				progress.total_rows,
				progress.processed_rows,
				progress.success_count,
				progress.error_count,
				updated_at,
				task_id,
			],
		)
	})
	.await??;

	Ok(())
}

pub struct NewBatch {
	pub id: String,
	pub project_id: i64,
	pub file_count: u32,
}

pub async fn create_batch(pool: &Pool, batch: &NewBatch) -> Result<()> {
	let connection = pool.get_owned().await?;
	let id = batch.id.clone();
	let project_id = batch.project_id;
	let file_count = batch.file_count;
	let created_at = now();

	tokio::task::spawn_blocking(move || {
		connection.execute(
			"INSERT INTO batches (id, project_id, file_count, created_at) VALUES (?1, ?2, ?3, ?4)",
			params![id, project_id, file_count, created_at],
		)
	})
	.await??;

	Ok(())
}

pub async fn set_batch_record_count(pool: &Pool, batch_id: &str, record_count: u32) -> Result<()> {
	let connection = pool.get_owned().await?;
	let batch_id = batch_id.to_string();

	tokio::task::spawn_blocking(move || {
		connection.execute(
			"UPDATE batches SET record_count = ?1 WHERE id = ?2",
			params![record_count, batch_id],
		)
	})
	.await??;

	Ok(())
}

pub async fn task_status(pool: &Pool, task_id: &str) -> Result<Option<String>> {
	let connection = pool.get_owned().await?;
	let task_id = task_id.to_string();

	let status = tokio::task::spawn_blocking(move || {
		connection
			.query_row("SELECT status FROM processing_tasks WHERE id = ?1", params![task_id], |row| row.get(0))
			.optional()
	})
	.await??;

	Ok(status)
}

/// Full progress snapshot for a task, for callers polling status rather than
/// subscribing to the live event stream.
pub async fn task_snapshot(pool: &Pool, task_id: &str) -> Result<Option<crate::coordinator::ProcessingResult>> {
	let connection = pool.get_owned().await?;
	let task_id = task_id.to_string();

	let row = tokio::task::spawn_blocking(move || {
		connection
			.query_row(
				"SELECT id, batch_id, status, total_files, processed_files, total_rows, processed_rows, \
				 success_count, error_count FROM processing_tasks WHERE id = ?1",
				params![task_id],
				|row| {
					Ok(crate::coordinator::ProcessingResult {
						task_id: row.get(0)?,
						batch_id: row.get(1)?,
						status: row.get(2)?,
						total_files: row.get(3)?,
						processed_files: row.get(4)?,
						total_rows: row.get(5)?,
						processed_rows: row.get(6)?,
						success_count: row.get(7)?,
						error_count: row.get(8)?,
					})
				},
			)
			.optional()
	})
	.await??;

	Ok(row)
}

/// Test-only helper: insert a default `ai_configs` row pointing at a local
/// mock server, so coordinator integration tests don't need a real model
/// endpoint.
#[cfg(test)]
pub(crate) async fn default_ai_config_row(pool: &Pool, api_url: &str) {
	let connection = pool.get_owned().await.unwrap();
	let api_url = api_url.to_string();
	let created_at = now();
	tokio::task::spawn_blocking(move || {
		connection.execute(
			"INSERT INTO ai_configs (name, api_url, model_name, api_key, temperature, max_tokens, is_default, created_at) \
			 VALUES ('test', ?1, 'test-model', 'test-key', 0.2, 512, 1, ?2)",
			params![api_url, created_at],
		)
	})
	.await
	.unwrap()
	.unwrap();
}
