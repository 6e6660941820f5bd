mod archive;
mod coordinator;
mod error;
mod registry;
mod state;

pub mod config;

use std::sync::Arc;

pub use coordinator::{Coordinator, ProcessingResult, SubmitRequest};
pub use error::{Error, Result};

/// Open the storage engine, schema registry and progress broadcaster from a
/// loaded [`config::Config`], then build a ready-to-use [`Coordinator`].
pub async fn open(config: config::Config) -> Result<Coordinator> {
	let store = Arc::new(sf_store::Store::open(&config.store).await?);
	state::ensure_tables(store.pool()).await?;
	let schema = Arc::new(sf_schema::Registry::open(store.clone()).await?);
	let progress = Arc::new(sf_progress::Broadcaster::new());

	Ok(Coordinator::new(store, schema, progress, config))
}

#[cfg(test)]
mod tests {
	use serde_json::json;
	use wiremock::{
		matchers::{method, path},
		Mock, MockServer, ResponseTemplate,
	};

	use super::*;
	use crate::state::default_ai_config_row;

	async fn coordinator(archive_root: &std::path::Path) -> (Coordinator, Arc<sf_store::Store>, Arc<sf_schema::Registry>) {
		let config = config::Config {
			store: sf_store::Config {
				database_path: ":memory:".to_string(),
				max_pool_size: 1,
			},
			archive_root: archive_root.to_path_buf(),
		};

		let store = Arc::new(sf_store::Store::open(&config.store).await.unwrap());
		state::ensure_tables(store.pool()).await.unwrap();
		let schema = Arc::new(sf_schema::Registry::open(store.clone()).await.unwrap());
		let progress = Arc::new(sf_progress::Broadcaster::new());
		let coordinator = Coordinator::new(store.clone(), schema.clone(), progress, config);

		(coordinator, store, schema)
	}

	fn write_fixture(rows: &[Vec<&str>]) -> Vec<u8> {
		let mut workbook = rust_xlsxwriter::Workbook::new();
		let sheet = workbook.add_worksheet();
		for (row_index, row) in rows.iter().enumerate() {
			for (column_index, value) in row.iter().enumerate() {
				sheet.write_string(row_index as u32, column_index as u16, *value).unwrap();
			}
		}
		workbook.save_to_buffer().unwrap()
	}

	#[tokio::test]
	async fn missing_model_configuration_is_a_config_error_before_any_task_exists() {
		let dir = tempdir();
		let (coordinator, store, schema) = coordinator(dir.path()).await;

		let project = schema
			.create_project(sf_schema::NewProject {
				name: "widgets".to_string(),
				description: None,
				dedup_enabled: false,
				dedup_fields: vec![],
				dedup_strategy: "skip".to_string(),
			})
			.await
			.unwrap();

		let result = coordinator
			.submit(SubmitRequest {
				project_id: project.id,
				model_config_id: None,
				file_paths: vec![],
				task_id: None,
			})
			.await;

		assert!(matches!(result, Err(Error::Config(_))));
		assert_eq!(store.pool().get().await.unwrap().query_row("SELECT COUNT(*) FROM processing_tasks", [], |row| row.get::<_, i64>(0)).unwrap(), 0);
	}

	#[tokio::test]
	async fn happy_path_end_to_end() {
		let dir = tempdir();
		let (coordinator, store, schema) = coordinator(dir.path()).await;
		let server = MockServer::start().await;

		default_ai_config_row(store.pool(), &server.uri()).await;

		let project = schema
			.create_project(sf_schema::NewProject {
				name: "contacts".to_string(),
				description: None,
				dedup_enabled: false,
				dedup_fields: vec![],
				dedup_strategy: "skip".to_string(),
			})
			.await
			.unwrap();
		schema
			.create_field(
				project.id,
				sf_schema::NewField {
					name: "name".to_string(),
					label: "Name".to_string(),
					field_type: "text".to_string(),
					required: true,
					is_dedup_key: false,
					validation_pattern: None,
					extraction_hint: None,
					display_order: 0,
				},
			)
			.await
			.unwrap();
		schema
			.create_field(
				project.id,
				sf_schema::NewField {
					name: "phone".to_string(),
					label: "Phone".to_string(),
					field_type: "phone".to_string(),
					required: true,
					is_dedup_key: false,
					validation_pattern: None,
					extraction_hint: None,
					display_order: 1,
				},
			)
			.await
			.unwrap();

		let body = json!({
			"choices": [{"message": {"content": "{\"header_row\":1,\"column_mappings\":{\"0\":\"name\",\"1\":\"phone\"},\"confidence\":0.95,\"unmatched_columns\":[]}"}}]
		});
		Mock::given(method("POST"))
			.and(path("/"))
			.respond_with(ResponseTemplate::new(200).set_body_json(body))
			.mount(&server)
			.await;

		let bytes = write_fixture(&[
			vec!["name", "phone"],
			vec!["Zhang San", "138-1234-5678"],
			vec!["Li Si", "13987654321"],
		]);
		let file_path = dir.path().join("input.xlsx");
		std::fs::write(&file_path, bytes).unwrap();

		let task_id = coordinator
			.submit(SubmitRequest {
				project_id: project.id,
				model_config_id: None,
				file_paths: vec![file_path],
				task_id: None,
			})
			.await
			.unwrap();

		wait_for_terminal_status(store.pool(), &task_id).await;

		assert_eq!(store.record_count(project.id).await.unwrap(), 2);
		let result = store.query(project.id, &Default::default(), 1, 10).await.unwrap();
		let phones: std::collections::HashSet<_> = result.records.iter().map(|record| record.get("phone").unwrap().clone()).collect();
		assert!(phones.contains("13812345678"));
		assert!(phones.contains("13987654321"));

		let snapshot = coordinator.status(&task_id).await.unwrap().unwrap();
		assert_eq!(snapshot.status, "completed");
		assert_eq!(snapshot.success_count, 2);
		assert_eq!(snapshot.error_count, 0);
	}

	async fn wait_for_terminal_status(pool: &sf_store::Pool, task_id: &str) {
		for _ in 0..200 {
			if let Ok(Some(status)) = state::task_status(pool, task_id).await {
				if status == "completed" || status == "cancelled" || status == "error" {
					return;
				}
			}
			tokio::time::sleep(std::time::Duration::from_millis(10)).await;
		}
		panic!("task never reached a terminal state");
	}

	fn tempdir() -> TempDir {
		TempDir::new()
	}

	struct TempDir(std::path::PathBuf);

	impl TempDir {
		fn new() -> Self {
			let mut path = std::env::temp_dir();
			path.push(format!("sf_core_test_{}_{}", std::process::id(), fastrand_like()));
			std::fs::create_dir_all(&path).unwrap();
			Self(path)
		}

		fn path(&self) -> &std::path::Path {
			&self.0
		}
	}

	impl Drop for TempDir {
		fn drop(&mut self) {
			let _ = std::fs::remove_dir_all(&self.0);
		}
	}

	fn fastrand_like() -> u64 {
		use std::time::{SystemTime, UNIX_EPOCH};
		SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos() as u64
	}
}
