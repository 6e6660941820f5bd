mod config;
mod connection;
mod ddl;
mod error;
mod export;
mod field;
mod record;
mod store;

pub use config::Config;
pub use connection::Pool;
pub use error::{Error, Result};
pub use field::{FieldSpec, SqlType};
pub use record::{
	DedupPolicy, DedupStrategy, InsertOutcome, NewRecord, QueryFilter, QueryResult, RecordMeta, RecordStatus,
};
pub use store::Store;

pub(crate) fn now() -> String {
	chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
	use std::collections::HashMap;

	use super::*;

	async fn test_store() -> Store {
		Store::open(&Config {
			database_path: ":memory:".to_string(),
			max_pool_size: 1,
		})
		.await
		.unwrap()
	}

	fn fields() -> Vec<FieldSpec> {
		vec![
			FieldSpec {
				name: "name".to_string(),
				sql_type: SqlType::Text,
			},
			FieldSpec {
				name: "phone".to_string(),
				sql_type: SqlType::Text,
			},
		]
	}

	fn new_record(name: &str, phone: &str) -> NewRecord {
		let mut map = HashMap::new();
		map.insert("name".to_string(), name.to_string());
		map.insert("phone".to_string(), phone.to_string());

		NewRecord {
			fields: map,
			meta: RecordMeta {
				raw_content: format!("name:{name}; phone:{phone}"),
				source_file: "input.xlsx".to_string(),
				source_sheet: "Sheet1".to_string(),
				source_row_number: 2,
				batch_id: "batch_20260730_0001".to_string(),
				status: RecordStatus::Success,
				error_message: None,
			},
		}
	}

	#[tokio::test]
	async fn creates_table_on_first_schema_sync() {
		let store = test_store().await;
		assert!(!store.table_exists(1).await.unwrap());

		store.ensure_schema(1, &fields()).await.unwrap();
		assert!(store.table_exists(1).await.unwrap());
	}

	#[tokio::test]
	async fn add_column_migration_preserves_existing_rows() {
		let store = test_store().await;
		store.ensure_schema(1, &fields()).await.unwrap();
		store.insert(1, new_record("Zhang San", "13812345678")).await.unwrap();

		let mut extended = fields();
		extended.push(FieldSpec {
			name: "email".to_string(),
			sql_type: SqlType::Text,
		});
		store.ensure_schema(1, &extended).await.unwrap();

		assert_eq!(store.record_count(1).await.unwrap(), 1);
		let result = store.query(1, &QueryFilter::default(), 1, 10).await.unwrap();
		assert_eq!(result.records[0].get("name").unwrap(), "Zhang San");
	}

	#[tokio::test]
	async fn destructive_rebuild_preserves_intersection() {
		let store = test_store().await;
		store.ensure_schema(1, &fields()).await.unwrap();
		store.insert(1, new_record("Zhang San", "13812345678")).await.unwrap();

		let reduced = vec![FieldSpec {
			name: "name".to_string(),
			sql_type: SqlType::Text,
		}];
		store.ensure_schema(1, &reduced).await.unwrap();

		assert_eq!(store.record_count(1).await.unwrap(), 1);
		let result = store.query(1, &QueryFilter::default(), 1, 10).await.unwrap();
		assert_eq!(result.records[0].get("name").unwrap(), "Zhang San");
		assert!(!result.columns.contains(&"phone".to_string()));
	}

	#[tokio::test]
	async fn dedup_skip_prevents_second_row() {
		let store = test_store().await;
		store.ensure_schema(1, &fields()).await.unwrap();

		let policy = DedupPolicy {
			enabled: true,
			fields: vec!["phone".to_string()],
			strategy: DedupStrategy::Skip,
		};

		store.insert_with_dedup(1, &policy, new_record("Zhang San", "13812345678")).await.unwrap();
		let outcome = store
			.insert_with_dedup(1, &policy, new_record("Li Si", "13812345678"))
			.await
			.unwrap();

		assert_eq!(outcome, InsertOutcome::Skipped);
		assert_eq!(store.record_count(1).await.unwrap(), 1);
	}

	#[tokio::test]
	async fn dedup_update_overwrites_matching_row() {
		let store = test_store().await;
		store.ensure_schema(1, &fields()).await.unwrap();

		let policy = DedupPolicy {
			enabled: true,
			fields: vec!["phone".to_string()],
			strategy: DedupStrategy::Update,
		};

		store.insert_with_dedup(1, &policy, new_record("Zhang San", "13812345678")).await.unwrap();
		store.insert_with_dedup(1, &policy, new_record("Li Si", "13812345678")).await.unwrap();

		let result = store.query(1, &QueryFilter::default(), 1, 10).await.unwrap();
		assert_eq!(result.records.len(), 1);
		assert_eq!(result.records[0].get("name").unwrap(), "Li Si");
	}

	#[tokio::test]
	async fn dedup_merge_preserves_non_overwritten_values() {
		let store = test_store().await;
		store.ensure_schema(1, &fields()).await.unwrap();

		let policy = DedupPolicy {
			enabled: true,
			fields: vec!["phone".to_string()],
			strategy: DedupStrategy::Merge,
		};

		store.insert_with_dedup(1, &policy, new_record("Zhang San", "13812345678")).await.unwrap();

		let mut second = new_record("", "13812345678");
		second.fields.remove("name");
		store.insert_with_dedup(1, &policy, second).await.unwrap();

		let result = store.query(1, &QueryFilter::default(), 1, 10).await.unwrap();
		assert_eq!(result.records[0].get("name").unwrap(), "Zhang San");
	}

	#[tokio::test]
	async fn pagination_respects_page_size() {
		let store = test_store().await;
		store.ensure_schema(1, &fields()).await.unwrap();
		for index in 0..5 {
			store.insert(1, new_record(&format!("Person {index}"), &format!("1381234{index:04}"))).await.unwrap();
		}

		let page = store.query(1, &QueryFilter::default(), 1, 2).await.unwrap();
		assert_eq!(page.records.len(), 2);
		assert_eq!(page.total, 5);
	}

	#[tokio::test]
	async fn csv_export_round_trips_field_values() {
		let store = test_store().await;
		store.ensure_schema(1, &fields()).await.unwrap();
		store.insert(1, new_record("Zhang San", "13812345678")).await.unwrap();

		let bytes = store.export(1, "csv", None).await.unwrap();
		let text = String::from_utf8(bytes).unwrap();
		assert!(text.contains("Zhang San"));
		assert!(text.contains("13812345678"));
	}

	#[tokio::test]
	async fn export_with_no_rows_is_empty() {
		let store = test_store().await;
		store.ensure_schema(1, &fields()).await.unwrap();

		let bytes = store.export(1, "csv", None).await.unwrap();
		assert!(bytes.is_empty());
	}
}
