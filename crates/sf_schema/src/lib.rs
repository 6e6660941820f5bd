mod error;
pub mod field;
mod migrations;
pub mod project;

use std::sync::Arc;

pub use error::{Error, Result};
pub use field::{Field, NewField};
pub use project::{NewProject, Project, ProjectUpdate};

/// The schema registry: project and field metadata layered on top of the
/// shared dynamic storage engine. A thin facade over the `project`/`field`
/// modules so callers (the extraction coordinator) hold one handle.
pub struct Registry {
	store: Arc<sf_store::Store>,
}

impl Registry {
	/// Open the registry against an already-open store, creating the
	/// `projects`/`project_fields` metadata tables if they don't exist yet.
	pub async fn open(store: Arc<sf_store::Store>) -> Result<Self> {
		migrations::ensure_metadata_tables(store.pool()).await?;
		Ok(Self { store })
	}

	pub fn store(&self) -> &Arc<sf_store::Store> {
		&self.store
	}

	pub async fn create_project(&self, new_project: NewProject) -> Result<Project> {
		project::create(&self.store, new_project).await
	}

	pub async fn get_project(&self, project_id: i64) -> Result<Project> {
		project::get(&self.store, project_id).await
	}

	pub async fn list_projects(&self) -> Result<Vec<Project>> {
		project::list(&self.store).await
	}

	pub async fn update_project(&self, project_id: i64, changes: ProjectUpdate) -> Result<Project> {
		project::update(&self.store, project_id, changes).await
	}

	pub async fn delete_project(&self, project_id: i64) -> Result<()> {
		project::delete(&self.store, project_id).await
	}

	pub async fn create_field(&self, project_id: i64, new_field: NewField) -> Result<Field> {
		field::create(&self.store, project_id, new_field).await
	}

	pub async fn list_active_fields(&self, project_id: i64) -> Result<Vec<Field>> {
		field::list_active(&self.store, project_id).await
	}

	pub async fn list_all_fields(&self, project_id: i64) -> Result<Vec<Field>> {
		field::list_all(&self.store, project_id).await
	}

	pub async fn update_field(&self, project_id: i64, field_id: i64, changes: NewField) -> Result<Field> {
		field::update(&self.store, project_id, field_id, changes).await
	}

	pub async fn delete_field(&self, field_id: i64) -> Result<()> {
		field::soft_delete(&self.store, field_id).await
	}

	pub async fn restore_field(&self, project_id: i64, field_id: i64) -> Result<Field> {
		field::restore(&self.store, project_id, field_id).await
	}

	/// Fields as validation/normalization rules for the extraction pipeline.
	pub async fn field_rules(&self, project_id: i64) -> Result<Vec<sf_validate::FieldRule>> {
		let fields = self.list_active_fields(project_id).await?;
		Ok(fields
			.into_iter()
			.map(|field| sf_validate::FieldRule {
				name: field.name,
				label: field.label,
				field_type: sf_validate::FieldType::from(field.field_type.as_str()),
				required: field.required,
				custom_pattern: field.validation_pattern,
			})
			.collect())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use sf_store::{Config, NewRecord, RecordMeta, RecordStatus, Store};

	async fn registry() -> Registry {
		let config = Config {
			database_path: ":memory:".to_string(),
			max_pool_size: 1,
		};
		let store = Arc::new(Store::open(&config).await.unwrap());
		Registry::open(store).await.unwrap()
	}

	fn new_project(name: &str) -> NewProject {
		NewProject {
			name: name.to_string(),
			description: None,
			dedup_enabled: false,
			dedup_fields: vec![],
			dedup_strategy: "skip".to_string(),
		}
	}

	fn new_field(name: &str, field_type: &str, order: i64) -> NewField {
		NewField {
			name: name.to_string(),
			label: name.to_string(),
			field_type: field_type.to_string(),
			required: false,
			is_dedup_key: false,
			validation_pattern: None,
			extraction_hint: None,
			display_order: order,
		}
	}

	#[tokio::test]
	async fn duplicate_project_name_is_rejected() {
		let registry = registry().await;
		registry.create_project(new_project("widgets")).await.unwrap();
		let result = registry.create_project(new_project("widgets")).await;
		assert!(matches!(result, Err(Error::DuplicateProjectName(_))));
	}

	#[tokio::test]
	async fn soft_deleted_field_is_excluded_from_active_list() {
		let registry = registry().await;
		let project = registry.create_project(new_project("widgets")).await.unwrap();
		let field = registry.create_field(project.id, new_field("sku", "text", 0)).await.unwrap();

		registry.delete_field(field.id).await.unwrap();

		let active = registry.list_active_fields(project.id).await.unwrap();
		assert!(active.is_empty());

		let all = registry.list_all_fields(project.id).await.unwrap();
		assert_eq!(all.len(), 1);
		assert!(all[0].is_deleted);
	}

	#[tokio::test]
	async fn recreating_soft_deleted_field_restores_instead_of_duplicating() {
		let registry = registry().await;
		let project = registry.create_project(new_project("widgets")).await.unwrap();
		let field = registry.create_field(project.id, new_field("sku", "text", 0)).await.unwrap();
		registry.delete_field(field.id).await.unwrap();

		let recreated = registry
			.create_field(project.id, new_field("sku", "text", 0))
			.await
			.unwrap();

		assert_eq!(recreated.id, field.id);
		assert!(!recreated.is_deleted);

		let all = registry.list_all_fields(project.id).await.unwrap();
		assert_eq!(all.len(), 1);
	}

	#[tokio::test]
	async fn restore_after_table_created_re_adds_column_and_keeps_data() {
		let registry = registry().await;
		let project = registry.create_project(new_project("widgets")).await.unwrap();
		registry.create_field(project.id, new_field("sku", "text", 0)).await.unwrap();
		let note_field = registry.create_field(project.id, new_field("note", "text", 1)).await.unwrap();

		let mut fields = std::collections::HashMap::new();
		fields.insert("sku".to_string(), "ABC".to_string());
		fields.insert("note".to_string(), "hello".to_string());
		registry
			.store()
			.insert(
				project.id,
				NewRecord {
					fields,
					meta: RecordMeta {
						raw_content: String::new(),
						source_file: "f.xlsx".to_string(),
						source_sheet: "Sheet1".to_string(),
						source_row_number: 2,
						batch_id: "batch_20260730_0001".to_string(),
						status: RecordStatus::Success,
						error_message: None,
					},
				},
			)
			.await
			.unwrap();

		registry.delete_field(note_field.id).await.unwrap();
		registry.restore_field(project.id, note_field.id).await.unwrap();

		let columns = registry.store().query(project.id, &Default::default(), 1, 10).await.unwrap().columns;
		assert!(columns.contains(&"note".to_string()));
	}

	#[tokio::test]
	async fn creating_a_field_does_not_drop_an_unrelated_soft_deleted_column() {
		let registry = registry().await;
		let project = registry.create_project(new_project("widgets")).await.unwrap();
		registry.create_field(project.id, new_field("name", "text", 0)).await.unwrap();
		let phone_field = registry.create_field(project.id, new_field("phone", "text", 1)).await.unwrap();

		let mut fields = std::collections::HashMap::new();
		fields.insert("name".to_string(), "Jane".to_string());
		fields.insert("phone".to_string(), "555-0100".to_string());
		registry
			.store()
			.insert(
				project.id,
				NewRecord {
					fields,
					meta: RecordMeta {
						raw_content: String::new(),
						source_file: "f.xlsx".to_string(),
						source_sheet: "Sheet1".to_string(),
						source_row_number: 2,
						batch_id: "batch_20260730_0001".to_string(),
						status: RecordStatus::Success,
						error_message: None,
					},
				},
			)
			.await
			.unwrap();

		registry.delete_field(phone_field.id).await.unwrap();
		registry.create_field(project.id, new_field("email", "text", 2)).await.unwrap();

		let columns = registry.store().query(project.id, &Default::default(), 1, 10).await.unwrap().columns;
		assert!(columns.contains(&"email".to_string()));

		registry.restore_field(project.id, phone_field.id).await.unwrap();

		let record = registry.store().get(project.id, 1).await.unwrap().unwrap();
		assert_eq!(record.get("phone"), Some(&"555-0100".to_string()));
	}

	#[tokio::test]
	async fn renaming_field_rebuilds_table_with_new_column() {
		let registry = registry().await;
		let project = registry.create_project(new_project("widgets")).await.unwrap();
		let field = registry.create_field(project.id, new_field("sku", "text", 0)).await.unwrap();

		registry.store().ensure_schema(project.id, &[field.to_spec()]).await.unwrap();

		let renamed = new_field("product_sku", "text", 0);
		registry.update_field(project.id, field.id, renamed).await.unwrap();

		let columns = registry.store().query(project.id, &Default::default(), 1, 10).await.unwrap().columns;
		assert!(columns.contains(&"product_sku".to_string()));
	}

	#[tokio::test]
	async fn deleting_project_drops_table_and_fields() {
		let registry = registry().await;
		let project = registry.create_project(new_project("widgets")).await.unwrap();
		registry.create_field(project.id, new_field("sku", "text", 0)).await.unwrap();
		registry.store().ensure_schema(project.id, &[]).await.unwrap();

		registry.delete_project(project.id).await.unwrap();

		assert!(!registry.store().table_exists(project.id).await.unwrap());
		assert!(registry.list_all_fields(project.id).await.unwrap().is_empty());
		assert!(matches!(registry.get_project(project.id).await, Err(Error::UnknownProject(_))));
	}
}
