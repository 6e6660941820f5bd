use std::{
	collections::HashMap,
	path::PathBuf,
	sync::Arc,
	time::Instant,
};

use sf_llm::{ColumnMapping, FieldDescriptor};
use sf_progress::{Broadcaster, Event, EventKind};
use sf_read::Reader;
use sf_schema::Registry;
use sf_store::{DedupPolicy, DedupStrategy, NewRecord, RecordMeta, RecordStatus, Store};

use crate::{
	archive,
	config::Config,
	error::{Error, Result},
	registry::{TaskControl, TaskRegistry},
	state::{self, NewBatch, NewTask, TaskProgress},
};

/// Ties the pipeline crates (A-F) together and runs the two-phase per-sheet
/// algorithm as one cooperative worker per task. Cloning is cheap - every
/// field is an `Arc` or plain config value - so a clone can be moved into the
/// `tokio::spawn`ed worker while the original stays with the caller.
#[derive(Clone)]
pub struct Coordinator {
	store: Arc<Store>,
	schema: Arc<Registry>,
	progress: Arc<Broadcaster>,
	tasks: Arc<TaskRegistry>,
	config: Config,
}

pub struct SubmitRequest {
	pub project_id: i64,
	pub model_config_id: Option<i64>,
	pub file_paths: Vec<PathBuf>,
	pub task_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessingResult {
	pub task_id: String,
	pub batch_id: String,
	pub status: String,
	pub total_files: u32,
	pub processed_files: u32,
	pub total_rows: u32,
	pub processed_rows: u32,
	pub success_count: u32,
	pub error_count: u32,
}

enum RowOutcome {
	Success,
	ValidationFailed,
}

impl Coordinator {
	pub fn new(store: Arc<Store>, schema: Arc<Registry>, progress: Arc<Broadcaster>, config: Config) -> Self {
		Self {
			store,
			schema,
			progress,
			tasks: Arc::new(TaskRegistry::new()),
			config,
		}
	}

	pub fn subscribe(&self, task_id: &str) -> tokio::sync::broadcast::Receiver<Event> {
		self.progress.subscribe(task_id)
	}

	pub fn pause(&self, task_id: &str) -> Result<()> {
		Ok(self.tasks.pause(task_id)?)
	}

	pub fn resume(&self, task_id: &str) -> Result<()> {
		Ok(self.tasks.resume(task_id)?)
	}

	pub fn cancel(&self, task_id: &str) -> Result<()> {
		Ok(self.tasks.cancel(task_id)?)
	}

	/// A point-in-time progress snapshot, for callers polling status instead
	/// of subscribing to the event stream.
	pub async fn status(&self, task_id: &str) -> Result<Option<ProcessingResult>> {
		state::task_snapshot(self.store.pool(), task_id).await
	}

	/// Setup phase (spec.md's "Setup"): validate inputs, allocate ids, persist
	/// the task/batch rows and archive the input files, then hand the rest of
	/// the job to a spawned worker and return immediately with the task id.
	pub async fn submit(&self, request: SubmitRequest) -> Result<String> {
		let project = self.schema.get_project(request.project_id).await?;
		let llm_config = state::resolve_llm_config(self.store.pool(), request.model_config_id).await?;

		let task_id = request.task_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
		let batch_id = state::allocate_batch_id(self.store.pool()).await?;

		let control = self.tasks.register(&task_id);
		// Pre-create the broadcast channel so no event emitted before the
		// caller subscribes is ever lost to an UnknownTask error.
		let _ = self.progress.subscribe(&task_id);

		state::create_task(
			self.store.pool(),
			&NewTask {
				id: task_id.clone(),
				project_id: request.project_id,
				batch_id: batch_id.clone(),
				total_files: request.file_paths.len() as u32,
			},
		)
		.await?;

		let batch_directory = archive::create_batch_directory(&self.config.archive_root, &batch_id).await?;
		for path in &request.file_paths {
			if let Some(warning) = archive::archive_file(&batch_directory, path).await {
				self.emit(&task_id, EventKind::Warning { message: warning });
			}
		}

		state::create_batch(
			self.store.pool(),
			&NewBatch {
				id: batch_id.clone(),
				project_id: request.project_id,
				file_count: request.file_paths.len() as u32,
			},
		)
		.await?;

		let fields = self.schema.list_active_fields(request.project_id).await?;
		let specs: Vec<sf_store::FieldSpec> = fields.iter().map(sf_schema::Field::to_spec).collect();
		self.store.ensure_schema(request.project_id, &specs).await?;

		let policy = DedupPolicy {
			enabled: project.dedup_enabled,
			fields: project.dedup_fields.clone(),
			strategy: DedupStrategy::from(project.dedup_strategy.as_str()),
		};

		let worker = self.clone();
		let worker_task_id = task_id.clone();
		let worker_batch_id = batch_id.clone();
		let llm_client = sf_llm::Client::new(llm_config);
		tokio::spawn(async move {
			worker
				.run(
					worker_task_id,
					request.project_id,
					worker_batch_id,
					request.file_paths,
					fields,
					policy,
					llm_client,
					control,
				)
				.await;
		});

		Ok(task_id)
	}

	fn emit(&self, task_id: &str, kind: EventKind) {
		let _ = self.progress.broadcast(task_id, Event::new(task_id, kind));
	}

	#[allow(clippy::too_many_arguments)]
	async fn run(
		&self,
		task_id: String,
		project_id: i64,
		batch_id: String,
		file_paths: Vec<PathBuf>,
		fields: Vec<sf_schema::Field>,
		policy: DedupPolicy,
		llm: sf_llm::Client,
		mut control: TaskControl,
	) {
		let started_at = Instant::now();
		let rules: Vec<sf_validate::FieldRule> = fields
			.iter()
			.map(|field| sf_validate::FieldRule {
				name: field.name.clone(),
				label: field.label.clone(),
				field_type: sf_validate::FieldType::from(field.field_type.as_str()),
				required: field.required,
				custom_pattern: field.validation_pattern.clone(),
			})
			.collect();
		let descriptors: Vec<FieldDescriptor> = fields
			.iter()
			.map(|field| FieldDescriptor {
				name: field.name.clone(),
				label: field.label.clone(),
				field_type: field.field_type.clone(),
				required: field.required,
				extraction_hint: field.extraction_hint.clone(),
			})
			.collect();

		let mut processed_files = 0u32;
		let mut total_rows = 0u32;
		let mut processed_rows = 0u32;
		let mut success_count = 0u32;
		let mut error_count = 0u32;
		let mut cancelled = false;

		'files: for path in &file_paths {
			if control.is_cancelled() {
				cancelled = true;
				break;
			}

			let file_name = path.display().to_string();
			self.emit(&task_id, EventKind::FileStart { current_file: file_name.clone() });

			let mut reader = match Reader::open(path) {
				Ok(reader) => reader,
				Err(error) => {
					self.emit(&task_id, EventKind::Warning { message: format!("{file_name}: {error}") });
					processed_files += 1;
					continue;
				}
			};

			for sheet_name in reader.sheet_names() {
				control.wait_while_paused().await;
				if control.is_cancelled() {
					cancelled = true;
					break 'files;
				}

				self.emit(&task_id, EventKind::SheetStart { current_sheet: sheet_name.clone() });

				let sample_rows = match reader.read_rows(&sheet_name, 1, 10) {
					Ok(rows) => rows,
					Err(error) => {
						self.emit(&task_id, EventKind::Error { message: format!("{sheet_name}: {error}") });
						continue;
					}
				};

				let mapping = match llm.analyze_column_mapping(&sample_rows, &descriptors).await {
					Ok(mapping) => mapping,
					Err(error) => {
						self.emit(&task_id, EventKind::Error { message: format!("mapping failed: {error}") });
						continue;
					}
				};

				self.emit(
					&task_id,
					EventKind::ColumnMapping {
						current_sheet: sheet_name.clone(),
						header_row: mapping.header_row,
						mappings: mapping.column_mappings.iter().map(|(column, name)| (column.to_string(), name.clone())).collect(),
						confidence: mapping.confidence,
						unmatched_columns: mapping.unmatched_columns.clone(),
					},
				);

				let mapped_names: Vec<String> = mapping.column_mappings.values().cloned().collect();
				let unmapped = sf_validate::unmapped_required_fields(&mapped_names, &rules);
				if !unmapped.is_empty() {
					self.emit(
						&task_id,
						EventKind::Warning {
							message: format!("required fields not mapped: {}", unmapped.join(", ")),
						},
					);
				}

				if mapping.column_mappings.is_empty() {
					self.emit(
						&task_id,
						EventKind::SheetComplete {
							current_sheet: sheet_name.clone(),
							message: "0 success, 0 error".to_string(),
						},
					);
					continue;
				}

				let start_row = if mapping.header_row > 0 { mapping.header_row + 1 } else { 1 };
				let sheet_total_rows = reader.count_effective_rows(&sheet_name, start_row).unwrap_or(0);
				total_rows += sheet_total_rows;

				let mut sheet_success = 0u32;
				let mut sheet_error = 0u32;

				let iterator = match reader.iterate_rows(&sheet_name, start_row, true) {
					Ok(iterator) => iterator,
					Err(error) => {
						self.emit(&task_id, EventKind::Error { message: format!("{sheet_name}: {error}") });
						continue;
					}
				};

				for (row_number, row) in iterator {
					control.wait_while_paused().await;
					if control.is_cancelled() {
						cancelled = true;
						break 'files;
					}

					let outcome = self
						.process_row(project_id, &batch_id, &file_name, &sheet_name, row_number, &row, &mapping, &rules, &policy)
						.await;

					match outcome {
						Ok(RowOutcome::Success) => {
							sheet_success += 1;
							success_count += 1;
						}
						Ok(RowOutcome::ValidationFailed) => {
							sheet_error += 1;
							error_count += 1;
						}
						Err(error) => {
							let _ = self
								.store
								.insert(
									project_id,
									NewRecord {
										fields: HashMap::new(),
										meta: RecordMeta {
											raw_content: format!("{row:?}"),
											source_file: file_name.clone(),
											source_sheet: sheet_name.clone(),
											source_row_number: row_number,
											batch_id: batch_id.clone(),
											status: RecordStatus::Error,
											error_message: Some(error.to_string()),
										},
									},
								)
								.await;
							sheet_error += 1;
							error_count += 1;
						}
					}

					processed_rows += 1;
					// processed rows may exceed the pre-counted total if the
					// workbook changed under us; that is fine, it is only used
					// to compute a completion percentage downstream.

					let elapsed = started_at.elapsed().as_secs_f64().max(f64::EPSILON);
					self.emit(
						&task_id,
						EventKind::RowProcessed {
							current_file: file_name.clone(),
							current_sheet: sheet_name.clone(),
							current_row: row_number,
							total_rows,
							processed_rows,
							success_count,
							error_count,
							speed: processed_rows as f64 / elapsed,
						},
					);

					let _ = state::update_task_progress(
						self.store.pool(),
						&task_id,
						&TaskProgress {
							processed_files,
							total_rows,
							processed_rows,
							success_count,
							error_count,
						},
					)
					.await;
				}

				self.emit(
					&task_id,
					EventKind::SheetComplete {
						current_sheet: sheet_name.clone(),
						message: format!("{sheet_success} success, {sheet_error} error"),
					},
				);
			}

			processed_files += 1;
			self.emit(
				&task_id,
				EventKind::FileComplete {
					current_file: file_name.clone(),
					message: format!("{processed_files}/{} files processed", file_paths.len()),
				},
			);
		}

		let status = if cancelled { "cancelled" } else { "completed" };
		let _ = state::set_task_status(self.store.pool(), &task_id, status).await;
		let _ = state::update_task_progress(
			self.store.pool(),
			&task_id,
			&TaskProgress {
				processed_files,
				total_rows,
				processed_rows,
				success_count,
				error_count,
			},
		)
		.await;
		let _ = state::set_batch_record_count(self.store.pool(), &batch_id, success_count).await;

		self.emit(&task_id, if cancelled { EventKind::Cancelled } else { EventKind::Completed });
		self.tasks.unregister(&task_id);
		self.progress.unsubscribe(&task_id);
	}

	#[allow(clippy::too_many_arguments)]
	async fn process_row(
		&self,
		project_id: i64,
		batch_id: &str,
		source_file: &str,
		source_sheet: &str,
		row_number: u32,
		row: &sf_read::Row,
		mapping: &ColumnMapping,
		rules: &[sf_validate::FieldRule],
		policy: &DedupPolicy,
	) -> Result<RowOutcome> {
		let column_mapping: Vec<(usize, String)> = mapping.column_mappings.iter().map(|(&column, name)| (column, name.clone())).collect();

		let raw_fields: HashMap<String, Option<String>> = column_mapping
			.iter()
			.map(|(column, name)| (name.clone(), row.get(*column).cloned()))
			.collect();
		let normalized = sf_validate::normalize_record(&raw_fields, rules);

		match sf_validate::validate_record(&normalized, rules) {
			Ok(()) => {
				let raw_content = format!(
					"{}; confidence:{:.2}",
					sf_read::format_row_for_storage(row, &column_mapping),
					mapping.confidence
				);
				let meta = RecordMeta {
					raw_content,
					source_file: source_file.to_string(),
					source_sheet: source_sheet.to_string(),
					source_row_number: row_number,
					batch_id: batch_id.to_string(),
					status: RecordStatus::Success,
					error_message: None,
				};

				match self.store.insert_with_dedup(project_id, policy, NewRecord { fields: normalized, meta }).await? {
					sf_store::InsertOutcome::NotInserted => {
						Err(Error::StorageFatal("unique constraint violated on insert".to_string()))
					}
					_ => Ok(RowOutcome::Success),
				}
			}
			Err(errors) => {
				let message = sf_validate::join_errors(&errors);
				let meta = RecordMeta {
					raw_content: sf_read::format_row_for_storage(row, &column_mapping),
					source_file: source_file.to_string(),
					source_sheet: source_sheet.to_string(),
					source_row_number: row_number,
					batch_id: batch_id.to_string(),
					status: RecordStatus::Error,
					error_message: Some(message),
				};

				self.store.insert(project_id, NewRecord { fields: HashMap::new(), meta }).await?;
				Ok(RowOutcome::ValidationFailed)
			}
		}
	}
}

