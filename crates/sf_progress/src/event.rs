use std::collections::HashMap;

use serde::Serialize;

/// A progress event for one task. Every variant carries `task_id` via the
/// enclosing [`Event`] wrapper rather than repeating it per-kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
	FileStart {
		current_file: String,
	},
	FileComplete {
		current_file: String,
		message: String,
	},
	SheetStart {
		current_sheet: String,
	},
	ColumnMapping {
		current_sheet: String,
		header_row: u32,
		mappings: HashMap<String, String>,
		confidence: f64,
		unmatched_columns: Vec<usize>,
	},
	Warning {
		message: String,
	},
	RowProcessed {
		current_file: String,
		current_sheet: String,
		current_row: u32,
		total_rows: u32,
		processed_rows: u32,
		success_count: u32,
		error_count: u32,
		speed: f64,
	},
	SheetComplete {
		current_sheet: String,
		message: String,
	},
	Error {
		message: String,
	},
	Completed,
	Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
	pub task_id: String,
	#[serde(flatten)]
	pub kind: EventKind,
}

impl Event {
	pub fn new(task_id: impl Into<String>, kind: EventKind) -> Self {
		Self {
			task_id: task_id.into(),
			kind,
		}
	}
}
