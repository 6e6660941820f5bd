use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
	Success,
	Error,
}

impl RecordStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			RecordStatus::Success => "success",
			RecordStatus::Error => "error",
		}
	}
}

/// Fixed metadata carried by every inserted row, alongside its field columns.
#[derive(Debug, Clone)]
pub struct RecordMeta {
	pub raw_content: String,
	pub source_file: String,
	pub source_sheet: String,
	pub source_row_number: u32,
	pub batch_id: String,
	pub status: RecordStatus,
	pub error_message: Option<String>,
}

/// A candidate record prior to insertion: validated/normalized field values
/// plus the provenance metadata block.
#[derive(Debug, Clone)]
pub struct NewRecord {
	pub fields: HashMap<String, String>,
	pub meta: RecordMeta,
}

/// Outcome of inserting a candidate record when deduplication is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
	Skip,
	Update,
	Merge,
}

impl From<&str> for DedupStrategy {
	fn from(value: &str) -> Self {
		match value {
			"update" => DedupStrategy::Update,
			"merge" => DedupStrategy::Merge,
			_ => DedupStrategy::Skip,
		}
	}
}

/// Dedup policy carried on the project, passed down to the storage engine
/// rather than looked up by it.
#[derive(Debug, Clone)]
pub struct DedupPolicy {
	pub enabled: bool,
	pub fields: Vec<String>,
	pub strategy: DedupStrategy,
}

/// Sentinel result of an insert that may have been diverted by dedup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
	Inserted(i64),
	Updated(i64),
	Skipped,
	NotInserted,
}

#[derive(Debug, Clone, Default)]
pub struct QueryFilter {
	pub batch_id: Option<String>,
	pub status: Option<RecordStatus>,
	pub search: Option<String>,
	pub order_by: Option<String>,
	pub order_desc: bool,
}

#[derive(Debug, Clone)]
pub struct QueryResult {
	pub records: Vec<HashMap<String, String>>,
	/// Database column order, for callers (e.g. export) that must not rely
	/// on `HashMap`'s unspecified iteration order.
	pub columns: Vec<String>,
	pub total: u64,
	pub page: u32,
	pub page_size: u32,
}
