use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unsupported file format: {0}")]
	UnsupportedFormat(PathBuf),

	#[error("failed to open workbook {path}: {reason}")]
	OpenFailed { path: PathBuf, reason: String },

	#[error("sheet not found: {0}")]
	SheetNotFound(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
