use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::Result;

/// Create `<archive_root>/<batch_id>/` and return it. Mirrors
/// `_create_batch_directory`, which the original always creates up front so
/// every subsequent file copy has somewhere to land.
pub async fn create_batch_directory(archive_root: &Path, batch_id: &str) -> Result<PathBuf> {
	let directory = archive_root.join(batch_id);
	tokio::fs::create_dir_all(&directory).await?;
	Ok(directory)
}

/// Best-effort copy of a source file into the batch directory, preserving its
/// file name. A failure here is logged and surfaced to the caller as a
/// warning event rather than aborting the run - the archive copy is a
/// convenience, not load-bearing storage; the extracted rows are what
/// matters.
pub async fn archive_file(batch_directory: &Path, source: &Path) -> Option<String> {
	let file_name = source.file_name()?.to_string_lossy().into_owned();
	let destination = batch_directory.join(&file_name);

	match tokio::fs::copy(source, &destination).await {
		Ok(_) => None,
		Err(error) => {
			warn!(file = %source.display(), %error, "failed to archive source file");
			Some(format!("failed to archive {}: {error}", source.display()))
		}
	}
}
