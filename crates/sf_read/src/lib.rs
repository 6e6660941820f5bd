mod error;
mod reader;

pub use error::{Error, Result};
pub use reader::{
	format_row_for_storage, is_empty_row, Reader, Row, RowIter, SheetShape, EMPTY_ROW_THRESHOLD,
};

#[cfg(test)]
mod tests {
	use rust_xlsxwriter::Workbook;

	use super::*;

	fn write_fixture(rows: &[Vec<&str>]) -> Vec<u8> {
		let mut workbook = Workbook::new();
		let sheet = workbook.add_worksheet();
		for (row_index, row) in rows.iter().enumerate() {
			for (column_index, value) in row.iter().enumerate() {
				sheet
					.write_string(row_index as u32, column_index as u16, *value)
					.unwrap();
			}
		}
		workbook.save_to_buffer().unwrap()
	}

	fn write_to_temp(bytes: &[u8]) -> tempfile_path::TempPath {
		tempfile_path::TempPath::with_bytes("xlsx", bytes)
	}

	mod tempfile_path {
		use std::{
			fs,
			path::{Path, PathBuf},
		};

		pub struct TempPath(PathBuf);

		impl TempPath {
			pub fn with_bytes(extension: &str, bytes: &[u8]) -> Self {
				let mut path = std::env::temp_dir();
				path.push(format!(
					"sf_read_test_{}_{}.{extension}",
					std::process::id(),
					fastrand_like()
				));
				fs::write(&path, bytes).unwrap();
				Self(path)
			}
		}

		impl AsRef<Path> for TempPath {
			fn as_ref(&self) -> &Path {
				&self.0
			}
		}

		impl Drop for TempPath {
			fn drop(&mut self) {
				let _ = fs::remove_file(&self.0);
			}
		}

		fn fastrand_like() -> u64 {
			use std::time::{SystemTime, UNIX_EPOCH};
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.unwrap()
				.as_nanos() as u64
		}
	}

	#[test]
	fn rejects_unsupported_extension() {
		let path = write_to_temp_txt();
		let error = Reader::open(&path).unwrap_err();
		assert!(matches!(error, Error::UnsupportedFormat(_)));
	}

	fn write_to_temp_txt() -> tempfile_path::TempPath {
		tempfile_path::TempPath::with_bytes("txt", b"not a workbook")
	}

	#[test]
	fn empty_row_termination_halts_after_threshold() {
		let mut rows = vec![vec!["a", "b"], vec!["1", "2"]];
		for _ in 0..EMPTY_ROW_THRESHOLD {
			rows.push(vec!["", ""]);
		}
		rows.push(vec!["late", "row"]);

		let bytes = write_fixture(&rows);
		let path = write_to_temp(&bytes);
		let mut reader = Reader::open(&path).unwrap();
		let name = reader.sheet_names().remove(0);

		let collected: Vec<_> = reader.iterate_rows(&name, 1, false).unwrap().collect();

		// header + data row + 9 blanks yielded (skip_empty = false), 10th halts.
		assert_eq!(collected.len(), 2 + EMPTY_ROW_THRESHOLD - 1);
		assert!(collected.iter().all(|(_, row)| row != &vec!["late", "row"]));
	}

	#[test]
	fn skip_empty_still_counts_toward_threshold() {
		let mut rows = vec![vec!["1"]];
		for _ in 0..EMPTY_ROW_THRESHOLD {
			rows.push(vec![""]);
		}
		rows.push(vec!["2"]);

		let bytes = write_fixture(&rows);
		let path = write_to_temp(&bytes);
		let mut reader = Reader::open(&path).unwrap();
		let name = reader.sheet_names().remove(0);

		let collected: Vec<_> = reader.iterate_rows(&name, 1, true).unwrap().collect();

        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].1, vec!["1".to_string()]);
	}

	#[test]
	fn is_empty_row_treats_whitespace_as_blank() {
		assert!(is_empty_row(&vec!["".into(), "   ".into()]));
		assert!(!is_empty_row(&vec!["".into(), "x".into()]));
	}

	#[test]
	fn format_row_for_storage_joins_mapped_cells() {
		let row: Row = vec!["Alice".into(), "".into(), "a@example.com".into()];
		let mapping = vec![(0, "name".to_string()), (2, "email".to_string())];
		assert_eq!(
			format_row_for_storage(&row, &mapping),
			"name:Alice; email:a@example.com"
		);
	}
}
