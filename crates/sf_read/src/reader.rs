use std::{
	fs::File,
	io::BufReader,
	path::{Path, PathBuf},
};

use calamine::{open_workbook_auto, Data, Range, Reader as _, Sheets};

use crate::error::{Error, Result};

/// Number of consecutive blank rows after which [`Reader::iterate_rows`] stops
/// yielding further rows for a sheet.
pub const EMPTY_ROW_THRESHOLD: usize = 10;

/// A single data row, cells coerced to text (blank cells become `""`).
pub type Row = Vec<String>;

/// Row/column counts for a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetShape {
	pub row_count: u32,
	pub column_count: u32,
}

/// A spreadsheet opened in read-only, already-computed-values mode.
///
/// Only `.xlsx`/`.xls` are accepted; the whole workbook is decoded up front,
/// there is no streaming for multi-gigabyte files.
pub struct Reader {
	path: PathBuf,
	workbook: Sheets<BufReader<File>>,
}

impl Reader {
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref().to_path_buf();

		let extension = path
			.extension()
			.and_then(|ext| ext.to_str())
			.map(|ext| ext.to_ascii_lowercase());

		match extension.as_deref() {
			Some("xlsx") | Some("xls") => {}
			_ => return Err(Error::UnsupportedFormat(path)),
		}

		let workbook = open_workbook_auto(&path).map_err(|error| Error::OpenFailed {
			path: path.clone(),
			reason: error.to_string(),
		})?;

		tracing::debug!(path = %path.display(), "opened workbook");

		Ok(Self { path, workbook })
	}

	pub fn sheet_names(&self) -> Vec<String> {
		self.workbook.sheet_names()
	}

	pub fn shape(&mut self, sheet_name: &str) -> Result<SheetShape> {
		let range = self.range(sheet_name)?;
		let (rows, columns) = range.get_size();
		Ok(SheetShape {
			row_count: rows as u32,
			column_count: columns as u32,
		})
	}

	/// Read a contiguous span of rows, 1-based inclusive `start_row`.
	pub fn read_rows(&mut self, sheet_name: &str, start_row: u32, count: u32) -> Result<Vec<Row>> {
		let range = self.range(sheet_name)?;
		let rows = row_texts(&range);

		let start = (start_row.saturating_sub(1)) as usize;
		let end = (start + count as usize).min(rows.len());

		Ok(rows.get(start..end).unwrap_or_default().to_vec())
	}

	/// Read a single 1-based row in full.
	pub fn read_row(&mut self, sheet_name: &str, row_number: u32) -> Result<Row> {
		let range = self.range(sheet_name)?;
		let rows = row_texts(&range);
		let index = (row_number.saturating_sub(1)) as usize;
		Ok(rows.get(index).cloned().unwrap_or_default())
	}

	/// Read only the requested 0-based column indices of a 1-based row.
	pub fn read_row_columns(
		&mut self,
		sheet_name: &str,
		row_number: u32,
		columns: &[usize],
	) -> Result<Vec<Option<String>>> {
		let row = self.read_row(sheet_name, row_number)?;
		Ok(columns
			.iter()
			.map(|&index| row.get(index).cloned())
			.collect())
	}

	/// Iterate data rows from `start_row` (1-based) onward, stopping after
	/// [`EMPTY_ROW_THRESHOLD`] consecutive empty rows. `skip_empty` controls
	/// whether empty rows are yielded, not whether they count toward the
	/// threshold - they always count.
	pub fn iterate_rows(
		&mut self,
		sheet_name: &str,
		start_row: u32,
		skip_empty: bool,
	) -> Result<RowIter> {
		let range = self.range(sheet_name)?;
		let rows = row_texts(&range);
		let start = (start_row.saturating_sub(1)) as usize;

		Ok(RowIter {
			rows,
			next_index: start,
			next_row_number: start_row.max(1),
			consecutive_empty: 0,
			skip_empty,
			halted: false,
		})
	}

	/// Count of rows that [`iterate_rows`](Self::iterate_rows) would yield
	/// (with `skip_empty = true`) before hitting the empty-row threshold.
	pub fn count_effective_rows(&mut self, sheet_name: &str, start_row: u32) -> Result<u32> {
		let iter = self.iterate_rows(sheet_name, start_row, true)?;
		Ok(iter.count() as u32)
	}

	fn range(&mut self, sheet_name: &str) -> Result<Range<Data>> {
		self.workbook
			.worksheet_range(sheet_name)
			.map_err(|_| Error::SheetNotFound(sheet_name.to_string()))
	}
}

impl Drop for Reader {
	fn drop(&mut self) {
		tracing::debug!(path = %self.path.display(), "releasing workbook");
	}
}

fn row_texts(range: &Range<Data>) -> Vec<Row> {
	range
		.rows()
		.map(|row| row.iter().map(cell_to_text).collect())
		.collect()
}

fn cell_to_text(cell: &Data) -> String {
	match cell {
		Data::Empty => String::new(),
		Data::String(value) => value.clone(),
		Data::Bool(value) => value.to_string(),
		Data::Int(value) => value.to_string(),
		Data::Float(value) => {
			if value.fract() == 0.0 && value.abs() < 1e15 {
				format!("{value:.0}")
			} else {
				value.to_string()
			}
		}
		Data::DateTime(value) => value.to_string(),
		Data::DateTimeIso(value) | Data::DurationIso(value) => value.clone(),
		Data::Error(error) => format!("#ERROR:{error:?}"),
	}
}

/// A row is empty iff every cell stringifies to whitespace.
pub fn is_empty_row(row: &Row) -> bool {
	row.iter().all(|cell| cell.trim().is_empty())
}

pub struct RowIter {
	rows: Vec<Row>,
	next_index: usize,
	next_row_number: u32,
	consecutive_empty: usize,
	skip_empty: bool,
	halted: bool,
}

impl Iterator for RowIter {
	type Item = (u32, Row);

	fn next(&mut self) -> Option<Self::Item> {
		loop {
			if self.halted || self.next_index >= self.rows.len() {
				return None;
			}

			let row = self.rows[self.next_index].clone();
			let row_number = self.next_row_number;
			self.next_index += 1;
			self.next_row_number += 1;

			if is_empty_row(&row) {
				self.consecutive_empty += 1;
				if self.consecutive_empty >= EMPTY_ROW_THRESHOLD {
					self.halted = true;
					return None;
				}
				if self.skip_empty {
					continue;
				}
			} else {
				self.consecutive_empty = 0;
			}

			return Some((row_number, row));
		}
	}
}

/// Reassemble the cells a column mapping pulled out of a row into the
/// `field:value; ...` form used for a record's raw-content column.
pub fn format_row_for_storage(row: &Row, mapping: &[(usize, String)]) -> String {
	let pairs: Vec<String> = mapping
		.iter()
		.filter_map(|(column, field)| {
			let value = row.get(*column)?;
			if value.is_empty() {
				None
			} else {
				Some(format!("{field}:{value}"))
			}
		})
		.collect();

	if pairs.is_empty() {
		"(empty row)".to_string()
	} else {
		pairs.join("; ")
	}
}
