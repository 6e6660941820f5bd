use std::collections::HashMap;

use crate::error::Result;

/// UTF-8 with BOM, so downstream spreadsheet tools pick up the encoding
/// without prompting. Column order equals the caller-supplied database
/// column order, not `HashMap`'s unspecified iteration order.
pub fn to_csv(columns: &[String], records: &[HashMap<String, String>]) -> Result<Vec<u8>> {
	let mut buffer = vec![0xEF, 0xBB, 0xBF];

	let mut writer = csv::WriterBuilder::new().from_writer(&mut buffer);
	writer.write_record(columns)?;
	for record in records {
		let row: Vec<&str> = columns.iter().map(|column| record.get(column).map(String::as_str).unwrap_or("")).collect();
		writer.write_record(&row)?;
	}
	writer.flush()?;
	drop(writer);

	Ok(buffer)
}

pub fn to_xlsx(columns: &[String], records: &[HashMap<String, String>]) -> Result<Vec<u8>> {
	let mut workbook = rust_xlsxwriter::Workbook::new();
	let worksheet = workbook.add_worksheet();

	for (column_index, column) in columns.iter().enumerate() {
		worksheet.write_string(0, column_index as u16, column)?;
	}

	for (row_index, record) in records.iter().enumerate() {
		for (column_index, column) in columns.iter().enumerate() {
			let value = record.get(column).map(String::as_str).unwrap_or("");
			worksheet.write_string((row_index + 1) as u32, column_index as u16, value)?;
		}
	}

	Ok(workbook.save_to_buffer()?)
}
