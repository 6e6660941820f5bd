use std::{collections::HashMap, path::PathBuf, sync::RwLock};

use rusqlite::Connection;
use sea_query::{Alias, Expr, Func, Iden, Order, Query, SqliteQueryBuilder, Table};
use sea_query_rusqlite::RusqliteBinder;
use tokio::task;

use crate::{
	connection::{build_pool, Pool},
	ddl::{self, create_table_statement, field_column, table_name, MigrationPlan, METADATA_COLUMNS},
	error::{Error, Result},
	field::FieldSpec,
	record::{DedupPolicy, DedupStrategy, InsertOutcome, NewRecord, QueryFilter, QueryResult, RecordStatus},
	Config,
};

/// Dynamic per-project storage engine. Holds the single shared connection
/// pool plus a per-project column-name cache, invalidated on schema change.
pub struct Store {
	pool: Pool,
	column_cache: RwLock<HashMap<i64, Vec<String>>>,
}

impl Store {
	pub async fn open(config: &Config) -> Result<Self> {
		let pool = build_pool(PathBuf::from(&config.database_path), config.max_pool_size).await?;
		Ok(Self {
			pool,
			column_cache: RwLock::new(HashMap::new()),
		})
	}

	/// The shared connection pool, for sibling crates (the schema registry)
	/// that manage their own fixed-schema tables against the same database
	/// rather than standing up a second pool.
	pub fn pool(&self) -> &Pool {
		&self.pool
	}

	fn invalidate_cache(&self, project_id: i64) {
		self.column_cache.write().expect("poisoned").remove(&project_id);
	}

	async fn columns(&self, project_id: i64) -> Result<Vec<String>> {
		if let Some(columns) = self.column_cache.read().expect("poisoned").get(&project_id) {
			return Ok(columns.clone());
		}

		let connection = self.pool.get_owned().await?;
		let columns = task::spawn_blocking(move || table_columns(&connection, project_id)).await??;

		self.column_cache
			.write()
			.expect("poisoned")
			.insert(project_id, columns.clone());

		Ok(columns)
	}

	pub async fn table_exists(&self, project_id: i64) -> Result<bool> {
		let connection = self.pool.get_owned().await?;
		let exists = task::spawn_blocking(move || table_exists(&connection, project_id)).await??;
		Ok(exists)
	}

	pub async fn record_count(&self, project_id: i64) -> Result<u64> {
		if !self.table_exists(project_id).await? {
			return Ok(0);
		}

		let connection = self.pool.get().await?;
		let query = Query::select()
			.expr(Func::count(Expr::col(Alias::new("id"))))
			.from(table_name(project_id))
			.to_owned();
		let (sql, values) = query.build_rusqlite(SqliteQueryBuilder);

		let count: i64 = connection.query_row(&sql, &*values.as_params(), |row| row.get(0))?;
		Ok(count as u64)
	}

	pub async fn drop_table(&self, project_id: i64) -> Result<()> {
		let connection = self.pool.get_owned().await?;
		task::spawn_blocking(move || {
			let statement = Table::drop().table(table_name(project_id)).if_exists().to_owned();
			connection.execute_batch(&statement.to_string(SqliteQueryBuilder))
		})
		.await??;

		self.invalidate_cache(project_id);
		Ok(())
	}

	/// Ensure the project's physical table matches `fields`, applying the
	/// minimal migration operation implied by the current vs. desired set.
	/// A field present in the table but absent from `fields` is dropped - use
	/// this only where that is the intended behavior (a rename or retype of
	/// an active field), never for a change that merely adds or restores a
	/// field, since every other field that happens to be soft-deleted at the
	/// time would look like a removal.
	#[tracing::instrument(level = "debug", skip(self, fields))]
	pub async fn ensure_schema(&self, project_id: i64, fields: &[FieldSpec]) -> Result<()> {
		let exists = self.table_exists(project_id).await?;
		let current_columns = if exists { self.columns(project_id).await? } else { vec![] };
		let plan = ddl::plan_migration(exists, &current_columns, fields);

		let fields = fields.to_vec();
		let connection = self.pool.get_owned().await?;

		task::spawn_blocking(move || apply_migration(&connection, project_id, &fields, plan)).await??;

		self.invalidate_cache(project_id);
		Ok(())
	}

	/// Add `field`'s column if the project's table already exists and doesn't
	/// have it yet. Never removes or rebuilds - the additive counterpart to
	/// `ensure_schema`, for call sites (field create, field restore) where an
	/// unrelated soft-deleted field's still-present column must never be
	/// mistaken for something to drop.
	#[tracing::instrument(level = "debug", skip(self, field))]
	pub async fn add_column(&self, project_id: i64, field: &FieldSpec) -> Result<()> {
		if !self.table_exists(project_id).await? {
			return Ok(());
		}

		let current_columns = self.columns(project_id).await?;
		if current_columns.iter().any(|column| column == &field.name) {
			return Ok(());
		}

		let field = field.clone();
		let connection = self.pool.get_owned().await?;

		task::spawn_blocking(move || {
			let plan = MigrationPlan::AddColumns(vec![field.name.clone()]);
			apply_migration(&connection, project_id, std::slice::from_ref(&field), plan)
		})
		.await??;

		self.invalidate_cache(project_id);
		Ok(())
	}

	#[tracing::instrument(level = "debug", skip(self, record))]
	pub async fn insert(&self, project_id: i64, record: NewRecord) -> Result<InsertOutcome> {
		let columns = self.columns(project_id).await?;
		let connection = self.pool.get_owned().await?;

		let outcome = task::spawn_blocking(move || insert_record(&connection, project_id, &record, &columns))
			.await??;
		Ok(outcome)
	}

	pub async fn update(&self, project_id: i64, record_id: i64, fields: HashMap<String, String>) -> Result<bool> {
		let columns = self.columns(project_id).await?;
		let connection = self.pool.get_owned().await?;

		let updated =
			task::spawn_blocking(move || update_record(&connection, project_id, record_id, &fields, &columns))
				.await??;
		Ok(updated)
	}

	pub async fn delete(&self, project_id: i64, record_id: i64) -> Result<bool> {
		let connection = self.pool.get().await?;
		let statement = Query::delete()
			.from_table(table_name(project_id))
			.and_where(Expr::col(Alias::new("id")).eq(record_id))
			.to_owned();
		let (sql, values) = statement.build_rusqlite(SqliteQueryBuilder);
		let affected = connection.execute(&sql, &*values.as_params())?;
		Ok(affected > 0)
	}

	pub async fn get(&self, project_id: i64, record_id: i64) -> Result<Option<HashMap<String, String>>> {
		let columns = self.columns(project_id).await?;
		let connection = self.pool.get().await?;

		let statement = Query::select()
			.columns(all_columns(&columns))
			.from(table_name(project_id))
			.and_where(Expr::col(Alias::new("id")).eq(record_id))
			.to_owned();
		let (sql, values) = statement.build_rusqlite(SqliteQueryBuilder);

		let mut prepared = connection.prepare(&sql)?;
		let mut rows = prepared.query(&*values.as_params())?;

		match rows.next()? {
			Some(row) => Ok(Some(row_to_map(row, &columns)?)),
			None => Ok(None),
		}
	}

	pub async fn query(&self, project_id: i64, filter: &QueryFilter, page: u32, page_size: u32) -> Result<QueryResult> {
		let columns = self.columns(project_id).await?;
		let connection = self.pool.get().await?;

		let mut count_statement = Query::select()
			.expr(Func::count(Expr::col(Alias::new("id"))))
			.from(table_name(project_id))
			.to_owned();
		apply_filter(&mut count_statement, filter);
		let (count_sql, count_values) = count_statement.build_rusqlite(SqliteQueryBuilder);
		let total: i64 = connection.query_row(&count_sql, &*count_values.as_params(), |row| row.get(0))?;

		let mut select_statement = Query::select()
			.columns(all_columns(&columns))
			.from(table_name(project_id))
			.to_owned();
		apply_filter(&mut select_statement, filter);

		let order_column = filter.order_by.clone().unwrap_or_else(|| "id".to_string());
		let order = if filter.order_desc { Order::Desc } else { Order::Asc };
		select_statement.order_by(Alias::new(order_column), order);

		let offset = u64::from(page.saturating_sub(1)) * u64::from(page_size);
		select_statement.limit(u64::from(page_size)).offset(offset);

		let (sql, values) = select_statement.build_rusqlite(SqliteQueryBuilder);
		let mut prepared = connection.prepare(&sql)?;
		let records = prepared
			.query_map(&*values.as_params(), |row| row_to_map(row, &columns))?
			.collect::<rusqlite::Result<Vec<_>>>()?;

		Ok(QueryResult {
			records,
			columns,
			total: total as u64,
			page,
			page_size,
		})
	}

	/// Check the project's dedup policy against candidate field values.
	/// Returns the id of a conflicting row, if any.
	pub async fn check_dedup(&self, project_id: i64, policy: &DedupPolicy, fields: &HashMap<String, String>) -> Result<Option<i64>> {
		if !policy.enabled || policy.fields.is_empty() {
			return Ok(None);
		}

		let mut statement = Query::select()
			.column(Alias::new("id"))
			.from(table_name(project_id))
			.limit(1)
			.to_owned();

		let mut any_condition = false;
		for name in &policy.fields {
			if let Some(value) = fields.get(name) {
				statement.and_where(Expr::col(field_column(name)).eq(value.clone()));
				any_condition = true;
			}
		}

		if !any_condition {
			return Ok(None);
		}

		let connection = self.pool.get().await?;
		let (sql, values) = statement.build_rusqlite(SqliteQueryBuilder);
		match connection.query_row(&sql, &*values.as_params(), |row| row.get(0)) {
			Ok(id) => Ok(Some(id)),
			Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
			Err(error) => Err(error.into()),
		}
	}

	/// Insert a candidate record honoring the project's dedup policy: a
	/// conflict resolves to skip / overwrite / null-preserving overlay
	/// rather than a second row.
	pub async fn insert_with_dedup(&self, project_id: i64, policy: &DedupPolicy, record: NewRecord) -> Result<InsertOutcome> {
		match self.check_dedup(project_id, policy, &record.fields).await? {
			None => self.insert(project_id, record).await,
			Some(existing_id) => match policy.strategy {
				DedupStrategy::Skip => Ok(InsertOutcome::Skipped),
				DedupStrategy::Update => {
					self.update(project_id, existing_id, record.fields).await?;
					Ok(InsertOutcome::Updated(existing_id))
				}
				DedupStrategy::Merge => {
					let existing = self.get(project_id, existing_id).await?.unwrap_or_default();
					let merged = merge_non_null(existing, record.fields);
					self.update(project_id, existing_id, merged).await?;
					Ok(InsertOutcome::Updated(existing_id))
				}
			},
		}
	}

	pub async fn export(&self, project_id: i64, format: &str, batch_id: Option<String>) -> Result<Vec<u8>> {
		let filter = QueryFilter {
			batch_id,
			..Default::default()
		};
		let result = self.query(project_id, &filter, 1, u32::MAX).await?;

		if result.records.is_empty() {
			return Ok(Vec::new());
		}

		match format {
			"csv" => crate::export::to_csv(&result.columns, &result.records),
			"xlsx" => crate::export::to_xlsx(&result.columns, &result.records),
			other => Err(Error::UnsupportedFormat(other.to_string())),
		}
	}
}

fn all_columns(columns: &[String]) -> Vec<Alias> {
	columns.iter().map(|column| Alias::new(column)).collect()
}

fn row_to_map(row: &rusqlite::Row, columns: &[String]) -> rusqlite::Result<HashMap<String, String>> {
	let mut map = HashMap::with_capacity(columns.len());
	for (index, column) in columns.iter().enumerate() {
		let value: Option<String> = match row.get_ref(index)? {
			rusqlite::types::ValueRef::Null => None,
			rusqlite::types::ValueRef::Integer(value) => Some(value.to_string()),
			rusqlite::types::ValueRef::Real(value) => Some(value.to_string()),
			rusqlite::types::ValueRef::Text(value) => Some(String::from_utf8_lossy(value).into_owned()),
			rusqlite::types::ValueRef::Blob(_) => None,
		};
		map.insert(column.clone(), value.unwrap_or_default());
	}
	Ok(map)
}

fn apply_filter(statement: &mut sea_query::SelectStatement, filter: &QueryFilter) {
	if let Some(batch_id) = &filter.batch_id {
		statement.and_where(Expr::col(Alias::new("batch_id")).eq(batch_id.clone()));
	}
	if let Some(status) = filter.status {
		statement.and_where(Expr::col(Alias::new("status")).eq(status.as_str()));
	}
	if let Some(search) = &filter.search {
		statement.and_where(Expr::col(Alias::new("raw_content")).like(format!("%{search}%")));
	}
}

fn table_exists(connection: &Connection, project_id: i64) -> rusqlite::Result<bool> {
	let name = table_name(project_id).to_string();
	connection.query_row(
		"SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
		[&name],
		|_| Ok(()),
	).map(|_| true).or_else(|error| match error {
		rusqlite::Error::QueryReturnedNoRows => Ok(false),
		other => Err(other),
	})
}

fn table_columns(connection: &Connection, project_id: i64) -> rusqlite::Result<Vec<String>> {
	let name = table_name(project_id).to_string();
	let mut statement = connection.prepare(&format!("PRAGMA table_info(\"{name}\")"))?;
	let columns = statement
		.query_map([], |row| row.get::<_, String>(1))?
		.collect::<rusqlite::Result<Vec<_>>>()?;
	Ok(columns)
}

fn apply_migration(connection: &Connection, project_id: i64, fields: &[FieldSpec], plan: MigrationPlan) -> Result<()> {
	match plan {
		MigrationPlan::CreateFresh => {
			let statement = create_table_statement(project_id, fields);
			connection.execute_batch(&statement.to_string(SqliteQueryBuilder))?;
		}
		MigrationPlan::AddColumns(to_add) => {
			for name in to_add {
				let Some(field) = fields.iter().find(|field| field.name == name) else {
					continue;
				};
				let sql = format!(
					"ALTER TABLE {} ADD COLUMN \"{}\" {}",
					table_name(project_id).to_string(),
					name,
					column_type_sql(field.sql_type),
				);
				connection.execute_batch(&sql)?;
			}
		}
		MigrationPlan::DestructiveRebuild { to_add: _, kept } => {
			destructive_rebuild(connection, project_id, fields, &kept)?;
		}
	}
	Ok(())
}

fn column_type_sql(sql_type: crate::field::SqlType) -> &'static str {
	match sql_type {
		crate::field::SqlType::Text => "TEXT",
		crate::field::SqlType::Integer => "INTEGER",
	}
}

/// Rename the current table aside, create the new one, copy over every row
/// restricted to columns present in both schemas (skipping rows whose
/// intersection is empty), then drop the old table. Per-row copy failures
/// are tolerated — this is a best-effort migration.
fn destructive_rebuild(connection: &Connection, project_id: i64, fields: &[FieldSpec], kept: &[String]) -> Result<()> {
	let current = table_name(project_id).to_string();
	let temp = format!("{current}_migrating");

	connection.execute_batch(&format!("ALTER TABLE \"{current}\" RENAME TO \"{temp}\";"))?;

	let create_statement = create_table_statement(project_id, fields);
	connection.execute_batch(&create_statement.to_string(SqliteQueryBuilder))?;

	if !kept.is_empty() {
		let column_list = kept.iter().map(|column| format!("\"{column}\"")).collect::<Vec<_>>().join(", ");
		let copy_sql = format!(
			"INSERT INTO \"{current}\" ({column_list}) SELECT {column_list} FROM \"{temp}\";"
		);
		// Best-effort: a failing bulk copy falls back to row-by-row so one
		// bad row does not lose the rest.
		if connection.execute_batch(&copy_sql).is_err() {
			copy_rows_best_effort(connection, &temp, &current, kept)?;
		}
	}

	connection.execute_batch(&format!("DROP TABLE \"{temp}\";"))?;
	Ok(())
}

fn copy_rows_best_effort(connection: &Connection, from: &str, to: &str, columns: &[String]) -> Result<()> {
	let column_list = columns.iter().map(|column| format!("\"{column}\"")).collect::<Vec<_>>().join(", ");
	let mut select = connection.prepare(&format!("SELECT {column_list} FROM \"{from}\""))?;
	let placeholders = columns.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
	let insert_sql = format!("INSERT INTO \"{to}\" ({column_list}) VALUES ({placeholders})");

	let mut rows = select.query([])?;
	while let Some(row) = rows.next()? {
		let values: Vec<rusqlite::types::Value> = (0..columns.len())
			.map(|index| row.get::<_, rusqlite::types::Value>(index))
			.collect::<rusqlite::Result<Vec<_>>>()?;

		let params = rusqlite::params_from_iter(values.iter());
		if let Err(error) = connection.execute(&insert_sql, params) {
			tracing::warn!(reason = %error, "row copy failed during destructive migration, skipping");
		}
	}

	Ok(())
}

fn insert_record(connection: &Connection, project_id: i64, record: &NewRecord, columns: &[String]) -> Result<InsertOutcome> {
	let now = crate::now();

	let mut values: HashMap<&str, String> = HashMap::new();
	for (key, value) in &record.fields {
		if columns.iter().any(|column| column == key) {
			values.insert(key.as_str(), value.clone());
		}
	}

	let mut statement = Query::insert();
	statement.into_table(table_name(project_id));

	let mut insert_columns = vec![];
	let mut insert_values = vec![];

	for (key, value) in &values {
		insert_columns.push(field_column(key));
		insert_values.push(value.clone().into());
	}

	for (column, value) in [
		("raw_content", record.meta.raw_content.clone()),
		("source_file", record.meta.source_file.clone()),
		("source_sheet", record.meta.source_sheet.clone()),
		("batch_id", record.meta.batch_id.clone()),
		("status", record.meta.status.as_str().to_string()),
		("error_message", record.meta.error_message.clone().unwrap_or_default()),
		("created_at", now.clone()),
		("updated_at", now),
	] {
		insert_columns.push(field_column(column));
		insert_values.push(value.into());
	}

	insert_columns.push(field_column("source_row_number"));
	insert_values.push((record.meta.source_row_number as i64).into());

	statement.columns(insert_columns);
	statement.values_panic(insert_values);

	let (sql, bind_values) = statement.build_rusqlite(SqliteQueryBuilder);

	match connection.execute(&sql, &*bind_values.as_params()) {
		Ok(_) => Ok(InsertOutcome::Inserted(connection.last_insert_rowid())),
		Err(rusqlite::Error::SqliteFailure(error, _)) if error.code == rusqlite::ErrorCode::ConstraintViolation => {
			Ok(InsertOutcome::NotInserted)
		}
		Err(error) => Err(error.into()),
	}
}

fn update_record(
	connection: &Connection,
	project_id: i64,
	record_id: i64,
	fields: &HashMap<String, String>,
	columns: &[String],
) -> Result<bool> {
	let mut statement = Query::update();
	statement.table(table_name(project_id));

	for (key, value) in fields {
		if columns.iter().any(|column| column == key) {
			statement.value(field_column(key), value.clone());
		}
	}
	statement.value(field_column("updated_at"), crate::now());
	statement.and_where(Expr::col(Alias::new("id")).eq(record_id));

	let (sql, values) = statement.build_rusqlite(SqliteQueryBuilder);
	let affected = connection.execute(&sql, &*values.as_params())?;
	Ok(affected > 0)
}

fn merge_non_null(existing: HashMap<String, String>, incoming: HashMap<String, String>) -> HashMap<String, String> {
	let mut merged = existing;
	for (key, value) in incoming {
		if !value.is_empty() {
			merged.insert(key, value);
		}
	}
	merged
}
