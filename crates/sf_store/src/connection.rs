use std::path::PathBuf;

use bb8::ManageConnection;

pub type Pool = bb8::Pool<ConnectionManager>;

pub struct ConnectionManager {
	path: PathBuf,
}

impl ConnectionManager {
	pub fn new(path: PathBuf) -> Self {
		Self { path }
	}
}

impl ManageConnection for ConnectionManager {
	type Connection = rusqlite::Connection;
	type Error = rusqlite::Error;

	async fn connect(&self) -> Result<Self::Connection, Self::Error> {
		let connection = rusqlite::Connection::open(&self.path)?;
		connection.pragma_update(None, "journal_mode", "WAL")?;
		connection.pragma_update(None, "foreign_keys", "ON")?;
		Ok(connection)
	}

	async fn is_valid(&self, connection: &mut Self::Connection) -> Result<(), Self::Error> {
		connection.execute_batch("")
	}

	fn has_broken(&self, _connection: &mut Self::Connection) -> bool {
		false
	}
}

pub async fn build_pool(path: PathBuf, max_size: u32) -> Result<Pool, rusqlite::Error> {
	bb8::Pool::builder()
		.max_size(max_size)
		.build(ConnectionManager::new(path))
		.await
}
