#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("project table does not exist for project {0}")]
	TableMissing(i64),

	#[error("unsupported export format: {0}")]
	UnsupportedFormat(String),

	#[error(transparent)]
	Failure(anyhow::Error),
}

macro_rules! impl_to_failure {
	($source:ty) => {
		impl From<$source> for Error {
			fn from(value: $source) -> Self {
				Self::Failure(value.into())
			}
		}
	};
}

impl_to_failure!(anyhow::Error);
impl_to_failure!(bb8::RunError<rusqlite::Error>);
impl_to_failure!(rusqlite::Error);
impl_to_failure!(std::io::Error);
impl_to_failure!(tokio::task::JoinError);
impl_to_failure!(csv::Error);
impl_to_failure!(rust_xlsxwriter::XlsxError);

pub type Result<T, E = Error> = std::result::Result<T, E>;
