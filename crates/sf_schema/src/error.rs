#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("project not found: {0}")]
	UnknownProject(i64),

	#[error("field not found: {0}")]
	UnknownField(i64),

	#[error("project name already in use: {0}")]
	DuplicateProjectName(String),

	/// A can't-happen state, e.g. a field missing immediately after its own
	/// create/restore. Distinct from `UnknownField` so a genuine lookup miss
	/// against a real id is never confused with an internal invariant break.
	#[error("internal invariant violated: {0}")]
	Invariant(String),

	#[error(transparent)]
	Store(#[from] sf_store::Error),

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
impl_to_failure!(tokio::task::JoinError);

pub type Result<T, E = Error> = std::result::Result<T, E>;
