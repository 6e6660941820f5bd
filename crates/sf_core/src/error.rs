#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// No default model configuration, unknown project, unknown field - a
	/// caller-facing setup error; no task is ever created for it.
	#[error("configuration error: {0}")]
	Config(String),

	#[error(transparent)]
	Io(#[from] std::io::Error),

	/// A column-mapping request failed (model unreachable, malformed JSON).
	#[error("mapping failed: {0}")]
	Mapping(String),

	/// Cannot create a project table, cannot open the database - terminates
	/// the whole task, as opposed to a single row.
	#[error("storage fatal: {0}")]
	StorageFatal(String),

	/// Pause/resume/cancel issued against a task id not in the registry.
	#[error("no such task: {0}")]
	ControlNotFound(String),

	#[error(transparent)]
	Store(#[from] sf_store::Error),

	#[error(transparent)]
	Schema(#[from] sf_schema::Error),

	#[error(transparent)]
	Read(#[from] sf_read::Error),

	#[error(transparent)]
	Llm(#[from] sf_llm::Error),

	#[error(transparent)]
	Progress(#[from] sf_progress::Error),

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
impl_to_failure!(figment::Error);

pub type Result<T, E = Error> = std::result::Result<T, E>;
