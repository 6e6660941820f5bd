#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("unknown task: {0}")]
	UnknownTask(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
