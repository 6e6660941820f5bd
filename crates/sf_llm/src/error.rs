#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("request to language model failed: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("language model request timed out after {0} attempts")]
	Timeout(u32),

	#[error("malformed column-mapping response: {0}")]
	MalformedResponse(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
