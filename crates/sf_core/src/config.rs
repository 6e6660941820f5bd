use std::path::PathBuf;

use figment::{
	providers::{Env, Format, Toml},
	Figment,
};
use serde::Deserialize;

use crate::error::Result;

/// Top-level configuration for the extraction coordinator, assembled from a
/// TOML file layered with environment overrides.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub store: sf_store::Config,
	/// Root directory under which each batch gets its own archive
	/// subdirectory (`<archive_root>/<batch-id>/<original-filename>`).
	pub archive_root: PathBuf,
}

/// Build the configuration hierarchy from `sf.toml`, overridden by
/// `SF_`-prefixed environment variables.
pub fn figment() -> Figment {
	Figment::new()
		.merge(Toml::file("sf.toml"))
		.merge(Env::prefixed("SF_").split("_"))
}

pub fn load(figment: &Figment) -> Result<Config> {
	Ok(figment.extract()?)
}

/// Tracing bootstrap. Reads its own config section first so logging is live
/// before the rest of the configuration is extracted.
pub fn init_tracing(figment: &Figment) -> Result<()> {
	let level: TracingConfig = figment.extract_inner("tracing").unwrap_or_default();

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::new(level.default))
		.try_init()
		.map_err(|error| crate::error::Error::Config(error.to_string()))
}

#[derive(Debug, Deserialize)]
struct TracingConfig {
	default: String,
}

impl Default for TracingConfig {
	fn default() -> Self {
		Self {
			default: "info".to_string(),
		}
	}
}
