use std::time::Duration;

/// Connection details for one AI-config row. Mirrors the fields stored on
/// `ai_configs`: `api_url`, `model_name`, `api_key`, `temperature`,
/// `max_tokens`.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
	pub api_url: String,
	pub model_name: String,
	pub api_key: String,
	#[serde(default = "default_temperature")]
	pub temperature: f32,
	#[serde(default = "default_max_tokens")]
	pub max_tokens: u32,
}

fn default_temperature() -> f32 {
	0.2
}

fn default_max_tokens() -> u32 {
	1024
}

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY: Duration = Duration::from_secs(2);
pub const TIMEOUT: Duration = Duration::from_secs(120);
