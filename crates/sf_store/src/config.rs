#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
	pub database_path: String,
	#[serde(default = "default_pool_size")]
	pub max_pool_size: u32,
}

fn default_pool_size() -> u32 {
	8
}
