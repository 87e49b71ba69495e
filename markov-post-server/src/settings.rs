use std::env;
use std::fs;

use markov_post_core::config::{GenerationConfig, RateLimitConfig};
use markov_post_core::Config;
use serde::Deserialize;

/// Environment variable naming an optional JSON settings file.
pub const CONFIG_ENV: &str = "MARKOV_POST_CONFIG";

/// Listener and quota namespace.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ServerSection {
	pub host: String,
	pub port: u16,
	/// Rate-limit pool shared by every caller of this server.
	pub namespace: String,
	/// Quota by the `identity` field of request bodies instead of the peer
	/// address. Only safe behind a proxy that authenticates callers and sets
	/// that field itself.
	pub trust_client_identity: bool,
	/// Browser origins allowed by CORS. Empty means same-origin only.
	pub cors_origins: Vec<String>,
}

impl Default for ServerSection {
	fn default() -> Self {
		Self {
			host: "127.0.0.1".to_owned(),
			port: 5000,
			namespace: "http".to_owned(),
			trust_client_identity: false,
			cors_origins: Vec::new(),
		}
	}
}

/// Everything the server reads at startup.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
	pub server: ServerSection,
	pub generation: GenerationConfig,
	pub rate_limit: RateLimitConfig,
}

impl Settings {
	/// Reads the file named by `MARKOV_POST_CONFIG`, or returns the defaults.
	pub fn load() -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
		match env::var(CONFIG_ENV) {
			Ok(path) => Self::from_json(&fs::read_to_string(&path)?),
			Err(_) => Ok(Self::default()),
		}
	}

	pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
		let settings: Self = serde_json::from_str(json)?;
		settings.core().validate()?;
		Ok(settings)
	}

	pub fn core(&self) -> Config {
		Config { generation: self.generation.clone(), rate_limit: self.rate_limit.clone() }
	}
}
