mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Answer, Config, Data, EmbeddingProviderConfig, Extraction, Providers, Qdrant, Retrieval,
	Service, Storage, SynthesisProviderConfig,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.data.trades_csv.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "data.trades_csv must be non-empty.".to_string(),
		});
	}
	if cfg.data.holdings_csv.as_os_str().is_empty() {
		return Err(Error::Validation {
			message: "data.holdings_csv must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if !cfg.extraction.fuzzy_threshold.is_finite()
		|| !(0.0..=1.0).contains(&cfg.extraction.fuzzy_threshold)
		|| cfg.extraction.fuzzy_threshold == 0.0
	{
		return Err(Error::Validation {
			message: "extraction.fuzzy_threshold must be in the range (0.0, 1.0].".to_string(),
		});
	}
	if cfg.retrieval.top_k == 0 {
		return Err(Error::Validation {
			message: "retrieval.top_k must be greater than zero.".to_string(),
		});
	}
	if !cfg.retrieval.score_floor.is_finite()
		|| !(-1.0..=1.0).contains(&cfg.retrieval.score_floor)
	{
		return Err(Error::Validation {
			message: "retrieval.score_floor must be in the range -1.0 to 1.0.".to_string(),
		});
	}
	if cfg.answer.default_rank_n == 0 {
		return Err(Error::Validation {
			message: "answer.default_rank_n must be greater than zero.".to_string(),
		});
	}
	if cfg.answer.max_show_rows == 0 {
		return Err(Error::Validation {
			message: "answer.max_show_rows must be greater than zero.".to_string(),
		});
	}
	if !cfg.providers.synthesis.temperature.is_finite() || cfg.providers.synthesis.temperature < 0.0
	{
		return Err(Error::Validation {
			message: "providers.synthesis.temperature must be zero or greater.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("synthesis", &cfg.providers.synthesis.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}
