use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub data: Data,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub extraction: Extraction,
	#[serde(default)]
	pub retrieval: Retrieval,
	#[serde(default)]
	pub answer: Answer,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Data {
	pub trades_csv: PathBuf,
	pub holdings_csv: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub synthesis: SynthesisProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SynthesisProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Extraction {
	/// Minimum similarity for an approximate portfolio-name match to resolve.
	pub fuzzy_threshold: f64,
}
impl Default for Extraction {
	fn default() -> Self {
		Self { fuzzy_threshold: 0.72 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub top_k: u32,
	/// Chunks scoring below this floor are never surfaced as evidence.
	pub score_floor: f32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { top_k: 5, score_floor: 0.35 }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Answer {
	pub default_rank_n: u32,
	pub max_show_rows: u32,
}
impl Default for Answer {
	fn default() -> Self {
		Self { default_rank_n: 5, max_show_rows: 20 }
	}
}
