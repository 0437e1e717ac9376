//! Deterministic in-process stand-ins for the embedding provider and the
//! vector index, plus small record fixtures. No network, no services.

use std::{cmp::Ordering, sync::Mutex};

use rust_decimal_macros::dec;
use time::macros::date;

use fiq_config::{
	Answer, Config, Data, EmbeddingProviderConfig, Extraction, Providers as ProviderSettings,
	Qdrant, Retrieval, Service, Storage, SynthesisProviderConfig,
};
use fiq_domain::{Chunk, Holding, ScoredChunk, Trade, TradeType, normalize};
use fiq_engine::{BoxFuture, EmbeddingProvider, EngineResult, VectorSearcher};

/// Token-bucket embedding: each token hashes into one dimension, then the
/// vector is L2-normalized. Texts sharing tokens get positive cosine
/// similarity, which is all retrieval tests need.
pub struct HashEmbedding;

impl EmbeddingProvider for HashEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move {
			Ok(texts.iter().map(|text| hash_vector(text, cfg.dimensions as usize)).collect())
		})
	}
}

/// An embedding provider that always fails, for degradation tests.
pub struct BrokenEmbedding;

impl EmbeddingProvider for BrokenEmbedding {
	fn embed<'a>(
		&'a self,
		_: &'a EmbeddingProviderConfig,
		_: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Err(color_eyre::eyre::eyre!("embedding provider is down")) })
	}
}

pub fn hash_vector(text: &str, dimensions: usize) -> Vec<f32> {
	let dimensions = dimensions.max(1);
	let mut vector = vec![0.0_f32; dimensions];

	for token in normalize(text).split_whitespace() {
		vector[(fnv1a(token) % dimensions as u64) as usize] += 1.0;
	}

	let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();

	if norm > 0.0 {
		for value in &mut vector {
			*value /= norm;
		}
	}

	vector
}

fn fnv1a(token: &str) -> u64 {
	let mut hash = 0xcbf2_9ce4_8422_2325_u64;

	for byte in token.bytes() {
		hash ^= u64::from(byte);
		hash = hash.wrapping_mul(0x100_0000_01b3);
	}

	hash
}

/// Brute-force cosine index over embedded chunks.
#[derive(Default)]
pub struct MemoryIndex {
	entries: Mutex<Vec<(Chunk, Vec<f32>)>>,
}
impl MemoryIndex {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn index_chunks(&self, chunks: &[Chunk], dimensions: usize) {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		entries.clear();
		entries.extend(
			chunks.iter().map(|chunk| (chunk.clone(), hash_vector(&chunk.text, dimensions))),
		);
	}
}

impl VectorSearcher for MemoryIndex {
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, EngineResult<Vec<ScoredChunk>>> {
		Box::pin(async move {
			let entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
			let mut scored: Vec<ScoredChunk> = entries
				.iter()
				.map(|(chunk, candidate)| ScoredChunk {
					id: chunk.id.clone(),
					kind: chunk.kind,
					text: chunk.text.clone(),
					score: cosine_similarity(vector, candidate),
				})
				.collect();

			scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
			scored.truncate(limit as usize);

			Ok(scored)
		})
	}
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
	let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
	let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

	if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
}

pub fn sample_config() -> Config {
	Config {
		service: Service { log_level: "info".to_string() },
		data: Data { trades_csv: "trades.csv".into(), holdings_csv: "holdings.csv".into() },
		storage: Storage {
			qdrant: Qdrant {
				url: "http://127.0.0.1:6334".to_string(),
				collection: "fiq_chunks".to_string(),
				vector_dim: 64,
			},
		},
		providers: ProviderSettings {
			embedding: EmbeddingProviderConfig {
				provider_id: "offline".to_string(),
				api_base: String::new(),
				api_key: String::new(),
				path: String::new(),
				model: "hash".to_string(),
				dimensions: 64,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
			synthesis: SynthesisProviderConfig {
				provider_id: "offline".to_string(),
				api_base: String::new(),
				api_key: String::new(),
				path: String::new(),
				model: "offline".to_string(),
				temperature: 0.0,
				timeout_ms: 1_000,
				default_headers: serde_json::Map::new(),
			},
		},
		extraction: Extraction::default(),
		retrieval: Retrieval::default(),
		answer: Answer::default(),
	}
}

pub fn sample_trades() -> Vec<Trade> {
	let trade = |portfolio: &str,
	             ticker: &str,
	             trade_type: TradeType,
	             day: time::Date,
	             quantity,
	             price,
	             realized_pl| Trade {
		portfolio: portfolio.to_string(),
		ticker: ticker.to_string(),
		trade_type,
		trade_date: day,
		quantity,
		price,
		realized_pl,
	};

	vec![
		trade("garfield", "aapl", TradeType::Buy, date!(2024 - 01 - 08), dec!(50), dec!(182.5), dec!(0)),
		trade("garfield", "msft", TradeType::Buy, date!(2024 - 01 - 15), dec!(20), dec!(390), dec!(0)),
		trade("garfield", "aapl", TradeType::Sell, date!(2024 - 02 - 09), dec!(25), dec!(188), dec!(137.5)),
		trade("odie fund", "nvda", TradeType::Buy, date!(2024 - 01 - 22), dec!(30), dec!(550), dec!(0)),
		trade("odie fund", "msft", TradeType::Sell, date!(2024 - 02 - 20), dec!(10), dec!(402), dec!(-45)),
		trade("alpha growth", "nvda", TradeType::Buy, date!(2024 - 03 - 04), dec!(15), dec!(860), dec!(0)),
	]
}

pub fn sample_holdings() -> Vec<Holding> {
	let holding = |portfolio: &str, ticker: &str, quantity, price, mv_base, pl_ytd| Holding {
		portfolio: portfolio.to_string(),
		ticker: ticker.to_string(),
		quantity,
		price,
		mv_base,
		pl_ytd,
	};

	vec![
		holding("garfield", "aapl", dec!(25), dec!(190), dec!(4750), dec!(320)),
		holding("garfield", "msft", dec!(20), dec!(405), dec!(8100), dec!(-150)),
		holding("odie fund", "nvda", dec!(30), dec!(875), dec!(26250), dec!(9750)),
		holding("odie fund", "msft", dec!(5), dec!(405), dec!(2025), dec!(40)),
		holding("alpha growth", "nvda", dec!(15), dec!(875), dec!(13125), dec!(225)),
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn hash_vectors_are_deterministic_and_unit_length() {
		let a = hash_vector("total pl ytd for garfield", 64);
		let b = hash_vector("total pl ytd for garfield", 64);
		let norm: f32 = a.iter().map(|v| v * v).sum::<f32>().sqrt();

		assert_eq!(a, b);
		assert!((norm - 1.0).abs() < 1e-5);
	}

	#[test]
	fn shared_tokens_score_higher_than_disjoint_ones() {
		let query = hash_vector("garfield portfolio pl", 64);
		let related = hash_vector("portfolio garfield holds aapl", 64);
		let unrelated = hash_vector("completely different words entirely", 64);

		assert!(
			cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated),
			"related text should outrank unrelated text"
		);
	}

	#[test]
	fn fixtures_agree_on_vocabulary() {
		let vocabulary = fiq_domain::Vocabulary::build(&sample_trades(), &sample_holdings());

		assert_eq!(vocabulary.portfolios(), ["alpha growth", "garfield", "odie fund"]);
		assert_eq!(vocabulary.tickers(), ["aapl", "msft", "nvda"]);
	}
}
