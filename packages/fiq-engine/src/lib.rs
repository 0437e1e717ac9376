pub mod answer;
pub mod index;
pub mod retrieve;

use std::{future::Future, pin::Pin, sync::Arc};

pub use answer::{AnswerResponse, DebugReport};
pub use index::IndexReport;

use fiq_config::{Config, EmbeddingProviderConfig, SynthesisProviderConfig};
use fiq_domain::{
	EvidencePayload, Holding, NormalizedLevenshtein, ScoredChunk, SimilarityScorer, Trade,
	Vocabulary, render_fallback, synthesis_messages,
};
use fiq_providers::{embedding, synthesis};

pub type EngineResult<T> = Result<T, EngineError>;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>>;
}

/// Phrases the final answer from an evidence payload. Implementations must
/// not introduce facts beyond the payload; the offline implementation is the
/// deterministic rendering itself.
pub trait SynthesisProvider
where
	Self: Send + Sync,
{
	fn synthesize<'a>(
		&'a self,
		cfg: &'a SynthesisProviderConfig,
		payload: &'a EvidencePayload,
	) -> BoxFuture<'a, color_eyre::Result<String>>;
}

pub trait VectorSearcher
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, EngineResult<Vec<ScoredChunk>>>;
}

#[derive(Debug)]
pub enum EngineError {
	Provider { message: String },
	Storage { message: String },
	Qdrant { message: String },
}
impl std::fmt::Display for EngineError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Provider { message } => write!(f, "Provider error: {message}"),
			Self::Storage { message } => write!(f, "Storage error: {message}"),
			Self::Qdrant { message } => write!(f, "Qdrant error: {message}"),
		}
	}
}
impl std::error::Error for EngineError {}

impl From<color_eyre::Report> for EngineError {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<fiq_storage::Error> for EngineError {
	fn from(err: fiq_storage::Error) -> Self {
		match err {
			fiq_storage::Error::Qdrant(err) => Self::Qdrant { message: err.to_string() },
			other => Self::Storage { message: other.to_string() },
		}
	}
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub synthesis: Arc<dyn SynthesisProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>, synthesis: Arc<dyn SynthesisProvider>) -> Self {
		Self { embedding, synthesis }
	}

	/// Live embedding with deterministic offline phrasing; for deployments
	/// without a chat-completion endpoint.
	pub fn offline_synthesis(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding, synthesis: Arc::new(OfflineSynthesis) }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), synthesis: provider }
	}
}

struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, color_eyre::Result<Vec<Vec<f32>>>> {
		Box::pin(embedding::embed(cfg, texts))
	}
}

impl SynthesisProvider for DefaultProviders {
	fn synthesize<'a>(
		&'a self,
		cfg: &'a SynthesisProviderConfig,
		payload: &'a EvidencePayload,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move {
			let messages: Vec<serde_json::Value> = synthesis_messages(payload)
				.iter()
				.map(serde_json::to_value)
				.collect::<Result<_, _>>()?;

			synthesis::complete(cfg, &messages).await
		})
	}
}

pub struct OfflineSynthesis;

impl SynthesisProvider for OfflineSynthesis {
	fn synthesize<'a>(
		&'a self,
		_: &'a SynthesisProviderConfig,
		payload: &'a EvidencePayload,
	) -> BoxFuture<'a, color_eyre::Result<String>> {
		Box::pin(async move { Ok(render_fallback(payload)) })
	}
}

pub struct FiqEngine {
	pub cfg: Config,
	pub trades: Vec<Trade>,
	pub holdings: Vec<Holding>,
	pub vocabulary: Vocabulary,
	pub providers: Providers,
	pub searcher: Arc<dyn VectorSearcher>,
	pub scorer: Arc<dyn SimilarityScorer>,
}
impl FiqEngine {
	pub fn new(
		cfg: Config,
		trades: Vec<Trade>,
		holdings: Vec<Holding>,
		providers: Providers,
		searcher: Arc<dyn VectorSearcher>,
	) -> Self {
		let vocabulary = Vocabulary::build(&trades, &holdings);

		Self {
			cfg,
			trades,
			holdings,
			vocabulary,
			providers,
			searcher,
			scorer: Arc::new(NormalizedLevenshtein),
		}
	}
}
