use serde::Serialize;
use tracing::info;

use fiq_config::Config;
use fiq_domain::{Holding, ScoredChunk, Trade, build_chunks};
use fiq_storage::qdrant::QdrantStore;

use crate::{BoxFuture, EngineResult, Providers, VectorSearcher};

const EMBED_BATCH_SIZE: usize = 64;

#[derive(Clone, Copy, Debug, Serialize)]
pub struct IndexReport {
	pub chunks: usize,
}

/// Rebuild the retrieval corpus and push it into the vector store. Chunk
/// ids are stable, so a rebuild over the same data overwrites in place.
pub async fn index_corpus(
	cfg: &Config,
	store: &QdrantStore,
	providers: &Providers,
	trades: &[Trade],
	holdings: &[Holding],
) -> EngineResult<IndexReport> {
	let chunks = build_chunks(trades, holdings);
	let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
	let mut vectors = Vec::with_capacity(texts.len());

	for batch in texts.chunks(EMBED_BATCH_SIZE) {
		vectors.extend(providers.embedding.embed(&cfg.providers.embedding, batch).await?);
	}

	store.ensure_collection().await?;
	store.upsert_chunks(&chunks, &vectors).await?;
	info!(chunks = chunks.len(), collection = %store.collection, "Corpus indexed.");

	Ok(IndexReport { chunks: chunks.len() })
}

impl VectorSearcher for QdrantStore {
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		limit: u32,
	) -> BoxFuture<'a, EngineResult<Vec<ScoredChunk>>> {
		Box::pin(async move {
			let hits = QdrantStore::search(self, vector, limit).await?;

			Ok(hits
				.into_iter()
				.map(|hit| ScoredChunk {
					id: hit.chunk_id,
					kind: hit.kind,
					text: hit.text,
					score: hit.score,
				})
				.collect())
		})
	}
}
