use std::cmp::Ordering;

use tracing::warn;

use fiq_domain::ScoredChunk;

use crate::FiqEngine;

impl FiqEngine {
	/// Semantic evidence for the answer step. Retrieval is best-effort: a
	/// failing embedding provider or index degrades to no evidence rather
	/// than failing the query, since the structured result stands alone.
	pub(crate) async fn retrieve(&self, query: &str) -> Vec<ScoredChunk> {
		let texts = [query.to_string()];
		let vectors =
			match self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await {
				Ok(vectors) => vectors,
				Err(err) => {
					warn!(error = %err, "Query embedding failed; answering without evidence.");

					return Vec::new();
				},
			};
		let Some(vector) = vectors.first() else {
			warn!("Embedding provider returned no vector; answering without evidence.");

			return Vec::new();
		};
		let hits = match self.searcher.search(vector, self.cfg.retrieval.top_k).await {
			Ok(hits) => hits,
			Err(err) => {
				warn!(error = %err, "Vector search failed; answering without evidence.");

				return Vec::new();
			},
		};
		let floor = self.cfg.retrieval.score_floor;
		let mut chunks: Vec<ScoredChunk> =
			hits.into_iter().filter(|chunk| chunk.score >= floor).collect();

		chunks.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

		chunks
	}
}
