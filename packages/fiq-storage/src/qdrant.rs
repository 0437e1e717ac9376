use std::collections::HashMap;

use qdrant_client::{
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, Distance, PointStruct, Query, QueryPointsBuilder,
		UpsertPointsBuilder, Value, VectorParamsBuilder, value::Kind,
	},
};
use uuid::Uuid;

use fiq_domain::{Chunk, ChunkKind};

use crate::Result;

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &fiq_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(&self.collection).await? {
			return Ok(());
		}

		self.client
			.create_collection(
				CreateCollectionBuilder::new(self.collection.clone()).vectors_config(
					VectorParamsBuilder::new(u64::from(self.vector_dim), Distance::Cosine),
				),
			)
			.await?;

		Ok(())
	}

	/// Point ids derive from chunk ids, so re-indexing the same data
	/// overwrites points instead of accumulating duplicates.
	pub async fn upsert_chunks(&self, chunks: &[Chunk], vectors: &[Vec<f32>]) -> Result<()> {
		let mut points = Vec::with_capacity(chunks.len());

		for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
			let mut payload = Payload::new();

			payload.insert("chunk_id", chunk.id.clone());
			payload.insert("kind", chunk.kind.as_str());
			payload.insert("text", chunk.text.clone());
			points.push(PointStruct::new(point_id(&chunk.id), vector.clone(), payload));
		}

		let upsert = UpsertPointsBuilder::new(self.collection.clone(), points).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	pub async fn search(&self, vector: &[f32], limit: u32) -> Result<Vec<ChunkHit>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.with_payload(true)
			.limit(u64::from(limit));
		let response = self.client.query(search).await?;
		let hits = response
			.result
			.into_iter()
			.filter_map(|point| {
				let chunk_id = payload_str(&point.payload, "chunk_id")?;
				let kind = ChunkKind::parse(&payload_str(&point.payload, "kind")?)?;
				let text = payload_str(&point.payload, "text")?;

				Some(ChunkHit { chunk_id, kind, text, score: point.score })
			})
			.collect();

		Ok(hits)
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChunkHit {
	pub chunk_id: String,
	pub kind: ChunkKind,
	pub text: String,
	pub score: f32,
}

pub fn point_id(chunk_id: &str) -> String {
	Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
}

fn payload_str(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn point_ids_are_stable_and_distinct() {
		assert_eq!(point_id("portfolio:garfield"), point_id("portfolio:garfield"));
		assert_ne!(point_id("portfolio:garfield"), point_id("portfolio:odie fund"));
		assert!(Uuid::parse_str(&point_id("global:overview")).is_ok());
	}

	#[test]
	fn payload_str_ignores_non_string_kinds() {
		let mut payload = HashMap::new();

		payload.insert("text".to_string(), Value::from("hello"));
		payload.insert("count".to_string(), Value::from(3));

		assert_eq!(payload_str(&payload, "text"), Some("hello".to_string()));
		assert_eq!(payload_str(&payload, "count"), None);
		assert_eq!(payload_str(&payload, "missing"), None);
	}
}
