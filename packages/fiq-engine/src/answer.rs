use serde::Serialize;
use tracing::{info, warn};

use fiq_domain::{
	ExecutionOutcome, ExtractedEntities, NoDataReason, QueryIntent, ScoredChunk, classify,
	compose, execute, extract, normalize, render_fallback,
};

use crate::FiqEngine;

pub struct AnswerResponse {
	pub answer: String,
	pub debug: DebugReport,
}

/// Every intermediate the pipeline produced, for `--debug` output and tests.
#[derive(Clone, Debug, Serialize)]
pub struct DebugReport {
	pub normalized_query: String,
	pub entities: ExtractedEntities,
	pub intent: QueryIntent,
	pub outcome: ExecutionOutcome,
	pub chunks: Vec<ScoredChunk>,
	pub fallback_used: bool,
}

impl FiqEngine {
	/// Answer one query end to end. This never returns an error: provider
	/// and index failures degrade to the deterministic rendering, and
	/// unanswerable queries produce an explicit refusal or clarification.
	pub async fn answer(&self, query: &str) -> AnswerResponse {
		let normalized = normalize(query);
		let entities = extract(
			query,
			&normalized,
			&self.vocabulary,
			self.scorer.as_ref(),
			self.cfg.extraction.fuzzy_threshold,
		);
		let intent = classify(&normalized, &entities);

		info!(
			query = %normalized,
			target = ?intent.target,
			operation = ?intent.operation,
			"Query classified."
		);

		let outcome = execute(&self.trades, &self.holdings, &entities, intent, &self.cfg.answer);

		match &outcome {
			ExecutionOutcome::NoData { reason: NoDataReason::UnresolvedEntity } => {
				info!(
					portfolio = ?entities.unresolved_portfolio,
					ticker = ?entities.unresolved_ticker,
					"Query names entities outside the vocabulary."
				);
			},
			ExecutionOutcome::NoData { reason: NoDataReason::EmptyAfterFilter } => {
				info!("Filter matched no rows.");
			},
			ExecutionOutcome::NeedsClarification => {
				info!("Query maps to no supported operation.");
			},
			ExecutionOutcome::Completed { .. } => {},
		}

		let chunks = self.retrieve(query).await;
		let payload = compose(query, outcome, chunks);
		let (answer, fallback_used) = match self
			.providers
			.synthesis
			.synthesize(&self.cfg.providers.synthesis, &payload)
			.await
		{
			Ok(text) => (text, false),
			Err(err) => {
				warn!(error = %err, "Synthesis failed; using deterministic rendering.");

				(render_fallback(&payload), true)
			},
		};

		AnswerResponse {
			answer,
			debug: DebugReport {
				normalized_query: normalized,
				entities,
				intent,
				outcome: payload.outcome,
				chunks: payload.chunks,
				fallback_used,
			},
		}
	}
}
