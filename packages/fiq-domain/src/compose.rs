use serde::Serialize;

use crate::{
	classify::RankDirection,
	corpus::ChunkKind,
	execute::{ExecutionOutcome, NoDataReason, OperationResult, OperationValue},
};

/// The exact refusal line the synthesis prompt pins the model to; the
/// offline fallback emits it verbatim so both paths agree.
pub const CANNOT_FIND_ANSWER: &str = "I cannot find the answer in the provided data.";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ScoredChunk {
	pub id: String,
	pub kind: ChunkKind,
	pub text: String,
	pub score: f32,
}

/// Everything the answer step needs: the structured outcome is the ground
/// truth, retrieved chunks are supporting color only.
#[derive(Clone, Debug, Serialize)]
pub struct EvidencePayload {
	pub query: String,
	pub outcome: ExecutionOutcome,
	pub chunks: Vec<ScoredChunk>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatMessage {
	pub role: String,
	pub content: String,
}
impl ChatMessage {
	fn new(role: &str, content: String) -> Self {
		Self { role: role.to_string(), content }
	}
}

pub fn compose(query: &str, outcome: ExecutionOutcome, chunks: Vec<ScoredChunk>) -> EvidencePayload {
	EvidencePayload { query: query.to_string(), outcome, chunks }
}

/// Deterministic answer text built from the structured outcome alone. Used
/// verbatim when no synthesis provider is configured or the provider fails.
pub fn render_fallback(payload: &EvidencePayload) -> String {
	match &payload.outcome {
		ExecutionOutcome::NeedsClarification => {
			"I could not map this question to an operation. Try asking for a count, a total or \
			 average of a metric, a ranking, or a listing of matching records."
				.to_string()
		},
		// Unresolved names and empty filters differ only in the logs; the
		// user-facing outcome is the same refusal.
		ExecutionOutcome::NoData { .. } => CANNOT_FIND_ANSWER.to_string(),
		ExecutionOutcome::Completed { results } => {
			results.iter().map(render_result).collect::<Vec<_>>().join("\n\n")
		},
	}
}

fn render_result(result: &OperationResult) -> String {
	let dataset = result.dataset.as_str();

	match &result.value {
		OperationValue::Count { count } => format!("{count} matching {dataset} records."),
		OperationValue::Aggregate { kind, metric, value } => {
			format!("{} {} across {dataset}: {value}.", capitalize(kind.as_str()), metric.label())
		},
		OperationValue::Ranking { metric, direction, entries } => {
			let heading = match direction {
				RankDirection::Descending => "Top",
				RankDirection::Ascending => "Bottom",
			};
			let mut lines =
				vec![format!("{heading} {} {dataset} by {}:", entries.len(), metric.label())];

			for (position, entry) in entries.iter().enumerate() {
				lines.push(format!("{}. {}: {}", position + 1, entry.key, entry.value));
			}

			lines.join("\n")
		},
		OperationValue::Rows { rows, truncated } => {
			let mut lines = vec![format!("Matching {dataset} records:")];

			for row in rows {
				lines.push(format!("- {} | {} | {}", row.portfolio, row.ticker, row.detail));
			}

			if *truncated {
				lines.push("(list truncated)".to_string());
			}

			lines.join("\n")
		},
	}
}

/// Chat messages for a synthesis provider. The structured outcome is
/// authoritative; the model is forbidden from inventing figures beyond it.
pub fn synthesis_messages(payload: &EvidencePayload) -> Vec<ChatMessage> {
	let facts = serde_json::to_string_pretty(&payload.outcome)
		.unwrap_or_else(|_| "{}".to_string());
	let evidence = if payload.chunks.is_empty() {
		"(no supporting context retrieved)".to_string()
	} else {
		payload
			.chunks
			.iter()
			.map(|chunk| format!("[{} {:.3}] {}", chunk.id, chunk.score, chunk.text))
			.collect::<Vec<_>>()
			.join("\n")
	};

	vec![
		ChatMessage::new(
			"system",
			format!(
				"You answer questions about trade and holding records. Use only the computed \
				 facts and supporting context below. Never invent numbers, portfolios, or \
				 tickers. If the facts do not contain the answer, reply exactly: \
				 {CANNOT_FIND_ANSWER}"
			),
		),
		ChatMessage::new(
			"user",
			format!(
				"Question: {}\n\nComputed facts:\n{facts}\n\nSupporting context:\n{evidence}",
				payload.query
			),
		),
	]
}

fn capitalize(word: &str) -> String {
	let mut chars = word.chars();

	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}
