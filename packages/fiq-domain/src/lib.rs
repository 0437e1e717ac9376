mod classify;
mod compose;
mod corpus;
mod execute;
mod extract;
mod normalize;
mod records;
mod similarity;

pub use classify::{
	classify, AggregateKind, DatasetTarget, Operation, QueryIntent, RankDirection, RankSubject,
};
pub use compose::{
	compose, render_fallback, synthesis_messages, ChatMessage, EvidencePayload, ScoredChunk,
	CANNOT_FIND_ANSWER,
};
pub use corpus::{build_chunks, Chunk, ChunkKind};
pub use execute::{
	execute, DisplayRow, ExecutionOutcome, NoDataReason, OperationResult, OperationValue,
	RankedEntry,
};
pub use extract::{extract, Cmp, Condition, ExtractedEntities};
pub use normalize::{normalize, tokenize};
pub use records::{Dataset, Holding, Metric, Trade, TradeType, Vocabulary};
pub use similarity::{NormalizedLevenshtein, SimilarityScorer};
