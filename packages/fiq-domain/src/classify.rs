use serde::Serialize;

use crate::{extract::ExtractedEntities, normalize::tokenize};

const TRADE_KEYWORDS: &[&str] = &[
	"bought", "buy", "buys", "execution", "executions", "sell", "sells", "sold", "trade", "traded",
	"trades", "trading",
];
const HOLDING_KEYWORDS: &[&str] =
	&["exposure", "holding", "holdings", "mv", "pl", "pnl", "position", "positions", "ytd"];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetTarget {
	Trades,
	Holdings,
	Both,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateKind {
	Sum,
	Mean,
}
impl AggregateKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Sum => "total",
			Self::Mean => "average",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankDirection {
	Descending,
	Ascending,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankSubject {
	Portfolios,
	Rows,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum Operation {
	Count,
	Aggregate { kind: AggregateKind },
	Rank { direction: RankDirection, subject: RankSubject },
	Show,
	Unknown,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct QueryIntent {
	pub target: DatasetTarget,
	pub operation: Operation,
}

/// Infer which dataset(s) a query targets and which operation it maps to.
/// Ambiguity is a first-class outcome: both keyword families (or neither)
/// yield `Both`, and an unmatched operation yields `Unknown` rather than a
/// guess.
pub fn classify(normalized: &str, entities: &ExtractedEntities) -> QueryIntent {
	QueryIntent {
		target: classify_target(normalized, entities),
		operation: classify_operation(normalized, entities),
	}
}

fn classify_target(normalized: &str, entities: &ExtractedEntities) -> DatasetTarget {
	let tokens = tokenize(normalized);
	let trades = tokens.iter().any(|token| TRADE_KEYWORDS.contains(token));
	let holdings = tokens.iter().any(|token| HOLDING_KEYWORDS.contains(token))
		|| contains_phrase(normalized, "market value");

	match (trades, holdings) {
		(true, false) => DatasetTarget::Trades,
		(false, true) => DatasetTarget::Holdings,
		(false, false) if entities.trade_type.is_some() => DatasetTarget::Trades,
		_ => DatasetTarget::Both,
	}
}

fn classify_operation(normalized: &str, entities: &ExtractedEntities) -> Operation {
	// Priority order per keyword family; the first family that matches
	// wins.
	if contains_phrase(normalized, "how many")
		|| contains_phrase(normalized, "number of")
		|| contains_phrase(normalized, "count")
	{
		return Operation::Count;
	}
	if contains_phrase(normalized, "total") || contains_phrase(normalized, "sum") {
		return Operation::Aggregate { kind: AggregateKind::Sum };
	}
	if contains_phrase(normalized, "average")
		|| contains_phrase(normalized, "mean")
		|| contains_phrase(normalized, "avg")
	{
		return Operation::Aggregate { kind: AggregateKind::Mean };
	}

	let tokens = tokenize(normalized);
	let ascending = tokens
		.iter()
		.any(|token| matches!(*token, "worst" | "lowest" | "bottom" | "smallest" | "least"));
	let descending = tokens
		.iter()
		.any(|token| matches!(*token, "best" | "top" | "rank" | "ranked" | "highest" | "largest"));

	if ascending || descending {
		let direction =
			if ascending { RankDirection::Ascending } else { RankDirection::Descending };
		let subject = if contains_phrase(normalized, "portfolios")
			|| (contains_phrase(normalized, "portfolio") && entities.portfolio.is_none())
		{
			RankSubject::Portfolios
		} else {
			RankSubject::Rows
		};

		return Operation::Rank { direction, subject };
	}

	if tokens
		.iter()
		.any(|token| matches!(*token, "show" | "list" | "display" | "which" | "what" | "whats"))
	{
		return Operation::Show;
	}

	Operation::Unknown
}

fn contains_phrase(normalized: &str, phrase: &str) -> bool {
	format!(" {normalized} ").contains(&format!(" {phrase} "))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::normalize::normalize;

	fn intent(raw: &str) -> QueryIntent {
		classify(&normalize(raw), &ExtractedEntities::default())
	}

	#[test]
	fn buy_count_targets_trades() {
		let intent = intent("How many total Buy trades were executed across all portfolios?");

		assert_eq!(intent.target, DatasetTarget::Trades);
		assert_eq!(intent.operation, Operation::Count);
	}

	#[test]
	fn pl_ytd_targets_holdings_with_sum() {
		let intent = intent("Total PL YTD for Garfield");

		assert_eq!(intent.target, DatasetTarget::Holdings);
		assert_eq!(intent.operation, Operation::Aggregate { kind: AggregateKind::Sum });
	}

	#[test]
	fn average_maps_to_mean() {
		let intent = intent("Average price of traded shares");

		assert_eq!(intent.operation, Operation::Aggregate { kind: AggregateKind::Mean });
	}

	#[test]
	fn rank_beats_show_and_reads_direction() {
		let top = intent("Show top 3 portfolios by market value");

		assert_eq!(top.target, DatasetTarget::Holdings);
		assert_eq!(top.operation, Operation::Rank {
			direction: RankDirection::Descending,
			subject: RankSubject::Portfolios,
		});

		let worst = intent("Worst 5 positions by PL YTD");

		assert_eq!(worst.operation, Operation::Rank {
			direction: RankDirection::Ascending,
			subject: RankSubject::Rows,
		});
	}

	#[test]
	fn filter_only_language_is_show() {
		let intent = intent("Which holdings have negative PL YTD?");

		assert_eq!(intent.target, DatasetTarget::Holdings);
		assert_eq!(intent.operation, Operation::Show);
	}

	#[test]
	fn neither_keyword_family_is_both() {
		let intent = intent("Total quantity for Garfield");

		assert_eq!(intent.target, DatasetTarget::Both);
	}

	#[test]
	fn no_operation_keyword_is_unknown() {
		let intent = intent("Garfield performance thoughts?");

		assert_eq!(intent.operation, Operation::Unknown);
	}

	#[test]
	fn operation_tag_does_not_collide_with_variant_fields() {
		let json = serde_json::to_string(&Operation::Aggregate { kind: AggregateKind::Sum })
			.expect("serialize failed");

		assert_eq!(json, r#"{"op":"aggregate","kind":"sum"}"#);
	}

	#[test]
	fn trade_type_entity_breaks_dataset_ties() {
		let entities =
			ExtractedEntities { trade_type: Some(crate::records::TradeType::Buy), ..Default::default() };
		let intent = classify(&normalize("Total quantity acquired of AAPL"), &entities);

		assert_eq!(intent.target, DatasetTarget::Trades);
	}
}
