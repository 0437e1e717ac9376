use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
	classify::{AggregateKind, DatasetTarget, Operation, QueryIntent, RankDirection, RankSubject},
	extract::ExtractedEntities,
	records::{Dataset, Holding, Metric, Trade},
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoDataReason {
	/// The query named a portfolio or ticker the vocabulary does not know.
	UnresolvedEntity,
	/// Every entity resolved, but the predicate conjunction matched no rows.
	EmptyAfterFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedEntry {
	pub key: String,
	pub value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DisplayRow {
	pub dataset: Dataset,
	pub portfolio: String,
	pub ticker: String,
	pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "op")]
pub enum OperationValue {
	Count { count: usize },
	Aggregate { kind: AggregateKind, metric: Metric, value: Decimal },
	Ranking {
		metric: Metric,
		direction: RankDirection,
		entries: Vec<RankedEntry>,
	},
	Rows { rows: Vec<DisplayRow>, truncated: bool },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperationResult {
	pub dataset: Dataset,
	pub value: OperationValue,
	/// The filtered rows the value was computed from, capped for payload
	/// size. Traceability only; never the whole unfiltered record set.
	pub supporting_rows: Vec<DisplayRow>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum ExecutionOutcome {
	Completed { results: Vec<OperationResult> },
	NoData { reason: NoDataReason },
	NeedsClarification,
}

/// Run the classified operation over the target dataset(s).
///
/// A dataset target of `Both` evaluates trades and holdings independently
/// and keeps every non-empty side; nothing is silently discarded. An empty
/// result is an outcome, not an error.
pub fn execute(
	trades: &[Trade],
	holdings: &[Holding],
	entities: &ExtractedEntities,
	intent: QueryIntent,
	limits: &fiq_config::Answer,
) -> ExecutionOutcome {
	if entities.has_unresolved() {
		return ExecutionOutcome::NoData { reason: NoDataReason::UnresolvedEntity };
	}
	if matches!(intent.operation, Operation::Unknown) {
		return ExecutionOutcome::NeedsClarification;
	}

	match intent.target {
		DatasetTarget::Trades => {
			single_outcome(run_trades(trades, entities, intent.operation, limits), Dataset::Trades, intent.operation)
		},
		DatasetTarget::Holdings => single_outcome(
			run_holdings(holdings, entities, intent.operation, limits),
			Dataset::Holdings,
			intent.operation,
		),
		DatasetTarget::Both => {
			let results: Vec<OperationResult> = [
				run_trades(trades, entities, intent.operation, limits),
				run_holdings(holdings, entities, intent.operation, limits),
			]
			.into_iter()
			.flatten()
			.collect();

			if results.is_empty() {
				ExecutionOutcome::NoData { reason: NoDataReason::EmptyAfterFilter }
			} else {
				ExecutionOutcome::Completed { results }
			}
		},
	}
}

/// Against a single explicit dataset a count of zero is still an answer;
/// only the ambiguous `Both` path treats zero matches as empty.
fn single_outcome(
	result: Option<OperationResult>,
	dataset: Dataset,
	operation: Operation,
) -> ExecutionOutcome {
	match result {
		Some(result) => ExecutionOutcome::Completed { results: vec![result] },
		None if matches!(operation, Operation::Count) => ExecutionOutcome::Completed {
			results: vec![OperationResult {
				dataset,
				value: OperationValue::Count { count: 0 },
				supporting_rows: Vec::new(),
			}],
		},
		None => ExecutionOutcome::NoData { reason: NoDataReason::EmptyAfterFilter },
	}
}

fn trade_matches(trade: &Trade, entities: &ExtractedEntities) -> bool {
	if let Some(portfolio) = &entities.portfolio
		&& trade.portfolio != *portfolio
	{
		return false;
	}
	if let Some(ticker) = &entities.ticker
		&& trade.ticker != *ticker
	{
		return false;
	}
	if let Some(trade_type) = entities.trade_type
		&& trade.trade_type != trade_type
	{
		return false;
	}
	if let Some(condition) = &entities.condition {
		let metric = condition_metric(entities, Dataset::Trades);

		match metric.of_trade(trade) {
			Some(value) if condition.matches(value) => {},
			_ => return false,
		}
	}

	true
}

fn holding_matches(holding: &Holding, entities: &ExtractedEntities) -> bool {
	if let Some(portfolio) = &entities.portfolio
		&& holding.portfolio != *portfolio
	{
		return false;
	}
	if let Some(ticker) = &entities.ticker
		&& holding.ticker != *ticker
	{
		return false;
	}
	if entities.trade_type.is_some() {
		// Holdings carry no trade side; a side constraint can never match.
		return false;
	}
	if let Some(condition) = &entities.condition {
		let metric = condition_metric(entities, Dataset::Holdings);

		match metric.of_holding(holding) {
			Some(value) if condition.matches(value) => {},
			_ => return false,
		}
	}

	true
}

fn condition_metric(entities: &ExtractedEntities, dataset: Dataset) -> Metric {
	entities
		.metric
		.filter(|metric| metric.supported_by(dataset))
		.unwrap_or_else(|| Metric::default_for(dataset))
}

/// The metric an aggregate or rank runs on; `None` when the query names a
/// metric the dataset does not carry.
fn value_metric(entities: &ExtractedEntities, dataset: Dataset) -> Option<Metric> {
	match entities.metric {
		Some(metric) if metric.supported_by(dataset) => Some(metric),
		Some(_) => None,
		None => Some(Metric::default_for(dataset)),
	}
}

fn run_trades(
	trades: &[Trade],
	entities: &ExtractedEntities,
	operation: Operation,
	limits: &fiq_config::Answer,
) -> Option<OperationResult> {
	let rows: Vec<&Trade> = trades.iter().filter(|trade| trade_matches(trade, entities)).collect();

	if rows.is_empty() {
		return None;
	}

	let display: Vec<DisplayRow> = rows.iter().map(|trade| trade_row(trade)).collect();
	let values = |metric: Metric| -> Vec<Decimal> {
		rows.iter().filter_map(|trade| metric.of_trade(trade)).collect()
	};
	let keys = |_: Metric| -> Vec<String> {
		rows.iter().map(|trade| format!("{} ({})", trade.ticker, trade.portfolio)).collect()
	};
	let portfolios: Vec<&str> = rows.iter().map(|trade| trade.portfolio.as_str()).collect();

	build_result(
		Dataset::Trades,
		entities,
		operation,
		limits,
		display,
		&values,
		&keys,
		&portfolios,
	)
}

fn run_holdings(
	holdings: &[Holding],
	entities: &ExtractedEntities,
	operation: Operation,
	limits: &fiq_config::Answer,
) -> Option<OperationResult> {
	let rows: Vec<&Holding> =
		holdings.iter().filter(|holding| holding_matches(holding, entities)).collect();

	if rows.is_empty() {
		return None;
	}

	let display: Vec<DisplayRow> = rows.iter().map(|holding| holding_row(holding)).collect();
	let values = |metric: Metric| -> Vec<Decimal> {
		rows.iter().filter_map(|holding| metric.of_holding(holding)).collect()
	};
	let keys = |_: Metric| -> Vec<String> {
		rows.iter().map(|holding| format!("{} ({})", holding.ticker, holding.portfolio)).collect()
	};
	let portfolios: Vec<&str> = rows.iter().map(|holding| holding.portfolio.as_str()).collect();

	build_result(
		Dataset::Holdings,
		entities,
		operation,
		limits,
		display,
		&values,
		&keys,
		&portfolios,
	)
}

#[allow(clippy::too_many_arguments)]
fn build_result(
	dataset: Dataset,
	entities: &ExtractedEntities,
	operation: Operation,
	limits: &fiq_config::Answer,
	display: Vec<DisplayRow>,
	values: &dyn Fn(Metric) -> Vec<Decimal>,
	keys: &dyn Fn(Metric) -> Vec<String>,
	portfolios: &[&str],
) -> Option<OperationResult> {
	let supporting_rows = cap_rows(&display, limits.max_show_rows as usize).0;
	let value = match operation {
		Operation::Count => OperationValue::Count { count: display.len() },
		Operation::Aggregate { kind } => {
			let metric = value_metric(entities, dataset)?;
			let metric_values = values(metric);

			if metric_values.is_empty() {
				return None;
			}

			let sum: Decimal = metric_values.iter().copied().sum();
			let value = match kind {
				AggregateKind::Sum => sum,
				AggregateKind::Mean => sum
					.checked_div(Decimal::from(metric_values.len()))
					.unwrap_or(Decimal::ZERO),
			};

			OperationValue::Aggregate { kind, metric, value }
		},
		Operation::Rank { direction, subject } => {
			let metric = value_metric(entities, dataset)?;
			let n = entities.top_n.unwrap_or(limits.default_rank_n) as usize;
			let entries = match subject {
				RankSubject::Portfolios => {
					rank_portfolios(portfolios, &values(metric), direction, n)
				},
				RankSubject::Rows => rank_rows(keys(metric), values(metric), direction, n),
			};

			if entries.is_empty() {
				return None;
			}

			OperationValue::Ranking { metric, direction, entries }
		},
		Operation::Show => {
			let (rows, truncated) = cap_rows(&display, limits.max_show_rows as usize);

			OperationValue::Rows { rows, truncated }
		},
		Operation::Unknown => return None,
	};

	Some(OperationResult { dataset, value, supporting_rows })
}

fn cap_rows(rows: &[DisplayRow], cap: usize) -> (Vec<DisplayRow>, bool) {
	(rows.iter().take(cap).cloned().collect(), rows.len() > cap)
}

/// Stable sort: ties keep their incoming order (original row order for row
/// rankings, name order for grouped portfolios).
fn rank_rows(
	keys: Vec<String>,
	values: Vec<Decimal>,
	direction: RankDirection,
	n: usize,
) -> Vec<RankedEntry> {
	let mut entries: Vec<RankedEntry> = keys
		.into_iter()
		.zip(values)
		.map(|(key, value)| RankedEntry { key, value })
		.collect();

	sort_entries(&mut entries, direction);
	entries.truncate(n);

	entries
}

fn rank_portfolios(
	portfolios: &[&str],
	values: &[Decimal],
	direction: RankDirection,
	n: usize,
) -> Vec<RankedEntry> {
	let mut grouped: BTreeMap<&str, Decimal> = BTreeMap::new();

	for (portfolio, value) in portfolios.iter().zip(values.iter()) {
		*grouped.entry(portfolio).or_insert(Decimal::ZERO) += *value;
	}

	let mut entries: Vec<RankedEntry> = grouped
		.into_iter()
		.map(|(key, value)| RankedEntry { key: key.to_string(), value })
		.collect();

	sort_entries(&mut entries, direction);
	entries.truncate(n);

	entries
}

fn sort_entries(entries: &mut [RankedEntry], direction: RankDirection) {
	match direction {
		RankDirection::Descending => entries.sort_by(|a, b| b.value.cmp(&a.value)),
		RankDirection::Ascending => entries.sort_by(|a, b| a.value.cmp(&b.value)),
	}
}

fn trade_row(trade: &Trade) -> DisplayRow {
	DisplayRow {
		dataset: Dataset::Trades,
		portfolio: trade.portfolio.clone(),
		ticker: trade.ticker.clone(),
		detail: format!(
			"{} {} {} @ {} on {}, realized PL {}",
			trade.trade_type.as_str(),
			trade.quantity,
			trade.ticker,
			trade.price,
			trade.trade_date,
			trade.realized_pl,
		),
	}
}

fn holding_row(holding: &Holding) -> DisplayRow {
	DisplayRow {
		dataset: Dataset::Holdings,
		portfolio: holding.portfolio.clone(),
		ticker: holding.ticker.clone(),
		detail: format!(
			"{} {} @ {}, market value {}, PL YTD {}",
			holding.quantity, holding.ticker, holding.price, holding.mv_base, holding.pl_ytd,
		),
	}
}

#[cfg(test)]
mod tests {
	use rust_decimal_macros::dec;
	use time::macros::date;

	use super::*;
	use crate::records::TradeType;

	fn limits() -> fiq_config::Answer {
		fiq_config::Answer { default_rank_n: 5, max_show_rows: 3 }
	}

	fn trade(portfolio: &str, ticker: &str, trade_type: TradeType, quantity: i64, pl: i64) -> Trade {
		Trade {
			portfolio: portfolio.to_string(),
			ticker: ticker.to_string(),
			trade_type,
			trade_date: date!(2024 - 02 - 09),
			quantity: Decimal::from(quantity),
			price: dec!(10),
			realized_pl: Decimal::from(pl),
		}
	}

	fn holding(portfolio: &str, ticker: &str, mv: i64, pl: i64) -> Holding {
		Holding {
			portfolio: portfolio.to_string(),
			ticker: ticker.to_string(),
			quantity: dec!(100),
			price: dec!(10),
			mv_base: Decimal::from(mv),
			pl_ytd: Decimal::from(pl),
		}
	}

	fn sample_trades() -> Vec<Trade> {
		vec![
			trade("garfield", "aapl", TradeType::Buy, 10, 5),
			trade("garfield", "msft", TradeType::Sell, 20, -3),
			trade("odie fund", "aapl", TradeType::Buy, 30, 7),
			trade("odie fund", "tsla", TradeType::Buy, 40, -1),
		]
	}

	fn sample_holdings() -> Vec<Holding> {
		vec![
			holding("garfield", "aapl", 1000, 50),
			holding("garfield", "msft", 500, -20),
			holding("odie fund", "aapl", 2000, 30),
			holding("nermal", "tsla", 1500, 10),
		]
	}

	fn intent(target: DatasetTarget, operation: Operation) -> QueryIntent {
		QueryIntent { target, operation }
	}

	#[test]
	fn count_matches_filtered_cardinality() {
		let entities =
			ExtractedEntities { trade_type: Some(TradeType::Buy), ..Default::default() };
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(DatasetTarget::Trades, Operation::Count),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].dataset, Dataset::Trades);
		assert_eq!(results[0].value, OperationValue::Count { count: 3 });
	}

	#[test]
	fn count_of_zero_is_a_valid_answer() {
		let entities = ExtractedEntities {
			portfolio: Some("garfield".to_string()),
			ticker: Some("tsla".to_string()),
			..Default::default()
		};
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(DatasetTarget::Trades, Operation::Count),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};

		assert_eq!(results[0].value, OperationValue::Count { count: 0 });
	}

	#[test]
	fn aggregate_sums_the_metric_column() {
		let entities = ExtractedEntities {
			portfolio: Some("garfield".to_string()),
			metric: Some(Metric::PlYtd),
			..Default::default()
		};
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(DatasetTarget::Holdings, Operation::Aggregate { kind: AggregateKind::Sum }),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};

		assert_eq!(results[0].value, OperationValue::Aggregate {
			kind: AggregateKind::Sum,
			metric: Metric::PlYtd,
			value: dec!(30),
		});
	}

	#[test]
	fn aggregate_over_empty_set_is_no_data_not_zero() {
		let entities = ExtractedEntities {
			portfolio: Some("nermal".to_string()),
			..Default::default()
		};
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(DatasetTarget::Trades, Operation::Aggregate { kind: AggregateKind::Sum }),
			&limits(),
		);

		assert_eq!(outcome, ExecutionOutcome::NoData { reason: NoDataReason::EmptyAfterFilter });
	}

	#[test]
	fn aggregate_mean_divides_by_row_count() {
		let entities =
			ExtractedEntities { metric: Some(Metric::Quantity), ..Default::default() };
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(DatasetTarget::Trades, Operation::Aggregate { kind: AggregateKind::Mean }),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};

		assert_eq!(results[0].value, OperationValue::Aggregate {
			kind: AggregateKind::Mean,
			metric: Metric::Quantity,
			value: dec!(25),
		});
	}

	#[test]
	fn unresolved_entity_is_distinct_no_data() {
		let entities = ExtractedEntities {
			unresolved_ticker: Some("zzzz".to_string()),
			..Default::default()
		};
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(DatasetTarget::Trades, Operation::Count),
			&limits(),
		);

		assert_eq!(outcome, ExecutionOutcome::NoData { reason: NoDataReason::UnresolvedEntity });
	}

	#[test]
	fn unknown_operation_requests_clarification() {
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&ExtractedEntities::default(),
			intent(DatasetTarget::Both, Operation::Unknown),
			&limits(),
		);

		assert_eq!(outcome, ExecutionOutcome::NeedsClarification);
	}

	#[test]
	fn rank_portfolios_descending_takes_exactly_n() {
		let entities = ExtractedEntities {
			metric: Some(Metric::MvBase),
			top_n: Some(3),
			..Default::default()
		};
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(
				DatasetTarget::Holdings,
				Operation::Rank {
					direction: RankDirection::Descending,
					subject: RankSubject::Portfolios,
				},
			),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};
		let OperationValue::Ranking { entries, .. } = &results[0].value else {
			panic!("expected ranking value");
		};

		assert_eq!(entries.len(), 3);
		assert_eq!(entries[0], RankedEntry { key: "odie fund".to_string(), value: dec!(2000) });
		assert_eq!(entries[1], RankedEntry { key: "garfield".to_string(), value: dec!(1500) });
		assert_eq!(entries[2], RankedEntry { key: "nermal".to_string(), value: dec!(1500) });
	}

	#[test]
	fn rank_worst_sorts_ascending_with_stable_ties() {
		let entities = ExtractedEntities { top_n: Some(2), ..Default::default() };
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(
				DatasetTarget::Trades,
				Operation::Rank { direction: RankDirection::Ascending, subject: RankSubject::Rows },
			),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};
		let OperationValue::Ranking { entries, .. } = &results[0].value else {
			panic!("expected ranking value");
		};

		assert_eq!(entries.len(), 2);
		assert_eq!(entries[0].key, "msft (garfield)");
		assert_eq!(entries[1].key, "tsla (odie fund)");
	}

	#[test]
	fn rank_returns_min_of_n_and_len() {
		let entities = ExtractedEntities { top_n: Some(50), ..Default::default() };
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(
				DatasetTarget::Holdings,
				Operation::Rank {
					direction: RankDirection::Descending,
					subject: RankSubject::Portfolios,
				},
			),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};
		let OperationValue::Ranking { entries, .. } = &results[0].value else {
			panic!("expected ranking value");
		};

		assert_eq!(entries.len(), 3);
	}

	#[test]
	fn show_caps_rows_and_flags_truncation() {
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&ExtractedEntities::default(),
			intent(DatasetTarget::Trades, Operation::Show),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};
		let OperationValue::Rows { rows, truncated } = &results[0].value else {
			panic!("expected rows value");
		};

		assert_eq!(rows.len(), 3);
		assert!(*truncated);
	}

	#[test]
	fn both_target_keeps_each_non_empty_side() {
		let entities = ExtractedEntities {
			ticker: Some("tsla".to_string()),
			..Default::default()
		};
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(DatasetTarget::Both, Operation::Count),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};

		assert_eq!(results.len(), 2);
		assert_eq!(results[0].dataset, Dataset::Trades);
		assert_eq!(results[1].dataset, Dataset::Holdings);
	}

	#[test]
	fn both_target_drops_only_the_empty_side() {
		let entities = ExtractedEntities {
			trade_type: Some(TradeType::Sell),
			..Default::default()
		};
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(DatasetTarget::Both, Operation::Count),
			&limits(),
		);

		let ExecutionOutcome::Completed { results } = outcome else {
			panic!("expected completed outcome");
		};

		assert_eq!(results.len(), 1);
		assert_eq!(results[0].dataset, Dataset::Trades);
	}

	#[test]
	fn metric_unsupported_by_dataset_is_no_data() {
		let entities = ExtractedEntities { metric: Some(Metric::MvBase), ..Default::default() };
		let outcome = execute(
			&sample_trades(),
			&sample_holdings(),
			&entities,
			intent(DatasetTarget::Trades, Operation::Aggregate { kind: AggregateKind::Sum }),
			&limits(),
		);

		assert_eq!(outcome, ExecutionOutcome::NoData { reason: NoDataReason::EmptyAfterFilter });
	}
}
