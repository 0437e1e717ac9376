use regex::Regex;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
	normalize::{normalize, tokenize},
	records::{Metric, TradeType, Vocabulary},
	similarity::SimilarityScorer,
};

/// Tokens that can never be a portfolio name or ticker on their own.
const STOPWORDS: &[&str] = &[
	"a", "above", "across", "all", "an", "and", "are", "at", "average", "below", "best", "bottom",
	"bought", "buy", "buys", "by", "count", "display", "executed", "executions", "exposure", "for",
	"give", "greater", "highest", "holding", "holdings", "how", "in", "is", "least", "less",
	"list", "lowest", "many", "market", "me", "mean", "more", "most", "mv", "negative", "number",
	"of", "on", "or", "over", "pl", "pnl", "portfolio", "portfolios", "position", "positions",
	"positive", "price", "qty", "quantity", "rank", "ranked", "realized", "sell", "sells",
	"shares", "show", "sold", "stock", "stocks", "sum", "than", "the", "to", "top", "total",
	"trade", "traded", "trades", "trading", "under", "value", "was", "were", "what", "whats",
	"which", "with", "worst", "ytd",
];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cmp {
	Lt,
	Le,
	Gt,
	Ge,
	Eq,
}
impl Cmp {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Lt => "<",
			Self::Le => "<=",
			Self::Gt => ">",
			Self::Ge => ">=",
			Self::Eq => "=",
		}
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Condition {
	pub op: Cmp,
	pub threshold: Decimal,
}
impl Condition {
	pub fn matches(&self, value: Decimal) -> bool {
		match self.op {
			Cmp::Lt => value < self.threshold,
			Cmp::Le => value <= self.threshold,
			Cmp::Gt => value > self.threshold,
			Cmp::Ge => value >= self.threshold,
			Cmp::Eq => value == self.threshold,
		}
	}
}

/// Structured slots pulled out of a query. Every field is independently
/// optional; an absent slot means "no constraint on this dimension". The
/// `unresolved_*` fields record a slot the query clearly named but the
/// vocabulary could not resolve, which downstream renders as "no data"
/// rather than dropping the constraint.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ExtractedEntities {
	pub portfolio: Option<String>,
	pub unresolved_portfolio: Option<String>,
	pub ticker: Option<String>,
	pub unresolved_ticker: Option<String>,
	pub trade_type: Option<TradeType>,
	pub metric: Option<Metric>,
	pub condition: Option<Condition>,
	pub top_n: Option<u32>,
}
impl ExtractedEntities {
	pub fn has_unresolved(&self) -> bool {
		self.unresolved_portfolio.is_some() || self.unresolved_ticker.is_some()
	}
}

/// Extraction is total: it never fails, it only leaves slots empty.
pub fn extract(
	raw_query: &str,
	normalized: &str,
	vocabulary: &Vocabulary,
	scorer: &dyn SimilarityScorer,
	fuzzy_threshold: f64,
) -> ExtractedEntities {
	let (ticker, unresolved_ticker) = extract_ticker(raw_query, normalized, vocabulary);
	let (portfolio, unresolved_portfolio) =
		extract_portfolio(normalized, vocabulary, scorer, fuzzy_threshold);

	ExtractedEntities {
		portfolio,
		unresolved_portfolio,
		ticker,
		unresolved_ticker,
		trade_type: extract_trade_type(normalized),
		metric: extract_metric(normalized),
		condition: extract_condition(normalized),
		top_n: extract_top_n(normalized),
	}
}

fn is_stopword(token: &str) -> bool {
	STOPWORDS.binary_search(&token).is_ok()
}

fn contains_phrase(normalized: &str, phrase: &str) -> bool {
	let padded = format!(" {normalized} ");

	padded.contains(&format!(" {phrase} "))
}

fn extract_ticker(
	raw_query: &str,
	normalized: &str,
	vocabulary: &Vocabulary,
) -> (Option<String>, Option<String>) {
	// A lowercase mention of a known ticker is still an exact hit.
	for token in tokenize(normalized) {
		if !is_stopword(token) && vocabulary.has_ticker(token) {
			return (Some(token.to_string()), None);
		}
	}

	// Uppercase ticker-shaped tokens that resolve to nothing are recorded
	// as unresolved rather than silently dropped.
	let Ok(shape) = Regex::new(r"\b[A-Z][A-Z0-9]{1,9}\b") else {
		return (None, None);
	};

	for candidate in shape.find_iter(raw_query) {
		let token = normalize(candidate.as_str());

		if token.is_empty() || is_stopword(&token) {
			continue;
		}

		return (None, Some(token));
	}

	(None, None)
}

fn extract_metric(normalized: &str) -> Option<Metric> {
	let mut aliases: Vec<(&'static str, Metric)> = Vec::new();

	for metric in [Metric::Quantity, Metric::Price, Metric::RealizedPl, Metric::MvBase, Metric::PlYtd]
	{
		for alias in metric.aliases() {
			aliases.push((alias, metric));
		}
	}

	// Longest alias wins so "realized pl" is never shadowed by "pl".
	aliases.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(b.0)));

	aliases
		.into_iter()
		.find(|(alias, _)| contains_phrase(normalized, alias))
		.map(|(_, metric)| metric)
}

fn extract_trade_type(normalized: &str) -> Option<TradeType> {
	let tokens = tokenize(normalized);
	let buy = tokens.iter().any(|token| matches!(*token, "buy" | "buys" | "bought" | "buying"));
	let sell = tokens.iter().any(|token| matches!(*token, "sell" | "sells" | "sold" | "selling"));

	match (buy, sell) {
		(true, false) => Some(TradeType::Buy),
		(false, true) => Some(TradeType::Sell),
		_ => None,
	}
}

fn extract_condition(normalized: &str) -> Option<Condition> {
	if contains_phrase(normalized, "negative") {
		return Some(Condition { op: Cmp::Lt, threshold: Decimal::ZERO });
	}
	if contains_phrase(normalized, "positive") {
		return Some(Condition { op: Cmp::Gt, threshold: Decimal::ZERO });
	}

	let number = r"(-?\d+(?:\.\d+)?)";

	for (pattern, op) in [
		(format!(r"\b(?:greater|more|higher|above|over)(?:\s+than)?\s+{number}"), Cmp::Gt),
		(format!(r"\b(?:less|lower|below|under)(?:\s+than)?\s+{number}"), Cmp::Lt),
		(format!(r"\bat\s+least\s+{number}"), Cmp::Ge),
		(format!(r"\bat\s+most\s+{number}"), Cmp::Le),
		(format!(r"\b(?:equal\s+to|exactly)\s+{number}"), Cmp::Eq),
	] {
		let Ok(re) = Regex::new(&pattern) else {
			continue;
		};
		let Some(caps) = re.captures(normalized) else {
			continue;
		};
		let Some(threshold) = caps.get(1).and_then(|m| m.as_str().parse::<Decimal>().ok()) else {
			continue;
		};

		return Some(Condition { op, threshold });
	}

	None
}

fn extract_top_n(normalized: &str) -> Option<u32> {
	let re = Regex::new(r"\b(?:top|best|worst|bottom|first)\s+(\d{1,3})\b").ok()?;
	let caps = re.captures(normalized)?;

	caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()).filter(|n| *n > 0)
}

fn extract_portfolio(
	normalized: &str,
	vocabulary: &Vocabulary,
	scorer: &dyn SimilarityScorer,
	fuzzy_threshold: f64,
) -> (Option<String>, Option<String>) {
	if let Some(phrase) = portfolio_marker_phrase(normalized) {
		let windows = phrase_windows(&phrase);

		return match best_candidate(&windows, vocabulary, scorer, fuzzy_threshold) {
			Some(candidate) => (Some(candidate), None),
			None => (None, Some(phrase)),
		};
	}

	let windows = phrase_windows(normalized);

	(best_candidate(&windows, vocabulary, scorer, fuzzy_threshold), None)
}

/// A phrase the query explicitly marks as a portfolio name ("for X",
/// "portfolio X", "X portfolio"). When present but unmatchable, the query
/// asked about something we do not know, which is not the same as asking
/// about everything.
fn portfolio_marker_phrase(normalized: &str) -> Option<String> {
	let patterns =
		[r"\bportfolio\s+([a-z0-9 .-]+)$", r"\b([a-z0-9 .-]+?)\s+portfolio\b", r"\bfor\s+([a-z0-9 .-]+)$"];

	for pattern in patterns {
		let Some(caps) = Regex::new(pattern).ok().and_then(|re| re.captures(normalized)) else {
			continue;
		};
		let Some(raw_phrase) = caps.get(1) else {
			continue;
		};
		let tokens: Vec<&str> =
			tokenize(raw_phrase.as_str()).into_iter().filter(|token| !is_stopword(token)).collect();

		if tokens.is_empty() {
			continue;
		}

		return Some(tokens.join(" "));
	}

	None
}

/// Candidate n-gram windows (one to four tokens) over a normalized phrase.
/// Single stopwords and windows of nothing but stopwords are skipped.
fn phrase_windows(normalized: &str) -> Vec<String> {
	let tokens = tokenize(normalized);
	let mut windows = Vec::new();

	for width in 1..=4usize.min(tokens.len().max(1)) {
		for window in tokens.windows(width) {
			if window.iter().all(|token| is_stopword(token)) {
				continue;
			}
			if width == 1 && window[0].len() < 3 {
				continue;
			}

			windows.push(window.join(" "));
		}
	}

	windows
}

fn best_candidate(
	windows: &[String],
	vocabulary: &Vocabulary,
	scorer: &dyn SimilarityScorer,
	fuzzy_threshold: f64,
) -> Option<String> {
	// Tie-break: higher score, then longer matched window, then the
	// lexicographically smaller vocabulary entry, for determinism.
	let mut best: Option<(f64, usize, &str)> = None;

	for window in windows {
		for candidate in vocabulary.portfolios() {
			let score = scorer.score(window, candidate);

			if score < fuzzy_threshold {
				continue;
			}

			let better = match best {
				None => true,
				Some((best_score, best_len, best_candidate)) =>
					score > best_score
						|| (score == best_score && window.len() > best_len)
						|| (score == best_score
							&& window.len() == best_len
							&& candidate.as_str() < best_candidate),
			};

			if better {
				best = Some((score, window.len(), candidate));
			}
		}
	}

	best.map(|(_, _, candidate)| candidate.to_string())
}

#[cfg(test)]
mod tests {
	use rust_decimal_macros::dec;

	use super::*;
	use crate::{
		normalize::normalize,
		records::{Holding, Trade, Vocabulary},
		similarity::NormalizedLevenshtein,
	};

	fn vocabulary(portfolios: &[&str], tickers: &[&str]) -> Vocabulary {
		use time::macros::date;

		let trades: Vec<Trade> = portfolios
			.iter()
			.zip(tickers.iter().cycle())
			.map(|(portfolio, ticker)| Trade {
				portfolio: normalize(portfolio),
				ticker: normalize(ticker),
				trade_type: crate::records::TradeType::Buy,
				trade_date: date!(2024 - 01 - 15),
				quantity: dec!(1),
				price: dec!(1),
				realized_pl: dec!(0),
			})
			.collect();
		let holdings: Vec<Holding> = Vec::new();

		Vocabulary::build(&trades, &holdings)
	}

	fn run(raw: &str, vocabulary: &Vocabulary) -> ExtractedEntities {
		let normalized = normalize(raw);

		extract(raw, &normalized, vocabulary, &NormalizedLevenshtein, 0.72)
	}

	#[test]
	fn extracts_buy_count_scenario() {
		let vocabulary = vocabulary(&["Garfield", "Odie Fund"], &["AAPL"]);
		let entities = run("How many total Buy trades were executed across all portfolios?", &vocabulary);

		assert_eq!(entities.trade_type, Some(crate::records::TradeType::Buy));
		assert_eq!(entities.portfolio, None);
		assert!(!entities.has_unresolved());
	}

	#[test]
	fn resolves_portfolio_and_metric() {
		let vocabulary = vocabulary(&["Garfield", "Odie Fund"], &["AAPL"]);
		let entities = run("Total PL YTD for Garfield", &vocabulary);

		assert_eq!(entities.portfolio.as_deref(), Some("garfield"));
		assert_eq!(entities.metric, Some(Metric::PlYtd));
	}

	#[test]
	fn resolves_portfolio_typo_within_threshold() {
		let vocabulary = vocabulary(&["Garfield"], &["AAPL"]);
		let entities = run("Total PL YTD for Garfeild", &vocabulary);

		assert_eq!(entities.portfolio.as_deref(), Some("garfield"));
		assert_eq!(entities.unresolved_portfolio, None);
	}

	#[test]
	fn leaves_portfolio_unresolved_below_threshold() {
		let vocabulary = vocabulary(&["Garfield"], &["AAPL"]);
		let normalized = normalize("Total PL YTD for Zanzibar");
		let entities = extract(
			"Total PL YTD for Zanzibar",
			&normalized,
			&vocabulary,
			&NormalizedLevenshtein,
			0.72,
		);

		assert_eq!(entities.portfolio, None);
		assert_eq!(entities.unresolved_portfolio.as_deref(), Some("zanzibar"));
	}

	#[test]
	fn tie_breaks_on_lexicographic_candidate() {
		let vocabulary = vocabulary(&["garfielda", "garfieldb"], &["AAPL"]);
		let entities = run("Total PL for Garfield", &vocabulary);

		assert_eq!(entities.portfolio.as_deref(), Some("garfielda"));
	}

	#[test]
	fn known_ticker_resolves_exactly() {
		let vocabulary = vocabulary(&["Garfield"], &["TSLA"]);
		let entities = run("Total quantity of TSLA stock traded?", &vocabulary);

		assert_eq!(entities.ticker.as_deref(), Some("tsla"));
		assert_eq!(entities.metric, Some(Metric::Quantity));
		assert_eq!(entities.unresolved_ticker, None);
	}

	#[test]
	fn unknown_ticker_shape_is_unresolved() {
		let vocabulary = vocabulary(&["Garfield"], &["AAPL"]);
		let entities = run("Total quantity of TSLA stock traded?", &vocabulary);

		assert_eq!(entities.ticker, None);
		assert_eq!(entities.unresolved_ticker.as_deref(), Some("tsla"));
	}

	#[test]
	fn metric_keywords_are_not_tickers() {
		let vocabulary = vocabulary(&["Garfield"], &["AAPL"]);
		let entities = run("Show top 3 portfolios by MV", &vocabulary);

		assert_eq!(entities.ticker, None);
		assert_eq!(entities.unresolved_ticker, None);
		assert_eq!(entities.metric, Some(Metric::MvBase));
		assert_eq!(entities.top_n, Some(3));
	}

	#[test]
	fn longest_metric_alias_wins() {
		let vocabulary = vocabulary(&["Garfield"], &["AAPL"]);
		let entities = run("Total realized PL for Garfield", &vocabulary);

		assert_eq!(entities.metric, Some(Metric::RealizedPl));
	}

	#[test]
	fn extracts_numeric_conditions() {
		let vocabulary = vocabulary(&["Garfield"], &["AAPL"]);

		let entities = run("Which holdings have negative PL YTD?", &vocabulary);

		assert_eq!(entities.condition, Some(Condition { op: Cmp::Lt, threshold: dec!(0) }));

		let entities = run("Show trades with quantity greater than 100", &vocabulary);

		assert_eq!(entities.condition, Some(Condition { op: Cmp::Gt, threshold: dec!(100) }));

		let entities = run("positions with market value below -2.5", &vocabulary);

		assert_eq!(entities.condition, Some(Condition { op: Cmp::Lt, threshold: dec!(-2.5) }));
	}

	#[test]
	fn top_n_is_not_a_condition_threshold() {
		let vocabulary = vocabulary(&["Garfield"], &["AAPL"]);
		let entities = run("Show top 3 portfolios by market value", &vocabulary);

		assert_eq!(entities.top_n, Some(3));
		assert_eq!(entities.condition, None);
	}

	#[test]
	fn extraction_is_deterministic() {
		let vocabulary = vocabulary(&["Garfield", "Odie Fund"], &["AAPL", "MSFT"]);
		let first = run("Total PL YTD for Garfeild", &vocabulary);
		let second = run("Total PL YTD for Garfeild", &vocabulary);

		assert_eq!(first, second);
	}
}
