use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::records::{Holding, Trade, TradeType};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkKind {
	Portfolio,
	Security,
	Global,
}
impl ChunkKind {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Portfolio => "portfolio",
			Self::Security => "security",
			Self::Global => "global",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"portfolio" => Some(Self::Portfolio),
			"security" => Some(Self::Security),
			"global" => Some(Self::Global),
			_ => None,
		}
	}
}

/// One embeddable summary of a slice of the record sets. Ids are stable
/// across rebuilds of the same data so re-indexing overwrites in place.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Chunk {
	pub id: String,
	pub kind: ChunkKind,
	pub text: String,
}

#[derive(Default)]
struct PortfolioStats {
	buys: usize,
	sells: usize,
	realized_pl: Decimal,
	tickers: Vec<String>,
	positions: usize,
	mv_base: Decimal,
	pl_ytd: Decimal,
}

#[derive(Default)]
struct SecurityStats {
	trades: usize,
	traded_quantity: Decimal,
	realized_pl: Decimal,
	portfolios: Vec<String>,
	positions: usize,
	mv_base: Decimal,
	pl_ytd: Decimal,
}

/// Build the retrieval corpus: one chunk per portfolio, one per security,
/// plus a global overview. Output order is deterministic (portfolios, then
/// securities, both alphabetical, then the global chunk).
pub fn build_chunks(trades: &[Trade], holdings: &[Holding]) -> Vec<Chunk> {
	let mut portfolios: BTreeMap<&str, PortfolioStats> = BTreeMap::new();
	let mut securities: BTreeMap<&str, SecurityStats> = BTreeMap::new();

	for trade in trades {
		let portfolio = portfolios.entry(&trade.portfolio).or_default();

		match trade.trade_type {
			TradeType::Buy => portfolio.buys += 1,
			TradeType::Sell => portfolio.sells += 1,
		}

		portfolio.realized_pl += trade.realized_pl;
		portfolio.tickers.push(trade.ticker.clone());

		let security = securities.entry(&trade.ticker).or_default();

		security.trades += 1;
		security.traded_quantity += trade.quantity;
		security.realized_pl += trade.realized_pl;
		security.portfolios.push(trade.portfolio.clone());
	}
	for holding in holdings {
		let portfolio = portfolios.entry(&holding.portfolio).or_default();

		portfolio.positions += 1;
		portfolio.mv_base += holding.mv_base;
		portfolio.pl_ytd += holding.pl_ytd;
		portfolio.tickers.push(holding.ticker.clone());

		let security = securities.entry(&holding.ticker).or_default();

		security.positions += 1;
		security.mv_base += holding.mv_base;
		security.pl_ytd += holding.pl_ytd;
		security.portfolios.push(holding.portfolio.clone());
	}

	let mut chunks = Vec::with_capacity(portfolios.len() + securities.len() + 1);

	for (name, stats) in &portfolios {
		chunks.push(Chunk {
			id: format!("portfolio:{name}"),
			kind: ChunkKind::Portfolio,
			text: portfolio_text(name, stats),
		});
	}
	for (ticker, stats) in &securities {
		chunks.push(Chunk {
			id: format!("security:{ticker}"),
			kind: ChunkKind::Security,
			text: security_text(ticker, stats),
		});
	}

	chunks.push(global_chunk(trades, holdings, portfolios.len(), securities.len()));

	chunks
}

fn portfolio_text(name: &str, stats: &PortfolioStats) -> String {
	let tickers = joined_names(&stats.tickers);

	format!(
		"Portfolio {name}: {} buy and {} sell trades with realized PL {}; {} open positions \
		 worth {} market value, PL YTD {}. Instruments: {tickers}.",
		stats.buys, stats.sells, stats.realized_pl, stats.positions, stats.mv_base, stats.pl_ytd,
	)
}

fn security_text(ticker: &str, stats: &SecurityStats) -> String {
	let portfolios = joined_names(&stats.portfolios);

	format!(
		"Security {ticker}: traded {} times for {} units with realized PL {}; held in {} \
		 positions worth {} market value, PL YTD {}. Portfolios: {portfolios}.",
		stats.trades,
		stats.traded_quantity,
		stats.realized_pl,
		stats.positions,
		stats.mv_base,
		stats.pl_ytd,
	)
}

fn global_chunk(
	trades: &[Trade],
	holdings: &[Holding],
	portfolio_count: usize,
	security_count: usize,
) -> Chunk {
	let realized_pl: Decimal = trades.iter().map(|trade| trade.realized_pl).sum();
	let mv_base: Decimal = holdings.iter().map(|holding| holding.mv_base).sum();
	let pl_ytd: Decimal = holdings.iter().map(|holding| holding.pl_ytd).sum();

	Chunk {
		id: "global:overview".to_string(),
		kind: ChunkKind::Global,
		text: format!(
			"Overview: {} trades and {} holdings across {portfolio_count} portfolios and \
			 {security_count} securities. Total realized PL {realized_pl}, total market value \
			 {mv_base}, total PL YTD {pl_ytd}.",
			trades.len(),
			holdings.len(),
		),
	}
}

fn joined_names(names: &[String]) -> String {
	let mut unique = names.to_vec();

	unique.sort();
	unique.dedup();

	unique.join(", ")
}
