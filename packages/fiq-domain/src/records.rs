use rust_decimal::Decimal;
use serde::Serialize;
use time::Date;

use crate::normalize::normalize;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
	Trades,
	Holdings,
}
impl Dataset {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Trades => "trades",
			Self::Holdings => "holdings",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
	Buy,
	Sell,
}
impl TradeType {
	pub fn parse(raw: &str) -> Option<Self> {
		match normalize(raw).as_str() {
			"buy" | "b" => Some(Self::Buy),
			"sell" | "s" => Some(Self::Sell),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Buy => "buy",
			Self::Sell => "sell",
		}
	}
}

/// A single executed trade. Names and tickers are stored normalized; the
/// record set is immutable once loaded.
#[derive(Clone, Debug)]
pub struct Trade {
	pub portfolio: String,
	pub ticker: String,
	pub trade_type: TradeType,
	pub trade_date: Date,
	pub quantity: Decimal,
	pub price: Decimal,
	pub realized_pl: Decimal,
}

/// A current position. Names and tickers are stored normalized.
#[derive(Clone, Debug)]
pub struct Holding {
	pub portfolio: String,
	pub ticker: String,
	pub quantity: Decimal,
	pub price: Decimal,
	pub mv_base: Decimal,
	pub pl_ytd: Decimal,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
	Quantity,
	Price,
	RealizedPl,
	MvBase,
	PlYtd,
}
impl Metric {
	pub fn label(self) -> &'static str {
		match self {
			Self::Quantity => "quantity",
			Self::Price => "price",
			Self::RealizedPl => "realized PL",
			Self::MvBase => "market value",
			Self::PlYtd => "PL YTD",
		}
	}

	/// Keyword aliases checked against a normalized query. Multi-word
	/// aliases must come before their single-word prefixes so the longest
	/// phrase wins.
	pub fn aliases(self) -> &'static [&'static str] {
		match self {
			Self::Quantity => &["quantity", "qty", "shares"],
			Self::Price => &["price"],
			Self::RealizedPl => &["realized pl", "realized profit", "realized loss"],
			Self::MvBase => &["market value", "mv base", "mv"],
			Self::PlYtd => &["pl ytd", "ytd pl", "pnl", "pl", "profit and loss"],
		}
	}

	pub fn supported_by(self, dataset: Dataset) -> bool {
		match dataset {
			Dataset::Trades => {
				matches!(self, Self::Quantity | Self::Price | Self::RealizedPl)
			},
			Dataset::Holdings => {
				matches!(self, Self::Quantity | Self::Price | Self::MvBase | Self::PlYtd)
			},
		}
	}

	/// The metric an aggregate or rank falls back to when the query names
	/// none.
	pub fn default_for(dataset: Dataset) -> Self {
		match dataset {
			Dataset::Trades => Self::RealizedPl,
			Dataset::Holdings => Self::PlYtd,
		}
	}

	pub fn of_trade(self, trade: &Trade) -> Option<Decimal> {
		match self {
			Self::Quantity => Some(trade.quantity),
			Self::Price => Some(trade.price),
			Self::RealizedPl => Some(trade.realized_pl),
			Self::MvBase | Self::PlYtd => None,
		}
	}

	pub fn of_holding(self, holding: &Holding) -> Option<Decimal> {
		match self {
			Self::Quantity => Some(holding.quantity),
			Self::Price => Some(holding.price),
			Self::MvBase => Some(holding.mv_base),
			Self::PlYtd => Some(holding.pl_ytd),
			Self::RealizedPl => None,
		}
	}
}

/// Distinct normalized portfolio names and tickers observed across both
/// record sets. Built once at load; read-only afterwards.
#[derive(Clone, Debug, Default)]
pub struct Vocabulary {
	portfolios: Vec<String>,
	tickers: Vec<String>,
}
impl Vocabulary {
	pub fn build(trades: &[Trade], holdings: &[Holding]) -> Self {
		let mut portfolios: Vec<String> = trades
			.iter()
			.map(|trade| trade.portfolio.clone())
			.chain(holdings.iter().map(|holding| holding.portfolio.clone()))
			.map(|name| normalize(&name))
			.filter(|name| !name.is_empty())
			.collect();
		let mut tickers: Vec<String> = trades
			.iter()
			.map(|trade| trade.ticker.clone())
			.chain(holdings.iter().map(|holding| holding.ticker.clone()))
			.map(|ticker| normalize(&ticker))
			.filter(|ticker| !ticker.is_empty())
			.collect();

		portfolios.sort();
		portfolios.dedup();
		tickers.sort();
		tickers.dedup();

		Self { portfolios, tickers }
	}

	pub fn portfolios(&self) -> &[String] {
		&self.portfolios
	}

	pub fn tickers(&self) -> &[String] {
		&self.tickers
	}

	pub fn has_ticker(&self, ticker: &str) -> bool {
		self.tickers.binary_search_by(|probe| probe.as_str().cmp(ticker)).is_ok()
	}
}

#[cfg(test)]
mod tests {
	use rust_decimal_macros::dec;
	use time::macros::date;

	use super::*;

	fn trade(portfolio: &str, ticker: &str) -> Trade {
		Trade {
			portfolio: normalize(portfolio),
			ticker: normalize(ticker),
			trade_type: TradeType::Buy,
			trade_date: date!(2024 - 03 - 01),
			quantity: dec!(10),
			price: dec!(100),
			realized_pl: dec!(0),
		}
	}

	fn holding(portfolio: &str, ticker: &str) -> Holding {
		Holding {
			portfolio: normalize(portfolio),
			ticker: normalize(ticker),
			quantity: dec!(5),
			price: dec!(20),
			mv_base: dec!(100),
			pl_ytd: dec!(-3),
		}
	}

	#[test]
	fn vocabulary_is_normalized_and_deduplicated() {
		let trades = vec![trade("Garfield", "AAPL"), trade("garfield", "msft")];
		let holdings = vec![holding("Odie Fund", "AAPL")];
		let vocabulary = Vocabulary::build(&trades, &holdings);

		assert_eq!(vocabulary.portfolios(), ["garfield", "odie fund"]);
		assert_eq!(vocabulary.tickers(), ["aapl", "msft"]);
		assert!(vocabulary.has_ticker("aapl"));
		assert!(!vocabulary.has_ticker("tsla"));
	}

	#[test]
	fn metric_defaults_follow_dataset() {
		assert_eq!(Metric::default_for(Dataset::Trades), Metric::RealizedPl);
		assert_eq!(Metric::default_for(Dataset::Holdings), Metric::PlYtd);
		assert!(Metric::MvBase.supported_by(Dataset::Holdings));
		assert!(!Metric::MvBase.supported_by(Dataset::Trades));
	}

	#[test]
	fn trade_type_parses_loader_codes() {
		assert_eq!(TradeType::parse("BUY"), Some(TradeType::Buy));
		assert_eq!(TradeType::parse(" s "), Some(TradeType::Sell));
		assert_eq!(TradeType::parse("short"), None);
	}
}
