use std::{io, path::Path};

use rust_decimal::Decimal;
use serde::Deserialize;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use fiq_domain::{Holding, Trade, TradeType, normalize};

use crate::{Error, Result};

const DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Deserialize)]
struct RawTrade {
	portfolio: String,
	ticker: String,
	trade_type: String,
	trade_date: String,
	quantity: Decimal,
	price: Decimal,
	realized_pl: Decimal,
}

#[derive(Debug, Deserialize)]
struct RawHolding {
	portfolio: String,
	ticker: String,
	quantity: Decimal,
	price: Decimal,
	mv_base: Decimal,
	pl_ytd: Decimal,
}

/// Load and normalize the trade record set. A malformed row is fatal;
/// partially loaded data would silently skew every aggregate downstream.
pub fn load_trades(path: &Path) -> Result<Vec<Trade>> {
	trades_from_reader(csv::Reader::from_path(path)?, path)
}

pub fn load_holdings(path: &Path) -> Result<Vec<Holding>> {
	holdings_from_reader(csv::Reader::from_path(path)?, path)
}

fn trades_from_reader<R>(mut reader: csv::Reader<R>, path: &Path) -> Result<Vec<Trade>>
where
	R: io::Read,
{
	let mut trades = Vec::new();

	for (row, record) in reader.deserialize::<RawTrade>().enumerate() {
		let raw = record?;
		// Header is row one, so data rows start at two.
		let row = row + 2;
		let invalid = |message: String| Error::InvalidRecord {
			path: path.to_path_buf(),
			row,
			message,
		};
		let trade_type = TradeType::parse(&raw.trade_type)
			.ok_or_else(|| invalid(format!("unknown trade type {:?}.", raw.trade_type)))?;
		let trade_date = Date::parse(&raw.trade_date, DATE_FORMAT)
			.map_err(|err| invalid(format!("bad trade date {:?} ({err}).", raw.trade_date)))?;
		let portfolio = normalize(&raw.portfolio);
		let ticker = normalize(&raw.ticker);

		if portfolio.is_empty() || ticker.is_empty() {
			return Err(invalid("portfolio and ticker must be non-empty.".to_string()));
		}

		trades.push(Trade {
			portfolio,
			ticker,
			trade_type,
			trade_date,
			quantity: raw.quantity,
			price: raw.price,
			realized_pl: raw.realized_pl,
		});
	}

	Ok(trades)
}

fn holdings_from_reader<R>(mut reader: csv::Reader<R>, path: &Path) -> Result<Vec<Holding>>
where
	R: io::Read,
{
	let mut holdings = Vec::new();

	for (row, record) in reader.deserialize::<RawHolding>().enumerate() {
		let raw = record?;
		let row = row + 2;
		let portfolio = normalize(&raw.portfolio);
		let ticker = normalize(&raw.ticker);

		if portfolio.is_empty() || ticker.is_empty() {
			return Err(Error::InvalidRecord {
				path: path.to_path_buf(),
				row,
				message: "portfolio and ticker must be non-empty.".to_string(),
			});
		}

		holdings.push(Holding {
			portfolio,
			ticker,
			quantity: raw.quantity,
			price: raw.price,
			mv_base: raw.mv_base,
			pl_ytd: raw.pl_ytd,
		});
	}

	Ok(holdings)
}
