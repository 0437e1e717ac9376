use std::{path::PathBuf, sync::Arc};

use clap::{
	Parser, Subcommand,
	builder::{
		Styles,
		styling::{AnsiColor, Effects},
	},
};
use tracing_subscriber::EnvFilter;

use fiq_engine::{FiqEngine, Providers, index};
use fiq_storage::{qdrant::QdrantStore, records};

#[derive(Debug, Parser)]
#[command(
	version,
	rename_all = "kebab",
	styles = styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Rebuild the evidence corpus from the record sets and push it into
	/// the vector store.
	Index,
	/// Answer a question over the loaded record sets.
	Ask {
		query: String,
		/// Print the pipeline intermediates as JSON after the answer.
		#[arg(long)]
		debug: bool,
	},
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let cfg = fiq_config::load(&args.config)?;

	init_tracing(&cfg);

	let trades = records::load_trades(&cfg.data.trades_csv)?;
	let holdings = records::load_holdings(&cfg.data.holdings_csv)?;

	tracing::info!(trades = trades.len(), holdings = holdings.len(), "Record sets loaded.");

	let store = QdrantStore::new(&cfg.storage.qdrant)?;
	let providers = Providers::default();

	match args.command {
		Command::Index => {
			let report = index::index_corpus(&cfg, &store, &providers, &trades, &holdings).await?;

			println!("Indexed {} chunks into {}.", report.chunks, store.collection);
		},
		Command::Ask { query, debug } => {
			let engine = FiqEngine::new(cfg, trades, holdings, providers, Arc::new(store));
			let response = engine.answer(&query).await;

			println!("{}", response.answer);

			if debug {
				println!("{}", serde_json::to_string_pretty(&response.debug)?);
			}
		},
	}

	Ok(())
}

fn init_tracing(cfg: &fiq_config::Config) {
	let filter =
		EnvFilter::try_new(&cfg.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn styles() -> Styles {
	Styles::styled()
		.header(AnsiColor::Red.on_default() | Effects::BOLD)
		.usage(AnsiColor::Red.on_default() | Effects::BOLD)
		.literal(AnsiColor::Blue.on_default() | Effects::BOLD)
		.placeholder(AnsiColor::Green.on_default())
}
