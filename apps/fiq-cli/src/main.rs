use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = fiq_cli::Args::parse();
	fiq_cli::run(args).await
}
