use clap::Parser;

use icf_engine::config::CliArgs;
use icf_engine::server::IcfServer;
use icf_engine::transport::NdjsonTransport;

fn main() {
	let args = CliArgs::parse();

	tracing_subscriber::fmt()
		.with_writer(std::io::stderr)
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
		)
		.init();

	let config = match args.engine_config() {
		Ok(config) => config,
		Err(e) => {
			tracing::error!("Invalid configuration: {}", e);
			std::process::exit(1);
		}
	};

	let transport = NdjsonTransport::new();
	let mut server = IcfServer::new(transport, config);

	tracing::info!("icf-engine ready");

	if let Err(e) = server.run() {
		tracing::error!("Server error: {}", e);
		std::process::exit(1);
	}
}
