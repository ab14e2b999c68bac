use crate::demo::{run_demo, DemoArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use veritas::config::AppConfig;
use veritas::error::AppError;
use veritas::telemetry;
use veritas::verification::{DiagnosticsProbe, HttpProviderTransport};

#[derive(Parser, Debug)]
#[command(
    name = "Veritas",
    about = "Submit background verifications to the provider and receive their results",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Check provider connectivity and credentials once, then exit
    Probe(ProbeArgs),
    /// Run a submission and callback round trip against in-memory adapters
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ProbeArgs {
    /// Print the raw item-type response on success
    #[arg(long)]
    pub(crate) show_response: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Probe(args) => run_probe(args).await,
        Command::Demo(args) => run_demo(args),
    }
}

async fn run_probe(args: ProbeArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    let transport = Arc::new(HttpProviderTransport::new(config.provider.timeout));
    let probe = DiagnosticsProbe::new(transport, config.provider);
    let report = tokio::task::spawn_blocking(move || probe.run())
        .await
        .map_err(|err| AppError::Io(std::io::Error::other(err)))??;

    println!("{} ({})", report.message, report.endpoint);
    if args.show_response {
        println!("{}", report.raw_response);
    }
    Ok(())
}
