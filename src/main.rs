use std::process::ExitCode;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sitecms::cli::{self, Cli};
use sitecms::ui::output::{self, Verbosity};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    init_tracing(Verbosity::from_flags(cli.quiet, cli.debug));

    match cli::run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output::error(format!("{:#}", err));
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins; otherwise the filter follows `--quiet` / `--debug`.
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.log_filter()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
