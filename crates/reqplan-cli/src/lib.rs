mod check;
mod cli;
mod config;
mod explain;
mod run_cmd;

use tracing_subscriber::EnvFilter;

pub async fn run(args: Vec<String>) -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cmd = cli::parse_args(&args)?;
    init_tracing(cmd.verbose());

    match cmd {
        cli::Command::Help(topic) => {
            cli::print_help(topic);
            Ok(())
        }
        cli::Command::Explain(args) => explain::run(args),
        cli::Command::Run(args) => run_cmd::run(args).await,
        cli::Command::Check(args) => check::run(args),
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "reqplan=debug,info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .try_init();
}
