use migration_scout::cli::commands::{CliArgs, Commands};
use migration_scout::cli::handlers::{handle_analyze, handle_serve};
use migration_scout::util::logging::{init_logging, parse_level, LoggingConfig};
use migration_scout::VERSION;

use clap::Parser;
use tracing::{debug, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging(LoggingConfig::from_env().with_level_override(level_from_args(&args)));

    debug!("migration-scout v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Serve(serve_args) => handle_serve(serve_args).await,
        Commands::Analyze(analyze_args) => handle_analyze(analyze_args, args.quiet).await,
    };

    std::process::exit(exit_code);
}

/// `--log-level` beats `-v`, which beats `-q`; with none of them the environment decides
fn level_from_args(args: &CliArgs) -> Option<Level> {
    if let Some(level_str) = &args.log_level {
        Some(parse_level(level_str))
    } else if args.verbose {
        Some(Level::DEBUG)
    } else if args.quiet {
        Some(Level::ERROR)
    } else {
        None
    }
}
