use clap::{Parser, Subcommand, ValueEnum};
use genai::adapter::AdapterKind;
use std::path::PathBuf;

/// AI-generated migration readiness reports for source repositories
#[derive(Parser, Debug)]
#[command(
    name = "migration-scout",
    about = "AI-generated migration readiness reports for source repositories",
    version,
    author,
    long_about = "migration-scout clones a repository, collects its README, dependency \
                  manifests and Dockerfile, and asks a generative model for a migration \
                  readiness report. It runs as an HTTP service or analyzes a single \
                  repository from the command line."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run the report HTTP service",
        long_about = "Serves POST /reports, GET /reports and GET /reports/{id}.\n\n\
                      Examples:\n  \
                      migration-scout serve\n  \
                      migration-scout serve --bind 127.0.0.1:9000"
    )]
    Serve(ServeArgs),

    #[command(
        about = "Generate one report in-process and print it",
        long_about = "Runs the full pipeline for a single repository against an in-memory \
                      store. Exits 0 when the report completes and 1 when it fails.\n\n\
                      Examples:\n  \
                      migration-scout analyze https://github.com/acme/shop\n  \
                      migration-scout analyze https://github.com/acme/shop --target-platform 'Cloud Run'\n  \
                      migration-scout analyze https://github.com/acme/shop --mock-response '{}'"
    )]
    Analyze(AnalyzeArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct ServeArgs {
    #[arg(
        short = 'b',
        long,
        value_name = "ADDR",
        help = "Listen address (overrides SCOUT_BIND_ADDR)"
    )]
    pub bind: Option<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[arg(value_name = "URL", help = "Repository URL to clone")]
    pub repo_url: String,

    #[arg(short = 't', long, value_name = "PLATFORM", help = "Migration target hint")]
    pub target_platform: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,

    #[arg(
        short = 'p',
        long,
        value_parser = parse_adapter_kind,
        help = "AI provider (overrides SCOUT_PROVIDER)"
    )]
    pub provider: Option<AdapterKind>,

    #[arg(short = 'm', long, value_name = "MODEL", help = "Model name (overrides SCOUT_MODEL)")]
    pub model: Option<String>,

    #[arg(long, value_name = "FILE", help = "Prompt template (overrides SCOUT_PROMPT_TEMPLATE)")]
    pub prompt_template: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", help = "Model request timeout in seconds")]
    pub timeout: Option<u64>,

    #[arg(
        long,
        value_name = "TEXT",
        help = "Skip the model and use TEXT as its reply"
    )]
    pub mock_response: Option<String>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

fn parse_adapter_kind(s: &str) -> Result<AdapterKind, String> {
    crate::config::parse_provider(s).map_err(|e| e.to_string())
}
