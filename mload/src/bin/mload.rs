use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use gqlfetcher::GraphQLClient;
use log::LevelFilter;
use mload::config::{Endpoint, GraphQLConfig, LoadSettings};
use mload::{Destination, LoadOptions, Schema};

#[derive(Parser, Debug)]
#[command(
    name = "mload",
    about = "Load CSV/JSON entity data into a GraphQL endpoint or convert it to NDF files."
)]
struct Cli {
    /// Minimum log level to display.
    #[arg(long, default_value_t = LogLevelArg::Info, value_enum, global = true)]
    log_level: LogLevelArg,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load a file, or every CSV/JSON file of a directory.
    Load(LoadArgs),
}

#[derive(Args, Debug)]
struct LoadArgs {
    /// Input file or directory.
    #[arg(value_hint = clap::ValueHint::AnyPath)]
    path: PathBuf,

    /// Mutation to call for every record (default: create<Type>).
    #[arg(long)]
    mutation: Option<String>,

    /// Schema type of the records (default: the input file name).
    #[arg(long = "type")]
    type_name: Option<String>,

    /// Write NDF files under this directory instead of calling the endpoint.
    #[arg(long, value_hint = clap::ValueHint::DirPath)]
    ndfout: Option<PathBuf>,

    /// Named endpoint from .graphqlconfig.
    #[arg(long)]
    endpoint: Option<String>,

    /// Endpoint URL, overriding the configuration file.
    #[arg(long, env = "MLOAD_ENDPOINT_URL")]
    endpoint_url: Option<String>,

    /// Bearer token sent with every request.
    #[arg(long, env = "MLOAD_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Records per mutation request (0 = one request per file).
    #[arg(long)]
    batchsize: Option<usize>,

    /// Records converted between NDF flushes (0 = flush at end of file only).
    #[arg(long)]
    flush_threshold: Option<usize>,

    /// How list-typed fields are recognised.
    #[arg(long, value_enum)]
    list_rule: Option<ListRuleArg>,

    /// Type name suffix marking collections for the suffix and either rules.
    #[arg(long)]
    list_suffix: Option<String>,

    /// Keep bare dates as YYYY-MM-DD in mutations.
    #[arg(long)]
    short_dates: bool,

    /// Per-request timeout in seconds for endpoint calls.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Schema file (SDL, or introspection JSON); overrides schemaPath.
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    schema: Option<PathBuf>,

    /// Configuration file (default: ./.graphqlconfig when present).
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

impl LoadArgs {
    fn settings(&self) -> LoadSettings {
        LoadSettings {
            batch_size: self.batchsize,
            flush_threshold: self.flush_threshold,
            list_rule: self.list_rule.map(|rule| rule.name().to_string()),
            list_suffix: self.list_suffix.clone(),
            short_dates: self.short_dates.then_some(true),
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LevelFilter {
    fn from(value: LogLevelArg) -> Self {
        match value {
            LogLevelArg::Error => LevelFilter::Error,
            LogLevelArg::Warn => LevelFilter::Warn,
            LogLevelArg::Info => LevelFilter::Info,
            LogLevelArg::Debug => LevelFilter::Debug,
            LogLevelArg::Trace => LevelFilter::Trace,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ListRuleArg {
    Wrapped,
    Suffix,
    Either,
}

impl ListRuleArg {
    fn name(self) -> &'static str {
        match self {
            ListRuleArg::Wrapped => "wrapped",
            ListRuleArg::Suffix => "suffix",
            ListRuleArg::Either => "either",
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(env_logger::Env::default());
    logger.filter_level(LevelFilter::from(cli.log_level));
    let _ = logger.try_init();

    match cli.command {
        Commands::Load(args) => handle_load(args).await,
    }
}

async fn handle_load(args: LoadArgs) -> Result<()> {
    if !args.path.exists() {
        bail!("Input path '{}' does not exist", args.path.display());
    }

    let config = load_config(args.config.as_deref()).await?;
    let settings = config.extensions.mload.clone().overlay(args.settings());
    let schema_path = args.schema.clone().or_else(|| config.schema_path());

    // The endpoint is only needed to upload, or to introspect a missing schema.
    let client = if args.ndfout.is_none() || schema_path.is_none() {
        Some(connect(&args, &config)?)
    } else {
        None
    };

    let schema = match (&schema_path, &client) {
        (Some(path), _) => Schema::load(path)
            .await
            .with_context(|| format!("failed to load schema from {}", path.display()))?,
        (None, Some(client)) => Schema::introspect(client)
            .await
            .with_context(|| format!("failed to introspect {}", client.endpoint()))?,
        (None, None) => bail!("no schema: pass --schema or configure an endpoint"),
    };

    let destination = match (&args.ndfout, &client) {
        (Some(out_dir), _) => Destination::Ndf(out_dir.clone()),
        (None, Some(client)) => Destination::Endpoint(client),
        (None, None) => bail!("no endpoint to upload to"),
    };
    let options = LoadOptions {
        mutation: args.mutation.clone(),
        type_name: args.type_name.clone(),
        settings,
    };

    let report = mload::load(&schema, destination, options, &args.path)
        .await
        .context("load aborted")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{report}");
    }
    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<GraphQLConfig> {
    match path {
        Some(path) => GraphQLConfig::load(path)
            .await
            .with_context(|| format!("failed to read configuration {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("failed to resolve current directory")?;
            Ok(GraphQLConfig::discover(&cwd).await?.unwrap_or_default())
        }
    }
}

fn connect(args: &LoadArgs, config: &GraphQLConfig) -> Result<GraphQLClient> {
    let endpoint = match &args.endpoint_url {
        Some(url) => Endpoint::from_url("command line", url)?,
        None => config.endpoint(args.endpoint.as_deref())?,
    };
    log::info!("Using endpoint '{}' at {}", endpoint.name, endpoint.url);

    let mut client = GraphQLClient::new(&endpoint.url)
        .with_context(|| format!("invalid endpoint {}", endpoint.url))?;
    for (name, value) in endpoint.headers {
        client = client.with_header(name, value);
    }
    if let Some(token) = &args.token {
        client = client.with_bearer_token(token.clone());
    }
    if let Some(secs) = args.timeout {
        client = client.with_timeout(Duration::from_secs(secs))?;
    }
    Ok(client)
}
