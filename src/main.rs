use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use maas_client::config::{Config, OutputFormat};
use maas_client::maas::client::format_api_error;
use maas_client::{CallArgs, FilterSpec, MaasClient, RecordKind};
use serde_json::{Map, Value};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Command-line client for the MAAS API
#[derive(Parser, Debug)]
#[command(name = "maas", version, about, long_about = None)]
struct Args {
    /// MAAS base url, e.g. http://maas:5240/MAAS
    #[arg(long, global = true)]
    url: Option<String>,

    /// API key (consumer:key:secret)
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    output: Option<OutputFormat>,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check the connection and remember --url and --api-key
    Login,
    /// List resources and their operations
    Resources,
    /// Show documentation for a resource or one of its operations
    Describe {
        resource: String,
        operation: Option<String>,
    },
    /// Invoke an operation; KEY=VALUE pairs become its arguments
    Call {
        resource: String,
        operation: String,
        /// Arguments as KEY=VALUE (values are parsed as JSON when possible)
        args: Vec<String>,
        /// Explicit query parameter (GET/DELETE)
        #[arg(long = "param")]
        params: Vec<String>,
        /// Explicit form field (POST/PUT)
        #[arg(long = "file")]
        files: Vec<String>,
    },
    /// Search cached records with PATH=EXPR filters ('web*', '*-01', true, ...)
    Find {
        filters: Vec<String>,
        /// Record kind to search
        #[arg(long, value_enum, default_value = "machines")]
        kind: Kind,
        /// Server-side read argument as KEY=VALUE
        #[arg(long = "filter")]
        server_filters: Vec<String>,
        /// Print only identifiers
        #[arg(long)]
        ids: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Machines,
    Devices,
    Subnets,
}

impl Kind {
    fn record_kind(self) -> RecordKind {
        match self {
            Kind::Machines => RecordKind::MACHINES,
            Kind::Devices => RecordKind::DEVICES,
            Kind::Subnets => RecordKind::SUBNETS,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("maas started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("maas-client").join("maas.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".maas-client").join("maas.log");
    }
    PathBuf::from("maas.log")
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("{:#}", err);
        eprintln!("Error: {}", format_api_error(&err));
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();
    let output = config.effective_output(args.output);

    if let Command::Login = args.command {
        let url = args.url.as_deref().context("'maas login' needs --url")?;
        let api_key = args.api_key.as_deref().context("'maas login' needs --api-key")?;

        MaasClient::connect(url, api_key)
            .await
            .context("Failed to connect to MAAS")?;
        config.set_login(url, api_key)?;
        println!("Logged in to {}", url);
        return Ok(());
    }

    let mut client = connect(&config, &args).await?;

    match args.command {
        Command::Login => {}
        Command::Resources => {
            for resource in client.resources() {
                let operations: Vec<&str> = resource.operations().map(|op| op.name()).collect();
                println!("{}: {}", resource.name(), operations.join(", "));
            }
        }
        Command::Describe {
            resource,
            operation,
        } => {
            let resource = client.resource(&resource)?;
            match operation {
                Some(name) => println!("{}", resource.operation(&name)?.help()),
                None => {
                    println!("{}", resource.help());
                    for op in resource.operations() {
                        println!("  {} ({})", op.name(), op.method());
                    }
                }
            }
        }
        Command::Call {
            resource,
            operation,
            args: call_args,
            params,
            files,
        } => {
            let mut call = CallArgs::new().args(parse_pairs(&call_args)?);
            if !params.is_empty() {
                call = call.params(parse_pairs(&params)?);
            }
            if !files.is_empty() {
                call = call.files(parse_pairs(&files)?);
            }

            let reply = client.call(&resource, &operation, call).await?;
            print_value(&reply.into_json(), output)?;
        }
        Command::Find {
            filters,
            kind,
            server_filters,
            ids,
        } => {
            let kind = kind.record_kind();
            let mut spec = FilterSpec::new();
            for entry in &filters {
                let (key, matcher) = FilterSpec::parse_entry(entry)
                    .with_context(|| format!("Invalid filter '{}', expected PATH=EXPR", entry))?;
                spec.insert(&key, matcher);
            }

            client
                .reload_cache(kind, parse_pairs(&server_filters)?, true)
                .await?;

            if ids {
                let mut found: Vec<String> =
                    client.find_ids(kind, &spec, false).await?.into_iter().collect();
                found.sort();
                print_value(&Value::from(found), output)?;
            } else {
                let found = client.find(kind, &spec, false).await?;
                print_value(&Value::Array(found), output)?;
            }
        }
    }

    Ok(())
}

/// Connect with the effective url and API key
async fn connect(config: &Config, args: &Args) -> Result<MaasClient> {
    let url = config
        .effective_url(args.url.as_deref())
        .context("No MAAS url configured. Use --url, MAAS_URL or 'maas login'")?;
    let api_key = config
        .effective_api_key(args.api_key.as_deref())
        .context("No API key configured. Use --api-key, MAAS_API_KEY or 'maas login'")?;

    tracing::info!("Using MAAS at {}", url);
    MaasClient::connect(&url, &api_key)
        .await
        .context("Failed to connect to MAAS")
}

/// Parse `KEY=VALUE` arguments; values are JSON when they parse, else strings
fn parse_pairs(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("Invalid argument '{}', expected KEY=VALUE", pair))?;
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        map.insert(key.to_string(), value);
    }
    Ok(map)
}

fn print_value(value: &Value, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}
