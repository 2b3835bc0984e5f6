use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use log::debug;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use clumio_core::diagnostics::Severity;
use clumio_core::lifecycle::{self, Response};
use clumio_core::resource::{Resource, ResourceId, Value};
use clumio_provider::config::{
    ENV_API_TOKEN, ENV_BASE_URL, ENV_ORGANIZATIONAL_UNIT, ENV_POLL_INTERVAL, ENV_POLL_TIMEOUT,
};
use clumio_provider::resources::resource_types;
use clumio_provider::{ClumioConfig, ClumioProvider, ConfigError};

#[derive(Parser)]
#[command(name = "clumio")]
#[command(about = "Manage Clumio backup resources", long_about = None)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Clumio API base URL
    #[arg(long, env = ENV_BASE_URL, global = true)]
    base_url: Option<String>,

    /// API token
    #[arg(long, env = ENV_API_TOKEN, global = true, hide_env_values = true)]
    api_token: Option<String>,

    /// Organizational unit every request runs under
    #[arg(long, env = ENV_ORGANIZATIONAL_UNIT, global = true)]
    organizational_unit: Option<String>,

    /// Seconds between two polls of a pending operation
    #[arg(long, env = ENV_POLL_INTERVAL, global = true)]
    poll_interval: Option<u64>,

    /// Seconds before giving up on a pending operation
    #[arg(long, env = ENV_POLL_TIMEOUT, global = true)]
    poll_timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported resource types
    ResourceTypes,
    /// Read the current state of a resource
    Read {
        resource_type: String,
        identifier: String,
        /// Local name used in the output
        #[arg(long, default_value = "main")]
        name: String,
    },
    /// Adopt an existing object
    Import {
        resource_type: String,
        identifier: String,
        #[arg(long, default_value = "main")]
        name: String,
    },
    /// Create the resource described in a JSON file
    Create {
        /// Path to resource file
        file: PathBuf,
    },
    /// Update an existing resource to match a JSON file
    Update {
        identifier: String,
        /// Path to resource file
        file: PathBuf,
    },
    /// Delete a resource
    Delete {
        resource_type: String,
        identifier: String,
        #[arg(long, default_value = "main")]
        name: String,
    },
    /// Look up a data source described in a JSON file
    Lookup {
        /// Path to resource file
        file: PathBuf,
    },
    /// Wait for a backend task to finish
    WaitTask { task_id: String },
}

/// Resource file: `{"type": "...", "name": "...", "attributes": {...}}`
#[derive(Debug, Deserialize)]
struct ResourceFile {
    #[serde(rename = "type")]
    resource_type: String,
    #[serde(default = "default_name")]
    name: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

fn default_name() -> String {
    "main".to_string()
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "Interrupted, cancelling...".yellow());
            on_interrupt.cancel();
        }
    });

    if let Err(e) = run(cli, cancel).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli, cancel: CancellationToken) -> Result<(), String> {
    if let Commands::ResourceTypes = cli.command {
        run_resource_types();
        return Ok(());
    }

    let config = build_config(&cli.connection).map_err(|e| e.to_string())?;
    debug!("using {:?}", config);
    let provider = ClumioProvider::new(&config)
        .map_err(|e| e.to_string())?
        .with_cancellation(cancel);

    match cli.command {
        Commands::ResourceTypes => Ok(()),
        Commands::Read {
            resource_type,
            identifier,
            name,
        } => {
            let id = ResourceId::new(resource_type, name);
            report(lifecycle::read(&provider, &id, &identifier).await)
        }
        Commands::Import {
            resource_type,
            identifier,
            name,
        } => {
            let id = ResourceId::new(resource_type, name);
            report(lifecycle::import(&provider, &id, &identifier).await)
        }
        Commands::Create { file } => {
            let resource = load_resource(&file)?;
            report(lifecycle::create(&provider, &resource).await)
        }
        Commands::Update { identifier, file } => run_update(&provider, &identifier, &file).await,
        Commands::Delete {
            resource_type,
            identifier,
            name,
        } => {
            let id = ResourceId::new(resource_type, name);
            report(lifecycle::delete(&provider, &id, &identifier).await)
        }
        Commands::Lookup { file } => {
            let resource = load_resource(&file)?.with_read_only(true);
            report(lifecycle::read_data_source(&provider, &resource).await)
        }
        Commands::WaitTask { task_id } => {
            let task = provider.wait_task(&task_id).await.map_err(|e| e.to_string())?;
            let json = serde_json::to_string_pretty(&task).map_err(|e| e.to_string())?;
            println!("{}", json);
            Ok(())
        }
    }
}

fn run_resource_types() {
    for resource_type in resource_types() {
        if resource_type.has_data_source() {
            println!("{} {}", resource_type.name(), "(data source)".dimmed());
        } else {
            println!("{}", resource_type.name());
        }
    }
}

/// Update runs against the current remote state, read first
async fn run_update(
    provider: &ClumioProvider,
    identifier: &str,
    file: &Path,
) -> Result<(), String> {
    let to = load_resource(file)?;
    let current = lifecycle::read(provider, &to.id, identifier).await;
    let Some(from) = current.state.clone() else {
        report(current)?;
        return Err(format!("{} ({}) does not exist", to.id, identifier));
    };
    eprintln!("{} {} ({})", "Updating".cyan().bold(), to.id, identifier);
    report(lifecycle::update(provider, &to.id, identifier, &from, &to).await)
}

/// Flags already carry their environment fallbacks; the lookup reads them
/// by variable name so parsing and validation stay in one place.
fn build_config(args: &ConnectionArgs) -> Result<ClumioConfig, ConfigError> {
    let poll_interval = args.poll_interval.map(|secs| secs.to_string());
    let poll_timeout = args.poll_timeout.map(|secs| secs.to_string());
    ClumioConfig::from_lookup(|name| match name {
        ENV_BASE_URL => args.base_url.clone(),
        ENV_API_TOKEN => args.api_token.clone(),
        ENV_ORGANIZATIONAL_UNIT => args.organizational_unit.clone(),
        ENV_POLL_INTERVAL => poll_interval.clone(),
        ENV_POLL_TIMEOUT => poll_timeout.clone(),
        _ => None,
    })
}

fn load_resource(path: &Path) -> Result<Resource, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    parse_resource(&content).map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

fn parse_resource(content: &str) -> Result<Resource, String> {
    let file: ResourceFile = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let known = resource_types().iter().any(|t| t.name() == file.resource_type);
    if !known {
        return Err(format!("Unknown resource type: {}", file.resource_type));
    }

    let mut attributes = HashMap::new();
    for (key, value) in &file.attributes {
        if let Some(value) =
            Value::from_json(value).map_err(|e| format!("attribute {}: {}", key, e))?
        {
            attributes.insert(key.clone(), value);
        }
    }
    let mut resource = Resource::new(file.resource_type, file.name);
    resource.attributes = attributes;
    Ok(resource)
}

/// Print the resulting state and diagnostics; error diagnostics fail the command
fn report(response: Response) -> Result<(), String> {
    for diag in response.diagnostics.iter() {
        match diag.severity {
            Severity::Warning => eprintln!("{} {}", "Warning:".yellow().bold(), diag),
            Severity::Error => eprintln!("{} {}", "Error:".red().bold(), diag),
        }
    }

    if let Some(state) = &response.state {
        let json = serde_json::to_string_pretty(&state.to_json()).map_err(|e| e.to_string())?;
        println!("{}", json);
    }

    let errors = response.diagnostics.errors.len();
    if errors > 0 {
        return Err(format!("{} error(s) reported", errors));
    }
    Ok(())
}
