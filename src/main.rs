use std::path::PathBuf;

use anyhow::{Context, bail};

use data_connectors::communication::CommunicationMessage;
use data_connectors::config::{ConnectionsFile, ConnectorConfig, FileFinderConfig, SmtpConfig};
use data_connectors::connector::{FileSearchQuery, QueryResult};
use data_connectors::registry::ConnectorRegistry;

const USAGE: &str = "\
Usage:
  connector [--config FILE] list
  connector [--config FILE] find <alias> [folder...]
  connector [--config FILE] send <alias> <message.json | ->

Without --config, connectors are read from CONNECTORS_CONFIG or built from
FILE_FINDER_* (alias \"files\") and SMTP_* (alias \"smtp\") variables.";

enum Command {
    List,
    Find { alias: String, folders: Vec<String> },
    Send { alias: String, message: String },
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<(Option<PathBuf>, Command)> {
    let mut config = None;
    let mut positional = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().context("--config needs a file")?;
                config = Some(PathBuf::from(path));
            }
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            _ => positional.push(arg),
        }
    }

    let mut positional = positional.into_iter();
    let command = match positional.next().as_deref() {
        Some("list") => Command::List,
        Some("find") => Command::Find {
            alias: positional.next().context("find needs an alias")?,
            folders: positional.collect(),
        },
        Some("send") => Command::Send {
            alias: positional.next().context("send needs an alias")?,
            message: positional.next().context("send needs a message file")?,
        },
        Some(other) => bail!("unknown command \"{other}\"\n\n{USAGE}"),
        None => bail!("{USAGE}"),
    };
    Ok((config, command))
}

fn load_connections(path: Option<PathBuf>) -> anyhow::Result<ConnectionsFile> {
    let path = path.or_else(|| std::env::var_os("CONNECTORS_CONFIG").map(PathBuf::from));
    if let Some(path) = path {
        return ConnectionsFile::load(&path)
            .with_context(|| format!("failed to load {}", path.display()));
    }

    let mut file = ConnectionsFile::default();
    file.connections.insert(
        "files".to_string(),
        ConnectorConfig::FileFinder(FileFinderConfig::from_env()?),
    );
    if let Some(smtp) = SmtpConfig::from_env()? {
        file.connections.insert("smtp".to_string(), ConnectorConfig::Smtp(smtp));
    }
    Ok(file)
}

fn read_message(source: &str) -> anyhow::Result<CommunicationMessage> {
    let raw = if source == "-" {
        std::io::read_to_string(std::io::stdin()).context("failed to read message from stdin")?
    } else {
        std::fs::read_to_string(source).with_context(|| format!("failed to read {source}"))?
    };
    serde_json::from_str(&raw).context("invalid message JSON")
}

fn run(registry: &mut ConnectorRegistry, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List => {
            for alias in registry.list() {
                let kind = registry
                    .get_mut(&alias)
                    .map(|c| c.query_kind().to_string())
                    .unwrap_or_default();
                println!("{alias}\t{kind}");
            }
        }
        Command::Find { alias, folders } => {
            let query = FileSearchQuery::new().with_folders(folders);
            let QueryResult::Files(result) = registry.query(&alias, &query.into())? else {
                bail!("connector \"{alias}\" did not return files");
            };
            tracing::info!(base_path = %result.base_path, roots = result.roots.len(), "Search finished");
            for entry in result.matches {
                let entry = entry?;
                if !entry.is_dir {
                    println!("{}", entry.path.display());
                }
            }
        }
        Command::Send { alias, message } => {
            let message = read_message(&message)?;
            let receipt = registry.communicate(&alias, &message)?;
            println!("{}", serde_json::to_string_pretty(&receipt)?);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let (config, command) = parse_args(std::env::args().skip(1))?;
    let connections = load_connections(config)?;
    let mut registry = ConnectorRegistry::from_config(&connections)?;

    let result = run(&mut registry, command);
    registry.disconnect_all()?;
    result
}
